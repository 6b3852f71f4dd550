pub mod conversation;
pub mod store;

pub use conversation::{ConversationMemory, Message, Role};
pub use store::{ConversationStore, InMemoryStore, JsonFileStore};

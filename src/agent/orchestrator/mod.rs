use crate::agent::interjection::{Interjection, InterjectionChannel};
use crate::agent::turn::TurnExecutor;
use crate::config::{AgentsConfig, DEFAULT_SEED_PROMPT, SessionConfig};
use crate::errors::ColloquyError;
use crate::memory::{ConversationMemory, Message};
use std::io::Write;
use std::time::Duration;
use tracing::{debug, info, warn};

const BUILDER_TAG: &str = "\u{1f477}";
const JUDGE_TAG: &str = "\u{1f9d1}\u{200d}\u{2696}\u{fe0f}";

/// What happened during one Builder → Judge → human cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundOutcome {
    /// Text the Builder was asked to respond to.
    pub builder_input: String,
    pub builder_reply: String,
    pub judge_reply: String,
    /// Trimmed human message recorded after the Judge, if any.
    pub interjection: Option<String>,
    /// The interjection channel reported end of input.
    pub closed: bool,
}

/// Drives the dialogue: Builder, pause, Judge, then an optional human line,
/// repeated until the input channel closes.
pub struct Orchestrator {
    agents: AgentsConfig,
    executor: TurnExecutor,
    memory: ConversationMemory,
    channel: Box<dyn InterjectionChannel>,
    turn_delay: Duration,
    seed_prompt: String,
    output: Box<dyn Write + Send>,
    rounds: u64,
}

impl Orchestrator {
    pub fn new(
        agents: AgentsConfig,
        executor: TurnExecutor,
        memory: ConversationMemory,
        channel: Box<dyn InterjectionChannel>,
    ) -> Self {
        Self {
            agents,
            executor,
            memory,
            channel,
            turn_delay: Duration::from_millis(500),
            seed_prompt: DEFAULT_SEED_PROMPT.to_string(),
            output: Box::new(std::io::stdout()),
            rounds: 0,
        }
    }

    /// Apply pacing and seed settings from the session configuration.
    #[must_use]
    pub fn with_session(mut self, session: &SessionConfig) -> Self {
        self.turn_delay = Duration::from_millis(session.turn_delay_ms);
        self.seed_prompt = session.seed_prompt().to_string();
        self
    }

    #[must_use]
    pub fn with_turn_delay(mut self, delay: Duration) -> Self {
        self.turn_delay = delay;
        self
    }

    /// Redirect the transcript (stdout by default).
    #[must_use]
    pub fn with_output(mut self, output: Box<dyn Write + Send>) -> Self {
        self.output = output;
        self
    }

    pub fn memory(&self) -> &ConversationMemory {
        &self.memory
    }

    pub fn rounds(&self) -> u64 {
        self.rounds
    }

    /// Run rounds until the interjection channel closes.
    pub async fn run(&mut self) -> Result<(), ColloquyError> {
        self.show("\u{1f9e0} Conversation started.\n");
        loop {
            let outcome = self.run_round().await?;
            if outcome.closed {
                info!("input closed after {} rounds", self.rounds);
                return Ok(());
            }
        }
    }

    /// Execute exactly one Builder → Judge → human cycle.
    pub async fn run_round(&mut self) -> Result<RoundOutcome, ColloquyError> {
        if self.memory.seed_if_empty(&self.seed_prompt).await? {
            info!("seeded conversation with opening prompt");
        }
        self.rounds += 1;
        debug!("round {} starting ({} messages)", self.rounds, self.memory.len());

        let builder_input = self
            .memory
            .last()
            .map_or_else(|| self.seed_prompt.clone(), |m| m.content.clone());

        let builder = &self.agents.builder;
        let builder_reply = self
            .executor
            .execute(builder, &builder_input, &mut self.memory)
            .await?;
        let line = format!("{BUILDER_TAG} {}: {}\n", builder.persona, builder_reply);
        self.show(&line);

        if !self.turn_delay.is_zero() {
            tokio::time::sleep(self.turn_delay).await;
        }

        let judge = &self.agents.judge;
        let judge_reply = self
            .executor
            .execute(judge, &builder_reply, &mut self.memory)
            .await?;
        let line = format!("{JUDGE_TAG} {}: {}\n", judge.persona, judge_reply);
        self.show(&line);

        let (interjection, closed) = match self.channel.next_input().await {
            Interjection::Message(text) if !text.trim().is_empty() => {
                let text = text.trim().to_string();
                self.memory.append(Message::human(text.clone())).await?;
                debug!("human interjection recorded");
                (Some(text), false)
            }
            Interjection::Message(_) | Interjection::Continue => (None, false),
            Interjection::Closed => (None, true),
        };

        Ok(RoundOutcome {
            builder_input,
            builder_reply,
            judge_reply,
            interjection,
            closed,
        })
    }

    fn show(&mut self, line: &str) {
        if let Err(e) = writeln!(self.output, "{line}").and_then(|()| self.output.flush()) {
            warn!("failed to write transcript: {}", e);
        }
    }
}

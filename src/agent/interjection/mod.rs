use async_trait::async_trait;
use std::collections::VecDeque;
use std::io::{BufRead, Write};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

pub const PROMPT: &str = "\u{1f4ac} Your follow-up (or press Enter to continue): ";

/// What the human did at the between-rounds prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interjection {
    /// A non-empty, trimmed line to record as the next root message.
    Message(String),
    /// Empty input, or the idle timeout elapsed.
    Continue,
    /// Input stream ended.
    Closed,
}

impl Interjection {
    /// Classify a raw input line.
    pub fn from_line(line: &str) -> Self {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            Self::Continue
        } else {
            Self::Message(trimmed.to_string())
        }
    }
}

#[async_trait]
pub trait InterjectionChannel: Send {
    async fn next_input(&mut self) -> Interjection;
}

/// Reads interjections line by line from the process's standard input.
///
/// Lines are read on a dedicated thread and forwarded over a channel, so a
/// pending read never blocks cancellation of [`InterjectionChannel::next_input`].
pub struct StdinChannel {
    lines: mpsc::UnboundedReceiver<String>,
    idle_timeout: Option<Duration>,
}

impl StdinChannel {
    pub fn new(idle_timeout: Option<Duration>) -> Self {
        Self::spawn(idle_timeout, |tx| read_lines(std::io::stdin().lock(), &tx))
    }

    /// Channel fed by any blocking line source.
    pub fn from_reader<R>(reader: R, idle_timeout: Option<Duration>) -> Self
    where
        R: BufRead + Send + 'static,
    {
        Self::spawn(idle_timeout, move |tx| read_lines(reader, &tx))
    }

    fn spawn<F>(idle_timeout: Option<Duration>, reader: F) -> Self
    where
        F: FnOnce(mpsc::UnboundedSender<String>) + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        std::thread::spawn(move || reader(tx));
        Self {
            lines: rx,
            idle_timeout,
        }
    }
}

/// Forward lines until EOF, a hard read error, or the receiver going away.
/// Invalid UTF-8 is replaced rather than ending the stream.
fn read_lines<R: BufRead>(mut reader: R, tx: &mpsc::UnboundedSender<String>) {
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => {
                debug!("stdin closed");
                return;
            }
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf).into_owned();
                if tx.send(line).is_err() {
                    return;
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => {
                warn!("failed to read stdin: {}", e);
                return;
            }
        }
    }
}

#[async_trait]
impl InterjectionChannel for StdinChannel {
    async fn next_input(&mut self) -> Interjection {
        print!("{PROMPT}");
        let _ = std::io::stdout().flush();

        let read = match self.idle_timeout {
            Some(limit) => match tokio::time::timeout(limit, self.lines.recv()).await {
                Ok(read) => read,
                Err(_) => {
                    println!();
                    info!("no input for {}s, continuing", limit.as_secs());
                    return Interjection::Continue;
                }
            },
            None => self.lines.recv().await,
        };

        read.map_or(Interjection::Closed, |line| Interjection::from_line(&line))
    }
}

/// Replays a fixed list of lines, then reports [`Interjection::Closed`].
#[derive(Debug, Default)]
pub struct ScriptedChannel {
    lines: VecDeque<String>,
}

impl ScriptedChannel {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.lines.len()
    }
}

#[async_trait]
impl InterjectionChannel for ScriptedChannel {
    async fn next_input(&mut self) -> Interjection {
        self.lines
            .pop_front()
            .map_or(Interjection::Closed, |line| Interjection::from_line(&line))
    }
}

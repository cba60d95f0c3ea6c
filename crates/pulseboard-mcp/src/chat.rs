use crate::prompts::render_chat_prompt;
use colored::Colorize;
use pulseboard_ai::ProviderChain;
use pulseboard_core::AnalyticsSnapshot;
use std::future::Future;
use std::io::{self, BufRead, Write};
use tokio::sync::mpsc;
use tracing::{debug, warn};

const EXIT_WORDS: &[&str] = &["quit", "exit", "q"];

/// What a finished chat session did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatSummary {
    pub answered: usize,
    pub failed: usize,
    pub interrupted: bool,
}

/// Blank input or an exit word ends the session.
pub fn is_exit_command(input: &str) -> bool {
    let input = input.trim().to_lowercase();
    input.is_empty() || EXIT_WORDS.contains(&input.as_str())
}

/// Lines typed by the user, read on a dedicated OS thread.
///
/// A blocked read never holds up the runtime: dropping the receiver lets the
/// process exit while the reader thread is still waiting for input.
pub struct ChatInput {
    lines: mpsc::Receiver<io::Result<String>>,
}

impl ChatInput {
    pub fn from_reader<R>(reader: R) -> Self
    where
        R: BufRead + Send + 'static,
    {
        let (tx, lines) = mpsc::channel(1);
        let spawned = std::thread::Builder::new()
            .name("pulseboard-chat-input".to_string())
            .spawn(move || {
                for line in reader.lines() {
                    let failed = line.is_err();
                    if tx.blocking_send(line).is_err() || failed {
                        break;
                    }
                }
            });
        if let Err(e) = spawned {
            // The sender went down with the closure, so the input reads as EOF.
            warn!("Failed to start chat input reader: {}", e);
        }
        Self { lines }
    }

    pub fn stdin() -> Self {
        Self::from_reader(io::BufReader::new(io::stdin()))
    }

    /// Input that is already at EOF.
    pub fn closed() -> Self {
        let (_, lines) = mpsc::channel(1);
        Self { lines }
    }

    async fn next_line(&mut self) -> io::Result<Option<String>> {
        self.lines.recv().await.transpose()
    }
}

/// Question-and-answer loop over an already collected snapshot.
pub struct ChatSession<'a> {
    chain: &'a ProviderChain,
    snapshot: &'a AnalyticsSnapshot,
}

impl<'a> ChatSession<'a> {
    pub fn new(chain: &'a ProviderChain, snapshot: &'a AnalyticsSnapshot) -> Self {
        Self { chain, snapshot }
    }

    /// Read questions from `input` until an exit command, EOF or `interrupt`.
    ///
    /// Generation failures are printed and the loop carries on.
    pub async fn run<I>(&self, mut input: ChatInput, interrupt: I) -> ChatSummary
    where
        I: Future<Output = ()>,
    {
        println!(
            "\n{}",
            "🤖 Entering chat mode! Ask questions about your analytics data.".cyan()
        );
        println!("Type 'quit', 'exit', or 'q' to leave chat mode.\n");

        let mut summary = ChatSummary::default();
        tokio::pin!(interrupt);

        loop {
            print!("\n📊 Your question: ");
            let _ = std::io::stdout().flush();

            let line = tokio::select! {
                _ = &mut interrupt => {
                    summary.interrupted = true;
                    break;
                }
                line = input.next_line() => line,
            };

            let question = match line {
                Ok(Some(line)) => line.trim().to_string(),
                Ok(None) => {
                    debug!("chat input closed");
                    break;
                }
                Err(e) => {
                    // Unlike generation errors, a failed read ends the chat:
                    // the reader thread stops after reporting it.
                    println!("\n{} {}", "❌ Error in chat:".red(), e);
                    summary.failed += 1;
                    break;
                }
            };

            if is_exit_command(&question) {
                break;
            }

            println!("\n🤔 Thinking...");
            let prompt = render_chat_prompt(&question, self.snapshot);

            let result = tokio::select! {
                _ = &mut interrupt => {
                    summary.interrupted = true;
                    break;
                }
                result = self.chain.generate(&prompt) => result,
            };

            match result {
                Ok(response) => {
                    summary.answered += 1;
                    println!("\n💬 {} Response:", response.provider.to_uppercase());
                    println!("{}", "-".repeat(50));
                    println!("{}", response.text);
                    println!("{}", "-".repeat(50));
                }
                Err(e) => {
                    summary.failed += 1;
                    println!("\n{} {}", "❌ Error in chat:".red(), e);
                }
            }
        }

        if summary.interrupted {
            println!();
        }
        println!("{}", "👋 Exiting chat mode. Goodbye!".green());
        summary
    }
}

mod common;

use common::*;
use pulseboard_core::AnalyticsSnapshot;
use pulseboard_mcp::{ChatInput, ChatSession};
use std::future::pending;
use std::io::{self, BufReader, Read};
use std::sync::mpsc;
use std::time::Duration;

fn snapshot() -> AnalyticsSnapshot {
    AnalyticsSnapshot::new("example.com", "2025-06-01", "2025-07-01", "UTC")
}

/// A terminal nobody types into: every read blocks until the sender drops.
struct IdleTerminal(mpsc::Receiver<()>);

impl Read for IdleTerminal {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        let _ = self.0.recv();
        Ok(0)
    }
}

struct BrokenTerminal;

impl Read for BrokenTerminal {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::Other, "device gone"))
    }
}

#[tokio::test]
async fn eof_ends_chat_without_generating() {
    let provider = CountingProvider::replying("cloudflare", "unused");
    let chain = chain_of(vec![provider.clone()]);
    let snapshot = snapshot();

    let summary = ChatSession::new(&chain, &snapshot)
        .run(ChatInput::from_reader("".as_bytes()), pending())
        .await;

    assert_eq!(summary.answered, 0);
    assert!(!summary.interrupted);
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn blank_line_ends_chat() {
    let provider = CountingProvider::replying("cloudflare", "unused");
    let chain = chain_of(vec![provider.clone()]);
    let snapshot = snapshot();

    ChatSession::new(&chain, &snapshot)
        .run(ChatInput::from_reader("   \nstill here?\n".as_bytes()), pending())
        .await;

    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn generation_errors_do_not_end_chat() {
    let provider = CountingProvider::failing("ollama", "Ollama error: model not found");
    let chain = chain_of(vec![provider.clone()]);
    let snapshot = snapshot();

    let summary = ChatSession::new(&chain, &snapshot)
        .run(ChatInput::from_reader("first?\nsecond?\nq\n".as_bytes()), pending())
        .await;

    assert_eq!(summary.failed, 2);
    assert_eq!(summary.answered, 0);
    assert_eq!(provider.calls(), 2);
}

#[tokio::test]
async fn read_error_ends_chat_as_one_failure() {
    let provider = CountingProvider::replying("cloudflare", "unused");
    let chain = chain_of(vec![provider.clone()]);
    let snapshot = snapshot();

    let summary = ChatSession::new(&chain, &snapshot)
        .run(ChatInput::from_reader(BufReader::new(BrokenTerminal)), pending())
        .await;

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.answered, 0);
    assert!(!summary.interrupted);
    assert_eq!(provider.calls(), 0);
}

#[test]
fn interrupted_chat_does_not_block_runtime_shutdown() {
    let provider = CountingProvider::replying("cloudflare", "unused");
    let chain = chain_of(vec![provider.clone()]);
    let snapshot = snapshot();
    let (keep_blocked, blocked) = mpsc::channel::<()>();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap();
    let interrupt = {
        let _guard = runtime.enter();
        tokio::time::sleep(Duration::from_millis(50))
    };
    let summary = runtime.block_on(
        ChatSession::new(&chain, &snapshot).run(
            ChatInput::from_reader(BufReader::new(IdleTerminal(blocked))),
            interrupt,
        ),
    );
    assert!(summary.interrupted);
    assert_eq!(provider.calls(), 0);

    let (done_tx, done_rx) = mpsc::channel();
    std::thread::spawn(move || {
        drop(runtime);
        let _ = done_tx.send(());
    });
    assert!(
        done_rx.recv_timeout(Duration::from_secs(5)).is_ok(),
        "runtime shutdown waited on a pending chat read"
    );
    drop(keep_blocked);
}

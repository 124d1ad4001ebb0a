use std::io::{BufRead, BufReader};
use std::net::TcpStream;
use std::sync::mpsc::{Sender, TryRecvError};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::logger;
use crate::state::SyncEvent;

const RECONNECT_DELAY: Duration = Duration::from_secs(2);
const ENGINE_LOG_PATH: &str = "logs/engine.log";

/// Messages the engine listener sends to the UI thread.
#[derive(Debug)]
pub enum EngineMessage {
    Status(String),
    Connected(bool),
    Event(SyncEvent),
}

/// Control messages from the UI thread to the listener.
#[derive(Debug)]
pub enum ListenerMessage {
    Shutdown,
}

/// Spawns the listener thread that streams [`SyncEvent`]s from the sync
/// daemon's local socket. The daemon speaks newline-delimited JSON; each line
/// is one event. The thread reconnects until told to shut down.
pub fn start_listener(
    daemon_addr: String,
    ui_tx: Sender<EngineMessage>,
    control_rx: std::sync::mpsc::Receiver<ListenerMessage>,
) -> thread::JoinHandle<()> {
    thread::Builder::new()
        .name("loftsync-engine-listener".to_string())
        .spawn(move || listener_loop(daemon_addr, ui_tx, control_rx))
        .unwrap_or_else(|err| {
            logger::log_line(ENGINE_LOG_PATH, &format!("Failed to spawn listener: {err}"));
            thread::spawn(|| {})
        })
}

fn listener_loop(
    daemon_addr: String,
    ui_tx: Sender<EngineMessage>,
    control_rx: std::sync::mpsc::Receiver<ListenerMessage>,
) {
    loop {
        match control_rx.try_recv() {
            Ok(ListenerMessage::Shutdown) | Err(TryRecvError::Disconnected) => return,
            Err(TryRecvError::Empty) => {}
        }

        let _ = ui_tx.send(EngineMessage::Status(format!(
            "Connecting to sync daemon at {daemon_addr}..."
        )));

        match stream_events(&daemon_addr, &ui_tx, &control_rx) {
            Ok(ShutdownReason::Requested) => return,
            Ok(ShutdownReason::StreamEnded) => {
                let _ = ui_tx.send(EngineMessage::Connected(false));
                let _ = ui_tx.send(EngineMessage::Status("Sync daemon closed the stream".into()));
            }
            Err(err) => {
                let _ = ui_tx.send(EngineMessage::Connected(false));
                let _ = ui_tx.send(EngineMessage::Status(format!("Sync daemon: {err:#}")));
                logger::log_line(ENGINE_LOG_PATH, &format!("Listener error: {err:#}"));
            }
        }

        // UI thread gone means nothing left to feed.
        if ui_tx.send(EngineMessage::Status("Reconnecting...".into())).is_err() {
            return;
        }
        thread::sleep(RECONNECT_DELAY);
    }
}

enum ShutdownReason {
    Requested,
    StreamEnded,
}

fn stream_events(
    daemon_addr: &str,
    ui_tx: &Sender<EngineMessage>,
    control_rx: &std::sync::mpsc::Receiver<ListenerMessage>,
) -> Result<ShutdownReason> {
    let stream = TcpStream::connect(daemon_addr)
        .with_context(|| format!("connect to {daemon_addr}"))?;
    stream
        .set_read_timeout(Some(Duration::from_millis(500)))
        .context("set read timeout")?;

    let _ = ui_tx.send(EngineMessage::Connected(true));
    let _ = ui_tx.send(EngineMessage::Status("Connected to sync daemon".into()));

    read_events(&mut BufReader::new(stream), ui_tx, control_rx)
}

fn read_events<R: BufRead>(
    reader: &mut R,
    ui_tx: &Sender<EngineMessage>,
    control_rx: &std::sync::mpsc::Receiver<ListenerMessage>,
) -> Result<ShutdownReason> {
    let mut line = String::new();
    loop {
        match control_rx.try_recv() {
            Ok(ListenerMessage::Shutdown) | Err(TryRecvError::Disconnected) => {
                return Ok(ShutdownReason::Requested);
            }
            Err(TryRecvError::Empty) => {}
        }

        match reader.read_line(&mut line) {
            Ok(0) => return Ok(ShutdownReason::StreamEnded),
            Ok(_) => {
                let trimmed = line.trim();
                if !trimmed.is_empty() {
                    match serde_json::from_str::<SyncEvent>(trimmed) {
                        Ok(event) => {
                            if ui_tx.send(EngineMessage::Event(event)).is_err() {
                                return Ok(ShutdownReason::Requested);
                            }
                        }
                        Err(err) => {
                            // A malformed line is the daemon's bug, not fatal here.
                            logger::log_line(
                                ENGINE_LOG_PATH,
                                &format!("Dropped malformed event: {err}: {trimmed}"),
                            );
                        }
                    }
                }
                line.clear();
            }
            Err(err)
                if err.kind() == std::io::ErrorKind::WouldBlock
                    || err.kind() == std::io::ErrorKind::TimedOut =>
            {
                // A timed-out read may have consumed a partial line into the
                // buffer; keep it and pick up the tail on the next pass.
                continue;
            }
            Err(err) => return Err(err).context("read event stream"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::io::{self, Read};
    use std::sync::mpsc;

    use super::*;

    /// A stream that yields data in fixed chunks, interleaved with read
    /// timeouts, the way a slow socket does.
    struct ChunkedStream {
        chunks: VecDeque<io::Result<Vec<u8>>>,
    }

    impl Read for ChunkedStream {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.chunks.pop_front() {
                Some(Ok(bytes)) => {
                    buf[..bytes.len()].copy_from_slice(&bytes);
                    Ok(bytes.len())
                }
                Some(Err(err)) => Err(err),
                None => Ok(0),
            }
        }
    }

    #[test]
    fn line_split_across_read_timeout_still_decodes() {
        let stream = ChunkedStream {
            chunks: VecDeque::from([
                Ok(br#"{"event":"user"#.to_vec()),
                Err(io::Error::new(io::ErrorKind::WouldBlock, "timed out")),
                Ok(br#"name","username":"alice"}"#.to_vec()),
                Ok(b"\n".to_vec()),
            ]),
        };
        let (ui_tx, ui_rx) = mpsc::channel();
        let (_ctl_tx, ctl_rx) = mpsc::channel();

        let reason = read_events(&mut BufReader::new(stream), &ui_tx, &ctl_rx).unwrap();
        assert!(matches!(reason, ShutdownReason::StreamEnded));

        let msg = ui_rx.try_recv().unwrap();
        match msg {
            EngineMessage::Event(SyncEvent::Username { username }) => {
                assert_eq!(username, "alice");
            }
            other => panic!("expected username event, got {other:?}"),
        }
    }
}

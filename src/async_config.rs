use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use crate::config::AppConfig;

const DEBOUNCE: Duration = Duration::from_millis(300);

/// Writes config changes on a background thread so the UI never waits on
/// disk. Rapid updates within the debounce window collapse into one write;
/// `flush` forces any pending write before shutdown.
pub struct ConfigSaver {
    tx: Option<mpsc::Sender<Request>>,
    handle: Option<thread::JoinHandle<()>>,
}

enum Request {
    Save(Box<AppConfig>),
    Flush(mpsc::Sender<()>),
}

impl ConfigSaver {
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::channel::<Request>();
        let handle = thread::Builder::new()
            .name("loftsync-config-saver".to_string())
            .spawn(move || run(rx))
            .ok();
        Self {
            tx: Some(tx),
            handle,
        }
    }

    /// Queue a save; returns immediately.
    pub fn request_save(&self, cfg: AppConfig) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(Request::Save(Box::new(cfg)));
        }
    }

    /// Write any pending config and wait for the write, bounded by `timeout`.
    pub fn flush(&self, timeout: Duration) {
        let Some(tx) = &self.tx else {
            return;
        };
        let (done_tx, done_rx) = mpsc::channel::<()>();
        if tx.send(Request::Flush(done_tx)).is_ok() {
            let _ = done_rx.recv_timeout(timeout);
        }
    }
}

impl Drop for ConfigSaver {
    fn drop(&mut self) {
        // Closing the channel ends the worker loop; it writes anything still
        // pending on the way out.
        self.tx = None;
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn run(rx: mpsc::Receiver<Request>) {
    let mut pending: Option<Box<AppConfig>> = None;
    let mut deadline: Option<Instant> = None;

    loop {
        let request = match deadline {
            Some(at) => {
                let wait = at.saturating_duration_since(Instant::now());
                match rx.recv_timeout(wait) {
                    Ok(request) => Some(request),
                    Err(RecvTimeoutError::Timeout) => None,
                    Err(RecvTimeoutError::Disconnected) => {
                        write_pending(&mut pending);
                        return;
                    }
                }
            }
            None => match rx.recv() {
                Ok(request) => Some(request),
                Err(_) => return,
            },
        };

        match request {
            Some(Request::Save(cfg)) => {
                pending = Some(cfg);
                deadline.get_or_insert_with(|| Instant::now() + DEBOUNCE);
            }
            Some(Request::Flush(done)) => {
                write_pending(&mut pending);
                deadline = None;
                let _ = done.send(());
            }
            None => {
                // Debounce window elapsed.
                write_pending(&mut pending);
                deadline = None;
            }
        }
    }
}

fn write_pending(pending: &mut Option<Box<AppConfig>>) {
    if let Some(cfg) = pending.take() {
        crate::config::save(&cfg);
    }
}

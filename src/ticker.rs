use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Shortest interval accepted for the refresh tick
pub const MIN_TICK_MS: u64 = 50;

/// Get tick duration, clamped to a sane minimum
pub fn tick_duration(tick_ms: u64) -> Duration {
    Duration::from_millis(tick_ms.max(MIN_TICK_MS))
}

/// Background thread emitting a unit message every interval.
///
/// The thread exits when the ticker is stopped or dropped, or when the
/// receiving side hangs up.
pub struct Ticker {
    receiver: Receiver<()>,
    stopped: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Ticker {
    pub fn spawn(interval: Duration) -> Self {
        let (sender, receiver) = mpsc::channel();
        let stopped = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stopped);

        let handle = thread::spawn(move || {
            while !flag.load(Ordering::Relaxed) {
                thread::sleep(interval);
                if flag.load(Ordering::Relaxed) || sender.send(()).is_err() {
                    break;
                }
            }
            tracing::trace!("ticker thread finished");
        });

        Self {
            receiver,
            stopped,
            handle: Some(handle),
        }
    }

    /// Block until the next tick. Returns `false` once the ticker is gone.
    pub fn wait(&self) -> bool {
        self.receiver.recv().is_ok()
    }

    /// Wait for a tick, giving up after `timeout`
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        match self.receiver.recv_timeout(timeout) {
            Ok(()) => true,
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => false,
        }
    }

    pub fn stop(&mut self) {
        self.stopped.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.stop();
    }
}

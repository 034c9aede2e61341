//! Build log shared between strategies, the orchestrator and observers
//!
//! The text is append-only until explicitly cleared. Every line is also
//! broadcast to live subscribers and mirrored to `tracing` at debug level.

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Capacity of the live broadcast; slow subscribers see `Lagged` and skip ahead
const LIVE_CAPACITY: usize = 1024;

#[derive(Clone)]
pub struct LogSink {
    text: Arc<Mutex<String>>,
    live: broadcast::Sender<String>,
}

impl LogSink {
    pub fn new() -> Self {
        let (live, _) = broadcast::channel(LIVE_CAPACITY);
        Self {
            text: Arc::new(Mutex::new(String::new())),
            live,
        }
    }

    /// Append one line
    pub fn line(&self, line: impl Into<String>) {
        let line = line.into();
        tracing::debug!(target: "bento::build_log", "{}", line);

        {
            let mut text = self.text.lock();
            text.push_str(&line);
            text.push('\n');
        }

        // No subscribers is fine
        let _ = self.live.send(line);
    }

    /// Accumulated text since creation or the last `clear`
    pub fn text(&self) -> String {
        self.text.lock().clone()
    }

    pub fn clear(&self) {
        self.text.lock().clear();
    }

    /// Receive lines appended from now on
    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.live.subscribe()
    }
}

impl Default for LogSink {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for LogSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogSink")
            .field("len", &self.text.lock().len())
            .finish()
    }
}

//! Upload progress: a byte counter shared with the request body stream and a
//! reporter task that redraws a single stderr line at a fixed interval.

use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::format::format_bytes;

/// Redraw interval of the progress line.
pub const PROGRESS_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone)]
pub struct UploadProgress {
    total: u64,
    sent: Arc<AtomicU64>,
}

impl UploadProgress {
    pub fn new(total: u64) -> Self {
        UploadProgress {
            total,
            sent: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn add(&self, n: u64) {
        self.sent.fetch_add(n, Ordering::Relaxed);
    }

    pub fn sent(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }

    /// Fraction in `0.0..=1.0`; an empty file counts as complete.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        (self.sent() as f64 / self.total as f64).min(1.0)
    }

    pub fn percent(&self) -> f64 {
        (self.fraction() * 1000.0).round() / 10.0
    }

    pub fn line(&self, name: &str) -> String {
        format!(
            "Uploading {}: {:.1}% ({} / {})",
            name,
            self.percent(),
            format_bytes(self.sent(), 2),
            format_bytes(self.total, 2)
        )
    }

    /// Starts redrawing the progress line until [`Reporter::finish`] is called.
    pub fn spawn_reporter(&self, name: &str, interval: Duration) -> Reporter {
        let stop = Arc::new(AtomicBool::new(false));
        let progress = self.clone();
        let name = name.to_string();
        let task_stop = stop.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            while !task_stop.load(Ordering::Relaxed) {
                ticker.tick().await;
                let mut err = std::io::stderr();
                let _ = write!(err, "\r{}", progress.line(&name));
                let _ = err.flush();
            }
        });

        Reporter { stop, handle }
    }
}

pub struct Reporter {
    stop: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl Reporter {
    /// Stops the reporter and clears the progress line.
    pub async fn finish(self) {
        self.stop.store(true, Ordering::Relaxed);
        let _ = self.handle.await;
        let mut err = std::io::stderr();
        let _ = write!(err, "\r\x1b[2K");
        let _ = err.flush();
    }
}

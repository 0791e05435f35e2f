//! Elapsed-time guard

use std::time::{Duration, Instant};

use tracing::info;

/// Logs how long a scope took when it ends
///
/// ```rust,ignore
/// let timer = ScopedTimer::new("log_data");
/// // ... work ...
/// let elapsed = timer.stop(); // or let it drop
/// ```
#[derive(Debug)]
pub struct ScopedTimer {
    label: String,
    start: Instant,
    stopped: bool,
}

impl ScopedTimer {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            start: Instant::now(),
            stopped: false,
        }
    }

    /// Time since the timer started
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Log and return the elapsed time; nothing is logged on drop afterwards
    pub fn stop(mut self) -> Duration {
        let elapsed = self.elapsed();
        self.log(elapsed);
        self.stopped = true;
        elapsed
    }

    fn log(&self, elapsed: Duration) {
        info!(
            label = %self.label,
            duration_ms = elapsed.as_millis() as u64,
            "{} finished in {:.3}s",
            self.label,
            elapsed.as_secs_f64()
        );
    }
}

impl Drop for ScopedTimer {
    fn drop(&mut self) {
        if !self.stopped {
            self.log(self.elapsed());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_returns_elapsed() {
        let timer = ScopedTimer::new("pass");
        std::thread::sleep(Duration::from_millis(5));
        let elapsed = timer.stop();
        assert!(elapsed >= Duration::from_millis(5));
    }

    #[test]
    fn test_elapsed_is_monotonic() {
        let timer = ScopedTimer::new("pass");
        let first = timer.elapsed();
        let second = timer.elapsed();
        assert!(second >= first);
    }
}

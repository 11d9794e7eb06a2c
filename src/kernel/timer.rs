use tokio::time::Instant;

/// Stopwatch backing a timer field, counting hundredths of a second.
///
/// Time accumulates across start/stop cycles. The state tree only sees the
/// value returned by [`stop`](FieldTimer::stop) or [`reset`](FieldTimer::reset);
/// the running reading is for display.
#[derive(Debug, Clone, Default)]
pub struct FieldTimer {
    accumulated: u64,
    running_since: Option<Instant>,
}

impl FieldTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume from a previously committed reading.
    pub fn resume_from(hundredths: u64) -> Self {
        Self {
            accumulated: hundredths,
            running_since: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running_since.is_some()
    }

    /// No-op while already running.
    pub fn start(&mut self) {
        if self.running_since.is_none() {
            self.running_since = Some(Instant::now());
        }
    }

    /// Pause and return the reading to commit.
    pub fn stop(&mut self) -> u64 {
        if let Some(since) = self.running_since.take() {
            self.accumulated += hundredths_since(since);
        }
        self.accumulated
    }

    /// Stop and zero. Returns the reading to commit (always 0).
    pub fn reset(&mut self) -> u64 {
        self.running_since = None;
        self.accumulated = 0;
        0
    }

    /// Current reading including the running stretch.
    pub fn elapsed(&self) -> u64 {
        self.accumulated + self.running_since.map_or(0, hundredths_since)
    }
}

fn hundredths_since(since: Instant) -> u64 {
    (since.elapsed().as_millis() / 10) as u64
}

/// `1234` → `"12.34"`.
pub fn format_hundredths(hundredths: u64) -> String {
    format!("{}.{:02}", hundredths / 100, hundredths % 100)
}

//! Phase timing
//!
//! Records how long each stage of a run took.

use std::time::{Duration, Instant};

/// Stopwatch with lap timing
#[derive(Debug)]
pub struct Stopwatch {
    start: Instant,
    last: Instant,
    laps: Vec<(String, Duration)>,
}

impl Stopwatch {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            start: now,
            last: now,
            laps: Vec::new(),
        }
    }

    /// Close the current lap under `label`
    pub fn lap(&mut self, label: impl Into<String>) -> Duration {
        let now = Instant::now();
        let lap = now - self.last;
        self.last = now;

        let label = label.into();
        tracing::debug!("{}: {}ms", label, lap.as_millis());
        self.laps.push((label, lap));
        lap
    }

    /// Get total elapsed time
    pub fn total(&self) -> Duration {
        self.start.elapsed()
    }

    /// Laps in milliseconds, for serialization
    pub fn laps_ms(&self) -> Vec<(String, u64)> {
        self.laps
            .iter()
            .map(|(label, d)| (label.clone(), d.as_millis() as u64))
            .collect()
    }

    /// Format laps as string
    pub fn format(&self) -> String {
        let mut output = String::new();
        for (label, duration) in &self.laps {
            output.push_str(&format!("{}: {}ms\n", label, duration.as_millis()));
        }
        output.push_str(&format!("Total: {}ms", self.total().as_millis()));
        output
    }
}

impl Default for Stopwatch {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_stopwatch_laps_are_not_cumulative() {
        let mut sw = Stopwatch::new();
        sleep(Duration::from_millis(10));
        let first = sw.lap("fixtures");
        sleep(Duration::from_millis(10));
        let second = sw.lap("tests");

        assert!(first >= Duration::from_millis(10));
        assert!(second >= Duration::from_millis(10));
        assert!(sw.total() >= first + second);
        assert_eq!(sw.laps_ms().len(), 2);
        assert_eq!(sw.laps_ms()[1].0, "tests");
    }

    #[test]
    fn test_format_lists_laps_and_total() {
        let mut sw = Stopwatch::new();
        sw.lap("fixtures");
        let text = sw.format();
        assert!(text.starts_with("fixtures: "));
        assert!(text.contains("Total: "));
    }
}

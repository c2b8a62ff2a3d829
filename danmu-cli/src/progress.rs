//! Progress reporting with ETA estimation

use std::time::Instant;
use tracing::info;

/// Counts finished units of work and logs progress with an ETA
pub struct ProgressTracker {
    total: u64,
    processed: u64,
    start_time: Instant,
    label: &'static str,
}

impl ProgressTracker {
    pub fn new(total: u64, label: &'static str) -> Self {
        Self {
            total,
            processed: 0,
            start_time: Instant::now(),
            label,
        }
    }

    /// Counts one unit and logs every `report_interval` units and at the end
    pub fn increment_and_report(&mut self, report_interval: u64) {
        self.processed += 1;
        if self.processed % report_interval.max(1) == 0 || self.processed == self.total {
            self.report();
        }
    }

    fn report(&self) {
        let current = self.processed;
        let elapsed_secs = self.start_time.elapsed().as_secs_f64();

        if current < self.total {
            let percent = current as f64 / self.total as f64 * 100.0;
            let eta = eta_secs(current, self.total, elapsed_secs)
                .map(format_duration)
                .unwrap_or_else(|| "unknown".to_string());
            info!(
                "{} {}/{} ({:.1}%) - elapsed: {} - ETA: {}",
                self.label,
                current,
                self.total,
                percent,
                format_duration(elapsed_secs),
                eta,
            );
        } else {
            info!(
                "{} {}/{} (100.0%) - completed in {}",
                self.label,
                current,
                self.total,
                format_duration(elapsed_secs),
            );
        }
    }
}

/// Seconds left at the average rate so far
fn eta_secs(current: u64, total: u64, elapsed_secs: f64) -> Option<f64> {
    if current == 0 || elapsed_secs <= 0.0 {
        return None;
    }
    let rate = current as f64 / elapsed_secs;
    Some(total.saturating_sub(current) as f64 / rate)
}

/// Formats seconds as `12.3s`, `2m05s` or `1h02m05s`
fn format_duration(secs: f64) -> String {
    if secs < 60.0 {
        return format!("{:.1}s", secs);
    }
    let total = secs.round() as u64;
    let (hours, mins, secs) = (total / 3600, total / 60 % 60, total % 60);
    if hours == 0 {
        format!("{}m{:02}s", mins, secs)
    } else {
        format!("{}h{:02}m{:02}s", hours, mins, secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(12.34), "12.3s");
        assert_eq!(format_duration(125.0), "2m05s");
        assert_eq!(format_duration(3725.0), "1h02m05s");
        assert_eq!(format_duration(119.6), "2m00s");
    }

    #[test]
    fn test_eta() {
        assert_eq!(eta_secs(0, 10, 5.0), None);
        assert_eq!(eta_secs(5, 10, 5.0), Some(5.0));
        assert_eq!(eta_secs(10, 10, 5.0), Some(0.0));
    }

    #[test]
    fn test_counts_units() {
        let mut tracker = ProgressTracker::new(3, "Rendered");
        for _ in 0..3 {
            tracker.increment_and_report(2);
        }
        assert_eq!(tracker.processed, 3);
    }
}

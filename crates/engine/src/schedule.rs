//! Advisory countdown to the next root publication.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Time until `last_published_at + cadence_secs`, clamped to zero.
pub fn next_publication_estimate(last_published_at: u64, cadence_secs: u64, now: u64) -> Duration {
    let due = last_published_at.saturating_add(cadence_secs);
    Duration::from_secs(due.saturating_sub(now))
}

/// `"due now"` for zero, otherwise `"{d}d {hh}h {mm}m {ss}s"` with the day
/// part left out when it is zero.
pub fn format_countdown(remaining: Duration) -> String {
    let total = remaining.as_secs();
    if total == 0 {
        return "due now".to_string();
    }

    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    let seconds = total % 60;

    if days > 0 {
        format!("{days}d {hours:02}h {minutes:02}m {seconds:02}s")
    } else {
        format!("{hours:02}h {minutes:02}m {seconds:02}s")
    }
}

/// Publication cadence bound to the wall clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublicationScheduler {
    cadence_secs: u64,
}

impl PublicationScheduler {
    pub fn new(cadence_secs: u64) -> Self {
        Self { cadence_secs }
    }

    pub fn cadence_secs(&self) -> u64 {
        self.cadence_secs
    }

    pub fn estimate_at(&self, last_published_at: u64, now: u64) -> Duration {
        next_publication_estimate(last_published_at, self.cadence_secs, now)
    }

    /// Estimate against the current system time.
    pub fn estimate(&self, last_published_at: u64) -> Duration {
        self.estimate_at(last_published_at, unix_now())
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY: u64 = 86_400;

    #[test]
    fn test_estimate_before_due() {
        let estimate = next_publication_estimate(1_000, 7 * DAY, 1_000 + DAY);
        assert_eq!(estimate, Duration::from_secs(6 * DAY));
    }

    #[test]
    fn test_estimate_clamped_when_elapsed() {
        assert_eq!(next_publication_estimate(1_000, 60, 5_000), Duration::ZERO);
        assert_eq!(next_publication_estimate(1_000, 60, 1_060), Duration::ZERO);
    }

    #[test]
    fn test_estimate_saturates() {
        let estimate = next_publication_estimate(u64::MAX - 1, 100, 0);
        assert_eq!(estimate, Duration::from_secs(u64::MAX));
    }

    #[test]
    fn test_format_countdown() {
        assert_eq!(format_countdown(Duration::ZERO), "due now");
        assert_eq!(format_countdown(Duration::from_secs(59)), "00h 00m 59s");
        assert_eq!(format_countdown(Duration::from_secs(3_661)), "01h 01m 01s");
        assert_eq!(
            format_countdown(Duration::from_secs(2 * DAY + 5 * 3_600 + 7)),
            "2d 05h 00m 07s"
        );
    }

    #[test]
    fn test_format_ignores_subsecond() {
        assert_eq!(format_countdown(Duration::from_millis(400)), "due now");
    }

    #[test]
    fn test_scheduler() {
        let scheduler = PublicationScheduler::new(DAY);
        assert_eq!(scheduler.estimate_at(0, DAY / 2), Duration::from_secs(DAY / 2));
        assert_eq!(scheduler.estimate(0), Duration::ZERO);
    }
}

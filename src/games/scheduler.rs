use std::time::Duration;

/// Most wall time a single frame may carry into the simulation. Anything
/// beyond it (a suspended process, a stalled terminal) is dropped.
pub const MAX_CATCH_UP: Duration = Duration::from_secs(2);

/// Fixed-period accumulator. The period is passed on every call because some
/// engines ramp their speed with the score.
#[derive(Debug, Default)]
pub struct TickScheduler {
    accumulator: Duration,
}

impl TickScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `elapsed` wall time and return how many ticks are now due.
    pub fn advance(&mut self, elapsed: Duration, period: Duration) -> u32 {
        if period.is_zero() {
            return 0;
        }
        self.accumulator = (self.accumulator + elapsed).min(MAX_CATCH_UP);
        let due = u32::try_from(self.accumulator.as_nanos() / period.as_nanos()).unwrap_or(u32::MAX);
        self.accumulator = self.accumulator.saturating_sub(period.saturating_mul(due));
        due
    }
}

/// Pre-play countdown shown as whole seconds.
#[derive(Debug)]
pub struct Countdown {
    remaining: Duration,
}

impl Countdown {
    pub fn new(total: Duration) -> Self {
        Self { remaining: total }
    }

    /// Returns true once the countdown has run out.
    pub fn advance(&mut self, elapsed: Duration) -> bool {
        self.remaining = self.remaining.saturating_sub(elapsed);
        self.is_done()
    }

    pub fn is_done(&self) -> bool {
        self.remaining.is_zero()
    }

    pub fn seconds_left(&self) -> u64 {
        let secs = self.remaining.as_secs();
        if self.remaining.subsec_nanos() > 0 {
            secs + 1
        } else {
            secs
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticks_accumulate_across_frames() {
        let mut sched = TickScheduler::new();
        let period = Duration::from_millis(100);
        assert_eq!(sched.advance(Duration::from_millis(60), period), 0);
        assert_eq!(sched.advance(Duration::from_millis(60), period), 1);
        assert_eq!(sched.advance(Duration::from_millis(180), period), 2);
    }

    #[test]
    fn test_slow_frames_keep_full_rate() {
        let mut sched = TickScheduler::new();
        let period = Duration::from_millis(16);
        let total: u32 = (0..10).map(|_| sched.advance(Duration::from_millis(200), period)).sum();
        assert_eq!(total, 125);

        let mut sched = TickScheduler::new();
        let period = Duration::from_millis(100);
        let total: u32 = (0..3).map(|_| sched.advance(Duration::from_secs(1), period)).sum();
        assert_eq!(total, 30);
    }

    #[test]
    fn test_backlog_is_capped() {
        let mut sched = TickScheduler::new();
        let period = Duration::from_millis(10);
        assert_eq!(sched.advance(Duration::from_secs(5), period), 200);
        assert_eq!(sched.advance(Duration::from_millis(5), period), 0);
    }

    #[test]
    fn test_countdown_rounds_up() {
        let mut countdown = Countdown::new(Duration::from_secs(3));
        assert_eq!(countdown.seconds_left(), 3);
        assert!(!countdown.advance(Duration::from_millis(500)));
        assert_eq!(countdown.seconds_left(), 3);
        assert!(!countdown.advance(Duration::from_millis(1600)));
        assert_eq!(countdown.seconds_left(), 1);
        assert!(countdown.advance(Duration::from_secs(1)));
        assert_eq!(countdown.seconds_left(), 0);
    }

    #[test]
    fn test_zero_countdown_is_done() {
        assert!(Countdown::new(Duration::ZERO).is_done());
    }
}

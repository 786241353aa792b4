use std::time::Duration;

use tracing::trace;

/// Fixed pause between consecutive remote mutations.
#[derive(Debug)]
pub struct Pacer {
    delay: Duration,
    delay_before_first: bool,
    enabled: bool,
    issued: usize,
}

impl Pacer {
    pub fn new(delay: Duration, delay_before_first: bool) -> Self {
        Self {
            delay,
            delay_before_first,
            enabled: true,
            issued: 0,
        }
    }

    /// A pacer that never sleeps; used for dry runs.
    pub fn disabled() -> Self {
        Self {
            delay: Duration::ZERO,
            delay_before_first: false,
            enabled: false,
            issued: 0,
        }
    }

    /// Await the pause owed before the next call, then count the call.
    pub async fn ready(&mut self) {
        let owed = self.owed();
        self.issued += 1;
        if !owed.is_zero() {
            trace!(delay_ms = owed.as_millis() as u64, "pacing remote call");
            tokio::time::sleep(owed).await;
        }
    }

    fn owed(&self) -> Duration {
        if !self.enabled || (self.issued == 0 && !self.delay_before_first) {
            Duration::ZERO
        } else {
            self.delay
        }
    }

    pub fn issued(&self) -> usize {
        self.issued
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_call_is_free_unless_requested() {
        let mut pacer = Pacer::new(Duration::from_millis(1000), false);
        assert_eq!(pacer.owed(), Duration::ZERO);
        pacer.issued = 1;
        assert_eq!(pacer.owed(), Duration::from_millis(1000));

        let pacer = Pacer::new(Duration::from_millis(1000), true);
        assert_eq!(pacer.owed(), Duration::from_millis(1000));
    }

    #[test]
    fn disabled_pacer_never_waits() {
        let mut pacer = Pacer::disabled();
        pacer.issued = 5;
        assert_eq!(pacer.owed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn waits_between_calls() {
        let mut pacer = Pacer::new(Duration::from_millis(30), false);
        let start = std::time::Instant::now();
        pacer.ready().await;
        assert!(start.elapsed() < Duration::from_millis(30));
        pacer.ready().await;
        assert!(start.elapsed() >= Duration::from_millis(30));
        assert_eq!(pacer.issued(), 2);
    }
}

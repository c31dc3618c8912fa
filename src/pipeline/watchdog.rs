use anyhow::{bail, Result};

/// Liveness deadline for the main loop. Missing it is fatal: the owner is
/// expected to throw the whole pipeline away and build a fresh one.
#[derive(Debug, Clone)]
pub struct Watchdog {
    timeout_ms: u64,
    last_feed_ms: Option<u64>,
}

impl Watchdog {
    pub fn new(timeout_ms: u64) -> Self {
        Self {
            timeout_ms,
            last_feed_ms: None,
        }
    }

    pub fn timeout_ms(&self) -> u64 {
        self.timeout_ms
    }

    pub fn feed(&mut self, now_ms: u64) {
        self.last_feed_ms = Some(now_ms);
    }

    pub fn check(&self, now_ms: u64) -> Result<()> {
        let Some(last) = self.last_feed_ms else {
            return Ok(());
        };
        let elapsed = now_ms.saturating_sub(last);
        if elapsed > self.timeout_ms {
            bail!(
                "watchdog expired: {elapsed} ms since last feed (timeout {} ms)",
                self.timeout_ms
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unfed_watchdog_never_fires() {
        assert!(Watchdog::new(100).check(1_000_000).is_ok());
    }

    #[test]
    fn expires_strictly_after_timeout() {
        let mut watchdog = Watchdog::new(100);
        watchdog.feed(50);
        assert!(watchdog.check(150).is_ok());
        assert!(watchdog.check(151).is_err());
        watchdog.feed(151);
        assert!(watchdog.check(200).is_ok());
    }
}

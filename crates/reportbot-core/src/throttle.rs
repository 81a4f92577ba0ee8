use std::{sync::Mutex, time::Duration};

use tokio::time::Instant;

/// Minimum-interval gate for the AI path.
///
/// `try_acquire` is a single check-and-set under one lock: concurrent handlers
/// cannot both observe an expired window and both pass.
#[derive(Debug)]
pub struct AiCooldown {
    interval: Duration,
    last_accepted: Mutex<Option<Instant>>,
}

impl AiCooldown {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_accepted: Mutex::new(None),
        }
    }

    pub fn try_acquire(&self) -> Result<(), Duration> {
        self.try_acquire_at(Instant::now())
    }

    /// Accept an invocation at `now`, or return how long until the gate reopens.
    pub fn try_acquire_at(&self, now: Instant) -> Result<(), Duration> {
        let mut last = self
            .last_accepted
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(prev) = *last {
            let elapsed = now.saturating_duration_since(prev);
            if elapsed < self.interval {
                return Err(self.interval - elapsed);
            }
        }

        *last = Some(now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn first_call_passes_then_gate_closes() {
        let gate = AiCooldown::new(Duration::from_secs(5));
        let t0 = Instant::now();
        assert!(gate.try_acquire_at(t0).is_ok());
        assert_eq!(
            gate.try_acquire_at(t0 + Duration::from_secs(1)),
            Err(Duration::from_secs(4))
        );
        assert!(gate.try_acquire_at(t0 + Duration::from_secs(5)).is_ok());
    }

    #[test]
    fn rejected_attempts_do_not_extend_the_window() {
        let gate = AiCooldown::new(Duration::from_secs(5));
        let t0 = Instant::now();
        gate.try_acquire_at(t0).unwrap();
        assert!(gate.try_acquire_at(t0 + Duration::from_secs(4)).is_err());
        assert!(gate.try_acquire_at(t0 + Duration::from_secs(5)).is_ok());
    }

    #[test]
    fn zero_interval_never_blocks() {
        let gate = AiCooldown::new(Duration::ZERO);
        let t0 = Instant::now();
        assert!(gate.try_acquire_at(t0).is_ok());
        assert!(gate.try_acquire_at(t0).is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_attempts_admit_exactly_one() {
        let gate = Arc::new(AiCooldown::new(Duration::from_secs(60)));
        let mut handles = Vec::new();
        for _ in 0..32 {
            let gate = gate.clone();
            handles.push(tokio::spawn(async move { gate.try_acquire().is_ok() }));
        }

        let mut admitted = 0;
        for h in handles {
            if h.await.unwrap() {
                admitted += 1;
            }
        }
        assert_eq!(admitted, 1);
    }
}

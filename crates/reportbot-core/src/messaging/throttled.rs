use std::{collections::HashMap, sync::Arc, time::Duration};

use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

use crate::{
    domain::SenderId,
    messaging::{
        port::MessagingPort,
        types::{MessagingCapabilities, OutboundMessage},
    },
    Result,
};

#[derive(Clone, Copy, Debug)]
pub struct ThrottleConfig {
    /// Minimum spacing between *any* outbound sends (global flood control).
    pub global_min_interval: Duration,
    /// Minimum spacing between sends to the same sender.
    pub per_sender_min_interval: Duration,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            global_min_interval: Duration::from_millis(40), // ~25/sec
            per_sender_min_interval: Duration::from_millis(1050), // ~0.95/sec
        }
    }
}

#[derive(Debug)]
struct IntervalLimiter {
    interval: Duration,
    next: Instant,
}

impl IntervalLimiter {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            next: Instant::now(),
        }
    }

    /// Reserve the next slot and return the wait duration required before executing.
    fn reserve(&mut self) -> Duration {
        let now = Instant::now();
        let start = if now >= self.next { now } else { self.next };
        self.next = start + self.interval;
        start.saturating_duration_since(now)
    }
}

/// MessagingPort decorator that spaces out outbound sends.
///
/// Replies are bursty (a report plus an AI answer can land within the same second);
/// this keeps the bot under the network's flood limits instead of collecting 429s.
pub struct ThrottledMessenger {
    inner: Arc<dyn MessagingPort>,
    cfg: ThrottleConfig,
    global: Mutex<IntervalLimiter>,
    per_sender: Mutex<HashMap<SenderId, Arc<Mutex<IntervalLimiter>>>>,
}

impl ThrottledMessenger {
    pub fn new(inner: Arc<dyn MessagingPort>, cfg: ThrottleConfig) -> Self {
        Self {
            inner,
            cfg,
            global: Mutex::new(IntervalLimiter::new(cfg.global_min_interval)),
            per_sender: Mutex::new(HashMap::new()),
        }
    }

    async fn limiter_for(&self, sender: &SenderId) -> Arc<Mutex<IntervalLimiter>> {
        let mut map = self.per_sender.lock().await;
        if !map.contains_key(sender) {
            prune_idle(&mut map, Instant::now());
        }
        map.entry(sender.clone())
            .or_insert_with(|| {
                Arc::new(Mutex::new(IntervalLimiter::new(
                    self.cfg.per_sender_min_interval,
                )))
            })
            .clone()
    }

    async fn throttle(&self, sender: &SenderId) {
        let global_wait = { self.global.lock().await.reserve() };
        let sender_wait = {
            let lim = self.limiter_for(sender).await;
            let mut guard = lim.lock().await;
            guard.reserve()
        };

        let wait = global_wait.max(sender_wait);
        if !wait.is_zero() {
            sleep(wait).await;
        }
    }
}

/// Drop limiters whose next slot is already in the past; they would not delay anything.
fn prune_idle(map: &mut HashMap<SenderId, Arc<Mutex<IntervalLimiter>>>, now: Instant) {
    map.retain(|_, lim| {
        if Arc::strong_count(lim) > 1 {
            return true;
        }
        match lim.try_lock() {
            Ok(guard) => guard.next > now,
            Err(_) => true,
        }
    });
}

#[async_trait::async_trait]
impl MessagingPort for ThrottledMessenger {
    fn capabilities(&self) -> MessagingCapabilities {
        self.inner.capabilities()
    }

    async fn send(&self, to: &SenderId, message: OutboundMessage) -> Result<()> {
        self.throttle(to).await;
        self.inner.send(to, message).await
    }
}

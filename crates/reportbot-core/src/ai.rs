//! Generative-AI fallback for messages that are not report commands.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::{
    config::CooldownPolicy,
    errors::Error,
    messaging::types::OutboundMessage,
    replies::Outcome,
    throttle::AiCooldown,
    utils::{preview, with_timeout},
    Result,
};

/// Hexagonal port for a text-generation backend.
///
/// Implementations must report provider-side throttling as `Error::RateLimited`
/// so users get a distinct message for it.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

pub struct AiResponder {
    client: Arc<dyn InferenceClient>,
    cooldown: AiCooldown,
    policy: CooldownPolicy,
    timeout: Duration,
}

impl AiResponder {
    pub fn new(
        client: Arc<dyn InferenceClient>,
        cooldown: Duration,
        policy: CooldownPolicy,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            cooldown: AiCooldown::new(cooldown),
            policy,
            timeout,
        }
    }

    /// Answer `text` (raw, as the user typed it), subject to the cooldown gate.
    pub async fn respond(&self, text: &str) -> Outcome {
        // Claimed before the call; the interval runs from here.
        if let Err(retry_in) = self.cooldown.try_acquire() {
            debug!(retry_in_ms = retry_in.as_millis() as u64, "ai cooldown active");
            return match self.policy {
                CooldownPolicy::Notify => Outcome::CoolingDown { retry_in },
                CooldownPolicy::Drop => Outcome::Dropped,
            };
        }

        info!(prompt = %preview(text, 80), "ai query");
        match with_timeout(self.timeout, self.client.generate(text)).await {
            Ok(reply) if !reply.trim().is_empty() => Outcome::Reply(OutboundMessage::Text(reply)),
            Ok(_) => {
                warn!("ai returned an empty completion");
                Outcome::Failed
            }
            Err(Error::RateLimited(detail)) => {
                warn!(%detail, "ai provider rate limited");
                Outcome::RateLimited
            }
            Err(e) => {
                warn!(error = %e, "ai query failed");
                Outcome::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeInference {
        calls: AtomicUsize,
        reply: fn(&str) -> Result<String>,
    }

    impl FakeInference {
        fn new(reply: fn(&str) -> Result<String>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                reply,
            })
        }
    }

    #[async_trait]
    impl InferenceClient for FakeInference {
        async fn generate(&self, prompt: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.reply)(prompt)
        }
    }

    fn responder(client: Arc<FakeInference>, policy: CooldownPolicy) -> AiResponder {
        AiResponder::new(
            client,
            Duration::from_secs(5),
            policy,
            Duration::from_secs(10),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn forwards_raw_text_and_relays_completion() {
        let client = FakeInference::new(|p| Ok(format!("echo: {p}")));
        let out = responder(client.clone(), CooldownPolicy::Drop)
            .respond("  Hello There ")
            .await;
        assert_eq!(
            out,
            Outcome::Reply(OutboundMessage::text("echo:   Hello There "))
        );
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn second_query_inside_cooldown_is_not_forwarded() {
        let client = FakeInference::new(|_| Ok("ok".to_string()));
        let ai = responder(client.clone(), CooldownPolicy::Notify);

        assert!(matches!(ai.respond("one").await, Outcome::Reply(_)));
        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(
            ai.respond("two").await,
            Outcome::CoolingDown {
                retry_in: Duration::from_secs(4)
            }
        );
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(4)).await;
        assert!(matches!(ai.respond("three").await, Outcome::Reply(_)));
        assert_eq!(client.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn drop_policy_is_silent() {
        let client = FakeInference::new(|_| Ok("ok".to_string()));
        let ai = responder(client.clone(), CooldownPolicy::Drop);
        ai.respond("one").await;
        assert_eq!(ai.respond("two").await, Outcome::Dropped);
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_is_distinguished_from_failure() {
        let limited = FakeInference::new(|_| Err(Error::RateLimited("429".to_string())));
        assert_eq!(
            responder(limited, CooldownPolicy::Drop).respond("q").await,
            Outcome::RateLimited
        );

        let broken = FakeInference::new(|_| Err(Error::External("boom".to_string())));
        assert_eq!(
            responder(broken, CooldownPolicy::Drop).respond("q").await,
            Outcome::Failed
        );

        let empty = FakeInference::new(|_| Ok("   ".to_string()));
        assert_eq!(
            responder(empty, CooldownPolicy::Drop).respond("q").await,
            Outcome::Failed
        );
    }
}

pub mod twilio;

use async_trait::async_trait;

/// Outbound text channel for booking notifications.
#[async_trait]
pub trait MessagingProvider: Send + Sync {
    async fn send_message(&self, to: &str, body: &str) -> anyhow::Result<()>;
}

/// Log-only provider used when no SMS credentials are configured.
pub struct NoopMessaging;

#[async_trait]
impl MessagingProvider for NoopMessaging {
    async fn send_message(&self, to: &str, body: &str) -> anyhow::Result<()> {
        tracing::debug!(to, body, "sms suppressed");
        Ok(())
    }
}

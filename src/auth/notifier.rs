use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a message to `to`. Delivery is best effort.
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()>;
}

/// Development notifier that writes outgoing mail to the log
pub struct LogNotifier {
    from: String,
}

impl LogNotifier {
    pub fn new(from: impl Into<String>) -> Self {
        Self { from: from.into() }
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        tracing::info!(from = %self.from, %to, %subject, %body, "mail");
        Ok(())
    }
}

/// Send without waiting. Failures are logged and never reach the caller.
pub fn dispatch(notifier: Arc<dyn Notifier>, to: String, subject: &'static str, body: String) {
    tokio::spawn(async move {
        if let Err(err) = notifier.send(&to, subject, &body).await {
            tracing::warn!(error = %err, %to, %subject, "notification not delivered");
        }
    });
}

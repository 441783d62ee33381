use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;

/// A fully assembled message ready to hand to a provider
#[derive(Debug, Clone)]
pub struct OutboundMessage {
    pub to: String,
    pub subject: String,
    pub text: Option<String>,
    pub html: Option<String>,
    pub charset: String,
}

/// Provider acknowledgment for a dispatched message
#[derive(Debug, Clone)]
pub struct SendOutcome {
    pub message_id: Option<String>,
    pub sent_at: DateTime<Utc>,
}

impl SendOutcome {
    pub fn new(message_id: Option<String>) -> Self {
        Self {
            message_id,
            sent_at: Utc::now(),
        }
    }
}

/// Trait for mail-sending providers
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MailProvider: Send + Sync {
    /// Hand one message to the provider
    async fn send(&self, message: &OutboundMessage) -> Result<SendOutcome>;

    /// Provider name, for logs
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_provider_send() {
        let mut mock = MockMailProvider::new();
        mock.expect_name().returning(|| "mock");
        mock.expect_send()
            .returning(|_| Ok(SendOutcome::new(Some("msg-123".to_string()))));

        assert_eq!(mock.name(), "mock");

        let message = OutboundMessage {
            to: "test@example.com".to_string(),
            subject: "Test".to_string(),
            text: None,
            html: Some("<p>Hello</p>".to_string()),
            charset: "UTF-8".to_string(),
        };
        let outcome = mock.send(&message).await.unwrap();
        assert_eq!(outcome.message_id.as_deref(), Some("msg-123"));
    }
}

use async_trait::async_trait;
use aws_sdk_sesv2::{
    config::Region,
    types::{Body, Content, Destination, EmailContent, Message},
    Client,
};
use tracing::info;

use crate::error::{MailError, Result};
use crate::provider::{MailProvider, OutboundMessage, SendOutcome};

/// AWS SES v2 mail provider.
///
/// Credentials come from the default AWS chain (IAM role, env vars, shared
/// config); only the region and the source address are supplied explicitly.
pub struct SesProvider {
    client: Client,
    source: String,
}

impl SesProvider {
    /// Loading the AWS configuration is async, hence the async constructor
    pub async fn new(region: impl Into<String>, source: impl Into<String>) -> Self {
        let sdk_config = aws_config::from_env()
            .region(Region::new(region.into()))
            .load()
            .await;

        Self {
            client: Client::new(&sdk_config),
            source: source.into(),
        }
    }

    fn content(data: &str, charset: &str) -> Result<Content> {
        Content::builder()
            .data(data)
            .charset(charset)
            .build()
            .map_err(|e| MailError::Provider(e.to_string()))
    }
}

#[async_trait]
impl MailProvider for SesProvider {
    async fn send(&self, message: &OutboundMessage) -> Result<SendOutcome> {
        let destination = Destination::builder().to_addresses(&message.to).build();

        let subject = Self::content(&message.subject, &message.charset)?;

        let mut body = Body::builder();
        if let Some(html) = &message.html {
            body = body.html(Self::content(html, &message.charset)?);
        }
        if let Some(text) = &message.text {
            body = body.text(Self::content(text, &message.charset)?);
        }

        let content = EmailContent::builder()
            .simple(
                Message::builder()
                    .subject(subject)
                    .body(body.build())
                    .build(),
            )
            .build();

        let response = self
            .client
            .send_email()
            .from_email_address(&self.source)
            .destination(destination)
            .content(content)
            .send()
            .await
            .map_err(|e| MailError::Provider(e.to_string()))?;

        info!(to = %message.to, "Message dispatched via SES");
        Ok(SendOutcome::new(response.message_id().map(str::to_string)))
    }

    fn name(&self) -> &'static str {
        "ses"
    }
}

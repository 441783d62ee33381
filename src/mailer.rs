use rand::Rng;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;
use validator::ValidateEmail;

use crate::config::MailConfig;
use crate::error::{MailError, Result};
use crate::limiter::{RateLimiter, GLOBAL_IDENTITY};
use crate::provider::{MailProvider, OutboundMessage, SendOutcome};
use crate::store::CounterStore;
use crate::template::TemplateStore;

const CONFIRMATION_PREFIX: &str = "confirmation";
const CONFIRMATION_TTL_SECS: u64 = 3600;
const CONFIRMATION_CODE_LEN: usize = 6;

/// Mail dispatch facade.
///
/// Validates the recipient address, gates every send on the shared
/// multi-window rate limiter, and hands the assembled message to the injected
/// provider. The store handle, provider and configuration are all supplied
/// explicitly at construction.
pub struct Mailer {
    store: Arc<dyn CounterStore>,
    provider: Box<dyn MailProvider>,
    templates: TemplateStore,
    limiter: RateLimiter,
    charset: String,
}

impl Mailer {
    pub fn new(
        store: Arc<dyn CounterStore>,
        provider: Box<dyn MailProvider>,
        config: &MailConfig,
    ) -> Result<Self> {
        let limiter = RateLimiter::new(store.clone(), GLOBAL_IDENTITY, config.limits.clone())?;

        Ok(Self {
            store,
            provider,
            templates: TemplateStore::new(&config.templates_dir),
            limiter,
            charset: config.charset.clone(),
        })
    }

    /// Send a plain message; HTML takes precedence when both bodies are given.
    ///
    /// The rate limiter is consulted (and consumed) before the body check, so
    /// a send that fails for lack of content has still used quota. A denied
    /// send surfaces as [`MailError::RateLimited`], distinct from address and
    /// provider failures.
    pub async fn send(
        &self,
        to: &str,
        subject: &str,
        text: Option<&str>,
        html: Option<&str>,
    ) -> Result<SendOutcome> {
        if !to.validate_email() {
            return Err(MailError::InvalidAddress(to.to_string()));
        }

        if !self.limiter.check_and_consume().await? {
            return Err(MailError::RateLimited);
        }

        if html.is_none() && text.is_none() {
            return Err(MailError::EmptyBody);
        }

        let message = OutboundMessage {
            to: to.to_string(),
            subject: subject.to_string(),
            text: if html.is_none() {
                text.map(str::to_string)
            } else {
                None
            },
            html: html.map(str::to_string),
            charset: self.charset.clone(),
        };

        info!(to = %to, provider = self.provider.name(), "Sending email");
        self.provider.send(&message).await
    }

    /// Render a named template with the given data and send it as HTML
    pub async fn send_template(
        &self,
        name: &str,
        to: &str,
        subject: &str,
        data: &Value,
    ) -> Result<SendOutcome> {
        let template = self.templates.build(name)?;
        let html = TemplateStore::render(&template, data);
        self.send(to, subject, None, Some(&html)).await
    }

    /// Issue a 6-digit confirmation code: stored for one hour, mailed via the
    /// `confirmation` template, returned to the caller
    pub async fn send_confirmation_code(&self, to: &str) -> Result<String> {
        let code = generate_confirmation_code();
        self.store
            .put_value(&confirmation_key(to), &code, CONFIRMATION_TTL_SECS)
            .await?;

        self.send_template(
            "confirmation",
            to,
            "Email Confirmation",
            &json!({
                "summary": "Confirm your email address",
                "confirmation_code": code,
            }),
        )
        .await?;

        Ok(code)
    }

    /// Check a code against the stored one; a match deletes it (single use)
    pub async fn verify_confirmation_code(&self, email: &str, code: &str) -> Result<bool> {
        match self.store.get_value(&confirmation_key(email)).await? {
            Some(stored) if stored == code => {
                self.store.delete(&confirmation_key(email)).await?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Advisory remaining send capacity per configured window
    pub async fn remaining(&self) -> Result<Vec<u64>> {
        self.limiter.get_remaining().await
    }
}

fn confirmation_key(email: &str) -> String {
    format!("{}:{}", CONFIRMATION_PREFIX, email)
}

fn generate_confirmation_code() -> String {
    let mut rng = rand::thread_rng();
    (0..CONFIRMATION_CODE_LEN)
        .map(|_| char::from(b'0' + rng.gen_range(0u8..10)))
        .collect()
}

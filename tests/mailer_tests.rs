use async_trait::async_trait;
use serde_json::json;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use mail_dispatch::clock::ManualClock;
use mail_dispatch::config::MailConfig;
use mail_dispatch::error::{MailError, Result};
use mail_dispatch::limiter::Limit;
use mail_dispatch::mailer::Mailer;
use mail_dispatch::provider::{MailProvider, OutboundMessage, SendOutcome};
use mail_dispatch::store::MemoryCounterStore;

/// Captures every dispatched message instead of talking to a real provider
struct RecordingProvider {
    sent: Arc<Mutex<Vec<OutboundMessage>>>,
}

#[async_trait]
impl MailProvider for RecordingProvider {
    async fn send(&self, message: &OutboundMessage) -> Result<SendOutcome> {
        self.sent.lock().unwrap().push(message.clone());
        Ok(SendOutcome::new(Some(format!(
            "msg-{}",
            self.sent.lock().unwrap().len()
        ))))
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

fn test_config(limits: Vec<Limit>) -> MailConfig {
    MailConfig {
        redis_url: "redis://localhost:6379".to_string(),
        ses_region: "us-east-1".to_string(),
        ses_sender: "noreply@example.com".to_string(),
        templates_dir: PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("templates"),
        charset: "UTF-8".to_string(),
        limits,
    }
}

fn build_mailer(
    store: Arc<MemoryCounterStore>,
    limits: Vec<Limit>,
) -> (Arc<Mutex<Vec<OutboundMessage>>>, Mailer) {
    let sent = Arc::new(Mutex::new(Vec::new()));
    let provider = Box::new(RecordingProvider { sent: sent.clone() });
    let mailer = Mailer::new(store, provider, &test_config(limits)).unwrap();
    (sent, mailer)
}

#[tokio::test]
async fn test_confirmation_flow_end_to_end() {
    let store = Arc::new(MemoryCounterStore::new());
    let (sent, mailer) = build_mailer(store, vec![Limit::new(60, 5), Limit::new(3600, 10)]);

    let code = mailer
        .send_confirmation_code("user@example.com")
        .await
        .unwrap();

    let messages = sent.lock().unwrap();
    assert_eq!(messages.len(), 1);
    let message = &messages[0];
    assert_eq!(message.to, "user@example.com");
    assert_eq!(message.subject, "Email Confirmation");

    let html = message.html.as_deref().unwrap();
    assert!(html.contains(&code));
    assert!(html.contains("Confirm your email address"));
    assert!(!html.contains("{{confirmation_code}}"));
    assert!(!html.contains("{{main}}"));
    drop(messages);

    assert!(mailer
        .verify_confirmation_code("user@example.com", &code)
        .await
        .unwrap());
    assert!(!mailer
        .verify_confirmation_code("user@example.com", &code)
        .await
        .unwrap());
}

#[tokio::test]
async fn test_sends_are_throttled_then_recover_after_window() {
    let clock = Arc::new(ManualClock::new(1000));
    let store = Arc::new(MemoryCounterStore::with_clock(clock.clone()));
    let (sent, mailer) = build_mailer(store, vec![Limit::new(60, 5), Limit::new(3600, 10)]);

    for _ in 0..5 {
        mailer
            .send("user@example.com", "Hi", Some("hello"), None)
            .await
            .unwrap();
    }
    let denied = mailer
        .send("user@example.com", "Hi", Some("hello"), None)
        .await;
    assert!(matches!(denied, Err(MailError::RateLimited)));
    assert_eq!(sent.lock().unwrap().len(), 5);

    // Past the minute window, sends work again; the hour window still counts
    clock.advance(61);
    mailer
        .send("user@example.com", "Hi", Some("hello"), None)
        .await
        .unwrap();
    assert_eq!(sent.lock().unwrap().len(), 6);
}

#[tokio::test]
async fn test_remaining_reflects_consumption() {
    let store = Arc::new(MemoryCounterStore::new());
    let (_, mailer) = build_mailer(store, vec![Limit::new(60, 5), Limit::new(3600, 10)]);

    for _ in 0..3 {
        mailer
            .send("user@example.com", "Hi", Some("hello"), None)
            .await
            .unwrap();
    }
    assert_eq!(mailer.remaining().await.unwrap(), vec![2, 7]);
}

#[tokio::test]
async fn test_daily_cap_holds_across_minute_windows() {
    let clock = Arc::new(ManualClock::new(0));
    let store = Arc::new(MemoryCounterStore::with_clock(clock.clone()));
    let (sent, mailer) = build_mailer(store, vec![Limit::new(60, 2), Limit::new(3600, 3)]);

    // Two sends fill the minute window
    for _ in 0..2 {
        mailer
            .send("user@example.com", "Hi", Some("hello"), None)
            .await
            .unwrap();
    }
    clock.advance(61);
    // Third send is the hour window's last
    mailer
        .send("user@example.com", "Hi", Some("hello"), None)
        .await
        .unwrap();
    let denied = mailer
        .send("user@example.com", "Hi", Some("hello"), None)
        .await;
    assert!(matches!(denied, Err(MailError::RateLimited)));
    assert_eq!(sent.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn test_template_send_substitutes_data() {
    let store = Arc::new(MemoryCounterStore::new());
    let (sent, mailer) = build_mailer(store, vec![Limit::new(60, 5)]);

    mailer
        .send_template(
            "confirmation",
            "user@example.com",
            "Confirm",
            &json!({"summary": "A summary line", "confirmation_code": "424242"}),
        )
        .await
        .unwrap();

    let messages = sent.lock().unwrap();
    let html = messages[0].html.as_deref().unwrap();
    assert!(html.contains("424242"));
    assert!(html.contains("A summary line"));
}

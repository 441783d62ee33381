//! Mail Dispatch
//!
//! Transactional email dispatch through an external provider, gated by a
//! multi-window rate limiter backed by a shared counter store. Supports plain
//! and templated sends plus numeric email-confirmation codes.

pub mod clock;
pub mod config;
pub mod error;
pub mod limiter;
pub mod logging;
pub mod mailer;
pub mod provider;
pub mod redis;
pub mod ses;
pub mod store;
pub mod template;

// Re-export main types
pub use config::MailConfig;
pub use error::{MailError, Result};
pub use limiter::{Limit, RateLimiter};
pub use mailer::Mailer;
pub use provider::MailProvider;
pub use store::CounterStore;

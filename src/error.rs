use thiserror::Error;

/// Result type for mail dispatch operations
pub type Result<T> = std::result::Result<T, MailError>;

/// Errors that can occur while dispatching mail
#[derive(Error, Debug)]
pub enum MailError {
    #[error("Redis error: {0}")]
    Store(#[from] redis::RedisError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    #[error("Template doesn't exist: {0}")]
    TemplateNotFound(String),

    #[error("Template error: {0}")]
    Template(String),

    #[error("No message content")]
    EmptyBody,

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

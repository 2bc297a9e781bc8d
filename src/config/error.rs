use thiserror::Error;

/// Rejected configuration values, reported by
/// [`ProbeConfig::validate`](super::ProbeConfig::validate).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("SMTP timeout must be greater than zero")]
    ZeroSmtpTimeout,
    #[error("DNS timeout must be greater than zero")]
    ZeroDnsTimeout,
    #[error("maximum addresses per batch must be greater than zero")]
    ZeroBatchLimit,
    #[error("SMTP port must be greater than zero")]
    ZeroSmtpPort,
    #[error("sender address '{0}' is not a syntactically valid email")]
    InvalidSender(String),
}

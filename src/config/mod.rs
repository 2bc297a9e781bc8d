//! Explicit configuration bundle for a verification run.
//!
//! [`ProbeConfig`] is built once by the caller (the CLI reads flags and
//! environment variables) and handed to every stage by reference; nothing in
//! the crate reads process-wide state.

mod error;

pub use error::ConfigError;

use std::borrow::Cow;
use std::time::Duration;

#[cfg(feature = "with-serde")]
use serde::{Deserialize, Serialize};

use crate::syntax::is_valid_syntax;

/// Sender shipped in sample configurations; probing with it is refused.
pub const PLACEHOLDER_SENDER: &str = "verifier@yourdomain.com";

#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeConfig {
    /// Envelope sender used in `MAIL FROM`.
    pub sender_address: String,
    pub smtp_timeout: Duration,
    pub dns_timeout: Duration,
    /// Global switch for live SMTP probing.
    pub smtp_checks_enabled: bool,
    /// Enforced by the caller building the batch, not by the pipeline.
    pub max_addresses_per_batch: usize,
    pub smtp_port: u16,
    /// Name announced in `EHLO`/`HELO`. Falls back to the machine hostname.
    pub helo_name: Option<String>,
    /// Domains treated as disposable on top of the built-in list.
    pub extra_disposable_domains: Vec<String>,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            sender_address: PLACEHOLDER_SENDER.to_string(),
            smtp_timeout: Duration::from_secs(10),
            dns_timeout: Duration::from_secs(5),
            smtp_checks_enabled: true,
            max_addresses_per_batch: 100,
            smtp_port: 25,
            helo_name: None,
            extra_disposable_domains: Vec::new(),
        }
    }
}

impl ProbeConfig {
    pub fn with_sender(mut self, sender: impl Into<String>) -> Self {
        self.sender_address = sender.into();
        self
    }

    pub fn with_smtp_checks(mut self, enabled: bool) -> Self {
        self.smtp_checks_enabled = enabled;
        self
    }

    /// True when the sender is empty or still the sample placeholder.
    pub fn sender_is_placeholder(&self) -> bool {
        let sender = self.sender_address.trim();
        sender.is_empty() || sender == PLACEHOLDER_SENDER
    }

    /// Case-insensitive comparison against the configured sender.
    pub fn is_sender(&self, address: &str) -> bool {
        let sender = self.sender_address.trim();
        !sender.is_empty() && address.trim().eq_ignore_ascii_case(sender)
    }

    pub fn is_extra_disposable(&self, domain: &str) -> bool {
        self.extra_disposable_domains
            .iter()
            .any(|d| d.trim().trim_end_matches('.').eq_ignore_ascii_case(domain))
    }

    /// Name used for `EHLO`/`HELO`: configured value, else the machine
    /// hostname, else `localhost`.
    pub fn local_hostname(&self) -> Cow<'_, str> {
        pick_helo_name(self.helo_name.as_deref(), system_hostname)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.smtp_timeout.is_zero() {
            return Err(ConfigError::ZeroSmtpTimeout);
        }
        if self.dns_timeout.is_zero() {
            return Err(ConfigError::ZeroDnsTimeout);
        }
        if self.max_addresses_per_batch == 0 {
            return Err(ConfigError::ZeroBatchLimit);
        }
        if self.smtp_port == 0 {
            return Err(ConfigError::ZeroSmtpPort);
        }
        if !self.sender_is_placeholder() && !is_valid_syntax(&self.sender_address) {
            return Err(ConfigError::InvalidSender(self.sender_address.clone()));
        }
        Ok(())
    }
}

fn pick_helo_name<F>(configured: Option<&str>, system: F) -> Cow<'_, str>
where
    F: FnOnce() -> Option<String>,
{
    match configured.map(str::trim) {
        Some(name) if !name.is_empty() => Cow::Borrowed(name),
        _ => Cow::Owned(system().unwrap_or_else(|| "localhost".to_string())),
    }
}

fn system_hostname() -> Option<String> {
    let raw = gethostname::gethostname();
    let name = raw.to_str()?.trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

#![forbid(unsafe_code)]
//! mailverdict — email deliverability verdicts (syntax, MX, SMTP RCPT probe)

pub mod config;
pub mod disposable;
pub mod heuristics;
pub mod mx;
pub mod pipeline;
pub mod smtp;
pub mod syntax;

pub use config::{ConfigError, PLACEHOLDER_SENDER, ProbeConfig};
pub use disposable::is_disposable_domain;
pub use heuristics::{Suspicion, SuspicionReason, score_local_part};
pub use mx::{DnsLookup, Error as MxError, MxRecord, resolve_mx};
pub use pipeline::{OverallStatus, ValidationResult, Validator, validate, validate_batch};
pub use smtp::{SmtpConnector, SmtpProbe, probe_recipient};
pub use syntax::is_valid_syntax;

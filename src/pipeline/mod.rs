//! Per-address orchestration: syntax, local-part heuristics, disposable
//! lookup, MX discovery and the SMTP probe, folded into one
//! [`ValidationResult`] with a terminal [`OverallStatus`].

mod types;
mod validator;

pub use types::{OverallStatus, ValidationResult};
pub use validator::{Validator, classify_probe_failure, validate, validate_batch};

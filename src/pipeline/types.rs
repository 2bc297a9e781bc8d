use std::fmt;

#[cfg(feature = "with-serde")]
use serde::{Deserialize, Serialize};

pub(crate) const NOT_PERFORMED: &str = "Not Performed";

/// Final classification of an address. Every value except `Unknown` is
/// terminal; `Unknown` only exists as the initial state of a fresh result.
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverallStatus {
    #[default]
    Unknown,
    InvalidInput,
    InvalidInputType,
    InvalidSyntax,
    DomainOrMxIssue,
    SmtpChecksRequired,
    ValidSelfVerification,
    SmtpConfigurationRequired,
    ValidSmtpVerified,
    InvalidSmtpRejected,
    SmtpCheckFailed,
    PotentiallyValid,
    ErrorDuringValidation,
}

impl OverallStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Unknown => "Unknown",
            Self::InvalidInput => "Invalid Input",
            Self::InvalidInputType => "Invalid Input Type",
            Self::InvalidSyntax => "Invalid Syntax",
            Self::DomainOrMxIssue => "Domain/MX Issue",
            Self::SmtpChecksRequired => "Error: SMTP Checks Required",
            Self::ValidSelfVerification => "Valid (Self-Verification)",
            Self::SmtpConfigurationRequired => "Error: SMTP Configuration Required",
            Self::ValidSmtpVerified => "Valid (SMTP Verified)",
            Self::InvalidSmtpRejected => "Invalid (SMTP Rejected)",
            Self::SmtpCheckFailed => "Error: SMTP Check Failed",
            Self::PotentiallyValid => "Potentially Valid",
            Self::ErrorDuringValidation => "Error During Validation",
        }
    }

    /// Fixed guidance for the status. `SmtpCheckFailed` is completed with the
    /// probe message by [`ValidationResult::finish`].
    pub fn recommendation(&self) -> &'static str {
        match self {
            Self::Unknown => "",
            Self::InvalidInput => "Email address is empty or not a valid string.",
            Self::InvalidInputType => "Provide a valid string.",
            Self::InvalidSyntax => "Email format is incorrect.",
            Self::DomainOrMxIssue => "The domain may not exist or not configured for email.",
            Self::SmtpChecksRequired => "Enable SMTP checks in configuration.",
            Self::ValidSelfVerification => "Email is valid (sender email).",
            Self::SmtpConfigurationRequired => "Configure a valid sender address.",
            Self::ValidSmtpVerified => "Email address appears to be deliverable.",
            Self::InvalidSmtpRejected => "The email user likely does not exist.",
            Self::SmtpCheckFailed => "SMTP check was skipped",
            Self::PotentiallyValid => "Could not definitively verify user via SMTP.",
            Self::ErrorDuringValidation => "Server-side error during validation.",
        }
    }

    /// Statuses that say the address should not be used.
    pub fn is_undeliverable(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput
                | Self::InvalidInputType
                | Self::InvalidSyntax
                | Self::DomainOrMxIssue
                | Self::InvalidSmtpRejected
        )
    }

    /// Statuses caused by the verifier's own configuration.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::SmtpChecksRequired | Self::SmtpConfigurationRequired | Self::SmtpCheckFailed
        )
    }
}

impl fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Verdict for one input address.
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    pub email: String,
    pub syntax_valid: bool,
    #[cfg_attr(feature = "with-serde", serde(skip_serializing_if = "Option::is_none"))]
    pub domain_name: Option<String>,
    pub domain_has_mx: bool,
    pub mx_records: Vec<String>,
    pub smtp_check_attempted: bool,
    pub smtp_user_exists: bool,
    pub smtp_message: String,
    #[cfg_attr(feature = "with-serde", serde(skip_serializing_if = "Option::is_none"))]
    pub is_suspicious_local_part: Option<bool>,
    #[cfg_attr(feature = "with-serde", serde(skip_serializing_if = "Option::is_none"))]
    pub suspicious_reason: Option<String>,
    #[cfg_attr(feature = "with-serde", serde(skip_serializing_if = "Option::is_none"))]
    pub is_disposable: Option<bool>,
    pub overall_status: OverallStatus,
    pub recommendation: String,
}

impl ValidationResult {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            syntax_valid: false,
            domain_name: None,
            domain_has_mx: false,
            mx_records: Vec::new(),
            smtp_check_attempted: false,
            smtp_user_exists: false,
            smtp_message: NOT_PERFORMED.to_string(),
            is_suspicious_local_part: None,
            suspicious_reason: None,
            is_disposable: None,
            overall_status: OverallStatus::Unknown,
            recommendation: String::new(),
        }
    }

    /// Record for an input entry that was not a string at all.
    pub fn invalid_input_type(raw: impl Into<String>) -> Self {
        let mut result = Self::new(raw);
        result.smtp_message = "Invalid input type.".to_string();
        result.finish(OverallStatus::InvalidInputType)
    }

    /// Record for an address whose evaluation failed internally.
    pub fn internal_error(email: impl Into<String>) -> Self {
        let mut result = Self::new(email);
        result.smtp_message = "Internal validation error".to_string();
        result.finish(OverallStatus::ErrorDuringValidation)
    }

    pub(crate) fn finish(mut self, status: OverallStatus) -> Self {
        self.overall_status = status;
        self.recommendation = match status {
            OverallStatus::SmtpCheckFailed => {
                format!("{}: {}.", status.recommendation(), self.smtp_message)
            }
            _ => status.recommendation().to_string(),
        };
        self
    }
}

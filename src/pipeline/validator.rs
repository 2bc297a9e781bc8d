use std::panic::{self, AssertUnwindSafe};

use tracing::{debug, warn};

use crate::config::ProbeConfig;
use crate::disposable::is_disposable_domain;
use crate::heuristics::score_local_part;
use crate::mx::{DnsLookup, hosts, resolve_mx_with, system_lookup};
use crate::smtp::{SmtpConnector, TcpConnector, probe_recipient_with};
use crate::syntax::{is_valid_syntax, split_address};

use super::{OverallStatus, ValidationResult};

/// Probe messages carrying any of these mean the mailbox was refused.
const REJECTION_INDICATORS: [&str; 9] = [
    "rejected",
    "non-existent",
    "refused",
    "no such user",
    "does not exist",
    "user not found",
    "invalid recipient",
    "mailbox unavailable",
    "recipient rejected",
];

/// Validates one address with the system resolver and plain TCP probing.
pub fn validate(address: &str, config: &ProbeConfig) -> ValidationResult {
    validate_batch(&[address], config)
        .pop()
        .unwrap_or_else(|| ValidationResult::internal_error(address.trim()))
}

/// Validates every address in order; the output has the same length as the
/// input.
pub fn validate_batch<S>(addresses: &[S], config: &ProbeConfig) -> Vec<ValidationResult>
where
    S: AsRef<str>,
{
    let dns = system_lookup(config.dns_timeout);
    let smtp = TcpConnector::new(config.smtp_port, config.smtp_timeout);
    Validator::new(config, dns.as_ref(), &smtp).validate_batch(addresses)
}

/// Runs the pipeline against explicit DNS and SMTP back ends.
pub struct Validator<'a, D: ?Sized, C: ?Sized> {
    config: &'a ProbeConfig,
    dns: &'a D,
    smtp: &'a C,
}

impl<'a, D, C> Validator<'a, D, C>
where
    D: DnsLookup + ?Sized,
    C: SmtpConnector + ?Sized,
{
    pub fn new(config: &'a ProbeConfig, dns: &'a D, smtp: &'a C) -> Self {
        Self { config, dns, smtp }
    }

    /// A panic while evaluating one address yields an
    /// [`OverallStatus::ErrorDuringValidation`] record for that address only.
    pub fn validate_batch<S>(&self, addresses: &[S]) -> Vec<ValidationResult>
    where
        S: AsRef<str>,
    {
        addresses
            .iter()
            .map(|address| {
                let address = address.as_ref();
                panic::catch_unwind(AssertUnwindSafe(|| self.validate(address))).unwrap_or_else(
                    |_| {
                        warn!(email = %address, "validation aborted unexpectedly");
                        ValidationResult::internal_error(address.trim())
                    },
                )
            })
            .collect()
    }

    pub fn validate(&self, address: &str) -> ValidationResult {
        let result = self.evaluate(address);
        debug!(
            email = %result.email,
            status = %result.overall_status,
            smtp = %result.smtp_message,
            "validation finished"
        );
        result
    }

    fn evaluate(&self, address: &str) -> ValidationResult {
        let email = address.trim();
        let mut result = ValidationResult::new(email);
        if email.is_empty() {
            return result.finish(OverallStatus::InvalidInput);
        }

        result.syntax_valid = is_valid_syntax(email);
        if !result.syntax_valid {
            return result.finish(OverallStatus::InvalidSyntax);
        }
        let Some((local, domain)) = split_address(email) else {
            result.syntax_valid = false;
            return result.finish(OverallStatus::InvalidSyntax);
        };
        let domain = domain.to_ascii_lowercase();
        result.domain_name = Some(domain.clone());

        let suspicion = score_local_part(local);
        result.is_suspicious_local_part = Some(suspicion.suspicious);
        result.suspicious_reason = suspicion.reason.map(|r| r.to_string());

        if is_disposable_domain(&domain) || self.config.is_extra_disposable(&domain) {
            result.is_disposable = Some(true);
        }

        let mx_hosts = hosts(&resolve_mx_with(self.dns, &domain));
        if mx_hosts.is_empty() {
            result.smtp_message = "No MX records found or domain does not exist.".to_string();
            return result.finish(OverallStatus::DomainOrMxIssue);
        }
        result.domain_has_mx = true;
        result.mx_records = mx_hosts;

        if !self.config.smtp_checks_enabled {
            result.smtp_message = "SMTP checks are disabled globally.".to_string();
            return result.finish(OverallStatus::SmtpChecksRequired);
        }

        if self.config.is_sender(email) {
            result.smtp_check_attempted = true;
            result.smtp_user_exists = true;
            result.smtp_message = "Email is the same as the sender email.".to_string();
            return result.finish(OverallStatus::ValidSelfVerification);
        }

        if self.config.sender_is_placeholder() {
            result.smtp_message = "Sender address not properly configured.".to_string();
            return result.finish(OverallStatus::SmtpConfigurationRequired);
        }

        result.smtp_check_attempted = true;
        let probe = probe_recipient_with(self.smtp, email, &result.mx_records, self.config);
        result.smtp_user_exists = probe.exists;
        result.smtp_message = probe.message;

        let status = if result.smtp_user_exists {
            OverallStatus::ValidSmtpVerified
        } else {
            classify_probe_failure(&result.smtp_message)
        };
        result.finish(status)
    }
}

/// Maps a failed probe's message to a status: explicit refusals first, then
/// skipped probes, everything else is inconclusive.
pub fn classify_probe_failure(message: &str) -> OverallStatus {
    let lower = message.to_lowercase();
    if REJECTION_INDICATORS.iter().any(|i| lower.contains(i)) {
        OverallStatus::InvalidSmtpRejected
    } else if lower.contains("skipped") {
        OverallStatus::SmtpCheckFailed
    } else {
        OverallStatus::PotentiallyValid
    }
}

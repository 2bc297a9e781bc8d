use tracing::{debug, warn};

use crate::config::ProbeConfig;

use super::session::{SmtpConnector, SmtpReply, SmtpSession, TcpConnector};
use super::{SessionError, SmtpProbe};

/// Trials per MX host (one retry).
pub const TRIALS_PER_HOST: usize = 2;

/// Phrases in a 5xx RCPT reply that point at a missing mailbox.
const UNKNOWN_USER_PHRASES: [&str; 7] = [
    "user unknown",
    "no such user",
    "does not exist",
    "user not found",
    "invalid recipient",
    "mailbox unavailable",
    "recipient rejected",
];

/// Probes `address` against `mx_hosts` over plain TCP on the configured port.
pub fn probe_recipient(address: &str, mx_hosts: &[String], config: &ProbeConfig) -> SmtpProbe {
    let connector = TcpConnector::new(config.smtp_port, config.smtp_timeout);
    probe_recipient_with(&connector, address, mx_hosts, config)
}

/// Same as [`probe_recipient`] with an explicit connector.
///
/// Hosts are tried in the given order, [`TRIALS_PER_HOST`] times each. An
/// accept, a 5xx reject, an unexpected code or a refused sender ends the
/// probe; 4xx replies and connection failures move on to the next trial.
pub fn probe_recipient_with<C>(
    connector: &C,
    address: &str,
    mx_hosts: &[String],
    config: &ProbeConfig,
) -> SmtpProbe
where
    C: SmtpConnector + ?Sized,
{
    let address = address.trim();
    if address.is_empty() {
        return SmtpProbe::denied("skipped: invalid address");
    }
    if config.is_sender(address) {
        return SmtpProbe::confirmed("self-verification");
    }
    if config.sender_is_placeholder() {
        return SmtpProbe::denied("skipped: sender not configured");
    }
    if mx_hosts.is_empty() {
        return SmtpProbe::denied("skipped: no MX servers");
    }

    let recipient = address.to_lowercase();
    let sender = config.sender_address.trim();
    let helo = config.local_hostname();

    for host in mx_hosts {
        for trial in 1..=TRIALS_PER_HOST {
            let outcome = match connector.connect(host) {
                Ok(mut session) => {
                    let outcome = run_dialog(&mut session, &helo, sender, &recipient);
                    session.command("QUIT").ok();
                    outcome
                }
                Err(err) => TrialOutcome::ConnectionFailed(err),
            };

            match outcome {
                TrialOutcome::Accepted(code) => {
                    return SmtpProbe::confirmed(format!("accepted by {host} (code {code})"));
                }
                TrialOutcome::Rejected { code, user_unknown } => {
                    let detail = if user_unknown {
                        "user does not exist"
                    } else {
                        "user likely non-existent"
                    };
                    return SmtpProbe::denied(format!("rejected by {host} (code {code}, {detail})"));
                }
                TrialOutcome::Inconclusive(code) => {
                    return SmtpProbe::denied(format!(
                        "inconclusive response from {host} (code {code})"
                    ));
                }
                TrialOutcome::SenderRefused(code) => {
                    warn!(%host, code, %sender, "sender refused");
                    return SmtpProbe::denied(format!("sender refused by {host}"));
                }
                TrialOutcome::Transient(code) => {
                    debug!(%host, trial, code, "transient RCPT reply");
                }
                TrialOutcome::HandshakeRefused => {
                    debug!(%host, trial, "EHLO and HELO refused");
                }
                TrialOutcome::ConnectionFailed(err) => {
                    debug!(
                        %host,
                        trial,
                        timeout = err.is_timeout(),
                        error = %err,
                        "SMTP trial failed"
                    );
                }
            }
        }
    }

    SmtpProbe::denied("failed for all MX servers")
}

/// What a single connection to a single host produced.
#[derive(Debug)]
pub(crate) enum TrialOutcome {
    Accepted(u16),
    Rejected { code: u16, user_unknown: bool },
    Inconclusive(u16),
    SenderRefused(u16),
    Transient(u16),
    HandshakeRefused,
    ConnectionFailed(SessionError),
}

fn run_dialog<S>(session: &mut S, helo: &str, sender: &str, recipient: &str) -> TrialOutcome
where
    S: SmtpSession + ?Sized,
{
    match dialog(session, helo, sender, recipient) {
        Ok(outcome) => outcome,
        Err(err) => TrialOutcome::ConnectionFailed(err),
    }
}

fn dialog<S>(
    session: &mut S,
    helo: &str,
    sender: &str,
    recipient: &str,
) -> Result<TrialOutcome, SessionError>
where
    S: SmtpSession + ?Sized,
{
    let ehlo = session.command(&format!("EHLO {helo}"))?;
    if !ehlo.is_positive_completion() {
        let helo_reply = session.command(&format!("HELO {helo}"))?;
        if !helo_reply.is_positive_completion() {
            return Ok(TrialOutcome::HandshakeRefused);
        }
    }

    let mail = session.command(&format!("MAIL FROM:<{sender}>"))?;
    if !mail.is_positive_completion() {
        return Ok(TrialOutcome::SenderRefused(mail.code));
    }

    let rcpt = session.command(&format!("RCPT TO:<{recipient}>"))?;
    Ok(classify_rcpt(&rcpt))
}

pub(crate) fn classify_rcpt(reply: &SmtpReply) -> TrialOutcome {
    match reply.code {
        250..=251 => TrialOutcome::Accepted(reply.code),
        500..=554 => TrialOutcome::Rejected {
            code: reply.code,
            user_unknown: mentions_unknown_user(&reply.message),
        },
        400..=499 => TrialOutcome::Transient(reply.code),
        code => TrialOutcome::Inconclusive(code),
    }
}

fn mentions_unknown_user(message: &str) -> bool {
    let lower = message.to_lowercase();
    UNKNOWN_USER_PHRASES.iter().any(|p| lower.contains(p))
}

//! SMTP recipient probing.
//!
//! The public entry point is [`probe_recipient`], which walks the MX hosts in
//! preference order and runs `EHLO`/`HELO`, `MAIL FROM`, `RCPT TO`, `QUIT`
//! without ever sending a message body. Network failures are absorbed: the
//! probe always returns an [`SmtpProbe`].

mod error;
mod probe;
mod session;
mod types;

pub use error::SessionError;
pub use probe::{TRIALS_PER_HOST, probe_recipient, probe_recipient_with};
pub use session::{SmtpConnector, SmtpReply, SmtpSession, TcpConnector, TcpSession};
pub use types::SmtpProbe;

#[cfg(test)]
pub(crate) mod tests;

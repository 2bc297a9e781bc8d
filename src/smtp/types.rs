use std::fmt;

#[cfg(feature = "with-serde")]
use serde::{Deserialize, Serialize};

/// Result of [`probe_recipient`](super::probe_recipient): whether the
/// mailbox was confirmed plus a diagnostic message.
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpProbe {
    pub exists: bool,
    pub message: String,
}

impl SmtpProbe {
    pub(crate) fn confirmed(message: impl Into<String>) -> Self {
        Self {
            exists: true,
            message: message.into(),
        }
    }

    pub(crate) fn denied(message: impl Into<String>) -> Self {
        Self {
            exists: false,
            message: message.into(),
        }
    }

    pub fn is_skipped(&self) -> bool {
        self.message.starts_with("skipped")
    }
}

impl fmt::Display for SmtpProbe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verdict = if self.exists { "exists" } else { "unconfirmed" };
        write!(f, "{verdict}: {}", self.message)
    }
}

use thiserror::Error;

/// Connection-level failures during one SMTP trial. These never reach the
/// caller of the probe: they only decide whether the next trial runs.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no socket address for {host}")]
    NoAddress { host: String },
    #[error("connection to {host} failed: {source}")]
    Connect {
        host: String,
        #[source]
        source: std::io::Error,
    },
    #[error("I/O error: {source}")]
    Io {
        #[source]
        source: std::io::Error,
    },
    #[error("server closed the connection")]
    Disconnected,
    #[error("malformed reply: {0}")]
    Protocol(String),
    #[error("greeting refused with code {code}")]
    GreetingRefused { code: u16 },
}

impl SessionError {
    pub(crate) fn io(source: std::io::Error) -> Self {
        Self::Io { source }
    }

    pub fn is_timeout(&self) -> bool {
        let source = match self {
            Self::Connect { source, .. } | Self::Io { source } => source,
            _ => return false,
        };
        matches!(
            source.kind(),
            std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
        )
    }
}

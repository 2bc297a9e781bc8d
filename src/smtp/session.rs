use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use super::SessionError;

/// Longest reply line accepted, CRLF included.
pub const MAX_REPLY_LINE: usize = 8192;
/// Most lines accepted in one multi-line reply.
pub const MAX_REPLY_LINES: usize = 128;

/// A raw SMTP reply, preserving the numeric status code and message text.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpReply {
    pub code: u16,
    pub message: String,
}

impl SmtpReply {
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn is_positive_completion(&self) -> bool {
        (200..300).contains(&self.code)
    }

    pub fn is_transient_failure(&self) -> bool {
        (400..500).contains(&self.code)
    }

    pub fn is_permanent_failure(&self) -> bool {
        (500..600).contains(&self.code)
    }
}

/// One open SMTP conversation, past the greeting.
pub trait SmtpSession {
    /// Sends `line` (without CRLF) and reads the complete reply.
    fn command(&mut self, line: &str) -> Result<SmtpReply, SessionError>;
}

/// Opens sessions to mail hosts.
pub trait SmtpConnector {
    type Session: SmtpSession;

    /// Connects to `host` and consumes a positive greeting.
    fn connect(&self, host: &str) -> Result<Self::Session, SessionError>;
}

/// Plain TCP connector; `timeout` bounds the connect and every read/write.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    pub port: u16,
    pub timeout: Duration,
}

impl TcpConnector {
    pub fn new(port: u16, timeout: Duration) -> Self {
        Self { port, timeout }
    }

    fn socket_addrs(&self, host: &str) -> Result<Vec<SocketAddr>, SessionError> {
        let addrs: Vec<SocketAddr> = (host, self.port)
            .to_socket_addrs()
            .map_err(|source| SessionError::Connect {
                host: host.to_string(),
                source,
            })?
            .collect();
        if addrs.is_empty() {
            return Err(SessionError::NoAddress {
                host: host.to_string(),
            });
        }
        Ok(addrs)
    }
}

impl SmtpConnector for TcpConnector {
    type Session = TcpSession;

    fn connect(&self, host: &str) -> Result<TcpSession, SessionError> {
        let addrs = self.socket_addrs(host)?;
        let mut session = TcpSession::connect(host, &addrs, self.timeout)?;
        let greeting = session.read_reply()?;
        if !greeting.is_positive_completion() {
            return Err(SessionError::GreetingRefused {
                code: greeting.code,
            });
        }
        Ok(session)
    }
}

pub struct TcpSession {
    stream: TcpStream,
    reader: BufReader<TcpStream>,
}

impl TcpSession {
    fn connect(host: &str, addrs: &[SocketAddr], timeout: Duration) -> Result<Self, SessionError> {
        let mut last_err = None;
        for addr in addrs {
            match TcpStream::connect_timeout(addr, timeout) {
                Ok(stream) => {
                    stream
                        .set_read_timeout(Some(timeout))
                        .map_err(SessionError::io)?;
                    stream
                        .set_write_timeout(Some(timeout))
                        .map_err(SessionError::io)?;
                    let reader = BufReader::new(stream.try_clone().map_err(SessionError::io)?);
                    return Ok(Self { stream, reader });
                }
                Err(err) => last_err = Some(err),
            }
        }
        Err(SessionError::Connect {
            host: host.to_string(),
            source: last_err.unwrap_or_else(|| {
                io::Error::new(io::ErrorKind::AddrNotAvailable, "no socket address available")
            }),
        })
    }

    fn send_line(&mut self, command: &str) -> Result<(), SessionError> {
        let mut line = command.as_bytes().to_vec();
        line.extend_from_slice(b"\r\n");
        self.stream.write_all(&line).map_err(SessionError::io)?;
        self.stream.flush().map_err(SessionError::io)
    }

    fn read_line_bytes(&mut self) -> Result<Vec<u8>, SessionError> {
        let mut raw = Vec::new();
        let bytes = (&mut self.reader)
            .take(MAX_REPLY_LINE as u64 + 1)
            .read_until(b'\n', &mut raw)
            .map_err(SessionError::io)?;
        if bytes == 0 {
            return Err(SessionError::Disconnected);
        }
        if raw.len() > MAX_REPLY_LINE {
            return Err(SessionError::Protocol(format!(
                "reply line longer than {MAX_REPLY_LINE} bytes"
            )));
        }
        Ok(raw)
    }

    pub(crate) fn read_reply(&mut self) -> Result<SmtpReply, SessionError> {
        let mut code = None;
        let mut message_lines = Vec::new();
        loop {
            if message_lines.len() == MAX_REPLY_LINES {
                return Err(SessionError::Protocol(format!(
                    "reply longer than {MAX_REPLY_LINES} lines"
                )));
            }
            let raw = self.read_line_bytes()?;
            let (parsed_code, continuation, text) = parse_reply_line(&raw)?;
            match code {
                Some(existing) if existing != parsed_code => {
                    return Err(SessionError::Protocol(format!(
                        "inconsistent reply codes: {existing} vs {parsed_code}"
                    )));
                }
                Some(_) => {}
                None => code = Some(parsed_code),
            }
            message_lines.push(text);
            if !continuation {
                break;
            }
        }
        Ok(SmtpReply {
            code: code.ok_or_else(|| SessionError::Protocol("reply missing status code".into()))?,
            message: message_lines.join("\n"),
        })
    }
}

impl SmtpSession for TcpSession {
    fn command(&mut self, line: &str) -> Result<SmtpReply, SessionError> {
        self.send_line(line)?;
        self.read_reply()
    }
}

/// Splits one reply line into `(code, has_continuation, text)`. Bytes that
/// are not valid UTF-8 are replaced in the text.
pub(crate) fn parse_reply_line(raw: &[u8]) -> Result<(u16, bool, String), SessionError> {
    let line = raw.strip_suffix(b"\n").unwrap_or(raw);
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    let malformed = || {
        SessionError::Protocol(format!(
            "invalid SMTP reply: '{}'",
            String::from_utf8_lossy(line)
        ))
    };
    let code_part = line
        .get(..3)
        .filter(|digits| digits.iter().all(u8::is_ascii_digit))
        .ok_or_else(malformed)?;
    let code = code_part
        .iter()
        .fold(0u16, |acc, digit| acc * 10 + u16::from(digit - b'0'));
    let continuation = line.get(3) == Some(&b'-');
    let text = String::from_utf8_lossy(line.get(4..).unwrap_or_default()).into_owned();
    Ok((code, continuation, text))
}

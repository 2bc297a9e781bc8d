use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::io::{self, BufRead, BufReader, Write};
use std::net::TcpListener;
use std::rc::Rc;
use std::thread;
use std::time::Duration;

use super::{
    SessionError, SmtpConnector, SmtpProbe, SmtpReply, SmtpSession, probe_recipient,
    probe_recipient_with,
};
use crate::smtp::session::{MAX_REPLY_LINE, MAX_REPLY_LINES};
use crate::config::ProbeConfig;

/// Behaviour of one scripted connection.
#[derive(Debug, Clone)]
pub(crate) enum Script {
    Refuse,
    Server(FakeServer),
}

#[derive(Debug, Clone)]
pub(crate) struct FakeServer {
    pub ehlo: u16,
    pub helo: u16,
    pub mail: u16,
    pub rcpt: (u16, &'static str),
    /// Verb at which the server drops the connection.
    pub hang_up_on: Option<&'static str>,
}

impl FakeServer {
    pub(crate) fn accepting() -> Self {
        Self {
            ehlo: 250,
            helo: 250,
            mail: 250,
            rcpt: (250, "2.1.5 ok"),
            hang_up_on: None,
        }
    }

    pub(crate) fn rcpt(code: u16, text: &'static str) -> Self {
        Self {
            rcpt: (code, text),
            ..Self::accepting()
        }
    }
}

/// Connector serving scripted sessions per host; every connect and command
/// lands in `log`.
#[derive(Default)]
pub(crate) struct FakeConnector {
    scripts: RefCell<HashMap<String, VecDeque<Script>>>,
    log: Rc<RefCell<Vec<String>>>,
}

impl FakeConnector {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn host<I>(self, host: &str, scripts: I) -> Self
    where
        I: IntoIterator<Item = Script>,
    {
        self.scripts
            .borrow_mut()
            .insert(host.to_string(), scripts.into_iter().collect());
        self
    }

    pub(crate) fn log(&self) -> Vec<String> {
        self.log.borrow().clone()
    }

    pub(crate) fn connects(&self, host: &str) -> usize {
        let needle = format!("CONNECT {host}");
        self.log.borrow().iter().filter(|l| **l == needle).count()
    }
}

impl SmtpConnector for FakeConnector {
    type Session = FakeSession;

    fn connect(&self, host: &str) -> Result<FakeSession, SessionError> {
        self.log.borrow_mut().push(format!("CONNECT {host}"));
        let next = self
            .scripts
            .borrow_mut()
            .get_mut(host)
            .and_then(VecDeque::pop_front);
        match next {
            Some(Script::Server(server)) => Ok(FakeSession {
                host: host.to_string(),
                server,
                log: Rc::clone(&self.log),
            }),
            Some(Script::Refuse) | None => Err(SessionError::Connect {
                host: host.to_string(),
                source: io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused"),
            }),
        }
    }
}

pub(crate) struct FakeSession {
    host: String,
    server: FakeServer,
    log: Rc<RefCell<Vec<String>>>,
}

impl SmtpSession for FakeSession {
    fn command(&mut self, line: &str) -> Result<SmtpReply, SessionError> {
        self.log.borrow_mut().push(format!("{} {line}", self.host));
        let verb = line.split([' ', ':']).next().unwrap_or_default();
        if self.server.hang_up_on == Some(verb) {
            return Err(SessionError::Disconnected);
        }
        let reply = match verb {
            "EHLO" => SmtpReply::new(self.server.ehlo, "hello"),
            "HELO" => SmtpReply::new(self.server.helo, "hello"),
            "MAIL" => SmtpReply::new(self.server.mail, "sender"),
            "RCPT" => SmtpReply::new(self.server.rcpt.0, self.server.rcpt.1),
            "QUIT" => SmtpReply::new(221, "bye"),
            _ => SmtpReply::new(500, "unknown command"),
        };
        Ok(reply)
    }
}

fn config() -> ProbeConfig {
    let mut cfg = ProbeConfig::default().with_sender("probe@sender.example");
    cfg.helo_name = Some("tester.local".into());
    cfg
}

fn hosts(names: &[&str]) -> Vec<String> {
    names.iter().map(|h| h.to_string()).collect()
}

fn probe(connector: &FakeConnector, address: &str, mx: &[&str]) -> SmtpProbe {
    probe_recipient_with(connector, address, &hosts(mx), &config())
}

#[test]
fn self_address_short_circuits_without_connecting() {
    let connector = FakeConnector::new();
    let result = probe(&connector, "PROBE@Sender.example", &["mx1"]);
    assert_eq!(result, SmtpProbe::confirmed("self-verification"));
    assert!(connector.log().is_empty());
}

#[test]
fn preconditions_report_skips() {
    let connector = FakeConnector::new();
    assert_eq!(probe(&connector, "   ", &["mx1"]).message, "skipped: invalid address");
    assert_eq!(probe(&connector, "a@example.com", &[]).message, "skipped: no MX servers");

    let unset = ProbeConfig::default();
    let result = probe_recipient_with(&connector, "a@example.com", &hosts(&["mx1"]), &unset);
    assert_eq!(result, SmtpProbe::denied("skipped: sender not configured"));
    assert!(result.is_skipped());
    assert!(connector.log().is_empty());
}

#[test]
fn accepted_recipient_ends_probe() {
    let connector = FakeConnector::new()
        .host("mx1", [Script::Server(FakeServer::accepting())])
        .host("mx2", [Script::Server(FakeServer::accepting())]);

    let result = probe(&connector, " Jane.Doe@Example.com ", &["mx1", "mx2"]);
    assert_eq!(result, SmtpProbe::confirmed("accepted by mx1 (code 250)"));
    assert_eq!(
        connector.log(),
        vec![
            "CONNECT mx1",
            "mx1 EHLO tester.local",
            "mx1 MAIL FROM:<probe@sender.example>",
            "mx1 RCPT TO:<jane.doe@example.com>",
            "mx1 QUIT",
        ]
    );
}

#[test]
fn code_251_counts_as_accepted() {
    let connector =
        FakeConnector::new().host("mx1", [Script::Server(FakeServer::rcpt(251, "will forward"))]);
    assert!(probe(&connector, "a@example.com", &["mx1"]).exists);
}

#[test]
fn unknown_user_rejection_is_terminal() {
    let connector = FakeConnector::new()
        .host("mx1", [Script::Server(FakeServer::rcpt(550, "5.1.1 <a@example.com>: User Unknown"))])
        .host("mx2", [Script::Server(FakeServer::accepting())]);

    let result = probe(&connector, "a@example.com", &["mx1", "mx2"]);
    assert_eq!(result, SmtpProbe::denied("rejected by mx1 (code 550, user does not exist)"));
    assert_eq!(connector.connects("mx2"), 0);
}

#[test]
fn other_permanent_rejection_is_likely_non_existent() {
    let connector = FakeConnector::new().host(
        "mx1",
        [Script::Server(FakeServer::rcpt(554, "policy violation"))],
    );
    let result = probe(&connector, "a@example.com", &["mx1"]);
    assert_eq!(result.message, "rejected by mx1 (code 554, user likely non-existent)");
    assert!(!result.exists);
}

#[test]
fn unexpected_codes_are_inconclusive() {
    for code in [252, 555, 354] {
        let connector = FakeConnector::new()
            .host("mx1", [Script::Server(FakeServer::rcpt(code, "hmm"))])
            .host("mx2", [Script::Server(FakeServer::accepting())]);
        let result = probe(&connector, "a@example.com", &["mx1", "mx2"]);
        assert_eq!(result.message, format!("inconclusive response from mx1 (code {code})"));
        assert_eq!(connector.connects("mx2"), 0);
    }
}

#[test]
fn ehlo_refusal_falls_back_to_helo() {
    let server = FakeServer {
        ehlo: 502,
        ..FakeServer::accepting()
    };
    let connector = FakeConnector::new().host("mx1", [Script::Server(server)]);
    let result = probe(&connector, "a@example.com", &["mx1"]);
    assert!(result.exists);
    assert!(connector.log().contains(&"mx1 HELO tester.local".to_string()));
}

#[test]
fn handshake_refusal_moves_to_next_host() {
    let broken = FakeServer {
        ehlo: 502,
        helo: 501,
        ..FakeServer::accepting()
    };
    let connector = FakeConnector::new()
        .host("mx1", [Script::Server(broken.clone()), Script::Server(broken)])
        .host("mx2", [Script::Server(FakeServer::accepting())]);
    let result = probe(&connector, "a@example.com", &["mx1", "mx2"]);
    assert_eq!(result.message, "accepted by mx2 (code 250)");
    assert_eq!(connector.connects("mx1"), 2);
    assert!(!connector.log().iter().any(|l| l.starts_with("mx1 MAIL")));
}

#[test]
fn sender_refusal_stops_whole_probe() {
    let refusing = FakeServer {
        mail: 553,
        ..FakeServer::accepting()
    };
    let connector = FakeConnector::new()
        .host("mx1", [Script::Server(refusing)])
        .host("mx2", [Script::Server(FakeServer::accepting())]);
    let result = probe(&connector, "a@example.com", &["mx1", "mx2"]);
    assert_eq!(result, SmtpProbe::denied("sender refused by mx1"));
    assert_eq!(connector.connects("mx1"), 1);
    assert_eq!(connector.connects("mx2"), 0);
}

#[test]
fn transient_reply_retries_then_moves_on() {
    let greylisted = FakeServer::rcpt(451, "4.7.1 greylisted");
    let connector = FakeConnector::new()
        .host("mx1", [Script::Server(greylisted.clone()), Script::Server(greylisted)])
        .host("mx2", [Script::Server(FakeServer::accepting())]);
    let result = probe(&connector, "a@example.com", &["mx1", "mx2"]);
    assert_eq!(result.message, "accepted by mx2 (code 250)");
    assert_eq!(connector.connects("mx1"), 2);
}

#[test]
fn transient_then_accept_on_retry_same_host() {
    let connector = FakeConnector::new().host(
        "mx1",
        [
            Script::Server(FakeServer::rcpt(421, "try later")),
            Script::Server(FakeServer::accepting()),
        ],
    );
    let result = probe(&connector, "a@example.com", &["mx1"]);
    assert_eq!(result.message, "accepted by mx1 (code 250)");
}

#[test]
fn disconnect_mid_dialog_is_retried() {
    let flaky = FakeServer {
        hang_up_on: Some("RCPT"),
        ..FakeServer::accepting()
    };
    let connector = FakeConnector::new().host(
        "mx1",
        [Script::Server(flaky), Script::Server(FakeServer::accepting())],
    );
    let result = probe(&connector, "a@example.com", &["mx1"]);
    assert!(result.exists);
    assert_eq!(connector.connects("mx1"), 2);
}

#[test]
fn exhausting_all_hosts_reports_failure() {
    let connector = FakeConnector::new()
        .host("mx1", [Script::Refuse, Script::Refuse])
        .host("mx2", [Script::Server(FakeServer::rcpt(450, "busy")), Script::Refuse]);
    let result = probe(&connector, "a@example.com", &["mx1", "mx2"]);
    assert_eq!(result, SmtpProbe::denied("failed for all MX servers"));
    assert_eq!(connector.connects("mx1"), 2);
    assert_eq!(connector.connects("mx2"), 2);
}

fn spawn_server<F>(connections: usize, handler: F) -> (u16, thread::JoinHandle<Vec<String>>)
where
    F: Fn(&str) -> Option<&'static [u8]> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let handle = thread::spawn(move || {
        let mut seen = Vec::new();
        for _ in 0..connections {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut writer = stream;
            let Some(greeting) = handler("") else {
                continue;
            };
            writer.write_all(greeting).unwrap();
            loop {
                let mut line = String::new();
                if reader.read_line(&mut line).unwrap_or(0) == 0 {
                    break;
                }
                let line = line.trim_end().to_string();
                match handler(&line) {
                    Some(reply) => writer.write_all(reply).unwrap(),
                    None => break,
                }
                let quit = line == "QUIT";
                seen.push(line);
                if quit {
                    break;
                }
            }
        }
        seen
    });
    (port, handle)
}

fn loopback_config(port: u16) -> ProbeConfig {
    let mut cfg = config();
    cfg.smtp_port = port;
    cfg.smtp_timeout = Duration::from_secs(5);
    cfg
}

#[test]
fn tcp_session_runs_full_dialog() {
    let (port, server) = spawn_server(1, |line| {
        let reply: &'static [u8] = match line {
            "" => b"220 fake.example ESMTP\r\n",
            l if l.starts_with("EHLO") => {
                b"250-fake.example greets you\r\n250-SIZE 1000\r\n250 8BITMIME\r\n"
            }
            l if l.starts_with("MAIL") => b"250 2.1.0 ok\r\n",
            l if l.starts_with("RCPT") => b"250 2.1.5 ok\r\n",
            "QUIT" => b"221 bye\r\n",
            _ => b"500 unrecognised\r\n",
        };
        Some(reply)
    });

    let result = probe_recipient(
        "Someone@Example.com",
        &hosts(&["127.0.0.1"]),
        &loopback_config(port),
    );
    assert_eq!(result, SmtpProbe::confirmed("accepted by 127.0.0.1 (code 250)"));
    assert_eq!(
        server.join().unwrap(),
        vec![
            "EHLO tester.local",
            "MAIL FROM:<probe@sender.example>",
            "RCPT TO:<someone@example.com>",
            "QUIT",
        ]
    );
}

#[test]
fn tcp_refused_greeting_counts_as_connection_failure() {
    let (port, server) = spawn_server(2, |line| {
        let reply: &'static [u8] = if line.is_empty() {
            b"554 no service\r\n"
        } else {
            b"503 bad sequence\r\n"
        };
        Some(reply)
    });

    let result = probe_recipient("a@example.com", &hosts(&["127.0.0.1"]), &loopback_config(port));
    assert_eq!(result, SmtpProbe::denied("failed for all MX servers"));
    assert!(server.join().unwrap().is_empty());
}

#[test]
fn tcp_reply_with_invalid_utf8_is_still_classified() {
    let (port, server) = spawn_server(1, |line| {
        let reply: &'static [u8] = match line {
            "" => b"220 fake.example ESMTP\r\n",
            l if l.starts_with("RCPT") => b"550 5.1.1 Benutzer unbekannt \xfc user unknown\r\n",
            "QUIT" => b"221 bye\r\n",
            _ => b"250 ok\r\n",
        };
        Some(reply)
    });

    let result = probe_recipient(
        "ghost@example.com",
        &hosts(&["127.0.0.1"]),
        &loopback_config(port),
    );
    assert_eq!(
        result,
        SmtpProbe::denied("rejected by 127.0.0.1 (code 550, user does not exist)")
    );
    assert_eq!(server.join().unwrap().len(), 4);
}

/// Serves `ehlo_reply` to EHLO on two connections and returns the probe
/// result plus the number of EHLO commands the server saw.
fn probe_against_ehlo_reply(ehlo_reply: Vec<u8>) -> (SmtpProbe, usize) {
    let ehlo_reply: &'static [u8] = Box::leak(ehlo_reply.into_boxed_slice());
    let (port, server) = spawn_server(2, move |line| {
        let reply: &'static [u8] = match line {
            "" => b"220 fake.example ESMTP\r\n",
            l if l.starts_with("EHLO") => ehlo_reply,
            "QUIT" => b"221 bye\r\n",
            _ => b"500 unrecognised\r\n",
        };
        Some(reply)
    });

    let result = probe_recipient("a@example.com", &hosts(&["127.0.0.1"]), &loopback_config(port));
    let seen = server.join().unwrap();
    (result, seen.iter().filter(|l| l.starts_with("EHLO")).count())
}

#[test]
fn tcp_oversized_reply_line_is_a_connection_failure() {
    let mut line = b"250 ".to_vec();
    line.resize(MAX_REPLY_LINE + 512, b'x');
    line.extend_from_slice(b"\r\n");

    let (result, ehlo_count) = probe_against_ehlo_reply(line);
    assert_eq!(result, SmtpProbe::denied("failed for all MX servers"));
    assert_eq!(ehlo_count, 2);
}

#[test]
fn tcp_endless_continuation_is_a_connection_failure() {
    let mut reply = Vec::new();
    for _ in 0..MAX_REPLY_LINES + 10 {
        reply.extend_from_slice(b"250-padding\r\n");
    }
    reply.extend_from_slice(b"250 done\r\n");

    let (result, ehlo_count) = probe_against_ehlo_reply(reply);
    assert_eq!(result, SmtpProbe::denied("failed for all MX servers"));
    assert_eq!(ehlo_count, 2);
}

use std::time::Duration;

use clap::{ArgAction, Parser, builder::BoolishValueParser};
use mailverdict::{PLACEHOLDER_SENDER, ProbeConfig};

#[derive(Parser)]
#[command(name = "mailverdict-cli", version, about)]
pub struct Cli {
    /// addresses to verify
    pub emails: Vec<String>,

    /// read addresses from stdin (one per line)
    #[arg(long)]
    pub stdin: bool,

    /// read a JSON array of addresses from stdin (feature `with-serde`)
    #[arg(long, conflicts_with = "stdin")]
    pub json_input: bool,

    /// write report to file (JSON/NDJSON/CSV depending on --format)
    #[arg(long)]
    pub out: Option<String>,

    /// format: human|json|ndjson|csv
    #[arg(long, default_value = "human")]
    pub format: String,

    /// envelope sender used in MAIL FROM
    #[arg(long, env = "SMTP_SENDER_EMAIL", default_value = PLACEHOLDER_SENDER)]
    pub sender: String,

    /// SMTP connect/read timeout (seconds)
    #[arg(long, env = "SMTP_TIMEOUT_SECONDS", default_value_t = 10)]
    pub smtp_timeout: u64,

    /// DNS query timeout (seconds)
    #[arg(long, env = "DNS_TIMEOUT_SECONDS", default_value_t = 5)]
    pub dns_timeout: u64,

    /// enable live SMTP probing (true|false)
    #[arg(
        long,
        env = "ENABLE_SMTP_CHECKS",
        default_value_t = true,
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new()
    )]
    pub smtp_checks: bool,

    /// maximum number of addresses per run
    #[arg(long, env = "MAX_EMAILS_PER_REQUEST", default_value_t = 100)]
    pub max_emails: usize,

    /// name announced in EHLO/HELO (defaults to the local hostname)
    #[arg(long)]
    pub helo: Option<String>,

    #[arg(long, default_value_t = 25)]
    pub smtp_port: u16,

    /// extra domain to flag as disposable (repeatable)
    #[arg(long = "disposable-domain")]
    pub disposable_domains: Vec<String>,

    /// -v info, -vv debug (RUST_LOG takes precedence)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    pub fn clap_command() -> clap::Command {
        <Self as clap::CommandFactory>::command()
    }

    pub fn has_input(&self) -> bool {
        self.stdin || self.json_input || !self.emails.is_empty()
    }

    pub fn probe_config(&self) -> ProbeConfig {
        ProbeConfig {
            sender_address: self.sender.trim().to_string(),
            smtp_timeout: Duration::from_secs(self.smtp_timeout),
            dns_timeout: Duration::from_secs(self.dns_timeout),
            smtp_checks_enabled: self.smtp_checks,
            max_addresses_per_batch: self.max_emails,
            smtp_port: self.smtp_port,
            helo_name: self.helo.clone(),
            extra_disposable_domains: self.disposable_domains.clone(),
        }
    }

    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    }
}

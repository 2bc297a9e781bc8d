use anyhow::{Context, Result, bail};
use mailverdict::{ValidationResult, validate_batch};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use std::io::{self, BufRead};

#[path = "mailverdict-cli/args.rs"]
mod args;
#[path = "mailverdict-cli/output.rs"]
mod output;

use args::Cli;

/// One entry of the input batch.
enum Entry {
    Address(String),
    /// Non-string JSON value, kept in its serialized form.
    NotAString(String),
}

fn init_tracing(default_level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn read_entries(cli: &Cli) -> Result<Vec<Entry>> {
    let mut entries: Vec<Entry> = cli.emails.iter().cloned().map(Entry::Address).collect();
    if cli.stdin {
        for line in io::stdin().lock().lines() {
            entries.push(Entry::Address(line.context("read stdin")?));
        }
    } else if cli.json_input {
        entries.extend(read_json_entries()?);
    }
    Ok(entries)
}

#[cfg(feature = "with-serde")]
fn read_json_entries() -> Result<Vec<Entry>> {
    use std::io::Read;

    let mut raw = String::new();
    io::stdin()
        .lock()
        .read_to_string(&mut raw)
        .context("read stdin")?;
    let values: Vec<serde_json::Value> =
        serde_json::from_str(&raw).context("stdin is not a JSON array")?;
    Ok(values
        .into_iter()
        .map(|value| match value {
            serde_json::Value::String(s) => Entry::Address(s),
            other => Entry::NotAString(other.to_string()),
        })
        .collect())
}

#[cfg(not(feature = "with-serde"))]
fn read_json_entries() -> Result<Vec<Entry>> {
    bail!("--json-input requires the 'with-serde' feature")
}

/// Validates the string entries as one batch and slots the non-string ones
/// back in at their original position.
fn evaluate(entries: Vec<Entry>, config: &mailverdict::ProbeConfig) -> Vec<ValidationResult> {
    let addresses: Vec<&str> = entries
        .iter()
        .filter_map(|entry| match entry {
            Entry::Address(address) => Some(address.as_str()),
            Entry::NotAString(_) => None,
        })
        .collect();
    let mut verdicts = validate_batch(&addresses[..], config).into_iter();

    entries
        .iter()
        .map(|entry| match entry {
            Entry::Address(address) => verdicts
                .next()
                .unwrap_or_else(|| ValidationResult::internal_error(address.trim())),
            Entry::NotAString(raw) => ValidationResult::invalid_input_type(raw.as_str()),
        })
        .collect()
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level());

    if !cli.has_input() {
        Cli::clap_command().print_help()?;
        println!();
        return Ok(());
    }

    let config = cli.probe_config();
    config.validate().context("invalid configuration")?;
    if config.smtp_checks_enabled && config.sender_is_placeholder() {
        warn!(
            sender = %config.sender_address,
            "sender address not configured, SMTP probes will be skipped"
        );
    }

    let entries = read_entries(&cli)?;
    if entries.len() > config.max_addresses_per_batch {
        bail!(
            "batch of {} addresses exceeds the limit of {}",
            entries.len(),
            config.max_addresses_per_batch
        );
    }
    if entries.is_empty() {
        return Ok(());
    }

    info!(count = entries.len(), "validating batch");
    let rows = evaluate(entries, &config);
    output::write_reports(&rows, &cli)?;

    // exit codes: 0 OK, 2 invalid or rejected, 1 fatal
    if output::any_undeliverable(&rows) {
        std::process::exit(2);
    }
    Ok(())
}

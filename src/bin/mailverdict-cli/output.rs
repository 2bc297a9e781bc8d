#[cfg(any(feature = "with-serde", feature = "with-csv"))]
use anyhow::Context;
use anyhow::{Result, bail};

use crate::args::Cli;
use mailverdict::{OverallStatus, ValidationResult};

pub fn write_reports(rows: &[ValidationResult], cli: &Cli) -> Result<()> {
    match cli.format.as_str() {
        "human" => write_human(rows),
        "json" => write_json(rows, cli),
        "ndjson" => write_ndjson(rows, cli),
        "csv" => write_csv(rows, cli),
        other => bail!("unknown --format '{other}', use: human|json|ndjson|csv"),
    }
}

pub fn any_undeliverable(rows: &[ValidationResult]) -> bool {
    rows.iter().any(|row| row.overall_status.is_undeliverable())
}

fn write_human(rows: &[ValidationResult]) -> Result<()> {
    for row in rows {
        print!("{}", render_human(row));
    }
    Ok(())
}

fn tag(status: OverallStatus) -> &'static str {
    match status {
        OverallStatus::ValidSmtpVerified | OverallStatus::ValidSelfVerification => "[OK]",
        OverallStatus::PotentiallyValid => "[UNSURE]",
        s if s.is_undeliverable() => "[INVALID]",
        _ => "[ERROR]",
    }
}

pub fn render_human(row: &ValidationResult) -> String {
    let mut out = format!(
        "{:<9} {} :: {}\n",
        tag(row.overall_status),
        row.email,
        row.overall_status
    );
    if !row.mx_records.is_empty() {
        out.push_str(&format!("          mx: {}\n", row.mx_records.join(", ")));
    }
    if row.smtp_message != "Not Performed" {
        out.push_str(&format!("          smtp: {}\n", row.smtp_message));
    }

    let mut flags = Vec::new();
    if row.is_disposable == Some(true) {
        flags.push("disposable".to_string());
    }
    if row.is_suspicious_local_part == Some(true) {
        match row.suspicious_reason.as_deref() {
            Some(reason) => flags.push(format!("suspicious ({reason})")),
            None => flags.push("suspicious".to_string()),
        }
    }
    if !flags.is_empty() {
        out.push_str(&format!("          flags: {}\n", flags.join(", ")));
    }

    out.push_str(&format!("          hint: {}\n", row.recommendation));
    out
}

#[cfg(feature = "with-serde")]
fn write_json(rows: &[ValidationResult], cli: &Cli) -> Result<()> {
    let s = serde_json::to_string_pretty(rows)?;
    if let Some(path) = &cli.out {
        write_all_atomically(path, s.as_bytes())?;
    } else {
        println!("{s}");
    }
    Ok(())
}

#[cfg(not(feature = "with-serde"))]
fn write_json(_: &[ValidationResult], _: &Cli) -> Result<()> {
    bail!("format=json requires the 'with-serde' feature")
}

#[cfg(feature = "with-serde")]
fn write_ndjson(rows: &[ValidationResult], cli: &Cli) -> Result<()> {
    if let Some(path) = &cli.out {
        let mut buf = Vec::new();
        for row in rows {
            let line = serde_json::to_string(row)?;
            buf.extend_from_slice(line.as_bytes());
            buf.push(b'\n');
        }
        write_all_atomically(path, &buf)?;
    } else {
        for row in rows {
            println!("{}", serde_json::to_string(row)?);
        }
    }
    Ok(())
}

#[cfg(not(feature = "with-serde"))]
fn write_ndjson(_: &[ValidationResult], _: &Cli) -> Result<()> {
    bail!("format=ndjson requires the 'with-serde' feature")
}

#[cfg(feature = "with-csv")]
const CSV_HEADER: [&str; 13] = [
    "email",
    "syntax_valid",
    "domain",
    "domain_has_mx",
    "mx_records",
    "smtp_check_attempted",
    "smtp_user_exists",
    "smtp_message",
    "is_suspicious_local_part",
    "suspicious_reason",
    "is_disposable",
    "overall_status",
    "recommendation",
];

#[cfg(feature = "with-csv")]
fn write_csv(rows: &[ValidationResult], cli: &Cli) -> Result<()> {
    if let Some(path) = &cli.out {
        let mut wtr = csv::Writer::from_writer(Vec::new());
        wtr.write_record(CSV_HEADER)?;
        for row in rows {
            wtr.write_record(csv_record(row))?;
        }
        let data = wtr.into_inner()?;
        write_all_atomically(path, &data)?;
    } else {
        let mut wtr = csv::Writer::from_writer(std::io::stdout());
        wtr.write_record(CSV_HEADER)?;
        for row in rows {
            wtr.write_record(csv_record(row))?;
        }
        wtr.flush()?;
    }
    Ok(())
}

#[cfg(not(feature = "with-csv"))]
fn write_csv(_: &[ValidationResult], _: &Cli) -> Result<()> {
    bail!("format=csv requires the 'with-csv' feature")
}

#[cfg(feature = "with-csv")]
fn csv_record(row: &ValidationResult) -> Vec<String> {
    vec![
        row.email.clone(),
        row.syntax_valid.to_string(),
        row.domain_name.clone().unwrap_or_default(),
        row.domain_has_mx.to_string(),
        row.mx_records.join("|"),
        row.smtp_check_attempted.to_string(),
        row.smtp_user_exists.to_string(),
        row.smtp_message.clone(),
        bool_opt_str(row.is_suspicious_local_part).to_string(),
        row.suspicious_reason.clone().unwrap_or_default(),
        bool_opt_str(row.is_disposable).to_string(),
        row.overall_status.to_string(),
        row.recommendation.clone(),
    ]
}

#[cfg(feature = "with-csv")]
fn bool_opt_str(opt: Option<bool>) -> &'static str {
    match opt {
        Some(true) => "true",
        Some(false) => "false",
        None => "",
    }
}

#[cfg(any(feature = "with-serde", feature = "with-csv"))]
fn write_all_atomically(path: &str, bytes: &[u8]) -> Result<()> {
    use std::io::Write;

    let tmp = format!("{path}.tmp");
    {
        let mut f = std::fs::File::create(&tmp).with_context(|| format!("create {tmp}"))?;
        f.write_all(bytes)?;
        f.sync_all()?;
    }
    std::fs::rename(&tmp, path).with_context(|| format!("rename {tmp} -> {path}"))?;
    Ok(())
}

//! Provenance statements appended to items as they move through review
//!
//! Statements are append-only audit notes. Dates use the DC timestamp form
//! `YYYY-MM-DDThh:mm:ssZ`, always in UTC.

use crate::content::Entity;
use crate::identity::Actor;
use chrono::{DateTime, Utc};
use std::fmt::Write;

pub fn dc_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

fn who(actor: Option<&Actor>) -> String {
    match actor {
        Some(a) => format!(
            "{} ({})",
            a.full_name.as_deref().unwrap_or("Unknown"),
            a.email
        ),
        None => "Unknown".to_string(),
    }
}

/// "No. of bitstreams: N" followed by one line per file
pub fn bitstream_summary(bitstreams: &[Entity]) -> String {
    let mut out = format!("No. of bitstreams: {}\n", bitstreams.len());
    for b in bitstreams {
        let name = b.name.as_deref().unwrap_or("");
        match &b.file {
            Some(file) => {
                let _ = writeln!(
                    out,
                    "{}: {} bytes, checksum: {} ({})",
                    name, file.size_bytes, file.checksum, file.checksum_algorithm
                );
            }
            None => {
                let _ = writeln!(out, "{}", name);
            }
        }
    }
    out
}

pub fn submitted(submitter: Option<&Actor>, at: DateTime<Utc>, bitstreams: &[Entity]) -> String {
    let by = match submitter {
        Some(_) => who(submitter),
        None => "unknown (probably automated)".to_string(),
    };
    format!(
        "Submitted by {} on {}\n{}",
        by,
        dc_timestamp(at),
        bitstream_summary(bitstreams)
    )
}

pub fn approved(actor: Option<&Actor>, at: DateTime<Utc>, bitstreams: &[Entity]) -> String {
    format!(
        "Approved for entry into archive by {} on {} (GMT) {}",
        who(actor),
        dc_timestamp(at),
        bitstream_summary(bitstreams)
    )
}

pub fn rejected(actor: Option<&Actor>, reason: &str, at: DateTime<Utc>) -> String {
    format!(
        "Rejected by {}, reason: {} on {} (GMT) ",
        who(actor),
        reason,
        dc_timestamp(at)
    )
}

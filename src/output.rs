use std::io::{self, Write};

use camino::Utf8Path;
use csv::{QuoteStyle, WriterBuilder};
use serde::Serialize;

use crate::app::{ProgressEvent, ProgressSink, RunSummary};
use crate::domain::{MetadataRecord, Variant};
use crate::error::EnrichError;

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Interactive,
    NonInteractive,
}

/// Writes `records` as a semicolon-delimited file with the variant's header.
pub fn write_records(
    path: &Utf8Path,
    records: &[MetadataRecord],
    variant: Variant,
    placeholder: &str,
) -> Result<(), EnrichError> {
    let write_error = |message: String| EnrichError::OutputWrite {
        path: path.to_path_buf(),
        message,
    };

    let mut writer = WriterBuilder::new()
        .delimiter(b';')
        .quote_style(QuoteStyle::Necessary)
        .from_path(path)
        .map_err(|err| write_error(err.to_string()))?;
    writer
        .write_record(variant.headers())
        .map_err(|err| write_error(err.to_string()))?;
    for record in records {
        writer
            .write_record(record.row(variant, placeholder))
            .map_err(|err| write_error(err.to_string()))?;
    }
    writer.flush().map_err(|err| write_error(err.to_string()))?;
    tracing::info!(path = %path, rows = records.len(), "output written");
    Ok(())
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_summary(summary: &RunSummary) -> io::Result<()> {
        Self::print_json(summary)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

/// Non-interactive runs report progress through the log only; provider
/// failures are logged at warn so the default filter shows them.
impl ProgressSink for JsonOutput {
    fn event(&self, event: ProgressEvent) {
        if event.failure {
            tracing::warn!(elapsed = ?event.elapsed, "{}", event.message);
        } else {
            tracing::debug!(elapsed = ?event.elapsed, "{}", event.message);
        }
    }
}

mod fit;
mod gpx;
pub mod records;
mod tcx;
pub mod xml;

use std::path::Path;

use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};

use crate::error::ParseError;
use crate::types::activity::{FileFormat, ParsedActivity};

pub use fit::decode_records;
pub use records::{parse_records, FieldValue, FitRecord, RecordShape};

pub trait Parser {
    fn parse(&self, bytes: &[u8], src_file: &str) -> Result<ParsedActivity, ParseError>;
}

pub fn parse(
    bytes: &[u8],
    format: FileFormat,
    src_file: &str,
    local: FixedOffset,
) -> Result<ParsedActivity, ParseError> {
    let parsed = match format {
        FileFormat::Tcx => tcx::TcxParser { local }.parse(bytes, src_file),
        FileFormat::Gpx => gpx::GpxParser { local }.parse(bytes, src_file),
        FileFormat::Fit => fit::FitParser { local }.parse(bytes, src_file),
    }?;
    tracing::debug!(
        "parsed {} ({} samples, sport {:?})",
        src_file,
        parsed.samples.len(),
        parsed.header.sport
    );
    Ok(parsed)
}

/// Reads and parses a file, picking the parser from its extension.
pub fn parse_file(path: &Path, local: FixedOffset) -> Result<ParsedActivity, ParseError> {
    let src_file = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let format = FileFormat::from_filename(&src_file)
        .ok_or_else(|| ParseError::UnsupportedFormat(src_file.clone()))?;
    let bytes = std::fs::read(path).map_err(|source| ParseError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse(&bytes, format, &src_file, local)
}

/// Converts an XML timestamp into naive time in the `local` zone.
/// Timestamps without a zone designator are taken as UTC.
pub(crate) fn local_time(raw: &str, local: FixedOffset) -> Result<NaiveDateTime, ParseError> {
    let raw = raw.trim();
    let utc = DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|t| t.and_utc())
        })
        .ok_or_else(|| ParseError::InvalidValue {
            tag: "time".to_string(),
            value: raw.to_string(),
        })?;
    Ok(utc.with_timezone(&local).naive_local())
}

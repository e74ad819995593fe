//! CSV layout of the attendee table.
//!
//! This module reads and writes the on-disk table. Rows are validated on the
//! way in: the header must match [`COLUMNS`], enum cells must hold known
//! labels, and name keys must be unique.

use std::collections::HashSet;
use std::io::{Read, Write};

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::record::{AttendeeRecord, AttendeeType, PaymentStatus};

/// Column names, in file order.
pub const COLUMNS: [&str; 5] = ["name", "phone", "type", "status", "proof_path"];

/// A row as it appears in the file, before enum validation.
#[derive(Debug, Deserialize)]
struct RawRow {
    name: String,
    phone: String,
    #[serde(rename = "type")]
    attendee_type: String,
    status: String,
    proof_path: Option<String>,
}

impl RawRow {
    fn into_record(self) -> std::result::Result<AttendeeRecord, String> {
        if self.name.is_empty() {
            return Err("name is empty".to_string());
        }
        Ok(AttendeeRecord {
            name: self.name,
            phone: self.phone,
            attendee_type: self.attendee_type.parse::<AttendeeType>()?,
            status: self.status.parse::<PaymentStatus>()?,
            proof_path: self.proof_path.filter(|p| !p.is_empty()),
        })
    }
}

/// Parse a table from `reader`.
///
/// A completely empty input is an empty table.
///
/// # Errors
///
/// Returns [`Error::InvalidRecord`] for a wrong header, an unknown type or
/// status, an empty name, or a duplicate name; [`Error::Csv`] for malformed
/// CSV such as rows with the wrong number of fields.
pub fn read_table<R: Read>(reader: R) -> Result<Vec<AttendeeRecord>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    if headers.is_empty() {
        return Ok(Vec::new());
    }
    if !headers.iter().eq(COLUMNS.iter().copied()) {
        return Err(Error::invalid_record(
            1,
            format!(
                "expected header '{}', found '{}'",
                COLUMNS.join(","),
                headers.iter().collect::<Vec<_>>().join(",")
            ),
        ));
    }

    let mut records = Vec::new();
    let mut seen = HashSet::new();
    for row in rdr.records() {
        let row = row?;
        let line = row.position().map_or(0, csv::Position::line);

        let raw: RawRow = row
            .deserialize(Some(&headers))
            .map_err(|e| Error::invalid_record(line, e.to_string()))?;
        let record = raw
            .into_record()
            .map_err(|message| Error::invalid_record(line, message))?;

        if !seen.insert(record.key()) {
            return Err(Error::invalid_record(
                line,
                format!("duplicate name '{}'", record.name),
            ));
        }
        records.push(record);
    }

    Ok(records)
}

/// Write the whole table, header first, to `writer`.
///
/// # Errors
///
/// Returns an error if writing to the underlying writer fails.
pub fn write_table<W: Write>(writer: W, records: &[AttendeeRecord]) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);

    wtr.write_record(COLUMNS)?;
    for record in records {
        wtr.write_record([
            record.name.as_str(),
            record.phone.as_str(),
            record.attendee_type.as_str(),
            record.status.as_str(),
            record.proof_path.as_deref().unwrap_or(""),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

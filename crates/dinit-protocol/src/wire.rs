//! Socket wire form of a token stream.
//!
//! One record, fields separated by a single space, fields containing a
//! space, a quote or a line break wrapped in double quotes with embedded
//! quotes doubled:
//!
//! ```text
//! -r /bin/bash -c "/bin/sleep 10"
//! ```

use std::io::{Read, Write};

use csv::{QuoteStyle, ReaderBuilder, StringRecord, WriterBuilder};

use crate::error::WireError;

const DELIMITER: u8 = b' ';

/// Write `tokens` as a single record.
pub fn write_record<W: Write>(writer: W, tokens: &[String]) -> Result<(), WireError> {
    if tokens.is_empty() {
        return Err(WireError::Empty);
    }
    let mut writer = WriterBuilder::new()
        .delimiter(DELIMITER)
        .has_headers(false)
        .quote_style(QuoteStyle::Necessary)
        .from_writer(writer);
    writer.write_record(tokens)?;
    writer.flush()?;
    Ok(())
}

/// Read the first record from `reader`.
pub fn read_record<R: Read>(reader: R) -> Result<Vec<String>, WireError> {
    let mut reader = ReaderBuilder::new()
        .delimiter(DELIMITER)
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);
    let mut record = StringRecord::new();
    if !reader.read_record(&mut record)? {
        return Err(WireError::Empty);
    }
    Ok(record.iter().map(str::to_string).collect())
}

pub fn to_bytes(tokens: &[String]) -> Result<Vec<u8>, WireError> {
    let mut buf = Vec::new();
    write_record(&mut buf, tokens)?;
    Ok(buf)
}

pub fn from_bytes(payload: &[u8]) -> Result<Vec<String>, WireError> {
    read_record(payload)
}

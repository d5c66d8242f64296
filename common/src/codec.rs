//! On-disk encoding of key-value records.
//!
//! Keys and values may hold newlines, quotes or any other character, so
//! records are written as JSON rather than ad hoc delimited text:
//!
//! * an intermediate segment is a single JSON array holding one bucket's
//!   records in emission order;
//! * a reduce output is a stream of JSON objects, one record per line.

use std::io::{BufRead, Read, Write};

use anyhow::Context;

use crate::KeyValue;

/// Write a whole bucket as one JSON array, followed by a newline.
pub fn encode_segment<W: Write>(writer: &mut W, records: &[KeyValue]) -> anyhow::Result<()> {
    serde_json::to_writer(&mut *writer, records).context("failed to encode segment")?;
    writer.write_all(b"\n")?;
    Ok(())
}

/// Read back a bucket written by [`encode_segment`].
pub fn decode_segment<R: Read>(reader: R) -> anyhow::Result<Vec<KeyValue>> {
    serde_json::from_reader(reader).context("failed to decode segment")
}

/// Append one record to a line-delimited record stream.
pub fn write_record<W: Write>(writer: &mut W, record: &KeyValue) -> anyhow::Result<()> {
    serde_json::to_writer(&mut *writer, record).context("failed to encode record")?;
    writer.write_all(b"\n")?;
    Ok(())
}

/// Read every record of a line-delimited record stream.
pub fn read_records<R: BufRead>(reader: R) -> anyhow::Result<Vec<KeyValue>> {
    serde_json::Deserializer::from_reader(reader)
        .into_iter::<KeyValue>()
        .map(|record| record.context("failed to decode record"))
        .collect()
}

//! Paired header + payload record files.
//!
//! Layout on disk:
//! - 8 byte magic `MESONOP1`
//! - bincode of (file header text, record header text, payload bytes)
//!
//! Both headers are JSON documents whose sections are addressed with
//! slash paths such as `/SourceMesonOperator/Config_info`. The payload is the
//! bincode encoding of the operator body.

pub mod codec;
pub mod header;

pub use codec::{read_elemental, read_group, read_op_key, write_elemental, write_group};
pub use header::{ElementalFileInfo, ElementalRecordInfo, GroupRecordInfo, Side};

use crate::Result;
use crate::error::MesonOpsError;

use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};

pub const MAGIC: [u8; 8] = *b"MESONOP1";

#[derive(Serialize)]
struct ContainerRef<'a> {
    file_header: &'a str,
    record_header: &'a str,
    payload: &'a [u8],
}

#[derive(Deserialize)]
struct Container {
    file_header: String,
    record_header: String,
    payload: Vec<u8>,
}

/// A fully read record file, headers parsed, payload still encoded.
#[derive(Debug, Clone)]
pub struct RawRecord {
    pub file_header: Value,
    pub record_header: Value,
    pub payload: Vec<u8>,
}

/// Write one record file, replacing any existing file at `path`.
pub fn write_record<F, R, P>(
    path: &str,
    file_header: &F,
    record_header: &R,
    payload: &P,
) -> Result<()>
where
    F: Serialize + ?Sized,
    R: Serialize + ?Sized,
    P: Serialize + ?Sized,
{
    let file_text = serde_json::to_string(file_header)?;
    let record_text = serde_json::to_string(record_header)?;
    let body = bincode::serialize(payload).with_context(|| format!("encode payload for {}", path))?;

    let file = File::create(path).with_context(|| format!("create record file {}", path))?;
    let mut w = BufWriter::new(file);
    w.write_all(&MAGIC)
        .with_context(|| format!("write record file {}", path))?;
    bincode::serialize_into(
        &mut w,
        &ContainerRef {
            file_header: &file_text,
            record_header: &record_text,
            payload: &body,
        },
    )
    .with_context(|| format!("write record file {}", path))?;
    w.flush()
        .with_context(|| format!("write record file {}", path))?;
    Ok(())
}

fn open_checked(path: &str) -> Result<BufReader<File>> {
    let file = File::open(path).with_context(|| format!("open record file {}", path))?;
    let mut r = BufReader::new(file);
    let mut magic = [0u8; 8];
    r.read_exact(&mut magic)
        .with_context(|| format!("read record file {}", path))?;
    if magic != MAGIC {
        bail!(MesonOpsError::MalformedElemental {
            path: path.to_string(),
            reason: "bad magic, not a meson operator record file".to_string(),
        });
    }
    Ok(r)
}

fn parse_header(path: &str, text: &str) -> Result<Value> {
    serde_json::from_str(text).with_context(|| format!("parse header of record file {}", path))
}

/// Read only the file header; the record header and payload are not touched.
pub fn read_file_header(path: &str) -> Result<Value> {
    let mut r = open_checked(path)?;
    // The file header is the first field of the container.
    let text: String = bincode::deserialize_from(&mut r)
        .with_context(|| format!("decode file header of {}", path))?;
    parse_header(path, &text)
}

/// Read the file header and the record header, skipping the payload.
pub fn read_headers(path: &str) -> Result<(Value, Value)> {
    let mut r = open_checked(path)?;
    let file_text: String = bincode::deserialize_from(&mut r)
        .with_context(|| format!("decode file header of {}", path))?;
    let record_text: String = bincode::deserialize_from(&mut r)
        .with_context(|| format!("decode record header of {}", path))?;
    Ok((
        parse_header(path, &file_text)?,
        parse_header(path, &record_text)?,
    ))
}

pub fn read_record(path: &str) -> Result<RawRecord> {
    let mut r = open_checked(path)?;
    let c: Container =
        bincode::deserialize_from(&mut r).with_context(|| format!("decode record file {}", path))?;
    Ok(RawRecord {
        file_header: parse_header(path, &c.file_header)?,
        record_header: parse_header(path, &c.record_header)?,
        payload: c.payload,
    })
}

/// Look up a section by slash path, e.g. `/SinkMesonOperator/QuarkSinks`.
pub fn section<'v>(doc: &'v Value, path: &str) -> Result<&'v Value> {
    let mut cur = doc;
    for part in path.split('/').filter(|p| !p.is_empty()) {
        cur = match cur.get(part) {
            Some(v) => v,
            None => bail!(MesonOpsError::NotFound(format!("header section {}", path))),
        };
    }
    Ok(cur)
}

/// Compact text of a section; used for provenance strings and comparisons.
pub fn section_text(doc: &Value, path: &str) -> Result<String> {
    Ok(serde_json::to_string(section(doc, path)?)?)
}

/// Wrap `body` under a single root element.
pub fn rooted<T: Serialize + ?Sized>(root: &str, body: &T) -> Result<Value> {
    let mut map = serde_json::Map::new();
    map.insert(root.to_string(), serde_json::to_value(body)?);
    Ok(Value::Object(map))
}

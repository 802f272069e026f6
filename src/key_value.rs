//! KTX2 key/value data.
//!
//! Each entry is `keyAndValueByteLength: u32`, the UTF-8 key, a NUL, the
//! value bytes, then zero padding up to a 4-byte boundary. Entries are sorted
//! by key, which `BTreeMap` gives for free.

use std::collections::BTreeMap;

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;

use crate::error::ContainerError;

pub type KeyValueData = BTreeMap<String, Vec<u8>>;

pub(crate) fn encode(entries: &KeyValueData) -> Vec<u8> {
    let mut out = Vec::new();
    for (key, value) in entries {
        let length = key.len() + 1 + value.len();
        out.extend_from_slice(&(length as u32).to_le_bytes());
        out.extend_from_slice(key.as_bytes());
        out.push(0);
        out.extend_from_slice(value);
        out.resize(align_up(out.len(), 4), 0);
    }
    out
}

pub(crate) fn decode(bytes: &[u8]) -> Result<KeyValueData, ContainerError> {
    let mut entries = KeyValueData::new();
    let mut rdr = Cursor::new(bytes);

    while (rdr.position() as usize) + 4 <= bytes.len() {
        let length = rdr.read_u32::<LittleEndian>()? as usize;
        let start = rdr.position() as usize;
        let end = start
            .checked_add(length)
            .filter(|end| *end <= bytes.len())
            .ok_or_else(|| {
                ContainerError::KeyValue(format!(
                    "entry at {} claims {} bytes, only {} left",
                    start - 4,
                    length,
                    bytes.len() - start
                ))
            })?;

        let entry = &bytes[start..end];
        let nul = entry
            .iter()
            .position(|b| *b == 0)
            .ok_or_else(|| ContainerError::KeyValue(format!("entry at {} has no key terminator", start - 4)))?;
        let key = std::str::from_utf8(&entry[..nul])
            .map_err(|e| ContainerError::KeyValue(format!("key is not UTF-8: {}", e)))?;
        entries.insert(key.to_string(), entry[nul + 1..].to_vec());

        rdr.set_position(align_up(end, 4).min(bytes.len()) as u64);
    }

    Ok(entries)
}

pub(crate) fn align_up(value: usize, alignment: usize) -> usize {
    value.div_ceil(alignment) * alignment
}

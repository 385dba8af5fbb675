//! Byte encoding of [`Key`] whose lexicographic order is the key order.
//!
//! Layout:
//!
//! ```text
//! row* 00 00 | family u8 | qualifier* 00 00 | order u8 | timestamp u64be | flag u8 | revision u64be
//! ```
//!
//! `*` components escape each `00` byte as `00 ff`, so the `00 00` terminator
//! sorts below any continuation of the component. The timestamp is stored with
//! its sign bit flipped and bit-complemented, newest first, except for inserts
//! of oldest-first families, which keep it uncomplemented. The order byte tells
//! the two apart and puts the delete markers of an oldest-first family ahead of
//! its inserts, so markers always precede the versions they shadow. The flag
//! byte is complemented so broader deletes sort first, and so is the revision.

use std::{borrow::Cow, str};

use super::{Flag, Key, KeyError, AUTO_ASSIGN};
use crate::option::Clock;

const TERMINATOR: [u8; 2] = [0x00, 0x00];
const SUCCESSOR: [u8; 2] = [0x00, 0x01];
const ESCAPED_ZERO: u8 = 0xff;
const SIGN: u64 = 1 << 63;
const FLAG_BASE: u8 = 0x7f;

const NEWEST_FIRST: u8 = 0x00;
const ASCENDING_MARKER: u8 = 0x01;
const ASCENDING_INSERT: u8 = 0x02;

/// Encode `key`, replacing an [`AUTO_ASSIGN`] timestamp with the wall clock.
pub fn encode(key: &Key, time_order_ascending: bool) -> Vec<u8> {
    encode_at(key, time_order_ascending, Clock::System.now())
}

/// Encode `key`, replacing an [`AUTO_ASSIGN`] timestamp with `now`.
pub fn encode_at(key: &Key, time_order_ascending: bool, now: i64) -> Vec<u8> {
    let mut buf = Vec::with_capacity(key.row.len() + key.column_qualifier.len() + 25);
    encode_into(&mut buf, key, time_order_ascending, now);
    buf
}

/// Append the encoding of `key` to `buf`.
pub fn encode_into(buf: &mut Vec<u8>, key: &Key, time_order_ascending: bool, now: i64) {
    let timestamp = if key.timestamp == AUTO_ASSIGN {
        now
    } else {
        key.timestamp
    };
    put_component(buf, key.row.as_bytes());
    buf.extend_from_slice(&TERMINATOR);
    buf.push(key.column_family_code);
    put_component(buf, key.column_qualifier.as_bytes());
    buf.extend_from_slice(&TERMINATOR);
    let order = match (time_order_ascending, key.flag.is_delete()) {
        (false, _) => NEWEST_FIRST,
        (true, true) => ASCENDING_MARKER,
        (true, false) => ASCENDING_INSERT,
    };
    buf.push(order);
    buf.extend_from_slice(&timestamp_bytes(timestamp, order == ASCENDING_INSERT));
    buf.push(FLAG_BASE - key.flag.as_u8());
    buf.extend_from_slice(&(!((key.revision as u64) ^ SIGN)).to_be_bytes());
}

/// Decode a stored key.
pub fn decode(bytes: &[u8]) -> Result<Key, KeyError> {
    let mut key = Key::default();
    decode_into(bytes, &mut key)?;
    Ok(key)
}

/// Decode a stored key into `key`, reusing its string buffers.
pub fn decode_into(bytes: &[u8], key: &mut Key) -> Result<(), KeyError> {
    let mut pos = 0;

    let row = take_component(bytes, &mut pos, "row")?;
    fill(&mut key.row, row, "row")?;

    key.column_family_code = *bytes.get(pos).ok_or(KeyError::Truncated("family"))?;
    pos += 1;

    let qualifier = take_component(bytes, &mut pos, "qualifier")?;
    fill(&mut key.column_qualifier, qualifier, "qualifier")?;

    let order = *bytes.get(pos).ok_or(KeyError::Truncated("order"))?;
    pos += 1;
    let raw_ts = take_u64(bytes, &mut pos, "timestamp")?;
    let flag_byte = *bytes.get(pos).ok_or(KeyError::Truncated("flag"))?;
    pos += 1;
    let raw_revision = take_u64(bytes, &mut pos, "revision")?;
    if pos != bytes.len() {
        return Err(KeyError::TrailingBytes(bytes.len() - pos));
    }

    let ordered = if order == ASCENDING_INSERT { raw_ts } else { !raw_ts };
    key.timestamp = (ordered ^ SIGN) as i64;
    key.flag = Flag::try_from(FLAG_BASE.wrapping_sub(flag_byte))
        .map_err(|_| KeyError::UnknownFlag(flag_byte))?;
    let consistent = match order {
        NEWEST_FIRST => true,
        ASCENDING_MARKER => key.flag.is_delete(),
        ASCENDING_INSERT => !key.flag.is_delete(),
        _ => false,
    };
    if !consistent {
        return Err(KeyError::UnknownOrder(order));
    }
    key.revision = (!raw_revision ^ SIGN) as i64;
    Ok(())
}

/// Smallest encoding of any key in `row`; every key of the row starts with it.
pub fn row_prefix(row: &str) -> Vec<u8> {
    let mut buf = Vec::with_capacity(row.len() + 2);
    put_component(&mut buf, row.as_bytes());
    buf.extend_from_slice(&TERMINATOR);
    buf
}

/// Greater than every key in `row` and smaller than every key of later rows.
pub fn row_successor(row: &str) -> Vec<u8> {
    let mut buf = Vec::with_capacity(row.len() + 2);
    put_component(&mut buf, row.as_bytes());
    buf.extend_from_slice(&SUCCESSOR);
    buf
}

/// Prefix shared by every key of `family` in `row`.
pub fn family_prefix(row: &str, family: u8) -> Vec<u8> {
    let mut buf = row_prefix(row);
    buf.push(family);
    buf
}

/// Greater than every key of `family` in `row`.
pub fn family_successor(row: &str, family: u8) -> Vec<u8> {
    match family.checked_add(1) {
        Some(next) => family_prefix(row, next),
        None => row_successor(row),
    }
}

/// Prefix shared by every version of one cell.
pub fn cell_prefix(row: &str, family: u8, qualifier: &str) -> Vec<u8> {
    let mut buf = family_prefix(row, family);
    put_component(&mut buf, qualifier.as_bytes());
    buf.extend_from_slice(&TERMINATOR);
    buf
}

/// Greater than every version of one cell.
pub fn cell_successor(row: &str, family: u8, qualifier: &str) -> Vec<u8> {
    let mut buf = family_prefix(row, family);
    put_component(&mut buf, qualifier.as_bytes());
    buf.extend_from_slice(&SUCCESSOR);
    buf
}

/// Smallest encoding of the inserted versions of one cell at `timestamp`.
///
/// In oldest-first families the delete markers of the cell sort before it.
pub fn version_prefix(
    row: &str,
    family: u8,
    qualifier: &str,
    timestamp: i64,
    time_order_ascending: bool,
) -> Vec<u8> {
    let mut buf = cell_prefix(row, family, qualifier);
    buf.push(if time_order_ascending {
        ASCENDING_INSERT
    } else {
        NEWEST_FIRST
    });
    buf.extend_from_slice(&timestamp_bytes(timestamp, time_order_ascending));
    buf
}

fn timestamp_bytes(timestamp: i64, oldest_first: bool) -> [u8; 8] {
    let ordered = (timestamp as u64) ^ SIGN;
    if oldest_first {
        ordered.to_be_bytes()
    } else {
        (!ordered).to_be_bytes()
    }
}

fn put_component(buf: &mut Vec<u8>, bytes: &[u8]) {
    for &byte in bytes {
        buf.push(byte);
        if byte == 0 {
            buf.push(ESCAPED_ZERO);
        }
    }
}

fn take_component<'b>(
    bytes: &'b [u8],
    pos: &mut usize,
    component: &'static str,
) -> Result<Cow<'b, [u8]>, KeyError> {
    let start = *pos;
    let mut owned: Option<Vec<u8>> = None;
    let mut i = start;
    loop {
        let zero = bytes[i..]
            .iter()
            .position(|&b| b == 0)
            .map(|offset| i + offset)
            .ok_or(KeyError::Unterminated(component))?;
        let next = *bytes
            .get(zero + 1)
            .ok_or(KeyError::Unterminated(component))?;
        match next {
            0x00 => {
                *pos = zero + 2;
                return Ok(match owned {
                    Some(mut buf) => {
                        buf.extend_from_slice(&bytes[i..zero]);
                        Cow::Owned(buf)
                    }
                    None => Cow::Borrowed(&bytes[start..zero]),
                });
            }
            ESCAPED_ZERO => {
                let buf = owned.get_or_insert_with(Vec::new);
                buf.extend_from_slice(&bytes[i..=zero]);
                i = zero + 2;
            }
            byte => return Err(KeyError::BadEscape { byte, component }),
        }
    }
}

fn fill(
    target: &mut String,
    bytes: Cow<'_, [u8]>,
    component: &'static str,
) -> Result<(), KeyError> {
    let text = str::from_utf8(&bytes).map_err(|_| KeyError::InvalidUtf8(component))?;
    target.clear();
    target.push_str(text);
    Ok(())
}

fn take_u64(bytes: &[u8], pos: &mut usize, component: &'static str) -> Result<u64, KeyError> {
    let end = *pos + 8;
    let raw: [u8; 8] = bytes
        .get(*pos..end)
        .and_then(|slice| slice.try_into().ok())
        .ok_or(KeyError::Truncated(component))?;
    *pos = end;
    Ok(u64::from_be_bytes(raw))
}

//! RESP3 reply decoder.
//!
//! RESP3 is a superset of RESP2, so this decoder handles every RESP2 marker
//! plus the types introduced with Redis 6: explicit null, booleans, doubles,
//! big numbers, blob errors, verbatim strings, maps, sets and push frames.
//! Attribute frames (`|`) carry metadata this client does not surface; they
//! are decoded and discarded, yielding the value they decorate.
//!
//! There is no RESP3 encoder: commands are arrays of bulk strings on both
//! protocol versions, so the RESP2 encoder serves both.

use super::resp2;
use bytes::Buf;
use redwire_core::{Error, Result, Value};
use std::io::Cursor;

/// Decode one RESP3 frame, if the buffer holds a complete one.
///
/// Like the RESP2 decoder, returns `Ok(None)` without consuming anything
/// when the frame is incomplete.
///
/// # Errors
///
/// Returns [`Error::Protocol`] on malformed data.
pub fn decode(cursor: &mut Cursor<&[u8]>) -> Result<Option<Value>> {
    let Some(marker) = peek(cursor) else {
        return Ok(None);
    };

    match marker {
        // RESP2 subset
        b'+' | b'-' | b':' => resp2::decode(cursor),
        b'$' => decode_blob(cursor, false),
        b'*' => decode_sequence(cursor, SequenceKind::Array),
        // RESP3 additions
        b'_' => decode_null(cursor),
        b'#' => decode_bool(cursor),
        b',' => decode_double(cursor),
        b'(' => decode_big_number(cursor),
        b'!' => decode_blob(cursor, true),
        b'=' => decode_verbatim(cursor),
        b'%' => decode_map(cursor),
        b'~' => decode_sequence(cursor, SequenceKind::Set),
        b'>' => decode_sequence(cursor, SequenceKind::Push),
        b'|' => decode_attribute(cursor),
        other => Err(Error::Protocol(format!(
            "unexpected RESP3 type marker {:?}",
            other as char
        ))),
    }
}

enum SequenceKind {
    Array,
    Set,
    Push,
}

fn peek(cursor: &Cursor<&[u8]>) -> Option<u8> {
    cursor
        .get_ref()
        .get(cursor.position() as usize)
        .copied()
}

fn decode_null(cursor: &mut Cursor<&[u8]>) -> Result<Option<Value>> {
    let start = cursor.position();
    cursor.advance(1);
    match resp2::read_line(cursor)? {
        Some(line) if line.is_empty() => Ok(Some(Value::Nil)),
        Some(line) => Err(Error::Protocol(format!(
            "null frame carries payload {:?}",
            String::from_utf8_lossy(&line)
        ))),
        None => {
            cursor.set_position(start);
            Ok(None)
        }
    }
}

fn decode_bool(cursor: &mut Cursor<&[u8]>) -> Result<Option<Value>> {
    let start = cursor.position();
    cursor.advance(1);
    match resp2::read_line(cursor)? {
        Some(line) => match line.as_slice() {
            b"t" => Ok(Some(Value::Bool(true))),
            b"f" => Ok(Some(Value::Bool(false))),
            other => Err(Error::Protocol(format!(
                "invalid boolean payload {:?}",
                String::from_utf8_lossy(other)
            ))),
        },
        None => {
            cursor.set_position(start);
            Ok(None)
        }
    }
}

fn decode_double(cursor: &mut Cursor<&[u8]>) -> Result<Option<Value>> {
    let start = cursor.position();
    cursor.advance(1);
    match resp2::read_line(cursor)? {
        Some(line) => {
            let s = std::str::from_utf8(&line)
                .map_err(|e| Error::Protocol(format!("double is not UTF-8: {e}")))?;
            let d = match s {
                "inf" => f64::INFINITY,
                "-inf" => f64::NEG_INFINITY,
                "nan" => f64::NAN,
                _ => s
                    .parse::<f64>()
                    .map_err(|e| Error::Protocol(format!("invalid double {s:?}: {e}")))?,
            };
            Ok(Some(Value::Double(d)))
        }
        None => {
            cursor.set_position(start);
            Ok(None)
        }
    }
}

fn decode_big_number(cursor: &mut Cursor<&[u8]>) -> Result<Option<Value>> {
    let start = cursor.position();
    cursor.advance(1);
    match resp2::read_line(cursor)? {
        Some(line) => {
            let s = resp2::utf8(&line)?;
            if s.is_empty()
                || !s
                    .strip_prefix('-')
                    .unwrap_or(&s)
                    .bytes()
                    .all(|b| b.is_ascii_digit())
            {
                return Err(Error::Protocol(format!("invalid big number {s:?}")));
            }
            Ok(Some(Value::BigNumber(s)))
        }
        None => {
            cursor.set_position(start);
            Ok(None)
        }
    }
}

fn decode_blob(cursor: &mut Cursor<&[u8]>, is_error: bool) -> Result<Option<Value>> {
    let start = cursor.position();
    cursor.advance(1);

    let Some(len_line) = resp2::read_line(cursor)? else {
        cursor.set_position(start);
        return Ok(None);
    };
    let len = resp2::parse_int(&len_line)?;

    if len == -1 {
        // RESP2-style nil bulk, still legal on a RESP3 connection.
        return Ok(Some(Value::Nil));
    }
    if len < 0 {
        return Err(Error::Protocol(format!("negative blob length {len}")));
    }

    let len = len as usize;
    if cursor.remaining() < len + 2 {
        cursor.set_position(start);
        return Ok(None);
    }

    let data = cursor.chunk()[..len].to_vec();
    cursor.advance(len);
    resp2::expect_crlf(cursor)?;

    if is_error {
        Ok(Some(Value::Error(resp2::utf8(&data)?)))
    } else {
        Ok(Some(Value::Bulk(data.into())))
    }
}

fn decode_verbatim(cursor: &mut Cursor<&[u8]>) -> Result<Option<Value>> {
    let start = cursor.position();
    let blob = match decode_blob(cursor, false)? {
        Some(Value::Bulk(b)) => b,
        Some(Value::Nil) => return Err(Error::Protocol("nil verbatim string".to_string())),
        Some(_) => unreachable!("decode_blob yields bulk or nil"),
        None => {
            cursor.set_position(start);
            return Ok(None);
        }
    };

    let text = resp2::utf8(&blob)?;
    match text.split_once(':') {
        Some((format, payload)) if format.len() == 3 => Ok(Some(Value::Verbatim {
            format: format.to_string(),
            text: payload.to_string(),
        })),
        _ => Err(Error::Protocol(
            "verbatim string is missing its format prefix".to_string(),
        )),
    }
}

fn decode_sequence(cursor: &mut Cursor<&[u8]>, kind: SequenceKind) -> Result<Option<Value>> {
    let start = cursor.position();
    cursor.advance(1);

    let Some(len_line) = resp2::read_line(cursor)? else {
        cursor.set_position(start);
        return Ok(None);
    };
    let len = resp2::parse_int(&len_line)?;

    if len == -1 {
        return Ok(Some(Value::Nil));
    }
    if len < 0 {
        return Err(Error::Protocol(format!("negative sequence length {len}")));
    }

    let mut items = Vec::with_capacity(len as usize);
    for _ in 0..len {
        match decode(cursor)? {
            Some(item) => items.push(item),
            None => {
                cursor.set_position(start);
                return Ok(None);
            }
        }
    }

    Ok(Some(match kind {
        SequenceKind::Array => Value::Array(items),
        SequenceKind::Set => Value::Set(items),
        SequenceKind::Push => Value::Push(items),
    }))
}

fn decode_map(cursor: &mut Cursor<&[u8]>) -> Result<Option<Value>> {
    let start = cursor.position();
    match decode_pairs(cursor)? {
        Some(pairs) => Ok(Some(Value::Map(pairs))),
        None => {
            cursor.set_position(start);
            Ok(None)
        }
    }
}

fn decode_attribute(cursor: &mut Cursor<&[u8]>) -> Result<Option<Value>> {
    let start = cursor.position();

    // The attribute map itself is metadata; decode it to move past it.
    if decode_pairs(cursor)?.is_none() {
        cursor.set_position(start);
        return Ok(None);
    }

    match decode(cursor)? {
        Some(value) => Ok(Some(value)),
        None => {
            cursor.set_position(start);
            Ok(None)
        }
    }
}

fn decode_pairs(cursor: &mut Cursor<&[u8]>) -> Result<Option<Vec<(Value, Value)>>> {
    let start = cursor.position();
    cursor.advance(1);

    let Some(len_line) = resp2::read_line(cursor)? else {
        cursor.set_position(start);
        return Ok(None);
    };
    let len = resp2::parse_int(&len_line)?;
    if len < 0 {
        return Err(Error::Protocol(format!("negative map length {len}")));
    }

    let mut pairs = Vec::with_capacity(len as usize);
    for _ in 0..len {
        let Some(key) = decode(cursor)? else {
            cursor.set_position(start);
            return Ok(None);
        };
        let Some(value) = decode(cursor)? else {
            cursor.set_position(start);
            return Ok(None);
        };
        pairs.push((key, value));
    }
    Ok(Some(pairs))
}

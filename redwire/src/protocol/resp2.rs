//! RESP2 codec.
//!
//! Decoding is incremental: [`decode`] returns `Ok(None)` when the buffer
//! does not yet hold a complete frame and leaves the cursor untouched, so the
//! connection can read more bytes and retry. Encoding only ever has to
//! produce command frames, which are arrays of bulk strings on both protocol
//! versions.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use redwire_core::{Error, Result, Value};
use std::io::Cursor;

const CRLF: &[u8] = b"\r\n";

/// Append an encoded command (array of bulk strings) to `buf`.
pub fn encode_command(buf: &mut BytesMut, name: &str, args: &[Bytes]) {
    write_header(buf, b'*', (1 + args.len()) as i64);
    write_bulk(buf, name.as_bytes());
    for arg in args {
        write_bulk(buf, arg);
    }
}

fn write_header(buf: &mut BytesMut, marker: u8, n: i64) {
    buf.put_u8(marker);
    buf.put_slice(n.to_string().as_bytes());
    buf.put_slice(CRLF);
}

fn write_bulk(buf: &mut BytesMut, data: &[u8]) {
    write_header(buf, b'$', data.len() as i64);
    buf.put_slice(data);
    buf.put_slice(CRLF);
}

/// Decode one RESP2 frame, if the buffer holds a complete one.
///
/// # Errors
///
/// Returns [`Error::Protocol`] on malformed data.
pub fn decode(cursor: &mut Cursor<&[u8]>) -> Result<Option<Value>> {
    let Some(marker) = peek(cursor) else {
        return Ok(None);
    };

    match marker {
        b'+' => decode_line(cursor, |line| Ok(Value::Simple(utf8(line)?))),
        b'-' => decode_line(cursor, |line| Ok(Value::Error(utf8(line)?))),
        b':' => decode_line(cursor, |line| Ok(Value::Int(parse_int(line)?))),
        b'$' => decode_bulk(cursor),
        b'*' => decode_array(cursor),
        other => Err(Error::Protocol(format!(
            "unexpected RESP2 type marker {:?}",
            other as char
        ))),
    }
}

fn peek(cursor: &Cursor<&[u8]>) -> Option<u8> {
    cursor
        .get_ref()
        .get(cursor.position() as usize)
        .copied()
}

fn decode_line(
    cursor: &mut Cursor<&[u8]>,
    build: impl FnOnce(&[u8]) -> Result<Value>,
) -> Result<Option<Value>> {
    let start = cursor.position();
    cursor.advance(1);
    match read_line(cursor)? {
        Some(line) => build(&line).map(Some),
        None => {
            cursor.set_position(start);
            Ok(None)
        }
    }
}

fn decode_bulk(cursor: &mut Cursor<&[u8]>) -> Result<Option<Value>> {
    let start = cursor.position();
    cursor.advance(1);

    let Some(len_line) = read_line(cursor)? else {
        cursor.set_position(start);
        return Ok(None);
    };
    let len = parse_int(&len_line)?;

    if len == -1 {
        return Ok(Some(Value::Nil));
    }
    if len < 0 {
        return Err(Error::Protocol(format!("negative bulk length {len}")));
    }

    let len = len as usize;
    if cursor.remaining() < len + 2 {
        cursor.set_position(start);
        return Ok(None);
    }

    let data = Bytes::copy_from_slice(&cursor.chunk()[..len]);
    cursor.advance(len);
    expect_crlf(cursor)?;
    Ok(Some(Value::Bulk(data)))
}

fn decode_array(cursor: &mut Cursor<&[u8]>) -> Result<Option<Value>> {
    let start = cursor.position();
    cursor.advance(1);

    let Some(len_line) = read_line(cursor)? else {
        cursor.set_position(start);
        return Ok(None);
    };
    let len = parse_int(&len_line)?;

    if len == -1 {
        return Ok(Some(Value::Nil));
    }
    if len < 0 {
        return Err(Error::Protocol(format!("negative array length {len}")));
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
    Ok(Some(Value::Array(items)))
}

pub(crate) fn read_line(cursor: &mut Cursor<&[u8]>) -> Result<Option<Vec<u8>>> {
    let start = cursor.position() as usize;
    let slice = cursor.get_ref();

    for i in start..slice.len().saturating_sub(1) {
        if slice[i] == b'\r' {
            if slice[i + 1] != b'\n' {
                return Err(Error::Protocol("bare CR inside a protocol line".to_string()));
            }
            let line = slice[start..i].to_vec();
            cursor.set_position((i + 2) as u64);
            return Ok(Some(line));
        }
    }
    Ok(None)
}

pub(crate) fn utf8(line: &[u8]) -> Result<String> {
    String::from_utf8(line.to_vec())
        .map_err(|e| Error::Protocol(format!("line is not UTF-8: {e}")))
}

pub(crate) fn parse_int(line: &[u8]) -> Result<i64> {
    let s = std::str::from_utf8(line)
        .map_err(|e| Error::Protocol(format!("length line is not UTF-8: {e}")))?;
    s.parse::<i64>()
        .map_err(|e| Error::Protocol(format!("invalid integer {s:?}: {e}")))
}

pub(crate) fn expect_crlf(cursor: &mut Cursor<&[u8]>) -> Result<()> {
    if cursor.remaining() < 2 {
        return Err(Error::Protocol("frame truncated before CRLF".to_string()));
    }
    let chunk = cursor.chunk();
    if &chunk[..2] != CRLF {
        return Err(Error::Protocol("expected CRLF after payload".to_string()));
    }
    cursor.advance(2);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(data: &[u8]) -> Option<Value> {
        let mut cursor = Cursor::new(data);
        decode(&mut cursor).unwrap()
    }

    #[test]
    fn encodes_commands_as_bulk_arrays() {
        let mut buf = BytesMut::new();
        encode_command(&mut buf, "GET", &[Bytes::from_static(b"mykey")]);
        assert_eq!(&buf[..], b"*2\r\n$3\r\nGET\r\n$5\r\nmykey\r\n");

        let mut buf = BytesMut::new();
        encode_command(&mut buf, "PING", &[]);
        assert_eq!(&buf[..], b"*1\r\n$4\r\nPING\r\n");
    }

    #[test]
    fn decodes_scalars() {
        assert_eq!(decode_all(b"+OK\r\n"), Some(Value::ok()));
        assert_eq!(
            decode_all(b"-ERR boom\r\n"),
            Some(Value::Error("ERR boom".to_string()))
        );
        assert_eq!(decode_all(b":-42\r\n"), Some(Value::Int(-42)));
        assert_eq!(
            decode_all(b"$6\r\nfoobar\r\n"),
            Some(Value::Bulk(Bytes::from_static(b"foobar")))
        );
        assert_eq!(decode_all(b"$-1\r\n"), Some(Value::Nil));
        assert_eq!(decode_all(b"*-1\r\n"), Some(Value::Nil));
    }

    #[test]
    fn decodes_nested_arrays() {
        let value = decode_all(b"*2\r\n*2\r\n+a\r\n:1\r\n$0\r\n\r\n").unwrap();
        assert_eq!(
            value,
            Value::Array(vec![
                Value::Array(vec![Value::Simple("a".to_string()), Value::Int(1)]),
                Value::Bulk(Bytes::new()),
            ])
        );
    }

    #[test]
    fn incomplete_frames_do_not_consume() {
        for partial in [
            &b"+OK\r"[..],
            &b"$6\r\nfoo"[..],
            &b"*2\r\n+a\r\n"[..],
            &b":12"[..],
        ] {
            let mut cursor = Cursor::new(partial);
            assert_eq!(decode(&mut cursor).unwrap(), None);
            assert_eq!(cursor.position(), 0, "partial {partial:?} moved the cursor");
        }
    }

    #[test]
    fn consumes_exactly_one_frame() {
        let data = b":1\r\n:2\r\n";
        let mut cursor = Cursor::new(&data[..]);
        assert_eq!(decode(&mut cursor).unwrap(), Some(Value::Int(1)));
        assert_eq!(cursor.position(), 4);
        assert_eq!(decode(&mut cursor).unwrap(), Some(Value::Int(2)));
    }

    #[test]
    fn rejects_garbage_marker() {
        let mut cursor = Cursor::new(&b"?what\r\n"[..]);
        assert!(decode(&mut cursor).is_err());
    }

    #[test]
    fn bulk_payload_may_contain_crlf() {
        let value = decode_all(b"$8\r\nab\r\ncd\r\n\r\n").unwrap();
        assert_eq!(value, Value::Bulk(Bytes::from_static(b"ab\r\ncd\r\n")));
    }
}

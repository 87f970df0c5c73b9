//! Wire protocol: RESP2 codec, RESP3 decoder and version dispatch.
//!
//! Version negotiation itself (the HELLO exchange) lives in the connection
//! layer, since it is part of the handshake; this module only knows how to
//! turn bytes into [`Value`]s for a given version.

pub mod resp2;
pub mod resp3;

use bytes::{Bytes, BytesMut};
use redwire_core::{ProtocolVersion, Result, Value};
use std::io::Cursor;

pub use resp2::encode_command;

/// Decode one frame for the given protocol version.
///
/// Returns `Ok(None)` when the buffer does not yet hold a complete frame;
/// the cursor is left untouched in that case.
///
/// # Errors
///
/// Propagates protocol errors from the underlying decoder.
pub fn decode(version: ProtocolVersion, cursor: &mut Cursor<&[u8]>) -> Result<Option<Value>> {
    match version {
        ProtocolVersion::Resp2 => resp2::decode(cursor),
        ProtocolVersion::Resp3 => resp3::decode(cursor),
    }
}

/// Encode a command into a standalone buffer.
#[must_use]
pub fn command_bytes(name: &str, args: &[Bytes]) -> Bytes {
    let mut buf = BytesMut::new();
    encode_command(&mut buf, name, args);
    buf.freeze()
}

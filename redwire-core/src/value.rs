//! Unified reply value model.
//!
//! One enum covers both RESP2 and RESP3 replies, so everything above the
//! decoder is protocol-version agnostic. RESP3-only shapes (`Double`, `Bool`,
//! `Map`, ...) simply never show up on a RESP2 connection. Maps are kept as
//! ordered pairs rather than a hash map: the server's order is preserved and
//! non-string keys survive.

use crate::error::{Error, Result};
use bytes::Bytes;

/// A decoded reply.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// `+OK\r\n`
    Simple(String),
    /// `-ERR message\r\n` or `!<len>\r\n...` (RESP3 blob error)
    Error(String),
    /// `:1000\r\n`
    Int(i64),
    /// `$6\r\nfoobar\r\n`
    Bulk(Bytes),
    /// `$-1\r\n`, `*-1\r\n` or `_\r\n`
    Nil,
    /// `*2\r\n...`
    Array(Vec<Value>),
    /// `,3.14\r\n` (RESP3)
    Double(f64),
    /// `#t\r\n` / `#f\r\n` (RESP3)
    Bool(bool),
    /// `(3492890328409238509324850943850\r\n` (RESP3)
    BigNumber(String),
    /// `=15\r\ntxt:Some string\r\n` (RESP3)
    Verbatim {
        /// Three-letter format tag, e.g. `txt` or `mkd`
        format: String,
        /// The payload
        text: String,
    },
    /// `%2\r\n...` (RESP3), insertion-ordered
    Map(Vec<(Value, Value)>),
    /// `~3\r\n...` (RESP3)
    Set(Vec<Value>),
    /// `>4\r\n...` (RESP3 out-of-band push)
    Push(Vec<Value>),
}

impl Value {
    /// Shorthand for the `+OK` reply, handy in tests.
    #[must_use]
    pub fn ok() -> Self {
        Self::Simple("OK".to_string())
    }

    /// Whether this is a nil reply.
    #[must_use]
    pub const fn is_nil(&self) -> bool {
        matches!(self, Self::Nil)
    }

    /// Whether this is an error reply.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// Name of the reply shape, for diagnostics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Simple(_) => "simple-string",
            Self::Error(_) => "error",
            Self::Int(_) => "integer",
            Self::Bulk(_) => "bulk-string",
            Self::Nil => "nil",
            Self::Array(_) => "array",
            Self::Double(_) => "double",
            Self::Bool(_) => "boolean",
            Self::BigNumber(_) => "big-number",
            Self::Verbatim { .. } => "verbatim-string",
            Self::Map(_) => "map",
            Self::Set(_) => "set",
            Self::Push(_) => "push",
        }
    }

    /// View the textual payloads as bytes.
    ///
    /// # Errors
    ///
    /// Fails for nil and structural shapes.
    pub fn as_bytes(&self) -> Result<Bytes> {
        match self {
            Self::Bulk(b) => Ok(b.clone()),
            Self::Simple(s) | Self::BigNumber(s) => Ok(Bytes::copy_from_slice(s.as_bytes())),
            Self::Verbatim { text, .. } => Ok(Bytes::copy_from_slice(text.as_bytes())),
            Self::Nil => Err(Error::Conversion("reply is nil".to_string())),
            other => Err(Error::Conversion(format!(
                "cannot read {} reply as bytes",
                other.kind()
            ))),
        }
    }

    /// Consume the value as a UTF-8 string.
    ///
    /// # Errors
    ///
    /// Fails for nil, structural shapes and non-UTF-8 bulk payloads.
    pub fn into_string(self) -> Result<String> {
        match self {
            Self::Simple(s) | Self::BigNumber(s) => Ok(s),
            Self::Verbatim { text, .. } => Ok(text),
            Self::Bulk(b) => String::from_utf8(b.to_vec())
                .map_err(|e| Error::Conversion(format!("bulk string is not UTF-8: {e}"))),
            Self::Int(i) => Ok(i.to_string()),
            Self::Double(d) => Ok(d.to_string()),
            Self::Nil => Err(Error::Conversion("reply is nil".to_string())),
            other => Err(Error::Conversion(format!(
                "cannot read {} reply as a string",
                other.kind()
            ))),
        }
    }

    /// Read the value as a signed integer.
    ///
    /// # Errors
    ///
    /// Fails when the shape is not numeric and not a parseable string.
    pub fn as_int(&self) -> Result<i64> {
        match self {
            Self::Int(i) => Ok(*i),
            Self::Bool(b) => Ok(i64::from(*b)),
            Self::Bulk(b) => {
                let s = std::str::from_utf8(b)
                    .map_err(|e| Error::Conversion(format!("bulk string is not UTF-8: {e}")))?;
                s.parse::<i64>()
                    .map_err(|e| Error::Conversion(format!("cannot parse {s:?} as integer: {e}")))
            }
            Self::Simple(s) => s
                .parse::<i64>()
                .map_err(|e| Error::Conversion(format!("cannot parse {s:?} as integer: {e}"))),
            other => Err(Error::Conversion(format!(
                "cannot read {} reply as an integer",
                other.kind()
            ))),
        }
    }

    /// Read the value as a float. Accepts the `inf`/`-inf` spellings Redis
    /// uses for unbounded scores.
    ///
    /// # Errors
    ///
    /// Fails when the shape is not numeric and not a parseable string.
    pub fn as_float(&self) -> Result<f64> {
        match self {
            Self::Double(d) => Ok(*d),
            #[allow(clippy::cast_precision_loss)]
            Self::Int(i) => Ok(*i as f64),
            Self::Bulk(b) => {
                let s = std::str::from_utf8(b)
                    .map_err(|e| Error::Conversion(format!("bulk string is not UTF-8: {e}")))?;
                parse_float(s)
            }
            Self::Simple(s) => parse_float(s),
            other => Err(Error::Conversion(format!(
                "cannot read {} reply as a float",
                other.kind()
            ))),
        }
    }

    /// Read the value as a boolean. `+OK` and `:1`/`:0` count.
    ///
    /// # Errors
    ///
    /// Fails for shapes with no boolean reading.
    pub fn as_bool(&self) -> Result<bool> {
        match self {
            Self::Bool(b) => Ok(*b),
            Self::Int(0) => Ok(false),
            Self::Int(1) => Ok(true),
            Self::Simple(s) if s == "OK" => Ok(true),
            other => Err(Error::Conversion(format!(
                "cannot read {} reply as a boolean",
                other.kind()
            ))),
        }
    }

    /// Consume the value as a sequence of elements.
    ///
    /// Arrays, sets and push frames all qualify; a map flattens to
    /// `key, value, key, value, ...` the way RESP2 renders it.
    ///
    /// # Errors
    ///
    /// Fails for scalar shapes.
    pub fn into_items(self) -> Result<Vec<Value>> {
        match self {
            Self::Array(items) | Self::Set(items) | Self::Push(items) => Ok(items),
            Self::Map(pairs) => {
                let mut items = Vec::with_capacity(pairs.len() * 2);
                for (k, v) in pairs {
                    items.push(k);
                    items.push(v);
                }
                Ok(items)
            }
            Self::Nil => Ok(Vec::new()),
            other => Err(Error::Conversion(format!(
                "cannot read {} reply as a sequence",
                other.kind()
            ))),
        }
    }

    /// Consume the value as key/value pairs.
    ///
    /// Accepts a RESP3 map, an even-length flat array (RESP2 field/value
    /// rendering), or an array of two-element arrays.
    ///
    /// # Errors
    ///
    /// Fails when the shape cannot be paired up.
    pub fn into_pairs(self) -> Result<Vec<(Value, Value)>> {
        match self {
            Self::Map(pairs) => Ok(pairs),
            Self::Nil => Ok(Vec::new()),
            Self::Array(items) | Self::Set(items) => {
                if items.iter().all(|v| matches!(v, Self::Array(inner) if inner.len() == 2)) {
                    let mut pairs = Vec::with_capacity(items.len());
                    for item in items {
                        if let Self::Array(mut inner) = item {
                            if let (Some(v), Some(k)) = (inner.pop(), inner.pop()) {
                                pairs.push((k, v));
                            }
                        }
                    }
                    return Ok(pairs);
                }
                if items.len() % 2 != 0 {
                    return Err(Error::Conversion(
                        "odd-length array cannot be read as pairs".to_string(),
                    ));
                }
                let mut pairs = Vec::with_capacity(items.len() / 2);
                let mut iter = items.into_iter();
                while let (Some(k), Some(v)) = (iter.next(), iter.next()) {
                    pairs.push((k, v));
                }
                Ok(pairs)
            }
            other => Err(Error::Conversion(format!(
                "cannot read {} reply as pairs",
                other.kind()
            ))),
        }
    }
}

fn parse_float(s: &str) -> Result<f64> {
    match s {
        "inf" | "+inf" => Ok(f64::INFINITY),
        "-inf" => Ok(f64::NEG_INFINITY),
        _ => s
            .parse::<f64>()
            .map_err(|e| Error::Conversion(format!("cannot parse {s:?} as float: {e}"))),
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Bulk(Bytes::copy_from_slice(s.as_bytes()))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Bulk(Bytes::from(s.into_bytes()))
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<Bytes> for Value {
    fn from(b: Bytes) -> Self {
        Self::Bulk(b)
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Self::Bulk(Bytes::from(b))
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::Array(items)
    }
}

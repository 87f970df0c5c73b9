//! Conversion between native types and the wire.
//!
//! [`ToArg`] turns native values into argument bytes; [`FromValue`] turns
//! replies into native values. The command surface is written entirely
//! against these two traits, so direct, pipelined and queued execution share
//! one set of conversion rules.
//!
//! Nil handling is deliberate: types with an honest empty value absorb a nil
//! reply (`Option` -> `None`, collections -> empty, `bool` -> `false`), while
//! bare numerics and strings treat nil as a conversion error. Commands that
//! can legitimately answer nil expose `Option` outputs.

use crate::error::{Error, Result};
use crate::value::Value;
use bytes::Bytes;
use std::collections::HashMap;
use std::hash::Hash;

/// Native value that can be sent as a command argument.
pub trait ToArg {
    /// Encode into argument bytes.
    fn to_arg(&self) -> Bytes;
}

impl<T: ToArg + ?Sized> ToArg for &T {
    fn to_arg(&self) -> Bytes {
        (**self).to_arg()
    }
}

impl ToArg for str {
    fn to_arg(&self) -> Bytes {
        Bytes::copy_from_slice(self.as_bytes())
    }
}

impl ToArg for String {
    fn to_arg(&self) -> Bytes {
        Bytes::copy_from_slice(self.as_bytes())
    }
}

impl ToArg for [u8] {
    fn to_arg(&self) -> Bytes {
        Bytes::copy_from_slice(self)
    }
}

impl ToArg for Vec<u8> {
    fn to_arg(&self) -> Bytes {
        Bytes::copy_from_slice(self)
    }
}

impl ToArg for Bytes {
    fn to_arg(&self) -> Bytes {
        self.clone()
    }
}

macro_rules! int_to_arg {
    ($($ty:ty),*) => {
        $(impl ToArg for $ty {
            fn to_arg(&self) -> Bytes {
                Bytes::from(self.to_string().into_bytes())
            }
        })*
    };
}

int_to_arg!(i8, i16, i32, i64, u8, u16, u32, u64, usize, isize);

impl ToArg for f64 {
    fn to_arg(&self) -> Bytes {
        // Redis spells unbounded scores "+inf"/"-inf".
        let s = if self.is_infinite() {
            if *self > 0.0 { "+inf".to_string() } else { "-inf".to_string() }
        } else {
            self.to_string()
        };
        Bytes::from(s.into_bytes())
    }
}

impl ToArg for bool {
    fn to_arg(&self) -> Bytes {
        Bytes::from_static(if *self { b"1" } else { b"0" })
    }
}

/// Native value that can be produced from a reply.
pub trait FromValue: Sized {
    /// Convert a reply into `Self`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Conversion`] when the reply shape does not fit.
    fn from_value(value: Value) -> Result<Self>;
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self> {
        Ok(value)
    }
}

impl FromValue for () {
    fn from_value(_: Value) -> Result<Self> {
        Ok(())
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> Result<Self> {
        if value.is_nil() {
            return Ok(false);
        }
        value.as_bool()
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Result<Self> {
        value.into_string()
    }
}

impl FromValue for Bytes {
    fn from_value(value: Value) -> Result<Self> {
        value.as_bytes()
    }
}

impl FromValue for i64 {
    fn from_value(value: Value) -> Result<Self> {
        value.as_int()
    }
}

impl FromValue for u64 {
    fn from_value(value: Value) -> Result<Self> {
        let i = value.as_int()?;
        u64::try_from(i).map_err(|_| Error::Conversion(format!("integer reply {i} is negative")))
    }
}

impl FromValue for usize {
    fn from_value(value: Value) -> Result<Self> {
        let i = value.as_int()?;
        usize::try_from(i)
            .map_err(|_| Error::Conversion(format!("integer reply {i} out of range")))
    }
}

impl FromValue for f64 {
    fn from_value(value: Value) -> Result<Self> {
        value.as_float()
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self> {
        if value.is_nil() {
            Ok(None)
        } else {
            T::from_value(value).map(Some)
        }
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: Value) -> Result<Self> {
        value
            .into_items()?
            .into_iter()
            .map(T::from_value)
            .collect()
    }
}

impl<K, V> FromValue for HashMap<K, V>
where
    K: FromValue + Eq + Hash,
    V: FromValue,
{
    fn from_value(value: Value) -> Result<Self> {
        value
            .into_pairs()?
            .into_iter()
            .map(|(k, v)| Ok((K::from_value(k)?, V::from_value(v)?)))
            .collect()
    }
}

impl<A: FromValue, B: FromValue> FromValue for (A, B) {
    fn from_value(value: Value) -> Result<Self> {
        let items = value.into_items()?;
        let len = items.len();
        let mut items = items.into_iter();
        match (items.next(), items.next(), items.next()) {
            (Some(a), Some(b), None) => Ok((A::from_value(a)?, B::from_value(b)?)),
            _ => Err(Error::Conversion(format!(
                "expected a two-element reply, got {len} elements"
            ))),
        }
    }
}

/// Convert a paired reply into a vector of native tuples.
///
/// Handles the three renderings of "members with scores": RESP3 map,
/// RESP2 flat array, and array-of-pairs.
///
/// # Errors
///
/// Fails when the reply cannot be paired up or an element does not convert.
pub fn pairs<A: FromValue, B: FromValue>(value: Value) -> Result<Vec<(A, B)>> {
    value
        .into_pairs()?
        .into_iter()
        .map(|(a, b)| Ok((A::from_value(a)?, B::from_value(b)?)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_encode_naturally() {
        assert_eq!(&"hey".to_arg()[..], b"hey");
        assert_eq!(&42i64.to_arg()[..], b"42");
        assert_eq!(&1.5f64.to_arg()[..], b"1.5");
        assert_eq!(&f64::INFINITY.to_arg()[..], b"+inf");
        assert_eq!(&f64::NEG_INFINITY.to_arg()[..], b"-inf");
        assert_eq!(&true.to_arg()[..], b"1");
    }

    #[test]
    fn option_absorbs_nil() {
        let missing: Option<String> = FromValue::from_value(Value::Nil).unwrap();
        assert_eq!(missing, None);

        let present: Option<String> = FromValue::from_value(Value::from("v")).unwrap();
        assert_eq!(present.as_deref(), Some("v"));
    }

    #[test]
    fn collections_absorb_nil() {
        let items: Vec<String> = FromValue::from_value(Value::Nil).unwrap();
        assert!(items.is_empty());

        let map: HashMap<String, i64> = FromValue::from_value(Value::Nil).unwrap();
        assert!(map.is_empty());
    }

    #[test]
    fn bool_defaults_nil_to_false() {
        assert_eq!(bool::from_value(Value::Nil).unwrap(), false);
        assert_eq!(bool::from_value(Value::ok()).unwrap(), true);
    }

    #[test]
    fn bare_numerics_reject_nil() {
        assert!(i64::from_value(Value::Nil).is_err());
        assert!(f64::from_value(Value::Nil).is_err());
        assert!(String::from_value(Value::Nil).is_err());
    }

    #[test]
    fn unsigned_rejects_negative() {
        assert!(u64::from_value(Value::Int(-1)).is_err());
        assert_eq!(u64::from_value(Value::Int(9)).unwrap(), 9);
    }

    #[test]
    fn map_round_trips() {
        let reply = Value::Array(vec![
            Value::from("a"),
            Value::from("1"),
            Value::from("b"),
            Value::from("2"),
        ]);
        let map: HashMap<String, i64> = FromValue::from_value(reply).unwrap();
        assert_eq!(map.get("b"), Some(&2));
    }

    #[test]
    fn scored_members_from_any_rendering() {
        let flat = Value::Array(vec![
            Value::from("alice"),
            Value::from("3"),
            Value::from("bob"),
            Value::from("5.5"),
        ]);
        let scored: Vec<(String, f64)> = pairs(flat).unwrap();
        assert_eq!(scored[1], ("bob".to_string(), 5.5));

        let map = Value::Map(vec![(Value::from("alice"), Value::Double(3.0))]);
        let scored: Vec<(String, f64)> = pairs(map).unwrap();
        assert_eq!(scored[0].1, 3.0);
    }
}

//! Command builders.
//!
//! A [`Command`] is a name plus pre-encoded arguments plus an optional
//! routing key. The same value is executed directly, queued into a pipeline
//! or queued into a transaction; the execution mode is chosen by where it is
//! handed, not by how it is built.
//!
//! This module holds the generic key/string commands; the per-datatype
//! families live in submodules.

pub mod hash;
pub mod list;
pub mod set;
pub mod sorted_set;

use crate::protocol;
use bytes::{Bytes, BytesMut};
use redwire_core::ToArg;
use std::time::Duration;

pub use sorted_set::ZAddOptions;

/// A single command, ready to send.
#[derive(Debug, Clone)]
pub struct Command {
    name: &'static str,
    args: Vec<Bytes>,
    route: Option<Bytes>,
}

impl Command {
    /// Start a command with the given name.
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            args: Vec::new(),
            route: None,
        }
    }

    /// Append one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl ToArg) -> Self {
        self.args.push(arg.to_arg());
        self
    }

    /// Append a key argument. The first key appended becomes the routing key
    /// for cluster slot calculation.
    #[must_use]
    pub fn key(mut self, key: impl ToArg) -> Self {
        let bytes = key.to_arg();
        if self.route.is_none() {
            self.route = Some(bytes.clone());
        }
        self.args.push(bytes);
        self
    }

    /// Command name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Encoded arguments, command name excluded.
    #[must_use]
    pub fn args(&self) -> &[Bytes] {
        &self.args
    }

    /// Key used for cluster routing, if the command has one.
    #[must_use]
    pub fn routing_key(&self) -> Option<&[u8]> {
        self.route.as_deref()
    }

    /// Append the encoded frame to `buf`.
    pub fn encode_into(&self, buf: &mut BytesMut) {
        protocol::encode_command(buf, self.name, &self.args);
    }
}

/// PING
#[must_use]
pub fn ping() -> Command {
    Command::new("PING")
}

/// ECHO message
#[must_use]
pub fn echo(message: impl ToArg) -> Command {
    Command::new("ECHO").arg(message)
}

/// GET key
#[must_use]
pub fn get(key: impl ToArg) -> Command {
    Command::new("GET").key(key)
}

/// SET key value
#[must_use]
pub fn set(key: impl ToArg, value: impl ToArg) -> Command {
    Command::new("SET").key(key).arg(value)
}

/// SET key value with options
#[must_use]
pub fn set_with(key: impl ToArg, value: impl ToArg, options: &SetOptions) -> Command {
    options.apply(Command::new("SET").key(key).arg(value))
}

/// DEL key [key ...]
#[must_use]
pub fn del<K: ToArg>(keys: &[K]) -> Command {
    keys.iter().fold(Command::new("DEL"), |cmd, k| cmd.key(k))
}

/// UNLINK key [key ...]
#[must_use]
pub fn unlink<K: ToArg>(keys: &[K]) -> Command {
    keys.iter().fold(Command::new("UNLINK"), |cmd, k| cmd.key(k))
}

/// EXISTS key [key ...]
#[must_use]
pub fn exists<K: ToArg>(keys: &[K]) -> Command {
    keys.iter().fold(Command::new("EXISTS"), |cmd, k| cmd.key(k))
}

/// EXPIRE key seconds
#[must_use]
pub fn expire(key: impl ToArg, ttl: Duration) -> Command {
    Command::new("EXPIRE").key(key).arg(ttl.as_secs())
}

/// PEXPIRE key milliseconds
#[must_use]
pub fn pexpire(key: impl ToArg, ttl: Duration) -> Command {
    Command::new("PEXPIRE").key(key).arg(ttl.as_millis() as u64)
}

/// PERSIST key
#[must_use]
pub fn persist(key: impl ToArg) -> Command {
    Command::new("PERSIST").key(key)
}

/// TTL key
#[must_use]
pub fn ttl(key: impl ToArg) -> Command {
    Command::new("TTL").key(key)
}

/// INCR key
#[must_use]
pub fn incr(key: impl ToArg) -> Command {
    Command::new("INCR").key(key)
}

/// DECR key
#[must_use]
pub fn decr(key: impl ToArg) -> Command {
    Command::new("DECR").key(key)
}

/// INCRBY key delta
#[must_use]
pub fn incr_by(key: impl ToArg, delta: i64) -> Command {
    Command::new("INCRBY").key(key).arg(delta)
}

/// DECRBY key delta
#[must_use]
pub fn decr_by(key: impl ToArg, delta: i64) -> Command {
    Command::new("DECRBY").key(key).arg(delta)
}

/// APPEND key value
#[must_use]
pub fn append(key: impl ToArg, value: impl ToArg) -> Command {
    Command::new("APPEND").key(key).arg(value)
}

/// STRLEN key
#[must_use]
pub fn strlen(key: impl ToArg) -> Command {
    Command::new("STRLEN").key(key)
}

/// MGET key [key ...]
#[must_use]
pub fn mget<K: ToArg>(keys: &[K]) -> Command {
    keys.iter().fold(Command::new("MGET"), |cmd, k| cmd.key(k))
}

/// MSET key value [key value ...]
#[must_use]
pub fn mset<K: ToArg, V: ToArg>(pairs: &[(K, V)]) -> Command {
    pairs
        .iter()
        .fold(Command::new("MSET"), |cmd, (k, v)| cmd.key(k).arg(v))
}

/// Expiration argument for SET.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    /// `EX seconds`
    Seconds(u64),
    /// `PX milliseconds`
    Millis(u64),
}

/// Existence condition for SET.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetCondition {
    /// `NX` - only set a key that does not exist
    IfAbsent,
    /// `XX` - only overwrite an existing key
    IfExists,
}

/// Options for the SET command.
#[derive(Debug, Clone, Default)]
pub struct SetOptions {
    expiry: Option<Expiry>,
    condition: Option<SetCondition>,
    keep_ttl: bool,
    return_old: bool,
}

impl SetOptions {
    /// No options; plain SET.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Expire after the given duration, second resolution.
    #[must_use]
    pub const fn ex(mut self, ttl: Duration) -> Self {
        self.expiry = Some(Expiry::Seconds(ttl.as_secs()));
        self
    }

    /// Expire after the given duration, millisecond resolution.
    #[must_use]
    pub const fn px(mut self, ttl: Duration) -> Self {
        self.expiry = Some(Expiry::Millis(ttl.as_millis() as u64));
        self
    }

    /// Only set if the key does not exist.
    #[must_use]
    pub const fn if_absent(mut self) -> Self {
        self.condition = Some(SetCondition::IfAbsent);
        self
    }

    /// Only set if the key already exists.
    #[must_use]
    pub const fn if_exists(mut self) -> Self {
        self.condition = Some(SetCondition::IfExists);
        self
    }

    /// Keep the key's existing TTL.
    #[must_use]
    pub const fn keep_ttl(mut self) -> Self {
        self.keep_ttl = true;
        self
    }

    /// Return the previous value (`GET` modifier).
    #[must_use]
    pub const fn return_old(mut self) -> Self {
        self.return_old = true;
        self
    }

    fn apply(&self, mut cmd: Command) -> Command {
        match self.expiry {
            Some(Expiry::Seconds(s)) => cmd = cmd.arg("EX").arg(s),
            Some(Expiry::Millis(ms)) => cmd = cmd.arg("PX").arg(ms),
            None => {}
        }
        if self.keep_ttl {
            cmd = cmd.arg("KEEPTTL");
        }
        match self.condition {
            Some(SetCondition::IfAbsent) => cmd = cmd.arg("NX"),
            Some(SetCondition::IfExists) => cmd = cmd.arg("XX"),
            None => {}
        }
        if self.return_old {
            cmd = cmd.arg("GET");
        }
        cmd
    }
}

#[cfg(test)]
pub(crate) fn arg_strings(cmd: &Command) -> Vec<String> {
    cmd.args()
        .iter()
        .map(|a| String::from_utf8_lossy(a).into_owned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_key_becomes_routing_key() {
        let cmd = mset(&[("a", "1"), ("b", "2")]);
        assert_eq!(cmd.name(), "MSET");
        assert_eq!(cmd.routing_key(), Some(&b"a"[..]));
        assert_eq!(arg_strings(&cmd), vec!["a", "1", "b", "2"]);
    }

    #[test]
    fn keyless_commands_have_no_route() {
        assert_eq!(ping().routing_key(), None);
        assert_eq!(echo("x").routing_key(), None);
    }

    #[test]
    fn expire_uses_seconds() {
        let cmd = expire("k", Duration::from_secs(90));
        assert_eq!(arg_strings(&cmd), vec!["k", "90"]);

        let cmd = pexpire("k", Duration::from_millis(1500));
        assert_eq!(arg_strings(&cmd), vec!["k", "1500"]);
    }

    #[test]
    fn set_options_assemble_in_order() {
        let opts = SetOptions::new()
            .ex(Duration::from_secs(10))
            .if_absent()
            .return_old();
        let cmd = set_with("k", "v", &opts);
        assert_eq!(arg_strings(&cmd), vec!["k", "v", "EX", "10", "NX", "GET"]);

        let opts = SetOptions::new().keep_ttl().if_exists();
        let cmd = set_with("k", "v", &opts);
        assert_eq!(arg_strings(&cmd), vec!["k", "v", "KEEPTTL", "XX"]);
    }

    #[test]
    fn encode_into_produces_a_frame() {
        let mut buf = BytesMut::new();
        get("mykey").encode_into(&mut buf);
        assert_eq!(&buf[..], b"*2\r\n$3\r\nGET\r\n$5\r\nmykey\r\n");
    }
}

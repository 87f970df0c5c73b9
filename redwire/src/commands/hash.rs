//! Hash commands.

use super::Command;
use redwire_core::ToArg;

/// HGET key field
#[must_use]
pub fn hget(key: impl ToArg, field: impl ToArg) -> Command {
    Command::new("HGET").key(key).arg(field)
}

/// HSET key field value [field value ...]
#[must_use]
pub fn hset<F: ToArg, V: ToArg>(key: impl ToArg, entries: &[(F, V)]) -> Command {
    entries
        .iter()
        .fold(Command::new("HSET").key(key), |cmd, (f, v)| {
            cmd.arg(f).arg(v)
        })
}

/// HSETNX key field value
#[must_use]
pub fn hsetnx(key: impl ToArg, field: impl ToArg, value: impl ToArg) -> Command {
    Command::new("HSETNX").key(key).arg(field).arg(value)
}

/// HDEL key field [field ...]
#[must_use]
pub fn hdel<F: ToArg>(key: impl ToArg, fields: &[F]) -> Command {
    fields
        .iter()
        .fold(Command::new("HDEL").key(key), |cmd, f| cmd.arg(f))
}

/// HGETALL key
#[must_use]
pub fn hgetall(key: impl ToArg) -> Command {
    Command::new("HGETALL").key(key)
}

/// HMGET key field [field ...]
#[must_use]
pub fn hmget<F: ToArg>(key: impl ToArg, fields: &[F]) -> Command {
    fields
        .iter()
        .fold(Command::new("HMGET").key(key), |cmd, f| cmd.arg(f))
}

/// HLEN key
#[must_use]
pub fn hlen(key: impl ToArg) -> Command {
    Command::new("HLEN").key(key)
}

/// HEXISTS key field
#[must_use]
pub fn hexists(key: impl ToArg, field: impl ToArg) -> Command {
    Command::new("HEXISTS").key(key).arg(field)
}

/// HINCRBY key field delta
#[must_use]
pub fn hincr_by(key: impl ToArg, field: impl ToArg, delta: i64) -> Command {
    Command::new("HINCRBY").key(key).arg(field).arg(delta)
}

/// HKEYS key
#[must_use]
pub fn hkeys(key: impl ToArg) -> Command {
    Command::new("HKEYS").key(key)
}

/// HVALS key
#[must_use]
pub fn hvals(key: impl ToArg) -> Command {
    Command::new("HVALS").key(key)
}

//! Set commands.

use super::Command;
use redwire_core::ToArg;

/// SADD key member [member ...]
#[must_use]
pub fn sadd<M: ToArg>(key: impl ToArg, members: &[M]) -> Command {
    members
        .iter()
        .fold(Command::new("SADD").key(key), |cmd, m| cmd.arg(m))
}

/// SREM key member [member ...]
#[must_use]
pub fn srem<M: ToArg>(key: impl ToArg, members: &[M]) -> Command {
    members
        .iter()
        .fold(Command::new("SREM").key(key), |cmd, m| cmd.arg(m))
}

/// SCARD key
#[must_use]
pub fn scard(key: impl ToArg) -> Command {
    Command::new("SCARD").key(key)
}

/// SISMEMBER key member
#[must_use]
pub fn sismember(key: impl ToArg, member: impl ToArg) -> Command {
    Command::new("SISMEMBER").key(key).arg(member)
}

/// SMEMBERS key
#[must_use]
pub fn smembers(key: impl ToArg) -> Command {
    Command::new("SMEMBERS").key(key)
}

/// SPOP key [count]
#[must_use]
pub fn spop(key: impl ToArg, count: Option<usize>) -> Command {
    let cmd = Command::new("SPOP").key(key);
    match count {
        Some(n) => cmd.arg(n),
        None => cmd,
    }
}

/// SRANDMEMBER key [count]
#[must_use]
pub fn srandmember(key: impl ToArg, count: Option<i64>) -> Command {
    let cmd = Command::new("SRANDMEMBER").key(key);
    match count {
        Some(n) => cmd.arg(n),
        None => cmd,
    }
}

#[cfg(test)]
mod tests {
    use super::super::arg_strings;
    use super::*;

    #[test]
    fn sadd_takes_multiple_members() {
        let cmd = sadd("s", &["x", "y"]);
        assert_eq!(arg_strings(&cmd), vec!["s", "x", "y"]);
    }

    #[test]
    fn srandmember_count_may_be_negative() {
        let cmd = srandmember("s", Some(-5));
        assert_eq!(arg_strings(&cmd), vec!["s", "-5"]);
    }
}

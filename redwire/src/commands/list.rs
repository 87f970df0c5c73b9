//! List commands.

use super::Command;
use redwire_core::ToArg;

/// LPUSH key element [element ...]
#[must_use]
pub fn lpush<V: ToArg>(key: impl ToArg, elements: &[V]) -> Command {
    elements
        .iter()
        .fold(Command::new("LPUSH").key(key), |cmd, e| cmd.arg(e))
}

/// RPUSH key element [element ...]
#[must_use]
pub fn rpush<V: ToArg>(key: impl ToArg, elements: &[V]) -> Command {
    elements
        .iter()
        .fold(Command::new("RPUSH").key(key), |cmd, e| cmd.arg(e))
}

/// LPOP key [count]
#[must_use]
pub fn lpop(key: impl ToArg, count: Option<usize>) -> Command {
    let cmd = Command::new("LPOP").key(key);
    match count {
        Some(n) => cmd.arg(n),
        None => cmd,
    }
}

/// RPOP key [count]
#[must_use]
pub fn rpop(key: impl ToArg, count: Option<usize>) -> Command {
    let cmd = Command::new("RPOP").key(key);
    match count {
        Some(n) => cmd.arg(n),
        None => cmd,
    }
}

/// LLEN key
#[must_use]
pub fn llen(key: impl ToArg) -> Command {
    Command::new("LLEN").key(key)
}

/// LRANGE key start stop
#[must_use]
pub fn lrange(key: impl ToArg, start: i64, stop: i64) -> Command {
    Command::new("LRANGE").key(key).arg(start).arg(stop)
}

/// LINDEX key index
#[must_use]
pub fn lindex(key: impl ToArg, index: i64) -> Command {
    Command::new("LINDEX").key(key).arg(index)
}

/// LSET key index element
#[must_use]
pub fn lset(key: impl ToArg, index: i64, element: impl ToArg) -> Command {
    Command::new("LSET").key(key).arg(index).arg(element)
}

/// LREM key count element
#[must_use]
pub fn lrem(key: impl ToArg, count: i64, element: impl ToArg) -> Command {
    Command::new("LREM").key(key).arg(count).arg(element)
}

#[cfg(test)]
mod tests {
    use super::super::arg_strings;
    use super::*;

    #[test]
    fn push_takes_multiple_elements() {
        let cmd = rpush("q", &["a", "b"]);
        assert_eq!(cmd.name(), "RPUSH");
        assert_eq!(arg_strings(&cmd), vec!["q", "a", "b"]);
    }

    #[test]
    fn pop_count_is_optional() {
        assert_eq!(arg_strings(&lpop("q", None)), vec!["q"]);
        assert_eq!(arg_strings(&lpop("q", Some(3))), vec!["q", "3"]);
    }

    #[test]
    fn lrange_accepts_negative_indexes() {
        let cmd = lrange("q", 0, -1);
        assert_eq!(arg_strings(&cmd), vec!["q", "0", "-1"]);
    }
}

//! Sorted set commands.

use super::Command;
use redwire_core::ToArg;

/// Update policy for ZADD.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZAddCondition {
    /// `NX` - only add new members
    IfAbsent,
    /// `XX` - only update existing members
    IfExists,
}

/// Score comparison for ZADD.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZAddComparison {
    /// `GT` - only update when the new score is greater
    GreaterThan,
    /// `LT` - only update when the new score is less
    LessThan,
}

/// Options for the ZADD command.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZAddOptions {
    condition: Option<ZAddCondition>,
    comparison: Option<ZAddComparison>,
    changed: bool,
}

impl ZAddOptions {
    /// No options; plain ZADD.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Only add members that do not already exist.
    #[must_use]
    pub const fn if_absent(mut self) -> Self {
        self.condition = Some(ZAddCondition::IfAbsent);
        self
    }

    /// Only update members that already exist.
    #[must_use]
    pub const fn if_exists(mut self) -> Self {
        self.condition = Some(ZAddCondition::IfExists);
        self
    }

    /// Only move scores upward.
    #[must_use]
    pub const fn greater_than(mut self) -> Self {
        self.comparison = Some(ZAddComparison::GreaterThan);
        self
    }

    /// Only move scores downward.
    #[must_use]
    pub const fn less_than(mut self) -> Self {
        self.comparison = Some(ZAddComparison::LessThan);
        self
    }

    /// Count changed members instead of added members.
    #[must_use]
    pub const fn count_changed(mut self) -> Self {
        self.changed = true;
        self
    }

    fn apply(self, mut cmd: Command) -> Command {
        match self.condition {
            Some(ZAddCondition::IfAbsent) => cmd = cmd.arg("NX"),
            Some(ZAddCondition::IfExists) => cmd = cmd.arg("XX"),
            None => {}
        }
        match self.comparison {
            Some(ZAddComparison::GreaterThan) => cmd = cmd.arg("GT"),
            Some(ZAddComparison::LessThan) => cmd = cmd.arg("LT"),
            None => {}
        }
        if self.changed {
            cmd = cmd.arg("CH");
        }
        cmd
    }
}

/// ZADD key [options] score member [score member ...]
#[must_use]
pub fn zadd<M: ToArg>(key: impl ToArg, options: ZAddOptions, members: &[(f64, M)]) -> Command {
    let cmd = options.apply(Command::new("ZADD").key(key));
    members
        .iter()
        .fold(cmd, |cmd, (score, member)| cmd.arg(*score).arg(member))
}

/// ZSCORE key member
#[must_use]
pub fn zscore(key: impl ToArg, member: impl ToArg) -> Command {
    Command::new("ZSCORE").key(key).arg(member)
}

/// ZCARD key
#[must_use]
pub fn zcard(key: impl ToArg) -> Command {
    Command::new("ZCARD").key(key)
}

/// ZRANGE key start stop
#[must_use]
pub fn zrange(key: impl ToArg, start: i64, stop: i64) -> Command {
    Command::new("ZRANGE").key(key).arg(start).arg(stop)
}

/// ZRANGE key start stop WITHSCORES
#[must_use]
pub fn zrange_with_scores(key: impl ToArg, start: i64, stop: i64) -> Command {
    Command::new("ZRANGE")
        .key(key)
        .arg(start)
        .arg(stop)
        .arg("WITHSCORES")
}

/// ZRANK key member
#[must_use]
pub fn zrank(key: impl ToArg, member: impl ToArg) -> Command {
    Command::new("ZRANK").key(key).arg(member)
}

/// ZREVRANK key member
#[must_use]
pub fn zrevrank(key: impl ToArg, member: impl ToArg) -> Command {
    Command::new("ZREVRANK").key(key).arg(member)
}

/// ZREM key member [member ...]
#[must_use]
pub fn zrem<M: ToArg>(key: impl ToArg, members: &[M]) -> Command {
    members
        .iter()
        .fold(Command::new("ZREM").key(key), |cmd, m| cmd.arg(m))
}

/// ZINCRBY key delta member
#[must_use]
pub fn zincr_by(key: impl ToArg, delta: f64, member: impl ToArg) -> Command {
    Command::new("ZINCRBY").key(key).arg(delta).arg(member)
}

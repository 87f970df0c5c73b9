//! Lua scripting.
//!
//! A [`Script`] pairs Lua source with its SHA-1 digest so execution can go
//! through EVALSHA and only fall back to shipping the source when the server
//! answers NOSCRIPT. The fallback itself lives in
//! [`Client::run_script`](crate::Client::run_script), keyed off the
//! classified error rather than message sniffing.

use sha1::{Digest, Sha1};

/// A reusable Lua script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    source: String,
    sha: String,
}

impl Script {
    /// Wrap Lua source, computing its EVALSHA digest.
    ///
    /// ```
    /// use redwire::Script;
    ///
    /// let script = Script::new("return redis.call('GET', KEYS[1])");
    /// assert_eq!(script.sha().len(), 40);
    /// ```
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        let sha = sha1_hex(source.as_bytes());
        Self { source, sha }
    }

    /// Hex SHA-1 of the source.
    #[must_use]
    pub fn sha(&self) -> &str {
        &self.sha
    }

    /// The Lua source.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }
}

pub(crate) fn sha1_hex(data: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(data);
    hasher
        .finalize()
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_stable_and_hex() {
        let a = Script::new("return 1");
        let b = Script::new("return 1");
        assert_eq!(a.sha(), b.sha());
        assert_eq!(a.sha().len(), 40);
        assert!(a.sha().bytes().all(|b| b.is_ascii_hexdigit()));
    }

    #[test]
    fn different_sources_differ() {
        assert_ne!(Script::new("return 1").sha(), Script::new("return 2").sha());
    }

    #[test]
    fn known_digest() {
        // sha1 of the empty string.
        assert_eq!(sha1_hex(b""), "da39a3ee5e6b4b0d3255bfef95601890afd80709");
    }
}

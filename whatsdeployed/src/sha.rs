//! Commit identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Length of an abbreviated SHA, as shown in tables and accepted by matching.
pub const SHORT_LEN: usize = 7;

/// A git commit SHA, full (40 hex characters) or abbreviated.
///
/// Stored lower-cased and trimmed. The value is not checked to be hex, since
/// revision endpoints sometimes report other identifiers and those should still
/// be shown (and simply never match).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Sha(String);

impl Sha {
    /// Normalize a SHA string.
    pub fn new(value: impl AsRef<str>) -> Self {
        Sha(value.as_ref().trim().to_ascii_lowercase())
    }

    /// The SHA as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The first seven characters, or the whole SHA if shorter.
    pub fn short(&self) -> &str {
        self.0.get(..SHORT_LEN).unwrap_or(&self.0)
    }

    /// Whether two SHAs identify the same commit.
    ///
    /// Equal SHAs match. A seven character SHA also matches any longer SHA that
    /// starts with it, since some revision endpoints only report the abbreviated
    /// form. This is an approximation: distinct commits can share a seven
    /// character prefix, and in that case the newer one is taken.
    pub fn matches(&self, other: &Sha) -> bool {
        if self.0 == other.0 {
            return true;
        }

        let (short, long) = if self.0.len() <= other.0.len() {
            (self, other)
        } else {
            (other, self)
        };
        short.0.len() == SHORT_LEN && long.0.starts_with(&short.0)
    }
}

impl fmt::Display for Sha {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Sha {
    fn from(value: String) -> Self {
        Sha::new(value)
    }
}

impl From<&str> for Sha {
    fn from(value: &str) -> Self {
        Sha::new(value)
    }
}

impl From<Sha> for String {
    fn from(value: Sha) -> Self {
        value.0
    }
}

impl AsRef<str> for Sha {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = "6377dc6de44e3557bfc1d0b186581d442a77f774";

    #[test]
    fn normalized() {
        let sha = Sha::new("  6377DC6DE44E3557BFC1D0B186581D442A77F774\n");
        assert_eq!(sha.as_str(), FULL);
        assert_eq!(sha.short(), "6377dc6");
        assert_eq!(Sha::new("abc").short(), "abc");
    }

    #[test]
    fn abbreviated_match() {
        let full = Sha::new(FULL);
        assert!(full.matches(&Sha::new(FULL)));
        assert!(full.matches(&Sha::new("6377dc6")));
        assert!(Sha::new("6377dc6").matches(&full));
    }

    #[test]
    fn only_seven_character_prefixes_match() {
        let full = Sha::new(FULL);
        assert!(!full.matches(&Sha::new("6377dc")));
        assert!(!full.matches(&Sha::new("6377dc6d")));
        assert!(!full.matches(&Sha::new("deadbee")));
        assert!(!Sha::new("6377dc6").matches(&Sha::new("6377dc7")));
    }
}

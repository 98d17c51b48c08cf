//! Record keys — the `/{namespace}/{remainder}` addressing scheme.
//!
//! Every value published to the DHT lives under a key whose first
//! segment names the namespace that owns its validation and
//! arbitration rules. A key that does not follow the scheme is
//! rejected outright — there is no partial parse and no default
//! namespace.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("malformed record key {0:?}: expected /{{namespace}}/{{remainder}}")]
    Malformed(String),
}

/// A parsed record key.
///
/// Holds the original string plus the namespace/remainder split.
/// The remainder is opaque to the key layer — it may itself contain
/// slashes (`/foo/bar/baz` has namespace `foo` and remainder `bar/baz`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordKey {
    raw: String,
    /// Byte offset of the slash separating namespace and remainder.
    split: usize,
}

impl RecordKey {
    /// Parse a raw key string.
    ///
    /// Requirements: a leading `/`, a non-empty namespace segment, a
    /// second `/`, and a non-empty remainder. Anything else is
    /// [`KeyError::Malformed`].
    pub fn parse(raw: &str) -> Result<Self, KeyError> {
        let malformed = || KeyError::Malformed(raw.to_string());

        let rest = raw.strip_prefix('/').ok_or_else(malformed)?;
        let slash = rest.find('/').ok_or_else(malformed)?;
        if slash == 0 || slash + 1 == rest.len() {
            return Err(malformed());
        }

        Ok(Self {
            raw: raw.to_string(),
            split: slash + 1,
        })
    }

    /// The namespace segment (without slashes).
    pub fn namespace(&self) -> &str {
        &self.raw[1..self.split]
    }

    /// Everything after the namespace separator.
    pub fn remainder(&self) -> &str {
        &self.raw[self.split + 1..]
    }

    /// The full key as originally written.
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for RecordKey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

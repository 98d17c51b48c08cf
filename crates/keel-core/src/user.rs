//! User identifiers of the form `user[@domain[/resource]]`.
//!
//! Examples: `alice`, `alice@nullcat.de`, `alice@nullcat.de/laptop`.
//! The domain scopes a name to an organisation; the resource
//! distinguishes several machines of one user.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UserIdError {
    #[error("empty user id is not allowed")]
    Empty,

    #[error("whitespace not allowed in user id (at byte {0})")]
    Whitespace(usize),

    #[error("only printable characters allowed in user id (at byte {0})")]
    Unprintable(usize),
}

/// A validated user identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserId(String);

impl UserId {
    pub fn parse(raw: &str) -> Result<Self, UserIdError> {
        if raw.is_empty() {
            return Err(UserIdError::Empty);
        }
        for (idx, ch) in raw.char_indices() {
            if ch.is_whitespace() {
                return Err(UserIdError::Whitespace(idx));
            }
            if ch.is_control() {
                return Err(UserIdError::Unprintable(idx));
            }
        }
        Ok(Self(raw.to_string()))
    }

    pub fn is_valid(raw: &str) -> bool {
        Self::parse(raw).is_ok()
    }

    /// The part before `@`, or the whole id if there is no domain.
    pub fn user(&self) -> &str {
        match self.0.find('@') {
            Some(at) => &self.0[..at],
            None => &self.0,
        }
    }

    /// The part between `@` and the resource separator. Empty if the
    /// id carries no domain.
    pub fn domain(&self) -> &str {
        let Some(at) = self.0.find('@') else {
            return "";
        };
        match self.0.rfind('/') {
            Some(slash) if slash > at => &self.0[at + 1..slash],
            _ => &self.0[at + 1..],
        }
    }

    /// The part after the last `/`. Empty if the id carries no resource.
    pub fn resource(&self) -> &str {
        match self.0.rfind('/') {
            Some(slash) => &self.0[slash + 1..],
            None => "",
        }
    }

    /// A filesystem-safe rendering: `user[-resource]`, with any path
    /// separators replaced.
    pub fn as_path(&self) -> String {
        let mut path = self.user().to_string();
        let resource = self.resource();
        if !resource.is_empty() {
            path.push('-');
            path.push_str(resource);
        }
        path.replace(std::path::MAIN_SEPARATOR, "|")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for UserId {
    type Err = UserIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

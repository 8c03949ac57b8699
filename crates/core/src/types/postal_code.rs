//! US postal code type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`PostalCode`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PostalCodeError {
    /// The input string is empty.
    #[error("postal code cannot be empty")]
    Empty,
    /// The input does not have exactly five characters.
    #[error("postal code must be exactly {expected} digits")]
    WrongLength {
        /// Required length.
        expected: usize,
    },
    /// The input contains something other than ASCII digits.
    #[error("postal code must contain only digits")]
    NonDigit,
}

/// A five-digit US postal code.
///
/// Surrounding whitespace is trimmed before validation.
///
/// ## Examples
///
/// ```
/// use localstock_core::PostalCode;
///
/// assert!(PostalCode::parse("10001").is_ok());
/// assert!(PostalCode::parse(" 94105 ").is_ok());
///
/// assert!(PostalCode::parse("").is_err());
/// assert!(PostalCode::parse("1234").is_err());
/// assert!(PostalCode::parse("1000A").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct PostalCode(String);

impl PostalCode {
    /// Number of digits in a postal code.
    pub const LENGTH: usize = 5;

    /// Parse a `PostalCode` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the trimmed input is empty, is not five
    /// characters long, or contains non-digit characters.
    pub fn parse(s: &str) -> Result<Self, PostalCodeError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(PostalCodeError::Empty);
        }

        if s.len() != Self::LENGTH {
            return Err(PostalCodeError::WrongLength {
                expected: Self::LENGTH,
            });
        }

        if !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(PostalCodeError::NonDigit);
        }

        Ok(Self(s.to_owned()))
    }

    /// Returns the postal code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PostalCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for PostalCode {
    type Err = PostalCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for PostalCode {
    type Error = PostalCodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PostalCode> for String {
    fn from(code: PostalCode) -> Self {
        code.0
    }
}

impl AsRef<str> for PostalCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

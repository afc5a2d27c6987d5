use crate::{
    Result,
    constants::{
        LESER7PLUS_BAUD_RATE, LESER9_BAUD_RATE, MAX_READER_ID_LENGTH, READER_LIST_SEPARATOR,
        RECORD_FIELD_SEPARATOR, TRANSPONDER_ID_LENGTH,
    },
    error::Error,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use subtle::ConstantTimeEq;

/// Supported transponder reader families.
///
/// The variant is fixed for the lifetime of a reader session and selects the
/// serial line speed, the frame grammar and the relay command set.
///
/// # Examples
///
/// ```
/// use strikeplate_core::ReaderVariant;
///
/// let variant: ReaderVariant = "leser9".parse().unwrap();
/// assert_eq!(variant, ReaderVariant::Leser9);
/// assert_eq!(variant.baud_rate(), 9600);
/// assert!(!variant.carries_reader_id());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReaderVariant {
    /// Leser 7plus: reader ID inline in every frame, confirmed relay close.
    #[serde(rename = "leser7plus")]
    Leser7Plus,

    /// Leser 9: reader ID configured per session, single relay close.
    #[serde(rename = "leser9")]
    Leser9,
}

impl ReaderVariant {
    /// Configuration name of the variant.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            ReaderVariant::Leser7Plus => "leser7plus",
            ReaderVariant::Leser9 => "leser9",
        }
    }

    /// Serial line speed used by the reader.
    #[must_use]
    pub fn baud_rate(self) -> u32 {
        match self {
            ReaderVariant::Leser7Plus => LESER7PLUS_BAUD_RATE,
            ReaderVariant::Leser9 => LESER9_BAUD_RATE,
        }
    }

    /// Returns `true` if frames carry the reader ID on the wire.
    #[must_use]
    pub fn carries_reader_id(self) -> bool {
        matches!(self, ReaderVariant::Leser7Plus)
    }

    /// Returns `true` if the relay hardware needs the close command twice.
    #[must_use]
    pub fn confirms_relay_close(self) -> bool {
        matches!(self, ReaderVariant::Leser7Plus)
    }
}

impl fmt::Display for ReaderVariant {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for ReaderVariant {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "leser7plus" => Ok(ReaderVariant::Leser7Plus),
            "leser9" => Ok(ReaderVariant::Leser9),
            other => Err(Error::InvalidVariant(other.to_string())),
        }
    }
}

/// Reader identifier.
///
/// Either parsed from a Leser 7plus frame (two characters) or configured for a
/// Leser 9 session. The separators of the lookup record format are rejected
/// because they would make membership checks ambiguous.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ReaderId(String);

impl ReaderId {
    /// Create a new reader ID with validation.
    ///
    /// The value is trimmed before validation.
    ///
    /// # Errors
    /// Returns `Error::InvalidReaderId` if the ID is empty, longer than
    /// [`MAX_READER_ID_LENGTH`], non-ASCII, or contains `|`, `,` or whitespace.
    pub fn new(id: &str) -> Result<Self> {
        let id = id.trim();

        if id.is_empty() || id.len() > MAX_READER_ID_LENGTH {
            return Err(Error::InvalidReaderId(format!(
                "Reader ID must be 1-{MAX_READER_ID_LENGTH} chars, got {}",
                id.len()
            )));
        }

        if !id.is_ascii()
            || id.chars().any(|c| {
                c == RECORD_FIELD_SEPARATOR || c == READER_LIST_SEPARATOR || c.is_whitespace()
            })
        {
            return Err(Error::InvalidReaderId(format!(
                "Reader ID contains invalid characters: {id}"
            )));
        }

        Ok(ReaderId(id.to_string()))
    }

    /// Get the reader ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReaderId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for ReaderId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ReaderId::new(s)
    }
}

impl TryFrom<String> for ReaderId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        ReaderId::new(&value)
    }
}

impl From<ReaderId> for String {
    fn from(id: ReaderId) -> Self {
        id.0
    }
}

/// Transponder identifier (10 upper-case alphanumeric characters).
///
/// # Security
/// Comparison runs in constant time, like every credential comparison in
/// this workspace.
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TransponderId(String);

impl TransponderId {
    /// Create a new transponder ID with validation.
    ///
    /// # Errors
    /// Returns `Error::InvalidTransponderId` unless the ID is exactly
    /// [`TRANSPONDER_ID_LENGTH`] characters of `A-Z` and `0-9`.
    pub fn new(id: &str) -> Result<Self> {
        if id.len() != TRANSPONDER_ID_LENGTH {
            return Err(Error::InvalidTransponderId(format!(
                "Transponder ID must be {TRANSPONDER_ID_LENGTH} chars, got {}",
                id.len()
            )));
        }

        if !id
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
        {
            return Err(Error::InvalidTransponderId(format!(
                "Transponder ID must be upper-case alphanumeric: {id}"
            )));
        }

        Ok(TransponderId(id.to_string()))
    }

    /// Get the transponder ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransponderId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for TransponderId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        TransponderId::new(s)
    }
}

impl TryFrom<String> for TransponderId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        TransponderId::new(&value)
    }
}

impl From<TransponderId> for String {
    fn from(id: TransponderId) -> Self {
        id.0
    }
}

impl PartialEq for TransponderId {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_bytes().ct_eq(other.0.as_bytes()).into()
    }
}

impl std::hash::Hash for TransponderId {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

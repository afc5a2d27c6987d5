//! Transponder authorization.
//!
//! The reader engine keeps no user database. Transponder records live in an
//! external lookup service that maps a transponder ID to a raw record of the
//! form `name|reader,reader,...`. A key without a record comes back either
//! empty or unchanged.
//!
//! # Resolution Flow
//!
//! The resolver fails fast at the first check that does not pass:
//!
//! 1. **Service**: no lookup service configured → `Unknown(LookupUnavailable)`
//! 2. **Lookup**: the service fails → `Unknown(LookupFailed)`
//! 3. **Record**: empty or echoed result → `Unknown(NotRegistered)`
//! 4. **Readers**: record without a reader field → `Unknown(NoReadersConfigured)`
//! 5. **Membership**: reader listed → `Authorized(name)`, else `Unauthorized`

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use strikeplate_core::{
    ReaderId, TransponderId,
    constants::{READER_LIST_SEPARATOR, RECORD_FIELD_SEPARATOR, TRANSPONDER_MAP},
};
use thiserror::Error;

/// Errors reported by a lookup service.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LookupError {
    /// The service cannot be reached.
    #[error("Lookup service unavailable: {0}")]
    Unavailable(String),

    /// The service could not transform the key.
    #[error("Transformation of '{key}' with map '{map}' failed: {message}")]
    Transform {
        map: String,
        key: String,
        message: String,
    },
}

impl LookupError {
    /// Create a new transform error.
    pub fn transform(
        map: impl Into<String>,
        key: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Transform {
            map: map.into(),
            key: key.into(),
            message: message.into(),
        }
    }
}

/// A key/value transformation service.
///
/// `transform` returns the value stored for `key` in the map `map_name`. A
/// missing key yields either an empty string or `key` itself.
///
/// The read task calls `transform` synchronously, at most once per accepted
/// read and so at most once per debounce window. Implementations should
/// answer from memory or local storage; a slow lookup stalls the reader's
/// input for its duration.
pub trait LookupService: Send + Sync {
    /// Look up `key` in `map_name`.
    ///
    /// # Errors
    ///
    /// Returns an error if the service cannot answer.
    fn transform(&self, map_name: &str, key: &str) -> Result<String, LookupError>;
}

/// In-memory lookup service.
///
/// Holds a single map and answers for any map name. Unknown keys are echoed.
///
/// # Examples
///
/// ```
/// use strikeplate_access::{LookupService, StaticLookup};
///
/// let lookup = StaticLookup::new().with_entry("AB12EF34CD", "Bob|D1,D2");
/// assert_eq!(lookup.transform("transponders.map", "AB12EF34CD").unwrap(), "Bob|D1,D2");
/// assert_eq!(lookup.transform("transponders.map", "0000000000").unwrap(), "0000000000");
/// ```
#[derive(Debug, Clone, Default)]
pub struct StaticLookup {
    entries: HashMap<String, String>,
}

impl StaticLookup {
    /// Create an empty lookup.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry.
    pub fn with_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Add or replace an entry.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }
}

impl LookupService for StaticLookup {
    fn transform(&self, _map_name: &str, key: &str) -> Result<String, LookupError> {
        Ok(self
            .entries
            .get(key)
            .cloned()
            .unwrap_or_else(|| key.to_string()))
    }
}

/// Lookup service backed by map files in a directory.
///
/// Each map is a file named after the map inside `dir`, holding
/// `key=value` lines. Blank lines and lines starting with `#` or `!` are
/// ignored; whitespace around keys and values is trimmed. The file is read on
/// every call so edits apply to the next read without a restart. The read
/// is a small local file read on the session's read task.
///
/// ```text
/// # transponders.map
/// AB12EF34CD=Bob|D1,D2
/// 0123456789=Alice|01
/// ```
#[derive(Debug, Clone)]
pub struct MapFileLookup {
    dir: PathBuf,
}

impl MapFileLookup {
    /// Create a lookup reading maps from `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the map files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl LookupService for MapFileLookup {
    fn transform(&self, map_name: &str, key: &str) -> Result<String, LookupError> {
        if map_name.is_empty() || map_name.contains(['/', '\\']) || map_name == ".." {
            return Err(LookupError::transform(map_name, key, "invalid map name"));
        }

        let path = self.dir.join(map_name);
        let content = std::fs::read_to_string(&path).map_err(|e| {
            LookupError::transform(map_name, key, format!("{}: {e}", path.display()))
        })?;

        let value = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with(['#', '!']))
            .find_map(|line| {
                let (k, v) = line.split_once('=').unwrap_or((line, ""));
                (k.trim() == key).then(|| v.trim().to_string())
            });

        Ok(value.unwrap_or_else(|| key.to_string()))
    }
}

/// A transponder record as returned by the lookup service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationRecord {
    /// Name of the transponder owner.
    pub user_name: String,

    /// Readers the transponder opens. `None` when the record has no reader
    /// field at all.
    pub authorized_reader_ids: Option<BTreeSet<String>>,
}

impl AuthorizationRecord {
    /// Parse the raw lookup result for `key`.
    ///
    /// Returns `None` if the result is empty or echoes `key`. Empty trailing
    /// fields are dropped before the record is split into its parts.
    ///
    /// # Examples
    ///
    /// ```
    /// use strikeplate_access::AuthorizationRecord;
    ///
    /// let record = AuthorizationRecord::parse("AB12EF34CD", "Bob|D1,D2").unwrap();
    /// assert_eq!(record.user_name, "Bob");
    /// assert!(record.authorizes("D2"));
    ///
    /// assert!(AuthorizationRecord::parse("AB12EF34CD", "AB12EF34CD").is_none());
    /// ```
    pub fn parse(key: &str, raw: &str) -> Option<Self> {
        if raw.is_empty() || raw == key {
            return None;
        }

        let fields = split_fields(raw, RECORD_FIELD_SEPARATOR);
        let user_name = fields.first().copied().unwrap_or_default().to_string();
        let authorized_reader_ids = fields.get(1).map(|readers| {
            split_fields(readers, READER_LIST_SEPARATOR)
                .into_iter()
                .map(str::to_string)
                .collect()
        });

        Some(Self {
            user_name,
            authorized_reader_ids,
        })
    }

    /// Returns `true` if `reader_id` is listed.
    pub fn authorizes(&self, reader_id: &str) -> bool {
        self.authorized_reader_ids
            .as_ref()
            .is_some_and(|readers| readers.contains(reader_id))
    }
}

/// Split on `separator` and drop empty trailing fields.
fn split_fields(value: &str, separator: char) -> Vec<&str> {
    let mut fields: Vec<&str> = value.split(separator).collect();
    while fields.last().is_some_and(|f| f.is_empty()) {
        fields.pop();
    }
    fields
}

/// Why no authorization decision could be made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnknownReason {
    /// The lookup returned no record.
    NotRegistered,

    /// The record names no readers.
    NoReadersConfigured,

    /// No lookup service is configured.
    LookupUnavailable,

    /// The lookup service failed.
    LookupFailed(String),
}

impl UnknownReason {
    /// Returns `true` if this outcome is reported upstream as a denial.
    ///
    /// Lookup failures are configuration or infrastructure faults and are
    /// only logged.
    pub fn is_denial(&self) -> bool {
        matches!(self, Self::NotRegistered | Self::NoReadersConfigured)
    }
}

impl fmt::Display for UnknownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotRegistered => write!(f, "transponder not registered"),
            Self::NoReadersConfigured => write!(f, "no readers configured"),
            Self::LookupUnavailable => write!(f, "lookup service unavailable"),
            Self::LookupFailed(message) => write!(f, "lookup failed: {message}"),
        }
    }
}

/// Outcome of an authorization check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// The transponder opens this reader.
    Authorized(String),

    /// The transponder is registered but not for this reader.
    Unauthorized,

    /// No decision could be made.
    Unknown(UnknownReason),
}

/// Maps a transponder read to an authorization decision.
///
/// Performs exactly one lookup per call and keeps no cache, so record
/// changes in the lookup service apply to the next read.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use strikeplate_access::{AuthorizationResolver, Decision, StaticLookup};
/// use strikeplate_core::{ReaderId, TransponderId};
///
/// let lookup = StaticLookup::new().with_entry("AB12EF34CD", "Alice|R1,R2");
/// let resolver = AuthorizationResolver::new(Some(Arc::new(lookup)));
/// let transponder = TransponderId::new("AB12EF34CD").unwrap();
///
/// let decision = resolver.resolve(&transponder, &ReaderId::new("R2").unwrap());
/// assert_eq!(decision, Decision::Authorized("Alice".to_string()));
///
/// let decision = resolver.resolve(&transponder, &ReaderId::new("R3").unwrap());
/// assert_eq!(decision, Decision::Unauthorized);
/// ```
#[derive(Clone)]
pub struct AuthorizationResolver {
    lookup: Option<Arc<dyn LookupService>>,
}

impl fmt::Debug for AuthorizationResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizationResolver")
            .field("lookup", &self.lookup.is_some())
            .finish()
    }
}

impl AuthorizationResolver {
    /// Create a resolver. `None` means no lookup service is available.
    pub fn new(lookup: Option<Arc<dyn LookupService>>) -> Self {
        Self { lookup }
    }

    /// Returns `true` if a lookup service is configured.
    pub fn has_lookup(&self) -> bool {
        self.lookup.is_some()
    }

    /// Decide whether `transponder_id` opens `reader_id`.
    pub fn resolve(&self, transponder_id: &TransponderId, reader_id: &ReaderId) -> Decision {
        let Some(lookup) = &self.lookup else {
            return Decision::Unknown(UnknownReason::LookupUnavailable);
        };

        let key = transponder_id.as_str();
        let raw = match lookup.transform(TRANSPONDER_MAP, key) {
            Ok(raw) => raw,
            Err(e) => return Decision::Unknown(UnknownReason::LookupFailed(e.to_string())),
        };

        let Some(record) = AuthorizationRecord::parse(key, &raw) else {
            return Decision::Unknown(UnknownReason::NotRegistered);
        };

        if record.authorized_reader_ids.is_none() {
            return Decision::Unknown(UnknownReason::NoReadersConfigured);
        }

        if record.authorizes(reader_id.as_str()) {
            Decision::Authorized(record.user_name)
        } else {
            Decision::Unauthorized
        }
    }
}

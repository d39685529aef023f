//! File-backed cache of metadata lookups.

use std::{
    collections::BTreeMap,
    fmt, fs, io,
    path::{Path, PathBuf},
};

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::MetadataRecord;

/// File name used for the backing file when none is configured.
pub const DEFAULT_CACHE_FILE: &str = "gemini_cache.json";

/// Placeholder used in keys when no platform was given.
const ANY_PLATFORM: &str = "any";

type Entries = BTreeMap<String, MetadataRecord>;

/// Normalized lookup key: `<subject>_<platform or "any">`, lower-cased.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Build the key for a subject and optional platform.
    ///
    /// The subject is only lower-cased, never trimmed. A platform that is
    /// missing, empty or whitespace-only maps to `any`; anything else is
    /// lower-cased as given.
    pub fn new(subject: &str, platform: Option<&str>) -> Self {
        let platform = platform
            .filter(|value| !value.trim().is_empty())
            .map(str::to_lowercase)
            .unwrap_or_else(|| ANY_PLATFORM.to_string());
        Self(format!("{}_{}", subject.to_lowercase(), platform))
    }

    /// The key as stored in the backing file.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Storage failures. These never leave [`LookupCache`]; they are logged and
/// the cache keeps working from memory.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The cache file exists but could not be read.
    #[error("failed to read {}", .path.display())]
    Read {
        /// File involved.
        path: PathBuf,
        /// Underlying failure.
        #[source]
        source: io::Error,
    },
    /// The cache file is not a JSON object of records.
    #[error("failed to parse {}", .path.display())]
    Parse {
        /// File involved.
        path: PathBuf,
        /// Underlying failure.
        #[source]
        source: serde_json::Error,
    },
    /// Entries could not be turned into JSON.
    #[error("failed to serialize cache entries")]
    Serialize(#[source] serde_json::Error),
    /// The cache file or its directory could not be written.
    #[error("failed to write {}", .path.display())]
    Write {
        /// File involved.
        path: PathBuf,
        /// Underlying failure.
        #[source]
        source: io::Error,
    },
}

/// Lookup results keyed by [`CacheKey`], persisted to a JSON file after
/// every change.
///
/// Loading and saving never fail from the caller's point of view. An
/// unreadable file starts the cache empty; an unwritable one leaves the
/// in-memory state authoritative for the rest of the session.
#[derive(Debug)]
pub struct LookupCache {
    path: PathBuf,
    entries: Entries,
}

impl LookupCache {
    /// Open the cache backed by `path`, loading whatever is there.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match read_entries(&path) {
            Ok(Some(entries)) => {
                debug!(path = %path.display(), entries = entries.len(), "cache loaded");
                entries
            }
            Ok(None) => Entries::new(),
            Err(err) => {
                warn!("starting with an empty cache: {}", error_chain(&err));
                Entries::new()
            }
        };
        Self { path, entries }
    }

    /// Backing file location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored record for the subject/platform pair, if any.
    pub fn get(&self, subject: &str, platform: Option<&str>) -> Option<&MetadataRecord> {
        self.entries.get(CacheKey::new(subject, platform).as_str())
    }

    /// Whether a record is stored for the pair.
    pub fn contains(&self, subject: &str, platform: Option<&str>) -> bool {
        self.get(subject, platform).is_some()
    }

    /// Store or replace the record, then rewrite the backing file.
    pub fn set(&mut self, subject: &str, platform: Option<&str>, record: MetadataRecord) {
        let key = CacheKey::new(subject, platform);
        debug!(%key, "cache store");
        self.entries.insert(key.0, record);
        self.persist();
    }

    /// Drop every entry and rewrite the backing file.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.persist();
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stored keys and records in key order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &MetadataRecord)> {
        self.entries
            .iter()
            .map(|(key, record)| (key.as_str(), record))
    }

    fn persist(&self) {
        if let Err(err) = write_entries(&self.path, &self.entries) {
            warn!("cache kept in memory only: {}", error_chain(&err));
        }
    }
}

fn read_entries(path: &Path) -> Result<Option<Entries>, CacheError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(CacheError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    let raw: BTreeMap<String, Value> =
        serde_json::from_str(&content).map_err(|source| CacheError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    let mut entries = Entries::new();
    for (key, value) in raw {
        match serde_json::from_value::<MetadataRecord>(value) {
            Ok(record) => {
                entries.insert(key, record);
            }
            Err(err) => warn!(path = %path.display(), %key, "skipping cache entry: {err}"),
        }
    }
    Ok(Some(entries))
}

fn write_entries(path: &Path, entries: &Entries) -> Result<(), CacheError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| CacheError::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let serialized = serde_json::to_string_pretty(entries).map_err(CacheError::Serialize)?;
    fs::write(path, serialized).map_err(|source| CacheError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn error_chain(err: &CacheError) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

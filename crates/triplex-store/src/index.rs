//! Artifact index: which records already have output, and what new output is called
//!
//! Artifacts are named `{YYYYMMDD_HHMMSS}{delim}{identity}.json`, where the
//! delimiter is `_` for file records (identity = file stem, inside the
//! record's relative subdirectory) and `-` for database records
//! (identity = id, directly in the output directory).
//!
//! Lookup is by exact identity, never by suffix, so record `5` does not
//! match `20240101_120000-105.json`. When a record was extracted more than
//! once, the greatest filename (the newest timestamp) wins.

use crate::StoreError;
use chrono::{DateTime, TimeZone};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use triplex_domain::{Origin, Record};
use walkdir::WalkDir;

/// strftime pattern of the artifact timestamp prefix
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

const TIMESTAMP_LEN: usize = 15;
const EXTENSION: &str = ".json";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ArtifactKey {
    dir: PathBuf,
    identity: String,
}

/// Recomputed mapping from record identity to its latest artifact
#[derive(Debug, Clone)]
pub struct ArtifactIndex {
    output_dir: PathBuf,
    origin: Origin,
    entries: HashMap<ArtifactKey, PathBuf>,
}

impl ArtifactIndex {
    /// Empty index rooted at `output_dir`
    pub fn new(output_dir: impl Into<PathBuf>, origin: Origin) -> Self {
        Self {
            output_dir: output_dir.into(),
            origin,
            entries: HashMap::new(),
        }
    }

    /// Build the index by scanning `output_dir`
    ///
    /// A missing output directory yields an empty index.
    pub fn scan(output_dir: impl Into<PathBuf>, origin: Origin) -> Result<Self, StoreError> {
        let mut index = Self::new(output_dir, origin);
        if !index.output_dir.is_dir() {
            return Ok(index);
        }

        let max_depth = match origin {
            Origin::File => usize::MAX,
            Origin::Database => 1,
        };

        for entry in WalkDir::new(&index.output_dir).min_depth(1).max_depth(max_depth) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable entry in output directory");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.into_path();
            let Some(identity) = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| parse_artifact_name(n, origin.name_delimiter()))
                .map(str::to_string)
            else {
                continue;
            };

            let dir = path
                .parent()
                .and_then(|p| p.strip_prefix(&index.output_dir).ok())
                .map(Path::to_path_buf)
                .unwrap_or_default();

            index.insert(ArtifactKey { dir, identity }, path);
        }

        debug!(
            dir = %index.output_dir.display(),
            artifacts = index.entries.len(),
            "Scanned output directory"
        );
        Ok(index)
    }

    fn insert(&mut self, key: ArtifactKey, path: PathBuf) {
        match self.entries.get(&key) {
            Some(current) if current.file_name() >= path.file_name() => {}
            _ => {
                self.entries.insert(key, path);
            }
        }
    }

    fn key_for(&self, record: &Record) -> ArtifactKey {
        match self.origin {
            Origin::File => ArtifactKey {
                dir: record.relative_dir().map(Path::to_path_buf).unwrap_or_default(),
                identity: sanitize(&record.stem()),
            },
            Origin::Database => ArtifactKey {
                dir: PathBuf::new(),
                identity: sanitize(&record.id),
            },
        }
    }

    /// The output directory
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Origin the index was built for
    pub fn origin(&self) -> Origin {
        self.origin
    }

    /// Latest artifact for the record, if any
    pub fn existing(&self, record: &Record) -> Option<&Path> {
        self.entries.get(&self.key_for(record)).map(PathBuf::as_path)
    }

    /// Path for a new artifact of the record created at `now`
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::{TimeZone, Utc};
    /// use std::path::Path;
    /// use triplex_domain::{Origin, Record};
    /// use triplex_store::ArtifactIndex;
    ///
    /// let now = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 5).unwrap();
    ///
    /// let files = ArtifactIndex::new("out", Origin::File);
    /// let record = Record::new("brief_12", "").with_origin_path("jean_paul/brief_12.xml");
    /// assert_eq!(
    ///     files.new_artifact_path(&record, &now),
    ///     Path::new("out/jean_paul/20240301_093005_brief_12.json")
    /// );
    ///
    /// let rows = ArtifactIndex::new("out", Origin::Database);
    /// assert_eq!(
    ///     rows.new_artifact_path(&Record::new("105", ""), &now),
    ///     Path::new("out/20240301_093005-105.json")
    /// );
    /// ```
    pub fn new_artifact_path<Tz>(&self, record: &Record, now: &DateTime<Tz>) -> PathBuf
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        let key = self.key_for(record);
        let name = format!(
            "{}{}{}{}",
            now.format(TIMESTAMP_FORMAT),
            self.origin.name_delimiter(),
            key.identity,
            EXTENSION
        );
        self.output_dir.join(key.dir).join(name)
    }

    /// Record a freshly written artifact
    pub fn register(&mut self, record: &Record, path: impl Into<PathBuf>) {
        let key = self.key_for(record);
        self.insert(key, path.into());
    }

    /// Latest artifact paths, sorted
    pub fn latest_paths(&self) -> Vec<&Path> {
        let mut paths: Vec<&Path> = self.entries.values().map(PathBuf::as_path).collect();
        paths.sort();
        paths
    }

    /// Number of indexed records
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no record has an artifact
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Identity part of an artifact filename, if it is one
///
/// # Examples
///
/// ```
/// use triplex_store::index::parse_artifact_name;
///
/// assert_eq!(parse_artifact_name("20240301_093005-105.json", '-'), Some("105"));
/// assert_eq!(parse_artifact_name("20240301_093005_brief_12.json", '_'), Some("brief_12"));
/// assert_eq!(parse_artifact_name("20240301_093005-105.json", '_'), None);
/// assert_eq!(parse_artifact_name("notes.json", '-'), None);
/// ```
pub fn parse_artifact_name(file_name: &str, delimiter: char) -> Option<&str> {
    let stem = file_name.strip_suffix(EXTENSION)?;
    let (timestamp, rest) = stem.split_at_checked(TIMESTAMP_LEN)?;

    let well_formed = timestamp.char_indices().all(|(i, c)| {
        if i == 8 {
            c == '_'
        } else {
            c.is_ascii_digit()
        }
    });
    if !well_formed {
        return None;
    }

    rest.strip_prefix(delimiter).filter(|identity| !identity.is_empty())
}

fn sanitize(identity: &str) -> String {
    identity
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | '\0') { '_' } else { c })
        .collect()
}

//! Record module - the unit of work fed into the extraction pipeline

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Where a batch of records came from.
///
/// The origin decides how output artifacts are named and looked up:
/// file records are identified by their path stem, database records by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// Plain-text or TEI-XML files below an input directory
    File,
    /// Rows returned by a database query
    Database,
}

impl Origin {
    /// Separator between the timestamp prefix and the record identity in artifact names
    pub fn name_delimiter(&self) -> char {
        match self {
            Origin::File => '_',
            Origin::Database => '-',
        }
    }

    /// Stable lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            Origin::File => "file",
            Origin::Database => "database",
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An input unit produced by a source reader.
///
/// Records are immutable once created. The id is source-defined and is not
/// guaranteed to be unique across different sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Source-defined identifier (file stem or database id)
    pub id: String,

    /// Source text; may be empty
    pub text: String,

    /// Path relative to the source root, used to mirror directory structure in output
    pub origin_path: Option<PathBuf>,
}

impl Record {
    /// Create a record without an origin path (database rows)
    ///
    /// # Examples
    ///
    /// ```
    /// use triplex_domain::Record;
    ///
    /// let record = Record::new("42", "Alice works at Acme.");
    /// assert_eq!(record.stem(), "42");
    /// assert!(record.relative_dir().is_none());
    /// ```
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            origin_path: None,
        }
    }

    /// Attach the path relative to the source root
    pub fn with_origin_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.origin_path = Some(path.into());
        self
    }

    /// File stem of the origin path, or the id when there is none
    pub fn stem(&self) -> String {
        self.origin_path
            .as_deref()
            .and_then(Path::file_stem)
            .and_then(|s| s.to_str())
            .map(str::to_string)
            .unwrap_or_else(|| self.id.clone())
    }

    /// Directory part of the origin path, if it is not the source root itself
    ///
    /// # Examples
    ///
    /// ```
    /// use std::path::Path;
    /// use triplex_domain::Record;
    ///
    /// let record = Record::new("brief_12", "...").with_origin_path("jean_paul/1809/brief_12.xml");
    /// assert_eq!(record.relative_dir(), Some(Path::new("jean_paul/1809")));
    /// ```
    pub fn relative_dir(&self) -> Option<&Path> {
        self.origin_path
            .as_deref()
            .and_then(Path::parent)
            .filter(|p| !p.as_os_str().is_empty())
    }

    /// Number of Unicode scalar values in the text
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    /// Whether the text is empty after trimming
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

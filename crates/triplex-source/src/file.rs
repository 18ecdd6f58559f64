//! Plain-text and TEI-XML files below an input directory

use crate::{SourceError, TeiReader};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use triplex_domain::{Origin, Record, RecordSource};
use walkdir::WalkDir;

/// Default accepted file extensions
pub const DEFAULT_EXTENSIONS: &[&str] = &["txt", "xml"];

/// Reads one record per file
///
/// The record id is the file stem and the origin path is the path relative
/// to the input directory, so output can mirror the input tree. Artifacts are
/// named after the stem, so of several files sharing a directory and stem
/// (`brief.txt`, `brief.xml`) only the first in sorted order is read.
#[derive(Debug, Clone)]
pub struct FileSource {
    input_dir: PathBuf,
    extensions: Vec<String>,
    recursive: bool,
    tei: TeiReader,
}

impl FileSource {
    /// Create a source over `input_dir`
    ///
    /// # Errors
    ///
    /// [`SourceError::InvalidRoot`] if the directory does not exist.
    pub fn new<P, S>(input_dir: P, extensions: &[S], recursive: bool) -> Result<Self, SourceError>
    where
        P: Into<PathBuf>,
        S: AsRef<str>,
    {
        let input_dir = input_dir.into();
        if !input_dir.is_dir() {
            return Err(SourceError::InvalidRoot(input_dir));
        }

        let extensions = extensions
            .iter()
            .map(|e| e.as_ref().trim_start_matches('.').to_ascii_lowercase())
            .collect();

        Ok(Self {
            input_dir,
            extensions,
            recursive,
            tei: TeiReader::new()?,
        })
    }

    /// The input directory
    pub fn input_dir(&self) -> &Path {
        &self.input_dir
    }

    fn accepts(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| self.extensions.iter().any(|x| x.eq_ignore_ascii_case(e)))
            .unwrap_or(false)
    }

    fn list_files(&self) -> Vec<PathBuf> {
        let max_depth = if self.recursive { usize::MAX } else { 1 };

        WalkDir::new(&self.input_dir)
            .min_depth(1)
            .max_depth(max_depth)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable directory entry");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| self.accepts(path))
            .collect()
    }

    fn read_record(&self, path: &Path) -> Result<Record, SourceError> {
        let raw = std::fs::read_to_string(path).map_err(|source| SourceError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let is_xml = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("xml"))
            .unwrap_or(false);

        let text = if is_xml {
            self.tei.extract(&raw)
        } else {
            raw.trim().to_string()
        };

        if text.is_empty() {
            warn!(path = %path.display(), "File contains no text");
        }

        let relative = path.strip_prefix(&self.input_dir).unwrap_or(path).to_path_buf();
        let id = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();

        debug!(path = %relative.display(), chars = text.chars().count(), "Loaded file");
        Ok(Record::new(id, text).with_origin_path(relative))
    }
}

impl RecordSource for FileSource {
    type Error = SourceError;

    fn origin(&self) -> Origin {
        Origin::File
    }

    fn fetch(&self, selector: Option<&str>) -> Result<Vec<Record>, SourceError> {
        if let Some(name) = selector {
            let path = self.input_dir.join(name);
            if !path.is_file() {
                return Err(SourceError::NotFound(path.display().to_string()));
            }
            let record = self.read_record(&path)?;
            info!(file = name, "Loaded selected file");
            return Ok(vec![record]);
        }

        let files = self.list_files();
        if files.is_empty() {
            warn!(
                dir = %self.input_dir.display(),
                extensions = ?self.extensions,
                "No matching files found"
            );
        }

        let mut records = Vec::with_capacity(files.len());
        let mut seen: HashSet<(PathBuf, String)> = HashSet::new();
        for path in files {
            let record = match self.read_record(&path) {
                Ok(record) => record,
                Err(e) => {
                    warn!(error = %e, "Skipping file");
                    continue;
                }
            };

            let key = (
                record.relative_dir().map(Path::to_path_buf).unwrap_or_default(),
                record.stem(),
            );
            if seen.insert(key) {
                records.push(record);
            } else {
                warn!(
                    path = %path.display(),
                    stem = %record.stem(),
                    "Skipping file, another file in this directory has the same stem"
                );
            }
        }

        info!(count = records.len(), dir = %self.input_dir.display(), "Loaded files");
        Ok(records)
    }
}

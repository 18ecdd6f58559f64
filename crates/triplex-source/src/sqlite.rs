//! SQLite query source

use crate::SourceError;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use triplex_domain::{Origin, Record, RecordSource};

/// Column holding the record id
pub const ID_COLUMN: &str = "id";

/// Column holding the record text
pub const TEXT_COLUMN: &str = "sourcetext";

/// Reads records from a SQLite database
///
/// The configured query must return an `id` column (integer or text) and a
/// `sourcetext` column. NULL text becomes an empty record text.
///
/// # Examples
///
/// ```no_run
/// use triplex_domain::RecordSource;
/// use triplex_source::SqliteSource;
///
/// let source = SqliteSource::new("records.db", "SELECT id, sourcetext FROM letters").unwrap();
/// let records = source.fetch(Some("105")).unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct SqliteSource {
    database_path: PathBuf,
    query: String,
}

impl SqliteSource {
    /// Create a source; the database is opened read-only on every fetch
    pub fn new(database_path: impl Into<PathBuf>, query: impl Into<String>) -> Result<Self, SourceError> {
        let query = query.into();
        if query.trim().is_empty() {
            return Err(SourceError::InvalidQuery("query must not be empty".to_string()));
        }

        Ok(Self {
            database_path: database_path.into(),
            query,
        })
    }

    /// Path of the database file
    pub fn database_path(&self) -> &Path {
        &self.database_path
    }

    fn open(&self) -> Result<Connection, SourceError> {
        if !self.database_path.is_file() {
            return Err(SourceError::NotFound(self.database_path.display().to_string()));
        }
        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        Ok(Connection::open_with_flags(&self.database_path, flags)?)
    }

    fn query_records(&self, conn: &Connection) -> Result<Vec<Record>, SourceError> {
        let mut stmt = conn.prepare(&self.query)?;

        let shape_error = || {
            SourceError::InvalidQuery(format!(
                "query must return the columns '{}' and '{}'",
                ID_COLUMN, TEXT_COLUMN
            ))
        };
        let id_idx = stmt.column_index(ID_COLUMN).map_err(|_| shape_error())?;
        let text_idx = stmt.column_index(TEXT_COLUMN).map_err(|_| shape_error())?;

        let mut rows = stmt.query([])?;
        let mut records = Vec::new();

        while let Some(row) = rows.next()? {
            let id = match value_to_string(row.get_ref(id_idx)?) {
                Some(id) => id,
                None => {
                    warn!("Skipping row with NULL id");
                    continue;
                }
            };
            let text = value_to_string(row.get_ref(text_idx)?).unwrap_or_default();
            if text.trim().is_empty() {
                warn!(record_id = %id, "Row contains no text");
            }
            records.push(Record::new(id, text));
        }

        Ok(records)
    }
}

fn value_to_string(value: ValueRef<'_>) -> Option<String> {
    match value {
        ValueRef::Null => None,
        ValueRef::Integer(i) => Some(i.to_string()),
        ValueRef::Real(f) => Some(f.to_string()),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
    }
}

impl RecordSource for SqliteSource {
    type Error = SourceError;

    fn origin(&self) -> Origin {
        Origin::Database
    }

    fn fetch(&self, selector: Option<&str>) -> Result<Vec<Record>, SourceError> {
        let conn = self.open()?;
        let mut records = self.query_records(&conn)?;

        if let Some(id) = selector {
            records.retain(|r| r.id == id);
            if records.is_empty() {
                return Err(SourceError::NotFound(format!("record id {}", id)));
            }
        }

        info!(count = records.len(), db = %self.database_path.display(), "Fetched database records");
        Ok(records)
    }
}

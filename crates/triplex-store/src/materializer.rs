//! Result materializer: merges model output with execution metadata and
//! writes the JSON document plus its derived diagram and visualization

use crate::{diagram, html, StoreError};
use chrono::{DateTime, SecondsFormat, TimeZone};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};
use triplex_domain::{ExtractionDocument, GraphView, Record};

/// Key under which the diagram source is embedded in the JSON document
pub const DIAGRAM_KEY: &str = "plantuml";

/// Default metadata block key
pub const DEFAULT_METADATA_KEY: &str = "meta";

/// Field of the metadata block rewritten in metadata-refresh mode
pub const ORIGINAL_TEXT_FIELD: &str = "original_text";

/// Metadata field holding the character count of the original text
pub const CHAR_COUNT_FIELD: &str = "char_count";

/// How artifacts are written
#[derive(Debug, Clone, PartialEq)]
pub struct MaterializerConfig {
    /// Key of the metadata block
    pub metadata_key: String,
    /// Whether to write the HTML visualization
    pub visualization: bool,
    /// Seed for the force layout
    pub layout_seed: u64,
}

impl Default for MaterializerConfig {
    fn default() -> Self {
        Self {
            metadata_key: DEFAULT_METADATA_KEY.to_string(),
            visualization: true,
            layout_seed: 42,
        }
    }
}

impl MaterializerConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.metadata_key.trim().is_empty() {
            return Err("metadata_key must not be empty".to_string());
        }
        if self.metadata_key == DIAGRAM_KEY {
            return Err(format!("metadata_key must not be '{}'", DIAGRAM_KEY));
        }
        Ok(())
    }
}

/// Provenance block stored next to the model output
///
/// Fields that are `None` are left out of the written document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    /// Record id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
    /// Source path relative to the input directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_file: Option<String>,
    /// Start of the extraction, RFC 3339
    #[serde(skip_serializing_if = "Option::is_none")]
    pub executed_at: Option<String>,
    /// Wall time of the extraction in seconds, two decimals
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,
    /// Model identifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Provider name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    /// Abstraction level used
    #[serde(skip_serializing_if = "Option::is_none")]
    pub granularity: Option<u8>,
    /// Characters in the source text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub char_count: Option<usize>,
    /// Full source text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_text: Option<String>,
}

impl ArtifactMetadata {
    /// Provenance taken from the record itself
    pub fn for_record(record: &Record) -> Self {
        Self {
            source_id: Some(record.id.clone()),
            source_file: record
                .origin_path
                .as_ref()
                .map(|p| p.to_string_lossy().replace('\\', "/")),
            char_count: Some(record.char_count()),
            original_text: Some(record.text.clone()),
            ..Self::default()
        }
    }

    /// Add execution start and duration
    pub fn with_execution<Tz>(mut self, started: &DateTime<Tz>, duration: Duration) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        self.executed_at = Some(started.to_rfc3339_opts(SecondsFormat::Secs, false));
        self.duration_seconds = Some((duration.as_secs_f64() * 100.0).round() / 100.0);
        self
    }

    /// Add model, provider and granularity
    pub fn with_model(mut self, model: &str, provider: &str, granularity: u8) -> Self {
        self.model = Some(model.to_string());
        self.provider = Some(provider.to_string());
        self.granularity = Some(granularity);
        self
    }
}

/// Files written for one artifact
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactPaths {
    /// The JSON document
    pub json: PathBuf,
    /// The PlantUML source
    pub diagram: PathBuf,
    /// The HTML view, when enabled
    pub visualization: Option<PathBuf>,
}

/// Writes and updates artifacts
#[derive(Debug, Clone)]
pub struct Materializer {
    config: MaterializerConfig,
}

impl Materializer {
    /// Create a materializer
    pub fn new(config: MaterializerConfig) -> Result<Self, StoreError> {
        config.validate().map_err(StoreError::Config)?;
        Ok(Self { config })
    }

    /// The configuration
    pub fn config(&self) -> &MaterializerConfig {
        &self.config
    }

    /// Merge model output with metadata and write all artifact files
    ///
    /// Model keys keep their order and are followed by the diagram source
    /// and the metadata block. Model values under either reserved key are
    /// dropped.
    ///
    /// # Errors
    ///
    /// Any filesystem failure is returned as [`StoreError::Io`].
    pub fn write(
        &self,
        json_path: &Path,
        model_output: ExtractionDocument,
        metadata: &ArtifactMetadata,
        title: &str,
    ) -> Result<ArtifactPaths, StoreError> {
        if let Some(parent) = json_path.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }

        let mut document = ExtractionDocument::new();
        for (key, value) in model_output {
            if key == DIAGRAM_KEY || key == self.config.metadata_key {
                warn!(key = %key, artifact = %json_path.display(), "Dropping reserved key from model output");
                continue;
            }
            document.insert(key, value);
        }

        let view = GraphView::from_document(&document);
        let dangling = view.dangling_triples();
        if dangling > 0 {
            debug!(dangling, artifact = %json_path.display(), "Triples reference undeclared ids");
        }

        let puml = diagram::render(&view);
        let visualization = self
            .config
            .visualization
            .then(|| html::render(&view, title, self.config.layout_seed));

        document.insert(DIAGRAM_KEY.to_string(), Value::String(puml.clone()));
        document.insert(self.config.metadata_key.clone(), serde_json::to_value(metadata)?);

        write_document(json_path, &document)?;

        let diagram_path = json_path.with_extension("puml");
        write_atomic(&diagram_path, puml.as_bytes())?;

        let visualization_path = match visualization {
            Some(page) => {
                let path = json_path.with_extension("html");
                write_atomic(&path, page.as_bytes())?;
                Some(path)
            }
            None => None,
        };

        info!(artifact = %json_path.display(), "Artifact written");
        Ok(ArtifactPaths {
            json: json_path.to_path_buf(),
            diagram: diagram_path,
            visualization: visualization_path,
        })
    }

    /// Re-attach the original text to an existing artifact's metadata block
    ///
    /// Only `original_text` and its `char_count` inside the metadata block
    /// change; a missing block is created. Every other key is written back
    /// unchanged.
    ///
    /// # Errors
    ///
    /// [`StoreError::Corrupt`] when the artifact cannot be read or is not a
    /// JSON object with an object-valued metadata block; [`StoreError::Io`]
    /// when writing fails.
    pub fn refresh_metadata(&self, json_path: &Path, original_text: &str) -> Result<(), StoreError> {
        let mut document = read_document(json_path)?;
        let key = &self.config.metadata_key;

        let block = document
            .entry(key.clone())
            .or_insert_with(|| Value::Object(serde_json::Map::new()));

        match block {
            Value::Object(fields) => {
                fields.insert(
                    ORIGINAL_TEXT_FIELD.to_string(),
                    Value::String(original_text.to_string()),
                );
                fields.insert(
                    CHAR_COUNT_FIELD.to_string(),
                    Value::from(original_text.chars().count()),
                );
            }
            _ => {
                return Err(StoreError::Corrupt {
                    path: json_path.to_path_buf(),
                    reason: format!("'{}' is not an object", key),
                })
            }
        }

        write_document(json_path, &document)?;
        info!(artifact = %json_path.display(), "Metadata refreshed");
        Ok(())
    }
}

/// Read an artifact's JSON document
pub fn read_document(path: &Path) -> Result<ExtractionDocument, StoreError> {
    let corrupt = |reason: String| StoreError::Corrupt {
        path: path.to_path_buf(),
        reason,
    };

    let text = fs::read_to_string(path).map_err(|e| corrupt(format!("unreadable: {}", e)))?;
    match serde_json::from_str::<Value>(&text) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(corrupt("top-level value is not an object".to_string())),
        Err(e) => Err(corrupt(format!("invalid JSON: {}", e))),
    }
}

fn write_document(path: &Path, document: &ExtractionDocument) -> Result<(), StoreError> {
    let mut text = serde_json::to_string_pretty(document)?;
    text.push('\n');
    write_atomic(path, text.as_bytes())
}

/// Write via a sibling temp file and rename, so readers never see half a file
fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), StoreError> {
    let mut tmp_name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);

    fs::write(&tmp, contents).map_err(|e| StoreError::io(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| StoreError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;
    use serde_json::json;
    use tempfile::TempDir;

    fn model_output() -> ExtractionDocument {
        json!({
            "entities": {
                "e1": {"label": "Jean Paul", "typ": "Person"},
                "e2": {"label": "Bayreuth", "typ": "Ort"}
            },
            "praedikate": {"p1": {"label": "wohnt in", "normalisiert_von": ["lebt in"]}},
            "triples": [{"subjekt": "e1", "praedikat": "p1", "objekt": "e2"}],
            "zusammenfassung": "Jean Paul wohnt in Bayreuth. Grüße!"
        })
        .as_object()
        .unwrap()
        .clone()
    }

    fn metadata() -> ArtifactMetadata {
        let record = Record::new("brief_12", "Jean Paul wohnt in Bayreuth.")
            .with_origin_path("jean_paul/brief_12.txt");
        let started = FixedOffset::east_opt(3600)
            .unwrap()
            .with_ymd_and_hms(2024, 3, 1, 9, 30, 5)
            .unwrap();
        ArtifactMetadata::for_record(&record)
            .with_execution(&started, Duration::from_millis(12_346))
            .with_model("llama3.1", "openai", 3)
    }

    fn materializer(visualization: bool) -> Materializer {
        Materializer::new(MaterializerConfig {
            visualization,
            ..MaterializerConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_write_layout_and_key_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("jean_paul/20240301_093005_brief_12.json");

        let paths = materializer(true)
            .write(&path, model_output(), &metadata(), "brief_12")
            .unwrap();

        assert!(paths.json.is_file());
        assert!(paths.diagram.is_file());
        assert_eq!(paths.diagram.extension().unwrap(), "puml");
        assert!(paths.visualization.as_ref().unwrap().is_file());

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.ends_with("}\n"));
        assert!(text.contains("Grüße!"));

        let doc = read_document(&path).unwrap();
        let keys: Vec<_> = doc.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec!["entities", "praedikate", "triples", "zusammenfassung", "plantuml", "meta"]
        );
    }

    #[test]
    fn test_metadata_block_contents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.json");
        materializer(false)
            .write(&path, model_output(), &metadata(), "a")
            .unwrap();

        let doc = read_document(&path).unwrap();
        let meta = doc["meta"].as_object().unwrap();
        assert_eq!(meta["source_id"], "brief_12");
        assert_eq!(meta["source_file"], "jean_paul/brief_12.txt");
        assert_eq!(meta["executed_at"], "2024-03-01T09:30:05+01:00");
        assert_eq!(meta["duration_seconds"], 12.35);
        assert_eq!(meta["model"], "llama3.1");
        assert_eq!(meta["provider"], "openai");
        assert_eq!(meta["granularity"], 3);
        assert_eq!(meta["char_count"], 28);
        assert_eq!(meta["original_text"], "Jean Paul wohnt in Bayreuth.");
    }

    #[test]
    fn test_absent_metadata_fields_are_omitted() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.json");
        let record = Record::new("9", "text");
        materializer(false)
            .write(&path, model_output(), &ArtifactMetadata::for_record(&record), "9")
            .unwrap();

        let doc = read_document(&path).unwrap();
        let meta = doc["meta"].as_object().unwrap();
        assert!(!meta.contains_key("source_file"));
        assert!(!meta.contains_key("model"));
        assert!(meta.values().all(|v| !v.is_null()));
    }

    #[test]
    fn test_visualization_disabled() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.json");
        let paths = materializer(false)
            .write(&path, model_output(), &metadata(), "a")
            .unwrap();

        assert!(paths.visualization.is_none());
        assert!(!dir.path().join("a.html").exists());
    }

    #[test]
    fn test_model_cannot_overwrite_reserved_keys() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.json");
        let mut output = model_output();
        output.insert("meta".to_string(), json!({"source_id": "forged"}));
        output.insert("plantuml".to_string(), json!("@startuml\n@enduml"));

        materializer(false).write(&path, output, &metadata(), "a").unwrap();

        let doc = read_document(&path).unwrap();
        assert_eq!(doc["meta"]["source_id"], "brief_12");
        assert!(doc["plantuml"].as_str().unwrap().contains("rectangle"));
    }

    #[test]
    fn test_diagram_file_matches_embedded_source() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.json");
        let paths = materializer(false)
            .write(&path, model_output(), &metadata(), "a")
            .unwrap();

        let doc = read_document(&path).unwrap();
        assert_eq!(fs::read_to_string(paths.diagram).unwrap(), doc["plantuml"].as_str().unwrap());
    }

    #[test]
    fn test_refresh_leaves_model_keys_byte_identical() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.json");
        let m = materializer(false);
        m.write(&path, model_output(), &metadata(), "a").unwrap();
        let before = fs::read_to_string(&path).unwrap();

        m.refresh_metadata(&path, "Neu erfasster Text").unwrap();
        let after = fs::read_to_string(&path).unwrap();

        let cut = |s: &str| s[..s.find("\"meta\"").unwrap()].to_string();
        assert_eq!(cut(&before), cut(&after));

        let doc = read_document(&path).unwrap();
        assert_eq!(doc["meta"]["original_text"], "Neu erfasster Text");
        assert_eq!(doc["meta"]["model"], "llama3.1");
    }

    #[test]
    fn test_refresh_creates_missing_block() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("old.json");
        fs::write(&path, "{\"triples\": []}").unwrap();

        materializer(false).refresh_metadata(&path, "text").unwrap();

        let doc = read_document(&path).unwrap();
        assert_eq!(doc["meta"]["original_text"], "text");
        assert_eq!(doc["meta"]["char_count"], 4);
    }

    #[test]
    fn test_refresh_recounts_characters() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.json");
        let m = materializer(false);
        m.write(&path, model_output(), &metadata(), "a").unwrap();
        let before = read_document(&path).unwrap()["meta"]["char_count"].clone();

        m.refresh_metadata(&path, "Grüße").unwrap();

        let doc = read_document(&path).unwrap();
        assert_ne!(doc["meta"]["char_count"], before);
        assert_eq!(doc["meta"]["char_count"], 5);
    }

    #[test]
    fn test_refresh_corrupt_artifact() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "{ not json").unwrap();

        let err = materializer(false).refresh_metadata(&path, "x").unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
        assert!(!err.is_fatal());

        fs::write(&path, "{\"meta\": 5}").unwrap();
        let err = materializer(false).refresh_metadata(&path, "x").unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }

    #[test]
    fn test_write_failure_is_fatal() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "file, not a directory").unwrap();

        let err = materializer(false)
            .write(&blocker.join("a.json"), model_output(), &metadata(), "a")
            .unwrap_err();

        assert!(matches!(err, StoreError::Io { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_invalid_metadata_key() {
        let config = MaterializerConfig {
            metadata_key: "plantuml".to_string(),
            ..MaterializerConfig::default()
        };
        assert!(matches!(Materializer::new(config), Err(StoreError::Config(_))));
    }
}

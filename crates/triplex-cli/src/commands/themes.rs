//! Themes command implementation.
//!
//! A read-only report over the latest artifact of every record: entity
//! counts per type, the most frequent labels per type and predicate counts.

use crate::cli::ThemesArgs;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use anyhow::Context;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use tracing::warn;
use triplex_domain::{GraphView, Origin};
use triplex_store::materializer::read_document;
use triplex_store::ArtifactIndex;

/// Type name used for entities without a type.
pub const UNTYPED: &str = "(untyped)";

/// Aggregated counts over many artifacts.
#[derive(Debug, Default)]
pub struct ThemeReport {
    artifacts: usize,
    unreadable: usize,
    entity_types: HashMap<String, usize>,
    labels: HashMap<String, HashMap<String, usize>>,
    predicates: HashMap<String, usize>,
}

impl ThemeReport {
    /// Empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one artifact's graph.
    pub fn add(&mut self, view: &GraphView) {
        self.artifacts += 1;

        for entity in view.entities() {
            let entity_type = entity
                .entity_type
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .unwrap_or(UNTYPED)
                .to_string();
            *self.entity_types.entry(entity_type.clone()).or_default() += 1;
            *self
                .labels
                .entry(entity_type)
                .or_default()
                .entry(entity.label.trim().to_string())
                .or_default() += 1;
        }

        for triple in view.triples() {
            let label = view.predicate_label(&triple.predicate).trim().to_string();
            *self.predicates.entry(label).or_default() += 1;
        }
    }

    /// Artifacts counted.
    pub fn artifacts(&self) -> usize {
        self.artifacts
    }

    /// Artifacts that could not be read.
    pub fn unreadable(&self) -> usize {
        self.unreadable
    }

    /// Entity types with counts, most frequent first.
    pub fn entity_types(&self) -> Vec<(&str, usize)> {
        ranked(&self.entity_types)
    }

    /// Up to `top` labels of a type, most frequent first.
    pub fn top_labels(&self, entity_type: &str, top: usize) -> Vec<(&str, usize)> {
        self.labels
            .get(entity_type)
            .map(|labels| ranked(labels).into_iter().take(top).collect())
            .unwrap_or_default()
    }

    /// Predicate labels with counts, most frequent first.
    pub fn predicates(&self) -> Vec<(&str, usize)> {
        ranked(&self.predicates)
    }

    /// Render the report as tables.
    pub fn render(&self, formatter: &Formatter, top: usize) -> String {
        if self.artifacts == 0 {
            return formatter.warning("No artifacts found.");
        }

        let mut sections = vec![
            formatter.header(&format!("THEMES ({} artifacts)", self.artifacts)),
            formatter.table(
                &["Entity type", "Count"],
                self.entity_types()
                    .into_iter()
                    .map(|(name, count)| vec![name.to_string(), count.to_string()]),
            ),
        ];

        for (entity_type, _) in self.entity_types() {
            sections.push(formatter.colorize(&format!("\nTop {}: {}", top, entity_type), "cyan"));
            sections.push(formatter.table(
                &["Label", "Count"],
                self.top_labels(entity_type, top)
                    .into_iter()
                    .map(|(label, count)| vec![label.to_string(), count.to_string()]),
            ));
        }

        if !self.predicates.is_empty() {
            sections.push(String::new());
            sections.push(formatter.table(
                &["Predicate", "Count"],
                self.predicates()
                    .into_iter()
                    .map(|(label, count)| vec![label.to_string(), count.to_string()]),
            ));
        }

        if self.unreadable > 0 {
            sections.push(formatter.warning(&format!("{} unreadable artifact(s) skipped", self.unreadable)));
        }

        sections.join("\n")
    }
}

fn ranked(counts: &HashMap<String, usize>) -> Vec<(&str, usize)> {
    let mut entries: Vec<(&str, usize)> = counts.iter().map(|(k, v)| (k.as_str(), *v)).collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    entries
}

/// Latest artifact of every record below `dir`, for both naming schemes.
pub fn artifact_paths(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = BTreeSet::new();
    for origin in [Origin::File, Origin::Database] {
        let index = ArtifactIndex::scan(dir, origin).map_err(|e| CliError::InvalidInput(e.to_string()))?;
        paths.extend(index.latest_paths().into_iter().map(Path::to_path_buf));
    }
    Ok(paths.into_iter().collect())
}

fn load_view(path: &Path) -> anyhow::Result<GraphView> {
    let document = read_document(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(GraphView::from_document(&document))
}

/// Build the report for a directory; unreadable artifacts are skipped.
pub fn build_report(dir: &Path) -> Result<ThemeReport> {
    if !dir.is_dir() {
        return Err(CliError::InvalidInput(format!(
            "artifact directory not found: {}",
            dir.display()
        )));
    }

    let mut report = ThemeReport::new();
    for path in artifact_paths(dir)? {
        match load_view(&path) {
            Ok(view) => report.add(&view),
            Err(e) => {
                warn!("Skipping artifact: {:#}", e);
                report.unreadable += 1;
            }
        }
    }
    Ok(report)
}

/// Execute the themes command.
pub fn execute_themes(args: ThemesArgs, formatter: &Formatter) -> Result<()> {
    let report = build_report(&args.input_dir)?;
    println!("{}", report.render(formatter, args.top));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, value: serde_json::Value) {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, serde_json::to_string_pretty(&value).unwrap()).unwrap();
    }

    fn letter(person: &str) -> serde_json::Value {
        json!({
            "entities": {
                "e1": {"label": person, "typ": "Person"},
                "e2": {"label": "Bayreuth", "typ": "Ort"},
                "e3": {"label": "Ohne Typ"}
            },
            "praedikate": {"p1": {"label": "wohnt in"}},
            "triples": [{"subjekt": "e1", "praedikat": "p1", "objekt": "e2"}]
        })
    }

    #[test]
    fn test_counts_across_artifacts() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "briefe/20240101_120000_brief_1.json", letter("Jean Paul"));
        write(dir.path(), "20240101_120000-7.json", letter("Jean Paul"));
        write(dir.path(), "20240102_120000-8.json", letter("Goethe"));

        let report = build_report(dir.path()).unwrap();

        assert_eq!(report.artifacts(), 3);
        assert_eq!(report.entity_types()[0].1, 3);
        assert_eq!(report.top_labels("Person", 1), vec![("Jean Paul", 2)]);
        assert_eq!(report.top_labels(UNTYPED, 5), vec![("Ohne Typ", 3)]);
        assert_eq!(report.predicates(), vec![("wohnt in", 3)]);
    }

    #[test]
    fn test_only_latest_artifact_per_record_counts() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "20240101_120000-7.json", letter("Alt"));
        write(dir.path(), "20240301_120000-7.json", letter("Neu"));

        let report = build_report(dir.path()).unwrap();

        assert_eq!(report.artifacts(), 1);
        assert_eq!(report.top_labels("Person", 5), vec![("Neu", 1)]);
    }

    #[test]
    fn test_corrupt_artifact_is_skipped() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("20240101_120000-1.json"), "not json").unwrap();
        write(dir.path(), "20240101_120000-2.json", letter("Goethe"));

        let report = build_report(dir.path()).unwrap();
        assert_eq!(report.artifacts(), 1);
        assert_eq!(report.unreadable(), 1);
    }

    #[test]
    fn test_missing_directory() {
        assert!(build_report(Path::new("/nonexistent/output_json")).is_err());
    }

    #[test]
    fn test_render() {
        let mut report = ThemeReport::new();
        let doc = letter("Jean Paul");
        report.add(&GraphView::from_document(doc.as_object().unwrap()));

        let text = report.render(&Formatter::new(false), 10);
        assert!(text.contains("THEMES (1 artifacts)"));
        assert!(text.contains("Person"));
        assert!(text.contains("wohnt in"));

        let empty = ThemeReport::new().render(&Formatter::new(false), 10);
        assert!(empty.contains("No artifacts found"));
    }
}

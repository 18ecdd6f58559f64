//! Terminal output for the CLI.

use colored::*;
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
};
use triplex_extractor::{RunEvent, RunObserver, RunStats, SkipReason};

const RULE_WIDTH: usize = 70;

/// Output formatter.
#[derive(Debug, Clone, Copy)]
pub struct Formatter {
    color_enabled: bool,
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(color_enabled: bool) -> Self {
        Self { color_enabled }
    }

    /// Format a success message.
    pub fn success(&self, message: &str) -> String {
        self.colorize(&format!("✓ {}", message), "green")
    }

    /// Format an error message.
    pub fn error(&self, message: &str) -> String {
        self.colorize(&format!("✗ {}", message), "red")
    }

    /// Format an info message.
    pub fn info(&self, message: &str) -> String {
        self.colorize(&format!("ℹ {}", message), "blue")
    }

    /// Format a warning message.
    pub fn warning(&self, message: &str) -> String {
        self.colorize(&format!("⚠ {}", message), "yellow")
    }

    /// Format a section header.
    pub fn header(&self, title: &str) -> String {
        let rule = "=".repeat(RULE_WIDTH);
        self.colorize(&format!("{}\n{}\n{}", rule, title, rule), "blue")
    }

    /// Format the end-of-run report.
    pub fn run_summary(&self, stats: &RunStats) -> String {
        let mut lines = vec![
            self.header("RUN COMPLETE"),
            self.colorize(&format!("Total: {}", stats.total), "cyan"),
            self.success(&format!("Succeeded: {}", stats.success)),
        ];
        if stats.skipped > 0 {
            lines.push(self.colorize(&format!("⊘ Skipped: {}", stats.skipped), "green"));
        }
        if stats.unvisited() > 0 {
            lines.push(self.warning(&format!("Not visited: {}", stats.unvisited())));
        }
        if stats.failed > 0 {
            lines.push(self.error(&format!("Failed: {}", stats.failed)));
        }
        lines.push(self.info(&format!("Model calls: {}", stats.api_calls)));

        if !stats.failed_ids.is_empty() {
            lines.push(String::new());
            lines.push(self.colorize(&format!("FAILED IDS ({})", stats.failed_ids.len()), "red"));
            for id in &stats.failed_ids {
                lines.push(self.colorize(&format!("  - {}", id), "red"));
            }
        }
        lines.join("\n")
    }

    /// Render a table with a header row.
    pub fn table<I, R>(&self, header: &[&str], rows: I) -> String
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = String>,
    {
        let mut builder = Builder::default();
        builder.push_record(header.iter().map(|h| h.to_string()));
        for row in rows {
            builder.push_record(row);
        }

        let mut table = builder.build();
        table
            .with(Style::rounded())
            .with(Modify::new(Rows::first()).with(Alignment::center()));
        table.to_string()
    }

    /// Colorize text if color is enabled.
    pub fn colorize(&self, text: &str, color: &str) -> String {
        if !self.color_enabled {
            return text.to_string();
        }

        match color {
            "red" => text.red().to_string(),
            "green" => text.green().to_string(),
            "blue" => text.blue().bold().to_string(),
            "yellow" => text.yellow().to_string(),
            "cyan" => text.cyan().to_string(),
            _ => text.to_string(),
        }
    }
}

/// Prints run progress to stdout.
#[derive(Debug, Clone, Copy)]
pub struct TerminalObserver {
    formatter: Formatter,
}

impl TerminalObserver {
    /// Observer printing with the given formatter.
    pub fn new(formatter: Formatter) -> Self {
        Self { formatter }
    }

    /// Text printed for an event.
    pub fn render(&self, event: &RunEvent) -> String {
        let f = &self.formatter;
        match event {
            RunEvent::RunStarted { mode, total, .. } => {
                if *total == 0 {
                    f.warning("No records to process")
                } else {
                    f.colorize(&format!("Records found: {} (mode: {})", total, mode), "cyan")
                }
            }
            RunEvent::RecordStarted { id, position, total } => {
                f.colorize(&format!("\n--- Record {}/{} (id {}) ---", position, total, id), "cyan")
            }
            RunEvent::RecordSkipped { id, reason } => match reason {
                SkipReason::AlreadyExtracted(_) => {
                    f.colorize(&format!("⊘ Skipping {}, artifact exists", id), "green")
                }
                SkipReason::NoArtifact => {
                    f.colorize(&format!("⊘ Skipping {}, no artifact to refresh", id), "yellow")
                }
            },
            RunEvent::RecordSucceeded { artifact, duration, .. } => f.success(&format!(
                "Saved {} ({:.2}s)",
                artifact.display(),
                duration.as_secs_f64()
            )),
            RunEvent::MetadataRefreshed { artifact, .. } => {
                f.success(&format!("Updated {}", artifact.display()))
            }
            RunEvent::RecordFailed { id, error } => f.error(&format!("{} failed: {}", id, error)),
            RunEvent::LimitReached { limit, unvisited } => f.warning(&format!(
                "Limit of {} reached, {} record(s) not visited",
                limit, unvisited
            )),
            RunEvent::RunFinished { stats } => format!("\n{}", f.run_summary(stats)),
        }
    }
}

impl RunObserver for TerminalObserver {
    fn on_event(&mut self, event: &RunEvent) {
        println!("{}", self.render(event));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::Duration;

    fn plain() -> Formatter {
        Formatter::new(false)
    }

    #[test]
    fn test_colorize_disabled() {
        assert_eq!(plain().success("test"), "✓ test");
        assert_eq!(plain().error("test"), "✗ test");
    }

    #[test]
    fn test_run_summary() {
        let mut stats = RunStats::new(6);
        stats.record_success();
        stats.record_skip();
        stats.record_failure("17");
        stats.api_calls = 4;

        let summary = plain().run_summary(&stats);
        assert!(summary.contains("Total: 6"));
        assert!(summary.contains("Skipped: 1"));
        assert!(summary.contains("Not visited: 3"));
        assert!(summary.contains("Failed: 1"));
        assert!(summary.contains("Model calls: 4"));
        assert!(summary.contains("  - 17"));
    }

    #[test]
    fn test_table() {
        let table = plain().table(&["Type", "Count"], vec![vec!["Person".to_string(), "3".to_string()]]);
        assert!(table.contains("Type"));
        assert!(table.contains("Person"));
    }

    #[test]
    fn test_event_rendering() {
        let observer = TerminalObserver::new(plain());

        let line = observer.render(&RunEvent::RecordSucceeded {
            id: "1".to_string(),
            artifact: PathBuf::from("out/a.json"),
            duration: Duration::from_millis(1500),
        });
        assert_eq!(line, "✓ Saved out/a.json (1.50s)");

        let line = observer.render(&RunEvent::LimitReached { limit: 2, unvisited: 5 });
        assert!(line.contains("5 record(s) not visited"));
    }
}

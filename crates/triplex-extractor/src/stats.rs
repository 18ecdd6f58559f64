//! Run statistics

use serde::Serialize;

/// Counters for one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    /// Records fetched from the source
    pub total: usize,
    /// Records that produced or refreshed an artifact
    pub success: usize,
    /// Records that were attempted and failed
    pub failed: usize,
    /// Records not attempted because of the skip policy
    pub skipped: usize,
    /// Model calls made during the run, retries included
    pub api_calls: u64,
    /// Ids of failed records, first-seen order, without duplicates
    pub failed_ids: Vec<String>,
}

impl RunStats {
    /// Stats for a run over `total` records
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    /// Count a success
    pub fn record_success(&mut self) {
        self.success += 1;
    }

    /// Count a skip
    pub fn record_skip(&mut self) {
        self.skipped += 1;
    }

    /// Count a failure
    pub fn record_failure(&mut self, id: &str) {
        self.failed += 1;
        if !self.failed_ids.iter().any(|known| known == id) {
            self.failed_ids.push(id.to_string());
        }
    }

    /// Records that were attempted
    pub fn attempted(&self) -> usize {
        self.success + self.failed
    }

    /// Records neither attempted nor skipped
    pub fn unvisited(&self) -> usize {
        self.total.saturating_sub(self.attempted() + self.skipped)
    }

    /// Process exit code for this outcome: 1 when any record failed
    pub fn exit_code(&self) -> i32 {
        if self.failed > 0 {
            1
        } else {
            0
        }
    }

    /// Human-readable report
    pub fn summary(&self) -> String {
        let mut lines = vec![
            "Run Summary".to_string(),
            "===========".to_string(),
            format!("Total: {}", self.total),
            format!("Succeeded: {}", self.success),
        ];

        if self.skipped > 0 {
            lines.push(format!("Skipped: {}", self.skipped));
        }
        if self.failed > 0 {
            lines.push(format!("Failed: {}", self.failed));
        }
        if self.unvisited() > 0 {
            lines.push(format!("Not visited: {}", self.unvisited()));
        }
        lines.push(format!("Model calls: {}", self.api_calls));

        if !self.failed_ids.is_empty() {
            lines.push(String::new());
            lines.push(format!("Failed ids ({}):", self.failed_ids.len()));
            for id in &self.failed_ids {
                lines.push(format!("  {}", id));
            }
        }

        lines.join("\n")
    }
}

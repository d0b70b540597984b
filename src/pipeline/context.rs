//! Per-run accumulator
//!
//! Each field is filled by exactly one stage and read by the ones after it.

use std::collections::BTreeMap;

use crate::analyzer::ScannedFile;
use crate::types::{ComponentSummary, FileAnalysis, StructuralFootprint};

#[derive(Debug, Clone, Default)]
pub struct PipelineContext {
    /// Inventory after the optional pre-filter
    pub files: Vec<ScannedFile>,
    /// One per file, in inventory order
    pub footprints: Vec<StructuralFootprint>,
    /// Successful Stage 1 units, in inventory order
    pub file_analyses: Vec<FileAnalysis>,
    /// Successful Stage 2 units, keyed and ordered by directory
    pub component_summaries: BTreeMap<String, String>,
    pub global_architecture: Option<String>,
    pub failures: FailedUnits,
}

impl PipelineContext {
    /// File analyses grouped by directory, each group in inventory order
    pub fn analyses_by_dir(&self) -> BTreeMap<String, Vec<FileAnalysis>> {
        let mut groups: BTreeMap<String, Vec<FileAnalysis>> = BTreeMap::new();
        for analysis in &self.file_analyses {
            groups
                .entry(analysis.dir.clone())
                .or_default()
                .push(analysis.clone());
        }
        groups
    }

    pub fn components(&self) -> Vec<ComponentSummary> {
        self.component_summaries
            .iter()
            .map(|(dir, summary)| ComponentSummary {
                dir: dir.clone(),
                summary: summary.clone(),
            })
            .collect()
    }

    pub fn is_partial(&self) -> bool {
        self.failures.is_partial()
    }
}

/// Units that failed after retries, by stage
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FailedUnits {
    /// Stage 1 files with no analysis
    pub files: Vec<String>,
    /// Stage 2 directories with no summary
    pub components: Vec<String>,
    /// Stage 1 files whose agent hit the turn limit
    pub exhausted: Vec<String>,
}

impl FailedUnits {
    /// True when some unit is missing from the document. Exhausted agents
    /// still contribute an entry, so they do not count.
    pub fn is_partial(&self) -> bool {
        !self.files.is_empty() || !self.components.is_empty()
    }
}

//! Per-stage analysis records
//!
//! Each stage of the pipeline produces one of these. They are immutable once
//! built and serialize with the field names the persisted cache uses.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

/// Note attached to a footprint when no syntax tree could be extracted.
pub const AST_UNAVAILABLE_NOTE: &str =
    "AST parsing unavailable. You MUST use view_file to extract features.";

/// Lightweight syntax summary of one source file.
///
/// Names are de-duplicated and order-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuralFootprint {
    /// Path relative to the analyzed root, `/`-separated
    pub path: String,
    pub classes: BTreeSet<String>,
    pub functions: BTreeSet<String>,
    pub exports: BTreeSet<String>,
    pub imports: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl StructuralFootprint {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Empty footprint that tells the model to read the source itself.
    pub fn unavailable(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            note: Some(AST_UNAVAILABLE_NOTE.to_string()),
            ..Default::default()
        }
    }

    /// True when the footprint carries enough structure to describe the file.
    /// Imports alone do not count.
    pub fn has_structure(&self) -> bool {
        !self.classes.is_empty() || !self.functions.is_empty() || !self.exports.is_empty()
    }
}

/// Stage 1 output: feature description of a single file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileAnalysis {
    pub path: String,
    pub dir: String,
    pub features: String,
}

impl FileAnalysis {
    /// Build an analysis, deriving `dir` from `path`.
    pub fn new(path: impl Into<String>, features: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            dir: dir_of(&path),
            path,
            features: features.into(),
        }
    }
}

/// Stage 2 output: synthesized description of one directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentSummary {
    pub dir: String,
    pub summary: String,
}

/// Parent directory of a relative path, `"."` for files at the root.
pub fn dir_of(path: &str) -> String {
    match Path::new(path).parent() {
        Some(parent) if !parent.as_os_str().is_empty() => to_slash(parent),
        _ => ".".to_string(),
    }
}

/// Render a path with `/` separators regardless of platform.
pub fn to_slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dir_of() {
        assert_eq!(dir_of("a.js"), ".");
        assert_eq!(dir_of("src/a.js"), "src");
        assert_eq!(dir_of("src/util/b.rs"), "src/util");
    }

    #[test]
    fn test_file_analysis_derives_dir() {
        let fa = FileAnalysis::new("pkg/c.py", "- parses things");
        assert_eq!(fa.dir, "pkg");
        assert_eq!(fa.path, "pkg/c.py");
    }

    #[test]
    fn test_footprint_structure() {
        let mut fp = StructuralFootprint::new("a.ts");
        assert!(!fp.has_structure());
        fp.imports.insert("./b".into());
        assert!(!fp.has_structure());
        fp.functions.insert("run".into());
        assert!(fp.has_structure());
    }

    #[test]
    fn test_unavailable_footprint_serializes_note() {
        let fp = StructuralFootprint::unavailable("Makefile");
        let json = serde_json::to_value(&fp).unwrap();
        assert_eq!(json["note"], AST_UNAVAILABLE_NOTE);
        assert_eq!(json["classes"], serde_json::json!([]));

        let plain = serde_json::to_value(StructuralFootprint::new("x.rs")).unwrap();
        assert!(plain.get("note").is_none());
    }
}

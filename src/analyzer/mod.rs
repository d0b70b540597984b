//! Code Analyzer Module
//!
//! Collaborators the pipeline consumes:
//! - File inventory with built-in ignore rules and `.gitignore` support
//! - Grammar-agnostic structural footprints (tree-sitter)

pub mod parser;
pub mod scanner;

pub use parser::{Language, SharedExtractor, StructuralExtractor, TreeSitterExtractor};
pub use scanner::{FileScanner, ScannedFile};

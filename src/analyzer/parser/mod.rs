//! Language Parser Module
//!
//! Tree-sitter based structural extraction for the bundled grammars.
//!
//! ```rust,ignore
//! use featuremap::analyzer::parser::{StructuralExtractor, TreeSitterExtractor};
//!
//! let footprint = TreeSitterExtractor::new().extract(&path, "src/main.rs");
//! ```

pub mod footprint;
pub mod language;
pub mod traits;

pub use footprint::{TreeSitterExtractor, collect_footprint};
pub use language::Language;
pub use traits::{StructuralExtractor, create_ts_parser, get_node_text};

use std::sync::Arc;

/// Shared extractor for the pipeline
pub type SharedExtractor = Arc<dyn StructuralExtractor>;

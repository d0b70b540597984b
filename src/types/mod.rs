pub mod analysis;
pub mod error;

pub use analysis::{
    AST_UNAVAILABLE_NOTE, ComponentSummary, FileAnalysis, StructuralFootprint, dir_of, to_slash,
};
pub use error::{ErrorCategory, ErrorClassifier, FeatureMapError, LlmError, Result};

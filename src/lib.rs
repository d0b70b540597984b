//! featuremap - AI-Driven Codebase Feature Mapping
//!
//! Walks a source tree, extracts a structural footprint of each file with
//! tree-sitter, and asks a reasoning service to describe what the code does
//! at three levels: file, directory and whole repository. The result is one
//! Markdown document.
//!
//! ## Core Features
//!
//! - **Staged Pipeline**: optional AI pre-filter, then file, component and
//!   global synthesis with full barriers between stages
//! - **Agentic Extraction**: the file-level model may request the raw source
//!   through a `view_file` tool, bounded by a turn limit
//! - **Resumable Cache**: every finished unit is persisted immediately and
//!   reused on the next run
//! - **Bounded Concurrency**: one executor caps in-flight service calls
//!
//! ## Quick Start
//!
//! ```ignore
//! use featuremap::{CacheStore, Config, FeatureMapPipeline, FileScanner, create_client};
//!
//! let config = Config::default();
//! let client = create_client(&config.llm)?;
//! let files = FileScanner::new("my-service")?.scan()?;
//! let cache = Arc::new(CacheStore::open(".extract-cache-my-service.json"));
//! let result = FeatureMapPipeline::new("my-service", client, cache, config.pipeline)
//!     .run(files)
//!     .await?;
//! std::fs::write("my-service-features.md", result.document)?;
//! ```
//!
//! ## Modules
//!
//! - [`ai`]: reasoning-service client, retry policy, usage metrics
//! - [`analyzer`]: file inventory and tree-sitter footprints
//! - [`pipeline`]: stages, executor, cache and document assembly
//! - [`config`]: layered configuration

pub mod ai;
pub mod analyzer;
pub mod cli;
pub mod config;
pub mod constants;
pub mod pipeline;
pub mod types;

// =============================================================================
// Core Re-exports
// =============================================================================

pub use config::{Config, ConfigLoader};

pub use types::error::{ErrorCategory, FeatureMapError, LlmError, Result};
pub use types::{FileAnalysis, StructuralFootprint};

// =============================================================================
// Pipeline Re-exports
// =============================================================================

pub use pipeline::{
    CacheRecord, CacheStore, FeatureMapPipeline, PipelineContext, PipelineResult, PipelineStage,
};

// =============================================================================
// AI Re-exports
// =============================================================================

pub use ai::{
    AnthropicClient, MetricsCollector, ReasoningClient, RetryPolicy, SharedClient, SharedMetrics,
    create_client,
};

// =============================================================================
// Analyzer Re-exports
// =============================================================================

pub use analyzer::{FileScanner, Language, ScannedFile, StructuralExtractor, TreeSitterExtractor};

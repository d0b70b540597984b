//! Map Command
//!
//! Scans a directory, runs the staged pipeline and writes the feature map.
//!
//! Usage:
//!   featuremap map [PATH] [--exts .go,.ts] [--clear-cache]
//!                  [--prefilter | --no-prefilter] [--output FILE] [--cache FILE]

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::runtime::Runtime;
use tracing::info;

use crate::ai::create_client;
use crate::analyzer::FileScanner;
use crate::cli::ui::Output;
use crate::cli::util::TargetPaths;
use crate::config::{Config, ConfigLoader};
use crate::pipeline::{CacheStore, FeatureMapPipeline};
use crate::types::{FeatureMapError, Result};

/// Map run options (consolidated CLI parameters)
#[derive(Debug, Clone, Default)]
pub struct MapOptions {
    /// Directory to analyze (default: current directory)
    pub path: Option<PathBuf>,
    /// Replace the default extension list
    pub extensions: Vec<String>,
    /// Ignore and overwrite the existing cache
    pub clear_cache: bool,
    /// Stage 0 decision; `None` asks when attached to a terminal
    pub prefilter: Option<bool>,
    pub output: Option<PathBuf>,
    pub cache: Option<PathBuf>,
    pub concurrency: Option<usize>,
    pub model: Option<String>,
}

pub fn run(options: MapOptions) -> Result<()> {
    let mut config = ConfigLoader::load()?;
    apply_overrides(&mut config, &options);
    config.validate()?;

    // Credentials are checked before any file is touched
    let client = create_client(&config.llm)?;

    let paths = TargetPaths::resolve(options.path.as_deref(), options.cache, options.output)?;
    let mut scanner = FileScanner::new(&paths.root)?.with_exclude(config.scan.exclude.clone());
    if !options.extensions.is_empty() {
        scanner = scanner.with_extensions(&options.extensions);
    }
    let files = scanner.scan()?;
    if files.is_empty() {
        return Err(FeatureMapError::Scan(format!(
            "No matching files under {}",
            paths.root.display()
        )));
    }
    info!("Found {} files under {}", files.len(), paths.root.display());

    let prefilter = match options.prefilter {
        Some(choice) => choice,
        None => ask_prefilter(files.len())?,
    };

    let cache = if options.clear_cache {
        info!("Ignoring existing cache at {}", paths.cache.display());
        CacheStore::fresh(&paths.cache)
    } else {
        CacheStore::open(&paths.cache)
    };

    let pipeline = FeatureMapPipeline::new(&paths.root, client, Arc::new(cache), config.pipeline)
        .with_prefilter(prefilter);

    let rt = Runtime::new()?;
    let result = rt.block_on(pipeline.run(files))?;

    fs::write(&paths.output, &result.document)?;

    let output = Output::new();
    output.success(&format!(
        "Feature map written to {}",
        paths.output.display()
    ));
    if result.is_partial() {
        let failures = &result.context.failures;
        output.warning(&format!(
            "Partial analysis: {} files and {} directories failed; rerun to retry them",
            failures.files.len(),
            failures.components.len()
        ));
    }
    output.info(&result.metrics.display());
    Ok(())
}

fn apply_overrides(config: &mut Config, options: &MapOptions) {
    if let Some(concurrency) = options.concurrency {
        config.pipeline.concurrency = concurrency;
    }
    if let Some(model) = &options.model {
        config.llm.model = model.clone();
    }
}

/// Interactive Stage 0 prompt; non-interactive sessions skip Stage 0.
fn ask_prefilter(file_count: usize) -> Result<bool> {
    if !console::Term::stdout().is_term() {
        return Ok(false);
    }

    let answer = dialoguer::Confirm::new()
        .with_prompt(format!(
            "Ready to analyze {} files. Should we run AI Pre-filtering (Stage 0) before continuing?",
            file_count
        ))
        .default(false)
        .interact()
        .map_err(prompt_error)?;
    Ok(answer)
}

fn prompt_error(err: dialoguer::Error) -> FeatureMapError {
    let dialoguer::Error::IO(e) = err;
    FeatureMapError::Io(e)
}

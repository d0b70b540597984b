//! Stage 0: AI file pre-filtering
//!
//! Sends the inventory in fixed-size chunks and keeps only the paths the
//! model returns. A chunk whose call fails keeps all of its files.

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use tracing::{info, instrument, warn};

use super::executor::run_bounded;
use super::prompts;
use super::{FeatureMapPipeline, PipelineStage};
use crate::ai::{ChatMessage, ModelRequest, parse_string_array};
use crate::analyzer::ScannedFile;
use crate::constants::request;
use crate::types::{LlmError, Result};

impl FeatureMapPipeline {
    #[instrument(skip_all, fields(stage = PipelineStage::Prefilter.as_u8()))]
    pub(super) async fn run_prefilter(&self, files: Vec<ScannedFile>) -> Result<Vec<ScannedFile>> {
        if files.is_empty() {
            return Ok(files);
        }

        let total = files.len();
        let chunk_size = self.config.prefilter_chunk_size.max(1);
        let chunks: Vec<Vec<ScannedFile>> = files.chunks(chunk_size).map(<[_]>::to_vec).collect();
        let chunk_count = chunks.len();
        info!(
            "{}: {} files in {} chunk(s)",
            PipelineStage::Prefilter,
            total,
            chunk_count
        );

        let results = run_bounded(
            chunks.into_iter().enumerate().collect(),
            self.config.concurrency,
            |(index, chunk)| async move {
                match self.filter_chunk(&chunk, index, chunk_count).await {
                    Ok(kept) => kept,
                    Err(e) => {
                        warn!(
                            chunk = index + 1,
                            error = %e,
                            "AI filtering failed for chunk {}, keeping all files in chunk",
                            index + 1
                        );
                        chunk
                    }
                }
            },
        )
        .await;

        let kept: Vec<ScannedFile> = results.into_iter().flatten().collect();
        info!(
            "{}: removed {} trivial files",
            PipelineStage::Prefilter,
            total - kept.len()
        );
        Ok(kept)
    }

    async fn filter_chunk(
        &self,
        chunk: &[ScannedFile],
        index: usize,
        chunk_count: usize,
    ) -> Result<Vec<ScannedFile>> {
        let relative: Vec<String> = chunk.iter().map(|f| f.relative.clone()).collect();
        let request = ModelRequest::new(vec![ChatMessage::user(prompts::prefilter_prompt(
            &relative,
            index,
            chunk_count,
        )?)])
        .with_system(prompts::PREFILTER_SYSTEM)
        .with_max_tokens(request::PREFILTER_MAX_TOKENS)
        .with_temperature(request::PREFILTER_TEMPERATURE);

        let label = format!("prefilter chunk {}", index + 1);
        let returned = self
            .prefilter_retry
            .run(&label, || async {
                let response = self.client.complete(&request).await?;
                self.metrics.record_usage(&response.usage);
                let text = response
                    .reply
                    .text()
                    .ok_or_else(|| LlmError::malformed("expected a text reply"))?;
                parse_string_array(text)
            })
            .await?;

        let keep: HashSet<PathBuf> = returned
            .iter()
            .map(|p| normalize(&self.root.join(p)))
            .collect();
        Ok(chunk
            .iter()
            .filter(|f| keep.contains(&normalize(&f.path)))
            .cloned()
            .collect())
    }
}

/// Resolve `.` and `..` without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

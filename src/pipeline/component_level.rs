//! Stage 2: per-directory synthesis, cached by directory

use std::collections::BTreeMap;

use tracing::{debug, info, instrument, warn};

use super::context::PipelineContext;
use super::executor::run_bounded;
use super::prompts;
use super::{FeatureMapPipeline, PipelineStage};
use crate::ai::{ChatMessage, ModelRequest};
use crate::constants::request;
use crate::types::{FeatureMapError, FileAnalysis, LlmError, Result};

impl FeatureMapPipeline {
    /// Returns summaries keyed by directory plus the directories that failed.
    #[instrument(skip_all, fields(stage = PipelineStage::ComponentLevel.as_u8()))]
    pub(super) async fn run_component_level(
        &self,
        ctx: &PipelineContext,
    ) -> Result<(BTreeMap<String, String>, Vec<String>)> {
        let stage = PipelineStage::ComponentLevel;
        let groups: Vec<(String, Vec<FileAnalysis>)> = ctx.analyses_by_dir().into_iter().collect();
        info!("{}: {} components", stage, groups.len());

        let outcomes = run_bounded(groups, self.config.concurrency, |(dir, files)| async move {
            let summary = self.summarize_component(&dir, &files).await;
            (dir, summary)
        })
        .await;

        let mut summaries = BTreeMap::new();
        let mut failed = Vec::new();
        for (dir, summary) in outcomes {
            match summary {
                Ok(text) => {
                    summaries.insert(dir, text);
                }
                Err(e) => {
                    warn!(component = %dir, error = %e, "Failed to summarize component");
                    self.metrics.record_failure();
                    failed.push(dir);
                }
            }
        }

        info!(
            "{}: {} summarized, {} failed",
            stage,
            summaries.len(),
            failed.len()
        );
        if summaries.is_empty() {
            return Err(stage.error("No component could be summarized."));
        }
        Ok((summaries, failed))
    }

    async fn summarize_component(&self, dir: &str, files: &[FileAnalysis]) -> Result<String> {
        if let Some(hit) = self.cache.component_summary(dir).await {
            debug!(component = dir, "Cache hit");
            self.metrics.record_cache_hit();
            return Ok(hit);
        }

        let request = ModelRequest::new(vec![ChatMessage::user(prompts::component_prompt(
            dir, files,
        ))])
        .with_system(prompts::COMPONENT_SYSTEM)
        .with_max_tokens(request::COMPONENT_MAX_TOKENS)
        .with_temperature(request::SYNTHESIS_TEMPERATURE);

        let label = format!("Component: {}", dir);
        let summary = self
            .extraction_retry
            .run(&label, || async {
                let response = self.client.complete(&request).await?;
                self.metrics.record_usage(&response.usage);
                let text = response
                    .reply
                    .text()
                    .ok_or_else(|| LlmError::malformed("expected a text reply"))?;
                Ok::<_, FeatureMapError>(text.to_string())
            })
            .await?;

        if let Err(e) = self.cache.record_component_summary(dir, &summary).await {
            warn!(component = dir, error = %e, "Failed to persist component summary");
        }
        Ok(summary)
    }
}

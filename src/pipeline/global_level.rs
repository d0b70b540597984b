//! Stage 3: whole-repository synthesis
//!
//! A single unit under the `"global"` key. When some directory summary is
//! missing the text is still produced but not cached, so a later run with the
//! full set recomputes it.

use tracing::{debug, info, instrument, warn};

use super::context::PipelineContext;
use super::prompts;
use super::{FeatureMapPipeline, PipelineStage};
use crate::ai::{ChatMessage, ModelRequest};
use crate::constants::pipeline::GLOBAL_UNIT_KEY;
use crate::constants::request;
use crate::types::{FeatureMapError, LlmError, Result};

impl FeatureMapPipeline {
    #[instrument(skip_all, fields(stage = PipelineStage::Global.as_u8(), components = ctx.component_summaries.len()))]
    pub(super) async fn run_global(&self, ctx: &PipelineContext) -> Result<String> {
        let stage = PipelineStage::Global;

        if let Some(hit) = self.cache.global_architecture().await {
            debug!(unit = GLOBAL_UNIT_KEY, "Cache hit");
            self.metrics.record_cache_hit();
            return Ok(hit);
        }

        info!("{}: {} components", stage, ctx.component_summaries.len());
        let omitted = &ctx.failures.components;
        let request = ModelRequest::new(vec![ChatMessage::user(prompts::global_prompt(
            &ctx.component_summaries,
            omitted,
        ))])
        .with_system(prompts::GLOBAL_SYSTEM)
        .with_max_tokens(request::GLOBAL_MAX_TOKENS)
        .with_temperature(request::SYNTHESIS_TEMPERATURE);

        let text = self
            .extraction_retry
            .run(GLOBAL_UNIT_KEY, || async {
                let response = self.client.complete(&request).await?;
                self.metrics.record_usage(&response.usage);
                let text = response
                    .reply
                    .text()
                    .ok_or_else(|| LlmError::malformed("expected a text reply"))?;
                Ok::<_, FeatureMapError>(text.to_string())
            })
            .await
            .map_err(|e| stage.error(e.to_string()))?;

        if omitted.is_empty() {
            if let Err(e) = self.cache.record_global_architecture(&text).await {
                warn!(error = %e, "Failed to persist global architecture");
            }
        } else {
            warn!(
                omitted = omitted.len(),
                "Global architecture built without every component; not caching it"
            );
        }
        Ok(text)
    }
}

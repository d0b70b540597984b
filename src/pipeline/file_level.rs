//! Stage 1: per-file feature extraction
//!
//! One agent conversation per footprint, cached by file path.

use tracing::{debug, info, instrument, warn};

use super::agent::{AgentOutcome, ExtractionAgent};
use super::context::PipelineContext;
use super::executor::run_bounded;
use super::{FeatureMapPipeline, PipelineStage};
use crate::constants::pipeline::AGENT_EXHAUSTED_SENTINEL;
use crate::types::{FileAnalysis, Result, StructuralFootprint};

/// How one file unit resolved
enum FileOutcome {
    Done(FileAnalysis),
    Exhausted(FileAnalysis),
    Failed(String),
}

impl FeatureMapPipeline {
    /// Returns the analyses in inventory order, the failed paths and the
    /// paths whose agent hit the turn limit.
    #[instrument(skip_all, fields(stage = PipelineStage::FileLevel.as_u8(), files = ctx.footprints.len()))]
    pub(super) async fn run_file_level(
        &self,
        ctx: &PipelineContext,
    ) -> Result<(Vec<FileAnalysis>, Vec<String>, Vec<String>)> {
        let stage = PipelineStage::FileLevel;
        info!("{}: {} files", stage, ctx.footprints.len());

        let agent = ExtractionAgent::new(
            self.client.clone(),
            self.extraction_retry.clone(),
            self.metrics.clone(),
            self.config.max_agent_turns,
        );
        let agent = &agent;

        let outcomes = run_bounded(
            ctx.footprints.iter().collect(),
            self.config.concurrency,
            |footprint| async move { self.analyze_file(agent, footprint).await },
        )
        .await;

        let mut analyses = Vec::with_capacity(outcomes.len());
        let mut failed = Vec::new();
        let mut exhausted = Vec::new();
        for outcome in outcomes {
            match outcome {
                FileOutcome::Done(analysis) => analyses.push(analysis),
                FileOutcome::Exhausted(analysis) => {
                    exhausted.push(analysis.path.clone());
                    analyses.push(analysis);
                }
                FileOutcome::Failed(path) => failed.push(path),
            }
        }

        info!(
            "{}: {} analyzed, {} failed",
            stage,
            analyses.len(),
            failed.len()
        );
        if analyses.is_empty() {
            return Err(stage.error("No file could be analyzed."));
        }
        Ok((analyses, failed, exhausted))
    }

    async fn analyze_file(
        &self,
        agent: &ExtractionAgent,
        footprint: &StructuralFootprint,
    ) -> FileOutcome {
        let path = footprint.path.as_str();
        if let Some(hit) = self.cache.file_analysis(path).await {
            debug!(file = path, "Cache hit");
            self.metrics.record_cache_hit();
            if hit.features == AGENT_EXHAUSTED_SENTINEL {
                return FileOutcome::Exhausted(hit);
            }
            return FileOutcome::Done(hit);
        }

        match agent.run(footprint, self.root.join(path)).await {
            Ok(AgentOutcome::Finalized(features)) => {
                let analysis = FileAnalysis::new(path, features);
                if let Err(e) = self.cache.record_file_analysis(analysis.clone()).await {
                    warn!(file = path, error = %e, "Failed to persist file analysis");
                }
                FileOutcome::Done(analysis)
            }
            Ok(AgentOutcome::Exhausted) => {
                let analysis = FileAnalysis::new(path, AGENT_EXHAUSTED_SENTINEL);
                if let Err(e) = self.cache.record_file_analysis(analysis.clone()).await {
                    warn!(file = path, error = %e, "Failed to persist file analysis");
                }
                FileOutcome::Exhausted(analysis)
            }
            Err(e) => {
                warn!(file = path, error = %e, "Failed to analyze file");
                self.metrics.record_failure();
                FileOutcome::Failed(path.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::ScriptedClient;
    use super::*;
    use crate::ai::RetryPolicy;
    use crate::config::PipelineConfig;
    use crate::pipeline::CacheStore;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn context(paths: &[&str]) -> PipelineContext {
        PipelineContext {
            footprints: paths
                .iter()
                .map(|p| StructuralFootprint::unavailable(*p))
                .collect(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_cache_hit_makes_no_call() {
        let temp = TempDir::new().unwrap();
        let cache = Arc::new(CacheStore::fresh(temp.path().join("cache.json")));
        cache
            .record_file_analysis(FileAnalysis::new("a.js", "cached"))
            .await
            .unwrap();

        let client = Arc::new(ScriptedClient::new());
        let pipeline =
            FeatureMapPipeline::new(temp.path(), client.clone(), cache, PipelineConfig::default());

        let (analyses, failed, _) = pipeline.run_file_level(&context(&["a.js"])).await.unwrap();
        assert_eq!(analyses, vec![FileAnalysis::new("a.js", "cached")]);
        assert!(failed.is_empty());
        assert_eq!(client.calls(), 0);
    }

    #[tokio::test]
    async fn test_results_in_inventory_order_and_cached() {
        let temp = TempDir::new().unwrap();
        let cache_path = temp.path().join("cache.json");
        let client = Arc::new(ScriptedClient::new());
        let pipeline = FeatureMapPipeline::new(
            temp.path(),
            client.clone(),
            Arc::new(CacheStore::fresh(&cache_path)),
            PipelineConfig::default(),
        );

        let paths = ["z.py", "a/b.rs", "m.go", "c.ts"];
        let (analyses, _, _) = pipeline.run_file_level(&context(&paths)).await.unwrap();

        let got: Vec<&str> = analyses.iter().map(|a| a.path.as_str()).collect();
        assert_eq!(got, paths.to_vec());
        assert_eq!(analyses[1].dir, "a");
        assert_eq!(analyses[1].features, "F_a/b.rs");

        let record = CacheStore::open(&cache_path).snapshot().await;
        assert_eq!(record.file_analyses.len(), 4);
    }

    #[tokio::test]
    async fn test_failure_isolated_to_unit() {
        let temp = TempDir::new().unwrap();
        let client = Arc::new(ScriptedClient::new().failing_on("\"path\": \"bad.py\""));
        let pipeline = FeatureMapPipeline::new(
            temp.path(),
            client.clone(),
            Arc::new(CacheStore::fresh(temp.path().join("cache.json"))),
            PipelineConfig::default(),
        )
        .with_retry(RetryPolicy::new(2).immediate(), RetryPolicy::new(3).immediate());

        let (analyses, failed, _) = pipeline
            .run_file_level(&context(&["ok.py", "bad.py"]))
            .await
            .unwrap();

        assert_eq!(analyses.len(), 1);
        assert_eq!(failed, vec!["bad.py".to_string()]);
        // 1 + (3 retries + 1) attempts
        assert_eq!(client.calls(), 5);
        assert_eq!(pipeline.metrics().summary().failed_units, 1);
    }
}

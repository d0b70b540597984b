//! Multi-Stage Analysis Pipeline
//!
//! ```text
//! inventory → [Stage 0: pre-filter] → structure → Stage 1: files
//!           → Stage 2: components → Stage 3: global → assembly
//! ```
//!
//! ## Guarantees
//!
//! - Stage boundaries are full barriers
//! - Stages 1-3 reuse cached units without calling the service
//! - Every freshly finished unit is flushed to the cache before it returns
//! - A failed unit is logged and dropped; its siblings keep going
//!
//! The executor is the only throttle: at most `concurrency` service calls are
//! in flight within a stage.

pub mod agent;
pub mod cache;
pub mod context;
pub mod document;
pub mod executor;
pub mod prompts;

mod component_level;
mod file_level;
mod global_level;
mod prefilter;
mod structure;

pub use agent::{AgentOutcome, AgentState, Conversation, ExtractionAgent};
pub use cache::{CacheRecord, CacheStats, CacheStore, default_cache_path};
pub use context::{FailedUnits, PipelineContext};
pub use executor::run_bounded;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, instrument};

use crate::ai::{MetricsCollector, MetricsSummary, RetryPolicy, SharedClient, SharedMetrics};
use crate::analyzer::{ScannedFile, SharedExtractor, TreeSitterExtractor};
use crate::config::PipelineConfig;
use crate::types::{FeatureMapError, Result};

/// Fixed stage order of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PipelineStage {
    Prefilter = 0,
    Structure = 1,
    FileLevel = 2,
    ComponentLevel = 3,
    Global = 4,
    Assembly = 5,
}

impl PipelineStage {
    pub fn as_u8(&self) -> u8 {
        *self as u8
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Prefilter => "Stage 0: AI File Pre-filtering",
            Self::Structure => "Analyzing File Structure",
            Self::FileLevel => "Stage 1: Micro Analysis (File Level)",
            Self::ComponentLevel => "Stage 2: Macro Analysis (Component Level)",
            Self::Global => "Stage 3: Global Architecture Mapping",
            Self::Assembly => "Final Assembly",
        }
    }

    /// Stage-level failure that aborts the run
    pub fn error(&self, message: impl Into<String>) -> FeatureMapError {
        FeatureMapError::pipeline(self.as_u8(), self.name(), message)
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Outcome of a completed run
#[derive(Debug, Clone)]
pub struct PipelineResult {
    pub document: String,
    pub context: PipelineContext,
    pub metrics: MetricsSummary,
}

impl PipelineResult {
    pub fn is_partial(&self) -> bool {
        self.context.is_partial()
    }
}

/// Orchestrates the stages over one analyzed root.
pub struct FeatureMapPipeline {
    root: PathBuf,
    client: SharedClient,
    cache: Arc<CacheStore>,
    extractor: SharedExtractor,
    config: PipelineConfig,
    prefilter: bool,
    prefilter_retry: RetryPolicy,
    extraction_retry: RetryPolicy,
    metrics: SharedMetrics,
}

impl FeatureMapPipeline {
    pub fn new(
        root: impl AsRef<Path>,
        client: SharedClient,
        cache: Arc<CacheStore>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            client,
            cache,
            extractor: Arc::new(TreeSitterExtractor::new()),
            prefilter_retry: RetryPolicy::prefilter(&config),
            extraction_retry: RetryPolicy::extraction(&config),
            config,
            prefilter: false,
            metrics: Arc::new(MetricsCollector::new()),
        }
    }

    /// Run Stage 0 before structural extraction
    pub fn with_prefilter(mut self, enabled: bool) -> Self {
        self.prefilter = enabled;
        self
    }

    pub fn with_extractor(mut self, extractor: SharedExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_retry(mut self, prefilter: RetryPolicy, extraction: RetryPolicy) -> Self {
        self.prefilter_retry = prefilter;
        self.extraction_retry = extraction;
        self
    }

    pub fn metrics(&self) -> &SharedMetrics {
        &self.metrics
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Run every stage over `files` and assemble the document.
    #[instrument(skip(self, files), fields(root = %self.root.display(), files = files.len()))]
    pub async fn run(&self, files: Vec<ScannedFile>) -> Result<PipelineResult> {
        info!(
            "Pipeline: starting ({} files, concurrency={}, model={})",
            files.len(),
            self.config.concurrency,
            self.client.model()
        );

        let mut ctx = PipelineContext {
            files: if self.prefilter {
                self.run_prefilter(files).await?
            } else {
                files
            },
            ..Default::default()
        };

        ctx.footprints = self.run_structure(&ctx.files).await?;

        let (analyses, failed, exhausted) = self.run_file_level(&ctx).await?;
        ctx.file_analyses = analyses;
        ctx.failures.files = failed;
        ctx.failures.exhausted = exhausted;

        let (summaries, failed) = self.run_component_level(&ctx).await?;
        ctx.component_summaries = summaries;
        ctx.failures.components = failed;

        ctx.global_architecture = Some(self.run_global(&ctx).await?);

        let document = document::render(&ctx);
        let metrics = self.metrics.summary();
        info!("Pipeline: complete. {}", metrics.display());

        Ok(PipelineResult {
            document,
            context: ctx,
            metrics,
        })
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Scripted reasoning client shared by the stage tests.

    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;

    use crate::ai::{
        ContentBlock, ModelReply, ModelRequest, ModelResponse, ReasoningClient, TokenUsage,
    };
    use crate::types::{ErrorCategory, LlmError, Result};

    /// Answers by looking at the system prompt; records every user prompt.
    pub struct ScriptedClient {
        pub calls: AtomicU32,
        pub prompts: Mutex<Vec<String>>,
        /// Requests whose prompt contains one of these fail as rate limited
        pub fail_on: Vec<String>,
        /// Stage 0 answer
        pub keep: Vec<String>,
        /// Answer every request that declares tools with a tool call
        pub always_tool: bool,
    }

    impl ScriptedClient {
        pub fn new() -> Self {
            Self {
                calls: AtomicU32::new(0),
                prompts: Mutex::new(Vec::new()),
                fail_on: Vec::new(),
                keep: Vec::new(),
                always_tool: false,
            }
        }

        pub fn always_calling_tools(mut self) -> Self {
            self.always_tool = true;
            self
        }

        pub fn failing_on(mut self, needle: &str) -> Self {
            self.fail_on.push(needle.to_string());
            self
        }

        pub fn keeping(mut self, paths: &[&str]) -> Self {
            self.keep = paths.iter().map(|p| p.to_string()).collect();
            self
        }

        pub fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn prompts_containing(&self, needle: &str) -> usize {
            self.prompts
                .lock()
                .unwrap()
                .iter()
                .filter(|p| p.contains(needle))
                .count()
        }
    }

    fn first_text(request: &ModelRequest) -> String {
        request
            .messages
            .first()
            .and_then(|m| {
                m.content.iter().find_map(|b| match b {
                    ContentBlock::Text { text } => Some(text.clone()),
                    _ => None,
                })
            })
            .unwrap_or_default()
    }

    #[async_trait]
    impl ReasoningClient for ScriptedClient {
        async fn complete(&self, request: &ModelRequest) -> Result<ModelResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let prompt = first_text(request);
            self.prompts.lock().unwrap().push(prompt.clone());

            if self.fail_on.iter().any(|needle| prompt.contains(needle)) {
                return Err(LlmError::new(ErrorCategory::RateLimit, "429 Too Many Requests").into());
            }

            if self.always_tool && !request.tools.is_empty() {
                let call = ContentBlock::ToolUse {
                    id: format!("call_{}", request.messages.len()),
                    name: request.tools[0].name.clone(),
                    input: serde_json::json!({ "reason": "need source" }),
                };
                return Ok(ModelResponse {
                    reply: ModelReply::from_blocks(vec![call]),
                    usage: TokenUsage::new(10, 5),
                });
            }

            let system = request.system.clone().unwrap_or_default();
            let text = if system.contains("JSON array") {
                serde_json::to_string(&self.keep)?
            } else if system.contains("extracting product features") {
                let path = prompt
                    .split("\"path\": \"")
                    .nth(1)
                    .and_then(|rest| rest.split('"').next())
                    .unwrap_or("?");
                format!("F_{}", path)
            } else if system.contains("Lead Software Architect") {
                let dir = prompt
                    .split("codebase: `")
                    .nth(1)
                    .and_then(|rest| rest.split('`').next())
                    .unwrap_or("?");
                format!("S_{}", dir)
            } else {
                "GLOBAL OVERVIEW".to_string()
            };

            Ok(ModelResponse::text(text).with_usage(TokenUsage::new(10, 5)))
        }

        fn name(&self) -> &str {
            "scripted"
        }

        fn model(&self) -> &str {
            "scripted-model"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::ScriptedClient;
    use super::*;
    use crate::analyzer::FileScanner;
    use crate::constants::pipeline::AGENT_EXHAUSTED_SENTINEL;
    use crate::types::FileAnalysis;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn fixture() -> TempDir {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "src/a.js", "export function a() {}\n");
        write(temp.path(), "src/b.js", "export function b() {}\n");
        write(temp.path(), "lib/c.py", "def c():\n    pass\n");
        temp
    }

    fn pipeline(root: &Path, client: Arc<ScriptedClient>, cache: Arc<CacheStore>) -> FeatureMapPipeline {
        let retry = RetryPolicy::new(3).immediate();
        FeatureMapPipeline::new(root, client, cache, PipelineConfig::default())
            .with_retry(retry.clone().allow_malformed(), retry)
    }

    fn scan(root: &Path) -> Vec<ScannedFile> {
        FileScanner::new(root).unwrap().scan().unwrap()
    }

    #[tokio::test]
    async fn test_end_to_end_with_seeded_cache() {
        let project = fixture();
        let state = TempDir::new().unwrap();
        let cache_path = state.path().join("cache.json");

        let seeded = CacheStore::open(&cache_path);
        seeded
            .record_file_analysis(FileAnalysis::new("src/a.js", "F_cached_a"))
            .await
            .unwrap();

        let client = Arc::new(ScriptedClient::new());
        let cache = Arc::new(CacheStore::open(&cache_path));
        let result = pipeline(project.path(), client.clone(), cache)
            .run(scan(project.path()))
            .await
            .unwrap();

        // 2 file calls, 2 component calls, 1 global call
        assert_eq!(client.prompts_containing("Structural Data:"), 2);
        assert_eq!(client.prompts_containing("File Summaries:"), 2);
        assert_eq!(client.prompts_containing("Component Summaries:"), 1);
        assert_eq!(client.calls(), 5);

        let doc = &result.document;
        assert_eq!(doc.matches("#### `").count(), 3);
        assert_eq!(doc.matches("### Directory: `").count(), 2);
        assert!(doc.contains("#### `src/a.js`\nF_cached_a"));
        assert!(doc.contains("#### `lib/c.py`\nF_lib/c.py"));
        assert!(doc.contains("### Directory: `src`\nS_src"));
        assert!(!result.is_partial());
        assert_eq!(result.metrics.cache_hits, 1);
    }

    #[tokio::test]
    async fn test_second_run_is_idempotent_and_free() {
        let project = fixture();
        let state = TempDir::new().unwrap();
        let cache_path = state.path().join("cache.json");

        let first_client = Arc::new(ScriptedClient::new());
        let first = pipeline(
            project.path(),
            first_client.clone(),
            Arc::new(CacheStore::open(&cache_path)),
        )
        .run(scan(project.path()))
        .await
        .unwrap();
        assert_eq!(first_client.calls(), 3 + 2 + 1);

        let second_client = Arc::new(ScriptedClient::new());
        let second = pipeline(
            project.path(),
            second_client.clone(),
            Arc::new(CacheStore::open(&cache_path)),
        )
        .run(scan(project.path()))
        .await
        .unwrap();

        assert_eq!(second_client.calls(), 0);
        assert_eq!(
            first.context.global_architecture,
            second.context.global_architecture
        );
        assert_eq!(first.document, second.document);
    }

    #[tokio::test]
    async fn test_exhausted_files_are_reused_on_rerun() {
        let project = fixture();
        let state = TempDir::new().unwrap();
        let cache_path = state.path().join("cache.json");

        let first_client = Arc::new(ScriptedClient::new().always_calling_tools());
        let first = pipeline(
            project.path(),
            first_client.clone(),
            Arc::new(CacheStore::open(&cache_path)),
        )
        .run(scan(project.path()))
        .await
        .unwrap();
        // 3 files x 5 turns, 2 components, 1 global
        assert_eq!(first_client.calls(), 15 + 2 + 1);
        assert_eq!(first.context.failures.exhausted.len(), 3);
        assert!(!first.is_partial());

        let cached = CacheStore::open(&cache_path).snapshot().await;
        assert_eq!(
            cached.file_analyses["lib/c.py"].features,
            AGENT_EXHAUSTED_SENTINEL
        );

        let second_client = Arc::new(ScriptedClient::new().always_calling_tools());
        let second = pipeline(
            project.path(),
            second_client.clone(),
            Arc::new(CacheStore::open(&cache_path)),
        )
        .run(scan(project.path()))
        .await
        .unwrap();

        assert_eq!(second_client.calls(), 0);
        assert_eq!(second.context.failures.exhausted, first.context.failures.exhausted);
        assert_eq!(first.document, second.document);
    }

    #[tokio::test]
    async fn test_component_stage_sees_every_file_outcome() {
        let project = fixture();
        let state = TempDir::new().unwrap();
        let client = Arc::new(ScriptedClient::new());

        pipeline(
            project.path(),
            client.clone(),
            Arc::new(CacheStore::open(state.path().join("cache.json"))),
        )
        .run(scan(project.path()))
        .await
        .unwrap();

        let prompts = client.prompts.lock().unwrap().clone();
        let src_prompt = prompts
            .iter()
            .find(|p| p.contains("codebase: `src`"))
            .unwrap();
        assert!(src_prompt.contains("### File: src/a.js\nF_src/a.js"));
        assert!(src_prompt.contains("### File: src/b.js\nF_src/b.js"));
    }

    #[tokio::test]
    async fn test_failed_file_is_excluded_and_run_continues() {
        let project = fixture();
        let state = TempDir::new().unwrap();
        let cache_path = state.path().join("cache.json");
        let client = Arc::new(ScriptedClient::new().failing_on("\"path\": \"src/b.js\""));

        let result = pipeline(
            project.path(),
            client.clone(),
            Arc::new(CacheStore::open(&cache_path)),
        )
        .run(scan(project.path()))
        .await
        .unwrap();

        assert_eq!(result.context.failures.files, vec!["src/b.js".to_string()]);
        assert_eq!(result.context.file_analyses.len(), 2);
        assert!(result.is_partial());
        assert!(result.document.contains("> - Files: `src/b.js`"));

        // Every directory was still summarized, so the global text is cached
        let cached = CacheStore::open(&cache_path).snapshot().await;
        assert!(cached.global_architecture.is_some());
        assert!(!cached.file_analyses.contains_key("src/b.js"));
        assert!(cached.file_analyses.contains_key("src/a.js"));
    }

    #[tokio::test]
    async fn test_failed_component_keeps_global_uncached() {
        let project = fixture();
        let state = TempDir::new().unwrap();
        let cache_path = state.path().join("cache.json");
        let client = Arc::new(ScriptedClient::new().failing_on("codebase: `lib`"));

        let result = pipeline(
            project.path(),
            client.clone(),
            Arc::new(CacheStore::open(&cache_path)),
        )
        .run(scan(project.path()))
        .await
        .unwrap();

        assert_eq!(result.context.failures.components, vec!["lib".to_string()]);
        assert!(result.document.contains("> - Directories: `lib`"));
        assert_eq!(client.prompts_containing("could not be summarized"), 1);

        let cached = CacheStore::open(&cache_path).snapshot().await;
        assert!(cached.global_architecture.is_none());
        assert!(cached.component_summaries.contains_key("src"));
    }

    #[tokio::test]
    async fn test_every_file_failing_is_fatal() {
        let project = fixture();
        let state = TempDir::new().unwrap();
        let client = Arc::new(ScriptedClient::new().failing_on("Structural Data:"));

        let err = pipeline(
            project.path(),
            client,
            Arc::new(CacheStore::open(state.path().join("cache.json"))),
        )
        .run(scan(project.path()))
        .await
        .unwrap_err();

        assert!(err.to_string().contains("Stage 1"));
    }

    #[tokio::test]
    async fn test_empty_inventory_is_fatal() {
        let project = TempDir::new().unwrap();
        let state = TempDir::new().unwrap();
        let client = Arc::new(ScriptedClient::new());

        let result = pipeline(
            project.path(),
            client.clone(),
            Arc::new(CacheStore::open(state.path().join("cache.json"))),
        )
        .run(Vec::new())
        .await;

        assert!(result.is_err());
        assert_eq!(client.calls(), 0);
    }

    #[tokio::test]
    async fn test_prefilter_narrows_inventory() {
        let project = fixture();
        let state = TempDir::new().unwrap();
        let client = Arc::new(ScriptedClient::new().keeping(&["src/a.js", "./lib/c.py", "nope.rs"]));

        let result = pipeline(
            project.path(),
            client.clone(),
            Arc::new(CacheStore::open(state.path().join("cache.json"))),
        )
        .with_prefilter(true)
        .run(scan(project.path()))
        .await
        .unwrap();

        let kept: Vec<&str> = result
            .context
            .files
            .iter()
            .map(|f| f.relative.as_str())
            .collect();
        assert_eq!(kept, vec!["lib/c.py", "src/a.js"]);
        assert_eq!(result.context.file_analyses.len(), 2);
    }

    #[test]
    fn test_stage_order() {
        assert!(PipelineStage::Prefilter < PipelineStage::FileLevel);
        assert!(PipelineStage::ComponentLevel < PipelineStage::Global);
        assert_eq!(PipelineStage::Global.as_u8(), 4);
        assert!(PipelineStage::FileLevel.to_string().contains("Stage 1"));
    }
}

//! Resumable Cache Store
//!
//! One JSON record of every unit a previous run finished, keyed per stage:
//!
//! - `fileAnalyses`: file path → Stage 1 analysis
//! - `componentSummaries`: directory → Stage 2 summary
//! - `globalArchitecture`: the Stage 3 text, or `null`
//!
//! A present key means the unit is done. Every newly finished unit is merged
//! and the whole record rewritten before the unit returns, so an interrupted
//! run loses at most the units that were in flight.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::constants::cache as cache_constants;
use crate::types::{FeatureMapError, FileAnalysis, Result};

/// Persisted record. Field names are camelCase for compatibility with
/// existing cache files.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheRecord {
    /// Absent in files written before versioning; read as 0
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub file_analyses: BTreeMap<String, FileAnalysis>,
    #[serde(default)]
    pub component_summaries: BTreeMap<String, String>,
    #[serde(default)]
    pub global_architecture: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl CacheRecord {
    pub fn new() -> Self {
        Self {
            version: cache_constants::RECORD_VERSION,
            ..Default::default()
        }
    }

    fn is_supported_version(&self) -> bool {
        self.version == 0 || self.version == cache_constants::RECORD_VERSION
    }

    pub fn is_empty(&self) -> bool {
        self.file_analyses.is_empty()
            && self.component_summaries.is_empty()
            && self.global_architecture.is_none()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            file_analyses: self.file_analyses.len(),
            component_summaries: self.component_summaries.len(),
            has_global_architecture: self.global_architecture.is_some(),
            updated_at: self.updated_at,
        }
    }
}

/// Counts shown by `featuremap cache show`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    pub file_analyses: usize,
    pub component_summaries: usize,
    pub has_global_architecture: bool,
    pub updated_at: Option<DateTime<Utc>>,
}

/// File-backed cache shared by every unit of a run.
///
/// The record lives behind one async mutex; [`CacheStore::record`] holds it
/// across the merge and the write so flushes never interleave.
pub struct CacheStore {
    path: PathBuf,
    record: Mutex<CacheRecord>,
}

impl CacheStore {
    /// Load the record at `path`. A missing file starts empty; an unreadable
    /// or unparseable one is logged and also starts empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let record = load_record(&path);
        Self {
            path,
            record: Mutex::new(record),
        }
    }

    /// Start from an empty record, ignoring whatever is on disk. The file is
    /// overwritten on the first flush.
    pub fn fresh(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            record: Mutex::new(CacheRecord::new()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn file_analysis(&self, path: &str) -> Option<FileAnalysis> {
        self.record.lock().await.file_analyses.get(path).cloned()
    }

    pub async fn component_summary(&self, dir: &str) -> Option<String> {
        self.record.lock().await.component_summaries.get(dir).cloned()
    }

    pub async fn global_architecture(&self) -> Option<String> {
        self.record.lock().await.global_architecture.clone()
    }

    pub async fn snapshot(&self) -> CacheRecord {
        self.record.lock().await.clone()
    }

    /// Merge a change into the record and persist it before returning.
    pub async fn record<F>(&self, update: F) -> Result<()>
    where
        F: FnOnce(&mut CacheRecord),
    {
        let mut record = self.record.lock().await;
        update(&mut record);
        record.version = cache_constants::RECORD_VERSION;
        record.updated_at = Some(Utc::now());
        write_atomic(&self.path, &record).await
    }

    pub async fn record_file_analysis(&self, analysis: FileAnalysis) -> Result<()> {
        self.record(|r| {
            r.file_analyses.insert(analysis.path.clone(), analysis);
        })
        .await
    }

    pub async fn record_component_summary(&self, dir: &str, summary: &str) -> Result<()> {
        self.record(|r| {
            r.component_summaries
                .insert(dir.to_string(), summary.to_string());
        })
        .await
    }

    pub async fn record_global_architecture(&self, text: &str) -> Result<()> {
        self.record(|r| r.global_architecture = Some(text.to_string()))
            .await
    }

    /// Delete the cache file at `path`. Returns whether a file was removed.
    pub fn remove(path: &Path) -> Result<bool> {
        match std::fs::remove_file(path) {
            Ok(()) => {
                info!("Removed cache {}", path.display());
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(FeatureMapError::Cache(format!(
                "Failed to remove {}: {}",
                path.display(),
                e
            ))),
        }
    }
}

fn load_record(path: &Path) -> CacheRecord {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("No cache at {}, starting fresh", path.display());
            return CacheRecord::new();
        }
        Err(e) => {
            warn!("Cannot read cache {}: {}. Starting fresh.", path.display(), e);
            return CacheRecord::new();
        }
    };

    match serde_json::from_str::<CacheRecord>(&content) {
        Ok(record) if record.is_supported_version() => {
            info!(
                files = record.file_analyses.len(),
                components = record.component_summaries.len(),
                "Loaded existing cache from {}",
                path.display()
            );
            record
        }
        Ok(record) => {
            warn!(
                "Cache {} has unknown version {}. Starting fresh.",
                path.display(),
                record.version
            );
            CacheRecord::new()
        }
        Err(e) => {
            warn!("Cache {} is unparseable: {}. Starting fresh.", path.display(), e);
            CacheRecord::new()
        }
    }
}

/// Write to a sibling temp file, then rename over the target.
async fn write_atomic(path: &Path, record: &CacheRecord) -> Result<()> {
    let json = serde_json::to_string_pretty(record)?;

    let mut tmp_name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| OsString::from("cache.json"));
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    tokio::fs::write(&tmp_path, json).await.map_err(|e| {
        FeatureMapError::Cache(format!("Failed to write {}: {}", tmp_path.display(), e))
    })?;
    tokio::fs::rename(&tmp_path, path).await.map_err(|e| {
        FeatureMapError::Cache(format!("Failed to replace {}: {}", path.display(), e))
    })?;
    Ok(())
}

/// `.extract-cache-<folder>.json` inside `dir`
pub fn default_cache_path(dir: &Path, folder: &str) -> PathBuf {
    dir.join(format!("{}{}.json", cache_constants::FILE_PREFIX, folder))
}

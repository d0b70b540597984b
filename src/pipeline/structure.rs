//! Structural extraction
//!
//! Runs the tree-sitter extractor over the inventory on the blocking pool.
//! Files without a usable footprint get an empty one carrying a note that
//! tells the agent to read the source.

use tracing::{debug, info, instrument};

use super::{FeatureMapPipeline, PipelineStage};
use crate::analyzer::ScannedFile;
use crate::types::{Result, StructuralFootprint};

impl FeatureMapPipeline {
    #[instrument(skip_all, fields(stage = PipelineStage::Structure.as_u8(), files = files.len()))]
    pub(super) async fn run_structure(
        &self,
        files: &[ScannedFile],
    ) -> Result<Vec<StructuralFootprint>> {
        let stage = PipelineStage::Structure;
        if files.is_empty() {
            return Err(stage.error("No valid structural data found."));
        }

        let extractor = self.extractor.clone();
        let inventory = files.to_vec();
        let footprints = tokio::task::spawn_blocking(move || {
            inventory
                .iter()
                .map(|file| match extractor.extract(&file.path, &file.relative) {
                    Some(footprint) if footprint.has_structure() => footprint,
                    _ => {
                        debug!(file = %file.relative, "No structural footprint");
                        StructuralFootprint::unavailable(&file.relative)
                    }
                })
                .collect::<Vec<_>>()
        })
        .await
        .map_err(|e| stage.error(format!("extraction task failed: {}", e)))?;

        let parsed = footprints.iter().filter(|f| f.note.is_none()).count();
        info!(
            "{}: {} files ({} with syntax footprint)",
            stage,
            footprints.len(),
            parsed
        );
        Ok(footprints)
    }
}

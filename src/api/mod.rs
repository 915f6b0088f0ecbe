//! High-level, ergonomic library API: run the full analysis pipeline or the
//! imagery info report against any `ImageService`. Prefer these entrypoints
//! over the low-level pipeline modules when embedding soilscan.
//!
//! The pipeline is strictly sequential: retrieve, mask, composite, index,
//! then optionally statistics and export. Each stage's output is the next
//! stage's sole input, and a run fails out of retrieval (no scenes) or
//! export (job failure) with everything earlier already logged.
use tracing::info;

use crate::core::params::AnalysisParams;
use crate::core::pipeline::composite::{build_composite, Reducer};
use crate::core::pipeline::expr::ImageExpr;
use crate::core::pipeline::mask::apply_cloud_mask;
use crate::core::pipeline::retrieval::{
    search_cloud_probability, search_sentinel1, search_sentinel2, SceneCollection,
};
use crate::core::pipeline::soil::{bare_soil_mask, calculate_indices};
use crate::core::pipeline::stats::{compute_statistics, SoilStatistics};
use crate::error::Result;
use crate::service::export::{start_exports, wait_for_jobs, JobResult, PollOptions};
use crate::service::models::ExportJob;
use crate::service::ImageService;

/// NDVI ceiling below which a pixel can count as bare soil.
const BARE_SOIL_NDVI_MAX: f64 = 0.3;
/// BSI floor above which a pixel can count as bare soil.
const BARE_SOIL_BSI_MIN: f64 = 100.0;

/// Which optional stages a run executes.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Compute and report region statistics
    pub stats: bool,
    /// Submit export jobs
    pub export: bool,
    /// Block until submitted exports reach a terminal state
    pub wait: bool,
    pub poll: PollOptions,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            stats: true,
            export: false,
            wait: false,
            poll: PollOptions::default(),
        }
    }
}

/// Everything a completed run produced.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub scene_count: usize,
    /// Scenes dropped for lack of a cloud-probability match
    pub dropped_scenes: usize,
    /// The composite with index bands and the bare-soil band appended
    pub image: ImageExpr,
    pub statistics: Option<SoilStatistics>,
    pub export_jobs: Vec<ExportJob>,
    /// Terminal outcomes; empty unless `wait` was set
    pub export_results: Vec<JobResult>,
}

impl PipelineReport {
    /// Exports that reached a non-success terminal state (or timed out).
    pub fn export_failures(&self) -> usize {
        self.export_results
            .iter()
            .filter(|r| !r.succeeded())
            .count()
    }
}

/// Imagery availability for the region, without any processing.
#[derive(Debug, Clone)]
pub struct CollectionInfo {
    pub sentinel2: SceneCollection,
    pub sentinel1: SceneCollection,
}

/// The `--info` path: catalog counts only. Never touches masking,
/// compositing, statistics, or export.
pub fn collection_info(
    params: &AnalysisParams,
    service: &dyn ImageService,
) -> Result<CollectionInfo> {
    let sentinel2 = search_sentinel2(service, params)?;
    let sentinel1 = search_sentinel1(service, params, "DESCENDING")?;
    Ok(CollectionInfo {
        sentinel2,
        sentinel1,
    })
}

/// Run the full processing pipeline.
pub fn run_pipeline(
    params: &AnalysisParams,
    service: &dyn ImageService,
    options: &PipelineOptions,
) -> Result<PipelineReport> {
    let region = params.region();

    info!("[1/5] retrieving satellite imagery");
    let scenes = search_sentinel2(service, params)?;
    scenes.require_scenes()?;
    let cloud_probability = search_cloud_probability(service, params)?;

    info!("[2/5] applying cloud masking");
    let masked = apply_cloud_mask(&scenes, &cloud_probability, params);

    info!("[3/5] creating temporal composite");
    let composite = build_composite(&masked, &region, Reducer::from_params(params))?;

    info!("[4/5] calculating soil indices");
    let augmented = calculate_indices(composite, &params.indices)?;
    let image = bare_soil_mask(augmented, BARE_SOIL_NDVI_MAX, BARE_SOIL_BSI_MIN)?;

    let statistics = if options.stats {
        info!("[5/5] calculating soil statistics");
        Some(compute_statistics(
            service,
            &image,
            &region,
            &params.indices,
            params.stats_scale_m,
            params.export.max_pixels,
        )?)
    } else {
        None
    };

    let mut export_jobs = Vec::new();
    let mut export_results = Vec::new();
    if options.export {
        info!("submitting export jobs");
        export_jobs = start_exports(service, &image, params)?;
        if options.wait {
            info!(jobs = export_jobs.len(), "waiting for exports to complete");
            export_results = wait_for_jobs(service, export_jobs.clone(), &options.poll)?;
        }
    }

    Ok(PipelineReport {
        scene_count: scenes.count(),
        dropped_scenes: masked.dropped,
        image,
        statistics,
        export_jobs,
        export_results,
    })
}

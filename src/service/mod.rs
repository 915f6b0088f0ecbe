//! Remote service boundary.
//!
//! All imagery retrieval, cloud classification, compositing reduction, and
//! export execution happen on a managed geoprocessing service; the pipeline
//! only ships expression graphs across this boundary. `ImageService` is the
//! seam: the CLI talks to `RestService`, tests substitute their own.
pub mod auth;
pub mod client;
pub mod export;
pub mod models;

pub use auth::Credentials;
pub use client::RestService;
pub use export::{JobOutcome, JobResult, PollOptions};

use crate::error::Result;
use models::{BandStats, ExportJob, ExportRequest, JobStatus, SceneMeta, SceneQuery, StatsRequest};

/// Operations the pipeline needs from the geoprocessing service.
///
/// Every call blocks until the service answers; the only asynchronous
/// element is export, which returns a job handle for later polling.
pub trait ImageService {
    /// Catalog search for scenes matching the query filters.
    fn search_scenes(&self, query: &SceneQuery) -> Result<Vec<SceneMeta>>;

    /// Force evaluation of one band of an expression graph, reduced over a
    /// region (mean/min/max/stdDev).
    fn compute_region_stats(&self, request: &StatsRequest) -> Result<BandStats>;

    /// Submit an export job; returns immediately with a pollable handle.
    fn start_export(&self, request: &ExportRequest) -> Result<ExportJob>;

    /// Current status of a previously submitted job.
    fn poll_job(&self, name: &str) -> Result<JobStatus>;
}

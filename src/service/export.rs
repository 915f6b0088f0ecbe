//! Export job construction and polling.
//!
//! Builds one GeoTIFF export request per product (visualizations as 8-bit
//! renders, index stack as f32, spectral stack as u16) and polls submitted
//! jobs to a terminal state under a hard deadline with backoff between
//! polls. A failed job never stops polling of the others.
use std::time::{Duration, Instant};

use tracing::{info, warn};

use super::models::{ExportJob, ExportRequest};
use super::ImageService;
use crate::core::params::AnalysisParams;
use crate::core::pipeline::expr::ImageExpr;
use crate::error::{Error, Result};
use crate::types::{Band, ExportProduct, JobState, PixelType, Region};

/// Reflectance stretch for true-color and SWIR visualization renders.
const VIS_MAX: f64 = 3000.0;
/// Vegetation is bright in NIR; the false-color render stretches further.
const VIS_MAX_AGRICULTURE: f64 = 5000.0;

/// Build the export request for one product over the augmented composite.
pub fn build_export_request(
    image: &ImageExpr,
    product: ExportProduct,
    params: &AnalysisParams,
) -> Result<ExportRequest> {
    let (expression, pixel_type) = match product {
        ExportProduct::Rgb => (
            image.clone().visualize(Band::rgb(), 0.0, VIS_MAX),
            PixelType::U8,
        ),
        ExportProduct::Agriculture => (
            image
                .clone()
                .visualize(Band::agriculture(), 0.0, VIS_MAX_AGRICULTURE),
            PixelType::U8,
        ),
        ExportProduct::SoilVis => (
            image
                .clone()
                .visualize(Band::soil_visualization(), 0.0, VIS_MAX),
            PixelType::U8,
        ),
        ExportProduct::Indices => {
            let bands: Vec<&str> = params.indices.iter().map(|i| i.band_name()).collect();
            if let Some(known) = image.band_names() {
                for band in &bands {
                    if !known.iter().any(|n| n == band) {
                        return Err(Error::MissingBand {
                            band: band.to_string(),
                        });
                    }
                }
            }
            (image.clone().select_names(&bands), PixelType::F32)
        }
        ExportProduct::Spectral => (
            image.clone().select(Band::full_spectral()),
            PixelType::U16,
        ),
    };

    Ok(ExportRequest {
        description: format!("{}_{}", params.export.file_prefix, product),
        expression,
        region: params.region(),
        scale_m: params.export.scale_m,
        crs: params.export.crs.clone(),
        pixel_type,
        destination: params.export.destination.clone(),
        max_pixels: params.export.max_pixels,
        file_format: "GeoTIFF".to_string(),
        cloud_optimized: true,
    })
}

/// Rough output size in MB, assuming LZW roughly halves the raw raster.
pub fn estimate_size_mb(region: &Region, scale_m: u32, bands: usize, pixel_type: PixelType) -> f64 {
    let pixels = region.area_m2() / (scale_m as f64 * scale_m as f64);
    let raw = pixels * bands as f64 * pixel_type.bytes_per_pixel() as f64;
    raw * 0.5 / 1.0e6
}

/// Submit every configured product; returns the job handles in product order.
pub fn start_exports(
    service: &dyn ImageService,
    image: &ImageExpr,
    params: &AnalysisParams,
) -> Result<Vec<ExportJob>> {
    let mut jobs = Vec::with_capacity(params.export.products.len());
    for &product in &params.export.products {
        let request = build_export_request(image, product, params)?;
        let bands = request.expression.band_names().map(|b| b.len()).unwrap_or(1);
        info!(
            description = %request.description,
            estimated_mb = format!(
                "{:.1}",
                estimate_size_mb(&request.region, request.scale_m, bands, request.pixel_type)
            ),
            "submitting export"
        );
        jobs.push(service.start_export(&request)?);
    }
    Ok(jobs)
}

/// Polling schedule: fixed base interval with multiplicative backoff, capped
/// per-poll, under a hard overall deadline.
#[derive(Debug, Clone)]
pub struct PollOptions {
    pub initial_interval: Duration,
    pub backoff: f64,
    pub max_interval: Duration,
    pub deadline: Duration,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_secs(5),
            backoff: 1.5,
            max_interval: Duration::from_secs(60),
            deadline: Duration::from_secs(30 * 60),
        }
    }
}

/// Terminal outcome of one export job, from the caller's perspective.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Succeeded,
    Failed { message: String },
    Cancelled,
    /// Still not terminal when the deadline expired.
    TimedOut,
}

#[derive(Debug, Clone)]
pub struct JobResult {
    pub job: ExportJob,
    pub outcome: JobOutcome,
}

impl JobResult {
    pub fn succeeded(&self) -> bool {
        self.outcome == JobOutcome::Succeeded
    }
}

/// Poll all jobs until every one is terminal or the deadline expires.
///
/// Transport/service errors during polling abort the wait; individual job
/// failures are recorded and the remaining jobs keep being polled.
pub fn wait_for_jobs(
    service: &dyn ImageService,
    jobs: Vec<ExportJob>,
    options: &PollOptions,
) -> Result<Vec<JobResult>> {
    let started = Instant::now();
    let mut interval = options.initial_interval;
    let mut pending = jobs;
    let mut results = Vec::with_capacity(pending.len());

    while !pending.is_empty() {
        let mut still_pending = Vec::with_capacity(pending.len());
        for job in pending {
            let status = service.poll_job(&job.name)?;
            match status.state {
                JobState::Succeeded => {
                    info!(description = %job.description, "export completed");
                    results.push(JobResult {
                        job,
                        outcome: JobOutcome::Succeeded,
                    });
                }
                JobState::Failed => {
                    let message = status
                        .message
                        .unwrap_or_else(|| "no failure message".to_string());
                    warn!(description = %job.description, %message, "export failed");
                    results.push(JobResult {
                        job,
                        outcome: JobOutcome::Failed { message },
                    });
                }
                JobState::Cancelled => {
                    warn!(description = %job.description, "export cancelled");
                    results.push(JobResult {
                        job,
                        outcome: JobOutcome::Cancelled,
                    });
                }
                JobState::Pending | JobState::Running => still_pending.push(job),
            }
        }
        pending = still_pending;

        if pending.is_empty() {
            break;
        }
        if started.elapsed() >= options.deadline {
            for job in pending.drain(..) {
                warn!(description = %job.description, "deadline expired while polling");
                results.push(JobResult {
                    job,
                    outcome: JobOutcome::TimedOut,
                });
            }
            break;
        }
        std::thread::sleep(interval);
        interval = std::cmp::min(
            interval.mul_f64(options.backoff),
            options.max_interval,
        );
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SoilIndex;

    fn augmented_composite(params: &AnalysisParams) -> ImageExpr {
        let composite = ImageExpr::scene("c").select(Band::full_spectral());
        crate::core::pipeline::soil::calculate_indices(composite, &params.indices).unwrap()
    }

    #[test]
    fn products_pick_the_right_pixel_types() {
        let params = AnalysisParams::default();
        let image = augmented_composite(&params);

        let rgb = build_export_request(&image, ExportProduct::Rgb, &params).unwrap();
        assert_eq!(rgb.pixel_type, PixelType::U8);
        assert!(matches!(rgb.expression, ImageExpr::Visualize { .. }));
        assert_eq!(rgb.description, "soilscan_rgb");

        let indices = build_export_request(&image, ExportProduct::Indices, &params).unwrap();
        assert_eq!(indices.pixel_type, PixelType::F32);
        assert_eq!(
            indices.expression.band_names().unwrap().len(),
            params.indices.len()
        );

        let spectral = build_export_request(&image, ExportProduct::Spectral, &params).unwrap();
        assert_eq!(spectral.pixel_type, PixelType::U16);
        assert_eq!(spectral.expression.band_names().unwrap().len(), 10);
    }

    #[test]
    fn index_export_requires_the_index_bands() {
        let mut params = AnalysisParams::default();
        params.indices = vec![SoilIndex::Ndsi];
        let bare = ImageExpr::scene("c").select(Band::full_spectral());
        let err = build_export_request(&bare, ExportProduct::Indices, &params).unwrap_err();
        assert!(matches!(err, Error::MissingBand { .. }));
    }

    #[test]
    fn size_estimate_scales_with_resolution() {
        let region = Region::circle(0.0, 0.0, 5000);
        let at_10m = estimate_size_mb(&region, 10, 10, PixelType::U16);
        let at_20m = estimate_size_mb(&region, 20, 10, PixelType::U16);
        assert!((at_10m / at_20m - 4.0).abs() < 1e-9);
    }
}

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::{CompositeMethod, ExportDestination, ExportProduct, Region, SoilIndex};

/// Sentinel-2 Surface Reflectance (harmonized) catalog id.
pub const S2_COLLECTION: &str = "COPERNICUS/S2_SR_HARMONIZED";
/// s2cloudless per-scene cloud probability catalog id.
pub const S2_CLOUDLESS_COLLECTION: &str = "COPERNICUS/S2_CLOUD_PROBABILITY";
/// Sentinel-1 GRD catalog id (SAR backup for the info report).
pub const S1_COLLECTION: &str = "COPERNICUS/S1_GRD";

/// Immutable configuration for one analysis run.
///
/// Every stage receives this by reference; nothing is process-global.
/// Suitable for config files and CLI override merging.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisParams {
    /// Center latitude of the region of interest
    pub latitude: f64,
    /// Center longitude of the region of interest
    pub longitude: f64,
    /// Buffer radius around the center in meters
    pub buffer_m: u32,

    /// Analysis period start (inclusive)
    pub start_date: NaiveDate,
    /// Analysis period end (exclusive)
    pub end_date: NaiveDate,

    /// Pixels with cloud probability above this (0-100) are masked
    pub cloud_probability_threshold: u8,
    /// Scenes with cloud cover above this percentage are never retrieved
    pub max_scene_cloud_percent: f64,
    /// Morphological buffer applied to the cloud mask, in meters
    pub mask_buffer_m: u32,

    pub composite_method: CompositeMethod,
    /// Only used when `composite_method` is `Percentile`
    pub composite_percentile: u8,

    /// Indices appended to the composite, in request order
    pub indices: Vec<SoilIndex>,

    pub export: ExportParams,

    /// Scale in meters for region statistics reductions
    pub stats_scale_m: u32,
}

/// Export job settings shared by all products of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportParams {
    pub destination: ExportDestination,
    /// Filename prefix, e.g. "manabi_coastal" -> "manabi_coastal_rgb.tif"
    pub file_prefix: String,
    /// Output resolution in meters (10 is Sentinel-2 native for the 10m bands)
    pub scale_m: u32,
    /// Coordinate reference system of the output rasters
    pub crs: String,
    /// Hard ceiling on rasterized pixels per job
    pub max_pixels: u64,
    pub products: Vec<ExportProduct>,
}

impl Default for AnalysisParams {
    fn default() -> Self {
        Self {
            // Coastal Ecuador plantation site the tool was first built for.
            latitude: -1.841927,
            longitude: -80.741419,
            buffer_m: 5000,
            start_date: NaiveDate::from_ymd_opt(2025, 10, 22).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 1, 22).unwrap(),
            cloud_probability_threshold: 40,
            max_scene_cloud_percent: 70.0,
            mask_buffer_m: 60,
            composite_method: CompositeMethod::Median,
            composite_percentile: 50,
            indices: SoilIndex::default_selection().to_vec(),
            export: ExportParams::default(),
            stats_scale_m: 10,
        }
    }
}

impl Default for ExportParams {
    fn default() -> Self {
        Self {
            destination: ExportDestination::Drive {
                folder: "soilscan".to_string(),
            },
            file_prefix: "soilscan".to_string(),
            scale_m: 10,
            crs: "EPSG:4326".to_string(),
            max_pixels: 1_000_000_000,
            products: vec![
                ExportProduct::Rgb,
                ExportProduct::SoilVis,
                ExportProduct::Indices,
                ExportProduct::Spectral,
            ],
        }
    }
}

impl AnalysisParams {
    /// The region of interest these parameters describe.
    pub fn region(&self) -> Region {
        Region::circle(self.latitude, self.longitude, self.buffer_m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_params_are_coherent() {
        let params = AnalysisParams::default();
        assert!(params.start_date < params.end_date);
        assert!(params.cloud_probability_threshold <= 100);
        assert!(!params.indices.is_empty());
        assert_eq!(params.region(), Region::circle(-1.841927, -80.741419, 5000));
    }
}

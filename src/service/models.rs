//! Request/response models for the geoprocessing service.
//! These are the wire DTOs: catalog queries, scene metadata, statistics
//! reductions, and export job handles.
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::core::pipeline::expr::ImageExpr;
use crate::types::{ExportDestination, JobState, PixelType, Region};

/// One satellite pass's captured image over a region at a single date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneMeta {
    /// Catalog id, e.g. "20251114T153619_20251114T153751_T17MNP"
    pub id: String,
    pub acquired: NaiveDate,
    /// Scene-level cloud cover percentage; absent for SAR scenes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cloudy_pixel_percentage: Option<f64>,
}

/// Metadata predicate applied server-side during catalog search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "filter", rename_all = "camelCase")]
pub enum PropertyFilter {
    Eq { name: String, value: String },
    ListContains { name: String, value: String },
    Lt { name: String, value: f64 },
}

/// Catalog search request: scenes intersecting a region within a date range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneQuery {
    pub collection: String,
    pub region: Region,
    /// Inclusive start date
    pub start: NaiveDate,
    /// Exclusive end date
    pub end: NaiveDate,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<PropertyFilter>,
}

impl SceneQuery {
    pub fn new(collection: &str, region: Region, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            collection: collection.to_string(),
            region,
            start,
            end,
            filters: Vec::new(),
        }
    }

    pub fn filter(mut self, filter: PropertyFilter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Scene-level cloud ceiling on the standard catalog property.
    pub fn max_cloud_percent(self, ceiling: f64) -> Self {
        self.filter(PropertyFilter::Lt {
            name: "CLOUDY_PIXEL_PERCENTAGE".to_string(),
            value: ceiling,
        })
    }
}

/// Region reduction over one band of an expression graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsRequest {
    pub expression: ImageExpr,
    pub band: String,
    pub region: Region,
    pub scale_m: u32,
    pub max_pixels: u64,
}

/// Combined mean / minMax / stdDev reduction result for one band.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BandStats {
    pub mean: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub std_dev: Option<f64>,
}

/// Asynchronous rasterization/storage task submitted to the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRequest {
    /// Task description, doubles as the output file name.
    pub description: String,
    pub expression: ImageExpr,
    pub region: Region,
    pub scale_m: u32,
    pub crs: String,
    pub pixel_type: PixelType,
    pub destination: ExportDestination,
    pub max_pixels: u64,
    /// Always GeoTIFF; kept explicit on the wire.
    pub file_format: String,
    pub cloud_optimized: bool,
}

/// Handle for a submitted export job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportJob {
    /// Operation name used for polling, e.g. "operations/ABCD1234"
    pub name: String,
    pub description: String,
}

/// Polled status of a remote job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatus {
    pub state: JobState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Region;

    #[test]
    fn scene_query_carries_cloud_ceiling() {
        let q = SceneQuery::new(
            "COPERNICUS/S2_SR_HARMONIZED",
            Region::circle(-1.8, -80.7, 5000),
            NaiveDate::from_ymd_opt(2025, 10, 22).unwrap(),
            NaiveDate::from_ymd_opt(2026, 1, 22).unwrap(),
        )
        .max_cloud_percent(70.0);

        assert_eq!(
            q.filters,
            vec![PropertyFilter::Lt {
                name: "CLOUDY_PIXEL_PERCENTAGE".to_string(),
                value: 70.0
            }]
        );
        let json = serde_json::to_value(&q).unwrap();
        assert_eq!(json["start"], "2025-10-22");
        assert_eq!(json["filters"][0]["filter"], "lt");
    }
}

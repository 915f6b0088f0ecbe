//! Shared types and enums used across soilscan.
//! Includes the Sentinel-2 `Band` vocabulary, `Region` geometry,
//! `CompositeMethod`, `SoilIndex`, export products/destinations, and the
//! remote job lifecycle (`JobState`).
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Sentinel-2 spectral bands used by the pipeline.
///
/// Reflectance values are surface-reflectance DN on the usual 0..10000 scale.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Serialize, Deserialize)]
pub enum Band {
    B2,
    B3,
    B4,
    B5,
    B6,
    B7,
    B8,
    #[serde(rename = "B8A")]
    B8A,
    B11,
    B12,
}

impl Band {
    /// Role aliases used by index formulas.
    pub const BLUE: Band = Band::B2;
    pub const GREEN: Band = Band::B3;
    pub const RED: Band = Band::B4;
    pub const NIR: Band = Band::B8;
    pub const SWIR1: Band = Band::B11;
    pub const SWIR2: Band = Band::B12;

    pub fn name(self) -> &'static str {
        match self {
            Band::B2 => "B2",
            Band::B3 => "B3",
            Band::B4 => "B4",
            Band::B5 => "B5",
            Band::B6 => "B6",
            Band::B7 => "B7",
            Band::B8 => "B8",
            Band::B8A => "B8A",
            Band::B11 => "B11",
            Band::B12 => "B12",
        }
    }

    /// Native ground resolution in meters.
    pub fn resolution_m(self) -> u32 {
        match self {
            Band::B2 | Band::B3 | Band::B4 | Band::B8 => 10,
            _ => 20,
        }
    }

    /// Core bands for soil analysis (balance of resolution and information).
    pub fn soil_analysis() -> &'static [Band] {
        &[Band::B2, Band::B3, Band::B4, Band::B8, Band::B11, Band::B12]
    }

    /// All bands worth exporting in a full spectral stack.
    pub fn full_spectral() -> &'static [Band] {
        &[
            Band::B2,
            Band::B3,
            Band::B4,
            Band::B5,
            Band::B6,
            Band::B7,
            Band::B8,
            Band::B8A,
            Band::B11,
            Band::B12,
        ]
    }

    /// True-color visualization triplet.
    pub fn rgb() -> &'static [Band] {
        &[Band::B4, Band::B3, Band::B2]
    }

    /// False-color (vegetation) triplet.
    pub fn agriculture() -> &'static [Band] {
        &[Band::B8, Band::B4, Band::B3]
    }

    /// SWIR false-color triplet (soil/geology).
    pub fn soil_visualization() -> &'static [Band] {
        &[Band::B11, Band::B8, Band::B4]
    }
}

impl std::fmt::Display for Band {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Region of interest: the spatial extent over which imagery is queried.
///
/// Built once per run and passed around immutably; serialized into catalog
/// queries and export requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Region {
    /// Circle around a center point, buffered by `radius_m` meters.
    Circle { lat: f64, lon: f64, radius_m: u32 },
    /// Rectangle from a lon/lat bounding box.
    Rectangle {
        min_lon: f64,
        min_lat: f64,
        max_lon: f64,
        max_lat: f64,
    },
}

impl Region {
    pub fn circle(lat: f64, lon: f64, radius_m: u32) -> Self {
        Region::Circle { lat, lon, radius_m }
    }

    /// Approximate area in square meters, used for export size estimates.
    pub fn area_m2(&self) -> f64 {
        match self {
            Region::Circle { radius_m, .. } => {
                std::f64::consts::PI * (*radius_m as f64) * (*radius_m as f64)
            }
            Region::Rectangle {
                min_lon,
                min_lat,
                max_lon,
                max_lat,
            } => {
                // Equirectangular approximation, adequate for small ROIs.
                const M_PER_DEG: f64 = 111_320.0;
                let mid_lat = (min_lat + max_lat) / 2.0;
                let width = (max_lon - min_lon).abs() * M_PER_DEG * mid_lat.to_radians().cos();
                let height = (max_lat - min_lat).abs() * M_PER_DEG;
                width * height
            }
        }
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Region::Circle { lat, lon, radius_m } => {
                write!(f, "circle ({lat}, {lon}) r={radius_m}m")
            }
            Region::Rectangle {
                min_lon,
                min_lat,
                max_lon,
                max_lat,
            } => write!(f, "bbox [{min_lon}, {min_lat}, {max_lon}, {max_lat}]"),
        }
    }
}

/// Per-pixel temporal reduction applied when compositing a collection.
#[derive(
    Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum CompositeMethod {
    Median,
    Mean,
    Min,
    Max,
    Percentile,
}

impl std::fmt::Display for CompositeMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CompositeMethod::Median => "median",
            CompositeMethod::Mean => "mean",
            CompositeMethod::Min => "min",
            CompositeMethod::Max => "max",
            CompositeMethod::Percentile => "percentile",
        };
        write!(f, "{}", s)
    }
}

/// Soil indices the calculator can append to a composite.
#[derive(
    Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug, Serialize, Deserialize,
)]
pub enum SoilIndex {
    /// Normalized Difference Soil Index: (SWIR1 - NIR) / (SWIR1 + NIR)
    Ndsi,
    /// Bare Soil Index: ((SWIR1+Red) - (NIR+Blue)) / ((SWIR1+Red) + (NIR+Blue))
    Bi,
    /// BI rescaled linearly from [-1, 1] to [0, 200]
    Bsi,
    /// Soil Color Index: (Red - Green) / (Red + Green)
    Ci,
    /// Normalized Difference Moisture Index: (NIR - SWIR1) / (NIR + SWIR1)
    Ndmi,
    /// Clay Minerals Index: SWIR1 / SWIR2
    ClayIndex,
    /// Soil Organic Matter proxy over normalized visible bands
    SomIndex,
    /// Normalized Difference Vegetation Index: (NIR - Red) / (NIR + Red)
    Ndvi,
    /// Soil Saturation Index: (Red - Green) / (Red + Green + Blue)
    Ssi,
    /// Soil Brightness: sqrt(Red^2 + NIR^2)
    Brightness,
}

impl SoilIndex {
    /// Name of the band this index appends to the composite.
    pub fn band_name(self) -> &'static str {
        match self {
            SoilIndex::Ndsi => "NDSI",
            SoilIndex::Bi => "BI",
            SoilIndex::Bsi => "BSI",
            SoilIndex::Ci => "CI",
            SoilIndex::Ndmi => "NDMI",
            SoilIndex::ClayIndex => "ClayIndex",
            SoilIndex::SomIndex => "SOM_Index",
            SoilIndex::Ndvi => "NDVI",
            SoilIndex::Ssi => "SSI",
            SoilIndex::Brightness => "Brightness",
        }
    }

    /// Default selection, matching the analysis the tool was built for.
    pub fn default_selection() -> &'static [SoilIndex] {
        &[
            SoilIndex::Ndsi,
            SoilIndex::Bi,
            SoilIndex::Bsi,
            SoilIndex::Ci,
            SoilIndex::Ndmi,
            SoilIndex::ClayIndex,
            SoilIndex::SomIndex,
        ]
    }
}

impl std::fmt::Display for SoilIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.band_name())
    }
}

/// Derived products an export run can produce.
#[derive(
    Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ExportProduct {
    /// True-color RGB visualization (u8)
    Rgb,
    /// False-color vegetation visualization (u8)
    Agriculture,
    /// SWIR false-color soil visualization (u8)
    SoilVis,
    /// Stacked soil-index bands (f32)
    Indices,
    /// Full spectral reflectance stack (u16)
    Spectral,
}

impl std::fmt::Display for ExportProduct {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ExportProduct::Rgb => "rgb",
            ExportProduct::Agriculture => "agriculture",
            ExportProduct::SoilVis => "soil_vis",
            ExportProduct::Indices => "indices",
            ExportProduct::Spectral => "spectral",
        };
        write!(f, "{}", s)
    }
}

/// Where export jobs write their rasters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ExportDestination {
    /// Managed drive folder (created if missing).
    Drive { folder: String },
    /// Cloud storage bucket with an optional path prefix.
    CloudStorage {
        bucket: String,
        prefix: Option<String>,
    },
    /// Service-side asset, loadable by later runs without re-processing.
    Asset { asset_id: String },
}

/// Pixel storage type requested for an exported raster.
#[derive(
    Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum PixelType {
    U8,
    U16,
    F32,
}

impl PixelType {
    pub fn bytes_per_pixel(self) -> u64 {
        match self {
            PixelType::U8 => 1,
            PixelType::U16 => 2,
            PixelType::F32 => 4,
        }
    }
}

/// Lifecycle state of a remote export job.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    Pending,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl JobState {
    /// Terminal states end polling; pending/running do not.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobState::Succeeded | JobState::Failed | JobState::Cancelled
        )
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobState::Pending => "PENDING",
            JobState::Running => "RUNNING",
            JobState::Succeeded => "SUCCEEDED",
            JobState::Failed => "FAILED",
            JobState::Cancelled => "CANCELLED",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_role_aliases_match_sentinel2_numbering() {
        assert_eq!(Band::SWIR1.name(), "B11");
        assert_eq!(Band::NIR.name(), "B8");
        assert_eq!(Band::BLUE.resolution_m(), 10);
        assert_eq!(Band::SWIR2.resolution_m(), 20);
    }

    #[test]
    fn job_state_terminality() {
        assert!(JobState::Succeeded.is_terminal());
        assert!(JobState::Failed.is_terminal());
        assert!(JobState::Cancelled.is_terminal());
        assert!(!JobState::Pending.is_terminal());
        assert!(!JobState::Running.is_terminal());
    }

    #[test]
    fn circle_region_area() {
        let region = Region::circle(-1.84, -80.74, 1000);
        let expected = std::f64::consts::PI * 1.0e6;
        assert!((region.area_m2() - expected).abs() < 1e-6);
    }
}

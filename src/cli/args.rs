use chrono::NaiveDate;
use clap::Parser;

use soilscan::types::{CompositeMethod, SoilIndex};

#[derive(Parser)]
#[command(name = "soilscan", version, about = "Satellite-based soil quality assessment")]
pub struct CliArgs {
    /// Show imagery info without processing
    #[arg(long)]
    pub info: bool,

    /// Export results as GeoTIFF rasters
    #[arg(long)]
    pub export: bool,

    /// Wait for export jobs to complete
    #[arg(long)]
    pub wait: bool,

    /// Skip statistics calculation
    #[arg(long)]
    pub no_stats: bool,

    /// Override center latitude
    #[arg(long, allow_negative_numbers = true)]
    pub lat: Option<f64>,

    /// Override center longitude
    #[arg(long, allow_negative_numbers = true)]
    pub lon: Option<f64>,

    /// Override buffer radius in meters
    #[arg(long)]
    pub buffer: Option<u32>,

    /// Analysis period start (YYYY-MM-DD)
    #[arg(long)]
    pub start_date: Option<NaiveDate>,

    /// Analysis period end (YYYY-MM-DD)
    #[arg(long)]
    pub end_date: Option<NaiveDate>,

    /// Cloud probability cutoff (0-100); pixels above it are masked
    #[arg(long)]
    pub cloud_threshold: Option<u8>,

    /// Scene-level cloud cover ceiling (0-100)
    #[arg(long)]
    pub max_scene_cloud: Option<f64>,

    /// Compositing method
    #[arg(long, value_enum)]
    pub composite: Option<CompositeMethod>,

    /// Comma-separated soil indices to calculate
    #[arg(long, value_enum, value_delimiter = ',')]
    pub indices: Option<Vec<SoilIndex>>,

    /// Export scale in meters
    #[arg(long)]
    pub scale: Option<u32>,

    /// Enable logging
    #[arg(long, default_value_t = false)]
    pub log: bool,
}

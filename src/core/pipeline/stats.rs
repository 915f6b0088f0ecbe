//! Region statistics over index bands and the interpretation heuristics for
//! the analysis report. Statistics force remote evaluation; a failure on one
//! index is logged and skipped rather than failing the run.
use tracing::warn;

use super::expr::ImageExpr;
use crate::error::Result;
use crate::service::models::{BandStats, StatsRequest};
use crate::service::ImageService;
use crate::types::{Region, SoilIndex};

/// Statistics for every index that could be reduced, in request order.
#[derive(Debug, Clone, Default)]
pub struct SoilStatistics {
    pub per_index: Vec<(SoilIndex, BandStats)>,
}

/// Reduce each index band over the region (mean/min/max/stdDev).
pub fn compute_statistics(
    service: &dyn ImageService,
    image: &ImageExpr,
    region: &Region,
    indices: &[SoilIndex],
    scale_m: u32,
    max_pixels: u64,
) -> Result<SoilStatistics> {
    let mut per_index = Vec::with_capacity(indices.len());
    for &index in indices {
        let request = StatsRequest {
            expression: image.clone(),
            band: index.band_name().to_string(),
            region: region.clone(),
            scale_m,
            max_pixels,
        };
        match service.compute_region_stats(&request) {
            Ok(stats) => per_index.push((index, stats)),
            Err(e) => warn!(index = %index, error = %e, "could not reduce index band"),
        }
    }
    Ok(SoilStatistics { per_index })
}

impl SoilStatistics {
    fn mean_of(&self, index: SoilIndex) -> Option<f64> {
        self.per_index
            .iter()
            .find(|(i, _)| *i == index)
            .and_then(|(_, s)| s.mean)
    }

    /// Qualitative readings of the index means, one (aspect, text) pair per
    /// index the heuristics know about.
    pub fn interpret(&self) -> Vec<(&'static str, &'static str)> {
        let mut notes = Vec::new();
        if let Some(ndvi) = self.mean_of(SoilIndex::Ndvi) {
            notes.push((
                "vegetation",
                if ndvi < 0.2 {
                    "Sparse/bare - good for soil analysis"
                } else if ndvi < 0.4 {
                    "Moderate vegetation cover"
                } else {
                    "Dense vegetation - soil may be obscured"
                },
            ));
        }
        if let Some(ndmi) = self.mean_of(SoilIndex::Ndmi) {
            notes.push((
                "moisture",
                if ndmi < 0.0 {
                    "Dry conditions"
                } else if ndmi < 0.2 {
                    "Moderate moisture"
                } else {
                    "High moisture content"
                },
            ));
        }
        if let Some(ci) = self.mean_of(SoilIndex::Ci) {
            notes.push((
                "soil_color",
                if ci > 0.1 {
                    "Reddish soil - possible iron oxidation"
                } else if ci < -0.1 {
                    "Greenish/dark soil"
                } else {
                    "Neutral soil color"
                },
            ));
        }
        if let Some(bsi) = self.mean_of(SoilIndex::Bsi) {
            notes.push((
                "bare_soil",
                if bsi > 120.0 {
                    "High bare soil exposure"
                } else if bsi > 100.0 {
                    "Moderate bare soil"
                } else {
                    "Low bare soil index"
                },
            ));
        }
        if let Some(clay) = self.mean_of(SoilIndex::ClayIndex) {
            notes.push((
                "clay_content",
                if clay > 1.5 {
                    "Potentially high clay content"
                } else if clay > 1.2 {
                    "Moderate clay indicators"
                } else {
                    "Lower clay indicators"
                },
            ));
        }
        notes
    }

    /// Formatted analysis report for the CLI.
    pub fn report(&self, roi_name: &str) -> String {
        let mut out = String::new();
        out.push_str(&format!("SOIL ANALYSIS REPORT: {roi_name}\n"));
        out.push_str("Index Statistics:\n");
        for (index, stats) in &self.per_index {
            if let (Some(mean), Some(min), Some(max), Some(std_dev)) =
                (stats.mean, stats.min, stats.max, stats.std_dev)
            {
                out.push_str(&format!(
                    "  {index}: mean={mean:.4} min={min:.4} max={max:.4} stdDev={std_dev:.4}\n"
                ));
            }
        }
        let notes = self.interpret();
        if !notes.is_empty() {
            out.push_str("Interpretation:\n");
            for (aspect, text) in notes {
                out.push_str(&format!("  {aspect}: {text}\n"));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(mean: f64) -> BandStats {
        BandStats {
            mean: Some(mean),
            min: Some(mean - 0.1),
            max: Some(mean + 0.1),
            std_dev: Some(0.05),
        }
    }

    #[test]
    fn interpretation_thresholds() {
        let s = SoilStatistics {
            per_index: vec![
                (SoilIndex::Ndvi, stats(0.1)),
                (SoilIndex::Ndmi, stats(-0.2)),
                (SoilIndex::Ci, stats(0.15)),
                (SoilIndex::Bsi, stats(125.0)),
                (SoilIndex::ClayIndex, stats(1.6)),
            ],
        };
        let notes = s.interpret();
        assert!(notes.contains(&("vegetation", "Sparse/bare - good for soil analysis")));
        assert!(notes.contains(&("moisture", "Dry conditions")));
        assert!(notes.contains(&("soil_color", "Reddish soil - possible iron oxidation")));
        assert!(notes.contains(&("bare_soil", "High bare soil exposure")));
        assert!(notes.contains(&("clay_content", "Potentially high clay content")));
    }

    #[test]
    fn report_includes_every_complete_index() {
        let s = SoilStatistics {
            per_index: vec![(SoilIndex::Ndsi, stats(0.2))],
        };
        let text = s.report("test site");
        assert!(text.contains("SOIL ANALYSIS REPORT: test site"));
        assert!(text.contains("NDSI: mean=0.2000"));
    }
}

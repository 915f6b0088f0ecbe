//! Temporal compositing: reduce a masked collection into one image where
//! each band's value at each pixel aggregates all valid observations across
//! time. Median is the default; it is robust to undetected cloud residue and
//! sensor noise without per-scene weighting.
use serde::{Deserialize, Serialize};
use tracing::info;

use super::expr::ImageExpr;
use super::mask::MaskedCollection;
use crate::core::params::AnalysisParams;
use crate::error::{Error, Result};
use crate::types::{Band, CompositeMethod, Region};

/// Per-pixel reduction across the time series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reducer", rename_all = "camelCase")]
pub enum Reducer {
    Median,
    Mean,
    Min,
    Max,
    Percentile { percentile: u8 },
}

impl Reducer {
    pub fn from_params(params: &AnalysisParams) -> Self {
        match params.composite_method {
            CompositeMethod::Median => Reducer::Median,
            CompositeMethod::Mean => Reducer::Mean,
            CompositeMethod::Min => Reducer::Min,
            CompositeMethod::Max => Reducer::Max,
            CompositeMethod::Percentile => Reducer::Percentile {
                percentile: params.composite_percentile,
            },
        }
    }

    /// Reduce the valid observations at one pixel. Order-independent;
    /// an empty slice reduces to null.
    pub fn reduce(&self, samples: &[f64]) -> Option<f64> {
        if samples.is_empty() {
            return None;
        }
        let mut sorted = samples.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));
        match self {
            Reducer::Median => Some(percentile_of(&sorted, 50.0)),
            Reducer::Mean => Some(sorted.iter().sum::<f64>() / sorted.len() as f64),
            Reducer::Min => Some(sorted[0]),
            Reducer::Max => Some(sorted[sorted.len() - 1]),
            Reducer::Percentile { percentile } => {
                Some(percentile_of(&sorted, *percentile as f64))
            }
        }
    }

    /// Reduce a time series that may contain nulls: nulls are skipped, and a
    /// pixel with zero valid observations stays null.
    pub fn reduce_observations(&self, samples: &[Option<f64>]) -> Option<f64> {
        let valid: Vec<f64> = samples.iter().filter_map(|s| *s).collect();
        self.reduce(&valid)
    }
}

/// Linear-interpolated percentile over an already sorted slice.
fn percentile_of(sorted: &[f64], p: f64) -> f64 {
    let rank = p / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        sorted[lower]
    } else {
        let t = rank - lower as f64;
        sorted[lower] * (1.0 - t) + sorted[upper] * t
    }
}

/// Reduce the masked collection into one composite over the full spectral
/// band set, clipped to the region. Only masked inputs ever reach this
/// point; callers must have rejected an empty retrieval already, and the
/// same condition is asserted here.
pub fn build_composite(
    masked: &MaskedCollection,
    region: &Region,
    reducer: Reducer,
) -> Result<ImageExpr> {
    if masked.scenes.is_empty() {
        return Err(Error::InvalidArgument {
            arg: "collection",
            value: "0 masked scenes to composite".to_string(),
        });
    }
    let scenes: Vec<ImageExpr> = masked
        .scenes
        .iter()
        .map(|s| s.image.clone().select(Band::full_spectral()))
        .collect();
    info!(scenes = scenes.len(), ?reducer, "created temporal composite");
    Ok(ImageExpr::Composite { scenes, reducer }.clip(region))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn median_matches_reference_pixel() {
        // SWIR/NIR pairs (0.30,0.20), (0.32,0.18), (0.28,0.22) -> (0.30,0.20)
        let median = Reducer::Median;
        assert_relative_eq!(median.reduce(&[0.30, 0.32, 0.28]).unwrap(), 0.30);
        assert_relative_eq!(median.reduce(&[0.20, 0.18, 0.22]).unwrap(), 0.20);
    }

    #[test]
    fn median_is_order_independent() {
        let median = Reducer::Median;
        let a = [0.32, 0.28, 0.30, 0.31];
        let permutations = [
            [0.32, 0.28, 0.30, 0.31],
            [0.28, 0.30, 0.31, 0.32],
            [0.31, 0.32, 0.28, 0.30],
        ];
        let reference = median.reduce(&a).unwrap();
        for p in permutations {
            assert_relative_eq!(median.reduce(&p).unwrap(), reference);
        }
        // even count averages the middle pair
        assert_relative_eq!(reference, 0.305, epsilon = 1e-12);
    }

    #[test]
    fn nulls_are_skipped_and_all_null_stays_null() {
        let median = Reducer::Median;
        assert_relative_eq!(
            median
                .reduce_observations(&[Some(0.3), None, Some(0.5)])
                .unwrap(),
            0.4
        );
        assert_eq!(median.reduce_observations(&[None, None]), None);
        assert_eq!(median.reduce(&[]), None);
    }

    #[test]
    fn mean_min_max_percentile() {
        assert_relative_eq!(Reducer::Mean.reduce(&[1.0, 2.0, 3.0]).unwrap(), 2.0);
        assert_relative_eq!(Reducer::Min.reduce(&[3.0, 1.0, 2.0]).unwrap(), 1.0);
        assert_relative_eq!(Reducer::Max.reduce(&[3.0, 1.0, 2.0]).unwrap(), 3.0);
        let p25 = Reducer::Percentile { percentile: 25 };
        assert_relative_eq!(p25.reduce(&[0.0, 1.0, 2.0, 3.0]).unwrap(), 0.75);
    }

    #[test]
    fn empty_collection_cannot_be_composited() {
        let masked = MaskedCollection {
            scenes: vec![],
            dropped: 0,
        };
        let err = build_composite(
            &masked,
            &Region::circle(0.0, 0.0, 1000),
            Reducer::Median,
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { .. }));
    }
}

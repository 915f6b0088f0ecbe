//! Soil index calculation: one pure formula per index, appended to the
//! composite as a named band. Formulas are independent and order-insensitive;
//! every normalized-difference form goes null on a zero denominator instead
//! of propagating infinities.
use tracing::{info, warn};

use super::expr::{ImageExpr, PixelExpr};
use crate::error::Result;
use crate::types::{Band, SoilIndex};

impl SoilIndex {
    /// The per-pixel formula over composite reflectance bands.
    pub fn formula(self) -> PixelExpr {
        match self {
            // (SWIR1 - NIR) / (SWIR1 + NIR): high on bare soil, low on vegetation
            SoilIndex::Ndsi => PixelExpr::normalized_difference(Band::SWIR1, Band::NIR),
            SoilIndex::Bi => bare_soil_ratio(),
            // BI rescaled onto 0..200, zero point at 100
            SoilIndex::Bsi => bare_soil_ratio().rescale((-1.0, 1.0), (0.0, 200.0)),
            SoilIndex::Ci => PixelExpr::normalized_difference(Band::RED, Band::GREEN),
            SoilIndex::Ndmi => PixelExpr::normalized_difference(Band::NIR, Band::SWIR1),
            SoilIndex::ClayIndex => {
                PixelExpr::band(Band::SWIR1).divide(PixelExpr::band(Band::SWIR2))
            }
            SoilIndex::SomIndex => som_proxy(),
            SoilIndex::Ndvi => PixelExpr::normalized_difference(Band::NIR, Band::RED),
            SoilIndex::Ssi => PixelExpr::band(Band::RED)
                .subtract(PixelExpr::band(Band::GREEN))
                .divide(
                    PixelExpr::band(Band::RED)
                        .add(PixelExpr::band(Band::GREEN))
                        .add(PixelExpr::band(Band::BLUE)),
                ),
            SoilIndex::Brightness => PixelExpr::band(Band::RED)
                .pow(2.0)
                .add(PixelExpr::band(Band::NIR).pow(2.0))
                .sqrt(),
        }
    }

    /// Evaluate the formula at one pixel; used by tests and reports.
    pub fn evaluate(self, lookup: &dyn Fn(&str) -> Option<f64>) -> Option<f64> {
        self.formula().eval(lookup)
    }
}

/// ((SWIR1 + Red) - (NIR + Blue)) / ((SWIR1 + Red) + (NIR + Blue))
fn bare_soil_ratio() -> PixelExpr {
    let soil = PixelExpr::band(Band::SWIR1).add(PixelExpr::band(Band::RED));
    let vegetation = PixelExpr::band(Band::NIR).add(PixelExpr::band(Band::BLUE));
    soil.clone()
        .subtract(vegetation.clone())
        .divide(soil.add(vegetation))
}

/// SOM proxy: 1 - (2.5*r - g) / (r + g) over reflectance normalized from the
/// 0..10000 DN scale. Darker visible soil reads as higher organic matter.
fn som_proxy() -> PixelExpr {
    let r = PixelExpr::band(Band::RED).divide(PixelExpr::constant(10000.0));
    let g = PixelExpr::band(Band::GREEN).divide(PixelExpr::constant(10000.0));
    PixelExpr::constant(1.0).subtract(
        r.clone()
            .multiply(PixelExpr::constant(2.5))
            .subtract(g.clone())
            .divide(r.add(g)),
    )
}

/// Append the requested index bands to the composite and return the
/// augmented image. Existing bands are never mutated; duplicate requests are
/// dropped with a warning.
pub fn calculate_indices(
    composite: ImageExpr,
    indices: &[SoilIndex],
) -> Result<ImageExpr> {
    let mut seen: Vec<SoilIndex> = Vec::new();
    let mut image = composite;
    for &index in indices {
        if seen.contains(&index) {
            warn!(index = %index, "index requested twice; skipping duplicate");
            continue;
        }
        image = image.with_band(index.band_name(), index.formula())?;
        seen.push(index);
    }
    info!(
        indices = %seen
            .iter()
            .map(|i| i.band_name())
            .collect::<Vec<_>>()
            .join(", "),
        "calculated soil indices"
    );
    Ok(image)
}

/// Binary bare-soil band: low vegetation (NDVI) and high bare-soil index
/// (BSI). Reuses already-appended index bands when present.
pub fn bare_soil_mask(
    image: ImageExpr,
    ndvi_threshold: f64,
    bsi_threshold: f64,
) -> Result<ImageExpr> {
    let known = image.band_names();
    let has = |band: &str| {
        known
            .as_ref()
            .map(|names| names.iter().any(|n| n == band))
            .unwrap_or(false)
    };
    let ndvi = if has("NDVI") {
        PixelExpr::named("NDVI")
    } else {
        SoilIndex::Ndvi.formula()
    };
    let bsi = if has("BSI") {
        PixelExpr::named("BSI")
    } else {
        SoilIndex::Bsi.formula()
    };
    let predicate = ndvi
        .lt(PixelExpr::constant(ndvi_threshold))
        .and(bsi.gt(PixelExpr::constant(bsi_threshold)));
    image.with_band("bare_soil_mask", predicate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use crate::error::Error;

    fn pixel(values: &[(Band, f64)]) -> impl Fn(&str) -> Option<f64> + '_ {
        move |name: &str| {
            values
                .iter()
                .find(|(band, _)| band.name() == name)
                .map(|(_, v)| *v)
        }
    }

    #[test]
    fn ndsi_reference_value() {
        let v = SoilIndex::Ndsi
            .evaluate(&pixel(&[(Band::SWIR1, 0.30), (Band::NIR, 0.20)]))
            .unwrap();
        assert_relative_eq!(v, 0.20, epsilon = 1e-12);
    }

    #[test]
    fn ndsi_zero_bands_are_null_not_nan() {
        let v = SoilIndex::Ndsi.evaluate(&pixel(&[(Band::SWIR1, 0.0), (Band::NIR, 0.0)]));
        assert_eq!(v, None);
    }

    #[test]
    fn bsi_is_affine_in_bi_and_nondecreasing() {
        let pixels: Vec<[(Band, f64); 4]> = vec![
            [(Band::SWIR1, 900.0), (Band::RED, 700.0), (Band::NIR, 2400.0), (Band::B2, 400.0)],
            [(Band::SWIR1, 1800.0), (Band::RED, 1300.0), (Band::NIR, 1900.0), (Band::B2, 500.0)],
            [(Band::SWIR1, 2600.0), (Band::RED, 2100.0), (Band::NIR, 1500.0), (Band::B2, 600.0)],
        ];
        let mut pairs: Vec<(f64, f64)> = pixels
            .iter()
            .map(|p| {
                let bi = SoilIndex::Bi.evaluate(&pixel(p)).unwrap();
                let bsi = SoilIndex::Bsi.evaluate(&pixel(p)).unwrap();
                assert_relative_eq!(bsi, bi * 100.0 + 100.0, epsilon = 1e-9);
                (bi, bsi)
            })
            .collect();
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
        for window in pairs.windows(2) {
            assert!(window[1].1 >= window[0].1);
        }
    }

    #[test]
    fn ci_and_ndvi_reference_values() {
        let p = [(Band::RED, 1200.0), (Band::GREEN, 800.0), (Band::NIR, 3000.0)];
        assert_relative_eq!(
            SoilIndex::Ci.evaluate(&pixel(&p)).unwrap(),
            400.0 / 2000.0
        );
        assert_relative_eq!(
            SoilIndex::Ndvi.evaluate(&pixel(&p)).unwrap(),
            1800.0 / 4200.0
        );
    }

    #[test]
    fn clay_index_zero_swir2_is_null() {
        assert_eq!(
            SoilIndex::ClayIndex
                .evaluate(&pixel(&[(Band::SWIR1, 1500.0), (Band::SWIR2, 0.0)])),
            None
        );
        assert_relative_eq!(
            SoilIndex::ClayIndex
                .evaluate(&pixel(&[(Band::SWIR1, 1500.0), (Band::SWIR2, 1000.0)]))
                .unwrap(),
            1.5
        );
    }

    #[test]
    fn som_index_matches_hand_computation() {
        // r=0.12, g=0.08: 1 - (0.3 - 0.08)/0.2 = -0.1
        let v = SoilIndex::SomIndex
            .evaluate(&pixel(&[(Band::RED, 1200.0), (Band::GREEN, 800.0)]))
            .unwrap();
        assert_relative_eq!(v, -0.1, epsilon = 1e-9);
        // both visible bands dark: null, not inf
        assert_eq!(
            SoilIndex::SomIndex.evaluate(&pixel(&[(Band::RED, 0.0), (Band::GREEN, 0.0)])),
            None
        );
    }

    #[test]
    fn brightness_is_euclidean() {
        let v = SoilIndex::Brightness
            .evaluate(&pixel(&[(Band::RED, 3.0), (Band::NIR, 4.0)]))
            .unwrap();
        assert_relative_eq!(v, 5.0);
    }

    #[test]
    fn calculator_appends_only_new_bands() {
        let composite = ImageExpr::scene("c").select(Band::full_spectral());
        let augmented = calculate_indices(
            composite,
            &[SoilIndex::Ndsi, SoilIndex::Bi, SoilIndex::Ndsi],
        )
        .unwrap();
        let names = augmented.band_names().unwrap();
        assert_eq!(names.last().unwrap(), "BI");
        assert_eq!(names[names.len() - 2], "NDSI");
        assert_eq!(names.iter().filter(|n| *n == "NDSI").count(), 1);
    }

    #[test]
    fn indices_never_shadow_spectral_bands() {
        let composite = ImageExpr::scene("c")
            .select(Band::full_spectral())
            .with_band("NDSI", PixelExpr::constant(0.0))
            .unwrap();
        let err = calculate_indices(composite, &[SoilIndex::Ndsi]).unwrap_err();
        assert!(matches!(err, Error::DuplicateBand { .. }));
    }

    #[test]
    fn bare_soil_mask_uses_appended_bands() {
        let composite = ImageExpr::scene("c").select(Band::full_spectral());
        let augmented =
            calculate_indices(composite, &[SoilIndex::Ndvi, SoilIndex::Bsi]).unwrap();
        let masked = bare_soil_mask(augmented, 0.3, 100.0).unwrap();
        let names = masked.band_names().unwrap();
        assert_eq!(names.last().unwrap(), "bare_soil_mask");
        match &masked {
            ImageExpr::AddBand { formula, .. } => {
                assert_eq!(
                    formula.band_refs(),
                    vec!["BSI".to_string(), "NDVI".to_string()]
                );
            }
            other => panic!("expected AddBand, got {other:?}"),
        }
    }
}

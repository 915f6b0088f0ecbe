//! Lazy image expressions.
//!
//! Every pipeline stage returns a *description* of the computation to apply,
//! not pixel data. The graph serializes to JSON and is shipped to the
//! geoprocessing service, which evaluates it server-side; only statistics and
//! export calls force evaluation. `PixelExpr` additionally carries local
//! per-pixel semantics (`eval`) so the arithmetic contracts are testable
//! without a network.
use serde::{Deserialize, Serialize};

use super::composite::Reducer;
use crate::error::{Error, Result};
use crate::types::{Band, Region};

/// Per-pixel arithmetic over the named bands of an image.
///
/// Values are `Option<f64>`: `None` is the null (masked / no-data) pixel.
/// A zero denominator yields null, never an infinity or NaN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum PixelExpr {
    Band { name: String },
    Const { value: f64 },
    Add { left: Box<PixelExpr>, right: Box<PixelExpr> },
    Sub { left: Box<PixelExpr>, right: Box<PixelExpr> },
    Mul { left: Box<PixelExpr>, right: Box<PixelExpr> },
    Div { left: Box<PixelExpr>, right: Box<PixelExpr> },
    Sqrt { arg: Box<PixelExpr> },
    Pow { base: Box<PixelExpr>, exponent: f64 },
    /// (a - b) / (a + b)
    NormalizedDifference { a: Box<PixelExpr>, b: Box<PixelExpr> },
    /// Linear map of `[from_min, from_max]` onto `[to_min, to_max]`.
    Rescale {
        arg: Box<PixelExpr>,
        from_min: f64,
        from_max: f64,
        to_min: f64,
        to_max: f64,
    },
    Lt { left: Box<PixelExpr>, right: Box<PixelExpr> },
    Gt { left: Box<PixelExpr>, right: Box<PixelExpr> },
    Neq { left: Box<PixelExpr>, right: Box<PixelExpr> },
    And { left: Box<PixelExpr>, right: Box<PixelExpr> },
    Not { arg: Box<PixelExpr> },
}

impl PixelExpr {
    pub fn band(band: Band) -> Self {
        PixelExpr::Band {
            name: band.name().to_string(),
        }
    }

    /// Reference a band by name (spectral or previously appended index band).
    pub fn named(name: &str) -> Self {
        PixelExpr::Band {
            name: name.to_string(),
        }
    }

    pub fn constant(value: f64) -> Self {
        PixelExpr::Const { value }
    }

    pub fn normalized_difference(a: Band, b: Band) -> Self {
        PixelExpr::NormalizedDifference {
            a: Box::new(PixelExpr::band(a)),
            b: Box::new(PixelExpr::band(b)),
        }
    }

    pub fn add(self, other: PixelExpr) -> Self {
        PixelExpr::Add { left: Box::new(self), right: Box::new(other) }
    }

    pub fn subtract(self, other: PixelExpr) -> Self {
        PixelExpr::Sub { left: Box::new(self), right: Box::new(other) }
    }

    pub fn multiply(self, other: PixelExpr) -> Self {
        PixelExpr::Mul { left: Box::new(self), right: Box::new(other) }
    }

    pub fn divide(self, other: PixelExpr) -> Self {
        PixelExpr::Div { left: Box::new(self), right: Box::new(other) }
    }

    pub fn sqrt(self) -> Self {
        PixelExpr::Sqrt { arg: Box::new(self) }
    }

    pub fn pow(self, exponent: f64) -> Self {
        PixelExpr::Pow { base: Box::new(self), exponent }
    }

    pub fn rescale(self, from: (f64, f64), to: (f64, f64)) -> Self {
        PixelExpr::Rescale {
            arg: Box::new(self),
            from_min: from.0,
            from_max: from.1,
            to_min: to.0,
            to_max: to.1,
        }
    }

    pub fn lt(self, other: PixelExpr) -> Self {
        PixelExpr::Lt { left: Box::new(self), right: Box::new(other) }
    }

    pub fn gt(self, other: PixelExpr) -> Self {
        PixelExpr::Gt { left: Box::new(self), right: Box::new(other) }
    }

    pub fn neq(self, other: PixelExpr) -> Self {
        PixelExpr::Neq { left: Box::new(self), right: Box::new(other) }
    }

    pub fn and(self, other: PixelExpr) -> Self {
        PixelExpr::And { left: Box::new(self), right: Box::new(other) }
    }

    pub fn not(self) -> Self {
        PixelExpr::Not { arg: Box::new(self) }
    }

    /// Evaluate against a band lookup. Mirrors the service's per-pixel
    /// semantics: null propagates, zero denominators are null, comparisons
    /// produce 1.0/0.0, and any nonzero value is true for logical ops.
    pub fn eval(&self, lookup: &dyn Fn(&str) -> Option<f64>) -> Option<f64> {
        match self {
            PixelExpr::Band { name } => lookup(name),
            PixelExpr::Const { value } => Some(*value),
            PixelExpr::Add { left, right } => Some(left.eval(lookup)? + right.eval(lookup)?),
            PixelExpr::Sub { left, right } => Some(left.eval(lookup)? - right.eval(lookup)?),
            PixelExpr::Mul { left, right } => Some(left.eval(lookup)? * right.eval(lookup)?),
            PixelExpr::Div { left, right } => {
                let n = left.eval(lookup)?;
                let d = right.eval(lookup)?;
                if d == 0.0 { None } else { Some(n / d) }
            }
            PixelExpr::Sqrt { arg } => {
                let v = arg.eval(lookup)?;
                if v < 0.0 { None } else { Some(v.sqrt()) }
            }
            PixelExpr::Pow { base, exponent } => Some(base.eval(lookup)?.powf(*exponent)),
            PixelExpr::NormalizedDifference { a, b } => {
                let a = a.eval(lookup)?;
                let b = b.eval(lookup)?;
                let sum = a + b;
                if sum == 0.0 { None } else { Some((a - b) / sum) }
            }
            PixelExpr::Rescale {
                arg,
                from_min,
                from_max,
                to_min,
                to_max,
            } => {
                let v = arg.eval(lookup)?;
                let t = (v - from_min) / (from_max - from_min);
                Some(to_min + t * (to_max - to_min))
            }
            PixelExpr::Lt { left, right } => {
                Some((left.eval(lookup)? < right.eval(lookup)?) as u8 as f64)
            }
            PixelExpr::Gt { left, right } => {
                Some((left.eval(lookup)? > right.eval(lookup)?) as u8 as f64)
            }
            PixelExpr::Neq { left, right } => {
                Some((left.eval(lookup)? != right.eval(lookup)?) as u8 as f64)
            }
            PixelExpr::And { left, right } => {
                Some((left.eval(lookup)? != 0.0 && right.eval(lookup)? != 0.0) as u8 as f64)
            }
            PixelExpr::Not { arg } => Some((arg.eval(lookup)? == 0.0) as u8 as f64),
        }
    }

    /// All band names this expression reads.
    pub fn band_refs(&self) -> Vec<String> {
        let mut refs = Vec::new();
        self.collect_band_refs(&mut refs);
        refs.sort();
        refs.dedup();
        refs
    }

    fn collect_band_refs(&self, out: &mut Vec<String>) {
        match self {
            PixelExpr::Band { name } => out.push(name.clone()),
            PixelExpr::Const { .. } => {}
            PixelExpr::Add { left, right }
            | PixelExpr::Sub { left, right }
            | PixelExpr::Mul { left, right }
            | PixelExpr::Div { left, right }
            | PixelExpr::Lt { left, right }
            | PixelExpr::Gt { left, right }
            | PixelExpr::Neq { left, right }
            | PixelExpr::And { left, right } => {
                left.collect_band_refs(out);
                right.collect_band_refs(out);
            }
            PixelExpr::NormalizedDifference { a, b } => {
                a.collect_band_refs(out);
                b.collect_band_refs(out);
            }
            PixelExpr::Sqrt { arg } | PixelExpr::Not { arg } => arg.collect_band_refs(out),
            PixelExpr::Pow { base, .. } => base.collect_band_refs(out),
            PixelExpr::Rescale { arg, .. } => arg.collect_band_refs(out),
        }
    }
}

/// A lazy multiband image: an opaque handle into the service's computation
/// graph. Stages chain these; nothing is materialized locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum ImageExpr {
    /// One catalog scene by id.
    Scene { id: String },
    /// The pretrained classifier's cloud probability image for a scene
    /// (single band named "probability").
    CloudProbability { scene_id: String },
    Select {
        source: Box<ImageExpr>,
        bands: Vec<String>,
    },
    /// Join every band of another image onto this one (classifier joins).
    AddBands {
        source: Box<ImageExpr>,
        other: Box<ImageExpr>,
    },
    /// Append a derived band. Existing bands are never replaced.
    AddBand {
        source: Box<ImageExpr>,
        name: String,
        formula: PixelExpr,
    },
    /// Null out every pixel where the predicate is null or zero.
    UpdateMask {
        source: Box<ImageExpr>,
        predicate: PixelExpr,
    },
    /// Morphological dilation over a circular kernel (meters).
    FocalMax {
        source: Box<ImageExpr>,
        radius_m: u32,
    },
    /// Morphological erosion over a circular kernel (meters).
    FocalMin {
        source: Box<ImageExpr>,
        radius_m: u32,
    },
    Clip {
        source: Box<ImageExpr>,
        region: Region,
    },
    /// Server-side 8-bit RGB rendering of a band triplet, reflectance
    /// stretched linearly from `[min, max]`.
    Visualize {
        source: Box<ImageExpr>,
        bands: Vec<String>,
        min: f64,
        max: f64,
    },
    /// Per-pixel, band-by-band temporal reduction across scenes. Null
    /// observations are skipped; zero valid observations stay null.
    Composite {
        scenes: Vec<ImageExpr>,
        reducer: Reducer,
    },
}

impl ImageExpr {
    pub fn scene(id: &str) -> Self {
        ImageExpr::Scene { id: id.to_string() }
    }

    pub fn cloud_probability(scene_id: &str) -> Self {
        ImageExpr::CloudProbability {
            scene_id: scene_id.to_string(),
        }
    }

    pub fn select(self, bands: &[Band]) -> Self {
        ImageExpr::Select {
            source: Box::new(self),
            bands: bands.iter().map(|b| b.name().to_string()).collect(),
        }
    }

    pub fn select_names(self, bands: &[&str]) -> Self {
        ImageExpr::Select {
            source: Box::new(self),
            bands: bands.iter().map(|b| b.to_string()).collect(),
        }
    }

    /// Join another image's bands onto this one, e.g. the classifier's
    /// "probability" band onto its Sentinel-2 scene.
    pub fn add_bands(self, other: ImageExpr) -> Self {
        ImageExpr::AddBands {
            source: Box::new(self),
            other: Box::new(other),
        }
    }

    /// Append a derived band, enforcing that derived bands only reference
    /// bands present in the source and never shadow an existing band.
    pub fn with_band(self, name: &str, formula: PixelExpr) -> Result<Self> {
        if let Some(known) = self.band_names() {
            if known.iter().any(|b| b == name) {
                return Err(Error::DuplicateBand {
                    band: name.to_string(),
                });
            }
            for referenced in formula.band_refs() {
                if !known.iter().any(|b| *b == referenced) {
                    return Err(Error::MissingBand { band: referenced });
                }
            }
        }
        Ok(ImageExpr::AddBand {
            source: Box::new(self),
            name: name.to_string(),
            formula,
        })
    }

    pub fn update_mask(self, predicate: PixelExpr) -> Self {
        ImageExpr::UpdateMask {
            source: Box::new(self),
            predicate,
        }
    }

    pub fn focal_max(self, radius_m: u32) -> Self {
        ImageExpr::FocalMax {
            source: Box::new(self),
            radius_m,
        }
    }

    pub fn focal_min(self, radius_m: u32) -> Self {
        ImageExpr::FocalMin {
            source: Box::new(self),
            radius_m,
        }
    }

    pub fn visualize(self, bands: &[Band], min: f64, max: f64) -> Self {
        ImageExpr::Visualize {
            source: Box::new(self),
            bands: bands.iter().map(|b| b.name().to_string()).collect(),
            min,
            max,
        }
    }

    pub fn clip(self, region: &Region) -> Self {
        ImageExpr::Clip {
            source: Box::new(self),
            region: region.clone(),
        }
    }

    /// Band names of this image where they are statically known.
    ///
    /// `Scene` nodes expose the full catalog band set, which the graph does
    /// not track; `None` means "unknown", and validation is skipped.
    pub fn band_names(&self) -> Option<Vec<String>> {
        match self {
            ImageExpr::Scene { .. } => None,
            ImageExpr::CloudProbability { .. } => Some(vec!["probability".to_string()]),
            ImageExpr::Select { bands, .. } => Some(bands.clone()),
            ImageExpr::AddBands { source, other } => {
                let mut names = source.band_names()?;
                names.extend(other.band_names()?);
                Some(names)
            }
            ImageExpr::AddBand { source, name, .. } => {
                let mut names = source.band_names()?;
                names.push(name.clone());
                Some(names)
            }
            ImageExpr::UpdateMask { source, .. }
            | ImageExpr::FocalMax { source, .. }
            | ImageExpr::FocalMin { source, .. }
            | ImageExpr::Clip { source, .. } => source.band_names(),
            ImageExpr::Visualize { bands, .. } => Some(bands.clone()),
            ImageExpr::Composite { scenes, .. } => scenes.first()?.band_names(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn pixel<'a>(values: &'a [(&'a str, f64)]) -> impl Fn(&str) -> Option<f64> + 'a {
        move |name: &str| {
            values
                .iter()
                .find(|(band, _)| *band == name)
                .map(|(_, v)| *v)
        }
    }

    #[test]
    fn division_by_zero_is_null() {
        let expr = PixelExpr::named("a").divide(PixelExpr::named("b"));
        assert_eq!(expr.eval(&pixel(&[("a", 3.0), ("b", 0.0)])), None);
        assert_relative_eq!(
            expr.eval(&pixel(&[("a", 3.0), ("b", 2.0)])).unwrap(),
            1.5
        );
    }

    #[test]
    fn normalized_difference_with_zero_sum_is_null() {
        let nd = PixelExpr::normalized_difference(Band::SWIR1, Band::NIR);
        assert_eq!(nd.eval(&pixel(&[("B11", 0.0), ("B8", 0.0)])), None);
        let v = nd.eval(&pixel(&[("B11", 0.30), ("B8", 0.20)])).unwrap();
        assert_relative_eq!(v, 0.20, epsilon = 1e-12);
    }

    #[test]
    fn null_band_propagates() {
        let expr = PixelExpr::named("missing").add(PixelExpr::constant(1.0));
        assert_eq!(expr.eval(&pixel(&[("B4", 1.0)])), None);
    }

    #[test]
    fn rescale_is_linear() {
        let expr = PixelExpr::named("x").rescale((-1.0, 1.0), (0.0, 200.0));
        assert_relative_eq!(expr.eval(&pixel(&[("x", 0.0)])).unwrap(), 100.0);
        assert_relative_eq!(expr.eval(&pixel(&[("x", -1.0)])).unwrap(), 0.0);
        assert_relative_eq!(expr.eval(&pixel(&[("x", 1.0)])).unwrap(), 200.0);
    }

    #[test]
    fn comparisons_and_logic() {
        let mask = PixelExpr::named("p")
            .lt(PixelExpr::constant(40.0))
            .and(PixelExpr::named("scl").neq(PixelExpr::constant(9.0)));
        assert_eq!(mask.eval(&pixel(&[("p", 12.0), ("scl", 4.0)])), Some(1.0));
        assert_eq!(mask.eval(&pixel(&[("p", 55.0), ("scl", 4.0)])), Some(0.0));
        assert_eq!(mask.eval(&pixel(&[("p", 12.0), ("scl", 9.0)])), Some(0.0));
    }

    #[test]
    fn band_refs_are_collected_once() {
        let expr = PixelExpr::band(Band::RED)
            .subtract(PixelExpr::band(Band::GREEN))
            .divide(PixelExpr::band(Band::RED).add(PixelExpr::band(Band::GREEN)));
        assert_eq!(expr.band_refs(), vec!["B3".to_string(), "B4".to_string()]);
    }

    #[test]
    fn with_band_rejects_duplicates_and_unknown_refs() {
        let base = ImageExpr::scene("S2A_1").select(&[Band::B4, Band::B3]);
        let err = base
            .clone()
            .with_band("B4", PixelExpr::band(Band::B3))
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateBand { .. }));

        let err = base
            .clone()
            .with_band("CI", PixelExpr::band(Band::SWIR1))
            .unwrap_err();
        assert!(matches!(err, Error::MissingBand { .. }));

        let augmented = base
            .with_band("CI", PixelExpr::normalized_difference(Band::RED, Band::GREEN))
            .unwrap();
        assert_eq!(
            augmented.band_names().unwrap(),
            vec!["B4".to_string(), "B3".to_string(), "CI".to_string()]
        );
    }

    #[test]
    fn graph_serializes_with_op_tags() {
        let expr = ImageExpr::scene("S2A_1")
            .select(&[Band::B8, Band::B11])
            .update_mask(PixelExpr::named("probability").lt(PixelExpr::constant(40.0)));
        let json = serde_json::to_value(&expr).unwrap();
        assert_eq!(json["op"], "updateMask");
        assert_eq!(json["source"]["op"], "select");
        assert_eq!(json["source"]["source"]["id"], "S2A_1");
    }
}

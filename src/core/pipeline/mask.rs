//! Cloud masking: join the remote classifier's probability image to each
//! scene, threshold it, buffer the mask, and null out contaminated pixels.
//! Purely per-scene graph construction; scenes the classifier never covered
//! are dropped from the collection instead of failing the run.
use std::collections::HashSet;

use tracing::{debug, warn};

use super::expr::{ImageExpr, PixelExpr};
use super::retrieval::SceneCollection;
use crate::core::params::AnalysisParams;
use crate::service::models::SceneMeta;

/// Scene classification (SCL) classes nulled in addition to the probability
/// mask: cloud shadow, cloud medium/high probability, thin cirrus.
pub const SCL_MASKED_CLASSES: [u8; 4] = [3, 8, 9, 10];

/// One scene with cloud/shadow/cirrus pixels nulled.
#[derive(Debug, Clone)]
pub struct MaskedScene {
    pub meta: SceneMeta,
    pub image: ImageExpr,
}

/// Masked scenes sharing the run's region and band set.
#[derive(Debug, Clone)]
pub struct MaskedCollection {
    pub scenes: Vec<MaskedScene>,
    /// Scenes dropped because the classifier had no matching image.
    pub dropped: usize,
}

impl MaskedCollection {
    pub fn count(&self) -> usize {
        self.scenes.len()
    }
}

/// Per-pixel clear-sky predicate: classifier probability below the cutoff
/// and SCL not in any masked class.
pub fn clear_sky_predicate(cloud_probability_threshold: u8) -> PixelExpr {
    let mut clear = PixelExpr::named("probability")
        .lt(PixelExpr::constant(cloud_probability_threshold as f64));
    for class in SCL_MASKED_CLASSES {
        clear = clear.and(PixelExpr::named("SCL").neq(PixelExpr::constant(class as f64)));
    }
    clear
}

/// Build the masked image for a single scene.
///
/// The probability image is max-dilated before thresholding; for a fixed
/// cutoff that is exactly a dilation of the thresholded cloud mask, so the
/// buffer grows clouds, never clear sky.
pub fn mask_scene(meta: &SceneMeta, params: &AnalysisParams) -> MaskedScene {
    let probability =
        ImageExpr::cloud_probability(&meta.id).focal_max(params.mask_buffer_m);
    let image = ImageExpr::scene(&meta.id)
        .add_bands(probability)
        .update_mask(clear_sky_predicate(params.cloud_probability_threshold));
    MaskedScene {
        meta: meta.clone(),
        image,
    }
}

/// Apply cloud masking across a collection, joining classifier scenes by id.
pub fn apply_cloud_mask(
    scenes: &SceneCollection,
    cloud_probability: &SceneCollection,
    params: &AnalysisParams,
) -> MaskedCollection {
    let classified: HashSet<&str> = cloud_probability
        .scenes
        .iter()
        .map(|s| s.id.as_str())
        .collect();

    let mut masked = Vec::with_capacity(scenes.count());
    let mut dropped = 0;
    for meta in &scenes.scenes {
        if !classified.contains(meta.id.as_str()) {
            warn!(scene = %meta.id, "no cloud-probability image; dropping scene");
            dropped += 1;
            continue;
        }
        masked.push(mask_scene(meta, params));
    }
    debug!(
        kept = masked.len(),
        dropped,
        threshold = params.cloud_probability_threshold,
        "applied cloud masking"
    );
    MaskedCollection {
        scenes: masked,
        dropped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::models::{SceneMeta, SceneQuery};
    use crate::types::Region;
    use chrono::NaiveDate;

    fn meta(id: &str) -> SceneMeta {
        SceneMeta {
            id: id.to_string(),
            acquired: NaiveDate::from_ymd_opt(2025, 11, 8).unwrap(),
            cloudy_pixel_percentage: Some(20.0),
        }
    }

    fn collection(ids: &[&str]) -> SceneCollection {
        SceneCollection {
            query: SceneQuery::new(
                "test",
                Region::circle(0.0, 0.0, 1000),
                NaiveDate::from_ymd_opt(2025, 10, 22).unwrap(),
                NaiveDate::from_ymd_opt(2026, 1, 22).unwrap(),
            ),
            scenes: ids.iter().map(|id| meta(id)).collect(),
        }
    }

    #[test]
    fn clear_predicate_blocks_clouds_and_scl_classes() {
        let clear = clear_sky_predicate(40);
        let eval = |prob: f64, scl: f64| {
            clear.eval(&|name| match name {
                "probability" => Some(prob),
                "SCL" => Some(scl),
                _ => None,
            })
        };
        assert_eq!(eval(10.0, 4.0), Some(1.0));
        assert_eq!(eval(60.0, 4.0), Some(0.0)); // cloudy
        assert_eq!(eval(10.0, 3.0), Some(0.0)); // cloud shadow
        assert_eq!(eval(10.0, 10.0), Some(0.0)); // cirrus
        assert_eq!(eval(40.0, 4.0), Some(0.0)); // cutoff is exclusive
    }

    #[test]
    fn scenes_without_classifier_match_are_dropped() {
        let s2 = collection(&["a", "b", "c"]);
        let probs = collection(&["a", "c"]);
        let masked = apply_cloud_mask(&s2, &probs, &AnalysisParams::default());
        assert_eq!(masked.count(), 2);
        assert_eq!(masked.dropped, 1);
        assert_eq!(masked.scenes[0].meta.id, "a");
        assert_eq!(masked.scenes[1].meta.id, "c");
    }

    #[test]
    fn masked_image_joins_buffered_probability() {
        let params = AnalysisParams::default();
        let masked = mask_scene(&meta("s"), &params);
        match &masked.image {
            ImageExpr::UpdateMask { source, .. } => match source.as_ref() {
                ImageExpr::AddBands { other, .. } => match other.as_ref() {
                    ImageExpr::FocalMax { radius_m, .. } => {
                        assert_eq!(*radius_m, params.mask_buffer_m)
                    }
                    other => panic!("expected FocalMax, got {other:?}"),
                },
                other => panic!("expected AddBands, got {other:?}"),
            },
            other => panic!("expected UpdateMask, got {other:?}"),
        }
    }
}

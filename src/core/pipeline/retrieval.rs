//! Scene retrieval: catalog queries for Sentinel-2 surface reflectance,
//! the s2cloudless probability collection, and the Sentinel-1 SAR backup.
//! A retrieved collection is a handle (scene metadata plus the filters that
//! produced it), never materialized imagery.
use chrono::NaiveDate;
use tracing::info;

use crate::core::params::{
    AnalysisParams, S1_COLLECTION, S2_CLOUDLESS_COLLECTION, S2_COLLECTION,
};
use crate::error::{Error, Result};
use crate::service::models::{PropertyFilter, SceneMeta, SceneQuery};
use crate::service::ImageService;

/// Ordered set of catalog scenes matching a query.
#[derive(Debug, Clone)]
pub struct SceneCollection {
    pub query: SceneQuery,
    pub scenes: Vec<SceneMeta>,
}

impl SceneCollection {
    pub fn count(&self) -> usize {
        self.scenes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }

    /// Hard error when the query matched nothing. Must be checked before
    /// any compositing is attempted.
    pub fn require_scenes(&self) -> Result<()> {
        if self.scenes.is_empty() {
            return Err(Error::NoScenes {
                collection: self.query.collection.clone(),
                start: self.query.start,
                end: self.query.end,
                max_cloud_percent: self.cloud_ceiling().unwrap_or(100.0),
            });
        }
        Ok(())
    }

    fn cloud_ceiling(&self) -> Option<f64> {
        self.query.filters.iter().find_map(|f| match f {
            PropertyFilter::Lt { name, value } if name == "CLOUDY_PIXEL_PERCENTAGE" => {
                Some(*value)
            }
            _ => None,
        })
    }

    /// Distinct acquisition dates, sorted.
    pub fn dates(&self) -> Vec<NaiveDate> {
        let mut dates: Vec<NaiveDate> = self.scenes.iter().map(|s| s.acquired).collect();
        dates.sort();
        dates.dedup();
        dates
    }

    /// (min, max, mean) of scene-level cloud cover, when the catalog has it.
    pub fn cloud_stats(&self) -> Option<(f64, f64, f64)> {
        let values: Vec<f64> = self
            .scenes
            .iter()
            .filter_map(|s| s.cloudy_pixel_percentage)
            .collect();
        if values.is_empty() {
            return None;
        }
        let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        Some((min, max, mean))
    }

    /// Human-readable summary for the info report.
    pub fn summary(&self, name: &str) -> String {
        let mut out = format!("{name}:\n  Image count: {}\n", self.count());
        if self.is_empty() {
            return out;
        }
        let dates = self.dates();
        out.push_str(&format!(
            "  Date range: {} to {}\n",
            dates.first().unwrap(),
            dates.last().unwrap()
        ));
        if let Some((min, max, mean)) = self.cloud_stats() {
            out.push_str(&format!(
                "  Cloud cover: {min:.1}% - {max:.1}% (mean: {mean:.1}%)\n"
            ));
        }
        out.push_str("  Acquisition dates:\n");
        for date in dates.iter().take(10) {
            out.push_str(&format!("    - {date}\n"));
        }
        if dates.len() > 10 {
            out.push_str(&format!("    ... and {} more\n", dates.len() - 10));
        }
        out
    }
}

/// Query Sentinel-2 SR scenes under the configured scene-level cloud ceiling.
pub fn search_sentinel2(
    service: &dyn ImageService,
    params: &AnalysisParams,
) -> Result<SceneCollection> {
    let query = SceneQuery::new(
        S2_COLLECTION,
        params.region(),
        params.start_date,
        params.end_date,
    )
    .max_cloud_percent(params.max_scene_cloud_percent);

    let scenes = service.search_scenes(&query)?;
    info!(
        count = scenes.len(),
        collection = S2_COLLECTION,
        "retrieved Sentinel-2 collection"
    );
    Ok(SceneCollection { query, scenes })
}

/// Query the s2cloudless probability collection over the same filters
/// (no cloud ceiling; the classifier covers every scene it was run on).
pub fn search_cloud_probability(
    service: &dyn ImageService,
    params: &AnalysisParams,
) -> Result<SceneCollection> {
    let query = SceneQuery::new(
        S2_CLOUDLESS_COLLECTION,
        params.region(),
        params.start_date,
        params.end_date,
    );
    let scenes = service.search_scenes(&query)?;
    info!(count = scenes.len(), "retrieved s2cloudless collection");
    Ok(SceneCollection { query, scenes })
}

/// Query Sentinel-1 GRD (IW, VV+VH) as the cloud-independent backup used by
/// the info report.
pub fn search_sentinel1(
    service: &dyn ImageService,
    params: &AnalysisParams,
    orbit_pass: &str,
) -> Result<SceneCollection> {
    let query = SceneQuery::new(
        S1_COLLECTION,
        params.region(),
        params.start_date,
        params.end_date,
    )
    .filter(PropertyFilter::Eq {
        name: "instrumentMode".to_string(),
        value: "IW".to_string(),
    })
    .filter(PropertyFilter::ListContains {
        name: "transmitterReceiverPolarisation".to_string(),
        value: "VV".to_string(),
    })
    .filter(PropertyFilter::ListContains {
        name: "transmitterReceiverPolarisation".to_string(),
        value: "VH".to_string(),
    })
    .filter(PropertyFilter::Eq {
        name: "orbitProperties_pass".to_string(),
        value: orbit_pass.to_string(),
    });

    let scenes = service.search_scenes(&query)?;
    info!(count = scenes.len(), orbit = orbit_pass, "retrieved Sentinel-1 collection");
    Ok(SceneCollection { query, scenes })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene(id: &str, date: (i32, u32, u32), cloud: Option<f64>) -> SceneMeta {
        SceneMeta {
            id: id.to_string(),
            acquired: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            cloudy_pixel_percentage: cloud,
        }
    }

    fn collection(scenes: Vec<SceneMeta>) -> SceneCollection {
        let query = SceneQuery::new(
            S2_COLLECTION,
            crate::types::Region::circle(-1.8, -80.7, 5000),
            NaiveDate::from_ymd_opt(2025, 10, 22).unwrap(),
            NaiveDate::from_ymd_opt(2026, 1, 22).unwrap(),
        )
        .max_cloud_percent(70.0);
        SceneCollection { query, scenes }
    }

    #[test]
    fn empty_collection_is_a_hard_error() {
        let empty = collection(vec![]);
        let err = empty.require_scenes().unwrap_err();
        match err {
            Error::NoScenes {
                max_cloud_percent, ..
            } => assert_eq!(max_cloud_percent, 70.0),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn dates_are_distinct_and_sorted() {
        let coll = collection(vec![
            scene("b", (2025, 11, 20), Some(30.0)),
            scene("a", (2025, 11, 8), Some(10.0)),
            scene("c", (2025, 11, 20), Some(50.0)),
        ]);
        assert_eq!(
            coll.dates(),
            vec![
                NaiveDate::from_ymd_opt(2025, 11, 8).unwrap(),
                NaiveDate::from_ymd_opt(2025, 11, 20).unwrap(),
            ]
        );
        let (min, max, mean) = coll.cloud_stats().unwrap();
        assert_eq!(min, 10.0);
        assert_eq!(max, 50.0);
        assert!((mean - 30.0).abs() < 1e-9);
    }

    #[test]
    fn summary_mentions_count_and_range() {
        let coll = collection(vec![scene("a", (2025, 11, 8), Some(10.0))]);
        let text = coll.summary("Sentinel-2");
        assert!(text.contains("Image count: 1"));
        assert!(text.contains("2025-11-08"));
    }
}

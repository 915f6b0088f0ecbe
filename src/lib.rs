#![doc = r#"
soilscan — satellite-based soil quality assessment from Sentinel-2 imagery.

This crate builds cloud-free temporal composites over a region of interest,
derives spectral soil indices (NDSI, BI, BSI, clay and organic-matter proxies,
and friends), summarizes them as per-region statistics, and exports GeoTIFF
products. All pixel math is expressed as lazy computation descriptions and
evaluated remotely by a geoprocessing service; the crate itself never holds
raster data. It powers the soilscan CLI and can be embedded in your own Rust
applications.

Authentication
--------------
The REST service backend reads its configuration from the environment:

- `GEE_PROJECT` — cloud project id (defaults to a trial project)
- `GEE_KEY_FILE` — path to a service-account JSON key
- `GEE_SERVICE_ACCOUNT` — optional service-account email override

Add dependency
--------------
```toml
[dependencies]
soilscan = "0.1"
```

Quick start: run the full pipeline
----------------------------------
```rust,no_run
use soilscan::{
    run_pipeline, AnalysisParams, Credentials, PipelineOptions, RestService,
};

fn main() -> soilscan::Result<()> {
    let params = AnalysisParams::default();
    let credentials = Credentials::from_env()?;
    let service = RestService::connect(&credentials)?;

    let report = run_pipeline(&params, &service, &PipelineOptions::default())?;
    if let Some(stats) = &report.statistics {
        println!("{}", stats.report("my field"));
    }
    Ok(())
}
```

Customizing the analysis
------------------------
```rust,no_run
use chrono::NaiveDate;
use soilscan::{AnalysisParams, SoilIndex};

let mut params = AnalysisParams::default();
params.latitude = 4.5;
params.longitude = -74.1;
params.buffer_m = 2_000;
params.start_date = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
params.end_date = NaiveDate::from_ymd_opt(2025, 9, 1).unwrap();
params.indices = vec![SoilIndex::Ndvi, SoilIndex::ClayIndex, SoilIndex::SomIndex];
```

Evaluating formulas locally
---------------------------
Index formulas are plain expression trees and can be evaluated against any
band lookup, which is how the crate's own tests pin their semantics:

```rust
use soilscan::types::SoilIndex;

let ndvi = SoilIndex::Ndvi.formula();
let value = ndvi.eval(&|band| match band {
    "B8" => Some(3000.0),
    "B4" => Some(1000.0),
    _ => None,
});
assert_eq!(value, Some(0.5));
```

Error handling
--------------
All public functions return `soilscan::Result<T>`; match on `soilscan::Error`
to handle specific cases, e.g. missing imagery or authentication failures.

```rust,no_run
use soilscan::{run_pipeline, AnalysisParams, Error, PipelineOptions, Credentials, RestService};

fn main() {
    let params = AnalysisParams::default();
    let service = Credentials::from_env()
        .and_then(|c| RestService::connect(&c))
        .expect("auth");
    match run_pipeline(&params, &service, &PipelineOptions::default()) {
        Ok(report) => println!("{} scenes", report.scene_count),
        Err(Error::NoScenes { .. }) => eprintln!("no imagery; widen the date range"),
        Err(other) => eprintln!("error: {other}"),
    }
}
```

Useful modules
--------------
- [`api`] — high-level, ergonomic entry points.
- [`types`] — enums and core types (e.g. `Band`, `SoilIndex`, `Region`).
- [`core`] — the parameter set and the pipeline stages.
- [`service`] — the `ImageService` trait and the REST backend.
- [`error`] — crate-level `Error` and `Result`.
"#]

pub mod api;
pub mod core;
pub mod error;
pub mod service;
pub mod types;

// Curated public API surface
pub use core::params::{AnalysisParams, ExportParams};
pub use error::{Error, Result};
pub use types::{
    Band, CompositeMethod, ExportDestination, ExportProduct, JobState, PixelType, Region,
    SoilIndex,
};

pub use service::{Credentials, ImageService, JobOutcome, JobResult, PollOptions, RestService};

pub use api::{
    collection_info, run_pipeline, CollectionInfo, PipelineOptions, PipelineReport,
};

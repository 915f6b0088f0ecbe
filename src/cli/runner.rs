use tracing::info;

use soilscan::api::{collection_info, run_pipeline, PipelineOptions};
use soilscan::core::params::AnalysisParams;
use soilscan::service::{Credentials, ImageService, RestService};
use soilscan::Error;

use super::args::CliArgs;
use super::errors::AppError;

/// Merge CLI overrides into the default parameters, validating ranges.
fn build_params(args: &CliArgs) -> Result<AnalysisParams, AppError> {
    let mut params = AnalysisParams::default();

    if let Some(lat) = args.lat {
        if !(-90.0..=90.0).contains(&lat) {
            return Err(AppError::InvalidOverride {
                arg: "--lat",
                value: lat.to_string(),
            });
        }
        params.latitude = lat;
    }
    if let Some(lon) = args.lon {
        if !(-180.0..=180.0).contains(&lon) {
            return Err(AppError::InvalidOverride {
                arg: "--lon",
                value: lon.to_string(),
            });
        }
        params.longitude = lon;
    }
    if let Some(buffer) = args.buffer {
        if buffer == 0 {
            return Err(AppError::InvalidOverride {
                arg: "--buffer",
                value: buffer.to_string(),
            });
        }
        params.buffer_m = buffer;
    }
    if let Some(start) = args.start_date {
        params.start_date = start;
    }
    if let Some(end) = args.end_date {
        params.end_date = end;
    }
    if params.start_date >= params.end_date {
        return Err(AppError::InvalidOverride {
            arg: "--start-date/--end-date",
            value: format!("{} >= {}", params.start_date, params.end_date),
        });
    }
    if let Some(threshold) = args.cloud_threshold {
        if threshold > 100 {
            return Err(AppError::InvalidOverride {
                arg: "--cloud-threshold",
                value: threshold.to_string(),
            });
        }
        params.cloud_probability_threshold = threshold;
    }
    if let Some(ceiling) = args.max_scene_cloud {
        if !(0.0..=100.0).contains(&ceiling) {
            return Err(AppError::InvalidOverride {
                arg: "--max-scene-cloud",
                value: ceiling.to_string(),
            });
        }
        params.max_scene_cloud_percent = ceiling;
    }
    if let Some(method) = args.composite {
        params.composite_method = method;
    }
    if let Some(indices) = &args.indices {
        params.indices = indices.clone();
    }
    if let Some(scale) = args.scale {
        if scale == 0 {
            return Err(AppError::InvalidOverride {
                arg: "--scale",
                value: scale.to_string(),
            });
        }
        params.export.scale_m = scale;
    }
    Ok(params)
}

fn print_header(params: &AnalysisParams) {
    println!("SOILSCAN - satellite-based soil quality assessment");
    println!("  Location:        {}, {}", params.latitude, params.longitude);
    println!("  Buffer:          {}m radius", params.buffer_m);
    println!("  Date range:      {} to {}", params.start_date, params.end_date);
    println!("  Cloud threshold: {}%", params.cloud_probability_threshold);
    println!();
}

fn run_info_mode(params: &AnalysisParams, service: &dyn ImageService) -> Result<(), AppError> {
    let info = collection_info(params, service)?;
    println!("{}", info.sentinel2.summary("Sentinel-2"));
    println!("{}", info.sentinel1.summary("Sentinel-1 SAR"));
    println!("SUMMARY");
    println!("  Sentinel-2 images: {}", info.sentinel2.count());
    println!("  Sentinel-1 images: {}", info.sentinel1.count());
    if info.sentinel2.is_empty() {
        println!("  No Sentinel-2 images found!");
        println!("  Try adjusting date range or cloud threshold.");
    } else if info.sentinel2.count() < 5 {
        println!("  Few images available - composite may have gaps");
    } else {
        println!("  Sufficient imagery for analysis");
    }
    Ok(())
}

fn run_pipeline_mode(
    params: &AnalysisParams,
    service: &dyn ImageService,
    args: &CliArgs,
) -> Result<(), AppError> {
    let options = PipelineOptions {
        stats: !args.no_stats,
        export: args.export,
        wait: args.wait,
        ..PipelineOptions::default()
    };

    let report = match run_pipeline(params, service, &options) {
        Err(e @ Error::NoScenes { .. }) => {
            eprintln!("No imagery found for the specified parameters.");
            eprintln!("  Suggestions:");
            eprintln!("  - Extend the date range");
            eprintln!("  - Raise the scene cloud-cover ceiling (--max-scene-cloud)");
            return Err(e.into());
        }
        other => other?,
    };

    if let Some(statistics) = &report.statistics {
        let roi_name = format!("({}, {})", params.latitude, params.longitude);
        println!("{}", statistics.report(&roi_name));
    }

    println!("Results summary:");
    println!("  - Images processed: {}", report.scene_count);
    if report.dropped_scenes > 0 {
        println!("  - Scenes dropped (no classifier match): {}", report.dropped_scenes);
    }
    println!("  - Indices calculated: {}", params.indices.len());
    if !report.export_jobs.is_empty() {
        println!("  - Exports started: {}", report.export_jobs.len());
    }
    for result in &report.export_results {
        println!("  - {}: {:?}", result.job.description, result.outcome);
    }

    let failed = report.export_failures();
    if failed > 0 {
        return Err(AppError::ExportsFailed {
            failed,
            total: report.export_results.len(),
        });
    }
    Ok(())
}

pub fn run(args: CliArgs) -> Result<(), Box<dyn std::error::Error>> {
    if args.log {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "info".into()),
            )
            .init();
    }

    let params = build_params(&args)?;
    print_header(&params);

    // Auth is fatal before any stage runs.
    let credentials = Credentials::from_env()?;
    let service = RestService::connect(&credentials)?;
    info!(project = %credentials.project, "connected to geoprocessing service");

    if args.info {
        run_info_mode(&params, &service)?;
    } else {
        run_pipeline_mode(&params, &service, &args)?;
    }

    println!("Done!");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn parse(argv: &[&str]) -> CliArgs {
        CliArgs::parse_from(std::iter::once("soilscan").chain(argv.iter().copied()))
    }

    #[test]
    fn overrides_are_applied() {
        let args = parse(&["--lat", "4.5", "--lon", "-74.1", "--buffer", "2000"]);
        let params = build_params(&args).unwrap();
        assert_eq!(params.latitude, 4.5);
        assert_eq!(params.longitude, -74.1);
        assert_eq!(params.buffer_m, 2000);
    }

    #[test]
    fn negative_coordinates_parse_as_values_not_flags() {
        let args = parse(&["--lat", "-1.841927", "--lon", "-80.741419"]);
        let params = build_params(&args).unwrap();
        assert_eq!(params.latitude, -1.841927);
        assert_eq!(params.longitude, -80.741419);
    }

    #[test]
    fn out_of_range_latitude_is_rejected() {
        let args = parse(&["--lat", "120"]);
        assert!(matches!(
            build_params(&args),
            Err(AppError::InvalidOverride { arg: "--lat", .. })
        ));
    }

    #[test]
    fn inverted_date_range_is_rejected() {
        let args = parse(&["--start-date", "2026-01-22", "--end-date", "2025-10-22"]);
        assert!(build_params(&args).is_err());
    }

    #[test]
    fn index_list_parses_from_commas() {
        let args = parse(&["--indices", "ndsi,bi,clay-index"]);
        let params = build_params(&args).unwrap();
        assert_eq!(params.indices.len(), 3);
    }
}

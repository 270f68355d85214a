use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use crate::analyzers::spatial::write_summary_json;
use crate::analyzers::{RegressionFitter, SeriesSummary, SpatialAccumulator};
use crate::cli::args::{Cli, Commands};
use crate::error::Result;
use crate::models::Channel;
use crate::processors::station_matcher::extract_station_pixels;
use crate::processors::{
    ChannelCombiner, ChannelMerger, DailyMatcher, DatasetCleaner, DatasetFuser, StationMatcher,
};
use crate::readers::{FluxnetReader, LandCoverMap, ModisReader, SwathReader, TableReader};
use crate::utils::coordinates::BoundingBox;
use crate::utils::filename::{
    daily_regressions_path, modis_day_csv_path, parse_modis_day_index, station_pixels_csv_path,
};
use crate::utils::progress::ProgressReporter;
use crate::writers::csv_writer;

pub async fn run(cli: Cli) -> Result<()> {
    init_logging(cli.verbose);
    let quiet = cli.quiet;

    match cli.command {
        Commands::Combine {
            input_dir,
            data_dir,
            start_date,
            end_date,
            frequency,
            bounding_box,
        } => {
            let end = end_date.unwrap_or(start_date);
            let channels = selected_channels(frequency);

            let mut combiner = ChannelCombiner::new(&data_dir);
            if bounding_box {
                combiner = combiner.with_bounding_box(BoundingBox::study_region());
            }

            println!("Combining granules from {}", input_dir.display());
            let progress = ProgressReporter::new(
                day_count(start_date, end) * channels.len() as u64,
                "Combining daily granules...",
                quiet,
            );

            for date in date_range(start_date, end) {
                let files = collect_granules(&input_dir, date)?;
                for &channel in &channels {
                    match combiner.combine(&files, date, channel) {
                        Ok(_) => {}
                        Err(e) if !e.is_fatal() => {
                            warn!(date = %date, channel = %channel, error = %e, "skipping day")
                        }
                        Err(e) => return Err(e),
                    }
                    progress.increment(1);
                }
            }
            progress.finish_with_message("Combine complete");
        }

        Commands::Merge {
            data_dir,
            start_date,
            end_date,
        } => {
            let end = end_date.unwrap_or(start_date);
            let merger = ChannelMerger::new(&data_dir);

            let progress =
                ProgressReporter::new(day_count(start_date, end), "Merging channels...", quiet);
            let mut merged = 0usize;
            let mut skipped = 0usize;

            for date in date_range(start_date, end) {
                match merger.merge_day(date) {
                    Ok(Some(_)) => merged += 1,
                    Ok(None) => skipped += 1,
                    Err(e) if !e.is_fatal() => {
                        warn!(date = %date, error = %e, "skipping day");
                        skipped += 1;
                    }
                    Err(e) => return Err(e),
                }
                progress.increment(1);
            }
            progress.finish_with_message("Merge complete");
            println!("✅ Merged {} day(s), skipped {}", merged, skipped);
        }

        Commands::Match {
            fluxnet_file,
            coords_file,
            data_dir,
            output_dir,
            frequency,
            pass,
            start_date,
            end_date,
            window,
        } => {
            let end = end_date.unwrap_or(start_date);

            println!("Loading FLUXNET export: {}", fluxnet_file.display());
            let fluxnet = FluxnetReader::read_wide_table(&fluxnet_file)?;
            let coordinates = FluxnetReader::read_station_coordinates(&coords_file)?;
            println!(
                "Loaded {} day(s) across {} station column(s)",
                fluxnet.len(),
                fluxnet.stations().len()
            );

            let mut matcher = StationMatcher::new();
            if let Some(window) = window {
                matcher = matcher.with_window(window);
            }
            let daily = DailyMatcher::new(frequency)
                .with_pass_type(pass)
                .with_matcher(matcher);

            let summary = daily.run(
                start_date,
                end,
                &fluxnet,
                &coordinates,
                &data_dir,
                &output_dir,
            )?;
            println!(
                "✅ Matched {} day(s) ({} cached, {} skipped)",
                summary.matched_days, summary.already_cached, summary.skipped
            );
        }

        Commands::ExtractStationTb {
            input_dir,
            output_dir,
            date,
            frequency,
            tolerance,
        } => {
            let output = station_pixels_csv_path(&output_dir, date);
            if output.exists() {
                println!("⏭️ Station pixel table already exists: {}", output.display());
                return Ok(());
            }

            let mut matcher = StationMatcher::new();
            if let Some(tolerance) = tolerance {
                matcher = matcher.with_tolerance(tolerance);
            }

            let files = collect_granules(&input_dir, date)?;
            println!("Scanning {} granule(s) for station pixels", files.len());
            let matches = extract_station_pixels(&SwathReader::new(), &matcher, &files, frequency);

            if matches.is_empty() {
                println!("⚠️ No station pixels found for {}", date);
                return Ok(());
            }
            csv_writer::write_pixel_matches(&output, &matches)?;
            println!(
                "✅ Recorded {} station pixel(s) in {}",
                matches.len(),
                output.display()
            );
        }

        Commands::ExtractModis {
            input_file,
            output_dir,
            epoch_year,
            first_day,
            last_day,
        } => {
            let reader = ModisReader::new(epoch_year);
            std::fs::create_dir_all(&output_dir)?;

            let progress = ProgressReporter::new(
                (last_day.saturating_sub(first_day) + 1) as u64,
                "Extracting MODIS day slices...",
                quiet,
            );
            let mut written = 0usize;
            let mut cached = 0usize;
            let mut skipped = 0usize;

            for day in first_day..=last_day {
                let output = modis_day_csv_path(&output_dir, day);
                if output.exists() {
                    cached += 1;
                    progress.increment(1);
                    continue;
                }

                match reader.extract_day(&input_file, day) {
                    Ok(samples) if samples.is_empty() => {
                        warn!(day, "no valid LST cells, day skipped");
                        skipped += 1;
                    }
                    Ok(samples) => {
                        csv_writer::write_lst_samples(&output, &samples)?;
                        written += 1;
                    }
                    Err(e) if !e.is_fatal() => {
                        warn!(day, error = %e, "skipping day");
                        skipped += 1;
                    }
                    Err(e) => return Err(e),
                }
                progress.increment(1);
            }
            progress.finish_with_message("Extraction complete");
            println!(
                "✅ Extracted {} day(s) ({} cached, {} skipped)",
                written, cached, skipped
            );
        }

        Commands::ExtractLandCover {
            input_file,
            output_file,
        } => {
            if output_file.exists() {
                println!(
                    "⏭️ Land-cover table already exists: {}",
                    output_file.display()
                );
                return Ok(());
            }

            let rows = crate::readers::land_cover_reader::raster_to_rows(&input_file)?;
            csv_writer::write_land_cover(&output_file, &rows)?;
            println!(
                "✅ Wrote {} land-cover cells to {}",
                rows.len(),
                output_file.display()
            );
        }

        Commands::Analyze {
            modis_dir,
            output_dir,
        } => {
            let reader = TableReader::new();
            let mut day_files: Vec<PathBuf> = std::fs::read_dir(&modis_dir)?
                .filter_map(|entry| {
                    let path = entry.ok()?.path();
                    parse_modis_day_index(path.file_name()?.to_str()?).map(|_| path)
                })
                .collect();
            day_files.sort();

            let mut accumulator = SpatialAccumulator::new();
            let mut all_values = Vec::new();
            for file in &day_files {
                let samples = match reader.read_lst_table(file) {
                    Ok(samples) => samples,
                    Err(e) if !e.is_fatal() => {
                        warn!(file = %file.display(), error = %e, "skipping unreadable LST table");
                        continue;
                    }
                    Err(e) => return Err(e),
                };
                for sample in samples {
                    accumulator.add(sample.latitude, sample.longitude, sample.lst_kelvin);
                    all_values.push(sample.lst_kelvin);
                }
            }

            match SeriesSummary::from_values(all_values) {
                Some(summary) => {
                    let summary_path = output_dir.join("lst_summary.json");
                    write_summary_json(&summary_path, &summary)?;
                    println!(
                        "✅ LST summary over {} file(s): mean {:.2} K, range [{:.2}, {:.2}]",
                        day_files.len(),
                        summary.mean,
                        summary.min,
                        summary.max
                    );
                    println!("Written to {}", summary_path.display());
                }
                None => {
                    println!("⚠️ No valid LST values found under {}", modis_dir.display());
                    return Ok(());
                }
            }

            let spatial_path = output_dir.join("lst_spatial_summary.json");
            write_summary_json(&spatial_path, &accumulator.finalize())?;
            println!("✅ Spatial means written to {}", spatial_path.display());
        }

        Commands::Regress {
            matched_dir,
            output_dir,
            frequency,
            min_points,
            global,
        } => {
            let mut fitter = RegressionFitter::new();
            if let Some(min_points) = min_points {
                fitter = fitter.with_min_points(min_points);
            }

            println!("Fitting daily regressions over {}", matched_dir.display());
            let records = fitter.fit_daily(&matched_dir)?;
            let output = daily_regressions_path(&output_dir, frequency);
            csv_writer::write_daily_regressions(&output, &records)?;
            println!(
                "✅ {} daily regression(s) written to {}",
                records.len(),
                output.display()
            );

            if global {
                match RegressionFitter::for_global_fit().fit_global(&matched_dir)? {
                    Some(global_fit) => {
                        println!(
                            "Global fit ({}): T = {:.2} × TB + {:.2} (R² = {:.2}, RMSE = {:.2}, n = {})",
                            frequency,
                            global_fit.fit.slope,
                            global_fit.fit.intercept,
                            global_fit.fit.r_squared,
                            global_fit.fit.rmse,
                            global_fit.fit.n_points
                        );
                        let json_path =
                            output_dir.join(format!("global_regression_{}.json", frequency.label()));
                        write_summary_json(&json_path, &global_fit)?;
                        println!("✅ Global fit saved to {}", json_path.display());
                    }
                    None => println!("⚠️ Not enough pooled points for a global fit"),
                }
            }
        }

        Commands::Fuse {
            modis_dir,
            amsre_dir,
            land_cover,
            output_dir,
            epoch_year,
        } => {
            println!("Loading land-cover raster: {}", land_cover.display());
            let land_cover_map = LandCoverMap::from_raster(&land_cover)?;

            let fuser = DatasetFuser::new(land_cover_map, epoch_year);
            let summary = fuser.fuse_all(&modis_dir, &amsre_dir, &output_dir)?;
            println!(
                "✅ Fused {} day(s) ({} cached, {} skipped)",
                summary.fused_days, summary.already_cached, summary.skipped
            );
        }

        Commands::Clean {
            fused_dir,
            output_file,
            parquet,
        } => {
            let cleaner = DatasetCleaner::new();
            let summary = cleaner.clean(&fused_dir, &output_file, parquet.as_deref())?;
            println!(
                "✅ Cleaned training table: kept {} of {} row(s) from {} file(s)",
                summary.rows_kept, summary.rows_read, summary.files
            );
            println!("Written to {}", output_file.display());
            if let Some(parquet) = parquet {
                println!("Parquet export: {}", parquet.display());
            }
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

fn selected_channels(frequency: Option<Channel>) -> Vec<Channel> {
    match frequency {
        Some(channel) => vec![channel],
        None => vec![Channel::Ghz37, Channel::Ghz19],
    }
}

fn date_range(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    start.iter_days().take_while(move |date| *date <= end)
}

fn day_count(start: NaiveDate, end: NaiveDate) -> u64 {
    (end - start).num_days().max(0) as u64 + 1
}

/// Granules for one day: a per-date subdirectory when the downloader
/// created one, otherwise every granule in the flat input directory.
fn collect_granules(input_dir: &Path, date: NaiveDate) -> Result<Vec<PathBuf>> {
    let date_dir = input_dir.join(date.format("%Y-%m-%d").to_string());
    let dir = if date_dir.is_dir() { date_dir } else { input_dir.to_path_buf() };

    let mut files: Vec<PathBuf> = std::fs::read_dir(&dir)?
        .filter_map(|entry| {
            let path = entry.ok()?.path();
            (path.extension().and_then(|e| e.to_str()) == Some("hdf")).then_some(path)
        })
        .collect();
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_range_inclusive() {
        let start = NaiveDate::from_ymd_opt(2005, 7, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2005, 7, 3).unwrap();
        let days: Vec<NaiveDate> = date_range(start, end).collect();
        assert_eq!(days.len(), 3);
        assert_eq!(days[0], start);
        assert_eq!(days[2], end);
        assert_eq!(day_count(start, end), 3);
    }

    #[test]
    fn test_selected_channels_default_is_both() {
        assert_eq!(selected_channels(None).len(), 2);
        assert_eq!(selected_channels(Some(Channel::Ghz19)), vec![Channel::Ghz19]);
    }

    #[test]
    fn test_collect_granules_prefers_date_subdir() {
        let dir = tempfile::TempDir::new().unwrap();
        let date = NaiveDate::from_ymd_opt(2005, 7, 1).unwrap();

        std::fs::write(dir.path().join("stray_A.hdf"), "").unwrap();
        let date_dir = dir.path().join("2005-07-01");
        std::fs::create_dir(&date_dir).unwrap();
        std::fs::write(date_dir.join("granule_A.hdf"), "").unwrap();
        std::fs::write(date_dir.join("README.txt"), "").unwrap();

        let files = collect_granules(dir.path(), date).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("granule_A.hdf"));

        // Without a date subdirectory, the flat layout is used
        let other = NaiveDate::from_ymd_opt(2005, 7, 2).unwrap();
        let files = collect_granules(dir.path(), other).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("stray_A.hdf"));
    }
}

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use photo_geotag::columns::{ColumnSpec, RawColumns};
use photo_geotag::pairing;
use photo_geotag::pipeline::{RunReport, collect_photos, process_photo};
use photo_geotag::table::Table;
use photo_geotag::time::{DEFAULT_TIME_FORMAT, TimeMode};

#[derive(Parser, Debug)]
#[command(
    name = "photo-geotag",
    version,
    about = "Geotag photo directories from delimited telemetry logs — timestamps, GPS position, heading, altitude, and typed meta fields"
)]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum CliCommand {
    /// Geotag photos from a delimited telemetry table
    Process(ProcessArgs),
    /// Pair front/back fisheye images and run an external stitcher on each pair
    Stitch(StitchArgs),
}

#[derive(clap::Args, Debug)]
struct ProcessArgs {
    /// Directory of photos to geotag
    #[arg(value_name = "IMPORT_PATH")]
    import_path: PathBuf,

    /// Path to the telemetry table file
    #[arg(long, value_name = "FILE")]
    csv: PathBuf,

    /// 1-based column holding the photo filename
    #[arg(long, value_name = "N")]
    filename_column: u32,

    /// 1-based column holding the timestamp
    #[arg(long, value_name = "N")]
    timestamp_column: Option<u32>,

    /// 1-based column holding the latitude
    #[arg(long, value_name = "N")]
    latitude_column: Option<u32>,

    /// 1-based column holding the longitude
    #[arg(long, value_name = "N")]
    longitude_column: Option<u32>,

    /// 1-based column holding the camera heading in degrees
    #[arg(long, value_name = "N")]
    heading_column: Option<u32>,

    /// 1-based column holding the altitude in meters
    #[arg(long, value_name = "N")]
    altitude_column: Option<u32>,

    /// chrono format string for calendar timestamps
    #[arg(long, value_name = "FORMAT", default_value = DEFAULT_TIME_FORMAT)]
    time_format: String,

    /// Interpret timestamps as raw satellite-navigation ticks
    #[arg(long, conflicts_with = "convert_utc_time")]
    convert_gps_time: bool,

    /// Interpret timestamps as UTC epoch seconds or milliseconds
    #[arg(long)]
    convert_utc_time: bool,

    /// Field delimiter of the table file
    #[arg(long, value_name = "CHAR", default_value = ",")]
    delimiter: char,

    /// Skip the first table row as a header
    #[arg(long)]
    header: bool,

    /// Comma-separated 1-based column numbers of extra meta fields, e.g. "7,9,10"
    #[arg(long, value_name = "LIST")]
    meta_columns: Option<String>,

    /// Comma-separated names for the meta fields
    #[arg(long, value_name = "LIST")]
    meta_names: Option<String>,

    /// Comma-separated types for the meta fields (string, double, long, date, boolean)
    #[arg(long, value_name = "LIST")]
    meta_types: Option<String>,

    /// Preview the assembled records without writing to any photo
    #[arg(long)]
    dry_run: bool,

    /// Output per-photo results as JSON
    #[arg(long)]
    json: bool,
}

#[derive(clap::Args, Debug)]
struct StitchArgs {
    /// Directory of front-lens images
    #[arg(long, value_name = "DIR")]
    front: PathBuf,

    /// Directory of back-lens images
    #[arg(long, value_name = "DIR")]
    back: PathBuf,

    /// Directory the stitched images are written to
    #[arg(long, value_name = "DIR")]
    output: PathBuf,

    /// Path to the stitching executable
    #[arg(long, value_name = "FILE")]
    stitcher: PathBuf,

    /// Directory-name token of the front-lens tree
    #[arg(long, value_name = "TOKEN", default_value = pairing::DEFAULT_FRONT_TOKEN)]
    front_token: String,

    /// Directory-name token of the back-lens tree
    #[arg(long, value_name = "TOKEN", default_value = pairing::DEFAULT_BACK_TOKEN)]
    back_token: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    match cli.command {
        CliCommand::Process(args) => run_process(args),
        CliCommand::Stitch(args) => run_stitch(args),
    }
}

fn run_process(args: ProcessArgs) -> Result<()> {
    // Pre-flight: configuration problems abort before any photo is touched.
    if !args.import_path.is_dir() {
        anyhow::bail!(
            "Import directory {} does not exist",
            args.import_path.display()
        );
    }
    if !args.csv.is_file() {
        anyhow::bail!(
            "Table file {} does not exist; specify a valid path with --csv",
            args.csv.display()
        );
    }
    if !args.delimiter.is_ascii() {
        anyhow::bail!("Delimiter must be a single ASCII character");
    }

    let spec = ColumnSpec::resolve(
        &RawColumns {
            filename: args.filename_column,
            timestamp: args.timestamp_column,
            latitude: args.latitude_column,
            longitude: args.longitude_column,
            heading: args.heading_column,
            altitude: args.altitude_column,
        },
        args.meta_columns.as_deref(),
        args.meta_names.as_deref(),
        args.meta_types.as_deref(),
    )?;

    let mode = if args.convert_gps_time {
        TimeMode::GpsTicks
    } else if args.convert_utc_time {
        TimeMode::UtcEpoch
    } else {
        TimeMode::Calendar {
            format: args.time_format.clone(),
        }
    };

    let photos = collect_photos(&args.import_path);
    if photos.is_empty() {
        anyhow::bail!(
            "No images found in the import path {}",
            args.import_path.display()
        );
    }

    let table = Table::from_path(&args.csv, args.delimiter as u8, args.header)?;
    let filenames = table
        .column(spec.filename)
        .with_context(|| {
            format!(
                "filename column {} is outside the table ({} columns)",
                args.filename_column,
                table.column_count()
            )
        })?
        .to_vec();

    log::info!("Found {} image(s) to process", photos.len());
    if args.dry_run {
        log::info!("DRY RUN — no files will be modified");
    }

    let total = photos.len();
    let mut results = Vec::with_capacity(total);
    for (i, photo) in photos.iter().enumerate() {
        log::info!("[{}/{}] Processing: {}", i + 1, total, photo.display());

        let result = process_photo(photo, &table, &filenames, &spec, &mode, args.dry_run);
        if result.matched && result.error.is_none() && !result.fields_written.is_empty() {
            log::info!("  Wrote: {}", result.fields_written.join(", "));
        }
        results.push(result);
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    }

    let report = RunReport::tally(&results);
    log::info!(
        "Done: {} tagged, {} skipped (no table entry), {} failed out of {} images",
        report.tagged,
        report.skipped,
        report.failed,
        report.total()
    );

    Ok(())
}

fn run_stitch(args: StitchArgs) -> Result<()> {
    if !args.front.is_dir() {
        anyhow::bail!("Front directory {} does not exist", args.front.display());
    }
    if !args.back.is_dir() {
        anyhow::bail!("Back directory {} does not exist", args.back.display());
    }

    let jobs = pairing::pair_front_back(
        &args.front,
        &args.back,
        &args.output,
        &args.front_token,
        &args.back_token,
    );
    if jobs.is_empty() {
        anyhow::bail!("No front images with back counterparts to process");
    }

    let total = jobs.len();
    let mut failed = 0usize;
    for (i, job) in jobs.iter().enumerate() {
        log::info!(
            "[{}/{}] Stitching: {} + {}",
            i + 1,
            total,
            job.front.display(),
            job.back.display()
        );
        if let Err(e) = pairing::run_stitcher(&args.stitcher, job) {
            log::error!("  {e:#}");
            failed += 1;
        }
    }

    log::info!("Done: {} stitched, {failed} failed out of {total} pairs", total - failed);
    Ok(())
}

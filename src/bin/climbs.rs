use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueHint};
use log::info;

use climb_detector::profile::ElevationProfile;
use climb_detector::report::{format_summary, DEFAULT_TITLE};
use climb_detector::{
    detect_climbs, format_climb_table, parse_gpx_file, DetectionConfig, ParsedRoute, RouteReport,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Detect and categorise climbs in GPX routes", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Detect climbs and print the summary and climb table
    Detect(DetectArgs),
    /// Match third-party segments along a route
    Segments(SegmentsArgs),
}

#[derive(Parser, Debug)]
struct DetectArgs {
    /// GPX file to analyse
    #[arg(value_hint = ValueHint::FilePath)]
    input: PathBuf,

    /// Gradient (%) a step must exceed to start a climb
    #[arg(long, default_value_t = 3.0)]
    min_gradient: f64,

    /// Minimum elevation gain (m) of a reported climb
    #[arg(long, default_value_t = 20.0)]
    min_gain: f64,

    /// Minimum length (km) of a reported climb
    #[arg(long, default_value_t = 0.3)]
    min_distance: f64,

    /// Print the JSON report instead of text
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,

    /// Write an SVG elevation profile
    #[arg(long, value_hint = ValueHint::FilePath)]
    svg: Option<PathBuf>,

    /// Write a PNG elevation profile
    #[arg(long, value_hint = ValueHint::FilePath)]
    png: Option<PathBuf>,

    /// Plot and report title
    #[arg(long, default_value = DEFAULT_TITLE)]
    title: String,

    /// JSON object of climb display names keyed by 0-based climb position
    #[arg(long, value_hint = ValueHint::FilePath)]
    names: Option<PathBuf>,

    /// Debug logging
    #[arg(long, action = ArgAction::SetTrue)]
    verbose: bool,
}

#[derive(Parser, Debug)]
struct SegmentsArgs {
    /// GPX file to analyse
    #[arg(value_hint = ValueHint::FilePath)]
    input: PathBuf,

    /// OAuth access token for the segment service
    #[arg(long)]
    token: String,

    /// Debug logging
    #[arg(long, action = ArgAction::SetTrue)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let verbose = match &cli.command {
        Command::Detect(args) => args.verbose,
        Command::Segments(args) => args.verbose,
    };
    let default_level = if verbose { "debug" } else { "info" };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .try_init();

    match cli.command {
        Command::Detect(args) => handle_detect(args),
        Command::Segments(args) => handle_segments(args),
    }
}

fn load_route(path: &Path) -> Result<ParsedRoute> {
    parse_gpx_file(path).with_context(|| format!("failed to parse {}", path.display()))
}

fn load_names(path: &Path) -> Result<BTreeMap<usize, String>> {
    let text =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("{} is not a JSON object of names", path.display()))
}

fn handle_detect(args: DetectArgs) -> Result<()> {
    let config = DetectionConfig::new(args.min_gradient, args.min_gain)
        .with_min_distance_km(args.min_distance);
    config.validate()?;

    let route = load_route(&args.input)?;
    let climbs = detect_climbs(&route.distance_km, &route.elevation_m, &config)?;
    info!(
        "{}: {} points, {} climbs",
        args.input.display(),
        route.len(),
        climbs.len()
    );

    let names = match &args.names {
        Some(path) => load_names(path)?,
        None => BTreeMap::new(),
    };

    if args.svg.is_some() || args.png.is_some() {
        let profile = ElevationProfile::new(&route.distance_km, &route.elevation_m, &climbs)
            .with_names(&names)
            .with_title(args.title.clone());
        if let Some(path) = &args.svg {
            let svg = profile.to_svg()?;
            fs::write(path, svg).with_context(|| format!("failed to write {}", path.display()))?;
            info!("SVG profile written to {}", path.display());
        }
        if let Some(path) = &args.png {
            let png = profile.to_png()?;
            fs::write(path, png).with_context(|| format!("failed to write {}", path.display()))?;
            info!("PNG profile written to {}", path.display());
        }
    }

    let report = RouteReport::new(route.summary(), climbs)
        .with_title(args.title)
        .with_names(names);

    if args.json {
        println!("{}", report.to_json()?);
        return Ok(());
    }

    println!("{}\n", report.title);
    print!("{}", format_summary(&report.summary));
    println!();
    if report.climbs.is_empty() {
        println!("No climbs detected.");
    } else {
        print!("{}", format_climb_table(&report.table()));
    }
    Ok(())
}

#[cfg(feature = "http")]
fn handle_segments(args: SegmentsArgs) -> Result<()> {
    use climb_detector::{SegmentCache, SegmentClient, Settings};

    let settings = Settings::from_env()?;
    let route = load_route(&args.input)?;
    let cache = SegmentCache::open(&settings.cache_db)
        .with_context(|| format!("failed to open cache {}", settings.cache_db))?;
    let client = SegmentClient::new(&args.token, cache, &settings)?;

    let runtime = tokio::runtime::Runtime::new().context("failed to start runtime")?;
    let matches = runtime.block_on(client.discover_matching_segments(&route, &settings))?;

    if matches.is_empty() {
        println!("No matching segments.");
        return Ok(());
    }
    for m in &matches {
        let category = m
            .climb_category
            .map(|c| c.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:>12}  {:<40}  cat {:>2}  overlap {:>3.0}%  points {}-{}",
            m.segment_id,
            m.name,
            category,
            m.overlap_fraction * 100.0,
            m.start_index,
            m.end_index
        );
    }
    Ok(())
}

#[cfg(not(feature = "http"))]
fn handle_segments(_args: SegmentsArgs) -> Result<()> {
    anyhow::bail!("segment matching needs the `http` feature (rebuild with --features http)")
}

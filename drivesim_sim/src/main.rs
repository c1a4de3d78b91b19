//! drivesim CLI
//!
//! Drives a simulated vehicle from a named place to a searched destination
//! and reports the trip.

use anyhow::{bail, Context, Result};
use clap::Parser;
use drivesim_core::{generator_for, Route, RouteStrategy, SimulationConfig};
use drivesim_env::{Coordinate, DriveContext, LocationProvider, TokioContext};
use drivesim_sim::{
    Gazetteer, HarnessError, ManualContext, NoisyLocationFeed, SimHarness, StraightLineDirections,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, Level};
use tracing_subscriber::FmtSubscriber;

/// Number of GPS fixes emitted by the noisy feed.
const GPS_FIXES: usize = 5;

#[derive(Parser, Debug)]
#[command(name = "drivesim")]
#[command(about = "Simulate a vehicle driving to a destination", long_about = None)]
struct Args {
    /// Destination to search for
    #[arg(short, long, default_value = "Times Square")]
    destination: String,

    /// Named place the device starts at
    #[arg(short, long, default_value = "Central Park")]
    from: String,

    /// Route strategy (interpolated, service)
    #[arg(short = 'S', long)]
    strategy: Option<RouteStrategy>,

    /// Points in an interpolated route
    #[arg(short, long)]
    points: Option<usize>,

    /// Playback tick interval in milliseconds
    #[arg(long)]
    tick_ms: Option<u64>,

    /// Vertex spacing of the directions service in metres
    #[arg(long, default_value = "100")]
    spacing: f64,

    /// Follow the wall clock instead of a virtual one
    #[arg(long)]
    realtime: bool,

    /// Standard deviation of simulated GPS noise in metres (0 = exact fixes)
    #[arg(long, default_value = "0")]
    gps_noise: f64,

    /// Seed for GPS noise
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// JSON config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print events as JSON lines
    #[arg(long)]
    json: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// List known places and exit
    #[arg(long)]
    list_places: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    let gazetteer = Gazetteer::new_york();
    if args.list_places {
        for name in gazetteer.names() {
            println!("{}", name);
        }
        return Ok(());
    }

    let config = load_config(&args)?;
    let origin = gazetteer
        .lookup(&args.from)
        .with_context(|| format!("Unknown starting place: {}", args.from))?;

    let directions = Arc::new(StraightLineDirections::new(args.spacing));
    let routes = generator_for(&config, Some(directions));
    let geocoder = Arc::new(gazetteer);
    let feed = (args.gps_noise > 0.0)
        .then(|| NoisyLocationFeed::new(origin, args.gps_noise, GPS_FIXES, args.seed));
    let locations = feed.as_ref().map(|f| f as &dyn LocationProvider);

    info!(
        "drivesim: {} -> {} ({} route, {}ms ticks)",
        args.from,
        args.destination,
        config.strategy.name(),
        config.tick_interval_ms
    );

    if args.realtime {
        let mut harness = SimHarness::launch(
            TokioContext::shared(),
            config.clone(),
            geocoder,
            routes,
            locations,
        );
        prepare(&mut harness, origin, &args.destination, args.json).await?;
        let path = harness.play_in_real_time().await?;
        report(&harness, &path, &config, args.json)?;
        harness.shutdown().await;
    } else {
        let mut harness = SimHarness::launch(
            ManualContext::shared(),
            config.clone(),
            geocoder,
            routes,
            locations,
        );
        prepare(&mut harness, origin, &args.destination, args.json).await?;
        let path = harness.play_to_completion().await?;
        report(&harness, &path, &config, args.json)?;
        harness.shutdown().await;
    }

    Ok(())
}

/// Applies the config file and CLI overrides.
fn load_config(args: &Args) -> Result<SimulationConfig> {
    let mut config = match &args.config {
        Some(path) => SimulationConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => SimulationConfig::default(),
    };

    if let Some(strategy) = args.strategy {
        config.strategy = strategy;
    }
    if let Some(points) = args.points {
        config.fallback_point_count = points;
    }
    if let Some(tick_ms) = args.tick_ms {
        config.tick_interval_ms = tick_ms;
    }
    config.validate()?;

    debug!(?config, "configuration");
    Ok(config)
}

/// Places the device at `origin` and loads a route to `destination`.
async fn prepare<C: DriveContext>(
    harness: &mut SimHarness<C>,
    origin: Coordinate,
    destination: &str,
    json: bool,
) -> Result<()> {
    harness.handle.update_location(origin)?;
    match harness.search(destination).await {
        Ok(start) => {
            info!("Route loaded, starting at {}", start);
            Ok(())
        }
        Err(HarnessError::RouteUnavailable(issue)) => {
            if json {
                println!("{}", serde_json::json!({ "issue": issue }));
            }
            error!("✗ {}", issue);
            bail!("no route to {}", destination)
        }
        Err(e) => Err(e.into()),
    }
}

fn report<C: DriveContext>(
    harness: &SimHarness<C>,
    path: &[Coordinate],
    config: &SimulationConfig,
    json: bool,
) -> Result<()> {
    if json {
        for event in harness.log() {
            println!("{}", serde_json::to_string(event)?);
        }
        return Ok(());
    }

    let trip = Route::from_polyline(path.iter().copied());
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("✓ Trip complete");
    info!("  points visited: {}", trip.len());
    info!("  distance:       {:.0} m", trip.length_meters());
    // One tick per point after the first, plus the tick that ends playback
    info!("  timer ticks:    {}", path.len());
    info!("  elapsed:        {:.1} s", harness.context.now().as_secs_f64());
    if let Some(region) = trip.bounding_region(config.route_padding) {
        info!(
            "  map framing:    centre {} span {:.4}° x {:.4}°",
            region.center, region.span.latitude_delta, region.span.longitude_delta
        );
    }
    Ok(())
}

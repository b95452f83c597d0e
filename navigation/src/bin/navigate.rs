use std::{fs::File, io::BufWriter, path::PathBuf, sync::Arc, time::Duration};

use chrono::Utc;
use clap::Parser;
use navigation::{
    config::{poll_interval, NavigationConfig},
    gpx_export,
    pedestrian::PedestrianClient,
    replay::GpxReplaySource,
    session::{drive, NavigationSession},
    tracking::LocationPoller,
    RoutePlan,
};
use shared::api::RouteGenerationResponse;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Walk a generated route by replaying a recorded GPX track"
)]
struct Args {
    /// Route plan as returned by `POST /walk/ai/request`
    #[arg(long)]
    plan: PathBuf,

    /// GPX track replayed as the device location, one point per poll
    #[arg(long)]
    track: PathBuf,

    /// Polling interval in milliseconds (overrides NAV_POLL_INTERVAL_MS)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    poll_ms: Option<u64>,

    /// Write the last fetched route polyline to this GPX file
    #[arg(long)]
    export: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "navigation=info,navigate=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let mut config = NavigationConfig::from_env()?;
    if let Some(ms) = args.poll_ms {
        config.tracking.interval = poll_interval("--poll-ms", ms)?;
    }

    let response: RouteGenerationResponse =
        serde_json::from_reader(File::open(&args.plan).map(std::io::BufReader::new)?)?;
    let plan = RoutePlan::try_from(response)?;
    tracing::info!(
        "loaded route \"{}\" with {} waypoints from {:?}",
        plan.title,
        plan.waypoints.len(),
        args.plan
    );

    let source = Arc::new(GpxReplaySource::open(&args.track)?);
    let client = Arc::new(PedestrianClient::from_config(&config.routing)?);
    let mut session = NavigationSession::new(&plan, client, config.window);

    session.start_timer(Instant::now());
    if let Err(err) = session.begin().await {
        tracing::warn!("initial route unavailable: {}", err.user_message());
    }

    let poller = LocationPoller::start(source.clone(), config.tracking);
    let shutdown = CancellationToken::new();
    tokio::spawn(stop_when_done(
        source,
        config.tracking.interval,
        shutdown.clone(),
    ));

    let outcome = drive(&mut session, poller.subscribe(), shutdown).await;
    poller.stop();
    tracing::info!("navigation finished: {outcome:?}");

    let frame = session.map_frame();
    tracing::info!("{}", frame.status);

    let summary = session.end_navigation(Instant::now(), Utc::now());
    println!("{}", serde_json::to_string_pretty(&summary)?);

    if let Some(path) = args.export {
        let writer = BufWriter::new(File::create(&path)?);
        gpx_export::write_route(writer, &plan.title, &frame.path, &summary.waypoints)?;
        tracing::info!("route written to {path:?}");
    }

    Ok(())
}

/// Cancels `shutdown` on Ctrl-C, or one interval after the replay ran out.
async fn stop_when_done(
    source: Arc<GpxReplaySource>,
    interval: Duration,
    shutdown: CancellationToken,
) {
    let exhausted = async {
        while !source.is_exhausted() {
            tokio::time::sleep(interval).await;
        }
        tokio::time::sleep(interval).await;
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => tracing::info!("interrupted"),
        _ = exhausted => tracing::info!("replay track exhausted"),
    }
    shutdown.cancel();
}

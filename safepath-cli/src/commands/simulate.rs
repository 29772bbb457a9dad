//! Simulate command - scripted planning session against the simulated
//! planner.
//!
//! Plans a route between two fixed demo places, waits for the prefetch
//! scheduler to warm the other travel modes, then switches modes to
//! show the cache answering without a network fetch. Useful for
//! demonstrating and smoke-testing the whole stack end to end.

use std::sync::Arc;
use std::time::Duration;

use clap::{Args, ValueEnum};
use tracing::debug;

use safepath::app::{AppConfig, SafePathApp};
use safepath::config::ConfigFile;
use safepath::route::{Place, Route, RouteOptions, TravelMode};
use safepath::telemetry::MemorySink;

use crate::error::CliError;

/// Travel mode selection for CLI arguments.
#[derive(Debug, Clone, Copy, PartialEq, ValueEnum)]
pub enum ModeArg {
    /// Public transit
    Transit,
    /// Walking
    Walking,
    /// Biking
    Biking,
    /// Driving
    Driving,
}

impl From<ModeArg> for TravelMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Transit => TravelMode::Transit,
            ModeArg::Walking => TravelMode::Walking,
            ModeArg::Biking => TravelMode::Biking,
            ModeArg::Driving => TravelMode::Driving,
        }
    }
}

/// Arguments for the simulate command.
#[derive(Debug, Args)]
pub struct SimulateArgs {
    /// Travel mode for the first query
    #[arg(long, value_enum, default_value = "transit")]
    pub mode: ModeArg,

    /// Travel mode for the follow-up query (answered from prefetch)
    #[arg(long, value_enum, default_value = "walking")]
    pub switch_to: ModeArg,

    /// Drop the connection before the follow-up query
    #[arg(long)]
    pub offline: bool,

    /// Avoid highways
    #[arg(long)]
    pub avoid_highways: bool,

    /// Avoid toll roads
    #[arg(long)]
    pub avoid_tolls: bool,

    /// Prefer wheelchair-accessible routes
    #[arg(long)]
    pub accessible: bool,

    /// Skip persisting the cache snapshot on exit
    #[arg(long)]
    pub no_persist: bool,

    /// Artificial planner latency in milliseconds
    #[arg(long)]
    pub latency_ms: Option<u64>,
}

/// Run the simulate command.
pub async fn run(args: SimulateArgs) -> Result<(), CliError> {
    let file = ConfigFile::load().unwrap_or_default();
    let mut config = AppConfig::from_config_file(&file);
    if args.no_persist {
        config.persist = false;
    }
    if let Some(ms) = args.latency_ms {
        config.simulated_latency = Duration::from_millis(ms);
    }

    // Long enough for the prefetch batch to settle before we report on it.
    let settle = config.simulated_latency + Duration::from_millis(250);

    let sink = Arc::new(MemorySink::new());
    let app = SafePathApp::start_with_sink(config, sink.clone()).await?;
    let cache = app.cache();

    println!("SafePath Route Simulation v{}", safepath::VERSION);
    println!("================================");
    println!();

    let home = Place::new("home", "Home", 52.5200, 13.4050);
    let school = Place::new("school", "Lincoln Elementary", 52.5500, 13.4700);
    println!("Origin:      {}", home);
    println!("Destination: {}", school);
    println!("Distance:    {:.1} km", home.distance_km(&school));
    println!();

    let mode: TravelMode = args.mode.into();
    let options = RouteOptions::default()
        .with_travel_mode(mode)
        .with_avoid_highways(args.avoid_highways)
        .with_avoid_tolls(args.avoid_tolls)
        .with_accessibility_mode(args.accessible);

    println!("Planning {} route...", mode);
    let routes = app
        .select_route(Some(home.clone()), Some(school.clone()), options.clone())
        .await;
    print_routes(&routes);
    println!();

    debug!(settle_ms = settle.as_millis() as u64, "Waiting for prefetch");
    tokio::time::sleep(settle).await;
    println!(
        "Cache holds {} entries after prefetching the other modes.",
        cache.len()
    );
    println!();

    if args.offline {
        println!("Going offline.");
        app.set_online(false);
        println!();
    }

    let switched: TravelMode = args.switch_to.into();
    let fetches_before = cache.counter().value();
    println!("Switching to {}...", switched);
    let routes = app
        .select_route(
            Some(home.clone()),
            Some(school.clone()),
            options.for_mode(switched),
        )
        .await;
    print_routes(&routes);
    let from_cache = cache.counter().value() == fetches_before;
    println!(
        "Answered from cache: {}",
        if from_cache { "yes" } else { "no" }
    );
    println!();

    println!("Network fetches this session: {}", cache.counter().value());

    app.shutdown().await;

    println!();
    println!("Telemetry ({} events)", sink.len());
    println!("---------------------");
    for event in sink.events() {
        println!("  {}  {}", event.ts.format("%H:%M:%S%.3f"), event.name());
    }

    Ok(())
}

fn print_routes(routes: &[Route]) {
    if routes.is_empty() {
        println!("  (no routes)");
        return;
    }
    for route in routes {
        println!(
            "  {}  dep {}  arr {}  ({} min)",
            route.id, route.departure, route.arrival, route.total_duration
        );
        for step in &route.steps {
            println!(
                "    {:11} {} -> {} ({} min)",
                step.kind.as_str(),
                step.from,
                step.to,
                step.duration
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_arg_maps_to_travel_mode() {
        assert_eq!(TravelMode::from(ModeArg::Transit), TravelMode::Transit);
        assert_eq!(TravelMode::from(ModeArg::Walking), TravelMode::Walking);
        assert_eq!(TravelMode::from(ModeArg::Biking), TravelMode::Biking);
        assert_eq!(TravelMode::from(ModeArg::Driving), TravelMode::Driving);
    }
}

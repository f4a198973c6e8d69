//! # shuttle_sim: service binary
//!
//! ## Startup Sequence
//!
//! 1. Load the route catalog (`--routes`, default `data/routes.json`).
//! 2. Spawn the simulation engine.
//! 3. Connect to NATS and forward engine events to `{prefix}.events.*`.
//! 4. Serve control requests until the connection closes or Ctrl-C.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use shuttle_net::subjects::{DEFAULT_PREFIX, Subjects};
use shuttle_net::{NatsConnection, WireFormat};
use shuttle_route::StaticCatalog;
use shuttle_sim::{ControlApi, Engine, NatsBridge, SimConfig};

#[derive(Parser)]
#[command(name = "shuttle_sim", about = "College shuttle position simulator over NATS")]
struct Args {
    /// Route catalog (JSON)
    #[arg(short, long, env = "SHUTTLE_ROUTES", default_value = "data/routes.json")]
    routes: PathBuf,

    /// NATS server URL
    #[arg(short, long, env = "NATS_URL", default_value = shuttle_net::connection::DEFAULT_NATS_URL)]
    nats_url: String,

    /// NATS subject prefix
    #[arg(short, long, env = "SHUTTLE_PREFIX", default_value = DEFAULT_PREFIX)]
    prefix: String,

    /// Milliseconds between simulation ticks
    #[arg(long, env = "SHUTTLE_TICK_PERIOD_MS", default_value_t = 5000)]
    tick_period_ms: u64,

    /// Ticks to travel from one stop to the next
    #[arg(long, env = "SHUTTLE_TICKS_PER_SEGMENT", default_value_t = 5)]
    ticks_per_segment: u32,

    /// Nominal minutes per stop for ETA estimates
    #[arg(long, env = "SHUTTLE_MINUTES_PER_STOP", default_value_t = 3.0)]
    minutes_per_stop: f64,

    /// Events buffered per observer before the oldest are dropped
    #[arg(long, env = "SHUTTLE_BROADCAST_CAPACITY", default_value_t = 64)]
    broadcast_capacity: usize,

    /// Event payload encoding: json or msgpack
    #[arg(long, env = "SHUTTLE_WIRE_FORMAT", default_value = "json")]
    wire_format: WireFormat,
}

impl Args {
    fn sim_config(&self) -> SimConfig {
        SimConfig::default()
            .with_tick_period(Duration::from_millis(self.tick_period_ms))
            .with_ticks_per_segment(self.ticks_per_segment)
            .with_minutes_per_stop(self.minutes_per_stop)
            .with_broadcast_capacity(self.broadcast_capacity)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("shuttle_sim=info".parse()?))
        .init();

    let args = Args::parse();
    info!("shuttle simulator starting");

    let catalog = StaticCatalog::load(&args.routes)
        .with_context(|| format!("loading routes from {}", args.routes.display()))?;

    let config = args.sim_config();
    info!(
        tick_period_ms = config.tick_period.as_millis() as u64,
        ticks_per_segment = config.ticks_per_segment,
        minutes_per_stop = config.minutes_per_stop,
        "engine configured"
    );
    let engine = Engine::spawn(Arc::new(catalog), config);

    info!(url = %args.nats_url, "connecting to NATS");
    let conn = NatsConnection::connect_to(&args.nats_url).await?;
    info!("connected to NATS");

    let subjects = Subjects::new(args.prefix.clone());
    let bridge = NatsBridge::new(subjects.clone(), args.wire_format);
    tokio::spawn(bridge.run(conn.clone(), engine.subscribe()));

    let api = ControlApi::new(engine);
    tokio::select! {
        result = api.serve(&conn, &subjects) => {
            if let Err(e) = result {
                error!(%e, "control surface failed");
                return Err(e.into());
            }
            info!("NATS connection closed");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("interrupt received");
        }
    }

    info!("shuttle simulator shut down");
    Ok(())
}

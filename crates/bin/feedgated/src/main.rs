//! # feedgated — feedgate daemon
//!
//! Composition root that wires the adapters together and runs the
//! gateway loop.
//!
//! ## Responsibilities
//! - Load configuration (`feedgate.toml`, env overrides)
//! - Initialize tracing
//! - Load and validate the compiled automation script (fatal on failure)
//! - Spawn the HTTP fan-out worker, the feed client, the console
//!   listener and the script timers
//! - Run the single-threaded gateway reactor loop until terminated
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no domain logic belongs here.

mod config;
mod gateway;

use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use feedgate_adapter_http::HttpFanout;
use feedgate_adapter_net::{console, feed};
use feedgate_domain::script::Script;

use crate::config::Config;
use crate::gateway::{Gateway, GatewayChannels, GatewayDispatcher, spawn_timers};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let config = Config::load()?;

    tracing_subscriber::registry()
        .with(EnvFilter::new(&config.logging.filter))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let script = Script::load(&config.script.path)?;
    tracing::info!(
        path = %config.script.path,
        entries = script.entries.len(),
        templates = script.templates.len(),
        requests = script.requests.len(),
        "automation script loaded"
    );

    let http = HttpFanout::spawn(&config.targets)?;
    let target_names = http.target_names().to_vec();

    let (feed_tx, feed_rx) = mpsc::unbounded_channel();
    let feed_handle = feed::spawn(config.feed.clone(), feed_tx);

    let (console_tx, console_rx) = mpsc::unbounded_channel();
    if config.control.enabled {
        console::spawn(config.control.clone(), console_tx);
    }

    let (raw_tx, raw_rx) = mpsc::unbounded_channel();
    let (tick_tx, tick_rx) = mpsc::unbounded_channel();
    spawn_timers(&script.timer_intervals(), tick_tx);

    let dispatcher = GatewayDispatcher::new(http, raw_tx);
    let mut gateway = Gateway::new(
        script,
        dispatcher,
        feed_handle,
        target_names,
        config.dump.path.clone(),
        std::time::Duration::from_millis(config.feed.response_timeout_ms),
    );
    gateway.restore_tables();

    gateway
        .run(GatewayChannels {
            feed_signals: feed_rx,
            console_signals: console_rx,
            raw_requests: raw_rx,
            timer_ticks: tick_rx,
        })
        .await;

    Ok(())
}

use clap::Parser;
use tracing::Level;

use dockwatch::config::{Cli, Config};
use dockwatch::metrics::influx::InfluxSink;
use dockwatch::metrics::recorder::{Recorder, report_loop};
use dockwatch::server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = Config::from_cli(Cli::parse())?;

    let level = if cfg.debug { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_max_level(level)
        .init();

    if cfg.debug {
        tracing::debug!("Debug mode enabled");
    }

    let sink = InfluxSink::new(cfg.influx.clone())?;
    let (recorder, events) = Recorder::channel();
    tokio::spawn(report_loop(sink, events));

    tokio::select! {
        res = server::listener::run(&cfg, recorder) => {
            res?;
        }

        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}

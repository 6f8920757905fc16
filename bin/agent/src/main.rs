use clap::Parser;
use color_eyre::eyre;
use mongo_statsd_agent::config::{Config, MongoHostConfig};
use mongo_statsd_agent::Scheduler;
use std::path::PathBuf;
use std::time::Duration;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Options {
    #[arg(
        short = 'c',
        long = "config",
        env = "MONGO_STATSD_CONFIG",
        help = "Path to YAML config file"
    )]
    pub config_path: PathBuf,
    #[arg(long = "interval", help = "Publish interval in seconds")]
    pub interval_secs: Option<u64>,
    #[arg(long = "endpoint", help = "MongoDB endpoint (host:port), repeatable")]
    pub endpoints: Vec<String>,
}

fn setup_telemetry() {
    let fmt_layer = tracing_subscriber::fmt::Layer::new()
        .compact()
        .with_ansi(atty::is(atty::Stream::Stdout))
        .with_writer(std::io::stdout);
    let env_filter = tracing_subscriber::filter::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| {
            tracing_subscriber::filter::EnvFilter::new("mongo_statsd=info,mongo_statsd_agent=info")
        });
    let subscriber = tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter);
    tracing::subscriber::set_global_default(subscriber).unwrap();
}

/// Blocks until one of the termination signals arrives. All three request
/// the same graceful shutdown.
async fn shutdown_signal() -> &'static str {
    let mut interrupt =
        signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");
    let mut terminate =
        signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    let mut quit = signal(SignalKind::quit()).expect("failed to install SIGQUIT handler");
    tokio::select! {
        _ = interrupt.recv() => "SIGINT",
        _ = terminate.recv() => "SIGTERM",
        _ = quit.recv() => "SIGQUIT",
    }
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    setup_telemetry();

    let options = Options::parse();

    let mut config = Config::from_file(&options.config_path)?;
    if let Some(secs) = options.interval_secs {
        config.interval = Some(Duration::from_secs(secs).into());
    }
    if !options.endpoints.is_empty() {
        config.mongodb.hosts = options
            .endpoints
            .iter()
            .map(|endpoint| MongoHostConfig {
                endpoint: endpoint.clone(),
            })
            .collect();
    }
    config.validate()?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        let sig = shutdown_signal().await;
        warn!("received {sig}");
        info!("initiate graceful shutdown");
        shutdown_tx.send(true).unwrap();
    });

    Scheduler::from_config(&config).start(shutdown_rx).await?;
    Ok(())
}

use color_eyre::eyre;
use duration_string::DurationString;
use regex::Regex;
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(10);

lazy_static::lazy_static! {
    /// statsd key segments must stay clear of the protocol's delimiters.
    static ref NAMESPACE_SEGMENT_REGEX: Regex = Regex::new(r"^[0-9a-zA-Z_-]{1,63}$").unwrap();
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MongoHostConfig {
    pub endpoint: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MongoConfig {
    pub hosts: Vec<MongoHostConfig>,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StatsdConfig {
    pub host: String,
    pub port: u16,
    pub env: String,
    pub cluster: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Config {
    pub interval: Option<DurationString>,
    pub mongodb: MongoConfig,
    pub statsd: StatsdConfig,
}

impl Config {
    pub fn from_file(path: impl AsRef<std::path::Path>) -> eyre::Result<Self> {
        let file = std::fs::OpenOptions::new().read(true).open(path)?;
        let reader = std::io::BufReader::new(file);
        Self::from_reader(reader)
    }

    pub fn from_reader(reader: impl std::io::BufRead) -> eyre::Result<Self> {
        let config = serde_yaml::from_reader(reader)?;
        Ok(config)
    }

    pub fn interval(&self) -> Duration {
        self.interval
            .clone()
            .map(Into::into)
            .unwrap_or(DEFAULT_INTERVAL)
    }

    /// Startup-time validation. Nothing here is recoverable at runtime, so
    /// the binary refuses to start on any failure.
    pub fn validate(&self) -> eyre::Result<()> {
        if self.mongodb.hosts.is_empty() {
            eyre::bail!("no mongodb hosts configured");
        }
        for host in &self.mongodb.hosts {
            if host.endpoint.is_empty() {
                eyre::bail!("empty mongodb endpoint");
            }
        }
        if self.statsd.host.is_empty() {
            eyre::bail!("no statsd host configured");
        }
        if self.statsd.port == 0 {
            eyre::bail!("invalid statsd port: 0");
        }
        if !NAMESPACE_SEGMENT_REGEX.is_match(&self.statsd.env) {
            eyre::bail!("invalid statsd env segment: {:?}", self.statsd.env);
        }
        if let Some(cluster) = &self.statsd.cluster {
            if !cluster.is_empty() && !NAMESPACE_SEGMENT_REGEX.is_match(cluster) {
                eyre::bail!("invalid statsd cluster segment: {cluster:?}");
            }
        }
        Ok(())
    }
}

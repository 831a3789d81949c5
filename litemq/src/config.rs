use anyhow::{Context as _, Result};
use clap::Parser;
use log::{info, warn};
use serde_derive::Deserialize;
use std::path::Path;

pub const DEFAULT_CONFIG_FILE: &str = "litemq.toml";
pub const DEFAULT_LISTEN: &str = "0.0.0.0:42090";

#[derive(Debug, Parser)]
#[command(name = "litemq", version, about = "Lightweight in-memory message queue server")]
pub struct CliConfig {
    /// Path to the config file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<String>,
    /// Address of the queue protocol listener, overrides the config file
    #[arg(long, value_name = "ADDR")]
    pub listen: Option<String>,
    /// Port of the queue protocol listener, overrides the port of the listen address
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub network: Network,
    pub dequeue: Dequeue,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Network {
    pub listen: String,
    /// Admin HTTP API listen address, the API is disabled if it is not set.
    pub http_listen: Option<String>,
}

impl Default for Network {
    fn default() -> Self {
        Network {
            listen: DEFAULT_LISTEN.to_string(),
            http_listen: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Dequeue {
    /// Upper limit of a dequeue wait in milliseconds, 0 means unlimited.
    pub max_timeout_ms: u32,
}

pub fn cli() -> CliConfig {
    CliConfig::parse()
}

pub fn parse_config(path: &str) -> Result<Config> {
    let cfg = std::fs::read_to_string(path).with_context(|| format!("Cannot read config file {path}"))?;

    from_toml(&cfg)
}

pub fn from_toml(cfg: &str) -> Result<Config> {
    Ok(toml::from_str(cfg)?)
}

/// Build the config from the file and the command line overrides. A missing default config file
/// means built-in defaults, a missing explicitly given one is an error.
pub fn load(cli: &CliConfig) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => parse_config(path)?,
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => parse_config(DEFAULT_CONFIG_FILE)?,
        None => {
            warn!("No config file found, using defaults");

            Config::default()
        }
    };

    apply_overrides(&mut config, cli);

    info!("Config {:?}", config);

    Ok(config)
}

fn apply_overrides(config: &mut Config, cli: &CliConfig) {
    if let Some(listen) = &cli.listen {
        config.network.listen = listen.clone();
    }

    if let Some(port) = cli.port {
        config.network.listen = match config.network.listen.rsplit_once(':') {
            Some((host, _)) => format!("{host}:{port}"),
            None => format!("{}:{port}", config.network.listen),
        };
    }
}

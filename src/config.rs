use anyhow::{Context, Result};
use serde::Deserialize;
use std::{fs, net::SocketAddr, path::PathBuf};

pub const DEFAULT_MODEL_PATH: &str = "linear_regression_model.json";
pub const DEFAULT_OPENF1_BASE_URL: &str = "https://api.openf1.org/v1";

/// Process configuration, read once at startup and never mutated afterwards.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ServiceConfig {
    pub bind_addr: SocketAddr,
    pub model_path: PathBuf,
    pub openf1_base_url: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 5000)),
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            openf1_base_url: DEFAULT_OPENF1_BASE_URL.to_string(),
        }
    }
}

impl ServiceConfig {
    /// Reads a JSON config file. Keys left out keep their defaults.
    pub fn load(path: &str) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read config at {}", path))?;
        serde_json::from_str(&data).with_context(|| format!("invalid config JSON in {}", path))
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// `PITWALL_CONFIG` names an optional JSON file; `BIND_ADDR`, `PORT`,
    /// `MODEL_PATH` and `OPENF1_BASE_URL` override whatever it sets.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = match lookup("PITWALL_CONFIG") {
            Some(path) => Self::load(&path)?,
            None => Self::default(),
        };

        if let Some(addr) = lookup("BIND_ADDR") {
            cfg.bind_addr = addr
                .parse()
                .with_context(|| format!("BIND_ADDR is not a socket address: {}", addr))?;
        }
        if let Some(port) = lookup("PORT") {
            let port: u16 = port
                .parse()
                .with_context(|| format!("PORT is not a valid port: {}", port))?;
            cfg.bind_addr.set_port(port);
        }
        if let Some(path) = lookup("MODEL_PATH") {
            cfg.model_path = PathBuf::from(path);
        }
        if let Some(url) = lookup("OPENF1_BASE_URL") {
            cfg.openf1_base_url = url;
        }
        Ok(cfg)
    }
}

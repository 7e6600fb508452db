//! Process configuration, read once from the environment at startup and
//! injected read-only into the components that need it.

use anyhow::Context;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// HTTP listen port. Env `PORT`, default 8080.
    pub port: u16,
    /// HS256 signing key for bearer tokens. Env `JWT_SECRET`, required.
    pub jwt_secret: String,
    /// Root folder for per-workspace blob storage. Env `STORAGE_LOCATION`, default `_storage`.
    pub storage_location: PathBuf,
    /// Path of the policy-graph snapshot file. Env `GRAPH_SNAPSHOT`,
    /// default `<storage>/.policy-graph.json`.
    pub snapshot_path: PathBuf,
    /// Seconds between background ticket sweeps. Env `SWEEP_INTERVAL_SEC`, default 60.
    pub sweep_interval_secs: u64,
    /// Seconds between graph snapshot saves. Env `SNAPSHOT_INTERVAL_SEC`, default 30.
    pub snapshot_interval_secs: u64,
    /// Optional SMTP endpoint for account mail notifications.
    pub smtp_host: Option<String>,
    pub smtp_port: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let jwt_secret = std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?;
        let port = match std::env::var("PORT") {
            Ok(v) => v.parse::<u16>().context("PORT must be a valid port number")?,
            Err(_) => 8080,
        };
        let storage_location =
            PathBuf::from(std::env::var("STORAGE_LOCATION").unwrap_or_else(|_| "_storage".into()));
        let snapshot_path = std::env::var("GRAPH_SNAPSHOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| storage_location.join(".policy-graph.json"));
        let sweep_interval_secs = std::env::var("SWEEP_INTERVAL_SEC")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(60);
        let snapshot_interval_secs = std::env::var("SNAPSHOT_INTERVAL_SEC")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(30);
        let smtp_host = std::env::var("SMTP_HOST").ok().filter(|s| !s.is_empty());
        let smtp_port = std::env::var("SMTP_PORT").ok().filter(|s| !s.is_empty());
        Ok(Self {
            port,
            jwt_secret,
            storage_location,
            snapshot_path,
            sweep_interval_secs,
            snapshot_interval_secs,
            smtp_host,
            smtp_port,
        })
    }

    /// Configuration for tests: everything rooted under the given directory.
    pub fn for_root(root: impl Into<PathBuf>, jwt_secret: impl Into<String>) -> Self {
        let storage_location = root.into();
        let snapshot_path = storage_location.join(".policy-graph.json");
        Self {
            port: 0,
            jwt_secret: jwt_secret.into(),
            storage_location,
            snapshot_path,
            sweep_interval_secs: 60,
            snapshot_interval_secs: 30,
            smtp_host: None,
            smtp_port: None,
        }
    }
}

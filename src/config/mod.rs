//! Typed configuration from environment variables.
//!
//! Loads once at startup and fails fast on malformed values. Command-line
//! flags override whatever is read here.

use std::path::PathBuf;

use crate::error::{Error, Result};

pub const DEFAULT_OVERLAY: &str = "/var/db/repos/bbugyi";
pub const DEFAULT_REPOLOGY_URL: &str = "https://repology.org/api/v1/";
pub const DEFAULT_MAX_WORKERS: usize = 3;

#[derive(Debug, Clone)]
pub struct Config {
    /// Root of the portage overlay to scan.
    pub overlay_dir: PathBuf,
    /// Upper bound on concurrent package checks. 1 means sequential.
    pub max_workers: usize,
    pub repology_url: String,
    /// Command used to query installed versions.
    pub eix: String,
    pub otel_endpoint: Option<String>,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            overlay_dir: PathBuf::from(DEFAULT_OVERLAY),
            max_workers: DEFAULT_MAX_WORKERS,
            repology_url: DEFAULT_REPOLOGY_URL.to_string(),
            eix: "eix".to_string(),
            otel_endpoint: None,
            log_level: "warn".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Call `dotenvy::dotenv().ok()` first to pick up a local `.env`.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            overlay_dir: std::env::var("EBVCHECK_OVERLAY")
                .map(PathBuf::from)
                .unwrap_or(defaults.overlay_dir),
            max_workers: match std::env::var("EBVCHECK_MAX_WORKERS") {
                Ok(raw) => parse_max_workers(&raw)?,
                Err(_) => defaults.max_workers,
            },
            repology_url: std::env::var("EBVCHECK_REPOLOGY_URL").unwrap_or(defaults.repology_url),
            eix: std::env::var("EBVCHECK_EIX").unwrap_or(defaults.eix),
            otel_endpoint: std::env::var("OTEL_ENDPOINT").ok(),
            log_level: std::env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
        })
    }
}

/// Parse a worker count, which must be a positive integer.
pub fn parse_max_workers(raw: &str) -> Result<usize> {
    match raw.trim().parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err(Error::Config(format!(
            "max worker count must be a positive integer, got {raw:?}"
        ))),
    }
}

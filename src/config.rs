use anyhow::{Context, Result, anyhow, bail};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::adsb_lol_client::Observer;

/// Runtime configuration.
///
/// Built from defaults, optionally overlaid by a TOML file, then overridden
/// by environment variables (`DB_PATH`, `POLL_SECONDS`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub db_path: PathBuf,
    pub me_lat: f64,
    pub me_lon: f64,
    pub radius_nm: f64,
    pub poll_seconds: u64,
    pub event_window_minutes: u64,
    pub reclassify_interval_seconds: u64,
    pub reclassify_batch_size: u32,
    pub lookup_timeout_seconds: u64,
    pub feed_timeout_seconds: u64,
    pub feed_url: String,
    pub reference_url: String,
    pub web_interface: String,
    pub web_port: u16,
    pub metrics_port: Option<u16>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("data/flight_log.db"),
            me_lat: 42.7077,
            me_lon: -83.0315,
            radius_nm: 50.0,
            poll_seconds: 12,
            event_window_minutes: 20,
            reclassify_interval_seconds: 30,
            reclassify_batch_size: 250,
            lookup_timeout_seconds: 8,
            feed_timeout_seconds: 10,
            feed_url: "https://api.adsb.lol/v2/closest".to_string(),
            reference_url: "https://api.adsbdb.com/v0".to_string(),
            web_interface: "0.0.0.0".to_string(),
            web_port: 8080,
            metrics_port: None,
        }
    }
}

fn parse_var<T>(name: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|e| anyhow!("Invalid value for {}: '{}' ({})", name, value, e))
}

impl Config {
    /// Load configuration from an optional TOML file and the process environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML file; keys it leaves out keep their defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents =
            std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
        let config: Config =
            toml::from_str(&contents).with_context(|| format!("Failed to parse {:?}", path))?;
        Ok(config)
    }

    /// Override fields from environment-style variables supplied by `lookup`
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("DB_PATH") {
            self.db_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("ME_LAT") {
            self.me_lat = parse_var("ME_LAT", &v)?;
        }
        if let Some(v) = lookup("ME_LON") {
            self.me_lon = parse_var("ME_LON", &v)?;
        }
        if let Some(v) = lookup("RADIUS_NM") {
            self.radius_nm = parse_var("RADIUS_NM", &v)?;
        }
        if let Some(v) = lookup("POLL_SECONDS") {
            self.poll_seconds = parse_var("POLL_SECONDS", &v)?;
        }
        if let Some(v) = lookup("EVENT_WINDOW_MINUTES") {
            self.event_window_minutes = parse_var("EVENT_WINDOW_MINUTES", &v)?;
        }
        if let Some(v) = lookup("RECLASSIFY_INTERVAL_SECONDS") {
            self.reclassify_interval_seconds = parse_var("RECLASSIFY_INTERVAL_SECONDS", &v)?;
        }
        if let Some(v) = lookup("RECLASSIFY_BATCH_SIZE") {
            self.reclassify_batch_size = parse_var("RECLASSIFY_BATCH_SIZE", &v)?;
        }
        if let Some(v) = lookup("LOOKUP_TIMEOUT_SECONDS") {
            self.lookup_timeout_seconds = parse_var("LOOKUP_TIMEOUT_SECONDS", &v)?;
        }
        if let Some(v) = lookup("FEED_TIMEOUT_SECONDS") {
            self.feed_timeout_seconds = parse_var("FEED_TIMEOUT_SECONDS", &v)?;
        }
        if let Some(v) = lookup("FEED_URL") {
            self.feed_url = v;
        }
        if let Some(v) = lookup("REFERENCE_URL") {
            self.reference_url = v;
        }
        if let Some(v) = lookup("WEB_INTERFACE") {
            self.web_interface = v;
        }
        if let Some(v) = lookup("WEB_PORT") {
            self.web_port = parse_var("WEB_PORT", &v)?;
        }
        if let Some(v) = lookup("METRICS_PORT") {
            self.metrics_port = if v.trim().is_empty() {
                None
            } else {
                Some(parse_var("METRICS_PORT", &v)?)
            };
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.event_window_minutes == 0 {
            bail!("EVENT_WINDOW_MINUTES must be greater than zero");
        }
        if self.poll_seconds == 0 {
            bail!("POLL_SECONDS must be greater than zero");
        }
        if self.reclassify_interval_seconds == 0 {
            bail!("RECLASSIFY_INTERVAL_SECONDS must be greater than zero");
        }
        if self.reclassify_batch_size == 0 {
            bail!("RECLASSIFY_BATCH_SIZE must be greater than zero");
        }
        if !(1..=9).contains(&self.lookup_timeout_seconds) {
            bail!(
                "LOOKUP_TIMEOUT_SECONDS must be between 1 and 9, got {}",
                self.lookup_timeout_seconds
            );
        }
        if !(1..=10).contains(&self.feed_timeout_seconds) {
            bail!(
                "FEED_TIMEOUT_SECONDS must be between 1 and 10, got {}",
                self.feed_timeout_seconds
            );
        }
        if !(-90.0..=90.0).contains(&self.me_lat) || !(-180.0..=180.0).contains(&self.me_lon) {
            bail!("ME_LAT/ME_LON out of range: {}, {}", self.me_lat, self.me_lon);
        }
        if self.radius_nm <= 0.0 {
            bail!("RADIUS_NM must be positive, got {}", self.radius_nm);
        }
        Ok(())
    }

    pub fn event_window(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.event_window_minutes as i64)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_seconds)
    }

    pub fn reclassify_interval(&self) -> Duration {
        Duration::from_secs(self.reclassify_interval_seconds)
    }

    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_secs(self.lookup_timeout_seconds)
    }

    pub fn feed_timeout(&self) -> Duration {
        Duration::from_secs(self.feed_timeout_seconds)
    }

    pub fn observer(&self) -> Observer {
        Observer {
            latitude: self.me_lat,
            longitude: self.me_lon,
            radius_nm: self.radius_nm,
        }
    }

    pub fn web_address(&self) -> String {
        format!("{}:{}", self.web_interface, self.web_port)
    }
}

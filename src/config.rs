use std::{collections::HashMap, path::PathBuf, str::FromStr, time::Duration};

use anyhow::{Context, Result};
use chrono_tz::Tz;

use crate::sensors::DeviceRole;

// ---------------------------------------------------------------------------
// HubMode
// ---------------------------------------------------------------------------

/// How sensor readings reach the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HubMode {
    /// Live capability snapshots plus change listeners.
    Push,
    /// Latest insight-log entry per capability, polled on the sensor tick.
    Pull,
}

impl FromStr for HubMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "push" => Ok(Self::Push),
            "pull" => Ok(Self::Pull),
            other => Err(anyhow::anyhow!("unknown hub mode: {other:?}")),
        }
    }
}

// ---------------------------------------------------------------------------
// ForecastProviderKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForecastProviderKind {
    DarkSky,
    Weatherbit,
}

impl ForecastProviderKind {
    pub fn default_base_url(self) -> &'static str {
        match self {
            Self::DarkSky => "https://api.darksky.net",
            Self::Weatherbit => "https://api.weatherbit.io",
        }
    }
}

impl FromStr for ForecastProviderKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "darksky" => Ok(Self::DarkSky),
            "weatherbit" => Ok(Self::Weatherbit),
            other => Err(anyhow::anyhow!("unknown weather provider: {other:?}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Lang
// ---------------------------------------------------------------------------

/// Display language for weekday names and the "today" label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lang {
    De,
    En,
}

impl Lang {
    pub fn code(self) -> &'static str {
        match self {
            Self::De => "de",
            Self::En => "en",
        }
    }
}

impl FromStr for Lang {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "de" => Ok(Self::De),
            "en" => Ok(Self::En),
            other => Err(anyhow::anyhow!("unsupported language: {other:?}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub hub_base_url: String,
    pub hub_token: String,
    pub hub_mode: HubMode,
    /// Maps device role → hub device ID.
    /// Format: `"id1:indoor,id2:outdoor"`.
    pub hub_devices: HashMap<DeviceRole, String>,
    pub hub_watch_interval_secs: u64,
    pub hub_timeout_secs: u64,

    pub weather_provider: ForecastProviderKind,
    pub weather_api_key: String,
    pub weather_base_url: String,
    /// Prefix prepended verbatim to the provider URL, e.g. a CORS relay.
    pub weather_proxy_url: String,
    pub weather_timeout_secs: u64,
    pub latitude: f64,
    pub longitude: f64,

    pub tz: Tz,
    pub lang: Lang,
    pub time_interval_secs: u64,
    pub sensor_interval_secs: u64,
    pub forecast_interval_secs: u64,
    pub forecast_days: usize,
    pub forecast_skip_today: bool,
    pub icon_mapping_path: Option<PathBuf>,
    pub assets_dir: Option<PathBuf>,

    pub server_host: String,
    pub server_port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let weather_provider: ForecastProviderKind = optional("WEATHER_PROVIDER", "darksky")
            .parse()
            .context("WEATHER_PROVIDER must be 'darksky' or 'weatherbit'")?;

        let hub_devices = parse_device_roles(&required("HUB_DEVICES")?)?;
        for role in [DeviceRole::Indoor, DeviceRole::Outdoor] {
            if !hub_devices.contains_key(&role) {
                anyhow::bail!("HUB_DEVICES has no entry for the {role} device");
            }
        }

        Ok(Self {
            hub_base_url: required("HUB_BASE_URL")?,
            hub_token: required("HUB_TOKEN")?,
            hub_mode: optional("HUB_MODE", "push")
                .parse()
                .context("HUB_MODE must be 'push' or 'pull'")?,
            hub_devices,
            hub_watch_interval_secs: positive("HUB_WATCH_INTERVAL_SECS", "5")?,
            hub_timeout_secs: positive("HUB_TIMEOUT_SECS", "10")?,

            weather_provider,
            weather_api_key: required("WEATHER_API_KEY")?,
            weather_base_url: optional("WEATHER_BASE_URL", weather_provider.default_base_url()),
            weather_proxy_url: optional("WEATHER_PROXY_URL", ""),
            weather_timeout_secs: positive("WEATHER_TIMEOUT_SECS", "10")?,
            latitude: required("LATITUDE")?
                .parse()
                .context("LATITUDE must be a decimal number")?,
            longitude: required("LONGITUDE")?
                .parse()
                .context("LONGITUDE must be a decimal number")?,

            tz: optional("DASHBOARD_TZ", "Europe/Berlin")
                .parse::<Tz>()
                .map_err(|e| anyhow::anyhow!("DASHBOARD_TZ is not a valid IANA time zone: {e}"))?,
            lang: optional("DASHBOARD_LANG", "de")
                .parse()
                .context("DASHBOARD_LANG must be 'de' or 'en'")?,
            time_interval_secs: positive("TIME_INTERVAL_SECS", "10")?,
            sensor_interval_secs: positive("SENSOR_INTERVAL_SECS", "60")?,
            forecast_interval_secs: positive("FORECAST_INTERVAL_SECS", "300")?,
            forecast_days: optional("FORECAST_DAYS", "5")
                .parse()
                .context("FORECAST_DAYS must be a non-negative integer")?,
            forecast_skip_today: optional("FORECAST_SKIP_TODAY", "false")
                .parse()
                .context("FORECAST_SKIP_TODAY must be 'true' or 'false'")?,
            icon_mapping_path: std::env::var("ICON_MAPPING_PATH").ok().map(PathBuf::from),
            assets_dir: std::env::var("ASSETS_DIR").ok().map(PathBuf::from),

            server_host: optional("SERVER_HOST", "0.0.0.0"),
            server_port: optional("SERVER_PORT", "8080")
                .parse()
                .context("SERVER_PORT must be a valid port number")?,
        })
    }

    pub fn time_interval(&self) -> Duration {
        Duration::from_secs(self.time_interval_secs)
    }

    pub fn sensor_interval(&self) -> Duration {
        Duration::from_secs(self.sensor_interval_secs)
    }

    pub fn forecast_interval(&self) -> Duration {
        Duration::from_secs(self.forecast_interval_secs)
    }

    /// Index of the first forecast entry shown.
    pub fn forecast_offset(&self) -> usize {
        usize::from(self.forecast_skip_today)
    }
}

/// Parse `"id1:role1,id2:role2"` into a `HashMap<DeviceRole, String>`.
///
/// Returns an error immediately if any entry is malformed, names an
/// unrecognised role, or assigns the same role twice.
fn parse_device_roles(raw: &str) -> Result<HashMap<DeviceRole, String>> {
    let mut roles = HashMap::new();
    for entry in raw.split(',').filter(|s| !s.is_empty()) {
        let (id, role) = entry.split_once(':').with_context(|| {
            format!("HUB_DEVICES entry must be 'device_id:role', got: {entry:?}")
        })?;
        let role = role
            .trim()
            .parse::<DeviceRole>()
            .with_context(|| format!("unknown device role in HUB_DEVICES entry {entry:?}"))?;
        if roles.insert(role, id.trim().to_owned()).is_some() {
            anyhow::bail!("HUB_DEVICES assigns the {role} role more than once");
        }
    }
    Ok(roles)
}

fn required(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("missing required env var: {key}"))
}

fn optional(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

/// Intervals and timeouts; zero would make `tokio::time::interval` panic.
fn positive(key: &str, default: &str) -> Result<u64> {
    parse_positive(key, &optional(key, default))
}

fn parse_positive(key: &str, raw: &str) -> Result<u64> {
    let v: u64 = raw
        .trim()
        .parse()
        .with_context(|| format!("{key} must be a positive integer"))?;
    if v == 0 {
        anyhow::bail!("{key} must be greater than zero");
    }
    Ok(v)
}

pub mod darksky;
pub mod weatherbit;

use std::{future::Future, time::Duration};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use reqwest::{header, Client};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::{Config, ForecastProviderKind};

pub use darksky::DarkSkyClient;
pub use weatherbit::WeatherbitClient;

/// One day of forecast, normalised across providers.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyForecast {
    pub timestamp: DateTime<Utc>,
    /// Provider-specific icon code, resolved through `IconMapping`.
    pub icon: String,
    pub temperature_min: f64,
    pub temperature_max: f64,
    /// Relative humidity as a fraction in `0..=1`.
    pub humidity: f64,
    /// Precipitation probability as a fraction in `0..=1`.
    pub precip_probability: f64,
    /// Lunation fraction in `0..=1` (0 = new moon, 0.5 = full moon).
    pub moon_phase: Option<f64>,
}

/// Forecast as returned by one poll. Days are in provider order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ForecastDocument {
    pub days: Vec<DailyForecast>,
    pub location: Option<String>,
}

/// Anything that can produce a forecast on demand.
pub trait ForecastSource: Send + Sync + 'static {
    fn fetch_forecast(&self) -> impl Future<Output = Result<ForecastDocument>> + Send;
}

/// The provider selected at startup.
#[derive(Debug, Clone)]
pub enum WeatherClient {
    DarkSky(DarkSkyClient),
    Weatherbit(WeatherbitClient),
}

impl WeatherClient {
    pub fn new(config: &Config) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.weather_timeout_secs))
            .build()
            .context("Failed to build weather HTTP client")?;

        Ok(match config.weather_provider {
            ForecastProviderKind::DarkSky => Self::DarkSky(DarkSkyClient::new(http, config)),
            ForecastProviderKind::Weatherbit => {
                Self::Weatherbit(WeatherbitClient::new(http, config))
            }
        })
    }
}

impl ForecastSource for WeatherClient {
    async fn fetch_forecast(&self) -> Result<ForecastDocument> {
        match self {
            Self::DarkSky(c) => c.fetch_forecast().await,
            Self::Weatherbit(c) => c.fetch_forecast().await,
        }
    }
}

/// Issue the provider GET and decode the body.
///
/// `proxy` is prepended verbatim, so a relay of the form
/// `https://relay.example/` sees the full provider URL as its path.
pub(crate) async fn get_json<T: DeserializeOwned>(
    http: &Client,
    proxy: &str,
    url: &str,
    provider: &'static str,
) -> Result<T> {
    let full_url = format!("{proxy}{url}");
    debug!(provider, "Requesting forecast");

    let bytes = http
        .get(&full_url)
        .header(header::CACHE_CONTROL, "no-cache")
        .send()
        .await
        .with_context(|| format!("{provider} forecast request failed"))?
        .error_for_status()
        .with_context(|| format!("{provider} forecast endpoint returned error status"))?
        .bytes()
        .await
        .with_context(|| format!("Failed to read {provider} forecast response body"))?;

    serde_json::from_slice::<T>(&bytes)
        .with_context(|| format!("Failed to deserialize {provider} forecast response"))
}

/// Seconds since the epoch → UTC timestamp.
pub(crate) fn from_unix(secs: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0).with_context(|| format!("timestamp out of range: {secs}"))
}

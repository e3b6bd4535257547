//! Dark Sky forecast API.
//!
//! `GET {base}/forecast/{key}/{lat},{lon}?units=ca`; temperatures in °C,
//! humidity and precipitation probability already fractions.

use anyhow::Result;
use reqwest::Client;
use serde::Deserialize;

use super::{from_unix, get_json, DailyForecast, ForecastDocument, ForecastSource};
use crate::config::Config;

#[derive(Debug, Deserialize)]
pub struct DarkSkyResponse {
    pub daily: DarkSkyDaily,
}

#[derive(Debug, Deserialize)]
pub struct DarkSkyDaily {
    #[serde(default)]
    pub data: Vec<DarkSkyDay>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DarkSkyDay {
    /// Unix seconds at local midnight.
    pub time: i64,
    pub icon: String,
    pub temperature_min: f64,
    pub temperature_max: f64,
    pub humidity: f64,
    pub precip_probability: f64,
    pub moon_phase: Option<f64>,
}

impl TryFrom<DarkSkyResponse> for ForecastDocument {
    type Error = anyhow::Error;

    fn try_from(resp: DarkSkyResponse) -> Result<Self> {
        let days = resp
            .daily
            .data
            .into_iter()
            .map(|d| {
                Ok(DailyForecast {
                    timestamp: from_unix(d.time)?,
                    icon: d.icon,
                    temperature_min: d.temperature_min,
                    temperature_max: d.temperature_max,
                    humidity: d.humidity,
                    precip_probability: d.precip_probability,
                    moon_phase: d.moon_phase,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        // Dark Sky only reports an IANA zone, not a place name.
        Ok(Self {
            days,
            location: None,
        })
    }
}

#[derive(Debug, Clone)]
pub struct DarkSkyClient {
    http: Client,
    proxy: String,
    url: String,
}

impl DarkSkyClient {
    pub fn new(http: Client, config: &Config) -> Self {
        Self::from_parts(
            http,
            &config.weather_proxy_url,
            &config.weather_base_url,
            &config.weather_api_key,
            config.latitude,
            config.longitude,
        )
    }

    pub fn from_parts(
        http: Client,
        proxy: &str,
        base_url: &str,
        api_key: &str,
        latitude: f64,
        longitude: f64,
    ) -> Self {
        let url = format!(
            "{}/forecast/{}/{},{}?units=ca",
            base_url.trim_end_matches('/'),
            api_key,
            latitude,
            longitude
        );
        Self {
            http,
            proxy: proxy.to_owned(),
            url,
        }
    }
}

impl ForecastSource for DarkSkyClient {
    async fn fetch_forecast(&self) -> Result<ForecastDocument> {
        let resp: DarkSkyResponse = get_json(&self.http, &self.proxy, &self.url, "darksky").await?;
        ForecastDocument::try_from(resp)
    }
}

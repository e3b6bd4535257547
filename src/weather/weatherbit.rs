//! Weatherbit daily forecast API (v2.0).
//!
//! `rh` and `pop` arrive as percentages and are normalised to fractions.

use anyhow::Result;
use reqwest::Client;
use serde::Deserialize;

use super::{from_unix, get_json, DailyForecast, ForecastDocument, ForecastSource};
use crate::config::Config;

/// Upper bound of the `days` parameter accepted by the daily endpoint.
const MAX_FORECAST_DAYS: usize = 16;

#[derive(Debug, Deserialize)]
pub struct WeatherbitResponse {
    #[serde(default)]
    pub data: Vec<WeatherbitDay>,
    #[serde(default)]
    pub city_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WeatherbitDay {
    /// Unix seconds.
    pub ts: i64,
    pub weather: WeatherbitCondition,
    pub max_temp: f64,
    pub min_temp: f64,
    /// Relative humidity, percent.
    pub rh: f64,
    /// Probability of precipitation, percent.
    pub pop: f64,
    #[serde(default)]
    pub moon_phase_lunation: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct WeatherbitCondition {
    pub icon: String,
}

impl TryFrom<WeatherbitResponse> for ForecastDocument {
    type Error = anyhow::Error;

    fn try_from(resp: WeatherbitResponse) -> Result<Self> {
        let days = resp
            .data
            .into_iter()
            .map(|d| {
                Ok(DailyForecast {
                    timestamp: from_unix(d.ts)?,
                    icon: d.weather.icon,
                    temperature_min: d.min_temp,
                    temperature_max: d.max_temp,
                    humidity: d.rh / 100.0,
                    precip_probability: d.pop / 100.0,
                    moon_phase: d.moon_phase_lunation,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            days,
            location: resp.city_name,
        })
    }
}

#[derive(Debug, Clone)]
pub struct WeatherbitClient {
    http: Client,
    proxy: String,
    url: String,
}

impl WeatherbitClient {
    pub fn new(http: Client, config: &Config) -> Self {
        Self::from_parts(
            http,
            &config.weather_proxy_url,
            &config.weather_base_url,
            &config.weather_api_key,
            config.lang.code(),
            config.forecast_offset() + config.forecast_days,
            config.latitude,
            config.longitude,
        )
    }

    pub fn from_parts(
        http: Client,
        proxy: &str,
        base_url: &str,
        api_key: &str,
        lang: &str,
        days: usize,
        latitude: f64,
        longitude: f64,
    ) -> Self {
        let days = days.clamp(1, MAX_FORECAST_DAYS);
        let url = format!(
            "{}/v2.0/forecast/daily?key={}&lang={}&days={}&lat={}&lon={}",
            base_url.trim_end_matches('/'),
            api_key,
            lang,
            days,
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

impl ForecastSource for WeatherbitClient {
    async fn fetch_forecast(&self) -> Result<ForecastDocument> {
        let resp: WeatherbitResponse =
            get_json(&self.http, &self.proxy, &self.url, "weatherbit").await?;
        ForecastDocument::try_from(resp)
    }
}

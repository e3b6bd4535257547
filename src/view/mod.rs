pub mod format;
pub mod page;

use chrono_tz::Tz;
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    config::{Config, Lang},
    display::DisplayState,
    icons::{moon_step, IconMapping},
    sensors::{DeviceRole, SensorChannel},
    weather::DailyForecast,
};

pub use page::DashboardPage;

/// Everything that shapes the view apart from the data itself.
#[derive(Debug, Clone)]
pub struct ViewOptions {
    pub tz: Tz,
    pub lang: Lang,
    /// Index of the first forecast entry shown.
    pub forecast_offset: usize,
    /// Number of forecast entries shown.
    pub forecast_days: usize,
}

impl From<&Config> for ViewOptions {
    fn from(config: &Config) -> Self {
        Self {
            tz: config.tz,
            lang: config.lang,
            forecast_offset: config.forecast_offset(),
            forecast_days: config.forecast_days,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DashboardView {
    pub date: String,
    pub time: String,
    pub time_updated: String,
    pub sensors_updated: String,
    pub forecast_updated: String,
    pub indoor: Vec<ReadingView>,
    pub outdoor: Vec<ReadingView>,
    pub forecast: Vec<ForecastDayView>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ReadingView {
    /// `role/capability`, e.g. `indoor/measure_co2`.
    pub channel: String,
    pub label: String,
    pub value: String,
    pub units: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ForecastDayView {
    pub label: String,
    /// Provider icon code.
    pub icon: String,
    pub icon_asset: String,
    pub temperature_max: String,
    pub temperature_min: String,
    /// Whole percent.
    pub humidity: String,
    /// Whole percent.
    pub precip_probability: String,
    pub moon_asset: Option<String>,
    pub moon_label: Option<String>,
}

/// The slice of `days` shown: at most `count` entries starting at `offset`,
/// in input order.
pub fn forecast_window(days: &[DailyForecast], offset: usize, count: usize) -> &[DailyForecast] {
    let start = offset.min(days.len());
    let end = start.saturating_add(count).min(days.len());
    &days[start..end]
}

fn today_label(lang: Lang) -> &'static str {
    match lang {
        Lang::De => "Heute",
        Lang::En => "Today",
    }
}

/// Map the current display state to what is shown. Performs no I/O.
pub fn build_view(state: &DisplayState, opts: &ViewOptions, icons: &IconMapping) -> DashboardView {
    let reading_views = |role: DeviceRole| {
        SensorChannel::ALL
            .into_iter()
            .filter(|c| c.role() == role)
            .map(|channel| {
                let (value, units) = match state.readings.get(&channel) {
                    Some(r) => (format::fixed(r.value, channel.decimals()), r.units.clone()),
                    None => (format::MISSING.to_owned(), String::new()),
                };
                ReadingView {
                    channel: channel.to_string(),
                    label: channel.label().to_owned(),
                    value,
                    units,
                }
            })
            .collect::<Vec<_>>()
    };

    let forecast = state
        .forecast
        .as_ref()
        .map(|doc| {
            forecast_window(&doc.days, opts.forecast_offset, opts.forecast_days)
                .iter()
                .enumerate()
                .map(|(i, day)| forecast_day(day, i, opts, icons))
                .collect()
        })
        .unwrap_or_default();

    let (date, time) = match &state.time {
        Some(t) => (t.date.clone(), t.time.clone()),
        None => (format::MISSING.to_owned(), format::MISSING.to_owned()),
    };

    DashboardView {
        date,
        time,
        time_updated: format::last_updated(state.time_updated, opts.tz),
        sensors_updated: format::last_updated(state.sensors_updated, opts.tz),
        forecast_updated: format::last_updated(state.forecast_updated, opts.tz),
        indoor: reading_views(DeviceRole::Indoor),
        outdoor: reading_views(DeviceRole::Outdoor),
        forecast,
        location: state.forecast.as_ref().and_then(|d| d.location.clone()),
    }
}

fn forecast_day(day: &DailyForecast, index: usize, opts: &ViewOptions, icons: &IconMapping) -> ForecastDayView {
    let label = if index == 0 && opts.forecast_offset == 0 {
        today_label(opts.lang).to_owned()
    } else {
        format::day(day.timestamp, opts.tz)
    };

    ForecastDayView {
        label,
        icon: day.icon.clone(),
        icon_asset: icons.weather_asset(&day.icon).to_owned(),
        temperature_max: format::temperature(day.temperature_max),
        temperature_min: format::temperature(day.temperature_min),
        humidity: format::percent(day.humidity),
        precip_probability: format::percent(day.precip_probability),
        moon_asset: day.moon_phase.map(format::moon_asset),
        moon_label: day
            .moon_phase
            .and_then(|p| icons.moon_label(moon_step(p)))
            .map(str::to_owned),
    }
}

use askama::Template;

use super::DashboardView;

/// Full-screen HTML page for a wall display.
#[derive(Template)]
#[template(path = "dashboard.html")]
pub struct DashboardPage<'a> {
    pub view: &'a DashboardView,
    /// Value of the `lang` attribute, e.g. `"de"`.
    pub lang: &'a str,
    /// Seconds between browser reloads.
    pub refresh_secs: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::{ForecastDayView, ReadingView};

    fn view() -> DashboardView {
        DashboardView {
            date: "Mo, 19.10.2026".into(),
            time: "06:43".into(),
            time_updated: "19/10 06:43:00".into(),
            sensors_updated: "19/10 06:40:00".into(),
            forecast_updated: "19/10 06:00:00".into(),
            indoor: vec![ReadingView {
                channel: "indoor/measure_co2".into(),
                label: "CO2".into(),
                value: "640".into(),
                units: "ppm".into(),
            }],
            outdoor: vec![],
            forecast: vec![ForecastDayView {
                label: "Heute".into(),
                icon: "rain".into(),
                icon_asset: "rain".into(),
                temperature_max: "12.0".into(),
                temperature_min: "6.0".into(),
                humidity: "87".into(),
                precip_probability: "62".into(),
                moon_asset: Some("moon_0.9375".into()),
                moon_label: Some("Abnehmende Sichel".into()),
            }],
            location: Some("<Hamburg>".into()),
        }
    }

    #[test]
    fn page_contains_formatted_values() {
        let v = view();
        let html = DashboardPage { view: &v, lang: "de", refresh_secs: 10 }.render().unwrap();
        assert!(html.contains(r#"<html lang="de">"#));
        assert!(html.contains("06:43"));
        assert!(html.contains("Mo, 19.10.2026"));
        assert!(html.contains("640"));
        assert!(html.contains("/png/rain.png"));
        assert!(html.contains("/png/moon_0.9375.png"));
        assert!(html.contains("Abnehmende Sichel"));
        assert!(html.contains(r#"content="10""#));
    }

    #[test]
    fn page_escapes_text() {
        let v = view();
        let html = DashboardPage { view: &v, lang: "en", refresh_secs: 10 }.render().unwrap();
        assert!(html.contains(r#"<html lang="en">"#));
        assert!(html.contains("&lt;Hamburg&gt;") || html.contains("&#60;Hamburg&#62;"));
        assert!(!html.contains("<Hamburg>"));
    }
}

//! Number and date formatting shared by the dashboard view.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::icons::{moon_step, MOON_STEPS};

/// Placeholder for values that have never been received.
pub const MISSING: &str = "–";

/// Round half away from zero to `decimals` places and format with exactly
/// that many digits. Negative zero is printed as zero.
pub fn fixed(value: f64, decimals: usize) -> String {
    let scale = 10f64.powi(decimals as i32);
    let rounded = (value * scale).round() / scale + 0.0;
    format!("{rounded:.decimals$}")
}

/// Temperatures are always shown with one decimal.
pub fn temperature(value: f64) -> String {
    fixed(value, 1)
}

/// Fraction in `0..=1` → whole percent, e.g. `0.615` → `"62"`.
pub fn percent(fraction: f64) -> String {
    fixed(fraction * 100.0, 0)
}

/// Lunation fraction snapped to the nearest sixteenth.
pub fn snap_moon_phase(phase: f64) -> f64 {
    f64::from(moon_step(phase)) / f64::from(MOON_STEPS)
}

/// Asset name of the moon icon for a phase, e.g. `"moon_0.0625"`.
pub fn moon_asset(phase: f64) -> String {
    format!("moon_{}", snap_moon_phase(phase))
}

/// `DD/MM HH:MM:SS` in `tz`, or [`MISSING`].
pub fn last_updated(at: Option<DateTime<Utc>>, tz: Tz) -> String {
    match at {
        Some(at) => at.with_timezone(&tz).format("%d/%m %H:%M:%S").to_string(),
        None => MISSING.to_owned(),
    }
}

/// `DD.MM.YYYY` in `tz`.
pub fn day(at: DateTime<Utc>, tz: Tz) -> String {
    at.with_timezone(&tz).format("%d.%m.%Y").to_string()
}

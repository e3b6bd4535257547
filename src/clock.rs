use chrono::{DateTime, Datelike, Utc, Weekday};
use chrono_tz::Tz;
use serde::Serialize;

use crate::config::Lang;

/// Wall-clock abstraction so timer-driven code can be tested with a fixed time.
pub trait TimeSource: Send + Sync + 'static {
    fn now(&self) -> DateTime<Utc>;
}

/// The system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl TimeSource for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl TimeSource for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Formatted date and time pair shown in the clock box.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeSample {
    /// e.g. `"Mo, 19.10.2026"`
    pub date: String,
    /// e.g. `"06:43"`
    pub time: String,
}

impl TimeSample {
    pub fn at(instant: DateTime<Utc>, tz: Tz, lang: Lang) -> Self {
        let local = instant.with_timezone(&tz);
        Self {
            date: format!(
                "{}, {}",
                weekday_short(local.weekday(), lang),
                local.format("%d.%m.%Y")
            ),
            time: local.format("%H:%M").to_string(),
        }
    }
}

/// Two-letter weekday abbreviation.
pub fn weekday_short(day: Weekday, lang: Lang) -> &'static str {
    match (lang, day) {
        (Lang::De, Weekday::Mon) => "Mo",
        (Lang::De, Weekday::Tue) => "Di",
        (Lang::De, Weekday::Wed) => "Mi",
        (Lang::De, Weekday::Thu) => "Do",
        (Lang::De, Weekday::Fri) => "Fr",
        (Lang::De, Weekday::Sat) => "Sa",
        (Lang::De, Weekday::Sun) => "So",
        (Lang::En, Weekday::Mon) => "Mo",
        (Lang::En, Weekday::Tue) => "Tu",
        (Lang::En, Weekday::Wed) => "We",
        (Lang::En, Weekday::Thu) => "Th",
        (Lang::En, Weekday::Fri) => "Fr",
        (Lang::En, Weekday::Sat) => "Sa",
        (Lang::En, Weekday::Sun) => "Su",
    }
}

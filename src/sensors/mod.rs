pub mod service;

use std::{fmt, str::FromStr};

use anyhow::Result;

pub use service::{PullSensorSource, PushSensorSource};

/// Which of the two climate devices a reading comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DeviceRole {
    Indoor,
    Outdoor,
}

impl DeviceRole {
    pub const ALL: [DeviceRole; 2] = [DeviceRole::Indoor, DeviceRole::Outdoor];
}

impl FromStr for DeviceRole {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "indoor" => Ok(Self::Indoor),
            "outdoor" => Ok(Self::Outdoor),
            other => Err(anyhow::anyhow!("unknown device role: {other:?}")),
        }
    }
}

impl fmt::Display for DeviceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DeviceRole::Indoor => "indoor",
            DeviceRole::Outdoor => "outdoor",
        })
    }
}

/// One displayed (device, capability) pair.
///
/// Declaration order is display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SensorChannel {
    IndoorTemperature,
    IndoorCo2,
    IndoorHumidity,
    IndoorNoise,
    OutdoorTemperature,
    OutdoorHumidity,
}

impl SensorChannel {
    pub const ALL: [SensorChannel; 6] = [
        SensorChannel::IndoorTemperature,
        SensorChannel::IndoorCo2,
        SensorChannel::IndoorHumidity,
        SensorChannel::IndoorNoise,
        SensorChannel::OutdoorTemperature,
        SensorChannel::OutdoorHumidity,
    ];

    pub fn role(self) -> DeviceRole {
        match self {
            Self::IndoorTemperature | Self::IndoorCo2 | Self::IndoorHumidity | Self::IndoorNoise => {
                DeviceRole::Indoor
            }
            Self::OutdoorTemperature | Self::OutdoorHumidity => DeviceRole::Outdoor,
        }
    }

    /// Hub capability ID.
    pub fn capability(self) -> &'static str {
        match self {
            Self::IndoorTemperature | Self::OutdoorTemperature => "measure_temperature",
            Self::IndoorHumidity | Self::OutdoorHumidity => "measure_humidity",
            Self::IndoorCo2 => "measure_co2",
            Self::IndoorNoise => "measure_noise",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::IndoorTemperature | Self::OutdoorTemperature => "Temperature",
            Self::IndoorHumidity | Self::OutdoorHumidity => "Humidity",
            Self::IndoorCo2 => "CO2",
            Self::IndoorNoise => "Noise",
        }
    }

    /// Decimal places shown for this channel.
    pub fn decimals(self) -> usize {
        match self {
            Self::IndoorTemperature | Self::OutdoorTemperature => 1,
            _ => 0,
        }
    }

    /// Units used when the hub does not report any.
    pub fn default_units(self) -> &'static str {
        match self {
            Self::IndoorTemperature | Self::OutdoorTemperature => "°C",
            Self::IndoorHumidity | Self::OutdoorHumidity => "%",
            Self::IndoorCo2 => "ppm",
            Self::IndoorNoise => "dB",
        }
    }
}

impl fmt::Display for SensorChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.role(), self.capability())
    }
}

/// Last known value of one channel.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorReading {
    pub value: f64,
    pub units: String,
}

impl SensorReading {
    /// Build a reading, falling back to the channel's default units.
    pub fn new(channel: SensorChannel, value: f64, units: Option<&str>) -> Self {
        Self {
            value,
            units: units
                .filter(|u| !u.is_empty())
                .unwrap_or(channel.default_units())
                .to_owned(),
        }
    }
}

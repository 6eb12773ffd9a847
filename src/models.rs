//! Data models for sensors and their readings.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---

/// Kind of quantity a sensor measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    Temperature,
    Humidity,
    EnergyConsumption,
}

impl SensorKind {
    // ---
    /// Name stored in the `sensors.sensor_type` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            SensorKind::Temperature => "temperature",
            SensorKind::Humidity => "humidity",
            SensorKind::EnergyConsumption => "energy_consumption",
        }
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SensorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "temperature" => Ok(SensorKind::Temperature),
            "humidity" => Ok(SensorKind::Humidity),
            "energy_consumption" => Ok(SensorKind::EnergyConsumption),
            other => Err(format!("unknown sensor type: {other}")),
        }
    }
}

/// Identity of a sensor row, assigned by the store on first use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SensorId(pub i64);

/// One reading as returned by a windowed store query.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredReading {
    // ---
    pub location: String,
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// Most recent reading of a single sensor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatestReading {
    // ---
    pub value: f64,
    pub timestamp: DateTime<Utc>,
}

//! Derived building-performance metrics.
//!
//! Everything here is stateless: each call reads what it needs from the
//! store and computes its result from scratch. An empty window is a normal
//! outcome (first boot, idle generator) and yields zeros and empty series.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::error::{Result, TelemetryError};
use crate::models::{LatestReading, SensorKind, StoredReading};
use crate::simulator::ENERGY_METERS;
use crate::store::ReadingStore;

// ---

/// Default degree-day base temperature (°C).
pub const DEFAULT_BASE_TEMPERATURE: f64 = 18.0;

/// Default conditioned floor area used for EUI.
pub const DEFAULT_FLOOR_AREA: f64 = 1000.0;

/// Location whose temperature series drives the degree-day figure.
const DEGREE_DAY_LOCATION: &str = "office";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Heating degree-days: summed shortfall of each sample below `base`.
pub fn degree_days(temperatures: &[f64], base_temperature: f64) -> f64 {
    temperatures
        .iter()
        .map(|t| (base_temperature - t).max(0.0))
        .sum()
}

/// Energy Use Intensity. Rejects a floor area that is zero, negative or not
/// finite rather than dividing by it.
pub fn eui(total_energy: f64, floor_area: f64) -> Result<f64> {
    // ---
    if !(floor_area.is_finite() && floor_area > 0.0) {
        return Err(TelemetryError::InvalidFloorArea(floor_area));
    }
    Ok(total_energy / floor_area)
}

/// Trailing period selector accepted by the `/data` endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Period {
    #[default]
    Day,
    Week,
    Month,
}

impl Period {
    // ---
    /// Parse a selector; anything unrecognized means a day.
    pub fn from_selector(selector: &str) -> Self {
        match selector {
            "week" => Period::Week,
            "month" => Period::Month,
            _ => Period::Day,
        }
    }

    pub fn span(&self) -> Duration {
        match self {
            Period::Day => Duration::days(1),
            Period::Week => Duration::days(7),
            Period::Month => Duration::days(30),
        }
    }
}

/// The interval `[start, end)` a query is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl MetricsWindow {
    // ---
    pub fn ending_at(period: Period, now: DateTime<Utc>) -> Self {
        Self {
            start: now - period.span(),
            end: now,
        }
    }

    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        self.start <= timestamp && timestamp < self.end
    }

    /// Readings inside the window. The store already applied the lower
    /// bound; this drops anything written at or after `end`.
    async fn read(
        &self,
        store: &dyn ReadingStore,
        kind: SensorKind,
        location: Option<&str>,
    ) -> Result<Vec<StoredReading>> {
        let mut rows = store.query(kind, location, Some(self.start)).await?;
        rows.retain(|r| self.contains(r.timestamp));
        Ok(rows)
    }
}

/// Named metric parameters, so nobody relies on positional defaults.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricsConfig {
    // ---
    /// Degree-day base temperature (°C).
    pub base_temperature: f64,
    /// Floor area EUI is normalized by; must be positive.
    pub floor_area: f64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            base_temperature: DEFAULT_BASE_TEMPERATURE,
            floor_area: DEFAULT_FLOOR_AREA,
        }
    }
}

/// Latest reading of one location, as shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationReading {
    pub location: String,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
}

/// Windowed energy total for one location.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationConsumption {
    pub location: String,
    pub total_consumption: f64,
}

/// Body of `GET /data`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataResponse {
    // ---
    pub timestamps: Vec<String>,
    pub temperatures: Vec<f64>,
    pub temperatures_display: Vec<LocationReading>,
    pub humidity: Vec<LocationReading>,
    pub energy_consumption: Vec<LocationConsumption>,
    pub degree_days: f64,
    pub eui: f64,
}

/// Read-only view over a store that answers metric queries.
#[derive(Clone)]
pub struct MetricsEngine {
    store: Arc<dyn ReadingStore>,
    config: MetricsConfig,
}

impl MetricsEngine {
    // ---
    pub fn new(store: Arc<dyn ReadingStore>, config: MetricsConfig) -> Self {
        Self { store, config }
    }

    /// Latest reading per location for `kind`, over the whole store.
    pub async fn latest_by_location(
        &self,
        kind: SensorKind,
    ) -> Result<BTreeMap<String, LatestReading>> {
        self.store.latest_per_sensor(kind).await
    }

    /// `(timestamp, value)` pairs of one sensor inside `window`, oldest
    /// first. The window start is inclusive.
    pub async fn windowed_series(
        &self,
        kind: SensorKind,
        location: &str,
        window: MetricsWindow,
    ) -> Result<Vec<(DateTime<Utc>, f64)>> {
        // ---
        let rows = window.read(&*self.store, kind, Some(location)).await?;
        Ok(rows.into_iter().map(|r| (r.timestamp, r.value)).collect())
    }

    /// Energy summed per location inside `window`. Every roster meter is
    /// present, at zero when it has no readings.
    pub async fn summed_consumption_by_location(
        &self,
        window: MetricsWindow,
    ) -> Result<BTreeMap<String, f64>> {
        // ---
        let mut totals: BTreeMap<String, f64> = ENERGY_METERS
            .iter()
            .map(|meter| (meter.to_string(), 0.0))
            .collect();

        let rows = window
            .read(&*self.store, SensorKind::EnergyConsumption, None)
            .await?;
        for row in rows {
            *totals.entry(row.location).or_insert(0.0) += row.value;
        }
        Ok(totals)
    }

    /// All energy consumed inside `window`; zero for an empty window.
    pub async fn total_consumption(&self, window: MetricsWindow) -> Result<f64> {
        // ---
        let rows = window
            .read(&*self.store, SensorKind::EnergyConsumption, None)
            .await?;
        Ok(rows.iter().map(|r| r.value).sum())
    }

    /// Assemble the full dashboard payload for `period` ending now.
    pub async fn get_data(&self, period: Period) -> Result<DataResponse> {
        self.get_data_at(period, Utc::now()).await
    }

    pub async fn get_data_at(&self, period: Period, now: DateTime<Utc>) -> Result<DataResponse> {
        // ---
        let window = MetricsWindow::ending_at(period, now);

        let office = self
            .windowed_series(SensorKind::Temperature, DEGREE_DAY_LOCATION, window)
            .await?;
        let (timestamps, temperatures): (Vec<String>, Vec<f64>) = office
            .into_iter()
            .map(|(ts, value)| (ts.format(TIMESTAMP_FORMAT).to_string(), value))
            .unzip();

        let temperatures_display =
            to_location_readings(self.latest_by_location(SensorKind::Temperature).await?);
        let humidity = to_location_readings(self.latest_by_location(SensorKind::Humidity).await?);

        let energy_consumption = self
            .summed_consumption_by_location(window)
            .await?
            .into_iter()
            .map(|(location, total_consumption)| LocationConsumption {
                location,
                total_consumption,
            })
            .collect();

        let degree_days = degree_days(&temperatures, self.config.base_temperature);
        let total_energy = self.total_consumption(window).await?;
        let eui = eui(total_energy, self.config.floor_area)?;

        Ok(DataResponse {
            timestamps,
            temperatures,
            temperatures_display,
            humidity,
            energy_consumption,
            degree_days,
            eui,
        })
    }
}

fn to_location_readings(latest: BTreeMap<String, LatestReading>) -> Vec<LocationReading> {
    latest
        .into_iter()
        .map(|(location, r)| LocationReading {
            location,
            value: r.value,
            timestamp: r.timestamp,
        })
        .collect()
}

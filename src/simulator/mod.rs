//! Environmental simulator.
//!
//! One call to [`tick`] produces exactly one reading for every sensor of the
//! building roster and appends it to the store. Indoor temperatures are the
//! only stateful quantity: each location drifts from its previous value,
//! pulled toward outdoor conditions and pushed down by the HVAC energy of the
//! *previous* tick. That lag follows from roster order (temperatures before
//! HVAC) and is part of the model.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, Utc};
use rand::Rng;
use tracing::debug;

use crate::error::Result;
use crate::models::SensorKind;
use crate::store::ReadingStore;

mod generator;
pub mod profiles;

pub use generator::{Generator, GeneratorHandle};
use profiles::TimeOfWeek;

// ---

/// Locations with a temperature sensor and the humidity range of their
/// humidity sensor, in roster order.
pub const ROOMS: [(&str, (f64, f64)); 3] = [
    ("office", (40.0, 60.0)),
    ("server_room", (30.0, 50.0)),
    ("lobby", (45.0, 65.0)),
];

/// Location label of the HVAC plant's energy meter.
pub const HVAC: &str = "HVAC";
pub const LIGHTING: &str = "Lighting";
pub const EQUIPMENT: &str = "Equipment";

/// Energy meter locations, in roster order.
pub const ENERGY_METERS: [&str; 3] = [HVAC, LIGHTING, EQUIPMENT];

/// Implicit indoor setpoint (°C).
const SETPOINT: f64 = 21.0;
/// Fraction of the outdoor/setpoint gap that leaks in per tick.
const EXTERNAL_DAMPING: f64 = 0.2;
/// Temperature change per unit of HVAC energy; negative, the plant cools.
const HVAC_COEFFICIENT: f64 = -0.5;
/// Hard plausibility bounds for indoor temperature (°C), inclusive.
pub const MIN_INDOOR: f64 = 18.0;
pub const MAX_INDOOR: f64 = 25.0;

/// Every `(kind, location)` pair one tick writes, in write order.
pub fn roster() -> Vec<(SensorKind, &'static str)> {
    // ---
    let mut entries = Vec::with_capacity(ROOMS.len() * 2 + ENERGY_METERS.len());
    for (room, _) in ROOMS {
        entries.push((SensorKind::Temperature, room));
        entries.push((SensorKind::Humidity, room));
    }
    entries.extend(ENERGY_METERS.map(|meter| (SensorKind::EnergyConsumption, meter)));
    entries
}

/// Feedback step for one location's indoor temperature.
pub fn next_indoor_temperature(previous: f64, external: f64, hvac_energy: f64) -> f64 {
    // ---
    let temperature_influence = (external - SETPOINT) * EXTERNAL_DAMPING;
    let hvac_influence = hvac_energy * HVAC_COEFFICIENT;
    (previous + temperature_influence + hvac_influence).clamp(MIN_INDOOR, MAX_INDOOR)
}

/// State carried by the simulator from one tick to the next.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationState {
    // ---
    /// Last simulated indoor temperature per location.
    pub previous_temperature: BTreeMap<String, f64>,

    /// Most recent HVAC energy reading for the whole building.
    pub last_hvac_energy: Option<f64>,

    /// Provisional "previous" temperature for a location never seen before.
    pub seed_temperature: f64,
}

impl Default for SimulationState {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl SimulationState {
    // ---
    pub fn new(seed_temperature: f64) -> Self {
        Self {
            previous_temperature: BTreeMap::new(),
            last_hvac_energy: None,
            seed_temperature,
        }
    }

    /// Rebuild state from what the store already holds, so a restarted
    /// generator keeps the feedback loop going where it stopped.
    pub async fn restore(store: &dyn ReadingStore, seed_temperature: f64) -> Result<Self> {
        // ---
        let temperatures = store.latest_per_sensor(SensorKind::Temperature).await?;
        let energy = store
            .latest_per_sensor(SensorKind::EnergyConsumption)
            .await?;

        Ok(Self {
            previous_temperature: temperatures
                .into_iter()
                .map(|(location, latest)| (location, latest.value))
                .collect(),
            last_hvac_energy: energy.get(HVAC).map(|latest| latest.value),
            seed_temperature,
        })
    }

    fn previous(&self, location: &str) -> f64 {
        self.previous_temperature
            .get(location)
            .copied()
            .unwrap_or(self.seed_temperature)
    }
}

/// Outcome of a completed tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub timestamp: DateTime<Utc>,
    pub readings: usize,
}

/// Advance the simulation by one tick at wall-clock time `now`.
///
/// Hour and weekday are taken in `now`'s own offset; the stored timestamp is
/// `now` in UTC and is shared by every reading of the tick. A store failure
/// aborts the remaining writes; `state` then reflects only what was written.
pub async fn tick<R>(
    store: &dyn ReadingStore,
    state: &mut SimulationState,
    rng: &mut R,
    now: DateTime<FixedOffset>,
) -> Result<TickReport>
where
    R: Rng + Send,
{
    // ---
    let at = TimeOfWeek::of(&now);
    let timestamp = now.with_timezone(&Utc);
    let hvac_feedback = state.last_hvac_energy.unwrap_or(0.0);
    let mut written = 0;

    for (room, humidity_range) in ROOMS {
        let external = profiles::external_temperature(at, rng);
        let temperature = next_indoor_temperature(state.previous(room), external, hvac_feedback);
        record(store, SensorKind::Temperature, room, timestamp, temperature).await?;
        state
            .previous_temperature
            .insert(room.to_string(), temperature);
        written += 1;

        let humidity = profiles::humidity(humidity_range, rng);
        record(store, SensorKind::Humidity, room, timestamp, humidity).await?;
        written += 1;
    }

    let hvac = profiles::hvac_energy(at, rng);
    record(store, SensorKind::EnergyConsumption, HVAC, timestamp, hvac).await?;
    state.last_hvac_energy = Some(hvac);
    written += 1;

    let lighting = profiles::lighting_energy(at, rng);
    record(store, SensorKind::EnergyConsumption, LIGHTING, timestamp, lighting).await?;
    written += 1;

    let equipment = profiles::equipment_energy(at, rng);
    record(store, SensorKind::EnergyConsumption, EQUIPMENT, timestamp, equipment).await?;
    written += 1;

    Ok(TickReport {
        timestamp,
        readings: written,
    })
}

async fn record(
    store: &dyn ReadingStore,
    kind: SensorKind,
    location: &str,
    timestamp: DateTime<Utc>,
    value: f64,
) -> Result<()> {
    // ---
    let sensor = store.ensure_sensor(kind, location).await?;
    store.append_reading(sensor, timestamp, value).await?;
    debug!(%kind, location, value, "reading stored");
    Ok(())
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::models::{LatestReading, SensorId, StoredReading};
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone};
    use rand::{rngs::StdRng, SeedableRng};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Monday 2025-03-24 10:00 UTC, inside every weekday peak band.
    fn monday_morning() -> DateTime<FixedOffset> {
        FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2025, 3, 24, 10, 0, 0)
            .unwrap()
    }

    /// Store that accepts `budget` appends and fails every one after that.
    struct FlakyStore {
        inner: MemoryStore,
        budget: AtomicUsize,
    }

    #[async_trait]
    impl ReadingStore for FlakyStore {
        async fn ensure_sensor(&self, kind: SensorKind, location: &str) -> Result<SensorId> {
            self.inner.ensure_sensor(kind, location).await
        }

        async fn append_reading(
            &self,
            sensor: SensorId,
            timestamp: DateTime<Utc>,
            value: f64,
        ) -> Result<()> {
            let left = self.budget.load(Ordering::SeqCst);
            if left == 0 {
                return Err(sqlx::Error::PoolClosed.into());
            }
            self.budget.store(left - 1, Ordering::SeqCst);
            self.inner.append_reading(sensor, timestamp, value).await
        }

        async fn last_reading(&self, sensor: SensorId) -> Result<Option<LatestReading>> {
            self.inner.last_reading(sensor).await
        }

        async fn query(
            &self,
            kind: SensorKind,
            location: Option<&str>,
            since: Option<DateTime<Utc>>,
        ) -> Result<Vec<StoredReading>> {
            self.inner.query(kind, location, since).await
        }

        async fn latest_per_sensor(
            &self,
            kind: SensorKind,
        ) -> Result<BTreeMap<String, LatestReading>> {
            self.inner.latest_per_sensor(kind).await
        }
    }

    #[test]
    fn test_feedback_scenario_clamps_to_lower_bound() {
        // ---
        // 21 + (25 - 21) * 0.2 + 10 * -0.5 = 16.8, clamped to 18.
        assert_eq!(next_indoor_temperature(21.0, 25.0, 10.0), 18.0);
    }

    #[test]
    fn test_feedback_without_clamping() {
        // ---
        // 22 + (16 - 21) * 0.2 + 0 = 21
        let t = next_indoor_temperature(22.0, 16.0, 0.0);
        assert!((t - 21.0).abs() < 1e-9);
    }

    #[test]
    fn test_feedback_always_within_bounds() {
        // ---
        for previous in [-40.0, 0.0, 18.0, 21.0, 25.0, 90.0] {
            for external in [-30.0, 9.0, 21.0, 25.0, 60.0] {
                for hvac in [0.0, 3.0, 15.0, 100.0, -100.0] {
                    let t = next_indoor_temperature(previous, external, hvac);
                    assert!((MIN_INDOOR..=MAX_INDOOR).contains(&t), "{t} out of bounds");
                }
            }
        }
        assert_eq!(next_indoor_temperature(21.0, 21.0, 100.0), MIN_INDOOR);
    }

    #[test]
    fn test_roster_has_one_entry_per_sensor() {
        // ---
        let entries = roster();
        assert_eq!(entries.len(), 9);
        let mut unique = entries.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), entries.len());
    }

    #[tokio::test]
    async fn test_first_tick_uses_seed_and_zero_hvac() {
        // ---
        let store = MemoryStore::new();
        let mut state = SimulationState::new(0.0);
        let mut rng = StdRng::seed_from_u64(1);

        let report = tick(&store, &mut state, &mut rng, monday_morning())
            .await
            .unwrap();

        assert_eq!(report.readings, 9);
        assert_eq!(store.len().await, 9);
        // A 0 °C seed can gain at most 0.8 °C per tick, so the clamp wins.
        for (room, _) in ROOMS {
            assert_eq!(state.previous_temperature[room], MIN_INDOOR);
        }
    }

    #[tokio::test]
    async fn test_tick_feeds_previous_hvac_into_temperature() {
        // ---
        let store = MemoryStore::new();
        let mut state = SimulationState::new(0.0);
        state.previous_temperature.insert("office".to_string(), 25.0);
        state.last_hvac_energy = Some(100.0);
        let mut rng = StdRng::seed_from_u64(2);

        tick(&store, &mut state, &mut rng, monday_morning())
            .await
            .unwrap();

        assert_eq!(state.previous_temperature["office"], MIN_INDOOR);

        // The state now carries this tick's HVAC draw for the next tick.
        let hvac = store
            .latest_per_sensor(SensorKind::EnergyConsumption)
            .await
            .unwrap()[HVAC]
            .value;
        assert_eq!(state.last_hvac_energy, Some(hvac));
        assert!((8.0..=15.0).contains(&hvac));
    }

    #[tokio::test]
    async fn test_n_ticks_write_n_readings_per_sensor() {
        // ---
        let store = MemoryStore::new();
        let mut state = SimulationState::default();
        let mut rng = StdRng::seed_from_u64(3);
        let start = monday_morning();

        for i in 0..6 {
            tick(&store, &mut state, &mut rng, start + Duration::minutes(5 * i))
                .await
                .unwrap();
        }

        for (kind, location) in roster() {
            let series = store.query(kind, Some(location), None).await.unwrap();
            assert_eq!(series.len(), 6, "{kind}@{location}");
            assert!(series.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
            if kind == SensorKind::Temperature {
                assert!(series
                    .iter()
                    .all(|r| (MIN_INDOOR..=MAX_INDOOR).contains(&r.value)));
            }
        }
    }

    #[tokio::test]
    async fn test_same_seed_same_readings() {
        // ---
        let mut runs = Vec::new();
        for _ in 0..2 {
            let store = MemoryStore::new();
            let mut state = SimulationState::new(21.0);
            let mut rng = StdRng::seed_from_u64(42);
            for i in 0..3 {
                tick(&store, &mut state, &mut rng, monday_morning() + Duration::hours(i))
                    .await
                    .unwrap();
            }
            runs.push(
                store
                    .query(SensorKind::Temperature, None, None)
                    .await
                    .unwrap(),
            );
        }
        assert_eq!(runs[0], runs[1]);
    }

    #[tokio::test]
    async fn test_storage_failure_aborts_tick() {
        // ---
        let store = FlakyStore {
            inner: MemoryStore::new(),
            budget: AtomicUsize::new(3),
        };
        let mut state = SimulationState::new(21.0);
        let mut rng = StdRng::seed_from_u64(4);

        let result = tick(&store, &mut state, &mut rng, monday_morning()).await;

        assert!(result.is_err());
        assert_eq!(store.inner.len().await, 3);
        // office temperature, office humidity, server_room temperature
        assert_eq!(state.previous_temperature.len(), 2);
        assert!(!state.previous_temperature.contains_key("lobby"));
        assert_eq!(state.last_hvac_energy, None);
    }

    #[tokio::test]
    async fn test_restore_reads_back_latest_values() {
        // ---
        let store = MemoryStore::new();
        let empty = SimulationState::restore(&store, 0.0).await.unwrap();
        assert_eq!(empty, SimulationState::new(0.0));

        let mut state = SimulationState::default();
        let mut rng = StdRng::seed_from_u64(5);
        tick(&store, &mut state, &mut rng, monday_morning())
            .await
            .unwrap();

        let restored = SimulationState::restore(&store, 0.0).await.unwrap();
        assert_eq!(restored, state);
    }
}

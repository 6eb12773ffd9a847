use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::ReadingStore;
use crate::error::Result;
use crate::models::{LatestReading, SensorId, SensorKind, StoredReading};

// ---

/// Process-local store used when no database is configured.
///
/// Readings live in one insertion-ordered vector, so the vector index plays
/// the role of the `reading_id` column of the SQL schema.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    // ---
    /// `sensors[id - 1]` is the `(kind, location)` of sensor `id`.
    sensors: Vec<(SensorKind, String)>,
    readings: Vec<Row>,
}

#[derive(Debug)]
struct Row {
    sensor: SensorId,
    timestamp: DateTime<Utc>,
    value: f64,
}

impl MemoryStore {
    // ---
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
impl MemoryStore {
    /// Total number of readings held, across every sensor.
    pub async fn len(&self) -> usize {
        self.inner.read().await.readings.len()
    }
}

impl Inner {
    fn sensor(&self, id: SensorId) -> Option<&(SensorKind, String)> {
        usize::try_from(id.0 - 1)
            .ok()
            .and_then(|idx| self.sensors.get(idx))
    }
}

#[async_trait]
impl ReadingStore for MemoryStore {
    // ---
    async fn ensure_sensor(&self, kind: SensorKind, location: &str) -> Result<SensorId> {
        // ---
        let mut inner = self.inner.write().await;
        if let Some(idx) = inner
            .sensors
            .iter()
            .position(|(k, loc)| *k == kind && loc == location)
        {
            return Ok(SensorId(idx as i64 + 1));
        }
        inner.sensors.push((kind, location.to_string()));
        Ok(SensorId(inner.sensors.len() as i64))
    }

    async fn append_reading(
        &self,
        sensor: SensorId,
        timestamp: DateTime<Utc>,
        value: f64,
    ) -> Result<()> {
        // ---
        let mut inner = self.inner.write().await;
        if inner.sensor(sensor).is_none() {
            // Mirrors the foreign key violation the SQL store would raise.
            return Err(sqlx::Error::RowNotFound.into());
        }
        inner.readings.push(Row {
            sensor,
            timestamp,
            value,
        });
        Ok(())
    }

    async fn last_reading(&self, sensor: SensorId) -> Result<Option<LatestReading>> {
        // ---
        let inner = self.inner.read().await;
        Ok(inner
            .readings
            .iter()
            .rev()
            .find(|r| r.sensor == sensor)
            .map(|r| LatestReading {
                value: r.value,
                timestamp: r.timestamp,
            }))
    }

    async fn query(
        &self,
        kind: SensorKind,
        location: Option<&str>,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<StoredReading>> {
        // ---
        let inner = self.inner.read().await;
        let mut rows: Vec<StoredReading> = inner
            .readings
            .iter()
            .filter(|r| since.map_or(true, |start| r.timestamp >= start))
            .filter_map(|r| {
                let (k, loc) = inner.sensor(r.sensor)?;
                let wanted = *k == kind && location.map_or(true, |l| l == loc);
                wanted.then(|| StoredReading {
                    location: loc.clone(),
                    timestamp: r.timestamp,
                    value: r.value,
                })
            })
            .collect();

        // Stable sort: equal timestamps stay in insertion order.
        rows.sort_by_key(|r| r.timestamp);
        Ok(rows)
    }

    async fn latest_per_sensor(
        &self,
        kind: SensorKind,
    ) -> Result<BTreeMap<String, LatestReading>> {
        // ---
        let inner = self.inner.read().await;
        let mut latest = BTreeMap::new();
        for row in &inner.readings {
            if let Some((k, loc)) = inner.sensor(row.sensor) {
                if *k == kind {
                    latest.insert(
                        loc.clone(),
                        LatestReading {
                            value: row.value,
                            timestamp: row.timestamp,
                        },
                    );
                }
            }
        }
        Ok(latest)
    }
}

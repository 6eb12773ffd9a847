//! Reading store: the persistence boundary between the simulator and the
//! metrics engine.
//!
//! The simulator is the single writer; metrics queries are readers that may
//! run concurrently with it. Each method is one atomic operation, so a reader
//! sees a consistent snapshot per call but not across calls.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{LatestReading, SensorId, SensorKind, StoredReading};

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

// ---

#[async_trait]
pub trait ReadingStore: Send + Sync {
    // ---
    /// Look up the sensor for `(kind, location)`, creating it on first use.
    async fn ensure_sensor(&self, kind: SensorKind, location: &str) -> Result<SensorId>;

    /// Append one reading for `sensor`.
    async fn append_reading(
        &self,
        sensor: SensorId,
        timestamp: DateTime<Utc>,
        value: f64,
    ) -> Result<()>;

    /// Most recently inserted reading of `sensor`, if any.
    async fn last_reading(&self, sensor: SensorId) -> Result<Option<LatestReading>>;

    /// Readings of `kind`, optionally narrowed to one location and to
    /// timestamps at or after `since`, ascending by timestamp. Equal
    /// timestamps keep insertion order.
    async fn query(
        &self,
        kind: SensorKind,
        location: Option<&str>,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<StoredReading>>;

    /// Latest reading per location for `kind`, picked by insertion order
    /// rather than timestamp.
    async fn latest_per_sensor(&self, kind: SensorKind)
        -> Result<BTreeMap<String, LatestReading>>;
}

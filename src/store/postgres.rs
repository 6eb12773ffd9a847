use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::ReadingStore;
use crate::error::Result;
use crate::models::{LatestReading, SensorId, SensorKind, StoredReading};

// ---

/// PostgreSQL-backed store over the `sensors` / `readings` tables created by
/// [`crate::schema::create_schema`].
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    // ---
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReadingStore for PgStore {
    // ---
    async fn ensure_sensor(&self, kind: SensorKind, location: &str) -> Result<SensorId> {
        // ---
        // The no-op update makes RETURNING yield the existing row on conflict.
        let (id,): (i32,) = sqlx::query_as(
            r#"
            INSERT INTO sensors (sensor_type, location)
            VALUES ($1, $2)
            ON CONFLICT (sensor_type, location) DO UPDATE
                SET sensor_type = EXCLUDED.sensor_type
            RETURNING sensor_id
            "#,
        )
        .bind(kind.as_str())
        .bind(location)
        .fetch_one(&self.pool)
        .await?;

        Ok(SensorId(i64::from(id)))
    }

    async fn append_reading(
        &self,
        sensor: SensorId,
        timestamp: DateTime<Utc>,
        value: f64,
    ) -> Result<()> {
        // ---
        sqlx::query(
            r#"
            INSERT INTO readings (sensor_id, timestamp, value)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(sensor.0 as i32)
        .bind(timestamp)
        .bind(value)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn last_reading(&self, sensor: SensorId) -> Result<Option<LatestReading>> {
        // ---
        let row: Option<(f64, DateTime<Utc>)> = sqlx::query_as(
            r#"
            SELECT value, timestamp
            FROM readings
            WHERE sensor_id = $1
            ORDER BY reading_id DESC
            LIMIT 1
            "#,
        )
        .bind(sensor.0 as i32)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(value, timestamp)| LatestReading { value, timestamp }))
    }

    async fn query(
        &self,
        kind: SensorKind,
        location: Option<&str>,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<StoredReading>> {
        // ---
        let rows: Vec<(String, DateTime<Utc>, f64)> = sqlx::query_as(
            r#"
            SELECT s.location, r.timestamp, r.value
            FROM readings r
            JOIN sensors s ON r.sensor_id = s.sensor_id
            WHERE s.sensor_type = $1
              AND ($2::TEXT IS NULL OR s.location = $2)
              AND ($3::TIMESTAMPTZ IS NULL OR r.timestamp >= $3)
            ORDER BY r.timestamp, r.reading_id
            "#,
        )
        .bind(kind.as_str())
        .bind(location)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(location, timestamp, value)| StoredReading {
                location,
                timestamp,
                value,
            })
            .collect())
    }

    async fn latest_per_sensor(
        &self,
        kind: SensorKind,
    ) -> Result<BTreeMap<String, LatestReading>> {
        // ---
        let rows: Vec<(String, f64, DateTime<Utc>)> = sqlx::query_as(
            r#"
            SELECT DISTINCT ON (r.sensor_id) s.location, r.value, r.timestamp
            FROM readings r
            JOIN sensors s ON r.sensor_id = s.sensor_id
            WHERE s.sensor_type = $1
            ORDER BY r.sensor_id, r.reading_id DESC
            "#,
        )
        .bind(kind.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(location, value, timestamp)| (location, LatestReading { value, timestamp }))
            .collect())
    }
}

//! Database schema management for `building-telemetry`.
//!
//! Ensures the sensor and reading tables exist before the generator writes
//! its first tick. Applied once on startup from `main.rs`, and only when a
//! PostgreSQL store is configured.

use anyhow::Result;
use sqlx::PgPool;

// ---

/// Create the schema (idempotent).
///
/// `sensors` holds one row per `(sensor_type, location)` pair; `readings` is
/// append-only and its `reading_id` doubles as insertion order, which is what
/// "latest reading" queries sort by.
pub async fn create_schema(pool: &PgPool) -> Result<()> {
    // ---
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sensors (
            sensor_id    SERIAL PRIMARY KEY,
            sensor_type  TEXT NOT NULL,
            location     TEXT NOT NULL,
            UNIQUE (sensor_type, location)
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS readings (
            reading_id   BIGSERIAL PRIMARY KEY,
            sensor_id    INTEGER          NOT NULL REFERENCES sensors (sensor_id),
            timestamp    TIMESTAMPTZ      NOT NULL,
            value        DOUBLE PRECISION NOT NULL
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    // Windowed series and latest-per-sensor lookups
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_readings_sensor_timestamp
            ON readings (sensor_id, timestamp);
        "#,
    )
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}

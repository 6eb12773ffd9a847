//! Error taxonomy shared by the store, simulator and metrics engine.
//!
//! Startup code sticks with `anyhow`; anything a tick or a metrics query can
//! fail with is a [`TelemetryError`]. An empty window is not an error: the
//! metrics engine reports zero sums and empty series instead.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TelemetryError {
    // ---
    /// Any failure reading from or writing to the reading store.
    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),

    /// EUI requested with a floor area that would divide by zero (or worse).
    #[error("invalid floor area {0}: must be a positive, finite number")]
    InvalidFloorArea(f64),
}

pub type Result<T> = std::result::Result<T, TelemetryError>;

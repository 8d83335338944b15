//! Race telemetry lookups.
//!
//! The data itself lives with an external provider; this module only resolves
//! a session, narrows the provider's rows to what was asked for and reports
//! missing data as [`PitWallError::NotFound`].

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::error::PitWallError;

pub mod openf1;

/// One flat provider row (a lap, a car telemetry sample, ...).
pub type Row = Map<String, Value>;

pub const LAP_NUMBER_FIELD: &str = "lap_number";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub key: u64,
    pub year: i32,
    pub race_name: String,
}

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("no race session found for {race_name} {year}")]
    SessionNotFound { year: i32, race_name: String },

    #[error("request to telemetry provider failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{0}")]
    Upstream(String),
}

#[async_trait]
pub trait TelemetryProvider: Send + Sync {
    /// Resolves the race session of the named event.
    async fn load_session(&self, year: i32, race_name: &str) -> Result<Session, ProviderError>;

    /// Every lap the driver completed in the session. Unknown drivers have none.
    async fn laps(&self, session: &Session, driver_code: &str) -> Result<Vec<Row>, ProviderError>;

    /// Every car telemetry sample of the driver in the session.
    async fn car_data(&self, session: &Session, driver_code: &str)
        -> Result<Vec<Row>, ProviderError>;
}

#[derive(Deserialize, Debug, Clone)]
pub struct LapQuery {
    pub year: i32,
    pub race_name: String,
    pub driver_code: String,
    pub lap_number: u32,
}

#[derive(Deserialize, Debug, Clone)]
pub struct CarDataQuery {
    pub year: i32,
    pub race_name: String,
    pub driver_code: String,
}

fn require(name: &str, value: &str) -> Result<(), PitWallError> {
    if value.trim().is_empty() {
        return Err(PitWallError::InvalidInput(format!("{} must not be empty", name)));
    }
    Ok(())
}

fn lap_number_of(row: &Row) -> Option<u64> {
    match row.get(LAP_NUMBER_FIELD)? {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= 0.0)
                .map(|f| f as u64)
        }),
        _ => None,
    }
}

pub async fn pick_lap(
    provider: &dyn TelemetryProvider,
    q: &LapQuery,
) -> Result<Row, PitWallError> {
    require("race_name", &q.race_name)?;
    require("driver_code", &q.driver_code)?;

    let session = provider.load_session(q.year, &q.race_name).await?;
    let laps = provider.laps(&session, &q.driver_code).await?;
    tracing::debug!(
        session = session.key,
        driver = %q.driver_code,
        "fetched {} laps",
        laps.len()
    );

    laps.into_iter()
        .find(|row| lap_number_of(row) == Some(u64::from(q.lap_number)))
        .ok_or_else(|| {
            PitWallError::NotFound(format!(
                "Lap {} does not exist for driver {}.",
                q.lap_number, q.driver_code
            ))
        })
}

pub async fn car_data(
    provider: &dyn TelemetryProvider,
    q: &CarDataQuery,
) -> Result<Vec<Row>, PitWallError> {
    require("race_name", &q.race_name)?;
    require("driver_code", &q.driver_code)?;

    let session = provider.load_session(q.year, &q.race_name).await?;
    let rows = provider.car_data(&session, &q.driver_code).await?;
    if rows.is_empty() {
        return Err(PitWallError::NotFound(format!(
            "No car data found for driver {}.",
            q.driver_code
        )));
    }
    tracing::debug!(
        session = session.key,
        driver = %q.driver_code,
        "fetched {} car data rows",
        rows.len()
    );
    Ok(rows)
}

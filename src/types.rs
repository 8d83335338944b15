use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::PitDecision;

#[derive(Debug, Deserialize)]
pub struct PitRequest {
    pub race_position: f64,
    pub track_length: f64,
    // Echoed back untouched, whatever its JSON type; plays no part in the prediction.
    pub current_lap: Value,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct PitResponse {
    pub predicted_lap_time: f64,
    pub pit_decision: PitDecision,
    pub current_lap: Value,
}

//! Request protocol
//!
//! JSON object requests carrying an `op` field alongside flat named
//! parameters:
//!
//! ```text
//! {"op": "simulate", "N_bits": 2, "theta_steer": 30, "phi_steer": 0,
//!  "theta_inc": 0, "phi_inc": 0, "Nx": 16, "Ny": 16}
//! {"op": "simulate_pattern", "N_bits": 1, "pattern_type": "checkerboard_2x2", ...}
//! {"op": "health"}
//! ```
//!
//! A response is either the flat result record or `{"error": ..., "code": ...}`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::simulation::{PatternParams, PatternResult, SteerParams, SteerResult};
use crate::types::{SimError, SimResult};

/// Operation selected by a request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum SimRequest {
    /// Steer-to-angle simulation
    Simulate(SteerParams),
    /// Fixed coding-pattern simulation
    SimulatePattern(PatternParams),
    /// Liveness check
    Health,
}

impl SimRequest {
    /// Parse one request line.
    pub fn from_json(line: &str) -> SimResult<Self> {
        let value: Value = serde_json::from_str(line)
            .map_err(|e| SimError::invalid("request", format!("malformed JSON: {}", e)))?;
        Self::from_value(value)
    }

    /// Interpret a decoded JSON value as a request.
    ///
    /// Required parameters are checked by name, in declaration order, before
    /// any typed decoding so that the first absent one is reported.
    pub fn from_value(value: Value) -> SimResult<Self> {
        let map = match value {
            Value::Object(map) => map,
            other => {
                return Err(SimError::invalid(
                    "request",
                    format!("expected a JSON object, got {}", json_kind(&other)),
                ))
            }
        };

        let op = match map.get("op") {
            Some(Value::String(op)) => op.clone(),
            Some(_) => return Err(SimError::invalid("op", "must be a string")),
            None => return Err(SimError::MissingParameter("op".to_string())),
        };

        match op.as_str() {
            "simulate" => {
                require(&map, &SteerParams::REQUIRED)?;
                Ok(SimRequest::Simulate(decode(map)?))
            }
            "simulate_pattern" => {
                require(&map, &PatternParams::REQUIRED)?;
                Ok(SimRequest::SimulatePattern(decode(map)?))
            }
            "health" => Ok(SimRequest::Health),
            other => Err(SimError::invalid(
                "op",
                format!("unknown operation '{}'", other),
            )),
        }
    }

    /// Operation name as it appears on the wire.
    pub fn op(&self) -> &'static str {
        match self {
            SimRequest::Simulate(_) => "simulate",
            SimRequest::SimulatePattern(_) => "simulate_pattern",
            SimRequest::Health => "health",
        }
    }
}

fn require(map: &Map<String, Value>, names: &[&str]) -> SimResult<()> {
    match names.iter().find(|name| !map.contains_key(**name)) {
        Some(name) => Err(SimError::MissingParameter(name.to_string())),
        None => Ok(()),
    }
}

fn decode<T: serde::de::DeserializeOwned>(map: Map<String, Value>) -> SimResult<T> {
    serde_json::from_value(Value::Object(map)).map_err(|e| SimError::invalid("request", e.to_string()))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Liveness report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub message: String,
}

impl HealthStatus {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            message: "metabeam simulator is running".to_string(),
        }
    }
}

/// Structured failure; never accompanied by a partial result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: u16,
}

impl From<&SimError> for ErrorBody {
    fn from(err: &SimError) -> Self {
        Self {
            error: err.to_string(),
            code: err.status_code(),
        }
    }
}

/// One response line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SimResponse {
    Steer(Box<SteerResult>),
    Pattern(Box<PatternResult>),
    Health(HealthStatus),
    Error(ErrorBody),
}

impl SimResponse {
    pub fn error(err: &SimError) -> Self {
        SimResponse::Error(ErrorBody::from(err))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, SimResponse::Error(_))
    }

    /// Encode as a single JSON line.
    pub fn to_line(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(
                r#"{{"error":"Response serialization failed: {}","code":500}}"#,
                e.to_string().replace('"', "'")
            )
        })
    }
}

impl From<SimResult<SteerResult>> for SimResponse {
    fn from(result: SimResult<SteerResult>) -> Self {
        match result {
            Ok(r) => SimResponse::Steer(Box::new(r)),
            Err(e) => SimResponse::error(&e),
        }
    }
}

impl From<SimResult<PatternResult>> for SimResponse {
    fn from(result: SimResult<PatternResult>) -> Self {
        match result {
            Ok(r) => SimResponse::Pattern(Box::new(r)),
            Err(e) => SimResponse::error(&e),
        }
    }
}

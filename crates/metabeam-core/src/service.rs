//! Request service
//!
//! Validates requests against the configured limits, dispatches them to the
//! backend chain, and turns every outcome into a [`SimResponse`]. Also runs
//! the newline-delimited JSON loop used by `metabeam serve`.

use std::io::{BufRead, Write};

use crate::backend::BackendChain;
use crate::config::{LimitsConfig, SimConfig};
use crate::protocol::{HealthStatus, SimRequest, SimResponse};

/// Request handler over a backend chain.
pub struct SimService {
    chain: BackendChain,
    limits: LimitsConfig,
}

impl SimService {
    pub fn new(chain: BackendChain, limits: LimitsConfig) -> Self {
        Self { chain, limits }
    }

    pub fn from_config(config: &SimConfig) -> Self {
        Self::new(BackendChain::from_config(config), config.limits.clone())
    }

    pub fn chain(&self) -> &BackendChain {
        &self.chain
    }

    /// Handle a parsed request. Parameters are range-checked before any
    /// backend runs.
    pub fn handle(&self, request: &SimRequest) -> SimResponse {
        match request {
            SimRequest::Simulate(params) => match params.validate(&self.limits) {
                Ok(()) => self.chain.steer(params).into(),
                Err(e) => SimResponse::error(&e),
            },
            SimRequest::SimulatePattern(params) => match params.validate(&self.limits) {
                Ok(()) => self.chain.pattern(params).into(),
                Err(e) => SimResponse::error(&e),
            },
            SimRequest::Health => SimResponse::Health(HealthStatus::ok()),
        }
    }

    /// Handle one raw request line.
    pub fn handle_line(&self, line: &str) -> SimResponse {
        match SimRequest::from_json(line) {
            Ok(request) => {
                let response = self.handle(&request);
                match &response {
                    SimResponse::Error(body) => {
                        tracing::info!(op = request.op(), code = body.code, error = %body.error, "Request failed")
                    }
                    _ => tracing::info!(op = request.op(), "Request complete"),
                }
                response
            }
            Err(e) => {
                tracing::info!(error = %e, "Rejected request");
                SimResponse::error(&e)
            }
        }
    }

    /// Answer one request per input line until end of input.
    ///
    /// Blank lines are skipped. Returns the number of requests answered.
    pub fn serve<R: BufRead, W: Write>(&self, reader: R, mut writer: W) -> std::io::Result<usize> {
        let mut answered = 0;
        for line in reader.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let response = self.handle_line(line);
            writeln!(writer, "{}", response.to_line())?;
            writer.flush()?;
            answered += 1;
        }
        Ok(answered)
    }
}

impl Default for SimService {
    fn default() -> Self {
        Self::from_config(&SimConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    const STEER: &str = r#"{"op":"simulate","N_bits":2,"theta_steer":30,"phi_steer":0,"theta_inc":0,"phi_inc":0,"Nx":8,"Ny":8}"#;

    #[test]
    fn test_steer_line() {
        let service = SimService::default();
        match service.handle_line(STEER) {
            SimResponse::Steer(r) => {
                assert_eq!(r.m_states, 4);
                assert_eq!(r.theta_range.first(), Some(&-80));
                assert_eq!(r.theta_range.last(), Some(&80));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_limits_enforced_before_backends() {
        let limits = LimitsConfig {
            max_bits: 8,
            max_elements_per_axis: 4,
        };
        let service = SimService::new(BackendChain::new(Vec::new()), limits);
        // An empty chain would answer 500; the 400 shows validation ran first
        match service.handle_line(STEER) {
            SimResponse::Error(body) => {
                assert_eq!(body.code, 400);
                assert!(body.error.contains("Nx"), "{}", body.error);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_serve_loop() {
        let service = SimService::default();
        let input = format!(
            "{}\n\n{}\n{}\n",
            r#"{"op":"health"}"#,
            r#"{"op":"simulate_pattern","N_bits":1,"theta_inc":0,"phi_inc":0,"Nx":4,"Ny":4}"#,
            r#"{"op":"simulate_pattern","N_bits":1,"pattern_type":"uniform_00","theta_inc":0,"phi_inc":0,"Nx":1,"Ny":1}"#,
        );
        let mut output = Vec::new();
        let answered = service.serve(input.as_bytes(), &mut output).unwrap();
        assert_eq!(answered, 3);

        let lines: Vec<Value> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines[0]["status"], "ok");
        assert_eq!(lines[1]["error"], "Missing parameter: pattern_type");
        assert_eq!(lines[1]["code"], 400);
        assert_eq!(lines[2]["sidelobe_level_quant"], "undefined");
        assert_eq!(lines[2]["pattern_type"], "uniform_00");
        assert!(lines[2].get("error").is_none());
    }
}

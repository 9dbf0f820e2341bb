//! Computation backends
//!
//! A request is computed by the first backend in an ordered chain that
//! succeeds. The native engine is always available; a [`CommandBackend`]
//! delegates to an external program speaking the request protocol on its
//! standard streams.
//!
//! ```text
//! BackendChain ─> CommandBackend ──(fails)──> NativeBackend ─> result
//!                                                 │
//!                                           (fails) ─> AllBackendsFailed
//! ```

use std::io::{Read, Write};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;

use crate::config::{BackendConfig, SimConfig};
use crate::protocol::SimRequest;
use crate::simulation::{PatternParams, PatternResult, Simulator, SteerParams, SteerResult};
use crate::types::{SimError, SimResult};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// One strategy for computing simulation results.
pub trait ComputeBackend: Send + Sync {
    fn name(&self) -> &str;

    fn steer(&self, params: &SteerParams) -> SimResult<SteerResult>;

    fn pattern(&self, params: &PatternParams) -> SimResult<PatternResult>;
}

/// In-process engine.
#[derive(Debug, Clone, Default)]
pub struct NativeBackend {
    simulator: Simulator,
}

impl NativeBackend {
    pub fn new(config: SimConfig) -> Self {
        Self {
            simulator: Simulator::new(config),
        }
    }
}

impl ComputeBackend for NativeBackend {
    fn name(&self) -> &str {
        "native"
    }

    fn steer(&self, params: &SteerParams) -> SimResult<SteerResult> {
        self.simulator.steer(params)
    }

    fn pattern(&self, params: &PatternParams) -> SimResult<PatternResult> {
        self.simulator.pattern(params)
    }
}

/// External program backend.
///
/// The request object is written to the child's stdin, which is then
/// closed; the result record is read from its stdout.
#[derive(Debug, Clone)]
pub struct CommandBackend {
    name: String,
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandBackend {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        let program = program.into();
        Self {
            name: format!("command:{}", program),
            program,
            args,
            timeout,
        }
    }

    fn failure(&self, reason: impl Into<String>) -> SimError {
        SimError::Backend {
            backend: self.name.clone(),
            reason: reason.into(),
        }
    }

    fn run<T: DeserializeOwned>(&self, request: &SimRequest) -> SimResult<T> {
        let payload = serde_json::to_vec(request)?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| self.failure(format!("spawn failed: {}", e)))?;

        let deadline = Instant::now() + self.timeout;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| self.failure("stdin not captured"))?;
        let writer = std::thread::spawn(move || stdin.write_all(&payload));

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| self.failure("stdout not captured"))?;
        let reader = std::thread::spawn(move || {
            let mut buf = Vec::new();
            stdout.read_to_end(&mut buf).map(|_| buf)
        });

        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if Instant::now() >= deadline => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(self.failure(format!(
                        "timed out after {} ms",
                        self.timeout.as_millis()
                    )));
                }
                Ok(None) => std::thread::sleep(POLL_INTERVAL),
                Err(e) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(self.failure(format!("wait failed: {}", e)));
                }
            }
        };

        if !status.success() {
            return Err(self.failure(format!("exited with {}", status)));
        }

        writer
            .join()
            .map_err(|_| self.failure("input writer panicked"))?
            .map_err(|e| self.failure(format!("write failed: {}", e)))?;

        let output = reader
            .join()
            .map_err(|_| self.failure("output reader panicked"))?
            .map_err(|e| self.failure(format!("read failed: {}", e)))?;

        serde_json::from_slice(&output)
            .map_err(|e| self.failure(format!("unparsable result: {}", e)))
    }
}

impl ComputeBackend for CommandBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn steer(&self, params: &SteerParams) -> SimResult<SteerResult> {
        self.run(&SimRequest::Simulate(params.clone()))
    }

    fn pattern(&self, params: &PatternParams) -> SimResult<PatternResult> {
        self.run(&SimRequest::SimulatePattern(params.clone()))
    }
}

/// Ordered list of backends tried until one succeeds.
pub struct BackendChain {
    backends: Vec<Box<dyn ComputeBackend>>,
}

impl BackendChain {
    pub fn new(backends: Vec<Box<dyn ComputeBackend>>) -> Self {
        Self { backends }
    }

    /// Build the chain listed in `config.backends`.
    pub fn from_config(config: &SimConfig) -> Self {
        let backends = config
            .backends
            .iter()
            .map(|b| -> Box<dyn ComputeBackend> {
                match b {
                    BackendConfig::Native => Box::new(NativeBackend::new(config.clone())),
                    BackendConfig::Command {
                        program,
                        args,
                        timeout_ms,
                    } => Box::new(CommandBackend::new(
                        program.clone(),
                        args.clone(),
                        Duration::from_millis(*timeout_ms),
                    )),
                }
            })
            .collect();
        Self::new(backends)
    }

    pub fn names(&self) -> Vec<&str> {
        self.backends.iter().map(|b| b.name()).collect()
    }

    pub fn steer(&self, params: &SteerParams) -> SimResult<SteerResult> {
        self.first_success("simulate", |b| b.steer(params))
    }

    pub fn pattern(&self, params: &PatternParams) -> SimResult<PatternResult> {
        self.first_success("simulate_pattern", |b| b.pattern(params))
    }

    fn first_success<T>(
        &self,
        op: &str,
        run: impl Fn(&dyn ComputeBackend) -> SimResult<T>,
    ) -> SimResult<T> {
        let mut failures = Vec::new();
        for backend in &self.backends {
            match run(backend.as_ref()) {
                Ok(result) => {
                    if !failures.is_empty() {
                        tracing::info!(op, backend = backend.name(), "Fallback backend succeeded");
                    }
                    return Ok(result);
                }
                // The request itself is at fault; another backend would reject it too
                Err(e) if e.is_client_error() => return Err(e),
                Err(e) => {
                    tracing::warn!(op, backend = backend.name(), error = %e, "Backend failed, trying next");
                    failures.push(format!("{}: {}", backend.name(), e));
                }
            }
        }
        if failures.is_empty() {
            failures.push("no backends configured".to_string());
        }
        Err(SimError::AllBackendsFailed(failures.join("; ")))
    }
}

impl Default for BackendChain {
    fn default() -> Self {
        Self::new(vec![Box::new(NativeBackend::default())])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BrokenBackend;

    impl ComputeBackend for BrokenBackend {
        fn name(&self) -> &str {
            "broken"
        }

        fn steer(&self, _params: &SteerParams) -> SimResult<SteerResult> {
            Err(SimError::Backend {
                backend: "broken".to_string(),
                reason: "unavailable".to_string(),
            })
        }

        fn pattern(&self, _params: &PatternParams) -> SimResult<PatternResult> {
            Err(SimError::Backend {
                backend: "broken".to_string(),
                reason: "unavailable".to_string(),
            })
        }
    }

    fn steer_params() -> SteerParams {
        SteerParams {
            n_bits: 2,
            theta_steer: 20.0,
            phi_steer: 0.0,
            theta_inc: 0.0,
            phi_inc: 0.0,
            nx: 6,
            ny: 6,
        }
    }

    fn pattern_params() -> PatternParams {
        PatternParams {
            n_bits: 1,
            pattern_type: "checkerboard_2x2".to_string(),
            theta_inc: 0.0,
            phi_inc: 0.0,
            nx: 4,
            ny: 4,
        }
    }

    #[test]
    fn test_fallback_matches_native() {
        let chain = BackendChain::new(vec![Box::new(BrokenBackend), Box::new(NativeBackend::default())]);
        let via_chain = chain.steer(&steer_params()).unwrap();
        let direct = NativeBackend::default().steer(&steer_params()).unwrap();
        assert_eq!(via_chain, direct);
        assert!(chain.pattern(&pattern_params()).is_ok());
    }

    #[test]
    fn test_all_backends_failed() {
        let chain = BackendChain::new(vec![Box::new(BrokenBackend), Box::new(BrokenBackend)]);
        let err = chain.steer(&steer_params()).unwrap_err();
        assert!(matches!(err, SimError::AllBackendsFailed(_)));
        assert_eq!(err.status_code(), 500);
    }

    #[test]
    fn test_empty_chain_fails() {
        let chain = BackendChain::new(Vec::new());
        assert!(matches!(
            chain.pattern(&pattern_params()),
            Err(SimError::AllBackendsFailed(_))
        ));
    }

    #[test]
    fn test_client_error_not_retried() {
        let chain = BackendChain::default();
        let mut p = steer_params();
        p.nx = 0;
        assert!(chain.steer(&p).unwrap_err().is_client_error());
    }

    #[test]
    fn test_from_config_order() {
        let mut config = SimConfig::default();
        config.backends = vec![
            BackendConfig::Command {
                program: "octave-bridge".to_string(),
                args: vec![],
                timeout_ms: 1000,
            },
            BackendConfig::Native,
        ];
        let chain = BackendChain::from_config(&config);
        assert_eq!(chain.names(), vec!["command:octave-bridge", "native"]);
    }

    #[test]
    fn test_missing_program_is_backend_failure() {
        let backend = CommandBackend::new(
            "metabeam-no-such-program",
            vec![],
            Duration::from_secs(1),
        );
        let err = backend.steer(&steer_params()).unwrap_err();
        assert!(matches!(err, SimError::Backend { .. }));
        assert!(!err.is_client_error());
    }

    #[cfg(unix)]
    #[test]
    fn test_command_nonzero_exit() {
        let backend = CommandBackend::new(
            "sh",
            vec!["-c".to_string(), "cat > /dev/null; exit 3".to_string()],
            Duration::from_secs(5),
        );
        let err = backend.pattern(&pattern_params()).unwrap_err();
        assert!(matches!(err, SimError::Backend { .. }));
        assert!(err.to_string().contains("exited with"), "{}", err);
    }

    #[cfg(unix)]
    #[test]
    fn test_command_unparsable_output() {
        // cat echoes the request, which is not a result record
        let backend = CommandBackend::new("cat", vec![], Duration::from_secs(5));
        let err = backend.steer(&steer_params()).unwrap_err();
        assert!(err.to_string().contains("unparsable"), "{}", err);
    }

    #[cfg(unix)]
    #[test]
    fn test_command_timeout() {
        let backend = CommandBackend::new(
            "sh",
            vec!["-c".to_string(), "sleep 5".to_string()],
            Duration::from_millis(50),
        );
        let started = Instant::now();
        let err = backend.steer(&steer_params()).unwrap_err();
        assert!(err.to_string().contains("timed out"), "{}", err);
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[cfg(unix)]
    #[test]
    fn test_command_timeout_covers_child_ignoring_stdin() {
        let backend = CommandBackend::new(
            "sh",
            vec!["-c".to_string(), "exec 0<&-; sleep 5".to_string()],
            Duration::from_millis(50),
        );
        let started = Instant::now();
        let err = backend.pattern(&pattern_params()).unwrap_err();
        assert!(err.to_string().contains("timed out"), "{}", err);
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[cfg(unix)]
    #[test]
    fn test_command_result_parsed() {
        let native = NativeBackend::default().pattern(&pattern_params()).unwrap();
        let record = serde_json::to_string(&native).unwrap();
        let backend = CommandBackend::new(
            "sh",
            vec!["-c".to_string(), format!("cat > /dev/null; printf '%s' '{}'", record)],
            Duration::from_secs(5),
        );
        let parsed = backend.pattern(&pattern_params()).unwrap();
        assert_eq!(parsed.m_states, native.m_states);
        assert_eq!(parsed.pattern_type, native.pattern_type);
        assert_eq!(parsed.theta_range, native.theta_range);
        for (a, b) in parsed.af_quantized_db_eplane.iter().zip(&native.af_quantized_db_eplane) {
            assert!((a - b).abs() < 1e-9);
        }
    }
}

//! Simulation operations
//!
//! Two entry points, each a pure function of its parameters and the
//! configuration:
//!
//! - [`Simulator::steer`]: synthesize a steering profile, quantise it, and
//!   compare continuous against quantised far-field patterns
//! - [`Simulator::pattern`]: evaluate a canonical coding pattern
//!
//! ```text
//! ArrayGeometry ─┬─> PhaseProfile ──┐
//!                └─> CodingPattern ─┴─> ArrayFactor ─> PatternDb ─> metrics ─> result
//! ```
//!
//! Result field names are the wire contract and are kept verbatim
//! (`AF_quantized_db_eplane`, `M_states`, ...).

use serde::{Deserialize, Serialize};

use crate::array_factor::{excitation_weights, ArrayFactor, Sweep};
use crate::coding_pattern::{CodingPattern, PatternKind};
use crate::config::{LimitsConfig, SimConfig};
use crate::geometry::ArrayGeometry;
use crate::metrics::{peak_angles, SidelobeLevel, SimulationMetrics};
use crate::phase_profile::{PhaseProfile, SteeringRequest};
use crate::types::{Grid, SimError, SimResult};

fn check_bits(n_bits: u32, limits: &LimitsConfig) -> SimResult<()> {
    if n_bits == 0 || n_bits > limits.max_bits {
        return Err(SimError::invalid(
            "N_bits",
            format!("must be between 1 and {}, got {}", limits.max_bits, n_bits),
        ));
    }
    Ok(())
}

fn check_elements(name: &str, n: usize, limits: &LimitsConfig) -> SimResult<()> {
    if n == 0 || n > limits.max_elements_per_axis {
        return Err(SimError::invalid(
            name,
            format!(
                "must be between 1 and {}, got {}",
                limits.max_elements_per_axis, n
            ),
        ));
    }
    Ok(())
}

fn check_angle(name: &str, deg: f64) -> SimResult<()> {
    if !deg.is_finite() {
        return Err(SimError::invalid(name, "must be a finite angle in degrees"));
    }
    Ok(())
}

/// Parameters of the steer-to-angle operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SteerParams {
    #[serde(rename = "N_bits")]
    pub n_bits: u32,
    pub theta_steer: f64,
    pub phi_steer: f64,
    pub theta_inc: f64,
    pub phi_inc: f64,
    #[serde(rename = "Nx")]
    pub nx: usize,
    #[serde(rename = "Ny")]
    pub ny: usize,
}

impl SteerParams {
    /// Parameter names that must be present in a request.
    pub const REQUIRED: [&'static str; 7] = [
        "N_bits",
        "theta_steer",
        "phi_steer",
        "theta_inc",
        "phi_inc",
        "Nx",
        "Ny",
    ];

    /// Range-check every field.
    pub fn validate(&self, limits: &LimitsConfig) -> SimResult<()> {
        check_bits(self.n_bits, limits)?;
        check_angle("theta_steer", self.theta_steer)?;
        check_angle("phi_steer", self.phi_steer)?;
        check_angle("theta_inc", self.theta_inc)?;
        check_angle("phi_inc", self.phi_inc)?;
        check_elements("Nx", self.nx, limits)?;
        check_elements("Ny", self.ny, limits)
    }

    pub fn steering_request(&self) -> SteeringRequest {
        SteeringRequest::new(
            self.n_bits,
            self.theta_steer,
            self.phi_steer,
            self.theta_inc,
            self.phi_inc,
        )
    }
}

/// Parameters of the fixed coding-pattern operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternParams {
    #[serde(rename = "N_bits")]
    pub n_bits: u32,
    pub pattern_type: String,
    pub theta_inc: f64,
    pub phi_inc: f64,
    #[serde(rename = "Nx")]
    pub nx: usize,
    #[serde(rename = "Ny")]
    pub ny: usize,
}

impl PatternParams {
    /// Parameter names that must be present in a request.
    pub const REQUIRED: [&'static str; 6] =
        ["N_bits", "pattern_type", "theta_inc", "phi_inc", "Nx", "Ny"];

    /// Range-check every field. Unknown pattern names are accepted.
    pub fn validate(&self, limits: &LimitsConfig) -> SimResult<()> {
        check_bits(self.n_bits, limits)?;
        check_angle("theta_inc", self.theta_inc)?;
        check_angle("phi_inc", self.phi_inc)?;
        check_elements("Nx", self.nx, limits)?;
        check_elements("Ny", self.ny, limits)
    }
}

/// Result record of the steer-to-angle operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SteerResult {
    pub theta_range: Vec<i32>,
    #[serde(rename = "AF_continuous_db_eplane")]
    pub af_continuous_db_eplane: Vec<f64>,
    #[serde(rename = "AF_quantized_db_eplane")]
    pub af_quantized_db_eplane: Vec<f64>,
    #[serde(rename = "AF_continuous_db_hplane")]
    pub af_continuous_db_hplane: Vec<f64>,
    #[serde(rename = "AF_quantized_db_hplane")]
    pub af_quantized_db_hplane: Vec<f64>,
    /// Continuous phase in degrees, `Ny × Nx`
    pub phase_desired: Grid<f64>,
    /// Quantised phase in degrees, `Ny × Nx`
    pub phase_quantized: Grid<f64>,
    /// `max(continuous dB) − max(quantised dB)` over the normalised patterns
    pub gain_loss_db: f64,
    /// Raw-sum peak of the continuous pattern minus that of the quantised one
    pub quantization_loss_db: f64,
    pub sidelobe_level_quant: SidelobeLevel,
    /// One entry per cut
    pub pointing_error: Vec<f64>,
    #[serde(rename = "M_states")]
    pub m_states: u32,
    /// One entry per cut
    pub theta_peak_quant: Vec<f64>,
}

/// Result record of the coding-pattern operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternResult {
    pub theta_range: Vec<i32>,
    #[serde(rename = "AF_quantized_db_eplane")]
    pub af_quantized_db_eplane: Vec<f64>,
    #[serde(rename = "AF_quantized_db_hplane")]
    pub af_quantized_db_hplane: Vec<f64>,
    /// Pattern phase in degrees, `Ny × Nx`
    pub phase_quantized: Grid<f64>,
    pub sidelobe_level_quant: SidelobeLevel,
    #[serde(rename = "M_states")]
    pub m_states: u32,
    pub theta_peak_quant: Vec<f64>,
    pub pattern_type: String,
}

/// Stateless simulation engine; holds only configuration.
#[derive(Debug, Clone, Default)]
pub struct Simulator {
    config: SimConfig,
}

impl Simulator {
    pub fn new(config: SimConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    fn geometry(&self, nx: usize, ny: usize) -> ArrayGeometry {
        ArrayGeometry::half_wavelength(nx, ny, &self.config.physics)
    }

    /// Operation A: steer to `(theta_steer, phi_steer)` with `N_bits` states.
    pub fn steer(&self, params: &SteerParams) -> SimResult<SteerResult> {
        params.validate(&self.config.limits)?;

        let k0 = self.config.physics.wavenumber();
        let sweep = Sweep::from_config(&self.config.sweep);
        let floor = self.config.analysis.db_floor;

        let geometry = self.geometry(params.nx, params.ny);
        let request = params.steering_request();
        let profile = PhaseProfile::synthesize(&geometry, &request, k0);

        let continuous = ArrayFactor::evaluate(&geometry, &excitation_weights(&profile.continuous), k0, &sweep);
        let quantized = ArrayFactor::evaluate(&geometry, &excitation_weights(&profile.quantized), k0, &sweep);
        let continuous_db = continuous.normalized_db(floor);
        let quantized_db = quantized.normalized_db(floor);

        let metrics = SimulationMetrics::compute(
            &continuous,
            &quantized,
            &continuous_db,
            &quantized_db,
            params.theta_steer,
            self.config.analysis.sidelobe_threshold_db,
            floor,
        );

        tracing::debug!(
            nx = params.nx,
            ny = params.ny,
            m_states = profile.m_states,
            quantization_loss_db = metrics.quantization_loss_db,
            "Steer simulation complete"
        );

        let [cont_e, cont_h] = continuous_db.cuts;
        let [quant_e, quant_h] = quantized_db.cuts;
        Ok(SteerResult {
            theta_range: sweep.theta_deg,
            af_continuous_db_eplane: cont_e,
            af_quantized_db_eplane: quant_e,
            af_continuous_db_hplane: cont_h,
            af_quantized_db_hplane: quant_h,
            phase_desired: profile.continuous_degrees(),
            phase_quantized: profile.quantized_degrees(),
            gain_loss_db: metrics.gain_loss_db,
            quantization_loss_db: metrics.quantization_loss_db,
            sidelobe_level_quant: metrics.sidelobe_level,
            pointing_error: metrics.pointing_error.to_vec(),
            m_states: profile.m_states,
            theta_peak_quant: metrics.theta_peak.to_vec(),
        })
    }

    /// Operation B: evaluate the named coding pattern.
    ///
    /// The incidence angles are carried for the record; canonical patterns
    /// are not derived from them. No gain loss is reported because there is
    /// no continuous reference.
    pub fn pattern(&self, params: &PatternParams) -> SimResult<PatternResult> {
        params.validate(&self.config.limits)?;

        let k0 = self.config.physics.wavenumber();
        let sweep = Sweep::from_config(&self.config.sweep);

        let geometry = self.geometry(params.nx, params.ny);
        let kind = PatternKind::parse(&params.pattern_type);
        let pattern = CodingPattern::generate(&kind, params.n_bits, params.nx, params.ny);
        let weights = excitation_weights(&pattern.phase_radians());

        let field = ArrayFactor::evaluate(&geometry, &weights, k0, &sweep);
        let db = field.normalized_db(self.config.analysis.db_floor);
        let theta_peak = peak_angles(&db);
        let sidelobe = SidelobeLevel::of(&db, self.config.analysis.sidelobe_threshold_db);

        tracing::debug!(
            pattern = %params.pattern_type,
            recognized = kind.is_recognized(),
            m_states = pattern.m_states,
            "Pattern simulation complete"
        );

        let [quant_e, quant_h] = db.cuts;
        Ok(PatternResult {
            theta_range: sweep.theta_deg,
            af_quantized_db_eplane: quant_e,
            af_quantized_db_hplane: quant_h,
            phase_quantized: pattern.phase_degrees(),
            sidelobe_level_quant: sidelobe,
            m_states: pattern.m_states,
            theta_peak_quant: theta_peak.to_vec(),
            pattern_type: params.pattern_type.clone(),
        })
    }
}

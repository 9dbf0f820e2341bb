//! Phase Profile Synthesizer
//!
//! Computes the continuous progressive phase each element needs to reflect
//! a wave arriving from `(theta_inc, phi_inc)` towards `(theta_steer,
//! phi_steer)`, then quantises it to one of `M = 2^N` discrete states.
//!
//! ```text
//! phi(x, y) = k0 · [ x·(sinθs·cosφs − sinθi·cosφi)
//!                  + y·(sinθs·sinφs − sinθi·sinφi) ]
//! ```
//!
//! Quantisation shifts the wrapped phase by +π, floors it onto the state
//! lattice `2π/M`, and shifts back, so every element lands on the nearest
//! state at or below its continuous phase.
//!
//! # Example
//!
//! ```
//! use metabeam_core::geometry::ArrayGeometry;
//! use metabeam_core::phase_profile::{PhaseProfile, SteeringRequest};
//!
//! let geom = ArrayGeometry::new(8, 8, 0.015);
//! let request = SteeringRequest::new(2, 30.0, 0.0, 0.0, 0.0);
//! let profile = PhaseProfile::synthesize(&geom, &request, 2.0 * std::f64::consts::PI / 0.03);
//! assert_eq!(profile.quantized.len(), 64);
//! ```

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::geometry::ArrayGeometry;
use crate::types::Grid;

/// Wrap an angle in radians onto `[-π, π)`.
pub fn wrap_phase(phase: f64) -> f64 {
    (phase + PI).rem_euclid(2.0 * PI) - PI
}

/// Wrap an angle in degrees onto `[-180, 180)`.
pub fn wrap_degrees(deg: f64) -> f64 {
    (deg + 180.0).rem_euclid(360.0) - 180.0
}

/// Number of discrete phase states for `bits` of resolution.
pub fn num_states(bits: u32) -> u32 {
    1u32 << bits
}

/// Quantiser step, `2π / M`.
pub fn phase_step(m_states: u32) -> f64 {
    2.0 * PI / m_states as f64
}

/// State index of an already-wrapped phase, in `[0, M)`.
pub fn state_index(wrapped: f64, m_states: u32) -> u32 {
    let shifted = wrapped + PI;
    let idx = (shifted / (2.0 * PI) * m_states as f64).floor();
    // rem_euclid can return exactly 2π after rounding, which would floor to M
    (idx.max(0.0) as u32).min(m_states - 1)
}

/// Quantise one wrapped phase to its state's representative phase.
pub fn quantize_phase(wrapped: f64, m_states: u32) -> f64 {
    let idx = state_index(wrapped, m_states);
    wrap_phase(idx as f64 * phase_step(m_states) - PI)
}

/// Beam direction and phase resolution for one simulation run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SteeringRequest {
    /// Phase resolution in bits
    pub n_bits: u32,
    /// Desired beam polar angle (degrees)
    pub theta_steer: f64,
    /// Desired beam azimuth (degrees)
    pub phi_steer: f64,
    /// Incident wave polar angle (degrees)
    pub theta_inc: f64,
    /// Incident wave azimuth (degrees)
    pub phi_inc: f64,
}

impl SteeringRequest {
    pub fn new(n_bits: u32, theta_steer: f64, phi_steer: f64, theta_inc: f64, phi_inc: f64) -> Self {
        Self {
            n_bits,
            theta_steer,
            phi_steer,
            theta_inc,
            phi_inc,
        }
    }

    /// `M_states = 2^N_bits`.
    pub fn m_states(&self) -> u32 {
        num_states(self.n_bits)
    }

    /// Direction-cosine difference `(u, v)` between steer and incidence.
    fn direction_delta(&self) -> (f64, f64) {
        let (ts, ps) = (self.theta_steer.to_radians(), self.phi_steer.to_radians());
        let (ti, pinc) = (self.theta_inc.to_radians(), self.phi_inc.to_radians());
        (
            ts.sin() * ps.cos() - ti.sin() * pinc.cos(),
            ts.sin() * ps.sin() - ti.sin() * pinc.sin(),
        )
    }
}

/// Continuous and quantised phase per element, radians, `Ny × Nx`.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseProfile {
    /// Ideal phase wrapped to `[-π, π)`
    pub continuous: Grid<f64>,
    /// Phase snapped to one of `M_states` levels
    pub quantized: Grid<f64>,
    /// Number of states used for `quantized`
    pub m_states: u32,
}

impl PhaseProfile {
    /// Synthesize the profile for `request` on `geometry` at wave-number `k0`.
    pub fn synthesize(geometry: &ArrayGeometry, request: &SteeringRequest, k0: f64) -> Self {
        let (u, v) = request.direction_delta();
        let continuous = geometry
            .x()
            .zip_map(geometry.y(), |&x, &y| wrap_phase(k0 * (x * u + y * v)));

        let m_states = request.m_states();
        let quantized = continuous.map(|&p| quantize_phase(p, m_states));

        tracing::debug!(
            elements = geometry.num_elements(),
            m_states,
            "Synthesized phase profile"
        );

        Self {
            continuous,
            quantized,
            m_states,
        }
    }

    /// Per-element `continuous − quantized`, in `[0, 2π/M)`.
    pub fn quantization_error(&self) -> Grid<f64> {
        self.continuous.zip_map(&self.quantized, |&c, &q| c - q)
    }

    /// State index of every quantised element.
    pub fn state_indices(&self) -> Grid<u32> {
        self.continuous.map(|&p| state_index(p, self.m_states))
    }

    /// Continuous phase in degrees.
    pub fn continuous_degrees(&self) -> Grid<f64> {
        self.continuous.map(|p| p.to_degrees())
    }

    /// Quantised phase in degrees.
    pub fn quantized_degrees(&self) -> Grid<f64> {
        self.quantized.map(|p| p.to_degrees())
    }
}

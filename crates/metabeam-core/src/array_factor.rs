//! Array Factor Evaluator
//!
//! Far-field array factor of a uniform-amplitude, isotropic-element planar
//! array, evaluated by direct summation over a fixed angular sweep:
//!
//! ```text
//! AF(θ, φ) = Σ_n  w_n · exp(j · k0 · sinθ · (x_n·cosφ + y_n·sinφ))
//! ```
//!
//! with element weights `w_n = exp(-j·phase_n)`. Two principal-plane cuts
//! are evaluated (E-plane first, H-plane second). Each cut is normalised to
//! its own peak magnitude before conversion to dB, so every cut peaks at
//! exactly 0 dB.
//!
//! # Example
//!
//! ```
//! use metabeam_core::array_factor::{excitation_weights, ArrayFactor, Sweep};
//! use metabeam_core::geometry::ArrayGeometry;
//! use metabeam_core::types::Grid;
//!
//! let geom = ArrayGeometry::new(8, 8, 0.015);
//! let weights = excitation_weights(&Grid::from_fn(8, 8, |_, _| 0.0));
//! let af = ArrayFactor::evaluate(&geom, &weights, 2.0 * std::f64::consts::PI / 0.03, &Sweep::default());
//! let db = af.normalized_db(1e-10);
//! assert_eq!(db.peak_theta(0), 0.0);
//! ```

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::config::SweepConfig;
use crate::geometry::ArrayGeometry;
use crate::types::{Complex, Grid};

/// Observation angles: theta samples shared by both azimuth cuts.
#[derive(Debug, Clone, PartialEq)]
pub struct Sweep {
    /// Theta samples in degrees
    pub theta_deg: Vec<i32>,
    /// Azimuth of each cut in degrees (E-plane, H-plane)
    pub phi_cuts_deg: [f64; 2],
}

impl Default for Sweep {
    fn default() -> Self {
        Self::from_config(&SweepConfig::default())
    }
}

impl Sweep {
    /// Build a sweep from configuration; missing cuts fall back to 0° / 90°.
    pub fn from_config(config: &SweepConfig) -> Self {
        let cut = |i: usize, default: f64| config.phi_cuts_deg.get(i).copied().unwrap_or(default);
        Self {
            theta_deg: config.theta_range(),
            phi_cuts_deg: [cut(0, 0.0), cut(1, 90.0)],
        }
    }

    pub fn len(&self) -> usize {
        self.theta_deg.len()
    }

    pub fn is_empty(&self) -> bool {
        self.theta_deg.is_empty()
    }
}

/// Complex excitation `exp(-j·phase)` for a phase grid in radians.
pub fn excitation_weights(phase: &Grid<f64>) -> Grid<Complex> {
    phase.map(|&p| Complex::from_polar(1.0, -p))
}

/// Coherent sum at one observation direction.
fn sum_at(elements: &[(f64, f64, Complex)], k0: f64, theta_deg: f64, phi_deg: f64) -> Complex {
    let theta = theta_deg.to_radians();
    let phi = phi_deg.to_radians();
    let (ux, uy) = (theta.sin() * phi.cos(), theta.sin() * phi.sin());
    elements
        .iter()
        .map(|&(x, y, w)| w * Complex::from_polar(1.0, k0 * (x * ux + y * uy)))
        .sum()
}

/// Raw complex array factor per (cut, theta).
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayFactor {
    pub sweep: Sweep,
    /// `field[cut][theta_index]`
    pub field: [Vec<Complex>; 2],
}

impl ArrayFactor {
    /// Evaluate `weights` on `geometry` over `sweep`.
    ///
    /// `weights` must have the geometry's `Ny × Nx` shape.
    pub fn evaluate(geometry: &ArrayGeometry, weights: &Grid<Complex>, k0: f64, sweep: &Sweep) -> Self {
        debug_assert_eq!(weights.len(), geometry.num_elements());
        let elements: Vec<(f64, f64, Complex)> = geometry
            .positions()
            .zip(weights.iter())
            .map(|((x, y), &w)| (x, y, w))
            .collect();

        let cut = |phi: f64| -> Vec<Complex> {
            #[cfg(feature = "parallel")]
            let iter = sweep.theta_deg.par_iter();
            #[cfg(not(feature = "parallel"))]
            let iter = sweep.theta_deg.iter();
            iter.map(|&theta| sum_at(&elements, k0, theta as f64, phi))
                .collect()
        };

        let field = [cut(sweep.phi_cuts_deg[0]), cut(sweep.phi_cuts_deg[1])];

        tracing::debug!(
            elements = elements.len(),
            samples = sweep.len(),
            "Evaluated array factor"
        );

        Self {
            sweep: sweep.clone(),
            field,
        }
    }

    /// Largest `|AF|` of one cut.
    pub fn peak_magnitude(&self, cut: usize) -> f64 {
        self.field[cut].iter().map(|c| c.norm()).fold(0.0, f64::max)
    }

    /// Largest `|AF|` across both cuts.
    pub fn global_peak_magnitude(&self) -> f64 {
        self.peak_magnitude(0).max(self.peak_magnitude(1))
    }

    /// Peak-normalised pattern in dB, `20·log10(|AF|/peak + floor)`, per cut.
    pub fn normalized_db(&self, db_floor: f64) -> PatternDb {
        let cut_db = |cut: usize| {
            let peak = self.peak_magnitude(cut);
            let scale = if peak > 0.0 { 1.0 / peak } else { 0.0 };
            self.field[cut]
                .iter()
                .map(|c| 20.0 * (c.norm() * scale + db_floor).log10())
                .collect()
        };
        PatternDb {
            theta_deg: self.sweep.theta_deg.clone(),
            cuts: [cut_db(0), cut_db(1)],
        }
    }

    /// Un-normalised peak in dB, `20·log10(peak + floor)`, across both cuts.
    pub fn absolute_peak_db(&self, db_floor: f64) -> f64 {
        20.0 * (self.global_peak_magnitude() + db_floor).log10()
    }
}

/// Normalised dB pattern for both cuts.
#[derive(Debug, Clone, PartialEq)]
pub struct PatternDb {
    pub theta_deg: Vec<i32>,
    /// `cuts[0]` is the E-plane, `cuts[1]` the H-plane
    pub cuts: [Vec<f64>; 2],
}

impl PatternDb {
    pub fn eplane(&self) -> &[f64] {
        &self.cuts[0]
    }

    pub fn hplane(&self) -> &[f64] {
        &self.cuts[1]
    }

    /// Index of the first maximum of a cut.
    pub fn peak_index(&self, cut: usize) -> usize {
        let mut best = 0;
        for (i, &v) in self.cuts[cut].iter().enumerate() {
            if v > self.cuts[cut][best] {
                best = i;
            }
        }
        best
    }

    /// Theta (degrees) of the first maximum of a cut.
    pub fn peak_theta(&self, cut: usize) -> f64 {
        self.theta_deg.get(self.peak_index(cut)).map_or(0.0, |&t| t as f64)
    }

    /// Highest dB value across both cuts.
    pub fn global_peak(&self) -> f64 {
        self.samples().fold(f64::NEG_INFINITY, f64::max)
    }

    /// All samples of both cuts, E-plane first.
    pub fn samples(&self) -> impl Iterator<Item = f64> + '_ {
        self.cuts[0].iter().chain(self.cuts[1].iter()).copied()
    }
}

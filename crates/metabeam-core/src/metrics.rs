//! Beam-steering performance metrics
//!
//! Derived from evaluated patterns on every run:
//!
//! - **Pointing error**: per cut, `|θ_peak − θ_steer|`
//! - **Gain loss**: peak of the normalised continuous pattern minus peak of
//!   the normalised quantised pattern
//! - **Quantisation loss**: the same comparison on the raw (un-normalised)
//!   sums, i.e. the directivity actually given up to phase quantisation
//! - **Sidelobe level**: highest sample lying strictly more than the
//!   threshold below the pattern peak, taken over both cuts

use serde::{Deserialize, Serialize};

use crate::array_factor::{ArrayFactor, PatternDb};
use crate::types::{SimError, SimResult};

/// Observed peak angle of each cut, E-plane first.
pub fn peak_angles(pattern: &PatternDb) -> [f64; 2] {
    [pattern.peak_theta(0), pattern.peak_theta(1)]
}

/// `|θ_peak − θ_steer|` for each cut.
pub fn pointing_error(pattern: &PatternDb, theta_steer: f64) -> [f64; 2] {
    peak_angles(pattern).map(|peak| (peak - theta_steer).abs())
}

/// `max(continuous_db) − max(quantized_db)` over both cuts of the
/// normalised patterns.
///
/// Each pattern peaks at 0 dB after normalisation, so this stays within the
/// dB floor of zero; see [`quantization_loss_db`] for the raw comparison.
pub fn gain_loss_db(continuous_db: &PatternDb, quantized_db: &PatternDb) -> f64 {
    continuous_db.global_peak() - quantized_db.global_peak()
}

/// Peak of the raw continuous sum minus peak of the raw quantised sum, in dB.
pub fn quantization_loss_db(continuous: &ArrayFactor, quantized: &ArrayFactor, db_floor: f64) -> f64 {
    continuous.absolute_peak_db(db_floor) - quantized.absolute_peak_db(db_floor)
}

/// Highest sample strictly more than `threshold_db` below the global peak.
///
/// Fails with [`SimError::NoSidelobe`] when every sample lies within the
/// threshold of the peak.
pub fn sidelobe_level(pattern: &PatternDb, threshold_db: f64) -> SimResult<f64> {
    let cutoff = pattern.global_peak() - threshold_db;
    pattern
        .samples()
        .filter(|&v| v < cutoff)
        .fold(None, |best: Option<f64>, v| Some(best.map_or(v, |b| b.max(v))))
        .ok_or(SimError::NoSidelobe { threshold_db })
}

/// Sidelobe outcome as reported in a result record.
///
/// Serializes as the dB value, or the string `"undefined"` when no sample
/// cleared the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SidelobeLevel {
    Level(f64),
    Undefined(Undefined),
}

/// Marker serialized as `"undefined"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Undefined {
    Undefined,
}

impl SidelobeLevel {
    pub const UNDEFINED: SidelobeLevel = SidelobeLevel::Undefined(Undefined::Undefined);

    /// Evaluate on `pattern`, folding the not-found case into `UNDEFINED`.
    pub fn of(pattern: &PatternDb, threshold_db: f64) -> Self {
        match sidelobe_level(pattern, threshold_db) {
            Ok(level) => SidelobeLevel::Level(level),
            Err(e) => {
                tracing::debug!("{}", e);
                Self::UNDEFINED
            }
        }
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            SidelobeLevel::Level(v) => Some(*v),
            SidelobeLevel::Undefined(_) => None,
        }
    }
}

/// Metrics of one steer-to-angle run.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationMetrics {
    pub theta_peak: [f64; 2],
    pub pointing_error: [f64; 2],
    pub gain_loss_db: f64,
    pub quantization_loss_db: f64,
    pub sidelobe_level: SidelobeLevel,
}

impl SimulationMetrics {
    /// Compute every metric for a continuous / quantised pattern pair.
    pub fn compute(
        continuous: &ArrayFactor,
        quantized: &ArrayFactor,
        continuous_db: &PatternDb,
        quantized_db: &PatternDb,
        theta_steer: f64,
        threshold_db: f64,
        db_floor: f64,
    ) -> Self {
        Self {
            theta_peak: peak_angles(quantized_db),
            pointing_error: pointing_error(quantized_db, theta_steer),
            gain_loss_db: gain_loss_db(continuous_db, quantized_db),
            quantization_loss_db: quantization_loss_db(continuous, quantized, db_floor),
            sidelobe_level: SidelobeLevel::of(quantized_db, threshold_db),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array_factor::{excitation_weights, Sweep};
    use crate::geometry::ArrayGeometry;
    use crate::phase_profile::{PhaseProfile, SteeringRequest};
    use std::f64::consts::PI;

    const K0: f64 = 2.0 * PI / 0.03;

    fn pattern(theta: Vec<i32>, e: Vec<f64>, h: Vec<f64>) -> PatternDb {
        PatternDb {
            theta_deg: theta,
            cuts: [e, h],
        }
    }

    fn steer(bits: u32, n: usize, theta: f64) -> (ArrayFactor, ArrayFactor) {
        let geom = ArrayGeometry::new(n, n, 0.015);
        let req = SteeringRequest::new(bits, theta, 0.0, 0.0, 0.0);
        let profile = PhaseProfile::synthesize(&geom, &req, K0);
        let sweep = Sweep::default();
        (
            ArrayFactor::evaluate(&geom, &excitation_weights(&profile.continuous), K0, &sweep),
            ArrayFactor::evaluate(&geom, &excitation_weights(&profile.quantized), K0, &sweep),
        )
    }

    #[test]
    fn test_pointing_error_per_cut() {
        let p = pattern(vec![-10, 0, 10], vec![-5.0, -1.0, 0.0], vec![-1.0, 0.0, -2.0]);
        assert_eq!(peak_angles(&p), [10.0, 0.0]);
        assert_eq!(pointing_error(&p, 10.0), [0.0, 10.0]);
    }

    #[test]
    fn test_sidelobe_strictly_below_threshold() {
        let p = pattern(vec![0, 1, 2], vec![0.0, -3.0, -3.5], vec![-2.0, -13.0, -20.0]);
        // -3.0 sits exactly on the threshold and is excluded
        assert_eq!(sidelobe_level(&p, 3.0).unwrap(), -3.5);
    }

    #[test]
    fn test_sidelobe_not_found() {
        let p = pattern(vec![0, 1], vec![0.0, -1.0], vec![-2.9, 0.0]);
        assert!(matches!(
            sidelobe_level(&p, 3.0),
            Err(SimError::NoSidelobe { .. })
        ));
        assert_eq!(SidelobeLevel::of(&p, 3.0), SidelobeLevel::UNDEFINED);
    }

    #[test]
    fn test_sidelobe_single_element_undefined() {
        let geom = ArrayGeometry::new(1, 1, 0.015);
        let w = excitation_weights(&crate::types::Grid::from_fn(1, 1, |_, _| 0.0));
        let db = ArrayFactor::evaluate(&geom, &w, K0, &Sweep::default()).normalized_db(1e-10);
        assert!(sidelobe_level(&db, 3.0).is_err());
    }

    #[test]
    fn test_sidelobe_serialization() {
        assert_eq!(serde_json::to_string(&SidelobeLevel::UNDEFINED).unwrap(), "\"undefined\"");
        assert_eq!(serde_json::to_string(&SidelobeLevel::Level(-13.5)).unwrap(), "-13.5");
        let back: SidelobeLevel = serde_json::from_str("\"undefined\"").unwrap();
        assert_eq!(back.value(), None);
        let back: SidelobeLevel = serde_json::from_str("-7.25").unwrap();
        assert_eq!(back.value(), Some(-7.25));
    }

    #[test]
    fn test_uniform_array_sidelobe_within_bounds() {
        // Main-lobe skirt samples count as soon as they clear the threshold
        let (c, _) = steer(4, 16, 0.0);
        let db = c.normalized_db(1e-10);
        let sll = sidelobe_level(&db, 3.0).unwrap();
        assert!(sll > -14.0 && sll < -3.0, "sll = {}", sll);
    }

    #[test]
    fn test_gain_loss_compares_normalised_peaks() {
        let (c, q) = steer(1, 16, 20.0);
        let (c_db, q_db) = (c.normalized_db(1e-10), q.normalized_db(1e-10));
        let expected = c_db.global_peak() - q_db.global_peak();
        assert_eq!(gain_loss_db(&c_db, &q_db), expected);
        assert!(gain_loss_db(&c_db, &q_db).abs() < 1e-8);

        let p = pattern(vec![0, 1], vec![-1.0, -4.0], vec![-2.0, -0.5]);
        let r = pattern(vec![0, 1], vec![-3.0, -2.5], vec![-6.0, -9.0]);
        assert_eq!(gain_loss_db(&p, &r), 2.0);
    }

    #[test]
    fn test_quantization_loss_grows_with_coarser_states() {
        let (c4, q4) = steer(4, 16, 30.0);
        let (c1, q1) = steer(1, 16, 30.0);
        let loss4 = quantization_loss_db(&c4, &q4, 1e-10);
        let loss1 = quantization_loss_db(&c1, &q1, 1e-10);
        assert!(loss4 >= -1e-9 && loss4 < 0.5, "4-bit loss {}", loss4);
        assert!(loss1 > 1.0, "1-bit loss {}", loss1);
        assert!(loss1 > loss4);
    }

    #[test]
    fn test_fine_quantization_points_exactly_at_target() {
        for target in [20.0, 40.0] {
            let (_, q) = steer(4, 16, target);
            let db = q.normalized_db(1e-10);
            assert_eq!(pointing_error(&db, target)[0], 0.0, "target {}", target);
        }
    }

    #[test]
    fn test_pointing_error_grows_as_bits_decrease() {
        // At 30° the ideal phases step by exactly π/2 per element and sit on
        // quantiser boundaries, so rounding noise floors some elements a full
        // state down and even 4 bits can miss by 1°. 20° avoids that.
        let (_, q1) = steer(1, 16, 20.0);
        let (_, q4) = steer(4, 16, 20.0);
        let err1 = pointing_error(&q1.normalized_db(1e-10), 20.0)[0];
        let err4 = pointing_error(&q4.normalized_db(1e-10), 20.0)[0];
        assert!(err1 > err4, "1-bit {} vs 4-bit {}", err1, err4);
        assert_eq!(err4, 0.0);
    }

    #[test]
    fn test_broadside_metrics() {
        let (c, q) = steer(2, 8, 0.0);
        let c_db = c.normalized_db(1e-10);
        let db = q.normalized_db(1e-10);
        let m = SimulationMetrics::compute(&c, &q, &c_db, &db, 0.0, 3.0, 1e-10);
        assert_eq!(m.theta_peak, [0.0, 0.0]);
        assert_eq!(m.pointing_error, [0.0, 0.0]);
        assert!(m.gain_loss_db.abs() < 1e-9);
        assert!(m.quantization_loss_db.abs() < 1e-9);
        assert!(m.sidelobe_level.value().is_some());
    }
}

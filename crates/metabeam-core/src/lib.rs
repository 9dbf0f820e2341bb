//! # Metasurface Beam-Steering Core
//!
//! Simulation engine for a phased reflective metasurface (reconfigurable
//! intelligent surface): a planar grid of unit cells whose reflection phase
//! is selected from `M = 2^N` discrete states.
//!
//! ## Overview
//!
//! - **Geometry**: centred half-wavelength element grid
//! - **Phase synthesis**: continuous steering profile and its quantised form
//! - **Coding patterns**: canonical uniform, gradient, checkerboard and
//!   stripe state grids
//! - **Array factor**: far-field sweep over the E-plane and H-plane cuts
//! - **Metrics**: pointing error, quantisation gain loss, sidelobe level
//!
//! ## Signal Flow
//!
//! ```text
//! params → ArrayGeometry → PhaseProfile / CodingPattern → weights
//!        → ArrayFactor (θ sweep × 2 cuts) → dB patterns → metrics → result
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use metabeam_core::prelude::*;
//!
//! let simulator = Simulator::default();
//! let result = simulator
//!     .steer(&SteerParams {
//!         n_bits: 2,
//!         theta_steer: 30.0,
//!         phi_steer: 0.0,
//!         theta_inc: 0.0,
//!         phi_inc: 0.0,
//!         nx: 16,
//!         ny: 16,
//!     })
//!     .unwrap();
//! println!("gain loss {:.2} dB", result.gain_loss_db);
//! ```

pub mod array_factor;
pub mod backend;
pub mod coding_pattern;
pub mod config;
pub mod geometry;
pub mod logging;
pub mod metrics;
pub mod phase_profile;
pub mod protocol;
pub mod service;
pub mod simulation;
pub mod types;

pub use backend::{BackendChain, CommandBackend, ComputeBackend, NativeBackend};
pub use config::{ConfigError, SimConfig};
pub use logging::{init_logging, LogConfig, LogFormat, LogLevel};
pub use protocol::{SimRequest, SimResponse};
pub use service::SimService;
pub use simulation::{PatternParams, PatternResult, Simulator, SteerParams, SteerResult};
pub use types::{Complex, Grid, SimError, SimResult};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::array_factor::{ArrayFactor, PatternDb, Sweep};
    pub use crate::coding_pattern::{CodingPattern, PatternKind};
    pub use crate::geometry::ArrayGeometry;
    pub use crate::metrics::SidelobeLevel;
    pub use crate::phase_profile::{PhaseProfile, SteeringRequest};
    pub use crate::simulation::{PatternParams, PatternResult, Simulator, SteerParams, SteerResult};
    pub use crate::types::{Complex, Grid, SimError, SimResult};
}

//! Coding Pattern Generator
//!
//! Canonical phase-state grids used as reference excitations in place of
//! a synthesized steering profile. Every generator is a pure mapping from
//! `(row, col)` to a state index in `[0, M_states)`.
//!
//! | identifier           | state at (row, col)                        |
//! |----------------------|--------------------------------------------|
//! | `uniform_<bits>`     | the named state, e.g. `uniform_10` → 2     |
//! | `gradient_x`         | `floor(col / (Nx-1) · (M-1))`              |
//! | `gradient_y`         | `floor(row / (Ny-1) · (M-1))`              |
//! | `checkerboard_2x2`   | `(row/2 + col/2) mod M`                    |
//! | `checkerboard_4x4`   | `(row/4 + col/4) mod M`                    |
//! | `stripes_horizontal` | `row mod M`                                |
//! | `stripes_vertical`   | `col mod M`                                |
//! | anything else        | 0                                          |
//!
//! States convert to phase as `state · 360/M`, wrapped to `[-180, 180)`.
//!
//! ```
//! use metabeam_core::coding_pattern::{CodingPattern, PatternKind};
//!
//! let kind = PatternKind::parse("checkerboard_2x2");
//! let pattern = CodingPattern::generate(&kind, 1, 4, 4);
//! assert_eq!(pattern.states.to_rows()[2], vec![1, 1, 0, 0]);
//! ```

use std::fmt;

use crate::phase_profile::{num_states, wrap_degrees};
use crate::types::Grid;

/// Closed set of coding-pattern generators.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PatternKind {
    /// Every element in one fixed state
    Uniform(u32),
    /// State ramps 0 → M-1 across columns
    GradientX,
    /// State ramps 0 → M-1 across rows
    GradientY,
    /// Block checkerboard with the given block edge
    Checkerboard { block: usize },
    /// State follows the row index
    StripesHorizontal,
    /// State follows the column index
    StripesVertical,
    /// Name not in the catalog; generates the all-zero grid
    Unrecognized(String),
}

impl PatternKind {
    /// Canonical identifiers, in catalog order.
    pub const CATALOG: [&'static str; 10] = [
        "uniform_00",
        "uniform_01",
        "uniform_10",
        "uniform_11",
        "gradient_x",
        "gradient_y",
        "checkerboard_2x2",
        "checkerboard_4x4",
        "stripes_horizontal",
        "stripes_vertical",
    ];

    /// Canonical identifiers accepted by [`PatternKind::parse`].
    pub fn catalog() -> impl Iterator<Item = &'static str> {
        Self::CATALOG.iter().copied()
    }

    /// Parse a pattern identifier. Never fails: unknown names map to
    /// [`PatternKind::Unrecognized`].
    pub fn parse(name: &str) -> Self {
        match name {
            "gradient_x" => PatternKind::GradientX,
            "gradient_y" => PatternKind::GradientY,
            "checkerboard_2x2" => PatternKind::Checkerboard { block: 2 },
            "checkerboard_4x4" => PatternKind::Checkerboard { block: 4 },
            "stripes_horizontal" => PatternKind::StripesHorizontal,
            "stripes_vertical" => PatternKind::StripesVertical,
            _ => match name.strip_prefix("uniform_").and_then(parse_bit_code) {
                Some(state) => PatternKind::Uniform(state),
                None => PatternKind::Unrecognized(name.to_string()),
            },
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, PatternKind::Unrecognized(_))
    }

    /// State index of element `(row, col)` on an `nx × ny` grid.
    pub fn state_at(&self, row: usize, col: usize, nx: usize, ny: usize, m_states: u32) -> u32 {
        let m = m_states as usize;
        let state = match self {
            PatternKind::Uniform(state) => *state as usize,
            PatternKind::GradientX => gradient_state(col, nx, m),
            PatternKind::GradientY => gradient_state(row, ny, m),
            PatternKind::Checkerboard { block } => row / block + col / block,
            PatternKind::StripesHorizontal => row,
            PatternKind::StripesVertical => col,
            PatternKind::Unrecognized(_) => 0,
        };
        (state % m) as u32
    }
}

impl fmt::Display for PatternKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternKind::Uniform(state) if *state < 4 => write!(f, "uniform_{:02b}", state),
            PatternKind::Uniform(state) => write!(f, "uniform_{:b}", state),
            PatternKind::GradientX => write!(f, "gradient_x"),
            PatternKind::GradientY => write!(f, "gradient_y"),
            PatternKind::Checkerboard { block } => write!(f, "checkerboard_{0}x{0}", block),
            PatternKind::StripesHorizontal => write!(f, "stripes_horizontal"),
            PatternKind::StripesVertical => write!(f, "stripes_vertical"),
            PatternKind::Unrecognized(name) => write!(f, "{}", name),
        }
    }
}

/// Binary state code such as `"10"`; at most 16 digits.
fn parse_bit_code(code: &str) -> Option<u32> {
    if code.is_empty() || code.len() > 16 || !code.bytes().all(|b| b == b'0' || b == b'1') {
        return None;
    }
    u32::from_str_radix(code, 2).ok()
}

/// Linear ramp across `n` positions, floor-truncated; a single position is
/// state 0.
fn gradient_state(i: usize, n: usize, m: usize) -> usize {
    if n <= 1 {
        return 0;
    }
    ((i as f64 / (n - 1) as f64) * (m - 1) as f64) as usize
}

/// Phase in degrees of `state` with `m_states` levels, in `[-180, 180)`.
pub fn state_to_degrees(state: u32, m_states: u32) -> f64 {
    wrap_degrees(state as f64 * (360.0 / m_states as f64))
}

/// Inverse of [`state_to_degrees`].
pub fn degrees_to_state(deg: f64, m_states: u32) -> u32 {
    let k = (deg / (360.0 / m_states as f64)).round() as i64;
    k.rem_euclid(m_states as i64) as u32
}

/// Recover a state grid from phase degrees.
pub fn states_from_degrees(degrees: &Grid<f64>, m_states: u32) -> Grid<u32> {
    degrees.map(|&d| degrees_to_state(d, m_states))
}

/// Generated state grid and its phase in degrees, `Ny × Nx`.
#[derive(Debug, Clone, PartialEq)]
pub struct CodingPattern {
    pub kind: PatternKind,
    pub m_states: u32,
    pub states: Grid<u32>,
}

impl CodingPattern {
    /// Generate `kind` for an `nx × ny` surface with `n_bits` resolution.
    pub fn generate(kind: &PatternKind, n_bits: u32, nx: usize, ny: usize) -> Self {
        let m_states = num_states(n_bits);
        if let PatternKind::Unrecognized(name) = kind {
            tracing::debug!(pattern = %name, "Unrecognized pattern, using all-zero states");
        }
        let states = Grid::from_fn(ny, nx, |row, col| kind.state_at(row, col, nx, ny, m_states));
        Self {
            kind: kind.clone(),
            m_states,
            states,
        }
    }

    /// Phase of every element in degrees, `[-180, 180)`.
    pub fn phase_degrees(&self) -> Grid<f64> {
        self.states.map(|&s| state_to_degrees(s, self.m_states))
    }

    /// Phase of every element in radians.
    pub fn phase_radians(&self) -> Grid<f64> {
        self.phase_degrees().map(|d| d.to_radians())
    }
}

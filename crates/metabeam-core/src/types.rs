//! Core types shared by every simulation stage
//!
//! Element grids are stored row-major with `rows = Ny` and `cols = Nx`, so
//! `grid.get(row, col)` addresses the element at y-index `row` and x-index
//! `col`. This matches the `Ny × Nx` layout every result grid is reported in.
//!
//! ```text
//!            col (x) →
//!          ┌──────────────┐
//!   row    │ (0,0) (0,1) …│
//!   (y)    │ (1,0) (1,1) …│
//!    ↓     │  …           │
//!          └──────────────┘
//! ```

use num_complex::Complex64;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Complex excitation / array-factor value.
pub type Complex = Complex64;

/// Result type for simulation operations
pub type SimResult<T> = Result<T, SimError>;

/// Errors that can occur during a simulation request
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error("Missing parameter: {0}")]
    MissingParameter(String),

    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("No sidelobe found more than {threshold_db} dB below the peak")]
    NoSidelobe { threshold_db: f64 },

    #[error("Backend '{backend}' failed: {reason}")]
    Backend { backend: String, reason: String },

    #[error("All computation backends failed: {0}")]
    AllBackendsFailed(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SimError {
    /// Shorthand for an [`SimError::InvalidParameter`].
    pub fn invalid(name: impl Into<String>, reason: impl Into<String>) -> Self {
        SimError::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// True if the request itself was at fault (rejected before computing).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            SimError::MissingParameter(_) | SimError::InvalidParameter { .. }
        )
    }

    /// Status code reported alongside the error message.
    pub fn status_code(&self) -> u16 {
        if self.is_client_error() {
            400
        } else {
            500
        }
    }
}

/// Rectangular row-major grid.
///
/// Serializes as a nested sequence of rows, the layout of every 2-D field in
/// a result record.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid<T> {
    rows: usize,
    cols: usize,
    data: Vec<T>,
}

impl<T> Grid<T> {
    /// Build a grid by evaluating `f(row, col)` for every cell.
    pub fn from_fn(rows: usize, cols: usize, mut f: impl FnMut(usize, usize) -> T) -> Self {
        let mut data = Vec::with_capacity(rows * cols);
        for row in 0..rows {
            for col in 0..cols {
                data.push(f(row, col));
            }
        }
        Self { rows, cols, data }
    }

    /// Build a grid from nested rows. Every row must have the same length.
    pub fn from_rows(rows: Vec<Vec<T>>) -> Result<Self, String> {
        let n_rows = rows.len();
        let n_cols = rows.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(n_rows * n_cols);
        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != n_cols {
                return Err(format!(
                    "row {} has {} columns, expected {}",
                    i,
                    row.len(),
                    n_cols
                ));
            }
            data.extend(row);
        }
        Ok(Self {
            rows: n_rows,
            cols: n_cols,
            data,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Cell at `(row, col)`, or `None` when out of bounds.
    pub fn get(&self, row: usize, col: usize) -> Option<&T> {
        if row < self.rows && col < self.cols {
            self.data.get(row * self.cols + col)
        } else {
            None
        }
    }

    /// Row-major view of all cells.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.data.iter()
    }

    /// Iterate rows as slices.
    pub fn row_iter(&self) -> impl Iterator<Item = &[T]> {
        // chunks(0) panics; an empty grid has no rows to yield anyway
        self.data.chunks(self.cols.max(1))
    }

    /// Apply `f` to every cell, keeping the shape.
    pub fn map<U>(&self, f: impl FnMut(&T) -> U) -> Grid<U> {
        Grid {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().map(f).collect(),
        }
    }

    /// Combine two grids of equal shape cell by cell.
    pub fn zip_map<U, V>(&self, other: &Grid<U>, mut f: impl FnMut(&T, &U) -> V) -> Grid<V> {
        debug_assert_eq!((self.rows, self.cols), (other.rows, other.cols));
        Grid {
            rows: self.rows,
            cols: self.cols,
            data: self
                .data
                .iter()
                .zip(other.data.iter())
                .map(|(a, b)| f(a, b))
                .collect(),
        }
    }

    /// Copy out as nested rows.
    pub fn to_rows(&self) -> Vec<Vec<T>>
    where
        T: Clone,
    {
        self.row_iter().map(<[T]>::to_vec).collect()
    }
}

impl<T: Serialize> Serialize for Grid<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.row_iter())
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Grid<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let rows = Vec::<Vec<T>>::deserialize(deserializer)?;
        Grid::from_rows(rows).map_err(D::Error::custom)
    }
}

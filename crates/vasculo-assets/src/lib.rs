//! # Vasculo Assets
//!
//! Source loading for vascular tree models.
//!
//! ## Features
//! - Permissive legacy VTK text parser (points, polyline cells, point scalars)
//! - Scalar field classification (radius, pressure)
//! - File and in-memory fetch sources with HTTP-style failure statuses
//! - Advisory progress reporting

pub mod scalar;
pub mod source;
pub mod vtk;

pub use scalar::{ScalarField, ScalarRange, ScalarRole};
pub use source::{FileFetcher, Fetcher, MemoryFetcher};
pub use vtk::{Cell, Encoding, ParseStats, PolyData, VtkHeader};

use thiserror::Error;

/// Asset errors
#[derive(Error, Debug)]
pub enum AssetError {
    #[error("Fetch failed with status {status}: {path}")]
    Fetch { status: u16, path: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("No points parsed from {0}")]
    NoPoints(String),
}

impl AssetError {
    /// HTTP-style status code, when the failure carries one
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Fetch { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Map an IO failure for `path` onto the fetch taxonomy
    pub fn from_io(path: impl Into<String>, error: std::io::Error) -> Self {
        use std::io::ErrorKind;

        match error.kind() {
            ErrorKind::NotFound => Self::Fetch { status: 404, path: path.into() },
            ErrorKind::PermissionDenied => Self::Fetch { status: 403, path: path.into() },
            _ => Self::IoError(error),
        }
    }
}

/// Result type for asset operations
pub type AssetResult<T> = Result<T, AssetError>;

/// Receiver for advisory progress updates (`message`, `percent` in 0..=100)
pub trait ProgressSink {
    /// Report progress
    fn report(&mut self, message: &str, percent: f32);
}

impl<F: FnMut(&str, f32)> ProgressSink for F {
    fn report(&mut self, message: &str, percent: f32) {
        self(message, percent)
    }
}

/// Progress sink that discards every update
pub fn no_progress(_message: &str, _percent: f32) {}

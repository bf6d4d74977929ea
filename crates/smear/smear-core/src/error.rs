//! Error types for the smear baking pipeline.
//!
//! Only conditions that must abort a bake live here. Recoverable data issues
//! (unknown influences, degenerate bones, motion parallel to a bone) are
//! reported through [`crate::diagnostics::Diagnostics`] instead.

use std::path::PathBuf;

use crate::frame::Frame;

/// Result alias used throughout the crate.
pub type Result<T, E = SmearError> = std::result::Result<T, E>;

/// Fatal error raised while baking, persisting or loading a motion cache.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum SmearError {
    /// The host has no mesh selected.
    #[error("no mesh selected")]
    NoMeshSelected,

    /// The selected mesh has no skin binding.
    #[error("mesh '{mesh}' has no skin binding")]
    MeshNotSkinned { mesh: String },

    /// Frame range with `end < start`.
    #[error("invalid frame range [{start}, {end}]")]
    InvalidFrameRange { start: Frame, end: Frame },

    /// The host returned no vertex positions for a mesh at a frame.
    #[error("no vertex positions for mesh '{mesh}' at frame {frame}")]
    MissingVertexPositions { mesh: String, frame: Frame },

    /// Vertex count differs from the one established earlier in the run.
    #[error("vertex count mismatch at frame {frame}: expected {expected}, got {actual}")]
    VertexCountMismatch {
        frame: Frame,
        expected: usize,
        actual: usize,
    },

    /// A sparse skin weight refers to an influence slot the binding does not have.
    #[error("vertex {vertex} references influence {index} but the binding has {influence_count}")]
    InvalidInfluenceIndex {
        vertex: usize,
        index: usize,
        influence_count: usize,
    },

    /// Two fields that must share a shape do not.
    #[error("{what}: expected {expected} entries, got {actual}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// The host failed to answer a query or evaluate a frame.
    #[error("host error: {0}")]
    Host(String),

    /// Reading or writing the cache artifact failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON encoding or decoding failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A loaded cache violates the artifact invariants.
    #[error("invalid motion cache: {0}")]
    InvalidCache(String),
}

impl SmearError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Every variant aborts the run; recoverable issues never become errors.
    #[inline]
    pub fn is_fatal(&self) -> bool {
        true
    }

    /// Short category string for logs and metrics.
    pub fn category(&self) -> &'static str {
        match self {
            Self::NoMeshSelected | Self::MeshNotSkinned { .. } => "selection",
            Self::InvalidFrameRange { .. } => "range",
            Self::MissingVertexPositions { .. }
            | Self::VertexCountMismatch { .. }
            | Self::InvalidInfluenceIndex { .. }
            | Self::ShapeMismatch { .. } => "data",
            Self::Host(_) => "host",
            Self::Io { .. } => "io",
            Self::Json(_) | Self::InvalidCache(_) => "cache",
        }
    }
}

//! Interpolation helpers used by the offset solver.
//!
//! - smoothstep easing of the along-bone parameter
//! - guarded normalization that never divides by (near) zero
//! - direction SLERP with a normalized-lerp fallback for tiny arcs

pub mod functions;

pub use functions::{normalize_or_degenerate, slerp_direction, smoothstep};

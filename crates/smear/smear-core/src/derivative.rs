//! Finite-difference motion of bone endpoints.
//!
//! Central difference where both neighbours exist, forward difference at the
//! first frame, backward difference at the last. A neighbour frame that lacks
//! the joint counts as missing, so the one-sided form that is available is used.

use glam::DVec3;

use crate::interp::normalize_or_degenerate;
use crate::sampling::{AnimationSamples, BoneSample};

/// Head and tail displacement per frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EndpointMotion {
    pub head: DVec3,
    pub tail: DVec3,
}

impl EndpointMotion {
    pub const ZERO: Self = Self {
        head: DVec3::ZERO,
        tail: DVec3::ZERO,
    };

    /// Same motion with each endpoint normalized (tiny vectors stay as they are).
    pub fn directions(self, eps: f64) -> Self {
        Self {
            head: normalize_or_degenerate(self.head, eps),
            tail: normalize_or_degenerate(self.tail, eps),
        }
    }
}

#[inline]
fn difference(later: &BoneSample, earlier: &BoneSample, inv_dt: f64) -> EndpointMotion {
    EndpointMotion {
        head: (later.head - earlier.head) * inv_dt,
        tail: (later.tail - earlier.tail) * inv_dt,
    }
}

/// Endpoint velocities of `joint` at dense frame index `frame_index`, in units per frame.
///
/// Returns `None` when the joint has no sample at that frame.
pub fn endpoint_motion(
    samples: &AnimationSamples,
    frame_index: usize,
    joint: &str,
) -> Option<EndpointMotion> {
    let current = samples.bone(frame_index, joint)?;
    let prev = frame_index
        .checked_sub(1)
        .and_then(|p| samples.bone(p, joint));
    let next = samples.bone(frame_index + 1, joint);

    Some(match (prev, next) {
        (Some(p), Some(n)) => difference(n, p, 0.5),
        (None, Some(n)) => difference(n, current, 1.0),
        (Some(p), None) => difference(current, p, 1.0),
        (None, None) => EndpointMotion::ZERO,
    })
}

/// Normalized endpoint motion directions of `joint` at `frame_index`.
pub fn endpoint_velocities(
    samples: &AnimationSamples,
    frame_index: usize,
    joint: &str,
    eps: f64,
) -> Option<EndpointMotion> {
    endpoint_motion(samples, frame_index, joint).map(|m| m.directions(eps))
}

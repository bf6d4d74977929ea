//! Motion offset solver.
//!
//! For every frame, joint and weighted vertex:
//! 1. bone axis and length (bones shorter than epsilon are skipped for the frame)
//! 2. normalized head/tail motion from finite differences
//! 3. along-bone parameter `u = smoothstep(clamp(proj / length))`
//! 4. local motion direction = SLERP(head motion, tail motion, u)
//! 5. ribbon normal = motion direction with the axis component removed
//!    (skipped when the motion runs along the bone)
//! 6. colinearity weight `1 - (dir . axis)^2`
//! 7. signed distance from the bone along the ribbon normal
//! 8. `raw[f][v] += weight * colinearity * delta`
//!
//! Bones whose endpoints do not move at a frame are skipped for that frame.
//!
//! Vertices are independent within a frame, so each vertex accumulates its own
//! sum in column order. The result is identical on the rayon pool or serially.

use glam::DVec3;
use rayon::prelude::*;

use crate::config::Config;
use crate::derivative::{endpoint_velocities, EndpointMotion};
use crate::diagnostics::Diagnostics;
use crate::error::{Result, SmearError};
use crate::frame::{Frame, FrameRange};
use crate::interp::{slerp_direction, smoothstep};
use crate::sampling::{AnimationSamples, BoneSample};
use crate::weights::SkinWeightMatrix;

/// Unsmoothed offsets, `values[frame_index][vertex]`.
#[derive(Clone, Debug, PartialEq)]
pub struct RawOffsetField {
    pub range: FrameRange,
    pub vertex_count: usize,
    pub values: Vec<Vec<f64>>,
}

impl RawOffsetField {
    pub fn frame_count(&self) -> usize {
        self.values.len()
    }

    pub fn at(&self, frame: Frame) -> Option<&[f64]> {
        let idx = self.range.index_of(frame)?;
        self.values.get(idx).map(Vec::as_slice)
    }

    /// Time series of one vertex across the range.
    pub fn vertex_series(&self, vertex: usize) -> Vec<f64> {
        self.values.iter().map(|frame| frame[vertex]).collect()
    }
}

/// One joint's bone prepared for a frame: axis, length and endpoint motion directions.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoneFrame {
    pub head: DVec3,
    pub axis: DVec3,
    pub length: f64,
    pub motion: EndpointMotion,
}

impl BoneFrame {
    /// `None` when the bone is shorter than `cfg.bone_epsilon`.
    pub fn prepare(bone: &BoneSample, motion: EndpointMotion, cfg: &Config) -> Option<Self> {
        let axis = bone.axis(cfg.bone_epsilon)?;
        Some(Self {
            head: bone.head,
            axis,
            length: bone.length(),
            motion,
        })
    }

    /// Neither endpoint moves, so there is no motion direction to smear along.
    #[inline]
    pub fn is_static(&self, eps: f64) -> bool {
        self.motion.head.length() < eps && self.motion.tail.length() < eps
    }
}

/// Intermediate terms of a single (frame, joint, vertex) contribution.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Contribution {
    /// Eased along-bone parameter in [0, 1].
    pub u: f64,
    /// Interpolated local motion direction.
    pub direction: DVec3,
    /// Unit vector orthogonal to the axis, aligned with the motion.
    pub ribbon_normal: DVec3,
    /// `1 - (direction . axis)^2`.
    pub colinearity: f64,
    /// Signed distance from the bone along the ribbon normal.
    pub delta: f64,
}

impl Contribution {
    #[inline]
    pub fn weighted(&self, weight: f64) -> f64 {
        weight * self.colinearity * self.delta
    }
}

/// Contribution of `bone` to a vertex at `position`.
///
/// Returns `None` when the motion direction is parallel to the bone, leaving no
/// ribbon normal.
pub fn bone_contribution(position: DVec3, bone: &BoneFrame, cfg: &Config) -> Option<Contribution> {
    let rel = position - bone.head;
    let u = smoothstep(rel.dot(bone.axis) / bone.length);
    let direction = slerp_direction(
        bone.motion.head,
        bone.motion.tail,
        u,
        cfg.velocity_epsilon,
        cfg.slerp_angle_threshold,
    );
    let along = direction.dot(bone.axis);
    let perp = direction - bone.axis * along;
    let perp_len = perp.length();
    if perp_len < cfg.bone_epsilon {
        return None;
    }
    let ribbon_normal = perp / perp_len;
    Some(Contribution {
        u,
        direction,
        ribbon_normal,
        colinearity: 1.0 - along * along,
        delta: rel.dot(ribbon_normal),
    })
}

/// Accumulate raw offsets for every frame of `samples`.
pub fn solve_motion_offsets(
    samples: &AnimationSamples,
    weights: &SkinWeightMatrix,
    cfg: &Config,
    diagnostics: &mut Diagnostics,
) -> Result<RawOffsetField> {
    if weights.vertex_count() != samples.vertex_count {
        return Err(SmearError::VertexCountMismatch {
            frame: samples.range.start,
            expected: weights.vertex_count(),
            actual: samples.vertex_count,
        });
    }

    let active: Vec<usize> = (0..weights.joint_count())
        .filter(|&col| weights.column_has_weight(col))
        .collect();

    let mut values = Vec::with_capacity(samples.frame_count());
    for (fi, positions) in samples.positions.iter().enumerate() {
        let mut bones: Vec<(usize, BoneFrame)> = Vec::with_capacity(active.len());
        for &col in &active {
            let joint = &weights.joints()[col];
            let (Some(bone), Some(motion)) = (
                samples.bone(fi, joint),
                endpoint_velocities(samples, fi, joint, cfg.velocity_epsilon),
            ) else {
                diagnostics.absent_joints += 1;
                continue;
            };
            match BoneFrame::prepare(bone, motion, cfg) {
                Some(prepared) if prepared.is_static(cfg.velocity_epsilon) => {
                    diagnostics.static_bones += 1
                }
                Some(prepared) => bones.push((col, prepared)),
                None => diagnostics.degenerate_bones += 1,
            }
        }

        let solve_vertex = |v: usize| -> (f64, usize) {
            let mut acc = 0.0;
            let mut skipped = 0;
            for (col, bone) in &bones {
                let w = weights.weight(v, *col);
                if w <= 0.0 {
                    continue;
                }
                match bone_contribution(positions[v], bone, cfg) {
                    Some(c) => acc += c.weighted(w),
                    None => skipped += 1,
                }
            }
            (acc, skipped)
        };

        let per_vertex: Vec<(f64, usize)> = if cfg.parallel {
            (0..samples.vertex_count)
                .into_par_iter()
                .map(solve_vertex)
                .collect()
        } else {
            (0..samples.vertex_count).map(solve_vertex).collect()
        };

        let skipped: usize = per_vertex.iter().map(|(_, s)| s).sum();
        if skipped > 0 {
            log::debug!(
                "frame {}: {skipped} contributions skipped, no ribbon normal (motion along the bone)",
                samples.range.start + fi as Frame
            );
        }
        diagnostics.parallel_motion += skipped;
        values.push(per_vertex.into_iter().map(|(acc, _)| acc).collect());
    }

    Ok(RawOffsetField {
        range: samples.range,
        vertex_count: samples.vertex_count,
        values,
    })
}

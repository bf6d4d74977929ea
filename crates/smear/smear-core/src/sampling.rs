//! Animation sampling: per-frame vertex positions and bone segments.
//!
//! Model:
//! - The host is seeked one frame at a time through [`SceneQuery::evaluate_at_frame`];
//!   each frame is read from its own snapshot, so results do not depend on order.
//! - A bone runs from a joint's head to its first child's head. Joints without a
//!   child, or whose child cannot be placed, get `head == tail`.
//! - A joint the host cannot place at a frame is simply absent from that frame.

use glam::DVec3;
use indexmap::IndexMap;

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::{Result, SmearError};
use crate::frame::{Frame, FrameRange};
use crate::scene::{SceneQuery, SceneSnapshot};

/// World-space bone segment of one joint at one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoneSample {
    pub head: DVec3,
    pub tail: DVec3,
}

impl BoneSample {
    pub fn new(head: DVec3, tail: DVec3) -> Self {
        Self { head, tail }
    }

    /// Zero-length bone at `head`.
    pub fn degenerate(head: DVec3) -> Self {
        Self { head, tail: head }
    }

    #[inline]
    pub fn length(&self) -> f64 {
        (self.tail - self.head).length()
    }

    #[inline]
    pub fn is_degenerate(&self, eps: f64) -> bool {
        self.length() < eps
    }

    /// Unit head-to-tail direction, or `None` for a bone shorter than `eps`.
    pub fn axis(&self, eps: f64) -> Option<DVec3> {
        let d = self.tail - self.head;
        let len = d.length();
        (len >= eps).then(|| d / len)
    }
}

/// Everything sampled over a frame range.
#[derive(Clone, Debug, PartialEq)]
pub struct AnimationSamples {
    pub range: FrameRange,
    pub vertex_count: usize,
    /// `positions[frame_index][vertex]`.
    pub positions: Vec<Vec<DVec3>>,
    /// `bones[frame_index][joint]`, in requested joint order.
    pub bones: Vec<IndexMap<String, BoneSample>>,
}

impl AnimationSamples {
    #[inline]
    pub fn frame_count(&self) -> usize {
        self.positions.len()
    }

    pub fn positions_at(&self, frame: Frame) -> Option<&[DVec3]> {
        let idx = self.range.index_of(frame)?;
        self.positions.get(idx).map(Vec::as_slice)
    }

    /// Bone of `joint` at dense frame index `frame_index`.
    #[inline]
    pub fn bone(&self, frame_index: usize, joint: &str) -> Option<&BoneSample> {
        self.bones.get(frame_index)?.get(joint)
    }
}

/// Sample `mesh` and `joints` at every frame of `range`, in order.
///
/// `on_frame` receives the number of frames sampled so far after each frame.
/// A missing position array, or a vertex count that changes across the range,
/// aborts the run.
pub fn sample_animation<S>(
    scene: &mut S,
    mesh: &str,
    range: FrameRange,
    joints: &[String],
    diagnostics: &mut Diagnostics,
    on_frame: &mut dyn FnMut(usize),
) -> Result<AnimationSamples>
where
    S: SceneQuery + ?Sized,
{
    range.validate()?;
    let frame_count = range.len();
    let mut positions = Vec::with_capacity(frame_count);
    let mut bones = Vec::with_capacity(frame_count);
    let mut vertex_count: Option<usize> = None;

    for (done, frame) in range.iter().enumerate() {
        let snapshot = scene.evaluate_at_frame(frame)?;

        let verts = snapshot
            .vertex_positions(mesh)
            .ok_or_else(|| SmearError::MissingVertexPositions {
                mesh: mesh.to_string(),
                frame,
            })?;
        match vertex_count {
            None => vertex_count = Some(verts.len()),
            Some(expected) if expected != verts.len() => {
                return Err(SmearError::VertexCountMismatch {
                    frame,
                    expected,
                    actual: verts.len(),
                });
            }
            Some(_) => {}
        }

        bones.push(sample_bones(&snapshot, frame, joints, diagnostics));
        positions.push(verts);
        on_frame(done + 1);
    }

    Ok(AnimationSamples {
        range,
        vertex_count: vertex_count.unwrap_or(0),
        positions,
        bones,
    })
}

fn sample_bones<T: SceneSnapshot>(
    snapshot: &T,
    frame: Frame,
    joints: &[String],
    diagnostics: &mut Diagnostics,
) -> IndexMap<String, BoneSample> {
    let mut out = IndexMap::with_capacity(joints.len());
    for joint in joints {
        let Some(head) = snapshot.joint_position(joint) else {
            diagnostics.push(Diagnostic::JointMissing {
                frame,
                joint: joint.clone(),
            });
            continue;
        };
        let bone = match snapshot.first_child_joint(joint) {
            None => BoneSample::degenerate(head),
            Some(child) => match snapshot.joint_position(&child) {
                Some(tail) => BoneSample::new(head, tail),
                None => {
                    diagnostics.push(Diagnostic::ChildLookupFailed {
                        frame,
                        joint: joint.clone(),
                        child,
                    });
                    BoneSample::degenerate(head)
                }
            },
        };
        out.insert(joint.clone(), bone);
    }
    out
}

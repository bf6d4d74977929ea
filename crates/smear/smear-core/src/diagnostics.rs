//! Recoverable conditions observed during a bake.
//!
//! None of these abort the run. Each one is logged when it is recorded and kept
//! here so callers can surface large-scale binding mismatches.

use serde::{Deserialize, Serialize};

use crate::frame::Frame;

/// One recoverable event worth reporting individually.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// A binding influence is not among the requested joints; its weights are dropped.
    UnknownInfluence { influence: String },
    /// A requested joint is not an influence of the binding; its column stays zero.
    JointNotInBinding { joint: String },
    /// The host could not place a joint at a frame; the joint is absent there.
    JointMissing { frame: Frame, joint: String },
    /// A joint's child could not be placed; the bone degrades to zero length.
    ChildLookupFailed {
        frame: Frame,
        joint: String,
        child: String,
    },
}

/// Collected diagnostics plus per-contribution skip counters.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub entries: Vec<Diagnostic>,
    /// (frame, joint) pairs skipped because the bone was shorter than epsilon.
    pub degenerate_bones: usize,
    /// (frame, joint) pairs skipped because the joint had no sample at that frame.
    pub absent_joints: usize,
    /// (frame, joint) pairs skipped because neither bone endpoint moved.
    pub static_bones: usize,
    /// (frame, joint, vertex) triples skipped for lack of a ribbon normal (motion along the bone).
    pub parallel_motion: usize,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        match &diagnostic {
            Diagnostic::UnknownInfluence { influence } => {
                log::warn!("skipping influence '{influence}': not in the requested joint list")
            }
            Diagnostic::JointNotInBinding { joint } => {
                log::warn!("joint '{joint}' is not an influence of the skin binding; column left at zero")
            }
            Diagnostic::JointMissing { frame, joint } => {
                log::warn!("joint '{joint}' could not be sampled at frame {frame}")
            }
            Diagnostic::ChildLookupFailed {
                frame,
                joint,
                child,
            } => log::warn!(
                "child '{child}' of joint '{joint}' could not be sampled at frame {frame}; using a zero-length bone"
            ),
        }
        self.entries.push(diagnostic);
    }

    /// True when nothing was dropped or skipped.
    pub fn is_clean(&self) -> bool {
        self.entries.is_empty()
            && self.degenerate_bones == 0
            && self.absent_joints == 0
            && self.static_bones == 0
            && self.parallel_motion == 0
    }

    pub fn merge(&mut self, other: Diagnostics) {
        self.entries.extend(other.entries);
        self.degenerate_bones += other.degenerate_bones;
        self.absent_joints += other.absent_joints;
        self.static_bones += other.static_bones;
        self.parallel_motion += other.parallel_motion;
    }

    pub fn unknown_influences(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().filter_map(|d| match d {
            Diagnostic::UnknownInfluence { influence } => Some(influence.as_str()),
            _ => None,
        })
    }
}

//! Host scene interface.
//!
//! The baker never talks to a DCC directly. Host adapters implement
//! [`SceneQuery`] and hand out one [`SceneSnapshot`] per evaluated frame, which
//! makes the dependency on the host's current time explicit.
//! [`InMemoryScene`] is a plain-data implementation for tests and for offline
//! baking of exported scene dumps.

use std::collections::BTreeMap;

use glam::DVec3;
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SmearError};
use crate::frame::{Frame, FrameRange};

/// Opaque host identifier for a mesh (small string key).
pub type MeshHandle = String;
/// Opaque host identifier for a skin binding.
pub type SkinHandle = String;

/// Sparse skin weights for one vertex: `(influence index, weight)` pairs.
pub type SparseWeights = Vec<(usize, f64)>;

/// Blocking queries against the host scene.
pub trait SceneQuery {
    type Snapshot<'a>: SceneSnapshot
    where
        Self: 'a;

    /// Currently selected mesh, if any.
    fn selected_mesh(&self) -> Option<MeshHandle>;

    /// Skin binding deforming `mesh`, if it is skinned.
    fn skin_binding(&self, mesh: &str) -> Option<SkinHandle>;

    /// Influence joint names of a binding, indexed by influence slot.
    fn skin_influences(&self, skin: &str) -> Result<Vec<String>>;

    /// Per-vertex sparse weights of `mesh` under `skin`, in vertex-index order.
    fn skin_weights(&self, mesh: &str, skin: &str) -> Result<Vec<SparseWeights>>;

    /// Active playback window.
    fn playback_range(&self) -> Result<FrameRange>;

    /// Seek to `frame` and fully resolve time-dependent state before returning.
    fn evaluate_at_frame(&mut self, frame: Frame) -> Result<Self::Snapshot<'_>>;
}

/// World-space view of the scene at one evaluated frame.
pub trait SceneSnapshot {
    fn frame(&self) -> Frame;

    /// World-space vertex positions of `mesh`, in vertex-index order.
    fn vertex_positions(&self, mesh: &str) -> Option<Vec<DVec3>>;

    /// World-space position of a joint.
    fn joint_position(&self, joint: &str) -> Option<DVec3>;

    /// First child joint, used as the bone tail.
    fn first_child_joint(&self, joint: &str) -> Option<String>;
}

/// Mesh record of an [`InMemoryScene`].
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MeshRecord {
    #[serde(default)]
    pub skin: Option<SkinHandle>,
    /// World positions keyed by frame.
    pub positions: BTreeMap<Frame, Vec<DVec3>>,
}

/// Skin binding record of an [`InMemoryScene`].
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SkinRecord {
    /// Influence joint names by slot.
    pub influences: Vec<String>,
    /// Sparse weights per vertex.
    pub weights: Vec<SparseWeights>,
}

/// Joint record of an [`InMemoryScene`].
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct JointRecord {
    #[serde(default)]
    pub children: Vec<String>,
    /// World head positions keyed by frame.
    pub positions: BTreeMap<Frame, DVec3>,
}

/// Scene held entirely in memory.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct InMemoryScene {
    #[serde(default)]
    pub selected_mesh: Option<MeshHandle>,
    pub playback: FrameRange,
    #[serde(default)]
    pub meshes: HashMap<MeshHandle, MeshRecord>,
    #[serde(default)]
    pub skins: HashMap<SkinHandle, SkinRecord>,
    #[serde(default)]
    pub joints: HashMap<String, JointRecord>,
    #[serde(skip)]
    evaluated: Vec<Frame>,
}

impl InMemoryScene {
    pub fn new(playback: FrameRange) -> Self {
        Self {
            playback,
            ..Self::default()
        }
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        let scene: Self = serde_json::from_str(s)?;
        scene.playback.validate()?;
        Ok(scene)
    }

    /// Frames passed to [`SceneQuery::evaluate_at_frame`], in call order.
    pub fn evaluated_frames(&self) -> &[Frame] {
        &self.evaluated
    }

    pub fn select(&mut self, mesh: impl Into<MeshHandle>) -> &mut Self {
        self.selected_mesh = Some(mesh.into());
        self
    }

    pub fn insert_mesh(&mut self, name: impl Into<MeshHandle>, record: MeshRecord) -> &mut Self {
        self.meshes.insert(name.into(), record);
        self
    }

    pub fn insert_skin(&mut self, name: impl Into<SkinHandle>, record: SkinRecord) -> &mut Self {
        self.skins.insert(name.into(), record);
        self
    }

    pub fn insert_joint(&mut self, name: impl Into<String>, record: JointRecord) -> &mut Self {
        self.joints.insert(name.into(), record);
        self
    }

    fn skin(&self, skin: &str) -> Result<&SkinRecord> {
        self.skins
            .get(skin)
            .ok_or_else(|| SmearError::Host(format!("unknown skin binding '{skin}'")))
    }
}

impl SceneQuery for InMemoryScene {
    type Snapshot<'a> = InMemorySnapshot<'a>;

    fn selected_mesh(&self) -> Option<MeshHandle> {
        self.selected_mesh.clone()
    }

    fn skin_binding(&self, mesh: &str) -> Option<SkinHandle> {
        self.meshes.get(mesh).and_then(|m| m.skin.clone())
    }

    fn skin_influences(&self, skin: &str) -> Result<Vec<String>> {
        Ok(self.skin(skin)?.influences.clone())
    }

    fn skin_weights(&self, mesh: &str, skin: &str) -> Result<Vec<SparseWeights>> {
        if !self.meshes.contains_key(mesh) {
            return Err(SmearError::Host(format!("unknown mesh '{mesh}'")));
        }
        Ok(self.skin(skin)?.weights.clone())
    }

    fn playback_range(&self) -> Result<FrameRange> {
        self.playback.validate()?;
        Ok(self.playback)
    }

    fn evaluate_at_frame(&mut self, frame: Frame) -> Result<InMemorySnapshot<'_>> {
        self.evaluated.push(frame);
        Ok(InMemorySnapshot { scene: self, frame })
    }
}

/// Borrowed frame view over an [`InMemoryScene`].
#[derive(Clone, Copy, Debug)]
pub struct InMemorySnapshot<'a> {
    scene: &'a InMemoryScene,
    frame: Frame,
}

impl SceneSnapshot for InMemorySnapshot<'_> {
    fn frame(&self) -> Frame {
        self.frame
    }

    fn vertex_positions(&self, mesh: &str) -> Option<Vec<DVec3>> {
        self.scene.meshes.get(mesh)?.positions.get(&self.frame).cloned()
    }

    fn joint_position(&self, joint: &str) -> Option<DVec3> {
        self.scene.joints.get(joint)?.positions.get(&self.frame).copied()
    }

    fn first_child_joint(&self, joint: &str) -> Option<String> {
        self.scene.joints.get(joint)?.children.first().cloned()
    }
}

//! Smear Core (host-agnostic)
//!
//! Bakes per-vertex "smear" motion offsets for a skinned mesh. The pipeline
//! resolves skin weights, samples vertex trajectories and bone segments frame
//! by frame through a [`SceneQuery`] adapter, solves a signed offset per
//! (frame, vertex) from bone motion, smooths it along time and writes a JSON
//! [`MotionCache`] for a downstream deformer.

pub mod cache;
pub mod config;
pub mod derivative;
pub mod diagnostics;
pub mod error;
pub mod frame;
pub mod interp;
pub mod pipeline;
pub mod sampling;
pub mod scene;
pub mod smoothing;
pub mod solver;
pub mod weights;

// Re-exports for host adapters and tools
pub use cache::MotionCache;
pub use config::{Config, SmoothingConfig};
pub use derivative::{endpoint_motion, endpoint_velocities, EndpointMotion};
pub use diagnostics::{Diagnostic, Diagnostics};
pub use error::{Result, SmearError};
pub use frame::{Frame, FrameRange};
pub use pipeline::{BakeOptions, BakeOutput, BakeProgress, BakeSummary, SmearBaker};
pub use sampling::{sample_animation, AnimationSamples, BoneSample};
pub use scene::{
    InMemoryScene, InMemorySnapshot, JointRecord, MeshHandle, MeshRecord, SceneQuery,
    SceneSnapshot, SkinHandle, SkinRecord, SparseWeights,
};
pub use smoothing::{smooth_offsets, SmoothedOffsetField, SmoothingKernel};
pub use solver::{bone_contribution, solve_motion_offsets, BoneFrame, Contribution, RawOffsetField};
pub use weights::{resolve_skin_weights, SkinWeightMatrix};

//! Baker: runs resolve -> sample -> solve -> smooth -> assemble over a host scene.
//!
//! Methods:
//! - new, bake (in-memory result), bake_to_path (bake + atomic write)
//!
//! Every stage consumes the previous stage's output by value or shared
//! reference; nothing is kept between runs, so two bakes of the same scene
//! produce identical artifacts.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::cache::MotionCache;
use crate::config::Config;
use crate::diagnostics::Diagnostics;
use crate::error::{Result, SmearError};
use crate::frame::FrameRange;
use crate::sampling::sample_animation;
use crate::scene::{MeshHandle, SceneQuery};
use crate::smoothing::{smooth_offsets, SmoothedOffsetField};
use crate::solver::{solve_motion_offsets, RawOffsetField};
use crate::weights::resolve_skin_weights;

/// Per-run inputs.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BakeOptions {
    /// Frames to bake; the scene's playback range when `None`.
    pub range: Option<FrameRange>,
    /// Ordered joints of the smear region; the binding's influences when `None`.
    pub joints: Option<Vec<String>>,
}

impl BakeOptions {
    pub fn with_range(mut self, range: FrameRange) -> Self {
        self.range = Some(range);
        self
    }

    pub fn with_joints<I, S>(mut self, joints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.joints = Some(joints.into_iter().map(Into::into).collect());
        self
    }
}

/// Coarse milestones reported while baking. Observation only.
#[derive(Clone, Debug, PartialEq)]
pub enum BakeProgress {
    Started { frames: usize },
    WeightsResolved { joints: usize },
    FramesSampled { done: usize, total: usize },
    OffsetsSolved,
    OffsetsSmoothed,
    CacheWritten { path: PathBuf },
}

/// Everything a bake produces.
#[derive(Clone, Debug)]
pub struct BakeOutput {
    pub mesh: MeshHandle,
    pub joints: Vec<String>,
    pub cache: MotionCache,
    pub raw: RawOffsetField,
    pub smoothed: SmoothedOffsetField,
    pub diagnostics: Diagnostics,
}

/// Result of [`SmearBaker::bake_to_path`].
#[derive(Clone, Debug)]
pub struct BakeSummary {
    pub path: PathBuf,
    pub frame_count: usize,
    pub vertex_count: usize,
    /// Signal for the downstream deformer; only ever produced after a successful write.
    pub cache_ready: bool,
    pub diagnostics: Diagnostics,
}

/// Stateless pipeline driver.
#[derive(Clone, Debug, Default)]
pub struct SmearBaker {
    config: Config,
}

impl SmearBaker {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Bake the selected mesh of `scene` into an in-memory [`MotionCache`].
    pub fn bake<S>(
        &self,
        scene: &mut S,
        options: &BakeOptions,
        progress: &mut dyn FnMut(&BakeProgress),
    ) -> Result<BakeOutput>
    where
        S: SceneQuery + ?Sized,
    {
        let mesh = scene.selected_mesh().ok_or(SmearError::NoMeshSelected)?;
        let skin = scene
            .skin_binding(&mesh)
            .ok_or_else(|| SmearError::MeshNotSkinned { mesh: mesh.clone() })?;
        let range = match options.range {
            Some(range) => {
                range.validate()?;
                range
            }
            None => scene.playback_range()?,
        };
        let joints = match &options.joints {
            Some(joints) => joints.clone(),
            None => scene.skin_influences(&skin)?,
        };

        let total = range.len();
        log::debug!(
            "baking mesh '{mesh}' over frames [{}, {}] with {} joints",
            range.start,
            range.end,
            joints.len()
        );
        progress(&BakeProgress::Started { frames: total });

        let mut diagnostics = Diagnostics::new();
        let weights = resolve_skin_weights(&*scene, &mesh, &skin, &joints, &mut diagnostics)?;
        progress(&BakeProgress::WeightsResolved {
            joints: joints.len(),
        });

        let step = self.config.progress_step_percent.max(1) as usize;
        let mut next_percent = step;
        let samples = sample_animation(scene, &mesh, range, &joints, &mut diagnostics, &mut |done| {
            let percent = done * 100 / total;
            if done == total || percent >= next_percent {
                progress(&BakeProgress::FramesSampled { done, total });
                next_percent = (percent / step + 1) * step;
            }
        })?;

        let raw = solve_motion_offsets(&samples, &weights, &self.config, &mut diagnostics)?;
        progress(&BakeProgress::OffsetsSolved);

        let smoothed = smooth_offsets(raw.clone(), &self.config);
        progress(&BakeProgress::OffsetsSmoothed);

        let cache = MotionCache::assemble(&samples, &smoothed)?;
        if !diagnostics.is_clean() {
            log::warn!(
                "bake of '{mesh}' finished with {} diagnostics ({} degenerate bones, {} absent joints, {} static bones, {} contributions without a ribbon normal)",
                diagnostics.entries.len(),
                diagnostics.degenerate_bones,
                diagnostics.absent_joints,
                diagnostics.static_bones,
                diagnostics.parallel_motion
            );
        }

        Ok(BakeOutput {
            mesh,
            joints,
            cache,
            raw,
            smoothed,
            diagnostics,
        })
    }

    /// Bake and persist the artifact at `path`. Nothing is written when any
    /// stage fails.
    pub fn bake_to_path<S>(
        &self,
        scene: &mut S,
        options: &BakeOptions,
        path: impl AsRef<Path>,
        progress: &mut dyn FnMut(&BakeProgress),
    ) -> Result<BakeSummary>
    where
        S: SceneQuery + ?Sized,
    {
        let path = path.as_ref();
        let output = self.bake(scene, options, &mut *progress)?;
        output.cache.write_json(path)?;
        progress(&BakeProgress::CacheWritten {
            path: path.to_path_buf(),
        });
        log::info!(
            "motion cache for '{}' written to {}",
            output.mesh,
            path.display()
        );

        Ok(BakeSummary {
            path: path.to_path_buf(),
            frame_count: output.cache.frame_count(),
            vertex_count: output.cache.vertex_count,
            cache_ready: true,
            diagnostics: output.diagnostics,
        })
    }
}

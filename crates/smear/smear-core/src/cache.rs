//! Motion cache artifact: the JSON document consumed by the downstream deformer.
//!
//! ```json
//! {
//!   "vertex_count": 4,
//!   "start_frame": 1,
//!   "end_frame": 3,
//!   "vertex_trajectories": { "1": [[x, y, z], ...], "2": [...], "3": [...] },
//!   "motion_offsets":      { "1": [o, ...],         "2": [...], "3": [...] }
//! }
//! ```
//!
//! Frame keys are decimal strings and appear in frame order. Every per-frame
//! array holds exactly `vertex_count` entries in vertex-index order.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SmearError};
use crate::frame::{Frame, FrameRange};
use crate::sampling::AnimationSamples;
use crate::smoothing::SmoothedOffsetField;

/// Persisted bake result.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MotionCache {
    pub vertex_count: usize,
    pub start_frame: Frame,
    pub end_frame: Frame,
    pub vertex_trajectories: IndexMap<String, Vec<[f64; 3]>>,
    pub motion_offsets: IndexMap<String, Vec<f64>>,
}

impl MotionCache {
    /// Combine sampled trajectories and smoothed offsets into one artifact.
    pub fn assemble(samples: &AnimationSamples, smoothed: &SmoothedOffsetField) -> Result<Self> {
        if samples.range != smoothed.range() {
            return Err(SmearError::ShapeMismatch {
                what: "offset frames",
                expected: samples.range.len(),
                actual: smoothed.range().len(),
            });
        }
        if samples.vertex_count != smoothed.vertex_count() {
            return Err(SmearError::ShapeMismatch {
                what: "offset vertices",
                expected: samples.vertex_count,
                actual: smoothed.vertex_count(),
            });
        }

        let frames = samples.range.len();
        let mut vertex_trajectories = IndexMap::with_capacity(frames);
        let mut motion_offsets = IndexMap::with_capacity(frames);
        for (idx, frame) in samples.range.iter().enumerate() {
            let positions = &samples.positions[idx];
            let offsets = &smoothed.values()[idx];
            if positions.len() != samples.vertex_count {
                return Err(SmearError::ShapeMismatch {
                    what: "trajectory row",
                    expected: samples.vertex_count,
                    actual: positions.len(),
                });
            }
            let key = frame.to_string();
            vertex_trajectories.insert(
                key.clone(),
                positions.iter().map(|p| p.to_array()).collect(),
            );
            motion_offsets.insert(key, offsets.clone());
        }

        Ok(Self {
            vertex_count: samples.vertex_count,
            start_frame: samples.range.start,
            end_frame: samples.range.end,
            vertex_trajectories,
            motion_offsets,
        })
    }

    pub fn range(&self) -> FrameRange {
        FrameRange {
            start: self.start_frame,
            end: self.end_frame,
        }
    }

    pub fn frame_count(&self) -> usize {
        self.range().len()
    }

    pub fn positions_at(&self, frame: Frame) -> Option<&[[f64; 3]]> {
        self.vertex_trajectories
            .get(&frame.to_string())
            .map(Vec::as_slice)
    }

    pub fn offsets_at(&self, frame: Frame) -> Option<&[f64]> {
        self.motion_offsets.get(&frame.to_string()).map(Vec::as_slice)
    }

    /// Check the artifact invariants: a valid range, every frame present in
    /// both maps, no stray keys and `vertex_count` entries per frame.
    pub fn validate(&self) -> Result<()> {
        let range = self.range();
        range.validate()?;
        let frames = range.len();
        if self.vertex_trajectories.len() != frames || self.motion_offsets.len() != frames {
            return Err(SmearError::InvalidCache(format!(
                "expected {frames} frames, found {} trajectories and {} offsets",
                self.vertex_trajectories.len(),
                self.motion_offsets.len()
            )));
        }
        for key in self.vertex_trajectories.keys().chain(self.motion_offsets.keys()) {
            let frame: Frame = key
                .parse()
                .map_err(|_| SmearError::InvalidCache(format!("frame key '{key}' is not an integer")))?;
            if !range.contains(frame) {
                return Err(SmearError::InvalidCache(format!(
                    "frame {frame} outside [{}, {}]",
                    range.start, range.end
                )));
            }
        }
        for frame in range {
            let positions = self
                .positions_at(frame)
                .ok_or_else(|| SmearError::InvalidCache(format!("missing trajectories for frame {frame}")))?;
            let offsets = self
                .offsets_at(frame)
                .ok_or_else(|| SmearError::InvalidCache(format!("missing offsets for frame {frame}")))?;
            if positions.len() != self.vertex_count || offsets.len() != self.vertex_count {
                return Err(SmearError::InvalidCache(format!(
                    "frame {frame}: expected {} vertices, found {} positions and {} offsets",
                    self.vertex_count,
                    positions.len(),
                    offsets.len()
                )));
            }
        }
        Ok(())
    }

    pub fn to_json_value(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        let cache: Self = serde_json::from_str(s)?;
        cache.validate()?;
        Ok(cache)
    }

    /// Persist to `path` through a sibling temp file that is synced and then
    /// renamed over the destination. On failure the destination is untouched.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let tmp = temp_path(path);
        if let Err(err) = self.write_to(&tmp) {
            let _ = fs::remove_file(&tmp);
            return Err(err);
        }
        fs::rename(&tmp, path).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            SmearError::io(path, e)
        })?;
        log::debug!("wrote motion cache ({} frames) to {}", self.frame_count(), path.display());
        Ok(())
    }

    fn write_to(&self, tmp: &Path) -> Result<()> {
        let file = File::create(tmp).map_err(|e| SmearError::io(tmp, e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, self)?;
        writer.flush().map_err(|e| SmearError::io(tmp, e))?;
        let file = writer
            .into_inner()
            .map_err(|e| SmearError::io(tmp, e.into_error()))?;
        file.sync_all().map_err(|e| SmearError::io(tmp, e))
    }

    /// Load and validate an artifact written by [`MotionCache::write_json`].
    pub fn read_json(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| SmearError::io(path, e))?;
        Self::from_json_str(&text)
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::smoothing::smooth_offsets;
    use crate::solver::RawOffsetField;
    use glam::DVec3;
    use indexmap::IndexMap as Map;

    fn samples_and_offsets() -> (AnimationSamples, SmoothedOffsetField) {
        let range = FrameRange::new(3, 4).unwrap();
        let samples = AnimationSamples {
            range,
            vertex_count: 2,
            positions: vec![vec![DVec3::ZERO, DVec3::X], vec![DVec3::Y, DVec3::Z]],
            bones: vec![Map::new(), Map::new()],
        };
        let raw = RawOffsetField {
            range,
            vertex_count: 2,
            values: vec![vec![0.5, 0.0], vec![0.5, 0.0]],
        };
        let mut cfg = Config::default();
        cfg.smoothing.enabled = false;
        (samples, smooth_offsets(raw, &cfg))
    }

    #[test]
    fn assembles_frame_keyed_maps_in_order() {
        let (samples, smoothed) = samples_and_offsets();
        let cache = MotionCache::assemble(&samples, &smoothed).unwrap();
        assert_eq!(cache.vertex_count, 2);
        assert_eq!(cache.frame_count(), 2);
        assert_eq!(
            cache.vertex_trajectories.keys().collect::<Vec<_>>(),
            vec!["3", "4"]
        );
        assert_eq!(cache.positions_at(4).unwrap()[1], [0.0, 0.0, 1.0]);
        assert_eq!(cache.offsets_at(3).unwrap(), &[0.5, 0.0]);
        assert!(cache.offsets_at(5).is_none());
        cache.validate().unwrap();

        let v = cache.to_json_value().unwrap();
        assert_eq!(v["start_frame"], 3);
        assert_eq!(v["end_frame"], 4);
        assert_eq!(v["vertex_trajectories"]["3"][1][0], 1.0);
    }

    #[test]
    fn write_then_read_leaves_no_temp_file() {
        let (samples, smoothed) = samples_and_offsets();
        let cache = MotionCache::assemble(&samples, &smoothed).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("smear_cache.json");

        cache.write_json(&path).unwrap();
        assert!(path.exists());
        assert!(!temp_path(&path).exists());
        assert_eq!(MotionCache::read_json(&path).unwrap(), cache);
    }

    #[test]
    fn write_into_missing_directory_is_an_io_error() {
        let (samples, smoothed) = samples_and_offsets();
        let cache = MotionCache::assemble(&samples, &smoothed).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("cache.json");
        let err = cache.write_json(&path).unwrap_err();
        assert!(matches!(err, SmearError::Io { .. }));
        assert!(!path.exists());
    }

    #[test]
    fn validation_rejects_short_rows_and_missing_frames() {
        let (samples, smoothed) = samples_and_offsets();
        let cache = MotionCache::assemble(&samples, &smoothed).unwrap();

        let mut short = cache.clone();
        short.motion_offsets.insert("4".into(), vec![0.0]);
        assert!(matches!(short.validate(), Err(SmearError::InvalidCache(_))));

        let mut missing = cache.clone();
        missing.vertex_trajectories.shift_remove("3");
        assert!(matches!(missing.validate(), Err(SmearError::InvalidCache(_))));

        let mut stray = cache.clone();
        stray.motion_offsets.shift_remove("4");
        stray.motion_offsets.insert("9".into(), vec![0.0, 0.0]);
        assert!(matches!(stray.validate(), Err(SmearError::InvalidCache(_))));

        let mut reversed = cache;
        reversed.end_frame = 1;
        assert!(matches!(
            reversed.validate(),
            Err(SmearError::InvalidFrameRange { .. })
        ));
    }

    #[test]
    fn mismatched_inputs_do_not_assemble() {
        let (mut samples, smoothed) = samples_and_offsets();
        samples.vertex_count = 3;
        assert!(matches!(
            MotionCache::assemble(&samples, &smoothed),
            Err(SmearError::ShapeMismatch { .. })
        ));
    }
}

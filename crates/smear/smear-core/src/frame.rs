//! Frame indices and closed frame ranges.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SmearError};

/// Integer frame on the host timeline.
pub type Frame = i32;

/// Closed range `[start, end]` of frames, inclusive of both ends.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct FrameRange {
    pub start: Frame,
    pub end: Frame,
}

impl FrameRange {
    /// Build a range, rejecting `end < start`.
    pub fn new(start: Frame, end: Frame) -> Result<Self> {
        let range = Self { start, end };
        range.validate()?;
        Ok(range)
    }

    pub fn validate(&self) -> Result<()> {
        if self.end < self.start {
            return Err(SmearError::InvalidFrameRange {
                start: self.start,
                end: self.end,
            });
        }
        Ok(())
    }

    /// Number of frames, `end - start + 1`.
    #[inline]
    pub fn len(&self) -> usize {
        (i64::from(self.end) - i64::from(self.start) + 1).max(0) as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn contains(&self, frame: Frame) -> bool {
        frame >= self.start && frame <= self.end
    }

    /// Dense index of `frame` within the range.
    #[inline]
    pub fn index_of(&self, frame: Frame) -> Option<usize> {
        self.contains(frame)
            .then(|| (i64::from(frame) - i64::from(self.start)) as usize)
    }

    /// Frame at dense index `idx`.
    #[inline]
    pub fn frame_at(&self, idx: usize) -> Option<Frame> {
        (idx < self.len()).then(|| self.start + idx as Frame)
    }

    pub fn iter(&self) -> impl Iterator<Item = Frame> + Clone {
        self.start..=self.end
    }
}

impl IntoIterator for FrameRange {
    type Item = Frame;
    type IntoIter = std::ops::RangeInclusive<Frame>;

    fn into_iter(self) -> Self::IntoIter {
        self.start..=self.end
    }
}

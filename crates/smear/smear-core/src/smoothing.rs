//! Temporal smoothing of the raw offset field.
//!
//! Each vertex's offset series is convolved along time with a symmetric
//! quartic (Welch-type) kernel `w(n) = (1 - (n / (window + 1))^2)^2`,
//! `n in [-window, window]`. At the ends of the range, taps that fall outside
//! the sequence are dropped and the remaining taps are renormalized, so the
//! output has one value per input frame and constants pass through unchanged.

use rayon::prelude::*;

use crate::config::Config;
use crate::frame::{Frame, FrameRange};
use crate::solver::RawOffsetField;

/// Symmetric low-pass kernel of half-width `window`.
#[derive(Clone, Debug, PartialEq)]
pub struct SmoothingKernel {
    window: usize,
    /// Unnormalized taps for `n = -window ..= window`.
    taps: Vec<f64>,
}

impl SmoothingKernel {
    pub fn welch(window: usize) -> Self {
        let denom = (window + 1) as f64;
        let w = window as isize;
        let taps = (-w..=w)
            .map(|n| {
                let r = n as f64 / denom;
                let a = 1.0 - r * r;
                a * a
            })
            .collect();
        Self { window, taps }
    }

    #[inline]
    pub fn window(&self) -> usize {
        self.window
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.taps.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.taps.is_empty()
    }

    /// Taps normalized to sum to 1, ordered `n = -window ..= window`.
    pub fn weights(&self) -> Vec<f64> {
        let total: f64 = self.taps.iter().sum();
        self.taps.iter().map(|t| t / total).collect()
    }

    /// Smoothed value at index `t` of a series of length `len`, read through `sample`.
    #[inline]
    fn convolve_at(&self, t: usize, len: usize, sample: impl Fn(usize) -> f64) -> f64 {
        let lo = t.saturating_sub(self.window);
        let hi = (t + self.window).min(len.saturating_sub(1));
        let mut acc = 0.0;
        let mut total = 0.0;
        for i in lo..=hi {
            let w = self.taps[i + self.window - t];
            acc += sample(i) * w;
            total += w;
        }
        if total > 0.0 {
            acc / total
        } else {
            sample(t)
        }
    }

    /// Same-length, edge-truncated convolution of one series.
    pub fn apply(&self, series: &[f64]) -> Vec<f64> {
        (0..series.len())
            .map(|t| self.convolve_at(t, series.len(), |i| series[i]))
            .collect()
    }
}

/// Final offsets after temporal smoothing; immutable once produced.
#[derive(Clone, Debug, PartialEq)]
pub struct SmoothedOffsetField {
    range: FrameRange,
    vertex_count: usize,
    values: Vec<Vec<f64>>,
}

impl SmoothedOffsetField {
    pub fn range(&self) -> FrameRange {
        self.range
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    pub fn frame_count(&self) -> usize {
        self.values.len()
    }

    /// Offsets of every vertex at `frame`.
    pub fn at(&self, frame: Frame) -> Option<&[f64]> {
        let idx = self.range.index_of(frame)?;
        self.values.get(idx).map(Vec::as_slice)
    }

    /// `values[frame_index][vertex]`.
    pub fn values(&self) -> &[Vec<f64>] {
        &self.values
    }

    pub fn vertex_series(&self, vertex: usize) -> Vec<f64> {
        self.values.iter().map(|frame| frame[vertex]).collect()
    }
}

/// Smooth every vertex of `raw` along time with the configured kernel.
pub fn smooth_offsets(raw: RawOffsetField, cfg: &Config) -> SmoothedOffsetField {
    let kernel = SmoothingKernel::welch(cfg.effective_window());
    let RawOffsetField {
        range,
        vertex_count,
        values: raw_values,
    } = raw;
    let frames = raw_values.len();

    let smooth_frame = |t: usize| -> Vec<f64> {
        (0..vertex_count)
            .map(|v| kernel.convolve_at(t, frames, |i| raw_values[i][v]))
            .collect()
    };

    let values = if cfg.parallel {
        (0..frames).into_par_iter().map(smooth_frame).collect()
    } else {
        (0..frames).map(smooth_frame).collect()
    };

    SmoothedOffsetField {
        range,
        vertex_count,
        values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn field(series: &[&[f64]]) -> RawOffsetField {
        // series[vertex][frame] -> values[frame][vertex]
        let frames = series[0].len();
        let values = (0..frames)
            .map(|f| series.iter().map(|s| s[f]).collect::<Vec<f64>>())
            .collect();
        RawOffsetField {
            range: FrameRange::new(1, frames as i32).unwrap(),
            vertex_count: series.len(),
            values,
        }
    }

    #[test]
    fn default_kernel_has_five_normalized_taps() {
        let k = SmoothingKernel::welch(2);
        let w = k.weights();
        assert_eq!(w.len(), 5);
        assert_relative_eq!(w.iter().sum::<f64>(), 1.0, epsilon = 1e-15);
        assert_relative_eq!(w[2], 81.0 / 259.0, epsilon = 1e-15);
        assert_relative_eq!(w[1], 64.0 / 259.0, epsilon = 1e-15);
        assert_relative_eq!(w[0], 25.0 / 259.0, epsilon = 1e-15);
        assert_eq!(w[0], w[4]);
        assert_eq!(w[1], w[3]);
    }

    #[test]
    fn interior_impulse_reproduces_the_kernel() {
        let k = SmoothingKernel::welch(2);
        // Impulse far enough from both ends that outputs 2..=6 see every tap.
        let mut series = [0.0; 9];
        series[4] = 1.0;
        let out = k.apply(&series);
        let w = k.weights();
        for i in 0..5 {
            assert_relative_eq!(out[2 + i], w[i], epsilon = 1e-15);
        }
        for i in [0, 1, 7, 8] {
            assert_eq!(out[i], 0.0);
        }
    }

    #[test]
    fn edges_are_truncated_and_renormalized() {
        // window 1: taps [0.5625, 1, 0.5625]
        let k = SmoothingKernel::welch(1);
        let out = k.apply(&[1.0, 0.0, 0.0, 0.0]);
        assert_relative_eq!(out[0], 1.0 / 1.5625, epsilon = 1e-15);
        assert_relative_eq!(out[1], 0.5625 / 2.125, epsilon = 1e-15);
        assert_eq!(out[2], 0.0);
        assert_eq!(out[3], 0.0);

        let mirrored = k.apply(&[0.0, 0.0, 0.0, 1.0]);
        assert_relative_eq!(mirrored[3], out[0], epsilon = 1e-15);
        assert_relative_eq!(mirrored[2], out[1], epsilon = 1e-15);
    }

    #[test]
    fn zero_and_constant_sequences_pass_through() {
        let raw = field(&[&[0.0; 6], &[2.5; 6]]);
        let smoothed = smooth_offsets(raw, &Config::default());
        for f in 0..6 {
            assert_eq!(smoothed.values()[f][0], 0.0);
            assert_relative_eq!(smoothed.values()[f][1], 2.5, epsilon = 1e-12);
        }
    }

    #[test]
    fn output_shape_matches_input() {
        let raw = field(&[&[1.0, 2.0, 3.0], &[0.0, 1.0, 0.0]]);
        let smoothed = smooth_offsets(raw, &Config::default());
        assert_eq!(smoothed.frame_count(), 3);
        assert_eq!(smoothed.vertex_count(), 2);
        assert_eq!(smoothed.range(), FrameRange::new(1, 3).unwrap());
        assert!(smoothed.at(0).is_none());
        assert_eq!(smoothed.at(3).unwrap().len(), 2);
    }

    #[test]
    fn disabled_smoothing_is_identity() {
        let raw = field(&[&[1.0, -4.0, 9.0, 0.5]]);
        let mut cfg = Config::default();
        cfg.smoothing.enabled = false;
        let smoothed = smooth_offsets(raw.clone(), &cfg);
        assert_eq!(smoothed.vertex_series(0), raw.vertex_series(0));
    }

    #[test]
    fn single_frame_is_unchanged() {
        let raw = field(&[&[3.0]]);
        let smoothed = smooth_offsets(raw, &Config::default());
        assert_eq!(smoothed.values()[0][0], 3.0);
    }

    #[test]
    fn serial_matches_parallel() {
        let raw = field(&[&[1.0, 5.0, -2.0, 0.25, 8.0], &[0.0, 0.1, 0.2, 0.3, 0.4]]);
        let serial = Config {
            parallel: false,
            ..Config::default()
        };
        assert_eq!(
            smooth_offsets(raw.clone(), &serial),
            smooth_offsets(raw, &Config::default())
        );
    }
}

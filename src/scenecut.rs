//! Histogram-based scene-change (keyframe) detection over sampled thumbnails.

use imgref::ImgRef;
use rgb::RGBA8;

const BINS_PER_CHANNEL: usize = 16;
const BINS: usize = BINS_PER_CHANNEL * 3;

/// 48-bin color distribution of one thumbnail (16 bins per RGB channel).
#[derive(Clone, PartialEq, Eq)]
pub struct Histogram([u32; BINS]);

impl Histogram {
    fn of(thumb: ImgRef<'_, RGBA8>) -> Self {
        let mut bins = [0u32; BINS];
        for px in thumb.pixels() {
            bins[usize::from(px.r >> 4)] += 1;
            bins[BINS_PER_CHANNEL + usize::from(px.g >> 4)] += 1;
            bins[2 * BINS_PER_CHANNEL + usize::from(px.b >> 4)] += 1;
        }
        Self(bins)
    }

    /// L1 norm of the bin-wise difference.
    fn l1(&self, other: &Self) -> u64 {
        self.0.iter().zip(other.0.iter())
            .map(|(&a, &b)| u64::from(a.abs_diff(b)))
            .sum()
    }
}

/// Accumulates one histogram per pushed thumbnail, then flags the indices
/// whose distribution diverges from the previous one beyond a threshold.
///
/// Single pass, no smoothing, no lookahead. Index 0 is always a keyframe.
pub struct SceneChangeDetector {
    width: usize,
    height: usize,
    hists: Vec<Histogram>,
    times: Vec<f64>,
}

impl SceneChangeDetector {
    #[must_use]
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height, hists: Vec::new(), times: Vec::new() }
    }

    /// Drop all accumulated histograms and start a new detection pass.
    pub fn reset(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        self.hists.clear();
        self.times.clear();
    }

    /// Accumulate one sampled thumbnail taken at `time` seconds.
    pub fn push(&mut self, thumb: ImgRef<'_, RGBA8>, time: f64) {
        self.hists.push(Histogram::of(thumb));
        self.times.push(time);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.hists.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hists.is_empty()
    }

    /// Sample timestamps, parallel to the pushed thumbnails.
    #[must_use]
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// Indices whose normalized L1 histogram distance to the previous
    /// thumbnail is ≥ `threshold` (0..1), plus index 0 unconditionally.
    #[must_use]
    pub fn detect(&self, threshold: f64) -> Vec<usize> {
        if self.hists.is_empty() {
            return Vec::new();
        }
        let mut indices = vec![0];
        let norm = (self.width * self.height * 3).max(1) as f64;
        for i in 1..self.hists.len() {
            let diff = self.hists[i].l1(&self.hists[i - 1]) as f64 / norm;
            if diff >= threshold {
                indices.push(i);
            }
        }
        tracing::debug!(thumbnails = self.hists.len(), keyframes = indices.len(), threshold, "scene-change detection");
        indices
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use imgref::ImgVec;

    fn solid(w: usize, h: usize, r: u8, g: u8, b: u8) -> ImgVec<RGBA8> {
        ImgVec::new(vec![RGBA8::new(r, g, b, 255); w * h], w, h)
    }

    #[test]
    fn index_zero_is_always_a_keyframe() {
        let mut det = SceneChangeDetector::new(4, 4);
        det.push(solid(4, 4, 10, 10, 10).as_ref(), 0.);
        assert_eq!(det.detect(1.), vec![0]);
    }

    #[test]
    fn identical_thumbnails_have_distance_zero() {
        let mut det = SceneChangeDetector::new(4, 4);
        det.push(solid(4, 4, 10, 10, 10).as_ref(), 0.);
        det.push(solid(4, 4, 10, 10, 10).as_ref(), 0.5);
        // distance is exactly 0, flagged only when the threshold is 0
        assert_eq!(det.detect(0.001), vec![0]);
        assert_eq!(det.detect(0.), vec![0, 1]);
    }

    #[test]
    fn full_swing_is_flagged() {
        let mut det = SceneChangeDetector::new(4, 4);
        det.push(solid(4, 4, 0, 0, 0).as_ref(), 0.);
        det.push(solid(4, 4, 255, 255, 255).as_ref(), 0.5);
        det.push(solid(4, 4, 255, 255, 255).as_ref(), 1.);
        // black -> white moves every count into a different bin: distance 2.0
        assert_eq!(det.detect(0.5), vec![0, 1]);
    }

    #[test]
    fn reset_discards_the_pass() {
        let mut det = SceneChangeDetector::new(4, 4);
        det.push(solid(4, 4, 0, 0, 0).as_ref(), 0.);
        det.reset(4, 4);
        assert!(det.is_empty());
        assert_eq!(det.detect(0.1), Vec::<usize>::new());
        assert!(det.times().is_empty());
    }
}

//! HSV color histograms for shot boundary detection.
//!
//! 8 bins per channel (512 total), L2-normalized, compared with the
//! Bhattacharyya distance. Distances are clamped to [0, 1].

use crate::frame::Frame;

pub const BINS_PER_CHANNEL: usize = 8;
const TOTAL_BINS: usize = BINS_PER_CHANNEL * BINS_PER_CHANNEL * BINS_PER_CHANNEL;

/// L2-normalized 8x8x8 HSV histogram of a frame.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorHistogram {
    bins: Vec<f64>,
}

impl ColorHistogram {
    pub fn from_frame(frame: &Frame) -> Self {
        let mut bins = vec![0.0f64; TOTAL_BINS];
        for (r, g, b) in frame.pixels() {
            let (h, s, v) = rgb_to_hsv(r, g, b);
            let hi = bin_index(h / 360.0);
            let si = bin_index(s);
            let vi = bin_index(v);
            bins[(hi * BINS_PER_CHANNEL + si) * BINS_PER_CHANNEL + vi] += 1.0;
        }

        let norm = bins.iter().map(|v| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            for bin in &mut bins {
                *bin /= norm;
            }
        }
        Self { bins }
    }

    pub fn bins(&self) -> &[f64] {
        &self.bins
    }

    /// Bhattacharyya distance to another histogram, clamped to [0, 1].
    ///
    /// Uses the OpenCV definition:
    /// `sqrt(1 - sum(sqrt(a_i * b_i)) / sqrt(mean(a) * mean(b) * N^2))`.
    /// Degenerate histograms (all-zero bins) compare as maximally distant,
    /// the conservative choice for boundary detection.
    pub fn bhattacharyya_distance(&self, other: &ColorHistogram) -> f64 {
        let n = TOTAL_BINS as f64;
        let sum_a: f64 = self.bins.iter().sum();
        let sum_b: f64 = other.bins.iter().sum();
        let denom = ((sum_a / n) * (sum_b / n) * n * n).sqrt();
        if denom <= 0.0 {
            return 1.0;
        }

        let coeff: f64 = self
            .bins
            .iter()
            .zip(&other.bins)
            .map(|(a, b)| (a * b).sqrt())
            .sum();
        let inner = (1.0 - coeff / denom).max(0.0);
        inner.sqrt().clamp(0.0, 1.0)
    }
}

fn bin_index(unit: f64) -> usize {
    let idx = (unit * BINS_PER_CHANNEL as f64) as usize;
    idx.min(BINS_PER_CHANNEL - 1)
}

/// RGB (0-255) to HSV with hue in degrees [0, 360) and s, v in [0, 1].
pub fn rgb_to_hsv(r: u8, g: u8, b: u8) -> (f64, f64, f64) {
    let r = r as f64 / 255.0;
    let g = g as f64 / 255.0;
    let b = b as f64 / 255.0;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let h = if delta == 0.0 {
        0.0
    } else if max == r {
        60.0 * (((g - b) / delta).rem_euclid(6.0))
    } else if max == g {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };
    let s = if max == 0.0 { 0.0 } else { delta / max };
    (h, s, max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_frames_have_zero_distance() {
        let frame = Frame::solid(16, 16, [200, 40, 40]);
        let a = ColorHistogram::from_frame(&frame);
        let b = ColorHistogram::from_frame(&frame);
        assert!(a.bhattacharyya_distance(&b) < 1e-6);
    }

    #[test]
    fn disjoint_colors_are_maximally_distant() {
        let red = ColorHistogram::from_frame(&Frame::solid(16, 16, [255, 0, 0]));
        let blue = ColorHistogram::from_frame(&Frame::solid(16, 16, [0, 0, 255]));
        let d = red.bhattacharyya_distance(&blue);
        assert!(d > 0.99, "distance was {d}");
    }

    #[test]
    fn histogram_is_l2_normalized() {
        let hist = ColorHistogram::from_frame(&Frame::solid(8, 8, [12, 200, 90]));
        let norm: f64 = hist.bins().iter().map(|v| v * v).sum::<f64>().sqrt();
        assert!((norm - 1.0).abs() < 1e-9);
    }

    #[test]
    fn empty_frame_compares_as_distant() {
        let empty = ColorHistogram::from_frame(&Frame::new(0, 0, vec![]));
        let solid = ColorHistogram::from_frame(&Frame::solid(4, 4, [1, 2, 3]));
        assert_eq!(empty.bhattacharyya_distance(&solid), 1.0);
    }

    #[test]
    fn hsv_conversion_primaries() {
        assert_eq!(rgb_to_hsv(255, 0, 0), (0.0, 1.0, 1.0));
        let (h, s, v) = rgb_to_hsv(0, 255, 0);
        assert!((h - 120.0).abs() < 1e-9 && s == 1.0 && v == 1.0);
        let (h, _, _) = rgb_to_hsv(0, 0, 255);
        assert!((h - 240.0).abs() < 1e-9);
    }
}

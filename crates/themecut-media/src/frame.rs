//! Decoded keyframe types flowing through the segment stage.

/// A decoded frame, packed RGB24 (3 bytes per pixel, row-major).
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl Frame {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Self {
        debug_assert_eq!(data.len(), (width * height * 3) as usize);
        Self {
            width,
            height,
            data,
        }
    }

    /// Uniform-color frame. Handy for deterministic sources and tests.
    pub fn solid(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let pixels = (width * height) as usize;
        let mut data = Vec::with_capacity(pixels * 3);
        for _ in 0..pixels {
            data.extend_from_slice(&rgb);
        }
        Self {
            width,
            height,
            data,
        }
    }

    pub fn pixel_count(&self) -> usize {
        (self.width * self.height) as usize
    }

    /// Iterate pixels as `(r, g, b)` triples.
    pub fn pixels(&self) -> impl Iterator<Item = (u8, u8, u8)> + '_ {
        self.data.chunks_exact(3).map(|p| (p[0], p[1], p[2]))
    }
}

/// A frame sampled from the source at a known timestamp (seconds).
#[derive(Debug, Clone, PartialEq)]
pub struct KeyframeSample {
    pub timestamp: f64,
    pub frame: Frame,
}

/// A keyframe sample paired with its visual embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedSample {
    pub sample: KeyframeSample,
    pub embedding: Vec<f32>,
}

impl EmbeddedSample {
    pub fn timestamp(&self) -> f64 {
        self.sample.timestamp
    }

    pub fn frame(&self) -> &Frame {
        &self.sample.frame
    }
}

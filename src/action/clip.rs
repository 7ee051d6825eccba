use image::imageops::{self, FilterType};

use crate::frame::Frame;

/// Preprocessed frame sequence ready for one batched inference call.
///
/// Layout is `[frames, size, size, 3]`, channels last, values scaled to 0..=1.
#[derive(Clone, Debug, PartialEq)]
pub struct Clip {
    pub frames: usize,
    pub size: u32,
    pub data: Vec<f32>,
}

impl Clip {
    /// Resize each frame to `size` x `size` and scale to 0..=1.
    pub fn from_frames(frames: &[Frame], size: u32) -> Self {
        let side = size as usize;
        let mut data = Vec::with_capacity(frames.len() * side * side * 3);
        for frame in frames {
            let resized = if frame.width() == size && frame.height() == size {
                frame.image().clone()
            } else {
                imageops::resize(frame.image(), size, size, FilterType::Triangle)
            };
            data.extend(resized.as_raw().iter().map(|&v| v as f32 / 255.0));
        }
        Self {
            frames: frames.len(),
            size,
            data,
        }
    }

    pub fn shape(&self) -> [usize; 4] {
        let side = self.size as usize;
        [self.frames, side, side, 3]
    }
}

//! Decoded frames and per-camera frame windows.
//!
//! - `Frame`: immutable RGB image, cheap to clone (shared buffer).
//! - `FrameWindow`: bounded FIFO of the most recent frames for one camera.
//! - `CameraWindows`: registry mapping camera ids to their own locked window.
//!
//! Each camera's window sits behind its own mutex. The registry map is only locked long
//! enough to find or insert an entry, so unrelated cameras never wait on each other.

use anyhow::{anyhow, Result};
use image::RgbImage;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Default number of frames kept per camera.
pub const DEFAULT_WINDOW_CAPACITY: usize = 30;

/// RGB channel depth of every decoded frame.
pub const FRAME_CHANNELS: u8 = 3;

// ----------------------------------------------------------------------------
// Frame
// ----------------------------------------------------------------------------

/// Decoded RGB frame. Clones share the pixel buffer.
#[derive(Clone, Debug)]
pub struct Frame {
    image: Arc<RgbImage>,
}

impl Frame {
    pub fn from_image(image: RgbImage) -> Self {
        Self {
            image: Arc::new(image),
        }
    }

    /// Build a frame from packed RGB24 bytes.
    pub fn from_rgb(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(FRAME_CHANNELS as usize))
            .ok_or_else(|| anyhow!("frame dimensions overflow"))?;
        if pixels.len() != expected {
            return Err(anyhow!(
                "expected {} RGB bytes for {}x{}, received {}",
                expected,
                width,
                height,
                pixels.len()
            ));
        }
        let image = RgbImage::from_raw(width, height, pixels)
            .ok_or_else(|| anyhow!("RGB buffer does not match {}x{}", width, height))?;
        Ok(Self::from_image(image))
    }

    /// Solid-color frame, mostly useful for tests and warm-up.
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        Self::from_image(RgbImage::from_pixel(width, height, image::Rgb(rgb)))
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn channels(&self) -> u8 {
        FRAME_CHANNELS
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn pixels(&self) -> &[u8] {
        self.image.as_raw()
    }

    /// True when both frames share the same pixel buffer.
    pub fn same_buffer(&self, other: &Frame) -> bool {
        Arc::ptr_eq(&self.image, &other.image)
    }
}

// ----------------------------------------------------------------------------
// FrameWindow
// ----------------------------------------------------------------------------

/// Bounded FIFO of recent frames for one camera.
///
/// Insertion order is preserved and the window never exceeds its capacity; the oldest
/// frame is evicted first.
#[derive(Debug)]
pub struct FrameWindow {
    frames: VecDeque<Frame>,
    capacity: usize,
}

impl FrameWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            frames: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, frame: Frame) {
        while self.frames.len() >= self.capacity {
            self.frames.pop_front();
        }
        self.frames.push_back(frame);
    }

    /// The most recent `count` frames, oldest first. `None` while fewer are buffered.
    pub fn snapshot(&self, count: usize) -> Option<Vec<Frame>> {
        if count > self.capacity || self.frames.len() < count {
            return None;
        }
        let skip = self.frames.len() - count;
        Some(self.frames.iter().skip(skip).cloned().collect())
    }

    pub fn oldest(&self) -> Option<&Frame> {
        self.frames.front()
    }

    pub fn latest(&self) -> Option<&Frame> {
        self.frames.back()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for FrameWindow {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_CAPACITY)
    }
}

// ----------------------------------------------------------------------------
// CameraWindows
// ----------------------------------------------------------------------------

/// Registry of per-camera frame windows.
///
/// Windows are created lazily on first use and live for the lifetime of the registry.
pub struct CameraWindows {
    windows: Mutex<HashMap<String, Arc<Mutex<FrameWindow>>>>,
    capacity: usize,
}

impl CameraWindows {
    pub fn new(capacity: usize) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Window handle for a camera, creating an empty window on first sight.
    pub fn camera(&self, camera_id: &str) -> Arc<Mutex<FrameWindow>> {
        let mut windows = lock_recovering(&self.windows);
        windows
            .entry(camera_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(FrameWindow::new(self.capacity))))
            .clone()
    }

    /// Lock a camera's window. Holding the guard serializes that camera only.
    pub fn lock<'a>(&self, handle: &'a Mutex<FrameWindow>) -> MutexGuard<'a, FrameWindow> {
        lock_recovering(handle)
    }

    pub fn push(&self, camera_id: &str, frame: Frame) {
        let handle = self.camera(camera_id);
        lock_recovering(&handle).push(frame);
    }

    pub fn snapshot(&self, camera_id: &str, count: usize) -> Option<Vec<Frame>> {
        let handle = self.camera(camera_id);
        let window = lock_recovering(&handle);
        window.snapshot(count)
    }

    /// Buffered frame count. Unknown cameras report zero and are not created.
    pub fn len(&self, camera_id: &str) -> usize {
        let handle = {
            let windows = lock_recovering(&self.windows);
            match windows.get(camera_id) {
                Some(handle) => handle.clone(),
                None => return 0,
            }
        };
        let window = lock_recovering(&handle);
        window.len()
    }

    /// Known camera ids, sorted.
    pub fn cameras(&self) -> Vec<String> {
        let windows = lock_recovering(&self.windows);
        let mut ids: Vec<String> = windows.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for CameraWindows {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_CAPACITY)
    }
}

/// A panic while a window was locked leaves it structurally intact, so keep serving it.
fn lock_recovering<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

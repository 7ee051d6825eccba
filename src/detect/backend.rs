use anyhow::Result;

use crate::detect::result::Entity;
use crate::frame::Frame;

/// Instantaneous object detector capability.
///
/// Implementations apply their own confidence threshold; entities below it are never
/// returned. `detect` takes `&self` so cameras can share one loaded model and run in
/// parallel. A returned error is treated as "no opinion" for that frame only.
pub trait ObjectDetector: Send + Sync {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// False only for the no-op capability used when no model could be loaded.
    fn is_available(&self) -> bool {
        true
    }

    /// Detect players and sticks in one frame, boxes in that frame's pixel space.
    fn detect(&self, frame: &Frame) -> Result<Vec<Entity>>;

    /// Optional warm-up hook.
    fn warm_up(&self) -> Result<()> {
        Ok(())
    }
}

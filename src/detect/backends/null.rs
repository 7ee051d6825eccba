use anyhow::Result;

use crate::detect::backend::ObjectDetector;
use crate::detect::result::Entity;
use crate::frame::Frame;

/// Stand-in used when no detection model could be loaded. Never sees anything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullObjectDetector;

impl ObjectDetector for NullObjectDetector {
    fn name(&self) -> &'static str {
        "null"
    }

    fn is_available(&self) -> bool {
        false
    }

    fn detect(&self, _frame: &Frame) -> Result<Vec<Entity>> {
        Ok(Vec::new())
    }
}

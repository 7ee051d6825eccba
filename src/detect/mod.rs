//! Object detection capability.
//!
//! The pipeline never talks to a detector backend directly. It goes through
//! `ObjectDetectionAdapter`, which turns every outcome (model missing, call failed,
//! entities found) into the same `ObjectDetections` shape.

mod annotate;
mod backend;
mod backends;
mod result;

use std::sync::Arc;

pub use backend::ObjectDetector;
pub use backends::NullObjectDetector;
#[cfg(feature = "backend-tract")]
pub use backends::TractObjectDetector;
pub use result::{classify_label, Entity, EntityKind, ObjectDetections};

use crate::config::DetectorSettings;
use crate::frame::Frame;

/// Uniform front for an object detector capability.
#[derive(Clone)]
pub struct ObjectDetectionAdapter {
    detector: Arc<dyn ObjectDetector>,
}

impl ObjectDetectionAdapter {
    pub fn new(detector: Arc<dyn ObjectDetector>) -> Self {
        Self { detector }
    }

    pub fn is_available(&self) -> bool {
        self.detector.is_available()
    }

    pub fn name(&self) -> &'static str {
        self.detector.name()
    }

    /// Detect entities and annotate a copy of the frame.
    ///
    /// A missing model or a failed call yields no entities and the frame unannotated.
    pub fn detect(&self, frame: &Frame) -> ObjectDetections {
        if !self.detector.is_available() {
            return ObjectDetections::empty(frame);
        }
        match self.detector.detect(frame) {
            Ok(entities) => ObjectDetections {
                annotated: annotate::annotate(frame, &entities),
                entities,
            },
            Err(err) => {
                log::warn!(
                    "object detection failed on {} backend: {:#}",
                    self.detector.name(),
                    err
                );
                ObjectDetections::empty(frame)
            }
        }
    }
}

/// Pick the object detector for this process. Called once at startup.
///
/// Any load failure degrades to `NullObjectDetector` for the process lifetime.
pub fn select_object_detector(settings: &DetectorSettings) -> Arc<dyn ObjectDetector> {
    let Some(path) = settings.model_path.as_ref() else {
        log::warn!("no object detection model configured; geometric hits disabled");
        return Arc::new(NullObjectDetector);
    };

    #[cfg(feature = "backend-tract")]
    {
        let loaded = TractObjectDetector::new(
            path,
            settings.input_size,
            settings.class_names.clone(),
        )
        .map(|detector| detector.with_threshold(settings.confidence_threshold));
        match loaded {
            Ok(detector) => {
                if let Err(err) = detector.warm_up() {
                    log::warn!("object detector warm-up failed: {:#}", err);
                }
                log::info!(
                    "object detector loaded from {} (classes: {})",
                    path.display(),
                    settings.class_names.join(", ")
                );
                Arc::new(detector)
            }
            Err(err) => {
                log::error!("failed to load object detector: {:#}", err);
                Arc::new(NullObjectDetector)
            }
        }
    }
    #[cfg(not(feature = "backend-tract"))]
    {
        log::warn!(
            "object detection model {} ignored: built without the backend-tract feature",
            path.display()
        );
        Arc::new(NullObjectDetector)
    }
}

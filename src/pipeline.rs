//! Per-frame fusion pipeline.
//!
//! `Pipeline` owns the camera windows, the throttle and both detector adapters. Every
//! submitted frame produces exactly one `FrameOutcome`: a detection result or a scoped
//! error. No single frame can take the process or another camera down.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::action::{
    ActionPrediction, ActionRecognitionAdapter, ActionRecognizer, DEFAULT_CONTEXT_FRAMES,
    DEFAULT_INPUT_SIZE,
};
use crate::codec::{self, DEFAULT_JPEG_QUALITY};
use crate::detect::{ObjectDetectionAdapter, ObjectDetector};
use crate::frame::{CameraWindows, Frame, DEFAULT_WINDOW_CAPACITY};
use crate::inference::{
    self, Throttle, DEFAULT_ACTION_THRESHOLD, DEFAULT_CONTACT_THRESHOLD, DEFAULT_THROTTLE_EVERY,
};
use crate::{DetectionMode, HitEvent};

const DEFAULT_CAMERA_ID: &str = "camera_1";

// -------------------- Settings --------------------

/// Tunables for one pipeline instance.
#[derive(Clone, Debug)]
pub struct PipelineSettings {
    pub window_capacity: usize,
    pub context_frames: usize,
    pub action_input_size: u32,
    pub contact_threshold: f32,
    pub action_threshold: f32,
    pub throttle_every: u64,
    pub jpeg_quality: u8,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            window_capacity: DEFAULT_WINDOW_CAPACITY,
            context_frames: DEFAULT_CONTEXT_FRAMES,
            action_input_size: DEFAULT_INPUT_SIZE,
            contact_threshold: DEFAULT_CONTACT_THRESHOLD,
            action_threshold: DEFAULT_ACTION_THRESHOLD,
            throttle_every: DEFAULT_THROTTLE_EVERY,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

// -------------------- Errors --------------------

/// Why a single submission produced no result.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FrameError {
    /// The submission carried no frame.
    MissingFrame,
    /// The frame payload could not be decoded.
    Malformed(String),
    /// Something failed after decoding.
    Fault(String),
}

impl std::fmt::Display for FrameError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FrameError::MissingFrame => write!(f, "No frame provided"),
            FrameError::Malformed(reason) => write!(f, "Failed to decode frame: {}", reason),
            FrameError::Fault(reason) => write!(f, "{}", reason),
        }
    }
}

impl std::error::Error for FrameError {}

// -------------------- Wire Types --------------------

/// "submit frame" input event.
#[derive(Clone, Debug, Deserialize)]
pub struct FrameSubmission {
    #[serde(default = "default_camera_id")]
    pub camera_id: String,
    /// Base64 image, optionally as a data URL.
    #[serde(default)]
    pub frame: Option<String>,
    #[serde(default)]
    pub mode: DetectionMode,
}

fn default_camera_id() -> String {
    DEFAULT_CAMERA_ID.to_string()
}

/// Fused output for one processed frame.
#[derive(Clone, Debug)]
pub struct DetectionResult {
    pub camera_id: String,
    pub annotated: Frame,
    /// Geometric hits first, then at most one temporal hit.
    pub detections: Vec<HitEvent>,
}

/// Transport-facing outcome of one submission.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum FrameOutcome {
    DetectionResult {
        camera_id: String,
        /// Annotated frame as a JPEG data URL.
        frame: String,
        detections: Vec<HitEvent>,
    },
    Error {
        message: String,
    },
}

impl FrameOutcome {
    pub fn error(err: &FrameError) -> Self {
        FrameOutcome::Error {
            message: err.to_string(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, FrameOutcome::Error { .. })
    }
}

/// Which detectors are actually loaded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct CapabilityStatus {
    pub object_detector: bool,
    pub action_recognizer: bool,
}

// -------------------- Pipeline --------------------

pub struct Pipeline {
    detector: ObjectDetectionAdapter,
    recognizer: ActionRecognitionAdapter,
    windows: CameraWindows,
    throttle: Throttle,
    settings: PipelineSettings,
}

impl Pipeline {
    pub fn new(
        detector: Arc<dyn ObjectDetector>,
        recognizer: Arc<dyn ActionRecognizer>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            detector: ObjectDetectionAdapter::new(detector),
            recognizer: ActionRecognitionAdapter::new(
                recognizer,
                settings.context_frames,
                settings.action_input_size,
            ),
            windows: CameraWindows::new(settings.window_capacity),
            throttle: Throttle::new(settings.throttle_every),
            settings,
        }
    }

    pub fn capabilities(&self) -> CapabilityStatus {
        CapabilityStatus {
            object_detector: self.detector.is_available(),
            action_recognizer: self.recognizer.is_available(),
        }
    }

    pub fn windows(&self) -> &CameraWindows {
        &self.windows
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Frames processed so far across all cameras.
    pub fn frames_processed(&self) -> u64 {
        self.throttle.ticks()
    }

    /// Run both detectors on a decoded frame and fuse their hits.
    ///
    /// Holds the camera's window lock for the whole frame so frames of one camera are
    /// processed strictly in order; other cameras are unaffected.
    pub fn process_frame(
        &self,
        camera_id: &str,
        frame: Frame,
        mode: DetectionMode,
    ) -> DetectionResult {
        let handle = self.windows.camera(camera_id);
        let mut window = self.windows.lock(&handle);

        window.push(frame.clone());
        let sampling_turn = self.throttle.tick();

        let objects = self.detector.detect(&frame);
        let mut detections =
            inference::geometric_hits(&objects.entities, self.settings.contact_threshold);

        if mode == DetectionMode::Combined && self.recognizer.is_available() && sampling_turn {
            let prediction = match window.snapshot(self.recognizer.context_frames()) {
                Some(context) => self.recognizer.classify(&context),
                None => ActionPrediction::no_opinion(),
            };
            log::debug!(
                "camera {} action {} ({:.2})",
                camera_id,
                prediction.label,
                prediction.confidence
            );
            let hit = inference::temporal_hit(
                &prediction,
                &objects.entities,
                self.settings.action_threshold,
            );
            if let Some(hit) = hit {
                detections.push(hit);
            }
        }
        drop(window);

        DetectionResult {
            camera_id: camera_id.to_string(),
            annotated: objects.annotated,
            detections,
        }
    }

    /// `process_frame` with panics inside a backend turned into `FrameError::Fault`.
    ///
    /// The camera stays usable afterwards; its window keeps the frame that faulted.
    pub fn try_process_frame(
        &self,
        camera_id: &str,
        frame: Frame,
        mode: DetectionMode,
    ) -> Result<DetectionResult, FrameError> {
        panic::catch_unwind(AssertUnwindSafe(|| self.process_frame(camera_id, frame, mode)))
            .map_err(|payload| FrameError::Fault(panic_message(payload.as_ref())))
    }

    /// Decode, process and encode one submission.
    ///
    /// A decode failure leaves the camera's window untouched. Faults after decoding,
    /// including panics inside a backend, become an error outcome.
    pub fn submit(&self, submission: &FrameSubmission) -> FrameOutcome {
        match self.try_submit(submission) {
            Ok(outcome) => outcome,
            Err(err) => {
                log::warn!("camera {}: {}", submission.camera_id, err);
                FrameOutcome::error(&err)
            }
        }
    }

    fn try_submit(&self, submission: &FrameSubmission) -> Result<FrameOutcome, FrameError> {
        let payload = submission
            .frame
            .as_deref()
            .filter(|payload| !payload.trim().is_empty())
            .ok_or(FrameError::MissingFrame)?;
        let frame = codec::decode_payload(payload)
            .and_then(|bytes| codec::decode_frame(&bytes))
            .map_err(|err| FrameError::Malformed(format!("{:#}", err)))?;

        let result = self.try_process_frame(&submission.camera_id, frame, submission.mode)?;

        let encoded = codec::encode_data_url(&result.annotated, self.settings.jpeg_quality)
            .map_err(|err| FrameError::Fault(format!("{:#}", err)))?;

        log::debug!(
            "camera {}: {} detection(s)",
            result.camera_id,
            result.detections.len()
        );
        Ok(FrameOutcome::DetectionResult {
            camera_id: result.camera_id,
            frame: encoded,
            detections: result.detections,
        })
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("frame processing panicked: {}", message)
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("frame processing panicked: {}", message)
    } else {
        "frame processing panicked".to_string()
    }
}

//! Bout scorer
//!
//! Real-time hit scoring for stick-fighting bouts. Each camera's frames flow through two
//! independent detectors and the results are fused into one feed of scored hit events.
//!
//! # Pipeline
//!
//! For every submitted frame:
//!
//! 1. The frame is decoded and pushed into its camera's bounded window.
//! 2. The object detector finds players and sticks by side.
//! 3. Geometric inference turns stick/player overlaps into hits.
//! 4. On every Nth frame (combined mode only) the action recognizer classifies the
//!    camera's recent window and may add one temporal hit.
//! 5. Both lists are concatenated, geometric first, and returned with the annotated frame.
//!
//! # Module Structure
//!
//! - `geometry`: box overlap and hit-location classification
//! - `frame`: decoded frames, per-camera windows and the camera registry
//! - `detect`: object detection capability and its adapter
//! - `action`: action recognition capability and its adapter
//! - `inference`: geometric and temporal hit inference
//! - `pipeline`: per-frame fusion and error scoping
//! - `codec`: frame decode/encode for the transport
//! - `api`: HTTP transport
//! - `config`: daemon configuration

use serde::{Deserialize, Serialize};

pub mod action;
pub mod api;
pub mod codec;
pub mod config;
pub mod detect;
pub mod frame;
pub mod geometry;
pub mod inference;
pub mod pipeline;

pub use action::{ActionLabel, ActionPrediction, ActionRecognizer, NullActionRecognizer};
pub use codec::{decode_frame, encode_frame};
pub use detect::{Entity, EntityKind, NullObjectDetector, ObjectDetections, ObjectDetector};
pub use frame::{CameraWindows, Frame, FrameWindow, DEFAULT_WINDOW_CAPACITY};
pub use geometry::{classify_location, overlap_ratio, BoundingBox};
pub use pipeline::{
    CapabilityStatus, DetectionResult, FrameError, FrameOutcome, FrameSubmission, Pipeline,
    PipelineSettings,
};

// -------------------- Sides --------------------

/// Corner a player or stick belongs to. `Unknown` only appears as a scorer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Red,
    Blue,
    Unknown,
}

// -------------------- Body Parts --------------------

/// Target zones a hit can be attributed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BodyPart {
    Head,
    #[serde(rename = "Chest & Abdomen")]
    ChestAbdomen,
    Body,
    Legs,
    Invalid,
}

impl BodyPart {
    pub fn label(self) -> &'static str {
        match self {
            BodyPart::Head => "Head",
            BodyPart::ChestAbdomen => "Chest & Abdomen",
            BodyPart::Body => "Body",
            BodyPart::Legs => "Legs",
            BodyPart::Invalid => "Invalid",
        }
    }
}

impl std::fmt::Display for BodyPart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Scoring zones recognized by the rulebook. Location classification only produces the
/// first four, so geometric hits are always valid.
pub const VALID_PARTS: &[&str] = &[
    "Head",
    "Body",
    "Legs",
    "Chest & Abdomen",
    "Side of the Body",
    "Upper Extremities",
    "Lower Extremities",
];

pub fn is_valid_part(part: BodyPart) -> bool {
    VALID_PARTS.contains(&part.label())
}

// -------------------- Hit Events --------------------

/// Which inference path produced a hit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMethod {
    Geometric,
    Temporal,
}

/// One scored hit. Produced per frame and emitted immediately; never retained.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HitEvent {
    pub scored_by: Side,
    pub body_part: BodyPart,
    pub valid: bool,
    /// Percentage, 0..=100.
    pub confidence: f32,
    pub method: DetectionMethod,
}

// -------------------- Modes --------------------

/// Which detectors a submission asks for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMode {
    #[serde(alias = "yolo_only")]
    GeometricOnly,
    #[default]
    #[serde(alias = "yolo_cnn")]
    Combined,
}

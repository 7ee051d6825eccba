use crate::frame::Frame;
use crate::geometry::BoundingBox;
use crate::Side;

/// What a detected object is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Player,
    Stick,
}

/// One detected object in one frame. Lives only for that frame's processing.
#[derive(Clone, Debug, PartialEq)]
pub struct Entity {
    /// Pixel-space box in the frame the detector saw.
    pub bbox: BoundingBox,
    pub kind: EntityKind,
    pub side: Side,
    /// Detector confidence, 0..=1.
    pub confidence: f32,
}

impl Entity {
    pub fn new(bbox: BoundingBox, kind: EntityKind, side: Side, confidence: f32) -> Self {
        Self {
            bbox,
            kind,
            side,
            confidence,
        }
    }

    pub fn is(&self, kind: EntityKind, side: Side) -> bool {
        self.kind == kind && self.side == side
    }
}

/// Map a detector class name such as `"Red_Stick"` or `"blue player"` to an entity type.
///
/// Names that do not mention both a side and a kind are ignored.
pub fn classify_label(name: &str) -> Option<(EntityKind, Side)> {
    let name = name.to_lowercase();
    let side = if name.contains("blue") {
        Side::Blue
    } else if name.contains("red") {
        Side::Red
    } else {
        return None;
    };
    let kind = if name.contains("player") {
        EntityKind::Player
    } else if name.contains("stick") {
        EntityKind::Stick
    } else {
        return None;
    };
    Some((kind, side))
}

/// Output of the object detection adapter for one frame.
#[derive(Clone, Debug)]
pub struct ObjectDetections {
    /// Frame with entity boxes drawn on it, or the input frame when nothing was drawn.
    pub annotated: Frame,
    pub entities: Vec<Entity>,
}

impl ObjectDetections {
    /// No entities; the input frame passes through untouched.
    pub fn empty(frame: &Frame) -> Self {
        Self {
            annotated: frame.clone(),
            entities: Vec::new(),
        }
    }

    pub fn count(&self, kind: EntityKind, side: Side) -> usize {
        self.entities.iter().filter(|e| e.is(kind, side)).count()
    }
}

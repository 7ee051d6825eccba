//! Box geometry used by hit inference.
//!
//! Boxes are axis-aligned and expressed in frame pixel space.

use serde::{Deserialize, Serialize};

use crate::BodyPart;

/// Axis-aligned box `(xmin, ymin, xmax, ymax)`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub xmin: f32,
    pub ymin: f32,
    pub xmax: f32,
    pub ymax: f32,
}

impl BoundingBox {
    /// Build a box from two corners. Coordinates are reordered so the box never has
    /// negative extent.
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self {
            xmin: x1.min(x2),
            ymin: y1.min(y2),
            xmax: x1.max(x2),
            ymax: y1.max(y2),
        }
    }

    /// Build a box from a center point and size (YOLO-style output).
    pub fn from_center(cx: f32, cy: f32, w: f32, h: f32) -> Self {
        Self::new(cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0)
    }

    pub fn width(&self) -> f32 {
        self.xmax - self.xmin
    }

    pub fn height(&self) -> f32 {
        self.ymax - self.ymin
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    pub fn center_y(&self) -> f32 {
        (self.ymin + self.ymax) / 2.0
    }
}

/// Intersection over union of two boxes.
///
/// Returns exactly 0.0 when the boxes are separated on either axis and when the union
/// has zero area.
pub fn overlap_ratio(a: &BoundingBox, b: &BoundingBox) -> f32 {
    let inter_xmin = a.xmin.max(b.xmin);
    let inter_ymin = a.ymin.max(b.ymin);
    let inter_xmax = a.xmax.min(b.xmax);
    let inter_ymax = a.ymax.min(b.ymax);
    if inter_xmax < inter_xmin || inter_ymax < inter_ymin {
        return 0.0;
    }

    let inter = (inter_xmax - inter_xmin) * (inter_ymax - inter_ymin);
    let union = a.area() + b.area() - inter;
    if union > 0.0 {
        inter / union
    } else {
        0.0
    }
}

/// Where on `subject` the `actor` landed, by the actor's vertical center.
///
/// Bands are closed below and open above: a ratio of exactly 0.2 is chest, not head.
pub fn classify_location(subject: &BoundingBox, actor: &BoundingBox) -> BodyPart {
    let subject_height = subject.height().max(1.0);
    let relative_y = (actor.center_y() - subject.ymin) / subject_height;
    if relative_y < 0.2 {
        BodyPart::Head
    } else if relative_y < 0.5 {
        BodyPart::ChestAbdomen
    } else if relative_y < 0.8 {
        BodyPart::Body
    } else {
        BodyPart::Legs
    }
}

//! Hit inference from the two detector signals.
//!
//! - Geometric: a stick box overlapping an opposing player's box is a hit.
//! - Temporal: a strike classified over the recent window is a hit, attributed to
//!   whichever side has more sticks in view.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::action::ActionPrediction;
use crate::detect::{Entity, EntityKind};
use crate::geometry::{classify_location, overlap_ratio};
use crate::{is_valid_part, DetectionMethod, HitEvent, Side};

/// Minimum stick/player IoU (exclusive) for a geometric hit.
pub const DEFAULT_CONTACT_THRESHOLD: f32 = 0.05;

/// Minimum action confidence (exclusive) for a temporal hit.
pub const DEFAULT_ACTION_THRESHOLD: f32 = 0.3;

/// Temporal inference runs on every Nth processed frame.
pub const DEFAULT_THROTTLE_EVERY: u64 = 5;

// -------------------- Geometric --------------------

/// Entities of one frame split by side and kind.
#[derive(Debug, Default)]
struct Partition<'a> {
    red_players: Vec<&'a Entity>,
    red_sticks: Vec<&'a Entity>,
    blue_players: Vec<&'a Entity>,
    blue_sticks: Vec<&'a Entity>,
}

impl<'a> Partition<'a> {
    fn new(entities: &'a [Entity]) -> Self {
        let mut partition = Self::default();
        for entity in entities {
            match (entity.side, entity.kind) {
                (Side::Red, EntityKind::Player) => partition.red_players.push(entity),
                (Side::Red, EntityKind::Stick) => partition.red_sticks.push(entity),
                (Side::Blue, EntityKind::Player) => partition.blue_players.push(entity),
                (Side::Blue, EntityKind::Stick) => partition.blue_sticks.push(entity),
                (Side::Unknown, _) => {}
            }
        }
        partition
    }
}

/// Every stick overlapping an opposing player above `contact_threshold` yields one hit.
///
/// Red-scored hits come first, then blue. Multiple qualifying pairs are all reported;
/// debouncing is left to consumers.
pub fn geometric_hits(entities: &[Entity], contact_threshold: f32) -> Vec<HitEvent> {
    let partition = Partition::new(entities);
    let mut hits = Vec::new();
    contact_pass(
        Side::Red,
        &partition.red_sticks,
        &partition.blue_players,
        contact_threshold,
        &mut hits,
    );
    contact_pass(
        Side::Blue,
        &partition.blue_sticks,
        &partition.red_players,
        contact_threshold,
        &mut hits,
    );
    hits
}

fn contact_pass(
    scorer: Side,
    sticks: &[&Entity],
    opponents: &[&Entity],
    contact_threshold: f32,
    hits: &mut Vec<HitEvent>,
) {
    for stick in sticks {
        for player in opponents {
            if overlap_ratio(&stick.bbox, &player.bbox) > contact_threshold {
                let body_part = classify_location(&player.bbox, &stick.bbox);
                hits.push(HitEvent {
                    scored_by: scorer,
                    body_part,
                    valid: is_valid_part(body_part),
                    confidence: stick.confidence * 100.0,
                    method: DetectionMethod::Geometric,
                });
            }
        }
    }
}

// -------------------- Temporal --------------------

/// Side with more visible sticks; ties (including none) are `Unknown`.
pub fn attribute_side(entities: &[Entity]) -> Side {
    let red = entities
        .iter()
        .filter(|e| e.is(EntityKind::Stick, Side::Red))
        .count();
    let blue = entities
        .iter()
        .filter(|e| e.is(EntityKind::Stick, Side::Blue))
        .count();
    match red.cmp(&blue) {
        std::cmp::Ordering::Greater => Side::Red,
        std::cmp::Ordering::Less => Side::Blue,
        std::cmp::Ordering::Equal => Side::Unknown,
    }
}

/// Turn an action prediction into at most one hit.
///
/// `entities` are the same frame's object detections, used only for side attribution.
pub fn temporal_hit(
    prediction: &ActionPrediction,
    entities: &[Entity],
    action_threshold: f32,
) -> Option<HitEvent> {
    if prediction.is_no_opinion() || !(prediction.confidence > action_threshold) {
        return None;
    }
    Some(HitEvent {
        scored_by: attribute_side(entities),
        body_part: prediction.label.body_part(),
        valid: prediction.label.is_valid_strike(),
        confidence: prediction.confidence * 100.0,
        method: DetectionMethod::Temporal,
    })
}

// -------------------- Throttle --------------------

/// Process-wide 1-in-N gate for temporal inference.
///
/// One counter is shared by all cameras, so a busy camera can take a quiet camera's
/// turn.
#[derive(Debug)]
pub struct Throttle {
    ticks: AtomicU64,
    every: u64,
}

impl Throttle {
    pub fn new(every: u64) -> Self {
        Self {
            ticks: AtomicU64::new(0),
            every: every.max(1),
        }
    }

    /// Count one processed frame and report whether it lands on a sampling turn.
    pub fn tick(&self) -> bool {
        let tick = self.ticks.fetch_add(1, Ordering::SeqCst) + 1;
        tick % self.every == 0
    }

    /// Frames counted so far.
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::SeqCst)
    }
}

impl Default for Throttle {
    fn default() -> Self {
        Self::new(DEFAULT_THROTTLE_EVERY)
    }
}

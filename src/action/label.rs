use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::BodyPart;

/// Closed vocabulary of the action recognizer, in model output order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionLabel {
    NoAction,
    HeadStrike,
    BodyStrike,
    LegStrike,
    InvalidStrike,
}

impl ActionLabel {
    pub const ALL: [ActionLabel; 5] = [
        ActionLabel::NoAction,
        ActionLabel::HeadStrike,
        ActionLabel::BodyStrike,
        ActionLabel::LegStrike,
        ActionLabel::InvalidStrike,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ActionLabel::NoAction => "no_action",
            ActionLabel::HeadStrike => "head_strike",
            ActionLabel::BodyStrike => "body_strike",
            ActionLabel::LegStrike => "leg_strike",
            ActionLabel::InvalidStrike => "invalid_strike",
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Body part named by the label.
    pub fn body_part(self) -> BodyPart {
        let label = self.as_str();
        if label.contains("head") {
            BodyPart::Head
        } else if label.contains("body") {
            BodyPart::Body
        } else if label.contains("leg") {
            BodyPart::Legs
        } else {
            BodyPart::Invalid
        }
    }

    /// Whether the strike counts under the rules.
    pub fn is_valid_strike(self) -> bool {
        !self.as_str().contains("invalid")
    }
}

impl std::fmt::Display for ActionLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Action label with the model's confidence in it, 0..=1.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ActionPrediction {
    pub label: ActionLabel,
    pub confidence: f32,
}

impl ActionPrediction {
    /// The "no opinion" sentinel.
    pub fn no_opinion() -> Self {
        Self {
            label: ActionLabel::NoAction,
            confidence: 0.0,
        }
    }

    /// Pick the highest-scoring label from one probability per vocabulary entry.
    ///
    /// Scores must already be probabilities in 0..=1; raw logits are rejected.
    pub fn from_scores(scores: &[f32]) -> Result<Self> {
        if scores.len() != ActionLabel::ALL.len() {
            return Err(anyhow!(
                "expected {} action scores, received {}",
                ActionLabel::ALL.len(),
                scores.len()
            ));
        }
        let (index, confidence) = scores
            .iter()
            .copied()
            .enumerate()
            .fold((0usize, f32::NEG_INFINITY), |best, (i, score)| {
                if score > best.1 {
                    (i, score)
                } else {
                    best
                }
            });
        if let Some(score) = scores.iter().find(|s| !(0.0..=1.0).contains(*s)) {
            return Err(anyhow!("action score {} is not a probability", score));
        }
        let label = ActionLabel::from_index(index)
            .ok_or_else(|| anyhow!("action index {} out of range", index))?;
        Ok(Self { label, confidence })
    }

    pub fn is_no_opinion(&self) -> bool {
        self.label == ActionLabel::NoAction
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_map_to_body_parts() {
        assert_eq!(ActionLabel::HeadStrike.body_part(), BodyPart::Head);
        assert_eq!(ActionLabel::BodyStrike.body_part(), BodyPart::Body);
        assert_eq!(ActionLabel::LegStrike.body_part(), BodyPart::Legs);
        assert_eq!(ActionLabel::InvalidStrike.body_part(), BodyPart::Invalid);
    }

    #[test]
    fn only_invalid_strike_is_invalid() {
        assert!(ActionLabel::HeadStrike.is_valid_strike());
        assert!(ActionLabel::LegStrike.is_valid_strike());
        assert!(!ActionLabel::InvalidStrike.is_valid_strike());
    }

    #[test]
    fn argmax_picks_first_highest_score() {
        let p = ActionPrediction::from_scores(&[0.1, 0.6, 0.1, 0.1, 0.1]).unwrap();
        assert_eq!(p.label, ActionLabel::HeadStrike);
        assert!((p.confidence - 0.6).abs() < 1e-6);

        let tie = ActionPrediction::from_scores(&[0.0, 0.5, 0.5, 0.0, 0.0]).unwrap();
        assert_eq!(tie.label, ActionLabel::HeadStrike);
    }

    #[test]
    fn wrong_score_count_is_rejected() {
        assert!(ActionPrediction::from_scores(&[0.5, 0.5]).is_err());
        assert!(ActionPrediction::from_scores(&[f32::NAN; 5]).is_err());
    }

    #[test]
    fn logits_are_rejected() {
        assert!(ActionPrediction::from_scores(&[-1.2, 4.7, 0.3, 0.1, -0.5]).is_err());
        assert!(ActionPrediction::from_scores(&[0.0, 1.0, 0.0, 0.0, 0.0]).is_ok());
    }
}

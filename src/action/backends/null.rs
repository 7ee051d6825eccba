use anyhow::Result;

use crate::action::backend::ActionRecognizer;
use crate::action::clip::Clip;
use crate::action::label::ActionPrediction;

/// Stand-in used when no action model could be loaded. Always has no opinion.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullActionRecognizer;

impl ActionRecognizer for NullActionRecognizer {
    fn name(&self) -> &'static str {
        "null"
    }

    fn is_available(&self) -> bool {
        false
    }

    fn classify(&self, _clip: &Clip) -> Result<ActionPrediction> {
        Ok(ActionPrediction::no_opinion())
    }
}

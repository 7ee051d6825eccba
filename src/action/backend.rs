use anyhow::Result;

use crate::action::clip::Clip;
use crate::action::label::ActionPrediction;

/// Temporal action classifier capability.
///
/// `classify` receives a preprocessed clip of exactly the configured context length and
/// runs one blocking inference call. A returned error is treated as "no opinion" for that
/// call only.
pub trait ActionRecognizer: Send + Sync {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// False only for the no-op capability used when no model could be loaded.
    fn is_available(&self) -> bool {
        true
    }

    fn classify(&self, clip: &Clip) -> Result<ActionPrediction>;
}

//! Action recognition capability.
//!
//! `ActionRecognitionAdapter` owns preprocessing and folds every failure mode into the
//! `(no_action, 0.0)` sentinel, so callers see a single outcome shape.

mod backend;
mod backends;
mod clip;
mod label;

use std::sync::Arc;

pub use backend::ActionRecognizer;
pub use backends::NullActionRecognizer;
#[cfg(feature = "backend-tract")]
pub use backends::TractActionRecognizer;
pub use clip::Clip;
pub use label::{ActionLabel, ActionPrediction};

use crate::config::RecognizerSettings;
use crate::frame::Frame;

/// Frames of context the recognizer needs by default.
pub const DEFAULT_CONTEXT_FRAMES: usize = 20;

/// Side length frames are resized to before classification.
pub const DEFAULT_INPUT_SIZE: u32 = 224;

/// Uniform front for an action recognizer capability.
#[derive(Clone)]
pub struct ActionRecognitionAdapter {
    recognizer: Arc<dyn ActionRecognizer>,
    context_frames: usize,
    input_size: u32,
}

impl ActionRecognitionAdapter {
    pub fn new(
        recognizer: Arc<dyn ActionRecognizer>,
        context_frames: usize,
        input_size: u32,
    ) -> Self {
        Self {
            recognizer,
            context_frames: context_frames.max(1),
            input_size,
        }
    }

    pub fn is_available(&self) -> bool {
        self.recognizer.is_available()
    }

    pub fn name(&self) -> &'static str {
        self.recognizer.name()
    }

    pub fn context_frames(&self) -> usize {
        self.context_frames
    }

    /// Classify the most recent `context_frames` of `frames` (oldest first).
    ///
    /// Too few frames, a missing model, or a failed call all return the sentinel; the
    /// backend is only invoked with a full context.
    pub fn classify(&self, frames: &[Frame]) -> ActionPrediction {
        if !self.recognizer.is_available() || frames.len() < self.context_frames {
            return ActionPrediction::no_opinion();
        }
        let context = &frames[frames.len() - self.context_frames..];
        let clip = Clip::from_frames(context, self.input_size);
        match self.recognizer.classify(&clip) {
            Ok(prediction) => prediction,
            Err(err) => {
                log::warn!(
                    "action recognition failed on {} backend: {:#}",
                    self.recognizer.name(),
                    err
                );
                ActionPrediction::no_opinion()
            }
        }
    }
}

/// Pick the action recognizer for this process. Called once at startup.
///
/// Any load failure degrades to `NullActionRecognizer` for the process lifetime.
pub fn select_action_recognizer(
    settings: &RecognizerSettings,
) -> Arc<dyn ActionRecognizer> {
    let Some(path) = settings.model_path.as_ref() else {
        log::warn!("no action recognition model configured; running geometric-only");
        return Arc::new(NullActionRecognizer);
    };

    #[cfg(feature = "backend-tract")]
    {
        match TractActionRecognizer::new(path, settings.context_frames, settings.input_size) {
            Ok(recognizer) => {
                log::info!(
                    "action recognizer loaded from {} ({} frames at {}px)",
                    path.display(),
                    settings.context_frames,
                    settings.input_size
                );
                Arc::new(recognizer)
            }
            Err(err) => {
                log::error!("failed to load action recognizer: {:#}", err);
                log::warn!("continuing with geometric-only detection");
                Arc::new(NullActionRecognizer)
            }
        }
    }
    #[cfg(not(feature = "backend-tract"))]
    {
        log::warn!(
            "action recognition model {} ignored: built without the backend-tract feature",
            path.display()
        );
        Arc::new(NullActionRecognizer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Recording {
        calls: AtomicUsize,
        last_frames: AtomicUsize,
    }

    impl ActionRecognizer for Recording {
        fn name(&self) -> &'static str {
            "recording"
        }

        fn classify(&self, clip: &Clip) -> anyhow::Result<ActionPrediction> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.last_frames.store(clip.frames, Ordering::SeqCst);
            Ok(ActionPrediction {
                label: ActionLabel::LegStrike,
                confidence: 0.7,
            })
        }
    }

    struct Broken;

    impl ActionRecognizer for Broken {
        fn name(&self) -> &'static str {
            "broken"
        }

        fn classify(&self, _clip: &Clip) -> anyhow::Result<ActionPrediction> {
            Err(anyhow!("tensor shape mismatch"))
        }
    }

    fn frames(n: usize) -> Vec<Frame> {
        (0..n).map(|_| Frame::filled(4, 4, [9, 9, 9])).collect()
    }

    #[test]
    fn short_context_is_no_opinion_without_calling_backend() {
        let backend = Arc::new(Recording::default());
        let adapter = ActionRecognitionAdapter::new(backend.clone(), 3, 2);
        assert_eq!(adapter.classify(&frames(2)), ActionPrediction::no_opinion());
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn only_the_latest_context_is_classified() {
        let backend = Arc::new(Recording::default());
        let adapter = ActionRecognitionAdapter::new(backend.clone(), 3, 2);
        let prediction = adapter.classify(&frames(5));
        assert_eq!(prediction.label, ActionLabel::LegStrike);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
        assert_eq!(backend.last_frames.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn failing_backend_is_no_opinion() {
        let adapter = ActionRecognitionAdapter::new(Arc::new(Broken), 1, 2);
        assert_eq!(adapter.classify(&frames(1)), ActionPrediction::no_opinion());
    }

    #[test]
    fn null_recognizer_is_unavailable() {
        let adapter = ActionRecognitionAdapter::new(Arc::new(NullActionRecognizer), 1, 2);
        assert!(!adapter.is_available());
        assert!(adapter.classify(&frames(1)).is_no_opinion());
    }
}

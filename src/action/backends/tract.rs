#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tract_onnx::prelude::*;

use crate::action::backend::ActionRecognizer;
use crate::action::clip::Clip;
use crate::action::label::ActionPrediction;

/// Tract-based ONNX action recognizer.
///
/// Expects a channels-last clip input `[1, frames, size, size, 3]` and a single
/// `[1, 5]` score output in `ActionLabel` order.
pub struct TractActionRecognizer {
    model: TypedRunnableModel<TypedModel>,
    frames: usize,
    size: u32,
}

impl TractActionRecognizer {
    /// Load an ONNX model from disk and prepare it for inference.
    pub fn new<P: AsRef<Path>>(model_path: P, frames: usize, size: u32) -> Result<Self> {
        let model_path = model_path.as_ref();
        let side = size as usize;
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(f32::datum_type(), tvec!(1, frames, side, side, 3)),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        Ok(Self {
            model,
            frames,
            size,
        })
    }

    fn build_input(&self, clip: &Clip) -> Result<Tensor> {
        if clip.frames != self.frames || clip.size != self.size {
            return Err(anyhow!(
                "clip {}x{}px does not match model input {}x{}px",
                clip.frames,
                clip.size,
                self.frames,
                self.size
            ));
        }
        let [frames, height, width, channels] = clip.shape();
        let input = tract_ndarray::Array5::from_shape_vec(
            (1, frames, height, width, channels),
            clip.data.clone(),
        )
        .context("clip buffer does not match its shape")?;
        Ok(input.into_tensor())
    }
}

impl ActionRecognizer for TractActionRecognizer {
    fn name(&self) -> &'static str {
        "tract-clip"
    }

    fn classify(&self, clip: &Clip) -> Result<ActionPrediction> {
        let input = self.build_input(clip)?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let scores = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?;
        let scores: Vec<f32> = scores.iter().copied().collect();
        ActionPrediction::from_scores(&scores)
    }
}

#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use image::imageops::{self, FilterType};
use tract_onnx::prelude::*;

use crate::detect::backend::ObjectDetector;
use crate::detect::result::{classify_label, Entity};
use crate::frame::Frame;
use crate::geometry::{overlap_ratio, BoundingBox};

/// Boxes of the same class overlapping more than this are treated as duplicates.
const NMS_IOU_THRESHOLD: f32 = 0.7;

/// Tract-based ONNX object detector.
///
/// Expects a YOLO-style export: input `[1, 3, H, W]` RGB scaled to 0..1, output
/// `[1, 4 + classes, anchors]` with center/size boxes in input pixels followed by one
/// score row per class.
pub struct TractObjectDetector {
    model: TypedRunnableModel<TypedModel>,
    input_size: u32,
    class_names: Vec<String>,
    confidence_threshold: f32,
}

impl TractObjectDetector {
    /// Load an ONNX model from disk and prepare it for inference.
    pub fn new<P: AsRef<Path>>(
        model_path: P,
        input_size: u32,
        class_names: Vec<String>,
    ) -> Result<Self> {
        let model_path = model_path.as_ref();
        if class_names.is_empty() {
            return Err(anyhow!("object detector needs at least one class name"));
        }
        let side = input_size as usize;
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(f32::datum_type(), tvec!(1, 3, side, side)),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        Ok(Self {
            model,
            input_size,
            class_names,
            confidence_threshold: 0.35,
        })
    }

    /// Override the default confidence threshold.
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    fn build_input(&self, frame: &Frame) -> Tensor {
        let side = self.input_size;
        let resized = imageops::resize(frame.image(), side, side, FilterType::Triangle);
        let side = side as usize;
        tract_ndarray::Array4::from_shape_fn((1, 3, side, side), |(_, channel, y, x)| {
            resized.get_pixel(x as u32, y as u32).0[channel] as f32 / 255.0
        })
        .into_tensor()
    }

    fn decode_output(&self, outputs: TVec<TValue>, frame: &Frame) -> Result<Vec<Entity>> {
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let view = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?;
        let shape = view.shape().to_vec();
        if shape.len() != 3 || shape[0] != 1 || shape[1] < 5 {
            return Err(anyhow!("unexpected detector output shape {:?}", shape));
        }
        let classes = (shape[1] - 4).min(self.class_names.len());
        let anchors = shape[2];
        let scale_x = frame.width() as f32 / self.input_size as f32;
        let scale_y = frame.height() as f32 / self.input_size as f32;

        let mut candidates: Vec<(usize, Entity)> = Vec::new();
        for anchor in 0..anchors {
            let mut best_class = 0usize;
            let mut best_score = f32::NEG_INFINITY;
            for class in 0..classes {
                let score = view[[0, 4 + class, anchor]];
                if score > best_score {
                    best_score = score;
                    best_class = class;
                }
            }
            if !(best_score >= self.confidence_threshold) {
                continue;
            }
            let Some((kind, side)) = classify_label(&self.class_names[best_class]) else {
                continue;
            };
            let bbox = BoundingBox::from_center(
                view[[0, 0, anchor]] * scale_x,
                view[[0, 1, anchor]] * scale_y,
                view[[0, 2, anchor]] * scale_x,
                view[[0, 3, anchor]] * scale_y,
            );
            candidates.push((best_class, Entity::new(bbox, kind, side, best_score)));
        }

        Ok(suppress_duplicates(candidates))
    }
}

/// Greedy per-class non-maximum suppression, highest confidence first.
fn suppress_duplicates(mut candidates: Vec<(usize, Entity)>) -> Vec<Entity> {
    candidates.sort_by(|a, b| b.1.confidence.total_cmp(&a.1.confidence));
    let mut kept: Vec<(usize, Entity)> = Vec::new();
    for (class, entity) in candidates {
        let duplicate = kept.iter().any(|(kept_class, kept_entity)| {
            *kept_class == class
                && overlap_ratio(&kept_entity.bbox, &entity.bbox) > NMS_IOU_THRESHOLD
        });
        if !duplicate {
            kept.push((class, entity));
        }
    }
    kept.into_iter().map(|(_, entity)| entity).collect()
}

impl ObjectDetector for TractObjectDetector {
    fn name(&self) -> &'static str {
        "tract-yolo"
    }

    fn detect(&self, frame: &Frame) -> Result<Vec<Entity>> {
        let input = self.build_input(frame);
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        self.decode_output(outputs, frame)
    }

    fn warm_up(&self) -> Result<()> {
        let blank = Frame::filled(self.input_size, self.input_size, [0, 0, 0]);
        self.detect(&blank).map(|_| ())
    }
}

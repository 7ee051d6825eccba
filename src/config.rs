use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::action::{DEFAULT_CONTEXT_FRAMES, DEFAULT_INPUT_SIZE};
use crate::pipeline::PipelineSettings;

const DEFAULT_API_ADDR: &str = "0.0.0.0:5000";
const DEFAULT_DETECTOR_INPUT_SIZE: u32 = 640;
const DEFAULT_DETECTOR_CONFIDENCE: f32 = 0.35;
const DEFAULT_DETECTOR_CLASSES: &[&str] =
    &["blue_player", "blue_stick", "red_player", "red_stick"];

#[derive(Debug, Deserialize, Default)]
struct ScorerConfigFile {
    api: Option<ApiConfigFile>,
    detector: Option<DetectorConfigFile>,
    recognizer: Option<RecognizerConfigFile>,
    scoring: Option<ScoringConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct ApiConfigFile {
    addr: Option<String>,
    jpeg_quality: Option<u8>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectorConfigFile {
    model_path: Option<PathBuf>,
    input_size: Option<u32>,
    confidence_threshold: Option<f32>,
    class_names: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Default)]
struct RecognizerConfigFile {
    model_path: Option<PathBuf>,
    input_size: Option<u32>,
    context_frames: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
struct ScoringConfigFile {
    window_capacity: Option<usize>,
    contact_threshold: Option<f32>,
    action_threshold: Option<f32>,
    throttle_every: Option<u64>,
}

/// Object detector model settings.
#[derive(Debug, Clone)]
pub struct DetectorSettings {
    pub model_path: Option<PathBuf>,
    pub input_size: u32,
    pub confidence_threshold: f32,
    /// Class names in model output order.
    pub class_names: Vec<String>,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            model_path: None,
            input_size: DEFAULT_DETECTOR_INPUT_SIZE,
            confidence_threshold: DEFAULT_DETECTOR_CONFIDENCE,
            class_names: DEFAULT_DETECTOR_CLASSES
                .iter()
                .map(|name| name.to_string())
                .collect(),
        }
    }
}

/// Action recognizer model settings.
#[derive(Debug, Clone)]
pub struct RecognizerSettings {
    pub model_path: Option<PathBuf>,
    pub input_size: u32,
    pub context_frames: usize,
}

impl Default for RecognizerSettings {
    fn default() -> Self {
        Self {
            model_path: None,
            input_size: DEFAULT_INPUT_SIZE,
            context_frames: DEFAULT_CONTEXT_FRAMES,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScorerConfig {
    pub api_addr: String,
    pub detector: DetectorSettings,
    pub recognizer: RecognizerSettings,
    pub pipeline: PipelineSettings,
}

impl ScorerConfig {
    /// Load from `SCORER_CONFIG` (JSON, or TOML for `.toml` paths), then apply
    /// environment overrides and validate.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("SCORER_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) if !path.trim().is_empty() => Some(read_config_file(Path::new(path))?),
            _ => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: ScorerConfigFile) -> Self {
        let api = file.api.unwrap_or_default();
        let detector_file = file.detector.unwrap_or_default();
        let recognizer_file = file.recognizer.unwrap_or_default();
        let scoring = file.scoring.unwrap_or_default();

        let detector_defaults = DetectorSettings::default();
        let detector = DetectorSettings {
            model_path: detector_file.model_path,
            input_size: detector_file
                .input_size
                .unwrap_or(detector_defaults.input_size),
            confidence_threshold: detector_file
                .confidence_threshold
                .unwrap_or(detector_defaults.confidence_threshold),
            class_names: detector_file
                .class_names
                .unwrap_or(detector_defaults.class_names),
        };

        let recognizer_defaults = RecognizerSettings::default();
        let recognizer = RecognizerSettings {
            model_path: recognizer_file.model_path,
            input_size: recognizer_file
                .input_size
                .unwrap_or(recognizer_defaults.input_size),
            context_frames: recognizer_file
                .context_frames
                .unwrap_or(recognizer_defaults.context_frames),
        };

        let pipeline_defaults = PipelineSettings::default();
        let pipeline = PipelineSettings {
            window_capacity: scoring
                .window_capacity
                .unwrap_or(pipeline_defaults.window_capacity),
            context_frames: recognizer.context_frames,
            action_input_size: recognizer.input_size,
            contact_threshold: scoring
                .contact_threshold
                .unwrap_or(pipeline_defaults.contact_threshold),
            action_threshold: scoring
                .action_threshold
                .unwrap_or(pipeline_defaults.action_threshold),
            throttle_every: scoring
                .throttle_every
                .unwrap_or(pipeline_defaults.throttle_every),
            jpeg_quality: api.jpeg_quality.unwrap_or(pipeline_defaults.jpeg_quality),
        };

        Self {
            api_addr: api.addr.unwrap_or_else(|| DEFAULT_API_ADDR.to_string()),
            detector,
            recognizer,
            pipeline,
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(addr) = std::env::var("SCORER_API_ADDR") {
            if !addr.trim().is_empty() {
                self.api_addr = addr;
            }
        }
        if let Ok(path) = std::env::var("SCORER_DETECTOR_MODEL") {
            if !path.trim().is_empty() {
                self.detector.model_path = Some(PathBuf::from(path));
            }
        }
        if let Ok(path) = std::env::var("SCORER_ACTION_MODEL") {
            if !path.trim().is_empty() {
                self.recognizer.model_path = Some(PathBuf::from(path));
            }
        }
        if let Ok(classes) = std::env::var("SCORER_DETECTOR_CLASSES") {
            let parsed = split_csv(&classes);
            if !parsed.is_empty() {
                self.detector.class_names = parsed;
            }
        }
        if let Ok(every) = std::env::var("SCORER_THROTTLE_EVERY") {
            self.pipeline.throttle_every = every
                .trim()
                .parse()
                .map_err(|_| anyhow!("SCORER_THROTTLE_EVERY must be a positive integer"))?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        let pipeline = &self.pipeline;
        if pipeline.window_capacity == 0 {
            return Err(anyhow!("window capacity must be greater than zero"));
        }
        if pipeline.context_frames == 0 || pipeline.context_frames > pipeline.window_capacity {
            return Err(anyhow!(
                "recognizer context of {} frames must be between 1 and the window capacity ({})",
                pipeline.context_frames,
                pipeline.window_capacity
            ));
        }
        if pipeline.throttle_every == 0 {
            return Err(anyhow!("throttle period must be greater than zero"));
        }
        for (name, value) in [
            ("contact threshold", pipeline.contact_threshold),
            ("action threshold", pipeline.action_threshold),
            ("detector confidence threshold", self.detector.confidence_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(anyhow!("{} must be within 0..=1, got {}", name, value));
            }
        }
        if self.detector.input_size == 0 || self.recognizer.input_size == 0 {
            return Err(anyhow!("model input sizes must be greater than zero"));
        }
        if self.detector.class_names.is_empty() {
            return Err(anyhow!("detector class names must not be empty"));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<ScorerConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let cfg = if is_toml {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}

fn split_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|entry| entry.trim())
        .filter(|entry| !entry.is_empty())
        .map(|entry| entry.to_string())
        .collect()
}

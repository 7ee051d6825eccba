//! replay - score a recorded bout from a directory of frame images
//!
//! Frames are read in file-name order, pushed through the pipeline as one camera, and
//! each result is printed as one JSON line. Annotated frames are not printed.

use anyhow::{anyhow, Context, Result};
use clap::{Parser, ValueEnum};
use serde::Serialize;
use std::fs;
use std::path::PathBuf;

use bout_scorer::{
    action::select_action_recognizer, config::ScorerConfig, decode_frame,
    detect::select_object_detector, DetectionMode, HitEvent, Pipeline,
};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Mode {
    GeometricOnly,
    Combined,
}

impl From<Mode> for DetectionMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::GeometricOnly => DetectionMode::GeometricOnly,
            Mode::Combined => DetectionMode::Combined,
        }
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Directory of frame images (jpeg/png).
    frames: PathBuf,
    /// Camera id the frames are attributed to.
    #[arg(long, default_value = "camera_1")]
    camera: String,
    /// Detectors to run.
    #[arg(long, value_enum, default_value_t = Mode::Combined)]
    mode: Mode,
    /// Only print frames that produced at least one hit.
    #[arg(long)]
    hits_only: bool,
}

#[derive(Serialize)]
struct ReplayLine<'a> {
    index: usize,
    file: &'a str,
    camera_id: &'a str,
    detections: &'a [HitEvent],
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();

    let cfg = ScorerConfig::load()?;
    let pipeline = Pipeline::new(
        select_object_detector(&cfg.detector),
        select_action_recognizer(&cfg.recognizer),
        cfg.pipeline.clone(),
    );

    let mut paths: Vec<PathBuf> = fs::read_dir(&args.frames)
        .with_context(|| format!("failed to read {}", args.frames.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| is_image(path))
        .collect();
    if paths.is_empty() {
        return Err(anyhow!("no frame images found in {}", args.frames.display()));
    }
    paths.sort();

    let mode = DetectionMode::from(args.mode);
    let mut total_hits = 0usize;
    for (index, path) in paths.iter().enumerate() {
        let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
        let frame = match decode_frame(&bytes) {
            Ok(frame) => frame,
            Err(err) => {
                log::warn!("skipping {}: {:#}", path.display(), err);
                continue;
            }
        };
        let result = match pipeline.try_process_frame(&args.camera, frame, mode) {
            Ok(result) => result,
            Err(err) => {
                log::warn!("skipping {}: {}", path.display(), err);
                continue;
            }
        };
        total_hits += result.detections.len();
        if args.hits_only && result.detections.is_empty() {
            continue;
        }
        let file = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default();
        let line = ReplayLine {
            index,
            file,
            camera_id: &result.camera_id,
            detections: &result.detections,
        };
        println!("{}", serde_json::to_string(&line)?);
    }

    log::info!(
        "replayed {} frames, {} hit(s) detected",
        pipeline.frames_processed(),
        total_hits
    );
    Ok(())
}

fn is_image(path: &std::path::Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            matches!(
                ext.to_ascii_lowercase().as_str(),
                "jpg" | "jpeg" | "png"
            )
        })
        .unwrap_or(false)
}

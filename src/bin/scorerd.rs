//! scorerd - live hit scoring daemon
//!
//! This daemon:
//! 1. Loads configuration (file + environment)
//! 2. Loads the object detector and action recognizer, degrading to no-op stand-ins
//! 3. Serves the scoring API until Ctrl-C

use anyhow::Result;
use std::sync::{mpsc, Arc};

use bout_scorer::{
    action::select_action_recognizer,
    api::{ApiConfig, ApiServer},
    config::ScorerConfig,
    detect::select_object_detector,
    Pipeline,
};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cfg = ScorerConfig::load()?;
    log::info!("scorerd {} starting", env!("CARGO_PKG_VERSION"));

    let detector = select_object_detector(&cfg.detector);
    let recognizer = select_action_recognizer(&cfg.recognizer);
    let pipeline = Arc::new(Pipeline::new(detector, recognizer, cfg.pipeline.clone()));

    let status = pipeline.capabilities();
    log::info!(
        "object detector: {}",
        if status.object_detector { "loaded" } else { "unavailable" }
    );
    log::info!(
        "action recognizer: {}",
        if status.action_recognizer { "loaded" } else { "unavailable" }
    );
    log::info!(
        "window {} frames, context {} frames, temporal check every {} frames",
        cfg.pipeline.window_capacity,
        cfg.pipeline.context_frames,
        cfg.pipeline.throttle_every
    );

    let api_handle = ApiServer::new(
        ApiConfig {
            addr: cfg.api_addr.clone(),
        },
        pipeline,
    )
    .spawn()?;
    log::info!("scoring api listening on {}", api_handle.addr);

    let (tx, rx) = mpsc::channel();
    ctrlc::set_handler(move || {
        let _ = tx.send(());
    })?;

    log::info!("scorerd waiting for shutdown signal (Ctrl-C)...");
    let _ = rx.recv();
    log::info!("shutdown signal received, stopping API server...");
    api_handle.stop()?;

    Ok(())
}

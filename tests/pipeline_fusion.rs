use anyhow::Result;
use base64::{engine::general_purpose::STANDARD, Engine};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bout_scorer::action::Clip;
use bout_scorer::{
    ActionLabel, ActionPrediction, ActionRecognizer, BodyPart, BoundingBox, DetectionMethod,
    DetectionMode, Entity, EntityKind, Frame, FrameError, FrameOutcome, FrameSubmission,
    NullActionRecognizer, ObjectDetector, Pipeline, PipelineSettings, Side,
};

struct ScriptedDetector {
    entities: Vec<Entity>,
}

impl ObjectDetector for ScriptedDetector {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn detect(&self, _frame: &Frame) -> Result<Vec<Entity>> {
        Ok(self.entities.clone())
    }
}

/// Panics on 13-pixel-wide frames, detects nothing otherwise.
struct TrippingDetector;

impl ObjectDetector for TrippingDetector {
    fn name(&self) -> &'static str {
        "tripping"
    }

    fn detect(&self, frame: &Frame) -> Result<Vec<Entity>> {
        if frame.width() == 13 {
            panic!("model exploded");
        }
        Ok(Vec::new())
    }
}

const BUSY_TAG: u8 = 1;
const STALLED_TAG: u8 = 2;

/// Dispatches on the first pixel of the frame. Busy frames linger briefly while in-flight
/// calls are counted; stalled frames block until released.
#[derive(Default)]
struct GatedDetector {
    busy_in_flight: AtomicUsize,
    busy_peak: AtomicUsize,
    stalled: AtomicBool,
    released: AtomicBool,
}

impl GatedDetector {
    fn wait_until_stalled(&self) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !self.stalled.load(Ordering::SeqCst) && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(1));
        }
    }
}

impl ObjectDetector for GatedDetector {
    fn name(&self) -> &'static str {
        "gated"
    }

    fn detect(&self, frame: &Frame) -> Result<Vec<Entity>> {
        match frame.pixels()[0] {
            BUSY_TAG => {
                let now = self.busy_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                self.busy_peak.fetch_max(now, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(5));
                self.busy_in_flight.fetch_sub(1, Ordering::SeqCst);
            }
            STALLED_TAG => {
                self.stalled.store(true, Ordering::SeqCst);
                let deadline = Instant::now() + Duration::from_secs(5);
                while !self.released.load(Ordering::SeqCst) && Instant::now() < deadline {
                    std::thread::sleep(Duration::from_millis(1));
                }
            }
            _ => {}
        }
        Ok(Vec::new())
    }
}

#[derive(Default)]
struct CountingRecognizer {
    calls: AtomicUsize,
}

impl ActionRecognizer for CountingRecognizer {
    fn name(&self) -> &'static str {
        "counting"
    }

    fn classify(&self, _clip: &Clip) -> Result<ActionPrediction> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(ActionPrediction {
            label: ActionLabel::HeadStrike,
            confidence: 0.9,
        })
    }
}

fn test_settings() -> PipelineSettings {
    PipelineSettings {
        context_frames: 1,
        action_input_size: 8,
        ..PipelineSettings::default()
    }
}

fn player(side: Side, xmin: f32) -> Entity {
    Entity::new(
        BoundingBox::new(xmin, 0.0, xmin + 100.0, 100.0),
        EntityKind::Player,
        side,
        0.9,
    )
}

fn stick(side: Side, bbox: BoundingBox, confidence: f32) -> Entity {
    Entity::new(bbox, EntityKind::Stick, side, confidence)
}

fn png_payload(frame: &Frame) -> Result<String> {
    let mut out = std::io::Cursor::new(Vec::new());
    frame.image().write_to(&mut out, image::ImageFormat::Png)?;
    Ok(format!(
        "data:image/png;base64,{}",
        STANDARD.encode(out.into_inner())
    ))
}

fn submission(camera_id: &str, frame: Option<String>) -> FrameSubmission {
    FrameSubmission {
        camera_id: camera_id.to_string(),
        frame,
        mode: DetectionMode::Combined,
    }
}

#[test]
fn temporal_check_runs_on_every_fifth_frame() {
    // Red stick across the blue player's head, blue stick across the red player's chest.
    let detector = ScriptedDetector {
        entities: vec![
            player(Side::Blue, 0.0),
            player(Side::Red, 200.0),
            stick(Side::Red, BoundingBox::new(0.0, 0.0, 100.0, 10.0), 0.8),
            stick(Side::Blue, BoundingBox::new(200.0, 30.0, 300.0, 40.0), 0.7),
        ],
    };
    let recognizer = Arc::new(CountingRecognizer::default());
    let pipeline = Pipeline::new(Arc::new(detector), recognizer.clone(), test_settings());
    let frame = Frame::filled(32, 24, [10, 10, 10]);

    for _ in 0..4 {
        let result = pipeline.process_frame("camera_1", frame.clone(), DetectionMode::Combined);
        assert_eq!(result.detections.len(), 2);
        assert!(result
            .detections
            .iter()
            .all(|hit| hit.method == DetectionMethod::Geometric));
    }
    assert_eq!(recognizer.calls.load(Ordering::SeqCst), 0);

    let result = pipeline.process_frame("camera_1", frame, DetectionMode::Combined);
    assert_eq!(recognizer.calls.load(Ordering::SeqCst), 1);
    assert_eq!(result.detections.len(), 3);

    let red = &result.detections[0];
    assert_eq!(red.scored_by, Side::Red);
    assert_eq!(red.body_part, BodyPart::Head);
    assert!((red.confidence - 80.0).abs() < 1e-3);

    let blue = &result.detections[1];
    assert_eq!(blue.scored_by, Side::Blue);
    assert_eq!(blue.body_part, BodyPart::ChestAbdomen);

    let temporal = &result.detections[2];
    assert_eq!(temporal.method, DetectionMethod::Temporal);
    assert_eq!(temporal.body_part, BodyPart::Head);
    assert_eq!(temporal.scored_by, Side::Unknown);
    assert!(temporal.valid);
    assert!((temporal.confidence - 90.0).abs() < 1e-3);
}

#[test]
fn geometric_only_mode_never_calls_the_recognizer() {
    let recognizer = Arc::new(CountingRecognizer::default());
    let pipeline = Pipeline::new(
        Arc::new(ScriptedDetector {
            entities: Vec::new(),
        }),
        recognizer.clone(),
        test_settings(),
    );
    let frame = Frame::filled(16, 16, [0, 0, 0]);
    for _ in 0..10 {
        let result =
            pipeline.process_frame("camera_1", frame.clone(), DetectionMode::GeometricOnly);
        assert!(result.detections.is_empty());
    }
    assert_eq!(recognizer.calls.load(Ordering::SeqCst), 0);
    assert_eq!(pipeline.frames_processed(), 10);
}

#[test]
fn contact_must_exceed_the_threshold() {
    let frame = Frame::filled(16, 16, [0, 0, 0]);

    // Stick covers a tenth of the player.
    let touching = Pipeline::new(
        Arc::new(ScriptedDetector {
            entities: vec![
                player(Side::Blue, 0.0),
                stick(Side::Red, BoundingBox::new(0.0, 0.0, 100.0, 10.0), 0.6),
            ],
        }),
        Arc::new(NullActionRecognizer),
        test_settings(),
    );
    let result = touching.process_frame("camera_1", frame.clone(), DetectionMode::Combined);
    assert_eq!(result.detections.len(), 1);
    assert_eq!(result.detections[0].scored_by, Side::Red);
    assert_eq!(result.detections[0].method, DetectionMethod::Geometric);

    // Exactly at the threshold is not a hit.
    let grazing = Pipeline::new(
        Arc::new(ScriptedDetector {
            entities: vec![
                player(Side::Blue, 0.0),
                stick(Side::Red, BoundingBox::new(0.0, 0.0, 50.0, 10.0), 0.6),
            ],
        }),
        Arc::new(NullActionRecognizer),
        test_settings(),
    );
    let result = grazing.process_frame("camera_1", frame, DetectionMode::Combined);
    assert!(result.detections.is_empty());
}

#[test]
fn undecodable_frame_leaves_no_state_behind() {
    let pipeline = Pipeline::new(
        Arc::new(ScriptedDetector {
            entities: Vec::new(),
        }),
        Arc::new(CountingRecognizer::default()),
        test_settings(),
    );
    let outcome = pipeline.submit(&submission(
        "camera_7",
        Some("data:image/png;base64,AAAA".to_string()),
    ));
    match outcome {
        FrameOutcome::Error { message } => assert!(message.starts_with("Failed to decode frame")),
        other => panic!("expected error, got {:?}", other),
    }
    assert_eq!(pipeline.windows().len("camera_7"), 0);
    assert!(pipeline.windows().cameras().is_empty());
    assert_eq!(pipeline.frames_processed(), 0);
}

#[test]
fn valid_submission_returns_annotated_jpeg() -> Result<()> {
    let pipeline = Pipeline::new(
        Arc::new(ScriptedDetector {
            entities: vec![player(Side::Red, 0.0)],
        }),
        Arc::new(NullActionRecognizer),
        test_settings(),
    );
    let payload = png_payload(&Frame::filled(120, 110, [200, 200, 200]))?;
    match pipeline.submit(&submission("camera_2", Some(payload))) {
        FrameOutcome::DetectionResult {
            camera_id,
            frame,
            detections,
        } => {
            assert_eq!(camera_id, "camera_2");
            assert!(frame.starts_with("data:image/jpeg;base64,"));
            assert!(detections.is_empty());
        }
        other => panic!("expected detection result, got {:?}", other),
    }
    assert_eq!(pipeline.windows().len("camera_2"), 1);
    Ok(())
}

#[test]
fn frame_fault_is_returned_not_raised() {
    let pipeline = Pipeline::new(
        Arc::new(TrippingDetector),
        Arc::new(NullActionRecognizer),
        test_settings(),
    );

    let frames = [
        Frame::filled(16, 8, [0, 0, 0]),
        Frame::filled(13, 8, [0, 0, 0]),
        Frame::filled(16, 8, [0, 0, 0]),
    ];
    let results: Vec<_> = frames
        .into_iter()
        .map(|frame| pipeline.try_process_frame("camera_1", frame, DetectionMode::Combined))
        .collect();

    assert!(results[0].is_ok());
    match &results[1] {
        Err(FrameError::Fault(message)) => assert!(message.contains("model exploded")),
        other => panic!("expected fault, got {:?}", other),
    }
    assert!(results[2].is_ok());
    assert_eq!(pipeline.frames_processed(), 3);
}

#[test]
fn backend_panic_is_scoped_to_its_frame() -> Result<()> {
    let pipeline = Pipeline::new(
        Arc::new(TrippingDetector),
        Arc::new(NullActionRecognizer),
        test_settings(),
    );

    let outcome = pipeline.submit(&submission(
        "camera_1",
        Some(png_payload(&Frame::filled(13, 8, [0, 0, 0]))?),
    ));
    match outcome {
        FrameOutcome::Error { message } => assert!(message.contains("model exploded")),
        other => panic!("expected error, got {:?}", other),
    }

    let outcome = pipeline.submit(&submission(
        "camera_1",
        Some(png_payload(&Frame::filled(16, 8, [0, 0, 0]))?),
    ));
    assert!(!outcome.is_error());
    assert_eq!(pipeline.windows().len("camera_1"), 2);
    Ok(())
}

#[test]
fn cameras_are_processed_in_parallel() {
    let pipeline = Pipeline::new(
        Arc::new(ScriptedDetector {
            entities: vec![
                player(Side::Blue, 0.0),
                stick(Side::Red, BoundingBox::new(0.0, 0.0, 100.0, 10.0), 0.6),
            ],
        }),
        Arc::new(CountingRecognizer::default()),
        test_settings(),
    );
    let frame = Frame::filled(16, 16, [5, 5, 5]);

    std::thread::scope(|scope| {
        for camera in ["camera_1", "camera_2", "camera_3", "camera_4"] {
            let pipeline = &pipeline;
            let frame = frame.clone();
            scope.spawn(move || {
                for _ in 0..40 {
                    let result =
                        pipeline.process_frame(camera, frame.clone(), DetectionMode::Combined);
                    assert_eq!(result.camera_id, camera);
                    assert_eq!(result.detections[0].method, DetectionMethod::Geometric);
                }
            });
        }
    });

    assert_eq!(pipeline.frames_processed(), 160);
    assert_eq!(
        pipeline.windows().cameras(),
        vec!["camera_1", "camera_2", "camera_3", "camera_4"]
    );
    for camera in pipeline.windows().cameras() {
        assert_eq!(pipeline.windows().len(&camera), 30);
    }
}

#[test]
fn frames_of_one_camera_never_overlap() {
    let detector = Arc::new(GatedDetector::default());
    let pipeline = Pipeline::new(
        detector.clone(),
        Arc::new(NullActionRecognizer),
        test_settings(),
    );
    let frame = Frame::filled(8, 8, [BUSY_TAG, 0, 0]);

    std::thread::scope(|scope| {
        for _ in 0..4 {
            let pipeline = &pipeline;
            let frame = frame.clone();
            scope.spawn(move || {
                for _ in 0..5 {
                    pipeline.process_frame("camera_1", frame.clone(), DetectionMode::Combined);
                }
            });
        }
    });

    assert_eq!(detector.busy_peak.load(Ordering::SeqCst), 1);
    assert_eq!(pipeline.windows().len("camera_1"), 20);
}

#[test]
fn stalled_camera_does_not_block_others() {
    let detector = Arc::new(GatedDetector::default());
    let pipeline = Pipeline::new(
        detector.clone(),
        Arc::new(NullActionRecognizer),
        test_settings(),
    );
    let stalled_done = AtomicBool::new(false);

    std::thread::scope(|scope| {
        let stalled = scope.spawn(|| {
            pipeline.process_frame(
                "camera_1",
                Frame::filled(8, 8, [STALLED_TAG, 0, 0]),
                DetectionMode::Combined,
            );
            stalled_done.store(true, Ordering::SeqCst);
        });

        detector.wait_until_stalled();
        assert!(detector.stalled.load(Ordering::SeqCst));

        let result = pipeline.process_frame(
            "camera_2",
            Frame::filled(8, 8, [0, 0, 0]),
            DetectionMode::Combined,
        );
        assert_eq!(result.camera_id, "camera_2");
        assert!(!stalled_done.load(Ordering::SeqCst));

        detector.released.store(true, Ordering::SeqCst);
        stalled.join().expect("stalled camera thread panicked");
    });

    assert!(stalled_done.load(Ordering::SeqCst));
    assert_eq!(pipeline.windows().len("camera_1"), 1);
    assert_eq!(pipeline.windows().len("camera_2"), 1);
}

use signlens::capture::FrameHandle;
use signlens::engine::{GraphOutput, MockGraphModel, MockHandTracker, TrackerOptions};
use signlens::{
    Backend, CollectorSink, EngineAdapter, EngineKind, EngineStatus, HandSide, Pipeline,
    PipelineConfig, PipelineState, SignlensError, SubmitOutcome, UserKey,
};
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(5);

fn one_right_hand_tensor() -> GraphOutput {
    // 21 keypoints at the center of a 256px input
    GraphOutput {
        keypoints: vec![128.0; 21 * 3],
        handedness: vec![0.9],
        presence: vec![0.95],
    }
}

#[test]
fn both_backends_failing_leaves_engine_unavailable() {
    let tracker = MockHandTracker::new("tracker").with_load_failure();
    let graph = MockGraphModel::new("graph").with_load_failure();
    let mut adapter = EngineAdapter::new(vec![
        Backend::hand_tracker(Box::new(tracker.clone()), TrackerOptions::default()),
        Backend::graph_model(Box::new(graph.clone()), "model.json"),
    ]);

    assert_eq!(adapter.initialize(), EngineStatus::Unavailable);
    assert!(matches!(
        adapter.infer(&FrameHandle::blank(0, 64, 64)),
        Err(SignlensError::NoEngine)
    ));
    assert_eq!(adapter.initialize(), EngineStatus::Unavailable);
    assert_eq!(tracker.load_calls(), 1);
    assert_eq!(graph.load_calls(), 1);
}

#[test]
fn unavailable_pipeline_reports_once_and_drops_frames() {
    let tracker = MockHandTracker::new("tracker").with_load_failure();
    let graph = MockGraphModel::new("graph").with_load_failure();
    let adapter = EngineAdapter::new(vec![
        Backend::hand_tracker(Box::new(tracker.clone()), TrackerOptions::default()),
        Backend::graph_model(Box::new(graph.clone()), "model.json"),
    ]);
    let collector = CollectorSink::new();
    let handle =
        Pipeline::new(PipelineConfig::default()).start(adapter, Box::new(collector.clone()));

    assert_eq!(handle.wait_for_engine(WAIT), PipelineState::Unavailable);
    for seq in 0..5 {
        assert_eq!(
            handle.submit_frame(FrameHandle::blank(seq, 64, 64), UserKey::guest()),
            SubmitOutcome::DroppedNoEngine
        );
    }
    let stats = handle.stop();

    assert_eq!(collector.statuses(), vec![EngineStatus::Unavailable]);
    assert!(collector.is_empty());
    assert_eq!(stats.dropped_no_engine, 5);
    assert_eq!(stats.emitted, 0);
    assert_eq!(tracker.load_calls(), 1);
    assert_eq!(graph.load_calls(), 1);
}

#[test]
fn graph_model_takes_over_when_tracker_fails() {
    let tracker = MockHandTracker::new("tracker").with_load_failure();
    let graph = MockGraphModel::new("graph").with_response(one_right_hand_tensor());
    let adapter = EngineAdapter::new(vec![
        Backend::hand_tracker(Box::new(tracker.clone()), TrackerOptions::default()),
        Backend::graph_model(Box::new(graph.clone()), "model.json"),
    ]);
    let collector = CollectorSink::new();
    let handle =
        Pipeline::new(PipelineConfig::default()).start(adapter, Box::new(collector.clone()));

    assert_eq!(
        handle.wait_for_engine(WAIT),
        PipelineState::Ready(EngineKind::GraphModel)
    );
    handle.submit_frame(FrameHandle::blank(0, 256, 256), UserKey::new("dana"));
    assert!(handle.wait_idle(WAIT));
    handle.stop();

    assert_eq!(
        collector.statuses(),
        vec![EngineStatus::Ready(EngineKind::GraphModel)]
    );
    let outputs = collector.outputs();
    assert_eq!(outputs.len(), 1);
    assert_eq!(outputs[0].grammar.gloss, vec!["HANDx1"]);

    let hand = &outputs[0].manual.hands[0];
    assert_eq!(hand.side, HandSide::Right);
    assert_eq!(hand.landmarks.len(), 21);
    assert!((hand.landmarks[0].x - 0.5).abs() < 1e-6);
    assert_eq!(graph.execute_calls(), 1);
}

#[test]
fn failing_inference_yields_empty_output_not_an_error() {
    let tracker = MockHandTracker::new("tracker").with_process_failure();
    let adapter = EngineAdapter::new(vec![Backend::hand_tracker(
        Box::new(tracker.clone()),
        TrackerOptions::default(),
    )]);
    let collector = CollectorSink::new();
    let handle =
        Pipeline::new(PipelineConfig::default()).start(adapter, Box::new(collector.clone()));

    assert_eq!(
        handle.wait_for_engine(WAIT),
        PipelineState::Ready(EngineKind::HandTracker)
    );
    handle.submit_frame(FrameHandle::blank(0, 64, 64), UserKey::guest());
    assert!(handle.wait_idle(WAIT));
    let stats = handle.stop();

    assert_eq!(stats.emitted, 1);
    assert_eq!(stats.inference_failures, 1);
    assert!(collector.outputs()[0].grammar.gloss.is_empty());
}

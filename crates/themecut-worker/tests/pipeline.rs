//! End-to-end pipeline flow with deterministic in-memory collaborators.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use themecut_media::{Frame, KeyframeSample};
use themecut_models::{EdlSegment, JobState, PipelineEvent, Stage, REASON_THEME_SEQUENCE};
use themecut_queue::Submission;
use themecut_worker::{
    Collaborators, FrameEmbedder, KeyframeSource, MediaExporter, Pipeline, PipelineConfig,
    PipelineResult, StageRequest, TextEncoder,
};

const RED: [u8; 3] = [255, 0, 0];
const BLUE: [u8; 3] = [0, 0, 255];

/// Six seconds of red then six seconds of blue, one keyframe per second.
struct TwoShotSource;

#[async_trait]
impl KeyframeSource for TwoShotSource {
    async fn sample(&self, _path: &Path, fps: f64) -> PipelineResult<Vec<KeyframeSample>> {
        let samples = (0..12)
            .map(|i| KeyframeSample {
                timestamp: i as f64 / fps,
                frame: Frame::solid(8, 8, if i < 6 { RED } else { BLUE }),
            })
            .collect();
        Ok(samples)
    }
}

/// Maps a solid frame onto a unit axis, so clip embeddings are comparable
/// with [`AxisTextEncoder`] outputs.
struct AxisEmbedder;

impl FrameEmbedder for AxisEmbedder {
    fn embed(&self, frame: &Frame) -> Vec<f32> {
        let mut sums = [0f32; 3];
        for (r, g, b) in frame.pixels() {
            sums[0] += f32::from(r);
            sums[1] += f32::from(g);
            sums[2] += f32::from(b);
        }
        let norm = sums.iter().map(|s| s * s).sum::<f32>().sqrt().max(1e-6);
        sums.iter().map(|s| s / norm).collect()
    }

    fn model_id(&self) -> &str {
        "axis-test-v1"
    }
}

struct AxisTextEncoder;

impl TextEncoder for AxisTextEncoder {
    fn encode_texts(&self, texts: &[String]) -> PipelineResult<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|text| match text.as_str() {
                "red" => vec![1.0, 0.0, 0.0],
                "blue" => vec![0.0, 0.0, 1.0],
                _ => vec![0.0, 1.0, 0.0],
            })
            .collect())
    }
}

struct StubExporter;

#[async_trait]
impl MediaExporter for StubExporter {
    async fn export(
        &self,
        _segments: &[EdlSegment],
        _source: &Path,
        output: &Path,
    ) -> PipelineResult<()> {
        std::fs::write(output, b"rendered")?;
        Ok(())
    }
}

fn test_pipeline(root: &Path) -> Pipeline {
    let config = PipelineConfig {
        workspace_root: root.to_path_buf(),
        ..PipelineConfig::default()
    };
    let collaborators = Collaborators {
        keyframes: Arc::new(TwoShotSource),
        embedder: Arc::new(AxisEmbedder),
        text_encoder: Arc::new(AxisTextEncoder),
        exporter: Arc::new(StubExporter),
    };
    Pipeline::new(config, collaborators).unwrap()
}

async fn wait_terminal(pipeline: &Pipeline, stage: Stage, key: &str) -> JobState {
    let mut sub = pipeline.subscribe().unwrap();
    tokio::time::timeout(Duration::from_secs(10), async move {
        while let Some(event) = sub.next().await {
            match event {
                PipelineEvent::Status {
                    stage: s,
                    key: k,
                    state,
                    ..
                } if s == stage && k == key && state.is_terminal() => return state,
                PipelineEvent::Snapshot { statuses } => {
                    if let Some(found) = statuses
                        .into_iter()
                        .find(|st| st.stage == stage && st.key == key && st.state.is_terminal())
                    {
                        return found.state;
                    }
                }
                _ => {}
            }
        }
        panic!("event stream closed before {stage:?} {key} finished");
    })
    .await
    .expect("job did not reach a terminal state in time")
}

#[tokio::test]
async fn full_flow_from_video_to_export() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = test_pipeline(dir.path());
    std::fs::write(pipeline.workspace().videos_dir().join("v1.mp4"), b"stub").unwrap();

    // Segment: the two-shot source becomes two six-second clips.
    let submission = pipeline
        .submit(StageRequest::Segment {
            video_id: "v1".to_string(),
            force: false,
        })
        .unwrap();
    assert!(matches!(submission, Submission::Queued));
    let state = wait_terminal(&pipeline, Stage::Segment, "v1").await;
    assert!(matches!(state, JobState::Done { .. }), "got {state:?}");

    let clips = pipeline.workspace().read_clips("v1").unwrap().unwrap();
    assert_eq!(clips.len(), 2);
    assert_eq!(clips[0].t_start, 0.0);
    assert_eq!(clips[0].t_end, 5.0);
    assert_eq!(clips[1].t_start, 6.0);
    assert_eq!(clips[1].embedding_model, "axis-test-v1");

    // Resubmitting without force short-circuits on the existing artifact.
    let resubmit = pipeline
        .submit(StageRequest::Segment {
            video_id: "v1".to_string(),
            force: false,
        })
        .unwrap();
    assert!(matches!(resubmit, Submission::Cached { .. }));

    // Theme: only the red clip aligns with the "red" prototype.
    pipeline
        .submit(StageRequest::Theme {
            theme: "Red Moments".to_string(),
            positives: vec!["red".to_string()],
            negatives: vec![],
            video_ids: vec![],
            force: false,
        })
        .unwrap();
    let state = wait_terminal(&pipeline, Stage::ThemeMatch, "red_moments").await;
    assert!(matches!(state, JobState::Done { .. }), "got {state:?}");

    let doc = pipeline.workspace().read_scores("red_moments").unwrap().unwrap();
    let entries = &doc.scores["v1"];
    assert_eq!(entries.len(), 2);
    assert!(entries[0].score > 0.9, "red clip should align strongly");
    assert!(entries[1].score < 0.1, "blue clip should not align");

    // Sequence: the red clip clears the threshold, the blue one does not.
    pipeline
        .submit(StageRequest::Sequence {
            theme: "Red Moments".to_string(),
            config: Default::default(),
            video_ids: vec![],
            force: false,
        })
        .unwrap();
    let state = wait_terminal(&pipeline, Stage::Sequence, "red_moments").await;
    assert!(matches!(state, JobState::Done { .. }), "got {state:?}");

    let edl = pipeline
        .workspace()
        .read_edl("red_moments", "v1")
        .unwrap()
        .unwrap();
    assert_eq!(edl.len(), 1);
    assert_eq!(edl[0].t_start, 0.0);
    assert_eq!(edl[0].t_end, 5.0);
    assert_eq!(edl[0].reason, REASON_THEME_SEQUENCE);

    // Export renders the selected segment through the exporter seam.
    pipeline
        .submit(StageRequest::Export {
            theme: "Red Moments".to_string(),
            video_id: None,
            edl_path: None,
            force: false,
        })
        .unwrap();
    let state = wait_terminal(&pipeline, Stage::Export, "red_moments").await;
    assert!(matches!(state, JobState::Done { .. }), "got {state:?}");
    let output = pipeline.workspace().export_path("red_moments");
    assert_eq!(std::fs::read(output).unwrap(), b"rendered");

    let statuses = pipeline.snapshot().unwrap();
    assert_eq!(statuses.len(), 4);
}

#[tokio::test]
async fn segment_failure_is_contained_and_reported() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = test_pipeline(dir.path());
    std::fs::write(pipeline.workspace().videos_dir().join("v1.mp4"), b"stub").unwrap();

    pipeline
        .submit(StageRequest::Segment {
            video_id: "ghost".to_string(),
            force: false,
        })
        .unwrap();
    let state = wait_terminal(&pipeline, Stage::Segment, "ghost").await;
    match state {
        JobState::Error { message } => assert!(message.contains("ghost"), "got {message}"),
        other => panic!("expected error state, got {other:?}"),
    }

    // The worker survives the failure and keeps serving jobs.
    pipeline
        .submit(StageRequest::Segment {
            video_id: "v1".to_string(),
            force: false,
        })
        .unwrap();
    let state = wait_terminal(&pipeline, Stage::Segment, "v1").await;
    assert!(matches!(state, JobState::Done { .. }), "got {state:?}");
}

#[tokio::test]
async fn sequence_without_scores_is_rejected_at_submit() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = test_pipeline(dir.path());

    let err = pipeline
        .submit(StageRequest::Sequence {
            theme: "Unknown".to_string(),
            config: Default::default(),
            video_ids: vec![],
            force: false,
        })
        .unwrap_err();
    assert!(err.to_string().contains("no scores"), "got {err}");

    let err = pipeline
        .submit(StageRequest::Segment {
            video_id: "   ".to_string(),
            force: false,
        })
        .unwrap_err();
    assert!(err.to_string().contains("empty"), "got {err}");
}

/// A decode that takes real wall time, simulated with an async sleep.
struct SlowSource;

#[async_trait]
impl KeyframeSource for SlowSource {
    async fn sample(&self, path: &Path, fps: f64) -> PipelineResult<Vec<KeyframeSample>> {
        tokio::time::sleep(Duration::from_millis(200)).await;
        TwoShotSource.sample(path, fps).await
    }
}

#[tokio::test]
async fn slow_keyframe_decode_does_not_stall_the_event_stream() {
    let dir = tempfile::tempdir().unwrap();
    let config = PipelineConfig {
        workspace_root: dir.path().to_path_buf(),
        ..PipelineConfig::default()
    };
    let collaborators = Collaborators {
        keyframes: Arc::new(SlowSource),
        embedder: Arc::new(AxisEmbedder),
        text_encoder: Arc::new(AxisTextEncoder),
        exporter: Arc::new(StubExporter),
    };
    let pipeline = Pipeline::new(config, collaborators).unwrap();
    std::fs::write(pipeline.workspace().videos_dir().join("v1.mp4"), b"stub").unwrap();

    let mut sub = pipeline
        .subscribe()
        .unwrap()
        .with_keepalive(Duration::from_millis(20));
    pipeline
        .submit(StageRequest::Segment {
            video_id: "v1".to_string(),
            force: false,
        })
        .unwrap();

    // The default test runtime is single threaded, so a decode that held the
    // thread would starve the subscription until it finished.
    let mut keepalives = 0;
    let state = tokio::time::timeout(Duration::from_secs(10), async {
        while let Some(event) = sub.next().await {
            match event {
                PipelineEvent::Keepalive => keepalives += 1,
                PipelineEvent::Status {
                    stage, key, state, ..
                } if stage == Stage::Segment && key == "v1" && state.is_terminal() => {
                    return state;
                }
                _ => {}
            }
        }
        panic!("event stream closed before the segment job finished");
    })
    .await
    .expect("segment job did not finish in time");
    assert!(matches!(state, JobState::Done { .. }), "got {state:?}");
    assert!(keepalives > 0, "no keepalives arrived while the decode ran");
}

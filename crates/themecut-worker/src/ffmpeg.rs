//! ffmpeg-backed keyframe sampling and EDL rendering.

use std::fmt::Write as _;
use std::path::Path;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use themecut_media::{Frame, KeyframeSample};
use themecut_models::EdlSegment;

use crate::collaborators::{KeyframeSource, MediaExporter};
use crate::error::{PipelineError, PipelineResult};

const SAMPLE_WIDTH: u32 = 64;
const SAMPLE_HEIGHT: u32 = 36;

fn ffmpeg_binary() -> PipelineResult<std::path::PathBuf> {
    which::which("ffmpeg")
        .map_err(|_| PipelineError::execution_failed("ffmpeg not found on PATH"))
}

/// Decode low-resolution RGB keyframes at a fixed rate with ffmpeg.
#[derive(Debug, Default, Clone)]
pub struct FfmpegKeyframeSource;

#[async_trait]
impl KeyframeSource for FfmpegKeyframeSource {
    async fn sample(&self, path: &Path, fps: f64) -> PipelineResult<Vec<KeyframeSample>> {
        if fps <= 0.0 {
            return Err(PipelineError::invalid_input(format!(
                "keyframe fps must be positive, got {fps}"
            )));
        }
        let binary = ffmpeg_binary()?;
        let output = Command::new(&binary)
            .args(["-hide_banner", "-loglevel", "error", "-i"])
            .arg(path)
            .args([
                "-vf",
                &format!("fps={fps},scale={SAMPLE_WIDTH}:{SAMPLE_HEIGHT}"),
                "-f",
                "rawvideo",
                "-pix_fmt",
                "rgb24",
                "pipe:1",
            ])
            .output()
            .await?;
        if !output.status.success() {
            return Err(PipelineError::execution_failed(format!(
                "ffmpeg keyframe decode failed for {}: {}",
                path.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let frame_bytes = (SAMPLE_WIDTH * SAMPLE_HEIGHT * 3) as usize;
        let samples: Vec<KeyframeSample> = output
            .stdout
            .chunks_exact(frame_bytes)
            .enumerate()
            .map(|(i, chunk)| KeyframeSample {
                timestamp: i as f64 / fps,
                frame: Frame::new(SAMPLE_WIDTH, SAMPLE_HEIGHT, chunk.to_vec()),
            })
            .collect();
        debug!(video = %path.display(), frames = samples.len(), "sampled keyframes");
        Ok(samples)
    }
}

/// Render an EDL into a single clip with one ffmpeg filter graph.
#[derive(Debug, Clone)]
pub struct FfmpegExporter {
    video_codec: String,
    video_bitrate: String,
    /// Audio fade length at both ends of each segment, seconds.
    audio_fade: f64,
}

impl Default for FfmpegExporter {
    fn default() -> Self {
        Self {
            video_codec: "libx264".to_string(),
            video_bitrate: "8M".to_string(),
            audio_fade: 0.15,
        }
    }
}

impl FfmpegExporter {
    fn filter_graph(&self, segments: &[EdlSegment]) -> String {
        let mut graph = String::new();
        for (i, seg) in segments.iter().enumerate() {
            let _ = write!(
                graph,
                "[0:v]trim=start={:.3}:end={:.3},setpts=PTS-STARTPTS[v{i}];",
                seg.t_start, seg.t_end
            );
            let _ = write!(
                graph,
                "[0:a]atrim=start={:.3}:end={:.3},asetpts=PTS-STARTPTS",
                seg.t_start, seg.t_end
            );
            let duration = seg.t_end - seg.t_start;
            if duration >= 2.0 * self.audio_fade {
                let _ = write!(
                    graph,
                    ",afade=t=in:st=0:d={fade:.3},afade=t=out:st={out:.3}:d={fade:.3}",
                    fade = self.audio_fade,
                    out = duration - self.audio_fade
                );
            }
            let _ = write!(graph, "[a{i}];");
        }
        for i in 0..segments.len() {
            let _ = write!(graph, "[v{i}]");
        }
        let _ = write!(graph, "concat=n={}:v=1:a=0[vout];", segments.len());
        for i in 0..segments.len() {
            let _ = write!(graph, "[a{i}]");
        }
        let _ = write!(graph, "concat=n={}:v=0:a=1[aout]", segments.len());
        graph
    }
}

#[async_trait]
impl MediaExporter for FfmpegExporter {
    async fn export(
        &self,
        segments: &[EdlSegment],
        source: &Path,
        output: &Path,
    ) -> PipelineResult<()> {
        if segments.is_empty() {
            return Err(PipelineError::invalid_input(
                "cannot export an empty edit list",
            ));
        }
        let binary = ffmpeg_binary()?;
        let graph = self.filter_graph(segments);
        let result = Command::new(&binary)
            .args(["-hide_banner", "-loglevel", "error", "-i"])
            .arg(source)
            .args(["-filter_complex", &graph])
            .args(["-map", "[vout]", "-map", "[aout]"])
            .args(["-c:v", &self.video_codec, "-b:v", &self.video_bitrate])
            .args(["-c:a", "aac", "-b:a", "192k", "-y"])
            .arg(output)
            .output()
            .await?;
        if !result.status.success() {
            return Err(PipelineError::execution_failed(format!(
                "ffmpeg export failed for {}: {}",
                source.display(),
                String::from_utf8_lossy(&result.stderr).trim()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use themecut_models::REASON_THEME_SEQUENCE;

    fn segment(start: f64, end: f64) -> EdlSegment {
        EdlSegment {
            video_id: "v1".to_string(),
            t_start: start,
            t_end: end,
            reason: REASON_THEME_SEQUENCE.to_string(),
        }
    }

    #[test]
    fn filter_graph_trims_and_concats_each_segment() {
        let graph = FfmpegExporter::default().filter_graph(&[segment(0.0, 3.0), segment(5.0, 7.0)]);
        assert!(graph.contains("[0:v]trim=start=0.000:end=3.000,setpts=PTS-STARTPTS[v0];"));
        assert!(graph.contains("[0:a]atrim=start=5.000:end=7.000"));
        assert!(graph.contains("[v0][v1]concat=n=2:v=1:a=0[vout];"));
        assert!(graph.contains("[a0][a1]concat=n=2:v=0:a=1[aout]"));
    }

    #[test]
    fn audio_fade_skipped_for_very_short_segments() {
        let exporter = FfmpegExporter::default();
        let with_fade = exporter.filter_graph(&[segment(0.0, 1.0)]);
        assert!(with_fade.contains("afade=t=in"));
        assert!(with_fade.contains("afade=t=out:st=0.850"));
        let without_fade = exporter.filter_graph(&[segment(0.0, 0.2)]);
        assert!(!without_fade.contains("afade"));
    }
}

//! Themecut pipeline binary.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use themecut_models::{JobState, PipelineEvent, Stage};
use themecut_queue::Submission;
use themecut_worker::{
    Collaborators, FfmpegExporter, FfmpegKeyframeSource, HashingTextEncoder, MeanColorEmbedder,
    Pipeline, PipelineConfig, StageRequest,
};

#[derive(Parser)]
#[command(name = "themecut", about = "Themed highlight pipeline", version)]
struct Cli {
    /// Workspace root, overrides THEMECUT_WORKSPACE
    #[arg(long, global = true)]
    workspace: Option<PathBuf>,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Create the workspace directory layout
    Init,
    /// Segment source videos into clips
    Segment {
        video_ids: Vec<String>,
        #[arg(long)]
        force: bool,
    },
    /// Score segmented clips against a theme
    Theme {
        name: String,
        #[arg(long = "positive")]
        positives: Vec<String>,
        #[arg(long = "negative")]
        negatives: Vec<String>,
        #[arg(long = "video")]
        videos: Vec<String>,
        #[arg(long)]
        force: bool,
    },
    /// Build edit decision lists from theme scores
    Sequence {
        theme: String,
        #[arg(long)]
        upper: Option<f64>,
        #[arg(long)]
        lower: Option<f64>,
        #[arg(long)]
        min_seconds: Option<f64>,
        #[arg(long)]
        max_seconds: Option<f64>,
        #[arg(long = "video")]
        videos: Vec<String>,
        #[arg(long)]
        force: bool,
    },
    /// Render a theme's edit list into a highlight video
    Export {
        theme: String,
        #[arg(long)]
        video: Option<String>,
        #[arg(long)]
        edl: Option<String>,
        #[arg(long)]
        force: bool,
    },
    /// Print the status of every known job
    Status,
    /// Follow live status events
    Watch,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let mut config = PipelineConfig::from_env();
    if let Some(workspace) = cli.workspace {
        config.workspace_root = workspace;
    }
    let sequence_defaults = config.sequence.clone();

    let collaborators = Collaborators {
        keyframes: Arc::new(FfmpegKeyframeSource),
        embedder: Arc::new(MeanColorEmbedder),
        text_encoder: Arc::new(HashingTextEncoder::default()),
        exporter: Arc::new(FfmpegExporter::default()),
    };
    let pipeline = Pipeline::new(config, collaborators).context("starting pipeline")?;

    match cli.command {
        CliCommand::Init => {
            println!("workspace ready at {}", pipeline.workspace().root().display());
        }
        CliCommand::Segment { video_ids, force } => {
            let video_ids = if video_ids.is_empty() {
                pipeline.workspace().list_videos()?
            } else {
                video_ids
            };
            anyhow::ensure!(!video_ids.is_empty(), "no videos in the workspace");
            for video_id in video_ids {
                let submission = pipeline.submit(StageRequest::Segment {
                    video_id: video_id.clone(),
                    force,
                })?;
                report(&pipeline, Stage::Segment, &video_id, submission).await?;
            }
        }
        CliCommand::Theme {
            name,
            positives,
            negatives,
            videos,
            force,
        } => {
            let key = themecut_models::slugify(&name);
            let submission = pipeline.submit(StageRequest::Theme {
                theme: name,
                positives,
                negatives,
                video_ids: videos,
                force,
            })?;
            report(&pipeline, Stage::ThemeMatch, &key, submission).await?;
        }
        CliCommand::Sequence {
            theme,
            upper,
            lower,
            min_seconds,
            max_seconds,
            videos,
            force,
        } => {
            let mut seq = sequence_defaults;
            if let Some(upper) = upper {
                seq.threshold_upper = upper;
            }
            seq.threshold_lower = lower.or(seq.threshold_lower);
            seq.min_clip_seconds = min_seconds.or(seq.min_clip_seconds);
            seq.max_clip_seconds = max_seconds.or(seq.max_clip_seconds);
            let key = themecut_models::slugify(&theme);
            let submission = pipeline.submit(StageRequest::Sequence {
                theme,
                config: seq,
                video_ids: videos,
                force,
            })?;
            report(&pipeline, Stage::Sequence, &key, submission).await?;
        }
        CliCommand::Export {
            theme,
            video,
            edl,
            force,
        } => {
            let key = themecut_models::slugify(&theme);
            let submission = pipeline.submit(StageRequest::Export {
                theme,
                video_id: video,
                edl_path: edl,
                force,
            })?;
            report(&pipeline, Stage::Export, &key, submission).await?;
        }
        CliCommand::Status => {
            let statuses = pipeline.snapshot()?;
            if statuses.is_empty() {
                println!("no jobs yet");
            }
            for status in statuses {
                println!(
                    "{:<14} {:<24} {:<8} {:>5.0}%",
                    status.stage.as_str(),
                    status.key,
                    status.state.name(),
                    status.state.progress() * 100.0
                );
            }
        }
        CliCommand::Watch => {
            let mut sub = pipeline.subscribe()?;
            while let Some(event) = sub.next().await {
                println!("{}", serde_json::to_string(&event)?);
            }
        }
    }
    Ok(())
}

/// Print the submission outcome and, for queued jobs, follow status events
/// until the job reaches a terminal state.
async fn report(
    pipeline: &Pipeline,
    stage: Stage,
    key: &str,
    submission: Submission,
) -> anyhow::Result<()> {
    match submission {
        Submission::Cached { result_path } => {
            match result_path {
                Some(path) => println!("{} {key}: cached at {path}", stage.as_str()),
                None => println!("{} {key}: cached", stage.as_str()),
            }
            return Ok(());
        }
        Submission::Skipped => {
            println!("{} {key}: already queued", stage.as_str());
        }
        Submission::Queued => {
            info!(stage = stage.as_str(), key, "queued");
        }
    }

    let mut sub = pipeline.subscribe()?;
    while let Some(event) = sub.next().await {
        let (state, result_path) = match event {
            PipelineEvent::Status {
                stage: s,
                key: k,
                state,
                result_path,
            } if s == stage && k == key => (state, result_path),
            PipelineEvent::Snapshot { statuses } => {
                let Some(status) = statuses
                    .into_iter()
                    .find(|s| s.stage == stage && s.key == key)
                else {
                    continue;
                };
                if !status.state.is_terminal() {
                    continue;
                }
                (status.state, None)
            }
            _ => continue,
        };
        match state {
            JobState::Running { progress, message } => {
                println!(
                    "{} {key}: {:>3.0}% {message}",
                    stage.as_str(),
                    progress * 100.0
                );
            }
            JobState::Done { result_path: path } => {
                let path = result_path.or(Some(path)).unwrap_or_default();
                println!("{} {key}: done, {path}", stage.as_str());
                return Ok(());
            }
            JobState::Error { message } => {
                anyhow::bail!("{} {key} failed: {message}", stage.as_str());
            }
            JobState::Queued | JobState::Cached { .. } => {}
        }
    }
    anyhow::bail!("event stream closed before {} {key} finished", stage.as_str());
}

fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("themecut=info,warn"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
}

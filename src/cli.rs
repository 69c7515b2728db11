use crate::{
    client::{http::HttpTransport, JobClient},
    config::Config,
    credential::{
        Credential, CredentialChain, CredentialProvider, EnvCredential, PromptCredential,
        StaticCredential,
    },
    job::VideoFile,
    overlay::{
        OverlayController, OverlayRenderer, PlaybackEvent, RecordingSurface, SimulatedVideo,
        SvgSurface, VideoSource,
    },
    report::{InputReport, RunReport},
    result::InferenceResult,
    session::Session,
    util::{ensure_dir, now_rfc3339, path_component, read_json, sha256_hex, write_json},
};
use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[derive(Parser, Debug)]
#[command(name = "hal-overlay")]
#[command(about = "HAL video inference client and frame-synchronized pose overlay")]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Command,

    /// Path to config TOML. If omitted, uses ./hal-overlay.toml if present.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override log level (trace/debug/info/warn/error).
    #[arg(long)]
    pub log_level: Option<String>,

    /// API key. Falls back to the environment variable named in the config.
    #[arg(long)]
    pub api_key: Option<String>,

    /// Ask for the API key on stdin when no other source has one.
    #[arg(long)]
    pub prompt_key: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List model versions and the preferred one.
    Models {},
    /// Upload a video, wait for processing and download the results.
    Run {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        version: Option<String>,
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
    /// Download the results of an earlier run.
    Fetch {
        #[arg(long)]
        guid: String,
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
    /// Render a single overlay tick from a result file.
    Frame {
        #[arg(long)]
        result: PathBuf,
        #[arg(long)]
        time: f64,
        #[arg(long)]
        width: Option<f64>,
        #[arg(long)]
        height: Option<f64>,
        #[arg(long)]
        svg: Option<PathBuf>,
    },
    /// Replay a result file against a simulated video.
    Play {
        #[arg(long)]
        result: PathBuf,
        #[arg(long, default_value_t = 0.0)]
        from: f64,
        #[arg(long)]
        until: Option<f64>,
        #[arg(long)]
        pause_at: Option<f64>,
    },
}

pub async fn dispatch(args: Args) -> Result<()> {
    let cfg_path = resolve_config_path(args.config.as_deref())?;
    let cfg = Config::load(&cfg_path)?;

    let log_path = resolve_log_path(&cfg);
    let _guard = init_logging(&args, &cfg, log_path.as_deref())?;
    debug!("config loaded from {}", cfg_path.display());

    match &args.cmd {
        Command::Models {} => models(&args, &cfg).await,
        Command::Run {
            input,
            version,
            out_dir,
        } => run(&args, &cfg, input, version.as_deref(), out_dir.as_deref()).await,
        Command::Fetch { guid, out_dir } => fetch(&args, &cfg, guid, out_dir.as_deref()).await,
        Command::Frame {
            result,
            time,
            width,
            height,
            svg,
        } => frame(&cfg, result, *time, (*width, *height), svg.as_deref()),
        Command::Play {
            result,
            from,
            until,
            pause_at,
        } => play(&cfg, result, *from, *until, *pause_at).await,
    }
}

fn resolve_config_path(user: Option<&Path>) -> Result<PathBuf> {
    if let Some(p) = user {
        return Ok(p.to_path_buf());
    }
    let default = PathBuf::from("hal-overlay.toml");
    if default.exists() {
        Ok(default)
    } else {
        Ok(PathBuf::from("hal-overlay.example.toml"))
    }
}

fn init_logging(args: &Args, cfg: &Config, file_path: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let level = args
        .log_level
        .as_deref()
        .unwrap_or(cfg.logging.level.as_str());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // stdout carries command output; logs go to stderr
    let stderr_layer = if cfg.logging.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    };

    let (file_layer, guard) = if let Some(path) = file_path {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        ensure_dir(parent)?;
        let file = std::fs::File::create(path)
            .with_context(|| format!("create log file: {}", path.display()))?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .boxed();
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("failed to init logging: {e}"))?;

    Ok(guard)
}

fn resolve_log_path(cfg: &Config) -> Option<PathBuf> {
    if !cfg.logging.write_to_file {
        return None;
    }
    if !cfg.logging.file_path.is_empty() {
        return Some(PathBuf::from(&cfg.logging.file_path));
    }
    Some(PathBuf::from(&cfg.output.out_dir).join("hal-overlay.log"))
}

fn acquire_credential(args: &Args, cfg: &Config) -> Credential {
    let mut chain = CredentialChain::new()
        .with(StaticCredential(args.api_key.clone()))
        .with(EnvCredential {
            var: cfg.service.api_key_env.clone(),
        });
    if args.prompt_key {
        chain = chain.with(PromptCredential {
            prompt: "HAL API key: ".into(),
        });
    }
    chain.acquire()
}

fn open_session(args: &Args, cfg: &Config) -> Result<Session<HttpTransport>> {
    let transport = HttpTransport::new(&cfg.service)?;
    let client = JobClient::new(transport, acquire_credential(args, cfg), &cfg.service);
    Ok(Session::new(cfg, client))
}

/// A token cancelled by the first Ctrl-C.
fn interrupt_token() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling");
            trigger.cancel();
        }
    });
    token
}

async fn models(args: &Args, cfg: &Config) -> Result<()> {
    let session = open_session(args, cfg)?;
    let catalog = session.load_models().await;
    println!("{}", serde_json::to_string_pretty(&catalog)?);
    Ok(())
}

async fn run(
    args: &Args,
    cfg: &Config,
    input: &Path,
    version: Option<&str>,
    out_override: Option<&Path>,
) -> Result<()> {
    if !input.is_file() {
        return Err(anyhow!("input does not exist: {}", input.display()));
    }
    let video = VideoFile::open(input).with_context(|| format!("reading {}", input.display()))?;
    let input_report = InputReport {
        name: video.name.clone(),
        bytes: video.bytes.len() as u64,
        sha256: sha256_hex(&video.bytes),
    };

    let session = open_session(args, cfg)?;
    match version {
        Some(v) => session.select_version(v),
        None => {
            session.load_models().await;
        }
    }
    session.select_video(video)?;

    let cancel = interrupt_token();
    let started = now_rfc3339();
    let outcome = session
        .upload_and_process(&cancel)
        .await
        .context("upload and processing")?;

    let job_dir = out_root(cfg, out_override).join(path_component(&outcome.guid));
    ensure_dir(&job_dir)?;
    info!("guid={} out={}", outcome.guid, job_dir.display());

    let result_file = if cfg.output.write_result_json {
        write_json(&job_dir.join(&cfg.output.result_filename), &*outcome.result)?;
        Some(cfg.output.result_filename.clone())
    } else {
        None
    };

    if cfg.output.write_index_json {
        let report =
            RunReport::from_outcome(&outcome, input_report, started, now_rfc3339(), result_file);
        write_json(&job_dir.join("index.json"), &report)?;
    }

    if cfg.output.print_summary {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "guid": outcome.guid,
                "job_dir": job_dir,
                "poll_attempts": outcome.poll.attempts,
                "view": outcome.view,
            }))?
        );
    }
    Ok(())
}

async fn fetch(args: &Args, cfg: &Config, guid: &str, out_override: Option<&Path>) -> Result<()> {
    let session = open_session(args, cfg)?;
    let cancel = interrupt_token();
    let (result, view) = session
        .visualize_previous(guid, &cancel)
        .await
        .with_context(|| format!("visualizing {guid}"))?;

    let job_dir = out_root(cfg, out_override).join(path_component(guid));
    if cfg.output.write_result_json {
        ensure_dir(&job_dir)?;
        write_json(&job_dir.join(&cfg.output.result_filename), &*result)?;
    }

    if cfg.output.print_summary {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "guid": guid.trim(),
                "job_dir": job_dir,
                "view": view,
            }))?
        );
    }
    Ok(())
}

fn frame(
    cfg: &Config,
    result_path: &Path,
    time: f64,
    size: (Option<f64>, Option<f64>),
    svg: Option<&Path>,
) -> Result<()> {
    let result = load_result(result_path)?;
    let style = cfg.overlay.style.clone();
    let renderer = OverlayRenderer::new(result.clone(), style, cfg.overlay.default_fps)
        .ok_or_else(|| anyhow!("result has no pose data: {}", result_path.display()))?;

    let display = (
        size.0.unwrap_or(cfg.overlay.display_width),
        size.1.unwrap_or(cfg.overlay.display_height),
    );
    let duration = media_duration(&result, renderer.fps()).max(time);
    let video = SimulatedVideo::new(duration, display, None);
    video.seek(time);

    let mut surface = RecordingSurface::new();
    let outcome = renderer.draw(&video, &mut surface);

    if let Some(path) = svg {
        let mut svg_surface = SvgSurface::new();
        renderer.draw(&video, &mut svg_surface);
        std::fs::write(path, svg_surface.to_svg())
            .with_context(|| format!("write {}", path.display()))?;
    }

    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "time": video.current_time(),
            "fps": renderer.fps(),
            "width": surface.width,
            "height": surface.height,
            "draw": outcome,
            "commands": surface.commands,
        }))?
    );
    Ok(())
}

async fn play(
    cfg: &Config,
    result_path: &Path,
    from: f64,
    until: Option<f64>,
    pause_at: Option<f64>,
) -> Result<()> {
    let result = load_result(result_path)?;
    let fps = result
        .video_metadata
        .as_ref()
        .and_then(|m| m.fps)
        .filter(|f| f.is_finite() && *f > 0.0)
        .unwrap_or(cfg.overlay.default_fps);
    let end = until.unwrap_or_else(|| media_duration(&result, fps));
    if end <= from {
        return Err(anyhow!("nothing to play: from={from} until={end}"));
    }

    let video = SimulatedVideo::new(
        end,
        (cfg.overlay.display_width, cfg.overlay.display_height),
        None,
    );
    let mut controller = OverlayController::new(RecordingSurface::new(), &cfg.overlay);
    controller.set_result(Some(result)).await;
    controller.attach_video(video.clone()).await;

    let cancel = interrupt_token();
    video.seek(from);
    controller.dispatch(PlaybackEvent::Seeked).await;
    video.play();
    controller.dispatch(PlaybackEvent::Play).await;
    info!("playing {from:.2}s..{end:.2}s");

    if let Some(at) = pause_at.filter(|t| *t > from && *t < end) {
        if sleep_or_cancel(at - from, &cancel).await {
            video.pause();
            controller.dispatch(PlaybackEvent::Pause).await;
            info!("paused at {:.2}s", video.current_time());
            video.play();
            controller.dispatch(PlaybackEvent::Play).await;
        }
    }

    let remaining = video.duration() - video.current_time();
    if sleep_or_cancel(remaining, &cancel).await {
        controller.dispatch(PlaybackEvent::Ended).await;
    } else {
        video.pause();
        controller.dispatch(PlaybackEvent::Pause).await;
    }

    controller.detach_video().await;
    controller.shutdown().await;

    let stats = controller.stats().await;
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "from": from,
            "until": end,
            "stopped_at": video.current_time(),
            "paused": video.is_paused(),
            "state": controller.state(),
            "stats": stats,
        }))?
    );
    Ok(())
}

fn load_result(path: &Path) -> Result<Arc<InferenceResult>> {
    let result: InferenceResult = read_json(path)?;
    Ok(Arc::new(result))
}

/// Seconds covered by the result: declared frame count if present, else the
/// last pose frame.
fn media_duration(result: &InferenceResult, fps: f64) -> f64 {
    let frames = result
        .video_metadata
        .as_ref()
        .map(|m| m.total_frames)
        .filter(|n| *n > 0)
        .or_else(|| {
            result
                .active_subject()
                .and_then(|s| s.pose_table.frames().max())
                .map(|last| last + 1)
        })
        .unwrap_or(0);
    frames as f64 / fps
}

fn out_root(cfg: &Config, out_override: Option<&Path>) -> PathBuf {
    out_override
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(&cfg.output.out_dir))
}

/// `false` when cancelled first.
async fn sleep_or_cancel(secs: f64, cancel: &CancellationToken) -> bool {
    let secs = if secs.is_finite() { secs.max(0.0) } else { 0.0 };
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(Duration::from_secs_f64(secs)) => true,
    }
}

use super::{
    DrawOutcome, LoopAction, OverlayRenderer, PlaybackEvent, PlaybackMachine, PlaybackState,
    Surface, VideoSource,
};
use crate::{config, result::InferenceResult};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::{
    sync::Mutex,
    task::JoinHandle,
    time::{interval, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

#[derive(Debug, Clone, Default, Serialize)]
pub struct DrawStats {
    /// Draws issued by the continuous loop.
    pub loop_ticks: u64,
    /// One-shot draws after pause, end or seek.
    pub redraws: u64,
    pub drawn: u64,
    pub no_row: u64,
    pub not_ready: u64,
    pub last: Option<DrawOutcome>,
}

impl DrawStats {
    fn record(&mut self, outcome: DrawOutcome) {
        match outcome {
            DrawOutcome::NotReady => self.not_ready += 1,
            DrawOutcome::NoRow { .. } => self.no_row += 1,
            DrawOutcome::Drawn { .. } => self.drawn += 1,
        }
        self.last = Some(outcome);
    }
}

/// Everything a draw tick reads or writes.
pub struct OverlayScene<S> {
    renderer: Option<OverlayRenderer>,
    video: Option<Box<dyn VideoSource + Send>>,
    surface: S,
    stats: DrawStats,
}

impl<S: Surface> OverlayScene<S> {
    pub fn new(surface: S) -> Self {
        Self {
            renderer: None,
            video: None,
            surface,
            stats: DrawStats::default(),
        }
    }

    /// Draws nothing until both pose data and a video are present.
    pub fn draw(&mut self) -> DrawOutcome {
        let outcome = match (&self.renderer, &self.video) {
            (Some(renderer), Some(video)) => renderer.draw(&**video, &mut self.surface),
            _ => DrawOutcome::NotReady,
        };
        self.stats.record(outcome);
        outcome
    }

    fn video_playing(&self) -> bool {
        self.video.as_ref().is_some_and(|v| v.is_playing())
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn stats(&self) -> &DrawStats {
        &self.stats
    }
}

struct LoopHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// At most one running draw loop; arming always cancels the previous one.
pub struct RenderLoop {
    handle: Option<LoopHandle>,
    refresh: Duration,
}

impl RenderLoop {
    pub fn new(refresh: Duration) -> Self {
        Self {
            handle: None,
            refresh: refresh.max(Duration::from_millis(1)),
        }
    }

    pub async fn arm<S>(&mut self, scene: Arc<Mutex<OverlayScene<S>>>)
    where
        S: Surface + Send + 'static,
    {
        self.disarm().await;
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_loop(scene, self.refresh, cancel.clone()));
        self.handle = Some(LoopHandle { cancel, task });
    }

    pub async fn disarm(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.cancel.cancel();
            if let Err(err) = handle.task.await {
                warn!("render loop task failed to join: {err}");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.task.is_finished())
    }
}

impl Drop for RenderLoop {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.cancel.cancel();
        }
    }
}

async fn run_loop<S>(scene: Arc<Mutex<OverlayScene<S>>>, refresh: Duration, cancel: CancellationToken)
where
    S: Surface + Send + 'static,
{
    let mut ticker = interval(refresh);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("render loop cancelled");
                break;
            }
            _ = ticker.tick() => {}
        }

        let mut guard = scene.lock().await;
        if !guard.video_playing() {
            debug!("render loop exiting: video not playing");
            break;
        }
        let outcome = guard.draw();
        guard.stats.loop_ticks += 1;
        trace!(?outcome, "overlay tick");
    }
}

/// Owns the scene, the playback state machine and the render loop.
pub struct OverlayController<S> {
    scene: Arc<Mutex<OverlayScene<S>>>,
    machine: PlaybackMachine,
    render_loop: RenderLoop,
    cfg: config::Overlay,
}

impl<S: Surface + Send + 'static> OverlayController<S> {
    pub fn new(surface: S, cfg: &config::Overlay) -> Self {
        Self {
            scene: Arc::new(Mutex::new(OverlayScene::new(surface))),
            machine: PlaybackMachine::new(),
            render_loop: RenderLoop::new(cfg.refresh_interval()),
            cfg: cfg.clone(),
        }
    }

    /// Swaps in a new result snapshot; `None` or a result without pose data
    /// leaves the overlay blank.
    pub async fn set_result(&self, result: Option<Arc<InferenceResult>>) {
        let renderer = result.and_then(|r| {
            OverlayRenderer::new(r, self.cfg.style.clone(), self.cfg.default_fps)
        });
        debug!(has_pose = renderer.is_some(), "overlay result updated");
        self.scene.lock().await.renderer = renderer;
    }

    pub async fn attach_video(&self, video: impl VideoSource + Send + 'static) {
        self.scene.lock().await.video = Some(Box::new(video));
    }

    /// Stops the loop and drops the video.
    pub async fn detach_video(&mut self) {
        self.dispatch(PlaybackEvent::Detached).await;
        self.scene.lock().await.video = None;
    }

    pub async fn dispatch(&mut self, event: PlaybackEvent) -> Vec<LoopAction> {
        let from = self.machine.state();
        let actions = self.machine.transition(event);
        debug!(?event, ?from, to = ?self.machine.state(), ?actions, "playback event");

        for action in &actions {
            match action {
                LoopAction::StartLoop => self.render_loop.arm(self.scene.clone()).await,
                LoopAction::StopLoop => self.render_loop.disarm().await,
                LoopAction::RedrawOnce => {
                    let mut scene = self.scene.lock().await;
                    scene.draw();
                    scene.stats.redraws += 1;
                }
            }
        }
        actions
    }

    pub fn state(&self) -> PlaybackState {
        self.machine.state()
    }

    pub fn is_looping(&self) -> bool {
        self.render_loop.is_running()
    }

    pub async fn stats(&self) -> DrawStats {
        self.scene.lock().await.stats.clone()
    }

    pub async fn with_surface<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(self.scene.lock().await.surface())
    }

    pub async fn shutdown(&mut self) {
        self.render_loop.disarm().await;
    }
}

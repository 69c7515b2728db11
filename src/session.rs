use crate::{
    client::{JobClient, Transport},
    config::Config,
    display::{build_view, ResultView},
    error::{JobError, SessionError},
    job::{Job, JobPhase, VideoFile},
    models::ModelCatalog,
    poll::{PollOutcome, PollingScheduler},
    result::InferenceResult,
    util::clock_hms,
};
use serde::Serialize;
use std::future::Future;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Debug, Clone, Default, Serialize)]
pub struct StatusMessages {
    pub upload: String,
    pub status: String,
    pub download: String,
}

/// Everything one completed upload sequence produced.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub guid: String,
    pub version: String,
    pub poll: PollOutcome,
    pub result: Arc<InferenceResult>,
    pub view: ResultView,
}

struct SessionState {
    video: Option<VideoFile>,
    catalog: ModelCatalog,
    version: String,
    job: Option<Job>,
    result: Option<Arc<InferenceResult>>,
    view: Option<ResultView>,
    messages: StatusMessages,
    log: Vec<String>,
}

/// Top-level state holder: owns the current job and result and sequences
/// upload → poll → download → apply.
///
/// At most one upload or download sequence runs at a time; a second call
/// while one is in flight is refused with [`SessionError::Busy`].
pub struct Session<T: Transport> {
    cfg: Config,
    client: JobClient<T>,
    scheduler: PollingScheduler,
    state: Mutex<SessionState>,
    in_flight: AtomicBool,
}

impl<T: Transport> Session<T> {
    pub fn new(cfg: &Config, client: JobClient<T>) -> Self {
        let upload = if client.credential().is_present() {
            "API key set. Select a video to begin, or visualize a previous run."
        } else {
            "No API key provided. Features will be limited."
        };
        let catalog = ModelCatalog::fallback(&cfg.models);
        let session = Self {
            cfg: cfg.clone(),
            scheduler: PollingScheduler::from_config(&cfg.polling),
            state: Mutex::new(SessionState {
                video: None,
                version: catalog.selected.clone(),
                catalog,
                job: None,
                result: None,
                view: None,
                messages: StatusMessages {
                    upload: upload.into(),
                    status: "No updates yet.".into(),
                    download: "Waiting...".into(),
                },
                log: Vec::new(),
            }),
            client,
            in_flight: AtomicBool::new(false),
        };
        if session.client.credential().is_present() {
            session.log("API key set.");
        } else {
            session.log("No API key provided. Running in degraded mode.");
        }
        session
    }

    pub fn with_scheduler(mut self, scheduler: PollingScheduler) -> Self {
        self.scheduler = scheduler;
        self
    }

    pub fn client(&self) -> &JobClient<T> {
        &self.client
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        match self.state.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn log(&self, message: impl Into<String>) {
        let message = message.into();
        info!(target: "hal_overlay::activity", "{message}");
        self.state().log.push(format!("[{}] {message}", clock_hms()));
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Queries the health endpoint and picks a model version. Falls back to
    /// the configured offline catalog on any failure.
    pub async fn load_models(&self) -> ModelCatalog {
        if !self.client.credential().is_present() {
            return self.state().catalog.clone();
        }
        self.log("Fetching available models...");

        let catalog = match self.client.health().await {
            Ok(health) => {
                let catalog = ModelCatalog::from_health(&self.cfg.models, &health);
                if health.endpoints.is_empty() {
                    self.log("Health check returned no models; using defaults");
                } else {
                    self.log(format!("Available models loaded. Using {}", catalog.selected));
                }
                catalog
            }
            Err(err) => {
                self.log(format!("Health check error: {err}"));
                ModelCatalog::fallback(&self.cfg.models)
            }
        };

        let mut st = self.state();
        st.version = catalog.selected.clone();
        st.catalog = catalog.clone();
        catalog
    }

    pub fn select_version(&self, version: impl Into<String>) {
        let version = version.into();
        self.state().version = version.clone();
        self.log(format!("Model version selected: {version}"));
    }

    /// Replaces the selected video and discards the current job and result.
    pub fn select_video(&self, video: VideoFile) -> Result<(), SessionError> {
        if self.is_busy() {
            return Err(SessionError::Busy);
        }
        let name = video.name.clone();
        {
            let mut st = self.state();
            st.messages = StatusMessages {
                upload: format!(
                    "Selected: {} ({:.2} MB). Ready for upload.",
                    video.name,
                    video.size_mb()
                ),
                status: "Video file selected.".into(),
                download: "Waiting...".into(),
            };
            st.video = Some(video);
            st.job = None;
            st.result = None;
            st.view = None;
        }
        self.log(format!("Video selected: {name}"));
        Ok(())
    }

    pub fn select_video_file(&self, path: &Path) -> Result<(), SessionError> {
        let video = VideoFile::open(path)?;
        self.select_video(video)
    }

    /// Upload the selected video, poll until done, download and apply.
    ///
    /// A failure stops the sequence where it happened and leaves any
    /// previously applied result in place.
    pub async fn upload_and_process(
        &self,
        cancel: &CancellationToken,
    ) -> Result<RunOutcome, SessionError> {
        let (video, version) = {
            let st = self.state();
            (st.video.clone(), st.version.clone())
        };
        let Some(video) = video.filter(|_| self.client.credential().is_present()) else {
            self.log("Upload requires video and API key");
            return Err(match self.client.credential().require() {
                Err(err) => err.into(),
                Ok(_) => SessionError::NoVideo,
            });
        };
        let _flight = FlightGuard::acquire(&self.in_flight).ok_or(SessionError::Busy)?;

        {
            let mut st = self.state();
            st.job = None;
            st.messages.upload = "Starting upload...".into();
            st.messages.status = "Uploading video...".into();
            st.messages.download = "Awaiting processing...".into();
        }
        self.log("Upload process started");

        match self.run_sequence(&video, &version, cancel).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                {
                    let mut st = self.state();
                    st.messages.upload = format!("Error: {err}");
                    if let Some(job) = st.job.as_mut().filter(|j| !j.is_terminal()) {
                        job.phase = JobPhase::Failed;
                    }
                }
                warn!("upload sequence failed: {err}");
                self.log(format!("Upload/processing error: {err}"));
                Err(err.into())
            }
        }
    }

    async fn run_sequence(
        &self,
        video: &VideoFile,
        version: &str,
        cancel: &CancellationToken,
    ) -> Result<RunOutcome, JobError> {
        let slot = cancellable(cancel, self.client.reserve_slot(version)).await?;
        self.state().job = Some(Job::new(&slot.guid, version));
        cancellable(cancel, self.client.transfer(&slot, video)).await?;

        let guid = slot.guid;
        {
            let mut st = self.state();
            if let Some(job) = st.job.as_mut() {
                job.phase = JobPhase::Processing;
            }
            st.messages.upload = format!("Video uploaded. GUID: {guid}");
            st.messages.status = "Processing started...".into();
        }
        self.log(format!("Upload complete. GUID: {guid}"));
        self.log("Starting status polling");

        let poll = self
            .scheduler
            .run(&self.client, &guid, cancel, |status, attempt| {
                self.state().messages.status = format!("Status: {status} (Check #{attempt})");
                self.log(format!("Status check #{attempt}: {status}"));
            })
            .await?;

        {
            let mut st = self.state();
            if let Some(job) = st.job.as_mut() {
                job.phase = JobPhase::Downloading;
            }
            st.messages.status = "Processing complete".into();
            st.messages.download = "Downloading results...".into();
        }
        self.log("Processing complete. Fetching results");

        let result = cancellable(cancel, self.client.fetch_result(&guid)).await?;
        let (result, view) = self.apply_result(result);

        if let Some(job) = self.state().job.as_mut() {
            job.phase = JobPhase::Complete;
        }

        Ok(RunOutcome {
            guid,
            version: version.to_string(),
            poll,
            result,
            view,
        })
    }

    /// Downloads and applies the result of an earlier job by GUID.
    pub async fn visualize_previous(
        &self,
        guid: &str,
        cancel: &CancellationToken,
    ) -> Result<(Arc<InferenceResult>, ResultView), SessionError> {
        let guid = guid.trim();
        if guid.is_empty() {
            self.log("Visualization cancelled: No UID provided");
            return Err(SessionError::NoGuid);
        }
        self.client.credential().require()?;
        let _flight = FlightGuard::acquire(&self.in_flight).ok_or(SessionError::Busy)?;

        {
            let mut st = self.state();
            st.messages.upload = "Fetching results from the service...".into();
            st.messages.status = "Downloading from previous run...".into();
            st.messages.download = "Loading results...".into();
        }
        self.log(format!("Visualizing previous run: {guid}"));

        match cancellable(cancel, self.client.fetch_result(guid)).await {
            Ok(result) => Ok(self.apply_result(result)),
            Err(err) => {
                {
                    let mut st = self.state();
                    st.messages.upload = format!("Error: {err}");
                    st.messages.status = "Visualization failed".into();
                    st.messages.download = format!("Error: {err}");
                }
                self.log(format!("Visualization error: {err}"));
                Err(err.into())
            }
        }
    }

    /// Stores `result` as the current snapshot and builds its display state.
    /// A result with no subjects is a valid "no subject data" state.
    pub fn apply_result(&self, result: InferenceResult) -> (Arc<InferenceResult>, ResultView) {
        let view = build_view(&self.cfg.display, &result);
        let result = Arc::new(result);
        {
            let mut st = self.state();
            st.messages.download = view.message().to_string();
            st.result = Some(result.clone());
            st.view = Some(view.clone());
        }
        if view.has_subject() {
            self.log(format!("Results applied. Version: {}", result.version));
        } else {
            self.log("Results missing subject data");
        }
        (result, view)
    }

    pub fn messages(&self) -> StatusMessages {
        self.state().messages.clone()
    }

    pub fn log_entries(&self) -> Vec<String> {
        self.state().log.clone()
    }

    pub fn job(&self) -> Option<Job> {
        self.state().job.clone()
    }

    pub fn result(&self) -> Option<Arc<InferenceResult>> {
        self.state().result.clone()
    }

    pub fn view(&self) -> Option<ResultView> {
        self.state().view.clone()
    }

    pub fn version(&self) -> String {
        self.state().version.clone()
    }

    pub fn catalog(&self) -> ModelCatalog {
        self.state().catalog.clone()
    }
}

/// Holds the single-flight flag; releasing happens on drop, including when
/// the owning future is dropped mid-sequence.
struct FlightGuard<'a>(&'a AtomicBool);

impl<'a> FlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

async fn cancellable<R>(
    cancel: &CancellationToken,
    fut: impl Future<Output = Result<R, JobError>>,
) -> Result<R, JobError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(JobError::Cancelled),
        r = fut => r,
    }
}

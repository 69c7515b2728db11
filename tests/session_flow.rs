mod common;

use common::{http, ok, status, FakeTransport, GUID};
use hal_overlay::{
    config::Config,
    display::NO_SUBJECT_MESSAGE,
    error::{JobError, SessionError},
    job::{Job, JobPhase, VideoFile},
    poll::PollingScheduler,
    session::Session,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn session(transport: FakeTransport) -> Session<FakeTransport> {
    Session::new(&Config::default(), common::client(transport))
}

fn video() -> VideoFile {
    VideoFile::new("lift.mp4", vec![7u8; 2048])
}

fn logged(s: &Session<FakeTransport>, needle: &str) -> bool {
    s.log_entries().iter().any(|e| e.contains(needle))
}

#[tokio::test(start_paused = true)]
async fn submit_poll_fetch_apply() {
    let s = session(FakeTransport::new(&["processing", "done"], common::result_json()));
    s.select_video(video()).unwrap();

    let outcome = s.upload_and_process(&CancellationToken::new()).await.unwrap();

    assert_eq!(outcome.guid, GUID);
    assert_eq!(outcome.poll.attempts, 2);
    assert!(outcome.view.has_subject());

    let t = s.client().transport();
    assert_eq!(t.count("status"), 2);
    assert_eq!(t.count("download"), 1);
    assert_eq!(t.count("get"), 1);
    let download = t.calls().into_iter().find(|c| c.op == "download").unwrap();
    assert_eq!(download.arg, GUID);

    let job = s.job().unwrap();
    assert_eq!(job.phase, JobPhase::Complete);
    assert!(job.is_terminal());
    assert!(Arc::ptr_eq(&s.result().unwrap(), &outcome.result));
    assert!(s.view().unwrap().has_subject());
    assert!(s.messages().download.starts_with("Results ready (0.6.0)"));
    assert!(logged(&s, "Upload complete. GUID: guid-123"));
    assert!(logged(&s, "Status check #1: processing"));
    assert!(logged(&s, "Results applied. Version: 0.6.0"));
    assert!(!s.is_busy());
}

#[tokio::test]
async fn initial_messages_reflect_credential() {
    let s = session(FakeTransport::new(&["done"], common::result_json()));
    let m = s.messages();
    assert!(m.upload.starts_with("API key set."));
    assert_eq!(m.status, "No updates yet.");
    assert_eq!(m.download, "Waiting...");

    let anon = Session::new(
        &Config::default(),
        common::anonymous_client(FakeTransport::new(&["done"], common::result_json())),
    );
    assert_eq!(anon.messages().upload, "No API key provided. Features will be limited.");
}

#[tokio::test]
async fn upload_requires_credential_then_video() {
    let anon = Session::new(
        &Config::default(),
        common::anonymous_client(FakeTransport::new(&["done"], common::result_json())),
    );
    anon.select_video(video()).unwrap();
    let err = anon.upload_and_process(&CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, SessionError::Job(JobError::NoCredential)));
    assert!(anon.client().transport().calls().is_empty());

    let s = session(FakeTransport::new(&["done"], common::result_json()));
    let err = s.upload_and_process(&CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, SessionError::NoVideo));
    assert!(s.client().transport().calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn failure_keeps_previous_result() {
    let transport = FakeTransport::new(&["processing"], common::result_json());
    transport.edit(|sc| sc.statuses = [status("processing"), http(502, "bad gateway")].into());
    let s = session(transport);
    s.select_video(video()).unwrap();
    let (previous, _) = s.apply_result(common::sample_result());

    let err = s.upload_and_process(&CancellationToken::new()).await.unwrap_err();

    assert!(matches!(
        err,
        SessionError::Job(JobError::RequestFailed { status: Some(502), .. })
    ));
    assert!(Arc::ptr_eq(&s.result().unwrap(), &previous));
    assert_eq!(s.job().unwrap().phase, JobPhase::Failed);
    assert!(s.messages().upload.starts_with("Error: status check failed"));
    assert!(logged(&s, "Upload/processing error:"));
    assert_eq!(s.client().transport().count("download"), 0);
}

#[tokio::test(start_paused = true)]
async fn second_sequence_is_refused_while_one_is_in_flight() {
    let s = session(FakeTransport::new(&["processing", "done"], common::result_json()));
    s.select_video(video()).unwrap();
    let cancel = CancellationToken::new();

    let (first, second, reselect) = tokio::join!(
        s.upload_and_process(&cancel),
        s.upload_and_process(&cancel),
        async { s.select_video(video()) },
    );

    assert!(first.is_ok());
    assert!(matches!(second, Err(SessionError::Busy)));
    assert!(matches!(reselect, Err(SessionError::Busy)));
    assert_eq!(s.client().transport().count("upload"), 1);
}

#[tokio::test(start_paused = true)]
async fn cancellation_releases_the_flight_guard() {
    let s = session(FakeTransport::new(&["processing"], common::result_json()));
    s.select_video(video()).unwrap();
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(100)).await;
        trigger.cancel();
    });

    let err = s.upload_and_process(&cancel).await.unwrap_err();

    assert!(matches!(err, SessionError::Job(JobError::Cancelled)));
    assert!(!s.is_busy());
    assert_eq!(s.client().transport().count("status"), 3);
}

#[tokio::test(start_paused = true)]
async fn empty_subjects_apply_as_no_subject_state() {
    let s = session(FakeTransport::new(
        &["done"],
        json!({ "version": "0.6.0", "subjects": [] }),
    ));
    s.select_video(video()).unwrap();

    let outcome = s.upload_and_process(&CancellationToken::new()).await.unwrap();

    assert!(!outcome.view.has_subject());
    assert_eq!(s.messages().download, NO_SUBJECT_MESSAGE);
    assert!(logged(&s, "Results missing subject data"));
}

#[tokio::test]
async fn visualize_previous_fetches_without_upload() {
    let s = session(FakeTransport::new(&["done"], common::result_json()));

    let err = s.visualize_previous("  ", &CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, SessionError::NoGuid));

    let (result, view) = s
        .visualize_previous(" old-guid ", &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(result.version, "0.6.0");
    assert!(view.has_subject());
    assert!(logged(&s, "Visualizing previous run: old-guid"));

    let t = s.client().transport();
    assert_eq!(t.count("upload"), 0);
    assert_eq!(t.count("status"), 0);
    assert_eq!(t.calls()[0].arg, "old-guid");
}

#[tokio::test]
async fn visualize_failure_is_reported() {
    let transport = FakeTransport::new(&["done"], common::result_json());
    transport.edit(|sc| sc.download = http(404, "unknown guid"));
    let s = session(transport);

    let err = s.visualize_previous("gone", &CancellationToken::new()).await.unwrap_err();

    assert!(err.to_string().contains("unknown guid"));
    assert!(s.messages().download.starts_with("Error:"));
    assert!(logged(&s, "Visualization error:"));
    assert!(s.result().is_none());
}

#[tokio::test]
async fn load_models_picks_preferred_or_falls_back() {
    let transport = FakeTransport::new(&["done"], common::result_json());
    transport.edit(|sc| {
        sc.health = ok(json!({ "endpoints": [
            { "version": "0.6.0", "endpoint_status": "Updating", "num_endpoint_instances": 0 },
            { "version": "0.5.1", "endpoint_status": "InService", "num_endpoint_instances": 1 }
        ]}))
    });
    let s = session(transport);
    assert_eq!(s.load_models().await.selected, "0.5.1");
    assert_eq!(s.version(), "0.5.1");
    assert_eq!(s.catalog().selected, "0.5.1");

    let broken = FakeTransport::new(&["done"], common::result_json());
    broken.edit(|sc| sc.health = Err("dns failure".into()));
    let s = session(broken);
    let catalog = s.load_models().await;
    assert_eq!(catalog.selected, "0.6.0");
    assert!(catalog.models.iter().all(|m| m.offline));
    assert!(logged(&s, "Health check error"));

    let anon = Session::new(
        &Config::default(),
        common::anonymous_client(FakeTransport::new(&["done"], common::result_json())),
    );
    assert_eq!(anon.load_models().await.selected, "0.6.0");
    assert!(anon.client().transport().calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn selected_version_is_sent_with_upload() {
    let s = session(FakeTransport::new(&["done"], common::result_json()));
    s.select_version("0.4.3");
    s.select_video(video()).unwrap();

    let outcome = s.upload_and_process(&CancellationToken::new()).await.unwrap();

    assert_eq!(outcome.version, "0.4.3");
    let upload = s.client().transport().calls().into_iter().find(|c| c.op == "upload").unwrap();
    assert!(upload.arg.ends_with("@0.4.3"));
}

#[test]
fn select_video_file_reads_bytes_and_name() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("clip.mp4");
    std::fs::write(&path, [1u8, 2, 3]).unwrap();
    let s = session(FakeTransport::new(&["done"], common::result_json()));

    s.select_video_file(&path).unwrap();
    assert!(s.messages().upload.starts_with("Selected: clip.mp4"));

    let err = s.select_video_file(&dir.path().join("missing.mp4")).unwrap_err();
    assert!(matches!(err, SessionError::Io(_)));
}

#[tokio::test]
async fn job_is_recorded_before_the_transfer() {
    let fresh = Job::new(GUID, "0.6.0");
    assert_eq!(fresh.phase, JobPhase::Uploading);
    assert!(!fresh.is_terminal());

    let transport = FakeTransport::new(&["done"], common::result_json());
    transport.edit(|sc| sc.put = http(403, "expired signature"));
    let s = session(transport);
    s.select_video(video()).unwrap();

    let err = s.upload_and_process(&CancellationToken::new()).await.unwrap_err();

    assert!(matches!(
        err,
        SessionError::Job(JobError::RequestFailed { status: Some(403), .. })
    ));
    let job = s.job().unwrap();
    assert_eq!(job.guid, GUID);
    assert_eq!(job.phase, JobPhase::Failed);
    assert_eq!(s.client().transport().count("status"), 0);
}

#[tokio::test(start_paused = true)]
async fn custom_scheduler_bounds_the_poll() {
    let scheduler = PollingScheduler {
        max_attempts: 2,
        interval: Duration::from_millis(10),
        done_status: "done".into(),
    };
    let s = session(FakeTransport::new(&["processing"], common::result_json()))
        .with_scheduler(scheduler);
    s.select_video(video()).unwrap();

    let err = s.upload_and_process(&CancellationToken::new()).await.unwrap_err();

    assert!(matches!(err, SessionError::Job(JobError::Timeout { attempts: 2 })));
    assert_eq!(s.client().transport().count("status"), 2);
    assert_eq!(s.job().unwrap().phase, JobPhase::Failed);
}

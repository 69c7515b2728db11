#![allow(dead_code)]

use anyhow::{anyhow, Result};
use hal_overlay::{
    client::{JobClient, RawResponse, Transport},
    config::Config,
    credential::Credential,
    result::InferenceResult,
};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Mutex;

pub const KEY: &str = "test-key";
pub const GUID: &str = "guid-123";
pub const UPLOAD_URL: &str = "https://bucket.example.test/put?sig=1";
pub const RESULT_URL: &str = "https://bucket.example.test/get?sig=2";

/// `Err` stands for "no response at all".
pub type Reply = std::result::Result<RawResponse, String>;

#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub op: &'static str,
    pub credential: Option<String>,
    pub arg: String,
}

pub struct Script {
    pub health: Reply,
    pub upload: Reply,
    pub put: Reply,
    /// Consumed one per status call; the last entry repeats once exhausted.
    pub statuses: VecDeque<Reply>,
    pub download: Reply,
    pub object: Reply,
}

/// In-memory transport returning scripted replies and recording every call.
pub struct FakeTransport {
    script: Mutex<Script>,
    calls: Mutex<Vec<Call>>,
}

pub fn ok(body: Value) -> Reply {
    Ok(RawResponse::new(200, body.to_string()))
}

pub fn status(s: &str) -> Reply {
    ok(json!({ "status": s }))
}

pub fn http(code: u16, body: &str) -> Reply {
    Ok(RawResponse::new(code, body))
}

impl FakeTransport {
    /// A service that accepts the upload, reports `statuses` in order and
    /// serves `result` as the result document.
    pub fn new(statuses: &[&str], result: Value) -> Self {
        Self::with_script(Script {
            health: ok(json!({ "endpoints": [] })),
            upload: ok(json!({ "guid": GUID, "presigned_url": UPLOAD_URL })),
            put: ok(json!({})),
            statuses: statuses.iter().map(|s| status(s)).collect(),
            download: ok(json!({ "presigned_url": RESULT_URL })),
            object: ok(result),
        })
    }

    pub fn with_script(script: Script) -> Self {
        Self {
            script: Mutex::new(script),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn edit(&self, f: impl FnOnce(&mut Script)) {
        f(&mut self.script.lock().unwrap());
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, op: &str) -> usize {
        self.calls().iter().filter(|c| c.op == op).count()
    }

    fn record(&self, op: &'static str, credential: Option<&str>, arg: &str) {
        self.calls.lock().unwrap().push(Call {
            op,
            credential: credential.map(str::to_string),
            arg: arg.to_string(),
        });
    }

    fn reply(&self, pick: impl FnOnce(&mut Script) -> Reply) -> Result<RawResponse> {
        pick(&mut self.script.lock().unwrap()).map_err(|e| anyhow!(e))
    }
}

impl Transport for FakeTransport {
    async fn health(&self, credential: &str) -> Result<RawResponse> {
        self.record("health", Some(credential), "");
        self.reply(|s| s.health.clone())
    }

    async fn request_upload(
        &self,
        credential: &str,
        object_name: &str,
        version: &str,
    ) -> Result<RawResponse> {
        self.record("upload", Some(credential), &format!("{object_name}@{version}"));
        self.reply(|s| s.upload.clone())
    }

    async fn status(&self, credential: &str, guid: &str) -> Result<RawResponse> {
        self.record("status", Some(credential), guid);
        self.reply(|s| {
            if s.statuses.len() > 1 {
                s.statuses.pop_front().unwrap()
            } else {
                s.statuses
                    .front()
                    .cloned()
                    .unwrap_or_else(|| Err("no status scripted".into()))
            }
        })
    }

    async fn request_download(&self, credential: &str, guid: &str) -> Result<RawResponse> {
        self.record("download", Some(credential), guid);
        self.reply(|s| s.download.clone())
    }

    async fn put_object(
        &self,
        target: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<RawResponse> {
        self.record("put", None, &format!("{target} {content_type} {}", bytes.len()));
        self.reply(|s| s.put.clone())
    }

    async fn get_object(&self, target: &str) -> Result<RawResponse> {
        self.record("get", None, target);
        self.reply(|s| s.object.clone())
    }
}

pub fn client(transport: FakeTransport) -> JobClient<FakeTransport> {
    JobClient::new(
        transport,
        Credential::Present(KEY.into()),
        &Config::default().service,
    )
}

pub fn anonymous_client(transport: FakeTransport) -> JobClient<FakeTransport> {
    JobClient::new(transport, Credential::Absent, &Config::default().service)
}

pub fn keys() -> Vec<&'static str> {
    vec![
        "Box_X1",
        "Box_Y1",
        "Box_X2",
        "Box_Y2",
        "X_left_shoulder",
        "Y_left_shoulder",
        "X_left_elbow",
        "Y_left_elbow",
        "X_left_wrist",
        "Y_left_wrist",
        "X_right_shoulder",
        "Y_right_shoulder",
        "X_right_elbow",
        "Y_right_elbow",
        "X_right_wrist",
        "Y_right_wrist",
        "X_left_index_tip",
        "Y_left_index_tip",
        "X_right_thumb_tip",
        "Y_right_thumb_tip",
    ]
}

/// Frames 0 and 30 carry a full pose; frame 30 is keyed as a string with a
/// null right thumb tip.
pub fn result_json() -> Value {
    let full = json!([
        100, 50, 300, 450,
        120, 100, 110, 200, 105, 280,
        280, 100, 290, 200, 295, 280,
        100, 300,
        300, 300
    ]);
    let partial = json!([
        100, 50, 300, 450,
        120, 100, 110, 200, 105, 280,
        280, 100, 290, 200, 295, 280,
        100, 300,
        null, 300
    ]);
    json!({
        "version": "0.6.0",
        "status": "done",
        "warnings": [],
        "video_metadata": { "fps": 30.0, "total_frames": 90, "width": 640, "height": 480 },
        "subjects": [{
            "subject_id": 1,
            "left_prediction": 4.1,
            "left_confidence": 0.77,
            "right_prediction": 7.2,
            "right_confidence": 0.914,
            "right_metrics": { "duty_cycle": 0.52, "frequency_hz": 1.27, "n_reps": 12 },
            "pose_keys": keys(),
            "pose_df": { "0": full, "30": partial }
        }]
    })
}

pub fn sample_result() -> InferenceResult {
    serde_json::from_value(result_json()).unwrap()
}

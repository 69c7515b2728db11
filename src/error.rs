use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Which remote call a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Health,
    Submit,
    Transfer,
    Poll,
    Resolve,
    Fetch,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Health => "health check",
            Stage::Submit => "upload request",
            Stage::Transfer => "video transfer",
            Stage::Poll => "status check",
            Stage::Resolve => "download request",
            Stage::Fetch => "results fetch",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum JobError {
    #[error("{stage} failed: {}{}", status_text(.status), detail_suffix(.detail))]
    RequestFailed {
        stage: Stage,
        status: Option<u16>,
        detail: String,
    },

    #[error("processing timeout after {attempts} status checks")]
    Timeout { attempts: u32 },

    #[error("{stage} response is missing {field}")]
    MissingData { stage: Stage, field: &'static str },

    #[error("{stage} returned an unreadable body: {source}")]
    Decode {
        stage: Stage,
        #[source]
        source: serde_json::Error,
    },

    #[error("no API credential available")]
    NoCredential,

    #[error("cancelled")]
    Cancelled,
}

impl JobError {
    pub fn stage(&self) -> Option<Stage> {
        match self {
            JobError::RequestFailed { stage, .. }
            | JobError::MissingData { stage, .. }
            | JobError::Decode { stage, .. } => Some(*stage),
            JobError::Timeout { .. } => Some(Stage::Poll),
            JobError::NoCredential | JobError::Cancelled => None,
        }
    }
}

fn status_text(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!("HTTP {code}"),
        None => "no response".to_string(),
    }
}

fn detail_suffix(detail: &str) -> String {
    if detail.is_empty() {
        String::new()
    } else {
        format!(" - {detail}")
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("another upload or download is already in progress")]
    Busy,

    #[error("no video selected")]
    NoVideo,

    #[error("no job GUID provided")]
    NoGuid,

    #[error(transparent)]
    Job(#[from] JobError),

    #[error("reading video: {0}")]
    Io(#[from] std::io::Error),
}

use serde::{Deserialize, Serialize};

/// Status code and body of one HTTP exchange, before any interpretation.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).trim().to_string()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadSlot {
    #[serde(default)]
    pub guid: Option<String>,
    #[serde(default)]
    pub presigned_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadTarget {
    #[serde(default)]
    pub presigned_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollStatus {
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub guid: String,
    pub upload_target: String,
    pub object_name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HealthResponse {
    #[serde(default)]
    pub endpoints: Vec<EndpointInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointInfo {
    pub version: String,
    #[serde(default)]
    pub endpoint_status: Option<String>,
    #[serde(default)]
    pub num_endpoint_instances: Option<u32>,
    #[serde(default)]
    pub endpoint_name: Option<String>,
}

use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobPhase {
    Uploading,
    Processing,
    Downloading,
    Complete,
    Failed,
}

/// The one server-side job the session is currently tracking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub guid: String,
    pub version: String,
    pub phase: JobPhase,
}

impl Job {
    /// A job starts once its slot is reserved, before the bytes are sent.
    pub fn new(guid: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            guid: guid.into(),
            version: version.into(),
            phase: JobPhase::Uploading,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.phase, JobPhase::Complete | JobPhase::Failed)
    }
}

/// A video chosen for upload. The bytes are read once at selection time.
#[derive(Clone)]
pub struct VideoFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl VideoFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// Reads the whole file; the name is the final path component.
    pub fn open(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(name, bytes))
    }

    pub fn size_mb(&self) -> f64 {
        self.bytes.len() as f64 / 1024.0 / 1024.0
    }
}

impl std::fmt::Debug for VideoFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoFile")
            .field("name", &self.name)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

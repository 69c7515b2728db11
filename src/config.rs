use crate::overlay::OverlayStyle;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub service: Service,
    #[serde(default)]
    pub polling: Polling,
    #[serde(default)]
    pub models: Models,
    #[serde(default)]
    pub display: Display,
    #[serde(default)]
    pub overlay: Overlay,
    #[serde(default)]
    pub output: Output,
    #[serde(default)]
    pub logging: Logging,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        let cfg: Config = toml::from_str(&raw).with_context(|| "parsing TOML")?;
        Ok(cfg)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Service {
    pub base_url: String,
    /// Deployment stage path segment, e.g. `/upload/<stage>/<name>`.
    pub stage: String,
    pub api_key_env: String,
    pub request_timeout_seconds: u64,
    pub object_prefix: String,
    pub object_extension: String,
    pub content_type: String,
}
impl Default for Service {
    fn default() -> Self {
        Self {
            base_url: "https://ue7v1pazxb.execute-api.us-west-2.amazonaws.com".into(),
            stage: "dev".into(),
            api_key_env: "HAL_API_KEY".into(),
            request_timeout_seconds: 120,
            object_prefix: "web_upload_".into(),
            object_extension: "mp4".into(),
            content_type: "video/mp4".into(),
        }
    }
}

impl Service {
    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_seconds > 0).then(|| Duration::from_secs(self.request_timeout_seconds))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Polling {
    pub max_attempts: u32,
    pub interval_ms: u64,
    pub done_status: String,
}
impl Default for Polling {
    fn default() -> Self {
        Self {
            max_attempts: 60,
            interval_ms: 30_000,
            done_status: "done".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Models {
    pub default_version: String,
    /// Shown (as offline) when the health endpoint is unreachable or empty.
    pub fallback_versions: Vec<String>,
    pub in_service_status: String,
}
impl Default for Models {
    fn default() -> Self {
        Self {
            default_version: "0.6.0".into(),
            fallback_versions: vec!["0.6.0".into(), "0.5.1".into(), "0.4.3".into()],
            in_service_status: "InService".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Display {
    pub exceed_threshold: f64,
    pub warning_separator: String,
}
impl Default for Display {
    fn default() -> Self {
        Self {
            exceed_threshold: 6.5,
            warning_separator: " | ".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Overlay {
    pub default_fps: f64,
    pub refresh_hz: u32,
    pub display_width: f64,
    pub display_height: f64,
    pub style: OverlayStyle,
}
impl Default for Overlay {
    fn default() -> Self {
        Self {
            default_fps: 30.0,
            refresh_hz: 60,
            display_width: 1280.0,
            display_height: 720.0,
            style: OverlayStyle::default(),
        }
    }
}

impl Overlay {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.refresh_hz.max(1)))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Output {
    pub out_dir: String,
    pub write_result_json: bool,
    pub result_filename: String,
    pub write_index_json: bool,
    pub print_summary: bool,
}
impl Default for Output {
    fn default() -> Self {
        Self {
            out_dir: "out".into(),
            write_result_json: true,
            result_filename: "result.json".into(),
            write_index_json: true,
            print_summary: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Logging {
    pub level: String,
    pub json: bool,
    pub write_to_file: bool,
    pub file_path: String,
}
impl Default for Logging {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
            write_to_file: false,
            file_path: "".into(),
        }
    }
}

use crate::{
    config,
    result::{InferenceResult, SideMetrics, Subject, VideoMetadata},
};
use serde::Serialize;

pub const NO_SUBJECT_MESSAGE: &str = "No subject data found in results";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Right,
    Left,
}

impl Side {
    pub fn label(self) -> &'static str {
        match self {
            Side::Right => "Right",
            Side::Left => "Left",
        }
    }
}

/// What the shell shows for one applied result.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ResultView {
    NoSubject { message: String },
    Ready(ResultSummary),
}

impl ResultView {
    pub fn message(&self) -> &str {
        match self {
            ResultView::NoSubject { message } => message,
            ResultView::Ready(summary) => &summary.message,
        }
    }

    pub fn has_subject(&self) -> bool {
        matches!(self, ResultView::Ready(_))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ResultSummary {
    pub version: String,
    pub message: String,
    pub right: SideCard,
    pub left: SideCard,
    pub metadata: Option<MetadataSummary>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SideCard {
    pub side: Side,
    pub label: String,
    pub prediction: Option<f64>,
    pub confidence: String,
    pub reps: u32,
    pub duty_cycle: f64,
    pub frequency_hz: f64,
    pub exceeds_threshold: bool,
    pub verdict: &'static str,
    pub subtitle: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetadataSummary {
    pub resolution: String,
    pub fps: String,
    pub total_frames: u64,
    pub version: String,
}

pub fn build_view(cfg: &config::Display, result: &InferenceResult) -> ResultView {
    let Some(subject) = result.active_subject() else {
        return ResultView::NoSubject {
            message: with_warnings(cfg, NO_SUBJECT_MESSAGE.to_string(), &result.warnings),
        };
    };

    let right = side_card(cfg, subject, Side::Right);
    let left = side_card(cfg, subject, Side::Left);

    let base = format!(
        "Results ready ({})\nRight: HAL={} ({})\nLeft: HAL={} ({})",
        result.version,
        prediction_text(right.prediction),
        right.confidence,
        prediction_text(left.prediction),
        left.confidence
    );

    ResultView::Ready(ResultSummary {
        version: result.version.clone(),
        message: with_warnings(cfg, base, &result.warnings),
        right,
        left,
        metadata: result
            .video_metadata
            .as_ref()
            .map(|m| metadata_summary(m, &result.version)),
        warnings: result.warnings.clone(),
    })
}

/// `round(value * 100)` as a percentage; a missing value reads as 0%.
pub fn format_confidence(value: Option<f64>) -> String {
    let v = value.filter(|v| v.is_finite()).unwrap_or(0.0);
    format!("{}%", (v * 100.0).round() as i64)
}

/// Strictly greater than the threshold; a missing prediction never exceeds it.
pub fn exceeds_threshold(prediction: Option<f64>, threshold: f64) -> bool {
    prediction.is_some_and(|p| p > threshold)
}

fn side_card(cfg: &config::Display, subject: &Subject, side: Side) -> SideCard {
    let (prediction, confidence, metrics) = match side {
        Side::Right => (
            subject.right_prediction,
            subject.right_confidence,
            subject.right_metrics.as_ref(),
        ),
        Side::Left => (
            subject.left_prediction,
            subject.left_confidence,
            subject.left_metrics.as_ref(),
        ),
    };
    let metrics = metrics.cloned().unwrap_or_else(SideMetrics::default);
    let exceeds = exceeds_threshold(prediction, cfg.exceed_threshold);
    let confidence = format_confidence(confidence);

    SideCard {
        side,
        label: format!("{} HAL", side.label()),
        prediction,
        subtitle: format!(
            "Confidence: {} | {} reps | DC: {:.1} | Freq: {:.1} Hz",
            confidence, metrics.n_reps, metrics.duty_cycle, metrics.frequency_hz
        ),
        confidence,
        reps: metrics.n_reps,
        duty_cycle: metrics.duty_cycle,
        frequency_hz: metrics.frequency_hz,
        exceeds_threshold: exceeds,
        verdict: if exceeds { "EXCEEDS TLV" } else { "SAFE" },
    }
}

fn metadata_summary(meta: &VideoMetadata, version: &str) -> MetadataSummary {
    MetadataSummary {
        resolution: format!("{} × {}", or_na(meta.width), or_na(meta.height)),
        fps: meta
            .fps
            .map(|f| format!("{f:.2}"))
            .unwrap_or_else(|| "N/A".into()),
        total_frames: meta.total_frames,
        version: version.to_string(),
    }
}

fn or_na(v: Option<u32>) -> String {
    v.map(|v| v.to_string()).unwrap_or_else(|| "N/A".into())
}

fn prediction_text(p: Option<f64>) -> String {
    p.map(|v| v.to_string()).unwrap_or_else(|| "N/A".into())
}

fn with_warnings(cfg: &config::Display, base: String, warnings: &[String]) -> String {
    if warnings.is_empty() {
        return base;
    }
    format!("{base}\n⚠️ {}", warnings.join(&cfg.warning_separator))
}

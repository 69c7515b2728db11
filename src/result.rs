//! Inference result document returned by the service for one job.
//!
//! Everything here is an immutable snapshot: the session stores it behind an
//! `Arc` and the overlay only reads it.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InferenceResult {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub video_metadata: Option<VideoMetadata>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub subjects: Vec<Subject>,
}

impl InferenceResult {
    /// Only the first subject is displayed; further tracks are ignored.
    pub fn active_subject(&self) -> Option<&Subject> {
        self.subjects.first()
    }
}

/// Every field may be absent; consumers fall back per field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoMetadata {
    #[serde(default)]
    pub fps: Option<f64>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub total_frames: u64,
    #[serde(default, deserialize_with = "lenient_opt_int")]
    pub width: Option<u32>,
    #[serde(default, deserialize_with = "lenient_opt_int")]
    pub height: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Subject {
    #[serde(default, deserialize_with = "lenient_opt_int")]
    pub subject_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_opt_int")]
    pub track_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_opt_int")]
    pub track_length: Option<u64>,
    #[serde(default)]
    pub left_prediction: Option<f64>,
    #[serde(default)]
    pub left_confidence: Option<f64>,
    #[serde(default)]
    pub right_prediction: Option<f64>,
    #[serde(default)]
    pub right_confidence: Option<f64>,
    #[serde(default)]
    pub left_metrics: Option<SideMetrics>,
    #[serde(default)]
    pub right_metrics: Option<SideMetrics>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub pose_keys: Vec<String>,
    #[serde(default, rename = "pose_df")]
    pub pose_table: PoseTable,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SideMetrics {
    #[serde(default)]
    pub hal_score: Option<f64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub duty_cycle: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub frequency_hz: f64,
    #[serde(default, deserialize_with = "lenient_int")]
    pub n_reps: u32,
    #[serde(default)]
    pub dominant_freq: Option<f64>,
}

/// One pose-table row; non-numeric (null) cells are stored as NaN.
pub type PoseRow = Vec<f64>;

/// Reference to a frame in the pose table, either numeric or as the textual
/// key the service serialized it with.
#[derive(Debug, Clone, Copy)]
pub enum FrameKey<'a> {
    Index(u64),
    Text(&'a str),
}

impl From<u64> for FrameKey<'_> {
    fn from(v: u64) -> Self {
        FrameKey::Index(v)
    }
}

impl<'a> From<&'a str> for FrameKey<'a> {
    fn from(v: &'a str) -> Self {
        FrameKey::Text(v)
    }
}

/// Sparse, frame-indexed pose dataset.
///
/// Upstream emits the frame index sometimes as an integer and sometimes as a
/// string; both forms must resolve to the same row. Keys that parse as a
/// frame number are indexed numerically, anything else is kept verbatim.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PoseTable {
    indexed: BTreeMap<u64, PoseRow>,
    other: BTreeMap<String, PoseRow>,
}

impl PoseTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<'a>(&mut self, key: impl Into<FrameKey<'a>>, row: PoseRow) {
        match key.into() {
            FrameKey::Index(i) => {
                self.indexed.insert(i, row);
            }
            FrameKey::Text(s) => match parse_frame_key(s) {
                Some(i) => {
                    self.indexed.insert(i, row);
                }
                None => {
                    self.other.insert(s.to_string(), row);
                }
            },
        }
    }

    pub fn row<'a>(&self, key: impl Into<FrameKey<'a>>) -> Option<&PoseRow> {
        match key.into() {
            FrameKey::Index(i) => self
                .indexed
                .get(&i)
                .or_else(|| self.other.get(&i.to_string())),
            FrameKey::Text(s) => match parse_frame_key(s) {
                Some(i) => self.indexed.get(&i),
                None => self.other.get(s),
            },
        }
    }

    pub fn len(&self) -> usize {
        self.indexed.len() + self.other.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn frames(&self) -> impl Iterator<Item = u64> + '_ {
        self.indexed.keys().copied()
    }
}

fn parse_frame_key(s: &str) -> Option<u64> {
    let s = s.trim();
    if let Ok(i) = s.parse::<u64>() {
        return Some(i);
    }
    // "30.0" style keys from float-typed indices
    let f = s.parse::<f64>().ok()?;
    (f.is_finite() && f >= 0.0 && f.fract() == 0.0).then_some(f as u64)
}

impl Serialize for PoseTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (k, row) in &self.indexed {
            map.serialize_entry(&k.to_string(), &nan_as_null(row))?;
        }
        for (k, row) in &self.other {
            map.serialize_entry(k, &nan_as_null(row))?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for PoseTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw: Option<BTreeMap<String, Vec<Option<f64>>>> = Option::deserialize(deserializer)?;
        let mut table = PoseTable::new();
        for (k, cells) in raw.unwrap_or_default() {
            let row = cells.into_iter().map(|c| c.unwrap_or(f64::NAN)).collect();
            table.insert(k.as_str(), row);
        }
        Ok(table)
    }
}

fn nan_as_null(row: &[f64]) -> Vec<Option<f64>> {
    row.iter()
        .map(|v| if v.is_finite() { Some(*v) } else { None })
        .collect()
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A JSON number as the service may send it: counts sometimes arrive as
/// floats (`12.0`).
#[derive(Deserialize)]
#[serde(untagged)]
enum Numeric {
    Int(i64),
    Float(f64),
}

impl Numeric {
    /// Integral values only; `12.5`, NaN and out-of-range values are `None`.
    fn integral<T: TryFrom<i64>>(self) -> Option<T> {
        let i = match self {
            Numeric::Int(i) => i,
            Numeric::Float(f) if f.is_finite() && f.fract() == 0.0 => {
                if f < i64::MIN as f64 || f > i64::MAX as f64 {
                    return None;
                }
                f as i64
            }
            Numeric::Float(_) => return None,
        };
        T::try_from(i).ok()
    }
}

/// Null, non-integral or out-of-range numbers read as absent.
fn lenient_opt_int<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<i64>,
{
    Ok(Option::<Numeric>::deserialize(deserializer)?.and_then(Numeric::integral))
}

fn lenient_int<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<i64> + Default,
{
    Ok(lenient_opt_int(deserializer)?.unwrap_or_default())
}

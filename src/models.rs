use crate::{client::HealthResponse, config};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub version: String,
    pub status: String,
    pub instances: u32,
    pub endpoint_name: String,
    pub offline: bool,
}

impl ModelInfo {
    pub fn is_available(&self, in_service_status: &str) -> bool {
        !self.offline && self.status == in_service_status && self.instances > 0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelCatalog {
    pub models: Vec<ModelInfo>,
    pub selected: String,
}

impl ModelCatalog {
    /// Offline placeholders used until (or instead of) a health response.
    pub fn fallback(cfg: &config::Models) -> Self {
        let models = cfg
            .fallback_versions
            .iter()
            .map(|v| ModelInfo {
                version: v.clone(),
                status: "Offline".into(),
                instances: 0,
                endpoint_name: String::new(),
                offline: true,
            })
            .collect();
        Self {
            models,
            selected: cfg.default_version.clone(),
        }
    }

    /// Newest first. Prefers the first in-service model with instances, then
    /// the newest listed; an empty response yields the fallback catalog.
    pub fn from_health(cfg: &config::Models, health: &HealthResponse) -> Self {
        let mut models: Vec<ModelInfo> = health
            .endpoints
            .iter()
            .map(|ep| ModelInfo {
                version: ep.version.clone(),
                status: ep
                    .endpoint_status
                    .clone()
                    .unwrap_or_else(|| "Unknown".into()),
                instances: ep.num_endpoint_instances.unwrap_or(0),
                endpoint_name: ep.endpoint_name.clone().unwrap_or_default(),
                offline: false,
            })
            .collect();

        if models.is_empty() {
            return Self::fallback(cfg);
        }

        models.sort_by(|a, b| compare_versions(&b.version, &a.version));

        let selected = models
            .iter()
            .find(|m| m.is_available(&cfg.in_service_status))
            .unwrap_or(&models[0])
            .version
            .clone();

        Self { models, selected }
    }
}

/// Numeric-aware comparison: "0.10.0" sorts after "0.9.1".
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let mut xs = split_runs(a).into_iter();
    let mut ys = split_runs(b).into_iter();
    loop {
        match (xs.next(), ys.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let ord = match (x.parse::<u64>(), y.parse::<u64>()) {
                    (Ok(n), Ok(m)) => n.cmp(&m),
                    _ => x.cmp(y),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}

fn split_runs(s: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut prev_digit: Option<bool> = None;
    for (i, c) in s.char_indices() {
        let digit = c.is_ascii_digit();
        if prev_digit.is_some_and(|p| p != digit) {
            out.push(&s[start..i]);
            start = i;
        }
        prev_digit = Some(digit);
    }
    if start < s.len() {
        out.push(&s[start..]);
    }
    out
}

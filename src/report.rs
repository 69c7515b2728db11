use crate::{display::ResultView, session::RunOutcome};
use serde::{Deserialize, Serialize};

/// Written next to `result.json` as `index.json` for every completed run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub guid: String,
    pub version: String,
    pub input: InputReport,
    pub started: String,
    pub finished: String,
    pub poll_attempts: Option<u32>,
    pub subject_found: bool,
    pub warnings: Vec<String>,
    pub result_file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputReport {
    pub name: String,
    pub bytes: u64,
    pub sha256: String,
}

impl RunReport {
    pub fn from_outcome(
        outcome: &RunOutcome,
        input: InputReport,
        started: String,
        finished: String,
        result_file: Option<String>,
    ) -> Self {
        Self {
            guid: outcome.guid.clone(),
            version: outcome.version.clone(),
            input,
            started,
            finished,
            poll_attempts: Some(outcome.poll.attempts),
            subject_found: outcome.view.has_subject(),
            warnings: warnings(&outcome.view, &outcome.result.warnings),
            result_file,
        }
    }
}

fn warnings(view: &ResultView, raw: &[String]) -> Vec<String> {
    match view {
        ResultView::Ready(summary) => summary.warnings.clone(),
        ResultView::NoSubject { .. } => raw.to_vec(),
    }
}

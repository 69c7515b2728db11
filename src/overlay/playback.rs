use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    #[default]
    Idle,
    Playing,
    Paused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackEvent {
    Play,
    Pause,
    Ended,
    Seeked,
    /// The video element went away.
    Detached,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopAction {
    /// Cancel any running loop, then start a fresh one.
    StartLoop,
    StopLoop,
    RedrawOnce,
}

/// Video element events folded into loop start/stop/redraw actions.
#[derive(Debug, Clone, Default)]
pub struct PlaybackMachine {
    state: PlaybackState,
}

impl PlaybackMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Applies `event` and returns the actions to run, in order.
    pub fn transition(&mut self, event: PlaybackEvent) -> Vec<LoopAction> {
        use LoopAction::*;
        use PlaybackState::*;

        let (next, actions) = match (self.state, event) {
            (_, PlaybackEvent::Play) => (Playing, vec![StartLoop]),
            (Playing, PlaybackEvent::Pause) => (Paused, vec![StopLoop, RedrawOnce]),
            (Idle, PlaybackEvent::Pause) => (Paused, vec![RedrawOnce]),
            (Paused, PlaybackEvent::Pause) => (Paused, vec![]),
            (Playing, PlaybackEvent::Ended) => (Idle, vec![StopLoop, RedrawOnce]),
            (_, PlaybackEvent::Ended) => (Idle, vec![RedrawOnce]),
            (Playing, PlaybackEvent::Seeked) => (Playing, vec![RedrawOnce, StartLoop]),
            (s, PlaybackEvent::Seeked) => (s, vec![RedrawOnce]),
            (_, PlaybackEvent::Detached) => (Idle, vec![StopLoop]),
        };
        self.state = next;
        actions
    }
}

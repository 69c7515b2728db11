use std::sync::{Arc, Mutex};
use tokio::time::Instant;

/// What the overlay needs to know about the video element it sits on.
pub trait VideoSource {
    /// Playback position in seconds.
    fn current_time(&self) -> f64;
    /// On-screen display rect, not the native resolution.
    fn display_size(&self) -> (f64, f64);
    /// Intrinsic resolution; `None` while unknown.
    fn native_size(&self) -> Option<(f64, f64)>;
    /// Neither paused nor ended.
    fn is_playing(&self) -> bool;
}

#[derive(Debug)]
struct Clock {
    position: f64,
    anchor: Option<Instant>,
    duration: f64,
    display: (f64, f64),
    native: Option<(f64, f64)>,
}

impl Clock {
    fn now(&self) -> f64 {
        let pos = match self.anchor {
            Some(a) => self.position + a.elapsed().as_secs_f64(),
            None => self.position,
        };
        pos.min(self.duration)
    }
}

/// A wall-clock driven stand-in for a video element. Cloning shares the
/// same clock.
#[derive(Debug, Clone)]
pub struct SimulatedVideo {
    clock: Arc<Mutex<Clock>>,
}

impl SimulatedVideo {
    pub fn new(duration_secs: f64, display: (f64, f64), native: Option<(f64, f64)>) -> Self {
        Self {
            clock: Arc::new(Mutex::new(Clock {
                position: 0.0,
                anchor: None,
                duration: duration_secs.max(0.0),
                display,
                native,
            })),
        }
    }

    fn with<R>(&self, f: impl FnOnce(&mut Clock) -> R) -> R {
        let mut guard = match self.clock.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }

    pub fn play(&self) {
        self.with(|c| {
            if c.anchor.is_none() && c.position < c.duration {
                c.anchor = Some(Instant::now());
            }
        });
    }

    pub fn pause(&self) {
        self.with(|c| {
            c.position = c.now();
            c.anchor = None;
        });
    }

    pub fn seek(&self, t: f64) {
        self.with(|c| {
            c.position = t.clamp(0.0, c.duration);
            if c.anchor.is_some() {
                c.anchor = Some(Instant::now());
            }
        });
    }

    pub fn set_display_size(&self, width: f64, height: f64) {
        self.with(|c| c.display = (width, height));
    }

    pub fn duration(&self) -> f64 {
        self.with(|c| c.duration)
    }

    pub fn is_paused(&self) -> bool {
        self.with(|c| c.anchor.is_none())
    }

    pub fn is_ended(&self) -> bool {
        self.with(|c| c.now() >= c.duration)
    }
}

impl VideoSource for SimulatedVideo {
    fn current_time(&self) -> f64 {
        self.with(|c| c.now())
    }

    fn display_size(&self) -> (f64, f64) {
        self.with(|c| c.display)
    }

    fn native_size(&self) -> Option<(f64, f64)> {
        self.with(|c| c.native)
    }

    fn is_playing(&self) -> bool {
        self.with(|c| c.anchor.is_some() && c.now() < c.duration)
    }
}

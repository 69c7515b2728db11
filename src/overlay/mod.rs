//! Frame-synchronized pose overlay.
//!
//! `renderer` maps one pose-table row onto a drawing surface, `playback` decides
//! when to draw, and `render_loop` runs the per-refresh loop while the video
//! plays.

pub mod playback;
pub mod pose;
pub mod render_loop;
pub mod renderer;
pub mod surface;
pub mod transform;
pub mod video;

use serde::{Deserialize, Serialize};

pub use playback::{LoopAction, PlaybackEvent, PlaybackMachine, PlaybackState};
pub use pose::OverlayFrame;
pub use render_loop::{DrawStats, OverlayController, OverlayScene};
pub use renderer::{DrawOutcome, OverlayRenderer};
pub use surface::{DrawCommand, RecordingSurface, Surface, SvgSurface};
pub use transform::Scale;
pub use video::{SimulatedVideo, VideoSource};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    /// Same area with the origin moved to the min corner and a non-negative size.
    pub fn normalized(self) -> Self {
        Self {
            x: self.x.min(self.x + self.width),
            y: self.y.min(self.y + self.height),
            width: self.width.abs(),
            height: self.height.abs(),
        }
    }
}

/// `[r, g, b, alpha]`, alpha in 0..=1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgba(pub u8, pub u8, pub u8, pub f32);

impl Rgba {
    pub fn css(&self) -> String {
        format!("rgba({}, {}, {}, {})", self.0, self.1, self.2, self.3)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub color: Rgba,
    pub width: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayStyle {
    pub box_color: Rgba,
    pub box_width: f64,
    pub skeleton_color: Rgba,
    pub skeleton_width: f64,
    pub joint_color: Rgba,
    pub joint_radius: f64,
    pub finger_color: Rgba,
    pub finger_width: f64,
    pub tip_color: Rgba,
    pub tip_radius: f64,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            box_color: Rgba(0, 255, 0, 0.8),
            box_width: 2.0,
            skeleton_color: Rgba(255, 0, 0, 0.7),
            skeleton_width: 3.0,
            joint_color: Rgba(0, 255, 0, 0.9),
            joint_radius: 5.0,
            finger_color: Rgba(255, 0, 0, 0.5),
            finger_width: 2.0,
            tip_color: Rgba(0, 255, 0, 0.9),
            tip_radius: 4.0,
        }
    }
}

impl OverlayStyle {
    pub fn box_stroke(&self) -> Stroke {
        Stroke {
            color: self.box_color,
            width: self.box_width,
        }
    }

    pub fn skeleton_stroke(&self) -> Stroke {
        Stroke {
            color: self.skeleton_color,
            width: self.skeleton_width,
        }
    }

    pub fn finger_stroke(&self) -> Stroke {
        Stroke {
            color: self.finger_color,
            width: self.finger_width,
        }
    }
}

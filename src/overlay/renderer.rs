use super::{
    OverlayFrame, OverlayStyle, Point, Scale, Surface, VideoSource,
    pose::{FINGERS, Hand, Joint},
    transform::source_dimension,
};
use crate::result::{InferenceResult, Subject, VideoMetadata};
use serde::Serialize;
use std::sync::Arc;

/// Result of one draw tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DrawOutcome {
    /// No pose data or nothing to draw on yet.
    NotReady,
    /// The pose table has no row for this frame; the surface was cleared.
    NoRow { frame: u64 },
    Drawn { frame: u64, shapes: usize },
}

/// Draws the active subject of one result snapshot.
#[derive(Debug, Clone)]
pub struct OverlayRenderer {
    result: Arc<InferenceResult>,
    style: OverlayStyle,
    default_fps: f64,
}

impl OverlayRenderer {
    /// `None` when the result has no subject or the subject has no pose data.
    pub fn new(result: Arc<InferenceResult>, style: OverlayStyle, default_fps: f64) -> Option<Self> {
        let subject = result.active_subject()?;
        if subject.pose_keys.is_empty() || subject.pose_table.is_empty() {
            return None;
        }
        Some(Self {
            result,
            style,
            default_fps,
        })
    }

    fn subject(&self) -> &Subject {
        // checked non-empty in `new`
        &self.result.subjects[0]
    }

    fn metadata(&self) -> Option<&VideoMetadata> {
        self.result.video_metadata.as_ref()
    }

    /// Metadata fps when present and positive, else the configured default.
    pub fn fps(&self) -> f64 {
        self.metadata()
            .and_then(|m| m.fps)
            .filter(|f| f.is_finite() && *f > 0.0)
            .unwrap_or(self.default_fps)
    }

    pub fn frame_index(&self, current_time: f64) -> u64 {
        frame_index(current_time, self.fps())
    }

    /// The named-field view of the row for `frame`, if the table has one.
    pub fn frame(&self, frame: u64) -> Option<OverlayFrame> {
        let subject = self.subject();
        let row = subject.pose_table.row(frame)?;
        Some(OverlayFrame::from_row(&subject.pose_keys, row))
    }

    pub fn scale(&self, canvas: (f64, f64), native: Option<(f64, f64)>) -> Scale {
        let meta = self.metadata();
        // each axis falls back on its own
        let src_w = source_dimension(
            meta.and_then(|m| m.width).map(f64::from),
            native.map(|n| n.0),
        );
        let src_h = source_dimension(
            meta.and_then(|m| m.height).map(f64::from),
            native.map(|n| n.1),
        );
        Scale::new(canvas, (src_w, src_h))
    }

    /// One tick: fit the surface to the video's display rect, clear it, and
    /// draw the pose for the frame under the playhead.
    pub fn draw(&self, video: &dyn VideoSource, surface: &mut dyn Surface) -> DrawOutcome {
        let (w, h) = video.display_size();
        surface.resize(w, h);
        surface.clear();

        let frame = self.frame_index(video.current_time());
        let Some(pose) = self.frame(frame) else {
            return DrawOutcome::NoRow { frame };
        };

        let scale = self.scale((w, h), video.native_size());
        let shapes = draw_pose(&pose, scale, &self.style, surface);
        DrawOutcome::Drawn { frame, shapes }
    }
}

/// `floor(t * fps)`; negative or non-finite times map to frame 0.
pub fn frame_index(current_time: f64, fps: f64) -> u64 {
    let f = (current_time * fps).floor();
    if f.is_finite() && f > 0.0 { f as u64 } else { 0 }
}

/// Draws box, arms, joints and fingertips; returns the number of shapes.
pub fn draw_pose(
    pose: &OverlayFrame,
    scale: Scale,
    style: &OverlayStyle,
    surface: &mut dyn Surface,
) -> usize {
    let mut shapes = 0;

    if let Some((x1, y1, x2, y2)) = pose.bounding_box() {
        surface.stroke_rect(scale.rect(x1, y1, x2, y2), style.box_stroke());
        shapes += 1;
    }

    let arm = |hand: Hand| -> [Option<Point>; 3] {
        Joint::ARM.map(|j| pose.joint(hand, j).map(|p| scale.apply(p)))
    };
    let arms = [arm(Hand::Left), arm(Hand::Right)];

    for joints in &arms {
        if let [Some(s), Some(e), Some(w)] = joints {
            surface.stroke_path(&[*s, *e, *w], style.skeleton_stroke());
            shapes += 1;
        }
    }

    for p in arms.iter().flatten().flatten() {
        surface.fill_circle(*p, style.joint_radius, style.joint_color);
        shapes += 1;
    }

    for (hand, joints) in Hand::BOTH.into_iter().zip(arms.iter()) {
        let Some(wrist) = joints[2] else {
            continue;
        };
        for finger in FINGERS {
            let Some(tip) = pose.tip(hand, finger).map(|p| scale.apply(p)) else {
                continue;
            };
            surface.stroke_path(&[wrist, tip], style.finger_stroke());
            surface.fill_circle(tip, style.tip_radius, style.tip_color);
            shapes += 2;
        }
    }

    shapes
}

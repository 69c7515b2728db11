use super::{Point, Rect, Rgba, Stroke};
use serde::Serialize;
use std::fmt::Write as _;

/// A 2D drawing target laid over the video.
pub trait Surface {
    fn resize(&mut self, width: f64, height: f64);
    fn clear(&mut self);
    fn stroke_rect(&mut self, rect: Rect, stroke: Stroke);
    /// Open polyline through `points`.
    fn stroke_path(&mut self, points: &[Point], stroke: Stroke);
    fn fill_circle(&mut self, center: Point, radius: f64, color: Rgba);
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DrawCommand {
    Rect { rect: Rect, stroke: Stroke },
    Path { points: Vec<Point>, stroke: Stroke },
    Circle { center: Point, radius: f64, color: Rgba },
}

/// Keeps the commands issued since the last `clear`.
#[derive(Debug, Clone, Default)]
pub struct RecordingSurface {
    pub width: f64,
    pub height: f64,
    pub commands: Vec<DrawCommand>,
    pub clears: u64,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rects(&self) -> usize {
        self.count(|c| matches!(c, DrawCommand::Rect { .. }))
    }

    pub fn paths(&self) -> usize {
        self.count(|c| matches!(c, DrawCommand::Path { .. }))
    }

    pub fn circles(&self) -> usize {
        self.count(|c| matches!(c, DrawCommand::Circle { .. }))
    }

    fn count(&self, f: impl Fn(&DrawCommand) -> bool) -> usize {
        self.commands.iter().filter(|c| f(c)).count()
    }
}

impl Surface for RecordingSurface {
    fn resize(&mut self, width: f64, height: f64) {
        self.width = width;
        self.height = height;
    }

    fn clear(&mut self) {
        self.commands.clear();
        self.clears += 1;
    }

    fn stroke_rect(&mut self, rect: Rect, stroke: Stroke) {
        self.commands.push(DrawCommand::Rect { rect, stroke });
    }

    fn stroke_path(&mut self, points: &[Point], stroke: Stroke) {
        self.commands.push(DrawCommand::Path {
            points: points.to_vec(),
            stroke,
        });
    }

    fn fill_circle(&mut self, center: Point, radius: f64, color: Rgba) {
        self.commands.push(DrawCommand::Circle {
            center,
            radius,
            color,
        });
    }
}

/// Renders one tick as a standalone SVG document.
#[derive(Debug, Clone, Default)]
pub struct SvgSurface {
    width: f64,
    height: f64,
    body: String,
}

impl SvgSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn to_svg(&self) -> String {
        format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\">\n{body}</svg>\n",
            w = self.width,
            h = self.height,
            body = self.body
        )
    }
}

impl Surface for SvgSurface {
    fn resize(&mut self, width: f64, height: f64) {
        self.width = width;
        self.height = height;
    }

    fn clear(&mut self) {
        self.body.clear();
    }

    fn stroke_rect(&mut self, r: Rect, stroke: Stroke) {
        let r = r.normalized();
        let _ = writeln!(
            self.body,
            "  <rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" fill=\"none\" stroke=\"{}\" stroke-width=\"{}\"/>",
            r.x,
            r.y,
            r.width,
            r.height,
            stroke.color.css(),
            stroke.width
        );
    }

    fn stroke_path(&mut self, points: &[Point], stroke: Stroke) {
        let pts: Vec<String> = points
            .iter()
            .map(|p| format!("{:.2},{:.2}", p.x, p.y))
            .collect();
        let _ = writeln!(
            self.body,
            "  <polyline points=\"{}\" fill=\"none\" stroke=\"{}\" stroke-width=\"{}\"/>",
            pts.join(" "),
            stroke.color.css(),
            stroke.width
        );
    }

    fn fill_circle(&mut self, c: Point, radius: f64, color: Rgba) {
        let _ = writeln!(
            self.body,
            "  <circle cx=\"{:.2}\" cy=\"{:.2}\" r=\"{}\" fill=\"{}\"/>",
            c.x,
            c.y,
            radius,
            color.css()
        );
    }
}

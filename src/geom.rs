use serde::{Deserialize, Serialize};

/// Axis-aligned pixel rectangle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BBoxPx {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// A detected text region in image coordinates (y grows downwards).
///
/// Points are ordered top-left, top-right, bottom-right, bottom-left as seen
/// in the upright text, so the first two points always describe the top edge
/// even when the region is tilted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[[f32; 2]; 4]", into = "[[f32; 2]; 4]")]
pub struct Quad {
    pub points: [Point; 4],
}

impl Quad {
    pub fn new(points: [Point; 4]) -> Self {
        Self { points }
    }

    pub fn from_bbox(bbox: &BBoxPx) -> Self {
        let x1 = bbox.x as f32;
        let y1 = bbox.y as f32;
        let x2 = (bbox.x + bbox.w) as f32;
        let y2 = (bbox.y + bbox.h) as f32;
        Self::new([
            Point::new(x1, y1),
            Point::new(x2, y1),
            Point::new(x2, y2),
            Point::new(x1, y2),
        ])
    }

    /// Angle in degrees between the top edge and the horizontal axis.
    /// Positive values mean the edge descends to the right (clockwise tilt).
    pub fn top_edge_angle(&self) -> Option<f32> {
        let [left, right, _, _] = self.points;
        let dx = right.x - left.x;
        let dy = right.y - left.y;
        if dx == 0.0 && dy == 0.0 {
            return None;
        }
        let angle = dy.atan2(dx).to_degrees();
        angle.is_finite().then_some(angle)
    }
}

impl From<[[f32; 2]; 4]> for Quad {
    fn from(raw: [[f32; 2]; 4]) -> Self {
        Self::new(raw.map(|[x, y]| Point::new(x, y)))
    }
}

impl From<Quad> for [[f32; 2]; 4] {
    fn from(quad: Quad) -> Self {
        quad.points.map(|p| [p.x, p.y])
    }
}

pub(crate) fn union_bbox(a: &BBoxPx, b: &BBoxPx) -> BBoxPx {
    let x1 = a.x.min(b.x);
    let y1 = a.y.min(b.y);
    let x2 = (a.x + a.w).max(b.x + b.w);
    let y2 = (a.y + a.h).max(b.y + b.h);
    BBoxPx {
        x: x1,
        y: y1,
        w: x2 - x1,
        h: y2 - y1,
    }
}

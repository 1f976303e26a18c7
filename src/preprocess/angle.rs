use std::cmp::Ordering;

use crate::geom::Quad;

/// Median tilt of the detected text regions, in degrees.
///
/// The median keeps a single vertical label or stray region from dragging
/// the correction. Returns `None` when no region yields an angle.
pub fn estimate_angle(regions: &[Quad]) -> Option<f32> {
    let mut angles = regions
        .iter()
        .filter_map(Quad::top_edge_angle)
        .map(fold_half_turn)
        .collect::<Vec<_>>();
    median(&mut angles)
}

// Upside-down regions report ~180 degrees; fold them into (-90, 90].
fn fold_half_turn(angle: f32) -> f32 {
    if angle > 90.0 {
        angle - 180.0
    } else if angle <= -90.0 {
        angle + 180.0
    } else {
        angle
    }
}

fn median(values: &mut [f32]) -> Option<f32> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        Some(values[mid])
    } else {
        Some((values[mid - 1] + values[mid]) / 2.0)
    }
}

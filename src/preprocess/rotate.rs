use image::{DynamicImage, Rgba};
use imageproc::geometric_transformations::{Interpolation, rotate_about_center};
use tracing::debug;

/// Undoes the estimated tilt when it exceeds the deadband.
///
/// Returns the image and the correction that was applied. Inside the deadband
/// (or with no angle) the input is returned as-is, without resampling.
pub fn deskew(
    image: DynamicImage,
    angle: Option<f32>,
    deadband_degrees: f32,
) -> (DynamicImage, Option<f32>) {
    let Some(angle) = angle else {
        return (image, None);
    };
    if !angle.is_finite() || angle.abs() <= deadband_degrees {
        debug!(angle, deadband_degrees, "tilt within deadband; not rotating");
        return (image, None);
    }

    let correction = -angle;
    let rgba = image.to_rgba8();
    let rotated = rotate_about_center(
        &rgba,
        correction.to_radians(),
        Interpolation::Bilinear,
        Rgba([255, 255, 255, 255]),
    );
    debug!(angle, correction, "rotated capture");
    (DynamicImage::ImageRgba8(rotated), Some(correction))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;

    fn gradient() -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_fn(16, 8, |x, y| {
            Rgba([(x * 15) as u8, (y * 30) as u8, 128, 255])
        }))
    }

    #[test]
    fn no_angle_returns_identical_bytes() {
        let img = gradient();
        let (out, applied) = deskew(img.clone(), None, 2.0);
        assert_eq!(applied, None);
        assert_eq!(out.as_bytes(), img.as_bytes());
    }

    #[test]
    fn angle_at_deadband_is_skipped() {
        let img = gradient();
        for angle in [2.0, -2.0, 1.5, 0.0] {
            let (out, applied) = deskew(img.clone(), Some(angle), 2.0);
            assert_eq!(applied, None, "angle {angle}");
            assert_eq!(out.as_bytes(), img.as_bytes());
        }
    }

    #[test]
    fn angle_beyond_deadband_applies_inverse() {
        let img = gradient();
        let (out, applied) = deskew(img.clone(), Some(7.5), 2.0);
        assert_eq!(applied, Some(-7.5));
        assert_ne!(out.as_bytes(), img.as_bytes());
        assert_eq!((out.width(), out.height()), (16, 8));
    }
}

use anyhow::{Result, anyhow};
use image::{DynamicImage, GrayImage, imageops};
use tracing::warn;

use super::PreprocessOptions;

/// Grayscale, contrast boost, sharpen, then unsharp mask.
///
/// Each filter runs on the output of the previous one. A filter that rejects
/// its input is logged and skipped; the last good image carries on.
pub fn enhance(image: &DynamicImage, options: &PreprocessOptions) -> DynamicImage {
    let mut current = to_luma_on_white(image);
    current = apply_step("contrast", current, |img| boost_contrast(img, options.contrast));
    current = apply_step("sharpen", current, |img| sharpen(img, options.sharpen_amount));
    current = apply_step("unsharp", current, |img| {
        unsharp_mask(img, options.unsharp_sigma, options.unsharp_threshold)
    });
    DynamicImage::ImageLuma8(current)
}

fn apply_step<F>(name: &str, current: GrayImage, step: F) -> GrayImage
where
    F: FnOnce(&GrayImage) -> Result<GrayImage>,
{
    match step(&current) {
        Ok(next) => next,
        Err(err) => {
            warn!(filter = name, "enhancement filter skipped: {err}");
            current
        }
    }
}

// Transparent pixels are composited onto white before BT.601 luma.
fn to_luma_on_white(image: &DynamicImage) -> GrayImage {
    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();
    let mut luma = GrayImage::new(width, height);

    for (x, y, pixel) in rgba.enumerate_pixels() {
        let [r, g, b, a] = pixel.0;
        let alpha = a as f32 / 255.0;
        let r = r as f32 * alpha + 255.0 * (1.0 - alpha);
        let g = g as f32 * alpha + 255.0 * (1.0 - alpha);
        let b = b as f32 * alpha + 255.0 * (1.0 - alpha);
        let value = (0.299 * r + 0.587 * g + 0.114 * b).round() as u8;
        luma.put_pixel(x, y, image::Luma([value]));
    }
    luma
}

fn ensure_non_empty(image: &GrayImage) -> Result<()> {
    if image.width() == 0 || image.height() == 0 {
        return Err(anyhow!("image is empty"));
    }
    Ok(())
}

fn boost_contrast(image: &GrayImage, contrast: f32) -> Result<GrayImage> {
    ensure_non_empty(image)?;
    if !contrast.is_finite() {
        return Err(anyhow!("contrast must be finite (got {contrast})"));
    }
    Ok(imageops::contrast(image, contrast))
}

fn sharpen(image: &GrayImage, amount: f32) -> Result<GrayImage> {
    ensure_non_empty(image)?;
    if !amount.is_finite() || amount < 0.0 {
        return Err(anyhow!("sharpen amount must be >= 0 (got {amount})"));
    }
    if amount == 0.0 {
        return Ok(image.clone());
    }
    let kernel = [
        0.0, -amount, 0.0, //
        -amount, 1.0 + 4.0 * amount, -amount, //
        0.0, -amount, 0.0,
    ];
    Ok(imageops::filter3x3(image, &kernel))
}

fn unsharp_mask(image: &GrayImage, sigma: f32, threshold: i32) -> Result<GrayImage> {
    ensure_non_empty(image)?;
    if !sigma.is_finite() || sigma <= 0.0 {
        return Err(anyhow!("unsharp sigma must be > 0 (got {sigma})"));
    }
    Ok(imageops::unsharpen(image, sigma, threshold))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgba, RgbaImage};

    fn sample() -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_fn(12, 12, |x, _| {
            if x < 6 {
                Rgba([40, 60, 80, 255])
            } else {
                Rgba([200, 180, 160, 255])
            }
        }))
    }

    #[test]
    fn output_is_grayscale_with_same_dimensions() {
        let out = enhance(&sample(), &PreprocessOptions::default());
        assert!(matches!(out, DynamicImage::ImageLuma8(_)));
        assert_eq!((out.width(), out.height()), (12, 12));
    }

    #[test]
    fn transparent_pixels_become_white() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 0])));
        let luma = to_luma_on_white(&img);
        assert_eq!(luma.get_pixel(0, 0), &Luma([255]));
    }

    #[test]
    fn contrast_boost_spreads_values() {
        let luma = to_luma_on_white(&sample());
        let dark_before = luma.get_pixel(0, 0)[0];
        let boosted = boost_contrast(&luma, 30.0).expect("contrast");
        assert!(boosted.get_pixel(0, 0)[0] < dark_before);
    }

    #[test]
    fn failing_filter_keeps_previous_image() {
        let options = PreprocessOptions {
            unsharp_sigma: 0.0,
            ..PreprocessOptions::default()
        };
        let luma = to_luma_on_white(&sample());
        let contrasted = boost_contrast(&luma, options.contrast).expect("contrast");
        let sharpened = sharpen(&contrasted, options.sharpen_amount).expect("sharpen");

        let out = enhance(&sample(), &options);
        assert_eq!(out.as_bytes(), sharpened.as_raw().as_slice());
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        let luma = to_luma_on_white(&sample());
        assert!(sharpen(&luma, -1.0).is_err());
        assert!(unsharp_mask(&luma, f32::NAN, 2).is_err());
        assert!(boost_contrast(&GrayImage::new(0, 0), 10.0).is_err());
    }
}

use image::DynamicImage;
use std::io::Cursor;

use crate::model::Orientation;

/// Reads the EXIF orientation tag from encoded image bytes.
/// Returns `Up` if there is no EXIF block or no orientation tag.
pub fn read_exif_orientation(bytes: &[u8]) -> Orientation {
    let mut cursor = Cursor::new(bytes);
    let Ok(exif) = exif::Reader::new().read_from_container(&mut cursor) else {
        return Orientation::Up;
    };
    exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)
        .and_then(|field| field.value.get_uint(0))
        .map(Orientation::from_exif_tag)
        .unwrap_or_default()
}

/// Re-renders pixels so the logical top of the scene is the top row.
pub(super) fn normalize_orientation(image: DynamicImage, orientation: Orientation) -> DynamicImage {
    match orientation {
        Orientation::Up => image,
        Orientation::UpMirrored => image.fliph(),
        Orientation::Down => image.rotate180(),
        Orientation::DownMirrored => image.flipv(),
        Orientation::LeftMirrored => image.rotate90().fliph(),
        Orientation::Right => image.rotate90(),
        Orientation::RightMirrored => image.rotate270().fliph(),
        Orientation::Left => image.rotate270(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgba, RgbaImage};

    fn marked_image() -> DynamicImage {
        // 3x2 with a red marker at the top-left corner.
        let mut img = RgbaImage::from_pixel(3, 2, Rgba([255, 255, 255, 255]));
        img.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        DynamicImage::ImageRgba8(img)
    }

    #[test]
    fn upright_is_untouched() {
        let img = marked_image();
        let out = normalize_orientation(img.clone(), Orientation::Up);
        assert_eq!(out.as_bytes(), img.as_bytes());
    }

    #[test]
    fn right_rotates_clockwise() {
        let out = normalize_orientation(marked_image(), Orientation::Right);
        assert_eq!(out.dimensions(), (2, 3));
        assert_eq!(out.get_pixel(1, 0), Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn down_moves_marker_to_bottom_right() {
        let out = normalize_orientation(marked_image(), Orientation::Down);
        assert_eq!(out.get_pixel(2, 1), Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn bytes_without_exif_are_upright() {
        assert_eq!(read_exif_orientation(b"not an image"), Orientation::Up);
    }
}

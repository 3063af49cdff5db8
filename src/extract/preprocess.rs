//! Thin image wrappers applied before OCR: table-region cropping and an
//! optional text-color mask. Anything smarter than this belongs to the OCR
//! engine, not here.

use image::{Rgba, RgbaImage};

use crate::config::{ColorMask, TableBounds};

/// Crops the history-table region using relative bounds (0.0 to 1.0),
/// clamped to the image dimensions.
pub fn crop_table_region(img: &RgbaImage, bounds: &TableBounds) -> RgbaImage {
    let (w, h) = img.dimensions();

    let x0 = ((bounds.left * w as f32) as u32).min(w);
    let y0 = ((bounds.top * h as f32) as u32).min(h);
    let rw = (((bounds.right - bounds.left) * w as f32) as u32).min(w - x0);
    let rh = (((bounds.bottom - bounds.top) * h as f32) as u32).min(h - y0);

    image::imageops::crop_imm(img, x0, y0, rw, rh).to_image()
}

/// Forces pixels near the configured text color to pure black so
/// low-contrast table text survives the OCR engine's own binarization.
pub fn mask_text_color(img: &RgbaImage, mask: &ColorMask) -> RgbaImage {
    let mut output = img.clone();
    for pixel in output.pixels_mut() {
        let near = pixel
            .0
            .iter()
            .take(3)
            .zip(mask.target)
            .all(|(&channel, target)| channel.abs_diff(target) <= mask.tolerance);
        if near {
            *pixel = Rgba([0, 0, 0, pixel[3]]);
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crop_table_region() {
        let img: RgbaImage =
            RgbaImage::from_fn(100, 200, |x, y| Rgba([x as u8, y as u8, 0, 255]));
        let bounds = TableBounds {
            top: 0.25,
            bottom: 0.75,
            left: 0.1,
            right: 0.6,
        };

        let cropped = crop_table_region(&img, &bounds);

        assert_eq!(cropped.dimensions(), (50, 100));
        // Top-left pixel maps to (10, 50) in the original
        assert_eq!(cropped.get_pixel(0, 0)[0], 10);
        assert_eq!(cropped.get_pixel(0, 0)[1], 50);
    }

    #[test]
    fn test_crop_full_bounds_is_identity() {
        let img: RgbaImage = RgbaImage::new(40, 30);
        let cropped = crop_table_region(&img, &TableBounds::default());
        assert_eq!(cropped.dimensions(), (40, 30));
    }

    #[test]
    fn test_mask_text_color() {
        let mut img: RgbaImage = RgbaImage::new(3, 1);
        img.put_pixel(0, 0, Rgba([31, 31, 31, 255])); // exact target
        img.put_pixel(1, 0, Rgba([40, 40, 40, 255])); // within tolerance
        img.put_pixel(2, 0, Rgba([200, 31, 31, 255])); // one channel off

        let mask = ColorMask {
            target: [31, 31, 31],
            tolerance: 15,
        };
        let result = mask_text_color(&img, &mask);

        assert_eq!(result.get_pixel(0, 0), &Rgba([0, 0, 0, 255]));
        assert_eq!(result.get_pixel(1, 0), &Rgba([0, 0, 0, 255]));
        assert_eq!(result.get_pixel(2, 0), &Rgba([200, 31, 31, 255]));
    }
}

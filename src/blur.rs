//! Blur capability applied to the working canvas.
//!
//! The engine only depends on the [`BlurFilter`] trait. [`BoxBlur`] is the
//! default: `image`'s box-blur approximation of a gaussian over the RGB
//! channels of a canvas region, leaving alpha untouched.

use image::imageops;

use crate::canvas::{Canvas, Region};
use crate::error::Result;

/// Largest radius honoured by [`BoxBlur`]; larger values are clamped.
pub const MAX_RADIUS: u32 = 254;

/// An in-place blur over a rectangular region of a canvas.
pub trait BlurFilter {
    /// Blur the RGB channels of `region` in `canvas` with the given radius.
    ///
    /// # Errors
    ///
    /// Implementations fail if the canvas pixels cannot be read back (see
    /// [`Canvas::image_data_mut`]) or if the blur itself fails.
    fn blur_rgb(&self, canvas: &mut Canvas, region: Region, radius: f32) -> Result<()>;
}

impl<F: BlurFilter + ?Sized> BlurFilter for &F {
    fn blur_rgb(&self, canvas: &mut Canvas, region: Region, radius: f32) -> Result<()> {
        (**self).blur_rgb(canvas, region, radius)
    }
}

/// Box blur backed by [`imageops::fast_blur`].
///
/// The radius is truncated to whole pixels and clamped to [`MAX_RADIUS`];
/// anything below one pixel leaves the canvas unchanged (pixel access is
/// still checked).
#[derive(Debug, Clone, Copy, Default)]
pub struct BoxBlur;

impl BlurFilter for BoxBlur {
    fn blur_rgb(&self, canvas: &mut Canvas, region: Region, radius: f32) -> Result<()> {
        let pixels = canvas.image_data_mut()?;
        let Some(region) = clip(region, pixels.width(), pixels.height()) else {
            return Ok(());
        };
        let Some(radius) = whole_radius(radius) else {
            return Ok(());
        };

        let original =
            imageops::crop_imm(&*pixels, region.x, region.y, region.width, region.height)
                .to_image();
        #[allow(clippy::cast_precision_loss)]
        let mut blurred = imageops::fast_blur(&original, radius as f32);
        for (out, src) in blurred.pixels_mut().zip(original.pixels()) {
            out[3] = src[3];
        }
        imageops::replace(pixels, &blurred, i64::from(region.x), i64::from(region.y));
        Ok(())
    }
}

/// Truncate to whole pixels and clamp; `None` when the blur is a no-op.
fn whole_radius(radius: f32) -> Option<u32> {
    if radius.is_nan() || radius < 1.0 {
        return None;
    }
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let r = radius.min(MAX_RADIUS as f32) as u32;
    Some(r)
}

/// Intersect `region` with the image bounds; `None` if nothing is left.
fn clip(region: Region, width: u32, height: u32) -> Option<Region> {
    let x2 = region.x.saturating_add(region.width).min(width);
    let y2 = region.y.saturating_add(region.height).min(height);
    if region.x >= x2 || region.y >= y2 {
        return None;
    }
    Some(Region {
        x: region.x,
        y: region.y,
        width: x2 - region.x,
        height: y2 - region.y,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::ImageElement;
    use crate::error::Error;
    use image::RgbaImage;

    fn canvas_from(pixels: RgbaImage) -> Canvas {
        let (w, h) = pixels.dimensions();
        let mut canvas = Canvas::new(w, h);
        canvas
            .draw_image(&ImageElement::new("t.png").loaded(pixels))
            .unwrap();
        canvas
    }

    fn assert_close(actual: [u8; 4], expected: [u8; 4]) {
        for ch in 0..4 {
            let diff = (i32::from(actual[ch]) - i32::from(expected[ch])).abs();
            assert!(diff <= 1, "channel {ch}: {actual:?} vs {expected:?}");
        }
    }

    #[test]
    fn whole_radius_truncates_and_clamps() {
        assert_eq!(whole_radius(0.9), None);
        assert_eq!(whole_radius(-3.0), None);
        assert_eq!(whole_radius(f32::NAN), None);
        assert_eq!(whole_radius(2.7), Some(2));
        assert_eq!(whole_radius(1e30), Some(MAX_RADIUS));
        assert_eq!(whole_radius(f32::INFINITY), Some(MAX_RADIUS));
    }

    #[test]
    fn flat_image_is_unchanged() {
        let mut canvas = canvas_from(RgbaImage::from_pixel(
            12,
            9,
            image::Rgba([90, 30, 200, 255]),
        ));
        let region = canvas.bounds();
        BoxBlur.blur_rgb(&mut canvas, region, 3.0).unwrap();
        for px in canvas.image_data().unwrap().pixels() {
            assert_close(px.0, [90, 30, 200, 255]);
        }
    }

    #[test]
    fn huge_radius_does_not_panic_or_blacken() {
        let mut canvas = canvas_from(RgbaImage::from_pixel(
            6,
            4,
            image::Rgba([180, 140, 100, 255]),
        ));
        let region = canvas.bounds();
        BoxBlur.blur_rgb(&mut canvas, region, f32::MAX).unwrap();
        for px in canvas.image_data().unwrap().pixels() {
            assert_close(px.0, [180, 140, 100, 255]);
        }
    }

    #[test]
    fn sub_pixel_radius_is_a_no_op() {
        let mut src = RgbaImage::new(5, 5);
        src.put_pixel(2, 2, image::Rgba([255, 255, 255, 255]));
        let mut canvas = canvas_from(src.clone());
        let region = canvas.bounds();
        BoxBlur.blur_rgb(&mut canvas, region, 0.9).unwrap();
        assert_eq!(canvas.image_data().unwrap(), &src);
    }

    #[test]
    fn blur_spreads_a_bright_pixel_and_keeps_alpha() {
        let mut src = RgbaImage::from_pixel(9, 9, image::Rgba([0, 0, 0, 128]));
        src.put_pixel(4, 4, image::Rgba([255, 255, 255, 128]));
        let mut canvas = canvas_from(src);
        let region = canvas.bounds();
        BoxBlur.blur_rgb(&mut canvas, region, 2.0).unwrap();

        let out = canvas.image_data().unwrap();
        let center = out.get_pixel(4, 4);
        let neighbour = out.get_pixel(3, 4);
        let far = out.get_pixel(0, 0);
        assert!(center[0] < 255);
        assert!(neighbour[0] > 0);
        assert!(far[0] < center[0]);
        assert!(out.pixels().all(|p| p[3] == 128));
    }

    #[test]
    fn blur_outside_region_leaves_pixels_alone() {
        let mut src = RgbaImage::new(10, 4);
        for x in 0..10 {
            let v = if x % 2 == 0 { 255 } else { 0 };
            for y in 0..4 {
                src.put_pixel(x, y, image::Rgba([v, v, v, 255]));
            }
        }
        let mut canvas = canvas_from(src.clone());
        let region = Region {
            x: 5,
            y: 0,
            width: 50,
            height: 4,
        };
        BoxBlur.blur_rgb(&mut canvas, region, 2.0).unwrap();
        let out = canvas.image_data().unwrap();
        for x in 0..5 {
            assert_eq!(out.get_pixel(x, 1), src.get_pixel(x, 1));
        }
        assert_ne!(out.get_pixel(7, 1), src.get_pixel(7, 1));
    }

    #[test]
    fn tainted_canvas_is_rejected() {
        let mut img = ImageElement::new("x").loaded(RgbaImage::new(4, 4));
        img.origin_clean = false;
        let mut canvas = Canvas::new(4, 4);
        canvas.draw_image(&img).unwrap();
        let region = canvas.bounds();
        let err = BoxBlur.blur_rgb(&mut canvas, region, 2.0);
        assert!(matches!(err, Err(Error::Tainted)));
    }
}

//! Offscreen canvas used to rasterize, read back and encode thumbnails.
//!
//! Pixel access goes through [`Canvas::image_data_mut`], which refuses to hand
//! out pixels once cross-origin image data has been drawn into the canvas.

use std::io::Cursor;

use base64::Engine;
use image::imageops::{self, FilterType};
use image::{ImageFormat, RgbaImage};

use crate::dom::ImageElement;
use crate::error::{Error, Result};

/// Rectangle within a canvas, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Width.
    pub width: u32,
    /// Height.
    pub height: u32,
}

/// An RGBA drawing surface with origin tracking.
#[derive(Debug, Clone)]
pub struct Canvas {
    pixels: RgbaImage,
    origin_clean: bool,
}

impl Canvas {
    /// A transparent canvas of the given size.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            pixels: RgbaImage::new(width, height),
            origin_clean: true,
        }
    }

    /// Canvas width.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    /// Canvas height.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// The whole canvas as a region.
    #[must_use]
    pub fn bounds(&self) -> Region {
        Region {
            x: 0,
            y: 0,
            width: self.width(),
            height: self.height(),
        }
    }

    /// False once cross-origin data has been drawn.
    #[must_use]
    pub fn is_origin_clean(&self) -> bool {
        self.origin_clean
    }

    /// Draw `image` scaled to cover the whole canvas.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotDecoded`] if the image has no pixel data.
    pub fn draw_image(&mut self, image: &ImageElement) -> Result<()> {
        let source = image.pixels.as_ref().ok_or(Error::NotDecoded)?;
        if !image.origin_clean {
            self.origin_clean = false;
        }
        if self.width() == 0 || self.height() == 0 || source.width() == 0 || source.height() == 0 {
            return Ok(());
        }
        self.pixels = if source.dimensions() == self.pixels.dimensions() {
            source.clone()
        } else {
            imageops::resize(source, self.width(), self.height(), FilterType::Triangle)
        };
        Ok(())
    }

    /// Read-only pixel access.
    ///
    /// # Errors
    ///
    /// [`Error::Tainted`] for a tainted canvas, [`Error::EmptyCanvas`] when
    /// either dimension is zero.
    pub fn image_data(&self) -> Result<&RgbaImage> {
        self.check_readable()?;
        Ok(&self.pixels)
    }

    /// Mutable pixel access, subject to the same checks as [`Canvas::image_data`].
    ///
    /// # Errors
    ///
    /// See [`Canvas::image_data`].
    pub fn image_data_mut(&mut self) -> Result<&mut RgbaImage> {
        self.check_readable()?;
        Ok(&mut self.pixels)
    }

    fn check_readable(&self) -> Result<()> {
        if !self.origin_clean {
            return Err(Error::Tainted);
        }
        if self.width() == 0 || self.height() == 0 {
            return Err(Error::EmptyCanvas {
                width: self.width(),
                height: self.height(),
            });
        }
        Ok(())
    }

    /// Encode the canvas as a `data:image/png;base64,...` URI.
    ///
    /// # Errors
    ///
    /// Fails for a tainted or empty canvas, or if PNG encoding fails.
    pub fn to_data_url(&self) -> Result<String> {
        let pixels = self.image_data()?;
        let mut buf = Cursor::new(Vec::new());
        pixels.write_to(&mut buf, ImageFormat::Png)?;
        Ok(format!(
            "data:image/png;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(buf.into_inner())
        ))
    }
}

/// Resolve the size an image is displayed at.
///
/// Each axis independently prefers the rendered box, then the intrinsic size,
/// then `default`.
#[must_use]
pub fn display_size(image: &ImageElement, default: u32) -> (u32, u32) {
    let pick = |client: u32, intrinsic: u32| {
        if client > 0 {
            client
        } else if intrinsic > 0 {
            intrinsic
        } else {
            default
        }
    };
    (
        pick(image.client_width, image.width),
        pick(image.client_height, image.height),
    )
}

/// Scale a display dimension by the downsample factor, truncating.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn scaled_dimension(display: u32, factor: f32) -> u32 {
    let scaled = f64::from(display) * f64::from(factor);
    if scaled.is_finite() && scaled > 0.0 {
        scaled as u32
    } else {
        0
    }
}

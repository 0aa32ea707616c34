//! Core backdrop engine: per-image blur and the page scan.

use std::time::Duration;

use crate::blur::{BlurFilter, BoxBlur};
use crate::canvas::{self, Canvas};
use crate::dom::{Document, ElementId, InlineStyle};
use crate::error::{Error, Result};
use crate::subscription::LoadSubscription;

/// Options controlling backdrop rendering and page initialisation.
#[derive(Debug, Clone)]
pub struct BackdropOptions {
    /// Blur radius in display pixels.
    pub radius: f32,
    /// Ratio between display size and working canvas size.
    pub downsample: f32,
    /// Display size used per axis when neither a rendered nor intrinsic size is known.
    pub default_size: u32,
    /// Backdrop opacity after a successful blur.
    pub opacity: f32,
    /// Flat colour used when blurring is impossible.
    pub fallback_color: String,
    /// Class of the element wrapping an image and its backdrop.
    pub container_class: String,
    /// Class of the element receiving the backdrop.
    pub backdrop_class: String,
    /// Delay between "content parsed" and the first scan.
    pub init_delay: Duration,
}

impl Default for BackdropOptions {
    fn default() -> Self {
        Self {
            radius: 20.0,
            downsample: 0.1,
            default_size: 200,
            opacity: 0.8,
            fallback_color: "#f3f4f6".to_string(),
            container_class: "thumbnail-wrapper".to_string(),
            backdrop_class: "thumbnail-blur-bg".to_string(),
            init_delay: Duration::from_millis(100),
        }
    }
}

/// Details of a successful blur.
#[derive(Debug, Clone, PartialEq)]
pub struct BlurReport {
    /// Element whose style received the backdrop.
    pub backdrop: ElementId,
    /// Working canvas width.
    pub canvas_width: u32,
    /// Working canvas height.
    pub canvas_height: u32,
    /// Radius handed to the blur filter.
    pub radius: f32,
    /// Length of the generated data URI.
    pub data_url_len: usize,
}

/// What happened to one image.
#[derive(Debug)]
pub enum Outcome {
    /// The backdrop now shows the blurred image.
    Blurred(BlurReport),
    /// The backdrop now shows the fallback colour; carries the cause.
    FallbackApplied {
        /// Element whose style received the fallback.
        backdrop: ElementId,
        /// Why blurring was not possible.
        cause: Error,
    },
    /// Container or backdrop lookup failed; nothing was changed.
    Skipped(Error),
}

impl Outcome {
    /// The backdrop element that was styled, if any.
    #[must_use]
    pub fn backdrop(&self) -> Option<ElementId> {
        match self {
            Self::Blurred(report) => Some(report.backdrop),
            Self::FallbackApplied { backdrop, .. } => Some(*backdrop),
            Self::Skipped(_) => None,
        }
    }

    /// Whether the blurred backdrop was applied.
    #[must_use]
    pub fn is_blurred(&self) -> bool {
        matches!(self, Self::Blurred(_))
    }

    /// Whether the fallback style was applied.
    #[must_use]
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::FallbackApplied { .. })
    }
}

/// Result of scanning one image during initialisation.
#[derive(Debug)]
pub enum Dispatch {
    /// The image was complete and has been processed synchronously.
    Settled {
        /// The scanned image.
        image: ElementId,
        /// What happened to it.
        outcome: Outcome,
    },
    /// The image is still loading; fire the subscription on load or error.
    Deferred(LoadSubscription),
}

impl Dispatch {
    /// The image this dispatch refers to.
    #[must_use]
    pub fn image(&self) -> ElementId {
        match self {
            Self::Settled { image, .. } => *image,
            Self::Deferred(sub) => sub.image(),
        }
    }
}

/// The backdrop engine holding options and a blur filter.
///
/// Create once and reuse for every image on a page. The engine never logs;
/// callers decide what to do with each [`Outcome`].
#[derive(Debug, Clone, Default)]
pub struct BackdropEngine<F = BoxBlur> {
    options: BackdropOptions,
    filter: F,
}

impl BackdropEngine<BoxBlur> {
    /// An engine with default options and the default box blur.
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(BackdropOptions::default())
    }

    /// An engine with custom options and the default box blur.
    #[must_use]
    pub fn with_options(options: BackdropOptions) -> Self {
        Self {
            options,
            filter: BoxBlur::default(),
        }
    }
}

impl<F: BlurFilter> BackdropEngine<F> {
    /// An engine with custom options and blur filter.
    pub fn with_filter(options: BackdropOptions, filter: F) -> Self {
        Self { options, filter }
    }

    /// Current options.
    #[must_use]
    pub fn options(&self) -> &BackdropOptions {
        &self.options
    }

    /// The blur filter in use.
    #[must_use]
    pub fn filter(&self) -> &F {
        &self.filter
    }

    /// Working canvas size for a given display size.
    #[must_use]
    pub fn canvas_size_for(&self, display_width: u32, display_height: u32) -> (u32, u32) {
        (
            canvas::scaled_dimension(display_width, self.options.downsample),
            canvas::scaled_dimension(display_height, self.options.downsample),
        )
    }

    /// Resolve the `(container, backdrop)` pair for an image.
    ///
    /// # Errors
    ///
    /// [`Error::NotAnImage`], [`Error::MissingContainer`] or
    /// [`Error::MissingBackdrop`].
    pub fn resolve(&self, doc: &Document, image: ElementId) -> Result<(ElementId, ElementId)> {
        if doc.image(image).is_none() {
            return Err(Error::NotAnImage(image));
        }
        let container = doc
            .closest(image, &self.options.container_class)
            .ok_or_else(|| Error::MissingContainer {
                image,
                class: self.options.container_class.clone(),
            })?;
        let backdrop = doc
            .query_class(container, &self.options.backdrop_class)
            .ok_or_else(|| Error::MissingBackdrop {
                container,
                class: self.options.backdrop_class.clone(),
            })?;
        Ok((container, backdrop))
    }

    /// Blur `image` onto its backdrop using the configured radius.
    pub fn blur(&self, doc: &mut Document, image: ElementId) -> Outcome {
        self.blur_with_radius(doc, image, self.options.radius)
    }

    /// Blur `image` onto its backdrop with an explicit radius.
    ///
    /// Lookup failures leave the document untouched. Any failure while
    /// drawing, blurring or encoding applies the fallback style.
    pub fn blur_with_radius(&self, doc: &mut Document, image: ElementId, radius: f32) -> Outcome {
        let backdrop = match self.resolve(doc, image) {
            Ok((_, backdrop)) => backdrop,
            Err(e) => return Outcome::Skipped(e),
        };

        match self.render(doc, image, radius) {
            Ok((data_url, (canvas_width, canvas_height), radius)) => {
                let data_url_len = data_url.len();
                if let Some(style) = doc.style_mut(backdrop) {
                    self.apply_blurred(style, &data_url);
                }
                Outcome::Blurred(BlurReport {
                    backdrop,
                    canvas_width,
                    canvas_height,
                    radius,
                    data_url_len,
                })
            }
            Err(cause) => {
                if let Some(style) = doc.style_mut(backdrop) {
                    self.apply_fallback(style);
                }
                Outcome::FallbackApplied { backdrop, cause }
            }
        }
    }

    /// Apply the fallback style for an image whose resource failed to load.
    ///
    /// No canvas work is attempted.
    pub fn fail(&self, doc: &mut Document, image: ElementId) -> Outcome {
        match self.resolve(doc, image) {
            Ok((_, backdrop)) => {
                if let Some(style) = doc.style_mut(backdrop) {
                    self.apply_fallback(style);
                }
                Outcome::FallbackApplied {
                    backdrop,
                    cause: Error::LoadFailed,
                }
            }
            Err(e) => Outcome::Skipped(e),
        }
    }

    /// Scan the subtree of `root` for thumbnail images.
    ///
    /// Complete images are processed synchronously; the others get a
    /// one-shot [`LoadSubscription`].
    pub fn scan(&self, doc: &mut Document, root: ElementId) -> Vec<Dispatch> {
        doc.thumbnail_images(root, &self.options.container_class)
            .into_iter()
            .map(|image| {
                if doc.image(image).is_some_and(|img| img.complete()) {
                    Dispatch::Settled {
                        image,
                        outcome: self.blur(doc, image),
                    }
                } else {
                    Dispatch::Deferred(LoadSubscription::new(image))
                }
            })
            .collect()
    }

    /// Draw, blur and encode; returns the data URI, canvas size and blur radius.
    fn render(
        &self,
        doc: &Document,
        image: ElementId,
        radius: f32,
    ) -> Result<(String, (u32, u32), f32)> {
        let img = doc.image(image).ok_or(Error::NotAnImage(image))?;
        let (display_w, display_h) = canvas::display_size(img, self.options.default_size);
        let (w, h) = self.canvas_size_for(display_w, display_h);

        let mut canvas = Canvas::new(w, h);
        canvas.draw_image(img)?;

        let scaled_radius = radius * self.options.downsample;
        let region = canvas.bounds();
        self.filter.blur_rgb(&mut canvas, region, scaled_radius)?;

        let data_url = canvas.to_data_url()?;
        Ok((data_url, (w, h), scaled_radius))
    }

    fn apply_blurred(&self, style: &mut InlineStyle, data_url: &str) {
        style.background_image = Some(format!("url({data_url})"));
        style.background_size = Some("cover".to_string());
        style.background_position = Some("center".to_string());
        style.background_color = None;
        style.opacity = Some(self.options.opacity.to_string());
    }

    fn apply_fallback(&self, style: &mut InlineStyle) {
        style.background_image = Some("none".to_string());
        style.background_color = Some(self.options.fallback_color.clone());
        style.opacity = Some("1".to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::ImageElement;
    use image::RgbaImage;

    fn page(image: ImageElement) -> (Document, ElementId, ElementId) {
        let mut doc = Document::new();
        let body = doc.body();
        let wrapper = doc.append(body, "div", &["thumbnail-wrapper"]);
        let bg = doc.append(wrapper, "div", &["thumbnail-blur-bg"]);
        let img = doc.append_image(wrapper, image);
        (doc, bg, img)
    }

    fn loaded(width: u32, height: u32) -> ImageElement {
        ImageElement::new("thumb.png").loaded(RgbaImage::from_pixel(
            width,
            height,
            image::Rgba([40, 80, 120, 255]),
        ))
    }

    #[test]
    fn default_options_match_documented_constants() {
        let opts = BackdropOptions::default();
        assert!((opts.radius - 20.0).abs() < f32::EPSILON);
        assert!((opts.downsample - 0.1).abs() < f32::EPSILON);
        assert_eq!(opts.default_size, 200);
        assert_eq!(opts.fallback_color, "#f3f4f6");
        assert_eq!(opts.init_delay, Duration::from_millis(100));
    }

    #[test]
    fn blurred_backdrop_gets_data_url_and_opacity() {
        let (mut doc, bg, img) = page(loaded(64, 64).with_client_size(400, 300));
        let engine = BackdropEngine::new();

        let outcome = engine.blur(&mut doc, img);
        let Outcome::Blurred(report) = outcome else {
            panic!("expected blur, got {outcome:?}");
        };
        assert_eq!((report.canvas_width, report.canvas_height), (40, 30));
        assert!((report.radius - 2.0).abs() < 1e-5);

        let style = doc.style(bg).unwrap();
        let bg_image = style.background_image.as_deref().unwrap();
        assert!(bg_image.starts_with("url(data:image/png;base64,"));
        assert_eq!(style.background_size.as_deref(), Some("cover"));
        assert_eq!(style.background_position.as_deref(), Some("center"));
        assert_eq!(style.background_color, None);
        assert_eq!(style.opacity.as_deref(), Some("0.8"));
    }

    #[test]
    fn missing_dimensions_fall_back_to_default_size() {
        let mut image = ImageElement::new("thumb.png");
        image.pixels = Some(RgbaImage::new(10, 10));
        image.state = crate::dom::LoadState::Complete;
        let (mut doc, _, img) = page(image);

        let outcome = BackdropEngine::new().blur(&mut doc, img);
        let Outcome::Blurred(report) = outcome else {
            panic!("expected blur, got {outcome:?}");
        };
        assert_eq!((report.canvas_width, report.canvas_height), (20, 20));
    }

    #[test]
    fn tiny_display_size_falls_back() {
        let (mut doc, bg, img) = page(loaded(64, 64).with_client_size(8, 8));
        let outcome = BackdropEngine::new().blur(&mut doc, img);
        assert!(matches!(
            outcome,
            Outcome::FallbackApplied {
                cause: Error::EmptyCanvas { .. },
                ..
            }
        ));
        assert_eq!(doc.style(bg).unwrap().opacity.as_deref(), Some("1"));
    }

    #[test]
    fn fallback_replaces_previous_blur() {
        let (mut doc, bg, img) = page(loaded(64, 64).with_client_size(200, 200));
        let engine = BackdropEngine::new();
        assert!(engine.blur(&mut doc, img).is_blurred());

        doc.image_mut(img).unwrap().origin_clean = false;
        assert!(engine.blur(&mut doc, img).is_fallback());

        let style = doc.style(bg).unwrap();
        assert_eq!(style.background_image.as_deref(), Some("none"));
        assert_eq!(style.background_color.as_deref(), Some("#f3f4f6"));
        assert_eq!(style.opacity.as_deref(), Some("1"));
    }

    #[test]
    fn missing_backdrop_skips_without_mutation() {
        let mut doc = Document::new();
        let body = doc.body();
        let wrapper = doc.append(body, "div", &["thumbnail-wrapper"]);
        let img = doc.append_image(wrapper, loaded(50, 50));
        let before = doc.clone();

        let outcome = BackdropEngine::new().blur(&mut doc, img);
        assert!(matches!(outcome, Outcome::Skipped(Error::MissingBackdrop { .. })));
        for i in 0..doc.len() {
            let id = ElementId::from_index(i);
            assert_eq!(doc.style(id), before.style(id));
        }
    }

    #[test]
    fn non_image_is_skipped() {
        let (mut doc, bg, _) = page(loaded(10, 10));
        let outcome = BackdropEngine::new().blur(&mut doc, bg);
        assert!(matches!(outcome, Outcome::Skipped(Error::NotAnImage(_))));
    }

    #[test]
    fn custom_class_names_are_honoured() {
        let mut doc = Document::new();
        let body = doc.body();
        let wrapper = doc.append(body, "figure", &["tile"]);
        let bg = doc.append(wrapper, "div", &["tile-bg"]);
        let img = doc.append_image(wrapper, loaded(32, 32));
        let engine = BackdropEngine::with_options(BackdropOptions {
            container_class: "tile".into(),
            backdrop_class: "tile-bg".into(),
            ..BackdropOptions::default()
        });
        assert_eq!(engine.resolve(&doc, img).unwrap(), (wrapper, bg));
        assert!(engine.blur(&mut doc, img).is_blurred());
    }
}

//! One-shot load/error subscription for an image that was still loading at
//! scan time.
//!
//! A subscription is armed when created. The first [`LoadEvent`] delivered
//! through [`LoadSubscription::fire`] runs the matching handler and spends the
//! subscription for both event kinds; every later call is a no-op returning
//! `None`. An image therefore ends up either blurred or with the fallback
//! style, never both.

use crate::blur::BlurFilter;
use crate::dom::{Document, ElementId};
use crate::engine::{BackdropEngine, Outcome};

/// Terminal events of an image resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadEvent {
    /// The image finished loading.
    Load,
    /// The image failed to load.
    Error,
}

/// Pending handlers for one image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadSubscription {
    image: ElementId,
    armed: bool,
}

impl LoadSubscription {
    pub(crate) fn new(image: ElementId) -> Self {
        Self { image, armed: true }
    }

    /// The image this subscription listens to.
    #[must_use]
    pub fn image(&self) -> ElementId {
        self.image
    }

    /// False once an event has been handled.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Deliver `event`. `Load` blurs the image, `Error` applies the fallback
    /// without touching a canvas. Returns `None` if already spent.
    pub fn fire<F: BlurFilter>(
        &mut self,
        engine: &BackdropEngine<F>,
        doc: &mut Document,
        event: LoadEvent,
    ) -> Option<Outcome> {
        if !self.armed {
            return None;
        }
        self.armed = false;
        Some(match event {
            LoadEvent::Load => engine.blur(doc, self.image),
            LoadEvent::Error => engine.fail(doc, self.image),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::ImageElement;
    use crate::engine::Dispatch;
    use crate::error::Error;
    use image::RgbaImage;

    fn pending_page() -> (Document, ElementId, LoadSubscription) {
        let mut doc = Document::new();
        let body = doc.body();
        let wrapper = doc.append(body, "div", &["thumbnail-wrapper"]);
        let bg = doc.append(wrapper, "div", &["thumbnail-blur-bg"]);
        doc.append_image(wrapper, ImageElement::new("slow.png").with_client_size(300, 300));

        let mut dispatches = BackdropEngine::new().scan(&mut doc, body);
        assert_eq!(dispatches.len(), 1);
        let Some(Dispatch::Deferred(sub)) = dispatches.pop() else {
            panic!("loading image must be deferred");
        };
        (doc, bg, sub)
    }

    #[test]
    fn load_fires_once() {
        let (mut doc, bg, mut sub) = pending_page();
        let engine = BackdropEngine::new();
        doc.image_mut(sub.image())
            .unwrap()
            .finish_loading(RgbaImage::new(30, 30));

        let first = sub.fire(&engine, &mut doc, LoadEvent::Load);
        assert!(first.is_some_and(|o| o.is_blurred()));
        assert!(!sub.is_armed());
        let style_after_first = doc.style(bg).cloned();

        assert!(sub.fire(&engine, &mut doc, LoadEvent::Load).is_none());
        assert_eq!(doc.style(bg).cloned(), style_after_first);
    }

    #[test]
    fn error_applies_fallback_and_spends_load_handler() {
        let (mut doc, bg, mut sub) = pending_page();
        let engine = BackdropEngine::new();

        let outcome = sub.fire(&engine, &mut doc, LoadEvent::Error).unwrap();
        assert!(matches!(
            outcome,
            Outcome::FallbackApplied {
                cause: Error::LoadFailed,
                ..
            }
        ));
        assert_eq!(doc.style(bg).unwrap().opacity.as_deref(), Some("1"));

        assert!(sub.fire(&engine, &mut doc, LoadEvent::Load).is_none());
        assert_eq!(doc.style(bg).unwrap().background_image.as_deref(), Some("none"));
    }
}

//! Page host: wires the engine to the page lifecycle and image events.
//!
//! Time is virtual. [`Page::content_parsed`] schedules the first scan after
//! the configured delay and [`Page::advance`] moves the clock. Load and error
//! events are delivered by the embedder through [`Page::image_loaded`] and
//! [`Page::image_failed`].

use std::collections::HashMap;
use std::time::Duration;

use image::RgbaImage;

use crate::blur::{BlurFilter, BoxBlur};
use crate::dom::{Document, ElementId};
use crate::engine::{BackdropEngine, Dispatch, Outcome};
use crate::subscription::{LoadEvent, LoadSubscription};

/// A document together with the engine and its pending subscriptions.
#[derive(Debug)]
pub struct Page<F = BoxBlur> {
    document: Document,
    engine: BackdropEngine<F>,
    now: Duration,
    init_at: Option<Duration>,
    initialized: bool,
    subscriptions: HashMap<ElementId, LoadSubscription>,
    outcomes: Vec<(ElementId, Outcome)>,
}

impl<F: BlurFilter> Page<F> {
    /// Host `document` with `engine`.
    pub fn new(document: Document, engine: BackdropEngine<F>) -> Self {
        Self {
            document,
            engine,
            now: Duration::ZERO,
            init_at: None,
            initialized: false,
            subscriptions: HashMap::new(),
            outcomes: Vec::new(),
        }
    }

    /// The hosted document.
    #[must_use]
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// The hosted document, mutably (e.g. to add content before a rescan).
    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    /// The engine.
    #[must_use]
    pub fn engine(&self) -> &BackdropEngine<F> {
        &self.engine
    }

    /// Current virtual time.
    #[must_use]
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Whether the initial scan has run.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Every outcome recorded so far, in the order it happened.
    #[must_use]
    pub fn outcomes(&self) -> &[(ElementId, Outcome)] {
        &self.outcomes
    }

    /// Latest outcome recorded for `image`.
    #[must_use]
    pub fn outcome_for(&self, image: ElementId) -> Option<&Outcome> {
        self.outcomes
            .iter()
            .rev()
            .find(|(id, _)| *id == image)
            .map(|(_, o)| o)
    }

    /// Images still waiting for a load or error event.
    #[must_use]
    pub fn pending(&self) -> Vec<ElementId> {
        let mut ids: Vec<_> = self
            .subscriptions
            .values()
            .filter(|s| s.is_armed())
            .map(LoadSubscription::image)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// The document's structure has been parsed: schedule the first scan.
    ///
    /// Repeated calls keep the original schedule.
    pub fn content_parsed(&mut self) {
        if self.init_at.is_none() && !self.initialized {
            let at = self.now + self.engine.options().init_delay;
            tracing::debug!(delay = ?self.engine.options().init_delay, "scheduling thumbnail scan");
            self.init_at = Some(at);
        }
    }

    /// Advance the clock by `by`, running the scheduled scan once it is due.
    pub fn advance(&mut self, by: Duration) {
        self.now += by;
        if self.init_at.is_some_and(|at| at <= self.now) {
            self.init_at = None;
            self.initialized = true;
            self.run_scan();
        }
    }

    /// Scan again immediately, e.g. after content was added.
    ///
    /// Images that still hold an armed subscription are not subscribed twice.
    pub fn rescan(&mut self) {
        self.initialized = true;
        self.run_scan();
    }

    /// Deliver a successful load for `image`.
    ///
    /// Returns the outcome if the image had an armed subscription.
    pub fn image_loaded(&mut self, image: ElementId, pixels: RgbaImage) -> Option<&Outcome> {
        if let Some(img) = self.document.image_mut(image) {
            img.finish_loading(pixels);
        }
        self.deliver(image, LoadEvent::Load)
    }

    /// Deliver a load failure for `image`.
    ///
    /// Returns the outcome if the image had an armed subscription.
    pub fn image_failed(&mut self, image: ElementId) -> Option<&Outcome> {
        if let Some(img) = self.document.image_mut(image) {
            img.fail_loading();
        }
        self.deliver(image, LoadEvent::Error)
    }

    fn deliver(&mut self, image: ElementId, event: LoadEvent) -> Option<&Outcome> {
        let sub = self.subscriptions.get_mut(&image)?;
        let outcome = sub.fire(&self.engine, &mut self.document, event)?;
        self.subscriptions.remove(&image);
        if event == LoadEvent::Error {
            tracing::warn!(image = %image, src = self.src(image), "image failed to load");
        }
        Some(self.record(image, outcome))
    }

    fn run_scan(&mut self) {
        let root = self.document.body();
        let dispatches = self.engine.scan(&mut self.document, root);
        tracing::info!(images = dispatches.len(), "scanned page for thumbnails");

        for dispatch in dispatches {
            match dispatch {
                Dispatch::Settled { image, outcome } => {
                    self.record(image, outcome);
                }
                Dispatch::Deferred(sub) => {
                    let image = sub.image();
                    if self.subscriptions.get(&image).is_some_and(LoadSubscription::is_armed) {
                        continue;
                    }
                    self.subscriptions.insert(image, sub);
                }
            }
        }
    }

    fn record(&mut self, image: ElementId, outcome: Outcome) -> &Outcome {
        log_outcome(image, self.src(image), &outcome);
        self.outcomes.push((image, outcome));
        &self.outcomes[self.outcomes.len() - 1].1
    }

    fn src(&self, image: ElementId) -> &str {
        self.document
            .image(image)
            .and_then(|i| i.src.as_deref())
            .unwrap_or_default()
    }
}

/// Emit the diagnostic for one outcome.
pub fn log_outcome(image: ElementId, src: &str, outcome: &Outcome) {
    match outcome {
        Outcome::Blurred(report) => tracing::debug!(
            image = %image,
            src,
            canvas = %format!("{}x{}", report.canvas_width, report.canvas_height),
            radius = report.radius,
            "applied blurred backdrop"
        ),
        Outcome::FallbackApplied { cause, .. } => {
            tracing::warn!(
                image = %image,
                src,
                error = %cause,
                "failed to blur image, applying fallback"
            );
        }
        Outcome::Skipped(cause) => {
            tracing::warn!(image = %image, src, error = %cause, "skipping image");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::ImageElement;

    fn gallery(images: Vec<ImageElement>) -> (Page, Vec<ElementId>) {
        let mut doc = Document::new();
        let body = doc.body();
        let ids = images
            .into_iter()
            .map(|img| {
                let wrapper = doc.append(body, "div", &["thumbnail-wrapper"]);
                doc.append(wrapper, "div", &["thumbnail-blur-bg"]);
                doc.append_image(wrapper, img)
            })
            .collect();
        (Page::new(doc, BackdropEngine::new()), ids)
    }

    fn pixels() -> RgbaImage {
        RgbaImage::from_pixel(16, 16, image::Rgba([10, 200, 10, 255]))
    }

    #[test]
    fn scan_waits_for_delay() {
        let (mut page, ids) = gallery(vec![ImageElement::new("a.png").loaded(pixels())]);
        page.content_parsed();
        page.advance(Duration::from_millis(99));
        assert!(!page.is_initialized());
        assert!(page.outcomes().is_empty());

        page.advance(Duration::from_millis(1));
        assert!(page.is_initialized());
        assert!(page.outcome_for(ids[0]).is_some_and(Outcome::is_blurred));
    }

    #[test]
    fn content_parsed_twice_keeps_schedule() {
        let (mut page, _) = gallery(vec![ImageElement::new("a.png").loaded(pixels())]);
        page.content_parsed();
        page.advance(Duration::from_millis(60));
        page.content_parsed();
        page.advance(Duration::from_millis(40));
        assert!(page.is_initialized());
        assert_eq!(page.outcomes().len(), 1);
    }

    #[test]
    fn deferred_images_resolve_on_events() {
        let (mut page, ids) = gallery(vec![
            ImageElement::new("slow.png").with_client_size(200, 200),
            ImageElement::new("broken.png"),
        ]);
        page.content_parsed();
        page.advance(Duration::from_millis(100));
        assert!(page.outcomes().is_empty());
        assert_eq!(page.pending(), ids);

        assert!(page.image_loaded(ids[0], pixels()).is_some_and(Outcome::is_blurred));
        assert!(page.image_failed(ids[1]).is_some_and(Outcome::is_fallback));
        assert!(page.pending().is_empty());

        assert!(page.image_loaded(ids[0], pixels()).is_none());
        assert!(page.image_failed(ids[1]).is_none());
        assert_eq!(page.outcomes().len(), 2);
    }

    #[test]
    fn rescan_does_not_double_subscribe() {
        let (mut page, ids) = gallery(vec![ImageElement::new("slow.png")]);
        page.content_parsed();
        page.advance(Duration::from_millis(100));
        page.rescan();
        assert_eq!(page.pending(), ids);

        page.image_loaded(ids[0], pixels());
        assert_eq!(page.outcomes().len(), 1);
    }

    #[test]
    fn rescan_picks_up_new_content() {
        let (mut page, _) = gallery(vec![]);
        page.content_parsed();
        page.advance(Duration::from_millis(100));

        let body = page.document().body();
        let doc = page.document_mut();
        let wrapper = doc.append(body, "div", &["thumbnail-wrapper"]);
        doc.append(wrapper, "div", &["thumbnail-blur-bg"]);
        let img = doc.append_image(wrapper, ImageElement::new("late.png").loaded(pixels()));

        page.rescan();
        assert!(page.outcome_for(img).is_some_and(Outcome::is_blurred));
    }
}

//! Blurred backdrops for thumbnail images.
//!
//! Each thumbnail sits in a container next to a backdrop element. The image is
//! drawn onto a canvas at a tenth of its display size, box-blurred, encoded as
//! a PNG data URI and written as the backdrop's background. When that is not
//! possible (cross-origin pixels, broken image, empty canvas) the backdrop gets
//! a flat fallback colour instead.
//!
//! # Quick Start
//!
//! ```no_run
//! use thumbnail_backdrop::{BackdropEngine, Document, ImageElement};
//!
//! let mut doc = Document::new();
//! let body = doc.body();
//! let wrapper = doc.append(body, "div", &["thumbnail-wrapper"]);
//! let backdrop = doc.append(wrapper, "div", &["thumbnail-blur-bg"]);
//! let pixels = image::open("photo.jpg").unwrap().to_rgba8();
//! let img = doc.append_image(wrapper, ImageElement::new("photo.jpg").loaded(pixels));
//!
//! let engine = BackdropEngine::new();
//! let outcome = engine.blur(&mut doc, img);
//! println!("{outcome:?}: {}", doc.style(backdrop).unwrap().to_css());
//! ```
//!
//! # Page lifecycle
//!
//! [`Page`] drives the engine the way a browser page would: the scan runs a
//! fixed delay after the content is parsed, complete images are processed
//! during the scan, and the rest wait for a one-shot load or error event.
//!
//! ```no_run
//! use std::time::Duration;
//! use thumbnail_backdrop::{BackdropEngine, Document, Page};
//!
//! let mut page = Page::new(Document::new(), BackdropEngine::new());
//! page.content_parsed();
//! page.advance(Duration::from_millis(100));
//! for (image, outcome) in page.outcomes() {
//!     println!("{image}: {outcome:?}");
//! }
//! ```

#![deny(missing_docs)]

pub mod blur;
pub mod canvas;
pub mod dom;
mod engine;
pub mod error;
pub mod gallery;
mod host;
mod subscription;

pub use blur::{BlurFilter, BoxBlur};
pub use canvas::{Canvas, Region};
pub use dom::{Document, Element, ElementId, ImageElement, InlineStyle, LoadState};
pub use engine::{BackdropEngine, BackdropOptions, BlurReport, Dispatch, Outcome};
pub use error::{Error, Result};
pub use gallery::{Gallery, Thumbnail};
pub use host::{log_outcome, Page};
pub use subscription::{LoadEvent, LoadSubscription};

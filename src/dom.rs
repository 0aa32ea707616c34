//! Minimal document model for the thumbnail markup.
//!
//! Elements live in an arena owned by [`Document`] and are addressed by
//! [`ElementId`]. Only what the backdrop effect consumes is modelled: class
//! lists, the parent/child structure, inline background style, and the image
//! attributes of `img` elements.

use std::fmt;

use image::RgbaImage;

/// Handle to an element inside a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(usize);

impl ElementId {
    pub(crate) fn from_index(index: usize) -> Self {
        Self(index)
    }

    /// Position of the element in its document's arena.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Loading status of an image resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadState {
    /// The resource is still being fetched or decoded.
    #[default]
    Loading,
    /// The resource loaded and its pixels are available.
    Complete,
    /// The resource failed to load.
    Broken,
}

/// Attributes of an `img` element.
#[derive(Debug, Clone)]
pub struct ImageElement {
    /// The `src` attribute, if present.
    pub src: Option<String>,
    /// Rendered box width (0 when not rendered).
    pub client_width: u32,
    /// Rendered box height (0 when not rendered).
    pub client_height: u32,
    /// Intrinsic or attribute width (0 when unknown).
    pub width: u32,
    /// Intrinsic or attribute height (0 when unknown).
    pub height: u32,
    /// Decoded natural pixel data.
    pub pixels: Option<RgbaImage>,
    /// False when the pixels come from another origin and must not be read back.
    pub origin_clean: bool,
    /// Current load status.
    pub state: LoadState,
}

impl ImageElement {
    /// A not-yet-loaded image with the given source.
    #[must_use]
    pub fn new(src: impl Into<String>) -> Self {
        Self {
            src: Some(src.into()),
            client_width: 0,
            client_height: 0,
            width: 0,
            height: 0,
            pixels: None,
            origin_clean: true,
            state: LoadState::Loading,
        }
    }

    /// Builder: set the rendered box size.
    #[must_use]
    pub fn with_client_size(mut self, width: u32, height: u32) -> Self {
        self.client_width = width;
        self.client_height = height;
        self
    }

    /// Builder: mark the image as loaded with the given pixels.
    #[must_use]
    pub fn loaded(mut self, pixels: RgbaImage) -> Self {
        self.finish_loading(pixels);
        self
    }

    /// Whether the image has finished loading, successfully or not.
    #[must_use]
    pub fn complete(&self) -> bool {
        matches!(self.state, LoadState::Complete | LoadState::Broken)
    }

    /// Whether `src` is present and non-empty.
    #[must_use]
    pub fn has_source(&self) -> bool {
        self.src.as_deref().is_some_and(|s| !s.is_empty())
    }

    /// Record a successful load; intrinsic size comes from the pixels.
    pub fn finish_loading(&mut self, pixels: RgbaImage) {
        self.width = pixels.width();
        self.height = pixels.height();
        self.pixels = Some(pixels);
        self.state = LoadState::Complete;
    }

    /// Record a failed load.
    pub fn fail_loading(&mut self) {
        self.pixels = None;
        self.state = LoadState::Broken;
    }
}

/// Inline style properties the backdrop effect writes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InlineStyle {
    /// `background-image`
    pub background_image: Option<String>,
    /// `background-size`
    pub background_size: Option<String>,
    /// `background-position`
    pub background_position: Option<String>,
    /// `background-color`
    pub background_color: Option<String>,
    /// `opacity`
    pub opacity: Option<String>,
}

impl InlineStyle {
    /// True when no property is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Serialize as a CSS declaration list, e.g. `opacity: 1;`.
    #[must_use]
    pub fn to_css(&self) -> String {
        let props = [
            ("background-image", &self.background_image),
            ("background-size", &self.background_size),
            ("background-position", &self.background_position),
            ("background-color", &self.background_color),
            ("opacity", &self.opacity),
        ];
        props
            .iter()
            .filter_map(|&(name, value)| value.as_ref().map(|v| format!("{name}: {v};")))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// A single node of the document.
#[derive(Debug, Clone)]
pub struct Element {
    /// Lower-case tag name.
    pub tag: String,
    /// Class list.
    pub classes: Vec<String>,
    /// Inline style.
    pub style: InlineStyle,
    /// Image attributes, present for `img` elements.
    pub image: Option<ImageElement>,
    parent: Option<ElementId>,
    children: Vec<ElementId>,
}

impl Element {
    /// Whether the class list contains `class`.
    #[must_use]
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    /// Parent element, `None` for the root.
    #[must_use]
    pub fn parent(&self) -> Option<ElementId> {
        self.parent
    }

    /// Child elements in document order.
    #[must_use]
    pub fn children(&self) -> &[ElementId] {
        &self.children
    }
}

/// Arena of elements rooted at a single `body` element.
#[derive(Debug, Clone)]
pub struct Document {
    elements: Vec<Element>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// A document containing only an empty `body`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            elements: vec![Element {
                tag: "body".to_string(),
                classes: Vec::new(),
                style: InlineStyle::default(),
                image: None,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    /// The root element.
    #[must_use]
    pub fn body(&self) -> ElementId {
        ElementId(0)
    }

    /// Number of elements, including the root.
    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Always false: a document has at least its root.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Append a new element with the given tag and classes under `parent`.
    ///
    /// # Panics
    ///
    /// Panics if `parent` does not belong to this document.
    pub fn append(&mut self, parent: ElementId, tag: &str, classes: &[&str]) -> ElementId {
        assert!(parent.0 < self.elements.len(), "unknown parent {parent}");
        let id = ElementId(self.elements.len());
        self.elements.push(Element {
            tag: tag.to_ascii_lowercase(),
            classes: classes.iter().map(|c| (*c).to_string()).collect(),
            style: InlineStyle::default(),
            image: None,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.elements[parent.0].children.push(id);
        id
    }

    /// Append an `img` element carrying `image` under `parent`.
    pub fn append_image(&mut self, parent: ElementId, image: ImageElement) -> ElementId {
        let id = self.append(parent, "img", &[]);
        self.elements[id.0].image = Some(image);
        id
    }

    /// Look up an element.
    #[must_use]
    pub fn get(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(id.0)
    }

    /// Look up an element mutably.
    pub fn get_mut(&mut self, id: ElementId) -> Option<&mut Element> {
        self.elements.get_mut(id.0)
    }

    /// Image attributes of `id`, if it is an image.
    #[must_use]
    pub fn image(&self, id: ElementId) -> Option<&ImageElement> {
        self.get(id).and_then(|e| e.image.as_ref())
    }

    /// Mutable image attributes of `id`, if it is an image.
    pub fn image_mut(&mut self, id: ElementId) -> Option<&mut ImageElement> {
        self.get_mut(id).and_then(|e| e.image.as_mut())
    }

    /// Inline style of `id`.
    #[must_use]
    pub fn style(&self, id: ElementId) -> Option<&InlineStyle> {
        self.get(id).map(|e| &e.style)
    }

    /// Inline style of `id`, mutably.
    pub fn style_mut(&mut self, id: ElementId) -> Option<&mut InlineStyle> {
        self.get_mut(id).map(|e| &mut e.style)
    }

    /// Strict ancestors of `id`, nearest first.
    pub fn ancestors(&self, id: ElementId) -> impl Iterator<Item = ElementId> + '_ {
        std::iter::successors(self.get(id).and_then(Element::parent), |&p| {
            self.get(p).and_then(Element::parent)
        })
    }

    /// The element itself or its nearest ancestor carrying `class`.
    #[must_use]
    pub fn closest(&self, id: ElementId, class: &str) -> Option<ElementId> {
        std::iter::once(id)
            .chain(self.ancestors(id))
            .find(|&e| self.get(e).is_some_and(|el| el.has_class(class)))
    }

    /// Strict descendants of `id` in document (pre-)order.
    #[must_use]
    pub fn descendants(&self, id: ElementId) -> Vec<ElementId> {
        let mut out = Vec::new();
        let mut stack: Vec<ElementId> = match self.get(id) {
            Some(el) => el.children.iter().rev().copied().collect(),
            None => return out,
        };
        while let Some(next) = stack.pop() {
            out.push(next);
            if let Some(el) = self.get(next) {
                stack.extend(el.children.iter().rev().copied());
            }
        }
        out
    }

    /// First descendant of `id` in document order carrying `class`.
    #[must_use]
    pub fn query_class(&self, id: ElementId, class: &str) -> Option<ElementId> {
        self.descendants(id)
            .into_iter()
            .find(|&e| self.get(e).is_some_and(|el| el.has_class(class)))
    }

    /// Images under `root` that sit inside a `container` element and have a
    /// non-empty `src`, in document order.
    #[must_use]
    pub fn thumbnail_images(&self, root: ElementId, container: &str) -> Vec<ElementId> {
        self.descendants(root)
            .into_iter()
            .filter(|&id| {
                let Some(el) = self.get(id) else {
                    return false;
                };
                el.tag == "img"
                    && el.image.as_ref().is_some_and(ImageElement::has_source)
                    && self
                        .ancestors(id)
                        .any(|a| self.get(a).is_some_and(|p| p.has_class(container)))
            })
            .collect()
    }
}

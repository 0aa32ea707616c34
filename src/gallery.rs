//! File-system host: builds a thumbnail page from image files, loads them and
//! renders the result as HTML.

use std::fmt;
use std::path::{Path, PathBuf};

use image::RgbaImage;

use crate::blur::{BlurFilter, BoxBlur};
use crate::dom::{Document, ElementId, ImageElement};
use crate::engine::{BackdropEngine, BackdropOptions, Outcome};
use crate::error::Result;
use crate::host::Page;

/// One image file placed on the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thumbnail {
    /// Source file.
    pub path: PathBuf,
    /// The `img` element created for it.
    pub image: ElementId,
}

/// A page of thumbnails backed by files.
#[derive(Debug)]
pub struct Gallery<F = BoxBlur> {
    page: Page<F>,
    thumbnails: Vec<Thumbnail>,
}

impl<F: BlurFilter> Gallery<F> {
    /// Lay out one `container > (backdrop, img)` group per path.
    ///
    /// `display` becomes each image's rendered box size; without it the
    /// decoded size is used.
    pub fn from_paths(
        paths: &[PathBuf],
        display: Option<(u32, u32)>,
        engine: BackdropEngine<F>,
    ) -> Self {
        let mut doc = Document::new();
        let body = doc.body();
        let options = engine.options();
        let thumbnails = paths
            .iter()
            .map(|path| {
                let wrapper = doc.append(body, "div", &[options.container_class.as_str()]);
                doc.append(wrapper, "div", &[options.backdrop_class.as_str()]);
                let mut img = ImageElement::new(path.to_string_lossy());
                if let Some((w, h)) = display {
                    img = img.with_client_size(w, h);
                }
                Thumbnail {
                    path: path.clone(),
                    image: doc.append_image(wrapper, img),
                }
            })
            .collect();

        Self {
            page: Page::new(doc, engine),
            thumbnails,
        }
    }

    /// Run the page: parse, wait out the init delay, then deliver a load or
    /// error event per file depending on whether it decodes.
    pub fn run(&mut self) {
        self.page.content_parsed();
        let delay = self.page.engine().options().init_delay;
        self.page.advance(delay);

        let paths: Vec<&Path> = self.thumbnails.iter().map(|t| t.path.as_path()).collect();
        let decoded = decode_all(&paths);

        for (thumb, result) in self.thumbnails.iter().zip(decoded) {
            match result {
                Ok(pixels) => {
                    self.page.image_loaded(thumb.image, pixels);
                }
                Err(e) => {
                    tracing::debug!(path = %thumb.path.display(), error = %e, "decode failed");
                    self.page.image_failed(thumb.image);
                }
            }
        }
    }

    /// The hosted page.
    #[must_use]
    pub fn page(&self) -> &Page<F> {
        &self.page
    }

    /// Thumbnails in page order.
    #[must_use]
    pub fn thumbnails(&self) -> &[Thumbnail] {
        &self.thumbnails
    }

    /// Each thumbnail paired with its outcome (if it has one yet).
    pub fn results(&self) -> impl Iterator<Item = (&Thumbnail, Option<&Outcome>)> + '_ {
        self.thumbnails
            .iter()
            .map(|t| (t, self.page.outcome_for(t.image)))
    }

    /// Render the page as a standalone HTML document.
    #[must_use]
    pub fn to_html(&self) -> String {
        let options = self.page.engine().options();
        let doc = self.page.document();
        let mut out = String::new();
        out.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<style>\n");
        out.push_str(&stylesheet(options));
        out.push_str("</style>\n</head>\n");
        out.push_str(&render_html(doc, doc.body()));
        out.push_str("\n</html>\n");
        out
    }
}

fn stylesheet(options: &BackdropOptions) -> String {
    format!(
        ".{c} {{ position: relative; display: inline-block; width: 240px; height: 180px; \
         overflow: hidden; margin: 8px; }}\n\
         .{b} {{ position: absolute; inset: 0; }}\n\
         .{c} img {{ position: relative; width: 100%; height: 100%; object-fit: contain; }}\n",
        c = options.container_class,
        b = options.backdrop_class,
    )
}

/// Check if a file has a supported image extension.
#[must_use]
pub fn is_supported_image(path: &Path) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => matches!(
            ext.to_lowercase().as_str(),
            "jpg" | "jpeg" | "png" | "webp" | "bmp" | "gif"
        ),
        None => false,
    }
}

/// Supported image files directly inside `dir`, sorted by path.
///
/// # Errors
///
/// Returns [`crate::Error::Io`] if the directory cannot be read.
pub fn collect_images(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(std::result::Result::ok)
        .filter(|e| e.file_type().map(|ft| ft.is_file()).unwrap_or(false))
        .map(|e| e.path())
        .filter(|p| is_supported_image(p))
        .collect();
    paths.sort();
    Ok(paths)
}

/// Decode an image file into RGBA pixels.
///
/// # Errors
///
/// Returns an error if the file cannot be read or decoded.
pub fn decode(path: &Path) -> Result<RgbaImage> {
    Ok(image::open(path)?.to_rgba8())
}

/// Decode many files, in parallel when the `cli` feature is enabled (via rayon).
#[must_use]
pub fn decode_all(paths: &[&Path]) -> Vec<Result<RgbaImage>> {
    #[cfg(feature = "cli")]
    {
        use rayon::prelude::*;
        paths.par_iter().map(|p| decode(p)).collect()
    }

    #[cfg(not(feature = "cli"))]
    {
        paths.iter().map(|p| decode(p)).collect()
    }
}

/// Serialize the subtree rooted at `root` as HTML with inline styles.
#[must_use]
pub fn render_html(doc: &Document, root: ElementId) -> String {
    let mut out = String::new();
    write_element(doc, root, 0, &mut out).map_or_else(|_| String::new(), |()| out)
}

fn write_element<W: fmt::Write>(
    doc: &Document,
    id: ElementId,
    depth: usize,
    out: &mut W,
) -> fmt::Result {
    let Some(el) = doc.get(id) else {
        return Ok(());
    };
    let indent = "  ".repeat(depth);
    write!(out, "{indent}<{}", el.tag)?;
    if !el.classes.is_empty() {
        write!(out, " class=\"{}\"", escape_attr(&el.classes.join(" ")))?;
    }
    if !el.style.is_empty() {
        write!(out, " style=\"{}\"", escape_attr(&el.style.to_css()))?;
    }
    if let Some(img) = &el.image {
        if let Some(src) = &img.src {
            write!(out, " src=\"{}\"", escape_attr(src))?;
        }
        if img.width > 0 && img.height > 0 {
            write!(out, " width=\"{}\" height=\"{}\"", img.width, img.height)?;
        }
        return out.write_char('>');
    }
    out.write_char('>')?;
    if el.children().is_empty() {
        return write!(out, "</{}>", el.tag);
    }
    out.write_char('\n')?;
    for &child in el.children() {
        write_element(doc, child, depth + 1, out)?;
        out.write_char('\n')?;
    }
    write!(out, "{indent}</{}>", el.tag)
}

fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}

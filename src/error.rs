//! Error types for the thumbnail-backdrop crate.

use crate::dom::ElementId;

/// Errors that can occur while producing a backdrop for a thumbnail.
///
/// Lookup and render failures never escape [`crate::BackdropEngine`]; they are
/// reported inside an [`crate::Outcome`] instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The element handed to the engine is not an image.
    #[error("element {0} is not an image")]
    NotAnImage(ElementId),

    /// No ancestor of the image carries the container class.
    #[error("no `.{class}` container found for image {image}")]
    MissingContainer {
        /// The image being processed.
        image: ElementId,
        /// Container class that was searched for.
        class: String,
    },

    /// The container holds no element with the backdrop class.
    #[error("no `.{class}` element found within container {container}")]
    MissingBackdrop {
        /// The resolved container.
        container: ElementId,
        /// Backdrop class that was searched for.
        class: String,
    },

    /// The image has no decoded pixel data to draw (still loading or broken).
    #[error("image has no decoded pixel data")]
    NotDecoded,

    /// Pixel access was refused because cross-origin data was drawn into the canvas.
    #[error("canvas is tainted by cross-origin image data")]
    Tainted,

    /// The working canvas has no pixels to read back.
    #[error("canvas has zero area ({width}x{height})")]
    EmptyCanvas {
        /// Canvas width in pixels.
        width: u32,
        /// Canvas height in pixels.
        height: u32,
    },

    /// The blur capability reported a failure.
    #[error("blur filter failed: {0}")]
    Filter(String),

    /// The image resource failed to load.
    #[error("image failed to load")]
    LoadFailed,

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file format is not supported.
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// An error occurred while decoding or encoding image data.
    #[error("image processing error: {0}")]
    Image(#[from] image::ImageError),
}

impl Error {
    /// Whether this error comes from resolving the container/backdrop pair.
    #[must_use]
    pub fn is_lookup(&self) -> bool {
        matches!(
            self,
            Self::NotAnImage(_) | Self::MissingContainer { .. } | Self::MissingBackdrop { .. }
        )
    }
}

/// A specialized `Result` type for this crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let io_err = Error::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert!(io_err.to_string().contains("gone"));

        let unsupported = Error::UnsupportedFormat("tiff".to_string());
        assert!(unsupported.to_string().contains("tiff"));

        let empty = Error::EmptyCanvas {
            width: 0,
            height: 3,
        };
        assert!(empty.to_string().contains("0x3"));

        let missing = Error::MissingBackdrop {
            container: ElementId::from_index(4),
            class: "thumbnail-blur-bg".to_string(),
        };
        let msg = missing.to_string();
        assert!(msg.contains(".thumbnail-blur-bg"));
        assert!(msg.contains("#4"));
    }

    #[test]
    fn lookup_errors_are_classified() {
        assert!(Error::NotAnImage(ElementId::from_index(0)).is_lookup());
        assert!(Error::MissingContainer {
            image: ElementId::from_index(1),
            class: "x".into(),
        }
        .is_lookup());
        assert!(!Error::Tainted.is_lookup());
        assert!(!Error::LoadFailed.is_lookup());
    }
}

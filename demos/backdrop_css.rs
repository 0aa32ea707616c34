//! Print the backdrop style computed for a single image.
//!
//! Usage:
//! ```sh
//! cargo run --example backdrop_css -- photo.jpg
//! ```

use std::env;
use std::process;

use thumbnail_backdrop::{BackdropEngine, Document, ImageElement, Outcome};

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <image>", args[0]);
        process::exit(1);
    }

    let input = &args[1];
    let pixels = match thumbnail_backdrop::gallery::decode(input.as_ref()) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };

    let mut doc = Document::new();
    let body = doc.body();
    let wrapper = doc.append(body, "div", &["thumbnail-wrapper"]);
    let backdrop = doc.append(wrapper, "div", &["thumbnail-blur-bg"]);
    let img = doc.append_image(wrapper, ImageElement::new(input.as_str()).loaded(pixels));

    let engine = BackdropEngine::new();
    match engine.blur(&mut doc, img) {
        Outcome::Blurred(report) => eprintln!(
            "Blurred on a {}x{} canvas (radius {})",
            report.canvas_width, report.canvas_height, report.radius
        ),
        Outcome::FallbackApplied { cause, .. } => eprintln!("Fallback: {cause}"),
        Outcome::Skipped(cause) => {
            eprintln!("Skipped: {cause}");
            process::exit(1);
        }
    }

    if let Some(style) = doc.style(backdrop) {
        println!("{}", style.to_css());
    }
}

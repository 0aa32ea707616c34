use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use thumbnail_backdrop::gallery::{self, Thumbnail};
use thumbnail_backdrop::{BackdropEngine, BackdropOptions, Error, Gallery, Outcome};

#[derive(Parser)]
#[command(
    name = "thumb-backdrop",
    about = "Render blurred backdrops for thumbnail images",
    version,
    after_help = "Simple usage: thumb-backdrop <image-or-dir> -o gallery.html\n\n\
                  Each image is downsampled, box-blurred and embedded as a PNG data URI\n\
                  behind its thumbnail. Images that cannot be blurred get a flat fallback colour."
)]
struct Cli {
    /// Input image file or directory
    input: String,

    /// Write the rendered page to this HTML file
    #[arg(short, long)]
    output: Option<String>,

    /// Blur radius in display pixels
    #[arg(short, long, default_value = "20")]
    radius: f32,

    /// Ratio between display size and blur canvas size (0.0-1.0]
    #[arg(short, long, default_value = "0.1")]
    downsample: f32,

    /// Displayed thumbnail width (defaults to the decoded width)
    #[arg(long, requires = "height")]
    width: Option<u32>,

    /// Displayed thumbnail height (defaults to the decoded height)
    #[arg(long, requires = "width")]
    height: Option<u32>,

    /// Backdrop colour used when blurring fails
    #[arg(long, default_value = "#f3f4f6")]
    fallback_color: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all non-error output
    #[arg(short, long)]
    quiet: bool,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if !(cli.downsample > 0.0 && cli.downsample <= 1.0) {
        eprintln!("Error: Downsample factor must be in (0.0, 1.0]");
        process::exit(1);
    }

    if !(cli.radius >= 0.0 && cli.radius.is_finite()) {
        eprintln!("Error: Radius must be a non-negative number");
        process::exit(1);
    }

    let input_path = Path::new(&cli.input);
    if !input_path.exists() {
        eprintln!("Error: Input path does not exist: {}", cli.input);
        process::exit(1);
    }

    let paths: Vec<PathBuf> = if input_path.is_dir() {
        match gallery::collect_images(input_path) {
            Ok(p) => p,
            Err(e) => {
                eprintln!("Error: Failed to read directory: {e}");
                process::exit(1);
            }
        }
    } else {
        vec![input_path.to_path_buf()]
    };

    if paths.is_empty() {
        eprintln!("Error: No supported images found in {}", cli.input);
        process::exit(1);
    }

    let options = BackdropOptions {
        radius: cli.radius,
        downsample: cli.downsample,
        fallback_color: cli.fallback_color.clone(),
        ..BackdropOptions::default()
    };
    let display = cli.width.zip(cli.height);

    let mut gallery = Gallery::from_paths(&paths, display, BackdropEngine::with_options(options));
    gallery.run();

    let mut blurred = 0u32;
    let mut fallback = 0u32;
    let mut skipped = 0u32;

    for (thumb, outcome) in gallery.results() {
        print_result(thumb, outcome, &cli);
        match outcome {
            Some(Outcome::Blurred(_)) => blurred += 1,
            Some(Outcome::FallbackApplied { .. }) => fallback += 1,
            Some(Outcome::Skipped(_)) | None => skipped += 1,
        }
    }

    if let Some(output) = &cli.output {
        if let Err(e) = write_output(Path::new(output), &gallery.to_html()) {
            eprintln!("Error: Failed to write {output}: {e}");
            process::exit(1);
        }
        if !cli.quiet {
            eprintln!("Wrote {output}");
        }
    }

    if paths.len() > 1 && !cli.quiet {
        eprintln!();
        eprint!("[Summary] Blurred: {blurred}");
        if fallback > 0 {
            eprint!(", Fallback: {fallback}");
        }
        if skipped > 0 {
            eprint!(", Skipped: {skipped}");
        }
        eprintln!(" (Total: {})", paths.len());
    }

    if fallback > 0 {
        process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose {
        "warn,thumbnail_backdrop=debug"
    } else {
        "warn"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

fn write_output(path: &Path, html: &str) -> Result<(), Error> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, html)?;
    Ok(())
}

fn print_result(thumb: &Thumbnail, outcome: Option<&Outcome>, cli: &Cli) {
    let filename = thumb.path.file_name().map_or_else(
        || thumb.path.display().to_string(),
        |f| f.to_string_lossy().to_string(),
    );

    match outcome {
        Some(Outcome::Blurred(report)) => {
            if !cli.quiet {
                eprintln!(
                    "[OK] {filename} ({}x{} canvas, radius {})",
                    report.canvas_width, report.canvas_height, report.radius
                );
            }
            if cli.verbose {
                eprintln!("  -> data URI of {} bytes", report.data_url_len);
            }
        }
        Some(Outcome::FallbackApplied { cause, .. }) => {
            eprintln!("[FALLBACK] {filename}: {cause}");
        }
        Some(Outcome::Skipped(cause)) => {
            if !cli.quiet {
                eprintln!("[SKIP] {filename}: {cause}");
            }
        }
        None => {
            if !cli.quiet {
                eprintln!("[SKIP] {filename}: no outcome");
            }
        }
    }
}

#![warn(missing_docs)]
//! # collage-app binary
//!
//! Headless entry point: lists templates and exports collages from files.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use collage_app::{APP_VERSION, ExportConfig, export_files, template_listing};
use collage_core::{DEFAULT_TEMPLATE_ID, EditorSettings};
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "collage-app", version = APP_VERSION)]
#[command(about = "Compose photos into template collages")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List stock templates with their slot counts.
    Templates,
    /// Fill a template with images and export a JPEG.
    Render(RenderArgs),
}

#[derive(Debug, Args)]
struct RenderArgs {
    /// Template id.
    #[arg(long, default_value = DEFAULT_TEMPLATE_ID)]
    template: String,
    /// Store root; the collage lands in `<out>/<album>`.
    #[arg(long)]
    out: PathBuf,
    /// Square export edge in pixels (overrides COLLAGE_EXPORT_SIZE_PX).
    #[arg(long)]
    size: Option<u32>,
    /// Gutter between slots in pixels.
    #[arg(long)]
    spacing: Option<f32>,
    /// Slot corner radius in pixels.
    #[arg(long)]
    corner_radius: Option<f32>,
    /// Images for slots 0, 1, ... in order; missing slots get placeholders.
    images: Vec<PathBuf>,
}

/// CLI entry point.
fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Templates => {
            for line in template_listing() {
                println!("{line}");
            }
            ExitCode::SUCCESS
        }
        Command::Render(args) => match run_render(args) {
            Ok(path) => {
                println!("{path}");
                ExitCode::SUCCESS
            }
            Err(error) => {
                error!(%error, "render failed");
                eprintln!("collage-app: {error}");
                ExitCode::FAILURE
            }
        },
    }
}

fn run_render(args: RenderArgs) -> Result<String, collage_app::AppError> {
    let mut config = ExportConfig::from_env();
    if let Some(size) = args.size {
        config = config.with_size_px(size)?;
    }

    let mut settings = EditorSettings::default();
    if let Some(spacing) = args.spacing {
        settings.set_spacing(spacing);
    }
    if let Some(radius) = args.corner_radius {
        settings.set_corner_radius(radius);
    }

    let saved = export_files(&args.template, &args.images, &args.out, config, settings)?;
    Ok(saved.to_string())
}

//! Pixmill CLI: run image pipelines on local files.
//!
//! Codec defaults and limits come from `PIXMILL_*` environment variables (or `.env`).

use anyhow::Context;
use clap::{Parser, Subcommand};
use pixmill_cli::{init_tracing, load_pipeline, render_self_test, resolve_output_format};
use pixmill_core::Config;
use pixmill_processing::{ImageTransformer, OutputSpec};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pixmill", about = "Image transformation pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode an image, apply operations and write the encoded result
    Process {
        /// Input image file
        input: PathBuf,
        /// Output image file
        output: PathBuf,
        /// JSON file holding an operation or an array of operations
        #[arg(long, value_name = "FILE")]
        ops: Option<PathBuf>,
        /// Inline JSON operation or array of operations
        #[arg(long, value_name = "JSON")]
        op: Option<String>,
        /// Output format: jpeg, png, webp, gif, bmp, avif (default: from output extension)
        #[arg(long)]
        format: Option<String>,
        /// Encoder quality 0-100 for lossy formats
        #[arg(long)]
        quality: Option<u8>,
    },
    /// Print dimensions, format and EXIF orientation of an image
    Probe {
        /// Image file
        file: PathBuf,
    },
    /// Render a red test image with white text as JPEG
    SelfTest {
        /// Where to write the image
        #[arg(long, default_value = "pixmill-self-test.jpg")]
        output: PathBuf,
    },
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize output")?;
    println!("{}", out);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = Config::from_env().context("Failed to load configuration")?;
    let transformer = ImageTransformer::new(config.processor.clone());

    let cli = Cli::parse();

    match cli.command {
        Commands::Process {
            input,
            output,
            ops,
            op,
            format,
            quality,
        } => {
            let pipeline = load_pipeline(ops.as_deref(), op.as_deref())?;
            let format = resolve_output_format(&output, format.as_deref())?;
            let mut spec = OutputSpec::new(format);
            if let Some(quality) = quality {
                spec = spec.with_quality(quality);
            }

            let data = tokio::fs::read(&input)
                .await
                .with_context(|| format!("Failed to read {}", input.display()))?;

            let task = tokio::task::spawn_blocking(move || {
                transformer.execute(&data, None, &pipeline, spec)
            });
            let encoded = tokio::time::timeout(config.processor.processing_timeout, task)
                .await
                .context("Image processing timed out")?
                .context("Image processing task failed")?
                .with_context(|| format!("Failed to process {}", input.display()))?;

            tokio::fs::write(&output, &encoded.bytes)
                .await
                .with_context(|| format!("Failed to write {}", output.display()))?;

            tracing::info!(
                output = %output.display(),
                format = %encoded.format,
                width = encoded.width,
                height = encoded.height,
                size_bytes = encoded.len(),
                "Wrote image"
            );
        }
        Commands::Probe { file } => {
            let data = tokio::fs::read(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let info = transformer
                .probe(&data)
                .with_context(|| format!("Failed to probe {}", file.display()))?;
            print_json(&info)?;
        }
        Commands::SelfTest { output } => {
            let encoded = render_self_test(&transformer)?;
            tokio::fs::write(&output, &encoded.bytes)
                .await
                .with_context(|| format!("Failed to write {}", output.display()))?;
            tracing::info!(
                output = %output.display(),
                size_bytes = encoded.len(),
                "Self-test image written"
            );
        }
    }

    Ok(())
}

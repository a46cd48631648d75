use anyhow::{bail, Context};
use pixmill_processing::{
    Color, EncodedImage, ImageTransformer, Operation, OutputFormat, OutputSpec, Pipeline,
    PixelBuffer,
};
use std::path::Path;

pub const SELF_TEST_WIDTH: u32 = 300;
pub const SELF_TEST_HEIGHT: u32 = 200;
pub const SELF_TEST_QUALITY: u8 = 90;

/// Initialize tracing for CLI binaries.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Build a pipeline from `--ops <file>` or `--op <json>`; neither means no operations.
pub fn load_pipeline(ops_file: Option<&Path>, op_json: Option<&str>) -> anyhow::Result<Pipeline> {
    match (ops_file, op_json) {
        (Some(_), Some(_)) => bail!("--ops and --op cannot be used together"),
        (Some(path), None) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read operations file {}", path.display()))?;
            Pipeline::from_json(&json)
                .with_context(|| format!("Invalid operations in {}", path.display()))
        }
        (None, Some(json)) => Pipeline::from_json(json).context("Invalid --op JSON"),
        (None, None) => Ok(Pipeline::new()),
    }
}

/// Explicit `--format`, otherwise the output file extension
pub fn resolve_output_format(output: &Path, explicit: Option<&str>) -> anyhow::Result<OutputFormat> {
    if let Some(format) = explicit {
        return Ok(OutputFormat::parse(format)?);
    }
    let extension = output
        .extension()
        .and_then(|ext| ext.to_str())
        .with_context(|| {
            format!(
                "Cannot infer output format from {}; pass --format",
                output.display()
            )
        })?;
    OutputFormat::from_extension(extension)
        .with_context(|| format!("Unknown output extension: {}", extension))
}

/// Red canvas with white text, encoded as JPEG
pub fn render_self_test(transformer: &ImageTransformer) -> anyhow::Result<EncodedImage> {
    let canvas = PixelBuffer::new(SELF_TEST_WIDTH, SELF_TEST_HEIGHT, [255, 0, 0, 255])?;
    let pipeline = Pipeline::new().then(Operation::Text {
        text: "Pixmill self-test".to_string(),
        x: 20,
        y: 90,
        size: 16,
        color: Color::WHITE,
        font_path: None,
    });
    let output = OutputSpec::new(OutputFormat::Jpeg).with_quality(SELF_TEST_QUALITY);
    Ok(transformer.render(canvas, &pipeline, output)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_resolve_output_format() {
        assert_eq!(
            resolve_output_format(Path::new("out.JPG"), None).unwrap(),
            OutputFormat::Jpeg
        );
        assert_eq!(
            resolve_output_format(Path::new("out.bin"), Some("webp")).unwrap(),
            OutputFormat::Webp
        );
        assert!(resolve_output_format(Path::new("out"), None).is_err());
        assert!(resolve_output_format(Path::new("out.tiff"), None).is_err());
        assert!(resolve_output_format(Path::new("out.png"), Some("tiff")).is_err());
    }

    #[test]
    fn test_load_pipeline_sources() {
        assert!(load_pipeline(None, None).unwrap().is_empty());

        let pipeline = load_pipeline(None, Some(r#"{"op":"sepia"}"#)).unwrap();
        assert_eq!(pipeline.operations(), &[Operation::Sepia]);

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"op":"resize","width":10,"height":10}},{{"op":"invert"}}]"#
        )
        .unwrap();
        let pipeline = load_pipeline(Some(file.path()), None).unwrap();
        assert_eq!(pipeline.len(), 2);

        assert!(load_pipeline(Some(file.path()), Some(r#"{"op":"sepia"}"#)).is_err());
        assert!(load_pipeline(Some(Path::new("/nonexistent/ops.json")), None).is_err());
        assert!(load_pipeline(None, Some(r#"{"op":"emboss"}"#)).is_err());
    }

    #[test]
    fn test_render_self_test() {
        let encoded = render_self_test(&ImageTransformer::default()).unwrap();
        assert_eq!(encoded.format, OutputFormat::Jpeg);
        assert_eq!(encoded.quality, SELF_TEST_QUALITY);
        assert_eq!((encoded.width, encoded.height), (300, 200));
        assert_eq!(&encoded.bytes[..2], &[0xFF, 0xD8]);
    }
}

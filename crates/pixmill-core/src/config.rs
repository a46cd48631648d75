//! Configuration module
//!
//! Configuration is read from `PIXMILL_*` environment variables (a `.env` file is
//! loaded first when present). Every setting has a default so an empty environment
//! yields a working local setup.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::storage_types::StorageBackend;

const JPEG_QUALITY: u8 = 90;
const WEBP_QUALITY: u8 = 90;
const AVIF_QUALITY: u8 = 80;
const PNG_COMPRESSION: u8 = 6;
const MAX_DIMENSION: u32 = 16_384;
const MAX_INPUT_SIZE_MB: usize = 50;
const PROCESSING_TIMEOUT_SECS: u64 = 30;
const LOCAL_STORAGE_PATH: &str = "./storage";

/// Image pipeline settings
#[derive(Clone, Debug, PartialEq)]
pub struct ProcessorConfig {
    /// Apply EXIF orientation at decode time
    pub auto_orient: bool,
    pub jpeg_quality: u8,
    pub webp_quality: u8,
    pub avif_quality: u8,
    /// PNG compression level (0-9)
    pub png_compression: u8,
    /// Largest accepted width or height of a decoded image
    pub max_dimension: u32,
    pub max_input_bytes: usize,
    pub processing_timeout: Duration,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            auto_orient: true,
            jpeg_quality: JPEG_QUALITY,
            webp_quality: WEBP_QUALITY,
            avif_quality: AVIF_QUALITY,
            png_compression: PNG_COMPRESSION,
            max_dimension: MAX_DIMENSION,
            max_input_bytes: MAX_INPUT_SIZE_MB * 1024 * 1024,
            processing_timeout: Duration::from_secs(PROCESSING_TIMEOUT_SECS),
        }
    }
}

/// Blob storage settings
#[derive(Clone, Debug, PartialEq)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub local_storage_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Local,
            local_storage_path: PathBuf::from(LOCAL_STORAGE_PATH),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Config {
    pub environment: String,
    pub processor: ProcessorConfig,
    pub storage: StorageConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    ///
    /// Unset keys fall back to defaults; set but unparsable keys are an error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let processor_defaults = ProcessorConfig::default();
        let storage_defaults = StorageConfig::default();

        let environment = lookup("PIXMILL_ENV")
            .or_else(|| lookup("APP_ENV"))
            .unwrap_or_else(|| "development".to_string());

        let processor = ProcessorConfig {
            auto_orient: parse_or(&lookup, "PIXMILL_AUTO_ORIENT", processor_defaults.auto_orient)?,
            jpeg_quality: parse_quality(&lookup, "PIXMILL_JPEG_QUALITY", processor_defaults.jpeg_quality)?,
            webp_quality: parse_quality(&lookup, "PIXMILL_WEBP_QUALITY", processor_defaults.webp_quality)?,
            avif_quality: parse_quality(&lookup, "PIXMILL_AVIF_QUALITY", processor_defaults.avif_quality)?,
            png_compression: parse_or(&lookup, "PIXMILL_PNG_COMPRESSION", processor_defaults.png_compression)?,
            max_dimension: parse_or(&lookup, "PIXMILL_MAX_DIMENSION", processor_defaults.max_dimension)?,
            max_input_bytes: parse_megabytes(&lookup, "PIXMILL_MAX_INPUT_SIZE_MB", MAX_INPUT_SIZE_MB)?,
            processing_timeout: Duration::from_secs(parse_or(
                &lookup,
                "PIXMILL_PROCESSING_TIMEOUT_SECS",
                PROCESSING_TIMEOUT_SECS,
            )?),
        };

        if processor.png_compression > 9 {
            return Err(anyhow::anyhow!(
                "PIXMILL_PNG_COMPRESSION must be between 0 and 9, got {}",
                processor.png_compression
            ));
        }
        if processor.max_dimension == 0 {
            return Err(anyhow::anyhow!("PIXMILL_MAX_DIMENSION must be positive"));
        }

        let storage = StorageConfig {
            backend: parse_or(&lookup, "PIXMILL_STORAGE_BACKEND", storage_defaults.backend)?,
            local_storage_path: lookup("PIXMILL_STORAGE_PATH")
                .map(PathBuf::from)
                .unwrap_or(storage_defaults.local_storage_path),
        };

        Ok(Config {
            environment,
            processor,
            storage,
        })
    }

    pub fn is_production(&self) -> bool {
        matches!(self.environment.to_lowercase().as_str(), "production" | "prod")
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, anyhow::Error>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("Invalid value for {}: {} ({})", key, raw, e)),
        _ => Ok(default),
    }
}

fn parse_quality<F>(lookup: &F, key: &str, default: u8) -> Result<u8, anyhow::Error>
where
    F: Fn(&str) -> Option<String>,
{
    let quality: u8 = parse_or(lookup, key, default)?;
    if quality > 100 {
        return Err(anyhow::anyhow!("{} must be between 0 and 100, got {}", key, quality));
    }
    Ok(quality)
}

/// Megabyte setting converted to bytes
fn parse_megabytes<F>(lookup: &F, key: &str, default: usize) -> Result<usize, anyhow::Error>
where
    F: Fn(&str) -> Option<String>,
{
    let megabytes: usize = parse_or(lookup, key, default)?;
    megabytes
        .checked_mul(1024 * 1024)
        .ok_or_else(|| anyhow::anyhow!("{} is too large: {}", key, megabytes))
}

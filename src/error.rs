//! Error types for every fallible concern in the crate.
//!
//! Formatting payloads never fails, so there is no payload error. Everything else
//! (building an encoder instance, loading a logo, exporting, configuration and the
//! persisted theme) has its own enum so callers can tell a validation problem from
//! an I/O failure.

use thiserror::Error;

/// Failure to create or patch an encoder instance.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("payload is empty")]
    EmptyPayload,

    #[error("payload does not fit in a QR code: {0}")]
    Encode(String),

    #[error("canvas {width}x{height} exceeds the {max}x{max} pixel limit")]
    CanvasTooLarge { width: u32, height: u32, max: u32 },

    #[error("canvas {width}x{height} with margin {margin} is too small for {modules} modules")]
    CanvasTooSmall {
        width: u32,
        height: u32,
        margin: u32,
        modules: usize,
    },
}

/// Rejections and failures while accepting a logo image.
#[derive(Debug, Error)]
pub enum LogoError {
    #[error("Please select a valid image file ({0})")]
    InvalidType(String),

    #[error("Image size should be less than 5MB (got {0})")]
    TooLarge(String),

    #[error("Failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("Failed to read image: {0}")]
    Io(#[from] std::io::Error),

    #[error("Logo loading task failed: {0}")]
    Task(String),
}

impl LogoError {
    /// Validation errors are reported before any processing and leave state untouched.
    pub fn is_validation(&self) -> bool {
        matches!(self, LogoError::InvalidType(_) | LogoError::TooLarge(_))
    }
}

/// Failures while producing or writing an export.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("an export is already in progress")]
    Busy,

    #[error("No QR code to download")]
    NothingToExport,

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("image encoding failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("PDF generation failed: {0}")]
    Pdf(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<lopdf::Error> for ExportError {
    fn from(err: lopdf::Error) -> Self {
        ExportError::Pdf(err.to_string())
    }
}

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// Errors reading or writing the persisted theme preference.
#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("theme has not been initialized")]
    Uninitialized,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canvas_too_small_display() {
        let error = RenderError::CanvasTooSmall {
            width: 20,
            height: 20,
            margin: 4,
            modules: 21,
        };
        assert_eq!(
            error.to_string(),
            "canvas 20x20 with margin 4 is too small for 21 modules"
        );
    }

    #[test]
    fn test_unsupported_format_display() {
        let error = ExportError::UnsupportedFormat("gif".to_string());
        assert_eq!(error.to_string(), "Unsupported format: gif");
    }

    #[test]
    fn test_logo_validation_classification() {
        assert!(LogoError::InvalidType("text/plain".into()).is_validation());
        assert!(LogoError::TooLarge("6 MB".into()).is_validation());
        assert!(!LogoError::Task("join".into()).is_validation());
    }
}

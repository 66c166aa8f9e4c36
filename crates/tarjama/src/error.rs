//! Error types for Tarjama.
//!
//! All errors in the library use [`TarjamaError`], which preserves error
//! chains via `#[source]` attributes and carries enough context (stage,
//! backend name, job id) to diagnose a failed job from its record alone.
//!
//! Fatality is a policy decision made at the call site, not a property of
//! the variant: `Ocr` errors are absorbed by the fusion layer (fallback
//! engine, then empty result), `Translation` errors degrade to per-item
//! retries before surfacing, while `Extraction` and `Timeout` errors
//! terminate the job.

use thiserror::Error;

/// Result type alias using `TarjamaError`.
pub type Result<T> = std::result::Result<T, TarjamaError>;

/// Main error type for all Tarjama operations.
///
/// # Variants
///
/// - `Extraction` - unreadable/unsupported input, missing OCR callback
/// - `Ocr` - OCR backend failure (absorbed locally, never job-fatal)
/// - `Translation` - translation backend failure (fatal only after the
///   per-item fallback also fails)
/// - `Timeout` - a job exceeded its wall-clock budget
/// - `NotFound` - job-store lookup miss
/// - `InvalidState` - illegal job transition (double claim, results
///   requested before completion)
/// - `ImageProcessing` - raster decode/preprocess failure
/// - `Validation` - invalid configuration or parameters
/// - `Serialization` - JSON encode/decode failure
/// - `Io` - file system errors (always bubble up unchanged)
#[derive(Debug, Error)]
pub enum TarjamaError {
    #[error("Extraction error: {message}")]
    Extraction {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("OCR error: {message}")]
    Ocr {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Translation error: {message}")]
    Translation {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Image processing error: {message}")]
    ImageProcessing {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Validation error: {message}")]
    Validation {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Serialization error: {message}")]
    Serialization {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for TarjamaError {
    fn from(err: serde_json::Error) -> Self {
        TarjamaError::Serialization {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

macro_rules! error_constructor {
    ($name:ident, $with_source:ident, $variant:ident) => {
        pub fn $name<S: Into<String>>(message: S) -> Self {
            Self::$variant {
                message: message.into(),
                source: None,
            }
        }

        pub fn $with_source<S: Into<String>, E: std::error::Error + Send + Sync + 'static>(
            message: S,
            source: E,
        ) -> Self {
            Self::$variant {
                message: message.into(),
                source: Some(Box::new(source)),
            }
        }
    };
}

impl TarjamaError {
    error_constructor!(extraction, extraction_with_source, Extraction);
    error_constructor!(ocr, ocr_with_source, Ocr);
    error_constructor!(translation, translation_with_source, Translation);
    error_constructor!(image_processing, image_processing_with_source, ImageProcessing);
    error_constructor!(validation, validation_with_source, Validation);
    error_constructor!(serialization, serialization_with_source, Serialization);

    /// Human-readable message without the variant prefix, suitable for the
    /// job record's public `error_message` field.
    pub fn public_message(&self) -> String {
        match self {
            TarjamaError::Extraction { message, .. }
            | TarjamaError::Ocr { message, .. }
            | TarjamaError::Translation { message, .. }
            | TarjamaError::ImageProcessing { message, .. }
            | TarjamaError::Validation { message, .. }
            | TarjamaError::Serialization { message, .. } => message.clone(),
            TarjamaError::Timeout(msg)
            | TarjamaError::NotFound(msg)
            | TarjamaError::InvalidState(msg) => msg.clone(),
            TarjamaError::Io(err) => err.to_string(),
        }
    }

    /// Diagnostic detail for operators: the full error chain, one cause per
    /// line. Stored on the job record as `error_detail`, not part of the
    /// public contract.
    pub fn diagnostic_detail(&self) -> String {
        let mut detail = format!("{self}");
        let mut cause: Option<&(dyn std::error::Error + 'static)> = std::error::Error::source(self);
        while let Some(err) = cause {
            detail.push_str("\ncaused by: ");
            detail.push_str(&err.to_string());
            cause = err.source();
        }
        detail
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: TarjamaError = io_err.into();
        assert!(matches!(err, TarjamaError::Io(_)));
        assert!(err.to_string().contains("IO error"));
    }

    #[test]
    fn test_extraction_error() {
        let err = TarjamaError::extraction("unsupported file type: odt");
        assert_eq!(err.to_string(), "Extraction error: unsupported file type: odt");
    }

    #[test]
    fn test_extraction_error_with_source() {
        let source = std::io::Error::new(std::io::ErrorKind::InvalidData, "bad data");
        let err = TarjamaError::extraction_with_source("unreadable page", source);
        assert_eq!(err.to_string(), "Extraction error: unreadable page");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_ocr_error() {
        let err = TarjamaError::ocr("backend unavailable");
        assert_eq!(err.to_string(), "OCR error: backend unavailable");
    }

    #[test]
    fn test_translation_error() {
        let err = TarjamaError::translation("model not loaded");
        assert_eq!(err.to_string(), "Translation error: model not loaded");
    }

    #[test]
    fn test_timeout_error() {
        let err = TarjamaError::Timeout("job exceeded 1800s budget".to_string());
        assert_eq!(err.to_string(), "Timeout: job exceeded 1800s budget");
    }

    #[test]
    fn test_invalid_state_error() {
        let err = TarjamaError::InvalidState("job already claimed".to_string());
        assert_eq!(err.to_string(), "Invalid state: job already claimed");
    }

    #[test]
    fn test_serde_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err: TarjamaError = json_err.into();
        assert!(matches!(err, TarjamaError::Serialization { .. }));
    }

    #[test]
    fn test_public_message_strips_prefix() {
        let err = TarjamaError::extraction("both strategies failed");
        assert_eq!(err.public_message(), "both strategies failed");
    }

    #[test]
    fn test_diagnostic_detail_includes_chain() {
        let source = std::io::Error::new(std::io::ErrorKind::InvalidData, "truncated stream");
        let err = TarjamaError::extraction_with_source("unreadable page", source);
        let detail = err.diagnostic_detail();
        assert!(detail.contains("unreadable page"));
        assert!(detail.contains("caused by: truncated stream"));
    }
}

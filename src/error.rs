//! Error kinds shared by every stage of the overlay pipeline.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, OverlayError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum OverlayError {
    /// No usable samples for an operation that needs at least one (or two).
    #[error("sample series has no usable samples")]
    EmptySeries,

    /// Gap-fill was asked to substitute before any valid sample was seen.
    #[error("no valid sample seen yet to carry forward")]
    NoValidSampleYet,

    /// Bounding region has zero width or height, so it cannot be projected.
    #[error("bounding region has zero extent")]
    DegenerateRegion,

    /// No timestamped samples to match a frame time against.
    #[error("no timestamped samples to match against")]
    NoUsableSamples,

    /// The source carries no decodable telemetry stream.
    #[error("no telemetry stream found in {file}")]
    NoTelemetryStream { file: String },

    /// The external extractor failed for a source.
    #[error("telemetry extraction failed for {file}: {message}")]
    Extraction { file: String, message: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl OverlayError {
    pub fn no_telemetry(file: impl Into<String>) -> Self {
        Self::NoTelemetryStream { file: file.into() }
    }

    pub fn extraction(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Extraction {
            file: file.into(),
            message: message.into(),
        }
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}

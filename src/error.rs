use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HashError {
    #[error("Invalid hash size {size}: {reason}")]
    InvalidSize { size: usize, reason: &'static str },

    #[error("Malformed hex fingerprint: {message}")]
    Format { message: String },

    #[error("Fingerprints differ in length: {left} vs {right} bits")]
    SizeMismatch { left: usize, right: usize },

    #[error("Wavelet decomposition failed: {message}")]
    Decomposition { message: String },

    #[error("Segmentation unsupported: {message}")]
    SegmentationUnsupported { message: String },

    #[error("Image has no pixels ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },
}

impl HashError {
    pub(crate) fn format(message: impl Into<String>) -> Self {
        HashError::Format {
            message: message.into(),
        }
    }
}

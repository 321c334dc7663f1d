use thiserror::Error;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Sensor unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("Correspondence table has {actual} entries, expected {expected}")]
    PreconditionViolation { expected: usize, actual: usize },

    #[error("Buffer size mismatch: expected {expected} bytes, got {actual}")]
    BufferSizeMismatch { expected: usize, actual: usize },

    #[error("Invalid frame dimensions: width={0}, height={1}")]
    InvalidDimensions(usize, usize),

    #[error("Unsupported bytes per sample: {0} (expected 1..=4)")]
    UnsupportedSampleSize(usize),

    #[error("Failed to acquire frame: {0}")]
    AcquisitionFailed(String),

    #[error("Coordinate mapping failed: {0}")]
    MappingFailed(String),

    #[error("Failed to encode image: {0}")]
    EncodeError(String),

    #[error("Failed to write output file: {0}")]
    OutputWriteError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl CaptureError {
    /// Whether the error only invalidates the current cycle.
    ///
    /// Everything except a missing device is recoverable: the controller logs
    /// it and moves on to the next tick.
    pub fn is_per_cycle(&self) -> bool {
        !matches!(self, CaptureError::DeviceUnavailable(_))
    }
}

pub type Result<T> = std::result::Result<T, CaptureError>;

use thiserror::Error;

/// The error taxonomy for the whole container engine. Every payload codec,
/// the box-framing layer, the MJ2 sample-table/creator/player subsystems,
/// and the JPX feature-negotiation layer all surface one of these kinds
/// rather than falling back to a best-effort interpretation.
#[derive(Debug, Error)]
pub enum Jp2Error {
    #[error("truncated: {0}")]
    Truncated(String),

    #[error("file format violation: {0}")]
    FileFormat(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("operation cancelled")]
    Cancelled,

    #[error("decode failed for frame {frame_index}: {cause}")]
    DecodeFailed { frame_index: usize, cause: String },

    #[error("seek failed: {0}")]
    SeekFailed(String),

    #[error("player not initialized")]
    NotInitialized,

    #[error("no video tracks present")]
    NoVideoTracks,

    #[error("track not found: {0}")]
    TrackNotFound(u32),

    #[error("inconsistent frame dimensions")]
    InconsistentDimensions,

    #[error("inconsistent component counts")]
    InconsistentComponents,

    #[error("incompatible features: {missing:?}")]
    IncompatibleFeatures { missing: Vec<String> },

    #[error(transparent)]
    Codestream(#[from] jpc::JpcError),

    #[error(transparent)]
    Icc(#[from] icc::IccError),
}

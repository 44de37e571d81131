use crate::event::{InvalidEvent, Version};

/// Everything that can stop a build from being recorded.
///
/// Downstream failures are passed through with their original text. Nothing is
/// rolled back, so a failure after the first write can leave a record without
/// its second half, or records that are not yet in the index.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Invalid(#[from] InvalidEvent),

    #[error(transparent)]
    Geometry(anyhow::Error),

    #[error("failed to compress geometry: {0}")]
    Encode(#[from] std::io::Error),

    #[error(transparent)]
    Store(anyhow::Error),

    #[error("no tile index exists for version {version}")]
    IndexMissing { version: Version },

    #[error("tile index for version {version} is not a JSON integer array: {source}")]
    IndexCorrupt {
        version: Version,
        source: serde_json::Error,
    },

    #[error(
        "gave up updating the tile index for version {version} after {attempts} conflicting writes"
    )]
    IndexContention { version: Version, attempts: usize },
}

use thiserror::Error;

/// Errors that can occur while setting up a roomgame session.
#[derive(Debug, Error)]
pub enum RoomgameError {
    #[error("Invalid grid dimensions: {0}")]
    InvalidGridDimensions(String),

    #[error("Unknown mesh: {0}")]
    UnknownMesh(String),

    #[error("Instance buffer allocation failed: {0}")]
    BufferAllocationFailed(String),
}

/// Errors raised while decoding a shared-state snapshot on a slave node.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Snapshot truncated: needed {needed} bytes at offset {offset}, {available} available")]
    Truncated {
        needed: usize,
        offset: usize,
        available: usize,
    },

    #[error("Snapshot length mismatch for {what}: expected {expected}, got {actual}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Snapshot holds invalid {what}: {value}")]
    InvalidValue { what: &'static str, value: u32 },
}

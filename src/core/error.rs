use thiserror::Error;

/// Integer status codes surfaced to API clients alongside [`SendFileError`].
/// `0` always means success; each nonzero value maps one failure category.
pub mod err_code {
    pub const NO_ERROR: i32 = 0;
    pub const INVALID_REQUEST: i32 = 1;
    pub const DEVICE_UNREACHABLE: i32 = 2;
    pub const INTERRUPTED: i32 = 3;
    pub const WRITE_FAILED: i32 = 4;
    pub const INTERNAL: i32 = 5;
}

/// Error taxonomy for the send-file subsystem.
///
/// Validation errors (`EmptyDeviceId`, `EmptyPathList`, `FileCountMismatch`)
/// are returned synchronously from `initiate`, before any session exists.
/// Transport errors surface asynchronously as the nonzero status code of an
/// already-running session.
#[derive(Debug, Error)]
pub enum SendFileError {
    #[error("device id must not be empty")]
    EmptyDeviceId,

    #[error("source and destination path lists must not be empty")]
    EmptyPathList,

    #[error(
        "path list lengths do not match declared file count: \
         {sources} sources, {dests} destinations, {declared} declared"
    )]
    FileCountMismatch {
        sources: usize,
        dests: usize,
        declared: u32,
    },

    #[error("device {0} is not reachable")]
    DeviceUnreachable(String),

    #[error("transfer interrupted: {0}")]
    Interrupted(String),

    #[error("destination write failed: {0}")]
    WriteFailed(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SendFileError {
    /// True for errors caught by request validation, before any async work
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            SendFileError::EmptyDeviceId
                | SendFileError::EmptyPathList
                | SendFileError::FileCountMismatch { .. }
        )
    }

    /// Status code reported through session results and completion events
    pub fn err_code(&self) -> i32 {
        match self {
            SendFileError::EmptyDeviceId
            | SendFileError::EmptyPathList
            | SendFileError::FileCountMismatch { .. } => err_code::INVALID_REQUEST,
            SendFileError::DeviceUnreachable(_) => err_code::DEVICE_UNREACHABLE,
            SendFileError::Interrupted(_) => err_code::INTERRUPTED,
            SendFileError::WriteFailed(_) => err_code::WRITE_FAILED,
            SendFileError::Io(_) => err_code::WRITE_FAILED,
        }
    }
}

use thiserror::Error;

use crate::window_directory::WindowIdentity;

/// Failure reported by a window backend (enumeration, screen layout or control).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

/// Outcome of a directory operation that could not be carried out.
///
/// Neither variant changes any state; callers report them and carry on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("window {0} is no longer present")]
    NotFound(WindowIdentity),

    #[error("screen index {index} out of range ({screens} screens)")]
    OutOfRange { index: usize, screens: usize },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("input capture lost: {0}")]
    Lost(String),
}

use crate::remote::RemoteError;
use std::sync::Arc;
use thiserror::Error;

pub type FsResult<T> = Result<T, FsError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FsError {
    #[error("No such entry: {0}")]
    NotFound(String),

    #[error("Not a directory: {0}")]
    NotADirectory(String),

    #[error("Is a directory: {0}")]
    IsADirectory(String),

    #[error("Read-only filesystem: {0}")]
    ReadOnly(String),

    #[error("Not supported: {0}")]
    Unsupported(String),

    #[error("Remote unavailable: {0}")]
    RemoteUnavailable(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Path too long: {0} bytes (max 4096)")]
    PathTooLong(usize),

    #[error("Filename too long: {0} bytes (max 255)")]
    FilenameTooLong(usize),

    #[error("Render failed: {0}")]
    Render(String),
}

impl FsError {
    /// Convert to POSIX errno
    pub fn to_errno(&self) -> i32 {
        match self {
            FsError::NotFound(_) => libc::ENOENT,
            FsError::NotADirectory(_) => libc::ENOTDIR,
            FsError::IsADirectory(_) => libc::EISDIR,
            FsError::ReadOnly(_) => libc::EROFS,
            FsError::Unsupported(_) => libc::ENOTSUP,
            FsError::RemoteUnavailable(_) => libc::EIO,
            FsError::InvalidPath(_) => libc::EINVAL,
            FsError::PathTooLong(_) | FsError::FilenameTooLong(_) => libc::ENAMETOOLONG,
            FsError::Render(_) => libc::EIO,
        }
    }
}

impl From<Arc<RemoteError>> for FsError {
    fn from(err: Arc<RemoteError>) -> Self {
        FsError::RemoteUnavailable(err.to_string())
    }
}

impl From<serde_yaml::Error> for FsError {
    fn from(err: serde_yaml::Error) -> Self {
        FsError::Render(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_error() {
        let err = FsError::NotFound("/My workspace/missing".to_string());
        assert_eq!(err.to_string(), "No such entry: /My workspace/missing");
    }

    #[test]
    fn test_read_only_error() {
        let err = FsError::ReadOnly("write /a/b/c".to_string());
        assert_eq!(err.to_string(), "Read-only filesystem: write /a/b/c");
    }

    #[test]
    fn test_path_too_long_error() {
        let err = FsError::PathTooLong(5000);
        assert_eq!(err.to_string(), "Path too long: 5000 bytes (max 4096)");
    }

    #[test]
    fn test_errno_mapping() {
        assert_eq!(FsError::NotFound("p".into()).to_errno(), libc::ENOENT);
        assert_eq!(FsError::NotADirectory("p".into()).to_errno(), libc::ENOTDIR);
        assert_eq!(FsError::IsADirectory("p".into()).to_errno(), libc::EISDIR);
        assert_eq!(FsError::ReadOnly("p".into()).to_errno(), libc::EROFS);
        assert_eq!(FsError::Unsupported("p".into()).to_errno(), libc::ENOTSUP);
        assert_eq!(FsError::RemoteUnavailable("p".into()).to_errno(), libc::EIO);
        assert_eq!(FsError::InvalidPath("p".into()).to_errno(), libc::EINVAL);
        assert_eq!(FsError::FilenameTooLong(300).to_errno(), libc::ENAMETOOLONG);
    }

    #[test]
    fn test_remote_error_becomes_remote_unavailable() {
        let err: FsError = Arc::new(RemoteError::Timeout).into();
        assert_eq!(err, FsError::RemoteUnavailable("Request timed out".to_string()));
    }
}

use thiserror::Error;

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Local file not found: {path}")]
    LocalResourceMissing { path: String },

    #[error("Source object not found: {path}")]
    SourceMissing { path: String },

    #[error("Write to {path} failed: {source}")]
    RemoteWrite {
        path: String,
        #[source]
        source: BoxError,
    },

    #[error("Write to {path} was acknowledged but the object is not visible")]
    RemoteVerification { path: String },

    #[error("Read of {path} failed: {source}")]
    RemoteRead {
        path: String,
        #[source]
        source: BoxError,
    },

    #[error("Fetch of {url} failed: {source}")]
    RemoteFetch {
        url: String,
        #[source]
        source: BoxError,
    },

    #[error("Image codec error: {message}")]
    Codec { message: String },

    #[error("Storage backend error: {source}")]
    Backend {
        #[source]
        source: BoxError,
    },

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

/// Coarse failure classes callers can branch on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageErrorKind {
    InvalidInput,
    LocalResourceMissing,
    RemoteWriteFailure,
    RemoteVerificationFailure,
    RemoteReadFailure,
}

impl StorageError {
    /// Create a backend error from any error type
    pub fn backend<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Backend {
            source: Box::new(error),
        }
    }

    /// Create an invalid input error
    pub fn invalid<S: Into<String>>(message: S) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create a missing local file error
    pub fn local_missing<S: Into<String>>(path: S) -> Self {
        Self::LocalResourceMissing { path: path.into() }
    }

    /// Create a missing source object error
    pub fn source_missing<S: Into<String>>(path: S) -> Self {
        Self::SourceMissing { path: path.into() }
    }

    /// Wrap a failed store write
    pub fn write<S, E>(path: S, error: E) -> Self
    where
        S: Into<String>,
        E: Into<BoxError>,
    {
        Self::RemoteWrite {
            path: path.into(),
            source: error.into(),
        }
    }

    /// Create a post-write verification error
    pub fn verification<S: Into<String>>(path: S) -> Self {
        Self::RemoteVerification { path: path.into() }
    }

    /// Wrap a failed store read
    pub fn read<S, E>(path: S, error: E) -> Self
    where
        S: Into<String>,
        E: Into<BoxError>,
    {
        Self::RemoteRead {
            path: path.into(),
            source: error.into(),
        }
    }

    /// Wrap a failed remote fetch
    pub fn fetch<S, E>(url: S, error: E) -> Self
    where
        S: Into<String>,
        E: Into<BoxError>,
    {
        Self::RemoteFetch {
            url: url.into(),
            source: error.into(),
        }
    }

    /// Create an image codec error
    pub fn codec<S: Into<String>>(message: S) -> Self {
        Self::Codec {
            message: message.into(),
        }
    }

    /// The failure class of this error
    pub fn kind(&self) -> StorageErrorKind {
        match self {
            Self::InvalidInput { .. } => StorageErrorKind::InvalidInput,
            Self::LocalResourceMissing { .. } | Self::SourceMissing { .. } => {
                StorageErrorKind::LocalResourceMissing
            }
            Self::RemoteWrite { .. } | Self::Codec { .. } => StorageErrorKind::RemoteWriteFailure,
            Self::RemoteVerification { .. } => StorageErrorKind::RemoteVerificationFailure,
            Self::RemoteRead { .. }
            | Self::RemoteFetch { .. }
            | Self::Backend { .. }
            | Self::Io { .. } => StorageErrorKind::RemoteReadFailure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_taxonomy() {
        assert_eq!(StorageError::invalid("x").kind(), StorageErrorKind::InvalidInput);
        assert_eq!(
            StorageError::source_missing("live/a.jpg").kind(),
            StorageErrorKind::LocalResourceMissing
        );
        assert_eq!(
            StorageError::codec("bad jpeg").kind(),
            StorageErrorKind::RemoteWriteFailure
        );
        assert_eq!(
            StorageError::verification("live/a.jpg").kind(),
            StorageErrorKind::RemoteVerificationFailure
        );
        assert_eq!(
            StorageError::fetch("http://x", "boom").kind(),
            StorageErrorKind::RemoteReadFailure
        );
    }

    #[test]
    fn write_error_keeps_source_message() {
        let err = StorageError::write("live/a.jpg", "disk full");
        assert_eq!(err.to_string(), "Write to live/a.jpg failed: disk full");
    }
}

//! Metadata document sources.
//!
//! A source supplies raw document bytes plus, when the backend supports it,
//! a push-style staleness signal (a file's modification time). Sources
//! without a signal rely purely on the provider's computed expiration.

use std::path::PathBuf;
use std::time::SystemTime;
use thiserror::Error;

mod file;
mod http;

pub use file::FileSource;
pub use http::{HttpSource, HttpSourceBuilder};

/// Supplies raw metadata document bytes to a provider.
pub trait DocumentSource: Send + Sync {
    /// Fetches the current document bytes.
    ///
    /// Implementations must release any file handle or connection before
    /// returning, including on failure.
    ///
    /// # Errors
    ///
    /// Returns a [`SourceError`] if the document cannot be retrieved.
    fn fetch(&self) -> Result<Vec<u8>, SourceError>;

    /// Returns the source's current staleness signal, if the backend has
    /// one.
    ///
    /// The default implementation reports no signal; such sources are
    /// refreshed when the computed expiration passes.
    ///
    /// # Errors
    ///
    /// Returns a [`SourceError`] if the signal cannot be read; the provider
    /// treats this like a failed refresh.
    fn staleness_signal(&self) -> Result<Option<StalenessSignal>, SourceError> {
        Ok(None)
    }
}

/// An externally observable indicator that the cached document may no longer
/// match the source.
///
/// Signals are totally ordered; the provider refreshes when a source reports
/// a signal strictly newer than the one recorded at the last refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StalenessSignal(SystemTime);

impl StalenessSignal {
    /// Creates a signal from a modification timestamp.
    pub const fn modified_at(timestamp: SystemTime) -> Self {
        Self(timestamp)
    }

    /// Returns the underlying timestamp.
    pub const fn as_system_time(&self) -> SystemTime {
        self.0
    }
}

/// An error that can arise retrieving a document from its source.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SourceError {
    /// The metadata file cannot be read.
    #[error("cannot read metadata file {path}")]
    Io {
        /// The file that failed.
        path: PathBuf,
        /// The underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The configured metadata path is not a regular file.
    #[error("metadata path {path} is not a regular file")]
    NotAFile {
        /// The offending path.
        path: PathBuf,
    },

    /// The configured metadata URL is not valid.
    #[error("invalid metadata URL")]
    InvalidUrl(#[from] url::ParseError),

    /// The HTTP request failed (connect, timeout, or transport error).
    #[error("HTTP metadata request failed")]
    Http(#[from] reqwest::Error),

    /// The metadata server answered with a non-success status.
    #[error("metadata server returned HTTP status {status}")]
    HttpStatus {
        /// The status code returned by the server.
        status: u16,
    },
}

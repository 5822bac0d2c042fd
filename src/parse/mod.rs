//! Metadata document parsing.
//!
//! Parsing is a capability injected into the provider at construction, so
//! tests and embedders can swap the wire format without touching the cache
//! logic. The crate ships [`JsonMetadataParser`] for its JSON document
//! format.

use crate::document::MetadataDocument;
use thiserror::Error;

mod json;

pub use json::JsonMetadataParser;

/// Turns raw fetched bytes into a typed metadata document tree.
pub trait MetadataParser: Send + Sync {
    /// Parses a complete document.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] if the bytes are not a well-formed document.
    fn parse(&self, bytes: &[u8]) -> Result<MetadataDocument, ParseError>;
}

/// An error that can arise parsing a metadata document.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// The bytes are not a well-formed JSON metadata document.
    #[error("cannot deserialize metadata document")]
    Json(#[from] serde_json::Error),

    /// A `valid_until` value is not an RFC 3339 timestamp.
    #[error("invalid valid_until timestamp {value:?}")]
    InvalidTimestamp {
        /// The offending value as it appeared in the document.
        value: String,
        /// The underlying parse failure.
        #[source]
        source: time::error::Parse,
    },

    /// An entity descriptor declared an empty entity ID.
    #[error("entity descriptor has an empty entity ID")]
    EmptyEntityId,

    /// A role descriptor declared an empty kind.
    #[error("role descriptor has an empty kind")]
    EmptyRoleKind,
}

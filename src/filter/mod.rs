//! Post-parse metadata filtering.
//!
//! Filters run in registration order exactly once per successful parse,
//! before the provider computes expiration, so a filter that strips nodes
//! also strips their caching hints. A filter error aborts the refresh and
//! leaves the previously cached document untouched.

use crate::document::MetadataDocument;
use thiserror::Error;

mod roles;
mod validity;

pub use roles::RoleFilter;
pub use validity::RequireValidUntilFilter;

/// Mutates or validates a freshly parsed metadata document.
pub trait MetadataFilter: Send + Sync {
    /// Applies the filter to the document in place.
    ///
    /// # Errors
    ///
    /// Returns a [`FilterError`] to reject the document; the provider then
    /// keeps serving the previous one.
    fn apply(&self, document: &mut MetadataDocument) -> Result<(), FilterError>;
}

/// An error produced by a metadata filter.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FilterError {
    /// The filter rejected the document.
    #[error("metadata document rejected: {0}")]
    Rejected(String),

    /// The filter itself failed.
    #[error("metadata filter failed")]
    Other(#[source] Box<dyn std::error::Error + Send + Sync>),
}

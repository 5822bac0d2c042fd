//! The provider-level error type.

use crate::filter::FilterError;
use crate::parse::ParseError;
use crate::source::SourceError;
use thiserror::Error;

/// Errors surfaced by metadata providers.
///
/// An unknown entity ID or container name is not an error; queries answer
/// those with `None` or an empty list.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MetadataError {
    /// The document source could not be read.
    #[error("metadata source unavailable")]
    Source(#[from] SourceError),

    /// The fetched bytes are not a well-formed metadata document.
    #[error("metadata document could not be parsed")]
    Parse(#[from] ParseError),

    /// A registered filter rejected or failed on the document.
    #[error("metadata document was rejected by a filter")]
    Filter(#[from] FilterError),
}

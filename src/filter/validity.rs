use super::{FilterError, MetadataFilter};
use crate::document::expiry::saturating_after;
use crate::document::MetadataDocument;
use std::time::Duration;
use time::OffsetDateTime;

/// Rejects documents that do not commit to an expiry.
///
/// The document root must carry a `valid_until`, and it must not lie further
/// in the future than the configured window. Consuming unexpiring metadata
/// from a remote federation is usually a configuration mistake; this filter
/// makes it a refresh error instead of silently trusting the document
/// forever.
#[derive(Debug, Clone, Copy)]
pub struct RequireValidUntilFilter {
    max_validity: Duration,
}

impl RequireValidUntilFilter {
    /// Creates a filter requiring a root `valid_until` no further away than
    /// `max_validity`.
    pub const fn new(max_validity: Duration) -> Self {
        Self { max_validity }
    }
}

impl MetadataFilter for RequireValidUntilFilter {
    fn apply(&self, document: &mut MetadataDocument) -> Result<(), FilterError> {
        let Some(valid_until) = document.valid_until() else {
            return Err(FilterError::Rejected(
                "document root carries no valid_until".to_string(),
            ));
        };

        let latest_acceptable = saturating_after(OffsetDateTime::now_utc(), self.max_validity);
        if valid_until > latest_acceptable {
            return Err(FilterError::Rejected(format!(
                "document valid_until {valid_until} exceeds the maximum validity window"
            )));
        }

        Ok(())
    }
}

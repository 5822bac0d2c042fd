//! Expiration arithmetic over metadata trees.
//!
//! A document carries two independent kinds of caching hint: absolute
//! `valid_until` timestamps and relative `cache_duration` windows, either of
//! which may appear on any node. The provider additionally configures an
//! upper bound on trust. [`earliest_expiration`] reconciles all three by
//! taking the minimum over the whole tree.

use crate::document::MetadataDocument;
use std::time::Duration;
use time::{OffsetDateTime, PrimitiveDateTime};

/// Computes the earliest instant at which any node of the document stops
/// being trustworthy.
///
/// Every node contributes its `valid_until` (if declared) and
/// `now + cache_duration` (if declared); the result is the minimum of all
/// contributions and `now + max_cache_duration`, so the configured maximum
/// always bounds the result from above and applies on its own when no node
/// declares a hint.
pub fn earliest_expiration(
    document: &MetadataDocument,
    now: OffsetDateTime,
    max_cache_duration: Duration,
) -> OffsetDateTime {
    let mut earliest = saturating_after(now, max_cache_duration);
    fold_node(document, now, &mut earliest);
    earliest
}

/// Returns whether a validity window has not yet passed at `now`.
///
/// `None` means no window is declared and the value is always valid.
pub fn is_valid_at(valid_until: Option<OffsetDateTime>, now: OffsetDateTime) -> bool {
    valid_until.is_none_or(|t| now < t)
}

/// Adds a `std::time::Duration` to a timestamp, clamping instead of
/// overflowing so that an effectively-unbounded configured maximum is safe.
pub(crate) fn saturating_after(base: OffsetDateTime, duration: Duration) -> OffsetDateTime {
    time::Duration::try_from(duration)
        .ok()
        .and_then(|d| base.checked_add(d))
        .unwrap_or_else(|| PrimitiveDateTime::MAX.assume_utc())
}

fn fold_node(node: &MetadataDocument, now: OffsetDateTime, earliest: &mut OffsetDateTime) {
    if let Some(valid_until) = node.valid_until() {
        *earliest = (*earliest).min(valid_until);
    }
    if let Some(cache_duration) = node.cache_duration() {
        *earliest = (*earliest).min(saturating_after(now, cache_duration));
    }
    if let MetadataDocument::Entities(container) = node {
        for child in container.children() {
            fold_node(child, now, earliest);
        }
    }
}

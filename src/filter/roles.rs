use super::{FilterError, MetadataFilter};
use crate::document::{MetadataDocument, RoleKind};
use std::sync::Arc;

/// Strips every role whose kind is not in the configured allow-list.
///
/// Entities are kept even when all their roles are removed; hiding an entity
/// entirely is a lookup concern, not a filtering one. Running this filter
/// before expiration is computed means hints on removed roles never existed
/// as far as the cache is concerned.
#[derive(Debug, Clone)]
pub struct RoleFilter {
    kinds: Vec<RoleKind>,
}

impl RoleFilter {
    /// Creates a filter retaining only roles of the given kinds.
    pub fn new(kinds: impl IntoIterator<Item = RoleKind>) -> Self {
        Self {
            kinds: kinds.into_iter().collect(),
        }
    }

    fn retain_in(&self, node: &mut MetadataDocument) {
        match node {
            MetadataDocument::Entity(entity) => {
                Arc::make_mut(entity)
                    .roles_mut()
                    .retain(|role| self.kinds.contains(role.kind()));
            }
            MetadataDocument::Entities(container) => {
                for child in Arc::make_mut(container).children_mut() {
                    self.retain_in(child);
                }
            }
        }
    }
}

impl MetadataFilter for RoleFilter {
    fn apply(&self, document: &mut MetadataDocument) -> Result<(), FilterError> {
        self.retain_in(document);
        Ok(())
    }
}

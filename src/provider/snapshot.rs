use crate::document::{EntitiesDescriptor, EntityDescriptor, MetadataDocument};
use crate::provider::lock;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use time::OffsetDateTime;

/// One published generation of metadata: the document plus the memoized
/// entity-ID index derived from it.
///
/// Binding the index to the document it was built from means a refresh swaps
/// both in one atomic pointer store; a reader holding the previous snapshot
/// keeps memoizing into the previous index, and no caller can ever observe
/// an index entry pointing outside its own document.
pub(crate) struct Snapshot {
    document: MetadataDocument,
    index: Mutex<HashMap<String, Arc<EntityDescriptor>>>,
}

impl Snapshot {
    pub(crate) fn new(document: MetadataDocument) -> Self {
        Self {
            document,
            index: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn document(&self) -> &MetadataDocument {
        &self.document
    }

    /// Indexed entity lookup.
    ///
    /// A hit that fails the validity requirement is evicted and the live
    /// tree is searched again rather than answering with a false negative;
    /// a malformed document can carry a valid duplicate deeper down.
    /// Successful matches are memoized.
    pub(crate) fn entity_by_id(
        &self,
        entity_id: &str,
        require_valid: bool,
        now: OffsetDateTime,
    ) -> Option<Arc<EntityDescriptor>> {
        {
            let mut index = lock(&self.index);
            if let Some(hit) = index.get(entity_id) {
                if !require_valid || hit.is_valid_at(now) {
                    return Some(Arc::clone(hit));
                }
                log::debug!("evicting expired entity {entity_id} from descriptor index");
                index.remove(entity_id);
            }
        }

        let accept = move |entity: &EntityDescriptor| !require_valid || entity.is_valid_at(now);
        let found = self.document.find_entity_where(entity_id, &accept)?;

        lock(&self.index).insert(entity_id.to_string(), Arc::clone(&found));
        Some(found)
    }

    /// Container lookup by name; rarer than entity lookup and not memoized.
    pub(crate) fn entities_by_name(
        &self,
        name: &str,
        require_valid: bool,
        now: OffsetDateTime,
    ) -> Option<Arc<EntitiesDescriptor>> {
        let accept =
            move |container: &EntitiesDescriptor| !require_valid || container.is_valid_at(now);
        self.document.find_entities_where(name, &accept)
    }

    #[cfg(test)]
    pub(crate) fn indexed_len(&self) -> usize {
        lock(&self.index).len()
    }
}

impl std::fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Snapshot")
            .field("document", &self.document)
            .field("indexed", &lock(&self.index).len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use time::macros::datetime;

    const NOW: OffsetDateTime = datetime!(2024-06-01 12:00:00 UTC);

    fn snapshot_with_expired_and_valid_duplicate() -> Snapshot {
        let mut expired = EntityDescriptor::new("https://dup.example.org");
        expired.set_valid_until(Some(NOW - Duration::from_secs(60)));

        let mut deep = EntitiesDescriptor::new(None);
        deep.add_entity(EntityDescriptor::new("https://dup.example.org"));

        let mut root = EntitiesDescriptor::new(None);
        root.add_entity(expired);
        root.add_entities(deep);

        Snapshot::new(MetadataDocument::Entities(Arc::new(root)))
    }

    #[test]
    fn memoizes_successful_lookups() {
        let mut root = EntitiesDescriptor::new(None);
        root.add_entity(EntityDescriptor::new("https://a.example.org"));
        let snapshot = Snapshot::new(MetadataDocument::Entities(Arc::new(root)));

        assert_eq!(snapshot.indexed_len(), 0);
        assert!(snapshot.entity_by_id("https://a.example.org", false, NOW).is_some());
        assert_eq!(snapshot.indexed_len(), 1);

        // Misses are not memoized.
        assert!(snapshot.entity_by_id("https://missing.example.org", false, NOW).is_none());
        assert_eq!(snapshot.indexed_len(), 1);
    }

    #[test]
    fn expired_index_hit_is_evicted_and_retried_against_tree() {
        let snapshot = snapshot_with_expired_and_valid_duplicate();

        // Populate the index with the expired descriptor via a lookup that
        // does not require validity.
        let first = snapshot.entity_by_id("https://dup.example.org", false, NOW).unwrap();
        assert!(first.valid_until().is_some());

        // With validity required the stale index entry must not be served;
        // the live-tree retry finds the valid duplicate.
        let second = snapshot.entity_by_id("https://dup.example.org", true, NOW).unwrap();
        assert!(second.valid_until().is_none());

        // The index now holds the valid descriptor.
        let third = snapshot.entity_by_id("https://dup.example.org", true, NOW).unwrap();
        assert_eq!(second, third);
    }

    #[test]
    fn expired_entity_hidden_when_validity_required() {
        let mut expired = EntityDescriptor::new("https://gone.example.org");
        expired.set_valid_until(Some(NOW - Duration::from_secs(1)));
        let mut root = EntitiesDescriptor::new(None);
        root.add_entity(expired);
        let snapshot = Snapshot::new(MetadataDocument::Entities(Arc::new(root)));

        assert!(snapshot.entity_by_id("https://gone.example.org", true, NOW).is_none());
        assert!(snapshot.entity_by_id("https://gone.example.org", false, NOW).is_some());
    }

    #[test]
    fn container_lookup_respects_validity() {
        let mut inner = EntitiesDescriptor::new(Some("inner".to_string()));
        inner.set_valid_until(Some(NOW - Duration::from_secs(1)));
        let mut root = EntitiesDescriptor::new(Some("root".to_string()));
        root.add_entities(inner);
        let snapshot = Snapshot::new(MetadataDocument::Entities(Arc::new(root)));

        assert!(snapshot.entities_by_name("inner", true, NOW).is_none());
        assert!(snapshot.entities_by_name("inner", false, NOW).is_some());
        assert!(snapshot.entities_by_name("root", true, NOW).is_some());
    }
}

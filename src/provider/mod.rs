//! Metadata providers: the trust-cache around a document source.
//!
//! [`CachingMetadataProvider`] owns one metadata document at a time. Queries
//! go through a staleness check first; when the cached document is stale the
//! provider re-fetches, re-parses, re-filters, and atomically swaps in the
//! new tree together with a fresh lookup index. At most one refresh runs at
//! a time per provider; concurrent callers block on the refresh gate and
//! then re-evaluate staleness, so redundant fetches collapse to one.
//!
//! # Example
//!
//! ```no_run
//! use fedmeta::{CachingMetadataProvider, FileSource, MetadataProvider, RoleKind};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let source = FileSource::new("/etc/federation/metadata.json")?;
//! let provider = CachingMetadataProvider::builder(source).build()?;
//!
//! if let Some(entity) = provider.entity_descriptor("https://idp.example.org")? {
//!     println!("found {} with {} roles", entity.entity_id(), entity.roles().len());
//! }
//!
//! let idp_roles = provider.roles("https://idp.example.org", &RoleKind::IdentityProvider)?;
//! # Ok(())
//! # }
//! ```

use crate::document::{EntitiesDescriptor, EntityDescriptor, RoleDescriptor, RoleKind};
use crate::error::MetadataError;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

mod builder;
mod caching;
mod observers;
mod snapshot;

pub use builder::CachingMetadataProviderBuilder;
pub use caching::CachingMetadataProvider;
pub use observers::ObserverId;

/// Answers descriptor queries against a metadata document.
///
/// This is the query facade seam; [`CachingMetadataProvider`] is the
/// provided implementation, and embedders can wrap or stub it behind the
/// same trait.
pub trait MetadataProvider {
    /// Returns the descriptor for the given entity ID, or `None` if the
    /// current document does not contain it.
    ///
    /// # Errors
    ///
    /// Returns a [`MetadataError`] if the implementation cannot answer;
    /// an unknown entity ID is a normal `None`, not an error.
    fn entity_descriptor(
        &self,
        entity_id: &str,
    ) -> Result<Option<Arc<EntityDescriptor>>, MetadataError>;

    /// Returns the entities descriptor with the given name, or `None`.
    ///
    /// # Errors
    ///
    /// Returns a [`MetadataError`] if the implementation cannot answer.
    fn entities_descriptor(
        &self,
        name: &str,
    ) -> Result<Option<Arc<EntitiesDescriptor>>, MetadataError>;

    /// Returns the given entity's roles of the given kind; empty if the
    /// entity is unknown or declares no such role.
    ///
    /// # Errors
    ///
    /// Returns a [`MetadataError`] if the implementation cannot answer.
    fn roles(
        &self,
        entity_id: &str,
        kind: &RoleKind,
    ) -> Result<Vec<RoleDescriptor>, MetadataError>;

    /// Like [`MetadataProvider::roles`], additionally requiring the role to
    /// declare support for the given protocol (exact string match).
    ///
    /// # Errors
    ///
    /// Returns a [`MetadataError`] if the implementation cannot answer.
    fn roles_supporting(
        &self,
        entity_id: &str,
        kind: &RoleKind,
        protocol: &str,
    ) -> Result<Vec<RoleDescriptor>, MetadataError> {
        Ok(self
            .roles(entity_id, kind)?
            .into_iter()
            .filter(|role| role.supports_protocol(protocol))
            .collect())
    }
}

// Lock acquisition that survives a panicking holder; the guarded state is
// always internally consistent because mutations happen after the fallible
// steps.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

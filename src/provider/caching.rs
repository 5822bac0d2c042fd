use crate::document::{expiry, EntitiesDescriptor, EntityDescriptor, MetadataDocument};
use crate::document::{RoleDescriptor, RoleKind};
use crate::error::MetadataError;
use crate::filter::MetadataFilter;
use crate::parse::MetadataParser;
use crate::provider::observers::ObserverRegistry;
use crate::provider::snapshot::Snapshot;
use crate::provider::{lock, CachingMetadataProviderBuilder, MetadataProvider, ObserverId};
use crate::source::{DocumentSource, StalenessSignal};
use arc_swap::ArcSwapOption;
use log::{debug, error, warn};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use time::OffsetDateTime;

/// A metadata provider that caches one document and refreshes it on demand.
///
/// The provider decides staleness from three independent signals: the
/// source's push signal (a file's modification time) when it has one, the
/// earliest expiry embedded in the document (`valid_until` timestamps and
/// `cache_duration` hints on any node), and the configured
/// `max_cache_duration` upper bound. Construction performs the initial
/// refresh synchronously and fails fast on a misconfigured source.
///
/// Cloning is cheap and clones share the same cache; the provider can be
/// queried from many threads concurrently.
///
/// # Refresh failures
///
/// A failed refresh never disturbs the cached document. Queries degrade
/// instead of failing: they keep answering from the cached document while it
/// remains usable (not expired, or expired with `maintain_expired_metadata`
/// enabled) and report `None` once nothing usable remains. The failure
/// itself is logged, and [`CachingMetadataProvider::refresh`] exposes it
/// directly to callers that need the error.
#[derive(Clone)]
pub struct CachingMetadataProvider {
    inner: Arc<Inner>,
}

pub(super) struct Inner {
    pub(super) source: Box<dyn DocumentSource>,
    pub(super) parser: Box<dyn MetadataParser>,
    pub(super) filters: Vec<Box<dyn MetadataFilter>>,
    pub(super) max_cache_duration: Duration,
    pub(super) maintain_expired_metadata: bool,
    pub(super) require_valid_metadata: bool,

    // Last-known-good document + index, replaced wholesale by a refresh.
    pub(super) snapshot: ArcSwapOption<Snapshot>,

    // Refresh exclusivity gate and the bookkeeping it protects.
    pub(super) refresh: Mutex<RefreshState>,

    pub(super) observers: ObserverRegistry,
}

#[derive(Debug, Default)]
pub(super) struct RefreshState {
    pub(super) last_refresh: Option<OffsetDateTime>,
    pub(super) expires_at: Option<OffsetDateTime>,
    pub(super) last_signal: Option<StalenessSignal>,
}

impl CachingMetadataProvider {
    /// Creates a builder around the given document source.
    pub fn builder(source: impl DocumentSource + 'static) -> CachingMetadataProviderBuilder {
        CachingMetadataProviderBuilder::new(source)
    }

    pub(super) fn from_inner(inner: Inner) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Refreshes the cached document now, regardless of staleness.
    ///
    /// Unlike query-path refreshes this propagates the failure to the
    /// caller. The previously cached document stays intact on failure,
    /// subject to the same retention rules queries apply.
    ///
    /// # Errors
    ///
    /// Returns the [`MetadataError`] of the failed fetch, parse, or filter
    /// step.
    pub fn refresh(&self) -> Result<(), MetadataError> {
        let mut state = lock(&self.inner.refresh);
        let now = OffsetDateTime::now_utc();
        self.refresh_locked(&mut state, now).inspect_err(|err| {
            self.handle_refresh_failure(&state, now, err);
        })
    }

    /// Returns the currently cached document, refreshing first if it is
    /// stale; `None` when no usable document is cached.
    pub fn document(&self) -> Option<MetadataDocument> {
        self.ensure_fresh();
        self.inner
            .snapshot
            .load_full()
            .map(|snapshot| snapshot.document().clone())
    }

    /// Registers a callback invoked after every successful refresh.
    ///
    /// Callbacks run synchronously inside the refresh gate, after the new
    /// document is visible; they receive no payload beyond "metadata
    /// changed". Keep them short, and do not query the provider from inside
    /// a callback: the refresh gate is held while callbacks run and is not
    /// reentrant.
    pub fn add_observer(&self, observer: impl Fn() + Send + Sync + 'static) -> ObserverId {
        self.inner.observers.add(observer)
    }

    /// Removes a previously registered observer; returns whether it was
    /// still registered.
    pub fn remove_observer(&self, id: ObserverId) -> bool {
        self.inner.observers.remove(id)
    }

    /// Runs the staleness check and, when needed, a refresh. Query-path
    /// refresh failures are logged and degrade per the retention rules
    /// rather than surfacing to the caller.
    fn ensure_fresh(&self) {
        let mut state = lock(&self.inner.refresh);
        let now = OffsetDateTime::now_utc();

        let result = match self.is_stale(&state, now) {
            Ok(false) => return,
            Ok(true) => {
                debug!("cached metadata is stale, refreshing");
                self.refresh_locked(&mut state, now)
            }
            // A failing staleness probe (e.g. the metadata file vanished)
            // is handled like a failed refresh.
            Err(err) => Err(err),
        };

        if let Err(err) = result {
            self.handle_refresh_failure(&state, now, &err);
        }
    }

    /// The ordered staleness test: never refreshed, then push signal, then
    /// computed expiration.
    fn is_stale(&self, state: &RefreshState, now: OffsetDateTime) -> Result<bool, MetadataError> {
        if state.last_refresh.is_none() {
            return Ok(true);
        }

        if let Some(signal) = self.inner.source.staleness_signal()? {
            return Ok(state.last_signal.is_none_or(|recorded| signal > recorded));
        }

        Ok(state.expires_at.is_none_or(|expires| now >= expires))
    }

    /// One complete refresh, caller holds the gate: fetch, parse, filter,
    /// recompute expiration, swap the snapshot, notify observers. Any error
    /// returns before the swap, leaving the previous snapshot untouched.
    fn refresh_locked(
        &self,
        state: &mut RefreshState,
        now: OffsetDateTime,
    ) -> Result<(), MetadataError> {
        // Capture the signal before reading so a concurrent source update
        // during the read triggers another refresh rather than being missed.
        let signal = self.inner.source.staleness_signal()?;

        let bytes = self.inner.source.fetch()?;
        let mut document = self.inner.parser.parse(&bytes)?;
        for filter in &self.inner.filters {
            filter.apply(&mut document)?;
        }

        let expires_at = expiry::earliest_expiration(&document, now, self.inner.max_cache_duration);

        if expires_at <= now && !self.inner.maintain_expired_metadata {
            warn!("fetched metadata expired at {expires_at}, discarding");
            self.inner.snapshot.store(None);
        } else {
            if expires_at <= now {
                warn!("fetched metadata expired at {expires_at}, keeping it (maintain_expired_metadata)");
            }
            self.inner.snapshot.store(Some(Arc::new(Snapshot::new(document))));
        }

        state.last_refresh = Some(now);
        state.expires_at = Some(expires_at);
        state.last_signal = signal;

        debug!("metadata cache refreshed, next expiration {expires_at}");
        self.inner.observers.notify();
        Ok(())
    }

    /// Applies the retention rules after a failed refresh: an expired
    /// document is dropped unless expired metadata is maintained, anything
    /// still within its window keeps serving.
    fn handle_refresh_failure(
        &self,
        state: &RefreshState,
        now: OffsetDateTime,
        err: &MetadataError,
    ) {
        let expired = state.expires_at.is_some_and(|expires| now >= expires);

        if expired && !self.inner.maintain_expired_metadata {
            if self.inner.snapshot.load().is_some() {
                warn!("metadata refresh failed and cached document is expired, discarding: {err}");
                self.inner.snapshot.store(None);
            } else {
                error!("metadata refresh failed, no document available: {err}");
            }
        } else if self.inner.snapshot.load().is_some() {
            warn!("metadata refresh failed, continuing to serve cached document: {err}");
        } else {
            error!("metadata refresh failed, no document available: {err}");
        }
    }
}

impl MetadataProvider for CachingMetadataProvider {
    fn entity_descriptor(
        &self,
        entity_id: &str,
    ) -> Result<Option<Arc<EntityDescriptor>>, MetadataError> {
        self.ensure_fresh();
        let Some(snapshot) = self.inner.snapshot.load_full() else {
            return Ok(None);
        };
        let now = OffsetDateTime::now_utc();
        Ok(snapshot.entity_by_id(entity_id, self.inner.require_valid_metadata, now))
    }

    fn entities_descriptor(
        &self,
        name: &str,
    ) -> Result<Option<Arc<EntitiesDescriptor>>, MetadataError> {
        self.ensure_fresh();
        let Some(snapshot) = self.inner.snapshot.load_full() else {
            return Ok(None);
        };
        let now = OffsetDateTime::now_utc();
        Ok(snapshot.entities_by_name(name, self.inner.require_valid_metadata, now))
    }

    fn roles(
        &self,
        entity_id: &str,
        kind: &RoleKind,
    ) -> Result<Vec<RoleDescriptor>, MetadataError> {
        let Some(entity) = self.entity_descriptor(entity_id)? else {
            return Ok(Vec::new());
        };
        Ok(entity
            .roles()
            .iter()
            .filter(|role| role.kind() == kind)
            .cloned()
            .collect())
    }
}

impl std::fmt::Debug for CachingMetadataProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = lock(&self.inner.refresh);
        f.debug_struct("CachingMetadataProvider")
            .field("source", &"<DocumentSource>")
            .field("parser", &"<MetadataParser>")
            .field("filters", &self.inner.filters.len())
            .field("max_cache_duration", &self.inner.max_cache_duration)
            .field("maintain_expired_metadata", &self.inner.maintain_expired_metadata)
            .field("require_valid_metadata", &self.inner.require_valid_metadata)
            .field("last_refresh", &state.last_refresh)
            .field("expires_at", &state.expires_at)
            .field("observers", &self.inner.observers)
            .finish()
    }
}

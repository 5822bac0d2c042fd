use crate::error::MetadataError;
use crate::filter::MetadataFilter;
use crate::parse::{JsonMetadataParser, MetadataParser};
use crate::provider::caching::{CachingMetadataProvider, Inner, RefreshState};
use crate::provider::observers::ObserverRegistry;
use crate::source::DocumentSource;
use arc_swap::ArcSwapOption;
use std::sync::Mutex;
use std::time::Duration;

/// Upper bound on trust when neither the document nor the builder says
/// otherwise.
pub(crate) const DEFAULT_MAX_CACHE_DURATION: Duration = Duration::from_secs(24 * 60 * 60);

/// Builder for [`CachingMetadataProvider`].
///
/// Configuration is fixed at build time; the provider itself is immutable
/// apart from its cache. Defaults: JSON parser, no filters, 24h
/// `max_cache_duration`, expired metadata maintained, validity not required
/// on lookup.
///
/// # Example
///
/// ```no_run
/// use fedmeta::{CachingMetadataProvider, HttpSource, RequireValidUntilFilter};
/// use std::time::Duration;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let source = HttpSource::builder("https://federation.example.org/metadata.json")
///     .timeout(Duration::from_secs(10))
///     .basic_credentials("metadata-reader", "s3cret")
///     .build()?;
///
/// let provider = CachingMetadataProvider::builder(source)
///     .max_cache_duration(Duration::from_secs(4 * 60 * 60))
///     .filter(RequireValidUntilFilter::new(Duration::from_secs(7 * 24 * 60 * 60)))
///     .require_valid_metadata(true)
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct CachingMetadataProviderBuilder {
    source: Box<dyn DocumentSource>,
    parser: Box<dyn MetadataParser>,
    filters: Vec<Box<dyn MetadataFilter>>,
    max_cache_duration: Duration,
    maintain_expired_metadata: bool,
    require_valid_metadata: bool,
}

impl CachingMetadataProviderBuilder {
    pub(super) fn new(source: impl DocumentSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            parser: Box::new(JsonMetadataParser::new()),
            filters: Vec::new(),
            max_cache_duration: DEFAULT_MAX_CACHE_DURATION,
            maintain_expired_metadata: true,
            require_valid_metadata: false,
        }
    }

    /// Replaces the default JSON parser.
    #[must_use]
    pub fn parser(mut self, parser: impl MetadataParser + 'static) -> Self {
        self.parser = Box::new(parser);
        self
    }

    /// Appends a filter; filters run in registration order on every
    /// successful parse.
    #[must_use]
    pub fn filter(mut self, filter: impl MetadataFilter + 'static) -> Self {
        self.filters.push(Box::new(filter));
        self
    }

    /// Sets the upper bound on how long any document is trusted, whatever
    /// its embedded hints say.
    #[must_use]
    pub const fn max_cache_duration(mut self, max_cache_duration: Duration) -> Self {
        self.max_cache_duration = max_cache_duration;
        self
    }

    /// Sets whether a document past its computed expiration keeps serving
    /// when no fresher one can be fetched. Default `true`.
    #[must_use]
    pub const fn maintain_expired_metadata(mut self, maintain: bool) -> Self {
        self.maintain_expired_metadata = maintain;
        self
    }

    /// Sets whether lookups hide descriptors whose own validity window has
    /// passed. Default `false`.
    #[must_use]
    pub const fn require_valid_metadata(mut self, require: bool) -> Self {
        self.require_valid_metadata = require;
        self
    }

    /// Builds the provider, performing the initial refresh synchronously.
    ///
    /// # Errors
    ///
    /// Returns the [`MetadataError`] of the failed fetch, parse, or filter
    /// step; a provider that cannot load its source once is misconfigured
    /// and never constructed.
    pub fn build(self) -> Result<CachingMetadataProvider, MetadataError> {
        let provider = CachingMetadataProvider::from_inner(Inner {
            source: self.source,
            parser: self.parser,
            filters: self.filters,
            max_cache_duration: self.max_cache_duration,
            maintain_expired_metadata: self.maintain_expired_metadata,
            require_valid_metadata: self.require_valid_metadata,
            snapshot: ArcSwapOption::empty(),
            refresh: Mutex::new(RefreshState::default()),
            observers: ObserverRegistry::new(),
        });

        provider.refresh()?;
        Ok(provider)
    }
}

impl std::fmt::Debug for CachingMetadataProviderBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachingMetadataProviderBuilder")
            .field("source", &"<DocumentSource>")
            .field("parser", &"<MetadataParser>")
            .field("filters", &self.filters.len())
            .field("max_cache_duration", &self.max_cache_duration)
            .field("maintain_expired_metadata", &self.maintain_expired_metadata)
            .field("require_valid_metadata", &self.require_valid_metadata)
            .finish()
    }
}

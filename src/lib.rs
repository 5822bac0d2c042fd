#![deny(missing_docs)]
#![warn(missing_debug_implementations)]

//! Federation-trust metadata provider and trust-cache library.
//!
//! A federation publishes a metadata document describing the cryptographic
//! and endpoint capabilities of its participants: a tree of entity
//! descriptors, optionally grouped into named containers, each node carrying
//! optional caching hints (an absolute `valid_until` and a relative
//! `cache_duration`). This crate owns such a document on the consumer side:
//! it fetches it from a file or URL, parses and filters it, decides when the
//! cached copy is stale, refreshes it without redundant I/O under concurrent
//! callers, and answers descriptor lookups against an indexed snapshot.
//!
//! The primary entry point is [`CachingMetadataProvider`], built around a
//! [`DocumentSource`] backend:
//!
//! ```no_run
//! use fedmeta::{CachingMetadataProvider, FileSource, MetadataProvider, RoleKind};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let source = FileSource::new("/etc/federation/metadata.json")?;
//! let provider = CachingMetadataProvider::builder(source).build()?;
//!
//! // Look up one participant and its identity-provider roles.
//! let entity = provider.entity_descriptor("https://idp.example.org")?;
//! let roles = provider.roles("https://idp.example.org", &RoleKind::IdentityProvider)?;
//! # Ok(())
//! # }
//! ```
//!
//! Parsing ([`MetadataParser`]) and post-parse mutation ([`MetadataFilter`])
//! are capabilities injected at construction, so the cache logic is
//! independent of the wire format; [`JsonMetadataParser`] handles the
//! crate's JSON document format. Signature verification of metadata
//! documents and protocol message processing are out of scope.

pub mod document;
pub mod error;
pub mod filter;
pub mod parse;
pub mod provider;
pub mod source;

pub use crate::document::{
    EntitiesDescriptor, EntityDescriptor, Endpoint, MetadataDocument, RoleDescriptor, RoleKind,
};
pub use crate::error::MetadataError;
pub use crate::filter::{FilterError, MetadataFilter, RequireValidUntilFilter, RoleFilter};
pub use crate::parse::{JsonMetadataParser, MetadataParser, ParseError};
pub use crate::provider::{
    CachingMetadataProvider, CachingMetadataProviderBuilder, MetadataProvider, ObserverId,
};
pub use crate::source::{
    DocumentSource, FileSource, HttpSource, HttpSourceBuilder, SourceError, StalenessSignal,
};

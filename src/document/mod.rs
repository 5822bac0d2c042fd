//! Federation metadata document model.
//!
//! A metadata document is a tree: the root is either a single
//! [`EntityDescriptor`] or an [`EntitiesDescriptor`] container whose children
//! are again entity or entities descriptors, recursively. The tree is built by
//! a [`MetadataParser`](crate::parse::MetadataParser), optionally mutated by
//! [`MetadataFilter`](crate::filter::MetadataFilter)s, and then owned by a
//! provider which replaces it wholesale on refresh — nodes are never mutated
//! in place after publication.

use std::sync::Arc;
use std::time::Duration;
use time::OffsetDateTime;

pub mod expiry;

/// A parsed federation metadata document.
///
/// The same variant type describes the document root and the children of an
/// [`EntitiesDescriptor`]: a container of descriptors is itself a well-formed
/// document. Descriptors are held behind [`Arc`] so that lookups can hand out
/// shared references without cloning subtrees.
#[derive(Debug, Clone)]
pub enum MetadataDocument {
    /// A single federation participant.
    Entity(Arc<EntityDescriptor>),
    /// A named group of entity and entities descriptors.
    Entities(Arc<EntitiesDescriptor>),
}

/// Describes one federation participant: its unique entity ID, the roles it
/// can act in, and optional caching hints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityDescriptor {
    entity_id: String,
    valid_until: Option<OffsetDateTime>,
    cache_duration: Option<Duration>,
    roles: Vec<RoleDescriptor>,
}

/// A named container of entity and entities descriptors.
///
/// A container's validity window and cache-duration hint bound those of its
/// descendants but do not override them; the provider takes the minimum over
/// every node in the tree when computing expiration.
#[derive(Debug, Clone)]
pub struct EntitiesDescriptor {
    name: Option<String>,
    valid_until: Option<OffsetDateTime>,
    cache_duration: Option<Duration>,
    children: Vec<MetadataDocument>,
}

/// A capability record attached to an entity, e.g. "acts as an identity
/// provider for these protocols at these endpoints".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleDescriptor {
    kind: RoleKind,
    protocols: Vec<String>,
    endpoints: Vec<Endpoint>,
}

/// The kind of capability a [`RoleDescriptor`] declares.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RoleKind {
    /// Issues authentication assertions.
    IdentityProvider,
    /// Consumes authentication assertions.
    ServiceProvider,
    /// Answers attribute queries.
    AttributeAuthority,
    /// A role kind this crate has no dedicated variant for.
    Other(String),
}

/// A protocol endpoint attached to a role: a binding identifier plus the
/// location it is reachable at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    binding: String,
    location: String,
}

impl EntityDescriptor {
    /// Creates a descriptor with the given entity ID and no roles or hints.
    pub fn new(entity_id: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            valid_until: None,
            cache_duration: None,
            roles: Vec::new(),
        }
    }

    /// Returns the entity ID, unique within one document.
    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    /// Returns the absolute "not valid after" timestamp, if declared.
    pub const fn valid_until(&self) -> Option<OffsetDateTime> {
        self.valid_until
    }

    /// Returns the relative "do not trust me longer than" hint, if declared.
    pub const fn cache_duration(&self) -> Option<Duration> {
        self.cache_duration
    }

    /// Returns the roles declared by this entity.
    pub fn roles(&self) -> &[RoleDescriptor] {
        &self.roles
    }

    /// Returns the roles mutably, for use by metadata filters.
    pub fn roles_mut(&mut self) -> &mut Vec<RoleDescriptor> {
        &mut self.roles
    }

    /// Sets the validity window.
    pub fn set_valid_until(&mut self, valid_until: Option<OffsetDateTime>) {
        self.valid_until = valid_until;
    }

    /// Sets the cache-duration hint.
    pub fn set_cache_duration(&mut self, cache_duration: Option<Duration>) {
        self.cache_duration = cache_duration;
    }

    /// Appends a role descriptor.
    pub fn add_role(&mut self, role: RoleDescriptor) {
        self.roles.push(role);
    }

    /// Returns whether this descriptor's own validity window has not passed.
    ///
    /// A descriptor without a `valid_until` is always valid; container
    /// validity does not propagate to children here.
    pub fn is_valid_at(&self, now: OffsetDateTime) -> bool {
        expiry::is_valid_at(self.valid_until, now)
    }
}

impl EntitiesDescriptor {
    /// Creates an empty container, optionally named.
    pub fn new(name: Option<String>) -> Self {
        Self {
            name,
            valid_until: None,
            cache_duration: None,
            children: Vec::new(),
        }
    }

    /// Returns the container name, if any.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the absolute "not valid after" timestamp, if declared.
    pub const fn valid_until(&self) -> Option<OffsetDateTime> {
        self.valid_until
    }

    /// Returns the relative "do not trust me longer than" hint, if declared.
    pub const fn cache_duration(&self) -> Option<Duration> {
        self.cache_duration
    }

    /// Returns the children in document order.
    pub fn children(&self) -> &[MetadataDocument] {
        &self.children
    }

    /// Returns the children mutably, for use by metadata filters.
    pub fn children_mut(&mut self) -> &mut Vec<MetadataDocument> {
        &mut self.children
    }

    /// Sets the validity window.
    pub fn set_valid_until(&mut self, valid_until: Option<OffsetDateTime>) {
        self.valid_until = valid_until;
    }

    /// Sets the cache-duration hint.
    pub fn set_cache_duration(&mut self, cache_duration: Option<Duration>) {
        self.cache_duration = cache_duration;
    }

    /// Appends a child entity descriptor.
    pub fn add_entity(&mut self, entity: EntityDescriptor) {
        self.children.push(MetadataDocument::Entity(Arc::new(entity)));
    }

    /// Appends a child entities descriptor.
    pub fn add_entities(&mut self, entities: EntitiesDescriptor) {
        self.children
            .push(MetadataDocument::Entities(Arc::new(entities)));
    }

    /// Returns whether this container's own validity window has not passed.
    pub fn is_valid_at(&self, now: OffsetDateTime) -> bool {
        expiry::is_valid_at(self.valid_until, now)
    }
}

impl RoleDescriptor {
    /// Creates a role of the given kind with no protocols or endpoints.
    pub fn new(kind: RoleKind) -> Self {
        Self {
            kind,
            protocols: Vec::new(),
            endpoints: Vec::new(),
        }
    }

    /// Returns the role kind.
    pub const fn kind(&self) -> &RoleKind {
        &self.kind
    }

    /// Returns the declared supported protocols.
    pub fn protocols(&self) -> &[String] {
        &self.protocols
    }

    /// Returns the role's endpoints.
    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    /// Declares support for a protocol.
    pub fn add_protocol(&mut self, protocol: impl Into<String>) {
        self.protocols.push(protocol.into());
    }

    /// Appends an endpoint.
    pub fn add_endpoint(&mut self, endpoint: Endpoint) {
        self.endpoints.push(endpoint);
    }

    /// Returns whether the role declares support for the given protocol.
    ///
    /// Protocols are compared by exact string match.
    pub fn supports_protocol(&self, protocol: &str) -> bool {
        self.protocols.iter().any(|p| p == protocol)
    }
}

impl RoleKind {
    /// Returns the canonical name for this kind, as used by the JSON wire
    /// format.
    pub fn name(&self) -> &str {
        match self {
            Self::IdentityProvider => "identity_provider",
            Self::ServiceProvider => "service_provider",
            Self::AttributeAuthority => "attribute_authority",
            Self::Other(name) => name,
        }
    }

    /// Resolves a kind from its canonical name; unknown names map to
    /// [`RoleKind::Other`].
    pub fn from_name(name: &str) -> Self {
        match name {
            "identity_provider" => Self::IdentityProvider,
            "service_provider" => Self::ServiceProvider,
            "attribute_authority" => Self::AttributeAuthority,
            other => Self::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for RoleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl Endpoint {
    /// Creates an endpoint from a binding identifier and a location.
    pub fn new(binding: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            binding: binding.into(),
            location: location.into(),
        }
    }

    /// Returns the binding identifier.
    pub fn binding(&self) -> &str {
        &self.binding
    }

    /// Returns the endpoint location.
    pub fn location(&self) -> &str {
        &self.location
    }
}

impl MetadataDocument {
    /// Returns the node's own validity window, if declared.
    pub fn valid_until(&self) -> Option<OffsetDateTime> {
        match self {
            Self::Entity(e) => e.valid_until(),
            Self::Entities(c) => c.valid_until(),
        }
    }

    /// Returns the node's own cache-duration hint, if declared.
    pub fn cache_duration(&self) -> Option<Duration> {
        match self {
            Self::Entity(e) => e.cache_duration(),
            Self::Entities(c) => c.cache_duration(),
        }
    }

    /// Finds the entity descriptor with the given ID.
    ///
    /// The search is a pre-order, depth-first walk: a container's direct
    /// entity children are scanned before recursing into nested containers,
    /// in document order, and the first match wins. Duplicate entity IDs
    /// across a tree are malformed input; the pre-order rule is the
    /// deterministic tie-break.
    pub fn find_entity(&self, entity_id: &str) -> Option<Arc<EntityDescriptor>> {
        self.find_entity_where(entity_id, &|_| true)
    }

    /// Finds the entities descriptor with the given name, checking the node
    /// itself before its descendants.
    pub fn find_entities(&self, name: &str) -> Option<Arc<EntitiesDescriptor>> {
        self.find_entities_where(name, &|_| true)
    }

    pub(crate) fn find_entity_where(
        &self,
        entity_id: &str,
        accept: &dyn Fn(&EntityDescriptor) -> bool,
    ) -> Option<Arc<EntityDescriptor>> {
        match self {
            Self::Entity(entity) => {
                if entity.entity_id() == entity_id && accept(entity) {
                    Some(Arc::clone(entity))
                } else {
                    None
                }
            }
            Self::Entities(container) => container.find_entity_where(entity_id, accept),
        }
    }

    pub(crate) fn find_entities_where(
        &self,
        name: &str,
        accept: &dyn Fn(&EntitiesDescriptor) -> bool,
    ) -> Option<Arc<EntitiesDescriptor>> {
        match self {
            Self::Entity(_) => None,
            Self::Entities(container) => {
                if container.name() == Some(name) && accept(container) {
                    return Some(Arc::clone(container));
                }
                for child in container.children() {
                    if let Some(found) = child.find_entities_where(name, accept) {
                        return Some(found);
                    }
                }
                None
            }
        }
    }
}

impl EntitiesDescriptor {
    // Direct entity children first, nested containers second. A matching but
    // rejected (e.g. expired) descriptor does not end the search; a valid
    // duplicate deeper in the tree is still found.
    fn find_entity_where(
        &self,
        entity_id: &str,
        accept: &dyn Fn(&EntityDescriptor) -> bool,
    ) -> Option<Arc<EntityDescriptor>> {
        for child in &self.children {
            if let MetadataDocument::Entity(entity) = child {
                if entity.entity_id() == entity_id && accept(entity) {
                    return Some(Arc::clone(entity));
                }
            }
        }

        for child in &self.children {
            if let MetadataDocument::Entities(container) = child {
                if let Some(found) = container.find_entity_where(entity_id, accept) {
                    return Some(found);
                }
            }
        }

        None
    }
}

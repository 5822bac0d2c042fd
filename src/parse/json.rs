//! The JSON metadata document format.

use super::{MetadataParser, ParseError};
use crate::document::{
    EntitiesDescriptor, EntityDescriptor, Endpoint, MetadataDocument, RoleDescriptor, RoleKind,
};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// Parses the crate's JSON metadata document format.
///
/// A document is a single-key object tagging the root node:
///
/// ```json
/// {
///   "entities": {
///     "name": "example-federation",
///     "valid_until": "2030-01-01T00:00:00Z",
///     "cache_duration_secs": 3600,
///     "children": [
///       {
///         "entity": {
///           "entity_id": "https://idp.example.org",
///           "roles": [
///             {
///               "kind": "identity_provider",
///               "protocols": ["urn:fed:protocol:2.0"],
///               "endpoints": [
///                 { "binding": "urn:fed:bindings:redirect",
///                   "location": "https://idp.example.org/sso" }
///               ]
///             }
///           ]
///         }
///       }
///     ]
///   }
/// }
/// ```
///
/// `valid_until` is an RFC 3339 timestamp and `cache_duration_secs` a whole
/// number of seconds; both are optional on every node.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonMetadataParser;

impl JsonMetadataParser {
    /// Creates a parser.
    pub const fn new() -> Self {
        Self
    }
}

impl MetadataParser for JsonMetadataParser {
    fn parse(&self, bytes: &[u8]) -> Result<MetadataDocument, ParseError> {
        let raw: RawDocument = serde_json::from_slice(bytes)?;
        raw.into_document()
    }
}

#[derive(Deserialize)]
enum RawDocument {
    #[serde(rename = "entity")]
    Entity(RawEntity),
    #[serde(rename = "entities")]
    Entities(RawEntities),
}

#[derive(Deserialize)]
struct RawEntity {
    entity_id: String,
    #[serde(default)]
    valid_until: Option<String>,
    #[serde(default)]
    cache_duration_secs: Option<u64>,
    #[serde(default)]
    roles: Vec<RawRole>,
}

#[derive(Deserialize)]
struct RawEntities {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    valid_until: Option<String>,
    #[serde(default)]
    cache_duration_secs: Option<u64>,
    #[serde(default)]
    children: Vec<RawDocument>,
}

#[derive(Deserialize)]
struct RawRole {
    kind: String,
    #[serde(default)]
    protocols: Vec<String>,
    #[serde(default)]
    endpoints: Vec<RawEndpoint>,
}

#[derive(Deserialize)]
struct RawEndpoint {
    binding: String,
    location: String,
}

impl RawDocument {
    fn into_document(self) -> Result<MetadataDocument, ParseError> {
        match self {
            Self::Entity(raw) => Ok(MetadataDocument::Entity(Arc::new(raw.into_entity()?))),
            Self::Entities(raw) => Ok(MetadataDocument::Entities(Arc::new(raw.into_entities()?))),
        }
    }
}

impl RawEntity {
    fn into_entity(self) -> Result<EntityDescriptor, ParseError> {
        if self.entity_id.is_empty() {
            return Err(ParseError::EmptyEntityId);
        }

        let mut entity = EntityDescriptor::new(self.entity_id);
        entity.set_valid_until(parse_valid_until(self.valid_until)?);
        entity.set_cache_duration(self.cache_duration_secs.map(Duration::from_secs));
        for role in self.roles {
            entity.add_role(role.into_role()?);
        }
        Ok(entity)
    }
}

impl RawEntities {
    fn into_entities(self) -> Result<EntitiesDescriptor, ParseError> {
        let mut entities = EntitiesDescriptor::new(self.name);
        entities.set_valid_until(parse_valid_until(self.valid_until)?);
        entities.set_cache_duration(self.cache_duration_secs.map(Duration::from_secs));
        for child in self.children {
            entities.children_mut().push(child.into_document()?);
        }
        Ok(entities)
    }
}

impl RawRole {
    fn into_role(self) -> Result<RoleDescriptor, ParseError> {
        if self.kind.is_empty() {
            return Err(ParseError::EmptyRoleKind);
        }

        let mut role = RoleDescriptor::new(RoleKind::from_name(&self.kind));
        for protocol in self.protocols {
            role.add_protocol(protocol);
        }
        for endpoint in self.endpoints {
            role.add_endpoint(Endpoint::new(endpoint.binding, endpoint.location));
        }
        Ok(role)
    }
}

fn parse_valid_until(value: Option<String>) -> Result<Option<OffsetDateTime>, ParseError> {
    match value {
        None => Ok(None),
        Some(value) => OffsetDateTime::parse(&value, &Rfc3339)
            .map(Some)
            .map_err(|source| ParseError::InvalidTimestamp { value, source }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn parse(json: &str) -> Result<MetadataDocument, ParseError> {
        JsonMetadataParser::new().parse(json.as_bytes())
    }

    #[test]
    fn parses_single_entity_document() {
        let doc = parse(
            r#"{
                "entity": {
                    "entity_id": "https://idp.example.org",
                    "valid_until": "2030-01-01T00:00:00Z",
                    "cache_duration_secs": 300,
                    "roles": [
                        {
                            "kind": "identity_provider",
                            "protocols": ["urn:fed:protocol:2.0"],
                            "endpoints": [
                                {
                                    "binding": "urn:fed:bindings:redirect",
                                    "location": "https://idp.example.org/sso"
                                }
                            ]
                        }
                    ]
                }
            }"#,
        )
        .unwrap();

        let entity = doc.find_entity("https://idp.example.org").unwrap();
        assert_eq!(
            entity.valid_until(),
            Some(datetime!(2030-01-01 00:00:00 UTC))
        );
        assert_eq!(entity.cache_duration(), Some(Duration::from_secs(300)));

        let role = &entity.roles()[0];
        assert_eq!(role.kind(), &RoleKind::IdentityProvider);
        assert!(role.supports_protocol("urn:fed:protocol:2.0"));
        assert_eq!(role.endpoints()[0].location(), "https://idp.example.org/sso");
    }

    #[test]
    fn parses_nested_containers_in_document_order() {
        let doc = parse(
            r#"{
                "entities": {
                    "name": "root",
                    "children": [
                        { "entity": { "entity_id": "https://a.example.org" } },
                        {
                            "entities": {
                                "name": "inner",
                                "children": [
                                    { "entity": { "entity_id": "https://b.example.org" } }
                                ]
                            }
                        }
                    ]
                }
            }"#,
        )
        .unwrap();

        assert!(doc.find_entity("https://a.example.org").is_some());
        assert!(doc.find_entity("https://b.example.org").is_some());
        assert_eq!(doc.find_entities("inner").unwrap().name(), Some("inner"));
    }

    #[test]
    fn unknown_role_kind_maps_to_other() {
        let doc = parse(
            r#"{
                "entity": {
                    "entity_id": "https://x.example.org",
                    "roles": [{ "kind": "broker" }]
                }
            }"#,
        )
        .unwrap();
        let entity = doc.find_entity("https://x.example.org").unwrap();
        assert_eq!(entity.roles()[0].kind(), &RoleKind::Other("broker".to_string()));
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(matches!(parse("{ not json"), Err(ParseError::Json(_))));
    }

    #[test]
    fn rejects_empty_entity_id() {
        let result = parse(r#"{ "entity": { "entity_id": "" } }"#);
        assert!(matches!(result, Err(ParseError::EmptyEntityId)));
    }

    #[test]
    fn rejects_bad_timestamp() {
        let result = parse(
            r#"{ "entity": { "entity_id": "https://x.example.org", "valid_until": "tomorrow" } }"#,
        );
        assert!(matches!(
            result,
            Err(ParseError::InvalidTimestamp { value, .. }) if value == "tomorrow"
        ));
    }
}

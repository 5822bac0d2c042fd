//! File-backed provider scenarios: staleness from mtime, expiry retention
//! combinations, and filter wiring through the builder.

use fedmeta::{
    CachingMetadataProvider, FileSource, MetadataError, MetadataProvider, RoleFilter, RoleKind,
    SourceError,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

fn write_metadata(dir: &TempDir, name: &str, json: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, json).unwrap();
    path
}

/// Rewrites the file and pushes its mtime strictly past the recorded one,
/// so the test does not depend on filesystem timestamp granularity.
fn rewrite_metadata(path: &Path, json: &str) {
    fs::write(path, json).unwrap();
    let file = fs::File::options().write(true).open(path).unwrap();
    file.set_modified(SystemTime::now() + Duration::from_secs(5))
        .unwrap();
}

fn single_entity(id: &str, valid_until: Option<&str>) -> String {
    match valid_until {
        Some(ts) => format!(
            r#"{{ "entity": {{ "entity_id": "{id}", "valid_until": "{ts}" }} }}"#
        ),
        None => format!(r#"{{ "entity": {{ "entity_id": "{id}" }} }}"#),
    }
}

#[test]
fn loads_and_answers_queries_from_a_file() {
    let dir = TempDir::new().unwrap();
    let path = write_metadata(
        &dir,
        "metadata.json",
        r#"{
            "entities": {
                "name": "example-federation",
                "children": [
                    { "entity": { "entity_id": "https://idp.example.org" } },
                    {
                        "entities": {
                            "name": "partners",
                            "children": [
                                { "entity": { "entity_id": "https://partner.example.net" } }
                            ]
                        }
                    }
                ]
            }
        }"#,
    );

    let provider = CachingMetadataProvider::builder(FileSource::new(path).unwrap())
        .build()
        .unwrap();

    assert!(provider
        .entity_descriptor("https://idp.example.org")
        .unwrap()
        .is_some());
    assert!(provider
        .entity_descriptor("https://partner.example.net")
        .unwrap()
        .is_some());
    assert!(provider
        .entity_descriptor("https://unknown.example.org")
        .unwrap()
        .is_none());

    let partners = provider.entities_descriptor("partners").unwrap().unwrap();
    assert_eq!(partners.name(), Some("partners"));
    assert!(provider.entities_descriptor("strangers").unwrap().is_none());
}

#[test]
fn repeated_queries_are_stable_for_an_unchanged_file() {
    let dir = TempDir::new().unwrap();
    let path = write_metadata(
        &dir,
        "metadata.json",
        &single_entity("https://idp.example.org", None),
    );
    let provider = CachingMetadataProvider::builder(FileSource::new(path).unwrap())
        .build()
        .unwrap();

    let first = provider
        .entity_descriptor("https://idp.example.org")
        .unwrap()
        .unwrap();
    for _ in 0..10 {
        let again = provider
            .entity_descriptor("https://idp.example.org")
            .unwrap()
            .unwrap();
        assert_eq!(*again, *first);
    }
}

#[test]
fn mtime_bump_is_observed_before_any_expiry_passes() {
    // Document valid for another hour, max cache duration a day: neither
    // expiration is near, the push signal alone must trigger the refresh.
    let in_one_hour = time::OffsetDateTime::now_utc() + Duration::from_secs(3600);
    let ts = in_one_hour
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap();

    let dir = TempDir::new().unwrap();
    let path = write_metadata(
        &dir,
        "metadata.json",
        &single_entity("https://old.example.org", Some(&ts)),
    );

    let provider = CachingMetadataProvider::builder(FileSource::new(&path).unwrap())
        .max_cache_duration(Duration::from_secs(24 * 60 * 60))
        .build()
        .unwrap();
    assert!(provider
        .entity_descriptor("https://old.example.org")
        .unwrap()
        .is_some());

    rewrite_metadata(&path, &single_entity("https://new.example.org", Some(&ts)));

    assert!(provider
        .entity_descriptor("https://new.example.org")
        .unwrap()
        .is_some());
    assert!(provider
        .entity_descriptor("https://old.example.org")
        .unwrap()
        .is_none());
}

#[test]
fn expired_document_is_discarded_unless_maintained() {
    let dir = TempDir::new().unwrap();
    let path = write_metadata(
        &dir,
        "metadata.json",
        &single_entity("https://idp.example.org", Some("2000-01-01T00:00:00Z")),
    );

    let maintained = CachingMetadataProvider::builder(FileSource::new(&path).unwrap())
        .maintain_expired_metadata(true)
        .build()
        .unwrap();
    assert!(maintained
        .entity_descriptor("https://idp.example.org")
        .unwrap()
        .is_some());

    let unmaintained = CachingMetadataProvider::builder(FileSource::new(&path).unwrap())
        .maintain_expired_metadata(false)
        .build()
        .unwrap();
    assert!(unmaintained
        .entity_descriptor("https://idp.example.org")
        .unwrap()
        .is_none());
}

#[test]
fn require_valid_hides_expired_entity_under_valid_parent() {
    let dir = TempDir::new().unwrap();
    let path = write_metadata(
        &dir,
        "metadata.json",
        r#"{
            "entities": {
                "valid_until": "2100-01-01T00:00:00Z",
                "children": [
                    { "entity": { "entity_id": "https://fresh.example.org" } },
                    {
                        "entity": {
                            "entity_id": "https://stale.example.org",
                            "valid_until": "2000-01-01T00:00:00Z"
                        }
                    }
                ]
            }
        }"#,
    );

    let provider = CachingMetadataProvider::builder(FileSource::new(&path).unwrap())
        .require_valid_metadata(true)
        .build()
        .unwrap();

    assert!(provider
        .entity_descriptor("https://fresh.example.org")
        .unwrap()
        .is_some());
    // Hidden on the first, tree-walking lookup and again on the memoized
    // path.
    for _ in 0..2 {
        assert!(provider
            .entity_descriptor("https://stale.example.org")
            .unwrap()
            .is_none());
    }
}

#[test]
fn role_filter_applies_through_the_builder() {
    let dir = TempDir::new().unwrap();
    let path = write_metadata(
        &dir,
        "metadata.json",
        r#"{
            "entity": {
                "entity_id": "https://idp.example.org",
                "roles": [
                    { "kind": "identity_provider", "protocols": ["urn:fed:protocol:2.0"] },
                    { "kind": "attribute_authority" }
                ]
            }
        }"#,
    );

    let provider = CachingMetadataProvider::builder(FileSource::new(&path).unwrap())
        .filter(RoleFilter::new([RoleKind::IdentityProvider]))
        .build()
        .unwrap();

    let entity = provider
        .entity_descriptor("https://idp.example.org")
        .unwrap()
        .unwrap();
    assert_eq!(entity.roles().len(), 1);
    assert!(provider
        .roles("https://idp.example.org", &RoleKind::AttributeAuthority)
        .unwrap()
        .is_empty());
}

#[test]
fn construction_fails_fast_on_bad_configuration() {
    let dir = TempDir::new().unwrap();

    // Missing file is a source construction error.
    assert!(matches!(
        FileSource::new(dir.path().join("missing.json")),
        Err(SourceError::Io { .. })
    ));

    // Malformed content fails the provider build, not the first query.
    let path = write_metadata(&dir, "garbage.json", "not json at all");
    let result = CachingMetadataProvider::builder(FileSource::new(&path).unwrap()).build();
    assert!(matches!(result, Err(MetadataError::Parse(_))));
}

#[test]
fn deleted_file_keeps_serving_cached_document() {
    let dir = TempDir::new().unwrap();
    let path = write_metadata(
        &dir,
        "metadata.json",
        &single_entity("https://idp.example.org", None),
    );

    let provider = CachingMetadataProvider::builder(FileSource::new(&path).unwrap())
        .maintain_expired_metadata(true)
        .build()
        .unwrap();

    fs::remove_file(&path).unwrap();

    // The staleness probe now fails; the provider falls back to the cached
    // document instead of erroring the query.
    assert!(provider
        .entity_descriptor("https://idp.example.org")
        .unwrap()
        .is_some());

    // The explicit refresh path surfaces the underlying source error.
    assert!(matches!(
        provider.refresh(),
        Err(MetadataError::Source(SourceError::Io { .. }))
    ));
}

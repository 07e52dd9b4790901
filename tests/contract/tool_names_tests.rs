use std::sync::Arc;

use super::support::{registry, MockSource};
use zoning_lookup::mcp::tools::{address, coordinates};

#[test]
fn registry_exposes_exactly_two_lookups_in_order() {
    let registry = registry(Arc::new(MockSource::default()));
    let names: Vec<&str> = registry.descriptors().map(|d| d.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["lookup_zoning_by_coordinates", "lookup_zoning_by_address"]
    );
}

#[test]
fn constants_match_registered_names() {
    let registry = registry(Arc::new(MockSource::default()));
    assert!(registry.get(coordinates::NAME).is_some());
    assert!(registry.get(address::NAME).is_some());
    assert!(registry.get("lookup_zoning").is_none());
}

#[test]
fn descriptions_name_the_location() {
    let registry = registry(Arc::new(MockSource::default()));
    for descriptor in registry.descriptors() {
        assert!(
            descriptor.description.contains("Lebanon, NH"),
            "{} description: {}",
            descriptor.name,
            descriptor.description
        );
    }
}

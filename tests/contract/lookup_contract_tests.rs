use std::sync::Arc;

use serde_json::json;

use super::support::{args, registry, MockSource};
use zoning_lookup::mcp::tools::{address, coordinates};
use zoning_lookup::AppError;

#[tokio::test]
async fn example_point_resolves_district() {
    let source = Arc::new(MockSource::with_point(vec![json!({
        "ACAD_TEXT": "R3",
        "OBJECTID": 311
    })]));
    let registry = registry(Arc::clone(&source));

    let result = registry
        .call(coordinates::NAME, &args(json!({ "lat": 43.6426, "lon": -72.2515 })))
        .await
        .expect("lookup succeeds");

    let body = serde_json::to_value(&result).unwrap();
    assert_eq!(body["found"], true);
    assert_eq!(body["district"], "R3");
    assert_eq!(body["attributes"]["OBJECTID"], 311);
    assert_eq!(body["coordinates"], json!({ "lat": 43.6426, "lon": -72.2515 }));
    assert_eq!(body["source"], "Lebanon Official Zoning Layer");
    assert_eq!(source.calls(), 1);
}

#[tokio::test]
async fn point_outside_any_polygon_is_not_found() {
    let source = Arc::new(MockSource::default());
    let registry = registry(Arc::clone(&source));

    let result = registry
        .call(coordinates::NAME, &args(json!({ "lat": 0.0, "lon": 0.0 })))
        .await
        .expect("lookup succeeds");
    assert!(!result.is_found());
}

#[tokio::test]
async fn invalid_coordinates_never_reach_upstream() {
    let source = Arc::new(MockSource::default());
    let registry = registry(Arc::clone(&source));

    for arguments in [
        json!({ "lat": 91, "lon": 0 }),
        json!({ "lat": 0, "lon": -180.5 }),
        json!({ "lat": "43.6", "lon": -72.2 }),
        json!({ "lat": 43.6 }),
        json!({}),
    ] {
        let err = registry
            .call(coordinates::NAME, &args(arguments.clone()))
            .await
            .expect_err("rejected");
        assert!(matches!(err, AppError::Validation(_)), "{arguments}: {err}");
    }
    assert_eq!(source.calls(), 0);
}

#[tokio::test]
async fn invalid_addresses_never_reach_upstream() {
    let source = Arc::new(MockSource::default());
    let registry = registry(Arc::clone(&source));

    for arguments in [
        json!({ "address": "" }),
        json!({ "address": "   " }),
        json!({ "address": 123 }),
        json!({}),
    ] {
        let err = registry
            .call(address::NAME, &args(arguments.clone()))
            .await
            .expect_err("rejected");
        assert_eq!(
            err.to_string(),
            "invalid input: address must be a non-empty string",
            "{arguments}"
        );
    }
    assert_eq!(source.calls(), 0);
}

#[tokio::test]
async fn address_query_uses_escaped_filter() {
    let source = Arc::new(MockSource::with_addresses(vec![json!({
        "AddNo_Full": "12",
        "StNam_Full": "O'BRIEN RD",
        "d_gis_zone": "RL"
    })]));
    let registry = registry(Arc::clone(&source));

    let result = registry
        .call(address::NAME, &args(json!({ "address": "12 o'brien rd" })))
        .await
        .expect("lookup succeeds");

    assert_eq!(result.district(), Some(&json!("RL")));
    let filter = source.last_where.lock().unwrap().clone().expect("queried");
    assert!(filter.contains("LIKE '%O''BRIEN RD%'"), "{filter}");
}

#[tokio::test]
async fn ambiguous_address_lists_every_match() {
    let source = Arc::new(MockSource::with_addresses(vec![
        json!({ "AddNo_Full": "1", "StNam_Full": "MAIN ST", "d_gis_zone": "CBD" }),
        json!({ "AddNo_Full": "10", "StNam_Full": "MAIN ST", "d_gis_zone": "CBD" }),
    ]));
    let registry = registry(source);

    let result = registry
        .call(address::NAME, &args(json!({ "address": "Main St" })))
        .await
        .expect("lookup succeeds");
    let body = serde_json::to_value(&result).unwrap();
    assert_eq!(body["multipleMatches"], true);
    assert_eq!(body["count"], 2);
    assert_eq!(body["source"], "Lebanon Master Address Table");
}

#[tokio::test]
async fn upstream_failure_surfaces_as_error() {
    let source = Arc::new(MockSource::failing(|| AppError::UpstreamStatus {
        status: 500,
        body: "boom".into(),
    }));
    let registry = registry(source);

    let err = registry
        .call(coordinates::NAME, &args(json!({ "lat": 43.6, "lon": -72.2 })))
        .await
        .expect_err("upstream failed");
    assert_eq!(err.to_string(), "upstream query failed: 500 - boom");
    assert!(err.is_tool_recoverable());
}

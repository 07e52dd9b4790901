use zoning_lookup::arcgis::filter::escape_literal;
use zoning_lookup::arcgis::{AddressQuery, AddressTokens, Coordinates};
use zoning_lookup::AppError;

#[test]
fn out_of_range_coordinates_are_rejected() {
    for (lat, lon) in [
        (90.0001, 0.0),
        (-90.5, 0.0),
        (0.0, 180.01),
        (0.0, -181.0),
        (f64::NAN, 0.0),
        (0.0, f64::NEG_INFINITY),
    ] {
        assert!(
            matches!(Coordinates::new(lat, lon), Err(AppError::Validation(_))),
            "({lat}, {lon}) should be rejected"
        );
    }
}

#[test]
fn in_range_coordinates_are_accepted() {
    let point = Coordinates::new(43.6426, -72.2515).unwrap();
    assert!((point.lat - 43.6426).abs() < f64::EPSILON);
    assert!((point.lon + 72.2515).abs() < f64::EPSILON);
}

#[test]
fn empty_and_blank_addresses_are_rejected() {
    for raw in ["", "   ", "\t\n"] {
        let err = AddressQuery::parse(raw).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid input: address must be a non-empty string"
        );
    }
}

#[test]
fn leading_number_builds_and_filter() {
    let query = AddressQuery::parse(" 123 main street ").unwrap();
    assert_eq!(query.normalized(), "123 MAIN STREET");
    assert_eq!(
        query.tokens(),
        &AddressTokens::NumberAndStreet {
            number: "123".into(),
            street: "MAIN STREET".into(),
        }
    );
    assert_eq!(
        query.where_clause(),
        "UPPER(AddNo_Full) LIKE '%123%' AND UPPER(StNam_Full) LIKE '%MAIN STREET%'"
    );
}

#[test]
fn alphanumeric_house_number_counts_as_number() {
    let query = AddressQuery::parse("14A Fairview Ave").unwrap();
    assert!(matches!(
        query.tokens(),
        AddressTokens::NumberAndStreet { number, .. } if number == "14A"
    ));
}

#[test]
fn street_only_builds_or_filter() {
    let query = AddressQuery::parse("Main St").unwrap();
    assert_eq!(
        query.where_clause(),
        "UPPER(StNam_Full) LIKE '%MAIN ST%' OR UPPER(AddNo_Full) LIKE '%MAIN ST%'"
    );
}

#[test]
fn single_number_builds_or_filter() {
    let query = AddressQuery::parse("123").unwrap();
    assert_eq!(
        query.where_clause(),
        "UPPER(StNam_Full) LIKE '%123%' OR UPPER(AddNo_Full) LIKE '%123%'"
    );
}

#[test]
fn quotes_are_doubled_in_and_filter() {
    let query = AddressQuery::parse("12 O'Brien Rd").unwrap();
    assert_eq!(
        query.where_clause(),
        "UPPER(AddNo_Full) LIKE '%12%' AND UPPER(StNam_Full) LIKE '%O''BRIEN RD%'"
    );
}

#[test]
fn quotes_are_doubled_in_or_filter() {
    let query = AddressQuery::parse("O'Brien").unwrap();
    assert_eq!(
        query.where_clause(),
        "UPPER(StNam_Full) LIKE '%O''BRIEN%' OR UPPER(AddNo_Full) LIKE '%O''BRIEN%'"
    );
}

#[test]
fn injection_attempt_stays_inside_literal() {
    let query = AddressQuery::parse("x' OR '1'='1").unwrap();
    let clause = query.where_clause();
    // Every quote the user typed is doubled, so the literal count stays even.
    assert_eq!(clause.matches('\'').count() % 2, 0);
    assert!(clause.contains("X'' OR ''1''=''1"));
}

#[test]
fn escape_leaves_plain_text_alone() {
    assert_eq!(escape_literal("MAIN ST"), "MAIN ST");
}

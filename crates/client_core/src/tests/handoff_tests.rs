use super::*;
use shared::domain::OrgId;

use crate::test_support::{coord, org, sample_catalog};

fn item(category: &str, name: &str, quantity: u32, condition: &str) -> DonationItem {
    DonationItem {
        category: category.into(),
        name: name.into(),
        quantity,
        condition: condition.into(),
    }
}

fn sample_params(items: Vec<DonationItem>) -> HandoffParams {
    HandoffParams::new(
        Some(&org("MUM-1", "Annapurna & Sons", Some((19.07, 72.87)))),
        City::from("Mumbai"),
        Some(coord(19.076, 72.877)),
        items,
    )
}

#[test]
fn round_trip_preserves_items_in_order() {
    let items = vec![
        item("Food", "Rice bags", 5, "High"),
        item("Clothes", "Sarees, cotton", 2, "Medium"),
        item("Books", "Grade 5 \"Math\" & Science", 10, "Low"),
    ];
    let query = sample_params(items.clone()).to_query().expect("encode");

    let arrival = ArrivalState::from_query(&query);

    assert_eq!(arrival.items, items);
    assert_eq!(arrival.ngo_id.as_deref(), Some("MUM-1"));
    assert_eq!(arrival.ngo_name.as_deref(), Some("Annapurna & Sons"));
    assert_eq!(arrival.city, Some(City::from("Mumbai")));
    assert_eq!(arrival.coordinate, Some(coord(19.076, 72.877)));
    assert!(arrival.warnings.is_empty(), "{:?}", arrival.warnings);
}

#[test]
fn outgoing_query_uses_expected_parameter_names() {
    let query = sample_params(Vec::new()).to_query().expect("encode");
    let keys: Vec<String> = url::form_urlencoded::parse(query.as_bytes())
        .map(|(key, _)| key.into_owned())
        .collect();
    assert_eq!(keys, ["ngo_id", "ngo_name", "city", "lat", "lng", "items"]);
    assert!(query.contains("items=%5B%5D"));
}

#[test]
fn missing_coordinate_is_sent_as_empty_strings() {
    let params = HandoffParams::new(
        Some(&org("PUN-1", "Seva", None)),
        City::from("Pune"),
        None,
        Vec::new(),
    );
    let query = params.to_query().expect("encode");
    assert!(query.contains("lat=&lng="));

    let arrival = ArrivalState::from_query(&query);
    assert_eq!(arrival.coordinate, None);
    assert!(arrival.warnings.is_empty());
}

#[test]
fn next_page_url_appends_query() {
    let url = sample_params(Vec::new())
        .next_page_url("pickup.html")
        .expect("url");
    assert!(url.starts_with("pickup.html?ngo_id=MUM-1&"));
}

#[test]
fn malformed_items_yield_empty_cart_and_placeholders() {
    let arrival = ArrivalState::from_query("items=not-json");

    assert!(arrival.items.is_empty());
    assert_eq!(arrival.ngo_name_label(), "—");
    assert_eq!(arrival.ngo_id_label(), "ID: —");
    assert_eq!(arrival.city_label(), "—");
    assert_eq!(arrival.coordinate_label(), "—");
    assert!(arrival
        .warnings
        .iter()
        .any(|w| matches!(w, HandoffParseError::MalformedItems(_))));
    assert!(arrival
        .warnings
        .contains(&HandoffParseError::Missing("ngo_id")));
}

#[test]
fn items_of_the_wrong_shape_are_dropped() {
    let arrival = ArrivalState::from_query(
        "?ngo_id=1&items=%5B%7B%22category%22%3A%22Food%22%2C%22quantity%22%3A-2%7D%5D",
    );
    assert!(arrival.items.is_empty());
    assert_eq!(arrival.warnings.len(), 3);
}

#[test]
fn items_breaking_item_rules_empty_the_cart() {
    let payload = r#"[{"category":"Food","name":"Rice","quantity":2,"condition":"High"},{"category":"Nope","name":"","quantity":0,"condition":""}]"#;
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("items", payload)
        .finish();

    let arrival = ArrivalState::from_query(&query);

    assert!(arrival.items.is_empty());
    assert!(arrival
        .warnings
        .contains(&HandoffParseError::MalformedItems("item 1: blank name".into())));

    for (payload, problem) in [
        (r#"[{"category":" ","name":"Rice","quantity":1,"condition":"Low"}]"#, "blank category"),
        (r#"[{"category":"Food","name":"Rice","quantity":0,"condition":"Low"}]"#, "quantity below 1"),
        (r#"[{"category":"Food","name":"Rice","quantity":1,"condition":""}]"#, "blank condition"),
    ] {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("items", payload)
            .finish();
        let arrival = ArrivalState::from_query(&query);
        assert!(arrival.items.is_empty(), "{payload}");
        assert!(arrival
            .warnings
            .contains(&HandoffParseError::MalformedItems(format!("item 0: {problem}"))));
    }
}

#[test]
fn catalog_check_drops_cart_with_unknown_category() {
    let query = sample_params(vec![
        item("Food", "Rice bags", 5, "High"),
        item("Furniture", "Chair", 1, "Low"),
    ])
    .to_query()
    .expect("encode");
    let mut arrival = ArrivalState::from_query(&query);
    assert_eq!(arrival.items.len(), 2);

    assert!(!arrival.check_against_catalog(&sample_catalog()));

    assert!(arrival.items.is_empty());
    assert_eq!(
        arrival.warnings,
        vec![HandoffParseError::MalformedItems(
            "item 1: unknown category 'Furniture'".into()
        )]
    );

    let query = sample_params(vec![item("Books", "Atlas", 1, "Medium")])
        .to_query()
        .expect("encode");
    let mut arrival = ArrivalState::from_query(&query);
    assert!(arrival.check_against_catalog(&sample_catalog()));
    assert_eq!(arrival.items.len(), 1);
}

#[test]
fn handoff_without_organization_sends_empty_ngo_fields() {
    let params = HandoffParams::new(
        None,
        City::from("Nagpur"),
        Some(coord(21.14, 79.08)),
        vec![item("Food", "Rice", 1, "High")],
    );
    let query = params.to_query().expect("encode");
    assert!(query.starts_with("ngo_id=&ngo_name=&city=Nagpur&"));

    let arrival = ArrivalState::from_query(&query);
    assert_eq!(arrival.ngo_id_label(), "ID: —");
    assert_eq!(arrival.ngo_name_label(), "—");
    assert_eq!(arrival.city_label(), "📍 Nagpur");
    assert_eq!(arrival.items.len(), 1);
}

#[test]
fn display_helpers_render_present_fields() {
    let arrival = ArrivalState::from_query("ngo_id=NGP-1&ngo_name=Seva&city=Nagpur&items=[]");
    assert_eq!(arrival.ngo_id_label(), "ID: NGP-1");
    assert_eq!(arrival.ngo_name_label(), "Seva");
    assert_eq!(arrival.city_label(), "📍 Nagpur");
    assert_eq!(arrival.ngo_id.map(OrgId), Some(OrgId::from("NGP-1")));
}

#[test]
fn coordinate_requires_both_finite_components() {
    let half = ArrivalState::from_query("lat=19.07");
    assert_eq!(half.coordinate, None);
    assert!(half
        .warnings
        .contains(&HandoffParseError::PartialCoordinate("lat")));

    let garbage = ArrivalState::from_query("lat=19.07&lng=east");
    assert_eq!(garbage.coordinate, None);
    assert!(garbage.warnings.contains(&HandoffParseError::InvalidNumber {
        name: "lng",
        value: "east".into()
    }));

    let infinite = ArrivalState::from_query("lat=inf&lng=72.8");
    assert_eq!(infinite.coordinate, None);

    let good = ArrivalState::from_query("lat=19.07&lng=72.8");
    assert_eq!(good.coordinate, Some(coord(19.07, 72.8)));
    assert_eq!(good.coordinate_label(), "19.070000, 72.800000");
}

#[test]
fn blank_parameters_count_as_missing() {
    let arrival = ArrivalState::from_query("ngo_id=%20%20&city=");
    assert_eq!(arrival.ngo_id, None);
    assert_eq!(arrival.city, None);
}

//! Navigation parameters passed from the location step to the next page.
//!
//! Outgoing: `ngo_id`, `ngo_name`, `city`, `lat`, `lng`, `items` (JSON array).
//! Incoming parameters are untrusted; parsing never fails and records each degraded
//! field instead.

use shared::{
    domain::{City, Coordinate, DonationItem, Organization},
    protocol::ItemsCatalog,
};
use tracing::warn;
use url::form_urlencoded;

use crate::{error::ContinueError, error::HandoffParseError, resolver::PLACEHOLDER};

#[derive(Debug, Clone, PartialEq)]
pub struct HandoffParams {
    pub ngo_id: String,
    pub ngo_name: String,
    pub city: City,
    pub coordinate: Option<Coordinate>,
    pub items: Vec<DonationItem>,
}

impl HandoffParams {
    /// Without a selected organization `ngo_id` and `ngo_name` are sent empty.
    pub fn new(
        organization: Option<&Organization>,
        city: City,
        coordinate: Option<Coordinate>,
        items: Vec<DonationItem>,
    ) -> Self {
        Self {
            ngo_id: organization.map_or_else(String::new, |org| org.id.to_string()),
            ngo_name: organization.map_or_else(String::new, |org| org.name.clone()),
            city,
            coordinate,
            items,
        }
    }

    pub fn to_query(&self) -> Result<String, ContinueError> {
        let items =
            serde_json::to_string(&self.items).map_err(|e| ContinueError::Encode(e.to_string()))?;
        let (lat, lng) = match self.coordinate {
            Some(coordinate) => (coordinate.lat().to_string(), coordinate.lng().to_string()),
            None => (String::new(), String::new()),
        };

        Ok(form_urlencoded::Serializer::new(String::new())
            .append_pair("ngo_id", &self.ngo_id)
            .append_pair("ngo_name", &self.ngo_name)
            .append_pair("city", self.city.as_str())
            .append_pair("lat", &lat)
            .append_pair("lng", &lng)
            .append_pair("items", &items)
            .finish())
    }

    pub fn next_page_url(&self, next_page: &str) -> Result<String, ContinueError> {
        Ok(format!("{next_page}?{}", self.to_query()?))
    }
}

/// What the receiving page can rely on after parsing its navigation parameters.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ArrivalState {
    pub ngo_id: Option<String>,
    pub ngo_name: Option<String>,
    pub city: Option<City>,
    pub coordinate: Option<Coordinate>,
    pub items: Vec<DonationItem>,
    pub warnings: Vec<HandoffParseError>,
}

#[derive(Default)]
struct RawParams {
    ngo_id: Option<String>,
    ngo_name: Option<String>,
    city: Option<String>,
    lat: Option<String>,
    lng: Option<String>,
    items: Option<String>,
}

impl ArrivalState {
    /// Accepts a query string with or without the leading `?`. Later duplicates of a
    /// parameter win, as with a browser's parameter map.
    pub fn from_query(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut raw = RawParams::default();
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            let slot = match key.as_ref() {
                "ngo_id" => &mut raw.ngo_id,
                "ngo_name" => &mut raw.ngo_name,
                "city" => &mut raw.city,
                "lat" => &mut raw.lat,
                "lng" => &mut raw.lng,
                "items" => &mut raw.items,
                _ => continue,
            };
            let value = value.trim();
            *slot = (!value.is_empty()).then(|| value.to_string());
        }

        let mut warnings = Vec::new();
        let mut required = |name: &'static str, value: Option<String>| {
            if value.is_none() {
                warnings.push(HandoffParseError::Missing(name));
            }
            value
        };
        let ngo_id = required("ngo_id", raw.ngo_id);
        let ngo_name = required("ngo_name", raw.ngo_name);
        let city = required("city", raw.city).map(City);

        let coordinate = parse_coordinate(raw.lat, raw.lng, &mut warnings);
        let items = match raw.items {
            Some(payload) => match serde_json::from_str::<Vec<DonationItem>>(&payload)
                .map_err(|err| err.to_string())
                .and_then(check_items)
            {
                Ok(items) => items,
                Err(reason) => {
                    warnings.push(HandoffParseError::MalformedItems(reason));
                    Vec::new()
                }
            },
            None => {
                warnings.push(HandoffParseError::Missing("items"));
                Vec::new()
            }
        };

        for warning in &warnings {
            warn!(%warning, "degraded handoff parameter");
        }

        Self {
            ngo_id,
            ngo_name,
            city,
            coordinate,
            items,
            warnings,
        }
    }

    /// Drops the whole cart when any item names a category or condition the catalog
    /// does not list. Returns whether the cart was kept.
    pub fn check_against_catalog(&mut self, catalog: &ItemsCatalog) -> bool {
        let unknown = self.items.iter().enumerate().find_map(|(index, item)| {
            if !catalog.has_category(&item.category) {
                Some(format!("item {index}: unknown category '{}'", item.category))
            } else if !catalog.has_condition(&item.condition) {
                Some(format!("item {index}: unknown condition '{}'", item.condition))
            } else {
                None
            }
        });
        match unknown {
            Some(reason) => {
                let warning = HandoffParseError::MalformedItems(reason);
                warn!(%warning, "degraded handoff parameter");
                self.warnings.push(warning);
                self.items.clear();
                false
            }
            None => true,
        }
    }

    pub fn ngo_name_label(&self) -> &str {
        self.ngo_name.as_deref().unwrap_or(PLACEHOLDER)
    }

    pub fn ngo_id_label(&self) -> String {
        format!("ID: {}", self.ngo_id.as_deref().unwrap_or(PLACEHOLDER))
    }

    pub fn city_label(&self) -> String {
        match &self.city {
            Some(city) => format!("📍 {city}"),
            None => PLACEHOLDER.to_string(),
        }
    }

    pub fn coordinate_label(&self) -> String {
        match self.coordinate {
            Some(coordinate) => coordinate.to_string(),
            None => PLACEHOLDER.to_string(),
        }
    }
}

// One bad entry invalidates the whole list; a partial cart is never handed on.
fn check_items(items: Vec<DonationItem>) -> Result<Vec<DonationItem>, String> {
    for (index, item) in items.iter().enumerate() {
        let problem = if item.category.trim().is_empty() {
            "blank category"
        } else if item.name.trim().is_empty() {
            "blank name"
        } else if item.quantity < 1 {
            "quantity below 1"
        } else if item.condition.trim().is_empty() {
            "blank condition"
        } else {
            continue;
        };
        return Err(format!("item {index}: {problem}"));
    }
    Ok(items)
}

fn parse_degrees(
    name: &'static str,
    value: Option<String>,
    warnings: &mut Vec<HandoffParseError>,
) -> Option<f64> {
    let value = value?;
    match value.parse::<f64>() {
        Ok(degrees) if degrees.is_finite() => Some(degrees),
        _ => {
            warnings.push(HandoffParseError::InvalidNumber { name, value });
            None
        }
    }
}

// An absent pair is normal (no position was resolved); half a pair is not.
fn parse_coordinate(
    lat: Option<String>,
    lng: Option<String>,
    warnings: &mut Vec<HandoffParseError>,
) -> Option<Coordinate> {
    match (lat.is_some(), lng.is_some()) {
        (false, false) => return None,
        (true, false) => {
            warnings.push(HandoffParseError::PartialCoordinate("lat"));
            return None;
        }
        (false, true) => {
            warnings.push(HandoffParseError::PartialCoordinate("lng"));
            return None;
        }
        (true, true) => {}
    }
    let lat = parse_degrees("lat", lat, warnings);
    let lng = parse_degrees("lng", lng, warnings);
    Coordinate::new(lat?, lng?)
}

#[cfg(test)]
#[path = "tests/handoff_tests.rs"]
mod tests;

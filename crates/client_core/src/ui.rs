//! Rendering seams of a donation session. The controller only ever talks to these traits.

use shared::domain::{City, Coordinate, Mode, Organization};

use crate::{
    banner::{Banner, BannerId},
    cart::CartEntry,
    resolver::{distance_label, Resolution, PLACEHOLDER},
};

/// The location summary panel: resolved city, distance and coordinate.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationView {
    pub city: Option<City>,
    pub distance_label: String,
    pub coordinate: Option<Coordinate>,
}

impl LocationView {
    pub fn cleared() -> Self {
        Self {
            city: None,
            distance_label: distance_label(None),
            coordinate: None,
        }
    }

    pub fn resolved(resolution: &Resolution) -> Self {
        Self {
            city: Some(resolution.city.clone()),
            distance_label: resolution.distance_label.clone(),
            coordinate: resolution.coordinate,
        }
    }

    pub fn city_label(&self) -> &str {
        self.city.as_ref().map_or(PLACEHOLDER, City::as_str)
    }

    pub fn lat_label(&self) -> String {
        self.coordinate
            .map_or_else(|| PLACEHOLDER.to_string(), |c| format!("{:.6}", c.lat()))
    }

    pub fn lng_label(&self) -> String {
        self.coordinate
            .map_or_else(|| PLACEHOLDER.to_string(), |c| format!("{:.6}", c.lng()))
    }
}

pub trait UiAdapter: Send + Sync {
    fn show_status(&self, text: &str);
    fn show_banner(&self, banner: &Banner);
    fn clear_banner(&self, id: BannerId);
    fn render_mode(&self, mode: Mode);
    fn render_cities(&self, cities: &[City]);
    fn render_location(&self, view: &LocationView);
    /// An empty slice is the "no organizations found" state.
    fn render_organizations(&self, organizations: &[Organization]);
    fn render_organization_details(&self, organization: &Organization);
    fn set_continue_enabled(&self, enabled: bool);
    fn render_cart(&self, entries: &[CartEntry]);
    fn render_quantity(&self, value: i64);
}

/// Map collaborator. Marker drags come back through
/// `DonationSession::handle_marker_drag_end`.
pub trait MapWidget: Send + Sync {
    fn initialize(&self, center: Coordinate);
    fn set_view(&self, center: Coordinate, zoom: u8);
}

pub struct MissingMap;

impl MapWidget for MissingMap {
    fn initialize(&self, _center: Coordinate) {}
    fn set_view(&self, _center: Coordinate, _zoom: u8) {}
}

use client_core::{
    banner::{Banner, BannerId, BannerKind},
    cart::CartEntry,
    LocationView, UiAdapter,
};
use shared::domain::{City, Mode, Organization};
use tracing::debug;

/// Terminal rendering of a donation session. Every render is a line on stdout.
#[derive(Debug, Default)]
pub struct ConsoleUi;

impl UiAdapter for ConsoleUi {
    fn show_status(&self, text: &str) {
        println!("… {text}");
    }

    fn show_banner(&self, banner: &Banner) {
        match banner.kind {
            BannerKind::Success => println!("✔ {}", banner.message),
            BannerKind::Error => eprintln!("✘ {}", banner.message),
        }
    }

    fn clear_banner(&self, id: BannerId) {
        debug!(banner = id.0, "banner dismissed");
    }

    fn render_mode(&self, mode: Mode) {
        debug!(?mode, "mode");
    }

    fn render_cities(&self, cities: &[City]) {
        debug!(count = cities.len(), "cities loaded");
    }

    fn render_location(&self, view: &LocationView) {
        if view.city.is_some() {
            println!(
                "city: {}  distance: {}  lat: {}  lng: {}",
                view.city_label(),
                view.distance_label,
                view.lat_label(),
                view.lng_label()
            );
        }
    }

    fn render_organizations(&self, organizations: &[Organization]) {
        if organizations.is_empty() {
            println!("No NGOs found in this city.");
            return;
        }
        for org in organizations {
            println!("  [{}] {}  {}", org.id, org.name, org.phone);
        }
    }

    fn render_organization_details(&self, organization: &Organization) {
        let volunteer = &organization.volunteer;
        println!("selected: {} ({})", organization.name, organization.id);
        if !volunteer.name.is_empty() {
            println!(
                "  volunteer: {} {} {} {}",
                volunteer.name, volunteer.role, volunteer.phone, volunteer.email
            );
        }
    }

    fn set_continue_enabled(&self, enabled: bool) {
        debug!(enabled, "continue gate");
    }

    fn render_cart(&self, entries: &[CartEntry]) {
        if entries.is_empty() {
            println!("cart: empty");
            return;
        }
        println!("cart:");
        for (index, entry) in entries.iter().enumerate() {
            let item = &entry.item;
            println!(
                "  {index}. {} x{} ({}, {})",
                item.name, item.quantity, item.category, item.condition
            );
        }
    }

    fn render_quantity(&self, value: i64) {
        debug!(value, "quantity");
    }
}

//! The donation session controller.
//!
//! Owns the single [`SessionState`] of a page instance and exposes one handler per user
//! command. All rendering goes through [`UiAdapter`] and [`MapWidget`].

use std::sync::Arc;

use shared::domain::{City, Coordinate, Mode, OrgId, Organization};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::{
    banner::BannerSlot,
    cart::{AddAck, CartBuilder, CartEntry, EntryId, ItemCandidate},
    config::SessionSettings,
    directory::DirectoryClient,
    error::{CartError, ContinueError, DirectoryError},
    geolocation::{GeolocationProvider, PositionOptions},
    handoff::HandoffParams,
    resolver::{
        LocationResolver, Resolution, ResolutionOutcome, ResolverEvent, ResolverObserver,
        ResolverPhase,
    },
    ui::{LocationView, MapWidget, UiAdapter},
};

pub const CATALOG_LOAD_FAILED: &str = "Failed to load donation options. Please refresh the page.";
pub const CITIES_LOAD_FAILED: &str = "Failed to load the city list. Please refresh the page.";

/// The item form as submitted. The quantity comes from the session's stepper.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ItemForm {
    pub category: String,
    pub name: String,
    pub condition: String,
}

/// Read-only view of one session, assembled by [`DonationSession::state`].
///
/// The resolver and the controller each keep their half behind their own lock: the
/// resolver's half is mutated across network awaits and must not block cart commands.
/// The two halves are read one after the other, so a snapshot taken while a command is
/// running may mix state from before and after that command.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub mode: Mode,
    pub phase: ResolverPhase,
    pub resolution: Option<Resolution>,
    pub selected_organization: Option<OrgId>,
    pub cart: Vec<CartEntry>,
    pub quantity: i64,
    pub catalog_ready: bool,
}

impl SessionState {
    pub fn can_continue(&self) -> bool {
        self.resolution
            .as_ref()
            .is_some_and(Resolution::can_continue)
    }
}

struct ControllerState {
    selected: Option<OrgId>,
    cart: CartBuilder,
}

/// Forwards resolver events to the rendering seams.
struct SessionRenderer {
    ui: Arc<dyn UiAdapter>,
    map: Arc<dyn MapWidget>,
}

impl ResolverObserver for SessionRenderer {
    fn on_event(&self, event: &ResolverEvent) {
        match event {
            ResolverEvent::PhaseChanged(phase) => debug!(?phase, "resolver phase changed"),
            ResolverEvent::Status(text) => self.ui.show_status(text),
            ResolverEvent::Cleared => {
                self.ui.render_location(&LocationView::cleared());
                self.ui.render_organizations(&[]);
                self.ui.set_continue_enabled(false);
            }
            ResolverEvent::Resolved(resolution) => {
                self.ui.render_location(&LocationView::resolved(resolution));
                self.ui.render_organizations(&resolution.organizations);
                self.ui.set_continue_enabled(resolution.can_continue());
            }
            ResolverEvent::Recenter { coordinate, zoom } => self.map.set_view(*coordinate, *zoom),
        }
    }
}

pub struct DonationSession {
    settings: SessionSettings,
    directory: Arc<DirectoryClient>,
    resolver: LocationResolver,
    ui: Arc<dyn UiAdapter>,
    map: Arc<dyn MapWidget>,
    banners: BannerSlot,
    inner: Mutex<ControllerState>,
}

impl DonationSession {
    pub fn new(
        settings: SessionSettings,
        directory: Arc<DirectoryClient>,
        geolocation: Arc<dyn GeolocationProvider>,
        ui: Arc<dyn UiAdapter>,
        map: Arc<dyn MapWidget>,
    ) -> Self {
        let renderer = Arc::new(SessionRenderer {
            ui: Arc::clone(&ui),
            map: Arc::clone(&map),
        });
        let resolver = LocationResolver::new(
            Arc::clone(&directory),
            geolocation,
            renderer,
            PositionOptions::fresh(settings.geolocation_timeout),
            settings.default_center,
        );
        let banners = BannerSlot::new(Arc::clone(&ui), settings.banner_dismiss);

        Self {
            settings,
            directory,
            resolver,
            ui,
            map,
            banners,
            inner: Mutex::new(ControllerState {
                selected: None,
                cart: CartBuilder::new(),
            }),
        }
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn banners(&self) -> &BannerSlot {
        &self.banners
    }

    /// Initializes the map, loads the city list and the items catalog, then starts
    /// automatic location.
    pub async fn boot(&self) -> ResolutionOutcome {
        self.map.initialize(self.settings.default_center);
        self.ui.render_location(&LocationView::cleared());
        self.ui.render_organizations(&[]);
        self.ui.set_continue_enabled(false);
        self.ui.render_cart(&[]);
        self.ui.render_quantity(1);

        // Failures are already on the banner; the session keeps going without them.
        if let Err(err) = self.load_cities().await {
            debug!(error = %err, "booting without a city list");
        }
        if let Err(err) = self.load_catalog().await {
            debug!(error = %err, "booting without an items catalog");
        }

        self.handle_mode_switch(Mode::Auto).await
    }

    pub async fn load_cities(&self) -> Result<Vec<City>, DirectoryError> {
        match self.directory.list_cities().await {
            Ok(cities) => {
                self.ui.render_cities(&cities);
                Ok(cities)
            }
            Err(err) => {
                warn!(error = %err, "failed to load city list");
                self.banners.error(CITIES_LOAD_FAILED).await;
                Err(err)
            }
        }
    }

    /// Adding items stays blocked until this has succeeded once.
    pub async fn load_catalog(&self) -> Result<(), DirectoryError> {
        match self.directory.items_catalog().await {
            Ok(catalog) => {
                self.inner.lock().await.cart.load_catalog(catalog);
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "failed to load items catalog");
                self.banners.error(CATALOG_LOAD_FAILED).await;
                Err(err)
            }
        }
    }

    pub async fn state(&self) -> SessionState {
        let snapshot = self.resolver.snapshot().await;
        let inner = self.inner.lock().await;
        SessionState {
            mode: snapshot.mode,
            phase: snapshot.phase,
            resolution: snapshot.resolution,
            selected_organization: inner.selected.clone(),
            cart: inner.cart.entries().to_vec(),
            quantity: inner.cart.stepper().value(),
            catalog_ready: inner.cart.is_ready(),
        }
    }

    pub async fn handle_mode_switch(&self, mode: Mode) -> ResolutionOutcome {
        self.ui.render_mode(mode);
        let outcome = self.resolver.switch_mode(mode).await;
        if outcome != ResolutionOutcome::Unchanged {
            self.inner.lock().await.selected = None;
        }
        debug!(?mode, ?outcome, "mode switch handled");
        outcome
    }

    pub async fn handle_use_city(&self, city: City) -> ResolutionOutcome {
        if city.is_empty() {
            return ResolutionOutcome::Unchanged;
        }
        self.ui.render_mode(Mode::Manual);
        self.inner.lock().await.selected = None;
        self.resolver.start_manual(city).await
    }

    pub async fn handle_marker_drag_end(&self, coordinate: Coordinate) -> ResolutionOutcome {
        self.inner.lock().await.selected = None;
        self.resolver
            .override_coordinate(coordinate, "marker drag")
            .await
    }

    /// Selects one of the currently resolved organizations and shows its details.
    pub async fn handle_select_organization(&self, id: &str) -> Option<Organization> {
        let resolution = self.resolver.resolution().await?;
        let Some(organization) = resolution.organization(id).cloned() else {
            warn!(ngo_id = id, city = %resolution.city, "selected organization is not listed");
            return None;
        };

        self.inner.lock().await.selected = Some(organization.id.clone());
        self.ui.render_organization_details(&organization);
        info!(ngo_id = %organization.id, name = %organization.name, "organization selected");
        Some(organization)
    }

    pub async fn handle_add_item(&self, form: ItemForm) -> Result<AddAck, CartError> {
        let (result, entries, quantity) = {
            let mut inner = self.inner.lock().await;
            let candidate = ItemCandidate {
                category: form.category,
                name: form.name,
                quantity: inner.cart.stepper().value(),
                condition: form.condition,
            };
            let result = inner.cart.add_item(&candidate);
            (
                result,
                inner.cart.entries().to_vec(),
                inner.cart.stepper().value(),
            )
        };

        self.ui.render_quantity(quantity);
        match &result {
            Ok(ack) => {
                self.ui.render_cart(&entries);
                self.banners.success(ack.message()).await;
            }
            Err(err) => {
                self.banners.error(sentence(&err.to_string())).await;
            }
        }
        result
    }

    /// Index-based removal. Indexes are only valid against the last rendered cart.
    pub async fn handle_remove_item(&self, index: usize) -> Result<CartEntry, CartError> {
        let (result, entries) = {
            let mut inner = self.inner.lock().await;
            let result = inner.cart.remove_item(index);
            (result, inner.cart.entries().to_vec())
        };
        self.after_removal(result, &entries).await
    }

    pub async fn handle_remove_entry(&self, id: EntryId) -> Result<CartEntry, CartError> {
        let (result, entries) = {
            let mut inner = self.inner.lock().await;
            let result = inner.cart.remove_entry(id);
            (result, inner.cart.entries().to_vec())
        };
        self.after_removal(result, &entries).await
    }

    async fn after_removal(
        &self,
        result: Result<CartEntry, CartError>,
        entries: &[CartEntry],
    ) -> Result<CartEntry, CartError> {
        match &result {
            Ok(removed) => {
                debug!(entry = removed.id.0, remaining = entries.len(), "cart entry removed");
                self.ui.render_cart(entries);
            }
            Err(err) => {
                warn!(error = %err, "cart removal rejected");
                self.banners.error(sentence(&err.to_string())).await;
            }
        }
        result
    }

    pub async fn handle_quantity_increment(&self) -> i64 {
        let value = self.inner.lock().await.cart.stepper_mut().increment();
        self.ui.render_quantity(value);
        value
    }

    pub async fn handle_quantity_decrement(&self) -> i64 {
        let value = self.inner.lock().await.cart.stepper_mut().decrement();
        self.ui.render_quantity(value);
        value
    }

    /// A typed-in quantity. Values below 1 are corrected on the next add attempt.
    pub async fn handle_quantity_input(&self, value: i64) {
        self.inner.lock().await.cart.stepper_mut().set(value);
    }

    /// Builds the next-page URL from the resolved city and coordinate, the cart and the
    /// selected organization if there is one. Refused while the continue gate is closed.
    pub async fn handle_continue(&self) -> Result<String, ContinueError> {
        let result = self.build_handoff().await;
        match &result {
            Ok(url) => info!(%url, "continuing to next step"),
            Err(err) => {
                warn!(error = %err, "continue refused");
                self.banners.error(sentence(&err.to_string())).await;
            }
        }
        result
    }

    async fn build_handoff(&self) -> Result<String, ContinueError> {
        let resolution = self
            .resolver
            .resolution()
            .await
            .filter(Resolution::can_continue)
            .ok_or(ContinueError::NotResolved)?;

        let inner = self.inner.lock().await;
        let organization = inner
            .selected
            .as_ref()
            .and_then(|id| resolution.organization(id.as_str()));

        HandoffParams::new(
            organization,
            resolution.city.clone(),
            resolution.coordinate,
            inner.cart.items(),
        )
        .next_page_url(&self.settings.next_page)
    }
}

fn sentence(message: &str) -> String {
    let mut chars = message.chars();
    match chars.next() {
        Some(first) => format!("{}{}.", first.to_uppercase(), chars.as_str()),
        None => String::new(),
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;

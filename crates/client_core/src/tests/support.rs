use std::{
    collections::HashMap,
    future::pending,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex as StdMutex,
    },
};

use async_trait::async_trait;
use shared::{
    domain::{City, Coordinate, Mode, OrgId, Organization, Volunteer},
    protocol::{CitiesResponse, ItemsCatalog, NearestResponse, OrganizationsResponse},
};
use tokio::sync::{oneshot, Mutex, Notify};

use crate::{
    banner::{Banner, BannerId},
    cart::CartEntry,
    directory::{DirectoryApi, DirectoryClient},
    error::{DirectoryError, GeolocationError},
    geolocation::{GeolocationProvider, PositionOptions},
    resolver::{ResolverEvent, ResolverObserver},
    ui::{LocationView, MapWidget, UiAdapter},
};

pub fn coord(lat: f64, lng: f64) -> Coordinate {
    Coordinate::new(lat, lng).expect("finite coordinate")
}

pub fn org(id: &str, name: &str, location: Option<(f64, f64)>) -> Organization {
    Organization {
        id: OrgId::from(id),
        name: name.to_string(),
        phone: "0712-000000".into(),
        lat: location.map(|(lat, _)| lat),
        lng: location.map(|(_, lng)| lng),
        volunteer: Volunteer {
            name: format!("{name} volunteer"),
            phone: "98000".into(),
            email: "help@example.org".into(),
            role: "Coordinator".into(),
        },
    }
}

pub fn sample_catalog() -> ItemsCatalog {
    ItemsCatalog {
        categories: vec!["Food".into(), "Clothes".into(), "Books".into()],
        condition_levels: vec!["High".into(), "Medium".into(), "Low".into()],
    }
}

/// In-memory directory. Nearest matching picks the city whose first located
/// organization is closest and reports `distance_km` as configured.
pub struct FakeDirectory {
    pub organizations: HashMap<String, Vec<Organization>>,
    pub distance_km: Option<f64>,
    pub catalog: Option<ItemsCatalog>,
    pub fail_nearest: AtomicBool,
    pub offline_cities: StdMutex<Vec<String>>,
    pub city_calls: AtomicUsize,
    pub organization_calls: AtomicUsize,
    pub nearest_calls: AtomicUsize,
    held: StdMutex<Option<Coordinate>>,
    release: Notify,
    held_city: StdMutex<Option<String>>,
    release_city: Notify,
}

impl FakeDirectory {
    pub fn sample() -> Self {
        let mut organizations = HashMap::new();
        organizations.insert(
            "Mumbai".to_string(),
            vec![
                org("MUM-1", "Annapurna", Some((19.07, 72.87))),
                org("MUM-2", "Roti Bank", Some((19.10, 72.90))),
            ],
        );
        organizations.insert(
            "Nagpur".to_string(),
            vec![org("NGP-1", "Seva Kendra", Some((21.14, 79.08)))],
        );
        organizations.insert("Pune".to_string(), Vec::new());
        organizations.insert(
            "Indore".to_string(),
            vec![org("IND-1", "Sahyog", None)],
        );

        Self {
            organizations,
            distance_km: Some(3.2),
            catalog: Some(sample_catalog()),
            fail_nearest: AtomicBool::new(false),
            offline_cities: StdMutex::new(Vec::new()),
            city_calls: AtomicUsize::new(0),
            organization_calls: AtomicUsize::new(0),
            nearest_calls: AtomicUsize::new(0),
            held: StdMutex::new(None),
            release: Notify::new(),
            held_city: StdMutex::new(None),
            release_city: Notify::new(),
        }
    }

    pub fn without_catalog(mut self) -> Self {
        self.catalog = None;
        self
    }

    /// Nearest requests for `coordinate` block until [`FakeDirectory::release_held`].
    pub fn hold_nearest(&self, coordinate: Coordinate) {
        *self.held.lock().expect("held") = Some(coordinate);
    }

    pub fn release_held(&self) {
        self.release.notify_one();
    }

    /// Listings for `city` block until [`FakeDirectory::release_city`].
    pub fn hold_city(&self, city: &str) {
        *self.held_city.lock().expect("held city") = Some(city.to_string());
    }

    pub fn release_city(&self) {
        self.release_city.notify_one();
    }

    pub fn set_offline(&self, city: &str) {
        self.offline_cities
            .lock()
            .expect("offline")
            .push(city.to_string());
    }

    pub fn client(self: &Arc<Self>) -> Arc<DirectoryClient> {
        Arc::new(DirectoryClient::new(self.clone()))
    }
}

#[async_trait]
impl DirectoryApi for FakeDirectory {
    async fn cities(&self) -> Result<CitiesResponse, DirectoryError> {
        self.city_calls.fetch_add(1, Ordering::SeqCst);
        let mut cities: Vec<City> = self.organizations.keys().map(|c| City::from(c.as_str())).collect();
        cities.sort();
        Ok(CitiesResponse { cities })
    }

    async fn organizations(&self, city: &City) -> Result<OrganizationsResponse, DirectoryError> {
        self.organization_calls.fetch_add(1, Ordering::SeqCst);
        let held = self.held_city.lock().expect("held city").as_deref() == Some(city.as_str());
        if held {
            self.release_city.notified().await;
        }
        let offline = self
            .offline_cities
            .lock()
            .expect("offline")
            .iter()
            .any(|c| c == city.as_str());
        if offline {
            return Err(DirectoryError::Transport("connection refused".into()));
        }
        match self.organizations.get(city.as_str()) {
            Some(ngos) => Ok(OrganizationsResponse {
                city: Some(city.clone()),
                ngos: ngos.clone(),
                error: None,
            }),
            None => Err(DirectoryError::Service(format!("City '{city}' not found"))),
        }
    }

    async fn nearest(&self, coordinate: Coordinate) -> Result<NearestResponse, DirectoryError> {
        self.nearest_calls.fetch_add(1, Ordering::SeqCst);
        let held = *self.held.lock().expect("held");
        if held == Some(coordinate) {
            self.release.notified().await;
        }
        if self.fail_nearest.load(Ordering::SeqCst) {
            return Ok(NearestResponse {
                error: Some("nearest lookup failed".into()),
                ..NearestResponse::default()
            });
        }

        let best = self
            .organizations
            .iter()
            .filter_map(|(city, ngos)| {
                let center = ngos.iter().find_map(Organization::coordinate)?;
                let d = (center.lat() - coordinate.lat()).powi(2)
                    + (center.lng() - coordinate.lng()).powi(2);
                Some((d, city, ngos))
            })
            .min_by(|a, b| a.0.total_cmp(&b.0));

        match best {
            Some((_, city, ngos)) => Ok(NearestResponse {
                city: Some(City::from(city.as_str())),
                distance_km: self.distance_km,
                ngos: ngos.clone(),
                error: None,
            }),
            None => Err(DirectoryError::Malformed("no located organizations".into())),
        }
    }

    async fn items_catalog(&self) -> Result<ItemsCatalog, DirectoryError> {
        self.catalog.clone().ok_or(DirectoryError::Status(404))
    }
}

/// Geolocation that answers only when the test sends a result.
pub struct GatedGeolocation {
    pub calls: AtomicUsize,
    pending: Mutex<Option<oneshot::Receiver<Result<Coordinate, GeolocationError>>>>,
}

impl GatedGeolocation {
    pub fn new() -> (Arc<Self>, oneshot::Sender<Result<Coordinate, GeolocationError>>) {
        let (tx, rx) = oneshot::channel();
        let provider = Arc::new(Self {
            calls: AtomicUsize::new(0),
            pending: Mutex::new(Some(rx)),
        });
        (provider, tx)
    }
}

#[async_trait]
impl GeolocationProvider for GatedGeolocation {
    async fn current_position(
        &self,
        _options: PositionOptions,
    ) -> Result<Coordinate, GeolocationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let rx = self.pending.lock().await.take();
        match rx {
            Some(rx) => rx.await.unwrap_or(Err(GeolocationError::PositionUnavailable)),
            None => pending().await,
        }
    }
}

pub struct FailingGeolocation(pub GeolocationError);

#[async_trait]
impl GeolocationProvider for FailingGeolocation {
    async fn current_position(
        &self,
        _options: PositionOptions,
    ) -> Result<Coordinate, GeolocationError> {
        Err(self.0)
    }
}

#[derive(Default)]
pub struct RecordingObserver {
    pub events: StdMutex<Vec<ResolverEvent>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<ResolverEvent> {
        self.events.lock().expect("events").clone()
    }

    pub fn statuses(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ResolverEvent::Status(text) => Some(text),
                _ => None,
            })
            .collect()
    }
}

impl ResolverObserver for RecordingObserver {
    fn on_event(&self, event: &ResolverEvent) {
        self.events.lock().expect("events").push(event.clone());
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UiCall {
    Status(String),
    Banner(Banner),
    ClearBanner(BannerId),
    Mode(Mode),
    Cities(Vec<City>),
    Location(LocationView),
    Organizations(Vec<OrgId>),
    Details(OrgId),
    Continue(bool),
    Cart(usize),
    Quantity(i64),
}

#[derive(Default)]
pub struct RecordingUi {
    pub calls: StdMutex<Vec<UiCall>>,
}

impl RecordingUi {
    pub fn calls(&self) -> Vec<UiCall> {
        self.calls.lock().expect("calls").clone()
    }

    fn push(&self, call: UiCall) {
        self.calls.lock().expect("calls").push(call);
    }

    pub fn last_continue(&self) -> Option<bool> {
        self.calls().into_iter().rev().find_map(|call| match call {
            UiCall::Continue(enabled) => Some(enabled),
            _ => None,
        })
    }

    pub fn last_status(&self) -> Option<String> {
        self.calls().into_iter().rev().find_map(|call| match call {
            UiCall::Status(text) => Some(text),
            _ => None,
        })
    }

    pub fn last_banner(&self) -> Option<Banner> {
        self.calls().into_iter().rev().find_map(|call| match call {
            UiCall::Banner(banner) => Some(banner),
            _ => None,
        })
    }

    pub fn last_organizations(&self) -> Option<Vec<OrgId>> {
        self.calls().into_iter().rev().find_map(|call| match call {
            UiCall::Organizations(ids) => Some(ids),
            _ => None,
        })
    }
}

impl UiAdapter for RecordingUi {
    fn show_status(&self, text: &str) {
        self.push(UiCall::Status(text.to_string()));
    }

    fn show_banner(&self, banner: &Banner) {
        self.push(UiCall::Banner(banner.clone()));
    }

    fn clear_banner(&self, id: BannerId) {
        self.push(UiCall::ClearBanner(id));
    }

    fn render_mode(&self, mode: Mode) {
        self.push(UiCall::Mode(mode));
    }

    fn render_cities(&self, cities: &[City]) {
        self.push(UiCall::Cities(cities.to_vec()));
    }

    fn render_location(&self, view: &LocationView) {
        self.push(UiCall::Location(view.clone()));
    }

    fn render_organizations(&self, organizations: &[Organization]) {
        self.push(UiCall::Organizations(
            organizations.iter().map(|org| org.id.clone()).collect(),
        ));
    }

    fn render_organization_details(&self, organization: &Organization) {
        self.push(UiCall::Details(organization.id.clone()));
    }

    fn set_continue_enabled(&self, enabled: bool) {
        self.push(UiCall::Continue(enabled));
    }

    fn render_cart(&self, entries: &[CartEntry]) {
        self.push(UiCall::Cart(entries.len()));
    }

    fn render_quantity(&self, value: i64) {
        self.push(UiCall::Quantity(value));
    }
}

#[derive(Default)]
pub struct RecordingMap {
    pub initialized: StdMutex<Vec<Coordinate>>,
    pub views: StdMutex<Vec<(Coordinate, u8)>>,
}

impl RecordingMap {
    pub fn last_view(&self) -> Option<(Coordinate, u8)> {
        self.views.lock().expect("views").last().copied()
    }
}

impl MapWidget for RecordingMap {
    fn initialize(&self, center: Coordinate) {
        self.initialized.lock().expect("initialized").push(center);
    }

    fn set_view(&self, center: Coordinate, zoom: u8) {
        self.views.lock().expect("views").push((center, zoom));
    }
}

/// Yields until `counter` reaches `target`, so a spawned task can reach its await point.
pub async fn wait_for(counter: &AtomicUsize, target: usize) {
    for _ in 0..1_000 {
        if counter.load(Ordering::SeqCst) >= target {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!(
        "counter stuck at {} waiting for {target}",
        counter.load(Ordering::SeqCst)
    );
}

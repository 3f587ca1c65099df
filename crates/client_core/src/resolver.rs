//! Location resolution state machine.
//!
//! ```text
//! Idle -> RequestingGeolocation -> MatchingCity -> Resolved
//!              |                        |
//!              +------> Failed <--------+
//! Idle -> FetchingManualCity -> Resolved
//! ```
//!
//! Every attempt takes the next generation number. A response is applied only while its
//! generation is still the resolver's current one, so a mode switch or a marker drag made
//! mid-request always wins over the older request.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use shared::domain::{City, Coordinate, Mode, Organization};
use tokio::{sync::Mutex, time::timeout};
use tracing::{debug, info, warn};

use crate::{
    directory::DirectoryClient,
    error::{DirectoryError, GeolocationError},
    geolocation::{GeolocationProvider, PositionOptions},
};

pub const PLACEHOLDER: &str = "—";
pub const MANUAL_DISTANCE_LABEL: &str = "Manual";
pub const RESOLVED_ZOOM: u8 = 12;
pub const OVERVIEW_ZOOM: u8 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Permission(GeolocationError),
    Network,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolverPhase {
    Idle,
    RequestingGeolocation,
    MatchingCity,
    FetchingManualCity,
    Resolved,
    Failed(FailureKind),
}

/// The `(city, organizations, coordinate)` triple. Always replaced as a whole.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub city: City,
    pub organizations: Vec<Organization>,
    pub coordinate: Option<Coordinate>,
    pub distance_label: String,
}

impl Resolution {
    pub fn can_continue(&self) -> bool {
        !self.city.is_empty() && !self.organizations.is_empty()
    }

    pub fn organization(&self, id: &str) -> Option<&Organization> {
        self.organizations.iter().find(|org| org.id.as_str() == id)
    }
}

/// Location of the first listed organization. None when that one has no location,
/// even if a later organization does.
pub fn city_center(organizations: &[Organization]) -> Option<Coordinate> {
    organizations.first().and_then(Organization::coordinate)
}

pub fn distance_label(distance_km: Option<f64>) -> String {
    match distance_km {
        Some(km) => format!("{km:.1} km"),
        None => PLACEHOLDER.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResolverFailure {
    Permission(GeolocationError),
    Network(DirectoryError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResolutionOutcome {
    Resolved(Resolution),
    Failed(ResolverFailure),
    /// A newer attempt started while this one was in flight; its result was dropped.
    Superseded,
    /// A geolocation request was already outstanding and has been handed to this attempt.
    AlreadyRequesting,
    /// Manual mode is active and waits for a city.
    AwaitingCity,
    Unchanged,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResolverEvent {
    PhaseChanged(ResolverPhase),
    Status(String),
    Cleared,
    Resolved(Resolution),
    Recenter { coordinate: Coordinate, zoom: u8 },
}

/// Receives every state change, in order. Called synchronously; must not block.
pub trait ResolverObserver: Send + Sync {
    fn on_event(&self, event: &ResolverEvent);
}

pub struct NoopObserver;

impl ResolverObserver for NoopObserver {
    fn on_event(&self, _event: &ResolverEvent) {}
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolverSnapshot {
    pub mode: Mode,
    pub phase: ResolverPhase,
    pub generation: u64,
    pub resolution: Option<Resolution>,
    pub geolocation_pending: bool,
}

struct ResolverState {
    mode: Mode,
    phase: ResolverPhase,
    generation: u64,
    resolution: Option<Resolution>,
    /// Attempt that will receive the outstanding geolocation fix.
    geolocation_owner: u64,
}

/// Marks a geolocation request as outstanding until dropped, so a cancelled
/// `start_auto` cannot leave the flag set.
struct PendingFix<'a>(&'a AtomicBool);

impl Drop for PendingFix<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl ResolverState {
    fn begin_attempt(&mut self, mode: Mode, phase: ResolverPhase) -> u64 {
        self.generation += 1;
        self.mode = mode;
        self.phase = phase;
        self.resolution = None;
        self.generation
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation == generation
    }
}

pub struct LocationResolver {
    directory: Arc<DirectoryClient>,
    geolocation: Arc<dyn GeolocationProvider>,
    observer: Arc<dyn ResolverObserver>,
    position_options: PositionOptions,
    default_center: Coordinate,
    geolocation_pending: AtomicBool,
    inner: Mutex<ResolverState>,
}

impl LocationResolver {
    pub fn new(
        directory: Arc<DirectoryClient>,
        geolocation: Arc<dyn GeolocationProvider>,
        observer: Arc<dyn ResolverObserver>,
        position_options: PositionOptions,
        default_center: Coordinate,
    ) -> Self {
        Self {
            directory,
            geolocation,
            observer,
            position_options,
            default_center,
            geolocation_pending: AtomicBool::new(false),
            inner: Mutex::new(ResolverState {
                mode: Mode::Auto,
                phase: ResolverPhase::Idle,
                generation: 0,
                resolution: None,
                geolocation_owner: 0,
            }),
        }
    }

    pub async fn snapshot(&self) -> ResolverSnapshot {
        let state = self.inner.lock().await;
        ResolverSnapshot {
            mode: state.mode,
            phase: state.phase,
            generation: state.generation,
            resolution: state.resolution.clone(),
            geolocation_pending: self.geolocation_pending.load(Ordering::SeqCst),
        }
    }

    pub async fn resolution(&self) -> Option<Resolution> {
        self.inner.lock().await.resolution.clone()
    }

    /// Re-selecting the active mode is a no-op unless the resolver is idle, failed, or
    /// waiting on a geolocation request that was cancelled.
    pub async fn switch_mode(&self, mode: Mode) -> ResolutionOutcome {
        {
            let state = self.inner.lock().await;
            let settled = match state.phase {
                ResolverPhase::Idle | ResolverPhase::Failed(_) => false,
                ResolverPhase::RequestingGeolocation => {
                    self.geolocation_pending.load(Ordering::SeqCst)
                }
                _ => true,
            };
            if state.mode == mode && settled {
                return ResolutionOutcome::Unchanged;
            }
        }

        match mode {
            Mode::Auto => self.start_auto().await,
            Mode::Manual => self.enter_manual().await,
        }
    }

    pub async fn start_auto(&self) -> ResolutionOutcome {
        let pending = {
            let mut state = self.inner.lock().await;
            if self.geolocation_pending.load(Ordering::SeqCst) {
                if state.mode != Mode::Auto || state.phase != ResolverPhase::RequestingGeolocation
                {
                    let generation =
                        state.begin_attempt(Mode::Auto, ResolverPhase::RequestingGeolocation);
                    state.geolocation_owner = generation;
                    self.emit(ResolverEvent::Cleared);
                    self.emit(ResolverEvent::PhaseChanged(state.phase));
                }
                debug!(
                    generation = state.generation,
                    "geolocation already outstanding; reusing it"
                );
                return ResolutionOutcome::AlreadyRequesting;
            }

            let generation = state.begin_attempt(Mode::Auto, ResolverPhase::RequestingGeolocation);
            self.geolocation_pending.store(true, Ordering::SeqCst);
            state.geolocation_owner = generation;
            self.emit(ResolverEvent::Cleared);
            self.emit(ResolverEvent::PhaseChanged(state.phase));
            self.emit(ResolverEvent::Status("Requesting GPS permission…".into()));
            info!(generation, "requesting device geolocation");
            PendingFix(&self.geolocation_pending)
        };

        let options = self.position_options;
        let fix = match timeout(options.timeout, self.geolocation.current_position(options)).await
        {
            Ok(result) => result,
            Err(_) => Err(GeolocationError::Timeout),
        };

        let (generation, coordinate) = {
            let mut state = self.inner.lock().await;
            drop(pending);
            let owner = state.geolocation_owner;
            if !state.is_current(owner) || state.mode != Mode::Auto {
                debug!(
                    owner,
                    current = state.generation,
                    "discarding geolocation fix for superseded attempt"
                );
                return ResolutionOutcome::Superseded;
            }

            match fix {
                Ok(coordinate) => {
                    self.emit(ResolverEvent::Status("GPS detected. Loading NGOs…".into()));
                    (owner, coordinate)
                }
                Err(error) => {
                    warn!(%error, "geolocation failed; manual selection recommended");
                    state.phase = ResolverPhase::Failed(FailureKind::Permission(error));
                    state.resolution = None;
                    self.emit(ResolverEvent::PhaseChanged(state.phase));
                    let status = match error {
                        GeolocationError::Unsupported => {
                            "Geolocation not supported. Please use manual selection."
                        }
                        _ => "GPS permission denied/unavailable. Switch to manual selection.",
                    };
                    self.emit(ResolverEvent::Status(status.into()));
                    return ResolutionOutcome::Failed(ResolverFailure::Permission(error));
                }
            }
        };

        self.match_for_generation(generation, coordinate, "GPS").await
    }

    /// Switches to manual mode without a city yet.
    pub async fn enter_manual(&self) -> ResolutionOutcome {
        let mut state = self.inner.lock().await;
        let generation = state.begin_attempt(Mode::Manual, ResolverPhase::Idle);
        debug!(generation, "manual mode awaiting city");
        self.emit(ResolverEvent::Cleared);
        self.emit(ResolverEvent::PhaseChanged(state.phase));
        self.emit(ResolverEvent::Recenter {
            coordinate: self.default_center,
            zoom: OVERVIEW_ZOOM,
        });
        self.emit(ResolverEvent::Status(
            "Choose a city manually, then click “Use this city”.".into(),
        ));
        ResolutionOutcome::AwaitingCity
    }

    pub async fn start_manual(&self, city: City) -> ResolutionOutcome {
        if city.is_empty() {
            return ResolutionOutcome::Unchanged;
        }

        let generation = {
            let mut state = self.inner.lock().await;
            let generation = state.begin_attempt(Mode::Manual, ResolverPhase::FetchingManualCity);
            self.emit(ResolverEvent::Cleared);
            self.emit(ResolverEvent::PhaseChanged(state.phase));
            self.emit(ResolverEvent::Status(format!("Loading NGOs for {city}…")));
            generation
        };
        info!(generation, city = %city, "fetching organizations for manual city");

        let listing = self.directory.list_organizations_for_city(&city).await;

        let mut state = self.inner.lock().await;
        if !state.is_current(generation) {
            debug!(
                generation,
                current = state.generation,
                city = %city,
                "discarding stale organization listing"
            );
            return ResolutionOutcome::Superseded;
        }

        if let Some(error) = listing.unavailable {
            state.phase = ResolverPhase::Failed(FailureKind::Network);
            state.resolution = None;
            self.emit(ResolverEvent::PhaseChanged(state.phase));
            self.emit(ResolverEvent::Status(format!(
                "Could not load NGOs for {city}: {error}"
            )));
            return ResolutionOutcome::Failed(ResolverFailure::Network(error));
        }

        let center = city_center(&listing.organizations);
        let resolution = Resolution {
            city: city.clone(),
            coordinate: center,
            distance_label: MANUAL_DISTANCE_LABEL.to_string(),
            organizations: listing.organizations,
        };
        self.commit_resolution(&mut state, resolution.clone());
        if let Some(coordinate) = center {
            self.emit(ResolverEvent::Recenter {
                coordinate,
                zoom: RESOLVED_ZOOM,
            });
        }
        let status = if resolution.organizations.is_empty() {
            format!("No NGOs found for {city}.")
        } else {
            format!("City set to {city}. NGOs loaded. You can continue.")
        };
        self.emit(ResolverEvent::Status(status));
        ResolutionOutcome::Resolved(resolution)
    }

    /// Matches `coordinate` to the nearest supported city as a fresh attempt. The
    /// previous resolution stays visible until this one settles.
    pub async fn match_nearest(&self, coordinate: Coordinate, reason: &str) -> ResolutionOutcome {
        let generation = {
            let mut state = self.inner.lock().await;
            state.generation += 1;
            state.generation
        };
        self.match_for_generation(generation, coordinate, reason)
            .await
    }

    /// A user-adjusted position (e.g. a dragged marker) re-enters matching with the
    /// next generation; any older request still in flight becomes stale.
    pub async fn override_coordinate(
        &self,
        coordinate: Coordinate,
        reason: &str,
    ) -> ResolutionOutcome {
        debug!(%coordinate, reason, "coordinate overridden");
        self.match_nearest(coordinate, reason).await
    }

    async fn match_for_generation(
        &self,
        generation: u64,
        coordinate: Coordinate,
        reason: &str,
    ) -> ResolutionOutcome {
        {
            let mut state = self.inner.lock().await;
            if !state.is_current(generation) {
                return ResolutionOutcome::Superseded;
            }
            state.phase = ResolverPhase::MatchingCity;
            self.emit(ResolverEvent::PhaseChanged(state.phase));
            self.emit(ResolverEvent::Recenter {
                coordinate,
                zoom: RESOLVED_ZOOM,
            });
            self.emit(ResolverEvent::Status(format!(
                "Location set via {reason}. Matching nearest city…"
            )));
        }

        let result = self.directory.nearest_city(coordinate).await;

        let mut state = self.inner.lock().await;
        if !state.is_current(generation) {
            debug!(
                generation,
                current = state.generation,
                "discarding stale nearest-city match"
            );
            return ResolutionOutcome::Superseded;
        }

        match result {
            Ok(nearest) => {
                info!(
                    generation,
                    city = %nearest.city,
                    organizations = nearest.organizations.len(),
                    "matched nearest city"
                );
                let center = city_center(&nearest.organizations);
                let resolution = Resolution {
                    distance_label: distance_label(nearest.distance_km),
                    city: nearest.city,
                    organizations: nearest.organizations,
                    coordinate: center.or(Some(coordinate)),
                };
                self.commit_resolution(&mut state, resolution.clone());
                if let Some(center) = center {
                    self.emit(ResolverEvent::Recenter {
                        coordinate: center,
                        zoom: RESOLVED_ZOOM,
                    });
                }
                self.emit(ResolverEvent::Status(format!(
                    "Matched city: {}. NGOs loaded. You can continue.",
                    resolution.city
                )));
                ResolutionOutcome::Resolved(resolution)
            }
            Err(error) => {
                warn!(generation, %error, "nearest-city match failed");
                state.phase = ResolverPhase::Failed(FailureKind::Network);
                state.resolution = None;
                self.emit(ResolverEvent::Cleared);
                self.emit(ResolverEvent::PhaseChanged(state.phase));
                self.emit(ResolverEvent::Status(
                    "Could not match city automatically. Try manual selection.".into(),
                ));
                ResolutionOutcome::Failed(ResolverFailure::Network(error))
            }
        }
    }

    fn commit_resolution(&self, state: &mut ResolverState, resolution: Resolution) {
        state.phase = ResolverPhase::Resolved;
        state.resolution = Some(resolution.clone());
        self.emit(ResolverEvent::Resolved(resolution));
        self.emit(ResolverEvent::PhaseChanged(state.phase));
    }

    // Called with the state lock held so observers see events in commit order.
    fn emit(&self, event: ResolverEvent) {
        self.observer.on_event(&event);
    }
}

#[cfg(test)]
#[path = "tests/resolver_tests.rs"]
mod tests;

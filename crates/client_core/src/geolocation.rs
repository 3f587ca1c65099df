use std::time::Duration;

use async_trait::async_trait;
use shared::domain::Coordinate;

use crate::error::GeolocationError;

pub const DEFAULT_GEOLOCATION_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionOptions {
    pub high_accuracy: bool,
    pub timeout: Duration,
    /// Oldest cached fix the provider may hand back. Zero demands a fresh fix.
    pub maximum_age: Duration,
}

impl PositionOptions {
    pub fn fresh(timeout: Duration) -> Self {
        Self {
            high_accuracy: true,
            timeout,
            maximum_age: Duration::ZERO,
        }
    }
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self::fresh(DEFAULT_GEOLOCATION_TIMEOUT)
    }
}

/// Device positioning. The resolver bounds every call by `options.timeout` on its own,
/// so providers need not enforce it.
#[async_trait]
pub trait GeolocationProvider: Send + Sync {
    async fn current_position(
        &self,
        options: PositionOptions,
    ) -> Result<Coordinate, GeolocationError>;
}

pub struct MissingGeolocation;

#[async_trait]
impl GeolocationProvider for MissingGeolocation {
    async fn current_position(
        &self,
        _options: PositionOptions,
    ) -> Result<Coordinate, GeolocationError> {
        Err(GeolocationError::Unsupported)
    }
}

/// Always reports the same fix; used by headless drivers that take a position as input.
pub struct FixedPosition(pub Coordinate);

#[async_trait]
impl GeolocationProvider for FixedPosition {
    async fn current_position(
        &self,
        _options: PositionOptions,
    ) -> Result<Coordinate, GeolocationError> {
        Ok(self.0)
    }
}

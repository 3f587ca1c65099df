use std::time::Duration;

use shared::domain::Coordinate;

use crate::{banner::DEFAULT_BANNER_DISMISS, geolocation::DEFAULT_GEOLOCATION_TIMEOUT};

pub const DEFAULT_NEXT_PAGE: &str = "pickup.html";
pub const DEFAULT_CENTER: Coordinate = Coordinate::from_const(21.1458, 79.0882);

#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    pub server_url: String,
    pub request_timeout: Duration,
    pub geolocation_timeout: Duration,
    pub banner_dismiss: Duration,
    pub next_page: String,
    pub default_center: Coordinate,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:5000".into(),
            request_timeout: Duration::from_secs(15),
            geolocation_timeout: DEFAULT_GEOLOCATION_TIMEOUT,
            banner_dismiss: DEFAULT_BANNER_DISMISS,
            next_page: DEFAULT_NEXT_PAGE.into(),
            default_center: DEFAULT_CENTER,
        }
    }
}


//! NGO directory client: city list, per-city organizations, nearest-city matching
//! and the items catalog.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use shared::{
    domain::{City, Coordinate, Organization},
    error::ApiError,
    protocol::{CitiesResponse, ItemsCatalog, NearestResponse, OrganizationsResponse},
};
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::error::DirectoryError;

/// Transport seam for the four directory endpoints.
#[async_trait]
pub trait DirectoryApi: Send + Sync {
    async fn cities(&self) -> Result<CitiesResponse, DirectoryError>;
    async fn organizations(&self, city: &City) -> Result<OrganizationsResponse, DirectoryError>;
    async fn nearest(&self, coordinate: Coordinate) -> Result<NearestResponse, DirectoryError>;
    async fn items_catalog(&self) -> Result<ItemsCatalog, DirectoryError>;
}

pub struct HttpDirectoryApi {
    http: Client,
    base_url: String,
}

impl HttpDirectoryApi {
    pub fn new(
        base_url: impl Into<String>,
        request_timeout: Duration,
    ) -> Result<Self, DirectoryError> {
        let http = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(DirectoryError::transport)?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn get_json<T>(&self, path: &str, query: &[(&str, String)]) -> Result<T, DirectoryError>
    where
        T: DeserializeOwned,
    {
        let response = self
            .http
            .get(format!("{}{path}", self.base_url))
            .query(query)
            .send()
            .await
            .map_err(DirectoryError::transport)?;
        let status = response.status();
        let body = response.text().await.map_err(DirectoryError::transport)?;

        if !status.is_success() {
            return Err(match serde_json::from_str::<ApiError>(&body) {
                Ok(api_error) => DirectoryError::Service(api_error.error),
                Err(_) => DirectoryError::Status(status.as_u16()),
            });
        }

        serde_json::from_str(&body).map_err(|e| DirectoryError::Malformed(e.to_string()))
    }
}

#[async_trait]
impl DirectoryApi for HttpDirectoryApi {
    async fn cities(&self) -> Result<CitiesResponse, DirectoryError> {
        self.get_json("/api/cities", &[]).await
    }

    async fn organizations(&self, city: &City) -> Result<OrganizationsResponse, DirectoryError> {
        self.get_json("/api/ngos", &[("city", city.to_string())]).await
    }

    async fn nearest(&self, coordinate: Coordinate) -> Result<NearestResponse, DirectoryError> {
        self.get_json(
            "/api/nearest",
            &[
                ("lat", coordinate.lat().to_string()),
                ("lng", coordinate.lng().to_string()),
            ],
        )
        .await
    }

    async fn items_catalog(&self) -> Result<ItemsCatalog, DirectoryError> {
        self.get_json("/api/items_catalog", &[]).await
    }
}

/// Organizations for one city. An unavailable directory yields an empty list plus the
/// cause, so callers can render "no organizations found" and keep going.
#[derive(Debug, Clone, PartialEq)]
pub struct OrganizationListing {
    pub city: City,
    pub organizations: Vec<Organization>,
    pub unavailable: Option<DirectoryError>,
}

impl OrganizationListing {
    pub fn is_available(&self) -> bool {
        self.unavailable.is_none()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NearestMatch {
    pub city: City,
    pub distance_km: Option<f64>,
    pub organizations: Vec<Organization>,
}

pub struct DirectoryClient {
    api: Arc<dyn DirectoryApi>,
    cities: OnceCell<Vec<City>>,
}

impl DirectoryClient {
    pub fn new(api: Arc<dyn DirectoryApi>) -> Self {
        Self {
            api,
            cities: OnceCell::new(),
        }
    }

    pub fn http(
        base_url: impl Into<String>,
        request_timeout: Duration,
    ) -> Result<Self, DirectoryError> {
        Ok(Self::new(Arc::new(HttpDirectoryApi::new(
            base_url,
            request_timeout,
        )?)))
    }

    /// Fetched at most once per session; failures are not cached.
    pub async fn list_cities(&self) -> Result<Vec<City>, DirectoryError> {
        self.cities
            .get_or_try_init(|| async {
                let response = self.api.cities().await?;
                debug!(count = response.cities.len(), "loaded city list");
                Ok::<_, DirectoryError>(response.cities)
            })
            .await
            .cloned()
    }

    pub fn cached_cities(&self) -> Option<&[City]> {
        self.cities.get().map(Vec::as_slice)
    }

    /// Always hits the directory; membership may change between calls.
    pub async fn list_organizations_for_city(&self, city: &City) -> OrganizationListing {
        let result = match self.api.organizations(city).await {
            Ok(OrganizationsResponse {
                error: Some(message),
                ..
            }) => Err(DirectoryError::Service(message)),
            Ok(response) => Ok(response.ngos),
            Err(err) => Err(err),
        };

        match result {
            Ok(organizations) => OrganizationListing {
                city: city.clone(),
                organizations,
                unavailable: None,
            },
            Err(err) => {
                warn!(city = %city, error = %err, "organization directory unavailable");
                OrganizationListing {
                    city: city.clone(),
                    organizations: Vec::new(),
                    unavailable: Some(err),
                }
            }
        }
    }

    pub async fn nearest_city(
        &self,
        coordinate: Coordinate,
    ) -> Result<NearestMatch, DirectoryError> {
        let response = self.api.nearest(coordinate).await?;
        if let Some(message) = response.error {
            return Err(DirectoryError::Service(message));
        }
        let city = response
            .city
            .filter(|city| !city.is_empty())
            .ok_or_else(|| DirectoryError::Malformed("nearest match carried no city".into()))?;
        Ok(NearestMatch {
            city,
            distance_km: response.distance_km.filter(|km| km.is_finite()),
            organizations: response.ngos,
        })
    }

    pub async fn items_catalog(&self) -> Result<ItemsCatalog, DirectoryError> {
        self.api.items_catalog().await
    }
}

#[cfg(test)]
#[path = "tests/directory_tests.rs"]
mod tests;

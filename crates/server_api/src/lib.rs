use std::{
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
};

use anyhow::Context;
use shared::{
    domain::{City, Organization},
    error::{ApiError, ErrorCode},
    protocol::{CitiesResponse, ItemsCatalog, NearestResponse, OrganizationsResponse},
};
use tracing::{debug, info, warn};

pub const EARTH_RADIUS_KM: f64 = 6371.0;
pub const FALLBACK_CITY: &str = "Nagpur";

/// City → organizations table plus the location of the items catalog.
#[derive(Debug, Clone)]
pub struct DirectoryContext {
    organizations: BTreeMap<String, Vec<Organization>>,
    catalog_path: PathBuf,
}

impl DirectoryContext {
    pub fn new(
        organizations: BTreeMap<String, Vec<Organization>>,
        catalog_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            organizations,
            catalog_path: catalog_path.into(),
        }
    }

    /// Reads the directory from a JSON object of `city -> [organization]`. The catalog
    /// file is read per request, so it only needs to exist by then.
    pub fn load(data_path: &Path, catalog_path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(data_path)
            .with_context(|| format!("failed to read directory data '{}'", data_path.display()))?;
        let organizations: BTreeMap<String, Vec<Organization>> = serde_json::from_str(&raw)
            .with_context(|| format!("invalid directory data in '{}'", data_path.display()))?;
        info!(
            cities = organizations.len(),
            organizations = organizations.values().map(Vec::len).sum::<usize>(),
            "directory loaded"
        );
        Ok(Self::new(organizations, catalog_path))
    }

    pub fn city_names(&self) -> Vec<String> {
        self.organizations.keys().cloned().collect()
    }
}

pub fn list_cities(ctx: &DirectoryContext) -> CitiesResponse {
    CitiesResponse {
        cities: ctx
            .organizations
            .keys()
            .map(|city| City::from(city.as_str()))
            .collect(),
    }
}

pub fn list_organizations(
    ctx: &DirectoryContext,
    city: Option<&str>,
) -> Result<OrganizationsResponse, ApiError> {
    let city = city.unwrap_or_default();
    if city.is_empty() {
        return Err(ApiError::new(
            ErrorCode::Validation,
            "Provide city query param.",
        ));
    }
    let Some(ngos) = ctx.organizations.get(city) else {
        return Err(
            ApiError::new(ErrorCode::NotFound, format!("Unknown city: {city}"))
                .with_cities(ctx.city_names()),
        );
    };
    Ok(OrganizationsResponse {
        city: Some(City::from(city)),
        ngos: ngos.clone(),
        error: None,
    })
}

/// Parses the raw `lat`/`lng` query values and matches the nearest city.
pub fn nearest_for_query(
    ctx: &DirectoryContext,
    lat: Option<&str>,
    lng: Option<&str>,
) -> Result<NearestResponse, ApiError> {
    let parse = |raw: Option<&str>| raw.and_then(|value| value.trim().parse::<f64>().ok());
    match (parse(lat), parse(lng)) {
        (Some(lat), Some(lng)) => Ok(nearest(ctx, lat, lng)),
        _ => Err(ApiError::new(
            ErrorCode::Validation,
            "Provide numeric lat and lng query params.",
        )),
    }
}

/// The city of the closest located organization decides the match. With no located
/// organization at all the fallback city is returned without a distance.
pub fn nearest(ctx: &DirectoryContext, lat: f64, lng: f64) -> NearestResponse {
    let mut best: Option<(&str, f64)> = None;
    for (city, ngos) in &ctx.organizations {
        for coordinate in ngos.iter().filter_map(Organization::coordinate) {
            let distance = haversine_km(lat, lng, coordinate.lat(), coordinate.lng());
            if best.map_or(true, |(_, best_distance)| distance < best_distance) {
                best = Some((city.as_str(), distance));
            }
        }
    }

    let (city, distance_km) = match best {
        Some((city, distance)) => (Some(city.to_string()), Some(distance)),
        None => {
            let fallback = if ctx.organizations.contains_key(FALLBACK_CITY) {
                Some(FALLBACK_CITY.to_string())
            } else {
                ctx.organizations.keys().next().cloned()
            };
            warn!(?fallback, "no located organization; using fallback city");
            (fallback, None)
        }
    };
    debug!(lat, lng, ?city, ?distance_km, "nearest city");

    let ngos = city
        .as_deref()
        .and_then(|city| ctx.organizations.get(city))
        .cloned()
        .unwrap_or_default();
    NearestResponse {
        city: city.map(City),
        distance_km,
        ngos,
        error: None,
    }
}

pub fn items_catalog(ctx: &DirectoryContext) -> Result<ItemsCatalog, ApiError> {
    let raw = match fs::read_to_string(&ctx.catalog_path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Err(ApiError::new(ErrorCode::NotFound, "Items catalog not found"));
        }
        Err(err) => {
            return Err(ApiError::new(
                ErrorCode::Internal,
                format!("Failed to read items catalog: {err}"),
            ));
        }
    };
    serde_json::from_str(&raw).map_err(|err| {
        warn!(path = %ctx.catalog_path.display(), error = %err, "invalid items catalog");
        ApiError::new(ErrorCode::Internal, "Invalid items catalog format")
    })
}

pub fn haversine_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lng2 - lng1).to_radians();
    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

use serde::{Deserialize, Serialize};

use crate::domain::{City, Organization};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CitiesResponse {
    #[serde(default)]
    pub cities: Vec<City>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrganizationsResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<City>,
    #[serde(default)]
    pub ngos: Vec<Organization>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NearestResponse {
    #[serde(default)]
    pub city: Option<City>,
    /// `null` when the service fell back to a default city.
    #[serde(default)]
    pub distance_km: Option<f64>,
    #[serde(default)]
    pub ngos: Vec<Organization>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ItemsCatalog {
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub condition_levels: Vec<String>,
}

impl ItemsCatalog {
    pub fn has_category(&self, category: &str) -> bool {
        self.categories.iter().any(|known| known == category)
    }

    pub fn has_condition(&self, condition: &str) -> bool {
        self.condition_levels.iter().any(|known| known == condition)
    }
}

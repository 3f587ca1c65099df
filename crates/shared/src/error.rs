use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Validation,
    NotFound,
    #[default]
    Internal,
}

/// Error body returned by the directory endpoints: `{"error": "..."}`.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("{error}")]
pub struct ApiError {
    #[serde(skip)]
    pub code: ErrorCode,
    pub error: String,
    /// Known cities, attached when an unknown city was requested.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cities: Vec<String>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            error: message.into(),
            cities: Vec::new(),
        }
    }

    pub fn with_cities(mut self, cities: Vec<String>) -> Self {
        self.cities = cities;
        self
    }
}

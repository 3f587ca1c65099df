//! Failure taxonomy of the donation core. Every failure is caught at a component
//! boundary and converted into one of these; none of them is fatal to a session.

use std::fmt;

use thiserror::Error;

/// Geolocation could not produce a fix. Recoverable through the manual path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GeolocationError {
    #[error("geolocation permission denied")]
    PermissionDenied,
    #[error("position unavailable")]
    PositionUnavailable,
    #[error("geolocation request timed out")]
    Timeout,
    #[error("geolocation not supported")]
    Unsupported,
}

/// A directory or nearest-match request failed or returned unusable data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectoryError {
    #[error("directory request failed: {0}")]
    Transport(String),
    #[error("directory returned HTTP {0}")]
    Status(u16),
    #[error("directory reported: {0}")]
    Service(String),
    #[error("malformed directory response: {0}")]
    Malformed(String),
}

impl DirectoryError {
    pub(crate) fn transport(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemField {
    Category,
    Name,
    Quantity,
    Condition,
}

impl fmt::Display for ItemField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Category => "category",
            Self::Name => "name",
            Self::Quantity => "quantity",
            Self::Condition => "condition",
        })
    }
}

/// Field-scoped rejection of a cart candidate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("please select a category")]
    MissingCategory,
    #[error("unknown category '{0}'")]
    UnknownCategory(String),
    #[error("please enter an item name")]
    MissingName,
    #[error("quantity must be at least 1 (got {0})")]
    QuantityBelowOne(i64),
    #[error("quantity {0} is too large")]
    QuantityTooLarge(i64),
    #[error("please select a condition")]
    MissingCondition,
    #[error("unknown condition '{0}'")]
    UnknownCondition(String),
}

impl ValidationError {
    pub fn field(&self) -> ItemField {
        match self {
            Self::MissingCategory | Self::UnknownCategory(_) => ItemField::Category,
            Self::MissingName => ItemField::Name,
            Self::QuantityBelowOne(_) | Self::QuantityTooLarge(_) => ItemField::Quantity,
            Self::MissingCondition | Self::UnknownCondition(_) => ItemField::Condition,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    #[error("donation options are still loading")]
    CatalogNotReady,
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("no cart entry at position {index} (cart has {len})")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("cart entry {0} no longer exists")]
    UnknownEntry(u64),
}

/// One degraded field of incoming navigation state. Reported, never raised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandoffParseError {
    #[error("missing parameter '{0}'")]
    Missing(&'static str),
    #[error("parameter '{name}' is not a finite number: {value:?}")]
    InvalidNumber { name: &'static str, value: String },
    #[error("coordinate is incomplete; '{0}' given without its pair")]
    PartialCoordinate(&'static str),
    #[error("items payload is not a valid item list: {0}")]
    MalformedItems(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContinueError {
    #[error("no city with organizations has been resolved yet")]
    NotResolved,
    #[error("failed to encode donation items: {0}")]
    Encode(String),
}

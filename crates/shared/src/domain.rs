use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

macro_rules! name_newtype {
    ($name:ident) => {
        #[derive(
            Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn is_empty(&self) -> bool {
                self.0.trim().is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

name_newtype!(City);
name_newtype!(OrgId);

/// A WGS84 position. Both components are finite and always set together.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    lat: f64,
    lng: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lng: f64) -> Option<Self> {
        (lat.is_finite() && lng.is_finite()).then_some(Self { lat, lng })
    }

    /// For compile-time constants. Both components must be finite.
    pub const fn from_const(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lng(&self) -> f64 {
        self.lng
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}, {:.6}", self.lat, self.lng)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    #[default]
    Auto,
    Manual,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Volunteer {
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub phone: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub email: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub role: String,
}

/// Partner organization as served by the directory. Never mutated after fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    #[serde(rename = "ngo_id", default, deserialize_with = "lenient_org_id")]
    pub id: OrgId,
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub phone: String,
    #[serde(
        rename = "latitude",
        default,
        deserialize_with = "lenient_degrees",
        skip_serializing_if = "Option::is_none"
    )]
    pub lat: Option<f64>,
    #[serde(
        rename = "longitude",
        default,
        deserialize_with = "lenient_degrees",
        skip_serializing_if = "Option::is_none"
    )]
    pub lng: Option<f64>,
    #[serde(default, deserialize_with = "lenient_volunteer")]
    pub volunteer: Volunteer,
}

impl Organization {
    pub fn coordinate(&self) -> Option<Coordinate> {
        Coordinate::new(self.lat?, self.lng?)
    }
}

/// One validated cart line. Category and condition are catalog members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DonationItem {
    pub category: String,
    pub name: String,
    pub quantity: u32,
    pub condition: String,
}

fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(text)) => text,
        Some(Value::Number(number)) => number.to_string(),
        Some(Value::Bool(flag)) => flag.to_string(),
        _ => String::new(),
    })
}

fn lenient_org_id<'de, D>(deserializer: D) -> Result<OrgId, D::Error>
where
    D: Deserializer<'de>,
{
    lenient_text(deserializer).map(OrgId)
}

// Directory data carries coordinates both as numbers and as numeric strings.
fn lenient_degrees<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let degrees = match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(number)) => number.as_f64(),
        Some(Value::String(text)) => text.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(degrees.filter(|value| value.is_finite()))
}

fn lenient_volunteer<'de, D>(deserializer: D) -> Result<Volunteer, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Volunteer>::deserialize(deserializer)?.unwrap_or_default())
}

//! Client core of the donation flow: locating the donor, listing partner organizations,
//! building a donation cart and handing everything to the next page.

pub mod banner;
pub mod cart;
pub mod config;
pub mod directory;
pub mod error;
pub mod geolocation;
pub mod handoff;
pub mod resolver;
pub mod session;
pub mod ui;

pub use cart::{CartBuilder, ItemCandidate, QuantityStepper};
pub use config::SessionSettings;
pub use directory::{DirectoryApi, DirectoryClient, HttpDirectoryApi};
pub use geolocation::{FixedPosition, GeolocationProvider, MissingGeolocation, PositionOptions};
pub use handoff::{ArrivalState, HandoffParams};
pub use resolver::{LocationResolver, Resolution, ResolutionOutcome, ResolverPhase};
pub use session::{DonationSession, ItemForm, SessionState};
pub use ui::{LocationView, MapWidget, MissingMap, UiAdapter};

#[cfg(test)]
#[path = "tests/support.rs"]
pub(crate) mod test_support;

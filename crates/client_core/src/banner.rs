//! Single-slot advisory banner with auto-dismiss.

use std::{sync::Arc, time::Duration};

use tokio::{sync::Mutex, time::sleep};
use tracing::debug;

use crate::ui::UiAdapter;

pub const DEFAULT_BANNER_DISMISS: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BannerId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    pub id: BannerId,
    pub kind: BannerKind,
    pub message: String,
}

#[derive(Default)]
struct SlotState {
    next_id: u64,
    current: Option<Banner>,
}

/// Showing a banner replaces the current one. Each banner's dismiss timer only clears
/// the slot while that same banner is still shown.
#[derive(Clone)]
pub struct BannerSlot {
    ui: Arc<dyn UiAdapter>,
    dismiss_after: Duration,
    state: Arc<Mutex<SlotState>>,
}

impl BannerSlot {
    pub fn new(ui: Arc<dyn UiAdapter>, dismiss_after: Duration) -> Self {
        Self {
            ui,
            dismiss_after,
            state: Arc::new(Mutex::new(SlotState::default())),
        }
    }

    pub async fn current(&self) -> Option<Banner> {
        self.state.lock().await.current.clone()
    }

    pub async fn success(&self, message: impl Into<String>) -> BannerId {
        self.show(BannerKind::Success, message.into()).await
    }

    pub async fn error(&self, message: impl Into<String>) -> BannerId {
        self.show(BannerKind::Error, message.into()).await
    }

    async fn show(&self, kind: BannerKind, message: String) -> BannerId {
        let banner = {
            let mut state = self.state.lock().await;
            state.next_id += 1;
            let banner = Banner {
                id: BannerId(state.next_id),
                kind,
                message,
            };
            if let Some(previous) = state.current.replace(banner.clone()) {
                debug!(replaced = previous.id.0, "banner replaced");
            }
            self.ui.show_banner(&banner);
            banner
        };

        let slot = self.clone();
        let id = banner.id;
        tokio::spawn(async move {
            sleep(slot.dismiss_after).await;
            slot.dismiss(id).await;
        });
        id
    }

    /// Clears the slot if `id` is still the banner on display.
    pub async fn dismiss(&self, id: BannerId) -> bool {
        let mut state = self.state.lock().await;
        if state.current.as_ref().map(|banner| banner.id) != Some(id) {
            return false;
        }
        state.current = None;
        self.ui.clear_banner(id);
        true
    }
}

#[cfg(test)]
#[path = "tests/banner_tests.rs"]
mod tests;

//! Consent manager: the public API the page layer calls from UI events.
//!
//! Every consent-changing operation runs in the same order: persist, sync
//! the consent-mode adapter, update UI visibility, then log the action.

use std::sync::Arc;

use chrono::Duration;
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use mowforce_core::ConsentConfig;

use crate::adapter::ConsentModeAdapter;
use crate::clock::{Clock, SystemClock};
use crate::state_machine::ConsentStateMachine;
use crate::store::{ConsentStore, MemoryStorage};
use crate::types::*;
use crate::ui::{NoopUi, UiHooks};

pub const ACTION_ACCEPT_ALL: &str = "accept_all";
pub const ACTION_DECLINE_ALL: &str = "decline_all";
pub const ACTION_CUSTOM_SETTINGS: &str = "custom_settings";

struct ManagerState {
    record: Option<ConsentRecord>,
    visibility: VisibilityState,
}

/// Orchestrates store, state machine, adapter and UI hooks for one page session.
pub struct ConsentManager {
    store: ConsentStore,
    adapter: ConsentModeAdapter,
    machine: ConsentStateMachine,
    clock: Arc<dyn Clock>,
    ui: Arc<dyn UiHooks>,
    state: RwLock<ManagerState>,
}

impl ConsentManager {
    /// Create a manager over `store` with no sink and no UI wired.
    pub fn new(store: ConsentStore, config: &ConsentConfig) -> Self {
        Self {
            store,
            adapter: ConsentModeAdapter::noop(),
            machine: ConsentStateMachine::new(config.expiry_window()),
            clock: Arc::new(SystemClock),
            ui: Arc::new(NoopUi),
            state: RwLock::new(ManagerState {
                record: None,
                visibility: VisibilityState::default(),
            }),
        }
    }

    /// Manager over a fresh in-memory store with default config.
    pub fn in_memory() -> Self {
        Self::new(
            ConsentStore::new(Arc::new(MemoryStorage::new())),
            &ConsentConfig::default(),
        )
    }

    pub fn with_adapter(mut self, adapter: ConsentModeAdapter) -> Self {
        self.adapter = adapter;
        self
    }

    pub fn with_ui(mut self, ui: Arc<dyn UiHooks>) -> Self {
        self.ui = ui;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Override the configured expiry window.
    pub fn with_expiry_window(mut self, window: Duration) -> Self {
        self.machine = ConsentStateMachine::new(window);
        self
    }

    // ---------------------------------------------------------------
    // Lifecycle
    // ---------------------------------------------------------------

    /// Deny by default, restore the stored decision and reflect it in the UI and sink.
    pub fn initialize(&self) {
        info!("Consent manager initializing");
        self.adapter.set_default_denied();

        let stored = self.store.read();
        let decision = self.machine.decide(stored.as_ref(), self.clock.now());
        if stored.is_some() && decision.effective_record.is_none() {
            info!("Stored consent expired, visitor is undecided");
        }

        {
            let mut state = self.state.write();
            state.record = decision.effective_record.clone();
            state.visibility.banner = decision.banner;
        }

        match decision.banner {
            BannerVisibility::Visible => self.ui.show_banner(),
            BannerVisibility::Hidden => self.ui.hide_banner(),
        }

        if let Some(record) = &decision.effective_record {
            self.adapter.update(record.analytics, record.advertising);
        }

        info!(
            "Consent manager ready: banner={:?}, analytics={}, advertising={}",
            decision.banner,
            decision.effective_record.as_ref().is_some_and(|r| r.analytics),
            decision.effective_record.as_ref().is_some_and(|r| r.advertising),
        );
    }

    // ---------------------------------------------------------------
    // Decisions
    // ---------------------------------------------------------------

    pub fn accept_all(&self) -> ConsentRecord {
        self.record_decision(true, true, false, ACTION_ACCEPT_ALL, serde_json::json!({}))
    }

    pub fn decline_all(&self) -> ConsentRecord {
        self.record_decision(false, false, false, ACTION_DECLINE_ALL, serde_json::json!({}))
    }

    /// Save the modal's choices, then close the modal.
    pub fn save_custom_settings(&self, analytics: bool, advertising: bool) -> ConsentRecord {
        self.record_decision(
            analytics,
            advertising,
            true,
            ACTION_CUSTOM_SETTINGS,
            serde_json::json!({ "analytics": analytics, "advertising": advertising }),
        )
    }

    fn record_decision(
        &self,
        analytics: bool,
        advertising: bool,
        close_modal: bool,
        action: &str,
        payload: serde_json::Value,
    ) -> ConsentRecord {
        let record = ConsentRecord::new(analytics, advertising, self.clock.now());

        let persisted = match self.store.write(&record) {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to persist consent ({}): {}", action, e);
                false
            }
        };

        self.adapter.update(analytics, advertising);

        {
            let mut state = self.state.write();
            state.record = Some(record.clone());
            state.visibility.banner = BannerVisibility::Hidden;
            if close_modal {
                state.visibility.modal = ModalVisibility::Closed;
            }
        }
        self.ui.hide_banner();
        if close_modal {
            self.ui.close_modal();
        }

        info!(
            "Consent updated: action={}, analytics={}, advertising={}",
            action, analytics, advertising
        );
        self.log_action(&record, persisted, action, payload);
        record
    }

    /// Send the action to analytics, but only if `record` reached the store and grants analytics.
    fn log_action(
        &self,
        record: &ConsentRecord,
        persisted: bool,
        action: &str,
        payload: serde_json::Value,
    ) {
        let analytics_granted =
            persisted && record.analytics && self.store.read().as_ref() == Some(record);
        if !analytics_granted {
            debug!("Skipping consent action log for {}: analytics not granted", action);
            return;
        }
        self.adapter.log_event(action, payload);
    }

    // ---------------------------------------------------------------
    // Settings modal
    // ---------------------------------------------------------------

    pub fn open_settings(&self) {
        self.state.write().visibility.modal = ModalVisibility::Open;
        self.ui.open_modal();
    }

    pub fn close_settings(&self) {
        self.state.write().visibility.modal = ModalVisibility::Closed;
        self.ui.close_modal();
    }

    // ---------------------------------------------------------------
    // Status & diagnostics
    // ---------------------------------------------------------------

    pub fn get_status(&self) -> ConsentStatus {
        ConsentStatus::from(self.state.read().record.as_ref())
    }

    pub fn record(&self) -> Option<ConsentRecord> {
        self.state.read().record.clone()
    }

    pub fn visibility(&self) -> VisibilityState {
        self.state.read().visibility
    }

    pub fn expiry_window(&self) -> Duration {
        self.machine.expiry_window()
    }

    /// Forget the stored decision and reload the page.
    pub fn reset(&self) {
        if let Err(e) = self.store.clear() {
            warn!("Failed to clear stored consent: {}", e);
        }
        {
            let mut state = self.state.write();
            state.record = None;
            state.visibility = VisibilityState {
                banner: BannerVisibility::Visible,
                modal: ModalVisibility::Closed,
            };
        }
        info!("Consent reset, reloading page");
        self.ui.reload_page();
    }

    /// Show the banner without touching the stored decision.
    pub fn force_show_banner(&self) {
        info!("Force showing consent banner");
        self.state.write().visibility.banner = BannerVisibility::Visible;
        self.ui.show_banner();
    }
}

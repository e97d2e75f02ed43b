//! Consent Mode adapter: relays consent flags to the tag-manager signal sink.
//!
//! The sink is optional. Without one every call is a silent no-op, the same
//! as a page where the tag script never loaded.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Per-signal grant state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalState {
    Granted,
    Denied,
}

impl From<bool> for SignalState {
    fn from(granted: bool) -> Self {
        if granted {
            Self::Granted
        } else {
            Self::Denied
        }
    }
}

/// Consent command sent to the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsentCommand {
    Default,
    Update,
}

/// Consent Mode signal payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentModeState {
    pub analytics_storage: SignalState,
    pub ad_storage: SignalState,
    pub ad_user_data: SignalState,
    pub ad_personalization: SignalState,
}

impl ConsentModeState {
    /// Map internal flags onto the four signals.
    pub fn from_flags(analytics: bool, advertising: bool) -> Self {
        let ads = SignalState::from(advertising);
        Self {
            analytics_storage: SignalState::from(analytics),
            ad_storage: ads,
            ad_user_data: ads,
            ad_personalization: ads,
        }
    }

    pub fn all_denied() -> Self {
        Self::from_flags(false, false)
    }
}

/// Parameters of an analytics event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventParams {
    pub event_category: String,
    pub event_label: String,
    pub custom_parameters: serde_json::Value,
}

/// External consent-signal API (e.g. `gtag`).
pub trait SignalSink: Send + Sync {
    fn consent(&self, command: ConsentCommand, state: &ConsentModeState);
    fn event(&self, name: &str, params: &EventParams);
}

/// Event name used for consent action logging.
pub const CONSENT_ACTION_EVENT: &str = "consent_action";
const CONSENT_EVENT_CATEGORY: &str = "privacy";

/// Translates consent flags into sink calls.
#[derive(Clone, Default)]
pub struct ConsentModeAdapter {
    sink: Option<Arc<dyn SignalSink>>,
}

impl ConsentModeAdapter {
    pub fn new(sink: Arc<dyn SignalSink>) -> Self {
        Self { sink: Some(sink) }
    }

    /// Adapter with no sink; every call is dropped.
    pub fn noop() -> Self {
        Self { sink: None }
    }

    pub fn is_connected(&self) -> bool {
        self.sink.is_some()
    }

    /// Deny everything until the visitor decides. Called once at startup.
    pub fn set_default_denied(&self) {
        if let Some(sink) = &self.sink {
            debug!("Consent mode default: all denied");
            sink.consent(ConsentCommand::Default, &ConsentModeState::all_denied());
        }
    }

    pub fn update(&self, analytics: bool, advertising: bool) {
        if let Some(sink) = &self.sink {
            debug!(
                "Consent mode update: analytics={}, advertising={}",
                analytics, advertising
            );
            sink.consent(
                ConsentCommand::Update,
                &ConsentModeState::from_flags(analytics, advertising),
            );
        }
    }

    /// Emit a `consent_action` event labelled with `action`.
    pub fn log_event(&self, action: &str, payload: serde_json::Value) {
        if let Some(sink) = &self.sink {
            sink.event(
                CONSENT_ACTION_EVENT,
                &EventParams {
                    event_category: CONSENT_EVENT_CATEGORY.to_string(),
                    event_label: action.to_string(),
                    custom_parameters: payload,
                },
            );
        }
    }
}

// ---------------------------------------------------------------
// Data layer sink
// ---------------------------------------------------------------

/// One recorded sink call.
#[derive(Debug, Clone, PartialEq)]
pub enum DataLayerEntry {
    Consent(ConsentCommand, ConsentModeState),
    Event(String, EventParams),
}

impl DataLayerEntry {
    /// Tag-manager array form, e.g. `["consent", "update", {...}]`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Consent(command, state) => serde_json::json!(["consent", command, state]),
            Self::Event(name, params) => serde_json::json!(["event", name, params]),
        }
    }
}

/// Sink that records every call in order, like a tag-manager `dataLayer`.
#[derive(Default)]
pub struct DataLayerSink {
    entries: Mutex<Vec<DataLayerEntry>>,
}

impl DataLayerSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<DataLayerEntry> {
        self.entries.lock().clone()
    }

    /// Only the consent commands, in order.
    pub fn consent_calls(&self) -> Vec<(ConsentCommand, ConsentModeState)> {
        self.entries
            .lock()
            .iter()
            .filter_map(|e| match e {
                DataLayerEntry::Consent(c, s) => Some((*c, *s)),
                DataLayerEntry::Event(..) => None,
            })
            .collect()
    }

    /// Only the events, in order.
    pub fn events(&self) -> Vec<(String, EventParams)> {
        self.entries
            .lock()
            .iter()
            .filter_map(|e| match e {
                DataLayerEntry::Event(n, p) => Some((n.clone(), p.clone())),
                DataLayerEntry::Consent(..) => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl SignalSink for DataLayerSink {
    fn consent(&self, command: ConsentCommand, state: &ConsentModeState) {
        self.entries.lock().push(DataLayerEntry::Consent(command, *state));
    }

    fn event(&self, name: &str, params: &EventParams) {
        self.entries
            .lock()
            .push(DataLayerEntry::Event(name.to_string(), params.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_mapping() {
        let state = ConsentModeState::from_flags(true, false);
        assert_eq!(state.analytics_storage, SignalState::Granted);
        assert_eq!(state.ad_storage, SignalState::Denied);
        assert_eq!(state.ad_user_data, SignalState::Denied);
        assert_eq!(state.ad_personalization, SignalState::Denied);

        let json = serde_json::to_value(ConsentModeState::from_flags(false, true)).unwrap();
        assert_eq!(json["analytics_storage"], "denied");
        assert_eq!(json["ad_storage"], "granted");
        assert_eq!(json["ad_user_data"], "granted");
        assert_eq!(json["ad_personalization"], "granted");
    }

    #[test]
    fn test_default_then_update() {
        let sink = Arc::new(DataLayerSink::new());
        let adapter = ConsentModeAdapter::new(sink.clone());

        adapter.set_default_denied();
        adapter.update(true, true);

        assert_eq!(
            sink.consent_calls(),
            vec![
                (ConsentCommand::Default, ConsentModeState::all_denied()),
                (ConsentCommand::Update, ConsentModeState::from_flags(true, true)),
            ]
        );
    }

    #[test]
    fn test_noop_adapter_drops_calls() {
        let adapter = ConsentModeAdapter::noop();
        assert!(!adapter.is_connected());
        adapter.set_default_denied();
        adapter.update(true, true);
        adapter.log_event("accept_all", serde_json::json!({}));
    }

    #[test]
    fn test_event_shape() {
        let sink = Arc::new(DataLayerSink::new());
        let adapter = ConsentModeAdapter::new(sink.clone());
        adapter.log_event(
            "custom_settings",
            serde_json::json!({ "analytics": true, "advertising": false }),
        );

        let entries = sink.entries();
        assert_eq!(entries.len(), 1);
        let json = entries[0].to_json();
        assert_eq!(json[0], "event");
        assert_eq!(json[1], "consent_action");
        assert_eq!(json[2]["event_category"], "privacy");
        assert_eq!(json[2]["event_label"], "custom_settings");
        assert_eq!(json[2]["custom_parameters"]["analytics"], true);
    }
}

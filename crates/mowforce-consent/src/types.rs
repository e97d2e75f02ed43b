//! Consent record and visibility types.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// A visitor's persisted consent decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsentRecord {
    /// Always `true`; essential storage cannot be refused.
    pub essential: bool,
    pub analytics: bool,
    pub advertising: bool,
    /// When the decision was last written.
    pub consented_at: DateTime<Utc>,
}

impl ConsentRecord {
    /// Build a record for a decision made at `consented_at`.
    pub fn new(analytics: bool, advertising: bool, consented_at: DateTime<Utc>) -> Self {
        Self {
            essential: true,
            analytics,
            advertising,
            consented_at,
        }
    }

    /// Whether any optional category was granted.
    pub fn grants_any(&self) -> bool {
        self.analytics || self.advertising
    }

    /// ISO-8601 form of `consented_at`, lossless so it parses back to the same instant.
    pub fn date_string(&self) -> String {
        self.consented_at.to_rfc3339_opts(SecondsFormat::AutoSi, true)
    }
}

/// Whether the consent banner is on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BannerVisibility {
    Hidden,
    Visible,
}

/// Whether the settings modal is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModalVisibility {
    Closed,
    Open,
}

/// Derived UI state; recomputed, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibilityState {
    pub banner: BannerVisibility,
    pub modal: ModalVisibility,
}

impl Default for VisibilityState {
    fn default() -> Self {
        Self {
            banner: BannerVisibility::Hidden,
            modal: ModalVisibility::Closed,
        }
    }
}

/// Public status shape handed to the UI layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsentStatus {
    pub essential: bool,
    pub analytics: bool,
    pub advertising: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

impl ConsentStatus {
    /// Status of a visitor with no decision in force.
    pub fn undecided() -> Self {
        Self {
            essential: false,
            analytics: false,
            advertising: false,
            date: None,
        }
    }
}

impl From<Option<&ConsentRecord>> for ConsentStatus {
    fn from(record: Option<&ConsentRecord>) -> Self {
        match record {
            Some(r) => Self {
                essential: r.essential,
                analytics: r.analytics,
                advertising: r.advertising,
                date: Some(r.date_string()),
            },
            None => Self::undecided(),
        }
    }
}

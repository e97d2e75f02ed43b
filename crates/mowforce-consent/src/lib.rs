//! Visitor consent: persistence, expiry, and Consent Mode signalling.
//!
//! Tracks analytics/advertising consent for a page session, persists it
//! across visits, re-prompts once a decision expires, and relays the flags
//! to a tag-manager consent sink. Markup and page wiring live outside this
//! crate and talk to it through [`ConsentManager`] and [`UiHooks`].

pub mod adapter;
pub mod clock;
pub mod manager;
pub mod state_machine;
pub mod store;
pub mod types;
pub mod ui;

pub use adapter::{ConsentModeAdapter, DataLayerEntry, DataLayerSink, SignalSink};
pub use clock::{Clock, ManualClock, SystemClock};
pub use manager::ConsentManager;
pub use state_machine::{decide, ConsentStateMachine, Decision};
pub use store::{ConsentStore, FileStorage, KeyValueStorage, MemoryStorage};
pub use types::*;
pub use ui::{NoopUi, UiHooks};

//! UI hooks supplied by the page layer.
//!
//! The consent core never touches markup. It calls these hooks instead;
//! any hook the host leaves unimplemented does nothing.

pub trait UiHooks: Send + Sync {
    fn show_banner(&self) {}
    fn hide_banner(&self) {}
    fn open_modal(&self) {}
    fn close_modal(&self) {}
    /// Reload the host page (used after a reset).
    fn reload_page(&self) {}
}

/// Host with no UI wired.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopUi;

impl UiHooks for NoopUi {}

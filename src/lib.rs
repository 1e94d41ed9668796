//! Server-side calendar view for an e-paper panel.
//!
//! The view mounts a page instance, fetches the events and battery
//! sources concurrently, and exposes a `data-ready` marker that an
//! external capture tool polls before taking a screenshot.

pub mod api;
pub mod battery;
pub mod config;
pub mod error;
pub mod grid;
pub mod locale;
pub mod occurrence;
pub mod readiness;
pub mod source;
pub mod state;
pub mod view;
pub mod zone;

//! Access-gated chat widget that relays messages to a webhook-backed assistant.
//!
//! - [`access`] - shared-secret gate, server allow-list and client flag
//! - [`relay`] - quota-limited webhook relay and the chat widget state machine
//! - [`markdown`] - rendering of assistant replies
//! - [`store`] - key-value persistence (file, memory, browser localStorage)
//! - [`server`] - the `/api/auth` HTTP endpoint
//! - [`ui`] / [`views`] - Dioxus front end (enabled by the `web`, `desktop` or `mobile` feature)

pub mod access;
pub mod config;
pub mod markdown;
pub mod relay;
#[cfg(not(target_arch = "wasm32"))]
pub mod server;
pub mod store;
pub mod types;

#[cfg(feature = "dioxus")]
pub mod ui;
#[cfg(feature = "dioxus")]
pub mod views;

//! Filtered list controller for the club admin lists.
//!
//! Filter edits are debounced, turned into a canonical query, fetched with
//! the session's bearer token, reduced into a page with pagination and stats,
//! and rendered. Row actions mutate through the same API.

pub mod actions;
pub mod api;
pub mod banner;
pub mod config;
pub mod controller;
pub mod debounce;
pub mod render;
pub mod session;

pub use actions::{ActionPhase, PendingAction};
pub use api::{CachedApi, HttpApi, ListApi, MutationMethod};
pub use banner::{Banner, BannerLevel};
pub use config::{ClientConfig, Environment};
pub use controller::{ListController, ListView, LoadOutcome, Phase};
pub use debounce::Debouncer;
pub use render::TableView;
pub use session::Session;

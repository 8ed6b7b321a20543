//! # Watchtower Dashboard
//!
//! The console's pages and the hooks that feed them.
//!
//! ## Architectural Principles
//!
//! - **Hooks own the wiring:** every query the console makes is declared once in
//!   [`Hooks`], binding its cache key, fetch call and polling interval.
//! - **Pages are views:** a page holds subscriptions and turns their snapshots
//!   into text. Rendering is pure given the snapshots and "now", so the tables
//!   can be tested without a terminal.
//! - **Inactive pages are paused:** the [`Dashboard`] keeps every page mounted
//!   but only the visible one polls.

pub mod app;
pub mod hooks;
pub mod pages;
pub mod view_state;
pub mod widgets;

pub use app::Dashboard;
pub use hooks::Hooks;
pub use pages::Page;
pub use view_state::ViewState;

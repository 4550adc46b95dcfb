//! Terminal console for the activities of a funding initiative.
//!
//! The core is two caches: a parent-scoped activity list that is mutated
//! locally after successful remote writes, and a single-flight permission
//! cache keyed by credential and entity. [`screen::ActivitiesScreen`]
//! sequences them; the `ui` module renders the result.

pub mod app;
pub mod cache;
pub mod config;
pub mod credentials;
pub mod event;
pub mod funds;
pub mod logging;
pub mod screen;
pub mod task;
pub mod ui;

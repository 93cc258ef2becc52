//! Application-level orchestration.
//!
//! This module owns the list lifecycle (initial load, status polling, reload) and the
//! dispatch of user actions. UI layers talk to it over channels to keep
//! responsibilities separated.

mod controller;

pub(crate) use controller::{run_controller, UiCommand, UiEvent};

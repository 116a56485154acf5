//! Flutter-facing bindings for the to-do list core.

pub mod api;

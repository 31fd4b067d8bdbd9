//! Flutter-facing bindings for the Tuneboxed core.

pub mod api;

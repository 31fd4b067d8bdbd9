//! Use-case services over the two backends.
//!
//! # Responsibility
//! - Fan writes out to both stores and fan reads back in.
//! - Keep UI/FFI callers decoupled from backend selection.

pub mod record_store;
pub mod session;

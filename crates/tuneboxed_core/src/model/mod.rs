//! Record shapes persisted by both backends.
//!
//! # Responsibility
//! - Define the two append-mostly fact kinds: signups and page views.
//! - Define the identity key each kind deduplicates on.
//!
//! # Invariants
//! - Records are created once and never mutated afterwards.
//! - Serialized field names match the persisted JSON layout (`createdAt`,
//!   `userAgent`).

pub mod page_view;
pub mod signup;

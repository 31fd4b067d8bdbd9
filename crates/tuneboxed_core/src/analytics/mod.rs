//! Operator-facing counting over already merged records.
//!
//! Only simple counts live here; no aggregation is persisted.

pub mod dashboard;

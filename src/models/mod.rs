//! Canonical data model shared by every adapter.

pub mod event;
pub mod payload;
pub mod permission;

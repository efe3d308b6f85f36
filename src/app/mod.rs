//! Core application modules.
//!
//! - [`inventory`] - Account inventory traversal, per-service collectors and the
//!   concurrent runner

pub mod inventory;

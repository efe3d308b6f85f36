//! Tracing macros that prefix each event with `[file:module:line]`.
//!
//! Example output:
//!   [src/app/inventory/inventory_client.rs:aws_inventory::app::inventory::inventory_client:131] Collecting 6 branches for account 123456789012
//!
//! Level guidelines used across the inventory:
//!
//! - DEBUG: isolated failures, per-listing progress, client construction
//! - INFO: branch start and finish, run summaries
//! - WARN: a branch skipped or stopped early
//! - ERROR: a run that produced nothing at all

#[macro_export]
macro_rules! trace_debug {
    ($($arg:tt)*) => {
        tracing::debug!("[{}:{}:{}] {}", file!(), module_path!(), line!(), format!($($arg)*));
    };
}

#[macro_export]
macro_rules! trace_info {
    ($($arg:tt)*) => {
        tracing::info!("[{}:{}:{}] {}", file!(), module_path!(), line!(), format!($($arg)*));
    };
}

#[macro_export]
macro_rules! trace_warn {
    ($($arg:tt)*) => {
        tracing::warn!("[{}:{}:{}] {}", file!(), module_path!(), line!(), format!($($arg)*));
    };
}

#[macro_export]
macro_rules! trace_error {
    ($($arg:tt)*) => {
        tracing::error!("[{}:{}:{}] {}", file!(), module_path!(), line!(), format!($($arg)*));
    };
}

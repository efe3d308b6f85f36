//! AWS account inventory
//!
//! Walks the resources of one AWS account across regions and services and produces a
//! flat list of normalized resource records. Every record carries the same shape no
//! matter which service it came from: service, type, id, ARN, name, region, a details
//! object and a flat string-to-string tag map.
//!
//! # Architecture Overview
//!
//! - **Collectors** ([`app::inventory::collectors`]): declarative per-service tables of
//!   listings, detail fetches, tag sources and child resource types
//! - **Engine** ([`app::inventory::collector::HierarchicalCollector`]): paginated walks,
//!   enrichment and recursion into child types for one service/region branch
//! - **Isolation** ([`app::inventory::isolation`]): every AWS call runs behind a guard that
//!   converts errors into fallbacks and records why
//! - **Runner** ([`app::inventory::InventoryClient`]): fans branches out over regions under a
//!   shared request limit, with per-branch deadlines and cancellation
//!
//! ## Partial failure
//!
//! A run never fails because one call failed. A missing permission on a tag call yields an
//! empty tag map; a failed first listing page drops that resource type for the branch; a
//! failed required detail drops the single item. All of it lands in
//! [`app::inventory::Collection::failures`].
//!
//! # Getting Started
//!
//! ```no_run
//! use std::sync::Arc;
//! use aws_inventory::app::inventory::{InventoryClient, InventoryConfig, SessionCoordinator};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let sessions = Arc::new(SessionCoordinator::from_environment().await);
//! let account_id = sessions.resolve_account_id().await?;
//! let client = InventoryClient::new(sessions, InventoryConfig::load()?);
//! let collection = client.collect(&account_id).await;
//! println!("{} records", collection.records.len());
//! # Ok(())
//! # }
//! ```

#![warn(clippy::all, rust_2018_idioms)]

// Include logging macros first
#[macro_use]
pub mod logging_macros;

pub mod app;

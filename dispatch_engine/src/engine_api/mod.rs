//! # Dispatch engine public API
//!
//! * [`order_flow_api`] places orders and moves them through their lifecycle. Reaching `ready` hands the order to
//!   the dispatcher.
//! * [`rider_dispatch_api`] matches ready orders with nearby riders, handles claims and hand-backs, and keeps rider
//!   availability and location in step between the store and the geo index.
//!
//! The other submodules hold the pure rules the APIs are built on: the [`state_machine`], the [`fees`] calculator and
//! the [`platform_config`].
//!
//! # API usage
//!
//! Both APIs are created from a storage backend, a geo index, the event producers that hooks subscribe through, and
//! the platform configuration:
//!
//! ```rust,ignore
//! use dispatch_engine::{InMemoryGeoIndex, OrderFlowApi, PlatformConfig, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url("sqlite://data/dispatch.db", 25).await?;
//! let api = OrderFlowApi::new(db, InMemoryGeoIndex::new(), producers, PlatformConfig::from_env_or_default());
//! let order = api.transition(&Actor::Vendor(3), order_id, OrderStatusType::Confirmed, None).await?;
//! ```
pub mod errors;
pub mod fees;
mod notifier;
pub mod order_flow_api;
pub mod order_objects;
pub mod platform_config;
pub mod rider_dispatch_api;
pub mod state_machine;

//! Dispatch Engine
//!
//! The core of a campus food delivery service: the order lifecycle state machine, the fee calculator, and geo-aware
//! rider dispatch.
//!
//! The library is divided into three main sections:
//! 1. Storage and spatial backends ([`mod@traits`], with a SQLite store and an in-memory geo index). Every write that
//!    can race is a conditional update, so concurrent requests never both succeed from the same prior state.
//! 2. The engine public API ([`mod@engine_api`]), which enforces the lifecycle rules, prices orders and dispatches
//!    riders.
//! 3. Events ([`mod@events`]). Status changes, rider assignments and user-facing notifications are published to
//!    hooks after the database work has committed.
mod db;

pub mod db_types;
pub mod engine_api;
pub mod events;
pub mod geo;
pub mod helpers;
pub mod traits;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

#[cfg(feature = "sqlite")]
pub use db::sqlite::{self as sqlite, SqliteDatabase};
pub use engine_api::{
    errors::{ErrorKind, OrderFlowError},
    order_flow_api::OrderFlowApi,
    order_objects,
    platform_config::PlatformConfig,
    rider_dispatch_api::RiderDispatchApi,
};
pub use geo::InMemoryGeoIndex;
pub use traits::{DeliveryDatabase, DeliveryDatabaseError, GeoIndex, GeoIndexError, OrderManagement};

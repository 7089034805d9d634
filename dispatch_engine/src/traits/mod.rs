//! # Backend contracts.
//!
//! This module defines the interfaces that storage and spatial backends must provide for the dispatch engine.
//!
//! * [`OrderManagement`] provides read access to orders and the parties involved in them (vendors, students,
//!   riders and menu items).
//! * [`DeliveryDatabase`] defines the atomic write flows of the engine: order creation, guarded status changes,
//!   rider claims and releases, rider availability and location, and reviews. Every write that can race is expressed
//!   as a conditional update, so backends never need to trust a value read before the write.
//! * [`GeoIndex`] is the spatial index of available riders. Index membership and the availability flag are always
//!   changed together, in one call.
mod data_objects;
mod delivery_database;
mod geo_index;
mod order_management;

pub use data_objects::{
    AssignmentMode,
    AvailabilityChange,
    ClaimOutcome,
    NearbyRider,
    ReleaseOutcome,
    StatusChange,
    StatusChangeOutcome,
};
pub use delivery_database::{DeliveryDatabase, DeliveryDatabaseError};
pub use geo_index::{GeoIndex, GeoIndexError};
pub use order_management::OrderManagement;

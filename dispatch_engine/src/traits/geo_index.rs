use std::time::Duration;

use thiserror::Error;

use crate::{
    db_types::{Coordinates, Order},
    traits::data_objects::NearbyRider,
};

/// A spatial index of available riders, plus a short-lived cache of active orders.
///
/// Membership in the spatial index and the availability flag are two views of the same fact, so they only ever change
/// together: [`GeoIndex::mark_available`] adds the rider and raises the flag, [`GeoIndex::mark_unavailable`] removes
/// the rider and lowers it.
#[allow(async_fn_in_trait)]
pub trait GeoIndex: Clone {
    /// Upserts the rider's position and sets its availability flag.
    async fn mark_available(&self, rider_id: i64, location: Coordinates) -> Result<(), GeoIndexError>;

    /// Removes the rider from the spatial index and clears its availability flag.
    async fn mark_unavailable(&self, rider_id: i64) -> Result<(), GeoIndexError>;

    /// Moves the rider in the spatial index, but only while its availability flag is set.
    ///
    /// Returns whether the index was updated.
    async fn refresh_location(&self, rider_id: i64, location: Coordinates) -> Result<bool, GeoIndexError>;

    async fn is_available(&self, rider_id: i64) -> Result<bool, GeoIndexError>;

    /// Riders within `radius_km` of `centre`, nearest first, at most `limit` of them.
    async fn nearest(
        &self,
        centre: Coordinates,
        radius_km: f64,
        limit: usize,
    ) -> Result<Vec<NearbyRider>, GeoIndexError>;

    async fn cache_active_order(&self, order: &Order, ttl: Duration) -> Result<(), GeoIndexError>;

    async fn active_order(&self, order_id: i64) -> Result<Option<Order>, GeoIndexError>;

    async fn evict_active_order(&self, order_id: i64) -> Result<(), GeoIndexError>;
}

#[derive(Debug, Clone, Error)]
pub enum GeoIndexError {
    #[error("The geo index is unavailable. {0}")]
    Unavailable(String),
    #[error("Invalid coordinates for rider #{0}")]
    InvalidCoordinates(i64),
}

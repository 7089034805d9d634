use std::{
    collections::HashMap,
    fmt::Debug,
    sync::Arc,
    time::{Duration, Instant},
};

use log::*;
use tokio::sync::RwLock;

use crate::{
    db_types::{Coordinates, Order},
    helpers::haversine_km,
    traits::{GeoIndex, GeoIndexError, NearbyRider},
};

#[derive(Default)]
struct IndexState {
    locations: HashMap<i64, Coordinates>,
    available: HashMap<i64, bool>,
    active_orders: HashMap<i64, (Order, Instant)>,
}

/// A process-local [`GeoIndex`]. Clones share the same state.
///
/// All reads and writes go through a single lock, so membership and the availability flag can never be observed out
/// of step with each other.
#[derive(Clone, Default)]
pub struct InMemoryGeoIndex {
    state: Arc<RwLock<IndexState>>,
}

impl Debug for InMemoryGeoIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "InMemoryGeoIndex")
    }
}

impl InMemoryGeoIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of riders currently in the spatial index.
    pub async fn len(&self) -> usize {
        self.state.read().await.locations.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Whether the rider is present in the spatial index.
    pub async fn contains(&self, rider_id: i64) -> bool {
        self.state.read().await.locations.contains_key(&rider_id)
    }
}

impl GeoIndex for InMemoryGeoIndex {
    async fn mark_available(&self, rider_id: i64, location: Coordinates) -> Result<(), GeoIndexError> {
        if !location.is_valid() {
            return Err(GeoIndexError::InvalidCoordinates(rider_id));
        }
        let mut state = self.state.write().await;
        state.locations.insert(rider_id, location);
        state.available.insert(rider_id, true);
        trace!("📍️ Rider #{rider_id} is available at {location}");
        Ok(())
    }

    async fn mark_unavailable(&self, rider_id: i64) -> Result<(), GeoIndexError> {
        let mut state = self.state.write().await;
        state.locations.remove(&rider_id);
        state.available.insert(rider_id, false);
        trace!("📍️ Rider #{rider_id} removed from the index");
        Ok(())
    }

    async fn refresh_location(&self, rider_id: i64, location: Coordinates) -> Result<bool, GeoIndexError> {
        if !location.is_valid() {
            return Err(GeoIndexError::InvalidCoordinates(rider_id));
        }
        let mut state = self.state.write().await;
        if !state.available.get(&rider_id).copied().unwrap_or(false) {
            return Ok(false);
        }
        state.locations.insert(rider_id, location);
        Ok(true)
    }

    async fn is_available(&self, rider_id: i64) -> Result<bool, GeoIndexError> {
        Ok(self.state.read().await.available.get(&rider_id).copied().unwrap_or(false))
    }

    async fn nearest(
        &self,
        centre: Coordinates,
        radius_km: f64,
        limit: usize,
    ) -> Result<Vec<NearbyRider>, GeoIndexError> {
        let state = self.state.read().await;
        let mut riders = state
            .locations
            .iter()
            .map(|(&rider_id, &location)| NearbyRider { rider_id, distance_km: haversine_km(centre, location) })
            .filter(|r| r.distance_km <= radius_km)
            .collect::<Vec<_>>();
        riders.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km).then(a.rider_id.cmp(&b.rider_id)));
        riders.truncate(limit);
        Ok(riders)
    }

    async fn cache_active_order(&self, order: &Order, ttl: Duration) -> Result<(), GeoIndexError> {
        let expires = Instant::now() + ttl;
        self.state.write().await.active_orders.insert(order.id, (order.clone(), expires));
        Ok(())
    }

    async fn active_order(&self, order_id: i64) -> Result<Option<Order>, GeoIndexError> {
        let mut state = self.state.write().await;
        let expired = match state.active_orders.get(&order_id) {
            Some((order, expires)) if *expires > Instant::now() => return Ok(Some(order.clone())),
            Some(_) => true,
            None => false,
        };
        if expired {
            state.active_orders.remove(&order_id);
        }
        Ok(None)
    }

    async fn evict_active_order(&self, order_id: i64) -> Result<(), GeoIndexError> {
        self.state.write().await.active_orders.remove(&order_id);
        Ok(())
    }
}

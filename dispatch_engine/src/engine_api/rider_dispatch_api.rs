use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{Coordinates, Order, OrderStatusType, Rider},
    engine_api::{
        errors::OrderFlowError,
        notifier::Notifier,
        order_objects::{Actor, OrderQueryFilter},
        platform_config::PlatformConfig,
    },
    events::EventProducers,
    traits::{AssignmentMode, AvailabilityChange, ClaimOutcome, DeliveryDatabase, GeoIndex, ReleaseOutcome},
};

/// `RiderDispatchApi` matches ready orders with riders and looks after rider availability and location.
///
/// The store is the source of truth for who holds which order. The geo index mirrors the store's availability flag
/// and is brought back in line after every change this API makes.
pub struct RiderDispatchApi<B, G> {
    db: B,
    geo: G,
    notifier: Notifier,
    config: PlatformConfig,
}

impl<B, G> Debug for RiderDispatchApi<B, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RiderDispatchApi")
    }
}

impl<B: Clone, G: Clone> Clone for RiderDispatchApi<B, G> {
    fn clone(&self) -> Self {
        Self { db: self.db.clone(), geo: self.geo.clone(), notifier: self.notifier.clone(), config: self.config.clone() }
    }
}

impl<B, G> RiderDispatchApi<B, G> {
    pub fn new(db: B, geo: G, producers: EventProducers, config: PlatformConfig) -> Self {
        Self { db, geo, notifier: Notifier::new(producers), config }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn geo(&self) -> &G {
        &self.geo
    }
}

impl<B, G> RiderDispatchApi<B, G>
where
    B: DeliveryDatabase,
    G: GeoIndex,
{
    /// Assigns the nearest available rider to a ready, unassigned order.
    ///
    /// Candidates come from the geo index, nearest first, within the configured radius. Each candidate's availability
    /// flag is checked again just before the claim, and a lost claim moves on to the next candidate.
    ///
    /// Returns the id of the assigned rider, or [`OrderFlowError::NoRiderAvailable`].
    pub async fn auto_assign(&self, order: &Order) -> Result<i64, OrderFlowError> {
        self.auto_assign_excluding(order, None).await
    }

    async fn auto_assign_excluding(&self, order: &Order, excluded: Option<i64>) -> Result<i64, OrderFlowError> {
        if order.status != OrderStatusType::Ready {
            return Err(OrderFlowError::NotReady(order.status));
        }
        if order.assigned_rider_id.is_some() {
            return Err(OrderFlowError::AlreadyAssigned(order.id));
        }
        let centre = order.delivery_point();
        let candidates = self.geo.nearest(centre, self.config.search_radius_km, self.config.max_candidates).await?;
        debug!("🛵️ {} candidate riders within {} km of order #{}", candidates.len(), self.config.search_radius_km, order.id);
        for candidate in candidates.into_iter().filter(|c| Some(c.rider_id) != excluded) {
            let rider_id = candidate.rider_id;
            if !self.geo.is_available(rider_id).await? {
                trace!("🛵️ Rider #{rider_id} went unavailable before it could be offered order #{}", order.id);
                continue;
            }
            match self.db.claim_order(order.id, rider_id, AssignmentMode::PreAssign).await? {
                ClaimOutcome::Claimed { order, rider } => {
                    info!("🛵️ Rider #{rider_id} ({:.2} km away) assigned to order #{}", candidate.distance_km, order.id);
                    self.after_claim(&order, &rider, true).await;
                    return Ok(rider_id);
                },
                ClaimOutcome::RiderUnavailable | ClaimOutcome::RiderNotFound => {
                    debug!("🛵️ Rider #{rider_id} is no longer available. Trying the next candidate.");
                    self.forget_rider(rider_id).await;
                },
                ClaimOutcome::AlreadyAssigned(_) => return Err(OrderFlowError::AlreadyAssigned(order.id)),
                ClaimOutcome::NotReady(status) => return Err(OrderFlowError::NotReady(status)),
                ClaimOutcome::OrderNotFound => return Err(OrderFlowError::order_not_found(order.id)),
            }
        }
        Err(OrderFlowError::NoRiderAvailable(order.id))
    }

    /// Runs auto-assignment and alerts the admin channel if no rider could be found. Never fails.
    ///
    /// An order that was claimed, moved on or removed while dispatch was running needs no rider, so no alert is sent.
    pub async fn dispatch_or_escalate(&self, order: &Order) -> Option<i64> {
        match self.auto_assign(order).await {
            Ok(rider_id) => Some(rider_id),
            Err(e) if !needs_admin(&e) => {
                debug!("🛵️ Order #{} no longer needs a rider. {e}", order.id);
                None
            },
            Err(e) => {
                warn!("🛵️ Could not auto-assign order #{}. {e}", order.id);
                self.notifier.manual_assignment_required(order, "is ready but no rider could be auto-assigned").await;
                None
            },
        }
    }

    /// A rider takes an unassigned, ready order. Exactly one of any number of concurrent claims succeeds; the others
    /// get [`OrderFlowError::AlreadyAssigned`].
    pub async fn claim_order(&self, rider_id: i64, order_id: i64) -> Result<Order, OrderFlowError> {
        let outcome = self.db.claim_order(order_id, rider_id, AssignmentMode::PreAssign).await?;
        let (order, rider) = self.claimed(outcome, order_id, rider_id).await?;
        info!("🛵️ Rider #{rider_id} claimed order #{order_id}");
        self.after_claim(&order, &rider, false).await;
        Ok(order)
    }

    /// An admin attaches a rider by hand. Ready orders keep their status. Pending orders are confirmed in the same
    /// write.
    pub async fn admin_assign_rider(&self, actor: &Actor, order_id: i64, rider_id: i64) -> Result<Order, OrderFlowError> {
        if !matches!(actor, Actor::Admin(_)) {
            return Err(OrderFlowError::AuthorizationError(format!("{actor} may not assign riders")));
        }
        let order = self.db.fetch_order(order_id).await?.ok_or_else(|| OrderFlowError::order_not_found(order_id))?;
        let mode = match order.status {
            OrderStatusType::Ready => AssignmentMode::PreAssign,
            OrderStatusType::Pending => AssignmentMode::ConfirmOnAssign,
            status => return Err(OrderFlowError::NotReady(status)),
        };
        let outcome = self.db.claim_order(order_id, rider_id, mode).await?;
        let (updated, rider) = self.claimed(outcome, order_id, rider_id).await?;
        info!("🛵️ {actor} assigned rider #{rider_id} to order #{order_id}");
        self.after_claim(&updated, &rider, false).await;
        if updated.status != order.status {
            self.notifier.status_changed(&updated, order.status).await;
        }
        Ok(updated)
    }

    /// The assigned rider hands an order back before picking it up.
    ///
    /// The rider becomes available again and, if the order is ready, one more auto-assignment is attempted without
    /// that rider. If the retry fails the admins are alerted. Orders that are not ready yet are dispatched when they
    /// become ready.
    ///
    /// Returns the id of the replacement rider, if one was found.
    pub async fn handle_rejection(&self, rider_id: i64, order_id: i64) -> Result<Option<i64>, OrderFlowError> {
        let order = self.db.fetch_order(order_id).await?.ok_or_else(|| OrderFlowError::order_not_found(order_id))?;
        if order.assigned_rider_id != Some(rider_id) {
            return Err(OrderFlowError::AuthorizationError(format!(
                "Order #{order_id} is not assigned to rider #{rider_id}"
            )));
        }
        if matches!(order.status, OrderStatusType::PickedUp) || order.status.is_terminal() {
            return Err(OrderFlowError::ValidationError(format!(
                "Order #{order_id} is {} and can no longer be handed back",
                order.status
            )));
        }
        let (order, rider) = match self.db.release_assignment(order_id, rider_id).await? {
            ReleaseOutcome::Released { order, rider } => (order, rider),
            ReleaseOutcome::OrderNotFound => return Err(OrderFlowError::order_not_found(order_id)),
            ReleaseOutcome::NotAssigned => {
                return Err(OrderFlowError::Conflict(format!("Order #{order_id} changed while it was being handed back")))
            },
        };
        info!("🛵️ Rider #{rider_id} handed back order #{order_id}");
        self.sync_rider(&rider).await;
        self.evict(order_id).await;
        if order.status != OrderStatusType::Ready {
            debug!("🛵️ Order #{order_id} is {}. It will be dispatched once it is ready.", order.status);
            return Ok(None);
        }
        match self.auto_assign_excluding(&order, Some(rider_id)).await {
            Ok(replacement) => Ok(Some(replacement)),
            Err(e) if !needs_admin(&e) => {
                debug!("🛵️ Order #{order_id} no longer needs a rider. {e}");
                Ok(None)
            },
            Err(e) => {
                warn!("🛵️ Retry after rejection of order #{order_id} failed. {e}");
                self.notifier.manual_assignment_required(&order, "has been rejected by riders").await;
                Ok(None)
            },
        }
    }

    /// Stores the rider's position. The geo index is only moved while the rider is available.
    pub async fn update_location(&self, rider_id: i64, location: Coordinates) -> Result<Rider, OrderFlowError> {
        if !location.is_valid() {
            return Err(OrderFlowError::ValidationError(format!("{location} are not valid coordinates")));
        }
        let rider = self
            .db
            .update_rider_location(rider_id, location)
            .await?
            .ok_or_else(|| OrderFlowError::rider_not_found(rider_id))?;
        trace!("📍️ Rider #{rider_id} is at {location}");
        if rider.is_available {
            match self.geo.refresh_location(rider_id, location).await {
                Ok(true) => {},
                // Available riders without a known position are indexed on their first update.
                Ok(false) => self.sync_rider(&rider).await,
                Err(e) => warn!("📍️ Could not move rider #{rider_id} in the geo index. {e}"),
            }
        }
        Ok(rider)
    }

    pub async fn set_availability(&self, rider_id: i64, available: bool) -> Result<Rider, OrderFlowError> {
        let change = self.db.set_rider_availability(rider_id, available).await?;
        self.availability_result(rider_id, change).await
    }

    pub async fn toggle_availability(&self, rider_id: i64) -> Result<Rider, OrderFlowError> {
        let change = self.db.toggle_rider_availability(rider_id).await?;
        self.availability_result(rider_id, change).await
    }

    /// Ready orders that nobody has taken yet, newest first. Pages start at 1.
    pub async fn available_orders(
        &self,
        rider_id: i64,
        page: Option<i64>,
        limit: Option<i64>,
    ) -> Result<Vec<Order>, OrderFlowError> {
        self.db.fetch_rider(rider_id).await?.ok_or_else(|| OrderFlowError::rider_not_found(rider_id))?;
        let query =
            OrderQueryFilter::default().with_status(OrderStatusType::Ready).unassigned().with_page_number(page, limit)?;
        Ok(self.db.search_orders(query).await?)
    }

    pub async fn rider_orders(
        &self,
        rider_id: i64,
        status: Option<OrderStatusType>,
    ) -> Result<Vec<Order>, OrderFlowError> {
        let mut query = OrderQueryFilter::default().with_rider_id(rider_id);
        if let Some(status) = status {
            query = query.with_status(status);
        }
        Ok(self.db.search_orders(query).await?)
    }

    /// Loads every available rider with a known position into the geo index. Returns how many were indexed.
    pub async fn rebuild_geo_index(&self) -> Result<usize, OrderFlowError> {
        let riders = self.db.fetch_available_riders().await?;
        let mut indexed = 0;
        for rider in &riders {
            if let Some(location) = rider.location() {
                self.geo.mark_available(rider.id, location).await?;
                indexed += 1;
            }
        }
        info!("📍️ Geo index rebuilt with {indexed} of {} available riders", riders.len());
        Ok(indexed)
    }

    /// Brings the geo index in line with the rider's stored availability. Failures are logged.
    pub(crate) async fn sync_rider(&self, rider: &Rider) {
        let result = match (rider.is_available, rider.location()) {
            (true, Some(location)) => self.geo.mark_available(rider.id, location).await,
            _ => self.geo.mark_unavailable(rider.id).await,
        };
        if let Err(e) = result {
            error!("📍️ Geo index is out of step with rider #{}. {e}", rider.id);
        }
    }

    async fn forget_rider(&self, rider_id: i64) {
        if let Err(e) = self.geo.mark_unavailable(rider_id).await {
            error!("📍️ Could not remove rider #{rider_id} from the geo index. {e}");
        }
    }

    async fn evict(&self, order_id: i64) {
        if let Err(e) = self.geo.evict_active_order(order_id).await {
            warn!("📍️ Could not evict order #{order_id} from the active order cache. {e}");
        }
    }

    async fn after_claim(&self, order: &Order, rider: &Rider, automatic: bool) {
        self.sync_rider(rider).await;
        self.evict(order.id).await;
        self.notifier.rider_assigned(order, rider.id, automatic).await;
    }

    async fn claimed(
        &self,
        outcome: ClaimOutcome,
        order_id: i64,
        rider_id: i64,
    ) -> Result<(Order, Rider), OrderFlowError> {
        match outcome {
            ClaimOutcome::Claimed { order, rider } => Ok((order, rider)),
            ClaimOutcome::OrderNotFound => Err(OrderFlowError::order_not_found(order_id)),
            ClaimOutcome::RiderNotFound => Err(OrderFlowError::rider_not_found(rider_id)),
            ClaimOutcome::AlreadyAssigned(_) => Err(OrderFlowError::AlreadyAssigned(order_id)),
            ClaimOutcome::NotReady(status) => Err(OrderFlowError::NotReady(status)),
            ClaimOutcome::RiderUnavailable => {
                self.forget_rider(rider_id).await;
                Err(OrderFlowError::Conflict(format!("Rider #{rider_id} is not available to take an order")))
            },
        }
    }

    async fn availability_result(&self, rider_id: i64, change: AvailabilityChange) -> Result<Rider, OrderFlowError> {
        match change {
            AvailabilityChange::Changed(rider) | AvailabilityChange::Unchanged(rider) => {
                debug!("🛵️ Rider #{rider_id} is {}", if rider.is_available { "available" } else { "unavailable" });
                self.sync_rider(&rider).await;
                Ok(rider)
            },
            AvailabilityChange::BlockedByActiveOrder => Err(OrderFlowError::Conflict(format!(
                "Rider #{rider_id} cannot become available while it has an active delivery"
            ))),
            AvailabilityChange::RiderNotFound => Err(OrderFlowError::rider_not_found(rider_id)),
        }
    }
}

/// False for dispatch failures that mean the order was claimed, moved on or removed in the meantime.
fn needs_admin(e: &OrderFlowError) -> bool {
    !matches!(e, OrderFlowError::AlreadyAssigned(_) | OrderFlowError::NotReady(_) | OrderFlowError::NotFound(_))
}

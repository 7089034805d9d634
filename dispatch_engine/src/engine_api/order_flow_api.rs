use std::fmt::Debug;

use chrono::Utc;
use log::*;

use crate::{
    db_types::{Coordinates, NewOrder, NewOrderItem, NewReview, Order, OrderStatusType, Review},
    engine_api::{
        errors::OrderFlowError,
        fees::compute_fees,
        notifier::Notifier,
        order_objects::{Actor, NewOrderRequest, OrderDetails, OrderQueryFilter, TrackingEvent},
        platform_config::PlatformConfig,
        rider_dispatch_api::RiderDispatchApi,
        state_machine::{
            authorize_cancellation,
            authorize_transition,
            can_view,
            check_transition,
            plan_status_change,
        },
    },
    events::EventProducers,
    helpers::{new_order_number, new_transaction_id},
    traits::{DeliveryDatabase, DeliveryDatabaseError, GeoIndex},
};

const ORDER_NUMBER_ATTEMPTS: usize = 5;

/// `OrderFlowApi` is the primary API for placing orders and moving them through their lifecycle.
///
/// Order life cycle:
///
/// | Current   | Next                            | Who                                   | Side effects                    |
/// |-----------|---------------------------------|---------------------------------------|---------------------------------|
/// | (new)     | pending                         | student                               | priced, cached, notified        |
/// | pending   | confirmed, rejected, cancelled  | vendor (confirm, reject), cancel path | reason stored on reject/cancel  |
/// | confirmed | preparing, cancelled            | vendor, cancel path                   |                                 |
/// | preparing | ready, cancelled                | vendor, admin                         | `ready` triggers auto-dispatch  |
/// | ready     | picked_up                       | assigned rider                        |                                 |
/// | picked_up | delivered                       | assigned rider                        | rider released, counters settle |
///
/// Admins may make any transition in the table. Every successful transition evicts the order from the active order
/// cache and notifies the student, the vendor and the assigned rider.
pub struct OrderFlowApi<B, G> {
    db: B,
    geo: G,
    notifier: Notifier,
    config: PlatformConfig,
    dispatcher: RiderDispatchApi<B, G>,
}

impl<B, G> Debug for OrderFlowApi<B, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B: Clone, G: Clone> OrderFlowApi<B, G> {
    pub fn new(db: B, geo: G, producers: EventProducers, config: PlatformConfig) -> Self {
        let dispatcher = RiderDispatchApi::new(db.clone(), geo.clone(), producers.clone(), config.clone());
        Self { db, geo, notifier: Notifier::new(producers), config, dispatcher }
    }
}

impl<B, G> OrderFlowApi<B, G> {
    /// The dispatcher that this API hands ready orders to.
    pub fn dispatcher(&self) -> &RiderDispatchApi<B, G> {
        &self.dispatcher
    }

    pub fn config(&self) -> &PlatformConfig {
        &self.config
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B, G> OrderFlowApi<B, G>
where
    B: DeliveryDatabase,
    G: GeoIndex,
{
    /// Places a new order on behalf of a student.
    ///
    /// The request is validated before anything is looked up. The order, its line items and a pending payment are
    /// stored together, so a partially created order is never visible.
    pub async fn create_order(&self, actor: &Actor, request: NewOrderRequest) -> Result<OrderDetails, OrderFlowError> {
        let Actor::Student(student_id) = *actor else {
            return Err(OrderFlowError::AuthorizationError(format!("{actor} may not place orders")));
        };
        validate_order_request(&request, &self.config)?;
        let vendor_id = request.vendor_id;
        let vendor = self
            .db
            .fetch_vendor(vendor_id)
            .await?
            .ok_or_else(|| OrderFlowError::NotFound(format!("Vendor #{vendor_id}")))?;
        if !vendor.is_open {
            return Err(OrderFlowError::VendorClosed(vendor_id));
        }
        self.db
            .fetch_student(student_id)
            .await?
            .ok_or_else(|| OrderFlowError::NotFound(format!("Student #{student_id}")))?;
        let mut lines = Vec::with_capacity(request.items.len());
        for line in &request.items {
            let item = self
                .db
                .fetch_menu_item(line.menu_item_id)
                .await?
                .filter(|item| item.vendor_id == vendor_id)
                .ok_or_else(|| OrderFlowError::NotFound(format!("Menu item #{} at vendor #{vendor_id}", line.menu_item_id)))?;
            if !item.is_available {
                return Err(OrderFlowError::ValidationError(format!("{} is not available right now", item.name)));
            }
            lines.push((item, line.quantity));
        }
        let fees = compute_fees(&lines, &vendor, &self.config)?;
        trace!("🔄️📦️ Order for student #{student_id} at vendor #{vendor_id} priced at {}", fees.total);
        let items = request
            .items
            .iter()
            .zip(fees.lines.iter())
            .map(|(req, priced)| NewOrderItem {
                menu_item_id: priced.menu_item_id,
                quantity: priced.quantity,
                unit_price: priced.unit_price,
                subtotal: priced.subtotal,
                special_instructions: req.special_instructions.clone(),
            })
            .collect::<Vec<_>>();
        let mut new_order = NewOrder {
            order_number: new_order_number(),
            transaction_id: new_transaction_id(),
            student_id,
            vendor_id,
            subtotal: fees.subtotal,
            delivery_fee: fees.delivery_fee,
            service_fee: fees.service_fee,
            total_amount: fees.total,
            commission_amount: fees.commission,
            vendor_earnings: fees.vendor_earnings,
            rider_earnings: fees.rider_earnings,
            delivery_address: request.delivery_address.trim().to_string(),
            delivery_point: Coordinates::new(request.delivery_lat, request.delivery_lng),
            delivery_block: request.delivery_block,
            delivery_dorm: request.delivery_dorm,
            customer_phone: request.customer_phone.trim().to_string(),
            customer_id_number: request.customer_id_number,
            special_instructions: request.special_instructions,
            payment_method: request.payment_method,
            items,
            created_at: Utc::now(),
        };
        let order = self.insert_with_fresh_number(&mut new_order).await?;
        info!("🔄️📦️ Order [{}] placed by student #{student_id} with vendor #{vendor_id}", order.order_number);
        if let Err(e) = self.geo.cache_active_order(&order, self.config.active_order_ttl).await {
            warn!("🔄️📦️ Could not cache order #{}. {e}", order.id);
        }
        let items = self.db.fetch_order_items(order.id).await?;
        self.notifier.order_created(&order).await;
        Ok(OrderDetails { order, items })
    }

    async fn insert_with_fresh_number(&self, order: &mut NewOrder) -> Result<Order, OrderFlowError> {
        let mut attempt = 1;
        loop {
            match self.db.insert_order(order.clone()).await {
                Ok(order) => return Ok(order),
                Err(DeliveryDatabaseError::AlreadyExists(what)) if attempt < ORDER_NUMBER_ATTEMPTS => {
                    debug!("🔄️📦️ {what} already exists. Generating new identifiers (attempt {attempt}).");
                    order.order_number = new_order_number();
                    order.transaction_id = new_transaction_id();
                    attempt += 1;
                },
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Moves an order to `target` on behalf of `actor`.
    ///
    /// Authorization is checked first, then the transition table. The write only succeeds if nobody else changed the
    /// order's status in the meantime. A rider's change also requires the rider to still be the assignee when the write
    /// lands. Reaching `ready` without a rider starts auto-dispatch; a failed dispatch alerts the admins but does not
    /// fail the transition.
    pub async fn transition(
        &self,
        actor: &Actor,
        order_id: i64,
        target: OrderStatusType,
        reason: Option<String>,
    ) -> Result<Order, OrderFlowError> {
        let order = self.fetch_order(order_id).await?;
        authorize_transition(actor, &order, target)?;
        check_transition(order.status, target)?;
        debug!("🔄️📦️ {actor} is moving order #{order_id} from {} to {target}", order.status);
        let assignee = match *actor {
            Actor::Rider(id) => Some(id),
            _ => None,
        };
        self.apply_transition(order, target, reason, assignee).await
    }

    /// Cancels a pending or confirmed order. Open to the student who placed it, its vendor, and admins.
    pub async fn cancel_order(
        &self,
        actor: &Actor,
        order_id: i64,
        reason: Option<String>,
    ) -> Result<Order, OrderFlowError> {
        let order = self.fetch_order(order_id).await?;
        authorize_cancellation(actor, &order)?;
        check_transition(order.status, OrderStatusType::Cancelled)?;
        let reason = reason.map(|r| r.trim().to_string()).filter(|r| !r.is_empty());
        debug!("🔄️📦️ {actor} is cancelling order #{order_id}");
        self.apply_transition(order, OrderStatusType::Cancelled, reason, None).await
    }

    async fn apply_transition(
        &self,
        order: Order,
        target: OrderStatusType,
        reason: Option<String>,
        assignee: Option<i64>,
    ) -> Result<Order, OrderFlowError> {
        let old_status = order.status;
        let mut change = plan_status_change(&order, target, reason);
        if let Some(rider_id) = assignee {
            change = change.for_assignee(rider_id);
        }
        let Some(outcome) = self.db.apply_status_change(change).await? else {
            let current = self.fetch_order(order.id).await?;
            if let Some(rider_id) = assignee.filter(|id| current.assigned_rider_id != Some(*id)) {
                return Err(OrderFlowError::AuthorizationError(format!(
                    "Order #{} was reassigned and rider #{rider_id} may no longer move it",
                    order.id
                )));
            }
            check_transition(current.status, target)?;
            return Err(OrderFlowError::Conflict(format!(
                "Order #{} changed from {old_status} to {} while this request was in flight",
                order.id, current.status
            )));
        };
        let updated = outcome.order;
        info!("🔄️📦️ Order #{} is now {}", updated.id, updated.status);
        if let Err(e) = self.geo.evict_active_order(updated.id).await {
            warn!("🔄️📦️ Could not evict order #{} from the active order cache. {e}", updated.id);
        }
        if let Some(rider) = &outcome.released_rider {
            debug!("🔄️📦️ Rider #{} released from order #{}", rider.id, updated.id);
            self.dispatcher.sync_rider(rider).await;
        }
        self.notifier.status_changed(&updated, old_status).await;
        if updated.status == OrderStatusType::Ready && updated.assigned_rider_id.is_none() {
            if let Some(rider_id) = self.dispatcher.dispatch_or_escalate(&updated).await {
                debug!("🔄️📦️ Order #{} dispatched to rider #{rider_id}", updated.id);
                return self.fetch_order(updated.id).await;
            }
        }
        Ok(updated)
    }

    /// Fetches an order and its line items, if `actor` may see it.
    pub async fn get_order(&self, actor: &Actor, order_id: i64) -> Result<OrderDetails, OrderFlowError> {
        let cached = match self.geo.active_order(order_id).await {
            Ok(cached) => cached,
            Err(e) => {
                warn!("🔄️📦️ Active order cache is unavailable. {e}");
                None
            },
        };
        let order = match cached {
            Some(order) => order,
            None => self.fetch_order(order_id).await?,
        };
        self.check_visibility(actor, &order)?;
        let items = self.db.fetch_order_items(order_id).await?;
        Ok(OrderDetails { order, items })
    }

    /// The order's history, oldest event first.
    pub async fn order_timeline(&self, actor: &Actor, order_id: i64) -> Result<Vec<TrackingEvent>, OrderFlowError> {
        let order = self.fetch_order(order_id).await?;
        self.check_visibility(actor, &order)?;
        Ok(timeline(&order))
    }

    /// Orders visible to `actor`. The filter is narrowed to the actor's own orders unless the actor is an admin.
    pub async fn search_orders(&self, actor: &Actor, query: OrderQueryFilter) -> Result<Vec<Order>, OrderFlowError> {
        let query = match *actor {
            Actor::Student(id) => query.with_student_id(id),
            Actor::Vendor(id) => query.with_vendor_id(id),
            Actor::Rider(id) => query.with_rider_id(id),
            Actor::Admin(_) => query,
        };
        Ok(self.db.search_orders(query).await?)
    }

    /// A student rates a delivered order, once. The vendor's and rider's average ratings are recalculated.
    pub async fn rate_order(
        &self,
        actor: &Actor,
        order_id: i64,
        rating: i64,
        comment: Option<String>,
    ) -> Result<Review, OrderFlowError> {
        if !(1..=5).contains(&rating) {
            return Err(OrderFlowError::ValidationError(format!("A rating must be between 1 and 5, not {rating}")));
        }
        let order = self.fetch_order(order_id).await?;
        if *actor != Actor::Student(order.student_id) {
            return Err(OrderFlowError::AuthorizationError(format!("{actor} did not place order #{order_id}")));
        }
        if order.status != OrderStatusType::Delivered {
            return Err(OrderFlowError::ValidationError(format!(
                "Order #{order_id} is {}. Only delivered orders can be rated.",
                order.status
            )));
        }
        let review = NewReview {
            order_id,
            student_id: order.student_id,
            vendor_id: order.vendor_id,
            rider_id: order.assigned_rider_id,
            rating,
            comment: comment.map(|c| c.trim().to_string()).filter(|c| !c.is_empty()),
        };
        let review = self.db.insert_review(review).await.map_err(|e| match e {
            DeliveryDatabaseError::AlreadyExists(_) => {
                OrderFlowError::Conflict(format!("Order #{order_id} has already been rated"))
            },
            e => OrderFlowError::from(e),
        })?;
        info!("🔄️📦️ Order #{order_id} rated {rating} by {actor}");
        Ok(review)
    }

    async fn fetch_order(&self, order_id: i64) -> Result<Order, OrderFlowError> {
        self.db.fetch_order(order_id).await?.ok_or_else(|| OrderFlowError::order_not_found(order_id))
    }

    fn check_visibility(&self, actor: &Actor, order: &Order) -> Result<(), OrderFlowError> {
        if can_view(actor, order) {
            Ok(())
        } else {
            Err(OrderFlowError::AuthorizationError(format!("{actor} may not view order #{}", order.id)))
        }
    }
}

fn validate_order_request(request: &NewOrderRequest, config: &PlatformConfig) -> Result<(), OrderFlowError> {
    let invalid = |msg: String| Err(OrderFlowError::ValidationError(msg));
    if request.items.is_empty() {
        return invalid("An order needs at least one item".into());
    }
    if request.items.len() > config.max_order_items {
        return invalid(format!("An order can have at most {} items", config.max_order_items));
    }
    if let Some(line) = request.items.iter().find(|l| !(1..=config.max_item_quantity).contains(&l.quantity)) {
        return invalid(format!(
            "The quantity for menu item #{} must be between 1 and {}",
            line.menu_item_id, config.max_item_quantity
        ));
    }
    if request.delivery_address.trim().is_empty() {
        return invalid("A delivery address is required".into());
    }
    let point = Coordinates::new(request.delivery_lat, request.delivery_lng);
    if !point.is_valid() {
        return invalid(format!("{point} are not valid delivery coordinates"));
    }
    if request.customer_phone.trim().is_empty() {
        return invalid("A contact phone number is required".into());
    }
    Ok(())
}

/// The milestones the order has reached, in lifecycle order.
pub fn timeline(order: &Order) -> Vec<TrackingEvent> {
    use OrderStatusType::*;
    let mut events = vec![TrackingEvent::new(Pending, order.created_at, "Order placed")];
    let milestones = [
        (Confirmed, order.confirmed_at, "Order confirmed by vendor"),
        (Preparing, order.prepared_at, "Order is being prepared"),
        (Ready, order.ready_at, "Order is ready for pickup"),
        (PickedUp, order.picked_up_at, "Rider picked up the order"),
        (Delivered, order.delivered_at, "Order delivered"),
    ];
    events.extend(milestones.into_iter().filter_map(|(status, at, note)| at.map(|t| TrackingEvent::new(status, t, note))));
    if let Some(at) = order.cancelled_at {
        let status = if order.status == Rejected { Rejected } else { Cancelled };
        let note = match &order.cancellation_reason {
            Some(reason) => format!("Order {status}: {reason}"),
            None => format!("Order {status}"),
        };
        events.push(TrackingEvent::new(status, at, note));
    }
    events
}

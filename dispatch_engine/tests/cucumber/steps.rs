use std::str::FromStr;

use cucumber::{then, when};
use dispatch_engine::{
    db_types::{Money, OrderStatusType},
    order_objects::Actor,
    OrderManagement,
};

use crate::cucumber::DeliveryWorld;

fn status(s: &str) -> OrderStatusType {
    OrderStatusType::from_str(s).expect("Not a valid order status")
}

#[when("the student places an order")]
async fn place_order(world: &mut DeliveryWorld) {
    let request = world.system().campus.order_request();
    let details = world.api().create_order(&world.student(), request).await.expect("Error placing order");
    world.order = Some(details.order);
}

#[when(expr = "the vendor moves the order to {word}")]
async fn vendor_moves_order(world: &mut DeliveryWorld, target: String) {
    let result = world.api().transition(&world.vendor(), world.order_id(), status(&target), None).await;
    world.record(result);
}

#[when(expr = "the vendor rejects the order because {string}")]
async fn vendor_rejects_order(world: &mut DeliveryWorld, reason: String) {
    let result =
        world.api().transition(&world.vendor(), world.order_id(), OrderStatusType::Rejected, Some(reason)).await;
    world.record(result);
}

#[when(expr = "rider {word} moves the order to {word}")]
async fn rider_moves_order(world: &mut DeliveryWorld, name: String, target: String) {
    let rider = Actor::Rider(world.rider_id(&name));
    let result = world.api().transition(&rider, world.order_id(), status(&target), None).await;
    world.record(result);
}

#[when("the student cancels the order")]
async fn student_cancels(world: &mut DeliveryWorld) {
    let result = world.api().cancel_order(&world.student(), world.order_id(), None).await;
    world.record(result);
}

#[when(expr = "rider {word} claims the order")]
async fn rider_claims(world: &mut DeliveryWorld, name: String) {
    let rider_id = world.rider_id(&name);
    let result = world.api().dispatcher().claim_order(rider_id, world.order_id()).await;
    world.record(result);
}

#[when(expr = "rider {word} hands the order back")]
async fn rider_hands_back(world: &mut DeliveryWorld, name: String) {
    let rider_id = world.rider_id(&name);
    let order_id = world.order_id();
    match world.api().dispatcher().handle_rejection(rider_id, order_id).await {
        Ok(_) => {
            let order = world.api().db().fetch_order(order_id).await.expect("Error fetching order");
            world.order = order;
            world.last_error = None;
        },
        Err(e) => world.last_error = Some(e),
    }
}

#[then(expr = "the order is {word}")]
async fn order_status_is(world: &mut DeliveryWorld, expected: String) {
    let order = world.api().db().fetch_order(world.order_id()).await.expect("Error fetching order").unwrap();
    assert_eq!(order.status, status(&expected));
}

#[then(expr = "the order total is {word}")]
async fn order_total_is(world: &mut DeliveryWorld, expected: String) {
    let expected = Money::from_str(&expected).expect("Not a valid amount");
    let order = world.order.as_ref().expect("No order has been placed");
    assert_eq!(order.total_amount, expected);
}

#[then(expr = "the order is assigned to rider {word}")]
async fn order_assigned_to(world: &mut DeliveryWorld, name: String) {
    let order = world.api().db().fetch_order(world.order_id()).await.expect("Error fetching order").unwrap();
    assert_eq!(order.assigned_rider_id, Some(world.rider_id(&name)));
}

#[then("the order has no rider")]
async fn order_unassigned(world: &mut DeliveryWorld) {
    let order = world.api().db().fetch_order(world.order_id()).await.expect("Error fetching order").unwrap();
    assert_eq!(order.assigned_rider_id, None);
}

#[then(expr = "rider {word} is {word}")]
async fn rider_availability(world: &mut DeliveryWorld, name: String, expected: String) {
    let rider = world.api().db().fetch_rider(world.rider_id(&name)).await.expect("Error fetching rider").unwrap();
    match expected.as_str() {
        "available" => assert!(rider.is_available, "Rider {name} should be available"),
        "unavailable" => assert!(!rider.is_available, "Rider {name} should be unavailable"),
        other => panic!("Unknown rider state: {other}"),
    }
}

#[then(expr = "rider {word} has made {int} deliveries")]
async fn rider_deliveries(world: &mut DeliveryWorld, name: String, count: i64) {
    let rider = world.api().db().fetch_rider(world.rider_id(&name)).await.expect("Error fetching rider").unwrap();
    assert_eq!(rider.total_deliveries, count);
}

#[then(expr = "the request fails with a {word} error")]
async fn request_failed(world: &mut DeliveryWorld, kind: String) {
    let err = world.last_error.as_ref().expect("The last request succeeded");
    assert_eq!(err.kind().to_string(), kind, "Unexpected error: {err}");
}

#[then(expr = "the cancellation reason is {string}")]
async fn cancellation_reason(world: &mut DeliveryWorld, reason: String) {
    let order = world.api().db().fetch_order(world.order_id()).await.expect("Error fetching order").unwrap();
    assert_eq!(order.cancellation_reason, Some(reason));
}

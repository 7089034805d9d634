use std::str::FromStr;

use dispatch_engine::{
    db_types::{Money, NewMenuItem, NewVendor, OrderStatusType::*, PaymentStatus, Rate},
    events::Recipient,
    order_objects::{Actor, OrderItemRequest, OrderQueryFilter},
    test_utils::seed::{campus_centre, km_north},
    ErrorKind,
    OrderFlowError,
    OrderManagement,
};
use log::*;
use tokio::runtime::Runtime;

mod support;

use support::{setup, tear_down};

#[test]
fn placing_an_order_prices_and_stores_it() {
    let rt = Runtime::new().unwrap();
    rt.block_on(async {
        let sys = setup().await;
        let details = sys.place_order().await;
        let order = &details.order;
        assert_eq!(order.status, Pending);
        assert!(order.order_number.starts_with("ORD-"));
        assert_eq!(order.subtotal, Money::from(20));
        assert_eq!(order.delivery_fee, Money::new(250, 2));
        assert_eq!(order.service_fee, Money::from(1));
        assert_eq!(order.total_amount, Money::new(2350, 2));
        assert_eq!(order.commission_amount, Money::from(3));
        assert_eq!(order.vendor_earnings, Money::from(17));
        assert_eq!(order.rider_earnings, Money::from(2));
        assert_eq!(order.total_amount, order.subtotal + order.delivery_fee + order.service_fee);
        assert_eq!(order.assigned_rider_id, None);

        assert_eq!(details.items.len(), 2);
        let suya = details.items.iter().find(|i| i.menu_item_id == sys.campus.suya.id).unwrap();
        assert_eq!(suya.unit_price, Money::from(10));
        let jollof = details.items.iter().find(|i| i.menu_item_id == sys.campus.jollof.id).unwrap();
        assert_eq!(jollof.subtotal, Money::from(10));

        let payment = sys.db.fetch_payment_for_order(order.id).await.unwrap().unwrap();
        assert_eq!(payment.amount, Money::new(2350, 2));
        assert_eq!(payment.payment_status, PaymentStatus::Pending);

        let by_number = sys.db.fetch_order_by_number(&order.order_number).await.unwrap().unwrap();
        assert_eq!(by_number.id, order.id);

        let vendor = Recipient::Vendor(sys.campus.vendor.id);
        let student = Recipient::Student(sys.campus.student.id);
        assert!(sys.inbox.wait_for(vendor, "New Order").await.is_some());
        assert!(sys.inbox.wait_for(student, "Order Placed").await.is_some());
        assert!(sys.inbox.wait_for(Recipient::Admins, "New Order Placed").await.is_some());
        tear_down(sys).await;
    });
    info!("🚀️ test complete");
}

#[test]
fn only_open_vendors_take_orders() {
    let rt = Runtime::new().unwrap();
    rt.block_on(async {
        let sys = setup().await;
        sys.db.set_vendor_open(sys.campus.vendor.id, false).await.unwrap();
        let err = sys.api.create_order(&sys.student(), sys.campus.order_request()).await.unwrap_err();
        assert!(matches!(err, OrderFlowError::VendorClosed(_)), "Unexpected error: {err}");
        assert_eq!(err.kind(), ErrorKind::Capacity);
        let orders = sys.api.search_orders(&sys.student(), OrderQueryFilter::default()).await.unwrap();
        assert!(orders.is_empty());
        tear_down(sys).await;
    });
}

#[test]
fn rejected_order_requests() {
    let rt = Runtime::new().unwrap();
    rt.block_on(async {
        let sys = setup().await;
        // Only students place orders
        let err = sys.api.create_order(&sys.vendor(), sys.campus.order_request()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);

        // Below the vendor's minimum
        let rate = Rate::from_str("0.10").unwrap();
        let pricey = sys.db.create_vendor(NewVendor::new("Chicken Republic", rate, Money::from(50))).await.unwrap();
        let mut request = sys.campus.order_request();
        request.vendor_id = pricey.id;
        let err = sys.api.create_order(&sys.student(), request).await.unwrap_err();
        // The menu items belong to another vendor, which is caught before pricing
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let bread = sys
            .db
            .create_menu_item(NewMenuItem {
                vendor_id: pricey.id,
                name: "Agege bread".into(),
                price: Money::from(8),
                discount_price: None,
                is_available: true,
            })
            .await
            .unwrap();
        let mut request = sys.campus.order_request();
        request.vendor_id = pricey.id;
        request.items = vec![OrderItemRequest::new(bread.id, 2)];
        let err = sys.api.create_order(&sys.student(), request).await.unwrap_err();
        assert!(matches!(err, OrderFlowError::BelowMinimumOrder { .. }), "Unexpected error: {err}");
        assert_eq!(err.kind(), ErrorKind::Capacity);

        // Unavailable menu item
        sys.db.set_menu_item_available(sys.campus.suya.id, false).await.unwrap();
        let err = sys.api.create_order(&sys.student(), sys.campus.order_request()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        // Nothing was stored
        let orders = sys.api.search_orders(&Actor::Admin(1), OrderQueryFilter::default()).await.unwrap();
        assert!(orders.is_empty());
        tear_down(sys).await;
    });
}

#[test]
fn full_delivery_settles_every_counter() {
    let rt = Runtime::new().unwrap();
    rt.block_on(async {
        let sys = setup().await;
        let rider = sys.online_rider("Tunde", km_north(0.5)).await;
        let order = sys.preparing_order().await;
        assert_eq!(order.status, Preparing);

        let order = sys.api.transition(&sys.vendor(), order.id, Ready, None).await.unwrap();
        assert_eq!(order.status, Ready);
        assert_eq!(order.assigned_rider_id, Some(rider.id));
        assert!(!sys.fetch_rider(rider.id).await.is_available);
        assert!(!sys.geo.contains(rider.id).await);

        let rider_actor = Actor::Rider(rider.id);
        let order = sys.api.transition(&rider_actor, order.id, PickedUp, None).await.unwrap();
        assert_eq!(order.status, PickedUp);
        let order = sys.api.transition(&rider_actor, order.id, Delivered, None).await.unwrap();
        assert_eq!(order.status, Delivered);
        assert!(order.delivered_at.is_some());

        let opening_balance = rider.current_balance;
        let rider = sys.fetch_rider(rider.id).await;
        assert!(rider.is_available);
        assert_eq!(rider.total_deliveries, 1);
        assert_eq!(rider.total_earnings, Money::from(2));
        assert_eq!(rider.current_balance, opening_balance + Money::from(2));
        assert!(sys.geo.contains(rider.id).await);

        let vendor = sys.db.fetch_vendor(sys.campus.vendor.id).await.unwrap().unwrap();
        assert_eq!(vendor.total_orders, 1);
        assert_eq!(vendor.total_revenue, Money::from(20));
        assert_eq!(vendor.total_earnings, Money::from(17));
        assert_eq!(vendor.current_balance, sys.campus.vendor.current_balance + Money::from(17));

        let student = sys.db.fetch_student(sys.campus.student.id).await.unwrap().unwrap();
        assert_eq!(student.total_orders, 1);
        assert_eq!(student.total_spent, Money::new(2350, 2));

        let timeline = sys.api.order_timeline(&sys.student(), order.id).await.unwrap();
        let statuses = timeline.iter().map(|e| e.status).collect::<Vec<_>>();
        assert_eq!(statuses, vec![Pending, Confirmed, Preparing, Ready, PickedUp, Delivered]);

        let student = Recipient::Student(sys.campus.student.id);
        assert!(sys.inbox.wait_for(student, "Rider Assigned").await.is_some());
        assert!(sys.inbox.wait_for(Recipient::Rider(rider.id), "New Delivery").await.is_some());
        assert!(sys.inbox.wait_for(Recipient::Admins, "Order delivered").await.is_some());
        tear_down(sys).await;
    });
}

#[test]
fn vendor_rejects_a_pending_order() {
    let rt = Runtime::new().unwrap();
    rt.block_on(async {
        let sys = setup().await;
        let order = sys.place_order().await.order;
        let rejected = sys.api.transition(&sys.vendor(), order.id, Rejected, Some("out of stock".into())).await.unwrap();
        assert_eq!(rejected.status, Rejected);
        assert_eq!(rejected.cancellation_reason.as_deref(), Some("out of stock"));
        assert!(rejected.cancelled_at.is_some());

        let timeline = sys.api.order_timeline(&sys.vendor(), order.id).await.unwrap();
        assert_eq!(timeline.last().unwrap().note, "Order rejected: out of stock");

        let err = sys.api.transition(&sys.vendor(), order.id, Confirmed, None).await.unwrap_err();
        assert!(matches!(err, OrderFlowError::TerminalState(Rejected)), "Unexpected error: {err}");
        tear_down(sys).await;
    });
}

#[test]
fn invalid_transitions_leave_the_order_alone() {
    let rt = Runtime::new().unwrap();
    rt.block_on(async {
        let sys = setup().await;
        let order = sys.place_order().await.order;

        let err = sys.api.transition(&sys.vendor(), order.id, Ready, None).await.unwrap_err();
        assert!(matches!(err, OrderFlowError::InvalidTransition { from: Pending, to: Ready }), "{err}");
        assert_eq!(err.kind(), ErrorKind::InvalidTransition);

        // Admins bypass authorization, never the transition table
        let err = sys.api.transition(&Actor::Admin(1), order.id, Delivered, None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTransition);

        // Students cannot change status, riders only touch their own orders, vendors only theirs
        let err = sys.api.transition(&sys.student(), order.id, Confirmed, None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);
        let err = sys.api.transition(&Actor::Rider(99), order.id, PickedUp, None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);
        let err = sys.api.transition(&Actor::Vendor(sys.campus.vendor.id + 1), order.id, Confirmed, None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);

        let err = sys.api.transition(&sys.vendor(), 9_999, Confirmed, None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let unchanged = sys.fetch_order(order.id).await;
        assert_eq!(unchanged.status, Pending);
        assert_eq!(unchanged.updated_at, order.updated_at);
        assert!(unchanged.confirmed_at.is_none());
        tear_down(sys).await;
    });
}

#[test]
fn cancellation_rules() {
    let rt = Runtime::new().unwrap();
    rt.block_on(async {
        let sys = setup().await;
        let order = sys.place_order().await.order;
        let err = sys.api.cancel_order(&Actor::Rider(1), order.id, None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);
        let err = sys.api.cancel_order(&Actor::Student(sys.campus.student.id + 1), order.id, None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);

        let cancelled = sys.api.cancel_order(&sys.student(), order.id, Some("  changed my mind ".into())).await.unwrap();
        assert_eq!(cancelled.status, Cancelled);
        assert_eq!(cancelled.cancellation_reason.as_deref(), Some("changed my mind"));
        let err = sys.api.cancel_order(&sys.student(), order.id, None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTransition);

        // Once the kitchen has started, it is too late
        let preparing = sys.preparing_order().await;
        let err = sys.api.cancel_order(&sys.student(), preparing.id, None).await.unwrap_err();
        assert!(matches!(err, OrderFlowError::InvalidTransition { from: Preparing, to: Cancelled }), "{err}");
        let confirmed = sys.place_order().await.order;
        sys.api.transition(&sys.vendor(), confirmed.id, Confirmed, None).await.unwrap();
        let cancelled = sys.api.cancel_order(&sys.vendor(), confirmed.id, None).await.unwrap();
        assert_eq!(cancelled.status, Cancelled);
        assert_eq!(cancelled.cancellation_reason, None);
        tear_down(sys).await;
    });
}

#[test]
fn visibility_follows_ownership() {
    let rt = Runtime::new().unwrap();
    rt.block_on(async {
        let sys = setup().await;
        let order = sys.place_order().await.order;
        let details = sys.api.get_order(&sys.student(), order.id).await.unwrap();
        assert_eq!(details.order.id, order.id);
        assert_eq!(details.items.len(), 2);
        assert!(sys.api.get_order(&Actor::Admin(1), order.id).await.is_ok());
        let err = sys.api.get_order(&Actor::Student(sys.campus.student.id + 1), order.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);
        let err = sys.api.get_order(&Actor::Rider(1), order.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);

        let other = sys.db.create_student("Bola Ade", None).await.unwrap();
        let theirs = sys.api.search_orders(&Actor::Student(other.id), OrderQueryFilter::default()).await.unwrap();
        assert!(theirs.is_empty());
        let mine = sys.api.search_orders(&sys.student(), OrderQueryFilter::default()).await.unwrap();
        assert_eq!(mine.len(), 1);
        tear_down(sys).await;
    });
}

#[test]
fn concurrent_transitions_from_the_same_state() {
    let rt = Runtime::new().unwrap();
    rt.block_on(async {
        let sys = setup().await;
        let order = sys.place_order().await.order;
        let vendor = sys.vendor();
        let (a, b) = tokio::join!(
            sys.api.transition(&vendor, order.id, Confirmed, None),
            sys.api.transition(&vendor, order.id, Rejected, Some("closing early".into())),
        );
        let results = [a, b];
        let ok = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(ok, 1, "Exactly one transition should win: {results:?}");
        let loser = results.iter().find_map(|r| r.as_ref().err()).unwrap();
        assert!(matches!(loser.kind(), ErrorKind::Conflict | ErrorKind::InvalidTransition), "{loser}");
        let stored = sys.fetch_order(order.id).await;
        assert!(matches!(stored.status, Confirmed | Rejected));
        tear_down(sys).await;
    });
}

#[test]
fn rating_a_delivered_order() {
    let rt = Runtime::new().unwrap();
    rt.block_on(async {
        let sys = setup().await;
        let rider = sys.online_rider("Kemi", campus_centre()).await;
        let order = sys.preparing_order().await;
        let err = sys.api.rate_order(&sys.student(), order.id, 5, None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        sys.api.transition(&sys.vendor(), order.id, Ready, None).await.unwrap();
        let rider_actor = Actor::Rider(rider.id);
        sys.api.transition(&rider_actor, order.id, PickedUp, None).await.unwrap();
        sys.api.transition(&rider_actor, order.id, Delivered, None).await.unwrap();

        let err = sys.api.rate_order(&sys.student(), order.id, 6, None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        let err = sys.api.rate_order(&sys.vendor(), order.id, 5, None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);

        let review = sys.api.rate_order(&sys.student(), order.id, 4, Some(" Hot and fast ".into())).await.unwrap();
        assert_eq!(review.rating, 4);
        assert_eq!(review.rider_id, Some(rider.id));
        assert_eq!(review.comment.as_deref(), Some("Hot and fast"));

        let err = sys.api.rate_order(&sys.student(), order.id, 1, None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        let vendor = sys.db.fetch_vendor(sys.campus.vendor.id).await.unwrap().unwrap();
        assert_eq!(vendor.review_count, 1);
        assert!((vendor.rating - 4.0).abs() < 1e-9);
        let rider = sys.fetch_rider(rider.id).await;
        assert_eq!(rider.review_count, 1);
        assert!((rider.rating - 4.0).abs() < 1e-9);
        tear_down(sys).await;
    });
}

#[test]
fn stored_rates_outside_zero_to_one_are_refused() {
    let rt = Runtime::new().unwrap();
    rt.block_on(async {
        let sys = setup().await;
        let vendor_id = sys.campus.vendor.id;
        let set_rate = |rate: &'static str| {
            sqlx::query("UPDATE vendors SET commission_rate = $1 WHERE id = $2")
                .bind(rate)
                .bind(vendor_id)
                .execute(sys.db.pool())
        };
        set_rate("0.2").await.unwrap();
        let vendor = sys.db.fetch_vendor(vendor_id).await.unwrap().unwrap();
        assert_eq!(vendor.commission_rate, Rate::from_str("0.2").unwrap());

        set_rate("1.5").await.unwrap();
        let err = sys.db.fetch_vendor(vendor_id).await.unwrap_err();
        info!("Out of range rate: {err}");
        set_rate("-0.1").await.unwrap();
        assert!(sys.db.fetch_vendor(vendor_id).await.is_err());
        tear_down(sys).await;
    });
}

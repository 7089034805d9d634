use actix_web::http::StatusCode;
use dispatch_engine::order_objects::Actor;
use serde_json::{json, Value};

use super::helpers::{setup, tear_down, TestServer};

async fn go_online(server: &TestServer, rider: &Actor) {
    let (status, body) = server.post(rider, "/riders/me/availability", json!({ "available": true })).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["is_available"], true);
}

fn ids(list: &Value) -> Vec<i64> {
    list.as_array().unwrap().iter().map(|o| o["id"].as_i64().unwrap()).collect()
}

#[actix_web::test]
async fn claim_and_deliver() {
    let server = setup().await;
    let tunde = Actor::Rider(server.rider("Tunde", 1.0).await.id);
    let kemi = Actor::Rider(server.rider("Kemi", 2.0).await.id);
    let order_id = server.ready_order().await;

    let (status, available) = server.get(&tunde, "/orders/available").await;
    assert_eq!(status, StatusCode::OK, "{available}");
    assert_eq!(ids(&available), vec![order_id]);
    let (status, _) = server.get(&server.student(), "/orders/available").await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    go_online(&server, &tunde).await;
    go_online(&server, &kemi).await;
    let claim = format!("/orders/{order_id}/claim");
    let (status, order) = server.post(&tunde, &claim, json!({})).await;
    assert_eq!(status, StatusCode::OK, "{order}");
    assert_eq!(order["assigned_rider_id"], tunde.id());
    let (status, body) = server.post(&kemi, &claim, json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "conflict");

    let (status, available) = server.get(&kemi, "/orders/available?page=1&limit=5").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(available, json!([]));
    let (status, body) = server.get(&kemi, "/orders/available?page=9223372036854775807&limit=50").await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert_eq!(body["kind"], "validation");

    // Only the assigned rider can move it
    let (status, _) = server.set_status(&kemi, order_id, "picked_up").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    for next in ["picked_up", "delivered"] {
        let (status, body) = server.set_status(&tunde, order_id, next).await;
        assert_eq!(status, StatusCode::OK, "{body}");
    }

    let (status, mine) = server.get(&tunde, "/riders/me/orders?status=delivered").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&mine), vec![order_id]);
    let (_, mine) = server.get(&tunde, "/riders/me/orders?status=ready").await;
    assert_eq!(mine, json!([]));
    let (status, _) = server.get(&tunde, "/riders/me/orders?status=lost").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, rider) = server.post(&tunde, "/riders/me/location", json!({ "lat": 6.52, "lng": 3.39 })).await;
    assert_eq!(status, StatusCode::OK, "{rider}");
    assert_eq!(rider["total_deliveries"], 1);
    assert!(server.wait_for_notification(&tunde, "Delivery Update").await.is_some());
    tear_down(server).await;
}

#[actix_web::test]
async fn ready_orders_are_dispatched_automatically() {
    let server = setup().await;
    let near = Actor::Rider(server.rider("Near", 0.5).await.id);
    let far = Actor::Rider(server.rider("Far", 3.0).await.id);
    go_online(&server, &near).await;
    go_online(&server, &far).await;

    let order_id = server.ready_order().await;
    let (_, order) = server.get(&server.student(), &format!("/orders/{order_id}")).await;
    assert_eq!(order["assigned_rider_id"], near.id());
    assert!(server.wait_for_notification(&near, "New Delivery").await.is_some());

    // Handing it back passes it to the other rider
    let (status, result) = server.post(&near, &format!("/orders/{order_id}/reject"), json!({})).await;
    assert_eq!(status, StatusCode::OK, "{result}");
    assert_eq!(result["reassigned_to"], far.id());
    assert_eq!(result["order"]["assigned_rider_id"], far.id());

    let (status, _) = server.post(&server.student(), &format!("/orders/{order_id}/reject"), json!({})).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    tear_down(server).await;
}

#[actix_web::test]
async fn a_lone_rider_handing_back_alerts_the_admins() {
    let server = setup().await;
    let rider = Actor::Rider(server.rider("Solo", 1.0).await.id);
    go_online(&server, &rider).await;
    let order_id = server.ready_order().await;

    let (status, result) = server.post(&rider, &format!("/orders/{order_id}/reject"), json!({})).await;
    assert_eq!(status, StatusCode::OK, "{result}");
    assert_eq!(result["reassigned_to"], Value::Null);
    assert_eq!(result["order"]["status"], "ready");
    assert_eq!(result["order"]["assigned_rider_id"], Value::Null);

    let alert = server.wait_for_notification(&Actor::Admin(1), "Manual Assignment Required").await;
    assert!(alert.expect("No admin alert")["body"].as_str().unwrap().contains("has been rejected by riders"));
    tear_down(server).await;
}

#[actix_web::test]
async fn admins_assign_riders_by_hand() {
    let server = setup().await;
    let rider = server.rider("Bola", 1.0).await;
    let order_id = server.place_order().await;
    let path = format!("/orders/{order_id}/assign");

    let (status, _) = server.post(&server.vendor(), &path, json!({ "rider_id": rider.id })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = server.post(&Actor::Rider(rider.id), "/riders/me/availability/toggle", json!({})).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["is_available"], true);

    let (status, order) = server.post(&Actor::Admin(1), &path, json!({ "rider_id": rider.id })).await;
    assert_eq!(status, StatusCode::OK, "{order}");
    assert_eq!(order["status"], "confirmed");
    assert_eq!(order["assigned_rider_id"], rider.id);

    let (status, body) = server.post(&Actor::Admin(1), "/orders/77/assign", json!({ "rider_id": rider.id })).await;
    assert_eq!(status, StatusCode::NOT_FOUND, "{body}");
    tear_down(server).await;
}

#[actix_web::test]
async fn rating_a_delivery() {
    let server = setup().await;
    let rider = Actor::Rider(server.rider("Femi", 1.0).await.id);
    go_online(&server, &rider).await;
    let order_id = server.ready_order().await;
    let rate = format!("/orders/{order_id}/rate");

    let (status, body) = server.post(&server.student(), &rate, json!({ "rating": 4 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    let (status, _) = server.post(&server.vendor(), &rate, json!({ "rating": 4 })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    for next in ["picked_up", "delivered"] {
        let (status, body) = server.set_status(&rider, order_id, next).await;
        assert_eq!(status, StatusCode::OK, "{body}");
    }
    let (status, body) = server.post(&server.student(), &rate, json!({ "rating": 9 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    let (status, review) = server.post(&server.student(), &rate, json!({ "rating": 4, "comment": "Still warm" })).await;
    assert_eq!(status, StatusCode::CREATED, "{review}");
    assert_eq!(review["rider_id"], rider.id());
    let (status, body) = server.post(&server.student(), &rate, json!({ "rating": 5 })).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "conflict");
    tear_down(server).await;
}

#[actix_web::test]
async fn rider_location_is_validated() {
    let server = setup().await;
    let rider = Actor::Rider(server.rider("Dayo", 1.0).await.id);
    let (status, body) = server.post(&rider, "/riders/me/location", json!({ "lat": 123.0, "lng": 3.39 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation");

    let (status, _) = server.post(&Actor::Rider(4242), "/riders/me/location", json!({ "lat": 6.5, "lng": 3.4 })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    tear_down(server).await;
}

use actix_web::{http::StatusCode, test::TestRequest};
use dispatch_engine::{db_types::Money, order_objects::Actor};
use serde_json::{json, Value};

use super::helpers::{as_actor, setup, tear_down};

fn money(v: &Value) -> Money {
    serde_json::from_value(v.clone()).expect("Not a money value")
}

#[actix_web::test]
async fn health_check() {
    let server = setup().await;
    let (status, body) = server.call(TestRequest::get().uri("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("👍️\n".into()));
    tear_down(server).await;
}

#[actix_web::test]
async fn requests_without_an_actor_are_refused() {
    let server = setup().await;
    let req = TestRequest::post().uri("/orders").set_json(server.campus.order_request());
    let (status, body) = server.call(req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["kind"], "authorization");

    let req = TestRequest::get().uri("/orders/1").insert_header(("X-Actor-Role", "janitor")).insert_header(("X-Actor-Id", "1"));
    let (status, _) = server.call(req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    tear_down(server).await;
}

#[actix_web::test]
async fn place_and_fetch_an_order() {
    let server = setup().await;
    let body = serde_json::to_value(server.campus.order_request()).unwrap();
    let (status, order) = server.post(&server.student(), "/orders", body).await;
    assert_eq!(status, StatusCode::CREATED, "{order}");
    assert_eq!(order["status"], "pending");
    assert_eq!(money(&order["subtotal"]), Money::new(2000, 2));
    assert_eq!(money(&order["total_amount"]), Money::new(2350, 2));
    assert_eq!(order["items"].as_array().map(|a| a.len()), Some(2));
    let id = order["id"].as_i64().unwrap();

    let (status, fetched) = server.get(&server.vendor(), &format!("/orders/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["order_number"], order["order_number"]);

    let (status, list) = server.get(&server.student(), "/orders").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().map(|a| a.len()), Some(1));

    let (status, list) = server.get(&Actor::Student(server.campus.student.id + 100), "/orders").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list, json!([]));

    let (status, list) = server.get(&server.student(), "/orders?page=2&limit=1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list, json!([]));
    let (status, body) = server.get(&server.student(), "/orders?page=9223372036854775807").await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert_eq!(body["kind"], "validation");

    let vendor_alert = server.wait_for_notification(&server.vendor(), "New Order").await;
    assert!(vendor_alert.is_some());
    tear_down(server).await;
}

#[actix_web::test]
async fn bad_requests_map_to_client_errors() {
    let server = setup().await;
    let student = server.student();

    // Malformed body
    let req = as_actor(TestRequest::post().uri("/orders"), &student).set_json(json!({ "vendor_id": "one" }));
    let (status, body) = server.call(req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation");

    // No items
    let mut request = server.campus.order_request();
    request.items.clear();
    let (status, body) = server.post(&student, "/orders", serde_json::to_value(request).unwrap()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation");

    // Not a number in the path
    let (status, _) = server.get(&student, "/orders/abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = server.get(&student, "/orders/9999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "not_found");

    // Vendors do not place orders
    let (status, _) =
        server.post(&server.vendor(), "/orders", serde_json::to_value(server.campus.order_request()).unwrap()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    tear_down(server).await;
}

#[actix_web::test]
async fn vendor_moves_the_order_along() {
    let server = setup().await;
    let id = server.place_order().await;
    let vendor = server.vendor();

    let (status, body) = server.set_status(&vendor, id, "ready").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "invalid_transition");

    let (status, body) = server.set_status(&server.student(), id, "confirmed").await;
    assert_eq!(status, StatusCode::FORBIDDEN, "{body}");

    for next in ["confirmed", "preparing", "ready"] {
        let (status, body) = server.set_status(&vendor, id, next).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["status"], next);
    }

    let (status, timeline) = server.get(&server.student(), &format!("/orders/{id}/timeline")).await;
    assert_eq!(status, StatusCode::OK);
    let statuses = timeline.as_array().unwrap().iter().map(|e| e["status"].clone()).collect::<Vec<_>>();
    assert_eq!(statuses, vec![json!("pending"), json!("confirmed"), json!("preparing"), json!("ready")]);

    // Nobody is online, so the admins are asked to step in.
    let alert = server.wait_for_notification(&Actor::Admin(1), "Manual Assignment Required").await;
    let alert = alert.expect("No admin alert");
    assert!(alert["body"].as_str().unwrap().contains("no rider could be auto-assigned"));
    tear_down(server).await;
}

#[actix_web::test]
async fn cancelling_an_order() {
    let server = setup().await;
    let id = server.place_order().await;
    let path = format!("/orders/{id}/cancel");

    let (status, body) = server.post(&Actor::Rider(1), &path, json!({})).await;
    assert_eq!(status, StatusCode::FORBIDDEN, "{body}");

    let (status, body) = server.post(&server.student(), &path, json!({ "reason": "  Changed my mind " })).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["status"], "cancelled");
    assert_eq!(body["cancellation_reason"], "Changed my mind");

    let (status, body) = server.post(&server.student(), &path, json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "invalid_transition");

    // A body is optional
    let id = server.place_order().await;
    let req = as_actor(TestRequest::post().uri(&format!("/orders/{id}/cancel")), &server.vendor());
    let (status, body) = server.call(req).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["cancellation_reason"], Value::Null);
    tear_down(server).await;
}

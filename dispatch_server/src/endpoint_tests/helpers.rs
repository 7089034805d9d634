use std::time::Duration;

use actix_web::{http::StatusCode, test, test::TestRequest, web, App};
use dispatch_engine::{
    db_types::Rider,
    order_objects::Actor,
    test_utils::{
        prepare_env::{drop_database, prepare_test_env, random_db_path},
        seed::{add_rider, km_north, seed_campus, Campus},
    },
    InMemoryGeoIndex,
    OrderFlowApi,
    PlatformConfig,
    SqliteDatabase,
};
use log::debug;
use serde_json::Value;

use crate::{
    auth::{ACTOR_ID_HEADER, ACTOR_ROLE_HEADER},
    notifications::{create_inbox_event_handlers, my_notifications},
    routes::configure,
    server::{json_config, path_config, query_config, DispatchApi},
};

pub struct TestServer {
    pub api: web::Data<DispatchApi>,
    pub db: SqliteDatabase,
    pub campus: Campus,
}

pub async fn setup() -> TestServer {
    let url = random_db_path();
    prepare_test_env(&url).await;
    let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating connection to database");
    let campus = seed_campus(&db).await;
    let handlers = create_inbox_event_handlers(db.clone(), 25);
    let producers = handlers.producers();
    handlers.start_handlers().await;
    let api = OrderFlowApi::new(db.clone(), InMemoryGeoIndex::new(), producers, PlatformConfig::default());
    TestServer { api: web::Data::new(api), db, campus }
}

pub async fn tear_down(server: TestServer) {
    let TestServer { api, mut db, .. } = server;
    drop(api);
    drop_database(&mut db).await;
}

impl TestServer {
    pub fn student(&self) -> Actor {
        Actor::Student(self.campus.student.id)
    }

    pub fn vendor(&self) -> Actor {
        Actor::Vendor(self.campus.vendor.id)
    }

    /// A rider in the database who is not yet available.
    pub async fn rider(&self, name: &str, km: f64) -> Rider {
        add_rider(&self.db, name, Some(km_north(km)), false).await
    }

    /// Sends `req` through a fresh app instance and returns the status and the body. Bodies that are not JSON come
    /// back as a string value.
    pub async fn call(&self, req: TestRequest) -> (StatusCode, Value) {
        let app = App::new()
            .app_data(self.api.clone())
            .app_data(web::Data::new(self.db.clone()))
            .app_data(json_config())
            .app_data(query_config())
            .app_data(path_config())
            .service(my_notifications)
            .configure(configure::<SqliteDatabase, InMemoryGeoIndex>);
        let service = test::init_service(app).await;
        debug!("Making request");
        let res = test::call_service(&service, req.to_request()).await;
        let status = res.status();
        let body = test::read_body(res).await;
        let value = match serde_json::from_slice::<Value>(&body) {
            Ok(v) => v,
            Err(_) => Value::String(String::from_utf8_lossy(&body).into_owned()),
        };
        (status, value)
    }

    pub async fn get(&self, actor: &Actor, path: &str) -> (StatusCode, Value) {
        self.call(as_actor(TestRequest::get().uri(path), actor)).await
    }

    pub async fn post(&self, actor: &Actor, path: &str, body: Value) -> (StatusCode, Value) {
        self.call(as_actor(TestRequest::post().uri(path), actor).set_json(body)).await
    }

    /// Places the seeded order as the seeded student and returns its id.
    pub async fn place_order(&self) -> i64 {
        let body = serde_json::to_value(self.campus.order_request()).unwrap();
        let (status, order) = self.post(&self.student(), "/orders", body).await;
        assert_eq!(status, StatusCode::CREATED, "{order}");
        order["id"].as_i64().unwrap()
    }

    /// Takes a new order through to `ready` as the vendor.
    pub async fn ready_order(&self) -> i64 {
        let id = self.place_order().await;
        for status in ["confirmed", "preparing", "ready"] {
            let (code, body) = self.set_status(&self.vendor(), id, status).await;
            assert_eq!(code, StatusCode::OK, "{body}");
        }
        id
    }

    pub async fn set_status(&self, actor: &Actor, order_id: i64, status: &str) -> (StatusCode, Value) {
        self.post(actor, &format!("/orders/{order_id}/status"), serde_json::json!({ "status": status })).await
    }

    /// Notifications are written by a background task, so poll for a moment.
    pub async fn wait_for_notification(&self, actor: &Actor, title: &str) -> Option<Value> {
        for _ in 0..100 {
            let (_, inbox) = self.get(actor, "/notifications").await;
            let found = inbox.as_array().and_then(|list| list.iter().find(|n| n["title"] == title).cloned());
            if found.is_some() {
                return found;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        None
    }
}

pub fn as_actor(req: TestRequest, actor: &Actor) -> TestRequest {
    req.insert_header((ACTOR_ROLE_HEADER, actor.role().to_string())).insert_header((ACTOR_ID_HEADER, actor.id().to_string()))
}

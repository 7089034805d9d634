#![allow(dead_code)]
use std::{
    future::Future,
    pin::Pin,
    sync::{Arc, Mutex},
    time::Duration,
};

use dispatch_engine::{
    db_types::{Coordinates, Order, Rider},
    events::{EventHandlers, EventHooks, Notification, NotificationEvent, Recipient},
    order_objects::{Actor, OrderDetails},
    test_utils::{
        prepare_env::{drop_database, prepare_test_env, random_db_path},
        seed::{add_rider, seed_campus, Campus},
    },
    InMemoryGeoIndex,
    OrderFlowApi,
    OrderManagement,
    PlatformConfig,
    SqliteDatabase,
};
use log::*;

pub type Api = OrderFlowApi<SqliteDatabase, InMemoryGeoIndex>;

pub struct TestSystem {
    pub api: Api,
    pub db: SqliteDatabase,
    pub geo: InMemoryGeoIndex,
    pub campus: Campus,
    pub inbox: Inbox,
}

/// Collects every notification the engine publishes.
#[derive(Clone, Default)]
pub struct Inbox {
    received: Arc<Mutex<Vec<Notification>>>,
}

impl Inbox {
    pub fn hooks(&self) -> EventHooks {
        let mut hooks = EventHooks::default();
        let received = Arc::clone(&self.received);
        hooks.on_notification(move |ev: NotificationEvent| {
            let received = Arc::clone(&received);
            Box::pin(async move {
                trace!("🪝️ {} <- {}", ev.notification.recipient, ev.notification.title);
                received.lock().unwrap().push(ev.notification);
            }) as Pin<Box<dyn Future<Output = ()> + Send>>
        });
        hooks
    }

    pub fn all(&self) -> Vec<Notification> {
        self.received.lock().unwrap().clone()
    }

    pub fn count_for(&self, recipient: Recipient, title: &str) -> usize {
        self.all().iter().filter(|n| n.recipient == recipient && n.title == title).count()
    }

    /// Handlers run on their own tasks, so give them a moment to land.
    pub async fn wait_for(&self, recipient: Recipient, title: &str) -> Option<Notification> {
        for _ in 0..100 {
            let found = self.all().into_iter().find(|n| n.recipient == recipient && n.title == title);
            if found.is_some() {
                return found;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        None
    }
}

pub async fn setup() -> TestSystem {
    setup_with_config(PlatformConfig::default()).await
}

pub async fn setup_with_config(config: PlatformConfig) -> TestSystem {
    let url = random_db_path();
    prepare_test_env(&url).await;
    let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database");
    let campus = seed_campus(&db).await;
    let geo = InMemoryGeoIndex::new();
    let inbox = Inbox::default();
    let handlers = EventHandlers::new(25, inbox.hooks());
    let producers = handlers.producers();
    handlers.start_handlers().await;
    let api = OrderFlowApi::new(db.clone(), geo.clone(), producers, config);
    TestSystem { api, db, geo, campus, inbox }
}

pub async fn tear_down(sys: TestSystem) {
    let TestSystem { api, mut db, .. } = sys;
    drop(api);
    drop_database(&mut db).await;
}

impl TestSystem {
    pub fn student(&self) -> Actor {
        Actor::Student(self.campus.student.id)
    }

    pub fn vendor(&self) -> Actor {
        Actor::Vendor(self.campus.vendor.id)
    }

    pub async fn place_order(&self) -> OrderDetails {
        self.api.create_order(&self.student(), self.campus.order_request()).await.expect("Error placing order")
    }

    /// Places an order and walks it through the vendor's steps up to `preparing`.
    pub async fn preparing_order(&self) -> Order {
        use dispatch_engine::db_types::OrderStatusType::*;
        let order = self.place_order().await.order;
        for status in [Confirmed, Preparing] {
            self.api.transition(&self.vendor(), order.id, status, None).await.expect("Error advancing order");
        }
        self.fetch_order(order.id).await
    }

    pub async fn fetch_order(&self, order_id: i64) -> Order {
        self.db.fetch_order(order_id).await.expect("Error fetching order").expect("Order does not exist")
    }

    pub async fn fetch_rider(&self, rider_id: i64) -> Rider {
        self.db.fetch_rider(rider_id).await.expect("Error fetching rider").expect("Rider does not exist")
    }

    /// Adds a rider that is available at `location` and known to the geo index.
    pub async fn online_rider(&self, name: &str, location: Coordinates) -> Rider {
        let rider = add_rider(&self.db, name, Some(location), true).await;
        self.api.dispatcher().set_availability(rider.id, true).await.expect("Error bringing rider online")
    }
}

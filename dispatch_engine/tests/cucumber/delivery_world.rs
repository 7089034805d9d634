use std::collections::HashMap;

use cucumber::World;
use dispatch_engine::{
    db_types::Order,
    events::EventProducers,
    order_objects::Actor,
    test_utils::{
        prepare_env::{create_database, random_db_path, run_migrations},
        seed::{seed_campus, Campus},
    },
    InMemoryGeoIndex,
    OrderFlowApi,
    OrderFlowError,
    PlatformConfig,
    SqliteDatabase,
};
use log::*;

#[derive(Default, Debug, World)]
pub struct DeliveryWorld {
    pub system: Option<DeliverySystem>,
    pub riders: HashMap<String, i64>,
    pub order: Option<Order>,
    pub last_error: Option<OrderFlowError>,
}

#[derive(Debug)]
pub struct DeliverySystem {
    pub db_path: String,
    pub db: SqliteDatabase,
    pub geo: InMemoryGeoIndex,
    pub campus: Campus,
    pub api: OrderFlowApi<SqliteDatabase, InMemoryGeoIndex>,
}

impl DeliveryWorld {
    pub fn system(&self) -> &DeliverySystem {
        self.system.as_ref().expect("Delivery system not initialised")
    }

    pub fn api(&self) -> &OrderFlowApi<SqliteDatabase, InMemoryGeoIndex> {
        &self.system().api
    }

    pub fn order_id(&self) -> i64 {
        self.order.as_ref().expect("No order has been placed").id
    }

    pub fn rider_id(&self, name: &str) -> i64 {
        *self.riders.get(name).unwrap_or_else(|| panic!("Rider {name} does not exist"))
    }

    pub fn student(&self) -> Actor {
        Actor::Student(self.system().campus.student.id)
    }

    pub fn vendor(&self) -> Actor {
        Actor::Vendor(self.system().campus.vendor.id)
    }

    /// Keeps the latest order on success, the error otherwise.
    pub fn record(&mut self, result: Result<Order, OrderFlowError>) {
        match result {
            Ok(order) => {
                self.order = Some(order);
                self.last_error = None;
            },
            Err(e) => {
                debug!("🚀️ Request failed: {e}");
                self.last_error = Some(e);
            },
        }
    }
}

impl DeliverySystem {
    pub async fn new() -> Self {
        let db_path = random_db_path();
        create_database(&db_path).await;
        run_migrations(&db_path).await;
        let db = SqliteDatabase::new_with_url(&db_path, 5).await.expect("Error creating connection to database");
        debug!("🚀️ Created database: {db_path}");
        let campus = seed_campus(&db).await;
        let geo = InMemoryGeoIndex::new();
        let api = OrderFlowApi::new(db.clone(), geo.clone(), EventProducers::default(), PlatformConfig::default());
        Self { db_path, db, geo, campus, api }
    }
}

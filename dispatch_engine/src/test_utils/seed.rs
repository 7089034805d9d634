//! A small campus to run orders against.
use std::str::FromStr;

use crate::{
    db_types::{Coordinates, MenuItem, Money, NewMenuItem, NewRider, NewVendor, PaymentMethod, Rate, Rider, Student, Vendor},
    engine_api::order_objects::{NewOrderRequest, OrderItemRequest},
    SqliteDatabase,
};

pub const CAMPUS_LAT: f64 = 6.5158;
pub const CAMPUS_LNG: f64 = 3.3898;

/// The delivery point every seeded order uses.
pub fn campus_centre() -> Coordinates {
    Coordinates::new(CAMPUS_LAT, CAMPUS_LNG)
}

/// A point roughly `km` kilometres due north of the campus centre.
pub fn km_north(km: f64) -> Coordinates {
    Coordinates::new(CAMPUS_LAT + km / 111.195, CAMPUS_LNG)
}

#[derive(Debug, Clone)]
pub struct Campus {
    pub student: Student,
    pub vendor: Vendor,
    /// 5.00, no discount
    pub jollof: MenuItem,
    /// 12.00, discounted to 10.00
    pub suya: MenuItem,
}

impl Campus {
    /// Two portions of jollof and one suya: a 20.00 subtotal.
    pub fn order_request(&self) -> NewOrderRequest {
        NewOrderRequest {
            vendor_id: self.vendor.id,
            items: vec![OrderItemRequest::new(self.jollof.id, 2), OrderItemRequest::new(self.suya.id, 1)],
            delivery_address: "Moremi Hall, Room 114".into(),
            delivery_lat: CAMPUS_LAT,
            delivery_lng: CAMPUS_LNG,
            delivery_block: Some("B".into()),
            delivery_dorm: Some("Moremi".into()),
            customer_phone: "08031234567".into(),
            customer_id_number: None,
            special_instructions: None,
            payment_method: PaymentMethod::Cash,
        }
    }
}

/// Seeds a student and a vendor (15% commission, no minimum order) with two menu items.
pub async fn seed_campus(db: &SqliteDatabase) -> Campus {
    let student = db.create_student("Ada Obi", Some("08031234567")).await.expect("Error creating student");
    let rate = Rate::from_str("0.15").expect("Invalid rate");
    let vendor = db.create_vendor(NewVendor::new("Mama Put", rate, Money::zero())).await.expect("Error creating vendor");
    let jollof = db
        .create_menu_item(NewMenuItem {
            vendor_id: vendor.id,
            name: "Jollof rice".into(),
            price: Money::new(500, 2),
            discount_price: None,
            is_available: true,
        })
        .await
        .expect("Error creating menu item");
    let suya = db
        .create_menu_item(NewMenuItem {
            vendor_id: vendor.id,
            name: "Suya".into(),
            price: Money::new(1200, 2),
            discount_price: Some(Money::new(1000, 2)),
            is_available: true,
        })
        .await
        .expect("Error creating menu item");
    Campus { student, vendor, jollof, suya }
}

pub async fn add_rider(db: &SqliteDatabase, name: &str, location: Option<Coordinates>, is_available: bool) -> Rider {
    db.create_rider(NewRider { name: name.into(), is_available, location }).await.expect("Error creating rider")
}

use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
pub use dispatch_common::{Money, Rate};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Conversion error: {0}")]
pub struct ConversionError(String);

impl From<String> for ConversionError {
    fn from(value: String) -> Self {
        Self(value)
    }
}

//--------------------------------------   OrderStatusType     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatusType {
    /// The order has been placed and is waiting for the vendor to accept it.
    Pending,
    /// The vendor has accepted the order.
    Confirmed,
    /// The vendor is preparing the order.
    Preparing,
    /// The order is ready to be collected by a rider.
    Ready,
    /// A rider has collected the order and is on the way.
    PickedUp,
    /// The order has been handed over to the customer.
    Delivered,
    /// The order was cancelled by the customer, the vendor or an admin.
    Cancelled,
    /// The vendor declined the order.
    Rejected,
}

impl OrderStatusType {
    pub const ALL: [OrderStatusType; 8] = [
        Self::Pending,
        Self::Confirmed,
        Self::Preparing,
        Self::Ready,
        Self::PickedUp,
        Self::Delivered,
        Self::Cancelled,
        Self::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Preparing => "preparing",
            Self::Ready => "ready",
            Self::PickedUp => "picked_up",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
            Self::Rejected => "rejected",
        }
    }

    /// Terminal orders never change status again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled | Self::Rejected)
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s.trim())
            .ok_or_else(|| ConversionError(format!("Invalid order status: {s}")))
    }
}

//--------------------------------------    PaymentMethod      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Card,
    Wallet,
}

impl Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentMethod::Cash => write!(f, "cash"),
            PaymentMethod::Card => write!(f, "card"),
            PaymentMethod::Wallet => write!(f, "wallet"),
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cash" => Ok(Self::Cash),
            "card" => Ok(Self::Card),
            "wallet" => Ok(Self::Wallet),
            _ => Err(ConversionError(format!("Invalid payment method: {s}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

//--------------------------------------     Coordinates       ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite() &&
            self.lng.is_finite() &&
            (-90.0..=90.0).contains(&self.lat) &&
            (-180.0..=180.0).contains(&self.lng)
    }
}

impl Display for Coordinates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.5}, {:.5})", self.lat, self.lng)
    }
}

//--------------------------------------        Order          ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub order_number: String,
    pub student_id: i64,
    pub vendor_id: i64,
    pub assigned_rider_id: Option<i64>,
    pub status: OrderStatusType,
    pub subtotal: Money,
    pub delivery_fee: Money,
    pub service_fee: Money,
    pub total_amount: Money,
    pub commission_amount: Money,
    pub vendor_earnings: Money,
    pub rider_earnings: Money,
    pub delivery_address: String,
    pub delivery_lat: f64,
    pub delivery_lng: f64,
    pub delivery_block: Option<String>,
    pub delivery_dorm: Option<String>,
    pub customer_phone: String,
    pub customer_id_number: Option<String>,
    pub special_instructions: Option<String>,
    pub cancellation_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub prepared_at: Option<DateTime<Utc>>,
    pub ready_at: Option<DateTime<Utc>>,
    pub picked_up_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Order {
    pub fn delivery_point(&self) -> Coordinates {
        Coordinates::new(self.delivery_lat, self.delivery_lng)
    }
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub menu_item_id: i64,
    pub quantity: i64,
    pub unit_price: Money,
    pub subtotal: Money,
    pub special_instructions: Option<String>,
}

/// A fully priced order, ready to be persisted together with its line items and a pending payment.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_number: String,
    pub transaction_id: String,
    pub student_id: i64,
    pub vendor_id: i64,
    pub subtotal: Money,
    pub delivery_fee: Money,
    pub service_fee: Money,
    pub total_amount: Money,
    pub commission_amount: Money,
    pub vendor_earnings: Money,
    pub rider_earnings: Money,
    pub delivery_address: String,
    pub delivery_point: Coordinates,
    pub delivery_block: Option<String>,
    pub delivery_dorm: Option<String>,
    pub customer_phone: String,
    pub customer_id_number: Option<String>,
    pub special_instructions: Option<String>,
    pub payment_method: PaymentMethod,
    pub items: Vec<NewOrderItem>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub menu_item_id: i64,
    pub quantity: i64,
    pub unit_price: Money,
    pub subtotal: Money,
    pub special_instructions: Option<String>,
}

//--------------------------------------       Payment         ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Payment {
    pub id: i64,
    pub order_id: i64,
    pub amount: Money,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub transaction_id: String,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------   Parties & catalog   ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Vendor {
    pub id: i64,
    pub business_name: String,
    pub is_open: bool,
    pub commission_rate: Rate,
    pub minimum_order: Money,
    pub total_orders: i64,
    pub total_revenue: Money,
    pub total_earnings: Money,
    pub current_balance: Money,
    pub rating: f64,
    pub review_count: i64,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewVendor {
    pub business_name: String,
    pub commission_rate: Rate,
    pub minimum_order: Money,
    pub is_open: bool,
    pub location: Option<Coordinates>,
}

impl NewVendor {
    pub fn new<S: Into<String>>(business_name: S, commission_rate: Rate, minimum_order: Money) -> Self {
        Self { business_name: business_name.into(), commission_rate, minimum_order, is_open: true, location: None }
    }
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Rider {
    pub id: i64,
    pub name: String,
    pub is_available: bool,
    pub current_lat: Option<f64>,
    pub current_lng: Option<f64>,
    pub last_location_update: Option<DateTime<Utc>>,
    pub total_deliveries: i64,
    pub total_earnings: Money,
    pub current_balance: Money,
    pub rating: f64,
    pub review_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Rider {
    /// The rider's last reported position, if it has ever sent one.
    pub fn location(&self) -> Option<Coordinates> {
        match (self.current_lat, self.current_lng) {
            (Some(lat), Some(lng)) => Some(Coordinates::new(lat, lng)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewRider {
    pub name: String,
    pub is_available: bool,
    pub location: Option<Coordinates>,
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Student {
    pub id: i64,
    pub full_name: String,
    pub phone: Option<String>,
    pub total_orders: i64,
    pub total_spent: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: i64,
    pub vendor_id: i64,
    pub name: String,
    pub price: Money,
    pub discount_price: Option<Money>,
    pub is_available: bool,
}

impl MenuItem {
    /// The price a customer pays right now: the discount price when there is a positive one, otherwise the list price.
    pub fn effective_price(&self) -> Money {
        match self.discount_price {
            Some(discount) if discount.is_positive() => discount,
            _ => self.price,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewMenuItem {
    pub vendor_id: i64,
    pub name: String,
    pub price: Money,
    pub discount_price: Option<Money>,
    pub is_available: bool,
}

//--------------------------------------        Review         ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Review {
    pub id: i64,
    pub order_id: i64,
    pub student_id: i64,
    pub vendor_id: i64,
    pub rider_id: Option<i64>,
    pub rating: i64,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewReview {
    pub order_id: i64,
    pub student_id: i64,
    pub vendor_id: i64,
    pub rider_id: Option<i64>,
    pub rating: i64,
    pub comment: Option<String>,
}

//--------------------------------------     Notification      ---------------------------------------------------------
/// A persisted notification. `recipient_id` is `None` for messages on the admin channel.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub id: i64,
    pub recipient_kind: String,
    pub recipient_id: Option<i64>,
    pub title: String,
    pub body: String,
    pub category: String,
    pub reference_id: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn status_tokens_round_trip() {
        for status in OrderStatusType::ALL {
            assert_eq!(status.to_string().parse::<OrderStatusType>().unwrap(), status);
        }
        assert_eq!(OrderStatusType::PickedUp.as_str(), "picked_up");
        assert!("PICKED_UP".parse::<OrderStatusType>().is_err());
        assert!("shipped".parse::<OrderStatusType>().is_err());
    }

    #[test]
    fn terminal_statuses() {
        let terminal = OrderStatusType::ALL.into_iter().filter(|s| s.is_terminal()).collect::<Vec<_>>();
        assert_eq!(terminal, vec![OrderStatusType::Delivered, OrderStatusType::Cancelled, OrderStatusType::Rejected]);
    }

    #[test]
    fn effective_price_prefers_positive_discount() {
        let mut item = MenuItem {
            id: 1,
            vendor_id: 1,
            name: "Jollof rice".into(),
            price: Money::new(500, 2),
            discount_price: Some(Money::new(450, 2)),
            is_available: true,
        };
        assert_eq!(item.effective_price(), Money::new(450, 2));
        item.discount_price = Some(Money::zero());
        assert_eq!(item.effective_price(), Money::new(500, 2));
        item.discount_price = None;
        assert_eq!(item.effective_price(), Money::new(500, 2));
    }

    #[test]
    fn coordinate_validation() {
        assert!(Coordinates::new(6.5244, 3.3792).is_valid());
        assert!(!Coordinates::new(91.0, 0.0).is_valid());
        assert!(!Coordinates::new(0.0, -180.5).is_valid());
        assert!(!Coordinates::new(f64::NAN, 0.0).is_valid());
    }

    #[test]
    fn payment_methods_parse_case_insensitively() {
        assert_eq!("Card".parse::<PaymentMethod>().unwrap(), PaymentMethod::Card);
        assert!("cheque".parse::<PaymentMethod>().is_err());
    }
}

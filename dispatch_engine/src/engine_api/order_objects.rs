use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db_types::{ConversionError, Order, OrderItem, OrderStatusType, PaymentMethod};

//--------------------------------------        Actors         ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Vendor,
    Rider,
    Admin,
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Student => write!(f, "student"),
            Role::Vendor => write!(f, "vendor"),
            Role::Rider => write!(f, "rider"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

impl FromStr for Role {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "student" => Ok(Role::Student),
            "vendor" => Ok(Role::Vendor),
            "rider" => Ok(Role::Rider),
            "admin" => Ok(Role::Admin),
            _ => Err(ConversionError::from(format!("Unknown role: {s}"))),
        }
    }
}

/// The party making a request, identified by the id of its student, vendor, rider or admin record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "role", content = "id", rename_all = "lowercase")]
pub enum Actor {
    Student(i64),
    Vendor(i64),
    Rider(i64),
    Admin(i64),
}

impl Actor {
    pub fn new(role: Role, id: i64) -> Self {
        match role {
            Role::Student => Actor::Student(id),
            Role::Vendor => Actor::Vendor(id),
            Role::Rider => Actor::Rider(id),
            Role::Admin => Actor::Admin(id),
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Actor::Student(_) => Role::Student,
            Actor::Vendor(_) => Role::Vendor,
            Actor::Rider(_) => Role::Rider,
            Actor::Admin(_) => Role::Admin,
        }
    }

    pub fn id(&self) -> i64 {
        match self {
            Actor::Student(id) | Actor::Vendor(id) | Actor::Rider(id) | Actor::Admin(id) => *id,
        }
    }
}

impl Display for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} #{}", self.role(), self.id())
    }
}

//--------------------------------------       Requests        ---------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItemRequest {
    pub menu_item_id: i64,
    pub quantity: i64,
    #[serde(default)]
    pub special_instructions: Option<String>,
}

impl OrderItemRequest {
    pub fn new(menu_item_id: i64, quantity: i64) -> Self {
        Self { menu_item_id, quantity, special_instructions: None }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrderRequest {
    pub vendor_id: i64,
    pub items: Vec<OrderItemRequest>,
    pub delivery_address: String,
    pub delivery_lat: f64,
    pub delivery_lng: f64,
    #[serde(default)]
    pub delivery_block: Option<String>,
    #[serde(default)]
    pub delivery_dorm: Option<String>,
    pub customer_phone: String,
    #[serde(default)]
    pub customer_id_number: Option<String>,
    #[serde(default)]
    pub special_instructions: Option<String>,
    pub payment_method: PaymentMethod,
}

//--------------------------------------       Responses       ---------------------------------------------------------
/// An order together with its line items.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDetails {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingEvent {
    pub status: OrderStatusType,
    pub timestamp: DateTime<Utc>,
    pub note: String,
}

impl TrackingEvent {
    pub fn new<S: Into<String>>(status: OrderStatusType, timestamp: DateTime<Utc>, note: S) -> Self {
        Self { status, timestamp, note: note.into() }
    }
}

//--------------------------------------        Queries        ---------------------------------------------------------
pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrderQueryFilter {
    pub student_id: Option<i64>,
    pub vendor_id: Option<i64>,
    pub rider_id: Option<i64>,
    /// Only orders without an assigned rider.
    #[serde(default)]
    pub unassigned: bool,
    pub status: Option<Vec<OrderStatusType>>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl OrderQueryFilter {
    pub fn with_student_id(mut self, student_id: i64) -> Self {
        self.student_id = Some(student_id);
        self
    }

    pub fn with_vendor_id(mut self, vendor_id: i64) -> Self {
        self.vendor_id = Some(vendor_id);
        self
    }

    pub fn with_rider_id(mut self, rider_id: i64) -> Self {
        self.rider_id = Some(rider_id);
        self
    }

    pub fn unassigned(mut self) -> Self {
        self.unassigned = true;
        self
    }

    pub fn with_status(mut self, status: OrderStatusType) -> Self {
        self.status.get_or_insert_with(Vec::new).push(status);
        self
    }

    pub fn with_page(mut self, limit: i64, offset: i64) -> Self {
        self.limit = Some(limit);
        self.offset = Some(offset);
        self
    }

    /// Pages by page number, starting at 1. Missing values give the first page of [`DEFAULT_PAGE_SIZE`] orders. The
    /// page size is clamped to `1..=MAX_PAGE_SIZE`, and a page number whose offset does not fit in an `i64` is an error.
    pub fn with_page_number(self, page: Option<i64>, limit: Option<i64>) -> Result<Self, ConversionError> {
        let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        let page = page.unwrap_or(1).max(1);
        let offset = (page - 1)
            .checked_mul(limit)
            .ok_or_else(|| ConversionError::from(format!("Page {page} is out of range for {limit} orders per page")))?;
        Ok(self.with_page(limit, offset))
    }

    /// True if the filter does not restrict the result set at all (paging aside).
    pub fn is_empty(&self) -> bool {
        self.student_id.is_none() &&
            self.vendor_id.is_none() &&
            self.rider_id.is_none() &&
            !self.unassigned &&
            self.status.as_ref().map(|s| s.is_empty()).unwrap_or(true)
    }
}

use std::fmt::Display;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    db_types::{ConversionError, Money, OrderStatusType},
    traits::{DeliveryDatabaseError, GeoIndexError},
};

/// The stable classification of an [`OrderFlowError`]. Callers should branch on this, not on the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed input, caught before anything was changed.
    Validation,
    NotFound,
    Authorization,
    /// The order's current status does not allow the request.
    InvalidTransition,
    /// Lost a race with a concurrent request.
    Conflict,
    /// No rider could be found, the order is too small, or the vendor is closed.
    Capacity,
    /// Storage or geo index failure.
    Backend,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Authorization => "authorization",
            ErrorKind::InvalidTransition => "invalid_transition",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Capacity => "capacity",
            ErrorKind::Backend => "backend",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Error)]
pub enum OrderFlowError {
    #[error("Invalid request. {0}")]
    ValidationError(String),
    #[error("{0} does not exist")]
    NotFound(String),
    #[error("Not permitted. {0}")]
    AuthorizationError(String),
    #[error("An order cannot move from {from} to {to}")]
    InvalidTransition { from: OrderStatusType, to: OrderStatusType },
    #[error("The order is {0}, and {0} orders cannot change status")]
    TerminalState(OrderStatusType),
    #[error("The order is {0}, so it cannot be assigned to a rider")]
    NotReady(OrderStatusType),
    #[error("Order #{0} already has a rider assigned")]
    AlreadyAssigned(i64),
    #[error("The request lost a race with another update. {0}")]
    Conflict(String),
    #[error("No rider is available to deliver order #{0}")]
    NoRiderAvailable(i64),
    #[error("The subtotal of {subtotal} is below this vendor's minimum order of {minimum}")]
    BelowMinimumOrder { subtotal: Money, minimum: Money },
    #[error("Vendor #{0} is not accepting orders right now")]
    VendorClosed(i64),
    #[error("{0}")]
    DatabaseError(#[from] DeliveryDatabaseError),
    #[error("{0}")]
    GeoIndexError(#[from] GeoIndexError),
}

impl From<ConversionError> for OrderFlowError {
    fn from(e: ConversionError) -> Self {
        Self::ValidationError(e.to_string())
    }
}

impl OrderFlowError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ValidationError(_) => ErrorKind::Validation,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::AuthorizationError(_) => ErrorKind::Authorization,
            Self::InvalidTransition { .. } | Self::TerminalState(_) | Self::NotReady(_) => ErrorKind::InvalidTransition,
            Self::AlreadyAssigned(_) | Self::Conflict(_) => ErrorKind::Conflict,
            Self::NoRiderAvailable(_) | Self::BelowMinimumOrder { .. } | Self::VendorClosed(_) => ErrorKind::Capacity,
            Self::DatabaseError(_) | Self::GeoIndexError(_) => ErrorKind::Backend,
        }
    }

    pub fn order_not_found(order_id: i64) -> Self {
        Self::NotFound(format!("Order #{order_id}"))
    }

    pub fn rider_not_found(rider_id: i64) -> Self {
        Self::NotFound(format!("Rider #{rider_id}"))
    }
}

//! The order lifecycle rules.
//!
//! ```text
//! pending   -> confirmed | rejected | cancelled
//! confirmed -> preparing | cancelled
//! preparing -> ready | cancelled
//! ready     -> picked_up
//! picked_up -> delivered
//! ```
//!
//! Who may set what:
//!
//! | Role    | Targets                                   | Scope                        |
//! |---------|-------------------------------------------|------------------------------|
//! | vendor  | confirmed, preparing, ready, rejected     | its own orders               |
//! | rider   | picked_up, delivered                      | orders assigned to it        |
//! | admin   | any                                       | any order                    |
//! | student | none (students use cancellation instead)  |                              |
//!
//! Authorization is checked before the transition table. Admins bypass authorization, never the table.
use crate::{
    db_types::{Order, OrderStatusType},
    engine_api::{
        errors::OrderFlowError,
        order_objects::{Actor, Role},
    },
    traits::StatusChange,
};

use OrderStatusType::*;

/// The statuses an order may move to from `from`. Terminal statuses have none.
pub fn allowed_targets(from: OrderStatusType) -> &'static [OrderStatusType] {
    match from {
        Pending => &[Confirmed, Rejected, Cancelled],
        Confirmed => &[Preparing, Cancelled],
        Preparing => &[Ready, Cancelled],
        Ready => &[PickedUp],
        PickedUp => &[Delivered],
        Delivered | Cancelled | Rejected => &[],
    }
}

pub fn check_transition(from: OrderStatusType, to: OrderStatusType) -> Result<(), OrderFlowError> {
    let targets = allowed_targets(from);
    if targets.is_empty() {
        return Err(OrderFlowError::TerminalState(from));
    }
    if !targets.contains(&to) {
        return Err(OrderFlowError::InvalidTransition { from, to });
    }
    Ok(())
}

/// The statuses a role may set, or `None` if the role may set anything.
pub fn permitted_targets(role: Role) -> Option<&'static [OrderStatusType]> {
    match role {
        Role::Vendor => Some(&[Confirmed, Preparing, Ready, Rejected]),
        Role::Rider => Some(&[PickedUp, Delivered]),
        Role::Admin => None,
        Role::Student => Some(&[]),
    }
}

pub fn authorize_transition(actor: &Actor, order: &Order, to: OrderStatusType) -> Result<(), OrderFlowError> {
    match actor {
        Actor::Admin(_) => return Ok(()),
        Actor::Student(_) => {
            return Err(OrderFlowError::AuthorizationError(
                "Students cannot change an order's status. Use cancellation instead.".into(),
            ))
        },
        Actor::Vendor(id) if order.vendor_id != *id => {
            return Err(OrderFlowError::AuthorizationError(format!(
                "Order #{} does not belong to vendor #{id}",
                order.id
            )))
        },
        Actor::Rider(id) if order.assigned_rider_id != Some(*id) => {
            return Err(OrderFlowError::AuthorizationError(format!(
                "Order #{} is not assigned to rider #{id}",
                order.id
            )))
        },
        _ => {},
    }
    let permitted = permitted_targets(actor.role()).map(|p| p.contains(&to)).unwrap_or(true);
    if !permitted {
        return Err(OrderFlowError::AuthorizationError(format!("A {} may not set an order to {to}", actor.role())));
    }
    Ok(())
}

/// Cancellation is open to the student who placed the order, its vendor and admins, while the order is still pending
/// or confirmed.
pub fn authorize_cancellation(actor: &Actor, order: &Order) -> Result<(), OrderFlowError> {
    let allowed = match actor {
        Actor::Student(id) => order.student_id == *id,
        Actor::Vendor(id) => order.vendor_id == *id,
        Actor::Admin(_) => true,
        Actor::Rider(_) => false,
    };
    if !allowed {
        return Err(OrderFlowError::AuthorizationError(format!("{actor} may not cancel order #{}", order.id)));
    }
    if !matches!(order.status, Pending | Confirmed) {
        return Err(OrderFlowError::InvalidTransition { from: order.status, to: Cancelled });
    }
    Ok(())
}

/// Students see their own orders, vendors theirs, riders the orders assigned to them, and admins everything.
pub fn can_view(actor: &Actor, order: &Order) -> bool {
    match actor {
        Actor::Student(id) => order.student_id == *id,
        Actor::Vendor(id) => order.vendor_id == *id,
        Actor::Rider(id) => order.assigned_rider_id == Some(*id),
        Actor::Admin(_) => true,
    }
}

/// Describes the write for a transition that has already been validated, with the side effects it entails.
pub fn plan_status_change(order: &Order, to: OrderStatusType, reason: Option<String>) -> StatusChange {
    let change = StatusChange::new(order.id, order.status, to);
    match to {
        Delivered => change.releasing_rider().settling(),
        Cancelled | Rejected => change.with_reason(reason).releasing_rider(),
        _ => change,
    }
}

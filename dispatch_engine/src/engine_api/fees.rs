//! Order pricing.
//!
//! Everything here is exact decimal arithmetic. Nothing is rounded; amounts are rounded only when they are displayed,
//! so that totals aggregated over many orders never drift.
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{MenuItem, Money, Vendor},
    engine_api::{errors::OrderFlowError, platform_config::PlatformConfig},
};

/// A line item with its price fixed at the moment of ordering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricedLine {
    pub menu_item_id: i64,
    pub quantity: i64,
    pub unit_price: Money,
    pub subtotal: Money,
}

impl PricedLine {
    pub fn new(item: &MenuItem, quantity: i64) -> Self {
        let unit_price = item.effective_price();
        Self { menu_item_id: item.id, quantity, unit_price, subtotal: unit_price * quantity }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeBreakdown {
    pub lines: Vec<PricedLine>,
    pub subtotal: Money,
    pub delivery_fee: Money,
    pub service_fee: Money,
    pub commission: Money,
    pub vendor_earnings: Money,
    pub rider_earnings: Money,
    pub total: Money,
}

/// Prices an order.
///
/// * each line costs the item's effective price (discount price if positive, else list price) times the quantity,
/// * the vendor's minimum order applies to the subtotal,
/// * the service fee and commission are fractions of the subtotal; the vendor keeps the rest of the subtotal,
/// * the rider earns a fraction of the flat delivery fee,
/// * the student pays subtotal + delivery fee + service fee.
pub fn compute_fees(
    items: &[(MenuItem, i64)],
    vendor: &Vendor,
    config: &PlatformConfig,
) -> Result<FeeBreakdown, OrderFlowError> {
    let lines = items.iter().map(|(item, quantity)| PricedLine::new(item, *quantity)).collect::<Vec<_>>();
    let subtotal = lines.iter().map(|l| l.subtotal).sum::<Money>();
    if subtotal < vendor.minimum_order {
        return Err(OrderFlowError::BelowMinimumOrder { subtotal, minimum: vendor.minimum_order });
    }
    let delivery_fee = config.delivery_fee;
    let service_fee = subtotal * config.service_fee_rate;
    let commission = subtotal * vendor.commission_rate;
    let vendor_earnings = subtotal - commission;
    let rider_earnings = delivery_fee * config.rider_earnings_rate;
    let total = subtotal + delivery_fee + service_fee;
    Ok(FeeBreakdown { lines, subtotal, delivery_fee, service_fee, commission, vendor_earnings, rider_earnings, total })
}

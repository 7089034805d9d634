use std::{env, fmt::Display, str::FromStr, time::Duration};

use log::*;

use crate::db_types::{Money, Rate};

const DEFAULT_SEARCH_RADIUS_KM: f64 = 10.0;
const DEFAULT_MAX_CANDIDATES: usize = 10;
const DEFAULT_MAX_ORDER_ITEMS: usize = 50;
const DEFAULT_MAX_ITEM_QUANTITY: i64 = 10;
const DEFAULT_ACTIVE_ORDER_TTL_MINS: u64 = 30;
const DEFAULT_ORDER_TIMEOUT_MINS: i64 = 30;

/// Platform-wide pricing and dispatch settings.
#[derive(Debug, Clone)]
pub struct PlatformConfig {
    /// Flat fee added to every order.
    pub delivery_fee: Money,
    /// Fraction of the subtotal charged to the student as a service fee.
    pub service_fee_rate: Rate,
    /// Fraction of the delivery fee paid to the rider.
    pub rider_earnings_rate: Rate,
    /// Auto-assignment only considers riders within this distance of the delivery point.
    pub search_radius_km: f64,
    /// The most riders a single auto-assignment attempt will try.
    pub max_candidates: usize,
    pub max_order_items: usize,
    pub max_item_quantity: i64,
    /// How long a newly placed order stays in the active-order cache.
    pub active_order_ttl: Duration,
    /// Carried for operators, but nothing expires orders yet.
    pub order_timeout: chrono::Duration,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            delivery_fee: Money::new(250, 2),
            service_fee_rate: Rate::new(5, 2).unwrap_or_default(),
            rider_earnings_rate: Rate::new(80, 2).unwrap_or_default(),
            search_radius_km: DEFAULT_SEARCH_RADIUS_KM,
            max_candidates: DEFAULT_MAX_CANDIDATES,
            max_order_items: DEFAULT_MAX_ORDER_ITEMS,
            max_item_quantity: DEFAULT_MAX_ITEM_QUANTITY,
            active_order_ttl: Duration::from_secs(DEFAULT_ACTIVE_ORDER_TTL_MINS * 60),
            order_timeout: chrono::Duration::minutes(DEFAULT_ORDER_TIMEOUT_MINS),
        }
    }
}

impl PlatformConfig {
    /// Reads the `DISPATCH_*` environment variables, using the default for anything missing or unparseable.
    pub fn from_env_or_default() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where F: Fn(&str) -> Option<String> {
        let defaults = Self::default();
        let delivery_fee = parse_or(&lookup, "DISPATCH_DELIVERY_FEE", defaults.delivery_fee);
        let delivery_fee = if delivery_fee.is_negative() {
            warn!("🪛️ DISPATCH_DELIVERY_FEE cannot be negative. Using the default, {}.", defaults.delivery_fee);
            defaults.delivery_fee
        } else {
            delivery_fee
        };
        let service_fee_rate = parse_or(&lookup, "DISPATCH_SERVICE_FEE_RATE", defaults.service_fee_rate);
        let rider_earnings_rate = parse_or(&lookup, "DISPATCH_RIDER_EARNINGS_RATE", defaults.rider_earnings_rate);
        let search_radius_km = parse_or(&lookup, "DISPATCH_SEARCH_RADIUS_KM", defaults.search_radius_km);
        let search_radius_km = if search_radius_km.is_finite() && search_radius_km > 0.0 {
            search_radius_km
        } else {
            warn!("🪛️ DISPATCH_SEARCH_RADIUS_KM must be positive. Using the default, {DEFAULT_SEARCH_RADIUS_KM}.");
            DEFAULT_SEARCH_RADIUS_KM
        };
        let max_candidates = parse_or(&lookup, "DISPATCH_MAX_CANDIDATES", defaults.max_candidates).max(1);
        let max_order_items = parse_or(&lookup, "DISPATCH_MAX_ORDER_ITEMS", defaults.max_order_items).max(1);
        let max_item_quantity = parse_or(&lookup, "DISPATCH_MAX_ITEM_QUANTITY", defaults.max_item_quantity).max(1);
        let ttl_mins = parse_or(&lookup, "DISPATCH_ACTIVE_ORDER_TTL_MINS", DEFAULT_ACTIVE_ORDER_TTL_MINS);
        let timeout_mins = parse_or(&lookup, "DISPATCH_ORDER_TIMEOUT_MINS", DEFAULT_ORDER_TIMEOUT_MINS);
        let config = Self {
            delivery_fee,
            service_fee_rate,
            rider_earnings_rate,
            search_radius_km,
            max_candidates,
            max_order_items,
            max_item_quantity,
            active_order_ttl: Duration::from_secs(ttl_mins * 60),
            order_timeout: chrono::Duration::minutes(timeout_mins),
        };
        info!(
            "🪛️ Platform fees: delivery {}, service {}, rider share {}. Dispatch radius {} km, {} candidates.",
            config.delivery_fee,
            config.service_fee_rate,
            config.rider_earnings_rate,
            config.search_radius_km,
            config.max_candidates
        );
        config
    }
}

fn parse_or<F, T>(lookup: &F, name: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Display,
    T::Err: Display,
{
    match lookup(name) {
        None => default,
        Some(s) => s.trim().parse::<T>().unwrap_or_else(|e| {
            warn!("🪛️ {s} is not a valid value for {name}. {e} Using the default, {default}, instead.");
            default
        }),
    }
}

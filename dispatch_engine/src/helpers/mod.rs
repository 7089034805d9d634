mod distance;
mod identifiers;

pub use distance::{haversine_km, EARTH_RADIUS_KM};
pub use identifiers::{new_order_number, new_transaction_id};

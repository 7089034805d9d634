use chrono::Utc;
use rand::{thread_rng, Rng};

/// A human-readable order number, e.g. `ORD-1718000000-042`.
pub fn new_order_number() -> String {
    let suffix: u32 = thread_rng().gen_range(0..1000);
    format!("ORD-{}-{suffix:03}", Utc::now().timestamp())
}

/// An opaque payment transaction id, e.g. `TXN-1718000000123456789-0042`.
pub fn new_transaction_id() -> String {
    let now = Utc::now();
    let nanos = now.timestamp_nanos_opt().unwrap_or_else(|| now.timestamp_micros() * 1000);
    let suffix: u32 = thread_rng().gen_range(0..10_000);
    format!("TXN-{nanos}-{suffix:04}")
}

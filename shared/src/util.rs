/// Current UTC timestamp in milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Generate a new opaque record id
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Generate a human-facing order number: `ORD-{millis}-{000..999}`.
///
/// Uniqueness is enforced by the order number index at insert time,
/// callers retry on collision.
pub fn order_number() -> String {
    use rand::Rng;
    let suffix: u16 = rand::thread_rng().gen_range(0..1000);
    format!("ORD-{}-{:03}", now_millis(), suffix)
}

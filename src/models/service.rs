use serde::{Deserialize, Serialize};

/// A bookable offering of a business. Prices are kept in cents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub id: String,
    pub business_id: String,
    pub name: String,
    pub duration_minutes: i32,
    pub price_cents: i64,
    pub active: bool,
}

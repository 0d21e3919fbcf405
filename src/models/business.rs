use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::WeeklyHours;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Business {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub address: String,
    pub phone: String,
    pub description: String,
    pub hours: WeeklyHours,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

use std::env;

use crate::services::availability::OccupancyPolicy;
use crate::services::scheduling::SchedulingRules;
use crate::services::slots::DEFAULT_STEP_MINUTES;

const DEFAULT_SESSION_TTL_HOURS: i64 = 24 * 7;
const MAX_SESSION_TTL_HOURS: i64 = 24 * 365;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub session_secret: String,
    pub session_ttl_hours: i64,
    pub slot_step_minutes: i64,
    pub cancelled_blocks_slot: bool,
    pub bootstrap_admin_email: Option<String>,
    pub cors_allow_origin: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "barberbook.db".to_string()),
            session_secret: env::var("SESSION_SECRET").unwrap_or_else(|_| "changeme".to_string()),
            session_ttl_hours: session_ttl_hours(env::var("SESSION_TTL_HOURS").ok().as_deref()),
            slot_step_minutes: env::var("SLOT_STEP_MINUTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|m: &i64| *m > 0)
                .unwrap_or(DEFAULT_STEP_MINUTES),
            cancelled_blocks_slot: env::var("CANCELLED_BLOCKS_SLOT")
                .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
            bootstrap_admin_email: env::var("BOOTSTRAP_ADMIN_EMAIL")
                .ok()
                .filter(|v| !v.is_empty()),
            cors_allow_origin: env::var("CORS_ALLOW_ORIGIN").ok().filter(|v| !v.is_empty()),
        }
    }

    pub fn occupancy_policy(&self) -> OccupancyPolicy {
        if self.cancelled_blocks_slot {
            OccupancyPolicy::AllStatuses
        } else {
            OccupancyPolicy::ConfirmedOnly
        }
    }

    pub fn scheduling_rules(&self) -> SchedulingRules {
        SchedulingRules {
            step_minutes: self.slot_step_minutes,
            policy: self.occupancy_policy(),
        }
    }
}

/// Non-positive or unparsable values fall back to the default; large ones
/// are capped at a year.
fn session_ttl_hours(raw: Option<&str>) -> i64 {
    raw.and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|h| *h > 0)
        .map(|h| h.min(MAX_SESSION_TTL_HOURS))
        .unwrap_or(DEFAULT_SESSION_TTL_HOURS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_ttl_hours() {
        assert_eq!(session_ttl_hours(None), DEFAULT_SESSION_TTL_HOURS);
        assert_eq!(session_ttl_hours(Some("12")), 12);
        assert_eq!(session_ttl_hours(Some("0")), DEFAULT_SESSION_TTL_HOURS);
        assert_eq!(session_ttl_hours(Some("soon")), DEFAULT_SESSION_TTL_HOURS);
        assert_eq!(
            session_ttl_hours(Some("9223372036854775807")),
            MAX_SESSION_TTL_HOURS
        );
    }
}

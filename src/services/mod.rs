pub mod auth;
pub mod availability;
pub mod calendar;
pub mod events;
pub mod scheduling;
pub mod slots;

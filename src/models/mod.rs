pub mod booking;
pub mod business;
pub mod hours;
pub mod service;
pub mod user;

pub use booking::{Booking, BookingStatus};
pub use business::Business;
pub use hours::{DayHours, WeeklyHours};
pub use service::Service;
pub use user::{Role, Session, User};

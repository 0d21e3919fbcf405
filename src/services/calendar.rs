use crate::models::{Booking, BookingStatus};

/// Escapes TEXT values per RFC 5545 §3.3.11.
fn escape_text(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace(';', "\\;")
        .replace(',', "\\,")
        .replace('\n', "\\n")
}

pub fn generate_ics(booking: &Booking, business_name: &str, business_address: &str) -> String {
    let dtstart = booking.start.format("%Y%m%dT%H%M%S").to_string();
    let dtend = booking.end().format("%Y%m%dT%H%M%S").to_string();
    let dtstamp = booking.updated_at.format("%Y%m%dT%H%M%SZ").to_string();
    let uid = format!("{}@barberbook", booking.id);

    let summary = escape_text(&format!("{} at {}", booking.service_name, business_name));
    let location = escape_text(business_address);
    let status = match booking.status {
        BookingStatus::Confirmed => "CONFIRMED",
        BookingStatus::Cancelled => "CANCELLED",
    };

    format!(
        "BEGIN:VCALENDAR\r\n\
         VERSION:2.0\r\n\
         PRODID:-//Barberbook//Appointments//EN\r\n\
         BEGIN:VEVENT\r\n\
         UID:{uid}\r\n\
         DTSTAMP:{dtstamp}\r\n\
         DTSTART:{dtstart}\r\n\
         DTEND:{dtend}\r\n\
         SUMMARY:{summary}\r\n\
         LOCATION:{location}\r\n\
         STATUS:{status}\r\n\
         END:VEVENT\r\n\
         END:VCALENDAR\r\n"
    )
}

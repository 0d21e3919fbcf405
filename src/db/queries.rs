use chrono::{NaiveDateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::models::{
    Booking, BookingStatus, Business, Role, Service, Session, User, WeeklyHours,
};

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn fmt_dt(dt: &NaiveDateTime) -> String {
    dt.format(DATETIME_FORMAT).to_string()
}

fn parse_dt(s: &str) -> anyhow::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, DATETIME_FORMAT)
        .map_err(|e| anyhow::anyhow!("invalid stored datetime {s:?}: {e}"))
}

fn now_str() -> String {
    fmt_dt(&Utc::now().naive_utc())
}

// ── Users ──

const USER_COLUMNS: &str = "id, email, display_name, role, password_hash, created_at";

fn parse_user_row(row: &rusqlite::Row) -> anyhow::Result<User> {
    let id: String = row.get(0)?;
    let role_str: String = row.get(3)?;
    let created_at_str: String = row.get(5)?;

    let role = Role::parse(&role_str).unwrap_or_else(|| {
        tracing::warn!(user_id = %id, role = %role_str, "unknown stored role, treating as client");
        Role::Client
    });

    Ok(User {
        id,
        email: row.get(1)?,
        display_name: row.get(2)?,
        role,
        password_hash: row.get(4)?,
        created_at: parse_dt(&created_at_str)?,
    })
}

pub fn create_user(conn: &Connection, user: &User) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO users (id, email, display_name, role, password_hash, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            user.id,
            user.email,
            user.display_name,
            user.role.as_str(),
            user.password_hash,
            fmt_dt(&user.created_at),
        ],
    )?;
    Ok(())
}

pub fn get_user(conn: &Connection, id: &str) -> anyhow::Result<Option<User>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
    let result = conn
        .query_row(&sql, params![id], |row| Ok(parse_user_row(row)))
        .optional()?;
    result.transpose()
}

pub fn get_user_by_email(conn: &Connection, email: &str) -> anyhow::Result<Option<User>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1");
    let result = conn
        .query_row(&sql, params![email], |row| Ok(parse_user_row(row)))
        .optional()?;
    result.transpose()
}

pub fn list_users(conn: &Connection, role_filter: Option<Role>) -> anyhow::Result<Vec<User>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE (?1 IS NULL OR role = ?1) ORDER BY created_at ASC, email ASC"
    ))?;

    let rows = stmt.query_map(params![role_filter.map(|r| r.as_str())], |row| {
        Ok(parse_user_row(row))
    })?;

    let mut users = vec![];
    for row in rows {
        users.push(row??);
    }
    Ok(users)
}

pub fn update_user_role(conn: &Connection, id: &str, role: Role) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE users SET role = ?1 WHERE id = ?2",
        params![role.as_str(), id],
    )?;
    Ok(count > 0)
}

// ── Sessions ──

pub fn create_session(conn: &Connection, session: &Session) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO sessions (id, user_id, created_at, expires_at) VALUES (?1, ?2, ?3, ?4)",
        params![
            session.id,
            session.user_id,
            fmt_dt(&session.created_at),
            fmt_dt(&session.expires_at),
        ],
    )?;
    Ok(())
}

/// Returns the session only while it hasn't expired.
pub fn get_active_session(conn: &Connection, id: &str) -> anyhow::Result<Option<Session>> {
    let result = conn
        .query_row(
            "SELECT id, user_id, created_at, expires_at FROM sessions WHERE id = ?1 AND expires_at > ?2",
            params![id, now_str()],
            |row| {
                let created_at: String = row.get(2)?;
                let expires_at: String = row.get(3)?;
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, created_at, expires_at))
            },
        )
        .optional()?;

    match result {
        Some((id, user_id, created_at, expires_at)) => Ok(Some(Session {
            id,
            user_id,
            created_at: parse_dt(&created_at)?,
            expires_at: parse_dt(&expires_at)?,
        })),
        None => Ok(None),
    }
}

pub fn delete_session(conn: &Connection, id: &str) -> anyhow::Result<bool> {
    let count = conn.execute("DELETE FROM sessions WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

pub fn delete_sessions_for_user(conn: &Connection, user_id: &str) -> anyhow::Result<usize> {
    let count = conn.execute("DELETE FROM sessions WHERE user_id = ?1", params![user_id])?;
    Ok(count)
}

pub fn expire_old_sessions(conn: &Connection) -> anyhow::Result<usize> {
    let count = conn.execute(
        "DELETE FROM sessions WHERE expires_at <= ?1",
        params![now_str()],
    )?;
    Ok(count)
}

// ── Businesses ──

const BUSINESS_COLUMNS: &str =
    "id, owner_id, name, address, phone, description, hours, created_at, updated_at";

fn parse_business_row(row: &rusqlite::Row) -> anyhow::Result<Business> {
    let id: String = row.get(0)?;
    let hours_json: String = row.get(6)?;
    let created_at_str: String = row.get(7)?;
    let updated_at_str: String = row.get(8)?;

    // Unreadable hours mean no availability rather than a failed request.
    let hours = serde_json::from_str::<WeeklyHours>(&hours_json).unwrap_or_else(|e| {
        tracing::warn!(business_id = %id, error = %e, "unreadable stored hours, treating as closed");
        WeeklyHours::default()
    });

    Ok(Business {
        id,
        owner_id: row.get(1)?,
        name: row.get(2)?,
        address: row.get(3)?,
        phone: row.get(4)?,
        description: row.get(5)?,
        hours,
        created_at: parse_dt(&created_at_str)?,
        updated_at: parse_dt(&updated_at_str)?,
    })
}

pub fn create_business(conn: &Connection, business: &Business) -> anyhow::Result<()> {
    let hours = serde_json::to_string(&business.hours)?;
    conn.execute(
        "INSERT INTO businesses (id, owner_id, name, address, phone, description, hours, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            business.id,
            business.owner_id,
            business.name,
            business.address,
            business.phone,
            business.description,
            hours,
            fmt_dt(&business.created_at),
            fmt_dt(&business.updated_at),
        ],
    )?;
    Ok(())
}

pub fn update_business(conn: &Connection, business: &Business) -> anyhow::Result<bool> {
    let hours = serde_json::to_string(&business.hours)?;
    let count = conn.execute(
        "UPDATE businesses SET name = ?1, address = ?2, phone = ?3, description = ?4, hours = ?5, updated_at = ?6
         WHERE id = ?7",
        params![
            business.name,
            business.address,
            business.phone,
            business.description,
            hours,
            now_str(),
            business.id,
        ],
    )?;
    Ok(count > 0)
}

pub fn get_business(conn: &Connection, id: &str) -> anyhow::Result<Option<Business>> {
    let sql = format!("SELECT {BUSINESS_COLUMNS} FROM businesses WHERE id = ?1");
    let result = conn
        .query_row(&sql, params![id], |row| Ok(parse_business_row(row)))
        .optional()?;
    result.transpose()
}

pub fn get_business_by_owner(conn: &Connection, owner_id: &str) -> anyhow::Result<Option<Business>> {
    let sql = format!("SELECT {BUSINESS_COLUMNS} FROM businesses WHERE owner_id = ?1");
    let result = conn
        .query_row(&sql, params![owner_id], |row| Ok(parse_business_row(row)))
        .optional()?;
    result.transpose()
}

pub fn list_businesses(conn: &Connection) -> anyhow::Result<Vec<Business>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {BUSINESS_COLUMNS} FROM businesses ORDER BY name ASC"
    ))?;
    let rows = stmt.query_map([], |row| Ok(parse_business_row(row)))?;

    let mut businesses = vec![];
    for row in rows {
        businesses.push(row??);
    }
    Ok(businesses)
}

// ── Services ──

fn parse_service_row(row: &rusqlite::Row) -> rusqlite::Result<Service> {
    Ok(Service {
        id: row.get(0)?,
        business_id: row.get(1)?,
        name: row.get(2)?,
        duration_minutes: row.get(3)?,
        price_cents: row.get(4)?,
        active: row.get::<_, i32>(5)? != 0,
    })
}

pub fn create_service(conn: &Connection, service: &Service) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO services (id, business_id, name, duration_minutes, price_cents, active)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            service.id,
            service.business_id,
            service.name,
            service.duration_minutes,
            service.price_cents,
            service.active as i32,
        ],
    )?;
    Ok(())
}

pub fn get_service(conn: &Connection, id: &str) -> anyhow::Result<Option<Service>> {
    let service = conn
        .query_row(
            "SELECT id, business_id, name, duration_minutes, price_cents, active FROM services WHERE id = ?1",
            params![id],
            parse_service_row,
        )
        .optional()?;
    Ok(service)
}

pub fn list_services(
    conn: &Connection,
    business_id: &str,
    include_archived: bool,
) -> anyhow::Result<Vec<Service>> {
    let mut stmt = conn.prepare(
        "SELECT id, business_id, name, duration_minutes, price_cents, active FROM services
         WHERE business_id = ?1 AND (?2 OR active = 1) ORDER BY name ASC",
    )?;
    let rows = stmt.query_map(params![business_id, include_archived], parse_service_row)?;

    let mut services = vec![];
    for row in rows {
        services.push(row?);
    }
    Ok(services)
}

pub fn update_service(conn: &Connection, service: &Service) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE services SET name = ?1, duration_minutes = ?2, price_cents = ?3, active = ?4 WHERE id = ?5",
        params![
            service.name,
            service.duration_minutes,
            service.price_cents,
            service.active as i32,
            service.id,
        ],
    )?;
    Ok(count > 0)
}

pub fn archive_service(conn: &Connection, id: &str) -> anyhow::Result<bool> {
    let count = conn.execute("UPDATE services SET active = 0 WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

// ── Bookings ──

const BOOKING_COLUMNS: &str = "id, business_id, client_id, client_name, service_id, service_name, \
     service_duration_minutes, start_at, status, created_at, updated_at";

fn parse_booking_row(row: &rusqlite::Row) -> anyhow::Result<Booking> {
    let start_str: String = row.get(7)?;
    let status_str: String = row.get(8)?;
    let created_at_str: String = row.get(9)?;
    let updated_at_str: String = row.get(10)?;

    let status = BookingStatus::parse(&status_str)
        .ok_or_else(|| anyhow::anyhow!("unknown booking status: {status_str}"))?;

    Ok(Booking {
        id: row.get(0)?,
        business_id: row.get(1)?,
        client_id: row.get(2)?,
        client_name: row.get(3)?,
        service_id: row.get(4)?,
        service_name: row.get(5)?,
        service_duration_minutes: row.get(6)?,
        start: parse_dt(&start_str)?,
        status,
        created_at: parse_dt(&created_at_str)?,
        updated_at: parse_dt(&updated_at_str)?,
    })
}

fn collect_bookings(
    stmt: &mut rusqlite::Statement,
    params: impl rusqlite::Params,
) -> anyhow::Result<Vec<Booking>> {
    let rows = stmt.query_map(params, |row| Ok(parse_booking_row(row)))?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

pub fn create_booking(conn: &Connection, booking: &Booking) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO bookings (id, business_id, client_id, client_name, service_id, service_name,
             service_duration_minutes, start_at, status, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            booking.id,
            booking.business_id,
            booking.client_id,
            booking.client_name,
            booking.service_id,
            booking.service_name,
            booking.service_duration_minutes,
            fmt_dt(&booking.start),
            booking.status.as_str(),
            fmt_dt(&booking.created_at),
            fmt_dt(&booking.updated_at),
        ],
    )?;
    Ok(())
}

pub fn get_booking_by_id(conn: &Connection, id: &str) -> anyhow::Result<Option<Booking>> {
    let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1");
    let result = conn
        .query_row(&sql, params![id], |row| Ok(parse_booking_row(row)))
        .optional()?;
    result.transpose()
}

/// Every booking of a business starting within `[start, end]`, whatever its
/// status. Occupancy policy is applied by the caller.
pub fn get_bookings_in_range(
    conn: &Connection,
    business_id: &str,
    start: &NaiveDateTime,
    end: &NaiveDateTime,
) -> anyhow::Result<Vec<Booking>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings
         WHERE business_id = ?1 AND start_at >= ?2 AND start_at <= ?3 ORDER BY start_at ASC"
    ))?;
    collect_bookings(&mut stmt, params![business_id, fmt_dt(start), fmt_dt(end)])
}

pub fn get_bookings_for_client(
    conn: &Connection,
    client_id: &str,
    status_filter: Option<BookingStatus>,
) -> anyhow::Result<Vec<Booking>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings
         WHERE client_id = ?1 AND (?2 IS NULL OR status = ?2) ORDER BY start_at DESC"
    ))?;
    collect_bookings(
        &mut stmt,
        params![client_id, status_filter.map(|s| s.as_str())],
    )
}

pub fn get_bookings_for_business(
    conn: &Connection,
    business_id: &str,
    range: Option<(NaiveDateTime, NaiveDateTime)>,
    status_filter: Option<BookingStatus>,
    limit: i64,
) -> anyhow::Result<Vec<Booking>> {
    let (from, to) = match range {
        Some((from, to)) => (Some(fmt_dt(&from)), Some(fmt_dt(&to))),
        None => (None, None),
    };
    let mut stmt = conn.prepare(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings
         WHERE business_id = ?1
           AND (?2 IS NULL OR start_at >= ?2)
           AND (?3 IS NULL OR start_at <= ?3)
           AND (?4 IS NULL OR status = ?4)
         ORDER BY start_at ASC LIMIT ?5"
    ))?;
    collect_bookings(
        &mut stmt,
        params![business_id, from, to, status_filter.map(|s| s.as_str()), limit],
    )
}

pub fn update_booking_status(
    conn: &Connection,
    id: &str,
    status: BookingStatus,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE bookings SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![status.as_str(), now_str(), id],
    )?;
    Ok(count > 0)
}

// ── Stats ──

pub struct PlatformStats {
    pub clients: i64,
    pub owners: i64,
    pub admins: i64,
    pub businesses: i64,
    pub upcoming_bookings: i64,
}

pub fn get_platform_stats(conn: &Connection, now: &NaiveDateTime) -> anyhow::Result<PlatformStats> {
    let count_role = |role: Role| -> rusqlite::Result<i64> {
        conn.query_row(
            "SELECT COUNT(*) FROM users WHERE role = ?1",
            params![role.as_str()],
            |row| row.get(0),
        )
    };

    let businesses: i64 = conn.query_row("SELECT COUNT(*) FROM businesses", [], |row| row.get(0))?;

    let upcoming_bookings: i64 = conn.query_row(
        "SELECT COUNT(*) FROM bookings WHERE start_at > ?1 AND status = 'confirmed'",
        params![fmt_dt(now)],
        |row| row.get(0),
    )?;

    Ok(PlatformStats {
        clients: count_role(Role::Client)?,
        owners: count_role(Role::Owner)?,
        admins: count_role(Role::Admin)?,
        businesses,
        upcoming_bookings,
    })
}

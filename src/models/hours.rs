use chrono::{Datelike, NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

const DAY_ORDER: [&str; 7] = ["mon", "tue", "wed", "thu", "fri", "sat", "sun"];

/// Opening hours for a single weekday, with `HH:MM` bounds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DayHours {
    pub open: String,
    pub close: String,
    #[serde(rename = "isOpen", alias = "is_open", default)]
    pub is_open: bool,
}

impl DayHours {
    /// Parsed `(open, close)` bounds. `None` when the day is closed or the
    /// stored times don't parse, which callers treat as "no availability".
    pub fn bounds(&self) -> Option<(NaiveTime, NaiveTime)> {
        if !self.is_open {
            return None;
        }
        let open = parse_time(&self.open).ok()?;
        let close = parse_time(&self.close).ok()?;
        Some((open, close))
    }
}

/// Weekly schedule keyed by lowercase three-letter weekday.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WeeklyHours {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mon: Option<DayHours>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tue: Option<DayHours>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wed: Option<DayHours>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thu: Option<DayHours>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fri: Option<DayHours>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sat: Option<DayHours>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sun: Option<DayHours>,
}

impl WeeklyHours {
    pub fn from_json(s: &str) -> anyhow::Result<Self> {
        let hours: WeeklyHours = serde_json::from_str(s)?;
        hours.validate()?;
        Ok(hours)
    }

    pub fn for_weekday(&self, weekday: Weekday) -> Option<&DayHours> {
        match weekday {
            Weekday::Mon => self.mon.as_ref(),
            Weekday::Tue => self.tue.as_ref(),
            Weekday::Wed => self.wed.as_ref(),
            Weekday::Thu => self.thu.as_ref(),
            Weekday::Fri => self.fri.as_ref(),
            Weekday::Sat => self.sat.as_ref(),
            Weekday::Sun => self.sun.as_ref(),
        }
    }

    pub fn for_date(&self, date: NaiveDate) -> Option<&DayHours> {
        self.for_weekday(date.weekday())
    }

    fn days(&self) -> [(&'static str, Option<&DayHours>); 7] {
        [
            (DAY_ORDER[0], self.mon.as_ref()),
            (DAY_ORDER[1], self.tue.as_ref()),
            (DAY_ORDER[2], self.wed.as_ref()),
            (DAY_ORDER[3], self.thu.as_ref()),
            (DAY_ORDER[4], self.fri.as_ref()),
            (DAY_ORDER[5], self.sat.as_ref()),
            (DAY_ORDER[6], self.sun.as_ref()),
        ]
    }

    /// Rejects open days whose bounds are malformed or inverted. Closed days
    /// may carry any placeholder times.
    pub fn validate(&self) -> anyhow::Result<()> {
        for (day, hours) in self.days() {
            let Some(hours) = hours else { continue };
            if !hours.is_open {
                continue;
            }
            let open = parse_time(&hours.open)?;
            let close = parse_time(&hours.close)?;
            if open >= close {
                return Err(anyhow::anyhow!(
                    "{day}: open time {} must be before close time {}",
                    hours.open,
                    hours.close
                ));
            }
        }
        Ok(())
    }

    pub fn to_human_readable(&self) -> String {
        self.days()
            .into_iter()
            .filter_map(|(day, hours)| {
                let hours = hours.filter(|h| h.is_open)?;
                Some(format!("{}: {}-{}", capitalize(day), hours.open, hours.close))
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn capitalize(s: &str) -> String {
    let mut c = s.chars();
    match c.next() {
        None => String::new(),
        Some(f) => f.to_uppercase().to_string() + &c.as_str().to_lowercase(),
    }
}

/// Parses a strict `HH:MM` time-of-day: exactly two digits on each side.
pub fn parse_time(s: &str) -> anyhow::Result<NaiveTime> {
    let parts: Vec<&str> = s.split(':').collect();
    let two_digits = |p: &str| p.len() == 2 && p.bytes().all(|b| b.is_ascii_digit());
    if parts.len() != 2 || !parts.iter().all(|p| two_digits(p)) {
        return Err(anyhow::anyhow!("invalid time format (expected HH:MM): {s}"));
    }
    let hour: u32 = parts[0]
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid hour in: {s}"))?;
    let minute: u32 = parts[1]
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid minute in: {s}"))?;
    NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(|| anyhow::anyhow!("time out of range: {s}"))
}

pub fn format_time(t: NaiveTime) -> String {
    t.format("%H:%M").to_string()
}

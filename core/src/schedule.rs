use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("unknown IANA timezone: {0}")]
    InvalidTimezone(String),
    #[error("weekday {0} is out of range, must be 1 (Monday) through 7 (Sunday)")]
    InvalidWeekday(u8),
    #[error("invalid time of day {0:?}, expected HH:MM or HH:MM:SS")]
    InvalidTime(String),
    #[error("invalid holiday timestamp {0:?}, expected \"YYYY-MM-DD HH:MM[:SS]\"")]
    InvalidHolidayTimestamp(String),
    #[error("holiday window stop ({stop}) must precede start ({start})")]
    HolidayWindowOutOfOrder { stop: String, start: String },
}

/// One or many YAML scalars, as accepted for `weekdays[].start`/`stop`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    fn into_vec(self) -> Vec<String> {
        match self {
            OneOrMany::One(s) => vec![s],
            OneOrMany::Many(v) => v,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawWeekdayRule {
    pub days: Vec<u8>,
    #[serde(default)]
    start: Option<OneOrMany>,
    #[serde(default)]
    stop: Option<OneOrMany>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawHolidayWindow {
    pub stop: String,
    pub start: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawSchedule {
    pub timezone: String,
    #[serde(default)]
    pub weekdays: Vec<RawWeekdayRule>,
    #[serde(default)]
    pub holidays: Vec<RawHolidayWindow>,
}

/// A weekday rule: on each of `days` (1=Monday..7=Sunday), bring the
/// environment up at each `start` time and down at each `stop` time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeekdayRule {
    pub days: Vec<u8>,
    pub start: Vec<NaiveTime>,
    pub stop: Vec<NaiveTime>,
}

/// A zoned interval during which the environment is held down and weekday
/// rules are masked. Invariant: `stop_at < start_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HolidayWindow {
    pub stop_at: DateTime<Tz>,
    pub start_at: DateTime<Tz>,
}

impl HolidayWindow {
    pub fn contains(&self, when: &DateTime<Tz>) -> bool {
        &self.stop_at <= when && when <= &self.start_at
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Schedule {
    pub timezone: Tz,
    pub weekdays: Vec<WeekdayRule>,
    pub holidays: Vec<HolidayWindow>,
}

fn parse_time_of_day(s: &str) -> Result<NaiveTime, ScheduleError> {
    NaiveTime::parse_from_str(s, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .map_err(|_| ScheduleError::InvalidTime(s.to_string()))
}

fn parse_holiday_timestamp(tz: Tz, s: &str) -> Result<DateTime<Tz>, ScheduleError> {
    let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M"))
        .map_err(|_| ScheduleError::InvalidHolidayTimestamp(s.to_string()))?;
    local_datetime(tz, naive.date(), naive.time())
        .ok_or_else(|| ScheduleError::InvalidHolidayTimestamp(s.to_string()))
}

/// Resolve a naive date+time to a zoned instant, picking the earliest valid
/// local representation on an ambiguous (fall-back) wall-clock reading and
/// returning `None` for a time that never occurs (spring-forward gap).
pub(crate) fn local_datetime(tz: Tz, date: NaiveDate, time: NaiveTime) -> Option<DateTime<Tz>> {
    let naive = NaiveDateTime::new(date, time);
    tz.from_local_datetime(&naive).earliest()
}

impl RawSchedule {
    pub fn validate(self) -> Result<Schedule, ScheduleError> {
        let tz = Tz::from_str(&self.timezone)
            .map_err(|_| ScheduleError::InvalidTimezone(self.timezone.clone()))?;

        let mut weekdays = Vec::with_capacity(self.weekdays.len());
        for raw in self.weekdays {
            for day in &raw.days {
                if !(1..=7).contains(day) {
                    return Err(ScheduleError::InvalidWeekday(*day));
                }
            }
            let start = raw
                .start
                .map(OneOrMany::into_vec)
                .unwrap_or_default()
                .iter()
                .map(|s| parse_time_of_day(s))
                .collect::<Result<Vec<_>, _>>()?;
            let stop = raw
                .stop
                .map(OneOrMany::into_vec)
                .unwrap_or_default()
                .iter()
                .map(|s| parse_time_of_day(s))
                .collect::<Result<Vec<_>, _>>()?;
            weekdays.push(WeekdayRule {
                days: raw.days,
                start,
                stop,
            });
        }

        let mut holidays = Vec::with_capacity(self.holidays.len());
        for raw in self.holidays {
            let stop_at = parse_holiday_timestamp(tz, &raw.stop)?;
            let start_at = parse_holiday_timestamp(tz, &raw.start)?;
            if !(stop_at < start_at) {
                return Err(ScheduleError::HolidayWindowOutOfOrder {
                    stop: raw.stop,
                    start: raw.start,
                });
            }
            holidays.push(HolidayWindow { stop_at, start_at });
        }

        Ok(Schedule {
            timezone: tz,
            weekdays,
            holidays,
        })
    }
}

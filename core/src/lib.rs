//! Schedule model and action expander.
//!
//! This crate has no I/O and no shared state: given a validated [`Schedule`]
//! and a zoned interval, [`expand`] deterministically produces the sorted
//! list of [`Action`]s due in that interval.

pub mod action;
pub mod environment;
pub mod expand;
pub mod schedule;

pub use action::{Action, ActionKind, ActionSource};
pub use environment::{BatchPolicy, Environment, EnvironmentError, NamespaceState, RawEnvironment};
pub use expand::expand;
pub use schedule::{HolidayWindow, RawSchedule, Schedule, ScheduleError, WeekdayRule};

#[cfg(test)]
mod proptests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use chrono_tz::Tz;
    use proptest::prelude::*;

    fn schedule_strategy() -> impl Strategy<Value = Schedule> {
        let days = prop::collection::vec(1u8..=7, 1..4);
        let times = prop::collection::vec((0u32..24, 0u32..60), 1..3);
        (days, times.clone(), times).prop_map(|(days, starts, stops)| {
            let start = starts
                .into_iter()
                .map(|(h, m)| chrono::NaiveTime::from_hms_opt(h, m, 0).unwrap())
                .collect();
            let stop = stops
                .into_iter()
                .map(|(h, m)| chrono::NaiveTime::from_hms_opt(h, m, 0).unwrap())
                .collect();
            Schedule {
                timezone: Tz::UTC,
                weekdays: vec![WeekdayRule { days, start, stop }],
                holidays: vec![HolidayWindow {
                    stop_at: Tz::UTC.with_ymd_and_hms(2023, 6, 10, 0, 0, 0).unwrap(),
                    start_at: Tz::UTC.with_ymd_and_hms(2023, 6, 20, 0, 0, 0).unwrap(),
                }],
            }
        })
    }

    proptest! {
        #[test]
        fn expand_is_sorted_and_within_bounds(
            schedule in schedule_strategy(),
            start_offset_days in 0i64..60,
            span_days in 1i64..45,
        ) {
            let base = Tz::UTC.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
            let starting_from = base + Duration::days(start_offset_days);
            let until = starting_from + Duration::days(span_days);

            let actions = expand(&schedule, starting_from, until);

            let mut sorted = actions.clone();
            sorted.sort();
            prop_assert_eq!(&actions, &sorted);

            for action in &actions {
                prop_assert!(action.when >= starting_from);
                prop_assert!(action.when <= until);
            }

            for action in actions.iter().filter(|a| a.source == ActionSource::Weekday) {
                let masked = schedule.holidays.iter().any(|h| h.contains(&action.when));
                prop_assert!(!masked);
            }
        }
    }
}

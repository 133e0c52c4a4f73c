use chrono::{DateTime, Duration, Weekday as ChronoWeekday};
use chrono_tz::Tz;

use crate::action::{Action, ActionKind, ActionSource};
use crate::schedule::{local_datetime, Schedule};

fn monday_indexed(weekday: ChronoWeekday) -> u8 {
    weekday.num_days_from_monday() as u8 + 1
}

fn is_on_holiday(schedule: &Schedule, when: &DateTime<Tz>) -> bool {
    schedule.holidays.iter().any(|holiday| holiday.contains(when))
}

/// Expand a schedule into the sorted list of actions due in `[starting_from, until]`.
///
/// Pure and idempotent: the same schedule and bounds always produce the same
/// result. See spec §4.2 for the holiday/weekday semantics this implements.
pub fn expand(schedule: &Schedule, starting_from: DateTime<Tz>, until: DateTime<Tz>) -> Vec<Action> {
    let mut actions = Vec::new();
    let lies_within = |when: &DateTime<Tz>| &starting_from <= when && when <= &until;

    for holiday in &schedule.holidays {
        if lies_within(&holiday.stop_at) {
            actions.push(Action::new(ActionKind::Down, ActionSource::Holiday, holiday.stop_at));
        }
        if lies_within(&holiday.start_at) {
            actions.push(Action::new(ActionKind::Up, ActionSource::Holiday, holiday.start_at));
        }
    }

    let tz = schedule.timezone;
    let start_date = starting_from.date_naive();
    let start_weekday = monday_indexed(start_date.weekday());

    for rule in &schedule.weekdays {
        for &target_weekday in &rule.days {
            let back_days = (start_weekday as i64 - target_weekday as i64).rem_euclid(7);
            let mut action_date = start_date - Duration::days(back_days);

            loop {
                let Some(midnight) = local_datetime(tz, action_date, chrono::NaiveTime::MIN) else {
                    action_date += Duration::days(7);
                    continue;
                };
                if midnight > until {
                    break;
                }

                for &time in &rule.stop {
                    if let Some(candidate) = local_datetime(tz, action_date, time) {
                        if lies_within(&candidate) && !is_on_holiday(schedule, &candidate) {
                            actions.push(Action::new(ActionKind::Down, ActionSource::Weekday, candidate));
                        }
                    }
                }
                for &time in &rule.start {
                    if let Some(candidate) = local_datetime(tz, action_date, time) {
                        if lies_within(&candidate) && !is_on_holiday(schedule, &candidate) {
                            actions.push(Action::new(ActionKind::Up, ActionSource::Weekday, candidate));
                        }
                    }
                }

                action_date += Duration::days(7);
            }
        }
    }

    actions.sort();
    actions
}

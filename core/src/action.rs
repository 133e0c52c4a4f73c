use chrono::DateTime;
use chrono_tz::Tz;
use serde::Serialize;

/// What the scheduler wants to do to an environment's workloads.
///
/// Declaration order is the tie-break order: `Down` sorts before `Up`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ActionKind {
    Down,
    Up,
}

/// Where an action came from.
///
/// Declaration order is the tie-break order: `Manual` preempts `Holiday`,
/// which preempts `Weekday`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ActionSource {
    Manual,
    Holiday,
    Weekday,
}

/// A scheduled intent to bring an environment up or down at a specific instant.
///
/// Field declaration order matters: `PartialOrd`/`Ord` are derived
/// lexicographically over the fields below, which is exactly the total
/// order from the spec (primarily `when`, then `source`, then `kind`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Action {
    pub when: DateTime<Tz>,
    pub source: ActionSource,
    pub kind: ActionKind,
}

impl Action {
    pub fn new(kind: ActionKind, source: ActionSource, when: DateTime<Tz>) -> Self {
        Self { when, source, kind }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {:?}",
            self.when.format("%Y-%m-%d %H:%M:%S"),
            self.kind
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(tz: Tz, y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Tz> {
        tz.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn orders_primarily_by_when() {
        let a = Action::new(ActionKind::Up, ActionSource::Weekday, at(Tz::UTC, 2023, 1, 1, 1, 0));
        let b = Action::new(ActionKind::Down, ActionSource::Manual, at(Tz::UTC, 2023, 1, 1, 2, 0));
        assert!(a < b);
    }

    #[test]
    fn ties_on_when_break_by_source_then_kind() {
        let when = at(Tz::UTC, 2023, 1, 1, 1, 0);
        let manual_up = Action::new(ActionKind::Up, ActionSource::Manual, when);
        let holiday_down = Action::new(ActionKind::Down, ActionSource::Holiday, when);
        let weekday_down = Action::new(ActionKind::Down, ActionSource::Weekday, when);
        let weekday_up = Action::new(ActionKind::Up, ActionSource::Weekday, when);

        assert!(manual_up < holiday_down);
        assert!(holiday_down < weekday_down);
        assert!(weekday_down < weekday_up);
    }
}

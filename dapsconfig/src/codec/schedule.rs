use std::{fmt, str::FromStr, sync::OnceLock};

use regex::Regex;

use crate::data::schema::SchemaError;

/// A wall-clock time, `HH:MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TimeOfDay {
    pub hour: u8,
    pub minute: u8,
}

impl TimeOfDay {
    pub fn new(hour: u8, minute: u8) -> Option<Self> {
        (hour < 24 && minute < 60).then_some(TimeOfDay { hour, minute })
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl FromStr for TimeOfDay {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || SchemaError::InvalidFormat {
            format: "time",
            input: s.to_string(),
        };
        let (h, m) = s.trim().split_once(':').ok_or_else(invalid)?;
        if m.len() != 2 {
            return Err(invalid());
        }
        let hour = h.parse().map_err(|_| invalid())?;
        let minute = m.parse().map_err(|_| invalid())?;
        TimeOfDay::new(hour, minute).ok_or_else(invalid)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    pub const ALL: [Weekday; 7] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
        Weekday::Sunday,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Weekday::Monday => "monday",
            Weekday::Tuesday => "tuesday",
            Weekday::Wednesday => "wednesday",
            Weekday::Thursday => "thursday",
            Weekday::Friday => "friday",
            Weekday::Saturday => "saturday",
            Weekday::Sunday => "sunday",
        }
    }
}

impl FromStr for Weekday {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Weekday::ALL
            .into_iter()
            .find(|d| d.name() == lower)
            .ok_or_else(|| SchemaError::InvalidFormat {
                format: "weekday",
                input: s.to_string(),
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleMode {
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Cron,
}

impl ScheduleMode {
    pub const ALL: [ScheduleMode; 5] = [
        ScheduleMode::Hourly,
        ScheduleMode::Daily,
        ScheduleMode::Weekly,
        ScheduleMode::Monthly,
        ScheduleMode::Cron,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ScheduleMode::Hourly => "hourly",
            ScheduleMode::Daily => "daily",
            ScheduleMode::Weekly => "weekly",
            ScheduleMode::Monthly => "monthly",
            ScheduleMode::Cron => "cron",
        }
    }

    /// The mode after this one, wrapping from cron back to hourly.
    pub fn next(self) -> ScheduleMode {
        let i = Self::ALL.iter().position(|m| *m == self).unwrap_or(0);
        Self::ALL[(i + 1) % Self::ALL.len()]
    }
}

/// A module run schedule.
///
/// Slots keep the order the user entered them in so re-serialising never
/// reorders the stored string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Schedule {
    Hourly { minute: u8 },
    Daily { times: Vec<TimeOfDay> },
    Weekly { slots: Vec<(Weekday, TimeOfDay)> },
    Monthly { slots: Vec<(u8, TimeOfDay)> },
    Cron { expr: String },
}

impl Default for Schedule {
    fn default() -> Self {
        Schedule::Daily { times: Vec::new() }
    }
}

const DAY_ALT: &str = "monday|tuesday|wednesday|thursday|friday|saturday|sunday";
const TIME: &str = r"\d{1,2}:\d{2}";

struct Patterns {
    hourly: Regex,
    daily: Regex,
    weekly: Regex,
    monthly: Regex,
    cron: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let build = |p: String| Regex::new(&p).expect("schedule pattern is valid");
        let weekly_slot = format!("(?:{DAY_ALT})@{TIME}");
        let monthly_slot = format!(r"\d{{1,2}}@{TIME}");
        Patterns {
            hourly: build(r"(?i)^hourly\((\d{1,2})\)$".to_string()),
            daily: build(format!(r"(?i)^daily\(({TIME}(?:\|{TIME})*)\)$")),
            weekly: build(format!(
                r"(?i)^weekly\(({weekly_slot}(?:\|{weekly_slot})*)\)$"
            )),
            monthly: build(format!(
                r"(?i)^monthly\(({monthly_slot}(?:\|{monthly_slot})*)\)$"
            )),
            cron: build(r"(?i)^cron\((.+)\)$".to_string()),
        }
    })
}

fn parse_slots<T>(
    body: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> Option<Vec<T>> {
    body.split('|').map(parse).collect()
}

fn parse_at<D>(slot: &str, day: impl Fn(&str) -> Option<D>) -> Option<(D, TimeOfDay)> {
    let (d, t) = slot.split_once('@')?;
    Some((day(d)?, t.parse().ok()?))
}

impl Schedule {
    /// Parse a stored schedule string.
    ///
    /// Anything that is not exactly one of the five forms, including values
    /// out of range, yields an empty daily schedule.
    pub fn parse(input: &str) -> Schedule {
        Self::try_parse(input).unwrap_or_default()
    }

    /// Like [`Schedule::parse`] but reports unrecognised input.
    pub fn try_parse(input: &str) -> Option<Schedule> {
        let s = input.trim();
        let p = patterns();
        if let Some(c) = p.hourly.captures(s) {
            let minute: u8 = c[1].parse().ok()?;
            return (minute < 60).then_some(Schedule::Hourly { minute });
        }
        if let Some(c) = p.daily.captures(s) {
            let times = parse_slots(&c[1], |t| t.parse().ok())?;
            return Some(Schedule::Daily { times });
        }
        if let Some(c) = p.weekly.captures(s) {
            let slots = parse_slots(&c[1], |slot| parse_at(slot, |d| d.parse().ok()))?;
            return Some(Schedule::Weekly { slots });
        }
        if let Some(c) = p.monthly.captures(s) {
            let slots = parse_slots(&c[1], |slot| {
                parse_at(slot, |d| d.parse::<u8>().ok().filter(|d| (1..=31).contains(d)))
            })?;
            return Some(Schedule::Monthly { slots });
        }
        if let Some(c) = p.cron.captures(s) {
            return Some(Schedule::Cron {
                expr: c[1].trim().to_string(),
            });
        }
        None
    }

    pub fn mode(&self) -> ScheduleMode {
        match self {
            Schedule::Hourly { .. } => ScheduleMode::Hourly,
            Schedule::Daily { .. } => ScheduleMode::Daily,
            Schedule::Weekly { .. } => ScheduleMode::Weekly,
            Schedule::Monthly { .. } => ScheduleMode::Monthly,
            Schedule::Cron { .. } => ScheduleMode::Cron,
        }
    }

    /// An empty schedule of the given mode, as after switching modes.
    pub fn empty(mode: ScheduleMode) -> Schedule {
        match mode {
            ScheduleMode::Hourly => Schedule::Hourly { minute: 0 },
            ScheduleMode::Daily => Schedule::Daily { times: Vec::new() },
            ScheduleMode::Weekly => Schedule::Weekly { slots: Vec::new() },
            ScheduleMode::Monthly => Schedule::Monthly { slots: Vec::new() },
            ScheduleMode::Cron => Schedule::Cron {
                expr: String::new(),
            },
        }
    }

    /// No slot or expression entered yet; serialises to the empty string.
    pub fn is_unset(&self) -> bool {
        match self {
            Schedule::Hourly { .. } => false,
            Schedule::Daily { times } => times.is_empty(),
            Schedule::Weekly { slots } => slots.is_empty(),
            Schedule::Monthly { slots } => slots.is_empty(),
            Schedule::Cron { expr } => expr.trim().is_empty(),
        }
    }

    /// Number of removable slots in the current mode.
    pub fn slot_count(&self) -> usize {
        match self {
            Schedule::Daily { times } => times.len(),
            Schedule::Weekly { slots } => slots.len(),
            Schedule::Monthly { slots } => slots.len(),
            Schedule::Hourly { .. } | Schedule::Cron { .. } => 0,
        }
    }

    /// Text of each removable slot, as it appears in the stored string.
    pub fn slot_labels(&self) -> Vec<String> {
        match self {
            Schedule::Daily { times } => times.iter().map(ToString::to_string).collect(),
            Schedule::Weekly { slots } => slots
                .iter()
                .map(|(d, t)| format!("{}@{t}", d.name()))
                .collect(),
            Schedule::Monthly { slots } => slots.iter().map(|(d, t)| format!("{d:02}@{t}")).collect(),
            Schedule::Hourly { .. } | Schedule::Cron { .. } => Vec::new(),
        }
    }

    /// Add one slot in the current mode.
    ///
    /// Daily takes `HH:MM`, weekly `day@HH:MM` and monthly `D@HH:MM`. Hourly
    /// replaces the minute and cron replaces the expression.
    pub fn add_slot(&mut self, input: &str) -> Result<(), SchemaError> {
        let s = input.trim();
        let invalid = || SchemaError::InvalidFormat {
            format: "schedule slot",
            input: input.to_string(),
        };
        match self {
            Schedule::Hourly { minute } => {
                *minute = s.parse::<u8>().ok().filter(|m| *m < 60).ok_or_else(invalid)?;
            }
            Schedule::Daily { times } => times.push(s.parse().map_err(|_| invalid())?),
            Schedule::Weekly { slots } => {
                slots.push(parse_at(s, |d| d.parse().ok()).ok_or_else(invalid)?);
            }
            Schedule::Monthly { slots } => {
                let slot = parse_at(s, |d| d.parse::<u8>().ok().filter(|d| (1..=31).contains(d)));
                slots.push(slot.ok_or_else(invalid)?);
            }
            Schedule::Cron { expr } => {
                if s.is_empty() {
                    return Err(invalid());
                }
                *expr = s.to_string();
            }
        }
        Ok(())
    }

    pub fn remove_slot(&mut self, index: usize) {
        match self {
            Schedule::Daily { times } if index < times.len() => {
                times.remove(index);
            }
            Schedule::Weekly { slots } if index < slots.len() => {
                slots.remove(index);
            }
            Schedule::Monthly { slots } if index < slots.len() => {
                slots.remove(index);
            }
            _ => {}
        }
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unset() {
            return Ok(());
        }
        match self {
            Schedule::Hourly { minute } => write!(f, "hourly({minute:02})"),
            Schedule::Daily { times } => {
                let body: Vec<_> = times.iter().map(ToString::to_string).collect();
                write!(f, "daily({})", body.join("|"))
            }
            Schedule::Weekly { slots } => {
                let body: Vec<_> = slots
                    .iter()
                    .map(|(d, t)| format!("{}@{t}", d.name()))
                    .collect();
                write!(f, "weekly({})", body.join("|"))
            }
            Schedule::Monthly { slots } => {
                let body: Vec<_> = slots.iter().map(|(d, t)| format!("{d:02}@{t}")).collect();
                write!(f, "monthly({})", body.join("|"))
            }
            Schedule::Cron { expr } => write!(f, "cron({})", expr.trim()),
        }
    }
}

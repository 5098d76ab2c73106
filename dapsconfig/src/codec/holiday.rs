use std::{fmt, str::FromStr, sync::OnceLock};

use regex::Regex;

use crate::data::schema::SchemaError;

/// Date range a holiday preset is active in. The range may wrap the new year.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HolidayRange {
    pub from_month: u8,
    pub from_day: u8,
    pub to_month: u8,
    pub to_day: u8,
}

fn pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^range\((\d{1,2})/(\d{1,2})-(\d{1,2})/(\d{1,2})\)$")
            .expect("range pattern is valid")
    })
}

impl HolidayRange {
    pub fn new(from_month: u8, from_day: u8, to_month: u8, to_day: u8) -> Option<Self> {
        let ok = |m: u8, d: u8| (1..=12).contains(&m) && (1..=31).contains(&d);
        (ok(from_month, from_day) && ok(to_month, to_day)).then_some(HolidayRange {
            from_month,
            from_day,
            to_month,
            to_day,
        })
    }

    /// Whether `month/day` falls inside the range, wrapping past December.
    pub fn contains(&self, month: u8, day: u8) -> bool {
        let from = (self.from_month, self.from_day);
        let to = (self.to_month, self.to_day);
        let at = (month, day);
        if from <= to {
            from <= at && at <= to
        } else {
            at >= from || at <= to
        }
    }
}

impl FromStr for HolidayRange {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || SchemaError::InvalidFormat {
            format: "holiday range",
            input: s.to_string(),
        };
        let c = pattern().captures(s.trim()).ok_or_else(invalid)?;
        let n = |i: usize| c[i].parse::<u8>().map_err(|_| invalid());
        HolidayRange::new(n(1)?, n(2)?, n(3)?, n(4)?).ok_or_else(invalid)
    }
}

impl fmt::Display for HolidayRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "range({:02}/{:02}-{:02}/{:02})",
            self.from_month, self.from_day, self.to_month, self.to_day
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let r: HolidayRange = "range(12/30-01/02)".parse().unwrap();
        assert_eq!(r, HolidayRange::new(12, 30, 1, 2).unwrap());
        assert_eq!(r.to_string(), "range(12/30-01/02)");
    }

    #[test]
    fn test_rejects_out_of_range() {
        assert!("range(13/01-01/02)".parse::<HolidayRange>().is_err());
        assert!("range(12/00-01/02)".parse::<HolidayRange>().is_err());
        assert!("12/30-01/02".parse::<HolidayRange>().is_err());
    }

    #[test]
    fn test_contains_wraps_year() {
        let r: HolidayRange = "range(12/30-01/02)".parse().unwrap();
        assert!(r.contains(12, 31));
        assert!(r.contains(1, 1));
        assert!(!r.contains(6, 1));
        let r: HolidayRange = "range(10/01-10/31)".parse().unwrap();
        assert!(r.contains(10, 15));
        assert!(!r.contains(11, 1));
    }
}

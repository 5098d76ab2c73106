//! Textual micro-formats stored in the configuration tree.
//!
//! Both formats must survive a parse/serialize round trip unchanged, since
//! the form rewrites the stored string after every edit.

/// `range(MM/DD-MM/DD)` holiday date ranges.
pub mod holiday;

/// `hourly(..)`, `daily(..)`, `weekly(..)`, `monthly(..)` and `cron(..)`.
pub mod schedule;

pub use holiday::HolidayRange;
pub use schedule::{Schedule, ScheduleMode, TimeOfDay, Weekday};

//! Daily and weekly maintenance-style time windows.
//!
//! A daily window is written `HH:MM-HH:MM` (UTC) and may wrap past midnight:
//! `23:30-00:15` lasts 45 minutes. A weekly window is written
//! `ddd:HH:MM-ddd:HH:MM` with three-letter day names and may wrap past the
//! end of the week.

use crate::error::{ValidationError, ValidationResult};
use std::fmt;

const MINUTES_PER_DAY: u32 = 24 * 60;
const MINUTES_PER_WEEK: u32 = 7 * MINUTES_PER_DAY;
const DAYS: [&str; 7] = ["mon", "tue", "wed", "thu", "fri", "sat", "sun"];

/// A validated daily window such as `03:00-04:00`.
///
/// ```rust
/// use cloud_resource_schemas::resource::value_objects::TimeWindow;
///
/// let window = TimeWindow::parse("preferred_backup_window", "23:30-00:15").unwrap();
/// assert_eq!(window.duration_minutes(), 45);
/// assert!(TimeWindow::parse("preferred_backup_window", "25:00-26:00").is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    start: u32,
    end: u32,
}

impl TimeWindow {
    /// Parse a window, reporting failures against `attribute`.
    pub fn parse(attribute: &str, value: &str) -> ValidationResult<Self> {
        let (start, end) = value
            .split_once('-')
            .ok_or_else(|| window_format_error(attribute, value, "HH:MM-HH:MM"))?;
        let start = parse_clock(start)
            .ok_or_else(|| window_format_error(attribute, value, "HH:MM-HH:MM"))?;
        let end =
            parse_clock(end).ok_or_else(|| window_format_error(attribute, value, "HH:MM-HH:MM"))?;
        Ok(Self { start, end })
    }

    /// Start as minutes after midnight.
    pub fn start_minute(&self) -> u32 {
        self.start
    }

    /// End as minutes after midnight.
    pub fn end_minute(&self) -> u32 {
        self.end
    }

    /// Length of the window, accounting for a wrap past midnight.
    pub fn duration_minutes(&self) -> u32 {
        (self.end + MINUTES_PER_DAY - self.start) % MINUTES_PER_DAY
    }

    /// Whether the window crosses midnight.
    pub fn wraps_midnight(&self) -> bool {
        self.end < self.start
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}-{:02}:{:02}",
            self.start / 60,
            self.start % 60,
            self.end / 60,
            self.end % 60
        )
    }
}

/// A validated weekly window such as `sun:05:00-sun:06:00`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeeklyTimeWindow {
    start: u32,
    end: u32,
}

impl WeeklyTimeWindow {
    /// Parse a window, reporting failures against `attribute`.
    pub fn parse(attribute: &str, value: &str) -> ValidationResult<Self> {
        let format = "ddd:HH:MM-ddd:HH:MM";
        let (start, end) = value
            .split_once('-')
            .ok_or_else(|| window_format_error(attribute, value, format))?;
        let start =
            parse_weekly(start).ok_or_else(|| window_format_error(attribute, value, format))?;
        let end = parse_weekly(end).ok_or_else(|| window_format_error(attribute, value, format))?;
        Ok(Self { start, end })
    }

    /// Start as minutes after Monday 00:00.
    pub fn start_minute(&self) -> u32 {
        self.start
    }

    /// Length of the window, accounting for a wrap past the end of the week.
    pub fn duration_minutes(&self) -> u32 {
        (self.end + MINUTES_PER_WEEK - self.start) % MINUTES_PER_WEEK
    }

    /// Whether a daily window, repeated every day, intersects this window.
    pub fn overlaps_daily(&self, daily: &TimeWindow) -> bool {
        let weekly = (self.start, self.duration_minutes());
        (0..7).any(|day| {
            let daily = (day * MINUTES_PER_DAY + daily.start_minute(), daily.duration_minutes());
            intervals_overlap(weekly, daily)
        })
    }
}

impl fmt::Display for WeeklyTimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let format_point = |minute: u32| {
            let day = DAYS[(minute / MINUTES_PER_DAY) as usize % 7];
            let minute = minute % MINUTES_PER_DAY;
            format!("{}:{:02}:{:02}", day, minute / 60, minute % 60)
        };
        write!(f, "{}-{}", format_point(self.start), format_point(self.end))
    }
}

fn window_format_error(attribute: &str, value: &str, format: &str) -> ValidationError {
    ValidationError::invalid_format(
        attribute,
        format!("'{value}' is not a valid {format} window"),
    )
}

fn parse_clock(value: &str) -> Option<u32> {
    let (hours, minutes) = value.split_once(':')?;
    if hours.len() != 2 || minutes.len() != 2 {
        return None;
    }
    let hours: u32 = hours.parse().ok()?;
    let minutes: u32 = minutes.parse().ok()?;
    (hours < 24 && minutes < 60).then_some(hours * 60 + minutes)
}

fn parse_weekly(value: &str) -> Option<u32> {
    let (day, clock) = value.split_once(':')?;
    let day = day.to_ascii_lowercase();
    let index = DAYS.iter().position(|candidate| *candidate == day)? as u32;
    Some(index * MINUTES_PER_DAY + parse_clock(clock)?)
}

/// Whether two `(start, length)` intervals on the weekly circle intersect.
fn intervals_overlap(a: (u32, u32), b: (u32, u32)) -> bool {
    let offset = |from: u32, to: u32| (to + MINUTES_PER_WEEK - from) % MINUTES_PER_WEEK;
    offset(a.0, b.0) < a.1 || offset(b.0, a.0) < b.1
}

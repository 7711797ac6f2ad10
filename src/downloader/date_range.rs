//! Inclusive calendar date ranges

use chrono::NaiveDate;
use std::fmt;

/// Inclusive span of calendar days, `start..=end`.
///
/// A range whose start is after its end is valid and simply contains no days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Create a range. No ordering check is made.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// First day
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// Last day
    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of days in the range (0 when reversed)
    pub fn len(&self) -> usize {
        let days = (self.end - self.start).num_days();
        if days < 0 {
            0
        } else {
            days as usize + 1
        }
    }

    /// Whether the range contains no days
    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }

    /// Ascending daily sequence from start to end inclusive.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        std::iter::successors(Some(self.start), |day| day.succ_opt())
            .take_while(move |day| *day <= end)
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} to {}",
            self.start.format(crate::DATE_FORMAT),
            self.end.format(crate::DATE_FORMAT)
        )
    }
}

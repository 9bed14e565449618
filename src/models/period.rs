//! Calendar periods: months, day windows and navigation direction.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Navigation direction for day and month views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Previous,
    Next,
}

/// A calendar month.
///
/// Always holds a representable first day, so day iteration never fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(into = "YearMonthRepr")]
pub struct YearMonth {
    first: NaiveDate,
}

#[derive(Serialize)]
struct YearMonthRepr {
    year: i32,
    month: u32,
}

impl From<YearMonth> for YearMonthRepr {
    fn from(value: YearMonth) -> Self {
        Self {
            year: value.year(),
            month: value.month(),
        }
    }
}

impl YearMonth {
    /// Create a month, rejecting months outside 1..=12 and unrepresentable years.
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(AppError::invalid_range(format!("month {month} is not in 1..=12")));
        }
        let first = NaiveDate::from_ymd_opt(year, month, 1)
            .ok_or_else(|| AppError::invalid_range(format!("year {year} is out of range")))?;
        Ok(Self { first })
    }

    /// Month containing `date`.
    pub fn of(date: NaiveDate) -> Self {
        Self {
            first: date.with_day(1).unwrap_or(date),
        }
    }

    pub fn year(&self) -> i32 {
        self.first.year()
    }

    pub fn month(&self) -> u32 {
        self.first.month()
    }

    pub fn first_day(&self) -> NaiveDate {
        self.first
    }

    pub fn last_day(&self) -> NaiveDate {
        self.days().last().unwrap_or(self.first)
    }

    /// Every calendar day of the month in chronological order.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + use<> {
        let month = self.month();
        self.first.iter_days().take_while(move |d| d.month() == month)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year() && date.month() == self.month()
    }

    /// Step one month, rolling the year over at January and December.
    pub fn navigate(self, direction: Direction) -> Result<Self> {
        let (year, month) = (self.year(), self.month());
        match direction {
            Direction::Previous if month == 1 => {
                let year = year
                    .checked_sub(1)
                    .ok_or_else(|| AppError::invalid_range("year underflow"))?;
                Self::new(year, 12)
            }
            Direction::Previous => Self::new(year, month - 1),
            Direction::Next if month == 12 => {
                let year = year
                    .checked_add(1)
                    .ok_or_else(|| AppError::invalid_range("year overflow"))?;
                Self::new(year, 1)
            }
            Direction::Next => Self::new(year, month + 1),
        }
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year(), self.month())
    }
}

impl FromStr for YearMonth {
    type Err = AppError;

    /// Parse `YYYY-MM`.
    fn from_str(s: &str) -> Result<Self> {
        let (year, month) = s
            .trim()
            .split_once('-')
            .ok_or_else(|| AppError::invalid_range(format!("expected YYYY-MM, got '{s}'")))?;
        let year: i32 = year
            .parse()
            .map_err(|_| AppError::invalid_range(format!("invalid year in '{s}'")))?;
        let month: u32 = month
            .parse()
            .map_err(|_| AppError::invalid_range(format!("invalid month in '{s}'")))?;
        Self::new(year, month)
    }
}

/// One local calendar day expressed as a half-open UTC interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    date: NaiveDate,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl DayWindow {
    /// Window of `date` as observed in `tz`.
    pub fn in_zone<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> Result<Self> {
        let next = date
            .succ_opt()
            .ok_or_else(|| AppError::invalid_range(format!("no day after {date}")))?;
        Ok(Self {
            date,
            start: local_midnight(date, tz)?,
            end: local_midnight(next, tz)?,
        })
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }
}

fn local_midnight<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> Result<DateTime<Utc>> {
    tz.from_local_datetime(&date.and_time(NaiveTime::MIN))
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| AppError::invalid_range(format!("local midnight of {date} does not exist")))
}

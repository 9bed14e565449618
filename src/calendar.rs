//! Calendar lookups for weekend classification.

use chrono::{Datelike, NaiveDate, Weekday};

/// Calendar facts about a single date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub day_of_week: Weekday,
    pub is_weekend: bool,
}

/// Source of day-of-week and weekend information.
pub trait Calendar {
    fn day(&self, date: NaiveDate) -> CalendarDay;
}

/// Calendar with a fixed set of weekend days.
#[derive(Debug, Clone)]
pub struct WeekdayCalendar {
    weekend: Vec<Weekday>,
}

impl WeekdayCalendar {
    pub fn new(weekend: Vec<Weekday>) -> Self {
        Self { weekend }
    }
}

impl Default for WeekdayCalendar {
    fn default() -> Self {
        Self::new(vec![Weekday::Sat, Weekday::Sun])
    }
}

impl Calendar for WeekdayCalendar {
    fn day(&self, date: NaiveDate) -> CalendarDay {
        let day_of_week = date.weekday();
        CalendarDay {
            date,
            day_of_week,
            is_weekend: self.weekend.contains(&day_of_week),
        }
    }
}

/// Full English name of a weekday.
pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

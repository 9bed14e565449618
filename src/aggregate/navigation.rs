//! Day and month navigation for report views.

use chrono::NaiveDate;

use crate::error::{AppError, Result};
use crate::models::{Direction, YearMonth};

/// Step one day back or forward.
pub fn navigate_day(current: NaiveDate, direction: Direction) -> Result<NaiveDate> {
    let next = match direction {
        Direction::Previous => current.pred_opt(),
        Direction::Next => current.succ_opt(),
    };
    next.ok_or_else(|| AppError::invalid_range(format!("cannot move {direction:?} from {current}")))
}

/// Step one month back or forward, rolling the year over.
pub fn navigate_month(current: YearMonth, direction: Direction) -> Result<YearMonth> {
    current.navigate(direction)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_navigate_day_across_month_end() {
        let date = NaiveDate::from_ymd_opt(2025, 2, 28).unwrap();
        assert_eq!(
            navigate_day(date, Direction::Next).unwrap(),
            NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()
        );
        let date = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        assert_eq!(
            navigate_day(date, Direction::Previous).unwrap(),
            NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()
        );
    }

    #[test]
    fn test_navigate_day_at_calendar_limit() {
        assert!(navigate_day(NaiveDate::MAX, Direction::Next).is_err());
        assert!(navigate_day(NaiveDate::MIN, Direction::Previous).is_err());
    }

    #[test]
    fn test_navigate_month_rollover() {
        let jan = YearMonth::new(2025, 1).unwrap();
        assert_eq!(
            navigate_month(jan, Direction::Previous).unwrap(),
            YearMonth::new(2024, 12).unwrap()
        );
        let dec = YearMonth::new(2025, 12).unwrap();
        assert_eq!(navigate_month(dec, Direction::Next).unwrap(), YearMonth::new(2026, 1).unwrap());
    }
}

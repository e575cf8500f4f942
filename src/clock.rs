//! Wall-clock access in the reporting time zone.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};

use crate::error::{PipelineError, PipelineResult};

/// Source of the current instant.
///
/// The freshness gate compares against "today" and the orchestrator stamps
/// run timings, so both read time through this seam.
pub trait Clock: Send + Sync {
    /// Returns the current instant in the reporting offset.
    fn now(&self) -> DateTime<FixedOffset>;

    /// Returns the current calendar date in the reporting offset.
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// [`Clock`] reading the system time.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    offset: FixedOffset,
}

impl SystemClock {
    /// Creates a clock that reports time at the given offset.
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    /// Creates a clock from a whole-hour UTC offset such as `-3`.
    pub fn from_offset_hours(hours: i32) -> PipelineResult<Self> {
        let offset = hours
            .checked_mul(3600)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| PipelineError::InvalidConfig {
                field: "schedule.utc_offset_hours".to_string(),
                message: format!("{} is not a valid UTC offset", hours),
            })?;
        Ok(Self::new(offset))
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_offset_hours_accepts_brazil_offset() {
        let clock = SystemClock::from_offset_hours(-3).unwrap();
        assert_eq!(clock.now().offset().local_minus_utc(), -3 * 3600);
    }

    #[test]
    fn test_from_offset_hours_rejects_out_of_range() {
        let result = SystemClock::from_offset_hours(30);
        assert!(matches!(result, Err(PipelineError::InvalidConfig { .. })));
    }

    #[test]
    fn test_from_offset_hours_rejects_overflowing_value() {
        let result = SystemClock::from_offset_hours(i32::MAX);
        assert!(matches!(result, Err(PipelineError::InvalidConfig { .. })));
    }

    #[test]
    fn test_today_uses_offset_date() {
        struct Fixed;
        impl Clock for Fixed {
            fn now(&self) -> DateTime<FixedOffset> {
                DateTime::parse_from_rfc3339("2026-10-16T01:30:00-03:00").unwrap()
            }
        }
        assert_eq!(Fixed.today(), NaiveDate::from_ymd_opt(2026, 10, 16).unwrap());
    }
}

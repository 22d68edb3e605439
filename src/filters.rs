use jiff::civil::{Date, DateTime};
use thiserror::Error;

/// A violation of the date/range filter rules. Always a client error; the
/// HTTP layer maps it to 422 without rewording the message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidFilter {
    #[error("'for_date' is mutually exclusive with an explicit 'start_time'/'end_time' range")]
    DateWithRange,
    #[error("range bounds must be given as a pair: both 'start_time' and 'end_time'")]
    HalfOpenRange,
    #[error("a filter is required: pass 'for_date' or both 'start_time' and 'end_time'")]
    NoFilter,
    #[error("'start_time' must precede 'end_time'")]
    StartNotBeforeEnd,
    #[error("could not parse '{param}': '{value}'")]
    Unparsable { param: &'static str, value: String },
}

/// Closed interval on `gps_time`, inclusive at both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: DateTime,
    pub end: DateTime,
}

/// Checks the three optional filter inputs against the rules, in order:
/// `for_date` excludes explicit bounds, bounds come in pairs, something must
/// be supplied, and `start_time` must precede `end_time`. A lone `for_date`
/// expands to the full calendar day at microsecond resolution.
pub fn validate(
    for_date: Option<Date>,
    start_time: Option<DateTime>,
    end_time: Option<DateTime>,
) -> Result<TimeRange, InvalidFilter> {
    match (for_date, start_time, end_time) {
        (Some(_), Some(_), _) | (Some(_), _, Some(_)) => Err(InvalidFilter::DateWithRange),
        (None, Some(_), None) | (None, None, Some(_)) => Err(InvalidFilter::HalfOpenRange),
        (None, None, None) => Err(InvalidFilter::NoFilter),
        (None, Some(start), Some(end)) if start >= end => Err(InvalidFilter::StartNotBeforeEnd),
        (None, Some(start), Some(end)) => Ok(TimeRange { start, end }),
        (Some(day), None, None) => Ok(TimeRange {
            start: day.at(0, 0, 0, 0),
            end: day.at(23, 59, 59, 999_999_000),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jiff::civil::{date, datetime};

    #[test]
    fn rejects_date_together_with_bounds() {
        let day = date(2023, 1, 1);
        let ts = datetime(2023, 1, 1, 12, 0, 0, 0);
        assert_eq!(
            validate(Some(day), Some(ts), None),
            Err(InvalidFilter::DateWithRange)
        );
        assert_eq!(
            validate(Some(day), None, Some(ts)),
            Err(InvalidFilter::DateWithRange)
        );
        assert_eq!(
            validate(Some(day), Some(ts), Some(ts)),
            Err(InvalidFilter::DateWithRange)
        );
    }

    #[test]
    fn rejects_half_open_range() {
        let ts = datetime(2023, 1, 1, 12, 0, 0, 0);
        assert_eq!(validate(None, Some(ts), None), Err(InvalidFilter::HalfOpenRange));
        assert_eq!(validate(None, None, Some(ts)), Err(InvalidFilter::HalfOpenRange));
    }

    #[test]
    fn rejects_missing_filter() {
        assert_eq!(validate(None, None, None), Err(InvalidFilter::NoFilter));
    }

    #[test]
    fn rejects_start_at_or_after_end() {
        let start = datetime(2023, 1, 1, 12, 0, 0, 0);
        assert_eq!(
            validate(None, Some(start), Some(start)),
            Err(InvalidFilter::StartNotBeforeEnd)
        );
        let earlier = datetime(2023, 1, 1, 11, 0, 0, 0);
        assert_eq!(
            validate(None, Some(start), Some(earlier)),
            Err(InvalidFilter::StartNotBeforeEnd)
        );
    }

    #[test]
    fn accepts_ordered_bounds() {
        let start = datetime(2023, 1, 1, 11, 0, 0, 0);
        let end = datetime(2023, 1, 1, 12, 0, 0, 0);
        assert_eq!(validate(None, Some(start), Some(end)), Ok(TimeRange { start, end }));
    }

    #[test]
    fn expands_date_to_full_day() {
        let range = validate(Some(date(2023, 6, 15)), None, None).unwrap();
        assert_eq!(range.start, datetime(2023, 6, 15, 0, 0, 0, 0));
        assert_eq!(range.end, datetime(2023, 6, 15, 23, 59, 59, 999_999_000));
    }
}

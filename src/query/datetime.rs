//! Calendar periods inferred from the precision of a date/time string.
//!
//! `2017` covers the whole year, `2017-06` the month, `2017-06-10T12` the hour, and so on.
//! Fractional seconds narrow the period to the millisecond, microsecond or nanosecond, by
//! digit count: `10:30:15.25` covers `15.250` through `15.250999999`. Offsets are folded into UTC.

use super::types::Instant;
use crate::errors::{Result, SearchError};
use chrono::{Datelike, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Granularity {
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
    Milli,
    Micro,
    Nano,
    Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    local_start: NaiveDateTime,
    offset: FixedOffset,
    granularity: Granularity,
}

fn invalid(s: &str) -> SearchError {
    SearchError::Parameter(format!("invalid datetime component: {s}"))
}

fn digits(s: &str, len: usize) -> Option<u32> {
    (s.len() == len && s.bytes().all(|b| b.is_ascii_digit())).then(|| s.parse().ok()).flatten()
}

fn utc() -> FixedOffset {
    Utc.fix()
}

/// Splits a trailing `Z` or `+HH:MM`/`-HHMM`/`+HH` offset off a time string.
fn split_offset(time: &str) -> Option<(&str, FixedOffset)> {
    if let Some(rest) = time.strip_suffix(['Z', 'z']) {
        return Some((rest, utc()));
    }
    let Some(pos) = time.rfind(['+', '-']) else {
        return Some((time, utc()));
    };
    let (clock, off) = time.split_at(pos);
    let sign = if off.starts_with('-') { -1 } else { 1 };
    let body = off[1..].replace(':', "");
    let (h, m) = match body.len() {
        2 => (digits(&body, 2)?, 0),
        4 => (digits(body.get(..2)?, 2)?, digits(body.get(2..)?, 2)?),
        _ => return None,
    };
    let secs = i32::try_from(h * 3600 + m * 60).ok()?;
    Some((clock, FixedOffset::east_opt(sign * secs)?))
}

fn parse_clock(clock: &str) -> Option<(NaiveTime, Granularity)> {
    let (hms, frac) = match clock.split_once(['.', ',']) {
        Some((hms, frac)) => (hms, Some(frac)),
        None => (clock, None),
    };
    let parts: Vec<&str> = hms.split(':').collect();
    let h = digits(parts.first()?, 2)?;
    let m = parts.get(1).map_or(Some(0), |p| digits(p, 2))?;
    let s = parts.get(2).map_or(Some(0), |p| digits(p, 2))?;
    let granularity = match (parts.len(), frac.map(str::len)) {
        (1, None) => Granularity::Hour,
        (2, None) => Granularity::Minute,
        (3, None) => Granularity::Second,
        (3, Some(1..=3)) => Granularity::Milli,
        (3, Some(4..=6)) => Granularity::Micro,
        (3, Some(7..=9)) => Granularity::Nano,
        _ => return None,
    };
    let nanos = match frac {
        Some(f) if !f.is_empty() && f.len() <= 9 && f.bytes().all(|b| b.is_ascii_digit()) => {
            format!("{f:0<9}").parse::<u32>().ok()?
        }
        Some(_) => return None,
        None => 0,
    };
    Some((NaiveTime::from_hms_nano_opt(h, m, s, nanos)?, granularity))
}

impl Period {
    /// Parses a date or date-time of any supported precision.
    ///
    /// # Errors
    /// Returns `SearchError::Parameter` when the text is not a recognizable date/time.
    pub fn parse(text: &str) -> Result<Self> {
        let s = text.trim();
        let (date, time) = match s.find(['T', 't', ' ']) {
            Some(i) => (&s[..i], Some(&s[i + 1..])),
            None => (s, None),
        };
        let fields: Vec<&str> = date.split('-').collect();
        let year = fields.first().and_then(|y| digits(y, 4)).ok_or_else(|| invalid(text))?;
        let year = i32::try_from(year).map_err(|_| invalid(text))?;
        let month = fields.get(1).map(|m| digits(m, 2)).unwrap_or(Some(1)).ok_or_else(|| invalid(text))?;
        let day = fields.get(2).map(|d| digits(d, 2)).unwrap_or(Some(1)).ok_or_else(|| invalid(text))?;
        if fields.len() > 3 {
            return Err(invalid(text));
        }
        let day_of = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| invalid(text))?;

        let date_granularity = match fields.len() {
            1 => Granularity::Year,
            2 => Granularity::Month,
            _ => Granularity::Day,
        };
        let (clock, offset, granularity) = match time {
            None => (NaiveTime::MIN, utc(), date_granularity),
            Some(_) if date_granularity != Granularity::Day => return Err(invalid(text)),
            Some(t) => {
                let (clock, offset) = split_offset(t).ok_or_else(|| invalid(text))?;
                let (clock, g) = parse_clock(clock).ok_or_else(|| invalid(text))?;
                (clock, offset, g)
            }
        };
        Ok(Self { local_start: day_of.and_time(clock), offset, granularity })
    }

    /// A concrete instant is its own period.
    #[must_use]
    pub fn from_instant(instant: Instant) -> Self {
        Self { local_start: instant.naive_utc(), offset: utc(), granularity: Granularity::Instant }
    }

    #[must_use]
    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    fn to_utc(&self, local: NaiveDateTime) -> Instant {
        (local - self.offset).and_utc()
    }

    #[must_use]
    pub fn start(&self) -> Instant {
        self.to_utc(self.local_start)
    }

    /// The last nanosecond of the period.
    #[must_use]
    pub fn end(&self) -> Instant {
        let next = match self.granularity {
            Granularity::Instant => return self.start(),
            Granularity::Year => NaiveDate::from_ymd_opt(self.local_start.year() + 1, 1, 1)
                .map(|d| d.and_time(NaiveTime::MIN)),
            Granularity::Month => {
                let d = self.local_start.date();
                let (y, m) = if d.month0() == 11 { (d.year() + 1, 1) } else { (d.year(), d.month() + 1) };
                NaiveDate::from_ymd_opt(y, m, 1).map(|d| d.and_time(NaiveTime::MIN))
            }
            Granularity::Day => Some(self.local_start + Duration::days(1)),
            Granularity::Hour => Some(self.local_start + Duration::hours(1)),
            Granularity::Minute => Some(self.local_start + Duration::minutes(1)),
            Granularity::Second => Some(self.local_start + Duration::seconds(1)),
            Granularity::Milli => Some(self.local_start + Duration::milliseconds(1)),
            Granularity::Micro => Some(self.local_start + Duration::microseconds(1)),
            Granularity::Nano => Some(self.local_start + Duration::nanoseconds(1)),
        };
        next.map_or(self.start(), |n| self.to_utc(n) - Duration::nanoseconds(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn ts(s: &str) -> Instant {
        chrono::DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn year_period() {
        let p = Period::parse("2017").unwrap();
        assert_eq!(p.granularity(), Granularity::Year);
        assert_eq!(p.start(), ts("2017-01-01T00:00:00Z"));
        assert_eq!(p.end(), ts("2017-12-31T23:59:59.999999999Z"));
    }

    #[test]
    fn month_period_handles_december_and_leap_february() {
        assert_eq!(Period::parse("2021-12").unwrap().end(), ts("2021-12-31T23:59:59.999999999Z"));
        assert_eq!(Period::parse("2020-02").unwrap().end(), ts("2020-02-29T23:59:59.999999999Z"));
    }

    #[test]
    fn time_granularities() {
        assert_eq!(Period::parse("2020-05-01").unwrap().end(), ts("2020-05-01T23:59:59.999999999Z"));
        assert_eq!(Period::parse("2020-05-01T10").unwrap().end(), ts("2020-05-01T10:59:59.999999999Z"));
        assert_eq!(
            Period::parse("2020-05-01T10:30Z").unwrap().end(),
            ts("2020-05-01T10:30:59.999999999Z")
        );
        let p = Period::parse("2020-05-01T10:30:15Z").unwrap();
        assert_eq!(p.granularity(), Granularity::Second);
        assert_eq!(p.end().nanosecond(), 999_999_999);
    }

    #[test]
    fn fractional_seconds_follow_digit_count() {
        let p = Period::parse("2020-05-01T10:30:15.25Z").unwrap();
        assert_eq!(p.granularity(), Granularity::Milli);
        assert_eq!(p.start(), ts("2020-05-01T10:30:15.25Z"));
        assert_eq!(p.end(), ts("2020-05-01T10:30:15.250999999Z"));

        let p = Period::parse("2020-05-01T10:30:15,1234Z").unwrap();
        assert_eq!(p.granularity(), Granularity::Micro);
        assert_eq!(p.end(), ts("2020-05-01T10:30:15.123400999Z"));

        let p = Period::parse("2020-05-01T10:30:15.123456789Z").unwrap();
        assert_eq!(p.granularity(), Granularity::Nano);
        assert_eq!(p.start(), p.end());

        assert!(Period::parse("2020-05-01T10:30:15.1234567891Z").is_err());
        assert!(Period::parse("2020-05-01T10:30:15.Z").is_err());
    }

    #[test]
    fn multibyte_offset_is_rejected() {
        for bad in ["2020-01-01T10+aéb", "2020-01-01T10+é", "2020-01-01T10-1é"] {
            assert!(matches!(Period::parse(bad), Err(SearchError::Parameter(_))), "{bad}");
        }
    }

    #[test]
    fn offsets_fold_into_utc() {
        let p = Period::parse("2020-05-01T02:00:00+02:00").unwrap();
        assert_eq!(p.start(), ts("2020-05-01T00:00:00Z"));
        let p = Period::parse("2020-05-01T02-0130").unwrap();
        assert_eq!(p.start(), ts("2020-05-01T03:30:00Z"));
    }

    #[test]
    fn rejects_garbage() {
        for bad in ["", "20", "2020-13", "2020-02-30", "abcd", "2020-01-01Tnope", "2020T10", "2020-01-01-01"] {
            assert!(matches!(Period::parse(bad), Err(SearchError::Parameter(_))), "{bad}");
        }
    }

    #[test]
    fn instant_is_its_own_period() {
        let t = ts("2019-03-04T05:06:07Z");
        let p = Period::from_instant(t);
        assert_eq!((p.start(), p.end()), (t, t));
    }
}

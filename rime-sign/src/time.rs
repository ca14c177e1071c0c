//! `UTCTime` and `GeneralizedTime` values.

use crate::error::DerError;
use core::fmt;

/// A point in time with a UTC offset, as found in signatures and certificates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateTime {
    year: u16,
    month: u8,
    day: u8,
    hour: u8,
    minute: u8,
    second: u8,
    offset_minutes: i16,
}

impl DateTime {
    /// Create a new time. Returns `None` if a field is out of range.
    pub fn new(
        year: u16,
        month: u8,
        day: u8,
        hour: u8,
        minute: u8,
        second: u8,
        offset_minutes: i16,
    ) -> Option<Self> {
        let valid = (1..=12).contains(&month)
            && day >= 1
            && day <= days_in_month(year, month)
            && hour < 24
            && minute < 60
            // Leap seconds.
            && second <= 60
            && offset_minutes.abs() < 24 * 60;

        valid.then_some(Self {
            year,
            month,
            day,
            hour,
            minute,
            second,
            offset_minutes,
        })
    }

    /// Parse the contents of a `UTCTime`, `YYMMDDhhmm[ss](Z|±hhmm)`.
    pub(crate) fn parse_utc_time(text: &[u8]) -> Result<Self, DerError> {
        let mut r = Digits::new(text);

        // Two-digit years cover 1950 to 2049.
        let year = match r.number(2)? {
            y @ 50.. => 1900 + y,
            y => 2000 + y,
        };
        let (month, day, hour, minute) = (r.number(2)?, r.number(2)?, r.number(2)?, r.number(2)?);
        let second = if r.peek_digit() { r.number(2)? } else { 0 };
        let offset = r.offset()?;

        build(year, month, day, hour, minute, second, offset)
    }

    /// Parse the contents of a `GeneralizedTime`,
    /// `YYYYMMDDhh[mm[ss[.fff]]][Z|±hhmm]`.
    pub(crate) fn parse_generalized_time(text: &[u8]) -> Result<Self, DerError> {
        let mut r = Digits::new(text);

        let (year, month, day, hour) = (r.number(4)?, r.number(2)?, r.number(2)?, r.number(2)?);
        let minute = if r.peek_digit() { r.number(2)? } else { 0 };
        let second = if r.peek_digit() { r.number(2)? } else { 0 };

        if r.eat(b'.') || r.eat(b',') {
            while r.peek_digit() {
                r.pos += 1;
            }
        }

        // A missing suffix means local time, which is treated as UTC.
        let offset = if r.at_end() { 0 } else { r.offset()? };

        build(year, month, day, hour, minute, second, offset)
    }

    /// The year.
    pub fn year(&self) -> u16 {
        self.year
    }

    /// The month, from 1 to 12.
    pub fn month(&self) -> u8 {
        self.month
    }

    /// The day of the month, starting at 1.
    pub fn day(&self) -> u8 {
        self.day
    }

    /// The hour.
    pub fn hour(&self) -> u8 {
        self.hour
    }

    /// The minute.
    pub fn minute(&self) -> u8 {
        self.minute
    }

    /// The second.
    pub fn second(&self) -> u8 {
        self.second
    }

    /// The offset from UTC in minutes.
    pub fn offset_minutes(&self) -> i16 {
        self.offset_minutes
    }

    /// Seconds since 1970-01-01T00:00:00Z.
    pub fn unix_timestamp(&self) -> i64 {
        let days = days_from_civil(i64::from(self.year), i64::from(self.month), i64::from(self.day));

        days * 86_400 + i64::from(self.hour) * 3600 + i64::from(self.minute) * 60
            + i64::from(self.second)
            - i64::from(self.offset_minutes) * 60
    }
}

impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )?;

        match self.offset_minutes {
            0 => write!(f, "Z"),
            o => {
                let sign = if o < 0 { '-' } else { '+' };
                write!(f, "{sign}{:02}:{:02}", o.abs() / 60, o.abs() % 60)
            }
        }
    }
}

fn build(
    year: u32,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
    second: u32,
    offset: i16,
) -> Result<DateTime, DerError> {
    // All fields have at most four digits.
    DateTime::new(
        year as u16,
        month as u8,
        day as u8,
        hour as u8,
        minute as u8,
        second as u8,
        offset,
    )
    .ok_or(DerError::InvalidTime)
}

struct Digits<'a> {
    text: &'a [u8],
    pos: usize,
}

impl<'a> Digits<'a> {
    fn new(text: &'a [u8]) -> Self {
        Self { text, pos: 0 }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.text.len()
    }

    fn peek_digit(&self) -> bool {
        self.text.get(self.pos).is_some_and(u8::is_ascii_digit)
    }

    fn eat(&mut self, b: u8) -> bool {
        if self.text.get(self.pos) == Some(&b) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn number(&mut self, len: usize) -> Result<u32, DerError> {
        let digits = self
            .text
            .get(self.pos..self.pos + len)
            .filter(|d| d.iter().all(u8::is_ascii_digit))
            .ok_or(DerError::InvalidTime)?;
        self.pos += len;

        Ok(digits
            .iter()
            .fold(0, |acc, d| acc * 10 + u32::from(d - b'0')))
    }

    /// `Z` or `±hhmm`, which must end the value.
    fn offset(&mut self) -> Result<i16, DerError> {
        let offset = if self.eat(b'Z') {
            0
        } else {
            let sign = if self.eat(b'+') {
                1
            } else if self.eat(b'-') {
                -1
            } else {
                return Err(DerError::InvalidTime);
            };

            let (hours, minutes) = (self.number(2)?, self.number(2)?);

            if minutes >= 60 {
                return Err(DerError::InvalidTime);
            }

            sign * (hours * 60 + minutes) as i16
        };

        if !self.at_end() {
            return Err(DerError::InvalidTime);
        }

        Ok(offset)
    }
}

fn is_leap_year(year: u16) -> bool {
    (year.is_multiple_of(4) && !year.is_multiple_of(100)) || year.is_multiple_of(400)
}

fn days_in_month(year: u16, month: u8) -> u8 {
    match month {
        2 if is_leap_year(year) => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

/// The number of days since 1970-01-01 of a date in the proleptic Gregorian
/// calendar.
fn days_from_civil(year: i64, month: i64, day: i64) -> i64 {
    let year = if month <= 2 { year - 1 } else { year };
    let era = year.div_euclid(400);
    let year_of_era = year - era * 400;
    let month_index = if month > 2 { month - 3 } else { month + 9 };
    let day_of_year = (153 * month_index + 2) / 5 + day - 1;
    let day_of_era = year_of_era * 365 + year_of_era / 4 - year_of_era / 100 + day_of_year;

    era * 146_097 + day_of_era - 719_468
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utc_time() {
        let t = DateTime::parse_utc_time(b"240229123456Z").unwrap();

        assert_eq!((t.year(), t.month(), t.day()), (2024, 2, 29));
        assert_eq!((t.hour(), t.minute(), t.second()), (12, 34, 56));
        assert_eq!(t.to_string(), "2024-02-29T12:34:56Z");

        let old = DateTime::parse_utc_time(b"9912312359Z").unwrap();
        assert_eq!(old.year(), 1999);
        assert_eq!(old.second(), 0);
    }

    #[test]
    fn generalized_time() {
        let t = DateTime::parse_generalized_time(b"20230615083000.123+0200").unwrap();

        assert_eq!(t.offset_minutes(), 120);
        assert_eq!(t.to_string(), "2023-06-15T08:30:00+02:00");
        assert_eq!(
            t.unix_timestamp(),
            DateTime::parse_generalized_time(b"20230615063000Z")
                .unwrap()
                .unix_timestamp()
        );

        let local = DateTime::parse_generalized_time(b"2023061508").unwrap();
        assert_eq!((local.hour(), local.minute()), (8, 0));
    }

    #[test]
    fn unix_timestamp() {
        assert_eq!(
            DateTime::parse_utc_time(b"700101000000Z")
                .unwrap()
                .unix_timestamp(),
            0
        );
        assert_eq!(
            DateTime::parse_generalized_time(b"20000301000000Z")
                .unwrap()
                .unix_timestamp(),
            951_868_800
        );
    }

    #[test]
    fn invalid() {
        assert!(DateTime::parse_utc_time(b"230230120000Z").is_err());
        assert!(DateTime::parse_utc_time(b"231301120000Z").is_err());
        assert!(DateTime::parse_utc_time(b"2306151200").is_err());
        assert!(DateTime::parse_utc_time(b"230615120000Zjunk").is_err());
        assert!(DateTime::parse_generalized_time(b"2023").is_err());
    }
}

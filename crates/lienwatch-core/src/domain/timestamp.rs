use std::fmt::{Display, Formatter};

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::format_description::well_known::Rfc3339;
use time::{Date, Month, OffsetDateTime, UtcOffset};

use crate::ValidationError;

/// RFC3339 timestamp guaranteed to be UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UtcDateTime(OffsetDateTime);

impl UtcDateTime {
    pub fn now() -> Self {
        Self(OffsetDateTime::now_utc())
    }

    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let parsed = OffsetDateTime::parse(input, &Rfc3339).map_err(|_| {
            ValidationError::TimestampNotUtc {
                value: input.to_owned(),
            }
        })?;

        Self::from_offset_datetime(parsed).map_err(|_| ValidationError::TimestampNotUtc {
            value: input.to_owned(),
        })
    }

    pub fn from_offset_datetime(value: OffsetDateTime) -> Result<Self, ValidationError> {
        if value.offset() != UtcOffset::UTC {
            return Err(ValidationError::TimestampNotUtc {
                value: value
                    .format(&Rfc3339)
                    .unwrap_or_else(|_| String::from("<unformattable>")),
            });
        }

        Ok(Self(value))
    }

    pub fn into_inner(self) -> OffsetDateTime {
        self.0
    }

    /// Calendar date of this instant in UTC.
    pub fn date(self) -> FilingDate {
        FilingDate(self.0.date())
    }

    /// Instant `days` days before this one, clamped to the Unix epoch.
    pub fn days_before(self, days: u32) -> Self {
        self.0
            .checked_sub(time::Duration::days(i64::from(days)))
            .map(Self)
            .unwrap_or(Self(OffsetDateTime::UNIX_EPOCH))
    }

    /// Instant `millis` milliseconds after this one, saturating at the max.
    pub fn after_millis(self, millis: u64) -> Self {
        let millis = i64::try_from(millis).unwrap_or(i64::MAX);
        self.0
            .checked_add(time::Duration::milliseconds(millis))
            .map(Self)
            .unwrap_or(self)
    }

    pub fn format_rfc3339(self) -> String {
        self.0
            .format(&Rfc3339)
            .expect("UtcDateTime must be RFC3339 formattable")
    }
}

impl Display for UtcDateTime {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.format_rfc3339())
    }
}

impl Serialize for UtcDateTime {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.format_rfc3339())
    }
}

impl<'de> Deserialize<'de> for UtcDateTime {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Self::parse(&value).map_err(D::Error::custom)
    }
}

/// Calendar date a filing was recorded on.
///
/// Accepts `YYYY-MM-DD` (canonical) and the `MM/DD/YYYY` form many state
/// portals render; always serializes as `YYYY-MM-DD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FilingDate(Date);

impl FilingDate {
    pub fn from_ymd(year: i32, month: u8, day: u8) -> Result<Self, ValidationError> {
        let invalid = || ValidationError::InvalidFilingDate {
            value: format!("{year:04}-{month:02}-{day:02}"),
        };
        let month = Month::try_from(month).map_err(|_| invalid())?;
        Date::from_calendar_date(year, month, day)
            .map(Self)
            .map_err(|_| invalid())
    }

    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        let invalid = || ValidationError::InvalidFilingDate {
            value: input.to_owned(),
        };

        // Timestamps like "2021-03-04T00:00:00Z" carry the date in the first ten chars.
        let candidate = match trimmed.split_once('T') {
            Some((date, _)) if date.len() == 10 => date,
            _ => trimmed,
        };

        let (year, month, day) = if candidate.contains('/') {
            let mut parts = candidate.split('/');
            let month = parts.next().ok_or_else(invalid)?;
            let day = parts.next().ok_or_else(invalid)?;
            let year = parts.next().ok_or_else(invalid)?;
            if parts.next().is_some() {
                return Err(invalid());
            }
            (year, month, day)
        } else {
            let mut parts = candidate.split('-');
            let year = parts.next().ok_or_else(invalid)?;
            let month = parts.next().ok_or_else(invalid)?;
            let day = parts.next().ok_or_else(invalid)?;
            if parts.next().is_some() {
                return Err(invalid());
            }
            (year, month, day)
        };

        if year.len() != 4 {
            return Err(invalid());
        }
        let year = year.parse::<i32>().map_err(|_| invalid())?;
        let month = month.parse::<u8>().map_err(|_| invalid())?;
        let day = day.parse::<u8>().map_err(|_| invalid())?;

        Self::from_ymd(year, month, day).map_err(|_| invalid())
    }

    pub fn today() -> Self {
        UtcDateTime::now().date()
    }

    pub fn into_inner(self) -> Date {
        self.0
    }

    /// Whole days from this date until `later` (negative when `later` is earlier).
    pub fn days_until(self, later: FilingDate) -> i64 {
        (later.0 - self.0).whole_days()
    }

    pub fn format_iso(self) -> String {
        format!(
            "{:04}-{:02}-{:02}",
            self.0.year(),
            u8::from(self.0.month()),
            self.0.day()
        )
    }
}

impl Display for FilingDate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.format_iso())
    }
}

impl Serialize for FilingDate {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.format_iso())
    }
}

impl<'de> Deserialize<'de> for FilingDate {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Self::parse(&value).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_utc_timestamp() {
        let parsed = UtcDateTime::parse("2024-01-01T00:00:00Z").expect("must parse");
        assert_eq!(parsed.format_rfc3339(), "2024-01-01T00:00:00Z");
    }

    #[test]
    fn rejects_non_utc_timestamp() {
        let err = UtcDateTime::parse("2024-01-01T01:00:00+01:00").expect_err("must fail");
        assert!(matches!(err, ValidationError::TimestampNotUtc { .. }));
    }

    #[test]
    fn days_before_moves_back_whole_days() {
        let parsed = UtcDateTime::parse("2024-03-10T12:00:00Z").expect("must parse");
        assert_eq!(
            parsed.days_before(10).format_rfc3339(),
            "2024-02-29T12:00:00Z"
        );
    }

    #[test]
    fn filing_date_accepts_iso_and_portal_forms() {
        let iso = FilingDate::parse("2019-07-04").expect("iso date");
        let portal = FilingDate::parse("07/04/2019").expect("portal date");
        let stamped = FilingDate::parse("2019-07-04T00:00:00Z").expect("timestamp date");

        assert_eq!(iso, portal);
        assert_eq!(iso, stamped);
        assert_eq!(iso.to_string(), "2019-07-04");
    }

    #[test]
    fn filing_date_rejects_garbage() {
        for value in ["", "2019-13-01", "2019-02-30", "19-01-01", "yesterday", "2019-01-01-01"] {
            let err = FilingDate::parse(value).expect_err("must fail");
            assert!(matches!(err, ValidationError::InvalidFilingDate { .. }), "{value}");
        }
    }

    #[test]
    fn days_until_counts_calendar_days() {
        let start = FilingDate::from_ymd(2020, 1, 1).expect("valid");
        let end = FilingDate::from_ymd(2021, 1, 1).expect("valid");
        assert_eq!(start.days_until(end), 366);
        assert_eq!(end.days_until(start), -366);
    }
}

//! Lenient parsing of date and time literals.
//!
//! The accepted forms are:
//! - `2018-12-07`
//! - `2018-12-07T06:24:24`, `2018-12-07 06:24:24`
//! - either datetime form with fractional seconds, e.g. `2018-12-07T06:24:24.000000`
//! - either datetime form with an offset: `Z`, `+08:00` or `+0800`
//!
//! Literals without an offset are naive and take the caller's default
//! time zone. Literals with an offset keep it.

use chrono::format::{self, Parsed, StrftimeItems};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, ParseError, TimeZone};

use crate::filtering::QueryError;

/// How datetimes are rendered for display.
pub const STANDARD_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const AWARE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f%#z", "%Y-%m-%d %H:%M:%S%.f%#z"];
const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];
const DATE_FORMAT: &str = "%Y-%m-%d";

/// A literal that is either already aware, or needs a zone attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsedDateTime {
    Naive(NaiveDateTime),
    Aware(DateTime<FixedOffset>),
}

fn invalid(s: &str) -> QueryError {
    QueryError::InvalidDateLiteral(s.to_string())
}

fn parse_offset(s: &str) -> Result<FixedOffset, ParseError> {
    let mut parsed = Parsed::new();
    format::parse(&mut parsed, s, StrftimeItems::new("%#z"))?;
    parsed.to_fixed_offset()
}

/// Parse a date or datetime literal without attaching any zone.
pub fn parse_datetime(s: &str) -> Result<ParsedDateTime, QueryError> {
    if let Some(dt) = AWARE_FORMATS
        .iter()
        .find_map(|f| DateTime::parse_from_str(s, f).ok())
    {
        return Ok(ParsedDateTime::Aware(dt));
    }

    if let Some(naive) = NAIVE_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
    {
        return Ok(ParsedDateTime::Naive(naive));
    }

    NaiveDate::parse_from_str(s, DATE_FORMAT)
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(ParsedDateTime::Naive)
        .ok_or_else(|| invalid(s))
}

/// Parse a literal into an aware datetime, using `tz` for naive
/// literals.
///
/// ```rust
/// use chrono::{FixedOffset, Timelike};
/// use queryset_cmd::datetime::to_aware_datetime;
///
/// let tz = FixedOffset::east_opt(8 * 3600).unwrap();
/// let dt = to_aware_datetime("2022-01-10 09:00:00", &tz).unwrap();
/// assert_eq!(dt.offset(), &tz);
///
/// let dt = to_aware_datetime("2022-01-10T09:00:00Z", &tz).unwrap();
/// assert_eq!(dt.offset().local_minus_utc(), 0);
/// assert_eq!(dt.hour(), 9);
/// ```
pub fn to_aware_datetime(s: &str, tz: &FixedOffset) -> Result<DateTime<FixedOffset>, QueryError> {
    match parse_datetime(s)? {
        ParsedDateTime::Aware(dt) => Ok(dt),
        ParsedDateTime::Naive(naive) => tz
            .from_local_datetime(&naive)
            .single()
            .ok_or_else(|| invalid(s)),
    }
}

/// Render `dt` in the time zone `tz`, in [`STANDARD_FORMAT`].
pub fn format_local(dt: &DateTime<FixedOffset>, tz: &FixedOffset) -> String {
    dt.with_timezone(tz).format(STANDARD_FORMAT).to_string()
}

/// Parse a time zone given as `UTC`, `Z`, or a fixed offset like `+08:00`.
pub fn parse_timezone(s: &str) -> Result<FixedOffset, QueryError> {
    let offset = match s {
        "UTC" | "utc" => FixedOffset::east_opt(0),
        _ => parse_offset(s).ok(),
    };
    offset.ok_or_else(|| QueryError::InvalidTimezone(s.to_string()))
}

use chrono::{NaiveDate, NaiveDateTime};

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

// Regime decisions computed on T guide T+1. The mapping is plain calendar days: weekends and
// exchange holidays are not skipped, matching the published artifacts.
//
// `NaiveDate::MAX` has no successor and maps to itself.
pub fn target_date_for(calculation_date: NaiveDate) -> NaiveDate {
    calculation_date.succ_opt().unwrap_or(NaiveDate::MAX)
}

pub fn parse_date(s: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
}

/// Parses `last_updated` stamps. A bare date is accepted and read as midnight.
pub fn parse_timestamp(s: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    let s = s.trim();
    match NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT) {
        Ok(ts) => Ok(ts),
        Err(err) => match parse_date(s) {
            Ok(d) => Ok(d.and_time(chrono::NaiveTime::MIN)),
            Err(_) => Err(err),
        },
    }
}

//! Query parameter validation for the analytics export endpoint.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

pub const QUERY_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
pub const SUPPORTED_FORMAT: &str = "json";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("can't process: url param '{0}' is missing")]
    MissingParam(&'static str),
    #[error("can't process: '{0}' not in format '2006-01-02T15:04:05'")]
    InvalidTime(&'static str),
    #[error("can't process: unsupported format '{0}', supported format(s): json")]
    UnsupportedFormat(String),
    #[error("can't process: 'to' is not after 'from'")]
    EmptyRange,
}

/// Raw query string as received; every field is optional so that a missing
/// parameter is reported by [`ExportQuery::validate`] rather than the extractor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ExportQuery {
    pub format: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportRequest {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl ExportQuery {
    pub fn validate(&self) -> Result<ExportRequest, ValidationError> {
        let from = required(&self.from, "from")?;
        let to = required(&self.to, "to")?;
        let format = required(&self.format, "format")?;

        let from = parse_query_time("from", from)?;
        let to = parse_query_time("to", to)?;

        if format != SUPPORTED_FORMAT {
            return Err(ValidationError::UnsupportedFormat(format.to_string()));
        }
        if to <= from {
            return Err(ValidationError::EmptyRange);
        }

        Ok(ExportRequest { from, to })
    }
}

/// Parses `2006-01-02T15:04:05`-style values as UTC.
pub fn parse_query_time(param: &'static str, raw: &str) -> Result<DateTime<Utc>, ValidationError> {
    NaiveDateTime::parse_from_str(raw.trim(), QUERY_TIME_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|_| ValidationError::InvalidTime(param))
}

fn required<'a>(value: &'a Option<String>, param: &'static str) -> Result<&'a str, ValidationError> {
    match value.as_deref() {
        Some(raw) if !raw.is_empty() => Ok(raw),
        _ => Err(ValidationError::MissingParam(param)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn query(format: Option<&str>, from: Option<&str>, to: Option<&str>) -> ExportQuery {
        ExportQuery {
            format: format.map(str::to_string),
            from: from.map(str::to_string),
            to: to.map(str::to_string),
        }
    }

    #[test]
    fn accepts_well_formed_query() {
        let req = query(
            Some("json"),
            Some("2019-03-01T10:00:00"),
            Some("2019-03-01T11:30:15"),
        )
        .validate()
        .unwrap();

        assert_eq!(
            req.from,
            Utc.with_ymd_and_hms(2019, 3, 1, 10, 0, 0).single().unwrap()
        );
        assert_eq!(
            req.to,
            Utc.with_ymd_and_hms(2019, 3, 1, 11, 30, 15).single().unwrap()
        );
    }

    #[test]
    fn missing_or_empty_params_are_named() {
        assert_eq!(
            query(Some("json"), None, Some("2019-03-01T11:00:00")).validate(),
            Err(ValidationError::MissingParam("from"))
        );
        assert_eq!(
            query(Some("json"), Some("2019-03-01T10:00:00"), Some("")).validate(),
            Err(ValidationError::MissingParam("to"))
        );
        assert_eq!(
            query(None, Some("2019-03-01T10:00:00"), Some("2019-03-01T11:00:00")).validate(),
            Err(ValidationError::MissingParam("format"))
        );
    }

    #[test]
    fn malformed_times_are_rejected() {
        assert_eq!(
            query(Some("json"), Some("2019-03-01 10:00"), Some("2019-03-01T11:00:00")).validate(),
            Err(ValidationError::InvalidTime("from"))
        );
        assert_eq!(
            query(Some("json"), Some("2019-03-01T10:00:00"), Some("yesterday")).validate(),
            Err(ValidationError::InvalidTime("to"))
        );
    }

    #[test]
    fn only_json_format_is_supported() {
        assert_eq!(
            query(
                Some("csv"),
                Some("2019-03-01T10:00:00"),
                Some("2019-03-01T11:00:00")
            )
            .validate(),
            Err(ValidationError::UnsupportedFormat("csv".to_string()))
        );
    }

    #[test]
    fn to_must_be_strictly_after_from() {
        for (from, to) in [
            ("2019-03-01T10:00:00", "2019-03-01T10:00:00"),
            ("2019-03-01T11:00:00", "2019-03-01T10:00:00"),
        ] {
            assert_eq!(
                query(Some("json"), Some(from), Some(to)).validate(),
                Err(ValidationError::EmptyRange)
            );
        }
    }
}

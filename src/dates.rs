use crate::error::SyncError;
use chrono::{DateTime, NaiveDateTime};

pub const CANONICAL_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Watermark sentinel meaning "publish everything".
pub const NO_DELTA_DATE: &str = "1970-01-01 00:00:00";

/// Converts a timestamp string to the canonical `YYYY-MM-DD HH:MM:SS` form.
///
/// Accepts RFC 3339 (`Z` suffix or numeric offset) and naive ISO 8601 with
/// either a `T` or space separator, with optional fractional seconds. The
/// canonical rendering is fixed-width, so lexicographic comparison of two
/// outputs agrees with chronological order.
pub fn convert_date(raw: &str) -> Result<String, SyncError> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.naive_utc().format(CANONICAL_FORMAT).to_string());
    }

    let parsed = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .map_err(|_| SyncError::InvalidDateFormat(raw.to_string()))?;
    Ok(parsed.format(CANONICAL_FORMAT).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_date_iso_with_t_separator() {
        assert_eq!(convert_date("2023-10-25T14:30:22").unwrap(), "2023-10-25 14:30:22");
        assert_eq!(convert_date("2023-10-25T14:30:22.123").unwrap(), "2023-10-25 14:30:22");
    }

    #[test]
    fn test_convert_date_utc_z_form() {
        assert_eq!(convert_date("2023-10-25T14:30:22Z").unwrap(), "2023-10-25 14:30:22");
    }

    #[test]
    fn test_convert_date_canonical_passthrough() {
        assert_eq!(convert_date("1970-01-01 00:00:00").unwrap(), NO_DELTA_DATE);
        assert_eq!(convert_date("2023-06-01 00:00:00").unwrap(), "2023-06-01 00:00:00");
    }

    #[test]
    fn test_convert_date_invalid() {
        assert!(matches!(convert_date("not a date"), Err(SyncError::InvalidDateFormat(_))));
        assert!(matches!(convert_date(""), Err(SyncError::InvalidDateFormat(_))));
    }

    #[test]
    fn test_canonical_order_agrees_with_chronological_order() {
        let ordered = [
            "1970-01-01T00:00:00Z",
            "1999-12-31T23:59:59Z",
            "2023-01-01T00:00:00Z",
            "2023-01-01T00:00:01Z",
            "2023-06-01T00:00:00Z",
            "2024-02-29T12:00:00Z",
        ];
        let canonical: Vec<String> = ordered.iter().map(|d| convert_date(d).unwrap()).collect();
        for pair in canonical.windows(2) {
            assert!(pair[0] < pair[1], "{} should sort before {}", pair[0], pair[1]);
        }
    }
}

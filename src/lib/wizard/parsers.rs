//! Modal input parsers (spec §4.4 "Modal input parsers"), grounded on
//! `original_source/.../ui/wizards/common.py`'s `parse_epoch_seconds`,
//! `parse_positive_hours`, `validate_length`, `validate_http_url` and
//! `sanitize_comma_separated`. Pure functions, not session methods.

use chrono::{DateTime, TimeZone, Utc};

use crate::domain::error::{DomainError, DomainResult};

/// An integer string of whole seconds since the Unix epoch, UTC.
///
/// Rejects empty input, non-digit characters, and values outside what
/// `chrono` can represent as a UTC timestamp.
pub fn parse_epoch_seconds(value: &str) -> DomainResult<DateTime<Utc>> {
    let text = value.trim();
    if text.is_empty() {
        return Err(DomainError::validation("Please provide a timestamp."));
    }
    if !text.chars().all(|c| c.is_ascii_digit()) {
        return Err(DomainError::validation(
            "Please provide a whole number of seconds since the Unix epoch.",
        ));
    }
    let seconds: i64 = text
        .parse()
        .map_err(|_| DomainError::validation("That timestamp is out of range."))?;
    match Utc.timestamp_opt(seconds, 0) {
        chrono::LocalResult::Single(dt) => Ok(dt),
        _ => Err(DomainError::validation("That timestamp is out of range.")),
    }
}

/// A decimal string strictly greater than zero, interpreted as hours.
pub fn parse_positive_hours(value: &str) -> DomainResult<chrono::Duration> {
    let text = value.trim();
    if text.is_empty() {
        return Err(DomainError::validation("Please provide a duration in hours."));
    }
    let hours: f64 = text
        .parse()
        .map_err(|_| DomainError::validation("Please provide a number of hours."))?;
    if !hours.is_finite() || hours <= 0.0 {
        return Err(DomainError::validation("Duration must be a positive number of hours."));
    }
    let millis = (hours * 3_600_000.0).round() as i64;
    Ok(chrono::Duration::milliseconds(millis))
}

/// Splits on commas, trims each entry, drops empties, and rejects more than
/// `max_items` survivors.
pub fn parse_comma_separated(value: &str, max_items: usize) -> DomainResult<Vec<String>> {
    let items: Vec<String> = value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    if items.len() > max_items {
        return Err(DomainError::validation(format!(
            "Please provide {max_items} or fewer entries."
        )));
    }
    Ok(items)
}

/// Requires an `http`/`https` scheme and a non-empty host.
pub fn parse_http_url(value: &str) -> DomainResult<String> {
    let text = value.trim();
    let parsed = url::Url::parse(text)
        .map_err(|_| DomainError::validation("Please provide a valid URL (http/https)."))?;
    let scheme_ok = matches!(parsed.scheme(), "http" | "https");
    let host_ok = parsed.host_str().is_some_and(|h| !h.is_empty());
    if !scheme_ok || !host_ok {
        return Err(DomainError::validation("Please provide a valid URL (http/https)."));
    }
    Ok(text.to_string())
}

/// Requires the trimmed text's length to fall within `[min, max]` inclusive.
pub fn validate_length(value: &str, min: usize, max: usize, field: &str) -> DomainResult<String> {
    let text = value.trim().to_string();
    if text.len() < min {
        return Err(DomainError::validation(format!(
            "{field} must be at least {min} characters long."
        )));
    }
    if text.len() > max {
        return Err(DomainError::validation(format!(
            "{field} must be {max} characters or fewer."
        )));
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epoch_zero_is_unix_epoch() {
        let dt = parse_epoch_seconds("0").unwrap();
        assert_eq!(dt.to_rfc3339(), "1970-01-01T00:00:00+00:00");
    }

    #[test]
    fn epoch_rejects_negative_and_empty() {
        assert!(parse_epoch_seconds("-1").is_err());
        assert!(parse_epoch_seconds("").is_err());
        assert!(parse_epoch_seconds("   ").is_err());
    }

    #[test]
    fn epoch_rejects_non_digit_text() {
        assert!(parse_epoch_seconds("12a3").is_err());
        assert!(parse_epoch_seconds("1.5").is_err());
    }

    #[test]
    fn positive_hours_accepts_fractional_values() {
        let d = parse_positive_hours("1.5").unwrap();
        assert_eq!(d, chrono::Duration::minutes(90));
    }

    #[test]
    fn positive_hours_rejects_zero_and_negative() {
        assert!(parse_positive_hours("0").is_err());
        assert!(parse_positive_hours("-2").is_err());
        assert!(parse_positive_hours("not-a-number").is_err());
    }

    #[test]
    fn comma_separated_drops_empties_and_trims() {
        let items = parse_comma_separated(" a , , b ,c", 10).unwrap();
        assert_eq!(items, vec!["a", "b", "c"]);
    }

    #[test]
    fn comma_separated_rejects_too_many_entries() {
        let err = parse_comma_separated("a,b,c", 2).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn http_url_accepts_http_and_https() {
        assert!(parse_http_url("https://example.com/sheet/abc").is_ok());
        assert!(parse_http_url("http://example.com").is_ok());
    }

    #[test]
    fn http_url_rejects_other_schemes_and_missing_host() {
        assert!(parse_http_url("ftp://example.com").is_err());
        assert!(parse_http_url("not a url").is_err());
    }

    #[test]
    fn bounded_length_enforces_both_bounds() {
        assert!(validate_length("ab", 2, 5, "Name").is_ok());
        assert!(validate_length("a", 2, 5, "Name").is_err());
        assert!(validate_length("abcdef", 2, 5, "Name").is_err());
    }
}

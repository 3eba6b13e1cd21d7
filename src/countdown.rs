//! Countdown configuration parsing
//!
//! Turns the three independently entered `hours`, `minutes` and `seconds`
//! fields of a countdown form into one total-seconds value. Empty or
//! non-numeric fields count as zero, minutes and seconds are clamped to
//! `0..=59`, and hours are only floored at zero.

use serde::{Deserialize, Serialize};

const MAX_MINUTES: i64 = 59;
const MAX_SECONDS: i64 = 59;

/// A single form field as it may arrive from a client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl FieldValue {
    /// Interpret the field as a whole number, falling back to zero
    pub fn as_integer(&self) -> i64 {
        match self {
            FieldValue::Integer(n) => *n,
            FieldValue::Float(f) if f.is_finite() => f.trunc() as i64,
            FieldValue::Float(_) => 0,
            FieldValue::Text(s) => parse_field(s),
        }
    }
}

/// Raw countdown fields, each optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CountdownInput {
    #[serde(default)]
    pub hours: Option<FieldValue>,
    #[serde(default)]
    pub minutes: Option<FieldValue>,
    #[serde(default)]
    pub seconds: Option<FieldValue>,
}

impl CountdownInput {
    /// Build an input from three text fields
    pub fn from_text(hours: &str, minutes: &str, seconds: &str) -> Self {
        Self {
            hours: Some(FieldValue::Text(hours.to_string())),
            minutes: Some(FieldValue::Text(minutes.to_string())),
            seconds: Some(FieldValue::Text(seconds.to_string())),
        }
    }

    /// True when none of the three fields was supplied
    pub fn is_empty(&self) -> bool {
        self.hours.is_none() && self.minutes.is_none() && self.seconds.is_none()
    }

    /// Total countdown length in seconds
    pub fn total_seconds(&self) -> u64 {
        let field = |f: &Option<FieldValue>| f.as_ref().map(FieldValue::as_integer).unwrap_or(0);
        total_seconds(field(&self.hours), field(&self.minutes), field(&self.seconds))
    }
}

/// Parse one text field; anything that is not a plain integer yields 0.
pub fn parse_field(text: &str) -> i64 {
    text.trim().parse::<i64>().unwrap_or(0)
}

/// Parse three text fields into a total number of seconds
pub fn parse_countdown(hours: &str, minutes: &str, seconds: &str) -> u64 {
    total_seconds(parse_field(hours), parse_field(minutes), parse_field(seconds))
}

/// Clamp already-numeric fields and combine them into seconds
pub fn total_seconds(hours: i64, minutes: i64, seconds: i64) -> u64 {
    let hours = hours.max(0) as u64;
    let minutes = minutes.clamp(0, MAX_MINUTES) as u64;
    let seconds = seconds.clamp(0, MAX_SECONDS) as u64;

    hours
        .saturating_mul(3600)
        .saturating_add(minutes * 60)
        .saturating_add(seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_minutes_and_negative_seconds() {
        assert_eq!(total_seconds(2, 75, -5), 10_740);
        assert_eq!(parse_countdown("2", "75", "-5"), 10_740);
    }

    #[test]
    fn non_numeric_fields_count_as_zero() {
        assert_eq!(parse_countdown("", "abc", "30"), 30);
        assert_eq!(parse_countdown("1.5", "ten", " "), 0);
    }

    #[test]
    fn hours_have_no_upper_clamp() {
        assert_eq!(parse_countdown("100", "0", "0"), 360_000);
        assert_eq!(parse_countdown("-3", "1", "1"), 61);
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        assert_eq!(parse_countdown(" 0 ", " 5", "7 "), 307);
    }

    #[test]
    fn huge_hours_saturate() {
        assert_eq!(total_seconds(i64::MAX, 59, 59), u64::MAX);
    }

    #[test]
    fn input_from_json_mixes_numbers_and_text() {
        let input: CountdownInput =
            serde_json::from_str(r#"{"hours": 1, "minutes": "abc", "seconds": 12.9}"#).unwrap();

        assert!(!input.is_empty());
        assert_eq!(input.total_seconds(), 3612);
    }

    #[test]
    fn missing_fields_are_empty() {
        let input: CountdownInput = serde_json::from_str("{}").unwrap();

        assert!(input.is_empty());
        assert_eq!(input.total_seconds(), 0);
    }

    #[test]
    fn from_text_matches_parse_countdown() {
        let input = CountdownInput::from_text("0", "25", "0");
        assert_eq!(input.total_seconds(), parse_countdown("0", "25", "0"));
        assert_eq!(input.total_seconds(), 1500);
    }
}

//! Longitude extraction from free-form oracle output.
//!
//! Oracles are not guaranteed to answer in one format, so several readings
//! of the same text are tried in a fixed order and the first value in
//! `[0, 360)` wins.

use regex::Regex;
use std::sync::LazyLock;

static DMS_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(\d{1,3})\s*(?:°|º|deg)\s*(\d{1,2})\s*['′]\s*(?:(\d{1,2}(?:\.\d+)?)\s*(?:"|″|'')?)?"#,
    )
    .expect("degrees-minutes-seconds pattern")
});

static DECIMAL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)?").expect("decimal pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LongitudeParser {
    /// Last comma-separated field of the first line containing a digit.
    CsvLastField,
    /// First `D°M'S"` group anywhere in the text.
    DegreesMinutesSeconds,
    /// First standalone decimal number in range anywhere in the text.
    FreeDecimal,
}

pub const PARSE_ORDER: [LongitudeParser; 3] = [
    LongitudeParser::CsvLastField,
    LongitudeParser::DegreesMinutesSeconds,
    LongitudeParser::FreeDecimal,
];

impl LongitudeParser {
    pub fn name(&self) -> &'static str {
        match self {
            Self::CsvLastField => "csv-last-field",
            Self::DegreesMinutesSeconds => "degrees-minutes-seconds",
            Self::FreeDecimal => "free-decimal",
        }
    }

    pub fn parse(&self, text: &str) -> Option<f64> {
        match self {
            Self::CsvLastField => parse_csv_last_field(text),
            Self::DegreesMinutesSeconds => parse_dms(text),
            Self::FreeDecimal => parse_free_decimal(text),
        }
    }
}

/// Tries every parser in [`PARSE_ORDER`].
pub fn parse_longitude(text: &str) -> Option<(f64, LongitudeParser)> {
    PARSE_ORDER
        .iter()
        .find_map(|parser| parser.parse(text).map(|lon| (lon, *parser)))
}

fn in_range(value: f64) -> Option<f64> {
    (value.is_finite() && (0.0..360.0).contains(&value)).then_some(value)
}

fn parse_csv_last_field(text: &str) -> Option<f64> {
    let line = text
        .lines()
        .find(|line| line.chars().any(|c| c.is_ascii_digit()))?;
    let last = line
        .split(',')
        .map(str::trim)
        .filter(|field| !field.is_empty())
        .last()?;
    last.parse::<f64>().ok().and_then(in_range)
}

fn parse_dms(text: &str) -> Option<f64> {
    DMS_PATTERN.captures_iter(text).find_map(|caps| {
        let degrees: f64 = caps.get(1)?.as_str().parse().ok()?;
        let minutes: f64 = caps.get(2)?.as_str().parse().ok()?;
        let seconds: f64 = caps
            .get(3)
            .map(|m| m.as_str().parse().ok())
            .unwrap_or(Some(0.0))?;
        if minutes >= 60.0 || seconds >= 60.0 {
            return None;
        }
        in_range(degrees + minutes / 60.0 + seconds / 3600.0)
    })
}

fn parse_free_decimal(text: &str) -> Option<f64> {
    let bytes = text.as_bytes();
    DECIMAL_PATTERN.find_iter(text).find_map(|m| {
        let before = m.start().checked_sub(1).map(|i| bytes[i]);
        let after = bytes.get(m.end()).copied();
        let after_next = bytes.get(m.end() + 1).copied();

        // Parts of dotted dates (4.2.2024) and signed numbers are not longitudes.
        if matches!(before, Some(b'.') | Some(b'-')) {
            return None;
        }
        if after == Some(b'.') && after_next.is_some_and(|b| b.is_ascii_digit()) {
            return None;
        }
        m.as_str().parse::<f64>().ok().and_then(in_range)
    })
}

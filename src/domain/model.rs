use crate::utils::error::{EngineError, Result};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

pub const STEMS_HANGUL: [&str; 10] = ["갑", "을", "병", "정", "무", "기", "경", "신", "임", "계"];
pub const BRANCHES_HANGUL: [&str; 12] = [
    "자", "축", "인", "묘", "진", "사", "오", "미", "신", "유", "술", "해",
];
pub const STEMS_HANJA: [&str; 10] = ["甲", "乙", "丙", "丁", "戊", "己", "庚", "辛", "壬", "癸"];
pub const BRANCHES_HANJA: [&str; 12] = [
    "子", "丑", "寅", "卯", "辰", "巳", "午", "未", "申", "酉", "戌", "亥",
];

/// Oracle output kept in diagnostics.
pub const TRACE_SNIPPET_CHARS: usize = 200;

static WALL_CLOCK_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}(:\d{2})?$").expect("wall clock pattern")
});

/// `time + delta`, or an input error when the result leaves chrono's range.
pub fn shift_checked(time: NaiveDateTime, delta: Duration) -> Result<NaiveDateTime> {
    time.checked_add_signed(delta).ok_or_else(|| {
        EngineError::input(format!(
            "{} shifted by {} min is outside the supported date range",
            time,
            delta.num_minutes()
        ))
    })
}

/// First `max_chars` characters of `text`, never splitting a code point.
pub fn snippet(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Alphabet {
    #[default]
    Hangul,
    Hanja,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Stem(u8);

impl Stem {
    pub const COUNT: u8 = 10;

    pub fn new(index: u8) -> Result<Self> {
        if index >= Self::COUNT {
            return Err(EngineError::input(format!(
                "stem index {} outside 0..={}",
                index,
                Self::COUNT - 1
            )));
        }
        Ok(Self(index))
    }

    /// Reduces any integer onto the ten-stem cycle.
    pub fn wrapping(value: i64) -> Self {
        Self(value.rem_euclid(Self::COUNT as i64) as u8)
    }

    pub fn index(self) -> u8 {
        self.0
    }

    pub fn symbol(self, alphabet: Alphabet) -> &'static str {
        match alphabet {
            Alphabet::Hangul => STEMS_HANGUL[self.0 as usize],
            Alphabet::Hanja => STEMS_HANJA[self.0 as usize],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Branch(u8);

impl Branch {
    pub const COUNT: u8 = 12;
    pub const RAT: Branch = Branch(0);
    pub const OX: Branch = Branch(1);
    pub const TIGER: Branch = Branch(2);
    pub const RABBIT: Branch = Branch(3);

    pub fn new(index: u8) -> Result<Self> {
        if index >= Self::COUNT {
            return Err(EngineError::input(format!(
                "branch index {} outside 0..={}",
                index,
                Self::COUNT - 1
            )));
        }
        Ok(Self(index))
    }

    /// Reduces any integer onto the twelve-branch cycle.
    pub fn wrapping(value: i64) -> Self {
        Self(value.rem_euclid(Self::COUNT as i64) as u8)
    }

    pub fn index(self) -> u8 {
        self.0
    }

    pub fn symbol(self, alphabet: Alphabet) -> &'static str {
        match alphabet {
            Alphabet::Hangul => BRANCHES_HANGUL[self.0 as usize],
            Alphabet::Hanja => BRANCHES_HANJA[self.0 as usize],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pillar {
    pub stem: Stem,
    pub branch: Branch,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PillarText {
    pub stem: String,
    pub branch: String,
}

impl Pillar {
    pub fn new(stem: Stem, branch: Branch) -> Self {
        Self { stem, branch }
    }

    /// Position `0..60` in the sexagenary cycle.
    pub fn from_cycle_index(index: u8) -> Result<Self> {
        if index >= 60 {
            return Err(EngineError::input(format!(
                "sexagenary cycle index {} outside 0..=59",
                index
            )));
        }
        Ok(Self {
            stem: Stem::wrapping(index as i64),
            branch: Branch::wrapping(index as i64),
        })
    }

    pub fn render(&self, alphabet: Alphabet) -> String {
        format!(
            "{}{}",
            self.stem.symbol(alphabet),
            self.branch.symbol(alphabet)
        )
    }

    pub fn text(&self, alphabet: Alphabet) -> PillarText {
        PillarText {
            stem: self.stem.symbol(alphabet).to_string(),
            branch: self.branch.symbol(alphabet).to_string(),
        }
    }
}

impl fmt::Display for Pillar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(Alphabet::default()))
    }
}

/// Local civil calendar fields, `YYYY-MM-DDTHH:mm` or `YYYY-MM-DDTHH:mm:ss`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WallClock(NaiveDateTime);

impl WallClock {
    pub fn parse(text: &str) -> Result<Self> {
        let trimmed = text.trim();
        if !WALL_CLOCK_SHAPE.is_match(trimmed) {
            return Err(EngineError::input(format!(
                "wall clock '{}' must be YYYY-MM-DDTHH:mm or YYYY-MM-DDTHH:mm:ss",
                text
            )));
        }
        NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S")
            .or_else(|_| NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M"))
            .map(Self)
            .map_err(|e| {
                EngineError::input(format!(
                    "wall clock '{}' must be YYYY-MM-DDTHH:mm or YYYY-MM-DDTHH:mm:ss ({})",
                    text, e
                ))
            })
    }

    pub fn naive(&self) -> NaiveDateTime {
        self.0
    }

    pub fn date(&self) -> NaiveDate {
        self.0.date()
    }

    /// The same fields read as if they were already UTC.
    pub fn as_if_utc(&self) -> DateTime<Utc> {
        self.0.and_utc()
    }
}

impl FromStr for WallClock {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl From<NaiveDateTime> for WallClock {
    fn from(value: NaiveDateTime) -> Self {
        Self(value)
    }
}

/// Hour-boundary convention around midnight. Only `Standard` is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ZiHourSplit {
    #[default]
    Standard,
    LateNight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MissingZonePolicy {
    #[default]
    AssumeUtc,
    Reject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MissingLongitudePolicy {
    #[default]
    ZeroCorrection,
    Reject,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BirthMoment {
    pub wall_clock: String,
    pub offset_minutes: Option<i32>,
    pub tzid: Option<String>,
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
    #[serde(default = "default_true")]
    pub use_true_solar_time: bool,
    #[serde(default)]
    pub zi_hour_split: ZiHourSplit,
}

impl BirthMoment {
    pub fn new(wall_clock: impl Into<String>) -> Self {
        Self {
            wall_clock: wall_clock.into(),
            offset_minutes: None,
            tzid: None,
            longitude: None,
            latitude: None,
            use_true_solar_time: true,
            zi_hour_split: ZiHourSplit::Standard,
        }
    }

    pub fn with_offset_minutes(mut self, minutes: i32) -> Self {
        self.offset_minutes = Some(minutes);
        self
    }

    pub fn with_tzid(mut self, tzid: impl Into<String>) -> Self {
        self.tzid = Some(tzid.into());
        self
    }

    pub fn with_longitude(mut self, longitude: f64) -> Self {
        self.longitude = Some(longitude);
        self
    }

    pub fn with_coordinates(mut self, longitude: f64, latitude: f64) -> Self {
        self.longitude = Some(longitude);
        self.latitude = Some(latitude);
        self
    }

    pub fn with_true_solar_time(mut self, enabled: bool) -> Self {
        self.use_true_solar_time = enabled;
        self
    }

    pub fn with_zi_hour_split(mut self, split: ZiHourSplit) -> Self {
        self.zi_hour_split = split;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OffsetSource {
    Explicit,
    TimeZone,
    AssumedUtc,
}

/// `utc == wall_clock_as_if_utc - offset_minutes`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedInstant {
    pub utc: DateTime<Utc>,
    pub offset_minutes: i32,
    pub source: OffsetSource,
}

impl ResolvedInstant {
    /// Civil time at the applied offset.
    pub fn local(&self) -> Result<NaiveDateTime> {
        shift_checked(
            self.utc.naive_utc(),
            Duration::minutes(self.offset_minutes as i64),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolarPosition {
    longitude: f64,
    measured_at: DateTime<Utc>,
}

impl SolarPosition {
    pub fn new(longitude: f64, measured_at: DateTime<Utc>) -> Result<Self> {
        if !longitude.is_finite() || !(0.0..360.0).contains(&longitude) {
            return Err(EngineError::oracle(format!(
                "solar longitude {} is not a finite value in [0, 360)",
                longitude
            )));
        }
        Ok(Self {
            longitude,
            measured_at,
        })
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn measured_at(&self) -> DateTime<Utc> {
        self.measured_at
    }
}

/// How a solar position was obtained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleTrace {
    pub invocation: String,
    pub snippet: String,
    pub cached: bool,
}

impl OracleTrace {
    pub fn new(invocation: impl Into<String>, raw_output: &str) -> Self {
        Self {
            invocation: invocation.into(),
            snippet: snippet(raw_output, TRACE_SNIPPET_CHARS),
            cached: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SolarReading {
    pub position: SolarPosition,
    pub trace: OracleTrace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleIndices {
    pub year: u8,
    pub day: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub tzid: Option<String>,
    pub offset_minutes: i32,
    pub offset_source: OffsetSource,
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
    pub local_wall_clock: NaiveDateTime,
    pub utc_instant: DateTime<Utc>,
    pub apparent_solar_time: NaiveDateTime,
    pub longitude_correction_minutes: f64,
    pub equation_of_time_minutes: f64,
    pub solar_longitude: f64,
    pub oracle_invocation: String,
    pub oracle_snippet: String,
    /// Oracle invocations made for this chart; a cache hit counts none.
    pub oracle_calls: u32,
    pub oracle_cached: bool,
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FourPillars {
    pub year: Pillar,
    pub month: Pillar,
    pub day: Pillar,
    pub hour: Pillar,
    pub engine: String,
    pub diagnostics: Diagnostics,
}

impl FourPillars {
    pub fn report(&self, alphabet: Alphabet) -> ChartReport {
        ChartReport {
            year: self.year.text(alphabet),
            month: self.month.text(alphabet),
            day: self.day.text(alphabet),
            hour: self.hour.text(alphabet),
            engine: self.engine.clone(),
            diagnostics: self.diagnostics.clone(),
        }
    }
}

/// Serializable rendering of a chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartReport {
    pub year: PillarText,
    pub month: PillarText,
    pub day: PillarText,
    pub hour: PillarText,
    pub engine: String,
    pub diagnostics: Diagnostics,
}

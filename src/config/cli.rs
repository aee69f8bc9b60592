use crate::adapters::StaticCalendar;
use crate::domain::model::{Alphabet, BirthMoment, ZiHourSplit};
use crate::utils::error::Result;
use crate::utils::validation::Validate;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ZiSplitArg {
    Standard,
    LateNight,
}

impl From<ZiSplitArg> for ZiHourSplit {
    fn from(arg: ZiSplitArg) -> Self {
        match arg {
            ZiSplitArg::Standard => ZiHourSplit::Standard,
            ZiSplitArg::LateNight => ZiHourSplit::LateNight,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AlphabetArg {
    Hangul,
    Hanja,
}

impl From<AlphabetArg> for Alphabet {
    fn from(arg: AlphabetArg) -> Self {
        match arg {
            AlphabetArg::Hangul => Alphabet::Hangul,
            AlphabetArg::Hanja => Alphabet::Hanja,
        }
    }
}

#[derive(Debug, Clone, Parser)]
#[command(name = "bazi-engine")]
#[command(about = "Four-pillar chart from a birth moment, with true solar time")]
pub struct CliArgs {
    /// Local wall clock, YYYY-MM-DDTHH:mm[:ss]
    #[arg(long)]
    pub at: String,

    /// Fixed UTC offset in minutes, east positive; wins over --tz
    #[arg(long, allow_hyphen_values = true)]
    pub offset_minutes: Option<i32>,

    /// IANA zone name, e.g. Asia/Seoul
    #[arg(long)]
    pub tz: Option<String>,

    #[arg(long, allow_hyphen_values = true, help = "Longitude in degrees, east positive")]
    pub lon: Option<f64>,

    #[arg(long, allow_hyphen_values = true, help = "Latitude in degrees, north positive")]
    pub lat: Option<f64>,

    #[arg(long, help = "Use civil time for the hour pillar")]
    pub no_true_solar: bool,

    #[arg(long, value_enum, default_value = "standard")]
    pub zi_split: ZiSplitArg,

    /// Sexagenary year index (0-59) from the calendar source
    #[arg(long)]
    pub year_cycle: u8,

    /// Sexagenary day index (0-59) from the calendar source
    #[arg(long)]
    pub day_cycle: u8,

    /// Overrides the alphabet from the config file
    #[arg(long, value_enum)]
    pub alphabet: Option<AlphabetArg>,

    #[arg(long, help = "TOML config file")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Log as JSON lines")]
    pub json_log: bool,
}

impl CliArgs {
    pub fn birth_moment(&self) -> BirthMoment {
        BirthMoment {
            wall_clock: self.at.clone(),
            offset_minutes: self.offset_minutes,
            tzid: self.tz.clone(),
            longitude: self.lon,
            latitude: self.lat,
            use_true_solar_time: !self.no_true_solar,
            zi_hour_split: self.zi_split.into(),
        }
    }

    pub fn calendar(&self) -> Result<StaticCalendar> {
        StaticCalendar::new(self.year_cycle, self.day_cycle)
    }
}

impl Validate for CliArgs {
    fn validate(&self) -> Result<()> {
        self.calendar().map(|_| ())
    }
}

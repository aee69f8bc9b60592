use crate::domain::model::CycleIndices;
use crate::domain::ports::SexagenaryCalendarProvider;
use crate::utils::error::{EngineError, Result};
use chrono::NaiveDate;

/// Calendar source returning the same cycle indices for every date, for
/// callers that already hold the lunisolar conversion result.
#[derive(Debug, Clone, Copy)]
pub struct StaticCalendar {
    indices: CycleIndices,
}

impl StaticCalendar {
    pub fn new(year: u8, day: u8) -> Result<Self> {
        for (name, value) in [("year", year), ("day", day)] {
            if value >= 60 {
                return Err(EngineError::input(format!(
                    "{} cycle index {} outside 0..=59",
                    name, value
                )));
            }
        }
        Ok(Self {
            indices: CycleIndices { year, day },
        })
    }
}

impl SexagenaryCalendarProvider for StaticCalendar {
    fn cycle_indices(&self, date: NaiveDate) -> Result<CycleIndices> {
        tracing::debug!(
            "Static cycle indices for {}: year {}, day {}",
            date,
            self.indices.year,
            self.indices.day
        );
        Ok(self.indices)
    }
}

//! Stem and branch arithmetic for the month and hour pillars.

use crate::domain::model::{Branch, Stem};
use crate::utils::error::Result;
use chrono::{NaiveDateTime, Timelike};

/// Stem of the tiger month, indexed by year stem.
const TIGER_MONTH_STEM_BY_YEAR_STEM: [u8; 10] = [2, 4, 6, 8, 0, 2, 4, 6, 8, 0];

/// Stem of the rat hour, indexed by day stem.
const RAT_HOUR_STEM_BY_DAY_STEM: [u8; 10] = [0, 2, 4, 6, 8, 0, 2, 4, 6, 8];

const MINUTES_PER_DAY: i64 = 24 * 60;
const MINUTES_PER_HOUR_SLOT: i64 = 120;

pub fn month_stem(year_stem_idx: u8, month_branch_idx: u8) -> Result<Stem> {
    let year_stem = Stem::new(year_stem_idx)?;
    let month_branch = Branch::new(month_branch_idx)?;
    Ok(month_stem_of(year_stem, month_branch))
}

pub fn month_stem_of(year_stem: Stem, month_branch: Branch) -> Stem {
    let start = TIGER_MONTH_STEM_BY_YEAR_STEM[year_stem.index() as usize] as i64;
    let months_since_tiger = (month_branch.index() as i64 - 2 + 12) % 12;
    Stem::wrapping(start + months_since_tiger)
}

/// Two-hour slot of an apparent local time, rat hour = 23:00–00:59.
pub fn hour_branch_from_apparent(apparent: NaiveDateTime) -> Branch {
    let hour = apparent.hour() as i64;
    let minute = apparent.minute() as i64;
    let minutes_from_23 = ((hour + 24) % 24 - 23) * 60 + minute;
    let normalized = (minutes_from_23 + MINUTES_PER_DAY) % MINUTES_PER_DAY;
    Branch::wrapping(normalized / MINUTES_PER_HOUR_SLOT)
}

pub fn hour_stem(day_stem_idx: u8, hour_branch_idx: u8) -> Result<Stem> {
    let day_stem = Stem::new(day_stem_idx)?;
    let hour_branch = Branch::new(hour_branch_idx)?;
    Ok(hour_stem_of(day_stem, hour_branch))
}

pub fn hour_stem_of(day_stem: Stem, hour_branch: Branch) -> Stem {
    let start = RAT_HOUR_STEM_BY_DAY_STEM[day_stem.index() as usize] as i64;
    Stem::wrapping(start + hour_branch.index() as i64)
}

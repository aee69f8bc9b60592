//! Apparent (true) solar time from a resolved civil instant.
//!
//! Two corrections are applied to the zone's mean time: the observer's
//! longitude relative to the zone's standard meridian (4 minutes per degree)
//! and a single-harmonic approximation of the equation of time, good to about
//! ±1–2 minutes. Hour pillars are 120 minutes wide, so that error only matters
//! right at a slot boundary.

use crate::domain::model::{shift_checked, ResolvedInstant};
use crate::utils::error::Result;
use chrono::{Datelike, Duration, NaiveDateTime};
use std::f64::consts::PI;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolarTimeCorrection {
    pub apparent: NaiveDateTime,
    pub longitude_correction_minutes: f64,
    pub equation_of_time_minutes: f64,
}

impl SolarTimeCorrection {
    /// Signed shift from civil time to apparent solar time.
    pub fn total_minutes(&self) -> f64 {
        self.longitude_correction_minutes - self.equation_of_time_minutes
    }

    fn unchanged(local: NaiveDateTime) -> Self {
        Self {
            apparent: local,
            longitude_correction_minutes: 0.0,
            equation_of_time_minutes: 0.0,
        }
    }
}

/// Central meridian of a zone, degrees east.
pub fn standard_meridian_deg(offset_minutes: i32) -> f64 {
    15.0 * (offset_minutes as f64 / 60.0)
}

pub fn longitude_correction_minutes(longitude_deg: f64, offset_minutes: i32) -> f64 {
    4.0 * (longitude_deg - standard_meridian_deg(offset_minutes))
}

/// Equation of time in minutes for day-of-year `n` (1 = January 1st).
pub fn equation_of_time_minutes(day_of_year: u32) -> f64 {
    let b = 2.0 * PI * (day_of_year as f64 - 81.0) / 364.0;
    9.87 * (2.0 * b).sin() - 7.53 * b.cos() - 1.5 * b.sin()
}

/// Shifts the instant's civil time onto apparent solar time.
///
/// Without a longitude the civil time is returned as is, with both
/// corrections zero.
pub fn apply(
    instant: &ResolvedInstant,
    longitude_deg: Option<f64>,
    use_equation_of_time: bool,
) -> Result<SolarTimeCorrection> {
    let local = instant.local()?;
    let Some(longitude_deg) = longitude_deg.filter(|lon| lon.is_finite()) else {
        return Ok(SolarTimeCorrection::unchanged(local));
    };

    let longitude_correction = longitude_correction_minutes(longitude_deg, instant.offset_minutes);
    let eot = if use_equation_of_time {
        equation_of_time_minutes(local.ordinal())
    } else {
        0.0
    };

    let shift_ms = ((longitude_correction - eot) * 60_000.0).round() as i64;
    let apparent = shift_checked(local, Duration::milliseconds(shift_ms))?;

    tracing::debug!(
        "True solar time: {} -> {} (longitude {:+.2} min, EoT {:+.2} min)",
        local,
        apparent,
        longitude_correction,
        eot
    );

    Ok(SolarTimeCorrection {
        apparent,
        longitude_correction_minutes: longitude_correction,
        equation_of_time_minutes: eot,
    })
}

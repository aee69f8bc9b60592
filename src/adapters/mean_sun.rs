//! In-process low-precision solar longitude.
//!
//! Mean longitude plus the two leading equation-of-centre terms, referred to
//! the mean equinox of date. Good to about 0.01° between 1950 and 2050, which
//! places an instant in the right solar-term month except within roughly a
//! quarter of an hour of a boundary.

use crate::adapters::julian_day;
use crate::domain::model::{OracleTrace, SolarPosition, SolarReading};
use crate::domain::ports::SolarPositionProvider;
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

const J2000_JD: f64 = 2_451_545.0;

pub fn apparent_longitude_deg(utc: DateTime<Utc>) -> f64 {
    let days = julian_day(utc) - J2000_JD;
    let mean_longitude = (280.460 + 0.985_647_4 * days).rem_euclid(360.0);
    let mean_anomaly = (357.528 + 0.985_600_3 * days).rem_euclid(360.0).to_radians();

    let longitude = mean_longitude
        + 1.915 * mean_anomaly.sin()
        + 0.020 * (2.0 * mean_anomaly).sin();
    let reduced = longitude.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if reduced >= 360.0 {
        0.0
    } else {
        reduced
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MeanSunProvider;

#[async_trait]
impl SolarPositionProvider for MeanSunProvider {
    fn engine_id(&self) -> &str {
        "mean-sun"
    }

    async fn query(&self, utc: DateTime<Utc>) -> Result<SolarReading> {
        let longitude = apparent_longitude_deg(utc);
        let invocation = format!("mean-sun jd={:.6}", julian_day(utc));
        Ok(SolarReading {
            position: SolarPosition::new(longitude, utc)?,
            trace: OracleTrace::new(invocation, &format!("{:.6}", longitude)),
        })
    }
}

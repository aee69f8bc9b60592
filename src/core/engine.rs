use crate::core::cancel::CancelSignal;
use crate::core::sexagenary::{hour_branch_from_apparent, hour_stem_of, month_stem_of};
use crate::core::solar_term::branch_from_longitude;
use crate::core::time_resolver::TimeResolver;
use crate::core::true_solar::{self, SolarTimeCorrection};
use crate::domain::model::{
    BirthMoment, Diagnostics, FourPillars, MissingLongitudePolicy, MissingZonePolicy, Pillar,
    SolarReading, WallClock, ZiHourSplit,
};
use crate::domain::ports::{SexagenaryCalendarProvider, SolarPositionProvider};
use crate::utils::error::{EngineError, Result};
use crate::utils::validation::validate_range;
use chrono::{DateTime, Utc};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub missing_zone: MissingZonePolicy,
    pub missing_longitude: MissingLongitudePolicy,
    pub equation_of_time: bool,
    /// Bound on each oracle query, retries included separately. Keep it above
    /// the oracle's own worst case so its attempt list reaches the caller.
    pub oracle_timeout: Duration,
    pub retry_attempts: u32,
    /// Delay before the first retry; doubled for each further one.
    pub retry_delay: Duration,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            missing_zone: MissingZonePolicy::AssumeUtc,
            missing_longitude: MissingLongitudePolicy::ZeroCorrection,
            equation_of_time: true,
            oracle_timeout: Duration::from_secs(15),
            retry_attempts: 0,
            retry_delay: Duration::from_millis(200),
        }
    }
}

/// Four-pillar calculation from a birth moment.
///
/// Year and day pillars come straight from the calendar provider's cycle
/// indices. The month branch comes from the sun's ecliptic longitude at the
/// resolved UTC instant and the hour branch from apparent solar time; their
/// stems follow from the year and day stems.
pub struct PillarEngine<S: SolarPositionProvider, C: SexagenaryCalendarProvider> {
    solar: S,
    calendar: C,
    options: EngineOptions,
    resolver: TimeResolver,
}

impl<S: SolarPositionProvider, C: SexagenaryCalendarProvider> PillarEngine<S, C> {
    pub fn new(solar: S, calendar: C) -> Self {
        Self::with_options(solar, calendar, EngineOptions::default())
    }

    pub fn with_options(solar: S, calendar: C, options: EngineOptions) -> Self {
        let resolver = TimeResolver::new(options.missing_zone);
        Self {
            solar,
            calendar,
            options,
            resolver,
        }
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn engine_id(&self) -> &str {
        self.solar.engine_id()
    }

    pub async fn calculate(&self, moment: &BirthMoment) -> Result<FourPillars> {
        self.calculate_with_cancel(moment, &CancelSignal::never())
            .await
    }

    /// Like [`calculate`](Self::calculate), but gives up with
    /// [`EngineError::Cancelled`] as soon as `cancel` fires.
    pub async fn calculate_with_cancel(
        &self,
        moment: &BirthMoment,
        cancel: &CancelSignal,
    ) -> Result<FourPillars> {
        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }

        let mut notes = Vec::new();
        self.check_coordinates(moment, &mut notes)?;

        let wall = WallClock::parse(&moment.wall_clock)?;
        let resolved = self.resolver.resolve_wall_clock(
            &wall,
            moment.offset_minutes,
            moment.tzid.as_deref(),
        )?;

        let indices = self.calendar.cycle_indices(wall.date())?;
        let year = Pillar::from_cycle_index(indices.year)?;
        let day = Pillar::from_cycle_index(indices.day)?;
        tracing::debug!(
            "Calendar cycle indices for {}: year {} ({}), day {} ({})",
            wall.date(),
            indices.year,
            year,
            indices.day,
            day
        );

        let (reading, oracle_calls) = self.query_solar(resolved.utc, cancel).await?;
        let solar_longitude = reading.position.longitude();

        let month_branch = branch_from_longitude(solar_longitude);
        let month = Pillar::new(month_stem_of(year.stem, month_branch), month_branch);
        tracing::debug!(
            "Solar longitude {:.4}° gives month pillar {}",
            solar_longitude,
            month
        );

        let correction = if moment.use_true_solar_time {
            true_solar::apply(&resolved, moment.longitude, self.options.equation_of_time)?
        } else {
            notes.push("true solar time disabled; hour pillar uses civil time".to_string());
            true_solar::apply(&resolved, None, false)?
        };

        let hour_branch = hour_branch_from_apparent(correction.apparent);
        let hour = Pillar::new(hour_stem_of(day.stem, hour_branch), hour_branch);

        if moment.zi_hour_split != ZiHourSplit::Standard {
            tracing::warn!(
                "Zi-hour split {:?} requested but not applied; using the 23:00 boundary",
                moment.zi_hour_split
            );
            notes.push(format!(
                "zi-hour split {:?} requested but not applied",
                moment.zi_hour_split
            ));
        }

        let diagnostics = build_diagnostics(
            moment,
            &wall,
            resolved.utc,
            resolved.offset_minutes,
            resolved.source,
            &correction,
            &reading,
            oracle_calls,
            notes,
        );

        tracing::debug!(
            "Pillars: year {} month {} day {} hour {}",
            year,
            month,
            day,
            hour
        );

        Ok(FourPillars {
            year,
            month,
            day,
            hour,
            engine: self.solar.engine_id().to_string(),
            diagnostics,
        })
    }

    fn check_coordinates(&self, moment: &BirthMoment, notes: &mut Vec<String>) -> Result<()> {
        if let Some(longitude) = moment.longitude {
            validate_range("longitude", longitude, -180.0, 180.0)?;
        }
        if let Some(latitude) = moment.latitude {
            validate_range("latitude", latitude, -90.0, 90.0)?;
        }

        if moment.use_true_solar_time && moment.longitude.is_none() {
            match self.options.missing_longitude {
                MissingLongitudePolicy::Reject => {
                    return Err(EngineError::input(
                        "longitude is required when true solar time is requested",
                    ))
                }
                MissingLongitudePolicy::ZeroCorrection => {
                    tracing::warn!("No longitude given; true solar time falls back to zone mean time");
                    notes.push("no longitude; true solar time equals zone mean time".to_string());
                }
            }
        }
        Ok(())
    }

    /// One oracle query under timeout, cancellation and the retry budget.
    /// Returns the reading and the number of calls that reached the oracle;
    /// a call answered from the cache is not counted.
    async fn query_solar(
        &self,
        utc: DateTime<Utc>,
        cancel: &CancelSignal,
    ) -> Result<(SolarReading, u32)> {
        let mut calls = 0u32;
        let mut delay = self.options.retry_delay;

        loop {
            calls += 1;
            let timeout = self.options.oracle_timeout;
            let bounded = tokio::time::timeout(timeout, self.solar.query(utc));

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::debug!("Calculation cancelled during oracle call");
                    return Err(EngineError::Cancelled);
                }
                result = bounded => result.unwrap_or_else(|_| {
                    Err(EngineError::oracle(format!(
                        "{} did not answer within {:?} for {}",
                        self.solar.engine_id(),
                        timeout,
                        utc
                    )))
                }),
            };

            match outcome {
                Ok(reading) if reading.trace.cached => {
                    return Ok((reading, calls.saturating_sub(1)))
                }
                Ok(reading) => return Ok((reading, calls)),
                Err(e) if e.is_retryable() && calls <= self.options.retry_attempts => {
                    tracing::warn!(
                        "Oracle call {} of {} failed, retrying in {:?}: {}",
                        calls,
                        self.options.retry_attempts + 1,
                        delay,
                        e
                    );
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err(EngineError::Cancelled),
                        _ = tokio::time::sleep(delay) => {}
                    }
                    delay = delay.saturating_mul(2);
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[allow(clippy::too_many_arguments)]
fn build_diagnostics(
    moment: &BirthMoment,
    wall: &WallClock,
    utc: DateTime<Utc>,
    offset_minutes: i32,
    offset_source: crate::domain::model::OffsetSource,
    correction: &SolarTimeCorrection,
    reading: &SolarReading,
    oracle_calls: u32,
    notes: Vec<String>,
) -> Diagnostics {
    Diagnostics {
        tzid: moment.tzid.clone(),
        offset_minutes,
        offset_source,
        longitude: moment.longitude,
        latitude: moment.latitude,
        local_wall_clock: wall.naive(),
        utc_instant: utc,
        apparent_solar_time: correction.apparent,
        longitude_correction_minutes: round2(correction.longitude_correction_minutes),
        equation_of_time_minutes: round2(correction.equation_of_time_minutes),
        solar_longitude: reading.position.longitude(),
        oracle_invocation: reading.trace.invocation.clone(),
        oracle_snippet: reading.trace.snippet.clone(),
        oracle_calls,
        oracle_cached: reading.trace.cached,
        notes,
    }
}

use crate::domain::model::{
    shift_checked, MissingZonePolicy, OffsetSource, ResolvedInstant, WallClock,
};
use crate::utils::error::{EngineError, Result};
use chrono::{Duration, NaiveDateTime, TimeZone};
use chrono_tz::Tz;

/// Largest UTC offset accepted from callers, in minutes.
pub const MAX_OFFSET_MINUTES: i32 = 18 * 60;

/// Turns a local wall clock plus an offset or zone into a UTC instant.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeResolver {
    missing_zone: MissingZonePolicy,
}

impl TimeResolver {
    pub fn new(missing_zone: MissingZonePolicy) -> Self {
        Self { missing_zone }
    }

    pub fn resolve(
        &self,
        wall_clock: &str,
        explicit_offset_minutes: Option<i32>,
        tzid: Option<&str>,
    ) -> Result<ResolvedInstant> {
        let wall = WallClock::parse(wall_clock)?;
        self.resolve_wall_clock(&wall, explicit_offset_minutes, tzid)
    }

    pub fn resolve_wall_clock(
        &self,
        wall: &WallClock,
        explicit_offset_minutes: Option<i32>,
        tzid: Option<&str>,
    ) -> Result<ResolvedInstant> {
        let (offset_minutes, source) = match (explicit_offset_minutes, non_blank(tzid)) {
            (Some(minutes), _) => {
                if minutes.abs() > MAX_OFFSET_MINUTES {
                    return Err(EngineError::input(format!(
                        "UTC offset {} minutes is outside ±{}",
                        minutes, MAX_OFFSET_MINUTES
                    )));
                }
                (minutes, OffsetSource::Explicit)
            }
            (None, Some(tzid)) => (zone_offset_minutes(wall.naive(), tzid)?, OffsetSource::TimeZone),
            (None, None) => match self.missing_zone {
                MissingZonePolicy::AssumeUtc => {
                    tracing::warn!(
                        "No UTC offset or time zone for {}, assuming UTC",
                        wall.naive()
                    );
                    (0, OffsetSource::AssumedUtc)
                }
                MissingZonePolicy::Reject => {
                    return Err(EngineError::input(
                        "either a UTC offset or a time zone identifier is required",
                    ))
                }
            },
        };

        let utc = shift_checked(wall.naive(), -Duration::minutes(offset_minutes as i64))?.and_utc();
        tracing::debug!(
            "Resolved {} to {} (offset {} min, {:?})",
            wall.naive(),
            utc,
            offset_minutes,
            source
        );

        Ok(ResolvedInstant {
            utc,
            offset_minutes,
            source,
        })
    }
}

fn non_blank(tzid: Option<&str>) -> Option<&str> {
    tzid.map(str::trim).filter(|s| !s.is_empty())
}

/// Hours either side of a wall clock read as UTC that contain its true instant.
const ZONE_SEARCH_HOURS: i64 = 18;

/// Offset of `tzid` for a wall clock, found by rendering instants in the zone.
///
/// The wall clock is first read as UTC and rendered in the zone; the rendered
/// calendar time minus the reference gives a first offset. Offsets in force at
/// the resulting candidate instant and at either end of the search window are
/// collected, and an offset is accepted when the instant it implies renders
/// back to the same wall clock.
///
/// - Repeated wall clocks (clocks turned back) take the larger offset, i.e.
///   the earlier of the two instants.
/// - Skipped wall clocks (clocks turned forward) take the offset in force
///   before the change, so `02:30` in a one-hour gap lands on `03:30` of the
///   new offset.
pub fn zone_offset_minutes(wall: NaiveDateTime, tzid: &str) -> Result<i32> {
    let tz: Tz = tzid
        .parse()
        .map_err(|e| EngineError::input(format!("unknown time zone '{}': {}", tzid, e)))?;

    let first = rendered_offset(tz, wall);
    let window = Duration::hours(ZONE_SEARCH_HOURS);
    let mut offsets = vec![
        first,
        rendered_offset(tz, instant_at(wall, first)?),
        rendered_offset(tz, shift_checked(wall, -window)?),
        rendered_offset(tz, shift_checked(wall, window)?),
    ];
    offsets.sort_unstable();
    offsets.dedup();

    let mut consistent = Vec::with_capacity(offsets.len());
    for &offset in &offsets {
        let instant = instant_at(wall, offset)?;
        if tz.from_utc_datetime(&instant).naive_local() == wall {
            consistent.push(offset);
        }
    }

    if let Some(&offset) = consistent.last() {
        if consistent.len() > 1 {
            tracing::debug!(
                "{} is repeated in {} (offsets {:?}), taking {}",
                wall,
                tzid,
                consistent,
                offset
            );
        }
        return Ok(offset);
    }

    let before_change = offsets[0];
    tracing::warn!(
        "{} does not exist in {}; using the offset before the change ({} min)",
        wall,
        tzid,
        before_change
    );
    Ok(before_change)
}

/// UTC instant (as a naive value) that `offset_minutes` maps `wall` to.
fn instant_at(wall: NaiveDateTime, offset_minutes: i32) -> Result<NaiveDateTime> {
    shift_checked(wall, -Duration::minutes(offset_minutes as i64))
}

fn rendered_offset(tz: Tz, reference: NaiveDateTime) -> i32 {
    let seen = tz.from_utc_datetime(&reference).naive_local();
    (seen - reference).num_minutes() as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc_string(resolved: &ResolvedInstant) -> String {
        resolved.utc.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }

    #[test]
    fn test_explicit_offset_takes_priority() {
        let resolver = TimeResolver::default();
        let resolved = resolver
            .resolve("2024-02-04T10:00:00", Some(540), Some("America/New_York"))
            .unwrap();

        assert_eq!(resolved.offset_minutes, 540);
        assert_eq!(resolved.source, OffsetSource::Explicit);
        assert_eq!(utc_string(&resolved), "2024-02-04T01:00:00Z");
    }

    #[test]
    fn test_zone_offset_seoul() {
        let resolver = TimeResolver::default();
        let resolved = resolver
            .resolve("2024-02-04T10:00", None, Some("Asia/Seoul"))
            .unwrap();

        assert_eq!(resolved.offset_minutes, 540);
        assert_eq!(resolved.source, OffsetSource::TimeZone);
        assert_eq!(utc_string(&resolved), "2024-02-04T01:00:00Z");
    }

    #[test]
    fn test_zone_offset_follows_daylight_saving() {
        let resolver = TimeResolver::default();

        let winter = resolver
            .resolve("2024-01-15T12:00:00", None, Some("America/New_York"))
            .unwrap();
        assert_eq!(winter.offset_minutes, -300);

        let summer = resolver
            .resolve("2024-07-15T12:00:00", None, Some("America/New_York"))
            .unwrap();
        assert_eq!(summer.offset_minutes, -240);
        assert_eq!(utc_string(&summer), "2024-07-15T16:00:00Z");
    }

    #[test]
    fn test_zone_offset_just_after_spring_forward() {
        // 03:30 EDT on the changeover day; read as UTC it still falls in EST.
        let resolver = TimeResolver::default();
        let resolved = resolver
            .resolve("2024-03-10T03:30:00", None, Some("America/New_York"))
            .unwrap();

        assert_eq!(resolved.offset_minutes, -240);
        assert_eq!(utc_string(&resolved), "2024-03-10T07:30:00Z");
    }

    #[test]
    fn test_skipped_wall_clock_uses_offset_before_the_change() {
        // 02:00-02:59 never happened in New York on 2024-03-10.
        let resolver = TimeResolver::default();
        let resolved = resolver
            .resolve("2024-03-10T02:30:00", None, Some("America/New_York"))
            .unwrap();

        assert_eq!(resolved.offset_minutes, -300);
        assert_eq!(utc_string(&resolved), "2024-03-10T07:30:00Z");

        let just_before = resolver
            .resolve("2024-03-10T01:59:00", None, Some("America/New_York"))
            .unwrap();
        assert_eq!(just_before.offset_minutes, -300);
        assert_eq!(utc_string(&just_before), "2024-03-10T06:59:00Z");
    }

    #[test]
    fn test_repeated_wall_clock_takes_the_earlier_instant() {
        let resolver = TimeResolver::default();

        // 01:30 happens twice in New York on 2024-11-03 (EDT, then EST).
        let new_york = resolver
            .resolve("2024-11-03T01:30:00", None, Some("America/New_York"))
            .unwrap();
        assert_eq!(new_york.offset_minutes, -240);
        assert_eq!(utc_string(&new_york), "2024-11-03T05:30:00Z");

        // 02:30 happens twice in Sydney on 2024-04-07 (AEDT, then AEST).
        let sydney = resolver
            .resolve("2024-04-07T02:30:00", None, Some("Australia/Sydney"))
            .unwrap();
        assert_eq!(sydney.offset_minutes, 660);
        assert_eq!(utc_string(&sydney), "2024-04-06T15:30:00Z");
    }

    #[test]
    fn test_resolution_at_end_of_range_is_an_input_error() {
        let resolver = TimeResolver::default();
        let last = WallClock::from(NaiveDateTime::MAX);

        let err = resolver
            .resolve_wall_clock(&last, Some(-600), None)
            .unwrap_err();
        assert!(matches!(err, EngineError::Input { .. }));

        let err = resolver
            .resolve_wall_clock(&last, None, Some("America/New_York"))
            .unwrap_err();
        assert!(matches!(err, EngineError::Input { .. }));
    }

    #[test]
    fn test_missing_zone_assumes_utc_by_default() {
        let resolver = TimeResolver::default();
        let resolved = resolver.resolve("2024-02-04T10:00:00", None, None).unwrap();

        assert_eq!(resolved.offset_minutes, 0);
        assert_eq!(resolved.source, OffsetSource::AssumedUtc);
        assert_eq!(utc_string(&resolved), "2024-02-04T10:00:00Z");

        let blank = resolver
            .resolve("2024-02-04T10:00:00", None, Some("  "))
            .unwrap();
        assert_eq!(blank.source, OffsetSource::AssumedUtc);
    }

    #[test]
    fn test_missing_zone_rejected_by_policy() {
        let resolver = TimeResolver::new(MissingZonePolicy::Reject);
        let err = resolver
            .resolve("2024-02-04T10:00:00", None, None)
            .unwrap_err();
        assert!(matches!(err, EngineError::Input { .. }));
    }

    #[test]
    fn test_invalid_inputs() {
        let resolver = TimeResolver::default();
        assert!(matches!(
            resolver.resolve("04/02/2024 10:00", Some(540), None),
            Err(EngineError::Input { .. })
        ));
        assert!(matches!(
            resolver.resolve("2024-02-04T10:00", None, Some("Mars/Olympus_Mons")),
            Err(EngineError::Input { .. })
        ));
        assert!(matches!(
            resolver.resolve("2024-02-04T10:00", Some(24 * 60), None),
            Err(EngineError::Input { .. })
        ));
    }

    #[test]
    fn test_utc_invariant_holds() {
        let resolver = TimeResolver::default();
        let wall = WallClock::parse("1987-11-30T23:45:10").unwrap();
        let resolved = resolver
            .resolve_wall_clock(&wall, Some(-330), None)
            .unwrap();

        assert_eq!(
            resolved.utc,
            wall.as_if_utc() - Duration::minutes(resolved.offset_minutes as i64)
        );
        assert_eq!(resolved.local().unwrap(), wall.naive());
    }
}

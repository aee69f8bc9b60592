use crate::domain::model::{CycleIndices, SolarReading};
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

/// Sun's apparent ecliptic longitude at a UTC instant.
///
/// Implementations may block on an external process or a network round trip;
/// the engine bounds every call with a timeout and may cancel it by dropping
/// the future.
#[async_trait]
pub trait SolarPositionProvider: Send + Sync {
    /// Short tag reported as the chart's engine identifier.
    fn engine_id(&self) -> &str;

    async fn query(&self, utc: DateTime<Utc>) -> Result<SolarReading>;
}

/// Lunisolar calendar conversion: raw year-cycle and day-cycle indices (0..=59)
/// for a civil date.
pub trait SexagenaryCalendarProvider: Send + Sync {
    fn cycle_indices(&self, date: NaiveDate) -> Result<CycleIndices>;
}

#[async_trait]
impl<P: SolarPositionProvider + ?Sized> SolarPositionProvider for std::sync::Arc<P> {
    fn engine_id(&self) -> &str {
        (**self).engine_id()
    }

    async fn query(&self, utc: DateTime<Utc>) -> Result<SolarReading> {
        (**self).query(utc).await
    }
}

#[async_trait]
impl<P: SolarPositionProvider + ?Sized> SolarPositionProvider for Box<P> {
    fn engine_id(&self) -> &str {
        (**self).engine_id()
    }

    async fn query(&self, utc: DateTime<Utc>) -> Result<SolarReading> {
        (**self).query(utc).await
    }
}

pub mod cancel;
pub mod engine;
pub mod sexagenary;
pub mod solar_term;
pub mod time_resolver;
pub mod true_solar;

pub use crate::domain::ports::{SexagenaryCalendarProvider, SolarPositionProvider};
pub use crate::utils::error::Result;
pub use cancel::{cancel_pair, CancelHandle, CancelSignal};
pub use engine::{EngineOptions, PillarEngine};
pub use time_resolver::TimeResolver;

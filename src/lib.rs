pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliArgs;
pub use config::EngineConfig;

pub use adapters::{provider_from_config, CachedSolarProvider, MeanSunProvider, StaticCalendar};
pub use core::{cancel_pair, CancelHandle, CancelSignal, EngineOptions, PillarEngine};
pub use domain::model::{Alphabet, BirthMoment, ChartReport, Diagnostics, FourPillars, Pillar};
pub use utils::error::{EngineError, Result};

use crate::domain::model::SolarReading;
use crate::domain::ports::SolarPositionProvider;
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// Memoizes solar readings per UTC instant, evicting the oldest entry once
/// `capacity` is reached. Failures are never cached.
pub struct CachedSolarProvider<P> {
    inner: P,
    capacity: usize,
    state: Mutex<CacheState>,
}

#[derive(Default)]
struct CacheState {
    readings: HashMap<i64, SolarReading>,
    order: VecDeque<i64>,
}

impl<P: SolarPositionProvider> CachedSolarProvider<P> {
    pub fn new(inner: P, capacity: usize) -> Self {
        Self {
            inner,
            capacity: capacity.max(1),
            state: Mutex::new(CacheState::default()),
        }
    }

    pub fn len(&self) -> usize {
        self.lock().readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lookup(&self, key: i64) -> Option<SolarReading> {
        self.lock().readings.get(&key).cloned()
    }

    fn store(&self, key: i64, reading: SolarReading) {
        let mut state = self.lock();
        if state.readings.insert(key, reading).is_none() {
            state.order.push_back(key);
        }
        while state.order.len() > self.capacity {
            if let Some(oldest) = state.order.pop_front() {
                state.readings.remove(&oldest);
            }
        }
    }
}

#[async_trait]
impl<P: SolarPositionProvider> SolarPositionProvider for CachedSolarProvider<P> {
    fn engine_id(&self) -> &str {
        self.inner.engine_id()
    }

    async fn query(&self, utc: DateTime<Utc>) -> Result<SolarReading> {
        let key = utc.timestamp_millis();
        if let Some(mut reading) = self.lookup(key) {
            tracing::debug!("Solar position cache hit for {}", utc);
            reading.trace.cached = true;
            return Ok(reading);
        }

        // Lock is not held across the oracle call.
        let reading = self.inner.query(utc).await?;
        self.store(key, reading.clone());
        Ok(reading)
    }
}

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use hdrhistogram::Histogram;
use serde::Serialize;

use crate::error::{Error, Result};

/// Wall-clock timing of world ticks and dispatcher passes, in microseconds.
pub struct CycleStats {
    ticks: Mutex<Histogram<u64>>,
    dispatches: Mutex<Histogram<u64>>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct StatsSummary {
    pub ticks: u64,
    pub tick_p50_us: u64,
    pub tick_p99_us: u64,
    pub dispatches: u64,
    pub dispatch_p50_us: u64,
    pub dispatch_p99_us: u64,
}

impl CycleStats {
    pub fn new() -> Result<Self> {
        let histogram = || Histogram::<u64>::new(3).map_err(|e| Error::Config(e.to_string()));
        Ok(Self { ticks: Mutex::new(histogram()?), dispatches: Mutex::new(histogram()?) })
    }

    pub fn record_tick(&self, elapsed: Duration) {
        lock(&self.ticks).saturating_record(elapsed.as_micros() as u64);
    }

    pub fn record_dispatch(&self, elapsed: Duration) {
        lock(&self.dispatches).saturating_record(elapsed.as_micros() as u64);
    }

    pub fn summary(&self) -> StatsSummary {
        let ticks = lock(&self.ticks);
        let dispatches = lock(&self.dispatches);
        StatsSummary {
            ticks: ticks.len(),
            tick_p50_us: ticks.value_at_quantile(0.5),
            tick_p99_us: ticks.value_at_quantile(0.99),
            dispatches: dispatches.len(),
            dispatch_p50_us: dispatches.value_at_quantile(0.5),
            dispatch_p99_us: dispatches.value_at_quantile(0.99),
        }
    }

    pub fn reset(&self) {
        lock(&self.ticks).reset();
        lock(&self.dispatches).reset();
    }
}

fn lock(histogram: &Mutex<Histogram<u64>>) -> MutexGuard<'_, Histogram<u64>> {
    histogram.lock().unwrap_or_else(PoisonError::into_inner)
}

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use tracing::info;

use crate::stats::CycleStats;
use crate::world::{TickOutcome, World};

/// Advances the world one tick after another, independently of dispatch.
pub struct CycleDriver {
    world: Arc<World>,
    stats: Option<Arc<CycleStats>>,
}

impl CycleDriver {
    pub fn new(world: Arc<World>) -> Self {
        Self { world, stats: None }
    }

    pub fn with_stats(mut self, stats: Arc<CycleStats>) -> Self {
        self.stats = Some(stats);
        self
    }

    pub fn step(&self) -> TickOutcome {
        let started = Instant::now();
        let outcome = self.world.update();
        if let Some(stats) = &self.stats {
            stats.record_tick(started.elapsed());
        }
        outcome
    }

    /// Blocks until the world reports a terminal condition.
    pub fn run(&self) {
        let interval = self.world.interval_real();
        loop {
            let started = Instant::now();
            if self.step() == TickOutcome::Terminal {
                break;
            }
            if let Some(rest) = interval.checked_sub(started.elapsed()) {
                thread::sleep(rest);
            }
        }
        info!(
            sim_time_ms = self.world.sim_time_ms(),
            updates = self.world.updates(),
            "world reached a terminal state"
        );
    }

    pub fn spawn(self) -> io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("cycle-driver".into())
            .spawn(move || self.run())
    }
}

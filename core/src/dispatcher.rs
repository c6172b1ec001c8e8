use std::sync::Arc;
use std::time::Instant;

use tracing::{trace, warn};

use crate::binding::{Binding, BindingSet};
use crate::device::DeviceId;
use crate::error::{Error, Result};
use crate::messages::{ConfigReply, Reply, ReplyKind};
use crate::stats::CycleStats;
use crate::world::World;
use crate::MAX_MESSAGE_SIZE;

/// Outcome of one dispatcher pass.
#[derive(Debug, Default)]
pub struct DispatchReport {
    pub processed: Vec<DeviceId>,
    pub skipped: Vec<DeviceId>,
    pub failures: Vec<(DeviceId, Error)>,
}

impl DispatchReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Ferries commands, requests and observations between mailboxes and
/// bound entities, once per call.
pub struct Dispatcher {
    world: Arc<World>,
    scratch: Vec<u8>,
    stats: Option<Arc<CycleStats>>,
}

impl Dispatcher {
    pub fn new(world: Arc<World>) -> Self {
        Self { world, scratch: vec![0; MAX_MESSAGE_SIZE], stats: None }
    }

    pub fn with_stats(mut self, stats: Arc<CycleStats>) -> Self {
        self.stats = Some(stats);
        self
    }

    /// One pass over every active binding, in set order. A failure ends that
    /// binding's work for this pass only.
    pub fn run_cycle(&mut self, bindings: &BindingSet) -> DispatchReport {
        let started = Instant::now();
        let mut report = DispatchReport::default();
        for binding in bindings.iter() {
            if !binding.is_active() {
                report.skipped.push(binding.device);
                continue;
            }
            match self.dispatch(binding) {
                Ok(()) => report.processed.push(binding.device),
                Err(e) => {
                    warn!(device = %binding.device, error = %e, "dispatch failed");
                    report.failures.push((binding.device, e));
                }
            }
        }
        if let Some(stats) = &self.stats {
            stats.record_dispatch(started.elapsed());
        }
        report
    }

    // command, then configuration, then publish
    fn dispatch(&mut self, binding: &Binding) -> Result<()> {
        let entity = self
            .world
            .entity(binding.entity)
            .ok_or(Error::UnknownDevice(binding.device))?;
        let mailbox = binding.mailbox();
        let caps = mailbox.capabilities();

        if caps.accepts_commands {
            if let Some(len) = mailbox.pull_command(&mut self.scratch)? {
                trace!(device = %binding.device, len, "applying command");
                entity.lock().model.command(&self.scratch[..len])?;
            }
        }

        if caps.request_queue_len > 0 {
            match mailbox.pull_request(&mut self.scratch) {
                Ok(Some((token, len))) => {
                    let result = {
                        let mut guard = entity.lock();
                        let state = &mut *guard;
                        state.model.configure(&mut state.props, &self.scratch[..len])
                    };
                    match result {
                        Ok(ConfigReply { kind, payload }) => {
                            if kind == ReplyKind::Nack {
                                warn!(device = %binding.device, "request not supported, sent NACK");
                            }
                            mailbox.push_reply(Reply { token, kind, payload });
                        }
                        Err(e) => {
                            mailbox.push_reply(Reply {
                                token,
                                kind: ReplyKind::Nack,
                                payload: Vec::new(),
                            });
                            return Err(e);
                        }
                    }
                }
                Ok(None) => {}
                Err((token, e)) => {
                    mailbox.push_reply(Reply { token, kind: ReplyKind::Nack, payload: Vec::new() });
                    return Err(e);
                }
            }
        }

        let observation = entity.lock().model.observe()?;
        if let Some(payload) = observation {
            mailbox.publish(self.world.sim_time_ms(), payload);
        }
        Ok(())
    }
}

use std::sync::Arc;

use tracing::{error, info};

use crate::binding::{BindingSet, DeviceDeclaration};
use crate::device::DeviceId;
use crate::dispatcher::{DispatchReport, Dispatcher};
use crate::error::{Error, Result};
use crate::mailbox::DeviceClient;
use crate::resolver::ResolvePolicy;
use crate::stats::CycleStats;
use crate::world::World;

/// One driver instance: a fixed binding set plus its dispatcher.
pub struct StageDriver {
    world: Arc<World>,
    bindings: BindingSet,
    dispatcher: Dispatcher,
}

impl StageDriver {
    pub fn setup(world: Arc<World>, declarations: &[DeviceDeclaration]) -> Result<Self> {
        Self::setup_with(world, declarations, ResolvePolicy::default())
    }

    /// All-or-nothing: on error no driver exists and no entity was touched.
    pub fn setup_with(
        world: Arc<World>,
        declarations: &[DeviceDeclaration],
        policy: ResolvePolicy,
    ) -> Result<Self> {
        info!(
            devices = declarations.len(),
            "creating {} {}",
            declarations.len(),
            if declarations.len() == 1 { "device" } else { "devices" }
        );
        let bindings = BindingSet::setup(&world, declarations, policy).map_err(|e| {
            error!(code = e.code(), error = %e, "driver setup failed");
            e
        })?;
        let dispatcher = Dispatcher::new(Arc::clone(&world));
        Ok(Self { world, bindings, dispatcher })
    }

    pub fn with_stats(mut self, stats: Arc<CycleStats>) -> Self {
        self.dispatcher = self.dispatcher.with_stats(stats);
        self
    }

    pub fn world(&self) -> &Arc<World> {
        &self.world
    }

    pub fn bindings(&self) -> &BindingSet {
        &self.bindings
    }

    pub fn subscribe(&mut self, device: DeviceId) -> Result<()> {
        self.bindings.subscribe(&self.world, device).map_err(|e| {
            error!(%device, "failed to find a device");
            e
        })
    }

    pub fn unsubscribe(&mut self, device: DeviceId) -> Result<()> {
        self.bindings.unsubscribe(&self.world, device)
    }

    /// Handle for a client of a bound device.
    pub fn client(&self, device: DeviceId) -> Result<DeviceClient> {
        let binding = self.bindings.lookup(device).ok_or(Error::UnknownDevice(device))?;
        Ok(DeviceClient::new(device, Arc::clone(binding.mailbox())))
    }

    /// One dispatcher pass.
    pub fn update(&mut self) -> DispatchReport {
        self.dispatcher.run_cycle(&self.bindings)
    }

    pub fn shutdown(&mut self) {
        info!("shutting stage driver down");
        self.bindings.release(&self.world);
    }
}

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::device::{DeviceId, Interface};
use crate::error::{Error, Result};
use crate::mailbox::Mailbox;
use crate::resolver::{resolve_with, ResolvePolicy};
use crate::world::{EntityId, World};

/// One device the client wants, and the entity subtree to look for it in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDeclaration {
    pub device: DeviceId,
    /// Name of the root entity to search below.
    pub model: String,
}

impl DeviceDeclaration {
    pub fn new(device: DeviceId, model: &str) -> Self {
        Self { device, model: model.to_string() }
    }
}

/// Exclusive association of a device with an entity.
pub struct Binding {
    pub device: DeviceId,
    pub interface: Interface,
    pub entity: EntityId,
    active: bool,
    mailbox: Arc<Mailbox>,
}

impl Binding {
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn mailbox(&self) -> &Arc<Mailbox> {
        &self.mailbox
    }
}

/// Bindings in declaration order. Membership never changes after setup.
pub struct BindingSet {
    bindings: Vec<Binding>,
    passthrough: Vec<DeviceId>,
}

impl BindingSet {
    /// Bind every declaration, in order, or none of them.
    pub fn setup(
        world: &World,
        declarations: &[DeviceDeclaration],
        policy: ResolvePolicy,
    ) -> Result<Self> {
        let mut set = BindingSet {
            bindings: Vec::with_capacity(declarations.len()),
            passthrough: Vec::new(),
        };
        let mut claimed: HashSet<EntityId> = HashSet::new();

        for decl in declarations {
            let device = decl.device;
            if set.contains(device) {
                return Err(Error::Config(format!("device {} declared twice", device)));
            }

            let interface = device.interface().map_err(|e| {
                error!(%device, "unsupported interface");
                e
            })?;
            let Some(required) = interface.model_type() else {
                debug!(%device, "pass-through device");
                set.passthrough.push(device);
                continue;
            };

            let entity = resolve_with(world, &decl.model, required, &claimed, policy)
                .and_then(|id| {
                    if claimed.contains(&id) {
                        Err(Error::NotFound { root: decl.model.clone(), model_type: required })
                    } else {
                        Ok(id)
                    }
                })
                .map_err(|source| {
                    error!(%device, model = %decl.model, error = %source, "no entity for device");
                    Error::ResolutionFailed { device, source: Box::new(source) }
                })?;

            if let Some(e) = world.entity(entity) {
                info!(%device, entity = %e.name, "device bound");
            }
            claimed.insert(entity);
            set.bindings.push(Binding {
                device,
                interface,
                entity,
                active: false,
                mailbox: Arc::new(Mailbox::new(device, interface.capabilities())),
            });
        }
        Ok(set)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Binding> {
        self.bindings.iter()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn passthrough(&self) -> &[DeviceId] {
        &self.passthrough
    }

    pub fn contains(&self, device: DeviceId) -> bool {
        self.passthrough.contains(&device) || self.lookup(device).is_some()
    }

    // Linear scan: sets hold tens of devices at most.
    pub fn lookup(&self, device: DeviceId) -> Option<&Binding> {
        self.bindings.iter().find(|b| b.device == device)
    }

    fn lookup_mut(&mut self, device: DeviceId) -> Option<&mut Binding> {
        self.bindings.iter_mut().find(|b| b.device == device)
    }

    pub fn subscribe(&mut self, world: &World, device: DeviceId) -> Result<()> {
        if device.is_passthrough() {
            return Ok(());
        }
        let binding = self.lookup_mut(device).ok_or(Error::UnknownDevice(device))?;
        if !binding.active {
            binding.active = true;
            world.subscribe(binding.entity);
        }
        Ok(())
    }

    pub fn unsubscribe(&mut self, world: &World, device: DeviceId) -> Result<()> {
        if device.is_passthrough() {
            return Ok(());
        }
        let binding = self.lookup_mut(device).ok_or(Error::UnknownDevice(device))?;
        if binding.active {
            binding.active = false;
            world.unsubscribe(binding.entity);
        }
        Ok(())
    }

    /// Drop every outstanding entity subscription held by this set.
    pub fn release(&mut self, world: &World) {
        for binding in self.bindings.iter_mut().filter(|b| b.active) {
            binding.active = false;
            world.unsubscribe(binding.entity);
        }
    }
}

use stagebridge_core::*;
use std::sync::Arc;

pub struct TestHarness {
    pub world: Arc<World>,
}

impl TestHarness {
    pub fn new(models: Vec<ModelDescription>) -> Self {
        Self::from_description(WorldDescription::with_models(models))
    }

    pub fn from_description(desc: WorldDescription) -> Self {
        let world = World::from_description(&desc).expect("world should build");
        Self { world: Arc::new(world) }
    }

    pub fn driver(&self, devices: &[(&str, &str)]) -> Result<StageDriver> {
        self.driver_with(devices, ResolvePolicy::FirstMatch)
    }

    pub fn driver_with(
        &self,
        devices: &[(&str, &str)],
        policy: ResolvePolicy,
    ) -> Result<StageDriver> {
        StageDriver::setup_with(Arc::clone(&self.world), &declarations(devices), policy)
    }

    /// Setup plus subscription of every declared device.
    pub fn subscribed_driver(&self, devices: &[(&str, &str)]) -> StageDriver {
        let mut driver = self.driver(devices).expect("driver setup");
        for (device, _) in devices {
            driver.subscribe(dev(device)).expect("subscribe");
        }
        driver
    }

    pub fn tick(&self) -> TickOutcome {
        self.world.update()
    }

    /// One world tick followed by one dispatcher pass.
    pub fn cycle(&self, driver: &mut StageDriver) -> DispatchReport {
        self.tick();
        driver.update()
    }

    pub fn id(&self, name: &str) -> EntityId {
        self.world.lookup(name).unwrap_or_else(|| panic!("no entity named {}", name))
    }

    pub fn subscriptions(&self, name: &str) -> u32 {
        self.world.entity(self.id(name)).unwrap().subscriptions()
    }

    pub fn total_subscriptions(&self) -> u32 {
        self.world.entities().iter().map(|e| e.subscriptions()).sum()
    }

    pub fn bound_entity(&self, driver: &StageDriver, device: &str) -> String {
        let binding = driver.bindings().lookup(dev(device)).expect("binding");
        self.world.entity(binding.entity).unwrap().name.clone()
    }
}

pub fn dev(s: &str) -> DeviceId {
    s.parse().unwrap_or_else(|e| panic!("bad device id {}: {}", s, e))
}

pub fn declarations(devices: &[(&str, &str)]) -> Vec<DeviceDeclaration> {
    devices
        .iter()
        .map(|(device, model)| DeviceDeclaration::new(dev(device), model))
        .collect()
}

pub fn model(model_type: ModelType, name: &str) -> ModelDescription {
    ModelDescription::new(model_type).named(name)
}

/// A robot with a laser and a fiducial finder mounted on its base.
pub fn robot(name: &str) -> ModelDescription {
    model(ModelType::Position, name)
        .with_child(model(ModelType::Laser, &format!("{}.laser", name)))
        .with_child(model(ModelType::Fiducial, &format!("{}.fiducial", name)))
}

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing::{debug, info};

use crate::description::{ModelDescription, WorldDescription};
use crate::error::{Error, Result};
use crate::geometry::Pose;
use crate::models::{create_model, Body, EntityProps, ModelState, ModelType, SensorView};

/// Index of an entity in its world's arena.
pub type EntityId = usize;

/// Mutable part of an entity, guarded so the tick and the dispatcher never
/// see each other's half-finished writes.
pub struct EntityState {
    pub props: EntityProps,
    pub model: ModelState,
}

pub struct Entity {
    pub id: EntityId,
    pub name: String,
    pub model_type: ModelType,
    /// Lookup only; the arena owns every entity.
    pub parent: Option<EntityId>,
    pub children: Vec<EntityId>,
    group: EntityId,
    state: Mutex<EntityState>,
    subscriptions: AtomicU32,
}

impl Entity {
    pub fn lock(&self) -> MutexGuard<'_, EntityState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn subscriptions(&self) -> u32 {
        self.subscriptions.load(Ordering::Acquire)
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscriptions() > 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Continue,
    Terminal,
}

/// The simulated world: an arena-backed entity tree plus simulated time.
///
/// The tree's shape is fixed once built; only entity state, subscription
/// counts and the clock change afterwards, so a `World` is shared by
/// reference between the cycle driver and any number of dispatchers.
pub struct World {
    entities: Vec<Entity>,
    names: HashMap<String, EntityId>,
    roots: Vec<EntityId>,
    interval_sim_ms: u64,
    interval_real_ms: u64,
    quit_time_ms: Option<u64>,
    sim_time_ms: AtomicU64,
    updates: AtomicU64,
    quit: AtomicBool,
}

impl World {
    pub fn from_description(desc: &WorldDescription) -> Result<Self> {
        let mut world = Self {
            entities: Vec::new(),
            names: HashMap::new(),
            roots: Vec::new(),
            interval_sim_ms: desc.interval_sim_ms.max(1),
            interval_real_ms: desc.interval_real_ms,
            quit_time_ms: desc.quit_time_ms,
            sim_time_ms: AtomicU64::new(0),
            updates: AtomicU64::new(0),
            quit: AtomicBool::new(false),
        };
        for model in &desc.models {
            let id = world.insert(model, None, desc.seed)?;
            world.roots.push(id);
        }
        info!(entities = world.entities.len(), "world loaded");
        Ok(world)
    }

    // Pre-order insertion: a parent always has a lower id than its children.
    fn insert(
        &mut self,
        desc: &ModelDescription,
        parent: Option<EntityId>,
        seed: u64,
    ) -> Result<EntityId> {
        let id = self.entities.len();
        let name = match &desc.name {
            Some(name) => name.clone(),
            None => self.auto_name(parent, desc.model_type),
        };
        if self.names.contains_key(&name) {
            return Err(Error::DuplicateName(name));
        }

        let model = create_model(desc.model_type, &desc.settings, seed.wrapping_add(id as u64))?;
        let props = EntityProps {
            pose: desc.pose,
            size: desc.size,
            color: desc.color,
            fiducial_return: desc.fiducial_return,
            laser_return: desc.laser_return,
            obstacle: desc.obstacle,
        };
        let group = parent.map_or(id, |p| self.entities[p].group);
        debug!(%name, model_type = %desc.model_type, ?parent, "entity created");

        self.names.insert(name.clone(), id);
        self.entities.push(Entity {
            id,
            name,
            model_type: desc.model_type,
            parent,
            children: Vec::new(),
            group,
            state: Mutex::new(EntityState { props, model }),
            subscriptions: AtomicU32::new(0),
        });
        if let Some(p) = parent {
            self.entities[p].children.push(id);
        }

        for child in &desc.children {
            self.insert(child, Some(id), seed)?;
        }
        Ok(id)
    }

    fn auto_name(&self, parent: Option<EntityId>, model_type: ModelType) -> String {
        let siblings: &[EntityId] = match parent {
            Some(p) => &self.entities[p].children,
            None => &self.roots,
        };
        let n = siblings
            .iter()
            .filter(|&&s| self.entities[s].model_type == model_type)
            .count();
        match parent {
            Some(p) => format!("{}.{}:{}", self.entities[p].name, model_type, n),
            None => format!("{}:{}", model_type, n),
        }
    }

    pub fn lookup(&self, name: &str) -> Option<EntityId> {
        self.names.get(name).copied()
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn roots(&self) -> &[EntityId] {
        &self.roots
    }

    pub fn subscribe(&self, id: EntityId) {
        if let Some(entity) = self.entities.get(id) {
            let count = entity.subscriptions.fetch_add(1, Ordering::AcqRel) + 1;
            debug!(entity = %entity.name, count, "subscribed");
        }
    }

    pub fn unsubscribe(&self, id: EntityId) {
        if let Some(entity) = self.entities.get(id) {
            let previous = entity
                .subscriptions
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |c| Some(c.saturating_sub(1)))
                .unwrap_or(0);
            debug!(entity = %entity.name, count = previous.saturating_sub(1), "unsubscribed");
        }
    }

    pub fn sim_time_ms(&self) -> u64 {
        self.sim_time_ms.load(Ordering::Acquire)
    }

    pub fn updates(&self) -> u64 {
        self.updates.load(Ordering::Acquire)
    }

    pub fn interval_real(&self) -> Duration {
        Duration::from_millis(self.interval_real_ms)
    }

    /// Makes the next tick report [`TickOutcome::Terminal`].
    pub fn request_quit(&self) {
        self.quit.store(true, Ordering::Release);
    }

    /// Advance simulated time by one tick.
    pub fn update(&self) -> TickOutcome {
        if self.quit.load(Ordering::Acquire) {
            return TickOutcome::Terminal;
        }

        let bodies = self.snapshot_bodies();
        let view = SensorView { bodies: &bodies, dt: self.interval_sim_ms as f64 / 1000.0 };
        for entity in &self.entities {
            let subscribed = entity.is_subscribed();
            let mut guard = entity.lock();
            let state = &mut *guard;
            state.model.update(&mut state.props, &bodies[entity.id], &view, subscribed);
        }

        let step = self.interval_sim_ms;
        let now = self.sim_time_ms.fetch_add(step, Ordering::AcqRel) + step;
        self.updates.fetch_add(1, Ordering::AcqRel);

        match self.quit_time_ms {
            Some(limit) if now >= limit => {
                info!(sim_time_ms = now, "quit time reached");
                self.quit.store(true, Ordering::Release);
                TickOutcome::Terminal
            }
            _ => TickOutcome::Continue,
        }
    }

    /// Global poses of every entity. Locks one entity at a time.
    fn snapshot_bodies(&self) -> Vec<Body> {
        let mut bodies: Vec<Body> = Vec::with_capacity(self.entities.len());
        for entity in &self.entities {
            let props = entity.lock().props;
            let origin = entity.parent.map_or(Pose::default(), |p| bodies[p].global);
            bodies.push(Body {
                group: entity.group,
                global: origin.compose(&props.pose),
                radius: props.size.radius(),
                color: props.color,
                fiducial_return: props.fiducial_return,
                laser_return: props.laser_return,
                obstacle: props.obstacle,
            });
        }
        bodies
    }

    /// Global pose of an entity as of now.
    pub fn global_pose(&self, id: EntityId) -> Option<Pose> {
        let entity = self.entities.get(id)?;
        let local = entity.lock().props.pose;
        let origin = match entity.parent {
            Some(p) => self.global_pose(p)?,
            None => Pose::default(),
        };
        Some(origin.compose(&local))
    }
}

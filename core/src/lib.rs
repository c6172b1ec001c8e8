pub mod binding;
pub mod config;
pub mod cycle;
pub mod description;
pub mod device;
pub mod dispatcher;
pub mod driver;
pub mod error;
pub mod geometry;
pub mod mailbox;
pub mod messages;
pub mod models;
pub mod resolver;
pub mod stats;
pub mod world;

pub use binding::{Binding, BindingSet, DeviceDeclaration};
pub use config::{BridgeConfig, DriverDeclaration};
pub use cycle::CycleDriver;
pub use description::{ModelDescription, WorldDescription};
pub use device::{DeviceId, Interface, DEFAULT_PORT};
pub use dispatcher::{DispatchReport, Dispatcher};
pub use driver::StageDriver;
pub use error::{Error, Result};
pub use mailbox::{DeviceClient, Observation};
pub use models::ModelType;
pub use resolver::{resolve, resolve_with, ResolvePolicy};
pub use stats::{CycleStats, StatsSummary};
pub use world::{EntityId, TickOutcome, World};

/// Upper bound on any command, request, reply or observation payload, in bytes.
pub const MAX_MESSAGE_SIZE: usize = 8192;

/// Simulated milliseconds per world tick unless a world says otherwise.
pub const DEFAULT_INTERVAL_SIM_MS: u64 = 100;

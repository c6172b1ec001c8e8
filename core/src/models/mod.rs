use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::geometry::{Pose, Size};
use crate::messages::ConfigReply;

pub mod blobfinder;
pub mod fiducial;
pub mod laser;
pub mod position;
pub mod ranger;

pub use blobfinder::BlobfinderModel;
pub use fiducial::FiducialModel;
pub use laser::LaserModel;
pub use position::PositionModel;
pub use ranger::RangerModel;

/// Type tag of an entity in the world tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelType {
    Basic,
    Position,
    Laser,
    Ranger,
    Fiducial,
    Blobfinder,
}

impl ModelType {
    pub fn name(self) -> &'static str {
        match self {
            ModelType::Basic => "basic",
            ModelType::Position => "position",
            ModelType::Laser => "laser",
            ModelType::Ranger => "ranger",
            ModelType::Fiducial => "fiducial",
            ModelType::Blobfinder => "blobfinder",
        }
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Physical properties every entity carries regardless of its type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntityProps {
    /// Relative to the parent entity, or to the world for top-level entities.
    pub pose: Pose,
    pub size: Size,
    pub color: u32,
    pub fiducial_return: i32,
    pub laser_return: u8,
    pub obstacle: bool,
}

/// Snapshot of one entity as seen by everybody else during a tick.
#[derive(Debug, Clone, Copy)]
pub struct Body {
    /// Top-level ancestor. Sensors ignore bodies sharing their own group.
    pub group: usize,
    pub global: Pose,
    pub radius: f64,
    pub color: u32,
    pub fiducial_return: i32,
    pub laser_return: u8,
    pub obstacle: bool,
}

/// What a model can see of the world while it is updated.
pub struct SensorView<'a> {
    pub bodies: &'a [Body],
    /// Simulated seconds per tick.
    pub dt: f64,
}

impl<'a> SensorView<'a> {
    /// Bodies outside the given group.
    pub fn others(&self, group: usize) -> impl Iterator<Item = &'a Body> + 'a {
        self.bodies.iter().filter(move |b| b.group != group)
    }
}

/// Per-type state and behaviour of an entity.
pub enum ModelState {
    Basic,
    Position(PositionModel),
    Laser(LaserModel),
    Ranger(RangerModel),
    Fiducial(FiducialModel),
    Blobfinder(BlobfinderModel),
}

macro_rules! register_models {
    ($($tag:ident => $variant:ident($type:ty)),* $(,)?) => {
        /// Builds the model for a type tag from its (possibly null) settings.
        pub fn create_model(
            model_type: ModelType,
            settings: &Value,
            seed: u64,
        ) -> Result<ModelState> {
            match model_type {
                ModelType::Basic => Ok(ModelState::Basic),
                $(
                    ModelType::$tag => {
                        let parsed = if settings.is_null() {
                            Default::default()
                        } else {
                            serde_json::from_value(settings.clone()).map_err(|e| {
                                Error::Config(format!("bad {} settings: {}", model_type, e))
                            })?
                        };
                        Ok(ModelState::$variant(<$type>::new(parsed, seed)?))
                    }
                )*
            }
        }

        impl ModelState {
            pub fn model_type(&self) -> ModelType {
                match self {
                    ModelState::Basic => ModelType::Basic,
                    $(ModelState::$variant(_) => ModelType::$tag,)*
                }
            }

            /// Advance one tick. Sensors only refresh readings while subscribed.
            pub fn update(
                &mut self,
                props: &mut EntityProps,
                own: &Body,
                view: &SensorView<'_>,
                subscribed: bool,
            ) {
                match self {
                    ModelState::Basic => {}
                    $(ModelState::$variant(m) => m.update(props, own, view, subscribed),)*
                }
            }

            pub fn configure(
                &mut self,
                props: &mut EntityProps,
                request: &[u8],
            ) -> Result<ConfigReply> {
                match self {
                    ModelState::Basic => Ok(ConfigReply::nack()),
                    $(ModelState::$variant(m) => m.configure(props, request),)*
                }
            }

            /// Encoded observation snapshot, `None` for entities with nothing to report.
            pub fn observe(&self) -> Result<Option<Vec<u8>>> {
                match self {
                    ModelState::Basic => Ok(None),
                    $(ModelState::$variant(m) => m.observe().map(Some),)*
                }
            }
        }
    };
}

register_models!(
    Position => Position(PositionModel),
    Laser => Laser(LaserModel),
    Ranger => Ranger(RangerModel),
    Fiducial => Fiducial(FiducialModel),
    Blobfinder => Blobfinder(BlobfinderModel),
);

impl ModelState {
    /// Only position models take commands.
    pub fn command(&mut self, command: &[u8]) -> Result<()> {
        match self {
            ModelState::Position(m) => m.command(command),
            other => Err(Error::malformed(format!(
                "{} entities do not accept commands",
                other.model_type()
            ))),
        }
    }
}

/// Quantise a range reading to the given resolution.
pub(crate) fn quantize(range: f64, resolution: f64) -> f64 {
    if resolution <= 0.0 {
        return range;
    }
    let steps = (1.0 / resolution).round().max(1.0);
    (range * steps).round() / steps
}

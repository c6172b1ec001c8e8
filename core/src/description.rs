use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::geometry::{Pose, Size};
use crate::models::ModelType;

/// Serializable description of a world: timing plus the entity tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldDescription {
    /// Simulated milliseconds per tick.
    pub interval_sim_ms: u64,
    /// Wall-clock milliseconds per tick; zero runs as fast as possible.
    pub interval_real_ms: u64,
    pub quit_time_ms: Option<u64>,
    pub seed: u64,
    pub models: Vec<ModelDescription>,
}

impl Default for WorldDescription {
    fn default() -> Self {
        Self {
            interval_sim_ms: crate::DEFAULT_INTERVAL_SIM_MS,
            interval_real_ms: 0,
            quit_time_ms: None,
            seed: 0,
            models: Vec::new(),
        }
    }
}

impl WorldDescription {
    pub fn with_models(models: Vec<ModelDescription>) -> Self {
        Self { models, ..Default::default() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelDescription {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub model_type: ModelType,
    #[serde(default)]
    pub pose: Pose,
    #[serde(default)]
    pub size: Size,
    #[serde(default = "default_color")]
    pub color: u32,
    #[serde(default)]
    pub fiducial_return: i32,
    #[serde(default = "default_laser_return")]
    pub laser_return: u8,
    #[serde(default = "default_obstacle")]
    pub obstacle: bool,
    /// Type-specific settings, interpreted by the model for `model_type`.
    #[serde(default)]
    pub settings: Value,
    #[serde(default)]
    pub children: Vec<ModelDescription>,
}

fn default_color() -> u32 {
    0xFF0000
}

fn default_laser_return() -> u8 {
    1
}

fn default_obstacle() -> bool {
    true
}

impl ModelDescription {
    pub fn new(model_type: ModelType) -> Self {
        Self {
            name: None,
            model_type,
            pose: Pose::default(),
            size: Size::default(),
            color: default_color(),
            fiducial_return: 0,
            laser_return: default_laser_return(),
            obstacle: default_obstacle(),
            settings: Value::Null,
            children: Vec::new(),
        }
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn at(mut self, x: f64, y: f64, a: f64) -> Self {
        self.pose = Pose::new(x, y, a);
        self
    }

    pub fn with_size(mut self, x: f64, y: f64) -> Self {
        self.size = Size { x, y };
        self
    }

    pub fn with_child(mut self, child: ModelDescription) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_settings(mut self, settings: Value) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_fiducial_return(mut self, id: i32) -> Self {
        self.fiducial_return = id;
        self
    }
}

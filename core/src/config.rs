use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::binding::DeviceDeclaration;
use crate::description::WorldDescription;
use crate::device::DeviceId;
use crate::error::{Error, Result};
use crate::resolver::ResolvePolicy;

/// A driver block: the devices it provides and where to find their entities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverDeclaration {
    /// Device ids such as `"position:0"` or `"6665:laser:1"`.
    pub provides: Vec<String>,
    /// Root entity searched for every provided device.
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub resolve_policy: ResolvePolicy,
}

impl DriverDeclaration {
    pub fn declarations(&self) -> Result<Vec<DeviceDeclaration>> {
        self.provides
            .iter()
            .map(|text| -> Result<DeviceDeclaration> {
                let device: DeviceId = text.parse()?;
                Ok(DeviceDeclaration::new(device, &self.model))
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    pub world: WorldDescription,
    #[serde(default)]
    pub drivers: Vec<DriverDeclaration>,
    #[serde(default = "default_dispatch_interval_ms")]
    pub dispatch_interval_ms: u64,
    /// Dispatcher passes per statistics window. Each window is logged and
    /// then reset; zero disables them.
    #[serde(default = "default_stats_report_interval")]
    pub stats_report_interval: u64,
}

fn default_dispatch_interval_ms() -> u64 {
    10
}

fn default_stats_report_interval() -> u64 {
    100
}

impl BridgeConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {}", path.display(), e)))?;
        let config: Self = text.parse()?;
        info!(path = %path.display(), drivers = config.drivers.len(), "configuration loaded");
        Ok(config)
    }
}

impl std::str::FromStr for BridgeConfig {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }
}

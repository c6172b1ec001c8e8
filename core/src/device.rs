use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::ModelType;

pub const DEFAULT_PORT: u16 = 6665;

/// Names one external device slot. Never mutated after declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceId {
    pub port: u16,
    pub code: u16,
    pub index: u16,
}

impl DeviceId {
    pub fn new(port: u16, interface: Interface, index: u16) -> Self {
        Self { port, code: interface.code(), index }
    }

    pub fn interface(&self) -> Result<Interface> {
        Interface::from_code(self.code)
    }

    /// The simulation interface stands for the whole world, not an entity.
    pub fn is_passthrough(&self) -> bool {
        self.code == Interface::Simulation.code()
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match Interface::from_code(self.code) {
            Ok(interface) => write!(f, "{}:{}:{}", self.port, interface.name(), self.index),
            Err(_) => write!(f, "{}:{}:{}", self.port, self.code, self.index),
        }
    }
}

/// Accepts `interface:index` or `port:interface:index`, with the interface
/// given either by name or by numeric code.
impl FromStr for DeviceId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidDeviceId(s.to_string());
        let parts: Vec<&str> = s.trim().split(':').collect();
        let (port, interface, index) = match parts.as_slice() {
            [interface, index] => (DEFAULT_PORT, *interface, *index),
            [port, interface, index] => (port.parse().map_err(|_| invalid())?, *interface, *index),
            _ => return Err(invalid()),
        };
        let code = match interface.parse::<u16>() {
            Ok(code) => code,
            Err(_) => Interface::from_name(interface)
                .ok_or(Error::InvalidDeviceId(s.to_string()))?
                .code(),
        };
        let index = index.parse().map_err(|_| invalid())?;
        Ok(Self { port, code, index })
    }
}

/// The closed set of interface kinds this bridge can serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interface {
    Simulation,
    Position,
    Sonar,
    Laser,
    Blobfinder,
    Fiducial,
}

/// How much traffic an interface accepts from its clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub accepts_commands: bool,
    pub request_queue_len: usize,
}

macro_rules! register_interfaces {
    ($(
        $variant:ident => $code:literal, $name:literal, $model:expr, $cmd:expr, $qlen:expr
    );* $(;)?) => {
        impl Interface {
            pub fn code(self) -> u16 {
                match self { $(Interface::$variant => $code),* }
            }

            pub fn name(self) -> &'static str {
                match self { $(Interface::$variant => $name),* }
            }

            pub fn from_code(code: u16) -> Result<Self> {
                match code {
                    $($code => Ok(Interface::$variant),)*
                    other => Err(Error::UnsupportedInterface(other)),
                }
            }

            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $($name => Some(Interface::$variant),)*
                    _ => None,
                }
            }

            /// Entity type a device of this interface binds to. `None` for
            /// the pass-through simulation interface.
            pub fn model_type(self) -> Option<ModelType> {
                match self { $(Interface::$variant => $model),* }
            }

            pub fn capabilities(self) -> Capabilities {
                match self {
                    $(Interface::$variant => Capabilities {
                        accepts_commands: $cmd,
                        request_queue_len: $qlen,
                    }),*
                }
            }
        }
    };
}

register_interfaces! {
    Simulation => 31, "simulation", None, false, 0;
    Position => 4, "position", Some(ModelType::Position), true, 1;
    Sonar => 5, "sonar", Some(ModelType::Ranger), false, 1;
    Laser => 6, "laser", Some(ModelType::Laser), false, 1;
    Blobfinder => 7, "blobfinder", Some(ModelType::Blobfinder), false, 0;
    Fiducial => 10, "fiducial", Some(ModelType::Fiducial), false, 1;
}

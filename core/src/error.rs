use thiserror::Error;

use crate::device::DeviceId;
use crate::models::ModelType;

/// Failures surfaced by setup, activity control and per-cycle dispatch.
#[derive(Debug, Error)]
pub enum Error {
    /// The declared root entity does not exist in the world.
    #[error("no entity named \"{0}\" in the world")]
    NameNotFound(String),

    /// No unclaimed entity of the required type below the root.
    #[error("no unclaimed {model_type} entity below \"{root}\"")]
    NotFound { root: String, model_type: ModelType },

    #[error("interface code {0} is not supported")]
    UnsupportedInterface(u16),

    #[error("failed to resolve an entity for device {device}")]
    ResolutionFailed {
        device: DeviceId,
        #[source]
        source: Box<Error>,
    },

    #[error("device {0} is not provided by this driver")]
    UnknownDevice(DeviceId),

    #[error("malformed message: {0}")]
    MalformedMessage(String),

    #[error("request queue for device {0} is full")]
    RequestQueueFull(DeviceId),

    #[error("device {0} does not accept commands")]
    CommandsNotAccepted(DeviceId),

    #[error("entity name \"{0}\" is declared more than once")]
    DuplicateName(String),

    #[error("invalid device id \"{0}\"")]
    InvalidDeviceId(String),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Stable failure code, one per cause.
    pub fn code(&self) -> i32 {
        match self {
            Error::NameNotFound(_) => 1,
            Error::NotFound { .. } => 2,
            Error::UnsupportedInterface(_) => 3,
            Error::ResolutionFailed { .. } => 4,
            Error::UnknownDevice(_) => 5,
            Error::MalformedMessage(_) => 6,
            Error::RequestQueueFull(_) => 7,
            Error::DuplicateName(_) => 8,
            Error::InvalidDeviceId(_) => 9,
            Error::Config(_) => 10,
            Error::CommandsNotAccepted(_) => 11,
        }
    }

    pub(crate) fn malformed(detail: impl Into<String>) -> Self {
        Error::MalformedMessage(detail.into())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Config(err.to_string())
    }
}

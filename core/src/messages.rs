//! Typed payloads exchanged between clients and bound entities.
//!
//! Payloads travel as JSON bytes. Every transfer is bounded by
//! [`MAX_MESSAGE_SIZE`](crate::MAX_MESSAGE_SIZE); anything larger or
//! undecodable is a [`Error::MalformedMessage`].

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::geometry::{Pose, Size};
use crate::MAX_MESSAGE_SIZE;

pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let bytes = serde_json::to_vec(value).map_err(|e| Error::malformed(e.to_string()))?;
    if bytes.len() > MAX_MESSAGE_SIZE {
        return Err(Error::malformed(format!(
            "encoded payload is {} bytes, limit is {}",
            bytes.len(),
            MAX_MESSAGE_SIZE
        )));
    }
    Ok(bytes)
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    if bytes.len() > MAX_MESSAGE_SIZE {
        return Err(Error::malformed(format!(
            "payload is {} bytes, limit is {}",
            bytes.len(),
            MAX_MESSAGE_SIZE
        )));
    }
    serde_json::from_slice(bytes).map_err(|e| Error::malformed(e.to_string()))
}

/// Opaque identity of the client a request came from; replies carry it back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientToken(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplyKind {
    Ack,
    Nack,
}

/// Answer to one configuration request, routed back to the requesting client.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub token: ClientToken,
    pub kind: ReplyKind,
    pub payload: Vec<u8>,
}

impl Reply {
    pub fn is_ack(&self) -> bool {
        self.kind == ReplyKind::Ack
    }

    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        decode(&self.payload)
    }
}

/// Reply body produced by an entity before it is tagged with a client token.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigReply {
    pub kind: ReplyKind,
    pub payload: Vec<u8>,
}

impl ConfigReply {
    pub fn ack<T: Serialize>(body: &T) -> Result<Self> {
        Ok(Self { kind: ReplyKind::Ack, payload: encode(body)? })
    }

    pub fn empty_ack() -> Self {
        Self { kind: ReplyKind::Ack, payload: Vec::new() }
    }

    pub fn nack() -> Self {
        Self { kind: ReplyKind::Nack, payload: Vec::new() }
    }
}

/// Mounting pose and footprint of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    pub pose: Pose,
    pub size: Size,
}

// position

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PositionCommand {
    Velocity { vx: f64, vy: f64, va: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PositionRequest {
    SetOdom { x: f64, y: f64, a: f64 },
    ResetOdom,
    GetGeom,
    MotorPower { on: bool },
    VelocityMode { mode: VelocityMode },
    GetSpeed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VelocityMode {
    #[default]
    Differential,
    Omnidirectional,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Velocity {
    pub vx: f64,
    pub vy: f64,
    pub va: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionData {
    pub odom: Pose,
    pub velocity: Velocity,
    pub stall: bool,
    pub motors_enabled: bool,
}

// laser

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LaserRequest {
    SetConfig(LaserConfig),
    GetConfig,
    GetGeom,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaserConfig {
    /// Radians.
    pub min_angle: f64,
    pub max_angle: f64,
    pub samples: u32,
    pub range_max: f64,
    pub range_res: f64,
    pub intensity: bool,
}

impl Default for LaserConfig {
    fn default() -> Self {
        Self {
            min_angle: -std::f64::consts::FRAC_PI_2,
            max_angle: std::f64::consts::FRAC_PI_2,
            samples: 361,
            range_max: 8.0,
            range_res: 0.001,
            intensity: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaserData {
    pub min_angle: f64,
    pub max_angle: f64,
    pub range_max: f64,
    pub ranges: Vec<f64>,
    pub intensity: Vec<u8>,
}

// sonar

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SonarRequest {
    GetGeom,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SonarGeometry {
    pub transducers: Vec<Pose>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SonarData {
    pub ranges: Vec<f64>,
}

// fiducial

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FiducialRequest {
    GetGeom,
    /// Settings are left unvalidated here so a bad one can still be
    /// answered with the current value.
    SetFov { fov: serde_json::Value },
    GetFov,
    SetId { id: serde_json::Value },
    GetId,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FiducialFov {
    pub min_range: f64,
    pub max_range: f64,
    /// Radians.
    pub view_angle: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FiducialId {
    pub id: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FiducialGeometry {
    pub pose: Pose,
    pub size: Size,
    pub fiducial_size: Size,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fiducial {
    pub id: i32,
    pub x: f64,
    pub y: f64,
    pub yaw: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FiducialData {
    pub fiducials: Vec<Fiducial>,
}

// blobfinder

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Blob {
    pub color: u32,
    pub x: u32,
    pub y: u32,
    pub area: u32,
    pub range: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlobfinderData {
    pub width: u32,
    pub height: u32,
    pub blobs: Vec<Blob>,
}

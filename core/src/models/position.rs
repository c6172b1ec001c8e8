use serde::Deserialize;
use tracing::debug;

use crate::error::Result;
use crate::geometry::Pose;
use crate::messages::{
    decode, encode, ConfigReply, Geometry, PositionCommand, PositionData, PositionRequest, Velocity,
    VelocityMode,
};

use super::{Body, EntityProps, SensorView};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PositionSettings {
    pub velocity_mode: VelocityMode,
    pub motors_enabled: bool,
}

impl Default for PositionSettings {
    fn default() -> Self {
        Self { velocity_mode: VelocityMode::Differential, motors_enabled: true }
    }
}

/// A mobile base driven by velocity commands.
pub struct PositionModel {
    pub velocity: Velocity,
    pub odom: Pose,
    pub mode: VelocityMode,
    pub motors_enabled: bool,
    pub stall: bool,
}

impl PositionModel {
    pub fn new(settings: PositionSettings, _seed: u64) -> Result<Self> {
        Ok(Self {
            velocity: Velocity::default(),
            odom: Pose::default(),
            mode: settings.velocity_mode,
            motors_enabled: settings.motors_enabled,
            stall: false,
        })
    }

    pub fn update(
        &mut self,
        props: &mut EntityProps,
        own: &Body,
        view: &SensorView<'_>,
        _subscribed: bool,
    ) {
        if !self.motors_enabled {
            return;
        }
        let vy = match self.mode {
            VelocityMode::Differential => 0.0,
            VelocityMode::Omnidirectional => self.velocity.vy,
        };
        let delta = Pose::new(self.velocity.vx * view.dt, vy * view.dt, self.velocity.va * view.dt);
        if delta == Pose::default() {
            self.stall = false;
            return;
        }

        let next = own.global.compose(&delta);
        self.stall = view
            .others(own.group)
            .filter(|b| b.obstacle)
            .any(|b| (b.global.x - next.x).hypot(b.global.y - next.y) < b.radius + own.radius);
        if self.stall {
            return;
        }
        props.pose = props.pose.compose(&delta);
        self.odom = self.odom.compose(&delta);
    }

    pub fn command(&mut self, command: &[u8]) -> Result<()> {
        match decode::<PositionCommand>(command)? {
            PositionCommand::Velocity { vx, vy, va } => {
                self.velocity = Velocity { vx, vy, va };
            }
        }
        Ok(())
    }

    pub fn configure(&mut self, props: &mut EntityProps, request: &[u8]) -> Result<ConfigReply> {
        let reply = match decode::<PositionRequest>(request)? {
            PositionRequest::SetOdom { x, y, a } => {
                self.odom = Pose::new(x, y, a);
                ConfigReply::empty_ack()
            }
            PositionRequest::ResetOdom => {
                self.odom = Pose::default();
                ConfigReply::empty_ack()
            }
            PositionRequest::GetGeom => {
                ConfigReply::ack(&Geometry { pose: props.pose, size: props.size })?
            }
            PositionRequest::MotorPower { on } => {
                debug!(on, "position motor power");
                self.motors_enabled = on;
                ConfigReply::empty_ack()
            }
            PositionRequest::VelocityMode { mode } => {
                self.mode = mode;
                ConfigReply::empty_ack()
            }
            PositionRequest::GetSpeed => ConfigReply::ack(&self.velocity)?,
        };
        Ok(reply)
    }

    pub fn observe(&self) -> Result<Vec<u8>> {
        encode(&PositionData {
            odom: self.odom,
            velocity: self.velocity,
            stall: self.stall,
            motors_enabled: self.motors_enabled,
        })
    }
}

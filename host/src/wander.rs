use tracing::{debug, info, warn};

use stagebridge_core::messages::{LaserData, PositionCommand};
use stagebridge_core::{DeviceClient, Interface, StageDriver};

const CRUISE_SPEED: f64 = 0.4;
const TURN_RATE: f64 = 0.6;
const CLEARANCE: f64 = 0.8;

/// Drives a position device away from whatever its laser sees ahead.
pub struct Wander {
    position: DeviceClient,
    laser: Option<DeviceClient>,
    last_seq: u64,
}

impl Wander {
    /// Pairs the first position and laser devices a driver provides.
    pub fn attach(driver: &StageDriver) -> Option<Self> {
        let mut position = None;
        let mut laser = None;
        for binding in driver.bindings().iter() {
            match binding.interface {
                Interface::Position if position.is_none() => {
                    position = driver.client(binding.device).ok()
                }
                Interface::Laser if laser.is_none() => laser = driver.client(binding.device).ok(),
                _ => {}
            }
        }
        let position = position?;
        info!(device = %position.device(), with_laser = laser.is_some(), "wander client attached");
        Some(Self { position, laser, last_seq: 0 })
    }

    pub fn step(&mut self) {
        let Some(scan) = self.fresh_scan() else {
            if self.laser.is_none() {
                self.drive(PositionCommand::Velocity { vx: CRUISE_SPEED, vy: 0.0, va: 0.0 });
            }
            return;
        };

        let mid = scan.ranges.len() / 2;
        let (right, left) = scan.ranges.split_at(mid);
        let nearest = |r: &[f64]| r.iter().copied().fold(f64::INFINITY, f64::min);
        let (right_min, left_min) = (nearest(right), nearest(left));

        let command = if right_min.min(left_min) < CLEARANCE {
            let va = if left_min > right_min { TURN_RATE } else { -TURN_RATE };
            PositionCommand::Velocity { vx: 0.0, vy: 0.0, va }
        } else {
            PositionCommand::Velocity { vx: CRUISE_SPEED, vy: 0.0, va: 0.0 }
        };
        debug!(device = %self.position.device(), ?command, "wander command");
        self.drive(command);
    }

    fn drive(&self, command: PositionCommand) {
        if let Err(e) = self.position.send_command(&command) {
            warn!(device = %self.position.device(), error = %e, "could not queue command");
        }
    }

    fn fresh_scan(&mut self) -> Option<LaserData> {
        let observation = self.laser.as_ref()?.latest()?;
        if observation.seq == self.last_seq {
            return None;
        }
        self.last_seq = observation.seq;
        observation.decode().ok()
    }
}

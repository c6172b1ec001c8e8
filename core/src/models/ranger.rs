use rand::prelude::*;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::geometry::{ray_circle, Pose};
use crate::messages::{decode, encode, ConfigReply, SonarData, SonarGeometry, SonarRequest};

use super::{quantize, Body, EntityProps, SensorView};

pub const MAX_TRANSDUCERS: usize = 64;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RangerSettings {
    /// Transducer poses relative to the entity.
    pub transducers: Vec<Pose>,
    pub range_max: f64,
    pub range_res: f64,
    pub range_noise: f64,
}

impl Default for RangerSettings {
    fn default() -> Self {
        Self {
            transducers: vec![Pose::default()],
            range_max: 5.0,
            range_res: 0.001,
            range_noise: 0.0,
        }
    }
}

/// A ring of sonar transducers, one range per beam.
pub struct RangerModel {
    pub settings: RangerSettings,
    pub ranges: Vec<f64>,
    rng: StdRng,
}

impl RangerModel {
    pub fn new(settings: RangerSettings, seed: u64) -> Result<Self> {
        if settings.transducers.len() > MAX_TRANSDUCERS {
            return Err(Error::Config(format!(
                "ranger has {} transducers, at most {} fit in one reading",
                settings.transducers.len(),
                MAX_TRANSDUCERS
            )));
        }
        let ranges = vec![settings.range_max; settings.transducers.len()];
        Ok(Self { settings, ranges, rng: StdRng::seed_from_u64(seed) })
    }

    pub fn update(
        &mut self,
        _props: &mut EntityProps,
        own: &Body,
        view: &SensorView<'_>,
        subscribed: bool,
    ) {
        if !subscribed {
            return;
        }
        let max = self.settings.range_max;
        for (slot, transducer) in self.ranges.iter_mut().zip(&self.settings.transducers) {
            let origin = own.global.compose(transducer);
            let mut nearest = max;
            for body in view.others(own.group).filter(|b| b.obstacle) {
                let (x, y) = (body.global.x, body.global.y);
                if let Some(d) = ray_circle(&origin, origin.a, x, y, body.radius, nearest) {
                    nearest = d;
                }
            }
            if self.settings.range_noise > 0.0 && nearest < max {
                let noise = self.settings.range_noise;
                nearest = (nearest + self.rng.gen_range(-noise..noise)).clamp(0.0, max);
            }
            *slot = quantize(nearest, self.settings.range_res);
        }
    }

    pub fn configure(&mut self, _props: &mut EntityProps, request: &[u8]) -> Result<ConfigReply> {
        match decode::<SonarRequest>(request)? {
            SonarRequest::GetGeom => ConfigReply::ack(&SonarGeometry {
                transducers: self.settings.transducers.clone(),
            }),
        }
    }

    pub fn observe(&self) -> Result<Vec<u8>> {
        encode(&SonarData { ranges: self.ranges.clone() })
    }
}

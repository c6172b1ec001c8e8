use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::error::Result;
use crate::geometry::{normalize, Size};
use crate::messages::{
    decode, encode, ConfigReply, Fiducial, FiducialData, FiducialFov, FiducialGeometry, FiducialId,
    FiducialRequest,
};

use super::{Body, EntityProps, SensorView};

/// Nearest detections kept per reading.
pub const MAX_FIDUCIALS: usize = 64;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FiducialSettings {
    pub min_range: f64,
    pub max_range: f64,
    pub view_angle: f64,
}

impl Default for FiducialSettings {
    fn default() -> Self {
        Self { min_range: 0.0, max_range: 8.0, view_angle: std::f64::consts::PI }
    }
}

/// Detects entities whose fiducial return is non-zero.
pub struct FiducialModel {
    pub fov: FiducialFov,
    pub detections: Vec<Fiducial>,
}

impl FiducialModel {
    pub fn new(settings: FiducialSettings, _seed: u64) -> Result<Self> {
        Ok(Self {
            fov: FiducialFov {
                min_range: settings.min_range,
                max_range: settings.max_range,
                view_angle: settings.view_angle,
            },
            detections: Vec::new(),
        })
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
        let fov = self.fov;
        let mut detections: Vec<Fiducial> = view
            .others(own.group)
            .filter(|b| b.fiducial_return != 0)
            .filter_map(|b| {
                let (range, bearing) = own.global.range_bearing(b.global.x, b.global.y);
                let visible = range >= fov.min_range
                    && range <= fov.max_range
                    && bearing.abs() <= fov.view_angle / 2.0;
                visible.then(|| Fiducial {
                    id: b.fiducial_return,
                    x: range * bearing.cos(),
                    y: range * bearing.sin(),
                    yaw: normalize(b.global.a - own.global.a),
                })
            })
            .collect();
        detections.sort_by(|a, b| a.x.hypot(a.y).total_cmp(&b.x.hypot(b.y)));
        detections.truncate(MAX_FIDUCIALS);
        self.detections = detections;
    }

    // A set request always answers with the value now in force, even when
    // the new setting was rejected.
    pub fn configure(&mut self, props: &mut EntityProps, request: &[u8]) -> Result<ConfigReply> {
        match decode::<FiducialRequest>(request)? {
            FiducialRequest::GetGeom => ConfigReply::ack(&FiducialGeometry {
                pose: props.pose,
                size: props.size,
                fiducial_size: Size { x: 0.1, y: 0.1 },
            }),
            FiducialRequest::SetFov { fov } => {
                match serde_json::from_value::<FiducialFov>(fov) {
                    Ok(fov) => self.fov = fov,
                    Err(e) => warn!(error = %e, "incorrect fiducial fov setting"),
                }
                ConfigReply::ack(&self.fov)
            }
            FiducialRequest::GetFov => ConfigReply::ack(&self.fov),
            FiducialRequest::SetId { id } => {
                match id {
                    Value::Number(n) => match n.as_i64().and_then(|v| i32::try_from(v).ok()) {
                        Some(v) => props.fiducial_return = v,
                        None => warn!(%n, "fiducial id out of range"),
                    },
                    other => warn!(%other, "incorrect fiducial id setting"),
                }
                ConfigReply::ack(&FiducialId { id: props.fiducial_return })
            }
            FiducialRequest::GetId => ConfigReply::ack(&FiducialId { id: props.fiducial_return }),
        }
    }

    pub fn observe(&self) -> Result<Vec<u8>> {
        encode(&FiducialData { fiducials: self.detections.clone() })
    }
}

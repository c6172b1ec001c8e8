use serde::Deserialize;

use crate::error::Result;
use crate::messages::{encode, Blob, BlobfinderData, ConfigReply};

use super::{Body, EntityProps, SensorView};

/// Nearest blobs kept per frame.
pub const MAX_BLOBS: usize = 64;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BlobfinderSettings {
    pub width: u32,
    pub height: u32,
    pub range_max: f64,
    pub fov: f64,
    /// Colours to track. Empty tracks every colour.
    pub channels: Vec<u32>,
}

impl Default for BlobfinderSettings {
    fn default() -> Self {
        Self {
            width: 80,
            height: 60,
            range_max: 8.0,
            fov: std::f64::consts::FRAC_PI_3,
            channels: Vec::new(),
        }
    }
}

pub struct BlobfinderModel {
    pub settings: BlobfinderSettings,
    pub blobs: Vec<Blob>,
}

impl BlobfinderModel {
    pub fn new(settings: BlobfinderSettings, _seed: u64) -> Result<Self> {
        Ok(Self { settings, blobs: Vec::new() })
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
        let s = &self.settings;
        let half_width = s.width as f64 / 2.0;
        let mut blobs: Vec<Blob> = view
            .others(own.group)
            .filter(|b| s.channels.is_empty() || s.channels.contains(&b.color))
            .filter_map(|b| {
                let (range, bearing) = own.global.range_bearing(b.global.x, b.global.y);
                if range > s.range_max || bearing.abs() > s.fov / 2.0 || range <= f64::EPSILON {
                    return None;
                }
                // image x grows to the right, bearing grows to the left
                let x = (half_width - bearing / (s.fov / 2.0) * half_width)
                    .clamp(0.0, s.width as f64 - 1.0);
                let apparent = (b.radius * 2.0 / range) / s.fov * s.width as f64;
                Some(Blob {
                    color: b.color,
                    x: x as u32,
                    y: s.height / 2,
                    area: (apparent * apparent).round().max(1.0) as u32,
                    range,
                })
            })
            .collect();
        blobs.sort_by(|a, b| a.range.total_cmp(&b.range));
        blobs.truncate(MAX_BLOBS);
        self.blobs = blobs;
    }

    pub fn configure(&mut self, _props: &mut EntityProps, _request: &[u8]) -> Result<ConfigReply> {
        Ok(ConfigReply::nack())
    }

    pub fn observe(&self) -> Result<Vec<u8>> {
        encode(&BlobfinderData {
            width: self.settings.width,
            height: self.settings.height,
            blobs: self.blobs.clone(),
        })
    }
}

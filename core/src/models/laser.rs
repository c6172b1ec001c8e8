use rand::prelude::*;
use serde::Deserialize;
use tracing::warn;

use crate::error::{Error, Result};
use crate::geometry::ray_circle;
use crate::messages::{
    decode, encode, ConfigReply, Geometry, LaserConfig, LaserData, LaserRequest,
};
use crate::MAX_MESSAGE_SIZE;

use super::{quantize, Body, EntityProps, SensorView};

pub const MAX_SAMPLES: u32 = 721;

// Longest JSON text of any f64.
const WIDEST_FLOAT: usize = 24;
// "255," per intensity reading.
const WIDEST_INTENSITY: usize = 4;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LaserSettings {
    #[serde(flatten)]
    pub config: LaserConfig,
    /// Amplitude of uniform range noise, metres.
    pub range_noise: f64,
}

pub struct LaserModel {
    pub config: LaserConfig,
    pub range_noise: f64,
    pub data: LaserData,
    rng: StdRng,
}

impl LaserModel {
    pub fn new(settings: LaserSettings, seed: u64) -> Result<Self> {
        let config = settings.config;
        check_config(&config).map_err(|reason| Error::Config(format!("laser: {}", reason)))?;
        Ok(Self {
            config,
            range_noise: settings.range_noise,
            data: empty_scan(&config),
            rng: StdRng::seed_from_u64(seed),
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
        let cfg = self.config;
        let mut scan = empty_scan(&cfg);
        let step = if cfg.samples > 1 {
            (cfg.max_angle - cfg.min_angle) / (cfg.samples - 1) as f64
        } else {
            0.0
        };

        for i in 0..cfg.samples as usize {
            let angle = own.global.a + cfg.min_angle + step * i as f64;
            let mut nearest = cfg.range_max;
            let mut bright = 0u8;
            for body in view.others(own.group).filter(|b| b.obstacle) {
                let (x, y) = (body.global.x, body.global.y);
                if let Some(d) = ray_circle(&own.global, angle, x, y, body.radius, nearest) {
                    nearest = d;
                    bright = body.laser_return;
                }
            }
            if self.range_noise > 0.0 && nearest < cfg.range_max {
                nearest += self.rng.gen_range(-self.range_noise..self.range_noise);
                nearest = nearest.clamp(0.0, cfg.range_max);
            }
            scan.ranges[i] = quantize(nearest, cfg.range_res);
            if cfg.intensity {
                scan.intensity[i] = bright;
            }
        }
        self.data = scan;
    }

    pub fn configure(&mut self, props: &mut EntityProps, request: &[u8]) -> Result<ConfigReply> {
        match decode::<LaserRequest>(request)? {
            LaserRequest::SetConfig(cfg) => {
                if let Err(reason) = check_config(&cfg) {
                    warn!(
                        samples = cfg.samples,
                        range_res = cfg.range_res,
                        %reason,
                        "rejecting laser config"
                    );
                    return Ok(ConfigReply::nack());
                }
                self.config = cfg;
                self.data = empty_scan(&cfg);
                ConfigReply::ack(&self.config)
            }
            LaserRequest::GetConfig => ConfigReply::ack(&self.config),
            LaserRequest::GetGeom => {
                ConfigReply::ack(&Geometry { pose: props.pose, size: props.size })
            }
        }
    }

    pub fn observe(&self) -> Result<Vec<u8>> {
        encode(&self.data)
    }
}

/// Rejects configs whose scans could not be published.
fn check_config(cfg: &LaserConfig) -> std::result::Result<(), String> {
    if cfg.samples == 0 || cfg.samples > MAX_SAMPLES {
        return Err(format!("samples must be within 1..={}", MAX_SAMPLES));
    }
    if cfg.min_angle > cfg.max_angle {
        return Err("min_angle is above max_angle".into());
    }
    if !cfg.range_max.is_finite() || cfg.range_max <= 0.0 {
        return Err("range_max must be positive and finite".into());
    }
    let bound = scan_size_bound(cfg).map_err(|e| e.to_string())?;
    if bound > MAX_MESSAGE_SIZE {
        return Err(format!(
            "a scan may encode to {} bytes, limit is {}",
            bound, MAX_MESSAGE_SIZE
        ));
    }
    Ok(())
}

/// Worst-case encoded length of one scan under `cfg`.
pub(crate) fn scan_size_bound(cfg: &LaserConfig) -> Result<usize> {
    let header = encode(&LaserData {
        min_angle: cfg.min_angle,
        max_angle: cfg.max_angle,
        range_max: cfg.range_max,
        ranges: Vec::new(),
        intensity: Vec::new(),
    })?
    .len();
    let samples = cfg.samples as usize;
    Ok(header + samples * (range_width(cfg) + 1) + samples * WIDEST_INTENSITY)
}

// Widest text of a published range. Quantised readings are exact decimals
// only when the step count has no prime factors besides 2 and 5.
fn range_width(cfg: &LaserConfig) -> usize {
    let untouched = serde_json::to_string(&cfg.range_max).map_or(WIDEST_FLOAT, |s| s.len());
    if cfg.range_res.is_nan() || cfg.range_res <= 0.0 {
        return WIDEST_FLOAT;
    }
    let steps = (1.0 / cfg.range_res).round().max(1.0);
    if steps >= u64::MAX as f64 {
        return WIDEST_FLOAT;
    }
    let (mut rest, mut twos, mut fives) = (steps as u64, 0usize, 0usize);
    while rest % 2 == 0 {
        rest /= 2;
        twos += 1;
    }
    while rest % 5 == 0 {
        rest /= 5;
        fives += 1;
    }
    if rest != 1 {
        return WIDEST_FLOAT;
    }
    let whole_digits = (cfg.range_max.floor() + 1.0).log10().floor() as usize + 1;
    let quantised = whole_digits + 1 + twos.max(fives).max(1);
    quantised.max(untouched).min(WIDEST_FLOAT)
}

fn empty_scan(cfg: &LaserConfig) -> LaserData {
    LaserData {
        min_angle: cfg.min_angle,
        max_angle: cfg.max_angle,
        range_max: cfg.range_max,
        ranges: vec![cfg.range_max; cfg.samples as usize],
        intensity: vec![0; cfg.samples as usize],
    }
}

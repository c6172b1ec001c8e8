use serde::{Deserialize, Serialize};

/// Planar pose: position in metres, heading in radians.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    pub x: f64,
    pub y: f64,
    pub a: f64,
}

impl Pose {
    pub fn new(x: f64, y: f64, a: f64) -> Self {
        Self { x, y, a }
    }

    /// `local` expressed in this pose's frame, mapped to the outer frame.
    pub fn compose(&self, local: &Pose) -> Pose {
        let (sin, cos) = self.a.sin_cos();
        Pose {
            x: self.x + local.x * cos - local.y * sin,
            y: self.y + local.x * sin + local.y * cos,
            a: normalize(self.a + local.a),
        }
    }

    /// Range and bearing from this pose to a point.
    pub fn range_bearing(&self, x: f64, y: f64) -> (f64, f64) {
        let dx = x - self.x;
        let dy = y - self.y;
        (dx.hypot(dy), normalize(dy.atan2(dx) - self.a))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub x: f64,
    pub y: f64,
}

impl Default for Size {
    fn default() -> Self {
        Self { x: 0.4, y: 0.4 }
    }
}

impl Size {
    pub fn radius(&self) -> f64 {
        self.x.max(self.y) / 2.0
    }
}

pub fn normalize(angle: f64) -> f64 {
    use std::f64::consts::{PI, TAU};
    let mut a = angle % TAU;
    if a > PI {
        a -= TAU;
    } else if a < -PI {
        a += TAU;
    }
    a
}

/// Distance along a ray to the first crossing of a circle, if within `max`.
pub fn ray_circle(
    origin: &Pose,
    angle: f64,
    cx: f64,
    cy: f64,
    radius: f64,
    max: f64,
) -> Option<f64> {
    let (dy, dx) = angle.sin_cos();
    let ox = origin.x - cx;
    let oy = origin.y - cy;
    let b = ox * dx + oy * dy;
    let c = ox * ox + oy * oy - radius * radius;
    let disc = b * b - c;
    if disc < 0.0 {
        return None;
    }
    let root = disc.sqrt();
    let near = -b - root;
    let t = if near >= 0.0 { near } else { -b + root };
    (t >= 0.0 && t <= max).then_some(t)
}

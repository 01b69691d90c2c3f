//! Displacement field applied to the grid vertices.
//!
//! The bubble is a radial bell `β(r) = β₀ · (r/R) · exp(-(r/R)²)` around the
//! renderer's Y axis. Each vertex is pushed outward in the floor plane and
//! lifted along Y by an amount proportional to β. The push is hard-capped at
//! [`AMPLITUDE_CAP`] of the bubble radius in clip space, so arbitrarily large
//! inputs still produce a bounded picture.

use crate::geometry::GridGeometry;
use crate::uniforms::FrameUniforms;

/// Fraction of the clip-space half extent covered by a bubble whose radius
/// equals the floor half span.
pub const BUBBLE_CLIP_FRACTION: f64 = 0.4;
/// Maximum displacement as a fraction of the clip-space bubble radius.
pub const AMPLITUDE_CAP: f64 = 0.10;
/// Radii below this are the undeformed center point.
pub const CENTER_EPSILON: f64 = 1.0e-6;
pub const POWER_GAIN_MIN: f64 = 0.1;
pub const POWER_GAIN_MAX: f64 = 5.0;

/// Bubble radius in clip space for a sag depth and floor half span (both nm).
pub fn sag_rclip(sag_depth_nm: f64, half_span_nm: f64) -> f64 {
    sag_depth_nm / half_span_nm * BUBBLE_CLIP_FRACTION
}

/// Canonical bell profile. Peaks at `r = R/√2` with value `e^{-1/2}/√2`.
pub fn bell_profile(r: f64, radius: f64) -> f64 {
    let s = r / radius;
    s * (-s * s).exp()
}

/// Vertical gain from average power: `clamp(P/100, 0.1, 5.0)`.
pub fn power_gain(power_avg_mw: f64) -> f64 {
    if power_avg_mw.is_finite() {
        (power_avg_mw / 100.0).clamp(POWER_GAIN_MIN, POWER_GAIN_MAX)
    } else {
        POWER_GAIN_MIN
    }
}

/// Vertical damping from the time-scale ratio: `1 / max(1, ts/1000)`.
pub fn ts_damping(ts_ratio: f64) -> f64 {
    1.0 / (ts_ratio / 1000.0).max(1.0)
}

/// `beta0 * shape` clamped to [-1, 1]. An overflowing product saturates by
/// sign; a vanished or undefined shape gives 0.
fn saturate_beta(beta0: f64, shape: f64) -> f64 {
    let beta = beta0 * shape;
    if beta.is_finite() {
        beta.clamp(-1.0, 1.0)
    } else if shape == 0.0 || shape.is_nan() || beta0 == 0.0 {
        0.0
    } else {
        beta0.signum() * shape.signum()
    }
}

/// Inputs of one deformation pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DeformParams {
    pub beta0: Option<f64>,
    /// Display scale multiplying β before the clamp (1 in parity mode).
    pub derived_scale: f64,
    pub sag_rclip: f64,
    pub power_gain: f64,
    pub ts_damping: f64,
}

impl DeformParams {
    pub fn from_frame(frame: &FrameUniforms, half_span_nm: f64) -> Self {
        Self {
            beta0: frame.grid_beta0,
            derived_scale: frame.derived_scale,
            sag_rclip: sag_rclip(frame.sag_depth_nm, half_span_nm),
            power_gain: power_gain(frame.power_avg_mw),
            ts_damping: ts_damping(frame.ts_ratio),
        }
    }

    pub fn lateral_k(&self) -> f64 {
        AMPLITUDE_CAP * self.sag_rclip
    }

    pub fn vertical_k(&self) -> f64 {
        AMPLITUDE_CAP * self.sag_rclip
    }

    /// Upper bound on the in-plane displacement of any vertex.
    pub fn max_lateral(&self) -> f64 {
        self.lateral_k()
    }

    /// Upper bound on the Y displacement of any vertex.
    pub fn max_vertical(&self) -> f64 {
        self.vertical_k() * self.power_gain * self.ts_damping
    }
}

/// What a pass did, for logging.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DeformStats {
    pub applied: bool,
    pub max_lateral: f64,
    pub max_vertical: f64,
}

/// Reset the grid to its snapshot and, when `beta0` is known, deform it.
pub fn deform_grid(geometry: &mut GridGeometry, params: &DeformParams) -> DeformStats {
    let radius = params.sag_rclip;
    let beta0 = match params.beta0 {
        Some(b) if b.is_finite() && radius.is_finite() && radius > 0.0 => b,
        _ => {
            geometry.reset();
            return DeformStats::default();
        }
    };

    let scale = params.derived_scale;
    let lateral_k = params.lateral_k();
    let lift = params.vertical_k() * params.power_gain * params.ts_damping;
    let mut stats = DeformStats {
        applied: true,
        ..Default::default()
    };

    geometry.remap_from_original(|[x, y, z]| {
        let (x, y, z) = (x as f64, y as f64, z as f64);
        let r = (x * x + z * z).sqrt();
        if r < CENTER_EPSILON {
            return [x as f32, y as f32, z as f32];
        }

        // |β| <= 1 keeps the push within lateral_k.
        let beta = saturate_beta(beta0, scale * bell_profile(r, radius));
        let stretch = 1.0 + beta * lateral_k / r;
        let dy = beta * lift;

        stats.max_lateral = stats.max_lateral.max((beta * lateral_k).abs());
        stats.max_vertical = stats.max_vertical.max(dy.abs());
        [(x * stretch) as f32, (y + dy) as f32, (z * stretch) as f32]
    });
    stats
}

//! Named physics parameters fed to the renderer.
//!
//! [`WarpParams`] is both the patch shape accepted from upstream and the
//! merged state kept by an engine. Merging only copies what a patch carries;
//! defaults for anything still absent are applied once per frame by
//! [`WarpParams::resolve`].

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Frame-resolved `beta0` above which the field shader tints the bubble as an
/// energy-condition violation.
pub const ENERGY_CONDITION_BETA0: f64 = 1.0e5;

/// Partial set of warp parameters. `None` means "not supplied".
///
/// Keys follow the dashboard's naming so JSON patches from the upstream feed
/// deserialize directly. Unrecognized keys land in `extra`; they are merged
/// and logged but never uploaded.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WarpParams {
    #[serde(rename = "dutyCycle", skip_serializing_if = "Option::is_none")]
    pub duty_cycle: Option<f64>,
    #[serde(rename = "g_y", skip_serializing_if = "Option::is_none")]
    pub g_y: Option<f64>,
    #[serde(rename = "cavityQ", skip_serializing_if = "Option::is_none")]
    pub cavity_q: Option<f64>,
    #[serde(rename = "sagDepth_nm", skip_serializing_if = "Option::is_none")]
    pub sag_depth_nm: Option<f64>,
    #[serde(rename = "tsRatio", skip_serializing_if = "Option::is_none")]
    pub ts_ratio: Option<f64>,
    #[serde(rename = "powerAvg_MW", skip_serializing_if = "Option::is_none")]
    pub power_avg_mw: Option<f64>,
    #[serde(rename = "exoticMass_kg", skip_serializing_if = "Option::is_none")]
    pub exotic_mass_kg: Option<f64>,
    /// Precomputed displacement scale. Derived as `dutyCycle * g_y` when absent.
    #[serde(rename = "beta0", skip_serializing_if = "Option::is_none")]
    pub beta0: Option<f64>,

    /// Physics-parity identity. Locked engines own this field.
    #[serde(rename = "parity", skip_serializing_if = "Option::is_none")]
    pub parity: Option<bool>,
    /// Display scale applied to β before clamping. Locked engines own this field.
    #[serde(rename = "derivedScale", skip_serializing_if = "Option::is_none")]
    pub derived_scale: Option<f64>,
    /// Boost requested by a display caller; turned into `derivedScale` by the gate.
    #[serde(rename = "displayGain", skip_serializing_if = "Option::is_none")]
    pub display_gain: Option<f64>,
    #[serde(rename = "ridgeMode", skip_serializing_if = "Option::is_none")]
    pub ridge_mode: Option<u32>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

macro_rules! merge_fields {
    ($dst:ident, $src:ident, $($field:ident),+ $(,)?) => {
        $(
            if let Some(v) = $src.$field {
                $dst.$field = Some(v);
            }
        )+
    };
}

impl WarpParams {
    /// Parse a patch from the JSON payload of the uniforms feed.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Shallow merge: every field present in `patch` overwrites the current
    /// value, everything else is left alone.
    pub fn merge(&mut self, patch: WarpParams) {
        merge_fields!(
            self,
            patch,
            duty_cycle,
            g_y,
            cavity_q,
            sag_depth_nm,
            ts_ratio,
            power_avg_mw,
            exotic_mass_kg,
            beta0,
            parity,
            derived_scale,
            display_gain,
            ridge_mode,
        );
        self.extra.extend(patch.extra);
    }

    /// True when the patch carries nothing at all.
    pub fn is_empty(&self) -> bool {
        *self == WarpParams::default()
    }

    /// Resolve the effective per-frame values, filling every absent
    /// recognized parameter from `defaults`.
    pub fn resolve(&self, defaults: &UniformDefaults) -> FrameUniforms {
        let duty_cycle = self.duty_cycle.unwrap_or(defaults.duty_cycle);
        let g_y = self.g_y.unwrap_or(defaults.g_y);
        let beta0 = self.beta0.unwrap_or(duty_cycle * g_y);

        FrameUniforms {
            duty_cycle,
            g_y,
            cavity_q: self.cavity_q.unwrap_or(defaults.cavity_q),
            sag_depth_nm: self.sag_depth_nm.unwrap_or(defaults.sag_depth_nm),
            ts_ratio: self.ts_ratio.unwrap_or(defaults.ts_ratio),
            power_avg_mw: self.power_avg_mw.unwrap_or(defaults.power_avg_mw),
            exotic_mass_kg: self.exotic_mass_kg.unwrap_or(defaults.exotic_mass_kg),
            beta0: Some(beta0).filter(|b| b.is_finite()),
            grid_beta0: self.beta0.filter(|b| b.is_finite()),
            derived_scale: self
                .derived_scale
                .filter(|s| s.is_finite() && *s >= 0.0)
                .unwrap_or(1.0),
            ridge_mode: RidgeMode::from_index(self.ridge_mode.unwrap_or(0)),
            parity: self.parity.unwrap_or(false),
        }
    }
}

/// Fallback values for the seven physics parameters (the "hover" preset).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UniformDefaults {
    pub duty_cycle: f64,
    pub g_y: f64,
    pub cavity_q: f64,
    pub sag_depth_nm: f64,
    pub ts_ratio: f64,
    pub power_avg_mw: f64,
    pub exotic_mass_kg: f64,
}

impl UniformDefaults {
    pub const HOVER: UniformDefaults = UniformDefaults {
        duty_cycle: 0.14,
        g_y: 26.0,
        cavity_q: 1.0e9,
        sag_depth_nm: 16.0,
        ts_ratio: 4102.74,
        power_avg_mw: 83.3,
        exotic_mass_kg: 1405.0,
    };
}

impl Default for UniformDefaults {
    fn default() -> Self {
        Self::HOVER
    }
}

/// How the field shader colors the β profile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RidgeMode {
    /// Signed double-lobe profile, as the physics gives it.
    #[default]
    Physical,
    /// Single bright crest on |β|, easier to read on a dashboard.
    Display,
}

impl RidgeMode {
    pub fn from_index(index: u32) -> Self {
        if index == 0 {
            RidgeMode::Physical
        } else {
            RidgeMode::Display
        }
    }

    pub fn index(self) -> u32 {
        match self {
            RidgeMode::Physical => 0,
            RidgeMode::Display => 1,
        }
    }
}

/// Effective values for one frame, after default resolution.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameUniforms {
    pub duty_cycle: f64,
    pub g_y: f64,
    pub cavity_q: f64,
    pub sag_depth_nm: f64,
    pub ts_ratio: f64,
    pub power_avg_mw: f64,
    pub exotic_mass_kg: f64,
    /// Uploaded displacement scale: the caller's `beta0`, else
    /// `dutyCycle * g_y`. `None` when neither is finite.
    pub beta0: Option<f64>,
    /// The caller's own `beta0`, never derived. Drives grid deformation.
    pub grid_beta0: Option<f64>,
    pub derived_scale: f64,
    pub ridge_mode: RidgeMode,
    pub parity: bool,
}

impl FrameUniforms {
    pub fn energy_condition_violated(&self) -> bool {
        self.beta0.map_or(false, |b| b > ENERGY_CONDITION_BETA0)
    }

    /// The seven physics uniforms in upload order, paired with their shader names.
    pub fn physics(&self) -> [(&'static str, f64); 7] {
        [
            ("u_dutyCycle", self.duty_cycle),
            ("u_gY", self.g_y),
            ("u_cavityQ", self.cavity_q),
            ("u_sagDepthNm", self.sag_depth_nm),
            ("u_tsRatio", self.ts_ratio),
            ("u_powerAvgMW", self.power_avg_mw),
            ("u_exoticMassKg", self.exotic_mass_kg),
        ]
    }
}

impl fmt::Display for FrameUniforms {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "duty={:.3} g_y={:.1} Q={:.3e} sag={:.2}nm ts={:.2} P={:.1}MW m={:.1}kg beta0={} scale={:.2} ridge={:?} parity={}",
            self.duty_cycle,
            self.g_y,
            self.cavity_q,
            self.sag_depth_nm,
            self.ts_ratio,
            self.power_avg_mw,
            self.exotic_mass_kg,
            self.beta0.map_or_else(|| "n/a".to_string(), |b| format!("{:.4}", b)),
            self.derived_scale,
            self.ridge_mode,
            self.parity,
        )
    }
}

//! Fixed shader source table.
//!
//! Sources are selected, never assembled: every (tier, derivatives) pair maps
//! to one set of embedded files.

use std::fmt;

/// Vertex attribute every program reads its position from. Bound to location 0.
pub const POSITION_ATTRIBUTE: &str = "a_position";

/// Uniforms read by the field program, in upload order.
pub const FIELD_UNIFORMS: &[&str] = &[
    "u_viewProj",
    "u_time",
    "u_dutyCycle",
    "u_gY",
    "u_cavityQ",
    "u_sagDepthNm",
    "u_tsRatio",
    "u_powerAvgMW",
    "u_exoticMassKg",
    "u_beta0",
    "u_sagRclip",
    "u_derivedScale",
    "u_ridgeMode",
    "u_parity",
    "u_energyViolation",
];

/// Uniforms read by the grid program.
pub const GRID_UNIFORMS: &[&str] = &["u_mvp", "u_color"];

/// Shading language generation a context accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShaderTier {
    /// GLSL ES 1.00.
    WebGl1,
    /// GLSL ES 3.00.
    WebGl2,
    /// WGSL, for the native wgpu backend.
    Wgpu,
}

impl fmt::Display for ShaderTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderTier::WebGl1 => write!(f, "WebGL1"),
            ShaderTier::WebGl2 => write!(f, "WebGL2"),
            ShaderTier::Wgpu => write!(f, "wgpu"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProgramKind {
    /// Full-screen quad shading the β field.
    Field,
    /// Wireframe sheets.
    Grid,
}

impl ProgramKind {
    pub fn label(self) -> &'static str {
        match self {
            ProgramKind::Field => "field",
            ProgramKind::Grid => "grid",
        }
    }

    pub fn uniform_names(self) -> &'static [&'static str] {
        match self {
            ProgramKind::Field => FIELD_UNIFORMS,
            ProgramKind::Grid => GRID_UNIFORMS,
        }
    }

    /// Components per vertex of `a_position`.
    pub fn components(self) -> u32 {
        match self {
            ProgramKind::Field => 2,
            ProgramKind::Grid => 3,
        }
    }
}

/// Vertex and fragment source of one program.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProgramSource {
    pub kind: ProgramKind,
    pub vertex: &'static str,
    pub fragment: &'static str,
}

/// Both programs for one context.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ShaderSet {
    pub tier: ShaderTier,
    pub overlay: bool,
    pub field: ProgramSource,
    pub grid: ProgramSource,
}

impl ShaderSet {
    pub fn program(&self, kind: ProgramKind) -> &ProgramSource {
        match kind {
            ProgramKind::Field => &self.field,
            ProgramKind::Grid => &self.grid,
        }
    }
}

mod gles1 {
    pub const FIELD_VERT: &str = include_str!("shaders/gles1/field.vert");
    pub const FIELD_FRAG: &str = include_str!("shaders/gles1/field.frag");
    pub const FIELD_OVERLAY_FRAG: &str = include_str!("shaders/gles1/field_overlay.frag");
    pub const GRID_VERT: &str = include_str!("shaders/gles1/grid.vert");
    pub const GRID_FRAG: &str = include_str!("shaders/gles1/grid.frag");
}

mod gles3 {
    pub const FIELD_VERT: &str = include_str!("shaders/gles3/field.vert");
    pub const FIELD_FRAG: &str = include_str!("shaders/gles3/field.frag");
    pub const FIELD_OVERLAY_FRAG: &str = include_str!("shaders/gles3/field_overlay.frag");
    pub const GRID_VERT: &str = include_str!("shaders/gles3/grid.vert");
    pub const GRID_FRAG: &str = include_str!("shaders/gles3/grid.frag");
}

mod wgsl {
    pub const FIELD_VERT: &str = include_str!("shaders/wgsl/field.vert.wgsl");
    pub const FIELD_FRAG: &str = include_str!("shaders/wgsl/field.frag.wgsl");
    pub const FIELD_OVERLAY_FRAG: &str = include_str!("shaders/wgsl/field_overlay.frag.wgsl");
    pub const GRID_VERT: &str = include_str!("shaders/wgsl/grid.vert.wgsl");
    pub const GRID_FRAG: &str = include_str!("shaders/wgsl/grid.frag.wgsl");
}

macro_rules! shader_set {
    ($tier:expr, $overlay:expr, $module:ident, $field_frag:ident) => {
        ShaderSet {
            tier: $tier,
            overlay: $overlay,
            field: ProgramSource {
                kind: ProgramKind::Field,
                vertex: $module::FIELD_VERT,
                fragment: $module::$field_frag,
            },
            grid: ProgramSource {
                kind: ProgramKind::Grid,
                vertex: $module::GRID_VERT,
                fragment: $module::GRID_FRAG,
            },
        }
    };
}

const TABLE: [ShaderSet; 6] = [
    shader_set!(ShaderTier::WebGl1, false, gles1, FIELD_FRAG),
    shader_set!(ShaderTier::WebGl1, true, gles1, FIELD_OVERLAY_FRAG),
    shader_set!(ShaderTier::WebGl2, false, gles3, FIELD_FRAG),
    shader_set!(ShaderTier::WebGl2, true, gles3, FIELD_OVERLAY_FRAG),
    shader_set!(ShaderTier::Wgpu, false, wgsl, FIELD_FRAG),
    shader_set!(ShaderTier::Wgpu, true, wgsl, FIELD_OVERLAY_FRAG),
];

/// Pick the shader set for a context. `has_derivatives` switches the field
/// program to the variant with the screen-space grid-line overlay.
pub fn select_shader_source(tier: ShaderTier, has_derivatives: bool) -> &'static ShaderSet {
    let row = match tier {
        ShaderTier::WebGl1 => 0,
        ShaderTier::WebGl2 => 2,
        ShaderTier::Wgpu => 4,
    };
    &TABLE[row + has_derivatives as usize]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_is_total_and_matches_key() {
        for tier in [ShaderTier::WebGl1, ShaderTier::WebGl2, ShaderTier::Wgpu] {
            for overlay in [false, true] {
                let set = select_shader_source(tier, overlay);
                assert_eq!(set.tier, tier);
                assert_eq!(set.overlay, overlay);
                assert_eq!(set.field.kind, ProgramKind::Field);
                assert_eq!(set.grid.kind, ProgramKind::Grid);
            }
        }
    }

    #[test]
    fn test_overlay_only_changes_field_fragment() {
        let plain = select_shader_source(ShaderTier::WebGl2, false);
        let overlay = select_shader_source(ShaderTier::WebGl2, true);
        assert_eq!(plain.grid, overlay.grid);
        assert_eq!(plain.field.vertex, overlay.field.vertex);
        assert!(!plain.field.fragment.contains("fwidth"));
        assert!(overlay.field.fragment.contains("fwidth"));
    }

    #[test]
    fn test_glsl_versions() {
        let gl2 = select_shader_source(ShaderTier::WebGl2, false);
        assert!(gl2.field.vertex.starts_with("#version 300 es"));
        assert!(gl2.field.fragment.starts_with("#version 300 es"));

        let gl1 = select_shader_source(ShaderTier::WebGl1, true);
        assert!(!gl1.field.fragment.contains("#version"));
        assert!(gl1.field.fragment.contains("GL_OES_standard_derivatives"));
    }

    #[test]
    fn test_every_uniform_is_declared() {
        for tier in [ShaderTier::WebGl1, ShaderTier::WebGl2, ShaderTier::Wgpu] {
            let set = select_shader_source(tier, true);
            for source in [&set.field, &set.grid] {
                let text = format!("{}\n{}", source.vertex, source.fragment);
                for name in source.kind.uniform_names() {
                    assert!(text.contains(name), "{} missing {} ({})", source.kind.label(), name, tier);
                }
                assert!(source.vertex.contains(POSITION_ATTRIBUTE));
            }
        }
    }
}

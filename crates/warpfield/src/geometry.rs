//! Wireframe sheet geometry.
//!
//! Three orthogonal sheets are built as line lists and concatenated into one
//! buffer. Sheets are named in the physics frame (Z up): `Xy` is the floor,
//! `Xz` and `Yz` are walls. Vertices are emitted in the renderer's Y-up frame,
//! so the floor spans renderer X/Z and the walls stand along renderer Y.

use serde::{Deserialize, Serialize};

use crate::error::RenderError;

/// Clip-space half extent every sheet is normalized into.
pub const GRID_EXTENT: f32 = 1.0;
/// Baseline height of the floor sheet.
pub const FLOOR_Y: f32 = -0.35;
/// Distance of each wall from the origin along its normal.
pub const WALL_OFFSET: f32 = 0.9;
/// Amplitude of the baked floor ripple (clip units).
pub const RIPPLE_AMPLITUDE: f32 = 0.012;
/// Physical wavelength of the floor ripple.
pub const RIPPLE_PERIOD_NM: f64 = 8.0;

/// Full-screen quad in NDC, two triangles, xy pairs.
pub const FIELD_QUAD: [f32; 12] = [
    -1.0, -1.0, 1.0, -1.0, 1.0, 1.0, //
    -1.0, -1.0, 1.0, 1.0, -1.0, 1.0,
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Plane {
    Xy,
    Xz,
    Yz,
}

impl Plane {
    pub const ALL: [Plane; 3] = [Plane::Xy, Plane::Xz, Plane::Yz];

    /// Map sheet-local coordinates `(a, b)` in `[-1, 1]` to a renderer position.
    fn place(self, a: f32, b: f32, ripple: f32) -> [f32; 3] {
        match self {
            Plane::Xy => [a * GRID_EXTENT, FLOOR_Y + ripple, b * GRID_EXTENT],
            Plane::Xz => [a * GRID_EXTENT, b * GRID_EXTENT, -WALL_OFFSET],
            Plane::Yz => [-WALL_OFFSET, b * GRID_EXTENT, a * GRID_EXTENT],
        }
    }
}

/// Span and resolution of one sheet.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SheetSpec {
    pub span_nm: f64,
    pub divisions: u32,
}

impl SheetSpec {
    pub fn new(span_nm: f64, divisions: u32) -> Self {
        Self { span_nm, divisions }
    }
}

/// Per-sheet configuration for the combined grid.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub xy: SheetSpec,
    pub xz: SheetSpec,
    pub yz: SheetSpec,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            xy: SheetSpec::new(40.0, 24),
            xz: SheetSpec::new(40.0, 16),
            yz: SheetSpec::new(40.0, 16),
        }
    }
}

impl GridConfig {
    pub fn sheet(&self, plane: Plane) -> SheetSpec {
        match plane {
            Plane::Xy => self.xy,
            Plane::Xz => self.xz,
            Plane::Yz => self.yz,
        }
    }
}

/// Number of vertices `build_grid` emits for a sheet with `divisions`.
///
/// `divisions + 1` lines per direction, each cut into `divisions` segments.
pub fn sheet_vertex_count(divisions: u32) -> usize {
    let d = divisions as usize;
    2 * (d + 1) * d * 2
}

fn floor_ripple(a: f32, b: f32, half_span_nm: f64) -> f32 {
    let k = std::f64::consts::TAU * half_span_nm / RIPPLE_PERIOD_NM;
    let r = (k * a as f64).sin() * (k * b as f64).cos();
    RIPPLE_AMPLITUDE * r as f32
}

/// Build the line-list vertices of one sheet as flat xyz triples.
///
/// Lines along the sheet's first axis come first (one per division mark on
/// the second axis), then lines along the second axis. Output depends only on
/// the arguments.
pub fn build_grid(span_nm: f64, divisions: u32, plane: Plane) -> Vec<f32> {
    let mut out = Vec::with_capacity(sheet_vertex_count(divisions) * 3);
    if divisions == 0 {
        return out;
    }
    let half_span_nm = span_nm * 0.5;
    let step = 2.0 / divisions as f32;
    let mark = |i: u32| -1.0 + i as f32 * step;

    let mut push = |a: f32, b: f32| {
        let ripple = match plane {
            Plane::Xy => floor_ripple(a, b, half_span_nm),
            _ => 0.0,
        };
        out.extend_from_slice(&plane.place(a, b, ripple));
    };

    for j in 0..=divisions {
        let b = mark(j);
        for i in 0..divisions {
            push(mark(i), b);
            push(mark(i + 1), b);
        }
    }
    for i in 0..=divisions {
        let a = mark(i);
        for j in 0..divisions {
            push(a, mark(j));
            push(a, mark(j + 1));
        }
    }
    out
}

/// Vertex sub-range of one sheet inside the combined buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SheetRange {
    pub plane: Plane,
    pub first: u32,
    pub count: u32,
}

/// Combined grid: the live vertex array plus the undeformed snapshot it is
/// reset from every frame.
#[derive(Clone, Debug)]
pub struct GridGeometry {
    vertices: Vec<f32>,
    original: Box<[f32]>,
    sheets: [SheetRange; 3],
    half_span_nm: f64,
}

impl GridGeometry {
    pub fn build(config: &GridConfig) -> Result<Self, RenderError> {
        let mut vertices = Vec::new();
        let mut sheets = [SheetRange {
            plane: Plane::Xy,
            first: 0,
            count: 0,
        }; 3];

        for (slot, plane) in sheets.iter_mut().zip(Plane::ALL) {
            let spec = config.sheet(plane);
            if !(spec.span_nm.is_finite() && spec.span_nm > 0.0) {
                return Err(RenderError::Config(format!(
                    "sheet {:?} span must be positive, got {}",
                    plane, spec.span_nm
                )));
            }
            let sheet = build_grid(spec.span_nm, spec.divisions, plane);
            *slot = SheetRange {
                plane,
                first: (vertices.len() / 3) as u32,
                count: (sheet.len() / 3) as u32,
            };
            vertices.extend_from_slice(&sheet);
        }

        let geometry = Self {
            original: vertices.clone().into_boxed_slice(),
            vertices,
            sheets,
            half_span_nm: config.xy.span_nm * 0.5,
        };
        log::info!(
            "grid built: {} vertices (xy={}, xz={}, yz={}), half span {:.2} nm",
            geometry.vertex_count(),
            sheets[0].count,
            sheets[1].count,
            sheets[2].count,
            geometry.half_span_nm
        );
        Ok(geometry)
    }

    pub fn vertices(&self) -> &[f32] {
        &self.vertices
    }

    pub fn original(&self) -> &[f32] {
        &self.original
    }

    pub fn vertices_mut(&mut self) -> &mut [f32] {
        &mut self.vertices
    }

    /// Undo any deformation.
    pub fn reset(&mut self) {
        self.vertices.copy_from_slice(&self.original);
    }

    /// Rewrite every live vertex as `f(original position)`.
    ///
    /// The baseline is always the snapshot, never the live array, so repeated
    /// passes do not compound.
    pub fn remap_from_original(&mut self, mut f: impl FnMut([f32; 3]) -> [f32; 3]) {
        for (dst, src) in self
            .vertices
            .chunks_exact_mut(3)
            .zip(self.original.chunks_exact(3))
        {
            dst.copy_from_slice(&f([src[0], src[1], src[2]]));
        }
    }

    pub fn sheets(&self) -> &[SheetRange; 3] {
        &self.sheets
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / 3
    }

    /// Half span of the floor sheet, the reference scale for the bubble radius.
    pub fn half_span_nm(&self) -> f64 {
        self.half_span_nm
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_count_matches_formula() {
        for d in [0, 1, 2, 7, 24] {
            let v = build_grid(40.0, d, Plane::Xz);
            assert_eq!(v.len(), sheet_vertex_count(d) * 3, "divisions={}", d);
        }
    }

    #[test]
    fn test_sheet_stays_in_clip_range() {
        for plane in Plane::ALL {
            let v = build_grid(40.0, 12, plane);
            for p in v.chunks_exact(3) {
                for c in p {
                    assert!(c.abs() <= GRID_EXTENT + RIPPLE_AMPLITUDE, "{:?} {:?}", plane, p);
                }
            }
        }
    }

    #[test]
    fn test_floor_has_ripple_walls_are_flat() {
        let floor = build_grid(40.0, 16, Plane::Xy);
        let ys: Vec<f32> = floor.chunks_exact(3).map(|p| p[1]).collect();
        assert!(ys.iter().any(|y| (y - FLOOR_Y).abs() > 1e-4), "floor should ripple");
        assert!(ys.iter().all(|y| (y - FLOOR_Y).abs() <= RIPPLE_AMPLITUDE + 1e-6));

        let wall = build_grid(40.0, 16, Plane::Xz);
        assert!(wall.chunks_exact(3).all(|p| p[2] == -WALL_OFFSET));
        let side = build_grid(40.0, 16, Plane::Yz);
        assert!(side.chunks_exact(3).all(|p| p[0] == -WALL_OFFSET));
    }

    #[test]
    fn test_combined_ranges_are_contiguous() {
        let geom = GridGeometry::build(&GridConfig::default()).unwrap();
        let sheets = geom.sheets();
        assert_eq!(sheets[0].first, 0);
        assert_eq!(sheets[1].first, sheets[0].count);
        assert_eq!(sheets[2].first, sheets[0].count + sheets[1].count);
        assert_eq!(geom.vertices(), geom.original());
    }

    #[test]
    fn test_rejects_non_positive_span() {
        let config = GridConfig {
            xz: SheetSpec::new(0.0, 8),
            ..Default::default()
        };
        assert!(matches!(GridGeometry::build(&config), Err(RenderError::Config(_))));
    }

    #[test]
    fn test_reset_restores_snapshot() {
        let mut geom = GridGeometry::build(&GridConfig::default()).unwrap();
        geom.vertices_mut()[4] += 1.0;
        assert_ne!(geom.vertices(), geom.original());
        geom.reset();
        assert_eq!(geom.vertices(), geom.original());
    }
}

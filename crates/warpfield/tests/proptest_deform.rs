//! Property tests for the grid builder and the displacement field.
//!
//! - Sheet construction is deterministic and the sheet ranges partition the buffer
//! - Deformation stays finite and never exceeds the amplitude cap, whatever the inputs
//! - Deformation is a pure function of the snapshot (idempotent, non-cumulative)

use proptest::prelude::*;
use warpfield::deform::{deform_grid, power_gain, sag_rclip, ts_damping, DeformParams};
use warpfield::geometry::{build_grid, sheet_vertex_count, GridConfig, GridGeometry, Plane, SheetSpec};

// f32 storage of f64 math
const TOLERANCE: f64 = 1e-5;

fn plane_strategy() -> impl Strategy<Value = Plane> {
    prop_oneof![Just(Plane::Xy), Just(Plane::Xz), Just(Plane::Yz)]
}

fn grid_config(span_nm: f64, d: [u32; 3]) -> GridConfig {
    GridConfig {
        xy: SheetSpec::new(span_nm, d[0]),
        xz: SheetSpec::new(span_nm, d[1]),
        yz: SheetSpec::new(span_nm, d[2]),
    }
}

fn params(beta0: f64, sag_nm: f64, half_span_nm: f64, power_mw: f64, ts: f64) -> DeformParams {
    DeformParams {
        beta0: Some(beta0),
        derived_scale: 1.0,
        sag_rclip: sag_rclip(sag_nm, half_span_nm),
        power_gain: power_gain(power_mw),
        ts_damping: ts_damping(ts),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn build_grid_is_deterministic(
        span in 1.0f64..500.0,
        divisions in 0u32..40,
        plane in plane_strategy(),
    ) {
        let a = build_grid(span, divisions, plane);
        let b = build_grid(span, divisions, plane);
        prop_assert_eq!(a.len(), sheet_vertex_count(divisions) * 3);
        prop_assert_eq!(a, b);
    }

    #[test]
    fn sheet_counts_sum_to_total(
        span in 1.0f64..500.0,
        d in prop::array::uniform3(0u32..32),
    ) {
        let geom = GridGeometry::build(&grid_config(span, d)).unwrap();
        let total: u32 = geom.sheets().iter().map(|s| s.count).sum();
        prop_assert_eq!(total as usize, geom.vertex_count());
        prop_assert_eq!(geom.vertices().len(), geom.original().len());
    }

    #[test]
    fn displacement_respects_amplitude_cap(
        beta0 in 0.0f64..1.0e12,
        sag in 0.01f64..40.0,
        power in 0.0f64..10_000.0,
        ts in 1.0f64..1.0e5,
        scale in prop_oneof![0.0f64..1000.0, 1.0e200f64..1.0e300],
    ) {
        let mut geom = GridGeometry::build(&GridConfig::default()).unwrap();
        let mut p = params(beta0, sag, geom.half_span_nm(), power, ts);
        p.derived_scale = scale;
        deform_grid(&mut geom, &p);

        let lateral_cap = 0.10 * p.sag_rclip;
        let vertical_cap = p.max_vertical();
        prop_assert!(geom.vertices().iter().all(|v| v.is_finite()));
        for (now, before) in geom.vertices().chunks_exact(3).zip(geom.original().chunks_exact(3)) {
            let dx = (now[0] - before[0]) as f64;
            let dy = (now[1] - before[1]) as f64;
            let dz = (now[2] - before[2]) as f64;
            let lateral = (dx * dx + dz * dz).sqrt();
            prop_assert!(lateral <= lateral_cap + TOLERANCE, "lateral {} > {}", lateral, lateral_cap);
            prop_assert!(dy.abs() <= vertical_cap + TOLERANCE, "vertical {} > {}", dy, vertical_cap);
        }
    }

    #[test]
    fn deformation_is_not_cumulative(beta0 in 0.0f64..100.0, sag in 1.0f64..40.0) {
        let mut geom = GridGeometry::build(&GridConfig::default()).unwrap();
        let p = params(beta0, sag, geom.half_span_nm(), 83.3, 4102.74);
        deform_grid(&mut geom, &p);
        let first = geom.vertices().to_vec();
        deform_grid(&mut geom, &p);
        prop_assert_eq!(first, geom.vertices().to_vec());
    }
}

#[test]
fn huge_beta_saturates_instead_of_exploding() {
    let mut geom = GridGeometry::build(&GridConfig::default()).unwrap();
    let p = params(1.0e12, 16.0, geom.half_span_nm(), 83.3, 4102.74);
    let stats = deform_grid(&mut geom, &p);
    assert!(stats.applied);
    assert!(stats.max_lateral <= p.max_lateral() + 1e-12);
    assert!(stats.max_lateral > 0.9 * p.max_lateral(), "saturated ring should hit the cap");
    assert!(geom.vertices().iter().all(|v| v.is_finite()));
}

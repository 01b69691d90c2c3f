//! REAL/SHOW parity gate and the upstream feed, end to end.

use warpfield::deform::sag_rclip;
use warpfield::testing::{RecordingBackend, RecordingStatus, SharedRecorder};
use warpfield::{
    DualEngine, EngineConfig, LockParity, Parity, RidgeMode, ShowBoost, UniformBus, UniformSink,
    WarpEngine, WarpParams, UNIFORMS_TOPIC,
};

fn engine() -> (WarpEngine<RecordingBackend>, SharedRecorder) {
    let backend = RecordingBackend::webgl2();
    let rec = backend.recorder();
    let engine = WarpEngine::new(
        Ok(backend),
        Box::new(RecordingStatus::default()),
        &EngineConfig::default(),
    )
    .unwrap();
    (engine, rec)
}

fn hover_feed() -> WarpParams {
    WarpParams::from_json(
        r#"{"dutyCycle": 0.14, "g_y": 26, "sagDepth_nm": 16, "powerAvg_MW": 83.3,
            "tsRatio": 4102.74, "beta0": 3.64}"#,
    )
    .unwrap()
}

#[test]
fn locked_parity_engine_rejects_caller_overrides() {
    let (engine, rec) = engine();
    let mut real = engine.lock_parity(Parity::Real);

    real.update_uniforms(WarpParams {
        parity: Some(false),
        derived_scale: Some(999.0),
        ..Default::default()
    });
    assert_eq!(real.params().parity, Some(true));
    assert_ne!(real.params().derived_scale, Some(999.0));

    real.draw(0.0);
    let r = rec.borrow();
    assert_eq!(r.last_f32("u_parity"), Some(1.0));
    assert_eq!(r.last_f32("u_derivedScale"), Some(1.0));
}

#[test]
fn locking_twice_is_idempotent() {
    let (engine, _rec) = engine();
    let once = engine.lock_parity(Parity::Real);
    let twice = once.lock_parity(Parity::Real);
    assert_eq!(twice.parity(), Parity::Real);

    let mut twice = twice.lock_parity(Parity::Show { default_gain: 5.0 });
    twice.update_uniforms(WarpParams {
        parity: Some(false),
        ..Default::default()
    });
    assert_eq!(twice.params().parity, Some(true));
    assert_eq!(twice.params().derived_scale, Some(1.0));
}

#[test]
fn feed_goes_verbatim_to_real_and_boosted_to_show() {
    let (real, _) = engine();
    let (show, _) = engine();
    let boost = ShowBoost {
        display_gain: 12.0,
        ridge_mode: RidgeMode::Display,
    };
    let mut bus = UniformBus::new();
    let mut dual = DualEngine::new(real, show, boost, &mut bus);

    assert_eq!(bus.publish(UNIFORMS_TOPIC, &hover_feed()), 1);
    assert_eq!(dual.pump(), 1);
    assert_eq!(dual.pump(), 0);

    let real = dual.real().state().effective();
    assert!(real.parity);
    assert_eq!(real.derived_scale, 1.0);
    assert_eq!(real.ridge_mode, RidgeMode::Physical);
    assert_eq!(real.beta0, Some(3.64));

    let show = dual.show().state().effective();
    assert!(!show.parity);
    assert_eq!(show.derived_scale, 12.0);
    assert_eq!(show.ridge_mode, RidgeMode::Display);
    assert_eq!(show.beta0, Some(3.64));
}

#[test]
fn upstream_parity_flag_cannot_flip_show_engine() {
    let (real, _) = engine();
    let (show, _) = engine();
    let mut bus = UniformBus::new();
    let mut dual = DualEngine::new(real, show, ShowBoost::default(), &mut bus);

    let mut patch = hover_feed();
    patch.parity = Some(true);
    patch.derived_scale = Some(999.0);
    bus.publish(UNIFORMS_TOPIC, &patch);
    dual.pump();

    assert_eq!(dual.show().params().parity, Some(false));
    assert_eq!(dual.real().params().parity, Some(true));
    assert_ne!(dual.real().params().derived_scale, Some(999.0));
    assert_ne!(dual.show().params().derived_scale, Some(999.0));
}

#[test]
fn hover_scenario_stays_within_ten_percent_of_bubble_radius() {
    let (real, real_rec) = engine();
    let (show, show_rec) = engine();
    let mut bus = UniformBus::new();
    let mut dual = DualEngine::new(real, show, ShowBoost::default(), &mut bus);

    bus.publish(UNIFORMS_TOPIC, &hover_feed());
    dual.pump();
    dual.draw(0.25);

    for locked in [dual.real(), dual.show()] {
        let geom = locked.geometry();
        let half_span = geom.half_span_nm();
        let bound_nm = 0.10 * sag_rclip(16.0, half_span) * half_span;
        assert!(locked.last_deform().applied);

        for (now, before) in geom.vertices().chunks_exact(3).zip(geom.original().chunks_exact(3)) {
            let dx = (now[0] - before[0]) as f64;
            let dz = (now[2] - before[2]) as f64;
            // one clip unit spans one half span
            let lateral_nm = (dx * dx + dz * dz).sqrt() * half_span;
            assert!(lateral_nm <= bound_nm + 1e-4, "{} > {}", lateral_nm, bound_nm);
        }
    }

    assert!(real_rec.borrow().pending_errors() == 0);
    assert!(show_rec.borrow().last_f32("u_derivedScale").unwrap() > 1.0);
}

#[test]
fn show_engine_stays_finite_under_extreme_display_gain() {
    let (engine, _rec) = engine();
    let mut show = engine.lock_parity(Parity::Show { default_gain: 40.0 });
    show.update_uniforms(
        WarpParams::from_json(r#"{"beta0": 1e12, "sagDepth_nm": 0.1, "displayGain": 1e300}"#)
            .unwrap(),
    );
    assert_eq!(show.params().derived_scale, Some(1.0e300));

    show.draw(0.0);
    assert!(show.last_deform().applied);
    let geom = show.geometry();
    assert!(geom.vertices().iter().all(|v| v.is_finite()));
}

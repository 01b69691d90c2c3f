//! Per-frame protocol of the engine, observed through the recording backend.

use warpfield::testing::{Call, RecordingBackend, RecordingStatus, SharedRecorder};
use warpfield::{
    BufferUsage, Destroy, EngineConfig, EngineMode, EngineRegistry, FeatureFlags, Primitive,
    ProgramKind, RenderError, UniformSink, WarpEngine, WarpParams,
};

fn engine_with(backend: RecordingBackend) -> (WarpEngine<RecordingBackend>, SharedRecorder) {
    let rec = backend.recorder();
    let engine = WarpEngine::new(
        Ok(backend),
        Box::new(RecordingStatus::default()),
        &EngineConfig::default(),
    )
    .unwrap();
    (engine, rec)
}

fn grid_buffer_id(rec: &SharedRecorder) -> u32 {
    rec.borrow()
        .calls()
        .iter()
        .find_map(|c| match c {
            Call::CreateBuffer {
                id,
                usage: BufferUsage::Dynamic,
                ..
            } => Some(*id),
            _ => None,
        })
        .expect("grid buffer created")
}

fn assert_close(actual: Option<f32>, expected: f64, name: &str) {
    let v = actual.unwrap_or_else(|| panic!("{} never uploaded", name));
    let tol = 1e-6 * expected.abs().max(1.0);
    assert!(((v as f64) - expected).abs() <= tol, "{}: {} != {}", name, v, expected);
}

#[test]
fn first_frame_uploads_documented_defaults() {
    let (mut engine, rec) = engine_with(RecordingBackend::webgl2());
    engine.draw(0.0);

    let r = rec.borrow();
    assert_eq!(r.last_f32("u_time"), Some(0.0));
    assert_close(r.last_f32("u_dutyCycle"), 0.14, "u_dutyCycle");
    assert_close(r.last_f32("u_gY"), 26.0, "u_gY");
    assert_close(r.last_f32("u_cavityQ"), 1.0e9, "u_cavityQ");
    assert_close(r.last_f32("u_sagDepthNm"), 16.0, "u_sagDepthNm");
    assert_close(r.last_f32("u_tsRatio"), 4102.74, "u_tsRatio");
    assert_close(r.last_f32("u_powerAvgMW"), 83.3, "u_powerAvgMW");
    assert_close(r.last_f32("u_exoticMassKg"), 1405.0, "u_exoticMassKg");
    assert_close(r.last_f32("u_beta0"), 0.14 * 26.0, "u_beta0");
    assert_eq!(r.last_f32("u_parity"), Some(0.0));
    assert_eq!(r.last_f32("u_energyViolation"), Some(0.0));
    assert_eq!(r.pending_errors(), 0);
}

#[test]
fn frame_follows_upload_then_draw_order() {
    let (mut engine, rec) = engine_with(RecordingBackend::webgl2());
    rec.borrow_mut().clear_calls();
    engine.draw(1.5);

    let calls = rec.borrow().calls().to_vec();
    let pos = |pred: &dyn Fn(&Call) -> bool| calls.iter().position(|c| pred(c)).unwrap();

    let begin = pos(&|c| matches!(c, Call::BeginFrame(_)));
    let use_field = pos(&|c| *c == Call::UseProgram(ProgramKind::Field));
    let time = pos(&|c| matches!(c, Call::SetF32(n, _) if n == "u_time"));
    let quad = pos(&|c| matches!(c, Call::Draw { primitive: Primitive::Triangles, .. }));
    let depth_on = pos(&|c| *c == Call::DepthTest(true));
    let write = pos(&|c| matches!(c, Call::WriteBuffer { .. }));
    let use_grid = pos(&|c| *c == Call::UseProgram(ProgramKind::Grid));
    let first_line = pos(&|c| matches!(c, Call::Draw { primitive: Primitive::Lines, .. }));
    let depth_off = pos(&|c| *c == Call::DepthTest(false));
    let end = pos(&|c| *c == Call::EndFrame);

    assert!(begin < use_field && use_field < time && time < quad);
    assert!(quad < depth_on && depth_on < write && write < use_grid);
    assert!(use_grid < first_line && first_line < depth_off && depth_off < end);

    let line_draws: Vec<_> = calls
        .iter()
        .filter_map(|c| match c {
            Call::Draw {
                primitive: Primitive::Lines,
                components,
                first,
                count,
                ..
            } => Some((*components, *first, *count)),
            _ => None,
        })
        .collect();
    let sheets = engine.geometry().sheets();
    let draws = calls.iter().filter(|c| matches!(c, Call::Draw { .. })).count();
    assert_eq!(draws, 1 + line_draws.len(), "one field quad, the rest sheet lines");
    assert_eq!(line_draws.len(), 3);
    for (draw, sheet) in line_draws.iter().zip(sheets.iter()) {
        assert_eq!(*draw, (3, sheet.first, sheet.count));
    }
}

#[test]
fn uploaded_vertices_match_deformed_geometry() {
    let (mut engine, rec) = engine_with(RecordingBackend::webgl2());
    let id = grid_buffer_id(&rec);
    engine.update_uniforms(WarpParams {
        beta0: Some(3.64),
        ..Default::default()
    });
    engine.draw(0.0);

    assert!(engine.last_deform().applied);
    let r = rec.borrow();
    assert_eq!(r.buffer(id).unwrap(), engine.geometry().vertices());
    assert_ne!(engine.geometry().vertices(), engine.geometry().original());
}

#[test]
fn update_uniforms_merges_without_drawing() {
    let (mut engine, rec) = engine_with(RecordingBackend::webgl2());
    rec.borrow_mut().clear_calls();
    engine.update_uniforms(WarpParams::from_json(r#"{"g_y": 10, "hullName": "needle"}"#).unwrap());
    assert!(rec.borrow().calls().is_empty());

    engine.update_uniforms(WarpParams::from_json(r#"{"dutyCycle": 0.5}"#).unwrap());
    engine.draw(0.0);
    let r = rec.borrow();
    assert_close(r.last_f32("u_gY"), 10.0, "u_gY");
    assert_close(r.last_f32("u_beta0"), 5.0, "u_beta0");
    assert!(!r
        .calls()
        .iter()
        .any(|c| matches!(c, Call::SetF32(n, _) if n.contains("hull"))));
}

#[test]
fn cage_flag_off_skips_everything() {
    let mut config = EngineConfig::default();
    config.render_enabled = FeatureFlags::from_query("?cage=0").render_enabled(config.render_enabled);
    let backend = RecordingBackend::webgl2();
    let rec = backend.recorder();
    let mut engine =
        WarpEngine::new(Ok(backend), Box::new(RecordingStatus::default()), &config).unwrap();
    rec.borrow_mut().clear_calls();

    engine.draw(0.0);
    assert!(rec.borrow().calls().is_empty());

    engine.set_render_enabled(true);
    engine.draw(0.0);
    assert!(rec.borrow().calls().contains(&Call::EndFrame));
}

#[test]
fn update_grid_without_beta0_keeps_baseline() {
    let (mut engine, rec) = engine_with(RecordingBackend::webgl2());
    let id = grid_buffer_id(&rec);
    assert_eq!(engine.state().params.beta0, None);

    let stats = engine.update_grid();
    assert!(!stats.applied);
    assert_eq!(engine.geometry().vertices(), engine.geometry().original());
    assert_eq!(rec.borrow().buffer(id).unwrap(), engine.geometry().original());

    // the shader still gets the derived value
    engine.draw(0.0);
    assert!(!engine.last_deform().applied);
    assert_close(rec.borrow().last_f32("u_beta0"), 0.14 * 26.0, "u_beta0");

    // a deformed grid goes back to baseline once beta0 is gone again
    engine.update_uniforms(WarpParams {
        beta0: Some(3.64),
        ..Default::default()
    });
    assert!(engine.update_grid().applied);
    engine.update_uniforms(WarpParams {
        beta0: Some(f64::NAN),
        ..Default::default()
    });
    assert!(!engine.update_grid().applied);
    assert_eq!(engine.geometry().vertices(), engine.geometry().original());
}

#[test]
fn non_finite_beta0_leaves_grid_at_baseline() {
    let (mut engine, _rec) = engine_with(RecordingBackend::webgl2());
    engine.update_uniforms(WarpParams {
        duty_cycle: Some(1.0e300),
        g_y: Some(1.0e300),
        ..Default::default()
    });
    engine.draw(0.0);
    assert!(!engine.last_deform().applied);
    assert_eq!(engine.geometry().vertices(), engine.geometry().original());
}

#[test]
fn energy_condition_flag_follows_beta0() {
    let (mut engine, rec) = engine_with(RecordingBackend::webgl2());
    engine.update_uniforms(WarpParams {
        beta0: Some(2.0e5),
        ..Default::default()
    });
    engine.draw(0.0);
    assert_eq!(rec.borrow().last_f32("u_energyViolation"), Some(1.0));
}

#[test]
fn gpu_errors_are_logged_and_frame_completes() {
    let (mut engine, rec) = engine_with(RecordingBackend::webgl2());
    rec.borrow_mut().push_error("CONTEXT_LOST_WEBGL");
    rec.borrow_mut().clear_calls();
    engine.draw(0.0);

    let r = rec.borrow();
    assert_eq!(r.pending_errors(), 0);
    assert_eq!(r.calls().last(), Some(&Call::EndFrame));
}

#[test]
fn compile_failure_switches_to_fallback() {
    let status = RecordingStatus::default();
    let backend = RecordingBackend::webgl1().failing_compile(ProgramKind::Grid);
    let rec = backend.recorder();
    let mut engine =
        WarpEngine::new(Ok(backend), Box::new(status.clone()), &EngineConfig::default()).unwrap();

    assert!(matches!(engine.mode(), EngineMode::Fallback { reason } if reason.contains("grid")));
    assert!(engine.backend().is_none());
    assert_eq!(rec.borrow().live_programs(), 0, "field program must be released");
    assert_eq!(rec.borrow().live_buffers(), 0);

    let lines = status.lines();
    assert!(lines[0].contains("fallback"));
    assert!(lines.iter().any(|l| l.contains("83.3 MW")));

    rec.borrow_mut().clear_calls();
    engine.update_uniforms(WarpParams {
        g_y: Some(1.0),
        ..Default::default()
    });
    engine.draw(0.0);
    assert!(rec.borrow().calls().is_empty());
}

#[test]
fn missing_context_switches_to_fallback() {
    let status = RecordingStatus::default();
    let engine = WarpEngine::<RecordingBackend>::new(
        Err(RenderError::ContextUnavailable("webgl2 and webgl rejected".into())),
        Box::new(status.clone()),
        &EngineConfig::default(),
    )
    .unwrap();
    assert!(matches!(engine.mode(), EngineMode::Fallback { .. }));
    assert!(status.lines().iter().any(|l| l.contains("webgl2 and webgl rejected")));
}

#[test]
fn destroy_releases_every_gpu_object() {
    let (mut engine, rec) = engine_with(RecordingBackend::webgl2());
    engine.draw(0.0);
    assert_eq!(rec.borrow().live_programs(), 2);
    assert_eq!(rec.borrow().live_buffers(), 2);

    engine.destroy();
    assert_eq!(rec.borrow().live_programs(), 0);
    assert_eq!(rec.borrow().live_buffers(), 0);

    rec.borrow_mut().clear_calls();
    engine.draw(0.0);
    engine.destroy();
    assert!(rec.borrow().calls().is_empty());
}

#[test]
fn drop_releases_every_gpu_object() {
    let (engine, rec) = engine_with(RecordingBackend::webgl2());
    drop(engine);
    assert_eq!(rec.borrow().live_programs(), 0);
    assert_eq!(rec.borrow().live_buffers(), 0);
}

#[test]
fn registry_replace_releases_previous_engine() {
    let first = RecordingBackend::webgl2();
    let first_rec = first.recorder();
    let second = RecordingBackend::webgl2();
    let second_rec = second.recorder();
    let make = |backend: RecordingBackend| {
        move || {
            WarpEngine::new(
                Ok(backend),
                Box::new(RecordingStatus::default()),
                &EngineConfig::default(),
            )
        }
    };

    let mut registry = EngineRegistry::new();
    registry.attach("warp-canvas", make(first)).unwrap();
    registry.replace("warp-canvas", make(second)).unwrap();

    assert_eq!(first_rec.borrow().live_programs(), 0);
    assert_eq!(first_rec.borrow().live_buffers(), 0);
    assert_eq!(second_rec.borrow().live_programs(), 2);
    assert_eq!(registry.len(), 1);
}

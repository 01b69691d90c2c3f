//! The render engine: owns the parameter state, the grid and the GPU objects,
//! and turns the state into one frame per `draw` call.

use crate::backend::{BufferUsage, GpuBackend, Primitive, StatusSurface};
use crate::camera::{aspect_ratio, WarpCamera};
use crate::config::{EngineConfig, SheetColors};
use crate::deform::{deform_grid, DeformParams, DeformStats};
use crate::error::RenderError;
use crate::geometry::{GridGeometry, FIELD_QUAD};
use crate::program::ShaderProgram;
use crate::shaders::{select_shader_source, ProgramKind};
use crate::uniforms::{FrameUniforms, UniformDefaults, WarpParams};

/// Merged parameters plus the debug switch.
#[derive(Clone, Debug, PartialEq)]
pub struct EngineState {
    pub params: WarpParams,
    pub defaults: UniformDefaults,
    /// The `cage` flag. When false `draw` does nothing at all.
    pub render_enabled: bool,
}

impl EngineState {
    pub fn new(defaults: UniformDefaults, render_enabled: bool) -> Self {
        Self {
            params: WarpParams::default(),
            defaults,
            render_enabled,
        }
    }

    /// Values the next frame will upload.
    pub fn effective(&self) -> FrameUniforms {
        self.params.resolve(&self.defaults)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EngineMode {
    Gpu,
    /// No usable GPU program. Only the status readout is shown.
    Fallback { reason: String },
}

/// Anything that accepts parameter patches.
pub trait UniformSink {
    fn update_uniforms(&mut self, patch: WarpParams);
    fn params(&self) -> &WarpParams;
}

/// Explicit teardown, safe to call more than once.
pub trait Destroy {
    fn destroy(&mut self);
}

struct GpuResources<B: GpuBackend> {
    backend: B,
    field: ShaderProgram<B>,
    grid: ShaderProgram<B>,
    quad: B::Buffer,
    grid_buffer: B::Buffer,
}

impl<B: GpuBackend> GpuResources<B> {
    fn create(mut backend: B, geometry: &GridGeometry) -> Result<Self, RenderError> {
        let caps = backend.capabilities();
        let set = select_shader_source(caps.tier, caps.derivatives);
        log::info!(
            "building programs for {} (derivative overlay: {})",
            caps.tier,
            caps.derivatives
        );

        let field = ShaderProgram::link(&mut backend, set.program(ProgramKind::Field))?;
        let grid = match ShaderProgram::link(&mut backend, set.program(ProgramKind::Grid)) {
            Ok(p) => p,
            Err(e) => {
                field.release(&mut backend);
                return Err(e);
            }
        };
        let quad = match backend.create_vertex_buffer(&FIELD_QUAD, BufferUsage::Static) {
            Ok(b) => b,
            Err(e) => {
                field.release(&mut backend);
                grid.release(&mut backend);
                return Err(e);
            }
        };
        let grid_buffer = match backend.create_vertex_buffer(geometry.vertices(), BufferUsage::Dynamic)
        {
            Ok(b) => b,
            Err(e) => {
                field.release(&mut backend);
                grid.release(&mut backend);
                backend.delete_buffer(quad);
                return Err(e);
            }
        };

        Ok(Self {
            backend,
            field,
            grid,
            quad,
            grid_buffer,
        })
    }

    fn release(self) -> B {
        let Self {
            mut backend,
            field,
            grid,
            quad,
            grid_buffer,
        } = self;
        field.release(&mut backend);
        grid.release(&mut backend);
        backend.delete_buffer(quad);
        backend.delete_buffer(grid_buffer);
        backend
    }

    fn drain_errors(&mut self) {
        while let Some(err) = self.backend.take_error() {
            log::error!("GPU error: {}", err);
        }
    }
}

/// One renderer bound to one context.
pub struct WarpEngine<B: GpuBackend> {
    state: EngineState,
    camera: WarpCamera,
    clear_color: [f32; 4],
    sheet_colors: SheetColors,
    geometry: GridGeometry,
    gpu: Option<GpuResources<B>>,
    fallback: Box<dyn StatusSurface>,
    mode: EngineMode,
    last_deform: DeformStats,
    destroyed: bool,
}

impl<B: GpuBackend> WarpEngine<B> {
    /// Build an engine on `backend`.
    ///
    /// Context, compile and link failures do not fail construction: the
    /// engine switches to [`EngineMode::Fallback`] and paints the status
    /// readout on `fallback`. Only an invalid `config` is an error.
    pub fn new(
        backend: Result<B, RenderError>,
        fallback: Box<dyn StatusSurface>,
        config: &EngineConfig,
    ) -> Result<Self, RenderError> {
        let geometry = GridGeometry::build(&config.grid)?;
        let mut engine = Self {
            state: EngineState::new(config.defaults, config.render_enabled),
            camera: WarpCamera::from_config(&config.camera),
            clear_color: config.clear_color,
            sheet_colors: config.sheet_colors,
            geometry,
            gpu: None,
            fallback,
            mode: EngineMode::Gpu,
            last_deform: DeformStats::default(),
            destroyed: false,
        };

        match backend.and_then(|b| GpuResources::create(b, &engine.geometry)) {
            Ok(mut gpu) => {
                gpu.drain_errors();
                engine.gpu = Some(gpu);
            }
            Err(err) => engine.enter_fallback(err.to_string()),
        }
        Ok(engine)
    }

    fn enter_fallback(&mut self, reason: String) {
        log::warn!("falling back to status readout: {}", reason);
        self.mode = EngineMode::Fallback { reason };
        let lines = status_lines(&self.state, &self.mode);
        self.fallback.show_status(&lines);
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn mode(&self) -> &EngineMode {
        &self.mode
    }

    pub fn geometry(&self) -> &GridGeometry {
        &self.geometry
    }

    pub fn camera(&self) -> &WarpCamera {
        &self.camera
    }

    pub fn set_camera(&mut self, camera: WarpCamera) {
        self.camera = camera;
    }

    pub fn backend(&self) -> Option<&B> {
        self.gpu.as_ref().map(|g| &g.backend)
    }

    pub fn backend_mut(&mut self) -> Option<&mut B> {
        self.gpu.as_mut().map(|g| &mut g.backend)
    }

    pub fn last_deform(&self) -> DeformStats {
        self.last_deform
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Debug switch owned by the host shell.
    pub fn set_render_enabled(&mut self, enabled: bool) {
        if self.state.render_enabled != enabled {
            log::info!("rendering {}", if enabled { "enabled" } else { "disabled" });
        }
        self.state.render_enabled = enabled;
    }

    pub fn render_enabled(&self) -> bool {
        self.state.render_enabled
    }

    /// Re-derive the displacement field and upload the grid vertices.
    pub fn update_grid(&mut self) -> DeformStats {
        let frame = self.state.effective();
        self.update_grid_with(&frame)
    }

    fn update_grid_with(&mut self, frame: &FrameUniforms) -> DeformStats {
        let params = DeformParams::from_frame(frame, self.geometry.half_span_nm());
        let stats = deform_grid(&mut self.geometry, &params);
        if let Some(gpu) = self.gpu.as_mut() {
            gpu.backend
                .write_vertex_buffer(&gpu.grid_buffer, 0, self.geometry.vertices());
        }
        self.last_deform = stats;
        stats
    }

    /// Render one frame. `time` is seconds since the loop started.
    pub fn draw(&mut self, time: f64) {
        if !self.state.render_enabled || self.destroyed || self.gpu.is_none() {
            return;
        }
        let frame = self.state.effective();
        let sag_rclip = DeformParams::from_frame(&frame, self.geometry.half_span_nm()).sag_rclip;
        log::trace!("frame t={:.3}: {}", time, frame);

        let Some(gpu) = self.gpu.as_mut() else {
            return;
        };
        let (width, height) = gpu.backend.drawable_size();
        let aspect = aspect_ratio(width, height);
        let backend = &mut gpu.backend;

        backend.begin_frame(self.clear_color);

        let field = &gpu.field;
        backend.use_program(field.handle());
        field.set_mat4(
            backend,
            "u_viewProj",
            &self.camera.field_transform(aspect).to_cols_array(),
        );
        field.set_f32(backend, "u_time", time as f32);
        for (name, value) in frame.physics() {
            field.set_f32(backend, name, value as f32);
        }
        field.set_f32(backend, "u_beta0", frame.beta0.unwrap_or(0.0) as f32);
        field.set_f32(backend, "u_sagRclip", sag_rclip as f32);
        field.set_f32(backend, "u_derivedScale", frame.derived_scale as f32);
        field.set_f32(backend, "u_ridgeMode", frame.ridge_mode.index() as f32);
        field.set_f32(backend, "u_parity", if frame.parity { 1.0 } else { 0.0 });
        field.set_f32(
            backend,
            "u_energyViolation",
            if frame.energy_condition_violated() { 1.0 } else { 0.0 },
        );
        backend.draw_arrays(
            &gpu.quad,
            ProgramKind::Field.components(),
            Primitive::Triangles,
            0,
            (FIELD_QUAD.len() / 2) as u32,
        );

        backend.set_depth_test(true);
        self.update_grid_with(&frame);

        let Some(gpu) = self.gpu.as_mut() else {
            return;
        };
        let backend = &mut gpu.backend;
        let grid = &gpu.grid;
        backend.use_program(grid.handle());
        grid.set_mat4(
            backend,
            "u_mvp",
            &self.camera.grid_transform(aspect).to_cols_array(),
        );
        for sheet in self.geometry.sheets() {
            if sheet.count == 0 {
                continue;
            }
            grid.set_vec4(backend, "u_color", self.sheet_colors.get(sheet.plane));
            backend.draw_arrays(
                &gpu.grid_buffer,
                ProgramKind::Grid.components(),
                Primitive::Lines,
                sheet.first,
                sheet.count,
            );
        }
        backend.set_depth_test(false);
        backend.end_frame();

        gpu.drain_errors();
    }
}

impl<B: GpuBackend> UniformSink for WarpEngine<B> {
    /// Shallow-merge `patch` into the state. Nothing is drawn.
    fn update_uniforms(&mut self, patch: WarpParams) {
        if !patch.extra.is_empty() {
            log::debug!(
                "ignoring unrecognized uniforms: {:?}",
                patch.extra.keys().collect::<Vec<_>>()
            );
        }
        self.state.params.merge(patch);
        log::debug!("uniforms merged: {:?}", self.state.params);
    }

    fn params(&self) -> &WarpParams {
        &self.state.params
    }
}

impl<B: GpuBackend> Destroy for WarpEngine<B> {
    /// Release every program and buffer. Later draws are no-ops.
    fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        if let Some(gpu) = self.gpu.take() {
            drop(gpu.release());
            log::debug!("engine GPU objects released");
        }
    }
}

impl<B: GpuBackend> Drop for WarpEngine<B> {
    fn drop(&mut self) {
        self.destroy();
    }
}

/// Text of the degraded readout.
pub fn status_lines(state: &EngineState, mode: &EngineMode) -> Vec<String> {
    let frame = state.effective();
    let mut lines = Vec::with_capacity(12);
    match mode {
        EngineMode::Gpu => lines.push("Warp field renderer: GPU".to_string()),
        EngineMode::Fallback { reason } => {
            lines.push("Warp field renderer: fallback (GPU unavailable)".to_string());
            lines.push(format!("reason: {}", reason));
        }
    }
    lines.push(format!("duty cycle      {:.3}", frame.duty_cycle));
    lines.push(format!("gamma_geo (g_y) {:.2}", frame.g_y));
    lines.push(format!("cavity Q        {:.3e}", frame.cavity_q));
    lines.push(format!("sag depth       {:.2} nm", frame.sag_depth_nm));
    lines.push(format!("TS ratio        {:.2}", frame.ts_ratio));
    lines.push(format!("avg power       {:.1} MW", frame.power_avg_mw));
    lines.push(format!("exotic mass     {:.1} kg", frame.exotic_mass_kg));
    match frame.beta0 {
        Some(b) => lines.push(format!("beta0           {:.4}", b)),
        None => lines.push("beta0           n/a".to_string()),
    }
    if frame.energy_condition_violated() {
        lines.push("energy condition: violated".to_string());
    }
    lines
}

//! Native backend: the engine's immediate-mode calls replayed on wgpu.
//!
//! Uniform setters write into a CPU copy of the current program's block. Each
//! draw snapshots that block into a per-frame arena and records the draw;
//! `end_frame` uploads the arena and replays every draw in one render pass.

pub mod arena;
pub mod context;
pub mod pipeline;
pub mod reflect;

use std::collections::{HashMap, VecDeque};
use std::num::NonZeroU64;
use std::sync::{Arc, Mutex};

use winit::window::Window;

use warpfield::{
    BufferUsage, Capabilities, GpuBackend, Primitive, RenderError, ShaderStage, ShaderTier,
};
use warpfield::shaders::ProgramSource;

use arena::{UniformArena, UNIFORM_SLOT_SIZE};
use context::GpuContext;
use pipeline::{PipelineKey, ProgramModules};
use reflect::{parse_stage, reflect_uniforms, UniformLayout, UniformSlot};

const INITIAL_ARENA_SLOTS: u64 = 64;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ProgramId(usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BufferId(usize);

struct Program {
    label: &'static str,
    vertex: wgpu::ShaderModule,
    fragment: wgpu::ShaderModule,
    layout: wgpu::PipelineLayout,
    uniforms: UniformLayout,
    block: Vec<u8>,
    components: u32,
}

struct DrawCommand {
    key: PipelineKey,
    buffer: BufferId,
    first: u32,
    count: u32,
    uniform_offset: u32,
}

pub struct WgpuBackend {
    ctx: GpuContext,
    programs: Vec<Option<Program>>,
    buffers: Vec<Option<wgpu::Buffer>>,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
    arena: UniformArena,
    arena_buffer: wgpu::Buffer,
    arena_bind_group: wgpu::BindGroup,
    arena_capacity: u64,
    current: Option<ProgramId>,
    depth_test: bool,
    clear: wgpu::Color,
    draws: Vec<DrawCommand>,
    errors: Arc<Mutex<VecDeque<String>>>,
}

impl WgpuBackend {
    pub async fn new(window: Arc<Window>) -> Result<Self, RenderError> {
        let ctx = GpuContext::new(window).await?;

        let errors = Arc::new(Mutex::new(VecDeque::new()));
        let sink = Arc::clone(&errors);
        ctx.device.on_uncaptured_error(Box::new(move |e| {
            if let Ok(mut queue) = sink.lock() {
                queue.push_back(e.to_string());
            }
        }));

        let arena = UniformArena::new(ctx.device.limits().min_uniform_buffer_offset_alignment);
        let arena_capacity = INITIAL_ARENA_SLOTS * arena.stride() as u64;
        let (arena_buffer, arena_bind_group) = Self::create_arena(&ctx, arena_capacity);

        Ok(Self {
            ctx,
            programs: Vec::new(),
            buffers: Vec::new(),
            pipelines: HashMap::new(),
            arena,
            arena_buffer,
            arena_bind_group,
            arena_capacity,
            current: None,
            depth_test: false,
            clear: wgpu::Color::BLACK,
            draws: Vec::new(),
            errors,
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.ctx.resize(width, height);
    }

    pub fn context(&self) -> &GpuContext {
        &self.ctx
    }

    fn create_arena(ctx: &GpuContext, size: u64) -> (wgpu::Buffer, wgpu::BindGroup) {
        let buffer = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("warp_uniform_arena"),
            size,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("warp_uniform_arena"),
            layout: &ctx.uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: NonZeroU64::new(UNIFORM_SLOT_SIZE),
                }),
            }],
        });
        (buffer, bind_group)
    }

    fn push_error(&self, message: String) {
        if let Ok(mut queue) = self.errors.lock() {
            queue.push_back(message);
        }
    }

    fn write_uniform(&mut self, slot: &UniformSlot, bytes: &[u8]) {
        let Some(program) = self
            .current
            .and_then(|id| self.programs.get_mut(id.0))
            .and_then(Option::as_mut)
        else {
            self.push_error("uniform upload without a bound program".into());
            return;
        };
        let start = slot.offset as usize;
        if bytes.len() > slot.size as usize || start + bytes.len() > program.block.len() {
            let message = format!(
                "uniform write of {} bytes at {} overflows {}",
                bytes.len(),
                start,
                program.label
            );
            self.push_error(message);
            return;
        }
        program.block[start..start + bytes.len()].copy_from_slice(bytes);
    }

    fn ensure_arena_capacity(&mut self) {
        let needed = self.arena.bytes().len() as u64;
        if needed <= self.arena_capacity {
            return;
        }
        let capacity = needed.next_power_of_two();
        log::debug!("growing uniform arena to {} bytes", capacity);
        let (buffer, bind_group) = Self::create_arena(&self.ctx, capacity);
        self.arena_buffer = buffer;
        self.arena_bind_group = bind_group;
        self.arena_capacity = capacity;
    }

    fn submit(&mut self) -> Result<(), String> {
        self.ensure_arena_capacity();
        if !self.arena.bytes().is_empty() {
            self.ctx
                .queue
                .write_buffer(&self.arena_buffer, 0, self.arena.bytes());
        }

        let frame = match self.ctx.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Outdated | wgpu::SurfaceError::Lost) => {
                self.ctx.reconfigure();
                return Err("surface lost; reconfigured".into());
            }
            Err(e) => return Err(e.to_string()),
        };
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("warp_frame"),
            });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("warp_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.ctx.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            for draw in &self.draws {
                let (Some(pipeline), Some(Some(buffer))) =
                    (self.pipelines.get(&draw.key), self.buffers.get(draw.buffer.0))
                else {
                    continue;
                };
                pass.set_pipeline(pipeline);
                pass.set_bind_group(0, &self.arena_bind_group, &[draw.uniform_offset]);
                pass.set_vertex_buffer(0, buffer.slice(..));
                pass.draw(draw.first..draw.first + draw.count, 0..1);
            }
        }

        self.ctx.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(())
    }
}

impl GpuBackend for WgpuBackend {
    type Program = ProgramId;
    type Buffer = BufferId;
    type UniformLocation = UniformSlot;

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            tier: ShaderTier::Wgpu,
            derivatives: true,
        }
    }

    fn compile_program(&mut self, source: &ProgramSource) -> Result<ProgramId, RenderError> {
        let label = source.kind.label();
        let vs = parse_stage(label, ShaderStage::Vertex, source.vertex)?;
        let fs = parse_stage(label, ShaderStage::Fragment, source.fragment)?;

        let mut uniforms = reflect_uniforms(&vs);
        uniforms
            .merge(reflect_uniforms(&fs))
            .map_err(|log| RenderError::Link {
                label: label.to_string(),
                log,
            })?;
        if uniforms.span() as u64 > UNIFORM_SLOT_SIZE {
            return Err(RenderError::Link {
                label: label.to_string(),
                log: format!("uniform block of {} bytes exceeds {}", uniforms.span(), UNIFORM_SLOT_SIZE),
            });
        }

        let device = &self.ctx.device;
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let vertex = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(source.vertex.into()),
        });
        let fragment = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(source.fragment.into()),
        });
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(label),
            bind_group_layouts: &[&self.ctx.uniform_layout],
            push_constant_ranges: &[],
        });
        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(RenderError::Link {
                label: label.to_string(),
                log: err.to_string(),
            });
        }

        let id = ProgramId(self.programs.len());
        self.programs.push(Some(Program {
            label,
            vertex,
            fragment,
            layout,
            block: vec![0; uniforms.span() as usize],
            uniforms,
            components: source.kind.components(),
        }));
        Ok(id)
    }

    fn uniform_location(&self, program: &ProgramId, name: &str) -> Option<UniformSlot> {
        self.programs
            .get(program.0)?
            .as_ref()?
            .uniforms
            .get(name)
    }

    fn delete_program(&mut self, program: ProgramId) {
        if let Some(slot) = self.programs.get_mut(program.0) {
            *slot = None;
        }
        self.pipelines.retain(|key, _| key.program != program.0);
        if self.current == Some(program) {
            self.current = None;
        }
    }

    fn create_vertex_buffer(&mut self, data: &[f32], usage: BufferUsage) -> Result<BufferId, RenderError> {
        if data.is_empty() {
            return Err(RenderError::Buffer("empty vertex buffer".into()));
        }
        let mut usages = wgpu::BufferUsages::VERTEX;
        if usage == BufferUsage::Dynamic {
            usages |= wgpu::BufferUsages::COPY_DST;
        }
        let buffer = self.ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("warp_vertices"),
            size: std::mem::size_of_val(data) as u64,
            usage: usages,
            mapped_at_creation: true,
        });
        buffer
            .slice(..)
            .get_mapped_range_mut()
            .copy_from_slice(bytemuck::cast_slice(data));
        buffer.unmap();

        let id = BufferId(self.buffers.len());
        self.buffers.push(Some(buffer));
        Ok(id)
    }

    fn write_vertex_buffer(&mut self, buffer: &BufferId, offset: usize, data: &[f32]) {
        match self.buffers.get(buffer.0) {
            Some(Some(b)) => {
                let byte_offset = (offset * std::mem::size_of::<f32>()) as u64;
                self.ctx
                    .queue
                    .write_buffer(b, byte_offset, bytemuck::cast_slice(data));
            }
            _ => self.push_error(format!("write to deleted buffer {:?}", buffer)),
        }
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        if let Some(Some(b)) = self.buffers.get_mut(buffer.0).map(Option::take) {
            b.destroy();
        }
    }

    fn begin_frame(&mut self, clear_color: [f32; 4]) {
        let [r, g, b, a] = clear_color;
        self.clear = wgpu::Color {
            r: r as f64,
            g: g as f64,
            b: b as f64,
            a: a as f64,
        };
        self.draws.clear();
        self.arena.clear();
        self.ctx
            .device
            .push_error_scope(wgpu::ErrorFilter::Validation);
    }

    fn end_frame(&mut self) {
        let result = self.submit();
        self.draws.clear();
        self.arena.clear();
        if let Some(err) = pollster::block_on(self.ctx.device.pop_error_scope()) {
            self.push_error(err.to_string());
        }
        if let Err(msg) = result {
            self.push_error(msg);
        }
    }

    fn use_program(&mut self, program: &ProgramId) {
        self.current = Some(*program);
    }

    fn set_f32(&mut self, location: &UniformSlot, value: f32) {
        self.write_uniform(location, bytemuck::bytes_of(&value));
    }

    fn set_vec4(&mut self, location: &UniformSlot, value: [f32; 4]) {
        self.write_uniform(location, bytemuck::cast_slice(&value));
    }

    fn set_mat4(&mut self, location: &UniformSlot, value: &[f32; 16]) {
        self.write_uniform(location, bytemuck::cast_slice(value));
    }

    fn set_depth_test(&mut self, enabled: bool) {
        self.depth_test = enabled;
    }

    fn draw_arrays(
        &mut self,
        buffer: &BufferId,
        components: u32,
        primitive: Primitive,
        first: u32,
        count: u32,
    ) {
        let Some(id) = self.current else {
            self.push_error("draw without a bound program".into());
            return;
        };
        let Some(program) = self.programs.get(id.0).and_then(Option::as_ref) else {
            self.push_error(format!("draw with deleted program {:?}", id));
            return;
        };
        if components != program.components {
            self.push_error(format!(
                "{} expects {} components per vertex, got {}",
                program.label, program.components, components
            ));
            return;
        }

        let key = PipelineKey {
            program: id.0,
            primitive,
            depth_test: self.depth_test,
        };
        if !self.pipelines.contains_key(&key) {
            let pipeline = self.ctx.create_pipeline(
                &key,
                &ProgramModules {
                    label: program.label,
                    vertex: &program.vertex,
                    fragment: &program.fragment,
                    layout: &program.layout,
                    components: program.components,
                },
            );
            self.pipelines.insert(key, pipeline);
        }

        let uniform_offset = self.arena.push(&program.block);
        self.draws.push(DrawCommand {
            key,
            buffer: *buffer,
            first,
            count,
            uniform_offset,
        });
    }

    fn take_error(&mut self) -> Option<String> {
        self.errors.lock().ok()?.pop_front()
    }

    fn drawable_size(&self) -> (u32, u32) {
        (self.ctx.config.width, self.ctx.config.height)
    }
}

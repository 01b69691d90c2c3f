//! The seam between the engine and a concrete graphics API.

use crate::error::RenderError;
use crate::shaders::{ProgramSource, ShaderTier};

/// What the context can compile.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Capabilities {
    pub tier: ShaderTier,
    /// Screen-space derivatives (`fwidth`) are available in fragment shaders.
    pub derivatives: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Primitive {
    Triangles,
    Lines,
}

/// Update frequency hint for a vertex buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BufferUsage {
    Static,
    Dynamic,
}

/// Minimal immediate-mode surface the engine draws through.
///
/// Uniform setters apply to the program last passed to `use_program`.
/// Implementations bind `a_position` to attribute location 0 before linking
/// and delete their shader objects once a program has linked.
pub trait GpuBackend {
    type Program;
    type Buffer;
    type UniformLocation;

    fn capabilities(&self) -> Capabilities;

    /// Compile both stages and link them. Errors carry the driver info log.
    fn compile_program(&mut self, source: &ProgramSource) -> Result<Self::Program, RenderError>;
    fn uniform_location(
        &self,
        program: &Self::Program,
        name: &str,
    ) -> Option<Self::UniformLocation>;
    fn delete_program(&mut self, program: Self::Program);

    fn create_vertex_buffer(
        &mut self,
        data: &[f32],
        usage: BufferUsage,
    ) -> Result<Self::Buffer, RenderError>;
    /// Overwrite `data.len()` floats starting at float `offset`.
    fn write_vertex_buffer(&mut self, buffer: &Self::Buffer, offset: usize, data: &[f32]);
    fn delete_buffer(&mut self, buffer: Self::Buffer);

    /// Clear color and depth.
    fn begin_frame(&mut self, clear_color: [f32; 4]);
    fn end_frame(&mut self);

    fn use_program(&mut self, program: &Self::Program);
    fn set_f32(&mut self, location: &Self::UniformLocation, value: f32);
    fn set_vec4(&mut self, location: &Self::UniformLocation, value: [f32; 4]);
    /// Column-major.
    fn set_mat4(&mut self, location: &Self::UniformLocation, value: &[f32; 16]);

    fn set_depth_test(&mut self, enabled: bool);
    /// Draw `count` vertices starting at vertex `first`, reading
    /// `components` floats per vertex from `buffer`.
    fn draw_arrays(
        &mut self,
        buffer: &Self::Buffer,
        components: u32,
        primitive: Primitive,
        first: u32,
        count: u32,
    );

    /// Pop one pending GPU error, if any.
    fn take_error(&mut self) -> Option<String>;
    fn drawable_size(&self) -> (u32, u32);
}

/// Where the degraded readout goes when no GPU program could be built.
pub trait StatusSurface {
    fn show_status(&mut self, lines: &[String]);
}

/// Status surface that only logs.
#[derive(Debug, Default)]
pub struct LogStatus;

impl StatusSurface for LogStatus {
    fn show_status(&mut self, lines: &[String]) {
        for line in lines {
            log::warn!("{}", line);
        }
    }
}

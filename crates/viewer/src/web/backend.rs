use web_sys::{HtmlCanvasElement, WebGlBuffer, WebGlProgram, WebGlRenderingContext as GL, WebGlShader, WebGlUniformLocation};

use warpfield::shaders::{ProgramSource, POSITION_ATTRIBUTE};
use warpfield::{BufferUsage, Capabilities, GpuBackend, Primitive, RenderError, ShaderStage, ShaderTier};

use super::gl::GlContext;

const OES_STANDARD_DERIVATIVES: &str = "OES_standard_derivatives";
const CONTEXT_LOST_WEBGL: u32 = 0x9242;

/// WebGL2 (GLSL ES 3.00) or WebGL1 (GLSL ES 1.00) on a canvas.
pub struct WebGlBackend {
    gl: GlContext,
    canvas: HtmlCanvasElement,
    derivatives: bool,
}

impl WebGlBackend {
    pub fn new(canvas: HtmlCanvasElement) -> Result<Self, RenderError> {
        let gl = GlContext::from_canvas(&canvas)
            .ok_or_else(|| RenderError::ContextUnavailable("canvas offers neither webgl2 nor webgl".into()))?;
        let derivatives = gl.is_webgl2() || gl.get_extension(OES_STANDARD_DERIVATIVES).is_some();
        log::info!(
            "WebGL{} context, derivatives {}",
            if gl.is_webgl2() { 2 } else { 1 },
            if derivatives { "on" } else { "off" }
        );
        Ok(Self {
            gl,
            canvas,
            derivatives,
        })
    }

    fn build_shader(&self, label: &str, stage: ShaderStage, source: &str) -> Result<WebGlShader, RenderError> {
        let type_ = match stage {
            ShaderStage::Vertex => GL::VERTEX_SHADER,
            ShaderStage::Fragment => GL::FRAGMENT_SHADER,
        };
        let compile_error = |log: String| RenderError::Compile {
            stage,
            label: label.to_string(),
            log,
        };
        let shader = self
            .gl
            .create_shader(type_)
            .ok_or_else(|| compile_error("createShader returned null".into()))?;
        self.gl.shader_source(&shader, source);
        self.gl.compile_shader(&shader);

        if let Some(true) = self.gl.get_shader_parameter(&shader, GL::COMPILE_STATUS).as_bool() {
            Ok(shader)
        } else {
            let log = self.gl.get_shader_info_log(&shader).unwrap_or_default();
            self.gl.delete_shader(Some(&shader));
            Err(compile_error(log))
        }
    }

    fn link(&self, label: &str, vs: &WebGlShader, fs: &WebGlShader) -> Result<WebGlProgram, RenderError> {
        let link_error = |log: String| RenderError::Link {
            label: label.to_string(),
            log,
        };
        let program = self
            .gl
            .create_program()
            .ok_or_else(|| link_error("createProgram returned null".into()))?;
        self.gl.attach_shader(&program, vs);
        self.gl.attach_shader(&program, fs);
        self.gl.bind_attrib_location(&program, 0, POSITION_ATTRIBUTE);
        self.gl.link_program(&program);

        if let Some(true) = self.gl.get_program_parameter(&program, GL::LINK_STATUS).as_bool() {
            self.gl.detach_shader(&program, vs);
            self.gl.detach_shader(&program, fs);
            Ok(program)
        } else {
            let log = self.gl.get_program_info_log(&program).unwrap_or_default();
            self.gl.delete_program(Some(&program));
            Err(link_error(log))
        }
    }

    pub fn canvas(&self) -> &HtmlCanvasElement {
        &self.canvas
    }
}

impl GpuBackend for WebGlBackend {
    type Program = WebGlProgram;
    type Buffer = WebGlBuffer;
    type UniformLocation = WebGlUniformLocation;

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            tier: if self.gl.is_webgl2() {
                ShaderTier::WebGl2
            } else {
                ShaderTier::WebGl1
            },
            derivatives: self.derivatives,
        }
    }

    fn compile_program(&mut self, source: &ProgramSource) -> Result<WebGlProgram, RenderError> {
        let label = source.kind.label();
        let vs = self.build_shader(label, ShaderStage::Vertex, source.vertex)?;
        let fs = match self.build_shader(label, ShaderStage::Fragment, source.fragment) {
            Ok(fs) => fs,
            Err(e) => {
                self.gl.delete_shader(Some(&vs));
                return Err(e);
            }
        };
        let linked = self.link(label, &vs, &fs);
        self.gl.delete_shader(Some(&vs));
        self.gl.delete_shader(Some(&fs));
        linked
    }

    fn uniform_location(&self, program: &WebGlProgram, name: &str) -> Option<WebGlUniformLocation> {
        self.gl.get_uniform_location(program, name)
    }

    fn delete_program(&mut self, program: WebGlProgram) {
        self.gl.delete_program(Some(&program));
    }

    fn create_vertex_buffer(&mut self, data: &[f32], usage: BufferUsage) -> Result<WebGlBuffer, RenderError> {
        let buffer = self
            .gl
            .create_buffer()
            .ok_or_else(|| RenderError::Buffer("createBuffer returned null".into()))?;
        let usage = match usage {
            BufferUsage::Static => GL::STATIC_DRAW,
            BufferUsage::Dynamic => GL::DYNAMIC_DRAW,
        };
        self.gl.bind_array_buffer(Some(&buffer));
        self.gl.array_buffer_data(data, usage);
        self.gl.bind_array_buffer(None);
        Ok(buffer)
    }

    fn write_vertex_buffer(&mut self, buffer: &WebGlBuffer, offset: usize, data: &[f32]) {
        let byte_offset = (offset * std::mem::size_of::<f32>()) as i32;
        self.gl.bind_array_buffer(Some(buffer));
        self.gl.array_buffer_sub_data(byte_offset, data);
        self.gl.bind_array_buffer(None);
    }

    fn delete_buffer(&mut self, buffer: WebGlBuffer) {
        self.gl.delete_buffer(Some(&buffer));
    }

    fn begin_frame(&mut self, clear_color: [f32; 4]) {
        self.gl
            .viewport(self.canvas.width() as i32, self.canvas.height() as i32);
        self.gl.enable(GL::BLEND);
        self.gl.blend_func(GL::SRC_ALPHA, GL::ONE_MINUS_SRC_ALPHA);
        self.gl.clear(clear_color);
    }

    fn end_frame(&mut self) {
        self.gl.bind_array_buffer(None);
        self.gl.use_program(None);
    }

    fn use_program(&mut self, program: &WebGlProgram) {
        self.gl.use_program(Some(program));
    }

    fn set_f32(&mut self, location: &WebGlUniformLocation, value: f32) {
        self.gl.uniform1f(location, value);
    }

    fn set_vec4(&mut self, location: &WebGlUniformLocation, value: [f32; 4]) {
        self.gl.uniform4f(location, value);
    }

    fn set_mat4(&mut self, location: &WebGlUniformLocation, value: &[f32; 16]) {
        self.gl.uniform_matrix4fv(location, value);
    }

    fn set_depth_test(&mut self, enabled: bool) {
        if enabled {
            self.gl.enable(GL::DEPTH_TEST);
            self.gl.depth_func(GL::LESS);
        } else {
            self.gl.disable(GL::DEPTH_TEST);
        }
    }

    fn draw_arrays(&mut self, buffer: &WebGlBuffer, components: u32, primitive: Primitive, first: u32, count: u32) {
        let mode = match primitive {
            Primitive::Triangles => GL::TRIANGLES,
            Primitive::Lines => GL::LINES,
        };
        self.gl.bind_array_buffer(Some(buffer));
        self.gl.vertex_attrib(0, components as i32);
        self.gl.draw_arrays(mode, first as i32, count as i32);
    }

    fn take_error(&mut self) -> Option<String> {
        match self.gl.get_error() {
            GL::NO_ERROR => None,
            CONTEXT_LOST_WEBGL => Some("WebGL context lost".to_string()),
            code => Some(format!("{} (0x{:04x})", gl_error_name(code), code)),
        }
    }

    fn drawable_size(&self) -> (u32, u32) {
        (self.canvas.width(), self.canvas.height())
    }
}

fn gl_error_name(code: u32) -> &'static str {
    match code {
        GL::INVALID_ENUM => "INVALID_ENUM",
        GL::INVALID_VALUE => "INVALID_VALUE",
        GL::INVALID_OPERATION => "INVALID_OPERATION",
        GL::INVALID_FRAMEBUFFER_OPERATION => "INVALID_FRAMEBUFFER_OPERATION",
        GL::OUT_OF_MEMORY => "OUT_OF_MEMORY",
        _ => "GL error",
    }
}

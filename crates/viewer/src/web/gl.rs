//! One handle over WebGL2 and WebGL1 contexts.

use js_sys::{Float32Array, Object};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{
    HtmlCanvasElement, WebGl2RenderingContext, WebGlBuffer, WebGlProgram, WebGlRenderingContext,
    WebGlShader, WebGlUniformLocation,
};

pub enum GlContext {
    Gl2(WebGl2RenderingContext),
    Gl1(WebGlRenderingContext),
}

macro_rules! with_gl {
    ($self:expr, $gl:ident => $body:expr) => {
        match $self {
            GlContext::Gl2($gl) => $body,
            GlContext::Gl1($gl) => $body,
        }
    };
}

impl GlContext {
    /// WebGL2 if the browser offers it, else WebGL1. `None` when the canvas
    /// has no GL context at all.
    pub fn from_canvas(canvas: &HtmlCanvasElement) -> Option<Self> {
        if let Some(gl) = context_as::<WebGl2RenderingContext>(canvas, "webgl2") {
            return Some(GlContext::Gl2(gl));
        }
        ["webgl", "experimental-webgl"]
            .iter()
            .find_map(|name| context_as::<WebGlRenderingContext>(canvas, name))
            .map(GlContext::Gl1)
    }

    pub fn is_webgl2(&self) -> bool {
        matches!(self, GlContext::Gl2(_))
    }

    pub fn get_extension(&self, name: &str) -> Option<Object> {
        with_gl!(self, gl => gl.get_extension(name).ok().flatten())
    }

    pub fn create_shader(&self, type_: u32) -> Option<WebGlShader> {
        with_gl!(self, gl => gl.create_shader(type_))
    }

    pub fn shader_source(&self, shader: &WebGlShader, source: &str) {
        with_gl!(self, gl => gl.shader_source(shader, source))
    }

    pub fn compile_shader(&self, shader: &WebGlShader) {
        with_gl!(self, gl => gl.compile_shader(shader))
    }

    pub fn get_shader_parameter(&self, shader: &WebGlShader, pname: u32) -> JsValue {
        with_gl!(self, gl => gl.get_shader_parameter(shader, pname))
    }

    pub fn get_shader_info_log(&self, shader: &WebGlShader) -> Option<String> {
        with_gl!(self, gl => gl.get_shader_info_log(shader))
    }

    pub fn delete_shader(&self, shader: Option<&WebGlShader>) {
        with_gl!(self, gl => gl.delete_shader(shader))
    }

    pub fn create_program(&self) -> Option<WebGlProgram> {
        with_gl!(self, gl => gl.create_program())
    }

    pub fn attach_shader(&self, program: &WebGlProgram, shader: &WebGlShader) {
        with_gl!(self, gl => gl.attach_shader(program, shader))
    }

    pub fn detach_shader(&self, program: &WebGlProgram, shader: &WebGlShader) {
        with_gl!(self, gl => gl.detach_shader(program, shader))
    }

    pub fn bind_attrib_location(&self, program: &WebGlProgram, index: u32, name: &str) {
        with_gl!(self, gl => gl.bind_attrib_location(program, index, name))
    }

    pub fn link_program(&self, program: &WebGlProgram) {
        with_gl!(self, gl => gl.link_program(program))
    }

    pub fn get_program_parameter(&self, program: &WebGlProgram, pname: u32) -> JsValue {
        with_gl!(self, gl => gl.get_program_parameter(program, pname))
    }

    pub fn get_program_info_log(&self, program: &WebGlProgram) -> Option<String> {
        with_gl!(self, gl => gl.get_program_info_log(program))
    }

    pub fn delete_program(&self, program: Option<&WebGlProgram>) {
        with_gl!(self, gl => gl.delete_program(program))
    }

    pub fn use_program(&self, program: Option<&WebGlProgram>) {
        with_gl!(self, gl => gl.use_program(program))
    }

    pub fn get_uniform_location(&self, program: &WebGlProgram, name: &str) -> Option<WebGlUniformLocation> {
        with_gl!(self, gl => gl.get_uniform_location(program, name))
    }

    pub fn uniform1f(&self, location: &WebGlUniformLocation, x: f32) {
        with_gl!(self, gl => gl.uniform1f(Some(location), x))
    }

    pub fn uniform4f(&self, location: &WebGlUniformLocation, v: [f32; 4]) {
        with_gl!(self, gl => gl.uniform4f(Some(location), v[0], v[1], v[2], v[3]))
    }

    pub fn uniform_matrix4fv(&self, location: &WebGlUniformLocation, m: &[f32; 16]) {
        with_gl!(self, gl => gl.uniform_matrix4fv_with_f32_array(Some(location), false, m))
    }

    pub fn create_buffer(&self) -> Option<WebGlBuffer> {
        with_gl!(self, gl => gl.create_buffer())
    }

    pub fn bind_array_buffer(&self, buffer: Option<&WebGlBuffer>) {
        with_gl!(self, gl => gl.bind_buffer(WebGlRenderingContext::ARRAY_BUFFER, buffer))
    }

    pub fn array_buffer_data(&self, data: &[f32], usage: u32) {
        let view = Float32Array::from(data);
        with_gl!(self, gl => gl.buffer_data_with_array_buffer_view(
            WebGlRenderingContext::ARRAY_BUFFER,
            &view,
            usage,
        ))
    }

    pub fn array_buffer_sub_data(&self, byte_offset: i32, data: &[f32]) {
        let view = Float32Array::from(data);
        with_gl!(self, gl => gl.buffer_sub_data_with_i32_and_array_buffer_view(
            WebGlRenderingContext::ARRAY_BUFFER,
            byte_offset,
            &view,
        ))
    }

    pub fn delete_buffer(&self, buffer: Option<&WebGlBuffer>) {
        with_gl!(self, gl => gl.delete_buffer(buffer))
    }

    pub fn vertex_attrib(&self, index: u32, components: i32) {
        with_gl!(self, gl => {
            gl.enable_vertex_attrib_array(index);
            gl.vertex_attrib_pointer_with_i32(index, components, WebGlRenderingContext::FLOAT, false, 0, 0);
        })
    }

    pub fn draw_arrays(&self, mode: u32, first: i32, count: i32) {
        with_gl!(self, gl => gl.draw_arrays(mode, first, count))
    }

    pub fn enable(&self, cap: u32) {
        with_gl!(self, gl => gl.enable(cap))
    }

    pub fn disable(&self, cap: u32) {
        with_gl!(self, gl => gl.disable(cap))
    }

    pub fn depth_func(&self, func: u32) {
        with_gl!(self, gl => gl.depth_func(func))
    }

    pub fn blend_func(&self, src: u32, dst: u32) {
        with_gl!(self, gl => gl.blend_func(src, dst))
    }

    pub fn viewport(&self, width: i32, height: i32) {
        with_gl!(self, gl => gl.viewport(0, 0, width, height))
    }

    pub fn clear(&self, color: [f32; 4]) {
        with_gl!(self, gl => {
            gl.clear_color(color[0], color[1], color[2], color[3]);
            gl.clear_depth(1.0);
            gl.clear(WebGlRenderingContext::COLOR_BUFFER_BIT | WebGlRenderingContext::DEPTH_BUFFER_BIT);
        })
    }

    pub fn get_error(&self) -> u32 {
        with_gl!(self, gl => gl.get_error())
    }
}

fn context_as<T: JsCast>(canvas: &HtmlCanvasElement, name: &str) -> Option<T> {
    canvas
        .get_context(name)
        .ok()
        .flatten()
        .and_then(|ctx| ctx.dyn_into::<T>().ok())
}

//! In-memory backend that records every call, for tests without a GPU.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use crate::backend::{BufferUsage, Capabilities, GpuBackend, Primitive, StatusSurface};
use crate::error::{RenderError, ShaderStage};
use crate::shaders::{ProgramKind, ProgramSource, ShaderTier};

#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    CompileProgram(ProgramKind),
    DeleteProgram(u32),
    CreateBuffer { id: u32, len: usize, usage: BufferUsage },
    WriteBuffer { id: u32, offset: usize, len: usize },
    DeleteBuffer(u32),
    BeginFrame([f32; 4]),
    EndFrame,
    UseProgram(ProgramKind),
    SetF32(String, f32),
    SetVec4(String, [f32; 4]),
    SetMat4(String, [f32; 16]),
    DepthTest(bool),
    Draw {
        buffer: u32,
        components: u32,
        primitive: Primitive,
        first: u32,
        count: u32,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecordedProgram {
    pub id: u32,
    pub kind: ProgramKind,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecordedBuffer {
    pub id: u32,
}

/// Shared call log. Outlives the backend so tests can inspect it after the
/// engine has been destroyed.
#[derive(Debug, Default)]
pub struct Recorder {
    calls: Vec<Call>,
    live_programs: HashMap<u32, ProgramKind>,
    buffers: HashMap<u32, Vec<f32>>,
    next_id: u32,
    pending_errors: VecDeque<String>,
}

impl Recorder {
    pub fn calls(&self) -> &[Call] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    pub fn live_programs(&self) -> usize {
        self.live_programs.len()
    }

    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    /// Current contents of a live buffer.
    pub fn buffer(&self, id: u32) -> Option<&[f32]> {
        self.buffers.get(&id).map(Vec::as_slice)
    }

    /// Last value uploaded to a float uniform.
    pub fn last_f32(&self, name: &str) -> Option<f32> {
        self.calls.iter().rev().find_map(|c| match c {
            Call::SetF32(n, v) if n == name => Some(*v),
            _ => None,
        })
    }

    /// `(offset, len)` of every vertex buffer write, in order.
    pub fn vertex_writes(&self) -> Vec<(usize, usize)> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::WriteBuffer { offset, len, .. } => Some((*offset, *len)),
                _ => None,
            })
            .collect()
    }

    pub fn pending_errors(&self) -> usize {
        self.pending_errors.len()
    }

    pub fn push_error(&mut self, message: impl Into<String>) {
        self.pending_errors.push_back(message.into());
    }

    fn next_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }
}

pub type SharedRecorder = Rc<RefCell<Recorder>>;

pub struct RecordingBackend {
    caps: Capabilities,
    size: (u32, u32),
    fail_compile: Option<ProgramKind>,
    current: Option<ProgramKind>,
    recorder: SharedRecorder,
}

impl RecordingBackend {
    pub fn new(tier: ShaderTier, derivatives: bool) -> Self {
        Self {
            caps: Capabilities { tier, derivatives },
            size: (800, 600),
            fail_compile: None,
            current: None,
            recorder: Rc::default(),
        }
    }

    pub fn webgl1() -> Self {
        Self::new(ShaderTier::WebGl1, false)
    }

    pub fn webgl2() -> Self {
        Self::new(ShaderTier::WebGl2, true)
    }

    /// Make compilation of `kind` fail with a fake driver log.
    pub fn failing_compile(mut self, kind: ProgramKind) -> Self {
        self.fail_compile = Some(kind);
        self
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.size = (width, height);
        self
    }

    pub fn recorder(&self) -> SharedRecorder {
        Rc::clone(&self.recorder)
    }

    pub fn calls(&self) -> Vec<Call> {
        self.recorder.borrow().calls().to_vec()
    }

    pub fn clear_calls(&mut self) {
        self.recorder.borrow_mut().clear_calls();
    }

    pub fn vertex_writes(&self) -> Vec<(usize, usize)> {
        self.recorder.borrow().vertex_writes()
    }

    fn record(&self, call: Call) {
        self.recorder.borrow_mut().calls.push(call);
    }
}

impl GpuBackend for RecordingBackend {
    type Program = RecordedProgram;
    type Buffer = RecordedBuffer;
    type UniformLocation = String;

    fn capabilities(&self) -> Capabilities {
        self.caps
    }

    fn compile_program(&mut self, source: &ProgramSource) -> Result<RecordedProgram, RenderError> {
        self.record(Call::CompileProgram(source.kind));
        if self.fail_compile == Some(source.kind) {
            return Err(RenderError::Compile {
                stage: ShaderStage::Fragment,
                label: source.kind.label().to_string(),
                log: "ERROR: 0:1: recording backend refused to compile".to_string(),
            });
        }
        let mut rec = self.recorder.borrow_mut();
        let id = rec.next_id();
        rec.live_programs.insert(id, source.kind);
        Ok(RecordedProgram {
            id,
            kind: source.kind,
        })
    }

    fn uniform_location(&self, program: &RecordedProgram, name: &str) -> Option<String> {
        program
            .kind
            .uniform_names()
            .contains(&name)
            .then(|| name.to_string())
    }

    fn delete_program(&mut self, program: RecordedProgram) {
        self.record(Call::DeleteProgram(program.id));
        self.recorder.borrow_mut().live_programs.remove(&program.id);
    }

    fn create_vertex_buffer(
        &mut self,
        data: &[f32],
        usage: BufferUsage,
    ) -> Result<RecordedBuffer, RenderError> {
        let mut rec = self.recorder.borrow_mut();
        let id = rec.next_id();
        rec.buffers.insert(id, data.to_vec());
        rec.calls.push(Call::CreateBuffer {
            id,
            len: data.len(),
            usage,
        });
        Ok(RecordedBuffer { id })
    }

    fn write_vertex_buffer(&mut self, buffer: &RecordedBuffer, offset: usize, data: &[f32]) {
        let mut guard = self.recorder.borrow_mut();
        let rec = &mut *guard;
        rec.calls.push(Call::WriteBuffer {
            id: buffer.id,
            offset,
            len: data.len(),
        });
        match rec.buffers.get_mut(&buffer.id) {
            Some(contents) if offset + data.len() <= contents.len() => {
                contents[offset..offset + data.len()].copy_from_slice(data);
            }
            _ => rec
                .pending_errors
                .push_back(format!("INVALID_VALUE: write past end of buffer {}", buffer.id)),
        }
    }

    fn delete_buffer(&mut self, buffer: RecordedBuffer) {
        let mut rec = self.recorder.borrow_mut();
        rec.calls.push(Call::DeleteBuffer(buffer.id));
        rec.buffers.remove(&buffer.id);
    }

    fn begin_frame(&mut self, clear_color: [f32; 4]) {
        self.record(Call::BeginFrame(clear_color));
    }

    fn end_frame(&mut self) {
        self.record(Call::EndFrame);
    }

    fn use_program(&mut self, program: &RecordedProgram) {
        self.current = Some(program.kind);
        self.record(Call::UseProgram(program.kind));
    }

    fn set_f32(&mut self, location: &String, value: f32) {
        self.record(Call::SetF32(location.clone(), value));
    }

    fn set_vec4(&mut self, location: &String, value: [f32; 4]) {
        self.record(Call::SetVec4(location.clone(), value));
    }

    fn set_mat4(&mut self, location: &String, value: &[f32; 16]) {
        self.record(Call::SetMat4(location.clone(), *value));
    }

    fn set_depth_test(&mut self, enabled: bool) {
        self.record(Call::DepthTest(enabled));
    }

    fn draw_arrays(
        &mut self,
        buffer: &RecordedBuffer,
        components: u32,
        primitive: Primitive,
        first: u32,
        count: u32,
    ) {
        if self.current.is_none() {
            self.recorder
                .borrow_mut()
                .push_error("INVALID_OPERATION: draw without a program");
        }
        self.record(Call::Draw {
            buffer: buffer.id,
            components,
            primitive,
            first,
            count,
        });
    }

    fn take_error(&mut self) -> Option<String> {
        self.recorder.borrow_mut().pending_errors.pop_front()
    }

    fn drawable_size(&self) -> (u32, u32) {
        self.size
    }
}

/// Status surface that keeps what it was asked to show.
#[derive(Clone, Debug, Default)]
pub struct RecordingStatus {
    shown: Rc<RefCell<Vec<String>>>,
}

impl RecordingStatus {
    pub fn lines(&self) -> Vec<String> {
        self.shown.borrow().clone()
    }
}

impl StatusSurface for RecordingStatus {
    fn show_status(&mut self, lines: &[String]) {
        *self.shown.borrow_mut() = lines.to_vec();
    }
}

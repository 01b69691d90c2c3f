use std::collections::HashMap;

use crate::backend::GpuBackend;
use crate::error::RenderError;
use crate::shaders::{ProgramKind, ProgramSource};

/// A linked program plus the locations of its uniforms.
///
/// Locations are looked up once at link time. Names the driver optimized
/// away are simply absent and their uploads are skipped.
pub struct ShaderProgram<B: GpuBackend> {
    kind: ProgramKind,
    handle: B::Program,
    locations: HashMap<&'static str, B::UniformLocation>,
}

impl<B: GpuBackend> ShaderProgram<B> {
    pub fn link(backend: &mut B, source: &ProgramSource) -> Result<Self, RenderError> {
        let handle = backend.compile_program(source)?;
        let mut locations = HashMap::new();
        for &name in source.kind.uniform_names() {
            match backend.uniform_location(&handle, name) {
                Some(loc) => {
                    locations.insert(name, loc);
                }
                None => log::debug!("{}: uniform {} is inactive", source.kind.label(), name),
            }
        }
        log::info!(
            "linked {} program ({}/{} uniforms active)",
            source.kind.label(),
            locations.len(),
            source.kind.uniform_names().len()
        );
        Ok(Self {
            kind: source.kind,
            handle,
            locations,
        })
    }

    pub fn kind(&self) -> ProgramKind {
        self.kind
    }

    pub fn handle(&self) -> &B::Program {
        &self.handle
    }

    pub fn location(&self, name: &str) -> Option<&B::UniformLocation> {
        self.locations.get(name)
    }

    pub fn active_uniforms(&self) -> usize {
        self.locations.len()
    }

    pub fn set_f32(&self, backend: &mut B, name: &str, value: f32) {
        if let Some(loc) = self.locations.get(name) {
            backend.set_f32(loc, value);
        }
    }

    pub fn set_vec4(&self, backend: &mut B, name: &str, value: [f32; 4]) {
        if let Some(loc) = self.locations.get(name) {
            backend.set_vec4(loc, value);
        }
    }

    pub fn set_mat4(&self, backend: &mut B, name: &str, value: &[f32; 16]) {
        if let Some(loc) = self.locations.get(name) {
            backend.set_mat4(loc, value);
        }
    }

    pub fn release(self, backend: &mut B) {
        backend.delete_program(self.handle);
    }
}

//! Uniform block layout reflected from WGSL with naga.
//!
//! The engine addresses uniforms by name. On the wgpu path a name resolves to
//! a byte range inside the program's single uniform block.

use std::collections::HashMap;

use warpfield::{RenderError, ShaderStage};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UniformSlot {
    pub offset: u32,
    /// Bytes up to the next member (or the end of the block).
    pub size: u32,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct UniformLayout {
    members: HashMap<String, UniformSlot>,
    span: u32,
}

impl UniformLayout {
    pub fn get(&self, name: &str) -> Option<UniformSlot> {
        self.members.get(name).copied()
    }

    /// Size of the whole block in bytes.
    pub fn span(&self) -> u32 {
        self.span
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Fold in the block seen by another stage. Both stages must agree on
    /// every member they share.
    pub fn merge(&mut self, other: UniformLayout) -> Result<(), String> {
        for (name, slot) in other.members {
            match self.members.get(&name) {
                Some(existing) if *existing != slot => {
                    return Err(format!(
                        "uniform {} is at {:?} in one stage and {:?} in the other",
                        name, existing, slot
                    ));
                }
                _ => {
                    self.members.insert(name, slot);
                }
            }
        }
        self.span = self.span.max(other.span);
        Ok(())
    }
}

/// Parse and validate one stage, mapping failures to compile errors with the
/// diagnostic text as the info log.
pub fn parse_stage(label: &str, stage: ShaderStage, source: &str) -> Result<naga::Module, RenderError> {
    let module = naga::front::wgsl::parse_str(source).map_err(|e| RenderError::Compile {
        stage,
        label: label.to_string(),
        log: e.emit_to_string(source),
    })?;

    let mut validator = naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::empty(),
    );
    validator.validate(&module).map_err(|e| RenderError::Compile {
        stage,
        label: label.to_string(),
        log: format!("{:?}", e),
    })?;
    Ok(module)
}

/// Layout of the uniform-address-space struct declared by `module`.
pub fn reflect_uniforms(module: &naga::Module) -> UniformLayout {
    let mut layout = UniformLayout::default();
    for (_, var) in module.global_variables.iter() {
        if var.space != naga::AddressSpace::Uniform {
            continue;
        }
        let naga::TypeInner::Struct { members, span } = &module.types[var.ty].inner else {
            continue;
        };
        for (i, member) in members.iter().enumerate() {
            let end = members.get(i + 1).map_or(*span, |next| next.offset);
            if let Some(name) = &member.name {
                layout.members.insert(
                    name.clone(),
                    UniformSlot {
                        offset: member.offset,
                        size: end - member.offset,
                    },
                );
            }
        }
        layout.span = layout.span.max(*span);
    }
    layout
}

#[cfg(test)]
mod tests {
    use super::*;
    use warpfield::{select_shader_source, ShaderTier};

    #[test]
    fn test_field_block_layout() {
        let set = select_shader_source(ShaderTier::Wgpu, false);
        let module = parse_stage("field", ShaderStage::Fragment, set.field.fragment).unwrap();
        let layout = reflect_uniforms(&module);

        assert_eq!(layout.get("u_viewProj"), Some(UniformSlot { offset: 0, size: 64 }));
        assert_eq!(layout.get("u_time"), Some(UniformSlot { offset: 64, size: 4 }));
        assert_eq!(layout.get("u_energyViolation").map(|s| s.offset), Some(116));
        assert_eq!(layout.span(), 128);
        assert_eq!(layout.len(), warpfield::shaders::FIELD_UNIFORMS.len());
    }

    #[test]
    fn test_grid_stages_agree() {
        let set = select_shader_source(ShaderTier::Wgpu, false);
        let vs = parse_stage("grid", ShaderStage::Vertex, set.grid.vertex).unwrap();
        let fs = parse_stage("grid", ShaderStage::Fragment, set.grid.fragment).unwrap();
        let mut layout = reflect_uniforms(&vs);
        layout.merge(reflect_uniforms(&fs)).unwrap();

        assert_eq!(layout.get("u_mvp"), Some(UniformSlot { offset: 0, size: 64 }));
        assert_eq!(layout.get("u_color"), Some(UniformSlot { offset: 64, size: 16 }));
        assert_eq!(layout.span(), 80);
    }

    #[test]
    fn test_field_vertex_stage_has_no_block() {
        let set = select_shader_source(ShaderTier::Wgpu, true);
        let vs = parse_stage("field", ShaderStage::Vertex, set.field.vertex).unwrap();
        assert!(reflect_uniforms(&vs).is_empty());
    }

    #[test]
    fn test_parse_error_is_a_compile_error() {
        let err = parse_stage("broken", ShaderStage::Fragment, "fn fs_main( -> {").unwrap_err();
        match err {
            RenderError::Compile { stage, label, log } => {
                assert_eq!(stage, ShaderStage::Fragment);
                assert_eq!(label, "broken");
                assert!(!log.is_empty());
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}

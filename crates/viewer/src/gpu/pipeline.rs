use wgpu::*;

use warpfield::Primitive;

/// Everything that selects a distinct render pipeline for a draw.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PipelineKey {
    pub program: usize,
    pub primitive: Primitive,
    pub depth_test: bool,
}

impl PipelineKey {
    fn topology(&self) -> PrimitiveTopology {
        match self.primitive {
            Primitive::Triangles => PrimitiveTopology::TriangleList,
            Primitive::Lines => PrimitiveTopology::LineList,
        }
    }

    fn depth_compare(&self) -> CompareFunction {
        if self.depth_test {
            CompareFunction::Less
        } else {
            CompareFunction::Always
        }
    }

    fn depth_write_enabled(&self) -> bool {
        self.depth_test
    }
}

pub fn vertex_format(components: u32) -> VertexFormat {
    match components {
        1 => VertexFormat::Float32,
        2 => VertexFormat::Float32x2,
        3 => VertexFormat::Float32x3,
        _ => VertexFormat::Float32x4,
    }
}

/// Shader modules and layout of one linked program.
pub struct ProgramModules<'a> {
    pub label: &'a str,
    pub vertex: &'a ShaderModule,
    pub fragment: &'a ShaderModule,
    pub layout: &'a PipelineLayout,
    pub components: u32,
}

impl super::context::GpuContext {
    pub fn create_pipeline(&self, key: &PipelineKey, program: &ProgramModules) -> RenderPipeline {
        let attributes = [VertexAttribute {
            offset: 0,
            shader_location: 0,
            format: vertex_format(program.components),
        }];
        let vertex_layout = VertexBufferLayout {
            array_stride: (program.components as usize * std::mem::size_of::<f32>())
                as BufferAddress,
            step_mode: VertexStepMode::Vertex,
            attributes: &attributes,
        };

        let target = Some(ColorTargetState {
            format: self.config.format,
            blend: Some(BlendState::ALPHA_BLENDING),
            write_mask: ColorWrites::ALL,
        });

        let depth_stencil = Some(DepthStencilState {
            format: self.depth_format(),
            depth_compare: key.depth_compare(),
            depth_write_enabled: key.depth_write_enabled(),
            stencil: StencilState::default(),
            bias: DepthBiasState::default(),
        });

        self.device.create_render_pipeline(&RenderPipelineDescriptor {
            label: Some(program.label),
            layout: Some(program.layout),
            cache: None,
            vertex: VertexState {
                module: program.vertex,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[vertex_layout],
            },
            primitive: PrimitiveState {
                topology: key.topology(),
                strip_index_format: None,
                front_face: FrontFace::Ccw,
                cull_mode: None,
                unclipped_depth: false,
                polygon_mode: PolygonMode::Fill,
                conservative: false,
            },
            depth_stencil,
            multisample: MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            fragment: Some(FragmentState {
                module: program.fragment,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[target],
            }),
            multiview: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(primitive: Primitive, depth_test: bool) -> PipelineKey {
        PipelineKey {
            program: 0,
            primitive,
            depth_test,
        }
    }

    #[test]
    fn test_pipeline_key_topology() {
        assert_eq!(key(Primitive::Triangles, false).topology(), PrimitiveTopology::TriangleList);
        assert_eq!(key(Primitive::Lines, true).topology(), PrimitiveTopology::LineList);
    }

    #[test]
    fn test_pipeline_key_depth() {
        assert_eq!(key(Primitive::Lines, true).depth_compare(), CompareFunction::Less);
        assert!(key(Primitive::Lines, true).depth_write_enabled());
        assert_eq!(key(Primitive::Triangles, false).depth_compare(), CompareFunction::Always);
        assert!(!key(Primitive::Triangles, false).depth_write_enabled());
    }

    #[test]
    fn test_vertex_format() {
        assert_eq!(vertex_format(2), VertexFormat::Float32x2);
        assert_eq!(vertex_format(3), VertexFormat::Float32x3);
    }
}

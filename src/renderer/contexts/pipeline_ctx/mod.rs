use std::path::PathBuf;
use ash::vk;
use color_eyre::Result;

/// What a graphics pipeline bound during a subpass needs. Compiling shaders
/// and creating the pipeline object is left to a [`PipelineFactory`].
#[derive(Debug, Clone, Default)]
pub struct GraphicsPipelineDescriptor {
    pub name: String,
    pub shaders: Vec<(vk::ShaderStageFlags, PathBuf)>,
    pub vertex_bindings: Vec<vk::VertexInputBindingDescription>,
    pub vertex_attributes: Vec<vk::VertexInputAttributeDescription>,
    pub topology: vk::PrimitiveTopology,
    pub depth_test: bool,
    pub alpha_blend: bool,
}

impl GraphicsPipelineDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            topology: vk::PrimitiveTopology::TRIANGLE_LIST,
            ..Default::default()
        }
    }

    pub fn shader(mut self, stage: vk::ShaderStageFlags, path: impl Into<PathBuf>) -> Self {
        self.shaders.push((stage, path.into()));
        self
    }

    pub fn depth_test(mut self, enabled: bool) -> Self {
        self.depth_test = enabled;
        self
    }

    pub fn alpha_blend(mut self, enabled: bool) -> Self {
        self.alpha_blend = enabled;
        self
    }
}

/// Responsibilities:
/// - Build a pipeline for a subpass once the render pass handle exists
pub trait PipelineFactory {
    fn build(
        &mut self,
        descriptor: &GraphicsPipelineDescriptor,
        render_pass: vk::RenderPass,
        subpass: u32,
    ) -> Result<vk::Pipeline>;
}

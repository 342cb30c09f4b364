use ash::vk;

/// Contains configuration options for pass building like the sample count
/// of render targets and how subpass dependencies are scoped
#[derive(Debug, Clone, Copy)]
pub struct RenderConfig {
    pub sample_count: vk::SampleCountFlags,
    /// Scope subpass-to-subpass dependencies to the same framebuffer region.
    pub by_region_dependencies: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            sample_count: vk::SampleCountFlags::TYPE_1,
            by_region_dependencies: true,
        }
    }
}

impl RenderConfig {
    pub fn is_multisampled(&self) -> bool {
        self.sample_count != vk::SampleCountFlags::TYPE_1
    }
}

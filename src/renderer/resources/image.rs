use ash::vk;

use crate::renderer::error::{PassError, PassResult};

/// Backing of an attachment: one image used every frame, or a rotating set
/// such as swapchain images.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageBacking {
    Single(vk::Image),
    Multiple(Vec<vk::Image>),
}

/// An image a pass reads or writes. The pass never owns the `vk::Image`;
/// whoever allocated it destroys it.
#[derive(Debug, Clone)]
pub struct AttachmentImage {
    pub name: String,
    pub format: vk::Format,
    pub samples: vk::SampleCountFlags,
    pub extent: vk::Extent2D,
    pub layers: u32,
    pub mip_levels: u32,
    pub backing: ImageBacking,
}

impl AttachmentImage {
    pub fn single(
        name: impl Into<String>,
        image: vk::Image,
        format: vk::Format,
        extent: vk::Extent2D,
    ) -> Self {
        Self {
            name: name.into(),
            format,
            samples: vk::SampleCountFlags::TYPE_1,
            extent,
            layers: 1,
            mip_levels: 1,
            backing: ImageBacking::Single(image),
        }
    }

    pub fn multiple(
        name: impl Into<String>,
        images: Vec<vk::Image>,
        format: vk::Format,
        extent: vk::Extent2D,
    ) -> Self {
        Self {
            name: name.into(),
            format,
            samples: vk::SampleCountFlags::TYPE_1,
            extent,
            layers: 1,
            mip_levels: 1,
            backing: ImageBacking::Multiple(images),
        }
    }

    pub fn with_samples(mut self, samples: vk::SampleCountFlags) -> Self {
        self.samples = samples;
        self
    }

    pub fn is_multisampled(&self) -> bool {
        self.samples != vk::SampleCountFlags::TYPE_1
    }

    pub fn aspect(&self) -> vk::ImageAspectFlags {
        match self.format {
            vk::Format::D16_UNORM | vk::Format::D32_SFLOAT | vk::Format::X8_D24_UNORM_PACK32 => {
                vk::ImageAspectFlags::DEPTH
            }
            vk::Format::S8_UINT => vk::ImageAspectFlags::STENCIL,
            vk::Format::D16_UNORM_S8_UINT
            | vk::Format::D24_UNORM_S8_UINT
            | vk::Format::D32_SFLOAT_S8_UINT => {
                vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
            }
            _ => vk::ImageAspectFlags::COLOR,
        }
    }

    pub fn is_depth_stencil(&self) -> bool {
        !self.aspect().contains(vk::ImageAspectFlags::COLOR)
    }

    pub fn image_count(&self) -> usize {
        match &self.backing {
            ImageBacking::Single(_) => 1,
            ImageBacking::Multiple(images) => images.len(),
        }
    }

    /// Image at `index` of a multiple backing. A single backing returns its
    /// one image for every index.
    pub fn image(&self, index: usize) -> PassResult<vk::Image> {
        match &self.backing {
            ImageBacking::Single(image) => Ok(*image),
            ImageBacking::Multiple(images) => {
                images
                    .get(index)
                    .copied()
                    .ok_or_else(|| PassError::FramebufferIndexOutOfRange {
                        name: self.name.clone(),
                        index,
                        count: images.len(),
                    })
            }
        }
    }

    pub fn images(&self) -> &[vk::Image] {
        match &self.backing {
            ImageBacking::Single(image) => std::slice::from_ref(image),
            ImageBacking::Multiple(images) => images,
        }
    }

    pub fn subresource_range(&self) -> vk::ImageSubresourceRange {
        vk::ImageSubresourceRange {
            aspect_mask: self.aspect(),
            base_mip_level: 0,
            level_count: self.mip_levels,
            base_array_layer: 0,
            layer_count: self.layers,
        }
    }

    pub fn view_create_info(&self, image: vk::Image) -> vk::ImageViewCreateInfo<'static> {
        let view_type = if self.layers > 1 {
            vk::ImageViewType::TYPE_2D_ARRAY
        } else {
            vk::ImageViewType::TYPE_2D
        };
        vk::ImageViewCreateInfo::default()
            .view_type(view_type)
            .image(image)
            .format(self.format)
            .subresource_range(self.subresource_range())
    }
}

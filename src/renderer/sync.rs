//! Maps declared usages to the access masks, pipeline stages, layouts and
//! queue ownership a barrier needs.

use ash::vk;
use std::fmt::Debug;

use crate::renderer::contexts::device_ctx::queue::{QueueClass, QueueFamilyIndices};
use crate::renderer::usage::{
    AccessLocation, AccessMode, BufferCategory, BufferUsage, ImageCategory, ImageUsage,
};

/// Synchronization facts every usage kind can report.
pub trait Synchronize: Copy + PartialEq + Debug {
    fn access_mode(&self) -> AccessMode;
    fn access_flags(&self) -> vk::AccessFlags;
    fn pipeline_stages(&self) -> vk::PipelineStageFlags;
    /// `None` when the owning queue is inferred from neighbouring usages or
    /// the usage has no queue affinity.
    fn queue_class(&self) -> Option<QueueClass>;
}

fn read_write_flags(
    mode: AccessMode,
    read: vk::AccessFlags,
    write: vk::AccessFlags,
) -> vk::AccessFlags {
    let mut flags = vk::AccessFlags::empty();
    if mode.reads() {
        flags |= read;
    }
    if mode.writes() {
        flags |= write;
    }
    flags
}

impl Synchronize for ImageUsage {
    fn access_mode(&self) -> AccessMode {
        ImageUsage::access_mode(self)
    }

    fn access_flags(&self) -> vk::AccessFlags {
        let mode = ImageUsage::access_mode(self);
        match self.category() {
            ImageCategory::NoUsage | ImageCategory::Presentation => vk::AccessFlags::empty(),
            ImageCategory::RenderTarget | ImageCategory::MultisampleResolveTarget => {
                read_write_flags(
                    mode,
                    vk::AccessFlags::COLOR_ATTACHMENT_READ,
                    vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
                )
            }
            ImageCategory::DepthStencil => read_write_flags(
                mode,
                vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ,
                vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
            ),
            ImageCategory::LinearAccess | ImageCategory::Sampled => {
                if self.access_location() == AccessLocation::Host {
                    read_write_flags(
                        mode,
                        vk::AccessFlags::HOST_READ,
                        vk::AccessFlags::HOST_WRITE,
                    )
                } else {
                    read_write_flags(
                        mode,
                        vk::AccessFlags::SHADER_READ,
                        vk::AccessFlags::SHADER_WRITE,
                    )
                }
            }
            ImageCategory::InputAttachment => vk::AccessFlags::INPUT_ATTACHMENT_READ,
            ImageCategory::Transfer => read_write_flags(
                mode,
                vk::AccessFlags::TRANSFER_READ,
                vk::AccessFlags::TRANSFER_WRITE,
            ),
        }
    }

    fn pipeline_stages(&self) -> vk::PipelineStageFlags {
        match self.category() {
            ImageCategory::NoUsage => vk::PipelineStageFlags::TOP_OF_PIPE,
            ImageCategory::RenderTarget
            | ImageCategory::MultisampleResolveTarget
            | ImageCategory::Presentation => vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
            ImageCategory::DepthStencil => {
                vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS
                    | vk::PipelineStageFlags::LATE_FRAGMENT_TESTS
            }
            ImageCategory::LinearAccess
            | ImageCategory::InputAttachment
            | ImageCategory::Sampled => match self.access_location() {
                AccessLocation::Host => vk::PipelineStageFlags::HOST,
                AccessLocation::FragmentStage => vk::PipelineStageFlags::FRAGMENT_SHADER,
                AccessLocation::ComputeStage => vk::PipelineStageFlags::COMPUTE_SHADER,
                other => unreachable!(
                    "{} usage constructed with access location {:?}",
                    self.category().name(),
                    other,
                ),
            },
            ImageCategory::Transfer => vk::PipelineStageFlags::TRANSFER,
        }
    }

    fn queue_class(&self) -> Option<QueueClass> {
        match self.category() {
            ImageCategory::NoUsage | ImageCategory::Presentation | ImageCategory::Transfer => None,
            ImageCategory::RenderTarget
            | ImageCategory::DepthStencil
            | ImageCategory::MultisampleResolveTarget => Some(QueueClass::Graphics),
            ImageCategory::LinearAccess
            | ImageCategory::InputAttachment
            | ImageCategory::Sampled => match self.access_location() {
                AccessLocation::Host => None,
                AccessLocation::FragmentStage => Some(QueueClass::Graphics),
                AccessLocation::ComputeStage => Some(QueueClass::Compute),
                other => unreachable!(
                    "{} usage constructed with access location {:?}",
                    self.category().name(),
                    other,
                ),
            },
        }
    }
}

impl Synchronize for BufferUsage {
    fn access_mode(&self) -> AccessMode {
        BufferUsage::access_mode(self)
    }

    fn access_flags(&self) -> vk::AccessFlags {
        match self.category() {
            BufferCategory::NoUsage => vk::AccessFlags::empty(),
            BufferCategory::VertexOnly => vk::AccessFlags::VERTEX_ATTRIBUTE_READ,
            BufferCategory::IndexOnly => vk::AccessFlags::INDEX_READ,
            BufferCategory::IndexAndVertex => {
                vk::AccessFlags::INDEX_READ | vk::AccessFlags::VERTEX_ATTRIBUTE_READ
            }
            BufferCategory::Uniform => vk::AccessFlags::UNIFORM_READ,
            BufferCategory::Transfer => read_write_flags(
                BufferUsage::access_mode(self),
                vk::AccessFlags::TRANSFER_READ,
                vk::AccessFlags::TRANSFER_WRITE,
            ),
        }
    }

    fn pipeline_stages(&self) -> vk::PipelineStageFlags {
        match self.category() {
            BufferCategory::NoUsage => vk::PipelineStageFlags::TOP_OF_PIPE,
            BufferCategory::VertexOnly
            | BufferCategory::IndexOnly
            | BufferCategory::IndexAndVertex => vk::PipelineStageFlags::VERTEX_INPUT,
            BufferCategory::Uniform => match self.access_location() {
                AccessLocation::VertexStage => vk::PipelineStageFlags::VERTEX_SHADER,
                AccessLocation::FragmentStage => vk::PipelineStageFlags::FRAGMENT_SHADER,
                AccessLocation::ComputeStage => vk::PipelineStageFlags::COMPUTE_SHADER,
                other => unreachable!("Uniform usage constructed with access location {:?}", other),
            },
            BufferCategory::Transfer => vk::PipelineStageFlags::TRANSFER,
        }
    }

    fn queue_class(&self) -> Option<QueueClass> {
        match self.category() {
            BufferCategory::NoUsage | BufferCategory::Transfer => None,
            BufferCategory::VertexOnly
            | BufferCategory::IndexOnly
            | BufferCategory::IndexAndVertex => Some(QueueClass::Graphics),
            BufferCategory::Uniform => match self.access_location() {
                AccessLocation::ComputeStage => Some(QueueClass::Compute),
                _ => Some(QueueClass::Graphics),
            },
        }
    }
}

pub fn access_rights_of(usage: &impl Synchronize) -> vk::AccessFlags {
    usage.access_flags()
}

pub fn pipeline_stages_of(usage: &impl Synchronize) -> vk::PipelineStageFlags {
    usage.pipeline_stages()
}

pub fn image_layout_of(usage: &ImageUsage) -> vk::ImageLayout {
    match usage.category() {
        ImageCategory::NoUsage => vk::ImageLayout::UNDEFINED,
        ImageCategory::RenderTarget | ImageCategory::MultisampleResolveTarget => {
            vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL
        }
        ImageCategory::DepthStencil => vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
        ImageCategory::Presentation => vk::ImageLayout::PRESENT_SRC_KHR,
        ImageCategory::LinearAccess => vk::ImageLayout::GENERAL,
        ImageCategory::InputAttachment | ImageCategory::Sampled => {
            vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL
        }
        ImageCategory::Transfer => match usage.access_mode() {
            AccessMode::ReadOnly => vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
            AccessMode::WriteOnly => vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            other => unreachable!("Transfer usage constructed with access mode {:?}", other),
        },
    }
}

pub fn owning_queue_family(
    queues: &QueueFamilyIndices,
    usage: &impl Synchronize,
) -> Option<u32> {
    usage.queue_class().map(|class| queues.index_of(class))
}

/// Only read-after-read of an identical usage can skip the barrier.
pub fn needs_synchronization<U: Synchronize>(prev: &U, curr: &U) -> bool {
    !(prev == curr && curr.access_mode() == AccessMode::ReadOnly)
}

/// Source and destination queue families for an ownership transfer between
/// two usages, or `QUEUE_FAMILY_IGNORED` for both when no transfer is needed.
pub fn queue_family_transfer(
    queues: &QueueFamilyIndices,
    prev: &impl Synchronize,
    curr: &impl Synchronize,
) -> (u32, u32) {
    match (owning_queue_family(queues, prev), owning_queue_family(queues, curr)) {
        (Some(src), Some(dst)) if src != dst => (src, dst),
        _ => (vk::QUEUE_FAMILY_IGNORED, vk::QUEUE_FAMILY_IGNORED),
    }
}

pub fn image_usage_flags(usages: &[ImageUsage]) -> vk::ImageUsageFlags {
    usages
        .iter()
        .fold(vk::ImageUsageFlags::empty(), |flags, usage| {
            flags | image_usage_flag(usage)
        })
}

fn image_usage_flag(usage: &ImageUsage) -> vk::ImageUsageFlags {
    match usage.category() {
        ImageCategory::NoUsage => vk::ImageUsageFlags::empty(),
        ImageCategory::RenderTarget
        | ImageCategory::MultisampleResolveTarget
        | ImageCategory::Presentation => vk::ImageUsageFlags::COLOR_ATTACHMENT,
        ImageCategory::DepthStencil => vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT,
        ImageCategory::LinearAccess => vk::ImageUsageFlags::STORAGE,
        ImageCategory::InputAttachment => vk::ImageUsageFlags::INPUT_ATTACHMENT,
        ImageCategory::Sampled => vk::ImageUsageFlags::SAMPLED,
        ImageCategory::Transfer => match usage.access_mode() {
            AccessMode::ReadOnly => vk::ImageUsageFlags::TRANSFER_SRC,
            AccessMode::WriteOnly => vk::ImageUsageFlags::TRANSFER_DST,
            other => unreachable!("Transfer usage constructed with access mode {:?}", other),
        },
    }
}

pub fn buffer_usage_flags(usages: &[BufferUsage]) -> vk::BufferUsageFlags {
    usages.iter().fold(vk::BufferUsageFlags::empty(), |flags, usage| {
        flags
            | match usage.category() {
                BufferCategory::NoUsage => vk::BufferUsageFlags::empty(),
                BufferCategory::VertexOnly => vk::BufferUsageFlags::VERTEX_BUFFER,
                BufferCategory::IndexOnly => vk::BufferUsageFlags::INDEX_BUFFER,
                BufferCategory::IndexAndVertex => {
                    vk::BufferUsageFlags::INDEX_BUFFER | vk::BufferUsageFlags::VERTEX_BUFFER
                }
                BufferCategory::Uniform => vk::BufferUsageFlags::UNIFORM_BUFFER,
                BufferCategory::Transfer => {
                    if usage.access_mode() == AccessMode::ReadOnly {
                        vk::BufferUsageFlags::TRANSFER_SRC
                    } else {
                        vk::BufferUsageFlags::TRANSFER_DST
                    }
                }
            }
    })
}

pub fn preferred_color_format(usages: &[ImageUsage]) -> vk::Format {
    if crate::renderer::usage::image_usage::uses_high_precision(usages) {
        vk::Format::R16G16B16A16_SFLOAT
    } else {
        vk::Format::R8G8B8A8_UNORM
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn storage(mode: AccessMode) -> ImageUsage {
        ImageUsage::linear_access_in_compute(mode).unwrap()
    }

    #[rstest]
    #[case::sampled(ImageUsage::sampled_in_fragment())]
    #[case::input(ImageUsage::input_attachment())]
    #[case::presentation(ImageUsage::presentation())]
    #[case::transfer_source(ImageUsage::transfer_source())]
    #[case::storage_read(storage(AccessMode::ReadOnly))]
    #[case::depth_read(ImageUsage::depth_stencil(AccessMode::ReadOnly).unwrap())]
    fn test_read_after_read_is_elided(#[case] usage: ImageUsage) {
        assert!(!needs_synchronization(&usage, &usage));
    }

    #[rstest]
    #[case::render_target(ImageUsage::render_target())]
    #[case::resolve(ImageUsage::multisample_resolve_target())]
    #[case::transfer_destination(ImageUsage::transfer_destination())]
    #[case::storage_write(storage(AccessMode::WriteOnly))]
    #[case::storage_read_write(storage(AccessMode::ReadWrite))]
    #[case::depth_write(ImageUsage::depth_stencil(AccessMode::ReadWrite).unwrap())]
    fn test_same_usage_with_write_is_synchronized(#[case] usage: ImageUsage) {
        assert!(needs_synchronization(&usage, &usage));
    }

    #[rstest]
    #[case::different_category(ImageUsage::sampled_in_fragment(), ImageUsage::input_attachment())]
    #[case::different_location(
        ImageUsage::sampled_in_fragment(),
        ImageUsage::sampled(AccessLocation::ComputeStage).unwrap()
    )]
    #[case::read_then_write(storage(AccessMode::ReadOnly), storage(AccessMode::WriteOnly))]
    #[case::none_then_read(ImageUsage::none(), ImageUsage::sampled_in_fragment())]
    fn test_different_usages_are_synchronized(#[case] prev: ImageUsage, #[case] curr: ImageUsage) {
        assert!(needs_synchronization(&prev, &curr));
    }

    #[test]
    fn test_buffer_read_after_read_is_elided() {
        let usage = BufferUsage::index_and_vertex();
        assert!(!needs_synchronization(&usage, &usage));
        let dst = BufferUsage::transfer_destination();
        assert!(needs_synchronization(&dst, &dst));
        assert!(needs_synchronization(&dst, &usage));
    }

    #[rstest]
    #[case::none(ImageUsage::none(), vk::AccessFlags::empty(), vk::PipelineStageFlags::TOP_OF_PIPE, vk::ImageLayout::UNDEFINED)]
    #[case::render_target(
        ImageUsage::render_target(),
        vk::AccessFlags::COLOR_ATTACHMENT_READ | vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
        vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
        vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL
    )]
    #[case::resolve(
        ImageUsage::multisample_resolve_target(),
        vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
        vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
        vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL
    )]
    #[case::depth_write(
        ImageUsage::depth_stencil(AccessMode::WriteOnly).unwrap(),
        vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
        vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS | vk::PipelineStageFlags::LATE_FRAGMENT_TESTS,
        vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL
    )]
    #[case::presentation(
        ImageUsage::presentation(),
        vk::AccessFlags::empty(),
        vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
        vk::ImageLayout::PRESENT_SRC_KHR
    )]
    #[case::storage_compute(
        storage(AccessMode::ReadWrite),
        vk::AccessFlags::SHADER_READ | vk::AccessFlags::SHADER_WRITE,
        vk::PipelineStageFlags::COMPUTE_SHADER,
        vk::ImageLayout::GENERAL
    )]
    #[case::storage_host(
        ImageUsage::linear_access(AccessMode::WriteOnly, AccessLocation::Host).unwrap(),
        vk::AccessFlags::HOST_WRITE,
        vk::PipelineStageFlags::HOST,
        vk::ImageLayout::GENERAL
    )]
    #[case::sampled(
        ImageUsage::sampled_in_fragment(),
        vk::AccessFlags::SHADER_READ,
        vk::PipelineStageFlags::FRAGMENT_SHADER,
        vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL
    )]
    #[case::input(
        ImageUsage::input_attachment(),
        vk::AccessFlags::INPUT_ATTACHMENT_READ,
        vk::PipelineStageFlags::FRAGMENT_SHADER,
        vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL
    )]
    #[case::transfer_source(
        ImageUsage::transfer_source(),
        vk::AccessFlags::TRANSFER_READ,
        vk::PipelineStageFlags::TRANSFER,
        vk::ImageLayout::TRANSFER_SRC_OPTIMAL
    )]
    #[case::transfer_destination(
        ImageUsage::transfer_destination(),
        vk::AccessFlags::TRANSFER_WRITE,
        vk::PipelineStageFlags::TRANSFER,
        vk::ImageLayout::TRANSFER_DST_OPTIMAL
    )]
    fn test_image_mapping(
        #[case] usage: ImageUsage,
        #[case] access: vk::AccessFlags,
        #[case] stages: vk::PipelineStageFlags,
        #[case] layout: vk::ImageLayout,
    ) {
        assert_eq!(access_rights_of(&usage), access);
        assert_eq!(pipeline_stages_of(&usage), stages);
        assert_eq!(image_layout_of(&usage), layout);
    }

    #[rstest]
    #[case::vertex(BufferUsage::vertex_only(), vk::AccessFlags::VERTEX_ATTRIBUTE_READ, vk::PipelineStageFlags::VERTEX_INPUT)]
    #[case::index(BufferUsage::index_only(), vk::AccessFlags::INDEX_READ, vk::PipelineStageFlags::VERTEX_INPUT)]
    #[case::uniform_vertex(
        BufferUsage::uniform(AccessLocation::VertexStage).unwrap(),
        vk::AccessFlags::UNIFORM_READ,
        vk::PipelineStageFlags::VERTEX_SHADER
    )]
    #[case::uniform_compute(
        BufferUsage::uniform(AccessLocation::ComputeStage).unwrap(),
        vk::AccessFlags::UNIFORM_READ,
        vk::PipelineStageFlags::COMPUTE_SHADER
    )]
    #[case::transfer(BufferUsage::transfer_source(), vk::AccessFlags::TRANSFER_READ, vk::PipelineStageFlags::TRANSFER)]
    fn test_buffer_mapping(
        #[case] usage: BufferUsage,
        #[case] access: vk::AccessFlags,
        #[case] stages: vk::PipelineStageFlags,
    ) {
        assert_eq!(access_rights_of(&usage), access);
        assert_eq!(pipeline_stages_of(&usage), stages);
    }

    #[rstest]
    #[case::none(ImageUsage::none(), None)]
    #[case::presentation(ImageUsage::presentation(), None)]
    #[case::transfer(ImageUsage::transfer_destination(), None)]
    #[case::host(ImageUsage::linear_access(AccessMode::ReadOnly, AccessLocation::Host).unwrap(), None)]
    #[case::render_target(ImageUsage::render_target(), Some(0))]
    #[case::sampled_fragment(ImageUsage::sampled_in_fragment(), Some(0))]
    #[case::storage_compute(storage(AccessMode::WriteOnly), Some(2))]
    fn test_owning_queue_family(#[case] usage: ImageUsage, #[case] family: Option<u32>) {
        let queues = QueueFamilyIndices::new(0, 2);
        assert_eq!(owning_queue_family(&queues, &usage), family);
    }

    #[test]
    fn test_queue_transfer_only_between_known_families() {
        let queues = QueueFamilyIndices::new(0, 2);
        let compute = storage(AccessMode::WriteOnly);
        let fragment = ImageUsage::sampled_in_fragment();
        assert_eq!(queue_family_transfer(&queues, &compute, &fragment), (2, 0));
        assert_eq!(
            queue_family_transfer(&queues, &ImageUsage::none(), &fragment),
            (vk::QUEUE_FAMILY_IGNORED, vk::QUEUE_FAMILY_IGNORED)
        );

        let unified = QueueFamilyIndices::unified(0);
        assert_eq!(
            queue_family_transfer(&unified, &compute, &fragment),
            (vk::QUEUE_FAMILY_IGNORED, vk::QUEUE_FAMILY_IGNORED)
        );
    }

    #[test]
    fn test_usage_flags_fold_all_usages() {
        let flags = image_usage_flags(&[
            ImageUsage::none(),
            ImageUsage::render_target(),
            ImageUsage::sampled_in_fragment(),
            ImageUsage::transfer_source(),
        ]);
        assert_eq!(
            flags,
            vk::ImageUsageFlags::COLOR_ATTACHMENT
                | vk::ImageUsageFlags::SAMPLED
                | vk::ImageUsageFlags::TRANSFER_SRC
        );

        let flags = buffer_usage_flags(&[
            BufferUsage::none(),
            BufferUsage::index_and_vertex(),
            BufferUsage::transfer_destination(),
        ]);
        assert_eq!(
            flags,
            vk::BufferUsageFlags::INDEX_BUFFER
                | vk::BufferUsageFlags::VERTEX_BUFFER
                | vk::BufferUsageFlags::TRANSFER_DST
        );
        assert!(image_usage_flags(&[ImageUsage::none()]).is_empty());
    }

    #[test]
    fn test_preferred_color_format() {
        let plain = [ImageUsage::render_target()];
        let precise = [ImageUsage::render_target().with_high_precision()];
        assert_eq!(preferred_color_format(&plain), vk::Format::R8G8B8A8_UNORM);
        assert_eq!(preferred_color_format(&precise), vk::Format::R16G16B16A16_SFLOAT);
    }
}

use std::sync::Arc;
use ash::vk;
use smallvec::SmallVec;

use crate::renderer::contexts::device_ctx::command_encoder::CommandRecorder;
use crate::renderer::contexts::device_ctx::queue::QueueFamilyIndices;
use crate::renderer::error::PassResult;
use crate::renderer::resources::AttachmentImage;
use crate::renderer::sync::{self, Synchronize};
use crate::renderer::usage::ImageUsage;

/// A layout transition and memory dependency between two usages of one image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedBarrier {
    /// Position of the image in the pass.
    pub image: usize,
    pub src_stages: vk::PipelineStageFlags,
    pub dst_stages: vk::PipelineStageFlags,
    pub src_access: vk::AccessFlags,
    pub dst_access: vk::AccessFlags,
    pub old_layout: vk::ImageLayout,
    pub new_layout: vk::ImageLayout,
    pub src_queue_family: u32,
    pub dst_queue_family: u32,
}

impl PlannedBarrier {
    pub(crate) fn between(
        image: usize,
        queues: &QueueFamilyIndices,
        prev: &ImageUsage,
        curr: &ImageUsage,
    ) -> Self {
        let (src_queue_family, dst_queue_family) = sync::queue_family_transfer(queues, prev, curr);
        Self {
            image,
            src_stages: prev.pipeline_stages(),
            dst_stages: curr.pipeline_stages(),
            src_access: prev.access_flags(),
            dst_access: curr.access_flags(),
            old_layout: sync::image_layout_of(prev),
            new_layout: sync::image_layout_of(curr),
            src_queue_family,
            dst_queue_family,
        }
    }
}

pub(crate) type Barriers = SmallVec<[PlannedBarrier; 4]>;

/// Records one `pipeline_barrier` per planned barrier. `image_index` selects
/// which backing image a multiple-image resource uses this time.
pub(crate) fn record_barriers<R: CommandRecorder>(
    recorder: &mut R,
    images: &[Arc<AttachmentImage>],
    image_index: usize,
    barriers: &[PlannedBarrier],
) -> PassResult<()> {
    for planned in barriers {
        let image = &images[planned.image];
        log::debug!(
            "Barrier on '{}': {:?} -> {:?}, queue family {} -> {}",
            image.name,
            planned.old_layout,
            planned.new_layout,
            planned.src_queue_family,
            planned.dst_queue_family,
        );
        let barrier = vk::ImageMemoryBarrier::default()
            .image(image.image(image_index)?)
            .subresource_range(image.subresource_range())
            .src_access_mask(planned.src_access)
            .dst_access_mask(planned.dst_access)
            .old_layout(planned.old_layout)
            .new_layout(planned.new_layout)
            .src_queue_family_index(planned.src_queue_family)
            .dst_queue_family_index(planned.dst_queue_family);
        recorder.pipeline_barrier(planned.src_stages, planned.dst_stages, &[barrier]);
    }
    Ok(())
}

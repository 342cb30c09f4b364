use std::sync::atomic::{AtomicU64, Ordering};
use ash::vk::{self, Handle};
use color_eyre::Result;
use passwright::renderer::contexts::device_ctx::PassDevice;
use passwright::renderer::contexts::device_ctx::command_encoder::CommandRecorder;
use passwright::renderer::contexts::pipeline_ctx::{GraphicsPipelineDescriptor, PipelineFactory};
use passwright::renderer::render_pass::RenderPassTables;
use passwright::renderer::resources::AttachmentImage;

/// Stands in for a logical device: hands out made-up handles and logs what
/// would have been created.
#[derive(Default)]
pub struct DryRunDevice {
    next_handle: AtomicU64,
}

impl DryRunDevice {
    fn handle(&self) -> u64 {
        self.next_handle.fetch_add(1, Ordering::Relaxed) + 1
    }
}

impl PassDevice for DryRunDevice {
    fn create_render_pass(&self, tables: &RenderPassTables) -> Result<vk::RenderPass> {
        for (index, attachment) in tables.attachments.iter().enumerate() {
            log::info!(
                "  attachment {index} '{}': {:?} x{:?}, {:?} -> {:?}, load {:?} store {:?}",
                tables.attachment_names[index],
                attachment.format,
                attachment.samples,
                attachment.initial_layout,
                attachment.final_layout,
                attachment.load_op,
                attachment.store_op,
            );
        }
        for (index, subpass) in tables.subpasses.iter().enumerate() {
            log::info!(
                "  subpass {index}: colors {:?}, resolves {:?}, inputs {:?}, depth {:?}",
                subpass
                    .color_refs
                    .iter()
                    .map(|reference| reference.attachment)
                    .collect::<Vec<_>>(),
                subpass.resolve_refs.as_ref().map(|references| {
                    references
                        .iter()
                        .map(|reference| reference.attachment)
                        .collect::<Vec<_>>()
                }),
                subpass
                    .input_refs
                    .iter()
                    .map(|reference| reference.attachment)
                    .collect::<Vec<_>>(),
                subpass.depth_stencil_ref.map(|reference| reference.attachment),
            );
        }
        for dependency in &tables.dependencies {
            log::info!(
                "  dependency {} -> {}: {:?} -> {:?}",
                dependency.src_subpass,
                dependency.dst_subpass,
                dependency.src_stage_mask,
                dependency.dst_stage_mask,
            );
        }
        Ok(vk::RenderPass::from_raw(self.handle()))
    }

    fn create_image_view(
        &self,
        attachment: &AttachmentImage,
        _image: vk::Image,
    ) -> Result<vk::ImageView> {
        log::debug!("Creating image view for '{}'", attachment.name);
        Ok(vk::ImageView::from_raw(self.handle()))
    }

    fn create_framebuffer(
        &self,
        _render_pass: vk::RenderPass,
        views: &[vk::ImageView],
        extent: vk::Extent2D,
        _layers: u32,
    ) -> Result<vk::Framebuffer> {
        let framebuffer = vk::Framebuffer::from_raw(self.handle());
        log::debug!(
            "Framebuffer {:#x} ({}x{}) binds views {:?}",
            framebuffer.as_raw(),
            extent.width,
            extent.height,
            views.iter().map(|view| view.as_raw()).collect::<Vec<_>>(),
        );
        Ok(framebuffer)
    }

    fn destroy_render_pass(&self, _render_pass: vk::RenderPass) {}
    fn destroy_image_view(&self, _view: vk::ImageView) {}
    fn destroy_framebuffer(&self, _framebuffer: vk::Framebuffer) {}
    fn destroy_pipeline(&self, _pipeline: vk::Pipeline) {}
}

#[derive(Default)]
pub struct DryRunPipelines {
    next_handle: u64,
}

impl PipelineFactory for DryRunPipelines {
    fn build(
        &mut self,
        descriptor: &GraphicsPipelineDescriptor,
        _render_pass: vk::RenderPass,
        subpass: u32,
    ) -> Result<vk::Pipeline> {
        self.next_handle += 1;
        log::info!(
            "Pipeline '{}' for subpass {subpass} from {} shaders",
            descriptor.name,
            descriptor.shaders.len(),
        );
        Ok(vk::Pipeline::from_raw(self.next_handle))
    }
}

/// Logs commands instead of recording them.
pub struct LogRecorder;

impl CommandRecorder for LogRecorder {
    fn pipeline_barrier(
        &mut self,
        src_stages: vk::PipelineStageFlags,
        dst_stages: vk::PipelineStageFlags,
        image_barriers: &[vk::ImageMemoryBarrier<'_>],
    ) {
        for barrier in image_barriers {
            log::info!(
                "  barrier {:?} -> {:?}: {:?} -> {:?}, {:?} -> {:?}",
                src_stages,
                dst_stages,
                barrier.old_layout,
                barrier.new_layout,
                barrier.src_access_mask,
                barrier.dst_access_mask,
            );
        }
    }

    fn begin_render_pass(
        &mut self,
        _render_pass: vk::RenderPass,
        framebuffer: vk::Framebuffer,
        render_area: vk::Rect2D,
        clear_values: &[vk::ClearValue],
    ) {
        log::info!(
            "  begin render pass on framebuffer {:#x}, {}x{}, {} clear values",
            framebuffer.as_raw(),
            render_area.extent.width,
            render_area.extent.height,
            clear_values.len(),
        );
    }

    fn next_subpass(&mut self) {
        log::info!("  next subpass");
    }

    fn end_render_pass(&mut self) {
        log::info!("  end render pass");
    }

    fn bind_pipeline(&mut self, _bind_point: vk::PipelineBindPoint, pipeline: vk::Pipeline) {
        log::info!("  bind pipeline {:#x}", pipeline.as_raw());
    }
}

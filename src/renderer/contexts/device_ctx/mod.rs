pub mod command_encoder;
pub mod queue;

use ash::vk;
use color_eyre::Result;
use crate::renderer::render_pass::RenderPassTables;
use crate::renderer::resources::AttachmentImage;

/// The driver calls a pass needs to materialize its tables.
///
/// Implemented for `ash::Device`; tests use a fake that hands out
/// sequential handles and records every call.
pub trait PassDevice {
    fn create_render_pass(&self, tables: &RenderPassTables) -> Result<vk::RenderPass>;

    fn create_image_view(
        &self,
        attachment: &AttachmentImage,
        image: vk::Image,
    ) -> Result<vk::ImageView>;

    fn create_framebuffer(
        &self,
        render_pass: vk::RenderPass,
        views: &[vk::ImageView],
        extent: vk::Extent2D,
        layers: u32,
    ) -> Result<vk::Framebuffer>;

    fn destroy_render_pass(&self, render_pass: vk::RenderPass);
    fn destroy_image_view(&self, view: vk::ImageView);
    fn destroy_framebuffer(&self, framebuffer: vk::Framebuffer);
    fn destroy_pipeline(&self, pipeline: vk::Pipeline);
}

impl PassDevice for ash::Device {
    fn create_render_pass(&self, tables: &RenderPassTables) -> Result<vk::RenderPass> {
        let subpasses = tables.subpass_descriptions();
        let info = vk::RenderPassCreateInfo::default()
            .attachments(&tables.attachments)
            .subpasses(&subpasses)
            .dependencies(&tables.dependencies);
        Ok(unsafe { ash::Device::create_render_pass(self, &info, None)? })
    }

    fn create_image_view(
        &self,
        attachment: &AttachmentImage,
        image: vk::Image,
    ) -> Result<vk::ImageView> {
        let info = attachment.view_create_info(image);
        Ok(unsafe { ash::Device::create_image_view(self, &info, None)? })
    }

    fn create_framebuffer(
        &self,
        render_pass: vk::RenderPass,
        views: &[vk::ImageView],
        extent: vk::Extent2D,
        layers: u32,
    ) -> Result<vk::Framebuffer> {
        let info = vk::FramebufferCreateInfo::default()
            .render_pass(render_pass)
            .attachments(views)
            .width(extent.width)
            .height(extent.height)
            .layers(layers);
        Ok(unsafe { ash::Device::create_framebuffer(self, &info, None)? })
    }

    fn destroy_render_pass(&self, render_pass: vk::RenderPass) {
        unsafe { ash::Device::destroy_render_pass(self, render_pass, None) }
    }

    fn destroy_image_view(&self, view: vk::ImageView) {
        unsafe { ash::Device::destroy_image_view(self, view, None) }
    }

    fn destroy_framebuffer(&self, framebuffer: vk::Framebuffer) {
        unsafe { ash::Device::destroy_framebuffer(self, framebuffer, None) }
    }

    fn destroy_pipeline(&self, pipeline: vk::Pipeline) {
        unsafe { ash::Device::destroy_pipeline(self, pipeline, None) }
    }
}

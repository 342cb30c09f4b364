//! Driver stand-ins so passes can be built and replayed without a GPU.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use ash::vk::{self, Handle};
use color_eyre::Result;
use color_eyre::eyre::eyre;

use crate::renderer::contexts::device_ctx::PassDevice;
use crate::renderer::contexts::device_ctx::command_encoder::CommandRecorder;
use crate::renderer::contexts::pipeline_ctx::{GraphicsPipelineDescriptor, PipelineFactory};
use crate::renderer::render_pass::RenderPassTables;
use crate::renderer::resources::AttachmentImage;

static NEXT_IMAGE: AtomicU64 = AtomicU64::new(1);

const EXTENT: vk::Extent2D = vk::Extent2D {
    width: 800,
    height: 600,
};

fn next_image() -> vk::Image {
    vk::Image::from_raw(NEXT_IMAGE.fetch_add(1, Ordering::Relaxed))
}

pub fn color_image(name: &str) -> Arc<AttachmentImage> {
    Arc::new(AttachmentImage::single(
        name,
        next_image(),
        vk::Format::R8G8B8A8_UNORM,
        EXTENT,
    ))
}

pub fn msaa_image(name: &str) -> Arc<AttachmentImage> {
    Arc::new(
        AttachmentImage::single(name, next_image(), vk::Format::R8G8B8A8_UNORM, EXTENT)
            .with_samples(vk::SampleCountFlags::TYPE_4),
    )
}

pub fn depth_image(name: &str) -> Arc<AttachmentImage> {
    Arc::new(AttachmentImage::single(
        name,
        next_image(),
        vk::Format::D32_SFLOAT,
        EXTENT,
    ))
}

pub fn swapchain_image(name: &str, count: usize) -> Arc<AttachmentImage> {
    Arc::new(AttachmentImage::multiple(
        name,
        (0..count).map(|_| next_image()).collect(),
        vk::Format::B8G8R8A8_SRGB,
        EXTENT,
    ))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceCall {
    CreateRenderPass(vk::RenderPass),
    CreateImageView { view: vk::ImageView, image: vk::Image },
    CreateFramebuffer {
        framebuffer: vk::Framebuffer,
        views: Vec<vk::ImageView>,
    },
    DestroyRenderPass(vk::RenderPass),
    DestroyImageView(vk::ImageView),
    DestroyFramebuffer(vk::Framebuffer),
    DestroyPipeline(vk::Pipeline),
}

/// Hands out sequential handles and records every call.
#[derive(Default)]
pub struct FakeDevice {
    next_handle: AtomicU64,
    calls: Mutex<Vec<DeviceCall>>,
    /// Framebuffer creation fails once this many exist.
    framebuffer_limit: Option<usize>,
}

impl FakeDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_framebuffer_after(count: usize) -> Self {
        Self {
            framebuffer_limit: Some(count),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<DeviceCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, predicate: impl Fn(&DeviceCall) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|call| predicate(call)).count()
    }

    fn handle(&self) -> u64 {
        self.next_handle.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn record(&self, call: DeviceCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl PassDevice for FakeDevice {
    fn create_render_pass(&self, _tables: &RenderPassTables) -> Result<vk::RenderPass> {
        let render_pass = vk::RenderPass::from_raw(self.handle());
        self.record(DeviceCall::CreateRenderPass(render_pass));
        Ok(render_pass)
    }

    fn create_image_view(
        &self,
        _attachment: &AttachmentImage,
        image: vk::Image,
    ) -> Result<vk::ImageView> {
        let view = vk::ImageView::from_raw(self.handle());
        self.record(DeviceCall::CreateImageView { view, image });
        Ok(view)
    }

    fn create_framebuffer(
        &self,
        _render_pass: vk::RenderPass,
        views: &[vk::ImageView],
        _extent: vk::Extent2D,
        _layers: u32,
    ) -> Result<vk::Framebuffer> {
        let created = self.count(|call| matches!(call, DeviceCall::CreateFramebuffer { .. }));
        if self.framebuffer_limit.is_some_and(|limit| created >= limit) {
            return Err(eyre!("Out of device memory"));
        }
        let framebuffer = vk::Framebuffer::from_raw(self.handle());
        self.record(DeviceCall::CreateFramebuffer {
            framebuffer,
            views: views.to_vec(),
        });
        Ok(framebuffer)
    }

    fn destroy_render_pass(&self, render_pass: vk::RenderPass) {
        self.record(DeviceCall::DestroyRenderPass(render_pass));
    }

    fn destroy_image_view(&self, view: vk::ImageView) {
        self.record(DeviceCall::DestroyImageView(view));
    }

    fn destroy_framebuffer(&self, framebuffer: vk::Framebuffer) {
        self.record(DeviceCall::DestroyFramebuffer(framebuffer));
    }

    fn destroy_pipeline(&self, pipeline: vk::Pipeline) {
        self.record(DeviceCall::DestroyPipeline(pipeline));
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RecordedBarrier {
    pub image: vk::Image,
    pub old_layout: vk::ImageLayout,
    pub new_layout: vk::ImageLayout,
    pub src_access: vk::AccessFlags,
    pub dst_access: vk::AccessFlags,
    pub src_queue_family: u32,
    pub dst_queue_family: u32,
}

#[derive(Debug, Clone)]
pub enum Command {
    Barrier {
        src_stages: vk::PipelineStageFlags,
        dst_stages: vk::PipelineStageFlags,
        barriers: Vec<RecordedBarrier>,
    },
    BeginRenderPass {
        render_pass: vk::RenderPass,
        framebuffer: vk::Framebuffer,
        extent: vk::Extent2D,
    },
    NextSubpass,
    EndRenderPass,
    BindPipeline(vk::Pipeline),
    /// Pushed by test ops.
    Dispatch(u32),
}

#[derive(Debug, Default)]
pub struct RecordingEncoder {
    pub commands: Vec<Command>,
}

impl CommandRecorder for RecordingEncoder {
    fn pipeline_barrier(
        &mut self,
        src_stages: vk::PipelineStageFlags,
        dst_stages: vk::PipelineStageFlags,
        image_barriers: &[vk::ImageMemoryBarrier<'_>],
    ) {
        let barriers = image_barriers
            .iter()
            .map(|barrier| RecordedBarrier {
                image: barrier.image,
                old_layout: barrier.old_layout,
                new_layout: barrier.new_layout,
                src_access: barrier.src_access_mask,
                dst_access: barrier.dst_access_mask,
                src_queue_family: barrier.src_queue_family_index,
                dst_queue_family: barrier.dst_queue_family_index,
            })
            .collect();
        self.commands.push(Command::Barrier {
            src_stages,
            dst_stages,
            barriers,
        });
    }

    fn begin_render_pass(
        &mut self,
        render_pass: vk::RenderPass,
        framebuffer: vk::Framebuffer,
        render_area: vk::Rect2D,
        _clear_values: &[vk::ClearValue],
    ) {
        self.commands.push(Command::BeginRenderPass {
            render_pass,
            framebuffer,
            extent: render_area.extent,
        });
    }

    fn next_subpass(&mut self) {
        self.commands.push(Command::NextSubpass);
    }

    fn end_render_pass(&mut self) {
        self.commands.push(Command::EndRenderPass);
    }

    fn bind_pipeline(&mut self, _bind_point: vk::PipelineBindPoint, pipeline: vk::Pipeline) {
        self.commands.push(Command::BindPipeline(pipeline));
    }
}

/// Records which pipelines were built for which subpass.
#[derive(Debug, Default)]
pub struct FakePipelines {
    pub built: Vec<(String, u32)>,
}

impl PipelineFactory for FakePipelines {
    fn build(
        &mut self,
        descriptor: &GraphicsPipelineDescriptor,
        _render_pass: vk::RenderPass,
        subpass: u32,
    ) -> Result<vk::Pipeline> {
        self.built.push((descriptor.name.clone(), subpass));
        Ok(vk::Pipeline::from_raw(1000 + self.built.len() as u64))
    }
}

mod dry_run;

use std::collections::HashMap;
use std::sync::Arc;
use ash::vk;
use color_eyre::Result;
use passwright::renderer::config::RenderConfig;
use passwright::renderer::contexts::device_ctx::queue::QueueFamilyIndices;
use passwright::renderer::contexts::pipeline_ctx::GraphicsPipelineDescriptor;
use passwright::renderer::pass::{SealedPass, SubpassRef};
use passwright::renderer::pass::compute::{ComputePass, ComputePassDescriptor};
use passwright::renderer::pass::graphics::{
    ColorAttachment, DepthStencilAttachment, GraphicsPassDescriptor, LoadStoreOps,
};
use passwright::renderer::pass::pass_util;
use passwright::renderer::render_pass::RenderPass;
use passwright::renderer::resources::AttachmentImage;
use passwright::renderer::sync;
use passwright::renderer::usage::{AccessLocation, AccessMode, ImageUsage, UsageTracker};
use crate::app::dry_run::{DryRunDevice, DryRunPipelines, LogRecorder};

const SWAPCHAIN_IMAGE_COUNT: usize = 3;
const EXTENT: vk::Extent2D = vk::Extent2D {
    width: 1280,
    height: 720,
};

/// Images a frame touches.
struct FrameImages {
    particles: Arc<AttachmentImage>,
    scene: Arc<AttachmentImage>,
    depth: Arc<AttachmentImage>,
    swapchain: Arc<AttachmentImage>,
}

impl FrameImages {
    fn new(config: &RenderConfig) -> Self {
        Self {
            particles: Arc::new(AttachmentImage::single(
                "particles",
                vk::Image::null(),
                vk::Format::R16G16B16A16_SFLOAT,
                EXTENT,
            )),
            scene: Arc::new(
                AttachmentImage::single(
                    "scene",
                    vk::Image::null(),
                    vk::Format::R8G8B8A8_UNORM,
                    EXTENT,
                )
                .with_samples(config.sample_count),
            ),
            depth: Arc::new(
                AttachmentImage::single("depth", vk::Image::null(), vk::Format::D32_SFLOAT, EXTENT)
                    .with_samples(config.sample_count),
            ),
            swapchain: Arc::new(AttachmentImage::multiple(
                "swapchain",
                vec![vk::Image::null(); SWAPCHAIN_IMAGE_COUNT],
                vk::Format::B8G8R8A8_SRGB,
                EXTENT,
            )),
        }
    }

    fn all(&self) -> [&Arc<AttachmentImage>; 4] {
        [&self.particles, &self.scene, &self.depth, &self.swapchain]
    }
}

/// Builds one frame's passes without a GPU and logs what they would record.
pub struct App {
    config: RenderConfig,
    queues: QueueFamilyIndices,
    tracker: UsageTracker<ImageUsage>,
    images: FrameImages,

    // Every usage declared per image, for picking creation flags.
    declared_usages: HashMap<String, Vec<ImageUsage>>,
}

impl App {
    pub fn new() -> Result<Self> {
        let config = RenderConfig {
            sample_count: vk::SampleCountFlags::TYPE_4,
            ..Default::default()
        };
        let images = FrameImages::new(&config);

        let mut tracker = UsageTracker::new();
        for image in images.all() {
            tracker.track(image.name.clone(), ImageUsage::none())?;
        }

        Ok(Self {
            config,
            queues: QueueFamilyIndices::new(0, 1),
            tracker,
            images,
            declared_usages: HashMap::new(),
        })
    }

    pub fn run(&mut self) -> Result<()> {
        self.run_compute_pass()?;
        self.run_graphics_pass()?;
        self.log_image_requirements();
        Ok(())
    }

    fn run_compute_pass(&mut self) -> Result<()> {
        let storage = ImageUsage::linear_access_in_compute(AccessMode::WriteOnly)?
            .with_high_precision();
        let blur_source = ImageUsage::sampled(AccessLocation::ComputeStage)?;

        let mut pass =
            ComputePassDescriptor::new(vec![self.images.particles.clone()], &self.tracker)?;
        pass.add_subpass(&[("particles", storage)])?;
        pass.add_subpass(&[("particles", blur_source)])?;
        pass.set_final_usage("particles", ImageUsage::sampled_in_fragment())?;
        let sealed = pass.seal(&mut self.tracker)?;
        self.collect_usages(&sealed.pass);

        log::info!("Compute pass:");
        let compute = ComputePass::new(sealed, &self.queues);
        compute.run(&mut LogRecorder, 0, |_, subpass| {
            log::info!("  dispatch subpass {subpass}");
        })?;
        Ok(())
    }

    fn run_graphics_pass(&mut self) -> Result<()> {
        let mut pass = GraphicsPassDescriptor::new(
            &self.tracker,
            vec![
                ColorAttachment {
                    image: self.images.scene.clone(),
                    ops: pass_util::render_target_ops(&self.config),
                },
                ColorAttachment {
                    image: self.images.swapchain.clone(),
                    ops: pass_util::resolve_target_ops(),
                },
            ],
            vec![DepthStencilAttachment {
                image: self.images.depth.clone(),
                depth_ops: pass_util::depth_ops(),
                stencil_ops: LoadStoreOps::default(),
            }],
            vec![self.images.particles.clone()],
        )?;

        let mut scene = pass.begin_subpass();
        scene
            .render_to("scene")?
            .depth_stencil("depth", AccessMode::ReadWrite)?
            .use_image("particles", ImageUsage::sampled_in_fragment())?;
        scene.add_pipeline(
            GraphicsPipelineDescriptor::new("scene")
                .shader(vk::ShaderStageFlags::VERTEX, "shaders/scene.vert")
                .shader(vk::ShaderStageFlags::FRAGMENT, "shaders/scene.frag")
                .depth_test(true),
        );
        scene.add_multisample_resolve("scene", "swapchain")?;
        scene.finish()?;

        let mut overlay = pass.begin_subpass();
        overlay.render_to("swapchain")?;
        overlay.add_pipeline(
            GraphicsPipelineDescriptor::new("overlay")
                .shader(vk::ShaderStageFlags::VERTEX, "shaders/overlay.vert")
                .shader(vk::ShaderStageFlags::FRAGMENT, "shaders/overlay.frag")
                .alpha_blend(true),
        );
        overlay.finish()?;

        pass.add_dependency(SubpassRef::External, SubpassRef::Index(0), &["scene", "depth"])?
            .add_dependency(SubpassRef::Index(0), SubpassRef::Index(1), &["swapchain"])?
            .add_dependency(SubpassRef::Index(1), SubpassRef::External, &["swapchain"])?
            .set_final_usage("swapchain", ImageUsage::presentation())?;

        let sealed = pass.seal(&mut self.tracker)?;
        self.collect_usages(&sealed.pass);

        log::info!("Render pass:");
        let mut render_pass = RenderPass::new(
            Arc::new(DryRunDevice::default()),
            sealed,
            &self.config,
            &self.queues,
            &mut DryRunPipelines::default(),
        )?;

        let clear_values = [
            vk::ClearValue {
                color: vk::ClearColorValue {
                    float32: [0.0, 0.0, 0.0, 1.0],
                },
            },
            vk::ClearValue::default(),
            vk::ClearValue {
                depth_stencil: vk::ClearDepthStencilValue {
                    depth: 1.0,
                    stencil: 0,
                },
            },
        ];
        for index in 0..render_pass.num_framebuffers() {
            render_pass.run(&mut LogRecorder, index, &clear_values, |_, subpass, _| {
                log::info!("  draw in subpass {subpass}");
            })?;
        }
        render_pass.release();
        Ok(())
    }

    fn collect_usages(&mut self, pass: &SealedPass) {
        for image in &pass.images {
            self.declared_usages
                .entry(image.image.name.clone())
                .or_default()
                .extend(image.history.all_usages());
        }
    }

    fn log_image_requirements(&self) {
        for image in self.images.all() {
            let usages = self
                .declared_usages
                .get(&image.name)
                .map(Vec::as_slice)
                .unwrap_or_default();
            log::info!(
                "'{}' needs {:?}, preferred color format {:?}, ends as {:?}",
                image.name,
                sync::image_usage_flags(usages),
                sync::preferred_color_format(usages),
                self.tracker.current_usage(&image.name).map(|usage| usage.category()),
            );
        }
    }
}

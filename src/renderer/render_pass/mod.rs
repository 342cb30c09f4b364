//! Turns a sealed graphics pass into the attachment, subpass and dependency
//! tables the driver consumes, and owns the objects created from them.

pub mod framebuffer;

use std::collections::HashMap;
use std::sync::Arc;
use ash::vk;
use color_eyre::Result;

use crate::renderer::config::RenderConfig;
use crate::renderer::contexts::device_ctx::PassDevice;
use crate::renderer::contexts::device_ctx::command_encoder::CommandRecorder;
use crate::renderer::contexts::device_ctx::queue::QueueFamilyIndices;
use crate::renderer::contexts::pipeline_ctx::PipelineFactory;
use crate::renderer::error::{PassError, PassResult};
use crate::renderer::pass::graphics::{
    AttachmentKind, Dependency, LoadStoreOps, SealedGraphicsPass,
};
use crate::renderer::pass::barrier::{self, Barriers, PlannedBarrier};
use crate::renderer::pass::{PassImage, SubpassRef};
use crate::renderer::resources::AttachmentImage;
use crate::renderer::sync::{self, Synchronize};
use crate::renderer::usage::{ImageUsage, UsageHistory};
use framebuffer::Framebuffers;

/// Attachment references of one subpass.
#[derive(Debug, Clone, Default)]
pub struct SubpassTable {
    pub color_refs: Vec<vk::AttachmentReference>,
    /// Parallel to `color_refs` when the subpass resolves anything.
    pub resolve_refs: Option<Vec<vk::AttachmentReference>>,
    pub input_refs: Vec<vk::AttachmentReference>,
    pub depth_stencil_ref: Option<vk::AttachmentReference>,
}

impl SubpassTable {
    pub fn description(&self) -> vk::SubpassDescription<'_> {
        let mut description = vk::SubpassDescription::default()
            .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
            .color_attachments(&self.color_refs)
            .input_attachments(&self.input_refs);
        if let Some(resolve_refs) = &self.resolve_refs {
            description = description.resolve_attachments(resolve_refs);
        }
        if let Some(depth_stencil_ref) = &self.depth_stencil_ref {
            description = description.depth_stencil_attachment(depth_stencil_ref);
        }
        description
    }
}

#[derive(Debug, Clone, Default)]
pub struct RenderPassTables {
    pub attachments: Vec<vk::AttachmentDescription>,
    pub attachment_names: Vec<String>,
    attachment_index: HashMap<String, u32>,
    pub subpasses: Vec<SubpassTable>,
    pub dependencies: Vec<vk::SubpassDependency>,
}

impl RenderPassTables {
    pub fn build(sealed: &SealedGraphicsPass, config: &RenderConfig) -> PassResult<Self> {
        if sealed.attachments.is_empty() {
            return Err(PassError::NoAttachments);
        }

        let mut tables = Self::default();
        for declared in &sealed.attachments {
            let image = sealed.pass.image(&declared.name)?;
            let description = attachment_description(image, declared.kind);
            tables
                .attachment_index
                .insert(declared.name.clone(), tables.attachments.len() as u32);
            tables.attachments.push(description);
            tables.attachment_names.push(declared.name.clone());
        }

        for (index, subpass) in sealed.subpasses.iter().enumerate() {
            let index = index as u32;
            let reference = |name: &str| tables.reference(sealed, name, index);

            let color_refs = subpass
                .colors
                .iter()
                .map(|name| reference(name.as_str()))
                .collect::<PassResult<Vec<_>>>()?;
            let input_refs = subpass
                .inputs
                .iter()
                .map(|name| reference(name.as_str()))
                .collect::<PassResult<Vec<_>>>()?;
            let depth_stencil_ref = subpass
                .depth_stencil
                .as_deref()
                .map(|name| reference(name))
                .transpose()?;

            let mut resolve_refs = None;
            for resolve in subpass.ops.resolves() {
                let slots = resolve_refs.get_or_insert_with(|| {
                    vec![
                        vk::AttachmentReference {
                            attachment: vk::ATTACHMENT_UNUSED,
                            layout: vk::ImageLayout::UNDEFINED,
                        };
                        color_refs.len()
                    ]
                });
                let position = subpass
                    .colors
                    .iter()
                    .position(|color| *color == resolve.source)
                    .ok_or_else(|| PassError::InvalidResolve {
                        source_name: resolve.source.clone(),
                        target: resolve.target.clone(),
                        reason: "source is not rendered to in this subpass",
                    })?;
                slots[position] = reference(&resolve.target)?;
            }

            tables.subpasses.push(SubpassTable {
                color_refs,
                resolve_refs,
                input_refs,
                depth_stencil_ref,
            });
        }

        for dependency in &sealed.dependencies {
            let entry = subpass_dependency(sealed, dependency, config)?;
            log::debug!(
                "Subpass dependency {:?} -> {:?} on [{}]: stages {:?} -> {:?}, access {:?} -> {:?}",
                dependency.from,
                dependency.to,
                dependency.attachments.join(", "),
                entry.src_stage_mask,
                entry.dst_stage_mask,
                entry.src_access_mask,
                entry.dst_access_mask,
            );
            tables.dependencies.push(entry);
        }

        Ok(tables)
    }

    pub fn attachment_index(&self, name: &str) -> Option<u32> {
        self.attachment_index.get(name).copied()
    }

    pub fn subpass_descriptions(&self) -> Vec<vk::SubpassDescription<'_>> {
        self.subpasses.iter().map(SubpassTable::description).collect()
    }

    fn reference(
        &self,
        sealed: &SealedGraphicsPass,
        name: &str,
        subpass: u32,
    ) -> PassResult<vk::AttachmentReference> {
        let attachment = self
            .attachment_index(name)
            .ok_or_else(|| PassError::UndeclaredAttachment { name: name.into() })?;
        let history = &sealed.pass.image(name)?.history;
        let usage = history
            .usage_at(subpass)
            .ok_or_else(|| PassError::UndeclaredAttachment { name: name.into() })?;
        Ok(vk::AttachmentReference {
            attachment,
            layout: sync::image_layout_of(&usage),
        })
    }
}

fn attachment_description(image: &PassImage, kind: AttachmentKind) -> vk::AttachmentDescription {
    let (ops, stencil_ops) = match kind {
        AttachmentKind::Color(ops) => (ops, LoadStoreOps::default()),
        AttachmentKind::DepthStencil { depth, stencil } => (depth, stencil),
    };

    let history = &image.history;
    // The final layout may not be UNDEFINED, which is what an unused
    // attachment would otherwise end in.
    let final_layout = match sync::image_layout_of(&history.last_usage()) {
        vk::ImageLayout::UNDEFINED => vk::ImageLayout::GENERAL,
        layout => layout,
    };

    vk::AttachmentDescription::default()
        .format(image.image.format)
        .samples(image.image.samples)
        .load_op(ops.load_op)
        .store_op(ops.store_op)
        .stencil_load_op(stencil_ops.load_op)
        .stencil_store_op(stencil_ops.store_op)
        .initial_layout(sync::image_layout_of(&history.initial_usage()))
        .final_layout(final_layout)
}

fn source_usage(history: &UsageHistory<ImageUsage>, from: SubpassRef) -> ImageUsage {
    match from {
        SubpassRef::External => history.initial_usage(),
        SubpassRef::Index(index) => history
            .usage_at(index)
            .unwrap_or_else(|| history.usage_before(index)),
    }
}

fn destination_usage(history: &UsageHistory<ImageUsage>, to: SubpassRef) -> ImageUsage {
    match to {
        SubpassRef::External => history.last_usage(),
        SubpassRef::Index(index) => history
            .usage_at(index)
            .unwrap_or_else(|| history.usage_after(index)),
    }
}

/// Masks are the union of what the named attachments need on either side.
fn subpass_dependency(
    sealed: &SealedGraphicsPass,
    dependency: &Dependency,
    config: &RenderConfig,
) -> PassResult<vk::SubpassDependency> {
    let mut src_stages = vk::PipelineStageFlags::empty();
    let mut dst_stages = vk::PipelineStageFlags::empty();
    let mut src_access = vk::AccessFlags::empty();
    let mut dst_access = vk::AccessFlags::empty();

    for name in &dependency.attachments {
        let history = &sealed.pass.image(name)?.history;
        let src = source_usage(history, dependency.from);
        let dst = destination_usage(history, dependency.to);
        src_stages |= src.pipeline_stages();
        dst_stages |= dst.pipeline_stages();
        src_access |= src.access_flags();
        dst_access |= dst.access_flags();
    }

    if src_stages.is_empty() {
        src_stages = vk::PipelineStageFlags::TOP_OF_PIPE;
    }
    if dst_stages.is_empty() {
        dst_stages = vk::PipelineStageFlags::BOTTOM_OF_PIPE;
    }

    let internal = matches!(
        (dependency.from, dependency.to),
        (SubpassRef::Index(_), SubpassRef::Index(_))
    );
    let dependency_flags = if internal && config.by_region_dependencies {
        vk::DependencyFlags::BY_REGION
    } else {
        vk::DependencyFlags::empty()
    };

    Ok(vk::SubpassDependency {
        src_subpass: dependency.from.to_vk(),
        dst_subpass: dependency.to.to_vk(),
        src_stage_mask: src_stages,
        dst_stage_mask: dst_stages,
        src_access_mask: src_access,
        dst_access_mask: dst_access,
        dependency_flags,
    })
}

/// Barriers for images the pass uses without an attachment slot. Their
/// layout cannot change inside the render pass, so they are moved into their
/// first usage before it begins and into their final usage after it ends.
fn non_attachment_barriers(
    sealed: &SealedGraphicsPass,
    tables: &RenderPassTables,
    queues: &QueueFamilyIndices,
) -> (Barriers, Barriers) {
    let mut before = Barriers::new();
    let mut after = Barriers::new();
    for (index, image) in sealed.pass.images.iter().enumerate() {
        if tables.attachment_index(&image.image.name).is_some() {
            continue;
        }
        let history = &image.history;
        if let Some((_, first)) = history.points().next() {
            let initial = history.initial_usage();
            if sync::needs_synchronization(&initial, &first) {
                before.push(PlannedBarrier::between(index, queues, &initial, &first));
            }
        }
        if let Some(final_usage) = history.final_usage() {
            let last = history.usage_before(sealed.pass.num_subpasses);
            if last != final_usage {
                after.push(PlannedBarrier::between(index, queues, &last, &final_usage));
            }
        }
    }
    (before, after)
}

/// A render pass, its framebuffers and the pipelines of its subpasses.
pub struct RenderPass<D: PassDevice> {
    pub render_pass: vk::RenderPass,
    pub tables: RenderPassTables,
    framebuffers: Framebuffers<D>,
    /// Per subpass, in op-id order.
    pipelines: Vec<Vec<vk::Pipeline>>,
    render_area: vk::Extent2D,

    // Every image of the pass, indexed by `PlannedBarrier::image`.
    images: Vec<Arc<AttachmentImage>>,
    barriers_before: Barriers,
    barriers_after: Barriers,

    device: Arc<D>,
}

impl<D: PassDevice> RenderPass<D> {
    pub fn new(
        device: Arc<D>,
        sealed: SealedGraphicsPass,
        config: &RenderConfig,
        queues: &QueueFamilyIndices,
        pipeline_factory: &mut impl PipelineFactory,
    ) -> Result<Self> {
        let tables = RenderPassTables::build(&sealed, config)?;
        let (barriers_before, barriers_after) = non_attachment_barriers(&sealed, &tables, queues);
        let images = sealed
            .pass
            .images
            .iter()
            .map(|image| image.image.clone())
            .collect();
        let attachments = sealed.attachment_images()?;
        let render_area = sealed.render_area()?;
        framebuffer::framebuffer_count(&attachments)?;

        let render_pass = device.create_render_pass(&tables)?;
        let framebuffers =
            match Framebuffers::new(device.clone(), render_pass, &attachments, render_area) {
                Ok(framebuffers) => framebuffers,
                Err(err) => {
                    device.destroy_render_pass(render_pass);
                    return Err(err);
                }
            };

        log::info!(
            "Created render pass with {} attachments, {} subpasses and {} dependencies",
            tables.attachments.len(),
            tables.subpasses.len(),
            tables.dependencies.len(),
        );

        // Dropping `this` on a pipeline failure releases what exists so far.
        let mut this = Self {
            render_pass,
            tables,
            framebuffers,
            pipelines: Vec::with_capacity(sealed.subpasses.len()),
            render_area,
            images,
            barriers_before,
            barriers_after,
            device,
        };
        for (index, subpass) in sealed.subpasses.iter().enumerate() {
            this.pipelines.push(Vec::new());
            for (_, descriptor) in subpass.ops.pipelines() {
                let pipeline = pipeline_factory.build(descriptor, render_pass, index as u32)?;
                if let Some(pipelines) = this.pipelines.last_mut() {
                    pipelines.push(pipeline);
                }
            }
        }

        Ok(this)
    }

    pub fn framebuffers(&self) -> &Framebuffers<D> {
        &self.framebuffers
    }

    pub fn num_framebuffers(&self) -> usize {
        self.framebuffers.len()
    }

    pub fn barriers_before(&self) -> &[PlannedBarrier] {
        &self.barriers_before
    }

    pub fn barriers_after(&self) -> &[PlannedBarrier] {
        &self.barriers_after
    }

    pub fn pipelines(&self, subpass: u32) -> &[vk::Pipeline] {
        self.pipelines
            .get(subpass as usize)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Records the whole pass against framebuffer `framebuffer_index`. `op`
    /// is called once per pipeline after it is bound. Non-attachment images
    /// are transitioned before the pass begins and after it ends.
    pub fn run<R: CommandRecorder>(
        &self,
        recorder: &mut R,
        framebuffer_index: usize,
        clear_values: &[vk::ClearValue],
        mut op: impl FnMut(&mut R, u32, vk::Pipeline),
    ) -> PassResult<()> {
        let framebuffer = self.framebuffers.get(framebuffer_index)?;
        for planned in self.barriers_before.iter().chain(&self.barriers_after) {
            self.images[planned.image].image(framebuffer_index)?;
        }
        let render_area = vk::Rect2D {
            offset: vk::Offset2D { x: 0, y: 0 },
            extent: self.render_area,
        };

        barrier::record_barriers(
            recorder,
            &self.images,
            framebuffer_index,
            &self.barriers_before,
        )?;
        recorder.begin_render_pass(self.render_pass, framebuffer, render_area, clear_values);
        for (subpass, pipelines) in self.pipelines.iter().enumerate() {
            if subpass > 0 {
                recorder.next_subpass();
            }
            for pipeline in pipelines {
                recorder.bind_pipeline(vk::PipelineBindPoint::GRAPHICS, *pipeline);
                op(recorder, subpass as u32, *pipeline);
            }
        }
        recorder.end_render_pass();
        barrier::record_barriers(
            recorder,
            &self.images,
            framebuffer_index,
            &self.barriers_after,
        )
    }

    /// Destroys pipelines, framebuffers, views and the render pass. Safe to
    /// call more than once.
    pub fn release(&mut self) {
        if self.render_pass == vk::RenderPass::null() {
            return;
        }
        for pipeline in self.pipelines.drain(..).flatten() {
            self.device.destroy_pipeline(pipeline);
        }
        self.framebuffers.release();
        self.device.destroy_render_pass(self.render_pass);
        self.render_pass = vk::RenderPass::null();
        log::info!("Released render pass");
    }
}

impl<D: PassDevice> Drop for RenderPass<D> {
    fn drop(&mut self) {
        self.release();
    }
}

use std::collections::BTreeMap;
use std::sync::Arc;
use ash::vk;

use crate::renderer::contexts::pipeline_ctx::GraphicsPipelineDescriptor;
use crate::renderer::error::{PassError, PassResult};
use crate::renderer::pass::{PassDescriptor, SealedPass, SubpassRef};
use crate::renderer::resources::AttachmentImage;
use crate::renderer::sync;
use crate::renderer::usage::{AccessMode, ImageUsage, UsageTracker};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadStoreOps {
    pub load_op: vk::AttachmentLoadOp,
    pub store_op: vk::AttachmentStoreOp,
}

impl Default for LoadStoreOps {
    fn default() -> Self {
        Self {
            load_op: vk::AttachmentLoadOp::DONT_CARE,
            store_op: vk::AttachmentStoreOp::DONT_CARE,
        }
    }
}

pub struct ColorAttachment {
    pub image: Arc<AttachmentImage>,
    pub ops: LoadStoreOps,
}

pub struct DepthStencilAttachment {
    pub image: Arc<AttachmentImage>,
    pub depth_ops: LoadStoreOps,
    pub stencil_ops: LoadStoreOps,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentKind {
    Color(LoadStoreOps),
    DepthStencil {
        depth: LoadStoreOps,
        stencil: LoadStoreOps,
    },
}

/// An attachment slot of the render pass, in attachment-table order.
#[derive(Debug, Clone)]
pub struct AttachmentDecl {
    pub name: String,
    pub kind: AttachmentKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultisampleResolve {
    pub source: String,
    pub target: String,
}

#[derive(Debug, Clone)]
pub enum GraphicsOp {
    Pipeline(GraphicsPipelineDescriptor),
    MultisampleResolve(MultisampleResolve),
}

/// Operations of one subpass, keyed by id in the order they were added.
/// Pipelines get even ids and resolves odd ids, so the kind of an op can be
/// told from its id alone.
#[derive(Debug, Clone, Default)]
pub struct GraphicsOps {
    ops: BTreeMap<u32, GraphicsOp>,
    next_id: u32,
}

impl GraphicsOps {
    fn push(&mut self, op: GraphicsOp) -> u32 {
        let parity = match op {
            GraphicsOp::Pipeline(_) => 0,
            GraphicsOp::MultisampleResolve(_) => 1,
        };
        let id = if self.next_id % 2 == parity {
            self.next_id
        } else {
            self.next_id + 1
        };
        self.ops.insert(id, op);
        self.next_id = id + 1;
        id
    }

    pub fn is_pipeline(id: u32) -> bool {
        id % 2 == 0
    }

    pub fn pipeline(&self, id: u32) -> PassResult<&GraphicsPipelineDescriptor> {
        match self.ops.get(&id) {
            Some(GraphicsOp::Pipeline(descriptor)) => Ok(descriptor),
            Some(_) => Err(PassError::WrongOpKind {
                id,
                expected: "pipeline",
            }),
            None => Err(PassError::UnknownOp { id }),
        }
    }

    pub fn multisample_resolve(&self, id: u32) -> PassResult<&MultisampleResolve> {
        match self.ops.get(&id) {
            Some(GraphicsOp::MultisampleResolve(resolve)) => Ok(resolve),
            Some(_) => Err(PassError::WrongOpKind {
                id,
                expected: "multisample resolve",
            }),
            None => Err(PassError::UnknownOp { id }),
        }
    }

    pub fn ordered(&self) -> impl Iterator<Item = (u32, &GraphicsOp)> + '_ {
        self.ops.iter().map(|(id, op)| (*id, op))
    }

    pub fn pipelines(&self) -> impl Iterator<Item = (u32, &GraphicsPipelineDescriptor)> + '_ {
        self.ordered().filter_map(|(id, op)| match op {
            GraphicsOp::Pipeline(descriptor) => Some((id, descriptor)),
            GraphicsOp::MultisampleResolve(_) => None,
        })
    }

    pub fn resolves(&self) -> impl Iterator<Item = &MultisampleResolve> + '_ {
        self.ops.values().filter_map(|op| match op {
            GraphicsOp::MultisampleResolve(resolve) => Some(resolve),
            GraphicsOp::Pipeline(_) => None,
        })
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Attachment roles of one subpass.
#[derive(Debug, Clone, Default)]
pub struct GraphicsSubpass {
    pub colors: Vec<String>,
    pub depth_stencil: Option<String>,
    pub inputs: Vec<String>,
    pub ops: GraphicsOps,
}

#[derive(Debug, Clone)]
pub struct Dependency {
    pub from: SubpassRef,
    pub to: SubpassRef,
    pub attachments: Vec<String>,
}

pub struct GraphicsPassDescriptor {
    pass: PassDescriptor,
    attachments: Vec<AttachmentDecl>,
    subpasses: Vec<GraphicsSubpass>,
    dependencies: Vec<Dependency>,
}

impl GraphicsPassDescriptor {
    /// `sampled` are images read by shaders in this pass that are not
    /// attachments. They get a usage history but no attachment slot, and are
    /// transitioned by barriers recorded around the render pass.
    pub fn new(
        tracker: &UsageTracker<ImageUsage>,
        colors: Vec<ColorAttachment>,
        depth_stencils: Vec<DepthStencilAttachment>,
        sampled: Vec<Arc<AttachmentImage>>,
    ) -> PassResult<Self> {
        let mut attachments = Vec::with_capacity(colors.len() + depth_stencils.len());
        let mut images = Vec::with_capacity(attachments.capacity() + sampled.len());
        for color in colors {
            if color.image.is_depth_stencil() {
                return Err(PassError::InvalidUsageCombination {
                    category: "RenderTarget",
                    reason: format!(
                        "'{}' has depth stencil format {:?}",
                        color.image.name, color.image.format
                    ),
                });
            }
            attachments.push(AttachmentDecl {
                name: color.image.name.clone(),
                kind: AttachmentKind::Color(color.ops),
            });
            images.push(color.image);
        }
        for depth_stencil in depth_stencils {
            if !depth_stencil.image.is_depth_stencil() {
                return Err(PassError::InvalidUsageCombination {
                    category: "DepthStencil",
                    reason: format!(
                        "'{}' has color format {:?}",
                        depth_stencil.image.name, depth_stencil.image.format
                    ),
                });
            }
            attachments.push(AttachmentDecl {
                name: depth_stencil.image.name.clone(),
                kind: AttachmentKind::DepthStencil {
                    depth: depth_stencil.depth_ops,
                    stencil: depth_stencil.stencil_ops,
                },
            });
            images.push(depth_stencil.image);
        }
        images.extend(sampled);

        Ok(Self {
            pass: PassDescriptor::new(images, tracker)?,
            attachments,
            subpasses: Vec::new(),
            dependencies: Vec::new(),
        })
    }

    fn attachment(&self, name: &str) -> PassResult<&AttachmentDecl> {
        self.attachments
            .iter()
            .find(|attachment| attachment.name == name)
            .ok_or_else(|| PassError::UndeclaredAttachment { name: name.into() })
    }

    fn color_attachment(&self, name: &str) -> PassResult<()> {
        match self.attachment(name)?.kind {
            AttachmentKind::Color(_) => Ok(()),
            AttachmentKind::DepthStencil { .. } => Err(PassError::InvalidUsageCombination {
                category: "RenderTarget",
                reason: format!("'{name}' is a depth stencil attachment"),
            }),
        }
    }

    /// Nothing is recorded until [`SubpassBuilder::finish`] succeeds.
    pub fn begin_subpass(&mut self) -> SubpassBuilder<'_> {
        SubpassBuilder {
            pass: self,
            subpass: GraphicsSubpass::default(),
            usages: Vec::new(),
        }
    }

    pub fn num_subpasses(&self) -> u32 {
        self.pass.num_subpasses()
    }

    pub fn set_final_usage(&mut self, name: &str, usage: ImageUsage) -> PassResult<&mut Self> {
        self.pass.set_final_usage(name, usage)?;
        Ok(self)
    }

    /// `from` and `to` must be subpasses added so far, or `External`.
    pub fn add_dependency(
        &mut self,
        from: SubpassRef,
        to: SubpassRef,
        attachments: &[&str],
    ) -> PassResult<&mut Self> {
        for subpass in [from, to] {
            if let SubpassRef::Index(index) = subpass {
                if index >= self.num_subpasses() {
                    return Err(PassError::SubpassOutOfRange {
                        resource: attachments.join(", "),
                        subpass: index,
                        num_subpasses: self.num_subpasses(),
                    });
                }
            }
        }
        for name in attachments {
            self.attachment(name)?;
        }
        self.dependencies.push(Dependency {
            from,
            to,
            attachments: attachments.iter().map(|name| name.to_string()).collect(),
        });
        Ok(self)
    }

    fn is_attachment(&self, name: &str) -> bool {
        self.attachments.iter().any(|attachment| attachment.name == name)
    }

    /// A non-attachment image can only change layout before the render pass
    /// begins or after it ends, so every usage after its first must be one
    /// that needs no barrier.
    fn check_non_attachment_usages(&self) -> PassResult<()> {
        for image in self.pass.images() {
            if self.is_attachment(&image.image.name) {
                continue;
            }
            let history = &image.history;
            for (point, usage) in history.points().skip(1) {
                if sync::needs_synchronization(&history.usage_before(point), &usage) {
                    return Err(PassError::BarrierInsideRenderPass {
                        name: image.image.name.clone(),
                        subpass: point,
                    });
                }
            }
        }
        Ok(())
    }

    pub fn seal(self, tracker: &mut UsageTracker<ImageUsage>) -> PassResult<SealedGraphicsPass> {
        self.check_non_attachment_usages()?;
        for attachment in &self.attachments {
            let used = self.pass.image(&attachment.name)?.history.is_used_in_pass();
            if !used {
                log::warn!(
                    "Attachment '{}' is never used by any subpass",
                    attachment.name
                );
            }
        }
        Ok(SealedGraphicsPass {
            pass: self.pass.seal(tracker)?,
            attachments: self.attachments,
            subpasses: self.subpasses,
            dependencies: self.dependencies,
        })
    }
}

/// Collects the attachment roles and ops of the subpass being added.
pub struct SubpassBuilder<'a> {
    pass: &'a mut GraphicsPassDescriptor,
    subpass: GraphicsSubpass,
    usages: Vec<(String, ImageUsage)>,
}

impl SubpassBuilder<'_> {
    pub fn render_to(&mut self, name: &str) -> PassResult<&mut Self> {
        self.pass.color_attachment(name)?;
        self.subpass.colors.push(name.to_string());
        self.usages.push((name.to_string(), ImageUsage::render_target()));
        Ok(self)
    }

    pub fn depth_stencil(&mut self, name: &str, access: AccessMode) -> PassResult<&mut Self> {
        let usage = ImageUsage::depth_stencil(access)?;
        match self.pass.attachment(name)?.kind {
            AttachmentKind::DepthStencil { .. } => {}
            AttachmentKind::Color(_) => {
                return Err(PassError::InvalidUsageCombination {
                    category: "DepthStencil",
                    reason: format!("'{name}' is a color attachment"),
                });
            }
        }
        self.subpass.depth_stencil = Some(name.to_string());
        self.usages.push((name.to_string(), usage));
        Ok(self)
    }

    /// Reads the value a previous subpass wrote at the same pixel.
    pub fn read_input(&mut self, name: &str) -> PassResult<&mut Self> {
        self.pass.attachment(name)?;
        self.subpass.inputs.push(name.to_string());
        self.usages.push((name.to_string(), ImageUsage::input_attachment()));
        Ok(self)
    }

    /// Uses a non-attachment image of the pass, e.g. a sampled texture.
    pub fn use_image(&mut self, name: &str, usage: ImageUsage) -> PassResult<&mut Self> {
        if !self.pass.pass.contains(name) {
            return Err(PassError::UndeclaredAttachment { name: name.into() });
        }
        if self.pass.is_attachment(name) {
            return Err(PassError::InvalidUsageCombination {
                category: usage.category().name(),
                reason: format!("'{name}' is an attachment of this pass"),
            });
        }
        self.usages.push((name.to_string(), usage));
        Ok(self)
    }

    pub fn add_pipeline(&mut self, descriptor: GraphicsPipelineDescriptor) -> u32 {
        self.subpass.ops.push(GraphicsOp::Pipeline(descriptor))
    }

    /// Both images must be part of the pass, and `target` one of its color
    /// attachments. `source` must be rendered to by this subpass, which is
    /// checked when the subpass is finished.
    pub fn add_multisample_resolve(&mut self, source: &str, target: &str) -> PassResult<u32> {
        for name in [source, target] {
            if !self.pass.pass.contains(name) {
                return Err(PassError::UndeclaredAttachment { name: name.into() });
            }
        }
        let invalid = |reason: &'static str| PassError::InvalidResolve {
            source_name: source.into(),
            target: target.into(),
            reason,
        };
        if !matches!(self.pass.attachment(target)?.kind, AttachmentKind::Color(_)) {
            return Err(invalid("target is not a color attachment"));
        }
        if !self.pass.pass.image(source)?.image.is_multisampled() {
            return Err(invalid("source is not multisampled"));
        }
        if self.pass.pass.image(target)?.image.is_multisampled() {
            return Err(invalid("target is multisampled"));
        }

        Ok(self.subpass.ops.push(GraphicsOp::MultisampleResolve(
            MultisampleResolve {
                source: source.into(),
                target: target.into(),
            },
        )))
    }

    /// Records every usage at the new subpass index and returns it.
    pub fn finish(mut self) -> PassResult<u32> {
        for resolve in self.subpass.ops.resolves() {
            if !self.subpass.colors.contains(&resolve.source) {
                return Err(PassError::InvalidResolve {
                    source_name: resolve.source.clone(),
                    target: resolve.target.clone(),
                    reason: "source is not rendered to in this subpass",
                });
            }
        }

        let resolves = self.subpass.ops.resolves().cloned().collect::<Vec<_>>();
        for resolve in &resolves {
            self.usages
                .push((resolve.target.clone(), ImageUsage::multisample_resolve_target()));
        }

        let usages = self
            .usages
            .iter()
            .map(|(name, usage)| (name.as_str(), *usage))
            .collect::<Vec<_>>();
        let index = self.pass.pass.add_subpass(&usages)?;
        for resolve in resolves {
            self.pass
                .pass
                .image_mut(&resolve.target)?
                .history
                .add_resolve_source(index, resolve.source);
        }

        self.pass.subpasses.push(self.subpass);
        Ok(index)
    }
}

/// Graphics pass ready to be turned into driver tables.
#[derive(Debug)]
pub struct SealedGraphicsPass {
    pub pass: SealedPass,
    pub attachments: Vec<AttachmentDecl>,
    pub subpasses: Vec<GraphicsSubpass>,
    pub dependencies: Vec<Dependency>,
}

impl SealedGraphicsPass {
    pub fn attachment_images(&self) -> PassResult<Vec<&AttachmentImage>> {
        self.attachments
            .iter()
            .map(|attachment| Ok(self.pass.image(&attachment.name)?.image.as_ref()))
            .collect()
    }

    pub fn render_area(&self) -> PassResult<vk::Extent2D> {
        let first = self.attachments.first().ok_or(PassError::NoAttachments)?;
        Ok(self.pass.image(&first.name)?.image.extent)
    }
}

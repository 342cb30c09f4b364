use std::sync::Arc;

use crate::renderer::contexts::device_ctx::command_encoder::CommandRecorder;
use crate::renderer::contexts::device_ctx::queue::QueueFamilyIndices;
use crate::renderer::error::PassResult;
use crate::renderer::pass::barrier::{self, Barriers};
use crate::renderer::pass::{PassDescriptor, SealedPass};
use crate::renderer::resources::AttachmentImage;
use crate::renderer::sync;
use crate::renderer::usage::{ImageUsage, UsageTracker};

pub use crate::renderer::pass::barrier::PlannedBarrier;

/// Declares how each image is used by the subpasses of a compute pass.
pub struct ComputePassDescriptor {
    pass: PassDescriptor,
}

impl ComputePassDescriptor {
    pub fn new(
        images: Vec<Arc<AttachmentImage>>,
        tracker: &UsageTracker<ImageUsage>,
    ) -> PassResult<Self> {
        Ok(Self {
            pass: PassDescriptor::new(images, tracker)?,
        })
    }

    pub fn add_subpass(&mut self, usages: &[(&str, ImageUsage)]) -> PassResult<u32> {
        self.pass.add_subpass(usages)
    }

    pub fn use_across(
        &mut self,
        name: &str,
        start: u32,
        end: u32,
        usage: ImageUsage,
    ) -> PassResult<&mut Self> {
        self.pass.use_across(name, start, end, usage)?;
        Ok(self)
    }

    pub fn set_final_usage(&mut self, name: &str, usage: ImageUsage) -> PassResult<&mut Self> {
        self.pass.set_final_usage(name, usage)?;
        Ok(self)
    }

    pub fn num_subpasses(&self) -> u32 {
        self.pass.num_subpasses()
    }

    pub fn seal(self, tracker: &mut UsageTracker<ImageUsage>) -> PassResult<SealedComputePass> {
        Ok(SealedComputePass {
            pass: self.pass.seal(tracker)?,
        })
    }
}

#[derive(Debug)]
pub struct SealedComputePass {
    pub pass: SealedPass,
}

/// A sealed compute pass with the barriers each subpass needs worked out.
pub struct ComputePass {
    images: Vec<Arc<AttachmentImage>>,
    names: Vec<String>,
    subpass_barriers: Vec<Barriers>,
    final_barriers: Barriers,
}

impl ComputePass {
    pub fn new(sealed: SealedComputePass, queues: &QueueFamilyIndices) -> Self {
        let pass = sealed.pass;
        let mut subpass_barriers = vec![Barriers::new(); pass.num_subpasses as usize];
        let mut final_barriers = Barriers::new();

        for (index, image) in pass.images.iter().enumerate() {
            let history = &image.history;
            for (point, usage) in history.points() {
                let prev = history.usage_before(point);
                if sync::needs_synchronization(&prev, &usage) {
                    subpass_barriers[point as usize]
                        .push(PlannedBarrier::between(index, queues, &prev, &usage));
                }
            }

            if let Some(final_usage) = history.final_usage() {
                let last = history.usage_before(pass.num_subpasses);
                if last != final_usage {
                    final_barriers.push(PlannedBarrier::between(index, queues, &last, &final_usage));
                }
            }
        }

        let (images, names) = pass
            .images
            .into_iter()
            .map(|image| (image.image, image.history.resource_name().to_string()))
            .unzip();

        Self {
            images,
            names,
            subpass_barriers,
            final_barriers,
        }
    }

    pub fn num_subpasses(&self) -> u32 {
        self.subpass_barriers.len() as u32
    }

    pub fn barriers_before(&self, subpass: u32) -> &[PlannedBarrier] {
        self.subpass_barriers
            .get(subpass as usize)
            .map(|barriers| barriers.as_slice())
            .unwrap_or_default()
    }

    pub fn final_barriers(&self) -> &[PlannedBarrier] {
        &self.final_barriers
    }

    pub fn image_name(&self, image: usize) -> Option<&str> {
        self.names.get(image).map(String::as_str)
    }

    /// Records every subpass in order, preceded by its barriers, then the
    /// transitions to each image's final usage. `image_index` selects which
    /// backing image a multiple-image resource uses this time.
    pub fn run<R: CommandRecorder>(
        &self,
        recorder: &mut R,
        image_index: usize,
        mut op: impl FnMut(&mut R, u32),
    ) -> PassResult<()> {
        for (subpass, barriers) in self.subpass_barriers.iter().enumerate() {
            barrier::record_barriers(recorder, &self.images, image_index, barriers)?;
            op(recorder, subpass as u32);
        }
        barrier::record_barriers(recorder, &self.images, image_index, &self.final_barriers)
    }
}

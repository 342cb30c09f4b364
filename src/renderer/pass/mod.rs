//! Declarative pass builders. A descriptor accumulates per-subpass image
//! usages and is consumed by `seal`, after which it can no longer change.

pub mod barrier;
pub mod compute;
pub mod graphics;
pub mod pass_util;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use ash::vk;

use crate::renderer::error::{PassError, PassResult};
use crate::renderer::resources::AttachmentImage;
use crate::renderer::usage::{ImageUsage, UsageHistory, UsageTracker};

/// Either a subpass of this pass, or whatever runs before or after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubpassRef {
    External,
    Index(u32),
}

impl SubpassRef {
    pub fn to_vk(self) -> u32 {
        match self {
            Self::External => vk::SUBPASS_EXTERNAL,
            Self::Index(index) => index,
        }
    }
}

impl From<u32> for SubpassRef {
    fn from(index: u32) -> Self {
        Self::Index(index)
    }
}

/// An image taking part in a pass, with its usage timeline for this pass.
#[derive(Debug, Clone)]
pub struct PassImage {
    pub image: Arc<AttachmentImage>,
    pub history: UsageHistory<ImageUsage>,
}

/// Bookkeeping shared by graphics and compute pass descriptors.
#[derive(Debug)]
pub struct PassDescriptor {
    images: Vec<PassImage>,
    index: HashMap<String, usize>,
    num_subpasses: u32,
}

impl PassDescriptor {
    /// Every image starts from the usage `tracker` currently holds for it.
    pub fn new(
        images: Vec<Arc<AttachmentImage>>,
        tracker: &UsageTracker<ImageUsage>,
    ) -> PassResult<Self> {
        let mut pass = Self {
            images: Vec::with_capacity(images.len()),
            index: HashMap::with_capacity(images.len()),
            num_subpasses: 0,
        };
        for image in images {
            if pass.index.contains_key(&image.name) {
                return Err(PassError::DuplicateResource {
                    name: image.name.clone(),
                });
            }
            let history = tracker.history_for(&image.name)?;
            pass.index.insert(image.name.clone(), pass.images.len());
            pass.images.push(PassImage { image, history });
        }
        Ok(pass)
    }

    /// Records each usage at the next subpass index and returns that index.
    /// Everything is checked first, so a failure records nothing.
    pub fn add_subpass(&mut self, usages: &[(&str, ImageUsage)]) -> PassResult<u32> {
        let subpass = self.num_subpasses;
        let mut seen = HashSet::with_capacity(usages.len());
        let mut indices = Vec::with_capacity(usages.len());
        for (name, _) in usages {
            let index = self.declared_index(name)?;
            if !seen.insert(index) || self.images[index].history.usage_at(subpass).is_some() {
                return Err(PassError::DuplicateUsageAtPoint {
                    resource: name.to_string(),
                    point: subpass,
                });
            }
            indices.push(index);
        }

        for (index, (_, usage)) in indices.into_iter().zip(usages) {
            self.images[index].history.add_usage(subpass, *usage)?;
        }
        self.num_subpasses += 1;
        Ok(subpass)
    }

    /// Uses `name` the same way in every subpass of `[start, end]`.
    pub fn use_across(
        &mut self,
        name: &str,
        start: u32,
        end: u32,
        usage: ImageUsage,
    ) -> PassResult<()> {
        let index = self.declared_index(name)?;
        self.images[index].history.add_usage_range(start, end, usage)?;
        Ok(())
    }

    pub fn set_final_usage(&mut self, name: &str, usage: ImageUsage) -> PassResult<()> {
        let index = self.tracked_index(name)?;
        self.images[index].history.set_final_usage(usage)?;
        Ok(())
    }

    pub fn num_subpasses(&self) -> u32 {
        self.num_subpasses
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn image(&self, name: &str) -> PassResult<&PassImage> {
        Ok(&self.images[self.tracked_index(name)?])
    }

    pub fn images(&self) -> &[PassImage] {
        &self.images
    }

    pub(crate) fn image_mut(&mut self, name: &str) -> PassResult<&mut PassImage> {
        let index = self.declared_index(name)?;
        Ok(&mut self.images[index])
    }

    fn declared_index(&self, name: &str) -> PassResult<usize> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| PassError::UndeclaredAttachment { name: name.into() })
    }

    fn tracked_index(&self, name: &str) -> PassResult<usize> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| PassError::UnknownResource { name: name.into() })
    }

    /// Checks every recorded point names an existing subpass, then writes
    /// each image's terminal usage back to `tracker`.
    pub fn seal(self, tracker: &mut UsageTracker<ImageUsage>) -> PassResult<SealedPass> {
        for image in &self.images {
            if let Some(point) = image.history.last_point() {
                if point >= self.num_subpasses {
                    return Err(PassError::SubpassOutOfRange {
                        resource: image.image.name.clone(),
                        subpass: point,
                        num_subpasses: self.num_subpasses,
                    });
                }
            }
        }
        for image in &self.images {
            tracker.update_usage(&image.image.name, image.history.last_usage())?;
        }
        Ok(SealedPass {
            images: self.images,
            index: self.index,
            num_subpasses: self.num_subpasses,
        })
    }
}

/// A pass whose usages are final.
#[derive(Debug)]
pub struct SealedPass {
    pub images: Vec<PassImage>,
    index: HashMap<String, usize>,
    pub num_subpasses: u32,
}

impl SealedPass {
    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn image(&self, name: &str) -> PassResult<&PassImage> {
        self.position(name)
            .map(|index| &self.images[index])
            .ok_or_else(|| PassError::UnknownResource { name: name.into() })
    }
}

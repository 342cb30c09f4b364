use std::sync::Arc;
use ash::vk;
use color_eyre::Result;

use crate::renderer::contexts::device_ctx::PassDevice;
use crate::renderer::error::{PassError, PassResult};
use crate::renderer::resources::{AttachmentImage, ImageBacking};

/// One framebuffer per image of the multiple-image attachments, or a single
/// framebuffer when every attachment has one image.
pub fn framebuffer_count(attachments: &[&AttachmentImage]) -> PassResult<usize> {
    let mut count = None;
    for attachment in attachments {
        if let ImageBacking::Multiple(images) = &attachment.backing {
            match count {
                None => count = Some(images.len()),
                Some(expected) if expected != images.len() => {
                    return Err(PassError::FramebufferCountMismatch {
                        name: attachment.name.clone(),
                        count: images.len(),
                        expected,
                    });
                }
                Some(_) => {}
            }
        }
    }
    Ok(count.unwrap_or(1))
}

/// Image views and framebuffers of a render pass.
///
/// Views are created once per physical image. Framebuffer `i` binds the one
/// view of each single attachment and the `i`-th view of each multiple one.
pub struct Framebuffers<D: PassDevice> {
    /// Per attachment, one view per backing image.
    views: Vec<Vec<vk::ImageView>>,
    /// Per framebuffer, the views it binds in attachment order.
    bindings: Vec<Vec<vk::ImageView>>,
    framebuffers: Vec<vk::Framebuffer>,

    device: Arc<D>,
}

impl<D: PassDevice> Framebuffers<D> {
    pub fn new(
        device: Arc<D>,
        render_pass: vk::RenderPass,
        attachments: &[&AttachmentImage],
        extent: vk::Extent2D,
    ) -> Result<Self> {
        let count = framebuffer_count(attachments)?;
        let layers = attachments.first().map_or(1, |attachment| attachment.layers);

        // Anything created before a failure is destroyed when `this` drops.
        let mut this = Self {
            views: Vec::with_capacity(attachments.len()),
            bindings: Vec::with_capacity(count),
            framebuffers: Vec::with_capacity(count),
            device,
        };

        for attachment in attachments {
            this.views.push(Vec::with_capacity(attachment.image_count()));
            for image in attachment.images() {
                let view = this.device.create_image_view(attachment, *image)?;
                if let Some(views) = this.views.last_mut() {
                    views.push(view);
                }
            }
        }

        for index in 0..count {
            let binding = attachments
                .iter()
                .zip(&this.views)
                .map(|(attachment, views)| match attachment.backing {
                    ImageBacking::Single(_) => views[0],
                    ImageBacking::Multiple(_) => views[index],
                })
                .collect::<Vec<_>>();
            let framebuffer = this
                .device
                .create_framebuffer(render_pass, &binding, extent, layers)?;
            this.framebuffers.push(framebuffer);
            this.bindings.push(binding);
        }

        log::info!(
            "Created {} framebuffers over {} image views",
            this.framebuffers.len(),
            this.views.iter().map(Vec::len).sum::<usize>(),
        );

        Ok(this)
    }

    pub fn len(&self) -> usize {
        self.framebuffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.framebuffers.is_empty()
    }

    pub fn get(&self, index: usize) -> PassResult<vk::Framebuffer> {
        self.framebuffers
            .get(index)
            .copied()
            .ok_or_else(|| PassError::FramebufferIndexOutOfRange {
                name: "framebuffers".into(),
                index,
                count: self.framebuffers.len(),
            })
    }

    /// Views bound to framebuffer `index`, in attachment order.
    pub fn views_of(&self, index: usize) -> Option<&[vk::ImageView]> {
        self.bindings.get(index).map(Vec::as_slice)
    }

    /// Destroys everything owned. Calling it again does nothing.
    pub fn release(&mut self) {
        if self.framebuffers.is_empty() && self.views.is_empty() {
            return;
        }
        for framebuffer in self.framebuffers.drain(..) {
            self.device.destroy_framebuffer(framebuffer);
        }
        for view in self.views.drain(..).flatten() {
            self.device.destroy_image_view(view);
        }
        self.bindings.clear();
        log::info!("Released framebuffers");
    }
}

impl<D: PassDevice> Drop for Framebuffers<D> {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::testing::{
        DeviceCall, FakeDevice, color_image, depth_image, swapchain_image,
    };
    use ash::vk::Handle;

    const EXTENT: vk::Extent2D = vk::Extent2D {
        width: 800,
        height: 600,
    };

    #[test]
    fn test_count_defaults_to_one() {
        let color = color_image("color");
        let depth = depth_image("depth");
        assert_eq!(framebuffer_count(&[&*color, &*depth]).unwrap(), 1);
    }

    #[test]
    fn test_count_mismatch_names_offender() {
        let first = swapchain_image("first", 3);
        let second = swapchain_image("second", 2);
        assert_eq!(
            framebuffer_count(&[&*first, &*second]).unwrap_err(),
            PassError::FramebufferCountMismatch {
                name: "second".into(),
                count: 2,
                expected: 3,
            }
        );
    }

    #[test]
    fn test_single_attachment_view_shared() {
        let device = Arc::new(FakeDevice::new());
        let color = swapchain_image("color", 3);
        let depth = depth_image("depth");
        let render_pass = vk::RenderPass::from_raw(1);

        let framebuffers =
            Framebuffers::new(device.clone(), render_pass, &[&*color, &*depth], EXTENT).unwrap();

        assert_eq!(framebuffers.len(), 3);
        assert_eq!(device.count(|call| matches!(call, DeviceCall::CreateImageView { .. })), 4);

        let first = framebuffers.views_of(0).unwrap();
        let second = framebuffers.views_of(1).unwrap();
        assert_eq!(first[1], second[1]);
        assert_ne!(first[0], second[0]);
        assert_eq!(framebuffers.views_of(2).unwrap()[1], first[1]);
    }

    #[test]
    fn test_mismatch_creates_nothing() {
        let device = Arc::new(FakeDevice::new());
        let first = swapchain_image("first", 3);
        let second = swapchain_image("second", 2);

        let result = Framebuffers::new(
            device.clone(),
            vk::RenderPass::from_raw(1),
            &[&*first, &*second],
            EXTENT,
        );
        let err = result.err().unwrap();
        assert!(matches!(
            err.downcast_ref::<PassError>(),
            Some(PassError::FramebufferCountMismatch { .. })
        ));
        assert!(device.calls().is_empty());
    }

    #[test]
    fn test_failure_destroys_partial_objects() {
        let device = Arc::new(FakeDevice::failing_framebuffer_after(1));
        let color = swapchain_image("color", 2);

        let result = Framebuffers::new(device.clone(), vk::RenderPass::from_raw(1), &[&*color], EXTENT);
        assert!(result.is_err());
        assert_eq!(device.count(|call| matches!(call, DeviceCall::DestroyFramebuffer(_))), 1);
        assert_eq!(device.count(|call| matches!(call, DeviceCall::DestroyImageView(_))), 2);
    }

    #[test]
    fn test_release_is_idempotent() {
        let device = Arc::new(FakeDevice::new());
        let color = color_image("color");
        let mut framebuffers =
            Framebuffers::new(device.clone(), vk::RenderPass::from_raw(1), &[&*color], EXTENT).unwrap();

        framebuffers.release();
        framebuffers.release();
        drop(framebuffers);
        assert_eq!(device.count(|call| matches!(call, DeviceCall::DestroyFramebuffer(_))), 1);
        assert_eq!(device.count(|call| matches!(call, DeviceCall::DestroyImageView(_))), 1);
    }
}

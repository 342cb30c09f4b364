use ash::vk;

use crate::renderer::config::RenderConfig;
use crate::renderer::pass::graphics::LoadStoreOps;

/// Cleared every frame. A multisampled target is resolved before the pass
/// ends, so its samples are not stored.
pub fn render_target_ops(config: &RenderConfig) -> LoadStoreOps {
    LoadStoreOps {
        load_op: vk::AttachmentLoadOp::CLEAR,
        store_op: if config.is_multisampled() {
            vk::AttachmentStoreOp::DONT_CARE
        } else {
            vk::AttachmentStoreOp::STORE
        },
    }
}

pub fn resolve_target_ops() -> LoadStoreOps {
    LoadStoreOps {
        load_op: vk::AttachmentLoadOp::DONT_CARE,
        store_op: vk::AttachmentStoreOp::STORE,
    }
}

pub fn depth_ops() -> LoadStoreOps {
    LoadStoreOps {
        load_op: vk::AttachmentLoadOp::CLEAR,
        store_op: vk::AttachmentStoreOp::DONT_CARE,
    }
}

/// For attachments that continue what an earlier pass rendered.
pub fn load_and_keep() -> LoadStoreOps {
    LoadStoreOps {
        load_op: vk::AttachmentLoadOp::LOAD,
        store_op: vk::AttachmentStoreOp::STORE,
    }
}

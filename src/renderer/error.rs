use thiserror::Error;

pub type PassResult<T> = Result<T, PassError>;

/// Mistakes in how a caller declared resource usages or built a pass.
///
/// None of these are transient. Retrying the same call with the same
/// declarations reproduces the same error, so callers abort the build.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PassError {
    #[error("invalid {category} usage: {reason}")]
    InvalidUsageCombination {
        category: &'static str,
        reason: String,
    },

    #[error("already specified usage for '{resource}' at point {point}")]
    DuplicateUsageAtPoint { resource: String, point: u32 },

    #[error("invalid point range [{start}, {end}] for '{resource}'")]
    InvalidPointRange {
        resource: String,
        start: u32,
        end: u32,
    },

    #[error("unrecognized resource '{name}'")]
    UnknownResource { name: String },

    #[error("attachment '{name}' not declared in this pass")]
    UndeclaredAttachment { name: String },

    #[error("resource '{name}' added to the pass more than once")]
    DuplicateResource { name: String },

    #[error(
        "number of images ({count}) in '{name}' mismatches with other attachments (found {expected})"
    )]
    FramebufferCountMismatch {
        name: String,
        count: usize,
        expected: usize,
    },

    #[error("already tracking resource '{name}'")]
    AlreadyTracked { name: String },

    #[error("already specified final usage for '{resource}'")]
    AlreadySpecifiedFinalUsage { resource: String },

    #[error("subpass {subpass} out of range [0, {num_subpasses}) for '{resource}'")]
    SubpassOutOfRange {
        resource: String,
        subpass: u32,
        num_subpasses: u32,
    },

    #[error("no graphics op with id {id}")]
    UnknownOp { id: u32 },

    #[error("graphics op {id} is not a {expected}")]
    WrongOpKind { id: u32, expected: &'static str },

    #[error("cannot resolve '{source_name}' into '{target}': {reason}")]
    InvalidResolve {
        source_name: String,
        target: String,
        reason: &'static str,
    },

    #[error("'{name}' needs a barrier before subpass {subpass}, inside a render pass")]
    BarrierInsideRenderPass { name: String, subpass: u32 },

    #[error("render pass has no attachments")]
    NoAttachments,

    #[error("image index {index} out of range for '{name}' ({count} images)")]
    FramebufferIndexOutOfRange {
        name: String,
        index: usize,
        count: usize,
    },
}

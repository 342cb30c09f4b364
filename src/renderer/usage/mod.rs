//! Declarations of how images and buffers are used at each point of a pass.

pub mod buffer_usage;
pub mod history;
pub mod image_usage;
pub mod tracker;

pub use buffer_usage::{BufferCategory, BufferUsage};
pub use history::UsageHistory;
pub use image_usage::{ImageCategory, ImageUsage};
pub use tracker::UsageTracker;

/// Whether a usage reads and/or writes the resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessMode {
    NoAccess,
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

impl AccessMode {
    pub fn reads(self) -> bool {
        matches!(self, Self::ReadOnly | Self::ReadWrite)
    }

    pub fn writes(self) -> bool {
        matches!(self, Self::WriteOnly | Self::ReadWrite)
    }
}

/// Where in the pipeline a resource is touched.
///
/// `Unspecified` differs from `NoLocation`: depth stencil attachments are
/// not written by the fragment shader, they have their own fixed-function
/// stages, so they are "somewhere specific" rather than "nowhere".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessLocation {
    NoLocation,
    Host,
    VertexStage,
    FragmentStage,
    ComputeStage,
    Unspecified,
}

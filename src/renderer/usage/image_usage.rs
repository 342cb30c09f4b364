use crate::renderer::error::{PassError, PassResult};
use crate::renderer::usage::{AccessLocation, AccessMode};

/// Kinds of image usage the pass builders know how to synchronize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageCategory {
    /// Content of the image is irrelevant.
    NoUsage,
    /// Color attachment.
    RenderTarget,
    DepthStencil,
    /// Single sample image that a multisample image resolves into.
    MultisampleResolveTarget,
    /// Presented to screen.
    Presentation,
    /// Storage image.
    LinearAccess,
    /// Only the value stored at the same pixel is read.
    InputAttachment,
    /// Sampled as texture.
    Sampled,
    /// Source or destination of a copy or blit within the device.
    Transfer,
}

impl ImageCategory {
    pub fn name(self) -> &'static str {
        match self {
            Self::NoUsage => "NoUsage",
            Self::RenderTarget => "RenderTarget",
            Self::DepthStencil => "DepthStencil",
            Self::MultisampleResolveTarget => "MultisampleResolveTarget",
            Self::Presentation => "Presentation",
            Self::LinearAccess => "LinearAccess",
            Self::InputAttachment => "InputAttachment",
            Self::Sampled => "Sampled",
            Self::Transfer => "Transfer",
        }
    }
}

/// Describes one point-in-time use of an image.
///
/// Fields are private so that the factories below are the only way to get
/// one, and every constructed value satisfies its category's constraints.
/// Equality ignores `high_precision`, which only affects format selection.
#[derive(Debug, Clone, Copy)]
pub struct ImageUsage {
    category: ImageCategory,
    access_mode: AccessMode,
    access_location: AccessLocation,
    high_precision: bool,
}

impl ImageUsage {
    fn new(
        category: ImageCategory,
        access_mode: AccessMode,
        access_location: AccessLocation,
    ) -> PassResult<Self> {
        let invalid = |reason: String| PassError::InvalidUsageCombination {
            category: category.name(),
            reason,
        };

        match category {
            ImageCategory::DepthStencil if access_mode == AccessMode::NoAccess => {
                return Err(invalid("must specify access mode".into()));
            }
            ImageCategory::LinearAccess | ImageCategory::Sampled => {
                if access_mode == AccessMode::NoAccess {
                    return Err(invalid("must specify access mode".into()));
                }
                if !matches!(
                    access_location,
                    AccessLocation::Host
                        | AccessLocation::FragmentStage
                        | AccessLocation::ComputeStage
                ) {
                    return Err(invalid(format!(
                        "access location must be Host, FragmentStage or ComputeStage, got {:?}",
                        access_location,
                    )));
                }
            }
            ImageCategory::Transfer => {
                if matches!(access_mode, AccessMode::NoAccess | AccessMode::ReadWrite) {
                    return Err(invalid(format!(
                        "access mode must be ReadOnly or WriteOnly, got {:?}",
                        access_mode,
                    )));
                }
            }
            _ => {}
        }

        Ok(Self {
            category,
            access_mode,
            access_location,
            high_precision: false,
        })
    }

    const fn fixed(
        category: ImageCategory,
        access_mode: AccessMode,
        access_location: AccessLocation,
    ) -> Self {
        Self {
            category,
            access_mode,
            access_location,
            high_precision: false,
        }
    }

    pub const fn none() -> Self {
        Self::fixed(ImageCategory::NoUsage, AccessMode::NoAccess, AccessLocation::NoLocation)
    }

    pub const fn render_target() -> Self {
        Self::fixed(ImageCategory::RenderTarget, AccessMode::ReadWrite, AccessLocation::Unspecified)
    }

    pub fn depth_stencil(access_mode: AccessMode) -> PassResult<Self> {
        Self::new(ImageCategory::DepthStencil, access_mode, AccessLocation::Unspecified)
    }

    pub const fn multisample_resolve_target() -> Self {
        Self::fixed(
            ImageCategory::MultisampleResolveTarget,
            AccessMode::WriteOnly,
            AccessLocation::Unspecified,
        )
    }

    pub const fn presentation() -> Self {
        Self::fixed(ImageCategory::Presentation, AccessMode::ReadOnly, AccessLocation::Unspecified)
    }

    pub fn linear_access(access_mode: AccessMode, location: AccessLocation) -> PassResult<Self> {
        Self::new(ImageCategory::LinearAccess, access_mode, location)
    }

    pub fn linear_access_in_compute(access_mode: AccessMode) -> PassResult<Self> {
        Self::linear_access(access_mode, AccessLocation::ComputeStage)
    }

    pub fn sampled(location: AccessLocation) -> PassResult<Self> {
        Self::new(ImageCategory::Sampled, AccessMode::ReadOnly, location)
    }

    pub const fn sampled_in_fragment() -> Self {
        Self::fixed(ImageCategory::Sampled, AccessMode::ReadOnly, AccessLocation::FragmentStage)
    }

    pub const fn input_attachment() -> Self {
        Self::fixed(
            ImageCategory::InputAttachment,
            AccessMode::ReadOnly,
            AccessLocation::FragmentStage,
        )
    }

    pub fn transfer(access_mode: AccessMode) -> PassResult<Self> {
        Self::new(ImageCategory::Transfer, access_mode, AccessLocation::Unspecified)
    }

    pub const fn transfer_source() -> Self {
        Self::fixed(ImageCategory::Transfer, AccessMode::ReadOnly, AccessLocation::Unspecified)
    }

    pub const fn transfer_destination() -> Self {
        Self::fixed(ImageCategory::Transfer, AccessMode::WriteOnly, AccessLocation::Unspecified)
    }

    /// Most images only need 8-bit channels. Asks for 16-bit floats instead.
    pub const fn with_high_precision(mut self) -> Self {
        self.high_precision = true;
        self
    }

    pub fn category(&self) -> ImageCategory {
        self.category
    }

    pub fn access_mode(&self) -> AccessMode {
        self.access_mode
    }

    pub fn access_location(&self) -> AccessLocation {
        self.access_location
    }

    pub fn high_precision(&self) -> bool {
        self.high_precision
    }

    pub fn is_attachment_usage(&self) -> bool {
        matches!(
            self.category,
            ImageCategory::RenderTarget
                | ImageCategory::DepthStencil
                | ImageCategory::MultisampleResolveTarget
                | ImageCategory::InputAttachment
        )
    }
}

impl Default for ImageUsage {
    fn default() -> Self {
        Self::none()
    }
}

impl PartialEq for ImageUsage {
    fn eq(&self, other: &Self) -> bool {
        self.category == other.category
            && self.access_mode == other.access_mode
            && self.access_location == other.access_location
    }
}

impl Eq for ImageUsage {}

/// Returns true if any of `usages` is linear access.
pub fn is_linear_accessed(usages: &[ImageUsage]) -> bool {
    usages
        .iter()
        .any(|usage| usage.category == ImageCategory::LinearAccess)
}

pub fn uses_high_precision(usages: &[ImageUsage]) -> bool {
    usages.iter().any(|usage| usage.high_precision)
}

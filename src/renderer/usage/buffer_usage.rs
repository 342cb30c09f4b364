use crate::renderer::error::{PassError, PassResult};
use crate::renderer::usage::{AccessLocation, AccessMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferCategory {
    NoUsage,
    VertexOnly,
    IndexOnly,
    IndexAndVertex,
    Uniform,
    Transfer,
}

/// Describes one point-in-time use of a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferUsage {
    category: BufferCategory,
    access_mode: AccessMode,
    access_location: AccessLocation,
}

impl BufferUsage {
    const fn fixed(
        category: BufferCategory,
        access_mode: AccessMode,
        access_location: AccessLocation,
    ) -> Self {
        Self {
            category,
            access_mode,
            access_location,
        }
    }

    pub const fn none() -> Self {
        Self::fixed(BufferCategory::NoUsage, AccessMode::NoAccess, AccessLocation::NoLocation)
    }

    pub const fn vertex_only() -> Self {
        Self::fixed(BufferCategory::VertexOnly, AccessMode::ReadOnly, AccessLocation::VertexStage)
    }

    pub const fn index_only() -> Self {
        Self::fixed(BufferCategory::IndexOnly, AccessMode::ReadOnly, AccessLocation::VertexStage)
    }

    pub const fn index_and_vertex() -> Self {
        Self::fixed(
            BufferCategory::IndexAndVertex,
            AccessMode::ReadOnly,
            AccessLocation::VertexStage,
        )
    }

    pub fn uniform(location: AccessLocation) -> PassResult<Self> {
        match location {
            AccessLocation::VertexStage
            | AccessLocation::FragmentStage
            | AccessLocation::ComputeStage => Ok(Self::fixed(
                BufferCategory::Uniform,
                AccessMode::ReadOnly,
                location,
            )),
            other => Err(PassError::InvalidUsageCombination {
                category: "Uniform",
                reason: format!(
                    "access location must be VertexStage, FragmentStage or ComputeStage, got {:?}",
                    other,
                ),
            }),
        }
    }

    pub const fn transfer_source() -> Self {
        Self::fixed(BufferCategory::Transfer, AccessMode::ReadOnly, AccessLocation::Unspecified)
    }

    pub const fn transfer_destination() -> Self {
        Self::fixed(BufferCategory::Transfer, AccessMode::WriteOnly, AccessLocation::Unspecified)
    }

    pub fn category(&self) -> BufferCategory {
        self.category
    }

    pub fn access_mode(&self) -> AccessMode {
        self.access_mode
    }

    pub fn access_location(&self) -> AccessLocation {
        self.access_location
    }
}

impl Default for BufferUsage {
    fn default() -> Self {
        Self::none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::vertex(AccessLocation::VertexStage)]
    #[case::fragment(AccessLocation::FragmentStage)]
    #[case::compute(AccessLocation::ComputeStage)]
    fn test_uniform_accepts_shader_stages(#[case] location: AccessLocation) {
        let usage = BufferUsage::uniform(location).unwrap();
        assert_eq!(usage.category(), BufferCategory::Uniform);
        assert_eq!(usage.access_mode(), AccessMode::ReadOnly);
        assert_eq!(usage.access_location(), location);
    }

    #[rstest]
    #[case::nowhere(AccessLocation::NoLocation)]
    #[case::host(AccessLocation::Host)]
    #[case::unspecified(AccessLocation::Unspecified)]
    fn test_uniform_rejects_other_locations(#[case] location: AccessLocation) {
        assert!(matches!(
            BufferUsage::uniform(location),
            Err(PassError::InvalidUsageCombination { category: "Uniform", .. })
        ));
    }

    #[test]
    fn test_vertex_and_index_differ() {
        assert_ne!(BufferUsage::vertex_only(), BufferUsage::index_only());
        assert_ne!(BufferUsage::index_only(), BufferUsage::index_and_vertex());
        assert_eq!(BufferUsage::default(), BufferUsage::none());
    }
}

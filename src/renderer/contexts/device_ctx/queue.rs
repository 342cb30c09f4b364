use ash::vk;

/// Kind of queue a usage needs to be owned by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueClass {
    Graphics,
    Compute,
}

/// Queue family indices picked at device creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueFamilyIndices {
    pub graphics: u32,
    pub compute: u32,
}

impl QueueFamilyIndices {
    pub fn new(graphics: u32, compute: u32) -> Self {
        Self { graphics, compute }
    }

    /// Both classes served by the same family.
    pub fn unified(index: u32) -> Self {
        Self::new(index, index)
    }

    /// Picks the first family supporting each queue class.
    pub fn find(families: &[vk::QueueFamilyProperties]) -> Option<Self> {
        let supports = |flag: vk::QueueFlags| {
            families
                .iter()
                .position(|family| family.queue_count > 0 && family.queue_flags.contains(flag))
                .map(|index| index as u32)
        };
        Some(Self {
            graphics: supports(vk::QueueFlags::GRAPHICS)?,
            compute: supports(vk::QueueFlags::COMPUTE)?,
        })
    }

    pub fn index_of(&self, class: QueueClass) -> u32 {
        match class {
            QueueClass::Graphics => self.graphics,
            QueueClass::Compute => self.compute,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn family(flags: vk::QueueFlags) -> vk::QueueFamilyProperties {
        vk::QueueFamilyProperties::default()
            .queue_flags(flags)
            .queue_count(1)
    }

    #[test]
    fn test_find_first_matching_family() {
        let families = [
            family(vk::QueueFlags::TRANSFER),
            family(vk::QueueFlags::COMPUTE),
            family(vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE),
        ];
        let indices = QueueFamilyIndices::find(&families).unwrap();
        assert_eq!(indices.index_of(QueueClass::Graphics), 2);
        assert_eq!(indices.index_of(QueueClass::Compute), 1);
    }

    #[test]
    fn test_find_requires_graphics() {
        let families = [family(vk::QueueFlags::COMPUTE)];
        assert!(QueueFamilyIndices::find(&families).is_none());
    }
}

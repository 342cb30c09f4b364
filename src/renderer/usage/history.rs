use std::collections::BTreeMap;

use crate::renderer::error::{PassError, PassResult};

/// Timeline of how one resource is used across the subpasses of a pass.
///
/// Points need not be contiguous. `initial` is the usage before the pass
/// starts and `final_usage`, when set, is the usage the resource should be
/// left in after the pass.
#[derive(Debug, Clone)]
pub struct UsageHistory<U: Copy> {
    resource_name: String,
    initial: U,
    usages: BTreeMap<u32, U>,
    final_usage: Option<U>,
    resolve_sources: BTreeMap<u32, String>,
}

impl<U: Copy> UsageHistory<U> {
    pub fn new(resource_name: impl Into<String>, initial: U) -> Self {
        Self {
            resource_name: resource_name.into(),
            initial,
            usages: BTreeMap::new(),
            final_usage: None,
            resolve_sources: BTreeMap::new(),
        }
    }

    pub fn add_usage(&mut self, point: u32, usage: U) -> PassResult<&mut Self> {
        if self.usages.contains_key(&point) {
            return Err(PassError::DuplicateUsageAtPoint {
                resource: self.resource_name.clone(),
                point,
            });
        }
        self.usages.insert(point, usage);
        Ok(self)
    }

    /// Adds `usage` at every point in `[start, end]`.
    pub fn add_usage_range(&mut self, start: u32, end: u32, usage: U) -> PassResult<&mut Self> {
        if start > end {
            return Err(PassError::InvalidPointRange {
                resource: self.resource_name.clone(),
                start,
                end,
            });
        }
        for point in start..=end {
            self.add_usage(point, usage)?;
        }
        Ok(self)
    }

    /// Records that `source` is resolved into this resource at `point`.
    pub fn add_resolve_source(&mut self, point: u32, source: impl Into<String>) -> &mut Self {
        self.resolve_sources.insert(point, source.into());
        self
    }

    pub fn set_final_usage(&mut self, usage: U) -> PassResult<&mut Self> {
        if self.final_usage.is_some() {
            return Err(PassError::AlreadySpecifiedFinalUsage {
                resource: self.resource_name.clone(),
            });
        }
        self.final_usage = Some(usage);
        Ok(self)
    }

    pub fn resource_name(&self) -> &str {
        &self.resource_name
    }

    pub fn initial_usage(&self) -> U {
        self.initial
    }

    pub fn final_usage(&self) -> Option<U> {
        self.final_usage
    }

    pub fn usage_at(&self, point: u32) -> Option<U> {
        self.usages.get(&point).copied()
    }

    /// Latest usage strictly before `point`, falling back to the initial usage.
    pub fn usage_before(&self, point: u32) -> U {
        self.usages
            .range(..point)
            .next_back()
            .map(|(_, usage)| *usage)
            .unwrap_or(self.initial)
    }

    /// Earliest usage strictly after `point`, falling back to the terminal usage.
    pub fn usage_after(&self, point: u32) -> U {
        self.usages
            .range(point.saturating_add(1)..)
            .next()
            .map(|(_, usage)| *usage)
            .unwrap_or_else(|| self.last_usage())
    }

    /// Usage the resource is left in once the pass is done.
    pub fn last_usage(&self) -> U {
        self.final_usage
            .or_else(|| self.usages.values().next_back().copied())
            .unwrap_or(self.initial)
    }

    pub fn points(&self) -> impl Iterator<Item = (u32, U)> + '_ {
        self.usages.iter().map(|(point, usage)| (*point, *usage))
    }

    pub fn last_point(&self) -> Option<u32> {
        self.usages.keys().next_back().copied()
    }

    pub fn resolve_sources(&self) -> impl Iterator<Item = (u32, &str)> + '_ {
        self.resolve_sources
            .iter()
            .map(|(point, name)| (*point, name.as_str()))
    }

    pub fn resolve_source_at(&self, point: u32) -> Option<&str> {
        self.resolve_sources.get(&point).map(String::as_str)
    }

    pub fn is_used_in_pass(&self) -> bool {
        !self.usages.is_empty()
    }

    /// `[initial, usages in ascending point order..., final?]`
    pub fn all_usages(&self) -> Vec<U> {
        let mut all = Vec::with_capacity(self.usages.len() + 2);
        all.push(self.initial);
        all.extend(self.usages.values().copied());
        all.extend(self.final_usage);
        all
    }
}

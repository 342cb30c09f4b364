use std::collections::HashMap;

use crate::renderer::error::{PassError, PassResult};
use crate::renderer::usage::UsageHistory;

/// Current usage of every resource, carried from one pass build to the next.
#[derive(Debug, Clone)]
pub struct UsageTracker<U: Copy> {
    usages: HashMap<String, U>,
}

impl<U: Copy> Default for UsageTracker<U> {
    fn default() -> Self {
        Self {
            usages: HashMap::new(),
        }
    }
}

impl<U: Copy> UsageTracker<U> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(&mut self, name: impl Into<String>, initial: U) -> PassResult<&mut Self> {
        let name = name.into();
        if self.usages.contains_key(&name) {
            return Err(PassError::AlreadyTracked { name });
        }
        self.usages.insert(name, initial);
        Ok(self)
    }

    pub fn current_usage(&self, name: &str) -> PassResult<U> {
        self.usages
            .get(name)
            .copied()
            .ok_or_else(|| PassError::UnknownResource { name: name.into() })
    }

    pub fn update_usage(&mut self, name: &str, usage: U) -> PassResult<()> {
        let current = self
            .usages
            .get_mut(name)
            .ok_or_else(|| PassError::UnknownResource { name: name.into() })?;
        *current = usage;
        Ok(())
    }

    /// Starts a history whose initial usage is the tracked current usage.
    pub fn history_for(&self, name: &str) -> PassResult<UsageHistory<U>> {
        Ok(UsageHistory::new(name, self.current_usage(name)?))
    }

    pub fn len(&self) -> usize {
        self.usages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.usages.is_empty()
    }
}

use crate::engine::{RenderEngine, Resource};

/// Engine resources owned by the mirror, in creation order.
///
/// Released exactly once, newest first. Dropping a non-empty ledger leaks the
/// resources and logs a warning, since releasing requires the engine.
#[derive(Debug, Default)]
pub struct ResourceLedger {
    resources: Vec<Resource>,
}

impl ResourceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a freshly created resource and hand the handle back.
    pub fn track<H>(&mut self, handle: H) -> H
    where
        H: Into<Resource> + Copy,
    {
        self.resources.push(handle.into());
        handle
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    /// Destroy every tracked resource in reverse creation order.
    pub fn release_all<E: RenderEngine + ?Sized>(&mut self, engine: &mut E) {
        while let Some(resource) = self.resources.pop() {
            log::debug!("Releasing {resource:?}");
            engine.destroy(resource);
        }
    }
}

impl Drop for ResourceLedger {
    fn drop(&mut self) {
        if !self.resources.is_empty() {
            log::warn!(
                "{} mirror resources dropped without teardown",
                self.resources.len()
            );
        }
    }
}

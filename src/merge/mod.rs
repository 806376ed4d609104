//! Folding overlay descriptors into a base descriptor.
//!
//! ```text
//! XmlMerger ──▶ [ DescriptorMergerByTag, custom mergers, ... ]
//!                      │ per tag
//!                      ▼
//!                MergeStrategy (Ignore | Overwrite | Preserve | NodeMergeStrategy)
//! ```
//!
//! Mergers run in list order; each one sees the base as left by the
//! previous ones.

mod by_tag;
mod strategy;

pub use by_tag::DescriptorMergerByTag;
pub use strategy::{Ignore, MergeStrategy, NodeMergeStrategy, Overwrite, Preserve};

use tracing::debug;

use crate::descriptor::Descriptor;
use crate::error::ModuleError;

/// One concern of a merge.
pub trait DescriptorMerger {
    /// Called once with the base before any overlay is merged.
    fn init(&mut self, _base: &Descriptor) {}

    /// Fold `other` into `base`.
    fn merge(&mut self, base: &mut Descriptor, other: &Descriptor) -> Result<(), ModuleError>;
}

/// Ordered composite of mergers.
#[derive(Default)]
pub struct XmlMerger {
    mergers: Vec<Box<dyn DescriptorMerger>>,
}

impl XmlMerger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_merger(&mut self, merger: Box<dyn DescriptorMerger>) {
        self.mergers.push(merger);
    }

    pub fn len(&self) -> usize {
        self.mergers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mergers.is_empty()
    }

    /// Merge every overlay in turn into `base`.
    pub fn merge_all(&mut self, base: &mut Descriptor, overlays: &[Descriptor]) -> Result<(), ModuleError> {
        self.init(base);
        for overlay in overlays {
            self.merge(base, overlay)?;
        }
        Ok(())
    }
}

impl DescriptorMerger for XmlMerger {
    fn init(&mut self, base: &Descriptor) {
        for merger in &mut self.mergers {
            merger.init(base);
        }
    }

    fn merge(&mut self, base: &mut Descriptor, other: &Descriptor) -> Result<(), ModuleError> {
        debug!(mergers = self.mergers.len(), "Merging descriptor");
        for merger in &mut self.mergers {
            merger.merge(base, other)?;
        }
        Ok(())
    }
}

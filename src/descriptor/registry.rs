//! Descriptor types: tag catalogs acting as element factories.
//!
//! A type owns its grammar and may chain to a parent type. Lookups check the
//! local catalog first and then walk up the chain:
//!
//! ```text
//! web-app 2.4 ──parent──▶ web-app 2.3 ──parent──▶ web-app 2.2
//!  (local tags)            (local tags)             (local tags)
//! ```
//!
//! Tags are registered during a setup phase; afterwards a type is shared
//! read-only (typically behind an `Arc` in a `LazyLock`).

use std::sync::Arc;

use indexmap::IndexMap;
use rustc_hash::{FxBuildHasher, FxHashSet};
use smol_str::SmolStr;
use tracing::{debug, warn};

use super::tag::DescriptorTag;
use crate::error::BindingError;
use crate::grammar::{ElementOrder, Grammar};
use crate::xml::{Document, NodeId};

/// A named catalog of the tags of one document kind.
#[derive(Debug)]
pub struct DescriptorType {
    name: SmolStr,
    parent: Option<Arc<DescriptorType>>,
    grammar: Grammar,
    tags: IndexMap<SmolStr, DescriptorTag, FxBuildHasher>,
}

impl DescriptorType {
    pub fn new(name: &str, grammar: impl Into<Grammar>) -> Self {
        Self {
            name: SmolStr::new(name),
            parent: None,
            grammar: grammar.into(),
            tags: IndexMap::default(),
        }
    }

    /// Create a type that falls back to `parent` for unknown tags.
    pub fn with_parent(name: &str, parent: Arc<DescriptorType>, grammar: impl Into<Grammar>) -> Self {
        Self {
            parent: Some(parent),
            ..Self::new(name, grammar)
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<&Arc<DescriptorType>> {
        self.parent.as_ref()
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    /// Declared child order of `name` under this type's grammar.
    pub fn element_order(&self, name: &str) -> ElementOrder<'_> {
        self.grammar.element_order(name)
    }

    /// Register `tag`, replacing any local tag with the same name.
    pub fn add_tag(&mut self, tag: DescriptorTag) -> Option<DescriptorTag> {
        self.tags.insert(SmolStr::new(tag.name()), tag)
    }

    /// Look `name` up locally, then in the parent chain.
    pub fn tag_by_name(&self, name: &str) -> Option<&DescriptorTag> {
        self.tags
            .get(name)
            .or_else(|| self.parent.as_deref().and_then(|p| p.tag_by_name(name)))
    }

    /// Local tags followed by inherited ones; a local tag shadows an
    /// inherited tag of the same name.
    pub fn all_tags(&self) -> Vec<&DescriptorTag> {
        let mut seen: FxHashSet<&str> = FxHashSet::default();
        let mut out = Vec::new();
        let mut current = Some(self);
        while let Some(ty) = current {
            for tag in ty.tags.values() {
                if seen.insert(tag.name()) {
                    out.push(tag);
                }
            }
            current = ty.parent.as_deref();
        }
        out
    }

    /// Create a detached element for `name`, degrading to a generic element
    /// when the tag's binding fails.
    pub fn create_element(&self, document: &mut Document, name: &str) -> NodeId {
        match self.try_create_element(document, name) {
            Ok(node) => node,
            Err(e) => {
                warn!(tag = %name, error = %e, "Element binding failed, using generic element");
                let namespace = self.tag_by_name(name).and_then(DescriptorTag::namespace);
                document.create_element_ns(name, namespace)
            }
        }
    }

    /// Create a detached element for `name`, surfacing binding failures.
    pub fn try_create_element(&self, document: &mut Document, name: &str) -> Result<NodeId, BindingError> {
        match self.tag_by_name(name) {
            Some(tag) => tag.create(document),
            None => Ok(document.create_element(name)),
        }
    }

    /// Wrap every attached element that has a bound tag. Elements whose
    /// binding rejects them are left generic.
    pub fn bind_elements(&self, document: &mut Document) -> usize {
        let mut nodes = vec![document.root()];
        nodes.extend(document.descendants(document.root()));
        let mut bound = 0;
        for node in nodes {
            let Some(tag) = document.name(node).and_then(|n| self.tag_by_name(n)) else {
                continue;
            };
            let Some(binding) = tag.binding() else {
                continue;
            };
            match binding.wrap(document, node, tag) {
                Ok(()) => bound += 1,
                Err(e) => warn!(tag = %tag.name(), error = %e, "Could not wrap element"),
            }
        }
        debug!(descriptor_type = %self.name, bound, "Bound descriptor elements");
        bound
    }
}

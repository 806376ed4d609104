//! Descriptor tags and element bindings.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use smol_str::SmolStr;

use super::identifier::Identifier;
use crate::error::{BindingError, ModuleError};
use crate::xml::{Document, NodeId};

/// Typed construction for elements of one tag.
///
/// `create` builds a new element (with whatever skeleton children the kind
/// needs); `wrap` adopts an element that was parsed from a document.
pub trait ElementBinding: Send + Sync {
    /// Name recorded on elements produced or wrapped by this binding.
    fn name(&self) -> &str;

    /// Create a detached element for `tag` in `document`.
    fn create(&self, document: &mut Document, tag: &DescriptorTag) -> Result<NodeId, BindingError> {
        let node = document.create_element_ns(tag.name(), tag.namespace());
        if let Some(element) = document.element_mut(node) {
            element.set_binding(self.name());
        }
        Ok(node)
    }

    /// Adopt an existing element, checking that it really is a `tag` element.
    fn wrap(&self, document: &mut Document, node: NodeId, tag: &DescriptorTag) -> Result<(), ModuleError> {
        let found = document.name(node).unwrap_or_default().to_string();
        if found != tag.name() {
            return Err(ModuleError::invalid_element(tag.name(), found));
        }
        if let Some(element) = document.element_mut(node) {
            element.set_binding(self.name());
        }
        Ok(())
    }
}

/// Binding whose new elements come with a fixed list of empty children,
/// e.g. `<mime-mapping><extension/><mime-type/></mime-mapping>`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SkeletonBinding {
    name: &'static str,
    children: &'static [&'static str],
}

impl SkeletonBinding {
    pub const fn new(name: &'static str, children: &'static [&'static str]) -> Self {
        Self { name, children }
    }
}

impl ElementBinding for SkeletonBinding {
    fn name(&self) -> &str {
        self.name
    }

    fn create(&self, document: &mut Document, tag: &DescriptorTag) -> Result<NodeId, BindingError> {
        let node = document.create_element_ns(tag.name(), tag.namespace());
        for child in self.children {
            let child_node = document.create_element_ns(child, tag.namespace());
            document.push_child(node, child_node);
        }
        document
            .element_mut(node)
            .ok_or_else(|| BindingError::new(tag.name(), "created node is not an element"))?
            .set_binding(self.name);
        Ok(node)
    }
}

/// A kind of element known to a descriptor type.
///
/// Equality and hashing use the name only: two tags with the same name but
/// different namespaces are the same tag.
#[derive(Clone)]
pub struct DescriptorTag {
    name: SmolStr,
    namespace: Option<SmolStr>,
    repeatable: bool,
    identifier: Option<Identifier>,
    binding: Option<Arc<dyn ElementBinding>>,
}

impl DescriptorTag {
    pub fn new(name: &str, repeatable: bool) -> Self {
        Self {
            name: SmolStr::new(name),
            namespace: None,
            repeatable,
            identifier: None,
            binding: None,
        }
    }

    pub fn with_namespace(mut self, namespace: &str) -> Self {
        self.namespace = Some(SmolStr::new(namespace));
        self
    }

    pub fn with_identifier(mut self, identifier: Identifier) -> Self {
        self.identifier = Some(identifier);
        self
    }

    pub fn with_binding(mut self, binding: Arc<dyn ElementBinding>) -> Self {
        self.binding = Some(binding);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn is_repeatable(&self) -> bool {
        self.repeatable
    }

    pub fn identifier(&self) -> Option<&Identifier> {
        self.identifier.as_ref()
    }

    pub fn binding(&self) -> Option<&Arc<dyn ElementBinding>> {
        self.binding.as_ref()
    }

    /// Create a detached element of this kind, through the binding when one is set.
    pub fn create(&self, document: &mut Document) -> Result<NodeId, BindingError> {
        match &self.binding {
            Some(binding) => binding.create(document, self),
            None => Ok(document.create_element_ns(self.name(), self.namespace())),
        }
    }
}

impl PartialEq for DescriptorTag {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for DescriptorTag {}

impl Hash for DescriptorTag {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl fmt::Debug for DescriptorTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DescriptorTag")
            .field("name", &self.name)
            .field("namespace", &self.namespace)
            .field("repeatable", &self.repeatable)
            .field("identifier", &self.identifier)
            .field("binding", &self.binding.as_ref().map(|b| b.name().to_string()))
            .finish()
    }
}

impl fmt::Display for DescriptorTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

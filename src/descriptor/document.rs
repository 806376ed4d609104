//! Descriptor: a document bound to its descriptor type.
//!
//! Mutations go through the grammar. When a child is added, the declared
//! order of the parent element decides where it lands:
//!
//! ```text
//! order(web-app) = [filter*, servlet*, servlet-mapping*]
//!
//! <web-app>                      <web-app>
//!   <filter/>        add           <filter/>
//!   <!-- maps -->   servlet ─▶     <servlet/>        ◀─ new
//!   <servlet-mapping/>             <!-- maps -->
//! </web-app>                       <servlet-mapping/>
//! ```
//!
//! The new element goes before the first existing element of any later tag
//! in the order, ahead of the comments and whitespace that precede it. With
//! no such element, or no known order, it is appended.

use std::sync::Arc;

use tracing::trace;

use super::registry::DescriptorType;
use crate::error::ModuleError;
use crate::grammar::ElementOrder;
use crate::xml::{Document, NodeId};

/// A parsed descriptor document plus the type that gives it meaning.
#[derive(Clone, Debug)]
pub struct Descriptor {
    document: Document,
    descriptor_type: Arc<DescriptorType>,
}

impl Descriptor {
    pub fn new(document: Document, descriptor_type: Arc<DescriptorType>) -> Self {
        Self {
            document,
            descriptor_type,
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    /// Drop the arena slots of detached nodes. Every [`NodeId`] obtained
    /// from this descriptor before the call is invalidated.
    pub fn compact(&mut self) {
        let before = self.document.node_count();
        self.document = self.document.compacted();
        trace!(before, after = self.document.node_count(), "Compacted descriptor");
    }

    pub fn into_document(self) -> Document {
        self.document
    }

    pub fn descriptor_type(&self) -> &Arc<DescriptorType> {
        &self.descriptor_type
    }

    pub fn root(&self) -> NodeId {
        self.document.root()
    }

    // ── Queries ─────────────────────────────────────────────────────

    /// All elements named `tag` below the root, in document order.
    pub fn get_elements(&self, tag: &str) -> Vec<NodeId> {
        self.get_nested_elements(self.root(), tag)
    }

    /// All elements named `tag` below `parent`, in document order.
    pub fn get_nested_elements(&self, parent: NodeId, tag: &str) -> Vec<NodeId> {
        self.document
            .descendants(parent)
            .into_iter()
            .filter(|n| self.document.name(*n) == Some(tag))
            .collect()
    }

    /// Immediate children of the root named `tag`.
    pub fn get_tags(&self, tag: &str) -> Vec<NodeId> {
        self.document.children_named(self.root(), tag).collect()
    }

    /// The last immediate child of `parent` named `tag`.
    pub fn get_immediate_child(&self, parent: NodeId, tag: &str) -> Option<NodeId> {
        self.document.children_named(parent, tag).last()
    }

    /// Text of the first immediate child of `parent` named `tag`.
    pub fn get_nested_text(&self, parent: NodeId, tag: &str) -> Option<String> {
        self.document
            .children_named(parent, tag)
            .next()
            .map(|n| self.document.text(n))
    }

    /// Text of the last immediate child of `parent` named `tag`.
    pub fn get_child_text(&self, parent: NodeId, tag: &str) -> Option<String> {
        self.get_immediate_child(parent, tag)
            .map(|n| self.document.text(n))
    }

    /// First root-level `tag` element whose identifier equals `value`.
    /// Tags without an identifier never match.
    pub fn get_tag_by_identifier(&self, tag: &str, value: &str) -> Option<NodeId> {
        let identifier = self.descriptor_type.tag_by_name(tag)?.identifier()?;
        self.get_tags(tag)
            .into_iter()
            .find(|n| identifier.identifier(&self.document, *n) == value)
    }

    /// Identifier value of `node` under its tag's identifier, if it has one.
    pub fn identifier_of(&self, node: NodeId) -> Option<String> {
        let name = self.document.name(node)?;
        let identifier = self.descriptor_type.tag_by_name(name)?.identifier()?;
        Some(identifier.identifier(&self.document, node))
    }

    /// Fail with [`ModuleError::InvalidElement`] unless `node` is a `tag` element.
    pub fn check_element(&self, node: NodeId, tag: &str) -> Result<(), ModuleError> {
        check_element(&self.document, node, tag)
    }

    // ── Construction ────────────────────────────────────────────────

    /// Create a detached element through the descriptor type's factory.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.descriptor_type.create_element(&mut self.document, tag)
    }

    /// Create a detached `<tag>text</tag>` element in the tag's namespace.
    pub fn create_nested_text(&mut self, tag: &str, text: &str) -> NodeId {
        let namespace = self
            .descriptor_type
            .tag_by_name(tag)
            .and_then(|t| t.namespace());
        let node = self.document.create_element_ns(tag, namespace);
        self.document.set_text(node, text);
        node
    }

    // ── Mutation ────────────────────────────────────────────────────

    /// Insert `child` under `parent` before the node
    /// [`Self::get_insertion_point_for`] finds, or append it when that node
    /// is not a child of `parent`. A `child` attached elsewhere is moved;
    /// `parent` inside `child`'s own subtree is an error.
    pub fn add_element(&mut self, tag: &str, child: NodeId, parent: NodeId) -> Result<NodeId, ModuleError> {
        let parent_name = self.document.name(parent).unwrap_or_default().to_string();
        let reference = if self.document.is_ancestor_or_self(child, parent) {
            None
        } else {
            self.document.detach(child);
            self.get_insertion_point_for(tag, &parent_name)
        };
        match reference.filter(|r| self.document.parent(*r) == Some(parent)) {
            Some(reference) => {
                trace!(tag = %tag, parent = %parent_name, "Inserting element");
                self.document.insert_before(parent, reference, child)?;
            }
            None => {
                trace!(tag = %tag, parent = %parent_name, "Appending element");
                self.document.append_child(parent, child)?;
            }
        }
        Ok(child)
    }

    /// Copy `node` from `source` and add it under `parent`. Unprefixed
    /// elements of the copy take the default namespace in scope at `parent`.
    pub fn add_imported_element(
        &mut self,
        tag: &str,
        source: &Document,
        node: NodeId,
        parent: NodeId,
    ) -> Result<NodeId, ModuleError> {
        let copy = self.document.import(source, node);
        self.add_element(tag, copy, parent)?;
        self.document.resolve_subtree_namespaces(copy);
        Ok(copy)
    }

    /// Remove every `tag` element in the whole document, then add `child`
    /// under `parent`.
    pub fn replace_element(&mut self, tag: &str, child: NodeId, parent: NodeId) -> Result<NodeId, ModuleError> {
        for existing in self.get_elements(tag) {
            if existing != child {
                self.document.detach(existing);
            }
        }
        self.add_element(tag, child, parent)
    }

    /// Node before which a new `tag` child of a `parent_name` element belongs.
    ///
    /// Looks for the first later tag in the declared order that occurs
    /// anywhere in the document and returns its first occurrence, backed up
    /// over the comments and text directly preceding it. `None` means append:
    /// `tag` is not in the order, the order is unknown, or no later tag occurs.
    pub fn get_insertion_point_for(&self, tag: &str, parent_name: &str) -> Option<NodeId> {
        let order = self.descriptor_type.element_order(parent_name);
        let later = later_tags(order, tag)?;
        let all = self.document.descendants(self.root());
        let found = later.iter().find_map(|name| {
            all.iter()
                .copied()
                .find(|n| self.document.name(*n) == Some(name))
        })?;
        Some(self.back_over_text_and_comments(found))
    }

    fn back_over_text_and_comments(&self, node: NodeId) -> NodeId {
        let mut point = node;
        while let Some(previous) = self.document.previous_sibling(point) {
            if !self.document.kind(previous).is_text_or_comment() {
                break;
            }
            point = previous;
        }
        point
    }
}

/// Names following `tag` in `order`, or `None` if `tag` is not part of it.
fn later_tags<'a>(order: ElementOrder<'a>, tag: &str) -> Option<Vec<&'a str>> {
    let tags = order.tags()?;
    let position = tags.iter().position(|t| t.name() == tag)?;
    Some(tags[position + 1..].iter().map(|t| t.name()).collect())
}

/// Fail with [`ModuleError::InvalidElement`] unless `node` is a `tag` element.
pub fn check_element(document: &Document, node: NodeId, tag: &str) -> Result<(), ModuleError> {
    match document.name(node) {
        Some(found) if found == tag => Ok(()),
        Some(found) => Err(ModuleError::invalid_element(tag, found)),
        None => Err(ModuleError::invalid_element(tag, "#text")),
    }
}

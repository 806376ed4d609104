//! Arena-backed XML document model.
//!
//! A [`Document`] owns every node it contains. Nodes are addressed by
//! [`NodeId`], which is only meaningful for the document that produced it.
//!
//! ```text
//! Document
//! ├── nodes: Vec<NodeData>     (arena, shrinks only by compaction)
//! ├── root: NodeId             (always an element)
//! ├── prolog / epilog          (comments and PIs around the root)
//! └── declaration / doctype
//! ```
//!
//! Every node records its parent for navigation; the parent's child list is
//! the owning relation. Detached nodes stay in the arena until the document
//! is dropped or rebuilt with [`Document::compacted`]. Moving a node between documents is a deep copy through
//! [`Document::import`].

mod io;
mod resolver;

pub use io::{WriteOptions, document_to_string, parse_document, write_document};
pub use resolver::{BundledEntityResolver, EntityResolver, dtd_file_name};

use smol_str::SmolStr;

use crate::error::ModuleError;

/// Handle to a node inside a [`Document`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    fn new(index: usize) -> Self {
        Self(index)
    }

    fn index(self) -> usize {
        self.0
    }
}

/// An attribute as written in the source, including `xmlns` declarations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attribute {
    pub name: SmolStr,
    pub value: String,
}

/// Element payload: qualified name, resolved namespace and attributes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ElementData {
    prefix: Option<SmolStr>,
    name: SmolStr,
    namespace: Option<SmolStr>,
    attributes: Vec<Attribute>,
    binding: Option<SmolStr>,
}

impl ElementData {
    /// Create element data from a possibly prefixed name (`j2ee:servlet`).
    pub fn new(qualified_name: &str) -> Self {
        let (prefix, name) = split_qname(qualified_name);
        Self {
            prefix: prefix.map(SmolStr::new),
            name: SmolStr::new(name),
            namespace: None,
            attributes: Vec::new(),
            binding: None,
        }
    }

    /// Local name, without prefix.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// Name as written, `prefix:local` when prefixed.
    pub fn qualified_name(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}:{}", self.name),
            None => self.name.to_string(),
        }
    }

    /// Namespace URI the element belongs to, if any.
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn set_namespace(&mut self, namespace: Option<&str>) {
        self.namespace = namespace.map(SmolStr::new);
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Set an attribute, replacing any previous value.
    pub fn set_attribute(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|a| a.name == name) {
            Some(existing) => existing.value = value,
            None => self.attributes.push(Attribute {
                name: SmolStr::new(name),
                value,
            }),
        }
    }

    pub fn remove_attribute(&mut self, name: &str) -> Option<String> {
        let pos = self.attributes.iter().position(|a| a.name == name)?;
        Some(self.attributes.remove(pos).value)
    }

    /// Name of the element binding that created or wrapped this element.
    pub fn binding(&self) -> Option<&str> {
        self.binding.as_deref()
    }

    pub fn set_binding(&mut self, binding: &str) {
        self.binding = Some(SmolStr::new(binding));
    }
}

/// The content of a node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Element(ElementData),
    Text(String),
    CData(String),
    Comment(String),
    ProcessingInstruction { target: String, data: String },
}

impl NodeKind {
    /// Text and comment nodes are the ones skipped when locating an insertion point.
    pub fn is_text_or_comment(&self) -> bool {
        matches!(self, Self::Text(_) | Self::CData(_) | Self::Comment(_))
    }
}

#[derive(Clone, Debug)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// `<?xml ...?>` declaration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct XmlDeclaration {
    pub version: String,
    pub encoding: Option<String>,
    pub standalone: Option<String>,
}

impl Default for XmlDeclaration {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            encoding: Some("UTF-8".to_string()),
            standalone: None,
        }
    }
}

/// `<!DOCTYPE ...>` declaration.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DocType {
    pub name: String,
    pub public_id: Option<String>,
    pub system_id: Option<String>,
    pub internal_subset: Option<String>,
}

impl DocType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_ids(mut self, public_id: Option<&str>, system_id: Option<&str>) -> Self {
        self.public_id = public_id.map(str::to_string);
        self.system_id = system_id.map(str::to_string);
        self
    }
}

/// An XML document: one root element plus prolog.
///
/// Detached nodes keep their arena slot, so a document edited for a long
/// time grows with every replacement. [`Document::compacted`] rebuilds it
/// from the attached nodes only.
#[derive(Clone, Debug)]
pub struct Document {
    nodes: Vec<NodeData>,
    root: NodeId,
    declaration: Option<XmlDeclaration>,
    doctype: Option<DocType>,
    prolog: Vec<NodeId>,
    epilog: Vec<NodeId>,
}

impl Document {
    /// Create a document with an empty root element.
    pub fn new(root_name: &str) -> Self {
        Self::with_root(ElementData::new(root_name))
    }

    /// Create a document whose root element is `root`.
    pub fn with_root(root: ElementData) -> Self {
        Self {
            nodes: vec![NodeData {
                kind: NodeKind::Element(root),
                parent: None,
                children: Vec::new(),
            }],
            root: NodeId::new(0),
            declaration: None,
            doctype: None,
            prolog: Vec::new(),
            epilog: Vec::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of arena slots, attached or not.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Copy holding only the root subtree, prolog and epilog. Node ids of
    /// `self` are meaningless for the copy.
    pub fn compacted(&self) -> Document {
        let root = match self.kind(self.root) {
            NodeKind::Element(data) => data.clone(),
            _ => ElementData::new(""),
        };
        let mut out = Document::with_root(root);
        out.declaration = self.declaration.clone();
        out.doctype = self.doctype.clone();
        let out_root = out.root;
        for &child in self.children(self.root) {
            let copy = out.import(self, child);
            out.push_child(out_root, copy);
        }
        for &node in &self.prolog {
            out.push_prolog(self.kind(node).clone());
        }
        for &node in &self.epilog {
            out.push_epilog(self.kind(node).clone());
        }
        out
    }

    pub fn declaration(&self) -> Option<&XmlDeclaration> {
        self.declaration.as_ref()
    }

    pub fn set_declaration(&mut self, declaration: Option<XmlDeclaration>) {
        self.declaration = declaration;
    }

    pub fn doctype(&self) -> Option<&DocType> {
        self.doctype.as_ref()
    }

    pub fn set_doctype(&mut self, doctype: Option<DocType>) {
        self.doctype = doctype;
    }

    /// Comments and processing instructions before the root element.
    pub fn prolog(&self) -> &[NodeId] {
        &self.prolog
    }

    /// Comments and processing instructions after the root element.
    pub fn epilog(&self) -> &[NodeId] {
        &self.epilog
    }

    pub(crate) fn push_prolog(&mut self, kind: NodeKind) {
        let id = self.push(kind);
        self.prolog.push(id);
    }

    pub(crate) fn push_epilog(&mut self, kind: NodeKind) {
        let id = self.push(kind);
        self.epilog.push(id);
    }

    // ── Node access ─────────────────────────────────────────────────

    pub fn kind(&self, node: NodeId) -> &NodeKind {
        &self.nodes[node.index()].kind
    }

    pub fn is_element(&self, node: NodeId) -> bool {
        matches!(self.kind(node), NodeKind::Element(_))
    }

    pub fn element(&self, node: NodeId) -> Option<&ElementData> {
        match self.kind(node) {
            NodeKind::Element(data) => Some(data),
            _ => None,
        }
    }

    pub fn element_mut(&mut self, node: NodeId) -> Option<&mut ElementData> {
        match &mut self.nodes[node.index()].kind {
            NodeKind::Element(data) => Some(data),
            _ => None,
        }
    }

    /// Local name of an element node.
    pub fn name(&self, node: NodeId) -> Option<&str> {
        self.element(node).map(ElementData::name)
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.index()].parent
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.nodes[node.index()].children
    }

    /// Element children, in document order.
    pub fn child_elements(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(node)
            .iter()
            .copied()
            .filter(move |c| self.is_element(*c))
    }

    /// Element children named `name`, in document order.
    pub fn children_named<'a>(
        &'a self,
        node: NodeId,
        name: &'a str,
    ) -> impl Iterator<Item = NodeId> + 'a {
        self.child_elements(node)
            .filter(move |c| self.name(*c) == Some(name))
    }

    /// All descendants of `node` (excluding itself), in document order.
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(node).iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }
        out
    }

    pub fn index_of(&self, parent: NodeId, child: NodeId) -> Option<usize> {
        self.children(parent).iter().position(|c| *c == child)
    }

    pub fn previous_sibling(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.parent(node)?;
        let idx = self.index_of(parent, node)?;
        idx.checked_sub(1).map(|i| self.children(parent)[i])
    }

    /// Whether `node` is reachable from the root.
    pub fn is_attached(&self, node: NodeId) -> bool {
        let mut current = node;
        loop {
            if current == self.root {
                return true;
            }
            match self.parent(current) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    pub(crate) fn is_ancestor_or_self(&self, candidate: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if n == candidate {
                return true;
            }
            current = self.parent(n);
        }
        false
    }

    // ── Text ────────────────────────────────────────────────────────

    /// Concatenated direct text children of an element, or the text of a text node.
    pub fn text(&self, node: NodeId) -> String {
        match self.kind(node) {
            NodeKind::Text(t) | NodeKind::CData(t) | NodeKind::Comment(t) => t.clone(),
            NodeKind::ProcessingInstruction { data, .. } => data.clone(),
            NodeKind::Element(_) => self
                .children(node)
                .iter()
                .filter_map(|c| match self.kind(*c) {
                    NodeKind::Text(t) | NodeKind::CData(t) => Some(t.as_str()),
                    _ => None,
                })
                .collect(),
        }
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self, node: NodeId) -> String {
        match self.kind(node) {
            NodeKind::Element(_) => self
                .descendants(node)
                .into_iter()
                .filter_map(|c| match self.kind(c) {
                    NodeKind::Text(t) | NodeKind::CData(t) => Some(t.clone()),
                    _ => None,
                })
                .collect(),
            _ => self.text(node),
        }
    }

    /// Replace all children of `node` with a single text node.
    pub fn set_text(&mut self, node: NodeId, text: &str) {
        match &mut self.nodes[node.index()].kind {
            NodeKind::Text(t) | NodeKind::CData(t) | NodeKind::Comment(t) => {
                *t = text.to_string();
            }
            NodeKind::ProcessingInstruction { data, .. } => *data = text.to_string(),
            NodeKind::Element(_) => {
                for child in std::mem::take(&mut self.nodes[node.index()].children) {
                    self.nodes[child.index()].parent = None;
                }
                let text_node = self.create_text(text);
                self.push_child(node, text_node);
            }
        }
    }

    // ── Attributes and namespaces ───────────────────────────────────

    pub fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        self.element(node).and_then(|e| e.attribute(name))
    }

    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: impl Into<String>) {
        if let Some(element) = self.element_mut(node) {
            element.set_attribute(name, value);
        }
    }

    /// Resolve `prefix` (or the default namespace) from the `xmlns`
    /// declarations in scope at `node`.
    pub fn lookup_namespace(&self, node: NodeId, prefix: Option<&str>) -> Option<&str> {
        let attr = match prefix {
            Some(p) => format!("xmlns:{p}"),
            None => "xmlns".to_string(),
        };
        let mut current = Some(node);
        while let Some(n) = current {
            if let Some(value) = self.attribute(n, &attr) {
                return (!value.is_empty()).then_some(value);
            }
            current = self.parent(n);
        }
        None
    }

    /// Recompute the namespace of every attached element from its `xmlns` scope.
    pub(crate) fn resolve_namespaces(&mut self) {
        self.resolve_subtree_namespaces(self.root);
    }

    /// Recompute the namespace of `top` and its descendants from the
    /// `xmlns` scope they are attached in.
    pub(crate) fn resolve_subtree_namespaces(&mut self, top: NodeId) {
        let mut elements = vec![top];
        elements.extend(self.descendants(top));
        for node in elements {
            let resolved = match self.element(node) {
                Some(data) => self
                    .lookup_namespace(node, data.prefix())
                    .map(SmolStr::new),
                None => continue,
            };
            if let Some(data) = self.element_mut(node) {
                data.namespace = resolved;
            }
        }
    }

    // ── Construction ────────────────────────────────────────────────

    fn push(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId::new(self.nodes.len());
        self.nodes.push(NodeData {
            kind,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    /// Create a detached element owned by this document.
    pub fn create_element(&mut self, name: &str) -> NodeId {
        self.push(NodeKind::Element(ElementData::new(name)))
    }

    /// Create a detached element in `namespace`.
    pub fn create_element_ns(&mut self, name: &str, namespace: Option<&str>) -> NodeId {
        let mut data = ElementData::new(name);
        data.set_namespace(namespace);
        self.push(NodeKind::Element(data))
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeKind::Text(text.to_string()))
    }

    pub fn create_comment(&mut self, text: &str) -> NodeId {
        self.push(NodeKind::Comment(text.to_string()))
    }

    /// Create `<name>text</name>` as a detached element.
    pub fn create_text_element(&mut self, name: &str, text: &str) -> NodeId {
        let element = self.create_element(name);
        self.set_text(element, text);
        element
    }

    // ── Mutation ────────────────────────────────────────────────────

    /// Append `child` as the last child of `parent`, detaching it first.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), ModuleError> {
        let len = self.children(parent).len();
        self.insert_child(parent, len, child)
    }

    /// Insert `child` at `index` among `parent`'s children, detaching it first.
    /// An index past the end appends. Fails when `child` is `parent` or one
    /// of its ancestors.
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) -> Result<(), ModuleError> {
        if self.is_ancestor_or_self(child, parent) {
            let name = |node: NodeId| {
                self.element(node)
                    .map_or_else(|| "#text".to_string(), ElementData::qualified_name)
            };
            return Err(ModuleError::invalid_element(format!("{} child", name(parent)), name(child)));
        }
        let mut index = index;
        if self.parent(child) == Some(parent) {
            if let Some(current) = self.index_of(parent, child) {
                if current < index {
                    index -= 1;
                }
            }
        }
        self.detach(child);
        self.link_child(parent, index, child);
        Ok(())
    }

    /// Insert `child` immediately before `reference`, a child of `parent`.
    /// Appends when `reference` is not a child of `parent`.
    pub fn insert_before(&mut self, parent: NodeId, reference: NodeId, child: NodeId) -> Result<(), ModuleError> {
        match self.index_of(parent, reference) {
            Some(idx) => self.insert_child(parent, idx, child),
            None => self.append_child(parent, child),
        }
    }

    /// Append a freshly created, detached `child`.
    pub(crate) fn push_child(&mut self, parent: NodeId, child: NodeId) {
        let len = self.children(parent).len();
        self.link_child(parent, len, child);
    }

    fn link_child(&mut self, parent: NodeId, index: usize, child: NodeId) {
        let children = &mut self.nodes[parent.index()].children;
        let index = index.min(children.len());
        children.insert(index, child);
        self.nodes[child.index()].parent = Some(parent);
    }

    /// Detach `node` from its parent. Returns `false` if it had none.
    /// The root element cannot be detached.
    pub fn detach(&mut self, node: NodeId) -> bool {
        if node == self.root {
            return false;
        }
        let Some(parent) = self.nodes[node.index()].parent.take() else {
            return false;
        };
        self.nodes[parent.index()].children.retain(|c| *c != node);
        true
    }

    /// Deep-copy a subtree of this document; the copy is detached.
    pub fn deep_clone(&mut self, node: NodeId) -> NodeId {
        let kind = self.kind(node).clone();
        let children = self.children(node).to_vec();
        let copy = self.push(kind);
        for child in children {
            let child_copy = self.deep_clone(child);
            self.push_child(copy, child_copy);
        }
        copy
    }

    /// Deep-copy a subtree of `source` into this document; the copy is detached.
    pub fn import(&mut self, source: &Document, node: NodeId) -> NodeId {
        let copy = self.push(source.kind(node).clone());
        for &child in source.children(node) {
            let child_copy = self.import(source, child);
            self.push_child(copy, child_copy);
        }
        copy
    }
}

fn split_qname(qualified_name: &str) -> (Option<&str>, &str) {
    match qualified_name.split_once(':') {
        Some((prefix, local)) if !prefix.is_empty() && !local.is_empty() => (Some(prefix), local),
        _ => (None, qualified_name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Document, NodeId, NodeId, NodeId) {
        let mut doc = Document::new("web-app");
        let root = doc.root();
        let a = doc.create_text_element("a", "one");
        let b = doc.create_text_element("b", "two");
        doc.append_child(root, a).unwrap();
        doc.append_child(root, b).unwrap();
        let nested = doc.create_text_element("a", "nested");
        doc.append_child(b, nested).unwrap();
        (doc, a, b, nested)
    }

    #[test]
    fn test_descendants_in_document_order() {
        let (doc, a, b, nested) = sample();
        let elements: Vec<_> = doc
            .descendants(doc.root())
            .into_iter()
            .filter(|n| doc.is_element(*n))
            .collect();
        assert_eq!(elements, vec![a, b, nested]);
    }

    #[test]
    fn test_detach_and_reattach() {
        let (mut doc, a, b, _) = sample();
        assert!(doc.detach(a));
        assert!(!doc.is_attached(a));
        assert_eq!(doc.parent(a), None);
        doc.append_child(doc.root(), a).unwrap();
        assert_eq!(doc.children(doc.root()), &[b, a]);
    }

    #[test]
    fn test_insert_child_moves_within_parent() {
        let (mut doc, a, b, _) = sample();
        let root = doc.root();
        doc.insert_child(root, 2, a).unwrap();
        assert_eq!(doc.children(root), &[b, a]);
    }

    #[test]
    fn test_root_cannot_be_detached() {
        let (mut doc, ..) = sample();
        let root = doc.root();
        assert!(!doc.detach(root));
    }

    #[test]
    fn test_insert_into_own_subtree_fails() {
        let (mut doc, _, b, nested) = sample();
        let err = doc.append_child(nested, b).unwrap_err();
        assert!(matches!(err, ModuleError::InvalidElement { ref found, .. } if found == "b"));
        assert!(doc.append_child(b, b).is_err());
        assert_eq!(doc.parent(nested), Some(b));
        assert_eq!(doc.parent(b), Some(doc.root()));
    }

    #[test]
    fn test_compacted_drops_detached_nodes() {
        let (mut doc, a, ..) = sample();
        let root = doc.root();
        let attached = doc.node_count();
        let mut current = a;
        for _ in 0..10 {
            let replacement = doc.create_text_element("a", "again");
            doc.detach(current);
            doc.append_child(root, replacement).unwrap();
            current = replacement;
        }
        assert_eq!(doc.node_count(), attached + 20);
        let before = document_to_string(&doc, &WriteOptions::default()).unwrap();
        let compact = doc.compacted();
        assert_eq!(compact.node_count(), attached);
        assert_eq!(document_to_string(&compact, &WriteOptions::default()).unwrap(), before);
    }

    #[test]
    fn test_text_and_set_text() {
        let (mut doc, a, ..) = sample();
        assert_eq!(doc.text(a), "one");
        doc.set_text(a, "uno");
        assert_eq!(doc.text(a), "uno");
        assert_eq!(doc.children(a).len(), 1);
    }

    #[test]
    fn test_import_copies_subtree() {
        let (source, _, b, _) = sample();
        let mut target = Document::new("other");
        let copy = target.import(&source, b);
        assert_eq!(target.parent(copy), None);
        assert_eq!(target.text_content(copy), "twonested");
        // Source is untouched
        assert_eq!(source.parent(b), Some(source.root()));
    }

    #[test]
    fn test_deep_clone_is_detached() {
        let (mut doc, _, b, _) = sample();
        let copy = doc.deep_clone(b);
        assert_ne!(copy, b);
        assert!(!doc.is_attached(copy));
        assert_eq!(doc.text_content(copy), doc.text_content(b));
    }

    #[test]
    fn test_namespace_lookup() {
        let mut doc = Document::new("web-app");
        let root = doc.root();
        doc.set_attribute(root, "xmlns", "http://java.sun.com/xml/ns/j2ee");
        doc.set_attribute(root, "xmlns:x", "urn:x");
        let child = doc.create_element("x:child");
        doc.append_child(root, child).unwrap();
        doc.resolve_namespaces();
        assert_eq!(
            doc.element(root).and_then(ElementData::namespace),
            Some("http://java.sun.com/xml/ns/j2ee")
        );
        assert_eq!(doc.element(child).and_then(ElementData::namespace), Some("urn:x"));
        assert_eq!(doc.name(child), Some("child"));
    }
}

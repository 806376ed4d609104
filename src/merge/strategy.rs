//! Per-tag merge strategies.
//!
//! A strategy is asked what to do with one element (or one pair of elements
//! sharing an identifier) and returns the number of changes it made to the
//! target descriptor.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::descriptor::Descriptor;
use crate::error::ModuleError;
use crate::xml::{Document, NodeId, NodeKind, parse_document};

/// Decides how an element of the overlay reaches the base descriptor.
pub trait MergeStrategy: Send + Sync {
    /// `left` (in `target`) and `right` (in `source`) share an identifier.
    fn in_both(
        &self,
        target: &mut Descriptor,
        left: NodeId,
        source: &Document,
        right: NodeId,
    ) -> Result<usize, ModuleError>;

    /// `left` exists only in the base.
    fn in_left(&self, target: &mut Descriptor, left: NodeId) -> Result<usize, ModuleError>;

    /// `right` exists only in the overlay.
    fn in_right(&self, target: &mut Descriptor, source: &Document, right: NodeId) -> Result<usize, ModuleError>;
}

fn element_name(document: &Document, node: NodeId) -> Result<String, ModuleError> {
    document
        .name(node)
        .map(str::to_string)
        .ok_or_else(|| ModuleError::xml("Merge candidate is not an element"))
}

/// Add a copy of `right` under the root of `target`.
fn add_right(target: &mut Descriptor, source: &Document, right: NodeId) -> Result<usize, ModuleError> {
    let tag = element_name(source, right)?;
    let root = target.root();
    target.add_imported_element(&tag, source, right, root)?;
    Ok(1)
}

/// Leave the base untouched.
#[derive(Clone, Copy, Debug, Default)]
pub struct Ignore;

impl MergeStrategy for Ignore {
    fn in_both(&self, _: &mut Descriptor, _: NodeId, _: &Document, _: NodeId) -> Result<usize, ModuleError> {
        Ok(0)
    }

    fn in_left(&self, _: &mut Descriptor, _: NodeId) -> Result<usize, ModuleError> {
        Ok(0)
    }

    fn in_right(&self, _: &mut Descriptor, _: &Document, _: NodeId) -> Result<usize, ModuleError> {
        Ok(0)
    }
}

/// Overlay wins: shared elements are replaced, new ones added.
#[derive(Clone, Copy, Debug, Default)]
pub struct Overwrite;

impl MergeStrategy for Overwrite {
    fn in_both(
        &self,
        target: &mut Descriptor,
        left: NodeId,
        source: &Document,
        right: NodeId,
    ) -> Result<usize, ModuleError> {
        let tag = element_name(source, right)?;
        let parent = target.document().parent(left).unwrap_or_else(|| target.root());
        target.document_mut().detach(left);
        target.add_imported_element(&tag, source, right, parent)?;
        Ok(1)
    }

    fn in_left(&self, _: &mut Descriptor, _: NodeId) -> Result<usize, ModuleError> {
        Ok(0)
    }

    fn in_right(&self, target: &mut Descriptor, source: &Document, right: NodeId) -> Result<usize, ModuleError> {
        add_right(target, source, right)
    }
}

/// Base wins: shared elements are kept, new ones added.
#[derive(Clone, Copy, Debug, Default)]
pub struct Preserve;

impl MergeStrategy for Preserve {
    fn in_both(&self, _: &mut Descriptor, _: NodeId, _: &Document, _: NodeId) -> Result<usize, ModuleError> {
        Ok(0)
    }

    fn in_left(&self, _: &mut Descriptor, _: NodeId) -> Result<usize, ModuleError> {
        Ok(0)
    }

    fn in_right(&self, target: &mut Descriptor, source: &Document, right: NodeId) -> Result<usize, ModuleError> {
        add_right(target, source, right)
    }
}

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$(left:|right:)[^ ,\t]*").expect("placeholder pattern is valid"));

/// Replaces shared elements with a template whose text refers to values of
/// both sides.
///
/// In the template `<param-value>$left:param-value,$right:param-value</param-value>`
/// each placeholder is replaced by the text of the element found at that
/// child path below the left or right element. Paths that match nothing
/// yield an empty string.
#[derive(Clone, Debug)]
pub struct NodeMergeStrategy {
    template: Document,
}

impl NodeMergeStrategy {
    pub fn new(template: Document) -> Self {
        Self { template }
    }

    /// Parse the template from XML.
    pub fn parse(input: &[u8]) -> Result<Self, ModuleError> {
        parse_document(input).map(Self::new)
    }

    fn expand(&self, text: &str, left: (&Document, NodeId), right: (&Document, NodeId)) -> String {
        PLACEHOLDER
            .replace_all(text, |caps: &Captures<'_>| {
                let whole = &caps[0];
                let (side, path) = match whole.strip_prefix("$left:") {
                    Some(path) => (left, path),
                    None => (right, whole.strip_prefix("$right:").unwrap_or_default()),
                };
                select_text(side.0, side.1, path)
            })
            .into_owned()
    }
}

/// Direct text of the first element reached by the `/`-separated child path.
/// Prefixes on steps are ignored; steps match by local name.
fn select_text(document: &Document, node: NodeId, path: &str) -> String {
    let mut current = node;
    for step in path.split('/').filter(|s| !s.is_empty()) {
        let local = step.rsplit_once(':').map_or(step, |(_, local)| local);
        match document.children_named(current, local).next() {
            Some(next) => current = next,
            None => return String::new(),
        }
    }
    if current == node {
        return String::new();
    }
    document.text(current)
}

impl MergeStrategy for NodeMergeStrategy {
    fn in_both(
        &self,
        target: &mut Descriptor,
        left: NodeId,
        source: &Document,
        right: NodeId,
    ) -> Result<usize, ModuleError> {
        let template_root = self.template.root();
        let template_nodes = self.template.descendants(template_root);
        let replacements: Vec<Option<String>> = template_nodes
            .iter()
            .map(|n| match self.template.kind(*n) {
                NodeKind::Text(text) => Some(self.expand(text, (target.document(), left), (source, right))),
                _ => None,
            })
            .collect();

        let parent = target.document().parent(left).unwrap_or_else(|| target.root());
        let index = target.document().index_of(parent, left);
        let document = target.document_mut();
        let merged = document.import(&self.template, template_root);
        for (node, replacement) in document.descendants(merged).into_iter().zip(replacements) {
            if let Some(text) = replacement {
                document.set_text(node, &text);
            }
        }
        document.detach(left);
        match index {
            Some(index) => document.insert_child(parent, index, merged)?,
            None => document.append_child(parent, merged)?,
        }
        document.resolve_subtree_namespaces(merged);
        Ok(1)
    }

    fn in_left(&self, _: &mut Descriptor, _: NodeId) -> Result<usize, ModuleError> {
        Ok(0)
    }

    fn in_right(&self, target: &mut Descriptor, source: &Document, right: NodeId) -> Result<usize, ModuleError> {
        add_right(target, source, right)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::DescriptorType;
    use crate::grammar::Xsd;
    use std::sync::Arc;

    fn descriptor(xml: &str) -> Descriptor {
        let ty = Arc::new(DescriptorType::new("test", Xsd::default()));
        Descriptor::new(parse_document(xml.as_bytes()).unwrap(), ty)
    }

    fn param_values(d: &Descriptor) -> Vec<String> {
        d.get_elements("param-value")
            .into_iter()
            .map(|n| d.document().text(n))
            .collect()
    }

    const LEFT: &str = "<web-app><context-param><param-name>p</param-name><param-value>1</param-value></context-param></web-app>";
    const RIGHT: &str = "<web-app><context-param><param-name>p</param-name><param-value>2</param-value></context-param></web-app>";

    fn pair() -> (Descriptor, NodeId, Descriptor, NodeId) {
        let left = descriptor(LEFT);
        let right = descriptor(RIGHT);
        let l = left.get_tags("context-param")[0];
        let r = right.get_tags("context-param")[0];
        (left, l, right, r)
    }

    #[test]
    fn test_overwrite_replaces() {
        let (mut left, l, right, r) = pair();
        assert_eq!(Overwrite.in_both(&mut left, l, right.document(), r).unwrap(), 1);
        assert_eq!(param_values(&left), vec!["2"]);
        assert_eq!(param_values(&right), vec!["2"]);
    }

    #[test]
    fn test_preserve_keeps_left() {
        let (mut left, l, right, r) = pair();
        assert_eq!(Preserve.in_both(&mut left, l, right.document(), r).unwrap(), 0);
        assert_eq!(param_values(&left), vec!["1"]);
        assert_eq!(Preserve.in_right(&mut left, right.document(), r).unwrap(), 1);
        assert_eq!(param_values(&left), vec!["1", "2"]);
    }

    #[test]
    fn test_ignore_does_nothing() {
        let (mut left, l, right, r) = pair();
        assert_eq!(Ignore.in_both(&mut left, l, right.document(), r).unwrap(), 0);
        assert_eq!(Ignore.in_right(&mut left, right.document(), r).unwrap(), 0);
        assert_eq!(param_values(&left), vec!["1"]);
    }

    #[test]
    fn test_node_merge_template() {
        let (mut left, l, right, r) = pair();
        let strategy = NodeMergeStrategy::parse(
            b"<context-param><param-name>$left:param-name</param-name>\
              <param-value>$left:param-value,$right:param-value</param-value></context-param>",
        )
        .unwrap();
        assert_eq!(strategy.in_both(&mut left, l, right.document(), r).unwrap(), 1);
        let params = left.get_tags("context-param");
        assert_eq!(params.len(), 1);
        assert_eq!(left.get_nested_text(params[0], "param-name").as_deref(), Some("p"));
        assert_eq!(param_values(&left), vec!["1,2"]);
    }

    #[test]
    fn test_node_merge_keeps_dollar_and_missing_paths() {
        let left = descriptor("<a><v>$HOME</v></a>");
        let right = descriptor("<a><v>x</v></a>");
        let strategy = NodeMergeStrategy::parse(b"<t/>").unwrap();
        let text = strategy.expand(
            "$left:v $right:missing $right:j2ee:v",
            (left.document(), left.root()),
            (right.document(), right.root()),
        );
        assert_eq!(text, "$HOME  x");
    }

    #[test]
    fn test_node_merge_keeps_position() {
        let mut left = descriptor("<r><a/><c><k>1</k></c><z/></r>");
        let right = descriptor("<r><c><k>2</k></c></r>");
        let l = left.get_tags("c")[0];
        let r = right.get_tags("c")[0];
        let strategy = NodeMergeStrategy::parse(b"<c><k>$right:k</k></c>").unwrap();
        strategy.in_both(&mut left, l, right.document(), r).unwrap();
        let names: Vec<_> = left
            .document()
            .child_elements(left.root())
            .filter_map(|n| left.document().name(n))
            .collect();
        assert_eq!(names, vec!["a", "c", "z"]);
        assert_eq!(left.get_nested_text(left.get_tags("c")[0], "k").as_deref(), Some("2"));
    }
}

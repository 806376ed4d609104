//! Catalog-driven merging: one strategy decision per tag of the base type.

use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use smol_str::SmolStr;
use tracing::{debug, trace};

use super::DescriptorMerger;
use super::strategy::{MergeStrategy, Overwrite};
use crate::descriptor::{Descriptor, DescriptorTag, Identifier};
use crate::error::ModuleError;
use crate::xml::{Document, NodeId};

/// Reconciles the root-level elements of two descriptors tag by tag.
///
/// Every tag in the base type's catalog is handled according to its shape:
///
/// ```text
/// identifier tag        pair by key ─▶ in_both / in_left, unpaired right ─▶ in_right
/// repeatable, no key    configured strategy ─▶ in_right, else append a copy
/// single                first of each side ─▶ in_both / in_left / in_right
/// ```
pub struct DescriptorMergerByTag {
    strategies: FxHashMap<SmolStr, Arc<dyn MergeStrategy>>,
    default_strategy: Arc<dyn MergeStrategy>,
}

impl Default for DescriptorMergerByTag {
    fn default() -> Self {
        Self::new()
    }
}

impl DescriptorMergerByTag {
    pub fn new() -> Self {
        Self {
            strategies: FxHashMap::default(),
            default_strategy: Arc::new(Overwrite),
        }
    }

    /// Use `strategy` for elements named `tag`.
    pub fn set_strategy(&mut self, tag: &str, strategy: Arc<dyn MergeStrategy>) {
        self.strategies.insert(SmolStr::new(tag), strategy);
    }

    /// Strategy configured for `tag`, if any.
    pub fn strategy(&self, tag: &str) -> Option<&Arc<dyn MergeStrategy>> {
        self.strategies.get(tag)
    }

    pub fn set_default_strategy(&mut self, strategy: Arc<dyn MergeStrategy>) {
        self.default_strategy = strategy;
    }

    pub fn default_strategy(&self) -> &Arc<dyn MergeStrategy> {
        &self.default_strategy
    }

    fn strategy_for(&self, tag: &str) -> &dyn MergeStrategy {
        self.strategies.get(tag).unwrap_or(&self.default_strategy).as_ref()
    }

    fn merge_tag(&self, base: &mut Descriptor, other: &Descriptor, tag: &DescriptorTag) -> Result<usize, ModuleError> {
        let name = tag.name();
        if let Some(identifier) = tag.identifier() {
            return self.merge_identified(base, other, name, identifier);
        }
        let rights = other.get_tags(name);
        if tag.is_repeatable() {
            if let Some(strategy) = self.strategies.get(name) {
                let mut changes = 0;
                for right in rights {
                    changes += strategy.in_right(base, other.document(), right)?;
                }
                return Ok(changes);
            }
            let root = base.root();
            for &right in &rights {
                base.add_imported_element(name, other.document(), right, root)?;
            }
            return Ok(rights.len());
        }

        let strategy = self.strategy_for(name);
        let left = base.get_tags(name).first().copied();
        match (left, rights.first().copied()) {
            (Some(left), Some(right)) => strategy.in_both(base, left, other.document(), right),
            (Some(left), None) => strategy.in_left(base, left),
            (None, Some(right)) => strategy.in_right(base, other.document(), right),
            (None, None) => Ok(0),
        }
    }

    fn merge_identified(
        &self,
        base: &mut Descriptor,
        other: &Descriptor,
        name: &str,
        identifier: &Identifier,
    ) -> Result<usize, ModuleError> {
        let strategy = self.strategy_for(name);
        let rights: Vec<(NodeId, String)> = other
            .get_tags(name)
            .into_iter()
            .map(|n| (n, merge_key(identifier, other.document(), n)))
            .collect();
        let mut paired: FxHashSet<NodeId> = FxHashSet::default();
        let mut changes = 0;

        for left in base.get_tags(name) {
            let key = merge_key(identifier, base.document(), left);
            let matched = rights
                .iter()
                .find(|(_, right_key)| !key.is_empty() && *right_key == key)
                .map(|(node, _)| *node);
            changes += match matched {
                Some(right) => {
                    trace!(tag = %name, key = %key, "Element present in both descriptors");
                    paired.insert(right);
                    strategy.in_both(base, left, other.document(), right)?
                }
                None => strategy.in_left(base, left)?,
            };
        }
        for (right, _) in rights.iter().filter(|(node, _)| !paired.contains(node)) {
            changes += strategy.in_right(base, other.document(), *right)?;
        }
        Ok(changes)
    }
}

/// Pairing key of `node`. Falls back to local names so an un-namespaced
/// overlay pairs with a namespaced base.
fn merge_key(identifier: &Identifier, document: &Document, node: NodeId) -> String {
    let key = identifier.identifier(document, node);
    if key.is_empty() {
        identifier.local_identifier(document, node)
    } else {
        key
    }
}

impl DescriptorMerger for DescriptorMergerByTag {
    fn merge(&mut self, base: &mut Descriptor, other: &Descriptor) -> Result<(), ModuleError> {
        let descriptor_type = Arc::clone(base.descriptor_type());
        let mut total = 0;
        for tag in descriptor_type.all_tags() {
            let changes = self
                .merge_tag(base, other, tag)
                .map_err(|e| ModuleError::merge(tag.name(), e))?;
            if changes > 0 {
                trace!(tag = %tag.name(), changes, "Merged tag");
            }
            total += changes;
        }
        debug!(descriptor_type = %descriptor_type.name(), changes = total, "Merged descriptor by tag");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::DescriptorType;
    use crate::grammar::Dtd;
    use crate::merge::{Ignore, MergeStrategy, NodeMergeStrategy, Preserve};
    use crate::xml::{Document, parse_document};
    use rstest::rstest;

    fn web_type() -> Arc<DescriptorType> {
        let dtd = Dtd::parse(
            "<!ELEMENT web-app (display-name?, context-param*, security-constraint*, login-config?)>\
             <!ELEMENT context-param (param-name, param-value)>",
        )
        .unwrap();
        let mut ty = DescriptorType::new("web", dtd);
        ty.add_tag(DescriptorTag::new("display-name", false));
        ty.add_tag(DescriptorTag::new("context-param", true).with_identifier(Identifier::child("param-name")));
        ty.add_tag(DescriptorTag::new("security-constraint", true));
        ty.add_tag(DescriptorTag::new("login-config", false));
        Arc::new(ty)
    }

    fn descriptor(xml: &str) -> Descriptor {
        Descriptor::new(parse_document(xml.as_bytes()).unwrap(), web_type())
    }

    fn params(d: &Descriptor) -> Vec<(String, String)> {
        d.get_tags("context-param")
            .into_iter()
            .map(|n| {
                (
                    d.get_nested_text(n, "param-name").unwrap_or_default(),
                    d.get_nested_text(n, "param-value").unwrap_or_default(),
                )
            })
            .collect()
    }

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items.iter().map(|(a, b)| (a.to_string(), b.to_string())).collect()
    }

    const BASE: &str = "<web-app><display-name>base</display-name>\
        <context-param><param-name>shared</param-name><param-value>left</param-value></context-param>\
        <context-param><param-name>only-left</param-name><param-value>l</param-value></context-param>\
        </web-app>";
    const OVERLAY: &str = "<web-app><display-name>overlay</display-name>\
        <context-param><param-name>shared</param-name><param-value>right</param-value></context-param>\
        <context-param><param-name>only-right</param-name><param-value>r</param-value></context-param>\
        </web-app>";

    #[rstest]
    #[case::overwrite(Arc::new(Overwrite), &[("only-left", "l"), ("shared", "right"), ("only-right", "r")])]
    #[case::preserve(Arc::new(Preserve), &[("shared", "left"), ("only-left", "l"), ("only-right", "r")])]
    #[case::ignore(Arc::new(Ignore), &[("shared", "left"), ("only-left", "l")])]
    fn test_identifier_strategies(#[case] strategy: Arc<dyn MergeStrategy>, #[case] expected: &[(&str, &str)]) {
        let mut base = descriptor(BASE);
        let overlay = descriptor(OVERLAY);
        let mut merger = DescriptorMergerByTag::new();
        merger.set_strategy("context-param", strategy);
        merger.merge(&mut base, &overlay).unwrap();
        assert_eq!(params(&base), pairs(expected));
    }

    #[test]
    fn test_node_merge_strategy_combines_values() {
        let mut base = descriptor(BASE);
        let overlay = descriptor(OVERLAY);
        let mut merger = DescriptorMergerByTag::new();
        merger.set_strategy(
            "context-param",
            Arc::new(
                NodeMergeStrategy::parse(
                    b"<context-param><param-name>$left:param-name</param-name>\
                      <param-value>$left:param-value,$right:param-value</param-value></context-param>",
                )
                .unwrap(),
            ),
        );
        merger.merge(&mut base, &overlay).unwrap();
        assert_eq!(
            params(&base),
            pairs(&[("shared", "left,right"), ("only-left", "l"), ("only-right", "r")])
        );
    }

    #[test]
    fn test_single_tag_default_overwrites() {
        let mut base = descriptor(BASE);
        let overlay = descriptor(OVERLAY);
        DescriptorMergerByTag::new().merge(&mut base, &overlay).unwrap();
        let names = base.get_tags("display-name");
        assert_eq!(names.len(), 1);
        assert_eq!(base.document().text(names[0]), "overlay");
        // Still first child after replacement
        assert_eq!(base.document().child_elements(base.root()).next(), Some(names[0]));
    }

    #[test]
    fn test_single_tag_added_in_grammar_position() {
        let mut base = descriptor("<web-app><security-constraint/></web-app>");
        let overlay = descriptor("<web-app><display-name>x</display-name><login-config/></web-app>");
        DescriptorMergerByTag::new().merge(&mut base, &overlay).unwrap();
        let names: Vec<_> = base
            .document()
            .child_elements(base.root())
            .filter_map(|n| base.document().name(n))
            .collect();
        assert_eq!(names, vec!["display-name", "security-constraint", "login-config"]);
    }

    #[test]
    fn test_repeatable_without_identifier_appends() {
        let mut base = descriptor("<web-app><security-constraint><a/></security-constraint></web-app>");
        let overlay = descriptor("<web-app><security-constraint><b/></security-constraint></web-app>");
        DescriptorMergerByTag::new().merge(&mut base, &overlay).unwrap();
        assert_eq!(base.get_tags("security-constraint").len(), 2);

        let mut ignoring = DescriptorMergerByTag::new();
        ignoring.set_strategy("security-constraint", Arc::new(Ignore));
        let mut base = descriptor("<web-app><security-constraint/></web-app>");
        ignoring.merge(&mut base, &overlay).unwrap();
        assert_eq!(base.get_tags("security-constraint").len(), 1);
    }

    #[test]
    fn test_empty_identifier_never_pairs() {
        let mut base = descriptor("<web-app><context-param><param-value>a</param-value></context-param></web-app>");
        let overlay = descriptor("<web-app><context-param><param-value>b</param-value></context-param></web-app>");
        DescriptorMergerByTag::new().merge(&mut base, &overlay).unwrap();
        assert_eq!(params(&base), pairs(&[("", "a"), ("", "b")]));
    }

    struct Failing;

    impl MergeStrategy for Failing {
        fn in_both(&self, _: &mut Descriptor, _: NodeId, _: &Document, _: NodeId) -> Result<usize, ModuleError> {
            Err(ModuleError::unsupported("no merging here"))
        }

        fn in_left(&self, _: &mut Descriptor, _: NodeId) -> Result<usize, ModuleError> {
            Ok(0)
        }

        fn in_right(&self, _: &mut Descriptor, _: &Document, _: NodeId) -> Result<usize, ModuleError> {
            Ok(0)
        }
    }

    #[test]
    fn test_strategy_error_names_tag() {
        let mut base = descriptor(BASE);
        let overlay = descriptor(OVERLAY);
        let mut merger = DescriptorMergerByTag::new();
        merger.set_default_strategy(Arc::new(Failing));
        let err = merger.merge(&mut base, &overlay).unwrap_err();
        assert!(matches!(err, ModuleError::Merge { ref tag, .. } if tag == "display-name"));
    }
}

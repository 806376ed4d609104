use std::sync::Arc;

use deploy_descriptor::descriptor::ConcatPart;
use deploy_descriptor::grammar::ElementOrder;
use deploy_descriptor::{
    Descriptor, DescriptorIo, DescriptorTag, DescriptorType, Document, Dtd, Identifier, NodeId, WriteOptions, Xsd,
};
use rstest::rstest;
use rustc_hash::FxHashSet;

const SERVLET_DTD: &str = "<!ELEMENT web-app (servlet*,servlet-mapping*)>\n\
<!ELEMENT servlet (servlet-name,servlet-class)>\n\
<!ELEMENT servlet-mapping (servlet-name,url-pattern)>\n\
<!ELEMENT servlet-name (#PCDATA)>";

fn servlet_type() -> Arc<DescriptorType> {
    let dtd = Dtd::parse(SERVLET_DTD).unwrap();
    let mut ty = DescriptorType::new("servlets", dtd);
    ty.add_tag(DescriptorTag::new("servlet", true).with_identifier(Identifier::child("servlet-name")));
    ty.add_tag(DescriptorTag::new("servlet-mapping", true));
    Arc::new(ty)
}

fn names(document: &Document, parent: NodeId) -> Vec<String> {
    document
        .child_elements(parent)
        .filter_map(|n| document.name(n).map(str::to_string))
        .collect()
}

#[test]
fn test_grammar_order_keeps_declaration_and_repeatability() {
    let dtd = Dtd::parse("<!ELEMENT parent (a,b*,c?)>").unwrap();
    let order: Vec<(String, bool)> = dtd
        .element_order("parent")
        .unwrap()
        .iter()
        .map(|t| (t.name().to_string(), t.is_repeatable()))
        .collect();
    assert_eq!(
        order,
        vec![
            ("a".to_string(), false),
            ("b".to_string(), true),
            ("c".to_string(), false),
        ]
    );
}

#[test]
fn test_grammar_leaf_and_unknown_elements() {
    let dtd = Dtd::parse("<!ELEMENT parent (a)>\n<!ELEMENT a (#PCDATA)>").unwrap();
    assert_eq!(dtd.element_order("a").map(<[DescriptorTag]>::len), Some(0));
    assert!(dtd.element_order("missing").is_none());
    let ty = DescriptorType::new("leaf", dtd);
    assert_eq!(ty.element_order("missing"), ElementOrder::Unknown);
}

#[test]
fn test_insertion_between_existing_children() {
    let dtd = Dtd::parse("<!ELEMENT parent (a,b,c)>").unwrap();
    let ty = Arc::new(DescriptorType::new("abc", dtd));
    let document = deploy_descriptor::xml::parse_document(b"<parent><a/><c/></parent>").unwrap();
    let mut descriptor = Descriptor::new(document, ty);
    let root = descriptor.root();
    let b = descriptor.create_element("b");
    descriptor.add_element("b", b, root).unwrap();
    assert_eq!(names(descriptor.document(), root), vec!["a", "b", "c"]);
}

#[rstest]
#[case("a")]
#[case("b")]
#[case("z")]
fn test_insertion_with_unknown_order_appends(#[case] tag: &str) {
    let ty = Arc::new(DescriptorType::new("schema", Xsd::new("urn:example.xsd")));
    let document = deploy_descriptor::xml::parse_document(b"<parent><a/><c/></parent>").unwrap();
    let mut descriptor = Descriptor::new(document, ty);
    let root = descriptor.root();
    let node = descriptor.create_element(tag);
    descriptor.add_element(tag, node, root).unwrap();
    assert_eq!(names(descriptor.document(), root).last().map(String::as_str), Some(tag));
}

#[test]
fn test_tag_identity_is_the_name() {
    let plain = DescriptorTag::new("servlet", true);
    let namespaced = DescriptorTag::new("servlet", true).with_namespace("http://java.sun.com/xml/ns/javaee");
    assert_eq!(plain, namespaced);
    let set: FxHashSet<DescriptorTag> = [plain, namespaced].into_iter().collect();
    assert_eq!(set.len(), 1);
}

#[test]
fn test_registry_falls_back_to_parent() {
    let mut parent = DescriptorType::new("parent", Xsd::default());
    parent.add_tag(DescriptorTag::new("x", true));
    let parent = Arc::new(parent);
    let mut child = DescriptorType::with_parent("child", Arc::clone(&parent), Xsd::default());
    child.add_tag(DescriptorTag::new("y", false));

    assert!(child.tag_by_name("x").unwrap().is_repeatable());
    assert!(parent.tag_by_name("y").is_none());
    let all: FxHashSet<String> = child.all_tags().iter().map(|t| t.name().to_string()).collect();
    assert_eq!(all, ["x", "y"].into_iter().map(str::to_string).collect());
}

#[test]
fn test_replace_element_removes_every_occurrence() {
    let ty = Arc::new(DescriptorType::new("any", Xsd::default()));
    let document = deploy_descriptor::xml::parse_document(
        b"<root><x>1</x><group><x>2</x></group><other/></root>",
    )
    .unwrap();
    let mut descriptor = Descriptor::new(document, ty);
    let group = descriptor.get_tags("group")[0];
    let replacement = descriptor.create_nested_text("x", "3");
    descriptor.replace_element("x", replacement, group).unwrap();

    let remaining: Vec<String> = descriptor
        .get_elements("x")
        .into_iter()
        .map(|n| descriptor.document().text(n))
        .collect();
    assert_eq!(remaining, vec!["3"]);
    assert_eq!(descriptor.document().parent(replacement), Some(group));
}

#[rstest]
#[case::missing_child("servlet-name", "<servlet><other/></servlet>")]
#[case::undeclared_prefix("j2ee:servlet-name", "<servlet><servlet-name>a</servlet-name></servlet>")]
#[case::nested_missing("a/b/c", "<servlet><a/></servlet>")]
fn test_identifier_failures_yield_empty(#[case] expression: &str, #[case] xml: &str) {
    let identifier = Identifier::parse(expression).unwrap();
    let document = deploy_descriptor::xml::parse_document(xml.as_bytes()).unwrap();
    assert_eq!(identifier.identifier(&document, document.root()), "");
}

#[test]
fn test_identifier_on_text_node_yields_empty() {
    let identifier = Identifier::child("servlet-name");
    let document = deploy_descriptor::xml::parse_document(b"<servlet>text</servlet>").unwrap();
    let text = document.children(document.root())[0];
    assert_eq!(identifier.identifier(&document, text), "");
    assert!(identifier.try_identifier(&document, text).is_err());
}

#[test]
fn test_concat_identifier() {
    let identifier = Identifier::concat(&[
        ConcatPart::Child("error-code"),
        ConcatPart::Literal(">"),
        ConcatPart::Child("exception-type"),
    ]);
    let document = deploy_descriptor::xml::parse_document(
        b"<error-page><exception-type>java.lang.Error</exception-type></error-page>",
    )
    .unwrap();
    assert_eq!(identifier.identifier(&document, document.root()), ">java.lang.Error");
    assert_eq!(
        Identifier::parse(identifier.expression()).unwrap().identifier(&document, document.root()),
        ">java.lang.Error"
    );
}

#[test]
fn test_servlets_added_in_grammar_order() {
    let ty = servlet_type();
    let document = deploy_descriptor::xml::parse_document(
        b"<web-app><servlet><servlet-name>foo</servlet-name></servlet>\
          <servlet-mapping><servlet-name>foo</servlet-name></servlet-mapping></web-app>",
    )
    .unwrap();
    let mut descriptor = Descriptor::new(document, ty);
    let root = descriptor.root();

    let bar = descriptor.create_element("servlet");
    let name = descriptor.create_nested_text("servlet-name", "bar");
    descriptor.add_element("servlet-name", name, bar).unwrap();
    descriptor.add_element("servlet", bar, root).unwrap();

    let servlets: Vec<String> = descriptor
        .get_tags("servlet")
        .into_iter()
        .filter_map(|n| descriptor.get_nested_text(n, "servlet-name"))
        .collect();
    assert_eq!(servlets, vec!["foo", "bar"]);
    assert_eq!(names(descriptor.document(), root), vec!["servlet", "servlet", "servlet-mapping"]);
    assert_eq!(descriptor.get_tag_by_identifier("servlet", "bar"), Some(bar));
    assert_eq!(descriptor.get_tag_by_identifier("servlet", ""), None);
}

#[test]
fn test_insertion_point_backs_over_comments() {
    let ty = servlet_type();
    let document = deploy_descriptor::xml::parse_document(
        b"<web-app><servlet/><!-- mappings --><servlet-mapping/></web-app>",
    )
    .unwrap();
    let descriptor = Descriptor::new(document, ty);
    let point = descriptor.get_insertion_point_for("servlet", "web-app").unwrap();
    assert!(descriptor.document().kind(point).is_text_or_comment());
    assert_eq!(descriptor.get_insertion_point_for("servlet-mapping", "web-app"), None);
    assert_eq!(descriptor.get_insertion_point_for("unknown", "web-app"), None);
}

#[test]
fn test_write_and_reload_file() {
    let ty = servlet_type();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("web.xml");

    let mut descriptor = Descriptor::new(Document::new("web-app"), Arc::clone(&ty));
    let root = descriptor.root();
    let servlet = descriptor.create_element("servlet");
    let name = descriptor.create_nested_text("servlet-name", "caf\u{e9}");
    descriptor.add_element("servlet-name", name, servlet).unwrap();
    descriptor.add_element("servlet", servlet, root).unwrap();

    let options = WriteOptions::default().with_encoding("US-ASCII").indented(true);
    DescriptorIo::write_to_file(&descriptor, &path, &options).unwrap();
    let written = std::fs::read_to_string(&path).unwrap();
    assert!(written.is_ascii());
    assert!(written.contains("&#xE9;"));

    let reloaded = DescriptorIo::parse_file(ty, &path).unwrap();
    assert!(reloaded.get_tag_by_identifier("servlet", "caf\u{e9}").is_some());
}

#[test]
fn test_unsupported_encoding() {
    let descriptor = Descriptor::new(Document::new("web-app"), servlet_type());
    let options = WriteOptions::default().with_encoding("EBCDIC");
    let mut out = Vec::new();
    assert!(DescriptorIo::write(&descriptor, &mut out, &options).is_err());
}

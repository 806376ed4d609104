use deploy_descriptor::application::tags::{CONTEXT_ROOT, MODULE, WEB, WEB_URI};
use deploy_descriptor::application::{
    APPLICATION_XML_FILE, ApplicationXml, ApplicationXmlVersion, new_application_xml, parse_application_xml,
};
use deploy_descriptor::{DescriptorIo, WriteOptions};
use rstest::rstest;

const APPLICATION_12: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE application PUBLIC "-//Sun Microsystems, Inc.//DTD J2EE Application 1.2//EN" "http://java.sun.com/j2ee/dtds/application_1_2.dtd">
<application>
  <display-name>shop</display-name>
  <!-- storefront -->
  <module>
    <web>
      <web-uri>store.war</web-uri>
      <context-root>/store</context-root>
    </web>
  </module>
  <module>
    <java>client.jar</java>
  </module>
  <security-role>
    <role-name>clerk</role-name>
  </security-role>
</application>
"#;

#[rstest]
#[case::v12(ApplicationXmlVersion::V1_2)]
#[case::v13(ApplicationXmlVersion::V1_3)]
fn test_new_descriptor_detects_version(#[case] version: ApplicationXmlVersion) {
    let app = new_application_xml(version, "demo").unwrap();
    let xml = app.to_xml(&WriteOptions::default()).unwrap();
    let parsed = parse_application_xml(xml.as_bytes()).unwrap();
    assert_eq!(parsed.version(), Some(version));
    assert!(parsed.web_module_uris().is_empty());
}

#[test]
fn test_module_listing_skips_other_kinds() {
    let app = parse_application_xml(APPLICATION_12.as_bytes()).unwrap();
    assert_eq!(app.web_module_uris(), vec!["store.war"]);
    assert!(app.ejb_modules().is_empty());
}

#[test]
fn test_added_web_module_keeps_comments_in_place() {
    let mut app = parse_application_xml(APPLICATION_12.as_bytes()).unwrap();
    let module = app.add_web_module("admin.war", "/admin").unwrap();
    assert_eq!(app.document().name(module), Some(MODULE));

    let xml = app.to_xml(&WriteOptions::default()).unwrap();
    let comment = xml.find("<!-- storefront -->").unwrap();
    let admin = xml.find("admin.war").unwrap();
    let role = xml.find("<security-role>").unwrap();
    assert!(comment < admin && admin < role);

    let web = app.web_module("admin.war").unwrap();
    let names: Vec<_> = app.document().child_elements(web).filter_map(|n| app.document().name(n)).collect();
    assert_eq!(names, vec![WEB_URI, CONTEXT_ROOT]);
    assert!(app.document().parent(web).is_some_and(|p| app.document().name(p) == Some(MODULE)));
    assert_eq!(app.document().name(web), Some(WEB));
}

#[test]
fn test_write_and_parse_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(APPLICATION_XML_FILE);
    let mut app = parse_application_xml(APPLICATION_12.as_bytes()).unwrap();
    app.add_ejb_module("orders.jar").unwrap();
    DescriptorIo::write_to_file(app.descriptor(), &path, &WriteOptions::default().indented(true)).unwrap();

    let reread = ApplicationXml::parse_file(&path).unwrap();
    assert_eq!(reread.ejb_modules(), vec!["orders.jar"]);
    assert_eq!(reread.web_module_context_root("store.war").unwrap().as_deref(), Some("/store"));
}

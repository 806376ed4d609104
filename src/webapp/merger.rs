//! Merging `web.xml` files.

use std::sync::Arc;

use tracing::{debug, warn};

use super::tags::*;
use super::version::WebXmlVersion;
use super::web_xml::WebXml;
use crate::error::ModuleError;
use crate::merge::{DescriptorMerger, DescriptorMergerByTag, Ignore, MergeStrategy, Overwrite, XmlMerger};
use crate::xml::NodeId;

/// Merger for web application descriptors.
///
/// A merge runs the per-tag merger first, then any added mergers, then the
/// structural merges of filters, servlets, security roles and MIME mappings.
/// The tags handled structurally are ignored by the per-tag merger.
pub struct WebXmlMerger {
    by_tag: DescriptorMergerByTag,
    additional: XmlMerger,
}

impl Default for WebXmlMerger {
    fn default() -> Self {
        Self::new()
    }
}

impl WebXmlMerger {
    pub fn new() -> Self {
        let mut by_tag = DescriptorMergerByTag::new();
        by_tag.set_strategy(LOGIN_CONFIG, Arc::new(Overwrite));
        for tag in [FILTER, FILTER_MAPPING, SERVLET, SERVLET_MAPPING, MIME_MAPPING] {
            by_tag.set_strategy(tag, Arc::new(Ignore));
        }
        Self {
            by_tag,
            additional: XmlMerger::new(),
        }
    }

    /// Strategy the per-tag merger uses for `tag`.
    pub fn set_merge_strategy(&mut self, tag: &str, strategy: Arc<dyn MergeStrategy>) {
        self.by_tag.set_strategy(tag, strategy);
    }

    /// Run `merger` after the per-tag merger.
    pub fn add_merger(&mut self, merger: Box<dyn DescriptorMerger>) {
        self.additional.add_merger(merger);
    }

    /// Fold `other` into `base`.
    pub fn merge(&mut self, base: &mut WebXml, other: &WebXml) -> Result<(), ModuleError> {
        if let (Some(base_version), Some(other_version)) = (base.version(), other.version()) {
            if base_version < other_version {
                warn!(
                    base = %base_version,
                    other = %other_version,
                    "Merging a newer web.xml into an older one, elements may not be valid"
                );
            }
        }

        self.by_tag.init(base.descriptor());
        self.additional.init(base.descriptor());
        self.by_tag.merge(base.descriptor_mut(), other.descriptor())?;
        self.additional.merge(base.descriptor_mut(), other.descriptor())?;

        let filters = if base.version().is_none_or(|v| v >= WebXmlVersion::V2_3) {
            let dispatchers = base.version().is_none_or(|v| v >= WebXmlVersion::V2_4);
            merge_filters(base, other, dispatchers)?
        } else {
            0
        };
        let servlets = merge_servlets(base, other)?;
        let security_roles = merge_security_roles(base, other)?;
        let mime_mappings = merge_mime_mappings(base, other)?;
        debug!(filters, servlets, security_roles, mime_mappings, "Merged web.xml");
        Ok(())
    }

    /// Fold every overlay in turn into `base`.
    pub fn merge_all(&mut self, base: &mut WebXml, overlays: &[WebXml]) -> Result<(), ModuleError> {
        for overlay in overlays {
            self.merge(base, overlay)?;
        }
        Ok(())
    }
}

/// URL patterns and servlet names a mapping element covers.
fn mapping_targets(web_xml: &WebXml, mapping: NodeId) -> Vec<String> {
    let document = web_xml.document();
    document
        .child_elements(mapping)
        .filter(|n| matches!(document.name(*n), Some(URL_PATTERN | SERVLET_NAME)))
        .map(|n| document.text(n).trim().to_string())
        .collect()
}

/// Returns the number of filters added or changed.
fn merge_filters(base: &mut WebXml, other: &WebXml, with_dispatchers: bool) -> Result<usize, ModuleError> {
    let mut count = 0;
    for name in other.filter_names() {
        let mut changed = false;
        match (base.has_filter(&name), other.filter(&name)) {
            (false, Some(filter)) => {
                base.import_tag(other, filter)?;
                changed = true;
            }
            (true, _) => {
                for param in other.filter_init_param_names(&name) {
                    if base.filter_init_param(&name, &param).is_none() {
                        let value = other.filter_init_param(&name, &param).unwrap_or_default();
                        base.add_filter_init_param(&name, &param, &value)?;
                        changed = true;
                    }
                }
            }
            (false, None) => continue,
        }

        let existing: Vec<Vec<String>> = base
            .filter_mapping_elements(&name)
            .into_iter()
            .map(|m| mapping_targets(base, m))
            .collect();
        for mapping in other.filter_mapping_elements(&name) {
            if existing.contains(&mapping_targets(other, mapping)) {
                continue;
            }
            let copy = base.import_tag(other, mapping)?;
            if !with_dispatchers {
                let dispatchers: Vec<NodeId> = base.document().children_named(copy, DISPATCHER).collect();
                for dispatcher in dispatchers {
                    base.descriptor_mut().document_mut().detach(dispatcher);
                }
            }
            changed = true;
        }

        if with_dispatchers {
            let present = base.filter_dispatchers(&name);
            for dispatcher in other.filter_dispatchers(&name) {
                if !present.contains(&dispatcher) && base.add_filter_dispatcher(&name, &dispatcher)? > 0 {
                    changed = true;
                }
            }
        }
        if changed {
            count += 1;
        }
    }
    Ok(count)
}

/// Returns the number of servlets added or changed.
fn merge_servlets(base: &mut WebXml, other: &WebXml) -> Result<usize, ModuleError> {
    let mut count = 0;
    for name in other.servlet_names() {
        let mut changed = false;
        match (base.has_servlet(&name), other.servlet(&name)) {
            (false, Some(servlet)) => {
                base.import_tag(other, servlet)?;
                changed = true;
            }
            (true, _) => {
                for param in other.servlet_init_param_names(&name) {
                    if base.servlet_init_param(&name, &param).is_none() {
                        let value = other.servlet_init_param(&name, &param).unwrap_or_default();
                        base.add_servlet_init_param(&name, &param, &value)?;
                        changed = true;
                    }
                }
                if base.servlet_run_as_role_name(&name).is_none() {
                    if let Some(role) = other.servlet_run_as_role_name(&name) {
                        base.add_servlet_run_as_role_name(&name, &role)?;
                        changed = true;
                    }
                }
            }
            (false, None) => continue,
        }

        let existing = base.servlet_mappings(&name);
        for url_pattern in other.servlet_mappings(&name) {
            if !existing.contains(&url_pattern) {
                base.add_servlet_mapping(&name, &url_pattern)?;
                changed = true;
            }
        }
        if changed {
            count += 1;
        }
    }
    Ok(count)
}

fn merge_security_roles(base: &mut WebXml, other: &WebXml) -> Result<usize, ModuleError> {
    let mut count = 0;
    for role in other.security_role_names() {
        if !base.has_security_role(&role) {
            base.add_security_role(&role)?;
            count += 1;
        }
    }
    Ok(count)
}

fn merge_mime_mappings(base: &mut WebXml, other: &WebXml) -> Result<usize, ModuleError> {
    let mut count = 0;
    for (extension, mime_type) in other.mime_mappings() {
        if !base.has_mime_mapping(&extension) {
            base.add_mime_mapping(&extension, &mime_type)?;
            count += 1;
        }
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::Preserve;
    use crate::webapp::{new_web_xml, parse_web_xml};

    const DOCTYPE_23: &str = r#"<!DOCTYPE web-app PUBLIC "-//Sun Microsystems, Inc.//DTD Web Application 2.3//EN" "http://java.sun.com/dtd/web-app_2_3.dtd">"#;

    fn web_xml_23(body: &str) -> WebXml {
        parse_web_xml(format!("{DOCTYPE_23}<web-app>{body}</web-app>").as_bytes()).unwrap()
    }

    fn web_xml_24(body: &str) -> WebXml {
        parse_web_xml(
            format!(r#"<web-app xmlns="http://java.sun.com/xml/ns/j2ee" version="2.4">{body}</web-app>"#).as_bytes(),
        )
        .unwrap()
    }

    fn context_param_value(web_xml: &WebXml, name: &str) -> Option<String> {
        let param = web_xml.context_param(name)?;
        web_xml.descriptor().get_nested_text(param, PARAM_VALUE)
    }

    #[test]
    fn test_context_params_overwrite_by_default() {
        let mut base = web_xml_23(
            "<context-param><param-name>a</param-name><param-value>base</param-value></context-param>",
        );
        let other = web_xml_23(
            "<context-param><param-name>a</param-name><param-value>other</param-value></context-param>\
             <context-param><param-name>b</param-name><param-value>new</param-value></context-param>",
        );
        WebXmlMerger::new().merge(&mut base, &other).unwrap();
        assert_eq!(context_param_value(&base, "a").as_deref(), Some("other"));
        assert_eq!(context_param_value(&base, "b").as_deref(), Some("new"));
        assert_eq!(base.context_param_names(), vec!["a", "b"]);
    }

    #[test]
    fn test_context_params_with_preserve_strategy() {
        let mut base = web_xml_23(
            "<context-param><param-name>a</param-name><param-value>base</param-value></context-param>",
        );
        let other = web_xml_23(
            "<context-param><param-name>a</param-name><param-value>other</param-value></context-param>",
        );
        let mut merger = WebXmlMerger::new();
        merger.set_merge_strategy(CONTEXT_PARAM, Arc::new(Preserve));
        merger.merge(&mut base, &other).unwrap();
        assert_eq!(context_param_value(&base, "a").as_deref(), Some("base"));
        assert_eq!(base.context_param_names().len(), 1);
    }

    #[test]
    fn test_servlets_merge_structurally() {
        let mut base = web_xml_23(
            "<servlet><servlet-name>s1</servlet-name><servlet-class>S1</servlet-class>\
             <init-param><param-name>p1</param-name><param-value>base</param-value></init-param>\
             <load-on-startup>1</load-on-startup></servlet>\
             <servlet-mapping><servlet-name>s1</servlet-name><url-pattern>/s1</url-pattern></servlet-mapping>",
        );
        let other = web_xml_23(
            "<servlet><servlet-name>s1</servlet-name><servlet-class>Other</servlet-class>\
             <init-param><param-name>p1</param-name><param-value>other</param-value></init-param>\
             <init-param><param-name>p2</param-name><param-value>v2</param-value></init-param>\
             <run-as><role-name>admin</role-name></run-as></servlet>\
             <servlet><servlet-name>s2</servlet-name><servlet-class>S2</servlet-class></servlet>\
             <servlet-mapping><servlet-name>s1</servlet-name><url-pattern>/s1</url-pattern></servlet-mapping>\
             <servlet-mapping><servlet-name>s1</servlet-name><url-pattern>/extra</url-pattern></servlet-mapping>\
             <servlet-mapping><servlet-name>s2</servlet-name><url-pattern>/s2</url-pattern></servlet-mapping>",
        );
        WebXmlMerger::new().merge(&mut base, &other).unwrap();

        assert_eq!(base.servlet_names(), vec!["s1", "s2"]);
        assert_eq!(base.servlet_init_param("s1", "p1").as_deref(), Some("base"));
        assert_eq!(base.servlet_init_param("s1", "p2").as_deref(), Some("v2"));
        assert_eq!(base.servlet_run_as_role_name("s1").as_deref(), Some("admin"));
        assert_eq!(base.servlet_mappings("s1"), vec!["/s1", "/extra"]);
        assert_eq!(base.servlet_mappings("s2"), vec!["/s2"]);
        let s1 = base.servlet("s1").unwrap();
        assert_eq!(base.descriptor().get_nested_text(s1, SERVLET_CLASS).as_deref(), Some("S1"));
    }

    #[test]
    fn test_filters_merge_and_drop_dispatchers_before_2_4() {
        let mut base = web_xml_23(
            "<filter><filter-name>f1</filter-name><filter-class>F1</filter-class></filter>\
             <filter-mapping><filter-name>f1</filter-name><url-pattern>/a</url-pattern></filter-mapping>",
        );
        let other = web_xml_23(
            "<filter><filter-name>f1</filter-name><filter-class>F1</filter-class>\
             <init-param><param-name>p</param-name><param-value>v</param-value></init-param></filter>\
             <filter><filter-name>f2</filter-name><filter-class>F2</filter-class></filter>\
             <filter-mapping><filter-name>f1</filter-name><url-pattern>/a</url-pattern></filter-mapping>\
             <filter-mapping><filter-name>f2</filter-name><url-pattern>/b</url-pattern>\
             <dispatcher>FORWARD</dispatcher></filter-mapping>",
        );
        WebXmlMerger::new().merge(&mut base, &other).unwrap();
        assert_eq!(base.filter_names(), vec!["f1", "f2"]);
        assert_eq!(base.filter_init_param("f1", "p").as_deref(), Some("v"));
        assert_eq!(base.filter_mappings("f1"), vec!["/a"]);
        assert_eq!(base.filter_mappings("f2"), vec!["/b"]);
        assert!(base.filter_dispatchers("f2").is_empty());
    }

    #[test]
    fn test_filter_dispatchers_merge_from_2_4() {
        let mut base = web_xml_24(
            "<filter><filter-name>f</filter-name><filter-class>F</filter-class></filter>\
             <filter-mapping><filter-name>f</filter-name><url-pattern>/a</url-pattern>\
             <dispatcher>REQUEST</dispatcher></filter-mapping>",
        );
        let other = web_xml_24(
            "<filter><filter-name>f</filter-name><filter-class>F</filter-class></filter>\
             <filter-mapping><filter-name>f</filter-name><url-pattern>/a</url-pattern>\
             <dispatcher>FORWARD</dispatcher></filter-mapping>",
        );
        WebXmlMerger::new().merge(&mut base, &other).unwrap();
        assert_eq!(base.filter_dispatchers("f"), vec!["REQUEST", "FORWARD"]);
        assert_eq!(base.filter_mapping_elements("f").len(), 1);
    }

    #[test]
    fn test_filters_skipped_for_2_2() {
        let mut base = new_web_xml(WebXmlVersion::V2_2);
        let other = web_xml_23("<filter><filter-name>f</filter-name><filter-class>F</filter-class></filter>");
        WebXmlMerger::new().merge(&mut base, &other).unwrap();
        assert!(!base.has_filter("f"));
    }

    #[test]
    fn test_roles_mime_and_login_config() {
        let mut base = web_xml_23(
            "<mime-mapping><extension>txt</extension><mime-type>text/plain</mime-type></mime-mapping>\
             <login-config><auth-method>BASIC</auth-method></login-config>\
             <security-role><role-name>user</role-name></security-role>",
        );
        let other = web_xml_23(
            "<mime-mapping><extension>txt</extension><mime-type>text/other</mime-type></mime-mapping>\
             <mime-mapping><extension>xml</extension><mime-type>text/xml</mime-type></mime-mapping>\
             <login-config><auth-method>FORM</auth-method></login-config>\
             <security-role><role-name>user</role-name></security-role>\
             <security-role><role-name>admin</role-name></security-role>",
        );
        WebXmlMerger::new().merge(&mut base, &other).unwrap();
        assert_eq!(
            base.mime_mappings(),
            vec![
                ("txt".to_string(), "text/plain".to_string()),
                ("xml".to_string(), "text/xml".to_string()),
            ]
        );
        assert_eq!(base.login_config_auth_method().as_deref(), Some("FORM"));
        assert_eq!(base.security_role_names(), vec!["user", "admin"]);
    }

    #[test]
    fn test_older_overlay_into_namespaced_base() {
        let mut base = new_web_xml(WebXmlVersion::V2_5);
        base.add_servlet("s1", "S1").unwrap();
        let other = web_xml_23(
            "<servlet><servlet-name>s2</servlet-name><servlet-class>S2</servlet-class></servlet>\
             <servlet-mapping><servlet-name>s2</servlet-name><url-pattern>/s2</url-pattern></servlet-mapping>",
        );
        WebXmlMerger::new().merge(&mut base, &other).unwrap();
        assert!(base.has_servlet("s2"));
        assert_eq!(base.servlet_mappings("s2"), vec!["/s2"]);
    }

    #[test]
    fn test_older_overlay_pairs_with_namespaced_entries() {
        let mut base = parse_web_xml(
            br#"<web-app xmlns="http://java.sun.com/xml/ns/javaee" version="2.5">
                <context-param><param-name>a</param-name><param-value>1</param-value></context-param>
                <filter><filter-name>f</filter-name><filter-class>F</filter-class></filter>
                <listener><listener-class>org.example.Listener</listener-class></listener>
            </web-app>"#,
        )
        .unwrap();
        let other = web_xml_23(
            "<context-param><param-name>a</param-name><param-value>2</param-value></context-param>\
             <filter><filter-name>f</filter-name><filter-class>F</filter-class></filter>\
             <filter-mapping><filter-name>f</filter-name><url-pattern>/f</url-pattern></filter-mapping>\
             <listener><listener-class>org.example.Listener</listener-class></listener>",
        );
        WebXmlMerger::new().merge(&mut base, &other).unwrap();

        assert_eq!(base.context_param_names(), vec!["a"]);
        assert_eq!(context_param_value(&base, "a").as_deref(), Some("2"));
        assert_eq!(base.filter_names(), vec!["f"]);
        assert_eq!(base.filter_mappings("f"), vec!["/f"]);
        assert_eq!(base.descriptor().get_tags(LISTENER).len(), 1);
    }

    #[test]
    fn test_additional_merger_runs() {
        struct CountingMerger(Arc<std::sync::atomic::AtomicUsize>);

        impl DescriptorMerger for CountingMerger {
            fn merge(
                &mut self,
                _base: &mut crate::descriptor::Descriptor,
                _other: &crate::descriptor::Descriptor,
            ) -> Result<(), ModuleError> {
                self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                Ok(())
            }
        }

        let calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let mut merger = WebXmlMerger::new();
        merger.add_merger(Box::new(CountingMerger(Arc::clone(&calls))));
        let mut base = new_web_xml(WebXmlVersion::V2_3);
        let overlays = [new_web_xml(WebXmlVersion::V2_3), new_web_xml(WebXmlVersion::V2_3)];
        merger.merge_all(&mut base, &overlays).unwrap();
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 2);
    }
}

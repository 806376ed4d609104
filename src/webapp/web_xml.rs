//! `web.xml` documents and their common queries and edits.
//!
//! Lookups by business key go through the identifiers of the descriptor
//! type, so `servlet("foo")` finds the root-level `<servlet>` whose
//! `<servlet-name>` is `foo`. Additions go through the element factory and
//! land where the grammar of the version puts them.

use std::path::Path;

use tracing::debug;

use super::tags::*;
use super::types::WebXmlType;
use super::version::WebXmlVersion;
use crate::descriptor::Descriptor;
use crate::error::ModuleError;
use crate::xml::{DocType, Document, NodeId, WriteOptions, document_to_string, parse_document};

/// A web application descriptor.
#[derive(Clone, Debug)]
pub struct WebXml {
    descriptor: Descriptor,
    version: Option<WebXmlVersion>,
}

/// Create an empty `web.xml` of `version`: a DOCTYPE for the DTD-based
/// versions, the default namespace and `version` attribute otherwise.
pub fn new_web_xml(version: WebXmlVersion) -> WebXml {
    let mut document = Document::new(WEB_APP);
    let root = document.root();
    match version.namespace() {
        Some(namespace) => {
            document.set_attribute(root, "xmlns", namespace);
            document.set_attribute(root, "version", version.as_str());
            document.resolve_namespaces();
        }
        None => document.set_doctype(Some(
            DocType::new(WEB_APP).with_ids(version.public_id(), version.system_id()),
        )),
    }
    WebXml {
        descriptor: Descriptor::new(document, WebXmlType::for_version(version)),
        version: Some(version),
    }
}

/// Parse a `web.xml`, picking the descriptor type from the detected
/// version. Undetected versions use the 2.5 type.
pub fn parse_web_xml(input: &[u8]) -> Result<WebXml, ModuleError> {
    let mut document = parse_document(input)?;
    let version = WebXmlVersion::detect(&document);
    let descriptor_type = WebXmlType::for_version(version.unwrap_or(WebXmlVersion::V2_5));
    descriptor_type.bind_elements(&mut document);
    debug!(version = ?version, descriptor_type = %descriptor_type.name(), "Parsed web.xml");
    Ok(WebXml {
        descriptor: Descriptor::new(document, descriptor_type),
        version,
    })
}

impl WebXml {
    /// Wrap a descriptor, detecting the version from its document.
    pub fn from_descriptor(descriptor: Descriptor) -> Self {
        let version = WebXmlVersion::detect(descriptor.document());
        Self { descriptor, version }
    }

    pub fn parse_file(path: &Path) -> Result<Self, ModuleError> {
        parse_web_xml(&std::fs::read(path)?)
    }

    pub fn version(&self) -> Option<WebXmlVersion> {
        self.version
    }

    pub fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    pub fn descriptor_mut(&mut self) -> &mut Descriptor {
        &mut self.descriptor
    }

    pub fn into_descriptor(self) -> Descriptor {
        self.descriptor
    }

    pub fn document(&self) -> &Document {
        self.descriptor.document()
    }

    pub fn to_xml(&self, options: &WriteOptions) -> Result<String, ModuleError> {
        document_to_string(self.document(), options)
    }

    // ── Generic ─────────────────────────────────────────────────────

    /// Add a detached element of this document under the root. Single tags
    /// replace any existing element of the same name.
    pub fn add_tag(&mut self, node: NodeId) -> Result<NodeId, ModuleError> {
        let name = self
            .document()
            .name(node)
            .ok_or_else(|| ModuleError::xml("Only elements can be added as tags"))?
            .to_string();
        let root = self.descriptor.root();
        let repeatable = self
            .descriptor
            .descriptor_type()
            .tag_by_name(&name)
            .is_none_or(|tag| tag.is_repeatable());
        if repeatable {
            self.descriptor.add_element(&name, node, root)
        } else {
            self.descriptor.replace_element(&name, node, root)
        }
    }

    /// Copy a root-level element of `source` into this descriptor.
    pub fn import_tag(&mut self, source: &WebXml, node: NodeId) -> Result<NodeId, ModuleError> {
        let name = source
            .document()
            .name(node)
            .ok_or_else(|| ModuleError::xml("Only elements can be imported"))?
            .to_string();
        let root = self.descriptor.root();
        self.descriptor.add_imported_element(&name, source.document(), node, root)
    }

    /// Set the text of the first `tag` child of `parent`, adding the child
    /// when it is missing.
    fn set_child_text(&mut self, parent: NodeId, tag: &str, text: &str) -> Result<NodeId, ModuleError> {
        let existing = self.document().children_named(parent, tag).next();
        match existing {
            Some(child) => {
                self.descriptor.document_mut().set_text(child, text);
                Ok(child)
            }
            None => {
                let child = self.descriptor.create_nested_text(tag, text);
                self.descriptor.add_element(tag, child, parent)
            }
        }
    }

    fn child_texts(&self, parent: NodeId, tag: &str) -> Vec<String> {
        self.document()
            .children_named(parent, tag)
            .map(|n| self.document().text(n))
            .collect()
    }

    fn names_of(&self, tag: &str, name_tag: &str) -> Vec<String> {
        self.descriptor
            .get_tags(tag)
            .into_iter()
            .filter_map(|n| self.descriptor.get_nested_text(n, name_tag))
            .collect()
    }

    /// Root-level `tag` elements whose `key_tag` child has text `key`.
    fn tags_with(&self, tag: &str, key_tag: &str, key: &str) -> Vec<NodeId> {
        self.descriptor
            .get_tags(tag)
            .into_iter()
            .filter(|n| self.descriptor.get_nested_text(*n, key_tag).as_deref() == Some(key))
            .collect()
    }

    fn init_param_names(&self, parent: Option<NodeId>) -> Vec<String> {
        let Some(parent) = parent else {
            return Vec::new();
        };
        self.document()
            .children_named(parent, INIT_PARAM)
            .filter_map(|n| self.descriptor.get_nested_text(n, PARAM_NAME))
            .collect()
    }

    fn init_param(&self, parent: Option<NodeId>, name: &str) -> Option<String> {
        self.document()
            .children_named(parent?, INIT_PARAM)
            .find(|n| self.descriptor.get_nested_text(*n, PARAM_NAME).as_deref() == Some(name))
            .and_then(|n| self.descriptor.get_nested_text(n, PARAM_VALUE))
    }

    fn create_init_param(&mut self, name: &str, value: &str) -> Result<NodeId, ModuleError> {
        let param = self.descriptor.create_element(INIT_PARAM);
        self.set_child_text(param, PARAM_NAME, name)?;
        self.set_child_text(param, PARAM_VALUE, value)?;
        Ok(param)
    }

    // ── Context parameters ──────────────────────────────────────────

    pub fn context_param(&self, name: &str) -> Option<NodeId> {
        self.descriptor.get_tag_by_identifier(CONTEXT_PARAM, name)
    }

    pub fn has_context_param(&self, name: &str) -> bool {
        self.context_param(name).is_some()
    }

    pub fn context_param_names(&self) -> Vec<String> {
        self.names_of(CONTEXT_PARAM, PARAM_NAME)
    }

    pub fn add_context_param(&mut self, name: &str, value: &str) -> Result<NodeId, ModuleError> {
        if self.has_context_param(name) {
            return Err(ModuleError::duplicate("Context param", name));
        }
        let param = self.descriptor.create_element(CONTEXT_PARAM);
        self.set_child_text(param, PARAM_NAME, name)?;
        self.set_child_text(param, PARAM_VALUE, value)?;
        self.add_tag(param)
    }

    // ── Filters ─────────────────────────────────────────────────────

    pub fn filter(&self, name: &str) -> Option<NodeId> {
        self.descriptor.get_tag_by_identifier(FILTER, name)
    }

    pub fn has_filter(&self, name: &str) -> bool {
        self.filter(name).is_some()
    }

    pub fn filter_names(&self) -> Vec<String> {
        self.names_of(FILTER, FILTER_NAME)
    }

    pub fn filter_names_for_class(&self, class_name: &str) -> Vec<String> {
        self.tags_with(FILTER, FILTER_CLASS, class_name)
            .into_iter()
            .filter_map(|n| self.descriptor.get_nested_text(n, FILTER_NAME))
            .collect()
    }

    pub fn add_filter(&mut self, name: &str, class_name: &str) -> Result<NodeId, ModuleError> {
        if self.has_filter(name) {
            return Err(ModuleError::duplicate("Filter", name));
        }
        let filter = self.descriptor.create_element(FILTER);
        self.set_child_text(filter, FILTER_NAME, name)?;
        self.set_child_text(filter, FILTER_CLASS, class_name)?;
        self.add_tag(filter)
    }

    pub fn filter_init_param_names(&self, filter: &str) -> Vec<String> {
        self.init_param_names(self.filter(filter))
    }

    pub fn filter_init_param(&self, filter: &str, param: &str) -> Option<String> {
        self.init_param(self.filter(filter), param)
    }

    pub fn add_filter_init_param(&mut self, filter: &str, name: &str, value: &str) -> Result<NodeId, ModuleError> {
        let filter_node = self.filter(filter).ok_or_else(|| ModuleError::missing("Filter", filter))?;
        let param = self.create_init_param(name, value)?;
        self.descriptor.add_element(INIT_PARAM, param, filter_node)
    }

    /// `<filter-mapping>` elements of `filter`.
    pub fn filter_mapping_elements(&self, filter: &str) -> Vec<NodeId> {
        self.tags_with(FILTER_MAPPING, FILTER_NAME, filter)
    }

    /// URL patterns mapped to `filter`.
    pub fn filter_mappings(&self, filter: &str) -> Vec<String> {
        self.filter_mapping_elements(filter)
            .into_iter()
            .flat_map(|n| self.child_texts(n, URL_PATTERN))
            .collect()
    }

    pub fn add_filter_mapping(&mut self, filter: &str, url_pattern: &str) -> Result<NodeId, ModuleError> {
        if !self.has_filter(filter) {
            return Err(ModuleError::missing("Filter", filter));
        }
        let mapping = self.descriptor.create_element(FILTER_MAPPING);
        self.set_child_text(mapping, FILTER_NAME, filter)?;
        self.set_child_text(mapping, URL_PATTERN, url_pattern)?;
        self.add_tag(mapping)
    }

    /// Dispatchers declared on the mappings of `filter`, without repeats.
    pub fn filter_dispatchers(&self, filter: &str) -> Vec<String> {
        let mut dispatchers: Vec<String> = Vec::new();
        for mapping in self.filter_mapping_elements(filter) {
            for dispatcher in self.child_texts(mapping, DISPATCHER) {
                if !dispatchers.contains(&dispatcher) {
                    dispatchers.push(dispatcher);
                }
            }
        }
        dispatchers
    }

    /// Add `dispatcher` to every mapping of `filter` that lacks it.
    pub fn add_filter_dispatcher(&mut self, filter: &str, dispatcher: &str) -> Result<usize, ModuleError> {
        let mappings = self.filter_mapping_elements(filter);
        if mappings.is_empty() {
            return Err(ModuleError::missing("Filter mapping", filter));
        }
        let mut added = 0;
        for mapping in mappings {
            if self.child_texts(mapping, DISPATCHER).iter().any(|d| d == dispatcher) {
                continue;
            }
            let node = self.descriptor.create_nested_text(DISPATCHER, dispatcher);
            self.descriptor.add_element(DISPATCHER, node, mapping)?;
            added += 1;
        }
        Ok(added)
    }

    // ── Servlets ────────────────────────────────────────────────────

    pub fn servlet(&self, name: &str) -> Option<NodeId> {
        self.descriptor.get_tag_by_identifier(SERVLET, name)
    }

    pub fn has_servlet(&self, name: &str) -> bool {
        self.servlet(name).is_some()
    }

    pub fn servlet_names(&self) -> Vec<String> {
        self.names_of(SERVLET, SERVLET_NAME)
    }

    pub fn servlet_names_for_class(&self, class_name: &str) -> Vec<String> {
        self.tags_with(SERVLET, SERVLET_CLASS, class_name)
            .into_iter()
            .filter_map(|n| self.descriptor.get_nested_text(n, SERVLET_NAME))
            .collect()
    }

    /// Names of the servlets (anywhere in the document) backed by `jsp_file`.
    pub fn servlet_names_for_jsp_file(&self, jsp_file: &str) -> Vec<String> {
        self.descriptor
            .get_elements(SERVLET)
            .into_iter()
            .filter(|n| self.descriptor.get_nested_text(*n, JSP_FILE).as_deref() == Some(jsp_file))
            .filter_map(|n| self.descriptor.get_nested_text(n, SERVLET_NAME))
            .collect()
    }

    pub fn add_servlet(&mut self, name: &str, class_name: &str) -> Result<NodeId, ModuleError> {
        self.add_servlet_with(name, SERVLET_CLASS, class_name)
    }

    /// Add a servlet backed by a JSP page instead of a class.
    pub fn add_jsp_file(&mut self, name: &str, jsp_file: &str) -> Result<NodeId, ModuleError> {
        self.add_servlet_with(name, JSP_FILE, jsp_file)
    }

    fn add_servlet_with(&mut self, name: &str, target_tag: &str, target: &str) -> Result<NodeId, ModuleError> {
        if self.has_servlet(name) {
            return Err(ModuleError::duplicate("Servlet", name));
        }
        let servlet = self.descriptor.create_element(SERVLET);
        self.set_child_text(servlet, SERVLET_NAME, name)?;
        self.set_child_text(servlet, target_tag, target)?;
        self.add_tag(servlet)
    }

    pub fn servlet_init_param_names(&self, servlet: &str) -> Vec<String> {
        self.init_param_names(self.servlet(servlet))
    }

    pub fn servlet_init_param(&self, servlet: &str, param: &str) -> Option<String> {
        self.init_param(self.servlet(servlet), param)
    }

    /// Add an init parameter to `servlet`, ahead of its `<load-on-startup>`.
    pub fn add_servlet_init_param(&mut self, servlet: &str, name: &str, value: &str) -> Result<NodeId, ModuleError> {
        let servlet_node = self.servlet(servlet).ok_or_else(|| ModuleError::missing("Servlet", servlet))?;
        let param = self.create_init_param(name, value)?;
        let load_on_startup = self.document().children_named(servlet_node, LOAD_ON_STARTUP).next();
        match load_on_startup {
            Some(reference) => {
                self.descriptor
                    .document_mut()
                    .insert_before(servlet_node, reference, param)?;
                Ok(param)
            }
            None => self.descriptor.add_element(INIT_PARAM, param, servlet_node),
        }
    }

    /// Role name of the `<run-as>` of `servlet`.
    pub fn servlet_run_as_role_name(&self, servlet: &str) -> Option<String> {
        let run_as = self.document().children_named(self.servlet(servlet)?, RUN_AS).next()?;
        self.descriptor.get_nested_text(run_as, ROLE_NAME)
    }

    pub fn add_servlet_run_as_role_name(&mut self, servlet: &str, role: &str) -> Result<NodeId, ModuleError> {
        let servlet_node = self.servlet(servlet).ok_or_else(|| ModuleError::missing("Servlet", servlet))?;
        let run_as = self.descriptor.create_element(RUN_AS);
        self.set_child_text(run_as, ROLE_NAME, role)?;
        self.descriptor.add_element(RUN_AS, run_as, servlet_node)
    }

    /// URL patterns mapped to `servlet`.
    pub fn servlet_mappings(&self, servlet: &str) -> Vec<String> {
        self.tags_with(SERVLET_MAPPING, SERVLET_NAME, servlet)
            .into_iter()
            .flat_map(|n| self.child_texts(n, URL_PATTERN))
            .collect()
    }

    pub fn add_servlet_mapping(&mut self, servlet: &str, url_pattern: &str) -> Result<NodeId, ModuleError> {
        if !self.has_servlet(servlet) {
            return Err(ModuleError::missing("Servlet", servlet));
        }
        let mapping = self.descriptor.create_element(SERVLET_MAPPING);
        self.set_child_text(mapping, SERVLET_NAME, servlet)?;
        self.set_child_text(mapping, URL_PATTERN, url_pattern)?;
        self.add_tag(mapping)
    }

    // ── Security ────────────────────────────────────────────────────

    pub fn security_role(&self, name: &str) -> Option<NodeId> {
        self.descriptor.get_tag_by_identifier(SECURITY_ROLE, name)
    }

    pub fn has_security_role(&self, name: &str) -> bool {
        self.security_role(name).is_some()
    }

    /// Names of every security role in the document.
    pub fn security_role_names(&self) -> Vec<String> {
        self.descriptor
            .get_elements(SECURITY_ROLE)
            .into_iter()
            .filter_map(|n| self.descriptor.get_nested_text(n, ROLE_NAME))
            .collect()
    }

    pub fn add_security_role(&mut self, name: &str) -> Result<NodeId, ModuleError> {
        if self.has_security_role(name) {
            return Err(ModuleError::duplicate("Security role", name));
        }
        let role = self.descriptor.create_element(SECURITY_ROLE);
        self.set_child_text(role, ROLE_NAME, name)?;
        self.add_tag(role)
    }

    /// The security constraint whose first web resource collection covers
    /// `url_pattern`.
    pub fn security_constraint(&self, url_pattern: &str) -> Option<NodeId> {
        self.descriptor.get_tags(SECURITY_CONSTRAINT).into_iter().find(|n| {
            self.document()
                .children_named(*n, WEB_RESOURCE_COLLECTION)
                .next()
                .and_then(|c| self.descriptor.get_nested_text(c, URL_PATTERN))
                .as_deref()
                == Some(url_pattern)
        })
    }

    pub fn has_security_constraint(&self, url_pattern: &str) -> bool {
        self.security_constraint(url_pattern).is_some()
    }

    pub fn add_security_constraint(
        &mut self,
        web_resource_name: &str,
        url_pattern: &str,
        roles: &[&str],
    ) -> Result<NodeId, ModuleError> {
        if self.has_security_constraint(url_pattern) {
            return Err(ModuleError::duplicate("Security constraint for URL pattern", url_pattern));
        }
        let constraint = self.descriptor.create_element(SECURITY_CONSTRAINT);
        let collection = self.descriptor.create_element(WEB_RESOURCE_COLLECTION);
        self.set_child_text(collection, WEB_RESOURCE_NAME, web_resource_name)?;
        self.set_child_text(collection, URL_PATTERN, url_pattern)?;
        self.descriptor.add_element(WEB_RESOURCE_COLLECTION, collection, constraint)?;

        let auth = self.descriptor.create_element(AUTH_CONSTRAINT);
        for role in roles {
            let node = self.descriptor.create_nested_text(ROLE_NAME, role);
            self.descriptor.add_element(ROLE_NAME, node, auth)?;
        }
        self.descriptor.add_element(AUTH_CONSTRAINT, auth, constraint)?;
        self.add_tag(constraint)
    }

    pub fn has_login_config(&self) -> bool {
        !self.descriptor.get_tags(LOGIN_CONFIG).is_empty()
    }

    pub fn login_config_auth_method(&self) -> Option<String> {
        let config = self.descriptor.get_tags(LOGIN_CONFIG).into_iter().next()?;
        self.descriptor.get_nested_text(config, AUTH_METHOD)
    }

    /// Replace the login configuration.
    pub fn set_login_config(&mut self, auth_method: &str, realm_name: &str) -> Result<NodeId, ModuleError> {
        let config = self.descriptor.create_element(LOGIN_CONFIG);
        self.set_child_text(config, AUTH_METHOD, auth_method)?;
        self.set_child_text(config, REALM_NAME, realm_name)?;
        let root = self.descriptor.root();
        self.descriptor.replace_element(LOGIN_CONFIG, config, root)
    }

    // ── MIME mappings ───────────────────────────────────────────────

    pub fn mime_mapping(&self, extension: &str) -> Option<NodeId> {
        self.tags_with(MIME_MAPPING, EXTENSION, extension).into_iter().next()
    }

    pub fn has_mime_mapping(&self, extension: &str) -> bool {
        self.mime_mapping(extension).is_some()
    }

    /// `(extension, mime-type)` pairs in document order.
    pub fn mime_mappings(&self) -> Vec<(String, String)> {
        self.descriptor
            .get_tags(MIME_MAPPING)
            .into_iter()
            .map(|n| {
                (
                    self.descriptor.get_nested_text(n, EXTENSION).unwrap_or_default(),
                    self.descriptor.get_nested_text(n, MIME_TYPE).unwrap_or_default(),
                )
            })
            .collect()
    }

    pub fn add_mime_mapping(&mut self, extension: &str, mime_type: &str) -> Result<NodeId, ModuleError> {
        if self.has_mime_mapping(extension) {
            return Err(ModuleError::duplicate("Mime mapping", extension));
        }
        let mapping = self.descriptor.create_element(MIME_MAPPING);
        self.set_child_text(mapping, EXTENSION, extension)?;
        self.set_child_text(mapping, MIME_TYPE, mime_type)?;
        self.add_tag(mapping)
    }
}

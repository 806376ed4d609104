//! `application.xml` documents and their module queries and edits.

use std::path::Path;

use tracing::debug;

use super::tags::*;
use super::types::ApplicationXmlType;
use super::version::ApplicationXmlVersion;
use crate::descriptor::Descriptor;
use crate::error::ModuleError;
use crate::xml::{DocType, Document, NodeId, WriteOptions, document_to_string, parse_document};

/// File name of the descriptor inside `META-INF`.
pub const APPLICATION_XML_FILE: &str = "application.xml";

/// An enterprise application descriptor.
#[derive(Clone, Debug)]
pub struct ApplicationXml {
    descriptor: Descriptor,
    version: Option<ApplicationXmlVersion>,
}

/// Create an `application.xml` of `version` holding only the required
/// `<display-name>`.
pub fn new_application_xml(version: ApplicationXmlVersion, display_name: &str) -> Result<ApplicationXml, ModuleError> {
    let mut document = Document::new(APPLICATION);
    document.set_doctype(Some(
        DocType::new(APPLICATION).with_ids(Some(version.public_id()), Some(version.system_id())),
    ));
    let mut descriptor = Descriptor::new(document, ApplicationXmlType::for_version(Some(version)));
    let name = descriptor.create_nested_text(DISPLAY_NAME, display_name);
    let root = descriptor.root();
    descriptor.add_element(DISPLAY_NAME, name, root)?;
    Ok(ApplicationXml {
        descriptor,
        version: Some(version),
    })
}

/// Parse an `application.xml`, picking the descriptor type from the
/// DOCTYPE.
pub fn parse_application_xml(input: &[u8]) -> Result<ApplicationXml, ModuleError> {
    let mut document = parse_document(input)?;
    let version = ApplicationXmlVersion::detect(&document);
    let descriptor_type = ApplicationXmlType::for_version(version);
    descriptor_type.bind_elements(&mut document);
    debug!(version = ?version, descriptor_type = %descriptor_type.name(), "Parsed application.xml");
    Ok(ApplicationXml {
        descriptor: Descriptor::new(document, descriptor_type),
        version,
    })
}

impl ApplicationXml {
    pub fn parse_file(path: &Path) -> Result<Self, ModuleError> {
        parse_application_xml(&std::fs::read(path)?)
    }

    pub fn version(&self) -> Option<ApplicationXmlVersion> {
        self.version
    }

    pub fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    pub fn descriptor_mut(&mut self) -> &mut Descriptor {
        &mut self.descriptor
    }

    pub fn document(&self) -> &Document {
        self.descriptor.document()
    }

    pub fn to_xml(&self, options: &WriteOptions) -> Result<String, ModuleError> {
        document_to_string(self.document(), options)
    }

    /// The `<web>` element of the module whose `<web-uri>` is `web_uri`.
    pub fn web_module(&self, web_uri: &str) -> Option<NodeId> {
        self.web_elements()
            .find(|web| self.descriptor.get_nested_text(*web, WEB_URI).as_deref() == Some(web_uri))
    }

    /// Context root of the web module `web_uri`.
    pub fn web_module_context_root(&self, web_uri: &str) -> Result<Option<String>, ModuleError> {
        let web = self
            .web_module(web_uri)
            .ok_or_else(|| ModuleError::missing("Web module", web_uri))?;
        Ok(self.descriptor.get_nested_text(web, CONTEXT_ROOT))
    }

    /// `<web-uri>` of every web module, in document order.
    pub fn web_module_uris(&self) -> Vec<String> {
        self.web_elements()
            .filter_map(|web| self.descriptor.get_nested_text(web, WEB_URI))
            .collect()
    }

    /// Jar name of every EJB module, in document order.
    pub fn ejb_modules(&self) -> Vec<String> {
        self.descriptor
            .get_elements(MODULE)
            .into_iter()
            .filter_map(|module| self.descriptor.get_nested_text(module, EJB))
            .collect()
    }

    /// Add a web module deployed from `uri` under `context_root`.
    pub fn add_web_module(&mut self, uri: &str, context_root: &str) -> Result<NodeId, ModuleError> {
        let module = self.descriptor.create_element(MODULE);
        let web = self.descriptor.create_element(WEB);
        let web_uri = self.descriptor.create_nested_text(WEB_URI, uri);
        let context = self.descriptor.create_nested_text(CONTEXT_ROOT, context_root);
        self.descriptor.add_element(WEB_URI, web_uri, web)?;
        self.descriptor.add_element(CONTEXT_ROOT, context, web)?;
        self.descriptor.add_element(WEB, web, module)?;
        self.add_module(module)
    }

    /// Add an EJB module packaged as `name`.
    pub fn add_ejb_module(&mut self, name: &str) -> Result<NodeId, ModuleError> {
        let module = self.descriptor.create_element(MODULE);
        let ejb = self.descriptor.create_nested_text(EJB, name);
        self.descriptor.add_element(EJB, ejb, module)?;
        self.add_module(module)
    }

    fn add_module(&mut self, module: NodeId) -> Result<NodeId, ModuleError> {
        let root = self.descriptor.root();
        self.descriptor.add_element(MODULE, module, root)
    }

    fn web_elements(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.descriptor
            .get_elements(MODULE)
            .into_iter()
            .filter_map(|module| self.document().children_named(module, WEB).next())
    }
}

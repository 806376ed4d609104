//! `ejb-jar.xml` documents and their bean listings.

use std::sync::{Arc, LazyLock};

use tracing::debug;

use crate::descriptor::{Descriptor, DescriptorTag, DescriptorType};
use crate::error::ModuleError;
use crate::grammar::Xsd;
use crate::xml::{Document, NodeId, parse_document};

/// File name of the descriptor inside `META-INF`.
pub const EJB_JAR_XML_FILE: &str = "ejb-jar.xml";

const SESSION: &str = "session";
const ENTITY: &str = "entity";
const EJB_NAME: &str = "ejb-name";
const LOCAL: &str = "local";
const LOCAL_HOME: &str = "local-home";

static EJB_JAR_XML: LazyLock<Arc<DescriptorType>> = LazyLock::new(|| {
    let mut ty = DescriptorType::new("ejb-jar", Xsd::default());
    for name in [SESSION, ENTITY] {
        ty.add_tag(DescriptorTag::new(name, true));
    }
    for name in [EJB_NAME, LOCAL, LOCAL_HOME] {
        ty.add_tag(DescriptorTag::new(name, false));
    }
    Arc::new(ty)
});

/// Registry of the `ejb-jar.xml` descriptor type.
pub struct EjbJarXmlType;

impl EjbJarXmlType {
    pub fn get() -> Arc<DescriptorType> {
        Arc::clone(&EJB_JAR_XML)
    }
}

/// A session or entity bean declaration.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EjbDefinition {
    pub id: Option<String>,
    pub name: Option<String>,
    pub local: Option<String>,
    pub local_home: Option<String>,
}

/// An EJB module descriptor.
#[derive(Clone, Debug)]
pub struct EjbJarXml {
    descriptor: Descriptor,
}

pub fn parse_ejb_jar_xml(input: &[u8]) -> Result<EjbJarXml, ModuleError> {
    let document = parse_document(input)?;
    let descriptor = Descriptor::new(document, EjbJarXmlType::get());
    debug!(
        sessions = descriptor.get_elements(SESSION).len(),
        entities = descriptor.get_elements(ENTITY).len(),
        "Parsed ejb-jar.xml"
    );
    Ok(EjbJarXml { descriptor })
}

impl EjbJarXml {
    pub fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    pub fn document(&self) -> &Document {
        self.descriptor.document()
    }

    pub fn session_ejbs(&self) -> Vec<EjbDefinition> {
        self.definitions(SESSION)
    }

    pub fn entity_ejbs(&self) -> Vec<EjbDefinition> {
        self.definitions(ENTITY)
    }

    /// First session bean named `name`.
    pub fn session_ejb(&self, name: &str) -> Option<EjbDefinition> {
        self.session_ejbs().into_iter().find(|ejb| ejb.name.as_deref() == Some(name))
    }

    /// First entity bean named `name`.
    pub fn entity_ejb(&self, name: &str) -> Option<EjbDefinition> {
        self.entity_ejbs().into_iter().find(|ejb| ejb.name.as_deref() == Some(name))
    }

    fn definitions(&self, tag: &str) -> Vec<EjbDefinition> {
        self.descriptor
            .get_elements(tag)
            .into_iter()
            .map(|node| self.definition(node))
            .collect()
    }

    fn definition(&self, node: NodeId) -> EjbDefinition {
        EjbDefinition {
            id: self.document().attribute(node, "id").map(str::to_string),
            name: self.descriptor.get_child_text(node, EJB_NAME),
            local: self.descriptor.get_child_text(node, LOCAL),
            local_home: self.descriptor.get_child_text(node, LOCAL_HOME),
        }
    }
}

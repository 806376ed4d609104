//! EJB module descriptors (`META-INF/ejb-jar.xml`).
//!
//! Read-only: the descriptor is queried for its session and entity beans.
//! Bean declarations are unordered, so one schema-backed type serves every
//! version.

mod ejb_jar_xml;

pub use ejb_jar_xml::{EJB_JAR_XML_FILE, EjbDefinition, EjbJarXml, EjbJarXmlType, parse_ejb_jar_xml};

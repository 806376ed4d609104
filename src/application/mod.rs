//! Enterprise application descriptors (`META-INF/application.xml`).
//!
//! ```text
//! bytes ──parse_application_xml──▶ ApplicationXml { Descriptor, version }
//!                                     │ web modules, ejb modules
//!                                     ▼
//!                              ApplicationXmlType (1.2, 1.3, schema)
//! ```

mod application_xml;
pub mod tags;
mod types;
mod version;

pub use application_xml::{APPLICATION_XML_FILE, ApplicationXml, new_application_xml, parse_application_xml};
pub use types::ApplicationXmlType;
pub use version::ApplicationXmlVersion;

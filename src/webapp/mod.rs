//! Web application descriptors (`WEB-INF/web.xml`).
//!
//! ```text
//! bytes ──parse_web_xml──▶ WebXml { Descriptor, version }
//!                             │ helpers: servlets, filters, roles, ...
//!                             ▼
//!                        WebXmlMerger ──▶ per-tag strategies + structural merges
//! ```
//!
//! Every version shares one [`WebXmlType`](types::WebXmlType) registry,
//! built on first use.

mod merger;
pub mod tags;
mod types;
mod version;
mod web_xml;

pub use merger::WebXmlMerger;
pub use types::WebXmlType;
pub use version::{J2EE_NAMESPACE, JAVAEE_NAMESPACE, WebXmlVersion};
pub use web_xml::{WebXml, new_web_xml, parse_web_xml};

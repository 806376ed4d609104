//! Shared descriptor types of `application.xml`.
//!
//! The DTD versions carry element ordering; documents with no recognised
//! DOCTYPE share a schema-backed type without it.

use std::sync::{Arc, LazyLock};

use tracing::warn;

use super::tags::*;
use super::version::ApplicationXmlVersion;
use crate::descriptor::{DescriptorTag, DescriptorType, Identifier, SkeletonBinding};
use crate::grammar::{Dtd, Grammar, Xsd};

static APPLICATION_XML_12: LazyLock<Arc<DescriptorType>> = LazyLock::new(|| {
    let mut ty = DescriptorType::new("application 1.2", dtd_grammar(ApplicationXmlVersion::V1_2));
    register_catalog(&mut ty);
    Arc::new(ty)
});

static APPLICATION_XML_13: LazyLock<Arc<DescriptorType>> = LazyLock::new(|| {
    Arc::new(DescriptorType::with_parent(
        "application 1.3",
        Arc::clone(&APPLICATION_XML_12),
        dtd_grammar(ApplicationXmlVersion::V1_3),
    ))
});

static APPLICATION_XML_SCHEMA: LazyLock<Arc<DescriptorType>> = LazyLock::new(|| {
    Arc::new(DescriptorType::with_parent(
        "application (schema)",
        Arc::clone(&APPLICATION_XML_13),
        Xsd::default(),
    ))
});

/// Registry of the `application.xml` descriptor types.
pub struct ApplicationXmlType;

impl ApplicationXmlType {
    /// Shared descriptor type of `version`; `None` gives the unordered
    /// schema type.
    pub fn for_version(version: Option<ApplicationXmlVersion>) -> Arc<DescriptorType> {
        let ty = match version {
            Some(ApplicationXmlVersion::V1_2) => &APPLICATION_XML_12,
            Some(ApplicationXmlVersion::V1_3) => &APPLICATION_XML_13,
            None => &APPLICATION_XML_SCHEMA,
        };
        Arc::clone(ty)
    }
}

fn dtd_grammar(version: ApplicationXmlVersion) -> Grammar {
    match Dtd::bundled(Some(version.public_id()), version.system_id()) {
        Ok(dtd) => dtd.into(),
        Err(e) => {
            warn!(version = %version, error = %e, "Could not load application.xml grammar, insertion order disabled");
            Xsd::default().into()
        }
    }
}

fn register_catalog(ty: &mut DescriptorType) {
    for name in [ICON, DISPLAY_NAME, DESCRIPTION, CONNECTOR, EJB, JAVA, WEB, WEB_URI, CONTEXT_ROOT, ALT_DD] {
        ty.add_tag(DescriptorTag::new(name, false));
    }
    ty.add_tag(DescriptorTag::new(MODULE, true));
    ty.add_tag(DescriptorTag::new(ROLE_NAME, true));
    ty.add_tag(
        DescriptorTag::new(SECURITY_ROLE, true)
            .with_identifier(Identifier::child(ROLE_NAME))
            .with_binding(Arc::new(SkeletonBinding::new(SECURITY_ROLE, &[ROLE_NAME]))),
    );
}

//! Shared descriptor types for every `web.xml` version.
//!
//! ```text
//! 2.2 (DTD 2.2) ◀──parent── 2.3 (DTD 2.3)
//! 2.4 (DTD 2.3 order, j2ee namespace)
//! 2.5 (schema, javaee namespace) ◀──parent── 3.0 (schema)
//! ```
//!
//! Each type is built on first use and shared afterwards.

use std::sync::{Arc, LazyLock};

use tracing::warn;

use super::tags::*;
use super::version::{J2EE_NAMESPACE, JAVAEE_NAMESPACE, WebXmlVersion};
use crate::descriptor::{ConcatPart, DescriptorTag, DescriptorType, Identifier, SkeletonBinding};
use crate::grammar::{Dtd, Grammar, Xsd};

static WEB_XML_22: LazyLock<Arc<DescriptorType>> = LazyLock::new(|| {
    let mut ty = DescriptorType::new("web-app 2.2", dtd_grammar(WebXmlVersion::V2_2));
    register_catalog(&mut ty, None);
    Arc::new(ty)
});

static WEB_XML_23: LazyLock<Arc<DescriptorType>> = LazyLock::new(|| {
    Arc::new(DescriptorType::with_parent(
        "web-app 2.3",
        Arc::clone(&WEB_XML_22),
        dtd_grammar(WebXmlVersion::V2_3),
    ))
});

static WEB_XML_24: LazyLock<Arc<DescriptorType>> = LazyLock::new(|| {
    let mut ty = DescriptorType::new("web-app 2.4", dtd_grammar(WebXmlVersion::V2_3));
    register_catalog(&mut ty, Some(("j2ee", J2EE_NAMESPACE)));
    Arc::new(ty)
});

static WEB_XML_25: LazyLock<Arc<DescriptorType>> = LazyLock::new(|| {
    let mut ty = DescriptorType::new(
        "web-app 2.5",
        Xsd::new("http://java.sun.com/xml/ns/javaee/web-app_2_5.xsd"),
    );
    register_catalog(&mut ty, Some(("javaee", JAVAEE_NAMESPACE)));
    Arc::new(ty)
});

static WEB_XML_30: LazyLock<Arc<DescriptorType>> = LazyLock::new(|| {
    Arc::new(DescriptorType::with_parent(
        "web-app 3.0",
        Arc::clone(&WEB_XML_25),
        Xsd::new("http://java.sun.com/xml/ns/javaee/web-app_3_0.xsd"),
    ))
});

/// Registry of the `web.xml` descriptor types.
pub struct WebXmlType;

impl WebXmlType {
    /// Shared descriptor type of `version`.
    pub fn for_version(version: WebXmlVersion) -> Arc<DescriptorType> {
        let ty = match version {
            WebXmlVersion::V2_2 => &WEB_XML_22,
            WebXmlVersion::V2_3 => &WEB_XML_23,
            WebXmlVersion::V2_4 => &WEB_XML_24,
            WebXmlVersion::V2_5 => &WEB_XML_25,
            WebXmlVersion::V3_0 => &WEB_XML_30,
        };
        Arc::clone(ty)
    }
}

/// Bundled DTD of a DTD-based version. A grammar that cannot be loaded
/// leaves the type without ordering.
fn dtd_grammar(version: WebXmlVersion) -> Grammar {
    let (Some(public_id), Some(system_id)) = (version.public_id(), version.system_id()) else {
        return Xsd::default().into();
    };
    match Dtd::bundled(Some(public_id), system_id) {
        Ok(dtd) => dtd.into(),
        Err(e) => {
            warn!(version = %version, error = %e, "Could not load web.xml grammar, insertion order disabled");
            Xsd::default().into()
        }
    }
}

const SINGLE: &[&str] = &[
    ICON,
    DISPLAY_NAME,
    DESCRIPTION,
    DISTRIBUTABLE,
    SESSION_CONFIG,
    WELCOME_FILE_LIST,
    AUTH_CONSTRAINT,
    LOGIN_CONFIG,
];

/// Repeatable tags keyed by the text of one child, with the children a
/// new element starts with.
const KEYED: &[(&str, &str, &[&str])] = &[
    (CONTEXT_PARAM, PARAM_NAME, &[PARAM_NAME, PARAM_VALUE]),
    (FILTER, FILTER_NAME, &[FILTER_NAME, FILTER_CLASS]),
    (FILTER_MAPPING, FILTER_NAME, &[FILTER_NAME]),
    (INIT_PARAM, PARAM_NAME, &[PARAM_NAME, PARAM_VALUE]),
    (LISTENER, LISTENER_CLASS, &[LISTENER_CLASS]),
    (SERVLET, SERVLET_NAME, &[SERVLET_NAME]),
    (SECURITY_ROLE, ROLE_NAME, &[ROLE_NAME]),
    (MIME_MAPPING, EXTENSION, &[EXTENSION, MIME_TYPE]),
    (EJB_REF, EJB_REF_NAME, &[EJB_REF_NAME]),
];

const REPEATABLE: &[&str] = &[
    SECURITY_CONSTRAINT,
    PARAM_NAME,
    PARAM_VALUE,
    FILTER_NAME,
    FILTER_CLASS,
    DISPATCHER,
    LISTENER_CLASS,
    SERVLET_NAME,
    JSP_FILE,
    SERVLET_CLASS,
    LOAD_ON_STARTUP,
    RUN_AS,
    SERVLET_MAPPING,
    URL_PATTERN,
    EXTENSION,
    MIME_TYPE,
    TAGLIB,
    RESOURCE_ENV_REF,
    RESOURCE_REF,
    WEB_RESOURCE_COLLECTION,
    WEB_RESOURCE_NAME,
    AUTH_METHOD,
    REALM_NAME,
    ROLE_NAME,
    ENV_ENTRY,
    EJB_LOCAL_REF,
    EJB_REF_NAME,
    EJB_REF_TYPE,
    LOCAL,
    LOCAL_HOME,
    REMOTE,
    HOME,
    EJB_LINK,
];

/// Register the `web.xml` tags. With a namespace, tags are created in it and
/// identifiers only match elements of that namespace.
fn register_catalog(ty: &mut DescriptorType, namespace: Option<(&str, &str)>) {
    let tag = |name: &str, repeatable: bool| {
        let tag = DescriptorTag::new(name, repeatable);
        match namespace {
            Some((_, uri)) => tag.with_namespace(uri),
            None => tag,
        }
    };
    let child = |path: &str| match namespace {
        Some((prefix, uri)) => Identifier::child(&format!("{prefix}:{path}")).with_namespace(prefix, uri),
        None => Identifier::child(path),
    };

    for name in SINGLE {
        ty.add_tag(tag(name, false));
    }
    for name in REPEATABLE {
        ty.add_tag(tag(name, true));
    }
    for &(name, key, skeleton) in KEYED {
        ty.add_tag(
            tag(name, true)
                .with_identifier(child(key))
                .with_binding(Arc::new(SkeletonBinding::new(name, skeleton))),
        );
    }
    ty.add_tag(tag(ERROR_PAGE, true).with_identifier(Identifier::concat(&[
        ConcatPart::Child(ERROR_CODE),
        ConcatPart::Literal(">"),
        ConcatPart::Child(EXCEPTION_TYPE),
    ])));
}

//! Servlet specification versions of `web.xml`.

use std::fmt;
use std::str::FromStr;

use crate::error::ModuleError;
use crate::xml::Document;

pub const J2EE_NAMESPACE: &str = "http://java.sun.com/xml/ns/j2ee";
pub const JAVAEE_NAMESPACE: &str = "http://java.sun.com/xml/ns/javaee";

/// Version of a web application descriptor. Ordering follows the version
/// number.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WebXmlVersion {
    V2_2,
    V2_3,
    V2_4,
    V2_5,
    V3_0,
}

impl WebXmlVersion {
    pub const ALL: [WebXmlVersion; 5] = [Self::V2_2, Self::V2_3, Self::V2_4, Self::V2_5, Self::V3_0];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::V2_2 => "2.2",
            Self::V2_3 => "2.3",
            Self::V2_4 => "2.4",
            Self::V2_5 => "2.5",
            Self::V3_0 => "3.0",
        }
    }

    /// DOCTYPE public id of the DTD-based versions.
    pub fn public_id(self) -> Option<&'static str> {
        match self {
            Self::V2_2 => Some("-//Sun Microsystems, Inc.//DTD Web Application 2.2//EN"),
            Self::V2_3 => Some("-//Sun Microsystems, Inc.//DTD Web Application 2.3//EN"),
            _ => None,
        }
    }

    /// DOCTYPE system id of the DTD-based versions.
    pub fn system_id(self) -> Option<&'static str> {
        match self {
            Self::V2_2 => Some("http://java.sun.com/j2ee/dtds/web-app_2_2.dtd"),
            Self::V2_3 => Some("http://java.sun.com/dtd/web-app_2_3.dtd"),
            _ => None,
        }
    }

    /// Default namespace of the schema-based versions.
    pub fn namespace(self) -> Option<&'static str> {
        match self {
            Self::V2_2 | Self::V2_3 => None,
            Self::V2_4 => Some(J2EE_NAMESPACE),
            Self::V2_5 | Self::V3_0 => Some(JAVAEE_NAMESPACE),
        }
    }

    pub fn from_public_id(public_id: &str) -> Option<Self> {
        [Self::V2_2, Self::V2_3]
            .into_iter()
            .find(|v| v.public_id() == Some(public_id))
    }

    /// Version named by the root `version` attribute. Only the schema-based
    /// versions carry one.
    pub fn from_version_attribute(value: &str) -> Option<Self> {
        match value.trim() {
            "2.4" => Some(Self::V2_4),
            "2.5" => Some(Self::V2_5),
            "3.0" => Some(Self::V3_0),
            _ => None,
        }
    }

    /// Lowest version using `namespace` as its default namespace.
    pub fn from_namespace(namespace: &str) -> Option<Self> {
        match namespace {
            J2EE_NAMESPACE => Some(Self::V2_4),
            JAVAEE_NAMESPACE => Some(Self::V2_5),
            _ => None,
        }
    }

    /// Detect the version of a parsed descriptor: DOCTYPE public id first,
    /// then the root `version` attribute, then the root namespace.
    pub fn detect(document: &Document) -> Option<Self> {
        if let Some(version) = document
            .doctype()
            .and_then(|d| d.public_id.as_deref())
            .and_then(Self::from_public_id)
        {
            return Some(version);
        }
        let root = document.element(document.root())?;
        root.attribute("version")
            .and_then(Self::from_version_attribute)
            .or_else(|| root.namespace().and_then(Self::from_namespace))
    }
}

impl fmt::Display for WebXmlVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WebXmlVersion {
    type Err = ModuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|v| v.as_str() == s.trim())
            .ok_or_else(|| ModuleError::unsupported(format!("web.xml version {s}")))
    }
}

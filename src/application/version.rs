//! J2EE versions of `application.xml`.

use std::fmt;
use std::str::FromStr;

use crate::error::ModuleError;
use crate::xml::Document;

/// Version of an enterprise application descriptor. Ordering follows the
/// version number.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ApplicationXmlVersion {
    V1_2,
    V1_3,
}

impl ApplicationXmlVersion {
    pub const ALL: [ApplicationXmlVersion; 2] = [Self::V1_2, Self::V1_3];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::V1_2 => "1.2",
            Self::V1_3 => "1.3",
        }
    }

    pub fn public_id(self) -> &'static str {
        match self {
            Self::V1_2 => "-//Sun Microsystems, Inc.//DTD J2EE Application 1.2//EN",
            Self::V1_3 => "-//Sun Microsystems, Inc.//DTD J2EE Application 1.3//EN",
        }
    }

    pub fn system_id(self) -> &'static str {
        match self {
            Self::V1_2 => "http://java.sun.com/j2ee/dtds/application_1_2.dtd",
            Self::V1_3 => "http://java.sun.com/dtd/application_1_3.dtd",
        }
    }

    pub fn from_public_id(public_id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.public_id() == public_id)
    }

    /// Version named by the DOCTYPE public id of `document`.
    pub fn detect(document: &Document) -> Option<Self> {
        document
            .doctype()
            .and_then(|d| d.public_id.as_deref())
            .and_then(Self::from_public_id)
    }
}

impl fmt::Display for ApplicationXmlVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApplicationXmlVersion {
    type Err = ModuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|v| v.as_str() == s.trim())
            .ok_or_else(|| ModuleError::unsupported(format!("application.xml version {s}")))
    }
}

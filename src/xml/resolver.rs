//! Entity resolution for DTD grammars.
//!
//! Well-known public identifiers map to a local file name. Bundled grammars
//! are served from memory. An `http`/`https` system identifier with no local
//! counterpart is fetched over the network (feature `remote`); a failed fetch
//! yields an empty grammar so parsing can continue without element ordering.
//! Anything else is looked up on the local filesystem.

use std::path::Path;
#[cfg(feature = "remote")]
use std::time::Duration;

use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use crate::error::ModuleError;

/// Public identifiers with a known local file name.
const PUBLIC_IDENTIFIERS: &[(&str, &str)] = &[
    // application.xml
    ("-//Sun Microsystems, Inc.//DTD J2EE Application 1.2//EN", "application_1_2.dtd"),
    ("-//Sun Microsystems, Inc.//DTD J2EE Application 1.3//EN", "application_1_3.dtd"),
    // ejb-jar.xml
    ("-//Sun Microsystems, Inc.//DTD Enterprise JavaBeans 2.0//EN", "ejb-jar_2_0.dtd"),
    // web.xml
    ("-//Sun Microsystems, Inc.//DTD Web Application 2.2//EN", "web-app_2_2.dtd"),
    ("-//Sun Microsystems, Inc.//DTD Web Application 2.3//EN", "web-app_2_3.dtd"),
    // orion
    ("-//ORACLE//DTD OC4J Enterprise JavaBeans runtime 9.04//EN", "orion-ejb-jar-9_04.dtd"),
    ("-//ORACLE//DTD OC4J Web Application 9.04//EN", "orion-web-9_04.dtd"),
    // weblogic
    ("-//BEA Systems, Inc.//DTD WebLogic 8.1.0 EJB//EN", "weblogic-ejb-jar.dtd"),
    ("-//BEA Systems, Inc.//DTD Web Application 8.1//EN", "weblogic810-web-jar.dtd"),
    // jboss
    ("-//JBoss//DTD JBOSS 4.0//EN", "jboss_4_0.dtd"),
    ("-//JBoss//DTD Web Service Reference 4.0//EN", "service-ref_4_0.dtd"),
    ("-//JBoss//DTD Web Application 2.4//EN", "jboss-web_4_0.dtd"),
    ("-//JBoss//DTD JBOSS 4.2//EN", "jboss_4_2.dtd"),
    ("-//JBoss//DTD Web Service Reference 4.2//EN", "service-ref_4_2.dtd"),
    ("-//JBoss//DTD Web Application 4.2//EN", "jboss-web_4_2.dtd"),
    ("-//JBoss//DTD JBOSS 5.0//EN", "jboss_5_0.dtd"),
    ("-//JBoss//DTD Web Service Reference 5.0//EN", "service-ref_5_0.dtd"),
    ("-//JBoss//DTD Web Application 5.0//EN", "jboss-web_5_0.dtd"),
];

/// Grammars compiled into the crate.
const BUNDLED: &[(&str, &str)] = &[
    ("web-app_2_2.dtd", include_str!("../../resources/dtd/web-app_2_2.dtd")),
    ("web-app_2_3.dtd", include_str!("../../resources/dtd/web-app_2_3.dtd")),
    ("application_1_2.dtd", include_str!("../../resources/dtd/application_1_2.dtd")),
    ("application_1_3.dtd", include_str!("../../resources/dtd/application_1_3.dtd")),
];

#[cfg(feature = "remote")]
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Local file name for a DTD: the mapped name for a known public id,
/// otherwise the last path segment of the system id.
pub fn dtd_file_name(public_id: Option<&str>, system_id: &str) -> String {
    public_id
        .and_then(|id| {
            PUBLIC_IDENTIFIERS
                .iter()
                .find(|(known, _)| *known == id)
                .map(|(_, file)| (*file).to_string())
        })
        .unwrap_or_else(|| {
            let start = system_id.rfind('/').map_or(0, |i| i + 1);
            system_id[start..].to_string()
        })
}

/// Locates the text of an external grammar.
pub trait EntityResolver {
    fn resolve(&self, public_id: Option<&str>, system_id: &str) -> Result<String, ModuleError>;
}

/// Resolver backed by the bundled grammars plus any registered extras.
#[derive(Clone, Debug, Default)]
pub struct BundledEntityResolver {
    extra: FxHashMap<String, String>,
}

impl BundledEntityResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register grammar text under a file name, shadowing a bundled one.
    pub fn with_resource(mut self, file_name: impl Into<String>, text: impl Into<String>) -> Self {
        self.extra.insert(file_name.into(), text.into());
        self
    }

    fn lookup(&self, file_name: &str) -> Option<String> {
        self.extra.get(file_name).cloned().or_else(|| {
            BUNDLED
                .iter()
                .find(|(name, _)| *name == file_name)
                .map(|(_, text)| (*text).to_string())
        })
    }
}

impl EntityResolver for BundledEntityResolver {
    fn resolve(&self, public_id: Option<&str>, system_id: &str) -> Result<String, ModuleError> {
        let file_name = dtd_file_name(public_id, system_id);
        if let Some(text) = self.lookup(&file_name) {
            debug!(file = %file_name, "Resolved bundled grammar");
            return Ok(text);
        }

        if system_id.starts_with("http://") || system_id.starts_with("https://") {
            return Ok(fetch_remote(system_id));
        }

        let local = system_id
            .strip_prefix("file://")
            .or_else(|| system_id.strip_prefix("file:"))
            .or_else(|| (!system_id.contains("://")).then_some(system_id));
        match local {
            Some(path) if Path::new(path).is_file() => {
                debug!(path = %path, "Resolved grammar from filesystem");
                Ok(std::fs::read_to_string(path)?)
            }
            _ => Err(ModuleError::UnresolvedEntity {
                public_id: public_id.map(str::to_string),
                system_id: system_id.to_string(),
            }),
        }
    }
}

/// Body of a remote grammar, or empty text when it cannot be fetched.
#[cfg(feature = "remote")]
fn fetch_remote(url: &str) -> String {
    let response = reqwest::blocking::Client::builder()
        .timeout(FETCH_TIMEOUT)
        .build()
        .and_then(|client| client.get(url).send())
        .and_then(|response| response.error_for_status())
        .and_then(|response| response.text());
    match response {
        Ok(text) => {
            debug!(url = %url, "Fetched remote grammar");
            text
        }
        Err(e) => {
            warn!(url = %url, error = %e, "Failed to fetch grammar, continuing without it");
            String::new()
        }
    }
}

#[cfg(not(feature = "remote"))]
fn fetch_remote(url: &str) -> String {
    warn!(url = %url, "Remote grammar fetching is disabled, continuing without it");
    String::new()
}

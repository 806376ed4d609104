//! EJB module archives.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{DefaultJarArchive, JarArchive};
use crate::ejb::{EjbJarXml, parse_ejb_jar_xml};
use crate::error::ModuleError;

/// Path of the deployment descriptor inside an EJB jar.
pub const EJB_JAR_XML_PATH: &str = "META-INF/ejb-jar.xml";

/// An EJB jar with its parsed `ejb-jar.xml`.
#[derive(Clone, Debug)]
pub struct DefaultEjbArchive {
    jar: DefaultJarArchive,
    ejb_jar_xml: Option<EjbJarXml>,
}

impl DefaultEjbArchive {
    pub fn new(jar: DefaultJarArchive) -> Self {
        Self { jar, ejb_jar_xml: None }
    }

    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self::new(DefaultJarArchive::open(path))
    }

    pub fn from_bytes(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self::new(DefaultJarArchive::from_bytes(bytes))
    }

    /// The module's `ejb-jar.xml`, parsed on first call.
    pub fn ejb_jar_xml(&mut self) -> Result<&EjbJarXml, ModuleError> {
        let ejb_jar_xml = match self.ejb_jar_xml.take() {
            Some(ejb_jar_xml) => ejb_jar_xml,
            None => {
                let bytes = self
                    .jar
                    .get_resource(EJB_JAR_XML_PATH)?
                    .ok_or_else(|| ModuleError::missing("Archive entry", EJB_JAR_XML_PATH))?;
                parse_ejb_jar_xml(&bytes)?
            }
        };
        Ok(self.ejb_jar_xml.insert(ejb_jar_xml))
    }
}

impl JarArchive for DefaultEjbArchive {
    fn get_resource(&self, path: &str) -> Result<Option<Vec<u8>>, ModuleError> {
        self.jar.get_resource(path)
    }

    fn get_resources(&self, prefix: &str) -> Result<Vec<String>, ModuleError> {
        self.jar.get_resources(prefix)
    }

    fn expand_to_path(&self, target: &Path, filter: Option<&dyn Fn(&str) -> bool>) -> Result<usize, ModuleError> {
        self.jar.expand_to_path(target, filter)
    }
}

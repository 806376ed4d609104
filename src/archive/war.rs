//! Web application archives.

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::{DefaultJarArchive, JarArchive, class_entry};
use crate::error::ModuleError;
use crate::webapp::{WebXml, WebXmlVersion, new_web_xml, parse_web_xml};
use crate::xml::WriteOptions;

/// Path of the deployment descriptor inside a war.
pub const WEB_XML_PATH: &str = "WEB-INF/web.xml";

const WEB_INF_CLASSES: &str = "WEB-INF/classes/";
const WEB_INF_LIB: &str = "WEB-INF/lib/";

/// A war whose `web.xml` can be edited and written back.
///
/// The descriptor is parsed on first access and kept; a war without one
/// starts from an empty 2.5 descriptor.
#[derive(Clone, Debug)]
pub struct DefaultWarArchive {
    jar: DefaultJarArchive,
    web_xml: Option<WebXml>,
}

impl DefaultWarArchive {
    pub fn new(jar: DefaultJarArchive) -> Self {
        Self { jar, web_xml: None }
    }

    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self::new(DefaultJarArchive::open(path))
    }

    pub fn from_bytes(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self::new(DefaultJarArchive::from_bytes(bytes))
    }

    pub fn jar(&self) -> &DefaultJarArchive {
        &self.jar
    }

    /// The war's `web.xml`, loaded on first call.
    pub fn web_xml(&mut self) -> Result<&mut WebXml, ModuleError> {
        let web_xml = match self.web_xml.take() {
            Some(web_xml) => web_xml,
            None => self.load_web_xml()?,
        };
        Ok(self.web_xml.insert(web_xml))
    }

    fn load_web_xml(&self) -> Result<WebXml, ModuleError> {
        match self.jar.get_resource(WEB_XML_PATH)? {
            Some(bytes) => parse_web_xml(&bytes),
            None => {
                debug!("War has no web.xml, starting from an empty descriptor");
                Ok(new_web_xml(WebXmlVersion::V2_5))
            }
        }
    }

    /// The archive with its current `web.xml`: every other entry is copied
    /// unchanged and the descriptor is written last, indented.
    pub fn to_bytes(&mut self) -> Result<Vec<u8>, ModuleError> {
        let xml = self.web_xml()?.to_xml(&WriteOptions::default().indented(true))?;
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let copied = self.jar.with_archive(|archive| {
            let mut copied = 0;
            for i in 0..archive.len() {
                let entry = archive
                    .by_index(i)
                    .map_err(|e| ModuleError::archive(format!("Failed to read entry {i}: {e}")))?;
                if entry.name() == WEB_XML_PATH {
                    continue;
                }
                let name = entry.name().to_string();
                writer
                    .raw_copy_file(entry)
                    .map_err(|e| ModuleError::archive(format!("Failed to copy {name}: {e}")))?;
                copied += 1;
            }
            Ok(copied)
        })?;

        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        writer
            .start_file(WEB_XML_PATH, options)
            .map_err(|e| ModuleError::archive(format!("Failed to add {WEB_XML_PATH}: {e}")))?;
        writer.write_all(xml.as_bytes())?;
        let buffer = writer
            .finish()
            .map_err(|e| ModuleError::archive(format!("Failed to finish archive: {e}")))?;
        debug!(copied, "Assembled war");
        Ok(buffer.into_inner())
    }

    /// Write the archive with its current `web.xml` to `path`. The source
    /// is read completely first, so `path` may be the war's own file.
    pub fn store(&mut self, path: &Path) -> Result<(), ModuleError> {
        let bytes = self.to_bytes()?;
        std::fs::write(path, bytes)?;
        info!(path = %path.display(), "Stored war");
        Ok(())
    }
}

impl JarArchive for DefaultWarArchive {
    /// Looks in `WEB-INF/classes`, then in every jar under `WEB-INF/lib`.
    fn contains_class(&self, class_name: &str) -> Result<bool, ModuleError> {
        let entry = class_entry(class_name);
        if self.jar.get_resource(&format!("{WEB_INF_CLASSES}{entry}"))?.is_some() {
            return Ok(true);
        }
        for library in self.jar.get_resources(WEB_INF_LIB)? {
            if !library.ends_with(".jar") {
                continue;
            }
            let Some(bytes) = self.jar.get_resource(&library)? else {
                continue;
            };
            if DefaultJarArchive::from_bytes(bytes).contains_class(class_name)? {
                debug!(class = %class_name, library = %library, "Found class in library");
                return Ok(true);
            }
        }
        Ok(false)
    }

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

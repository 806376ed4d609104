//! Merging several wars into one.
//!
//! ```text
//! war 1 ─┐                         entries: later wars overwrite earlier ones
//! war 2 ─┼─▶ MergedWarArchive ──▶  WEB-INF/web.xml: WebXmlMerger over all wars
//! jars  ─┘                         WEB-INF/lib: extra jars added last
//! ```

use std::fs;
use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;
use tracing::{debug, info, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::war::{DefaultWarArchive, WEB_XML_PATH};
use super::JarArchive;
use crate::error::ModuleError;
use crate::webapp::{WebXml, WebXmlMerger};
use crate::xml::WriteOptions;

const WEB_INF_LIB: &str = "WEB-INF/lib/";

/// Entry name to content; `None` marks a directory.
type Entries = IndexMap<String, Option<Vec<u8>>, FxBuildHasher>;

/// Collects wars and hands them out as one [`MergedWarArchive`].
#[derive(Default)]
pub struct WarArchiveMerger {
    result: MergedWarArchive,
}

impl WarArchiveMerger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_merge_item(&mut self, war: DefaultWarArchive) {
        self.result.add(war);
    }

    /// Merger used for the `web.xml` of the next result.
    pub fn web_xml_merger(&mut self) -> &mut WebXmlMerger {
        self.result.web_xml_merger()
    }

    /// The wars added so far as one archive; the merger starts over empty.
    pub fn perform_merge(&mut self) -> MergedWarArchive {
        std::mem::take(&mut self.result)
    }
}

/// A view of several wars as one. The first war is the base of the merged
/// `web.xml`.
pub struct MergedWarArchive {
    wars: Vec<DefaultWarArchive>,
    jars: Vec<PathBuf>,
    merge_jar_files: bool,
    web_xml_merger: WebXmlMerger,
    merged_web_xml: Option<WebXml>,
}

impl Default for MergedWarArchive {
    fn default() -> Self {
        Self {
            wars: Vec::new(),
            jars: Vec::new(),
            merge_jar_files: true,
            web_xml_merger: WebXmlMerger::new(),
            merged_web_xml: None,
        }
    }
}

impl MergedWarArchive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, war: DefaultWarArchive) {
        self.wars.push(war);
        self.merged_web_xml = None;
    }

    /// Add a jar file to `WEB-INF/lib` of the result.
    pub fn add_jar(&mut self, path: impl Into<PathBuf>) {
        self.jars.push(path.into());
    }

    /// When off, the libraries of the wars are dropped and only the jars
    /// added with [`Self::add_jar`] end up in `WEB-INF/lib`.
    pub fn set_merge_jar_files(&mut self, merge: bool) {
        self.merge_jar_files = merge;
    }

    pub fn web_xml_merger(&mut self) -> &mut WebXmlMerger {
        &mut self.web_xml_merger
    }

    /// The `web.xml` of the first war with every later one merged in,
    /// computed on first call.
    pub fn web_xml(&mut self) -> Result<&WebXml, ModuleError> {
        let merged = match self.merged_web_xml.take() {
            Some(merged) => merged,
            None => self.merge_web_xml()?,
        };
        Ok(self.merged_web_xml.insert(merged))
    }

    fn merge_web_xml(&mut self) -> Result<WebXml, ModuleError> {
        let (first, rest) = self
            .wars
            .split_first_mut()
            .ok_or_else(|| ModuleError::archive("No war to merge"))?;
        let mut merged = first.web_xml()?.clone();
        for war in rest {
            self.web_xml_merger.merge(&mut merged, war.web_xml()?)?;
        }
        debug!(wars = self.wars.len(), "Merged web.xml of wars");
        Ok(merged)
    }

    /// Entries of the merged war, in first-seen order.
    fn assemble(&mut self) -> Result<Entries, ModuleError> {
        let xml = self.web_xml()?.to_xml(&WriteOptions::default().indented(true))?;
        let mut entries = Entries::default();
        for war in &self.wars {
            war.jar().with_archive(|archive| {
                for i in 0..archive.len() {
                    let mut entry = archive
                        .by_index(i)
                        .map_err(|e| ModuleError::archive(format!("Failed to read entry {i}: {e}")))?;
                    if entry.enclosed_name().is_none() {
                        warn!(entry = %entry.name(), "Skipping archive entry outside the target directory");
                        continue;
                    }
                    let content = if entry.is_dir() {
                        None
                    } else {
                        let mut content = Vec::new();
                        entry.read_to_end(&mut content)?;
                        Some(content)
                    };
                    entries.insert(entry.name().to_string(), content);
                }
                Ok(())
            })?;
        }

        if !self.merge_jar_files {
            entries.retain(|name, _| !(name.starts_with(WEB_INF_LIB) && name.to_ascii_lowercase().ends_with(".jar")));
        }
        for jar in &self.jars {
            let Some(file_name) = jar.file_name() else {
                warn!(jar = %jar.display(), "Skipping jar without a file name");
                continue;
            };
            let name = format!("{WEB_INF_LIB}{}", file_name.to_string_lossy());
            entries.insert(name, Some(fs::read(jar)?));
        }
        entries.insert(WEB_XML_PATH.to_string(), Some(xml.into_bytes()));
        Ok(entries)
    }

    /// Write the merged war below `target`.
    pub fn merge_to_path(&mut self, target: &Path) -> Result<usize, ModuleError> {
        let entries = self.assemble()?;
        for (name, content) in &entries {
            let out = target.join(name);
            match content {
                None => fs::create_dir_all(&out)?,
                Some(bytes) => {
                    if let Some(parent) = out.parent() {
                        fs::create_dir_all(parent)?;
                    }
                    fs::write(&out, bytes)?;
                }
            }
        }
        debug!(target = %target.display(), written = entries.len(), "Expanded merged war");
        Ok(entries.len())
    }

    pub fn to_bytes(&mut self) -> Result<Vec<u8>, ModuleError> {
        let entries = self.assemble()?;
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        for (name, content) in &entries {
            let written = match content {
                None => writer.add_directory(name.as_str(), options),
                Some(_) => writer.start_file(name.as_str(), options),
            };
            written.map_err(|e| ModuleError::archive(format!("Failed to add {name}: {e}")))?;
            if let Some(bytes) = content {
                writer.write_all(bytes)?;
            }
        }
        let buffer = writer
            .finish()
            .map_err(|e| ModuleError::archive(format!("Failed to finish archive: {e}")))?;
        Ok(buffer.into_inner())
    }

    pub fn store(&mut self, path: &Path) -> Result<(), ModuleError> {
        let bytes = self.to_bytes()?;
        fs::write(path, bytes)?;
        info!(path = %path.display(), wars = self.wars.len(), "Stored merged war");
        Ok(())
    }
}

impl JarArchive for MergedWarArchive {
    fn contains_class(&self, class_name: &str) -> Result<bool, ModuleError> {
        for war in &self.wars {
            if war.contains_class(class_name)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Content from the first war holding `path`.
    fn get_resource(&self, path: &str) -> Result<Option<Vec<u8>>, ModuleError> {
        for war in &self.wars {
            if let Some(content) = war.get_resource(path)? {
                return Ok(Some(content));
            }
        }
        Ok(None)
    }

    /// Entries of every war in turn; names held by several wars repeat.
    fn get_resources(&self, prefix: &str) -> Result<Vec<String>, ModuleError> {
        let mut resources = Vec::new();
        for war in &self.wars {
            resources.extend(war.get_resources(prefix)?);
        }
        Ok(resources)
    }

    /// Expands every war in turn, so later wars overwrite earlier files.
    /// The merged `web.xml` is written by [`MergedWarArchive::merge_to_path`].
    fn expand_to_path(&self, target: &Path, filter: Option<&dyn Fn(&str) -> bool>) -> Result<usize, ModuleError> {
        let mut written = 0;
        for war in &self.wars {
            written += war.expand_to_path(target, filter)?;
        }
        Ok(written)
    }
}

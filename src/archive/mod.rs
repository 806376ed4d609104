//! Read-only access to zip/jar archives.
//!
//! Every call reopens the archive from its source and scans it; nothing is
//! cached between calls. A byte-backed archive can be shared freely across
//! threads. A file-backed archive reads whatever the file holds at call time.
//!
//! The jar manifest is metadata rather than a resource: listings skip
//! `META-INF/MANIFEST.MF`, and [`DefaultJarArchive::manifest`] reads it.

use std::fs::{self, File};
use std::io::{BufReader, Cursor, Read, Seek};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};
use zip::ZipArchive;
use zip::result::ZipError;

use crate::error::ModuleError;

mod ejb;
mod merged;
mod war;

pub use ejb::{DefaultEjbArchive, EJB_JAR_XML_PATH};
pub use merged::{MergedWarArchive, WarArchiveMerger};
pub use war::{DefaultWarArchive, WEB_XML_PATH};

/// Path of the jar manifest entry.
pub const MANIFEST_PATH: &str = "META-INF/MANIFEST.MF";

/// Entry-level queries over a jar-structured archive.
pub trait JarArchive {
    /// Whether the archive holds the class file of a binary class name such
    /// as `org.example.Main`.
    fn contains_class(&self, class_name: &str) -> Result<bool, ModuleError> {
        Ok(self.get_resource(&class_entry(class_name))?.is_some())
    }

    /// Path of the first entry whose last path segment is `name`.
    fn find_resource(&self, name: &str) -> Result<Option<String>, ModuleError> {
        Ok(self
            .get_resources("")?
            .into_iter()
            .find(|entry| entry.rsplit('/').next() == Some(name)))
    }

    /// Content of the entry at exactly `path`, or `None` if absent.
    fn get_resource(&self, path: &str) -> Result<Option<Vec<u8>>, ModuleError>;

    /// Entries under the directory `prefix`, excluding the directory entry
    /// itself and the manifest. An empty prefix lists everything else.
    fn get_resources(&self, prefix: &str) -> Result<Vec<String>, ModuleError>;

    /// Extract the entries accepted by `filter` (all when `None`) below
    /// `target`. Returns the number of entries written.
    fn expand_to_path(&self, target: &Path, filter: Option<&dyn Fn(&str) -> bool>) -> Result<usize, ModuleError>;
}

/// Entry path of the class file of a binary class name.
pub(crate) fn class_entry(class_name: &str) -> String {
    format!("{}.class", class_name.replace('.', "/"))
}

trait ReadSeek: Read + Seek {}

impl<T: Read + Seek> ReadSeek for T {}

#[derive(Clone, Debug)]
enum Source {
    Bytes(Arc<[u8]>),
    File(PathBuf),
}

/// Archive backed by an in-memory buffer or a file on disk.
#[derive(Clone, Debug)]
pub struct DefaultJarArchive {
    source: Source,
}

impl DefaultJarArchive {
    pub fn from_bytes(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            source: Source::Bytes(bytes.into()),
        }
    }

    /// Read the whole stream into memory.
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self, ModuleError> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Ok(Self::from_bytes(bytes))
    }

    /// Archive read from `path` on every call.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            source: Source::File(path.into()),
        }
    }

    /// Every entry name, in archive order.
    pub fn list_entries(&self) -> Result<Vec<String>, ModuleError> {
        self.with_archive(|archive| {
            (0..archive.len())
                .map(|i| {
                    archive
                        .by_index(i)
                        .map(|entry| entry.name().to_string())
                        .map_err(|e| ModuleError::archive(format!("Failed to read entry {i}: {e}")))
                })
                .collect()
        })
    }

    /// Content of the jar manifest, if the archive has one.
    pub fn manifest(&self) -> Result<Option<Vec<u8>>, ModuleError> {
        self.get_resource(MANIFEST_PATH)
    }

    fn with_archive<'a, T>(
        &'a self,
        op: impl FnOnce(&mut ZipArchive<Box<dyn ReadSeek + 'a>>) -> Result<T, ModuleError>,
    ) -> Result<T, ModuleError> {
        let reader: Box<dyn ReadSeek + 'a> = match &self.source {
            Source::Bytes(bytes) => Box::new(Cursor::new(bytes.as_ref())),
            Source::File(path) => Box::new(BufReader::new(File::open(path)?)),
        };
        let mut archive =
            ZipArchive::new(reader).map_err(|e| ModuleError::archive(format!("Failed to open archive: {e}")))?;
        op(&mut archive)
    }
}

impl JarArchive for DefaultJarArchive {
    fn get_resource(&self, path: &str) -> Result<Option<Vec<u8>>, ModuleError> {
        self.with_archive(|archive| match archive.by_name(path) {
            Ok(mut entry) => {
                let mut content = Vec::new();
                entry.read_to_end(&mut content)?;
                Ok(Some(content))
            }
            Err(ZipError::FileNotFound) => Ok(None),
            Err(e) => Err(ModuleError::archive(format!("Failed to read {path}: {e}"))),
        })
    }

    fn get_resources(&self, prefix: &str) -> Result<Vec<String>, ModuleError> {
        let prefix = if prefix.is_empty() || prefix.ends_with('/') {
            prefix.to_string()
        } else {
            format!("{prefix}/")
        };
        Ok(self
            .list_entries()?
            .into_iter()
            .filter(|name| name.starts_with(&prefix) && *name != prefix && name != MANIFEST_PATH)
            .collect())
    }

    fn expand_to_path(&self, target: &Path, filter: Option<&dyn Fn(&str) -> bool>) -> Result<usize, ModuleError> {
        let written = self.with_archive(|archive| {
            let mut written = 0;
            for i in 0..archive.len() {
                let mut entry = archive
                    .by_index(i)
                    .map_err(|e| ModuleError::archive(format!("Failed to read entry {i}: {e}")))?;
                if filter.is_some_and(|accept| !accept(entry.name())) {
                    continue;
                }
                let Some(relative) = entry.enclosed_name() else {
                    warn!(entry = %entry.name(), "Skipping archive entry outside the target directory");
                    continue;
                };
                let out = target.join(relative);
                if entry.is_dir() {
                    fs::create_dir_all(&out)?;
                } else {
                    if let Some(parent) = out.parent() {
                        fs::create_dir_all(parent)?;
                    }
                    let mut file = File::create(&out)?;
                    std::io::copy(&mut entry, &mut file)?;
                }
                written += 1;
            }
            Ok(written)
        })?;
        debug!(target = %target.display(), written, "Expanded archive");
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::ZipWriter;
    use zip::write::SimpleFileOptions;

    pub(super) fn build(entries: &[(&str, Option<&[u8]>)]) -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        {
            let mut zip = ZipWriter::new(&mut buffer);
            let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
            for (name, content) in entries {
                match content {
                    Some(bytes) => {
                        zip.start_file(*name, options).unwrap();
                        zip.write_all(bytes).unwrap();
                    }
                    None => zip.add_directory(*name, options).unwrap(),
                }
            }
            zip.finish().unwrap();
        }
        buffer.into_inner()
    }

    fn web_archive() -> DefaultJarArchive {
        DefaultJarArchive::from_bytes(build(&[
            ("rootResource.txt", Some(b"root".as_slice())),
            ("WEB-INF/", None),
            ("WEB-INF/web.xml", Some(b"<web-app/>".as_slice())),
            ("folder1/resourceOne.txt", Some(b"one".as_slice())),
            ("test/Test.class", Some(b"\xca\xfe\xba\xbe".as_slice())),
        ]))
    }

    #[test]
    fn test_get_resource() {
        let jar = web_archive();
        assert_eq!(jar.get_resource("WEB-INF/web.xml").unwrap().as_deref(), Some(&b"<web-app/>"[..]));
        assert_eq!(jar.get_resource("missing").unwrap(), None);
        // Repeated reads see the same content
        assert_eq!(jar.get_resource("rootResource.txt").unwrap().as_deref(), Some(&b"root"[..]));
        assert_eq!(jar.get_resource("rootResource.txt").unwrap().as_deref(), Some(&b"root"[..]));
    }

    #[test]
    fn test_get_resources_excludes_directory_entry() {
        let jar = web_archive();
        assert_eq!(jar.get_resources("WEB-INF").unwrap(), vec!["WEB-INF/web.xml"]);
        assert_eq!(jar.get_resources("WEB-INF/").unwrap(), vec!["WEB-INF/web.xml"]);
        assert!(jar.get_resources("nothing").unwrap().is_empty());
        assert_eq!(jar.get_resources("").unwrap().len(), 5);
    }

    #[test]
    fn test_manifest_is_not_listed() {
        let jar = DefaultJarArchive::from_bytes(build(&[
            ("META-INF/", None),
            (MANIFEST_PATH, Some(b"Manifest-Version: 1.0\r\n".as_slice())),
            ("META-INF/context.xml", Some(b"<Context/>".as_slice())),
            ("index.html", Some(b"<html/>".as_slice())),
        ]));
        assert_eq!(jar.get_resources("").unwrap(), vec!["META-INF/", "META-INF/context.xml", "index.html"]);
        assert_eq!(jar.get_resources("META-INF").unwrap(), vec!["META-INF/context.xml"]);
        assert_eq!(jar.find_resource("MANIFEST.MF").unwrap(), None);
        assert_eq!(jar.manifest().unwrap().as_deref(), Some(&b"Manifest-Version: 1.0\r\n"[..]));
        assert_eq!(jar.list_entries().unwrap().len(), 4);
        assert_eq!(web_archive().manifest().unwrap(), None);
    }

    #[test]
    fn test_contains_class() {
        let jar = web_archive();
        assert!(jar.contains_class("test.Test").unwrap());
        assert!(!jar.contains_class("test.Other").unwrap());
        let empty = DefaultJarArchive::from_bytes(build(&[]));
        assert!(!empty.contains_class("test.Test").unwrap());
    }

    #[test]
    fn test_find_resource() {
        let jar = web_archive();
        assert_eq!(jar.find_resource("rootResource.txt").unwrap().as_deref(), Some("rootResource.txt"));
        assert_eq!(
            jar.find_resource("resourceOne.txt").unwrap().as_deref(),
            Some("folder1/resourceOne.txt")
        );
        assert_eq!(jar.find_resource("foo").unwrap(), None);
    }

    #[test]
    fn test_invalid_archive() {
        let jar = DefaultJarArchive::from_bytes(b"not a zip file".to_vec());
        assert!(matches!(jar.list_entries(), Err(ModuleError::Archive(_))));
    }

    #[test]
    fn test_file_backed_archive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.war");
        fs::write(&path, build(&[("WEB-INF/web.xml", Some(b"<web-app/>".as_slice()))])).unwrap();
        let jar = DefaultJarArchive::open(&path);
        assert_eq!(jar.list_entries().unwrap(), vec!["WEB-INF/web.xml"]);

        let from_reader = DefaultJarArchive::from_reader(File::open(&path).unwrap()).unwrap();
        assert!(from_reader.get_resource("WEB-INF/web.xml").unwrap().is_some());

        let missing = DefaultJarArchive::open(dir.path().join("missing.war"));
        assert!(matches!(missing.list_entries(), Err(ModuleError::Io(_))));
    }

    fn expanded_files(root: &Path) -> Vec<String> {
        let mut files: Vec<String> = walkdir::WalkDir::new(root)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .map(|e| {
                e.path()
                    .strip_prefix(root)
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect();
        files.sort();
        files
    }

    #[test]
    fn test_expand_to_path() {
        let dir = tempfile::tempdir().unwrap();
        let written = web_archive().expand_to_path(dir.path(), None).unwrap();
        assert_eq!(written, 5);
        assert_eq!(
            expanded_files(dir.path()),
            vec!["WEB-INF/web.xml", "folder1/resourceOne.txt", "rootResource.txt", "test/Test.class"]
        );
        assert!(dir.path().join("WEB-INF").is_dir());
        assert_eq!(fs::read(dir.path().join("folder1/resourceOne.txt")).unwrap(), b"one");
    }

    #[test]
    fn test_expand_with_filter() {
        let dir = tempfile::tempdir().unwrap();
        let only_web_inf = |name: &str| name.starts_with("WEB-INF/");
        let written = web_archive().expand_to_path(dir.path(), Some(&only_web_inf)).unwrap();
        assert_eq!(written, 2);
        assert_eq!(expanded_files(dir.path()), vec!["WEB-INF/web.xml"]);
    }

    #[test]
    fn test_expand_skips_escaping_entries() {
        let jar = DefaultJarArchive::from_bytes(build(&[
            ("../evil.txt", Some(b"x".as_slice())),
            ("safe.txt", Some(b"y".as_slice())),
        ]));
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out");
        assert_eq!(jar.expand_to_path(&target, None).unwrap(), 1);
        assert_eq!(expanded_files(&target), vec!["safe.txt"]);
        assert!(!dir.path().join("evil.txt").exists());
    }

    #[test]
    fn test_concurrent_reads() {
        let jar = web_archive();
        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| scope.spawn(|| jar.get_resource("WEB-INF/web.xml").unwrap()))
                .collect();
            for handle in handles {
                assert_eq!(handle.join().unwrap().as_deref(), Some(&b"<web-app/>"[..]));
            }
        });
    }
}

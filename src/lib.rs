//! # deploy-descriptor
//!
//! Grammar-aware editing and merging of XML deployment descriptors, plus
//! access to the archives that carry them.
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! archive    → zip/JAR resource access, war/ejb archives, war merging
//!   ↓          (feature "archive")
//! webapp     → web.xml versions, helpers and merger
//! application → application.xml versions and module helpers
//! ejb        → ejb-jar.xml bean listings
//!   ↓
//! merge      → per-tag strategies, composite merger
//!   ↓
//! descriptor → tags, types, identifiers, ordered insertion
//!   ↓
//! grammar    → DTD parsing (Logos lexer), schema grammars
//!   ↓
//! xml        → arena document, quick-xml I/O, entity resolution
//! ```

// ============================================================================
// MODULES (dependency order: xml → grammar → descriptor → merge → webapp → archive)
// ============================================================================

/// Error types shared by every module
pub mod error;

/// Arena XML document, parsing and serialization
pub mod xml;

/// Element ordering from DTD and schema grammars
pub mod grammar;

/// Descriptor tags, types and the descriptor tree
pub mod descriptor;

/// Merging overlay descriptors into a base
pub mod merge;

/// Web application descriptors
pub mod webapp;

/// Enterprise application descriptors
pub mod application;

/// EJB module descriptors
pub mod ejb;

/// Zip/JAR archive access
#[cfg(feature = "archive")]
pub mod archive;

pub use descriptor::{Descriptor, DescriptorIo, DescriptorTag, DescriptorType, Identifier};
pub use error::ModuleError;
pub use grammar::{Dtd, Grammar, Xsd};
pub use merge::{DescriptorMerger, DescriptorMergerByTag, MergeStrategy, XmlMerger};
pub use xml::{Document, NodeId, WriteOptions};

#[cfg(feature = "archive")]
pub use archive::{DefaultEjbArchive, DefaultJarArchive, DefaultWarArchive, JarArchive, MergedWarArchive, WarArchiveMerger};

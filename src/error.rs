//! Error types for descriptor operations.

use thiserror::Error;

/// Errors that can occur while loading, editing, merging or writing descriptors.
#[derive(Debug, Error)]
pub enum ModuleError {
    /// XML parsing or serialization error.
    #[error("XML error: {0}")]
    Xml(String),

    /// IO error during read/write.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// ZIP/JAR archive error.
    #[error("Archive error: {0}")]
    Archive(String),

    /// Grammar (DTD) could not be parsed.
    #[error(transparent)]
    Grammar(#[from] DtdParseError),

    /// An element with a specific tag name was required.
    #[error("Not a [{expected}] element (found [{found}])")]
    InvalidElement { expected: String, found: String },

    /// An entry with the same business key already exists.
    #[error("{kind} '{name}' already defined")]
    DuplicateEntry { kind: &'static str, name: String },

    /// A referenced entry does not exist.
    #[error("{kind} '{name}' not defined")]
    MissingEntry { kind: &'static str, name: String },

    /// Grammar resource could not be located.
    #[error("Unresolved entity: public id {public_id:?}, system id {system_id}")]
    UnresolvedEntity {
        public_id: Option<String>,
        system_id: String,
    },

    /// Unsupported feature, encoding or format variant.
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// A merge step failed.
    #[error("Merge of [{tag}] failed: {source}")]
    Merge {
        tag: String,
        #[source]
        source: Box<ModuleError>,
    },
}

impl ModuleError {
    /// Create an XML error.
    pub fn xml(message: impl Into<String>) -> Self {
        Self::Xml(message.into())
    }

    /// Create an archive error.
    pub fn archive(message: impl Into<String>) -> Self {
        Self::Archive(message.into())
    }

    /// Create an unsupported error.
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::Unsupported(message.into())
    }

    /// Create an invalid element error.
    pub fn invalid_element(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::InvalidElement {
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Create a duplicate entry error.
    pub fn duplicate(kind: &'static str, name: impl Into<String>) -> Self {
        Self::DuplicateEntry {
            kind,
            name: name.into(),
        }
    }

    /// Create a missing entry error.
    pub fn missing(kind: &'static str, name: impl Into<String>) -> Self {
        Self::MissingEntry {
            kind,
            name: name.into(),
        }
    }

    /// Wrap an error raised while merging `tag`.
    pub fn merge(tag: impl Into<String>, source: ModuleError) -> Self {
        Self::Merge {
            tag: tag.into(),
            source: Box::new(source),
        }
    }
}

/// A DTD could not be read or parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Failed to parse dtd at offset {offset}: {message}")]
pub struct DtdParseError {
    /// Byte offset in the DTD text where parsing failed.
    pub offset: usize,
    /// What went wrong.
    pub message: String,
}

impl DtdParseError {
    pub fn new(offset: usize, message: impl Into<String>) -> Self {
        Self {
            offset,
            message: message.into(),
        }
    }
}

/// A custom element implementation could not be instantiated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Error instantiating element for [{tag}]: {message}")]
pub struct BindingError {
    pub tag: String,
    pub message: String,
}

impl BindingError {
    pub fn new(tag: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            message: message.into(),
        }
    }
}

/// An identifier expression could not be parsed or evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifierError {
    /// The expression itself is malformed.
    #[error("Invalid identifier expression '{expression}': {message}")]
    Syntax { expression: String, message: String },

    /// A namespace prefix is not declared in the identifier's namespace map.
    #[error("Undeclared namespace prefix '{0}'")]
    UndeclaredPrefix(String),

    /// The selected path did not match anything.
    #[error("No match for '{0}'")]
    NoMatch(String),

    /// The node is not an element.
    #[error("Identifier applied to a non-element node")]
    NotAnElement,
}

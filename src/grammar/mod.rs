//! Grammars: declared child-element order for descriptor formats.
//!
//! ```text
//! Grammar
//! ├── Dtd     element → [DescriptorTag, ...]   (declared order)
//! └── Schema  element → Unknown                (append-only)
//! ```
//!
//! Callers branch on [`ElementOrder`] instead of interpreting a missing
//! order, so schema-backed documents always fall through to appending.

mod dtd;
mod lexer;
mod xsd;

pub use dtd::Dtd;
pub use lexer::{Lexer, ModelToken, Token};
pub use xsd::Xsd;

use crate::descriptor::DescriptorTag;

/// What a grammar knows about the children of one element.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ElementOrder<'a> {
    /// Declared child order. Empty for leaf elements.
    Declared(&'a [DescriptorTag]),
    /// No order information; new children go at the end.
    Unknown,
}

impl<'a> ElementOrder<'a> {
    pub fn tags(self) -> Option<&'a [DescriptorTag]> {
        match self {
            Self::Declared(tags) => Some(tags),
            Self::Unknown => None,
        }
    }

    /// Position of `name` in the declared order.
    pub fn position(self, name: &str) -> Option<usize> {
        self.tags()?.iter().position(|t| t.name() == name)
    }
}

/// Source of structural constraints for a descriptor format.
#[derive(Clone, Debug)]
pub enum Grammar {
    Dtd(Dtd),
    Schema(Xsd),
}

impl Grammar {
    /// Child order declared for `name`.
    pub fn element_order(&self, name: &str) -> ElementOrder<'_> {
        match self {
            Self::Dtd(dtd) => dtd
                .element_order(name)
                .map_or(ElementOrder::Unknown, ElementOrder::Declared),
            Self::Schema(_) => ElementOrder::Unknown,
        }
    }

    pub fn is_ordered(&self) -> bool {
        matches!(self, Self::Dtd(_))
    }
}

impl From<Dtd> for Grammar {
    fn from(dtd: Dtd) -> Self {
        Self::Dtd(dtd)
    }
}

impl From<Xsd> for Grammar {
    fn from(xsd: Xsd) -> Self {
        Self::Schema(xsd)
    }
}

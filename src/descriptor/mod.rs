//! Descriptor model: tags, types, identifiers and the descriptor tree.
//!
//! ```text
//! DescriptorType ──owns──▶ Grammar
//!      │  └─tags──▶ DescriptorTag ──▶ Identifier, ElementBinding
//!      ▼
//! Descriptor ──owns──▶ Document
//! ```

mod document;
mod identifier;
mod io;
mod registry;
mod tag;

pub use document::{Descriptor, check_element};
pub use identifier::{ConcatPart, Identifier};
pub use io::DescriptorIo;
pub use registry::DescriptorType;
pub use tag::{DescriptorTag, ElementBinding, SkeletonBinding};

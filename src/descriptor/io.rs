//! Loading and saving descriptors.

use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use super::document::Descriptor;
use super::registry::DescriptorType;
use crate::error::ModuleError;
use crate::xml::{WriteOptions, parse_document, write_document};

/// Reader/writer for descriptor documents.
pub struct DescriptorIo;

impl DescriptorIo {
    /// Parse `input` as a descriptor of `descriptor_type`, binding every
    /// element whose tag has a registered binding.
    pub fn parse(descriptor_type: Arc<DescriptorType>, input: &[u8]) -> Result<Descriptor, ModuleError> {
        let mut document = parse_document(input)?;
        descriptor_type.bind_elements(&mut document);
        Ok(Descriptor::new(document, descriptor_type))
    }

    pub fn parse_reader<R: Read>(descriptor_type: Arc<DescriptorType>, mut reader: R) -> Result<Descriptor, ModuleError> {
        let mut input = Vec::new();
        reader.read_to_end(&mut input)?;
        Self::parse(descriptor_type, &input)
    }

    pub fn parse_file(descriptor_type: Arc<DescriptorType>, path: &Path) -> Result<Descriptor, ModuleError> {
        debug!(path = %path.display(), "Reading descriptor");
        let input = std::fs::read(path)?;
        Self::parse(descriptor_type, &input)
    }

    pub fn write<W: Write>(descriptor: &Descriptor, out: W, options: &WriteOptions) -> Result<(), ModuleError> {
        write_document(descriptor.document(), out, options)
    }

    /// Write `descriptor` to `path`, creating or truncating the file.
    pub fn write_to_file(descriptor: &Descriptor, path: &Path, options: &WriteOptions) -> Result<(), ModuleError> {
        debug!(path = %path.display(), "Writing descriptor");
        let file = File::create(path)?;
        let mut out = BufWriter::new(file);
        Self::write(descriptor, &mut out, options)?;
        out.flush()?;
        Ok(())
    }
}

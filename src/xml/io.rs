//! Reading and writing [`Document`]s with quick-xml.
//!
//! Parsing is non-validating: DTD references in the doctype are recorded but
//! never fetched, and the internal subset is kept verbatim.

use std::io::Write;

use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesPI, BytesStart, BytesText, Event};

use super::{DocType, Document, ElementData, NodeId, NodeKind, XmlDeclaration};
use crate::error::ModuleError;

/// Output settings for [`write_document`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WriteOptions {
    /// Encoding named in the XML declaration. `UTF-8` and `US-ASCII` are supported.
    pub encoding: String,
    /// Pretty-print with two-space indentation, dropping whitespace-only text.
    pub indent: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            encoding: "UTF-8".to_string(),
            indent: false,
        }
    }
}

impl WriteOptions {
    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = encoding.into();
        self
    }

    pub fn indented(mut self, indent: bool) -> Self {
        self.indent = indent;
        self
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum OutputEncoding {
    Utf8,
    Ascii,
}

impl OutputEncoding {
    fn from_name(name: &str) -> Result<Self, ModuleError> {
        match name.to_ascii_uppercase().as_str() {
            "UTF-8" | "UTF8" => Ok(Self::Utf8),
            "US-ASCII" | "ASCII" => Ok(Self::Ascii),
            other => Err(ModuleError::unsupported(format!("encoding {other}"))),
        }
    }
}

/// Parse a UTF-8 XML document.
pub fn parse_document(input: &[u8]) -> Result<Document, ModuleError> {
    let mut reader = Reader::from_reader(input);
    reader.config_mut().trim_text(false);

    let mut buf = Vec::new();
    let mut document: Option<Document> = None;
    let mut stack: Vec<NodeId> = Vec::new();
    let mut closed = false;
    let mut declaration = None;
    let mut doctype = None;
    let mut pending_prolog = Vec::new();

    loop {
        let event = reader.read_event_into(&mut buf).map_err(|e| {
            ModuleError::xml(format!(
                "XML parse error at position {}: {e}",
                reader.error_position()
            ))
        })?;
        match event {
            Event::Decl(ref e) => declaration = Some(read_declaration(e)?),
            Event::DocType(ref e) => {
                let text = std::str::from_utf8(e)
                    .map_err(|e| ModuleError::xml(format!("Invalid UTF-8 in doctype: {e}")))?;
                doctype = Some(parse_doctype(text));
            }
            Event::Start(ref e) | Event::Empty(ref e) => {
                let is_empty = matches!(event, Event::Empty(_));
                let data = element_data(e)?;
                let node = match (&mut document, stack.last()) {
                    (Some(doc), Some(&parent)) => {
                        let node = doc.push(NodeKind::Element(data));
                        doc.push_child(parent, node);
                        node
                    }
                    (Some(_), None) => {
                        return Err(ModuleError::xml("Document has more than one root element"));
                    }
                    (None, _) => {
                        let mut doc = Document::with_root(data);
                        for kind in pending_prolog.drain(..) {
                            doc.push_prolog(kind);
                        }
                        let root = doc.root();
                        document = Some(doc);
                        root
                    }
                };
                if is_empty {
                    closed = stack.is_empty();
                } else {
                    stack.push(node);
                }
            }
            Event::End(_) => {
                stack.pop();
                closed = stack.is_empty();
            }
            Event::Text(ref e) => {
                let text = e
                    .unescape()
                    .map_err(|e| ModuleError::xml(format!("Invalid text content: {e}")))?;
                match (&mut document, stack.last()) {
                    (Some(doc), Some(&parent)) => {
                        let node = doc.create_text(&text);
                        doc.push_child(parent, node);
                    }
                    _ if text.trim().is_empty() => {}
                    _ => return Err(ModuleError::xml("Text content outside of root element")),
                }
            }
            Event::CData(ref e) => {
                let text = std::str::from_utf8(e)
                    .map_err(|e| ModuleError::xml(format!("Invalid UTF-8 in CDATA: {e}")))?;
                if let (Some(doc), Some(&parent)) = (&mut document, stack.last()) {
                    let node = doc.push(NodeKind::CData(text.to_string()));
                    doc.push_child(parent, node);
                }
            }
            Event::Comment(ref e) => {
                let text = std::str::from_utf8(e)
                    .map_err(|e| ModuleError::xml(format!("Invalid UTF-8 in comment: {e}")))?;
                place_misc(
                    &mut document,
                    &stack,
                    closed,
                    &mut pending_prolog,
                    NodeKind::Comment(text.to_string()),
                );
            }
            Event::PI(ref e) => {
                let target = String::from_utf8_lossy(e.target()).into_owned();
                let data = String::from_utf8_lossy(e.content()).trim().to_string();
                place_misc(
                    &mut document,
                    &stack,
                    closed,
                    &mut pending_prolog,
                    NodeKind::ProcessingInstruction { target, data },
                );
            }
            Event::Eof => break,
        }
        buf.clear();
    }

    let mut document = document.ok_or_else(|| ModuleError::xml("Document has no root element"))?;
    if !stack.is_empty() {
        return Err(ModuleError::xml("Unexpected end of document"));
    }
    document.set_declaration(declaration);
    document.set_doctype(doctype);
    document.resolve_namespaces();
    Ok(document)
}

fn place_misc(
    document: &mut Option<Document>,
    stack: &[NodeId],
    closed: bool,
    pending_prolog: &mut Vec<NodeKind>,
    kind: NodeKind,
) {
    match (document, stack.last()) {
        (Some(doc), Some(&parent)) => {
            let node = doc.push(kind);
            doc.push_child(parent, node);
        }
        (Some(doc), None) if closed => doc.push_epilog(kind),
        (Some(doc), None) => doc.push_prolog(kind),
        (None, _) => pending_prolog.push(kind),
    }
}

fn read_declaration(e: &BytesDecl<'_>) -> Result<XmlDeclaration, ModuleError> {
    let to_string = |bytes: &[u8]| String::from_utf8_lossy(bytes).into_owned();
    let version = e
        .version()
        .map_err(|e| ModuleError::xml(format!("Invalid XML declaration: {e}")))?;
    let encoding = e
        .encoding()
        .transpose()
        .map_err(|e| ModuleError::xml(format!("Invalid XML declaration: {e}")))?;
    let standalone = e
        .standalone()
        .transpose()
        .map_err(|e| ModuleError::xml(format!("Invalid XML declaration: {e}")))?;
    Ok(XmlDeclaration {
        version: to_string(version.as_ref()),
        encoding: encoding.map(|v| to_string(v.as_ref())),
        standalone: standalone.map(|v| to_string(v.as_ref())),
    })
}

fn element_data(e: &BytesStart<'_>) -> Result<ElementData, ModuleError> {
    let name_bytes = e.name();
    let name = std::str::from_utf8(name_bytes.as_ref())
        .map_err(|e| ModuleError::xml(format!("Invalid UTF-8 in element name: {e}")))?;
    let mut data = ElementData::new(name);
    for attr_result in e.attributes() {
        let attr = attr_result.map_err(|e| ModuleError::xml(format!("Attribute error: {e}")))?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(|e| ModuleError::xml(format!("Invalid UTF-8 in attribute name: {e}")))?;
        let value = attr
            .unescape_value()
            .map_err(|e| ModuleError::xml(format!("Invalid attribute value: {e}")))?;
        data.set_attribute(key, value.into_owned());
    }
    Ok(data)
}

/// Split `web-app PUBLIC "pub" "sys" [subset]` into its parts.
fn parse_doctype(text: &str) -> DocType {
    let text = text.trim();
    let (head, internal_subset) = match (text.find('['), text.rfind(']')) {
        (Some(start), Some(end)) if start < end => {
            (&text[..start], Some(text[start + 1..end].to_string()))
        }
        _ => (text, None),
    };

    let mut rest = head.trim();
    let name_end = rest.find(char::is_whitespace).unwrap_or(rest.len());
    let name = rest[..name_end].to_string();
    rest = rest[name_end..].trim_start();

    let mut literals = Vec::new();
    let keyword = if let Some(r) = rest.strip_prefix("PUBLIC") {
        rest = r;
        Some("PUBLIC")
    } else if let Some(r) = rest.strip_prefix("SYSTEM") {
        rest = r;
        Some("SYSTEM")
    } else {
        None
    };
    while let Some((literal, remaining)) = take_quoted(rest) {
        literals.push(literal.to_string());
        rest = remaining;
    }

    let (public_id, system_id) = match (keyword, literals.as_slice()) {
        (Some("PUBLIC"), [public, system, ..]) => (Some(public.clone()), Some(system.clone())),
        (Some("PUBLIC"), [public]) => (Some(public.clone()), None),
        (Some("SYSTEM"), [system, ..]) => (None, Some(system.clone())),
        _ => (None, None),
    };

    DocType {
        name,
        public_id,
        system_id,
        internal_subset,
    }
}

fn take_quoted(input: &str) -> Option<(&str, &str)> {
    let input = input.trim_start();
    let quote = input.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let body = &input[1..];
    let end = body.find(quote)?;
    Some((&body[..end], &body[end + 1..]))
}

fn format_doctype(doctype: &DocType) -> String {
    let mut text = doctype.name.clone();
    match (&doctype.public_id, &doctype.system_id) {
        (Some(public), Some(system)) => text.push_str(&format!(" PUBLIC \"{public}\" \"{system}\"")),
        (Some(public), None) => text.push_str(&format!(" PUBLIC \"{public}\"")),
        (None, Some(system)) => text.push_str(&format!(" SYSTEM \"{system}\"")),
        (None, None) => {}
    }
    if let Some(subset) = &doctype.internal_subset {
        text.push_str(&format!(" [{subset}]"));
    }
    text
}

/// Serialize `document` to a string.
pub fn document_to_string(document: &Document, options: &WriteOptions) -> Result<String, ModuleError> {
    let encoding = OutputEncoding::from_name(&options.encoding)?;
    let mut writer = if options.indent {
        Writer::new_with_indent(Vec::new(), b' ', 2)
    } else {
        Writer::new(Vec::new())
    };

    let standalone = document
        .declaration()
        .and_then(|d| d.standalone.as_deref());
    let version = document
        .declaration()
        .map(|d| d.version.as_str())
        .unwrap_or("1.0");
    writer
        .write_event(Event::Decl(BytesDecl::new(
            version,
            Some(options.encoding.as_str()),
            standalone,
        )))
        .map_err(|e| ModuleError::xml(format!("Write error: {e}")))?;
    line_break(&mut writer, options);

    if let Some(doctype) = document.doctype() {
        writer
            .write_event(Event::DocType(BytesText::from_escaped(format_doctype(doctype))))
            .map_err(|e| ModuleError::xml(format!("Write error: {e}")))?;
        line_break(&mut writer, options);
    }

    for &node in document.prolog() {
        write_node(&mut writer, document, node, options)?;
        line_break(&mut writer, options);
    }
    write_node(&mut writer, document, document.root(), options)?;
    for &node in document.epilog() {
        line_break(&mut writer, options);
        write_node(&mut writer, document, node, options)?;
    }

    let mut output = writer.into_inner();
    output.push(b'\n');
    let text = String::from_utf8(output)
        .map_err(|e| ModuleError::xml(format!("Write error: {e}")))?;

    Ok(match encoding {
        OutputEncoding::Utf8 => text,
        OutputEncoding::Ascii => escape_non_ascii(&text),
    })
}

/// Serialize `document` into `out`.
pub fn write_document<W: Write>(
    document: &Document,
    mut out: W,
    options: &WriteOptions,
) -> Result<(), ModuleError> {
    let text = document_to_string(document, options)?;
    out.write_all(text.as_bytes())?;
    out.flush()?;
    Ok(())
}

fn line_break(writer: &mut Writer<Vec<u8>>, options: &WriteOptions) {
    // The indenting writer emits its own line breaks between markup events.
    if !options.indent {
        writer.get_mut().push(b'\n');
    }
}

fn escape_non_ascii(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_ascii() {
            out.push(c);
        } else {
            out.push_str(&format!("&#x{:X};", c as u32));
        }
    }
    out
}

fn is_blank_text(document: &Document, node: NodeId) -> bool {
    matches!(document.kind(node), NodeKind::Text(t) if t.trim().is_empty())
}

fn write_node(
    writer: &mut Writer<Vec<u8>>,
    document: &Document,
    node: NodeId,
    options: &WriteOptions,
) -> Result<(), ModuleError> {
    let result = match document.kind(node) {
        NodeKind::Element(data) => {
            let qname = data.qualified_name();
            let mut start = BytesStart::new(qname.as_str());
            for attr in data.attributes() {
                if attr.name == "xmlns" && attr.value.is_empty() {
                    continue;
                }
                start.push_attribute((attr.name.as_str(), attr.value.as_str()));
            }

            let children: Vec<NodeId> = document
                .children(node)
                .iter()
                .copied()
                .filter(|c| !(options.indent && is_blank_text(document, *c)))
                .collect();

            if children.is_empty() {
                writer.write_event(Event::Empty(start))
            } else {
                writer
                    .write_event(Event::Start(start))
                    .map_err(|e| ModuleError::xml(format!("Write error: {e}")))?;
                for child in children {
                    write_node(writer, document, child, options)?;
                }
                writer.write_event(Event::End(BytesEnd::new(qname.as_str())))
            }
        }
        NodeKind::Text(text) => {
            let text = if options.indent { text.trim() } else { text.as_str() };
            writer.write_event(Event::Text(BytesText::new(text)))
        }
        NodeKind::CData(text) => writer.write_event(Event::CData(BytesCData::new(text.as_str()))),
        NodeKind::Comment(text) => {
            writer.write_event(Event::Comment(BytesText::from_escaped(text.as_str())))
        }
        NodeKind::ProcessingInstruction { target, data } => {
            let content = if data.is_empty() {
                target.clone()
            } else {
                format!("{target} {data}")
            };
            writer.write_event(Event::PI(BytesPI::new(content)))
        }
    };
    result.map_err(|e| ModuleError::xml(format!("Write error: {e}")))
}

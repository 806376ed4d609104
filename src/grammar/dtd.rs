//! DTD-backed grammar.
//!
//! Only element declarations carry ordering information. The scanner walks
//! the declaration list, skipping comments, processing instructions and
//! ATTLIST/NOTATION declarations, and records internal parameter entities so
//! that `%name;` references in content models can be expanded.
//!
//! ```text
//! <!ELEMENT servlet (servlet-name, (servlet-class|jsp-file), init-param*)>
//!         │
//!         ▼
//! servlet → [servlet-name, servlet-class, jsp-file, init-param(repeatable)]
//! ```

use indexmap::IndexMap;
use rustc_hash::{FxBuildHasher, FxHashMap};
use smol_str::SmolStr;
use tracing::{debug, warn};

use super::lexer::{Lexer, ModelToken};
use crate::descriptor::DescriptorTag;
use crate::error::{DtdParseError, ModuleError};
use crate::xml::{BundledEntityResolver, EntityResolver};

/// Expansion depth after which a parameter entity is treated as recursive.
const MAX_ENTITY_DEPTH: usize = 16;

/// Child element order for every element declared in a DTD.
#[derive(Clone, Debug, Default)]
pub struct Dtd {
    system_id: Option<String>,
    elements: IndexMap<SmolStr, Vec<DescriptorTag>, FxBuildHasher>,
}

impl Dtd {
    /// Parse DTD text.
    pub fn parse(text: &str) -> Result<Self, DtdParseError> {
        let mut scanner = Scanner::new(text);
        scanner.run()?;
        debug!(elements = scanner.elements.len(), "Parsed DTD");
        Ok(Self {
            system_id: None,
            elements: scanner.elements,
        })
    }

    /// Resolve a DTD through `resolver` and parse it.
    pub fn from_system_id(
        resolver: &dyn EntityResolver,
        public_id: Option<&str>,
        system_id: &str,
    ) -> Result<Self, ModuleError> {
        let text = resolver.resolve(public_id, system_id)?;
        let mut dtd = Self::parse(&text)?;
        dtd.system_id = Some(system_id.to_string());
        Ok(dtd)
    }

    /// Load one of the bundled grammars by its identifiers.
    pub fn bundled(public_id: Option<&str>, system_id: &str) -> Result<Self, ModuleError> {
        Self::from_system_id(&BundledEntityResolver::new(), public_id, system_id)
    }

    pub fn system_id(&self) -> Option<&str> {
        self.system_id.as_deref()
    }

    /// Declared child order of `name`, or `None` if `name` is not declared.
    pub fn element_order(&self, name: &str) -> Option<&[DescriptorTag]> {
        self.elements.get(name).map(Vec::as_slice)
    }

    /// Declared element names, in declaration order.
    pub fn element_names(&self) -> impl Iterator<Item = &str> {
        self.elements.keys().map(SmolStr::as_str)
    }
}

struct Scanner<'a> {
    text: &'a str,
    pos: usize,
    entities: FxHashMap<String, String>,
    elements: IndexMap<SmolStr, Vec<DescriptorTag>, FxBuildHasher>,
}

impl<'a> Scanner<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            pos: 0,
            entities: FxHashMap::default(),
            elements: IndexMap::default(),
        }
    }

    fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    fn error(&self, message: impl Into<String>) -> DtdParseError {
        DtdParseError::new(self.pos, message)
    }

    fn run(&mut self) -> Result<(), DtdParseError> {
        loop {
            let trimmed = self.rest().trim_start();
            self.pos = self.text.len() - trimmed.len();
            let rest = self.rest();
            if rest.is_empty() {
                return Ok(());
            }

            if rest.starts_with("<!--") {
                self.skip_past("-->", "unterminated comment")?;
            } else if rest.starts_with("<?") {
                self.skip_past("?>", "unterminated processing instruction")?;
            } else if rest.starts_with("<![") {
                self.conditional_section()?;
            } else if rest.starts_with("]]>") {
                self.pos += 3;
            } else if rest.starts_with("<!ELEMENT") {
                let start = self.pos;
                let body = self.declaration_body("<!ELEMENT")?;
                self.element_declaration(start, body)?;
            } else if rest.starts_with("<!ENTITY") {
                let body = self.declaration_body("<!ENTITY")?;
                self.entity_declaration(body);
            } else if rest.starts_with("<!ATTLIST") {
                self.declaration_body("<!ATTLIST")?;
            } else if rest.starts_with("<!NOTATION") {
                self.declaration_body("<!NOTATION")?;
            } else if rest.starts_with('%') {
                // External parameter entity reference at top level; not followed.
                self.skip_past(";", "unterminated parameter entity reference")?;
            } else {
                return Err(self.error("unexpected content"));
            }
        }
    }

    fn skip_past(&mut self, terminator: &str, message: &str) -> Result<(), DtdParseError> {
        match self.rest().find(terminator) {
            Some(idx) => {
                self.pos += idx + terminator.len();
                Ok(())
            }
            None => Err(self.error(message)),
        }
    }

    /// Body of a `<!KEYWORD ... >` declaration; `>` inside quotes does not end it.
    fn declaration_body(&mut self, keyword: &str) -> Result<&'a str, DtdParseError> {
        let body_start = self.pos + keyword.len();
        let mut quote = None;
        for (idx, c) in self.text[body_start..].char_indices() {
            match (quote, c) {
                (Some(q), c) if c == q => quote = None,
                (Some(_), _) => {}
                (None, '"' | '\'') => quote = Some(c),
                (None, '>') => {
                    self.pos = body_start + idx + 1;
                    return Ok(&self.text[body_start..body_start + idx]);
                }
                (None, _) => {}
            }
        }
        Err(self.error(format!("unterminated {keyword} declaration")))
    }

    fn conditional_section(&mut self) -> Result<(), DtdParseError> {
        let start = self.pos;
        let Some(open) = self.text[start + 3..].find('[') else {
            return Err(self.error("malformed conditional section"));
        };
        let keyword_raw = self.text[start + 3..start + 3 + open].trim();
        let keyword = self
            .expand(keyword_raw, start)
            .map(|k| k.trim().to_string())?;
        match keyword.as_str() {
            "INCLUDE" => {
                self.pos = start + 3 + open + 1;
                Ok(())
            }
            "IGNORE" => self.skip_past("]]>", "unterminated conditional section"),
            _ => Err(self.error(format!("unknown conditional section keyword '{keyword}'"))),
        }
    }

    fn entity_declaration(&mut self, body: &str) {
        let body = body.trim();
        let Some(body) = body.strip_prefix('%') else {
            // General entities do not affect element order.
            return;
        };
        let body = body.trim_start();
        let name_end = body.find(char::is_whitespace).unwrap_or(body.len());
        let name = &body[..name_end];
        let definition = body[name_end..].trim_start();
        let quote = match definition.chars().next() {
            Some(q @ ('"' | '\'')) => q,
            // External parameter entity (SYSTEM/PUBLIC); not followed.
            _ => return,
        };
        if let Some(end) = definition[1..].find(quote) {
            self.entities
                .entry(name.to_string())
                .or_insert_with(|| definition[1..1 + end].to_string());
        }
    }

    /// Expand `%name;` references until none remain.
    fn expand(&self, input: &str, offset: usize) -> Result<String, DtdParseError> {
        let mut current = input.to_string();
        for _ in 0..MAX_ENTITY_DEPTH {
            let Some(start) = current.find('%') else {
                return Ok(current);
            };
            let Some(len) = current[start..].find(';') else {
                return Err(DtdParseError::new(offset, "unterminated parameter entity reference"));
            };
            let name = &current[start + 1..start + len];
            let Some(value) = self.entities.get(name) else {
                return Err(DtdParseError::new(
                    offset,
                    format!("undeclared parameter entity '{name}'"),
                ));
            };
            current = format!("{}{}{}", &current[..start], value, &current[start + len + 1..]);
        }
        Err(DtdParseError::new(offset, "parameter entity expansion too deep"))
    }

    fn element_declaration(&mut self, offset: usize, body: &str) -> Result<(), DtdParseError> {
        let body = self.expand(body, offset)?;
        let body = body.trim();
        let name_end = body.find(char::is_whitespace).unwrap_or(body.len());
        let name = &body[..name_end];
        if name.is_empty() {
            return Err(DtdParseError::new(offset, "element declaration without a name"));
        }
        let model = body[name_end..].trim();
        if model.is_empty() {
            return Err(DtdParseError::new(
                offset,
                format!("element '{name}' has no content model"),
            ));
        }

        let order = match model {
            "EMPTY" | "ANY" => Vec::new(),
            _ => parse_content_model(model, offset)?,
        };

        if self.elements.contains_key(name) {
            warn!(element = %name, "Element declared more than once, keeping first declaration");
        } else {
            self.elements.insert(SmolStr::new(name), order);
        }
        Ok(())
    }
}

/// Flatten a content model into the ordered list of child tags it names.
///
/// A name repeated in the model (`(a, b, a)`) is listed once, at its first
/// position, so the result is an insertion order rather than the sequence
/// as written.
fn parse_content_model(model: &str, offset: usize) -> Result<Vec<DescriptorTag>, DtdParseError> {
    let mut order: Vec<DescriptorTag> = Vec::new();
    let mut depth = 0usize;
    for token in Lexer::new(model) {
        let token = token.map_err(|at| DtdParseError::new(offset + at, "invalid content model"))?;
        match token.kind {
            ModelToken::Open => depth += 1,
            ModelToken::Close => {
                depth = depth.checked_sub(1).ok_or_else(|| {
                    DtdParseError::new(offset + token.offset, "unbalanced ')' in content model")
                })?;
            }
            ModelToken::Sequence | ModelToken::Choice => {}
            ModelToken::Name => {
                let mut name = token.text;
                let mut repeatable = false;
                if let Some(stripped) = name.strip_suffix(['*', '+']) {
                    name = stripped;
                    repeatable = true;
                }
                if let Some(stripped) = name.strip_suffix('?') {
                    name = stripped;
                }
                if name.is_empty() || name.starts_with('#') {
                    continue;
                }
                if !order.iter().any(|t| t.name() == name) {
                    order.push(DescriptorTag::new(name, repeatable));
                }
            }
        }
    }
    if depth != 0 {
        return Err(DtdParseError::new(offset, "unbalanced '(' in content model"));
    }
    Ok(order)
}

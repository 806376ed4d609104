//! Identifiers: business keys extracted from elements.
//!
//! An identifier is a small selector evaluated against one element:
//!
//! ```text
//! servlet-name                          text of the <servlet-name> child
//! j2ee:param-name                       same, namespace-qualified
//! web-resource-collection/url-pattern   nested child path
//! concat(error-code,'>',exception-type) joined parts, missing parts are ""
//! ```
//!
//! Unprefixed steps match by local name in any namespace. Prefixed steps
//! must resolve through the identifier's own namespace map.

use smol_str::SmolStr;
use tracing::{trace, warn};

use crate::error::IdentifierError;
use crate::xml::{Document, NodeId};

#[derive(Clone, Debug, PartialEq, Eq)]
struct Step {
    prefix: Option<SmolStr>,
    name: SmolStr,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Part {
    Literal(String),
    Path(Vec<Step>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Selector {
    Path(Vec<Step>),
    Concat(Vec<Part>),
}

/// Extraction rule for the business key of an element.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identifier {
    expression: String,
    selector: Selector,
    namespaces: Vec<(SmolStr, SmolStr)>,
}

impl Identifier {
    /// Parse a selector expression.
    pub fn parse(expression: &str) -> Result<Self, IdentifierError> {
        let trimmed = expression.trim();
        let selector = match trimmed
            .strip_prefix("concat(")
            .and_then(|s| s.strip_suffix(')'))
        {
            Some(args) => Selector::Concat(
                split_args(expression, args)?
                    .into_iter()
                    .map(|arg| parse_part(expression, arg))
                    .collect::<Result<_, _>>()?,
            ),
            None => Selector::Path(parse_path(expression, trimmed)?),
        };
        Ok(Self {
            expression: trimmed.to_string(),
            selector,
            namespaces: Vec::new(),
        })
    }

    /// Identifier selecting the text of a child path such as `servlet-name`
    /// or `j2ee:param-name`.
    pub fn child(path: &str) -> Self {
        Self {
            expression: path.to_string(),
            selector: Selector::Path(steps(path)),
            namespaces: Vec::new(),
        }
    }

    /// Identifier joining child texts and literals, e.g.
    /// `concat(error-code,'>',exception-type)`.
    pub fn concat(parts: &[ConcatPart<'_>]) -> Self {
        let expression = parts
            .iter()
            .map(|part| match part {
                ConcatPart::Child(path) => (*path).to_string(),
                ConcatPart::Literal(text) => format!("'{text}'"),
            })
            .collect::<Vec<_>>()
            .join(",");
        Self {
            expression: format!("concat({expression})"),
            selector: Selector::Concat(
                parts
                    .iter()
                    .map(|part| match part {
                        ConcatPart::Child(path) => Part::Path(steps(path)),
                        ConcatPart::Literal(text) => Part::Literal((*text).to_string()),
                    })
                    .collect(),
            ),
            namespaces: Vec::new(),
        }
    }

    /// Declare a namespace prefix usable in the expression.
    pub fn with_namespace(mut self, prefix: &str, uri: &str) -> Self {
        self.namespaces.retain(|(p, _)| p != prefix);
        self.namespaces.push((SmolStr::new(prefix), SmolStr::new(uri)));
        self
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Extract the key of `node`, or `""` when nothing can be extracted.
    pub fn identifier(&self, document: &Document, node: NodeId) -> String {
        match self.try_identifier(document, node) {
            Ok(value) => value,
            Err(IdentifierError::NoMatch(expression)) => {
                trace!(expression = %expression, "Identifier matched nothing");
                String::new()
            }
            Err(e) => {
                warn!(expression = %self.expression, error = %e, "Identifier extraction failed");
                String::new()
            }
        }
    }

    /// Extract the key of `node`, reporting why extraction failed.
    pub fn try_identifier(&self, document: &Document, node: NodeId) -> Result<String, IdentifierError> {
        self.evaluate(document, node, false)
    }

    /// Extract the key of `node` matching every step by local name only,
    /// so `j2ee:param-name` also reads an un-namespaced `<param-name>`.
    pub fn local_identifier(&self, document: &Document, node: NodeId) -> String {
        self.evaluate(document, node, true).unwrap_or_else(|e| {
            trace!(expression = %self.expression, error = %e, "Local identifier matched nothing");
            String::new()
        })
    }

    fn evaluate(&self, document: &Document, node: NodeId, local: bool) -> Result<String, IdentifierError> {
        if !document.is_element(node) {
            return Err(IdentifierError::NotAnElement);
        }
        match &self.selector {
            Selector::Path(path) => self
                .select(document, node, path, local)?
                .map(|found| document.text_content(found))
                .ok_or_else(|| IdentifierError::NoMatch(self.expression.clone())),
            Selector::Concat(parts) => {
                let mut out = String::new();
                for part in parts {
                    match part {
                        Part::Literal(text) => out.push_str(text),
                        Part::Path(path) => {
                            if let Some(found) = self.select(document, node, path, local)? {
                                out.push_str(&document.text_content(found));
                            }
                        }
                    }
                }
                Ok(out)
            }
        }
    }

    /// First element reached by `path`, in document order.
    fn select(
        &self,
        document: &Document,
        node: NodeId,
        path: &[Step],
        local: bool,
    ) -> Result<Option<NodeId>, IdentifierError> {
        let mut current = vec![node];
        for step in path {
            if step.name == "." {
                continue;
            }
            let namespace = match &step.prefix {
                Some(_) if local => None,
                Some(prefix) => Some(
                    self.namespaces
                        .iter()
                        .find(|(p, _)| p == prefix)
                        .map(|(_, uri)| uri.as_str())
                        .ok_or_else(|| IdentifierError::UndeclaredPrefix(prefix.to_string()))?,
                ),
                None => None,
            };
            current = current
                .into_iter()
                .flat_map(|n| document.child_elements(n).collect::<Vec<_>>())
                .filter(|c| {
                    document.element(*c).is_some_and(|e| {
                        e.name() == step.name
                            && namespace.is_none_or(|uri| e.namespace() == Some(uri))
                    })
                })
                .collect();
            if current.is_empty() {
                return Ok(None);
            }
        }
        Ok(current.first().copied())
    }
}

/// One argument of [`Identifier::concat`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConcatPart<'a> {
    Child(&'a str),
    Literal(&'a str),
}

fn steps(path: &str) -> Vec<Step> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(|segment| match segment.split_once(':') {
            Some((prefix, name)) => Step {
                prefix: Some(SmolStr::new(prefix)),
                name: SmolStr::new(name),
            },
            None => Step {
                prefix: None,
                name: SmolStr::new(segment),
            },
        })
        .collect()
}

fn syntax(expression: &str, message: impl Into<String>) -> IdentifierError {
    IdentifierError::Syntax {
        expression: expression.to_string(),
        message: message.into(),
    }
}

fn parse_path(expression: &str, path: &str) -> Result<Vec<Step>, IdentifierError> {
    if path.is_empty() {
        return Err(syntax(expression, "empty path"));
    }
    for segment in path.split('/') {
        if segment.is_empty() {
            return Err(syntax(expression, "empty path step"));
        }
        if segment
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '\'' | '"' | '(' | ')' | ',' | '[' | ']'))
        {
            return Err(syntax(expression, format!("invalid path step '{segment}'")));
        }
        if let Some((prefix, name)) = segment.split_once(':') {
            if prefix.is_empty() || name.is_empty() || name.contains(':') {
                return Err(syntax(expression, format!("invalid qualified name '{segment}'")));
            }
        }
    }
    Ok(steps(path))
}

fn parse_part(expression: &str, arg: &str) -> Result<Part, IdentifierError> {
    for quote in ['\'', '"'] {
        if let Some(inner) = arg.strip_prefix(quote) {
            return inner
                .strip_suffix(quote)
                .map(|s| Part::Literal(s.to_string()))
                .ok_or_else(|| syntax(expression, "unterminated string literal"));
        }
    }
    parse_path(expression, arg).map(Part::Path)
}

/// Split `a, 'x,y', b` at top-level commas.
fn split_args<'a>(expression: &str, args: &'a str) -> Result<Vec<&'a str>, IdentifierError> {
    let mut out = Vec::new();
    let mut quote = None;
    let mut start = 0;
    for (idx, c) in args.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, ',') => {
                out.push(args[start..idx].trim());
                start = idx + 1;
            }
            (None, _) => {}
        }
    }
    if quote.is_some() {
        return Err(syntax(expression, "unterminated string literal"));
    }
    out.push(args[start..].trim());
    if out.iter().any(|a| a.is_empty()) {
        return Err(syntax(expression, "empty concat argument"));
    }
    Ok(out)
}

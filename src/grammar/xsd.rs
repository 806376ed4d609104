//! Schema-backed grammar.

/// A grammar backed by an XML schema. Schemas are not interpreted, so no
/// child order is ever known for any element.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Xsd {
    location: Option<String>,
}

impl Xsd {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: Some(location.into()),
        }
    }

    /// Schema location, if one was given.
    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }
}

//! Logos-based lexer for DTD content models.
//!
//! `(servlet-name, (servlet-class|jsp-file), init-param*)` becomes a flat
//! stream of group, separator and name tokens. Multiplicity suffixes stay
//! attached to the name they follow.

use logos::Logos;

/// A content model token with its text and byte offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: ModelToken,
    pub text: &'a str,
    pub offset: usize,
}

/// Lexer wrapping the logos-generated tokenizer.
pub struct Lexer<'a> {
    inner: logos::Lexer<'a, ModelToken>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            inner: ModelToken::lexer(input),
        }
    }
}

impl<'a> Iterator for Lexer<'a> {
    /// `Err` carries the offset of text the lexer could not classify.
    type Item = Result<Token<'a>, usize>;

    fn next(&mut self) -> Option<Self::Item> {
        let token = self.inner.next()?;
        let offset = self.inner.span().start;
        Some(match token {
            Ok(kind) => Ok(Token {
                kind,
                text: self.inner.slice(),
                offset,
            }),
            Err(()) => Err(offset),
        })
    }
}

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n]+")]
pub enum ModelToken {
    #[token("(")]
    Open,

    #[token(")")]
    Close,

    #[token(",")]
    Sequence,

    #[token("|")]
    Choice,

    /// Element name, possibly with a trailing `?`, `*` or `+`. A bare
    /// suffix after a closing group lexes as a name of its own.
    #[regex(r"[^ \t\r\n,|()]+")]
    Name,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<(ModelToken, &str)> {
        Lexer::new(input)
            .map(|t| t.unwrap())
            .map(|t| (t.kind, t.text))
            .collect()
    }

    #[test]
    fn test_sequence_with_suffixes() {
        assert_eq!(
            kinds("(a, b*,c?)"),
            vec![
                (ModelToken::Open, "("),
                (ModelToken::Name, "a"),
                (ModelToken::Sequence, ","),
                (ModelToken::Name, "b*"),
                (ModelToken::Sequence, ","),
                (ModelToken::Name, "c?"),
                (ModelToken::Close, ")"),
            ]
        );
    }

    #[test]
    fn test_group_suffix_is_separate_name() {
        assert_eq!(
            kinds("(x|y)*"),
            vec![
                (ModelToken::Open, "("),
                (ModelToken::Name, "x"),
                (ModelToken::Choice, "|"),
                (ModelToken::Name, "y"),
                (ModelToken::Close, ")"),
                (ModelToken::Name, "*"),
            ]
        );
    }

    #[test]
    fn test_offsets() {
        let tokens: Vec<_> = Lexer::new("( a )").map(|t| t.unwrap().offset).collect();
        assert_eq!(tokens, vec![0, 2, 4]);
    }
}

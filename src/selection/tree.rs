//! Field-selection trees and a parser for selection-set text such as
//! `{ items { id name variants { price } } totalItems }`.

use crate::error::SelectionError;
use std::collections::BTreeMap;

/// Requested query shape: field name → sub-selection. Leaves have no children.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FieldSelection {
    fields: BTreeMap<String, FieldSelection>,
}

impl FieldSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `name` with a sub-selection, merging with an existing entry of the same name.
    pub fn with(mut self, name: &str, sub: FieldSelection) -> Self {
        self.insert(name, sub);
        self
    }

    pub fn leaf(self, name: &str) -> Self {
        self.with(name, FieldSelection::new())
    }

    pub fn insert(&mut self, name: &str, sub: FieldSelection) {
        match self.fields.get_mut(name) {
            Some(existing) => existing.merge(sub),
            None => {
                self.fields.insert(name.to_string(), sub);
            }
        }
    }

    pub fn merge(&mut self, other: FieldSelection) {
        for (name, sub) in other.fields {
            self.insert(&name, sub);
        }
    }

    pub fn get(&self, name: &str) -> Option<&FieldSelection> {
        self.fields.get(name)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldSelection)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Parse selection-set text. Outer braces are optional. Aliases resolve to the
    /// underlying field, arguments and directives are ignored, inline fragments are
    /// merged into the enclosing selection and named fragment spreads are skipped.
    pub fn parse(text: &str) -> Result<Self, SelectionError> {
        let tokens = tokenize(text)?;
        let mut parser = Parser { tokens, pos: 0 };
        let selection = if parser.peek() == Some(&Token::Open) {
            parser.pos += 1;
            let set = parser.selection_set(true)?;
            if let Some(t) = parser.peek() {
                return Err(SelectionError::UnexpectedToken(t.describe()));
            }
            set
        } else {
            parser.selection_set(false)?
        };
        Ok(selection)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Token {
    Name(String),
    Open,
    Close,
    Colon,
    Spread,
    At,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Name(n) => format!("'{}'", n),
            Token::Open => "'{'".into(),
            Token::Close => "'}'".into(),
            Token::Colon => "':'".into(),
            Token::Spread => "'...'".into(),
            Token::At => "'@'".into(),
        }
    }
}

fn tokenize(text: &str) -> Result<Vec<Token>, SelectionError> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let (offset, c) = chars[i];
        match c {
            c if c.is_whitespace() || c == ',' => i += 1,
            '#' => {
                while i < chars.len() && chars[i].1 != '\n' {
                    i += 1;
                }
            }
            '{' => {
                tokens.push(Token::Open);
                i += 1;
            }
            '}' => {
                tokens.push(Token::Close);
                i += 1;
            }
            ':' => {
                tokens.push(Token::Colon);
                i += 1;
            }
            '@' => {
                tokens.push(Token::At);
                i += 1;
            }
            '.' => {
                let is_spread = chars.get(i + 1).map(|c| c.1) == Some('.')
                    && chars.get(i + 2).map(|c| c.1) == Some('.');
                if !is_spread {
                    return Err(SelectionError::UnexpectedChar(c, offset));
                }
                tokens.push(Token::Spread);
                i += 3;
            }
            '(' => i = skip_arguments(&chars, i)?,
            c if c.is_ascii_alphanumeric() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].1.is_ascii_alphanumeric() || chars[i].1 == '_') {
                    i += 1;
                }
                tokens.push(Token::Name(chars[start..i].iter().map(|c| c.1).collect()));
            }
            other => return Err(SelectionError::UnexpectedChar(other, offset)),
        }
    }
    Ok(tokens)
}

/// Skip a balanced `( ... )` argument list, including string literals. Returns the index after it.
fn skip_arguments(chars: &[(usize, char)], start: usize) -> Result<usize, SelectionError> {
    let mut depth = 0usize;
    let mut i = start;
    while i < chars.len() {
        match chars[i].1 {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(i + 1);
                }
            }
            '"' => {
                i += 1;
                while i < chars.len() && chars[i].1 != '"' {
                    if chars[i].1 == '\\' {
                        i += 1;
                    }
                    i += 1;
                }
                if i >= chars.len() {
                    return Err(SelectionError::Unterminated("string"));
                }
            }
            _ => {}
        }
        i += 1;
    }
    Err(SelectionError::Unterminated("argument list"))
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        t
    }

    fn name(&mut self) -> Result<String, SelectionError> {
        match self.next() {
            Some(Token::Name(n)) => Ok(n),
            Some(t) => Err(SelectionError::UnexpectedToken(t.describe())),
            None => Err(SelectionError::UnexpectedEnd),
        }
    }

    fn skip_directives(&mut self) -> Result<(), SelectionError> {
        while self.peek() == Some(&Token::At) {
            self.pos += 1;
            self.name()?;
        }
        Ok(())
    }

    /// Fields up to the closing brace (when `braced`) or the end of input.
    fn selection_set(&mut self, braced: bool) -> Result<FieldSelection, SelectionError> {
        let mut selection = FieldSelection::new();
        loop {
            match self.next() {
                Some(Token::Close) if braced => return Ok(selection),
                None if !braced => return Ok(selection),
                None => return Err(SelectionError::Unterminated("selection set")),
                Some(Token::Spread) => {
                    if let Some(Token::Name(n)) = self.peek() {
                        let is_type_condition = n == "on";
                        self.pos += 1;
                        if !is_type_condition {
                            // named fragment spread; its definition is not available here
                            self.skip_directives()?;
                            continue;
                        }
                        self.name()?;
                    }
                    self.skip_directives()?;
                    match self.next() {
                        Some(Token::Open) => selection.merge(self.selection_set(true)?),
                        Some(t) => return Err(SelectionError::UnexpectedToken(t.describe())),
                        None => return Err(SelectionError::UnexpectedEnd),
                    }
                }
                Some(Token::Name(first)) => {
                    let field = if self.peek() == Some(&Token::Colon) {
                        self.pos += 1;
                        self.name()?
                    } else {
                        first
                    };
                    self.skip_directives()?;
                    let sub = if self.peek() == Some(&Token::Open) {
                        self.pos += 1;
                        self.selection_set(true)?
                    } else {
                        FieldSelection::new()
                    };
                    selection.insert(&field, sub);
                }
                Some(t) => return Err(SelectionError::UnexpectedToken(t.describe())),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_selection() {
        let s = FieldSelection::parse("{ id name featuredAsset { preview } variants { price taxCategory { id } } }").unwrap();
        let expected = FieldSelection::new()
            .leaf("id")
            .leaf("name")
            .with("featuredAsset", FieldSelection::new().leaf("preview"))
            .with(
                "variants",
                FieldSelection::new()
                    .leaf("price")
                    .with("taxCategory", FieldSelection::new().leaf("id")),
            );
        assert_eq!(s, expected);
    }

    #[test]
    fn ignores_aliases_arguments_and_directives() {
        let s = FieldSelection::parse(
            r#"
            # product page
            thumb: featuredAsset(size: "small", note: "a ) b") @include(if: $withAsset) { preview }
            variants(options: { take: 10 }) { id, sku }
            "#,
        )
        .unwrap();
        assert!(s.get("thumb").is_none());
        assert_eq!(s.get("featuredAsset").unwrap().get("preview"), Some(&FieldSelection::new()));
        assert!(s.get("variants").unwrap().get("sku").is_some());
    }

    #[test]
    fn merges_inline_fragments_and_repeated_fields() {
        let s = FieldSelection::parse(
            "{ items { ... on Product { variants { id } } ...ProductParts variants { sku } } }",
        )
        .unwrap();
        let variants = s.get("items").unwrap().get("variants").unwrap();
        assert!(variants.get("id").is_some());
        assert!(variants.get("sku").is_some());
    }

    #[test]
    fn reports_malformed_text() {
        assert_eq!(
            FieldSelection::parse("{ id name "),
            Err(SelectionError::Unterminated("selection set"))
        );
        assert_eq!(
            FieldSelection::parse("{ id } }"),
            Err(SelectionError::UnexpectedToken("'}'".into()))
        );
        assert_eq!(FieldSelection::parse("id $x"), Err(SelectionError::UnexpectedChar('$', 3)));
    }
}

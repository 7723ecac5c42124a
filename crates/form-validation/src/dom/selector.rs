//! CSS selector subset: type, `*`, class, id, attribute and combinators.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use super::{Document, NodeId};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SelectorError {
    #[error("selector is empty")]
    Empty,
    #[error("unexpected '{found}' at offset {offset} in selector '{selector}'")]
    Unexpected {
        selector: String,
        found: char,
        offset: usize,
    },
    #[error("expected a name at offset {offset} in selector '{selector}'")]
    MissingName { selector: String, offset: usize },
    #[error("selector '{selector}' ends with a combinator")]
    DanglingCombinator { selector: String },
    #[error("unterminated attribute selector in '{selector}'")]
    UnterminatedAttribute { selector: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttributeMatch {
    name: String,
    value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attributes: Vec<AttributeMatch>,
}

impl Compound {
    fn matches(&self, doc: &Document, node: NodeId) -> bool {
        if let Some(tag) = &self.tag
            && doc.tag(node) != Some(tag.as_str())
        {
            return false;
        }
        if let Some(id) = &self.id
            && doc.attribute(node, "id") != Some(id.as_str())
        {
            return false;
        }
        if !self.classes.iter().all(|class| doc.has_class(node, class)) {
            return false;
        }
        self.attributes.iter().all(|attr| {
            match (doc.attribute(node, &attr.name), &attr.value) {
                (Some(actual), Some(expected)) => actual == expected,
                (Some(_), None) => true,
                (None, _) => false,
            }
        })
    }
}

/// Compounds left to right; `combinators[i]` joins `parts[i]` and `parts[i + 1]`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Complex {
    parts: Vec<Compound>,
    combinators: Vec<Combinator>,
}

impl Complex {
    fn matches(&self, doc: &Document, node: NodeId) -> bool {
        self.matches_at(doc, node, self.parts.len() - 1)
    }

    fn matches_at(&self, doc: &Document, node: NodeId, index: usize) -> bool {
        if !self.parts[index].matches(doc, node) {
            return false;
        }
        if index == 0 {
            return true;
        }
        match self.combinators[index - 1] {
            Combinator::Child => doc
                .parent(node)
                .is_some_and(|parent| self.matches_at(doc, parent, index - 1)),
            Combinator::Descendant => {
                let mut current = doc.parent(node);
                while let Some(ancestor) = current {
                    if self.matches_at(doc, ancestor, index - 1) {
                        return true;
                    }
                    current = doc.parent(ancestor);
                }
                false
            }
        }
    }
}

/// A compiled, comma-separated selector list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorList {
    source: String,
    selectors: Vec<Complex>,
}

impl SelectorList {
    pub fn parse(source: &str) -> Result<Self, SelectorError> {
        Parser::new(source).parse_list()
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn matches(&self, doc: &Document, node: NodeId) -> bool {
        self.selectors
            .iter()
            .any(|selector| selector.matches(doc, node))
    }
}

impl FromStr for SelectorList {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for SelectorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

struct Parser<'a> {
    source: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn unexpected(&self, found: char) -> SelectorError {
        SelectorError::Unexpected {
            selector: self.source.to_string(),
            found,
            offset: self.pos,
        }
    }

    fn parse_list(mut self) -> Result<SelectorList, SelectorError> {
        if self.source.trim().is_empty() {
            return Err(SelectorError::Empty);
        }
        let mut selectors = Vec::new();
        loop {
            self.skip_whitespace();
            selectors.push(self.parse_complex()?);
            self.skip_whitespace();
            match self.peek() {
                None => break,
                Some(',') => self.pos += 1,
                Some(other) => return Err(self.unexpected(other)),
            }
        }
        Ok(SelectorList {
            source: self.source.trim().to_string(),
            selectors,
        })
    }

    fn parse_complex(&mut self) -> Result<Complex, SelectorError> {
        let mut parts = vec![self.parse_compound()?];
        let mut combinators = Vec::new();
        loop {
            let had_space = self.skip_whitespace();
            let combinator = match self.peek() {
                None | Some(',') => break,
                Some('>') => {
                    self.pos += 1;
                    self.skip_whitespace();
                    Combinator::Child
                }
                Some(_) if had_space => Combinator::Descendant,
                Some(other) => return Err(self.unexpected(other)),
            };
            if matches!(self.peek(), None | Some(',')) {
                return Err(SelectorError::DanglingCombinator {
                    selector: self.source.to_string(),
                });
            }
            combinators.push(combinator);
            parts.push(self.parse_compound()?);
        }
        Ok(Complex { parts, combinators })
    }

    fn parse_compound(&mut self) -> Result<Compound, SelectorError> {
        let start = self.pos;
        let mut compound = Compound::default();
        match self.peek() {
            Some('*') => self.pos += 1,
            Some(ch) if is_name_char(ch) => {
                compound.tag = Some(self.parse_name()?.to_ascii_lowercase());
            }
            _ => {}
        }
        loop {
            match self.peek() {
                Some('.') => {
                    self.pos += 1;
                    let class = self.parse_name()?;
                    compound.classes.push(class);
                }
                Some('#') => {
                    self.pos += 1;
                    compound.id = Some(self.parse_name()?);
                }
                Some('[') => {
                    self.pos += 1;
                    compound.attributes.push(self.parse_attribute()?);
                }
                _ => break,
            }
        }
        if self.pos == start {
            return Err(match self.peek() {
                Some(ch) => self.unexpected(ch),
                None => SelectorError::DanglingCombinator {
                    selector: self.source.to_string(),
                },
            });
        }
        Ok(compound)
    }

    fn parse_name(&mut self) -> Result<String, SelectorError> {
        let start = self.pos;
        while self.peek().is_some_and(is_name_char) {
            self.pos += 1;
        }
        if self.pos == start {
            return Err(SelectorError::MissingName {
                selector: self.source.to_string(),
                offset: self.pos,
            });
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }

    fn parse_attribute(&mut self) -> Result<AttributeMatch, SelectorError> {
        self.skip_whitespace();
        let name = self.parse_name()?.to_ascii_lowercase();
        self.skip_whitespace();
        let value = match self.peek() {
            Some('=') => {
                self.pos += 1;
                self.skip_whitespace();
                let value = match self.peek() {
                    Some(quote @ ('"' | '\'')) => self.parse_quoted(quote)?,
                    Some(_) => self.parse_name()?,
                    None => return Err(self.unterminated()),
                };
                self.skip_whitespace();
                Some(value)
            }
            _ => None,
        };
        match self.peek() {
            Some(']') => {
                self.pos += 1;
                Ok(AttributeMatch { name, value })
            }
            Some(other) => Err(self.unexpected(other)),
            None => Err(self.unterminated()),
        }
    }

    fn parse_quoted(&mut self, quote: char) -> Result<String, SelectorError> {
        self.pos += 1;
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if ch == quote {
                let value = self.chars[start..self.pos].iter().collect();
                self.pos += 1;
                return Ok(value);
            }
            self.pos += 1;
        }
        Err(self.unterminated())
    }

    fn unterminated(&self) -> SelectorError {
        SelectorError::UnterminatedAttribute {
            selector: self.source.to_string(),
        }
    }
}

fn is_name_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '-' || ch == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Document, NodeId, NodeId, NodeId) {
        let mut doc = Document::new();
        let popup = doc.create_element("div");
        doc.set_attribute(popup, "class", "popup popup_type_edit");
        let form = doc.create_element("form");
        doc.set_attribute(form, "class", "popup__form");
        doc.set_attribute(form, "name", "edit-profile");
        let input = doc.create_element("input");
        doc.set_attribute(input, "class", "popup__input popup__input_type_name");
        doc.set_attribute(input, "type", "text");
        doc.set_attribute(input, "id", "name-input");
        doc.append_child(doc.root(), popup).unwrap();
        doc.append_child(popup, form).unwrap();
        doc.append_child(form, input).unwrap();
        (doc, popup, form, input)
    }

    fn matches(selector: &str, doc: &Document, node: NodeId) -> bool {
        SelectorList::parse(selector).unwrap().matches(doc, node)
    }

    #[test]
    fn compound_parts_must_all_match() {
        let (doc, _, form, input) = sample();
        assert!(matches(".popup__input", &doc, input));
        assert!(matches("input.popup__input.popup__input_type_name", &doc, input));
        assert!(matches("#name-input", &doc, input));
        assert!(matches("form[name=edit-profile]", &doc, form));
        assert!(matches("[type='text']", &doc, input));
        assert!(matches("*", &doc, input));
        assert!(!matches("textarea.popup__input", &doc, input));
        assert!(!matches("[type=email]", &doc, input));
    }

    #[test]
    fn combinators_walk_ancestors() {
        let (doc, _, _, input) = sample();
        assert!(matches(".popup_type_edit .popup__input", &doc, input));
        assert!(matches(".popup__form > input", &doc, input));
        assert!(!matches(".popup > input", &doc, input));
        assert!(matches(".missing, .popup__form input", &doc, input));
    }

    #[test]
    fn tag_matching_is_case_insensitive() {
        let (doc, _, form, _) = sample();
        assert!(matches("FORM", &doc, form));
    }

    #[test]
    fn malformed_selectors_are_rejected() {
        assert_eq!(SelectorList::parse("   "), Err(SelectorError::Empty));
        assert!(matches!(
            SelectorList::parse(".popup >"),
            Err(SelectorError::DanglingCombinator { .. })
        ));
        assert!(matches!(
            SelectorList::parse("[type=text"),
            Err(SelectorError::UnterminatedAttribute { .. })
        ));
        assert!(matches!(
            SelectorList::parse("."),
            Err(SelectorError::MissingName { .. })
        ));
        assert!(matches!(
            SelectorList::parse("input:focus"),
            Err(SelectorError::Unexpected { found: ':', .. })
        ));
        assert!(matches!(
            SelectorList::parse(".a,"),
            Err(SelectorError::DanglingCombinator { .. })
        ));
    }

    #[test]
    fn display_keeps_source_text() {
        let list: SelectorList = " .popup__form ".parse().unwrap();
        assert_eq!(list.to_string(), ".popup__form");
    }
}

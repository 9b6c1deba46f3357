//! CSS Selectors
//!
//! The subset ad placement relies on: type, `*`, `#id`, `.class`,
//! `[attr]`, `[attr=value]`, `:not(compound)`, descendant and child
//! combinators, and comma separated lists.

use crate::{DomError, DomResult, DomTree, NodeId};

/// Relationship between two compounds of a complex selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    /// `a b`
    Descendant,
    /// `a > b`
    Child,
}

/// Attribute test inside a compound
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttrSelector {
    pub name: String,
    pub value: Option<String>,
}

/// Compound selector: every simple selector must match the same element
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Compound {
    pub tag: Option<String>,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub attrs: Vec<AttrSelector>,
    pub negations: Vec<Compound>,
}

impl Compound {
    fn is_empty(&self) -> bool {
        self.tag.is_none()
            && self.id.is_none()
            && self.classes.is_empty()
            && self.attrs.is_empty()
            && self.negations.is_empty()
    }

    /// Test this compound against one element
    pub fn matches(&self, tree: &DomTree, id: NodeId) -> bool {
        let Some(el) = tree.element(id) else {
            return false;
        };
        if let Some(tag) = &self.tag {
            if tag != "*" && *tag != el.tag {
                return false;
            }
        }
        if let Some(wanted) = &self.id {
            if el.id.as_deref() != Some(wanted.as_str()) {
                return false;
            }
        }
        if !self.classes.iter().all(|c| el.classes.contains(c)) {
            return false;
        }
        let attrs_ok = self.attrs.iter().all(|a| match &a.value {
            Some(value) => el.get_attr(&a.name) == Some(value.as_str()),
            None => el.has_attr(&a.name),
        });
        if !attrs_ok {
            return false;
        }
        !self.negations.iter().any(|n| n.matches(tree, id))
    }
}

/// Complex selector: compounds joined by combinators, matched right to left
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    /// `compounds[i]` relates to `compounds[i - 1]` through `combinators[i - 1]`
    compounds: Vec<Compound>,
    combinators: Vec<Combinator>,
}

impl Selector {
    pub fn matches(&self, tree: &DomTree, id: NodeId) -> bool {
        self.matches_at(tree, id, self.compounds.len() - 1)
    }

    fn matches_at(&self, tree: &DomTree, id: NodeId, index: usize) -> bool {
        if !self.compounds[index].matches(tree, id) {
            return false;
        }
        if index == 0 {
            return true;
        }
        match self.combinators[index - 1] {
            Combinator::Child => tree
                .parent(id)
                .is_some_and(|parent| self.matches_at(tree, parent, index - 1)),
            Combinator::Descendant => tree
                .ancestors(id)
                .any(|ancestor| self.matches_at(tree, ancestor, index - 1)),
        }
    }
}

/// Comma separated selector list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorList(Vec<Selector>);

impl SelectorList {
    /// Parse a selector list
    pub fn parse(input: &str) -> DomResult<Self> {
        let mut parser = Parser { input, chars: input.char_indices().peekable() };
        let list = parser.parse_list()?;
        Ok(Self(list))
    }

    /// Whether any selector in the list matches
    pub fn matches(&self, tree: &DomTree, id: NodeId) -> bool {
        self.0.iter().any(|s| s.matches(tree, id))
    }

    /// All matching elements strictly below `scope`, in document order
    pub fn query_all(&self, tree: &DomTree, scope: NodeId) -> Vec<NodeId> {
        tree.descendants(scope)
            .filter(|&id| self.matches(tree, id))
            .collect()
    }

    /// First matching element below `scope`
    pub fn query(&self, tree: &DomTree, scope: NodeId) -> Option<NodeId> {
        tree.descendants(scope).find(|&id| self.matches(tree, id))
    }
}

/// Query relative to `scope`. A leading `>` matches direct children of
/// `scope` only (`" > p"`), anything else matches descendants.
pub fn query_scoped(tree: &DomTree, scope: NodeId, input: &str) -> DomResult<Vec<NodeId>> {
    match input.trim_start().strip_prefix('>') {
        Some(rest) => {
            let list = SelectorList::parse(rest)?;
            Ok(tree
                .element_children(scope)
                .filter(|&id| list.matches(tree, id))
                .collect())
        }
        None => Ok(SelectorList::parse(input)?.query_all(tree, scope)),
    }
}

struct Parser<'a> {
    input: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
}

impl Parser<'_> {
    fn error(&self, reason: impl Into<String>) -> DomError {
        DomError::InvalidSelector {
            selector: self.input.to_string(),
            reason: reason.into(),
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }

    fn skip_whitespace(&mut self) -> bool {
        let mut skipped = false;
        while self.peek().is_some_and(char::is_whitespace) {
            self.chars.next();
            skipped = true;
        }
        skipped
    }

    fn parse_list(&mut self) -> DomResult<Vec<Selector>> {
        let mut list = vec![self.parse_complex()?];
        while self.peek() == Some(',') {
            self.chars.next();
            list.push(self.parse_complex()?);
        }
        if let Some(c) = self.peek() {
            return Err(self.error(format!("unexpected '{c}'")));
        }
        Ok(list)
    }

    fn parse_complex(&mut self) -> DomResult<Selector> {
        self.skip_whitespace();
        let mut compounds = vec![self.parse_compound()?];
        let mut combinators = Vec::new();

        loop {
            let had_space = self.skip_whitespace();
            let combinator = match self.peek() {
                Some('>') => {
                    self.chars.next();
                    self.skip_whitespace();
                    Combinator::Child
                }
                Some(',') | None => break,
                Some(_) if had_space => Combinator::Descendant,
                Some(c) => return Err(self.error(format!("unexpected '{c}'"))),
            };
            combinators.push(combinator);
            compounds.push(self.parse_compound()?);
        }

        Ok(Selector { compounds, combinators })
    }

    fn parse_compound(&mut self) -> DomResult<Compound> {
        let mut compound = Compound::default();

        if self.peek() == Some('*') {
            self.chars.next();
            compound.tag = Some("*".to_string());
        } else if self.peek().is_some_and(is_ident_char) {
            compound.tag = Some(self.parse_ident()?.to_ascii_lowercase());
        }

        loop {
            match self.peek() {
                Some('#') => {
                    self.chars.next();
                    compound.id = Some(self.parse_ident()?);
                }
                Some('.') => {
                    self.chars.next();
                    compound.classes.push(self.parse_ident()?);
                }
                Some('[') => {
                    self.chars.next();
                    compound.attrs.push(self.parse_attr()?);
                }
                Some(':') => {
                    self.chars.next();
                    let pseudo = self.parse_ident()?;
                    if pseudo != "not" || self.peek() != Some('(') {
                        return Err(self.error(format!("unsupported pseudo-class ':{pseudo}'")));
                    }
                    self.chars.next();
                    self.skip_whitespace();
                    let inner = self.parse_compound()?;
                    self.skip_whitespace();
                    if self.chars.next().map(|(_, c)| c) != Some(')') {
                        return Err(self.error("unterminated :not("));
                    }
                    compound.negations.push(inner);
                }
                _ => break,
            }
        }

        if compound.is_empty() {
            return Err(self.error("expected a selector"));
        }
        Ok(compound)
    }

    fn parse_attr(&mut self) -> DomResult<AttrSelector> {
        self.skip_whitespace();
        let name = self.parse_ident()?.to_ascii_lowercase();
        self.skip_whitespace();
        let value = if self.peek() == Some('=') {
            self.chars.next();
            self.skip_whitespace();
            Some(self.parse_value()?)
        } else {
            None
        };
        self.skip_whitespace();
        if self.chars.next().map(|(_, c)| c) != Some(']') {
            return Err(self.error("unterminated attribute selector"));
        }
        Ok(AttrSelector { name, value })
    }

    fn parse_value(&mut self) -> DomResult<String> {
        match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.chars.next();
                let mut value = String::new();
                loop {
                    match self.chars.next() {
                        Some((_, c)) if c == quote => return Ok(value),
                        Some((_, c)) => value.push(c),
                        None => return Err(self.error("unterminated string")),
                    }
                }
            }
            _ => self.parse_ident(),
        }
    }

    fn parse_ident(&mut self) -> DomResult<String> {
        let mut ident = String::new();
        while let Some(c) = self.peek().filter(|&c| is_ident_char(c)) {
            ident.push(c);
            self.chars.next();
        }
        if ident.is_empty() {
            return Err(self.error("expected an identifier"));
        }
        Ok(ident)
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> (DomTree, NodeId, NodeId, NodeId, NodeId) {
        let mut tree = DomTree::new();
        let body = tree.create_element("div");
        tree.add_class(body, "article-body").unwrap();
        tree.append_child(tree.root(), body).unwrap();

        let p = tree.create_element("p");
        tree.append_child(body, p).unwrap();

        let figure = tree.create_element("figure");
        tree.append_child(body, figure).unwrap();

        let nested = tree.create_element("p");
        tree.set_attribute(nested, "data-name", "caption").unwrap();
        tree.append_child(figure, nested).unwrap();

        (tree, body, p, figure, nested)
    }

    #[test]
    fn test_child_vs_descendant() {
        let (tree, _, p, _, nested) = page();
        let child = SelectorList::parse(".article-body > p").unwrap();
        let desc = SelectorList::parse(".article-body p").unwrap();

        assert_eq!(child.query_all(&tree, tree.root()), vec![p]);
        assert_eq!(desc.query_all(&tree, tree.root()), vec![p, nested]);
    }

    #[test]
    fn test_not_and_attributes() {
        let (tree, _, _, figure, nested) = page();
        let not_p = SelectorList::parse(".article-body > :not(p):not(h2)").unwrap();
        assert_eq!(not_p.query_all(&tree, tree.root()), vec![figure]);

        let attr = SelectorList::parse("p[data-name='caption']").unwrap();
        assert_eq!(attr.query_all(&tree, tree.root()), vec![nested]);

        let has = SelectorList::parse("[data-name]").unwrap();
        assert!(has.matches(&tree, nested));
    }

    #[test]
    fn test_selector_list() {
        let (tree, _, p, figure, nested) = page();
        let list = SelectorList::parse("figure, p").unwrap();
        assert_eq!(list.query_all(&tree, tree.root()), vec![p, figure, nested]);
    }

    #[test]
    fn test_scoped_queries() {
        let (tree, body, p, figure, nested) = page();
        assert_eq!(query_scoped(&tree, body, " > p").unwrap(), vec![p]);
        assert_eq!(query_scoped(&tree, body, "> :not(p)").unwrap(), vec![figure]);
        assert_eq!(query_scoped(&tree, body, " p").unwrap(), vec![p, nested]);
        assert!(query_scoped(&tree, body, ">").is_err());
    }

    #[test]
    fn test_invalid_selectors() {
        assert!(SelectorList::parse("").is_err());
        assert!(SelectorList::parse("div >").is_err());
        assert!(SelectorList::parse("p:hover").is_err());
        assert!(SelectorList::parse("[data-name").is_err());
    }
}

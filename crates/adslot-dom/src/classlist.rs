//! Class tokens
//!
//! Classes of one element, kept in insertion order without duplicates.
//! Slot kinds, containers and selectors all key off them.

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassList {
    tokens: Vec<String>,
}

impl ClassList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tokens of a `class` attribute value
    pub fn from_string(s: &str) -> Self {
        let mut list = Self::new();
        s.split_whitespace().for_each(|token| list.add(token));
        list
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn contains(&self, token: &str) -> bool {
        self.tokens.iter().any(|t| t == token)
    }

    /// Empty and repeated tokens are dropped
    pub fn add(&mut self, token: &str) {
        if !token.is_empty() && !self.contains(token) {
            self.tokens.push(token.to_string());
        }
    }

    pub fn remove(&mut self, token: &str) -> bool {
        let before = self.tokens.len();
        self.tokens.retain(|t| t != token);
        before != self.tokens.len()
    }
}

impl std::fmt::Display for ClassList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.tokens.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_string_dedups() {
        let list = ClassList::from_string("js-ad-slot  ad-slot js-ad-slot");
        assert_eq!(list.len(), 2);
        assert_eq!(list.to_string(), "js-ad-slot ad-slot");
    }

    #[test]
    fn test_add_and_remove() {
        let mut list = ClassList::new();
        list.add("ad-slot--rendered");
        list.add("");
        assert!(list.contains("ad-slot--rendered"));
        assert!(list.remove("ad-slot--rendered"));
        assert!(!list.remove("ad-slot--rendered"));
        assert!(list.is_empty());
    }
}

//! Compute-once values
//!
//! A value computed on first access and cached for the lifetime of its
//! owner. Used for switches derived from configuration and for the shared
//! lazy-load observer.

use std::cell::OnceCell;

/// Lazily computed, single-assignment value
pub struct Memo<T> {
    value: OnceCell<T>,
    init: Box<dyn Fn() -> T>,
}

impl<T: std::fmt::Debug> std::fmt::Debug for Memo<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Memo").field("value", &self.value.get()).finish()
    }
}

impl<T> Memo<T> {
    /// Create a memo that runs `init` on first access
    pub fn new<F>(init: F) -> Self
    where
        F: Fn() -> T + 'static,
    {
        Self { value: OnceCell::new(), init: Box::new(init) }
    }

    /// Get the value, computing it on first access
    pub fn get(&self) -> &T {
        self.value.get_or_init(|| (self.init)())
    }

    /// The value if it has been computed
    pub fn peek(&self) -> Option<&T> {
        self.value.get()
    }

    pub fn is_initialized(&self) -> bool {
        self.value.get().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn test_computed_once() {
        let calls = Rc::new(Cell::new(0));
        let c = calls.clone();
        let memo = Memo::new(move || {
            c.set(c.get() + 1);
            "20% 0px".to_string()
        });

        assert!(!memo.is_initialized());
        assert_eq!(memo.get(), "20% 0px");
        assert_eq!(memo.get(), "20% 0px");
        assert_eq!(calls.get(), 1);
        assert!(memo.peek().is_some());
    }
}

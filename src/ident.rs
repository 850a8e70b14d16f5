//! Interned identifiers.
//!
//! spec.md §3: "Identifier: interned textual name. Equality by identity."
//! Interning is thread-local rather than global because an execution
//! context (and therefore its identifiers) never crosses a thread boundary
//! per spec.md §5 — the one piece of genuinely cross-thread state is the
//! functional-character registry in `term.rs`, which stores plain `String`
//! tags instead.

use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

thread_local! {
    static INTERNER: RefCell<HashSet<Rc<str>>> = RefCell::new(HashSet::new());
}

/// An interned name. Cloning is a refcount bump; comparison and hashing are
/// by pointer, not by content — two `Identifier`s are equal iff they were
/// interned from equal strings.
#[derive(Clone)]
pub struct Identifier(Rc<str>);

impl Identifier {
    pub fn new(name: &str) -> Self {
        INTERNER.with(|cell| {
            let mut set = cell.borrow_mut();
            if let Some(existing) = set.get(name) {
                return Identifier(existing.clone());
            }
            let rc: Rc<str> = Rc::from(name);
            set.insert(rc.clone());
            Identifier(rc)
        })
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl PartialEq for Identifier {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Identifier {}

impl Hash for Identifier {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Rc::as_ptr(&self.0) as *const () as usize).hash(state);
    }
}

impl fmt::Debug for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identifier({:?})", self.0)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Identifier {
    fn from(name: &str) -> Self {
        Identifier::new(name)
    }
}

impl From<String> for Identifier {
    fn from(name: String) -> Self {
        Identifier::new(&name)
    }
}

/// Total order over identifiers, by their textual content (not pointer
/// value, so ordering is deterministic across runs) — used by
/// `Value::compare_total` when comparing containers that key on names.
impl PartialOrd for Identifier {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Identifier {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_gives_pointer_equal_identifiers() {
        let a = Identifier::new("n");
        let b = Identifier::new("n");
        assert!(Rc::ptr_eq(&a.0, &b.0));
        assert_eq!(a, b);
    }

    #[test]
    fn distinct_names_are_not_equal() {
        assert_ne!(Identifier::new("n"), Identifier::new("m"));
    }
}

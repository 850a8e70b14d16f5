//! The scope chain (spec.md §4.2).
//!
//! A `Scope` is a cheaply-cloned handle (`Rc<RefCell<Frame>>`) onto one
//! link of an acyclic parent-linked chain, per the DESIGN NOTES in
//! spec.md §9 ("unique ownership with reference counting for parent
//! links"). Frames never form cycles: a frame's `parent` is set once, at
//! construction, and never mutated.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::{Error, Result};
use crate::ident::Identifier;
use crate::term::Term;
use crate::value::Value;

struct Frame {
    bindings: HashMap<Identifier, Value>,
    parent: Option<Scope>,
    restrict_to_functions: bool,
    read_through: bool,
    write_through: bool,
}

/// A handle onto one frame of the scope chain.
#[derive(Clone)]
pub struct Scope(Rc<RefCell<Frame>>);

/// Result of a [`Scope::lookup`]: the resolved value and whether it was
/// found locally or had to ascend into an ancestor frame.
pub struct Lookup {
    pub value: Value,
    pub came_from_ancestor: bool,
}

impl Scope {
    /// A fresh root frame with no parent and no special flags — used for
    /// the global scope, the initial scope, and the outermost program
    /// scope.
    pub fn root() -> Self {
        Scope(Rc::new(RefCell::new(Frame {
            bindings: HashMap::new(),
            parent: None,
            restrict_to_functions: false,
            read_through: false,
            write_through: false,
        })))
    }

    /// A plain nested child (normal nested call / block scope): no
    /// special flags.
    pub fn new_child(&self) -> Self {
        self.new_child_with_flags(false, false, false)
    }

    fn new_child_with_flags(
        &self,
        restrict_to_functions: bool,
        read_through: bool,
        write_through: bool,
    ) -> Self {
        Scope(Rc::new(RefCell::new(Frame {
            bindings: HashMap::new(),
            parent: Some(self.clone()),
            restrict_to_functions,
            read_through,
            write_through,
        })))
    }

    /// The "functions-only linked scope" used at call entry (spec.md
    /// §4.2): the callee cannot see caller-local non-function variables
    /// but can still resolve procedures.
    pub fn new_functions_only_child(&self) -> Self {
        self.new_child_with_flags(true, false, false)
    }

    /// The iterator-block scope (spec.md §4.2): the iteration variable is
    /// local, but stores for identifiers not already bound here propagate
    /// outward, and reads from ancestors are not cached locally.
    pub fn new_iterator_child(&self) -> Self {
        self.new_child_with_flags(false, true, true)
    }

    /// Binds `id` directly in this frame, bypassing `store`'s
    /// write-through delegation. Used for parameter binding and closure
    /// capture realization (spec.md §4.3.2 steps 4–5), which must never
    /// reach into an ancestor frame.
    pub fn define_local(&self, id: Identifier, value: Value) {
        self.0.borrow_mut().bindings.insert(id, value);
    }

    /// spec.md §4.2 `lookup`.
    pub fn lookup(&self, id: &Identifier) -> Option<Lookup> {
        if let Some(value) = self.0.borrow().bindings.get(id).cloned() {
            return Some(Lookup {
                value,
                came_from_ancestor: false,
            });
        }
        let (parent, restrict) = {
            let frame = self.0.borrow();
            (frame.parent.clone(), frame.restrict_to_functions)
        };
        let value = parent?.lookup_ascend(id, restrict)?;
        Some(Lookup {
            value,
            came_from_ancestor: true,
        })
    }

    /// Ancestor-side half of `lookup`: once `restrict` is set (because some
    /// descendant frame on the search path was functions-only), a binding
    /// found here that isn't a procedure or `omega` is shadowed rather than
    /// returned (spec.md §4.2, scenario 4 in spec.md §8).
    fn lookup_ascend(&self, id: &Identifier, restrict: bool) -> Option<Value> {
        if let Some(value) = self.0.borrow().bindings.get(id).cloned() {
            if restrict && !matches!(value, Value::Procedure(_) | Value::Omega) {
                return Some(Value::Omega);
            }
            return Some(value);
        }
        let (parent, my_restrict) = {
            let frame = self.0.borrow();
            (frame.parent.clone(), frame.restrict_to_functions)
        };
        parent?.lookup_ascend(id, restrict || my_restrict)
    }

    /// Caches a value looked up from an ancestor into this frame, unless
    /// this frame is `read_through` or already has a local entry for
    /// `id`. The caller decides whether caching is appropriate (spec.md
    /// §4.2: "ordinary variables do not" cache, closures do, via
    /// §4.6's initial-scope memoization).
    pub fn cache_if_permitted(&self, id: &Identifier, value: &Value) {
        let mut frame = self.0.borrow_mut();
        if frame.read_through {
            return;
        }
        frame.bindings.entry(id.clone()).or_insert_with(|| value.clone());
    }

    /// spec.md §4.2 `store`.
    pub fn store(&self, id: &Identifier, value: Value) -> Result<()> {
        let mut frame = self.0.borrow_mut();
        if frame.bindings.contains_key(id) || !frame.write_through {
            frame.bindings.insert(id.clone(), value);
            return Ok(());
        }
        let parent = frame.parent.clone();
        drop(frame);
        match parent {
            Some(parent) => parent.store_through(id, value),
            None => {
                self.0.borrow_mut().bindings.insert(id.clone(), value);
                Ok(())
            }
        }
    }

    /// Store delegation across a `restrict_to_functions` ancestor only
    /// propagates procedure values (spec.md §4.2).
    fn store_through(&self, id: &Identifier, value: Value) -> Result<()> {
        let restrict = self.0.borrow().restrict_to_functions;
        if restrict && !matches!(value, Value::Procedure(_)) {
            return Err(Error::UndefinedOperation(format!(
                "cannot store non-procedure '{}' through a functions-only scope",
                id
            )));
        }
        self.store(id, value)
    }

    /// spec.md §4.2 `make_global`: ensures `id` exists in `global`,
    /// creating it as `Omega` if absent.
    pub fn make_global(global: &Scope, id: &Identifier) {
        let mut frame = global.0.borrow_mut();
        frame.bindings.entry(id.clone()).or_insert(Value::Omega);
    }

    /// Whether `id` is bound directly in the global frame — used by the
    /// driver's assignment touchpoint (spec.md §4.6b) to decide whether a
    /// store should be redirected to `global` instead of the current
    /// scope.
    pub fn is_bound_in_global(global: &Scope, id: &Identifier) -> bool {
        global.0.borrow().bindings.contains_key(id)
    }

    pub fn store_into(&self, id: &Identifier, value: Value) {
        self.0.borrow_mut().bindings.insert(id.clone(), value);
    }

    /// spec.md §4.2 `collect_all_bindings`: walks the chain from the
    /// deepest ancestor to `self`, later frames overriding earlier ones.
    pub fn collect_all_bindings(&self, include_non_functions: bool) -> HashMap<Identifier, Value> {
        let mut chain = Vec::new();
        let mut cur = Some(self.clone());
        while let Some(scope) = cur {
            let parent = scope.0.borrow().parent.clone();
            chain.push(scope);
            cur = parent;
        }
        let mut merged = HashMap::new();
        for scope in chain.into_iter().rev() {
            for (name, value) in scope.0.borrow().bindings.iter() {
                if include_non_functions || matches!(value, Value::Procedure(_)) {
                    merged.insert(name.clone(), value.clone());
                }
            }
        }
        merged
    }

    /// spec.md §4.2 `to_term`: `^scope(bindings_set)`. The global frame is
    /// always the root ancestor of a program's scope chain (see
    /// `Interpreter::new`), so walking the full chain already yields the
    /// union of the chain's bindings and the global frame's.
    pub fn to_term(&self) -> Term {
        let merged = self.collect_all_bindings(true);
        let mut pairs: Vec<Term> = merged
            .into_iter()
            .map(|(name, value)| {
                Term::compound(
                    "^binding",
                    vec![Term::Str(name.as_str().to_string()), value.to_term()],
                )
            })
            .collect();
        pairs.sort();
        Term::compound("^scope", pairs)
    }

    /// Identity-based ordering for `Value::Scope` comparisons (spec.md §3
    /// requires a total order over every variant; live scopes are mutable
    /// running state, so identity rather than a structural snapshot is
    /// the only stable choice across the scope's lifetime).
    pub fn identity_cmp(&self, other: &Scope) -> Ordering {
        (Rc::as_ptr(&self.0) as usize).cmp(&(Rc::as_ptr(&other.0) as usize))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn val(n: i64) -> Value {
        Value::Int(n)
    }

    #[test]
    fn child_lookup_falls_through_to_parent() {
        let parent = Scope::root();
        parent.define_local(Identifier::new("x"), val(7));
        let child = parent.new_child();
        let found = child.lookup(&Identifier::new("x")).unwrap();
        assert!(found.came_from_ancestor);
        assert!(matches!(found.value, Value::Int(7)));
    }

    #[test]
    fn functions_only_child_shadows_non_procedure_ancestor_binding() {
        let parent = Scope::root();
        parent.define_local(Identifier::new("n"), val(1));
        let callee = parent.new_functions_only_child();
        let found = callee.lookup(&Identifier::new("n")).unwrap();
        assert!(matches!(found.value, Value::Omega));
    }

    #[test]
    fn functions_only_child_still_resolves_procedures() {
        use crate::ast::Block;
        use crate::procedure::{make_plain_procedure};
        let parent = Scope::root();
        let id = Identifier::new("f");
        parent.define_local(id.clone(), Value::Procedure(make_plain_procedure(vec![], Block::default())));
        let callee = parent.new_functions_only_child();
        let found = callee.lookup(&id).unwrap();
        assert!(matches!(found.value, Value::Procedure(_)));
    }

    #[test]
    fn iterator_child_write_through_updates_outer_binding() {
        let outer = Scope::root();
        outer.define_local(Identifier::new("s"), val(0));
        let iter_scope = outer.new_iterator_child();
        iter_scope.define_local(Identifier::new("i"), val(1));
        iter_scope.store(&Identifier::new("s"), val(1)).unwrap();
        assert!(matches!(
            outer.lookup(&Identifier::new("s")).unwrap().value,
            Value::Int(1)
        ));
        // the local iteration variable never leaked outward
        assert!(outer.lookup(&Identifier::new("i")).is_none());
    }

    #[test]
    fn make_global_then_local_store_is_visible_on_global() {
        let global = Scope::root();
        let id = Identifier::new("g");
        Scope::make_global(&global, &id);
        assert!(Scope::is_bound_in_global(&global, &id));
        global.store_into(&id, val(42));
        assert!(matches!(global.lookup(&id).unwrap().value, Value::Int(42)));
    }
}

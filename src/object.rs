//! Objects (spec.md §3's `object` value variant).
//!
//! The language's object model is an external collaborator in full (class
//! bodies, inheritance, method resolution — none of that is specified
//! here); the core only needs enough of an `Object` to be a legitimate
//! `Value` variant and to serve as the `bound_object` a procedure carries
//! transiently after a member access (spec.md §3, §4.3.3, §9's "Transient
//! `bound_object` field" note).

use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::rc::Rc;

use crate::ident::Identifier;
use crate::scope::Scope;
use crate::value::Value;

pub struct ObjectValue {
    pub class_name: String,
    pub members: HashMap<Identifier, Value>,
}

pub type ObjectHandle = Rc<RefCell<ObjectValue>>;

impl ObjectValue {
    pub fn new(class_name: impl Into<String>) -> ObjectHandle {
        Rc::new(RefCell::new(ObjectValue {
            class_name: class_name.into(),
            members: HashMap::new(),
        }))
    }

    /// Builds a scope frame exposing this object's members, used as the
    /// intermediate link between a bound method's callee frame and the
    /// caller when step 3 of spec.md §4.3.2 says "link `callee` to the
    /// owning object's members".
    pub fn member_scope(handle: &ObjectHandle, parent: &Scope) -> Scope {
        let frame = parent.new_child();
        for (name, value) in handle.borrow().members.iter() {
            frame.define_local(name.clone(), value.clone());
        }
        frame
    }
}

pub fn clone_deep(handle: &ObjectHandle) -> ObjectHandle {
    let src = handle.borrow();
    Rc::new(RefCell::new(ObjectValue {
        class_name: src.class_name.clone(),
        members: src
            .members
            .iter()
            .map(|(k, v)| (k.clone(), v.clone_deep()))
            .collect(),
    }))
}

pub fn compare(a: &ObjectHandle, b: &ObjectHandle) -> Ordering {
    if Rc::ptr_eq(a, b) {
        return Ordering::Equal;
    }
    let (a, b) = (a.borrow(), b.borrow());
    let by_class = a.class_name.cmp(&b.class_name);
    if by_class != Ordering::Equal {
        return by_class;
    }
    let mut a_keys: Vec<_> = a.members.keys().cloned().collect();
    a_keys.sort();
    let mut b_keys: Vec<_> = b.members.keys().cloned().collect();
    b_keys.sort();
    for (ak, bk) in a_keys.iter().zip(b_keys.iter()) {
        let c = ak.cmp(bk);
        if c != Ordering::Equal {
            return c;
        }
    }
    let len_cmp = a_keys.len().cmp(&b_keys.len());
    if len_cmp != Ordering::Equal {
        return len_cmp;
    }
    for key in &a_keys {
        let c = a.members[key].compare_total(&b.members[key]);
        if c != Ordering::Equal {
            return c;
        }
    }
    Ordering::Equal
}

pub fn display(handle: &ObjectHandle) -> String {
    format!("{}-object", handle.borrow().class_name)
}

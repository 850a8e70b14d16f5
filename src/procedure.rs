//! Procedures and closures (spec.md §4.3) — the call protocol.
//!
//! A plain procedure links into the call chain "functions only": it sees
//! the global scope's procedures but none of the caller's locals. A
//! closure instead carries its own private snapshot of the free variables
//! it referenced at definition time (spec.md §4.3.1's bound/unbound/used
//! classification) and refreshes that snapshot from its own call frame
//! after every invocation, so two closures created from two different
//! calls to the same factory stay independent while a single closure's
//! state persists across repeated calls on it (spec.md §8 scenario 1,
//! the counter closure).

use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::rc::Rc;

use crate::ast::{self, Block};
use crate::error::{Error, Result};
use crate::ident::Identifier;
use crate::interpreter::{Flow, Interpreter};
use crate::object::ObjectHandle;
use crate::param::{ParamMode, ParameterDescriptor};
use crate::scope::Scope;
use crate::term::{self, Term};
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcKind {
    /// An ordinary named or anonymous procedure: no variable capture.
    Plain,
    /// Captures the free variables of its body at definition time.
    Closure,
    /// A single-expression procedure literal; behaves like `Plain` for
    /// scoping and call purposes, kept as a distinct AST-level kind only
    /// so pretty-printing and term round-trips preserve the shorthand.
    Lambda,
}

pub struct ProcedureValue {
    pub kind: ProcKind,
    pub params: Vec<ParameterDescriptor>,
    pub body: Rc<Block>,
    /// Snapshot of free-variable bindings, populated at creation and
    /// refreshed after each call. Empty for `Plain`/`Lambda`.
    pub captured: HashMap<Identifier, Value>,
    /// Transient binding set by member access (spec.md §3, §9); cleared
    /// by `clone_deep` and ignored by `compare_ignoring_capture`.
    pub bound_object: Option<ObjectHandle>,
}

pub type ProcedureHandle = Rc<RefCell<ProcedureValue>>;

/// Builds a plain, non-capturing procedure.
pub fn make_plain_procedure(params: Vec<ParameterDescriptor>, body: Block) -> ProcedureHandle {
    Rc::new(RefCell::new(ProcedureValue {
        kind: ProcKind::Plain,
        params,
        body: Rc::new(body),
        captured: HashMap::new(),
        bound_object: None,
    }))
}

/// Builds a closure, capturing the free variables of `body` (beyond its
/// own parameters) as currently visible in `defining_scope` (spec.md
/// §4.3.1). A free variable unresolved at definition time is simply
/// omitted — later reads of it inside the closure's call frame fall back
/// through the global scope like any other undefined name.
pub fn make_closure(params: Vec<ParameterDescriptor>, body: Block, defining_scope: &Scope) -> ProcedureHandle {
    let mut bound: std::collections::HashSet<Identifier> =
        params.iter().map(|p| p.name.clone()).collect();
    let mut unbound = std::collections::HashSet::new();
    let mut used = std::collections::HashSet::new();
    ast::collect_variables(&body, &mut bound, &mut unbound, &mut used);

    let mut captured = HashMap::new();
    for id in unbound {
        if let Some(lookup) = defining_scope.lookup(&id) {
            captured.insert(id, lookup.value.clone_deep());
        }
    }

    Rc::new(RefCell::new(ProcedureValue {
        kind: ProcKind::Closure,
        params,
        body: Rc::new(body),
        captured,
        bound_object: None,
    }))
}

/// Binds `bound_object`'s members ahead of the procedure's own scope,
/// per spec.md §4.3.2 step 3. Returns a fresh handle sharing the same
/// body/params/captured state — member binding is per access-site, not
/// a mutation of the original handle.
pub fn bind_to_object(handle: &ProcedureHandle, object: &ObjectHandle) -> ProcedureHandle {
    let p = handle.borrow();
    Rc::new(RefCell::new(ProcedureValue {
        kind: p.kind,
        params: p.params.clone(),
        body: p.body.clone(),
        captured: p.captured.clone(),
        bound_object: Some(object.clone()),
    }))
}

/// Outcome of a call: the return value, plus post-call values for every
/// READ_WRITE parameter (by argument index) for the caller to write back
/// into its own scope (spec.md §4.3.2 step 9, §4.4).
pub struct CallOutcome {
    pub result: Value,
    pub written_back: Vec<(usize, Value)>,
}

/// Executes the full call protocol (spec.md §4.3.2, steps 1–10):
///
/// 1. Resolve the procedure (done by the caller before invoking this).
/// 2. Check the call-depth guard.
/// 3. Link the callee's scope: functions-only off the caller's own
///    current scope for a plain procedure, or off a private capture
///    frame rooted at the global scope for a closure; if the procedure
///    is bound to an object, its members come first.
/// 4. Bind parameters (VALUE/LIST_PATTERN deep-clone the argument,
///    READ_WRITE binds the original).
/// 5. Execute the body.
/// 6. Regardless of how the body exits (normal fall-through, `return`,
///    or a propagated error), read back READ_WRITE parameters and
///    refresh the closure's captured snapshot, then release the
///    call-depth guard, before the outcome is allowed to propagate.
pub fn call(
    interp: &mut Interpreter,
    handle: &ProcedureHandle,
    args: Vec<Value>,
    caller_scope: &Scope,
) -> Result<CallOutcome> {
    let depth = interp.enter_call()?;
    let (kind, params, body, captured_snapshot, bound_object) = {
        let p = handle.borrow();
        (p.kind, p.params.clone(), p.body.clone(), p.captured.clone(), p.bound_object.clone())
    };

    if params.len() != args.len() {
        interp.exit_call();
        return Err(Error::Runtime(format!(
            "procedure expects {} argument(s), got {}",
            params.len(),
            args.len()
        )));
    }

    let capture_frame = match kind {
        ProcKind::Closure => {
            // Call-site independent: a closure's frame always roots off the
            // global scope, never off wherever it happens to be invoked
            // from, or it would behave like dynamic scoping instead of
            // capturing its free variables at definition time.
            let frame = interp.global_scope().new_child();
            for (id, value) in &captured_snapshot {
                frame.define_local(id.clone(), value.clone());
            }
            frame
        }
        // Functions-only linking is about the *caller's* chain, not a fixed
        // global frame: top-level procedures live in the program's initial
        // scope (global's own child), so rooting this off bare global_scope
        // would make a plain procedure unable to see any other top-level
        // procedure. Ascending from the caller's own current scope reaches
        // those definitions while still shadowing every non-procedure
        // binding along the way, all the way up to global.
        ProcKind::Plain | ProcKind::Lambda => caller_scope.new_functions_only_child(),
    };

    let param_scope = match &bound_object {
        Some(object) => crate::object::ObjectValue::member_scope(object, &capture_frame),
        None => capture_frame.new_child(),
    };

    for (param, arg) in params.iter().zip(args.into_iter()) {
        let bound_value = match param.mode {
            ParamMode::Value | ParamMode::ListPattern => arg.clone_deep(),
            ParamMode::ReadWrite => arg,
        };
        param.assign_into(&param_scope, bound_value);
    }

    let body_result = interp.exec_block_in(&param_scope, &body);

    let mut written_back = Vec::new();
    for (index, param) in params.iter().enumerate() {
        if param.mode == ParamMode::ReadWrite {
            if let Ok(value) = param.read_back(&param_scope) {
                written_back.push((index, value));
            }
        }
    }
    if kind == ProcKind::Closure {
        // `param_scope` never writes through to `capture_frame` (spec.md
        // §4.2: only iterator blocks do that), so a body assignment to a
        // captured name lands as a local shadow in `param_scope`, not in
        // `capture_frame` itself. Reading back via an ascending lookup
        // from `param_scope` finds that shadow first and falls back to
        // the untouched snapshot in `capture_frame` otherwise — either
        // way it's the value this call actually leaves the name at.
        let mut p = handle.borrow_mut();
        for id in captured_snapshot.keys() {
            if let Some(lookup) = param_scope.lookup(id) {
                p.captured.insert(id.clone(), lookup.value);
            }
        }
    }
    interp.exit_call();
    log::trace!("call at depth {} returned", depth);

    let flow = body_result?;
    let result = match flow {
        Flow::Return(v) => v,
        _ => Value::Omega,
    };
    Ok(CallOutcome { result, written_back })
}

/// A deep, independent copy (spec.md §4.3.4, §9's resolved Open
/// Question: procedures always deep-clone, never alias). The body AST is
/// immutable code and is shared via `Rc`, not duplicated; everything
/// that can actually change — the captured snapshot, the bound object —
/// is cloned.
pub fn clone_deep(handle: &ProcedureHandle) -> ProcedureHandle {
    let p = handle.borrow();
    Rc::new(RefCell::new(ProcedureValue {
        kind: p.kind,
        params: p.params.clone(),
        body: p.body.clone(),
        captured: p.captured.iter().map(|(k, v)| (k.clone(), v.clone_deep())).collect(),
        bound_object: p.bound_object.as_ref().map(crate::object::clone_deep),
    }))
}

/// Structural comparison ignoring `captured` and `bound_object` (spec.md
/// §4.3.4): two procedures with identical parameters and body compare
/// equal even if one has already accumulated call-refreshed closure
/// state the other hasn't.
pub fn compare_ignoring_capture(a: &ProcedureHandle, b: &ProcedureHandle) -> Ordering {
    if Rc::ptr_eq(a, b) {
        return Ordering::Equal;
    }
    let (pa, pb) = (a.borrow(), b.borrow());
    let by_kind = kind_rank(pa.kind).cmp(&kind_rank(pb.kind));
    if by_kind != Ordering::Equal {
        return by_kind;
    }
    let by_params = compare_params(&pa.params, &pb.params);
    if by_params != Ordering::Equal {
        return by_params;
    }
    ast::block_to_term(&pa.body).cmp(&ast::block_to_term(&pb.body))
}

fn kind_rank(k: ProcKind) -> u8 {
    match k {
        ProcKind::Plain => 0,
        ProcKind::Closure => 1,
        ProcKind::Lambda => 2,
    }
}

fn compare_params(a: &[ParameterDescriptor], b: &[ParameterDescriptor]) -> Ordering {
    let len = a.len().cmp(&b.len());
    if len != Ordering::Equal {
        return len;
    }
    for (pa, pb) in a.iter().zip(b.iter()) {
        let c = pa.name.cmp(&pb.name);
        if c != Ordering::Equal {
            return c;
        }
        let c = pa.mode.cmp(&pb.mode);
        if c != Ordering::Equal {
            return c;
        }
    }
    Ordering::Equal
}

pub fn display(handle: &ProcedureHandle) -> String {
    let p = handle.borrow();
    let head = match p.kind {
        ProcKind::Plain => "procedure",
        ProcKind::Closure => "closure",
        ProcKind::Lambda => "lambda",
    };
    let names: Vec<&str> = p.params.iter().map(|pd| pd.name.as_str()).collect();
    format!("{}({}) {{...}}", head, names.join(", "))
}

pub fn to_term(handle: &ProcedureHandle) -> Term {
    let p = handle.borrow();
    let params_term = Term::compound("^params", p.params.iter().map(ParameterDescriptor::to_term).collect());
    let body_term = ast::block_to_term(&p.body);
    match p.kind {
        ProcKind::Closure => {
            let mut pairs: Vec<Term> = p
                .captured
                .iter()
                .map(|(id, v)| Term::compound("^binding", vec![Term::Str(id.as_str().to_string()), v.to_term()]))
                .collect();
            pairs.sort();
            Term::compound("^closure", vec![params_term, body_term, Term::compound("^captured", pairs)])
        }
        ProcKind::Plain | ProcKind::Lambda => Term::compound("^procedure", vec![params_term, body_term]),
    }
}

pub fn from_term_plain(children: &[Term]) -> Result<Value> {
    term::arity(children, 2, "^procedure")?;
    let params = parse_params_term(&children[0])?;
    let body = Rc::new(ast::block_from_term(&children[1])?);
    Ok(Value::Procedure(Rc::new(RefCell::new(ProcedureValue {
        kind: ProcKind::Plain,
        params,
        body,
        captured: HashMap::new(),
        bound_object: None,
    }))))
}

pub fn from_term_closure(children: &[Term]) -> Result<Value> {
    term::arity(children, 3, "^closure")?;
    let params = parse_params_term(&children[0])?;
    let body = Rc::new(ast::block_from_term(&children[1])?);
    let captured = parse_captured_term(&children[2])?;
    Ok(Value::Procedure(Rc::new(RefCell::new(ProcedureValue {
        kind: ProcKind::Closure,
        params,
        body,
        captured,
        bound_object: None,
    }))))
}

fn parse_params_term(t: &Term) -> Result<Vec<ParameterDescriptor>> {
    match t {
        Term::Compound(c) if c.tag == "^params" => {
            c.children.iter().map(ParameterDescriptor::from_term).collect()
        }
        other => Err(Error::TermConversion(format!("expected ^params term, got {}", other))),
    }
}

fn parse_captured_term(t: &Term) -> Result<HashMap<Identifier, Value>> {
    match t {
        Term::Compound(c) if c.tag == "^captured" => {
            let mut map = HashMap::with_capacity(c.children.len());
            for child in &c.children {
                match child {
                    Term::Compound(b) if b.tag == "^binding" => {
                        term::arity(&b.children, 2, "^binding")?;
                        let name = term::expect_str(&b.children[0], "^binding")?;
                        let value = Value::from_term(&b.children[1])?;
                        map.insert(Identifier::new(&name), value);
                    }
                    other => {
                        return Err(Error::TermConversion(format!(
                            "^captured expects ^binding children, got {}",
                            other
                        )))
                    }
                }
            }
            Ok(map)
        }
        other => Err(Error::TermConversion(format!("expected ^captured term, got {}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InterpreterConfig;

    fn counter_body() -> Block {
        vec![
            ast::Stmt::Assign(ast::Expr::Var(Identifier::new("n")), {
                ast::Expr::BinOp(
                    ast::BinOp::Add,
                    Box::new(ast::Expr::Var(Identifier::new("n"))),
                    Box::new(ast::Expr::Literal(Value::Int(1))),
                )
            }),
            ast::Stmt::Return(Some(ast::Expr::Var(Identifier::new("n")))),
        ]
    }

    #[test]
    fn two_counters_from_the_same_literal_are_independent() {
        let mut interp = Interpreter::new(InterpreterConfig::default());
        let defining_scope = interp.global_scope().new_child();
        defining_scope.define_local(Identifier::new("n"), Value::Int(0));
        let counter_a = make_closure(vec![], counter_body(), &defining_scope);

        defining_scope.store(&Identifier::new("n"), Value::Int(100)).unwrap();
        let counter_b = make_closure(vec![], counter_body(), &defining_scope);

        let a1 = call(&mut interp, &counter_a, vec![], &defining_scope).unwrap().result;
        let a2 = call(&mut interp, &counter_a, vec![], &defining_scope).unwrap().result;
        let b1 = call(&mut interp, &counter_b, vec![], &defining_scope).unwrap().result;

        assert!(matches!(a1, Value::Int(1)));
        assert!(matches!(a2, Value::Int(2)));
        assert!(matches!(b1, Value::Int(101)));
    }

    #[test]
    fn clone_deep_yields_independent_capture_state() {
        let mut interp = Interpreter::new(InterpreterConfig::default());
        let defining_scope = interp.global_scope().new_child();
        defining_scope.define_local(Identifier::new("n"), Value::Int(0));
        let original = make_closure(vec![], counter_body(), &defining_scope);
        let cloned = clone_deep(&original);

        call(&mut interp, &original, vec![], &defining_scope).unwrap();
        let cloned_result = call(&mut interp, &cloned, vec![], &defining_scope).unwrap().result;
        assert!(matches!(cloned_result, Value::Int(1)));
    }

    #[test]
    fn comparison_ignores_capture_state() {
        let mut interp = Interpreter::new(InterpreterConfig::default());
        let defining_scope = interp.global_scope().new_child();
        defining_scope.define_local(Identifier::new("n"), Value::Int(0));
        let a = make_closure(vec![], counter_body(), &defining_scope);
        let b = clone_deep(&a);
        call(&mut interp, &a, vec![], &defining_scope).unwrap();
        assert_eq!(compare_ignoring_capture(&a, &b), Ordering::Equal);
    }

    #[test]
    fn procedure_term_round_trips() {
        let proc = make_plain_procedure(
            vec![ParameterDescriptor::new(Identifier::new("x"), ParamMode::Value)],
            vec![ast::Stmt::Return(Some(ast::Expr::Var(Identifier::new("x"))))],
        );
        let term = to_term(&proc);
        let back = Value::from_term(&term).unwrap();
        assert!(matches!(back, Value::Procedure(_)));
    }
}

//! The minimal AST bundled with the core (SPEC_FULL.md §4.7).
//!
//! spec.md treats the full expression/statement AST as an external
//! collaborator; this module is the small, concrete slice of it the core
//! needs so that scope, closure, and term-conversion semantics are
//! actually exercisable and testable without a real front-end. Node
//! shapes follow the teacher's own `rustpython_parser::ast` usage in
//! `litter::eval` (a flat `Stmt`/`Expr` enum walked by a single
//! evaluator), just pared down to what this core's driver needs.

use std::fmt::Write as _;
use std::rc::Rc;

use crate::error::{Error, Result};
use crate::ident::Identifier;
use crate::param::ParameterDescriptor;
use crate::procedure::ProcKind;
use crate::term::{self, Term};
use crate::value::Value;

pub type Block = Vec<Stmt>;

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Neg,
    Not,
}

#[derive(Clone)]
pub enum Expr {
    Literal(Value),
    Var(Identifier),
    BinOp(BinOp, Box<Expr>, Box<Expr>),
    UnOp(UnOp, Box<Expr>),
    ListLit(Vec<Expr>),
    SetLit(Vec<Expr>),
    TupleLit(Vec<Expr>),
    MapLit(Vec<(Expr, Expr)>),
    Index(Box<Expr>, Box<Expr>),
    Call(Box<Expr>, Vec<Expr>),
    Member(Box<Expr>, Identifier),
    ProcLit {
        params: Vec<ParameterDescriptor>,
        body: Rc<Block>,
        kind: ProcKind,
    },
}

impl Expr {
    /// spec.md §6: "the minimum surface of ... `assign(scope, value)`".
    /// Only identifier and index targets are assignable; everything else
    /// is an `Undefined-operation`, which write-back entries treat as
    /// silently droppable (spec.md §4.4).
    pub fn is_assignable(&self) -> bool {
        matches!(self, Expr::Var(_) | Expr::Index(_, _))
    }

    pub fn append_string(&self, out: &mut String, tabs: usize) {
        match self {
            Expr::Literal(v) => {
                let _ = write!(out, "{}", v);
            }
            Expr::Var(id) => {
                let _ = write!(out, "{}", id);
            }
            Expr::BinOp(op, l, r) => {
                l.append_string(out, tabs);
                let _ = write!(out, " {} ", bin_op_str(*op));
                r.append_string(out, tabs);
            }
            Expr::UnOp(op, e) => {
                let _ = write!(out, "{}", if *op == UnOp::Neg { "-" } else { "!" });
                e.append_string(out, tabs);
            }
            Expr::ListLit(xs) => append_delimited(out, tabs, "[", xs, "]"),
            Expr::SetLit(xs) => append_delimited(out, tabs, "{", xs, "}"),
            Expr::TupleLit(xs) => append_delimited(out, tabs, "(", xs, ")"),
            Expr::MapLit(pairs) => {
                out.push('{');
                for (i, (k, v)) in pairs.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    k.append_string(out, tabs);
                    out.push_str(" |-> ");
                    v.append_string(out, tabs);
                }
                out.push('}');
            }
            Expr::Index(base, idx) => {
                base.append_string(out, tabs);
                out.push('(');
                idx.append_string(out, tabs);
                out.push(')');
            }
            Expr::Call(callee, args) => {
                callee.append_string(out, tabs);
                append_delimited(out, tabs, "(", args, ")");
            }
            Expr::Member(base, name) => {
                base.append_string(out, tabs);
                let _ = write!(out, ".{}", name);
            }
            Expr::ProcLit { params, kind, .. } => {
                let head = match kind {
                    ProcKind::Plain => "procedure",
                    ProcKind::Closure => "closure",
                    ProcKind::Lambda => "lambda",
                };
                let _ = write!(out, "{}(", head);
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    let _ = write!(out, "{}", p.name);
                }
                out.push_str(") {...}");
            }
        }
    }

    pub fn to_term(&self) -> Term {
        match self {
            Expr::Literal(v) => Term::compound("^lit", vec![v.to_term()]),
            Expr::Var(id) => Term::compound("^var", vec![Term::Str(id.as_str().to_string())]),
            Expr::BinOp(op, l, r) => {
                Term::compound("^binop", vec![Term::Str(bin_op_str(*op).to_string()), l.to_term(), r.to_term()])
            }
            Expr::UnOp(op, e) => Term::compound(
                "^unop",
                vec![
                    Term::Str(if *op == UnOp::Neg { "-" } else { "!" }.to_string()),
                    e.to_term(),
                ],
            ),
            Expr::ListLit(xs) => Term::compound("^list_lit", xs.iter().map(Expr::to_term).collect()),
            Expr::SetLit(xs) => Term::compound("^set_lit", xs.iter().map(Expr::to_term).collect()),
            Expr::TupleLit(xs) => Term::compound("^tuple_lit", xs.iter().map(Expr::to_term).collect()),
            Expr::MapLit(pairs) => Term::compound(
                "^map_lit",
                pairs
                    .iter()
                    .map(|(k, v)| Term::compound("^binding", vec![k.to_term(), v.to_term()]))
                    .collect(),
            ),
            Expr::Index(b, i) => Term::compound("^index", vec![b.to_term(), i.to_term()]),
            Expr::Call(callee, args) => {
                let mut children = vec![callee.to_term()];
                children.extend(args.iter().map(Expr::to_term));
                Term::compound("^call", children)
            }
            Expr::Member(b, name) => {
                Term::compound("^member", vec![b.to_term(), Term::Str(name.as_str().to_string())])
            }
            Expr::ProcLit { params, body, kind } => Term::compound(
                "^proclit",
                vec![
                    Term::compound(kind_tag(*kind), vec![]),
                    Term::compound("^params", params.iter().map(|p| p.to_term()).collect()),
                    block_to_term(body),
                ],
            ),
        }
    }

    pub fn from_term(t: &Term) -> Result<Expr> {
        let Term::Compound(c) = t else {
            return Err(Error::TermConversion("expected compound expression term".to_string()));
        };
        match c.tag.as_str() {
            "^lit" => {
                term::arity(&c.children, 1, "^lit")?;
                Ok(Expr::Literal(Value::from_term(&c.children[0])?))
            }
            "^var" => {
                term::arity(&c.children, 1, "^var")?;
                Ok(Expr::Var(Identifier::new(&term::expect_str(&c.children[0], "^var")?)))
            }
            "^binop" => {
                term::arity(&c.children, 3, "^binop")?;
                let op = bin_op_from_str(&term::expect_str(&c.children[0], "^binop")?)?;
                Ok(Expr::BinOp(
                    op,
                    Box::new(Expr::from_term(&c.children[1])?),
                    Box::new(Expr::from_term(&c.children[2])?),
                ))
            }
            "^unop" => {
                term::arity(&c.children, 2, "^unop")?;
                let sym = term::expect_str(&c.children[0], "^unop")?;
                let op = if sym == "-" { UnOp::Neg } else { UnOp::Not };
                Ok(Expr::UnOp(op, Box::new(Expr::from_term(&c.children[1])?)))
            }
            "^list_lit" => Ok(Expr::ListLit(children_exprs(&c.children)?)),
            "^set_lit" => Ok(Expr::SetLit(children_exprs(&c.children)?)),
            "^tuple_lit" => Ok(Expr::TupleLit(children_exprs(&c.children)?)),
            "^map_lit" => {
                let mut pairs = Vec::with_capacity(c.children.len());
                for child in &c.children {
                    let Term::Compound(b) = child else {
                        return Err(Error::TermConversion("^map_lit expects ^binding children".to_string()));
                    };
                    term::arity(&b.children, 2, "^binding")?;
                    pairs.push((Expr::from_term(&b.children[0])?, Expr::from_term(&b.children[1])?));
                }
                Ok(Expr::MapLit(pairs))
            }
            "^index" => {
                term::arity(&c.children, 2, "^index")?;
                Ok(Expr::Index(
                    Box::new(Expr::from_term(&c.children[0])?),
                    Box::new(Expr::from_term(&c.children[1])?),
                ))
            }
            "^call" => {
                if c.children.is_empty() {
                    return Err(Error::TermConversion("^call requires a callee child".to_string()));
                }
                let callee = Expr::from_term(&c.children[0])?;
                let args = children_exprs(&c.children[1..])?;
                Ok(Expr::Call(Box::new(callee), args))
            }
            "^member" => {
                term::arity(&c.children, 2, "^member")?;
                Ok(Expr::Member(
                    Box::new(Expr::from_term(&c.children[0])?),
                    Identifier::new(&term::expect_str(&c.children[1], "^member")?),
                ))
            }
            "^proclit" => {
                term::arity(&c.children, 3, "^proclit")?;
                let kind = kind_from_term(&c.children[0])?;
                let Term::Compound(params_term) = &c.children[1] else {
                    return Err(Error::TermConversion("^proclit expects ^params".to_string()));
                };
                let params = params_term
                    .children
                    .iter()
                    .map(ParameterDescriptor::from_term)
                    .collect::<Result<Vec<_>>>()?;
                let body = Rc::new(block_from_term(&c.children[2])?);
                Ok(Expr::ProcLit { params, body, kind })
            }
            other => Err(Error::TermConversion(format!("unrecognized expression tag '{}'", other))),
        }
    }
}

fn children_exprs(children: &[Term]) -> Result<Vec<Expr>> {
    children.iter().map(Expr::from_term).collect()
}

fn kind_tag(kind: ProcKind) -> &'static str {
    match kind {
        ProcKind::Plain => "^plain",
        ProcKind::Closure => "^closure_kind",
        ProcKind::Lambda => "^lambda",
    }
}

fn kind_from_term(t: &Term) -> Result<ProcKind> {
    match t.tag() {
        Some("^plain") => Ok(ProcKind::Plain),
        Some("^closure_kind") => Ok(ProcKind::Closure),
        Some("^lambda") => Ok(ProcKind::Lambda),
        _ => Err(Error::TermConversion("unrecognized procedure kind tag".to_string())),
    }
}

fn bin_op_str(op: BinOp) -> &'static str {
    match op {
        BinOp::Add => "+",
        BinOp::Sub => "-",
        BinOp::Mul => "*",
        BinOp::Div => "/",
        BinOp::Mod => "%",
        BinOp::Eq => "==",
        BinOp::Ne => "!=",
        BinOp::Lt => "<",
        BinOp::Le => "<=",
        BinOp::Gt => ">",
        BinOp::Ge => ">=",
        BinOp::And => "&&",
        BinOp::Or => "||",
    }
}

fn bin_op_from_str(s: &str) -> Result<BinOp> {
    Ok(match s {
        "+" => BinOp::Add,
        "-" => BinOp::Sub,
        "*" => BinOp::Mul,
        "/" => BinOp::Div,
        "%" => BinOp::Mod,
        "==" => BinOp::Eq,
        "!=" => BinOp::Ne,
        "<" => BinOp::Lt,
        "<=" => BinOp::Le,
        ">" => BinOp::Gt,
        ">=" => BinOp::Ge,
        "&&" => BinOp::And,
        "||" => BinOp::Or,
        other => return Err(Error::TermConversion(format!("unrecognized operator '{}'", other))),
    })
}

fn append_delimited(out: &mut String, tabs: usize, open: &str, items: &[Expr], close: &str) {
    out.push_str(open);
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        item.append_string(out, tabs);
    }
    out.push_str(close);
}

/// A statement in the bundled driver's AST.
#[derive(Clone)]
pub enum Stmt {
    ExprStmt(Expr),
    Assign(Expr, Expr),
    MakeGlobal(Identifier),
    If(Expr, Block, Block),
    While(Expr, Block),
    /// `for var in iterable { body }`, evaluated via an iterator child
    /// scope (spec.md §4.2).
    ForIter(Identifier, Expr, Block),
    ProcDef(Identifier, Expr),
    Return(Option<Expr>),
    Throw(Expr),
    TryCatch {
        body: Block,
        user_catch: Option<(Identifier, Block)>,
        lang_catch: Option<(Identifier, Block)>,
    },
    Break,
    Continue,
}

impl Stmt {
    pub fn append_string(&self, out: &mut String, tabs: usize) {
        let indent = "    ".repeat(tabs);
        out.push_str(&indent);
        match self {
            Stmt::ExprStmt(e) => e.append_string(out, tabs),
            Stmt::Assign(t, v) => {
                t.append_string(out, tabs);
                out.push_str(" := ");
                v.append_string(out, tabs);
            }
            Stmt::MakeGlobal(id) => {
                let _ = write!(out, "make_global({})", id);
            }
            Stmt::If(cond, _, _) => {
                out.push_str("if (");
                cond.append_string(out, tabs);
                out.push_str(") {...}");
            }
            Stmt::While(cond, _) => {
                out.push_str("while (");
                cond.append_string(out, tabs);
                out.push_str(") {...}");
            }
            Stmt::ForIter(var, iter, _) => {
                let _ = write!(out, "for ({} in ", var);
                iter.append_string(out, tabs);
                out.push_str(") {...}");
            }
            Stmt::ProcDef(name, _) => {
                let _ = write!(out, "{} := procedure(...) {{...}}", name);
            }
            Stmt::Return(Some(e)) => {
                out.push_str("return ");
                e.append_string(out, tabs);
            }
            Stmt::Return(None) => out.push_str("return"),
            Stmt::Throw(e) => {
                out.push_str("throw(");
                e.append_string(out, tabs);
                out.push(')');
            }
            Stmt::TryCatch { .. } => out.push_str("try {...} catchUsr(e) {...} catchLng(e) {...}"),
            Stmt::Break => out.push_str("break"),
            Stmt::Continue => out.push_str("continue"),
        }
    }

    pub fn to_term(&self) -> Term {
        match self {
            Stmt::ExprStmt(e) => Term::compound("^expr_stmt", vec![e.to_term()]),
            Stmt::Assign(t, v) => Term::compound("^assign", vec![t.to_term(), v.to_term()]),
            Stmt::MakeGlobal(id) => {
                Term::compound("^make_global", vec![Term::Str(id.as_str().to_string())])
            }
            Stmt::If(cond, then_b, else_b) => Term::compound(
                "^if",
                vec![cond.to_term(), block_to_term(then_b), block_to_term(else_b)],
            ),
            Stmt::While(cond, body) => Term::compound("^while", vec![cond.to_term(), block_to_term(body)]),
            Stmt::ForIter(var, iter, body) => Term::compound(
                "^for",
                vec![Term::Str(var.as_str().to_string()), iter.to_term(), block_to_term(body)],
            ),
            Stmt::ProcDef(name, lit) => {
                Term::compound("^procdef", vec![Term::Str(name.as_str().to_string()), lit.to_term()])
            }
            Stmt::Return(Some(e)) => Term::compound("^return", vec![e.to_term()]),
            Stmt::Return(None) => Term::compound("^return", vec![]),
            Stmt::Throw(e) => Term::compound("^throw", vec![e.to_term()]),
            Stmt::TryCatch {
                body,
                user_catch,
                lang_catch,
            } => {
                let user = catch_to_term(user_catch);
                let lang = catch_to_term(lang_catch);
                Term::compound("^try", vec![block_to_term(body), user, lang])
            }
            Stmt::Break => Term::compound("^break", vec![]),
            Stmt::Continue => Term::compound("^continue", vec![]),
        }
    }

    pub fn from_term(t: &Term) -> Result<Stmt> {
        let Term::Compound(c) = t else {
            return Err(Error::TermConversion("expected compound statement term".to_string()));
        };
        match c.tag.as_str() {
            "^expr_stmt" => {
                term::arity(&c.children, 1, "^expr_stmt")?;
                Ok(Stmt::ExprStmt(Expr::from_term(&c.children[0])?))
            }
            "^assign" => {
                term::arity(&c.children, 2, "^assign")?;
                Ok(Stmt::Assign(Expr::from_term(&c.children[0])?, Expr::from_term(&c.children[1])?))
            }
            "^make_global" => {
                term::arity(&c.children, 1, "^make_global")?;
                Ok(Stmt::MakeGlobal(Identifier::new(&term::expect_str(&c.children[0], "^make_global")?)))
            }
            "^if" => {
                term::arity(&c.children, 3, "^if")?;
                Ok(Stmt::If(
                    Expr::from_term(&c.children[0])?,
                    block_from_term(&c.children[1])?,
                    block_from_term(&c.children[2])?,
                ))
            }
            "^while" => {
                term::arity(&c.children, 2, "^while")?;
                Ok(Stmt::While(Expr::from_term(&c.children[0])?, block_from_term(&c.children[1])?))
            }
            "^for" => {
                term::arity(&c.children, 3, "^for")?;
                Ok(Stmt::ForIter(
                    Identifier::new(&term::expect_str(&c.children[0], "^for")?),
                    Expr::from_term(&c.children[1])?,
                    block_from_term(&c.children[2])?,
                ))
            }
            "^procdef" => {
                term::arity(&c.children, 2, "^procdef")?;
                Ok(Stmt::ProcDef(
                    Identifier::new(&term::expect_str(&c.children[0], "^procdef")?),
                    Expr::from_term(&c.children[1])?,
                ))
            }
            "^return" => match c.children.len() {
                0 => Ok(Stmt::Return(None)),
                1 => Ok(Stmt::Return(Some(Expr::from_term(&c.children[0])?))),
                _ => Err(Error::TermConversion("^return takes 0 or 1 children".to_string())),
            },
            "^throw" => {
                term::arity(&c.children, 1, "^throw")?;
                Ok(Stmt::Throw(Expr::from_term(&c.children[0])?))
            }
            "^try" => {
                term::arity(&c.children, 3, "^try")?;
                Ok(Stmt::TryCatch {
                    body: block_from_term(&c.children[0])?,
                    user_catch: catch_from_term(&c.children[1])?,
                    lang_catch: catch_from_term(&c.children[2])?,
                })
            }
            "^break" => Ok(Stmt::Break),
            "^continue" => Ok(Stmt::Continue),
            other => Err(Error::TermConversion(format!("unrecognized statement tag '{}'", other))),
        }
    }
}

fn catch_to_term(catch: &Option<(Identifier, Block)>) -> Term {
    match catch {
        Some((id, body)) => {
            Term::compound("^catch_some", vec![Term::Str(id.as_str().to_string()), block_to_term(body)])
        }
        None => Term::compound("^catch_none", vec![]),
    }
}

fn catch_from_term(t: &Term) -> Result<Option<(Identifier, Block)>> {
    match t.tag() {
        Some("^catch_none") => Ok(None),
        Some("^catch_some") => {
            let Term::Compound(c) = t else { unreachable!() };
            term::arity(&c.children, 2, "^catch_some")?;
            Ok(Some((
                Identifier::new(&term::expect_str(&c.children[0], "^catch_some")?),
                block_from_term(&c.children[1])?,
            )))
        }
        _ => Err(Error::TermConversion("unrecognized catch-clause tag".to_string())),
    }
}

pub fn block_to_term(block: &Block) -> Term {
    Term::compound("^block", block.iter().map(Stmt::to_term).collect())
}

pub fn block_from_term(t: &Term) -> Result<Block> {
    let Term::Compound(c) = t else {
        return Err(Error::TermConversion("expected ^block term".to_string()));
    };
    if c.tag != "^block" {
        return Err(Error::TermConversion(format!("expected ^block, got {}", c.tag)));
    }
    c.children.iter().map(Stmt::from_term).collect()
}

pub fn block_display(block: &Block) -> String {
    let mut out = String::new();
    for stmt in block {
        stmt.append_string(&mut out, 0);
        out.push('\n');
    }
    out
}

/// spec.md §4.3.1: classifies every identifier mentioned in `body` into
/// `bound` (defined within the body), `unbound` (referenced but not
/// bound), and `used` (referenced and visible in an enclosing bound
/// scope — here approximated as "referenced and already bound at the
/// point of use", which is what a single linear walk can determine
/// without a full definite-assignment analysis).
pub fn collect_variables(
    block: &Block,
    bound: &mut std::collections::HashSet<Identifier>,
    unbound: &mut std::collections::HashSet<Identifier>,
    used: &mut std::collections::HashSet<Identifier>,
) {
    for stmt in block {
        collect_stmt(stmt, bound, unbound, used);
    }
}

fn collect_stmt(
    stmt: &Stmt,
    bound: &mut std::collections::HashSet<Identifier>,
    unbound: &mut std::collections::HashSet<Identifier>,
    used: &mut std::collections::HashSet<Identifier>,
) {
    match stmt {
        Stmt::ExprStmt(e) | Stmt::Throw(e) => collect_expr(e, bound, unbound, used),
        Stmt::Assign(target, value) => {
            collect_expr(value, bound, unbound, used);
            if let Expr::Var(id) = target {
                bound.insert(id.clone());
            } else {
                collect_expr(target, bound, unbound, used);
            }
        }
        Stmt::MakeGlobal(id) => {
            bound.insert(id.clone());
        }
        Stmt::If(cond, then_b, else_b) => {
            collect_expr(cond, bound, unbound, used);
            collect_variables(then_b, bound, unbound, used);
            collect_variables(else_b, bound, unbound, used);
        }
        Stmt::While(cond, body) => {
            collect_expr(cond, bound, unbound, used);
            collect_variables(body, bound, unbound, used);
        }
        Stmt::ForIter(var, iter, body) => {
            collect_expr(iter, bound, unbound, used);
            bound.insert(var.clone());
            collect_variables(body, bound, unbound, used);
        }
        Stmt::ProcDef(name, lit) => {
            bound.insert(name.clone());
            collect_expr(lit, bound, unbound, used);
        }
        Stmt::Return(Some(e)) => collect_expr(e, bound, unbound, used),
        Stmt::Return(None) | Stmt::Break | Stmt::Continue => {}
        Stmt::TryCatch {
            body,
            user_catch,
            lang_catch,
        } => {
            collect_variables(body, bound, unbound, used);
            for catch in [user_catch, lang_catch].into_iter().flatten() {
                bound.insert(catch.0.clone());
                collect_variables(&catch.1, bound, unbound, used);
            }
        }
    }
}

fn collect_expr(
    expr: &Expr,
    bound: &std::collections::HashSet<Identifier>,
    unbound: &mut std::collections::HashSet<Identifier>,
    used: &mut std::collections::HashSet<Identifier>,
) {
    match expr {
        Expr::Literal(_) => {}
        Expr::Var(id) => {
            if bound.contains(id) {
                used.insert(id.clone());
            } else {
                unbound.insert(id.clone());
            }
        }
        Expr::BinOp(_, l, r) => {
            collect_expr(l, bound, unbound, used);
            collect_expr(r, bound, unbound, used);
        }
        Expr::UnOp(_, e) => collect_expr(e, bound, unbound, used),
        Expr::ListLit(xs) | Expr::SetLit(xs) | Expr::TupleLit(xs) => {
            for x in xs {
                collect_expr(x, bound, unbound, used);
            }
        }
        Expr::MapLit(pairs) => {
            for (k, v) in pairs {
                collect_expr(k, bound, unbound, used);
                collect_expr(v, bound, unbound, used);
            }
        }
        Expr::Index(b, i) => {
            collect_expr(b, bound, unbound, used);
            collect_expr(i, bound, unbound, used);
        }
        Expr::Call(callee, args) => {
            collect_expr(callee, bound, unbound, used);
            for a in args {
                collect_expr(a, bound, unbound, used);
            }
        }
        Expr::Member(b, _) => collect_expr(b, bound, unbound, used),
        Expr::ProcLit { body, params, .. } => {
            // A nested procedure literal's own parameters and locals are
            // not free variables of the surrounding construct; only
            // names it references without binding are (spec.md §4.3.1).
            let mut inner_bound: std::collections::HashSet<Identifier> =
                params.iter().map(|p| p.name.clone()).collect();
            let mut inner_unbound = std::collections::HashSet::new();
            let mut inner_used = std::collections::HashSet::new();
            collect_variables(body, &mut inner_bound, &mut inner_unbound, &mut inner_used);
            for id in inner_unbound {
                if bound.contains(&id) {
                    used.insert(id);
                } else {
                    unbound.insert(id);
                }
            }
        }
    }
}

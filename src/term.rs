//! Term conversion (spec.md §4.5) and the term wire format (spec.md §6).
//!
//! Every value has a canonical prefix-form term: `tag(child₁,…,childₖ)`
//! for compounds, or a bare literal for atoms. `tag` is the value's
//! *functional character* — a stable string uniquely identifying its
//! variant. A process-wide registry maps functional character back to a
//! constructor, the one piece of state spec.md §5 requires to be
//! cross-thread and mutex-guarded.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, OnceLock};

use crate::error::{Error, Result};
use crate::value::{Rational, Value};

/// A compound term: a functional character plus its children.
#[derive(Debug, Clone)]
pub struct CompoundTerm {
    pub tag: String,
    pub children: Vec<Term>,
}

/// The canonical symbolic term form (spec.md §4.5).
#[derive(Debug, Clone)]
pub enum Term {
    Bool(bool),
    Int(i64),
    Real(f64),
    Str(String),
    Compound(CompoundTerm),
}

impl Term {
    pub fn compound(tag: impl Into<String>, children: Vec<Term>) -> Term {
        Term::Compound(CompoundTerm {
            tag: tag.into(),
            children,
        })
    }

    pub fn tag(&self) -> Option<&str> {
        match self {
            Term::Compound(c) => Some(&c.tag),
            _ => None,
        }
    }
}

fn term_rank(t: &Term) -> u8 {
    match t {
        Term::Bool(_) => 0,
        Term::Int(_) => 1,
        Term::Real(_) => 2,
        Term::Str(_) => 3,
        Term::Compound(_) => 4,
    }
}

impl PartialEq for Term {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for Term {}

impl PartialOrd for Term {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Term {
    fn cmp(&self, other: &Self) -> Ordering {
        let rank = term_rank(self).cmp(&term_rank(other));
        if rank != Ordering::Equal {
            return rank;
        }
        match (self, other) {
            (Term::Bool(a), Term::Bool(b)) => a.cmp(b),
            (Term::Int(a), Term::Int(b)) => a.cmp(b),
            (Term::Real(a), Term::Real(b)) => a.total_cmp(b),
            (Term::Str(a), Term::Str(b)) => a.cmp(b),
            (Term::Compound(a), Term::Compound(b)) => {
                let by_tag = a.tag.cmp(&b.tag);
                if by_tag != Ordering::Equal {
                    return by_tag;
                }
                let by_len = a.children.len().cmp(&b.children.len());
                if by_len != Ordering::Equal {
                    return by_len;
                }
                for (x, y) in a.children.iter().zip(b.children.iter()) {
                    let c = x.cmp(y);
                    if c != Ordering::Equal {
                        return c;
                    }
                }
                Ordering::Equal
            }
            _ => unreachable!("term_rank partitioned differing variants above"),
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Bool(b) => write!(f, "{}", b),
            Term::Int(i) => write!(f, "{}", i),
            Term::Real(x) => write!(f, "{}", x),
            Term::Str(s) => write!(f, "{:?}", s),
            Term::Compound(c) => {
                write!(f, "{}(", c.tag)?;
                for (i, child) in c.children.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", child)?;
                }
                write!(f, ")")
            }
        }
    }
}

// ---------------------------------------------------------------------
// Value <-> Term
// ---------------------------------------------------------------------

pub(crate) fn value_to_term(value: &Value) -> Term {
    match value {
        Value::Omega => Term::compound("^omega", vec![]),
        Value::Bool(b) => Term::Bool(*b),
        Value::Int(i) => Term::Int(*i),
        Value::Rational(r) => Term::compound("^rational", vec![Term::Int(r.num), Term::Int(r.den)]),
        Value::Real(x) => Term::Real(*x),
        Value::Str(s) => Term::Str(s.clone()),
        Value::List(xs) => Term::compound("^list", xs.iter().map(value_to_term).collect()),
        Value::Set(xs) => Term::compound("^set", xs.iter().map(value_to_term).collect()),
        Value::Tuple(xs) => Term::compound("^tuple", xs.iter().map(value_to_term).collect()),
        Value::Map(pairs) => Term::compound(
            "^map",
            pairs
                .iter()
                .map(|(k, v)| Term::compound("^binding", vec![value_to_term(k), value_to_term(v)]))
                .collect(),
        ),
        Value::Term(t) => t.clone(),
        Value::Procedure(p) => crate::procedure::to_term(p),
        Value::Scope(s) => s.to_term(),
        Value::Object(handle) => {
            let obj = handle.borrow();
            let mut members: Vec<_> = obj.members.iter().collect();
            members.sort_by(|a, b| a.0.cmp(b.0));
            let member_terms = members
                .into_iter()
                .map(|(k, v)| Term::compound("^member", vec![Term::Str(k.as_str().to_string()), value_to_term(v)]))
                .collect();
            Term::compound(
                "^object",
                vec![Term::Str(obj.class_name.clone()), Term::compound("^members", member_terms)],
            )
        }
    }
}

pub(crate) fn term_to_value(term: &Term) -> Result<Value> {
    match term {
        Term::Bool(b) => Ok(Value::Bool(*b)),
        Term::Int(i) => Ok(Value::Int(*i)),
        Term::Real(x) => Ok(Value::Real(*x)),
        Term::Str(s) => Ok(Value::Str(s.clone())),
        Term::Compound(c) => {
            let registry = registry();
            let guard = registry.lock().expect("term registry mutex poisoned");
            match guard.get(c.tag.as_str()) {
                Some(ctor) => ctor(&c.children),
                None => Err(Error::TermConversion(format!(
                    "no registered variant for functional character '{}'",
                    c.tag
                ))),
            }
        }
    }
}

type Constructor = fn(&[Term]) -> Result<Value>;

fn registry() -> &'static Mutex<HashMap<&'static str, Constructor>> {
    static REGISTRY: OnceLock<Mutex<HashMap<&'static str, Constructor>>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let mut map: HashMap<&'static str, Constructor> = HashMap::new();
        map.insert("^omega", ctor_omega);
        map.insert("^rational", ctor_rational);
        map.insert("^list", ctor_list);
        map.insert("^set", ctor_set);
        map.insert("^tuple", ctor_tuple);
        map.insert("^map", ctor_map);
        map.insert("^procedure", crate::procedure::from_term_plain);
        map.insert("^closure", crate::procedure::from_term_closure);
        map.insert("^object", ctor_object);
        Mutex::new(map)
    })
}

fn ctor_omega(children: &[Term]) -> Result<Value> {
    arity(children, 0, "^omega")?;
    Ok(Value::Omega)
}

fn ctor_rational(children: &[Term]) -> Result<Value> {
    arity(children, 2, "^rational")?;
    let num = expect_int(&children[0], "^rational")?;
    let den = expect_int(&children[1], "^rational")?;
    if den == 0 {
        return Err(Error::TermConversion("^rational with zero denominator".to_string()));
    }
    Ok(Value::Rational(Rational::new(num, den)))
}

fn ctor_list(children: &[Term]) -> Result<Value> {
    Ok(Value::List(map_children(children)?))
}

fn ctor_set(children: &[Term]) -> Result<Value> {
    Ok(crate::value::set_from_values(map_children(children)?))
}

fn ctor_tuple(children: &[Term]) -> Result<Value> {
    Ok(Value::Tuple(map_children(children)?))
}

fn ctor_map(children: &[Term]) -> Result<Value> {
    let mut pairs = Vec::with_capacity(children.len());
    for child in children {
        match child {
            Term::Compound(c) if c.tag == "^binding" => {
                arity(&c.children, 2, "^binding")?;
                pairs.push((term_to_value(&c.children[0])?, term_to_value(&c.children[1])?));
            }
            other => {
                return Err(Error::TermConversion(format!(
                    "^map expects ^binding children, got {}",
                    other
                )))
            }
        }
    }
    Ok(crate::value::map_from_pairs(pairs))
}

fn ctor_object(children: &[Term]) -> Result<Value> {
    arity(children, 2, "^object")?;
    let class_name = expect_str(&children[0], "^object")?;
    let Term::Compound(members_term) = &children[1] else {
        return Err(Error::TermConversion("^object expects a ^members compound".to_string()));
    };
    if members_term.tag != "^members" {
        return Err(Error::TermConversion(format!("^object expects ^members, got {}", members_term.tag)));
    }
    let mut members = std::collections::HashMap::new();
    for child in &members_term.children {
        let Term::Compound(m) = child else {
            return Err(Error::TermConversion("^members expects ^member children".to_string()));
        };
        arity(&m.children, 2, "^member")?;
        let name = expect_str(&m.children[0], "^member")?;
        let value = term_to_value(&m.children[1])?;
        members.insert(crate::ident::Identifier::new(&name), value);
    }
    Ok(Value::Object(std::rc::Rc::new(std::cell::RefCell::new(crate::object::ObjectValue {
        class_name,
        members,
    }))))
}

fn map_children(children: &[Term]) -> Result<Vec<Value>> {
    children.iter().map(term_to_value).collect()
}

pub(crate) fn arity(children: &[Term], expected: usize, tag: &str) -> Result<()> {
    if children.len() != expected {
        return Err(Error::TermConversion(format!(
            "{} expects {} children, got {}",
            tag,
            expected,
            children.len()
        )));
    }
    Ok(())
}

pub(crate) fn expect_int(term: &Term, context: &str) -> Result<i64> {
    match term {
        Term::Int(i) => Ok(*i),
        other => Err(Error::TermConversion(format!(
            "{} expects an integer child, got {}",
            context, other
        ))),
    }
}

pub(crate) fn expect_str(term: &Term, context: &str) -> Result<String> {
    match term {
        Term::Str(s) => Ok(s.clone()),
        other => Err(Error::TermConversion(format!(
            "{} expects a string child, got {}",
            context, other
        ))),
    }
}

// ---------------------------------------------------------------------
// Wire-format reader: `tag(child, child, ...)` back into a `Term`.
// ---------------------------------------------------------------------

/// Parses the textual wire format of spec.md §6 (`tag(child₁,…,childₖ)`,
/// atomic literals as leaves) into a `Term`.
pub fn parse_term(input: &str) -> Result<Term> {
    let mut chars = input.trim().char_indices().peekable();
    let term = parse_term_at(input, &mut chars)?;
    skip_ws(&mut chars);
    if chars.peek().is_some() {
        return Err(Error::TermConversion("trailing input after term".to_string()));
    }
    Ok(term)
}

type CharIter<'a> = std::iter::Peekable<std::str::CharIndices<'a>>;

fn skip_ws(chars: &mut CharIter) {
    while let Some(&(_, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else {
            break;
        }
    }
}

fn parse_term_at(src: &str, chars: &mut CharIter) -> Result<Term> {
    skip_ws(chars);
    match chars.peek().copied() {
        Some((_, '"')) => parse_string(src, chars),
        Some((_, c)) if c == '-' || c.is_ascii_digit() => parse_number(src, chars),
        Some((_, c)) if c == '^' || c.is_alphabetic() || c == '_' => parse_tag_or_bool(src, chars),
        _ => Err(Error::TermConversion("unexpected end of term".to_string())),
    }
}

fn parse_string(src: &str, chars: &mut CharIter) -> Result<Term> {
    let (start, _) = chars.next().unwrap(); // consume opening quote
    let mut out = String::new();
    loop {
        match chars.next() {
            Some((_, '"')) => return Ok(Term::Str(out)),
            Some((_, '\\')) => match chars.next() {
                Some((_, 'n')) => out.push('\n'),
                Some((_, 't')) => out.push('\t'),
                Some((_, c)) => out.push(c),
                None => return Err(Error::TermConversion("unterminated escape".to_string())),
            },
            Some((_, c)) => out.push(c),
            None => {
                let _ = start;
                let _ = src;
                return Err(Error::TermConversion("unterminated string literal".to_string()));
            }
        }
    }
}

fn parse_number(src: &str, chars: &mut CharIter) -> Result<Term> {
    let (start, _) = chars.next().unwrap();
    let mut end = start + 1;
    let mut is_real = false;
    while let Some(&(i, c)) = chars.peek() {
        if c.is_ascii_digit() {
            end = i + 1;
            chars.next();
        } else if c == '.' && !is_real {
            is_real = true;
            end = i + 1;
            chars.next();
        } else {
            break;
        }
    }
    let text = &src[start..end];
    if is_real {
        text.parse::<f64>()
            .map(Term::Real)
            .map_err(|_| Error::TermConversion(format!("invalid real literal '{}'", text)))
    } else {
        text.parse::<i64>()
            .map(Term::Int)
            .map_err(|_| Error::TermConversion(format!("invalid integer literal '{}'", text)))
    }
}

fn parse_tag_or_bool(src: &str, chars: &mut CharIter) -> Result<Term> {
    let (start, _) = chars.next().unwrap();
    let mut end = start + 1;
    while let Some(&(i, c)) = chars.peek() {
        if c.is_alphanumeric() || c == '_' {
            end = i + 1;
            chars.next();
        } else {
            break;
        }
    }
    let tag = &src[start..end];
    if tag == "true" {
        return Ok(Term::Bool(true));
    }
    if tag == "false" {
        return Ok(Term::Bool(false));
    }
    skip_ws(chars);
    match chars.peek() {
        Some(&(_, '(')) => {
            chars.next();
            let mut children = Vec::new();
            skip_ws(chars);
            if let Some(&(_, ')')) = chars.peek() {
                chars.next();
                return Ok(Term::compound(tag, children));
            }
            loop {
                children.push(parse_term_at(src, chars)?);
                skip_ws(chars);
                match chars.next() {
                    Some((_, ',')) => continue,
                    Some((_, ')')) => break,
                    _ => {
                        return Err(Error::TermConversion(format!(
                            "expected ',' or ')' in '{}(...)'",
                            tag
                        )))
                    }
                }
            }
            Ok(Term::compound(tag, children))
        }
        _ => Ok(Term::compound(tag, vec![])),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_omega() {
        let term = value_to_term(&Value::Omega);
        let back = term_to_value(&term).unwrap();
        assert!(back.equal_structural(&Value::Omega));
    }

    #[test]
    fn round_trips_nested_list() {
        let v = Value::List(vec![Value::Int(1), Value::Str("x".to_string())]);
        let term = value_to_term(&v);
        let back = term_to_value(&term).unwrap();
        assert!(back.equal_structural(&v));
    }

    #[test]
    fn parses_wire_format_round_trip() {
        let v = Value::List(vec![Value::Int(1), Value::Bool(true)]);
        let text = value_to_term(&v).to_string();
        let parsed = parse_term(&text).unwrap();
        let back = term_to_value(&parsed).unwrap();
        assert!(back.equal_structural(&v));
    }

    #[test]
    fn malformed_term_is_a_conversion_error() {
        let bad = Term::compound("^rational", vec![Term::Int(1)]);
        let err = term_to_value(&bad).unwrap_err();
        assert!(matches!(err, Error::TermConversion(_)));
    }

    #[test]
    fn unknown_functional_character_is_a_conversion_error() {
        let bad = Term::compound("^not_a_real_variant", vec![]);
        assert!(term_to_value(&bad).is_err());
    }

    #[test]
    fn round_trips_object_class_and_members() {
        let handle = crate::object::ObjectValue::new("Point");
        handle.borrow_mut().members.insert(crate::ident::Identifier::new("x"), Value::Int(1));
        handle.borrow_mut().members.insert(crate::ident::Identifier::new("y"), Value::Int(2));
        let v = Value::Object(handle);

        let term = value_to_term(&v);
        let back = term_to_value(&term).unwrap();
        assert!(back.equal_structural(&v));
        match back {
            Value::Object(h) => assert_eq!(h.borrow().class_name, "Point"),
            other => panic!("expected an object, got {}", other),
        }
    }
}

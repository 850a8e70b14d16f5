//! The runtime value model (spec.md §3, §2 item 1).
//!
//! Shaped the way the teacher's `PyValue` is shaped — a flat `enum` with a
//! `type_name`, a truthiness predicate, and a `Display` impl that quotes
//! strings (mirroring `litter::value::PyValue`) — but widened to the sum
//! spec.md §3 requires: atoms, containers, a symbolic term, a procedure, a
//! live-scope handle, and an object.

use std::cmp::Ordering;
use std::fmt;

use crate::ident::Identifier;
use crate::object::ObjectHandle;
use crate::procedure::ProcedureHandle;
use crate::scope::Scope;
use crate::term::Term;

/// A rational number in lowest terms, with a positive denominator.
///
/// spec.md leaves the representation of rationals unspecified; a pair of
/// `i64`s is used rather than a bignum type because every other numeric
/// variant in the teacher's value model (`PyValue::Int(i64)`,
/// `PyValue::Float(f64)`) is a plain machine type, not an arbitrary
/// precision one.
#[derive(Debug, Clone, Copy)]
pub struct Rational {
    pub num: i64,
    pub den: i64,
}

impl Rational {
    pub fn new(num: i64, den: i64) -> Self {
        assert!(den != 0, "rational denominator must not be zero");
        let sign = if den < 0 { -1 } else { 1 };
        let (num, den) = (num * sign, den * sign);
        let g = gcd(num.unsigned_abs(), den.unsigned_abs()).max(1);
        Rational {
            num: num / g as i64,
            den: den / g as i64,
        }
    }

    pub fn as_f64(&self) -> f64 {
        self.num as f64 / self.den as f64
    }
}

fn gcd(a: u64, b: u64) -> u64 {
    if b == 0 { a.max(1) } else { gcd(b, a % b) }
}

impl PartialEq for Rational {
    fn eq(&self, other: &Self) -> bool {
        self.num as i128 * other.den as i128 == other.num as i128 * self.den as i128
    }
}
impl Eq for Rational {}

impl PartialOrd for Rational {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Rational {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.num as i128 * other.den as i128).cmp(&(other.num as i128 * self.den as i128))
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

/// The runtime value sum type (spec.md §3).
#[derive(Clone)]
pub enum Value {
    /// The distinguished absent value, `omega`.
    Omega,
    Bool(bool),
    Int(i64),
    Rational(Rational),
    Real(f64),
    Str(String),
    List(Vec<Value>),
    /// Kept sorted and deduplicated by `compare_total`; see
    /// [`set_from_values`].
    Set(Vec<Value>),
    Tuple(Vec<Value>),
    /// Kept sorted by key via `compare_total`; see [`map_from_pairs`].
    Map(Vec<(Value, Value)>),
    Term(Term),
    Procedure(ProcedureHandle),
    Scope(Scope),
    Object(ObjectHandle),
}

/// Fixed total order over variants, used by `compare_total` when comparing
/// values of differing variants (spec.md §3's "per-variant ordering rank",
/// left unnamed by the spec — this is an arbitrary but fixed choice,
/// documented in DESIGN.md).
fn variant_rank(v: &Value) -> u8 {
    match v {
        Value::Omega => 0,
        Value::Bool(_) => 1,
        Value::Int(_) => 2,
        Value::Rational(_) => 3,
        Value::Real(_) => 4,
        Value::Str(_) => 5,
        Value::List(_) => 6,
        Value::Set(_) => 7,
        Value::Tuple(_) => 8,
        Value::Map(_) => 9,
        Value::Term(_) => 10,
        Value::Procedure(_) => 11,
        Value::Scope(_) => 12,
        Value::Object(_) => 13,
    }
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Omega => "omega",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Rational(_) => "rational",
            Value::Real(_) => "real",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Set(_) => "set",
            Value::Tuple(_) => "tuple",
            Value::Map(_) => "map",
            Value::Term(_) => "term",
            Value::Procedure(_) => "procedure",
            Value::Scope(_) => "scope",
            Value::Object(_) => "object",
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Omega => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Rational(r) => r.num != 0,
            Value::Real(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(xs) | Value::Set(xs) | Value::Tuple(xs) => !xs.is_empty(),
            Value::Map(m) => !m.is_empty(),
            _ => true,
        }
    }

    /// Container size. Fails with `IncompatibleType` for atoms, per
    /// spec.md §3.
    pub fn size(&self) -> crate::error::Result<usize> {
        use crate::error::Error;
        match self {
            Value::Str(s) => Ok(s.chars().count()),
            Value::List(xs) | Value::Set(xs) | Value::Tuple(xs) => Ok(xs.len()),
            Value::Map(m) => Ok(m.len()),
            other => Err(Error::IncompatibleType {
                operation: "size".to_string(),
                got: other.type_name(),
            }),
        }
    }

    /// Removes and returns the first element of a list/set/tuple, or the
    /// first character of a string. Containers only, per spec.md §3.
    pub fn remove_first(&mut self) -> crate::error::Result<Value> {
        use crate::error::Error;
        match self {
            Value::List(xs) | Value::Set(xs) => {
                if xs.is_empty() {
                    return Err(Error::UndefinedOperation(
                        "remove_first on an empty container".to_string(),
                    ));
                }
                Ok(xs.remove(0))
            }
            Value::Str(s) => {
                let mut chars = s.chars();
                let first = chars.next().ok_or_else(|| {
                    Error::UndefinedOperation("remove_first on an empty string".to_string())
                })?;
                *s = chars.collect();
                Ok(Value::Str(first.to_string()))
            }
            other => Err(Error::IncompatibleType {
                operation: "remove_first".to_string(),
                got: other.type_name(),
            }),
        }
    }

    /// Removes and returns the last element of a list/set/tuple, or the
    /// last character of a string. Containers only, per spec.md §3.
    pub fn remove_last(&mut self) -> crate::error::Result<Value> {
        use crate::error::Error;
        match self {
            Value::List(xs) | Value::Set(xs) => xs.pop().ok_or_else(|| {
                Error::UndefinedOperation("remove_last on an empty container".to_string())
            }),
            Value::Str(s) => {
                let last = s.pop().ok_or_else(|| {
                    Error::UndefinedOperation("remove_last on an empty string".to_string())
                })?;
                Ok(Value::Str(last.to_string()))
            }
            other => Err(Error::IncompatibleType {
                operation: "remove_last".to_string(),
                got: other.type_name(),
            }),
        }
    }

    /// A deep, independently-owned copy. Procedures deep-clone including
    /// their closure's captured map (spec.md §4.3.3); live scopes are
    /// shared handles and are not meaningfully "deep" cloned (cloning a
    /// live-scope value clones the handle, not the frame chain — the
    /// chain is owned by the running calls that hold it, per spec.md §9).
    pub fn clone_deep(&self) -> Value {
        match self {
            Value::List(xs) => Value::List(xs.iter().map(Value::clone_deep).collect()),
            Value::Set(xs) => Value::Set(xs.iter().map(Value::clone_deep).collect()),
            Value::Tuple(xs) => Value::Tuple(xs.iter().map(Value::clone_deep).collect()),
            Value::Map(m) => Value::Map(
                m.iter()
                    .map(|(k, v)| (k.clone_deep(), v.clone_deep()))
                    .collect(),
            ),
            Value::Procedure(p) => Value::Procedure(crate::procedure::clone_deep(p)),
            Value::Object(o) => Value::Object(crate::object::clone_deep(o)),
            other => other.clone(),
        }
    }

    /// Structural equality, ignoring a procedure's `captured` map and
    /// `bound_object` (spec.md §4.3.4).
    pub fn equal_structural(&self, other: &Value) -> bool {
        self.compare_total(other) == Ordering::Equal
    }

    /// Total, deterministic ordering (spec.md §3, §8).
    pub fn compare_total(&self, other: &Value) -> Ordering {
        let rank = variant_rank(self).cmp(&variant_rank(other));
        if rank != Ordering::Equal {
            return rank;
        }
        match (self, other) {
            (Value::Omega, Value::Omega) => Ordering::Equal,
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Rational(a), Value::Rational(b)) => a.cmp(b),
            (Value::Real(a), Value::Real(b)) => a.total_cmp(b),
            (Value::Str(a), Value::Str(b)) => a.cmp(b),
            (Value::List(a), Value::List(b))
            | (Value::Set(a), Value::Set(b))
            | (Value::Tuple(a), Value::Tuple(b)) => compare_slices(a, b),
            (Value::Map(a), Value::Map(b)) => {
                let len = a.len().cmp(&b.len());
                if len != Ordering::Equal {
                    return len;
                }
                for ((ak, av), (bk, bv)) in a.iter().zip(b.iter()) {
                    let c = ak.compare_total(bk);
                    if c != Ordering::Equal {
                        return c;
                    }
                    let c = av.compare_total(bv);
                    if c != Ordering::Equal {
                        return c;
                    }
                }
                Ordering::Equal
            }
            (Value::Term(a), Value::Term(b)) => a.cmp(b),
            (Value::Procedure(a), Value::Procedure(b)) => {
                crate::procedure::compare_ignoring_capture(a, b)
            }
            (Value::Scope(a), Value::Scope(b)) => a.identity_cmp(b),
            (Value::Object(a), Value::Object(b)) => crate::object::compare(a, b),
            _ => unreachable!("variant_rank partitioned differing variants above"),
        }
    }

    pub fn to_term(&self) -> Term {
        crate::term::value_to_term(self)
    }

    pub fn from_term(term: &Term) -> crate::error::Result<Value> {
        crate::term::term_to_value(term)
    }
}

fn compare_slices(a: &[Value], b: &[Value]) -> Ordering {
    let len = a.len().cmp(&b.len());
    if len != Ordering::Equal {
        return len;
    }
    for (x, y) in a.iter().zip(b.iter()) {
        let c = x.compare_total(y);
        if c != Ordering::Equal {
            return c;
        }
    }
    Ordering::Equal
}

/// Builds a `Set` value from a bag of values: sorted by `compare_total`,
/// duplicates (by `equal_structural`) dropped, last write wins.
pub fn set_from_values(mut values: Vec<Value>) -> Value {
    values.sort_by(|a, b| a.compare_total(b));
    values.dedup_by(|a, b| a.equal_structural(b));
    Value::Set(values)
}

/// Builds a `Map` value from key/value pairs: sorted by key via
/// `compare_total`, duplicate keys resolved last-write-wins.
pub fn map_from_pairs(mut pairs: Vec<(Value, Value)>) -> Value {
    pairs.sort_by(|(ak, _), (bk, _)| ak.compare_total(bk));
    pairs.dedup_by(|(ak, _), (bk, _)| ak.equal_structural(bk));
    Value::Map(pairs)
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Omega => write!(f, "om"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Rational(r) => write!(f, "{}", r),
            Value::Real(x) => write!(f, "{}", x),
            Value::Str(s) => write!(f, "\"{}\"", s),
            Value::List(xs) => write_delimited(f, "[", xs.iter(), "]"),
            Value::Set(xs) => write_delimited(f, "{", xs.iter(), "}"),
            Value::Tuple(xs) => write_delimited(f, "(", xs.iter(), ")"),
            Value::Map(m) => {
                write!(f, "{{")?;
                for (i, (k, v)) in m.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{} |-> {}", k, v)?;
                }
                write!(f, "}}")
            }
            Value::Term(t) => write!(f, "{}", t),
            Value::Procedure(p) => write!(f, "{}", crate::procedure::display(p)),
            Value::Scope(_) => write!(f, "^scope(...)"),
            Value::Object(o) => write!(f, "{}", crate::object::display(o)),
        }
    }
}

fn write_delimited<'a>(
    f: &mut fmt::Formatter<'_>,
    open: &str,
    items: impl Iterator<Item = &'a Value>,
    close: &str,
) -> fmt::Result {
    write!(f, "{}", open)?;
    for (i, v) in items.enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", v)?;
    }
    write!(f, "{}", close)
}

/// A named l-value slot used by object member storage (see `object.rs`)
/// and by assignment in the bundled driver.
pub type NamedSlot = (Identifier, Value);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rational_reduces_to_lowest_terms() {
        let r = Rational::new(4, 8);
        assert_eq!((r.num, r.den), (1, 2));
    }

    #[test]
    fn rational_normalizes_negative_denominator() {
        let r = Rational::new(1, -2);
        assert_eq!((r.num, r.den), (-1, 2));
    }

    #[test]
    fn total_order_is_anti_symmetric() {
        let a = Value::Int(3);
        let b = Value::Str("x".to_string());
        assert_eq!(a.compare_total(&b).reverse(), b.compare_total(&a));
    }

    #[test]
    fn compare_zero_iff_structurally_equal() {
        let a = Value::List(vec![Value::Int(1), Value::Int(2)]);
        let b = Value::List(vec![Value::Int(1), Value::Int(2)]);
        assert_eq!(a.compare_total(&b), Ordering::Equal);
        assert!(a.equal_structural(&b));
    }

    #[test]
    fn size_fails_on_atoms() {
        let err = Value::Int(1).size().unwrap_err();
        assert!(matches!(err, crate::error::Error::IncompatibleType { .. }));
    }

    #[test]
    fn set_from_values_sorts_and_dedups() {
        let s = set_from_values(vec![Value::Int(3), Value::Int(1), Value::Int(1)]);
        match s {
            Value::Set(xs) => assert_eq!(xs.len(), 2),
            _ => panic!("expected set"),
        }
    }
}

//! The pre-defined function registry (spec.md §4.6, SPEC_FULL.md §6).
//!
//! Kept explicit and small rather than reflection-based, per the
//! language's own design note that host functions are a fixed, curated
//! set rather than anything introspectable at runtime. This is a
//! representative slice, not a standard library.

use crate::error::{Error, Result};
use crate::value::{Rational, Value};

pub type NativeFn = fn(&[Value]) -> Result<Value>;

pub fn lookup(name: &str) -> Option<NativeFn> {
    match name {
        "abs" => Some(abs),
        "size" => Some(size),
        "str" => Some(str_of),
        _ => None,
    }
}

fn expect_arity(args: &[Value], name: &str, n: usize) -> Result<()> {
    if args.len() != n {
        return Err(Error::Runtime(format!("{} expects {} argument(s), got {}", name, n, args.len())));
    }
    Ok(())
}

fn abs(args: &[Value]) -> Result<Value> {
    expect_arity(args, "abs", 1)?;
    match &args[0] {
        Value::Int(i) => Ok(Value::Int(i.abs())),
        Value::Real(x) => Ok(Value::Real(x.abs())),
        Value::Rational(r) => Ok(Value::Rational(Rational::new(r.num.abs(), r.den))),
        other => Err(Error::IncompatibleType {
            operation: "abs".to_string(),
            got: other.type_name(),
        }),
    }
}

fn size(args: &[Value]) -> Result<Value> {
    expect_arity(args, "size", 1)?;
    Ok(Value::Int(args[0].size()? as i64))
}

fn str_of(args: &[Value]) -> Result<Value> {
    expect_arity(args, "str", 1)?;
    Ok(Value::Str(args[0].to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abs_handles_negative_int() {
        let result = lookup("abs").unwrap()(&[Value::Int(-4)]).unwrap();
        assert!(matches!(result, Value::Int(4)));
    }

    #[test]
    fn size_delegates_to_value_size() {
        let result = lookup("size").unwrap()(&[Value::List(vec![Value::Int(1), Value::Int(2)])]).unwrap();
        assert!(matches!(result, Value::Int(2)));
    }

    #[test]
    fn str_uses_display() {
        let result = lookup("str").unwrap()(&[Value::Int(9)]).unwrap();
        assert!(matches!(result, Value::Str(ref s) if s == "9"));
    }

    #[test]
    fn unknown_name_is_not_registered() {
        assert!(lookup("not_a_real_builtin").is_none());
    }
}

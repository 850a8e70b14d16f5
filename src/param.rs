//! Parameter descriptors (spec.md §4.1, §2 item 2).

use crate::error::{Error, Result};
use crate::ident::Identifier;
use crate::scope::Scope;
use crate::term::{self, Term};
use crate::value::Value;

/// Binding mode of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ParamMode {
    /// Caller pre-clones; the callee gets an independent copy.
    Value,
    /// Caller passes the original; the post-call value is written back.
    ReadWrite,
    /// Binds the whole argument under `name`; destructuring the list into
    /// sub-patterns is a driver/AST-level concern spec.md §4.1 does not
    /// define further (it only specifies `assign_into`/`read_back` for
    /// VALUE and READ_WRITE) — this core treats it as a VALUE bind of the
    /// whole list, documented as an Open Question resolution in
    /// DESIGN.md.
    ListPattern,
}

#[derive(Clone)]
pub struct ParameterDescriptor {
    pub name: Identifier,
    pub mode: ParamMode,
}

impl ParameterDescriptor {
    pub fn new(name: Identifier, mode: ParamMode) -> Self {
        ParameterDescriptor { name, mode }
    }

    /// spec.md §4.1 `assign_into`. The caller is responsible for having
    /// already deep-cloned `value` for VALUE-mode parameters (spec.md
    /// §4.3.2 step 5 does this at the call site, not here, since only the
    /// call protocol knows the full argument list and can batch the
    /// clones).
    pub fn assign_into(&self, scope: &Scope, value: Value) {
        scope.define_local(self.name.clone(), value);
    }

    /// spec.md §4.1 `read_back`: the parameter's current value in `scope`,
    /// used to collect post-call values for READ_WRITE parameters.
    pub fn read_back(&self, scope: &Scope) -> Result<Value> {
        scope
            .lookup(&self.name)
            .map(|l| l.value)
            .ok_or_else(|| Error::NameError(self.name.to_string()))
    }

    pub fn to_term(&self) -> Term {
        let mode_tag = match self.mode {
            ParamMode::Value => "value",
            ParamMode::ReadWrite => "rw",
            ParamMode::ListPattern => "list_pattern",
        };
        Term::compound(
            "^param",
            vec![
                Term::Str(self.name.as_str().to_string()),
                Term::compound(mode_tag, vec![]),
            ],
        )
    }

    pub fn from_term(t: &Term) -> Result<Self> {
        match t {
            Term::Compound(c) if c.tag == "^param" => {
                term::arity(&c.children, 2, "^param")?;
                let name = term::expect_str(&c.children[0], "^param")?;
                let mode = match &c.children[1] {
                    Term::Compound(m) if m.tag == "value" => ParamMode::Value,
                    Term::Compound(m) if m.tag == "rw" => ParamMode::ReadWrite,
                    Term::Compound(m) if m.tag == "list_pattern" => ParamMode::ListPattern,
                    other => {
                        return Err(Error::TermConversion(format!(
                            "unrecognized parameter mode '{}'",
                            other
                        )))
                    }
                };
                Ok(ParameterDescriptor::new(Identifier::new(&name), mode))
            }
            other => Err(Error::TermConversion(format!(
                "expected ^param term, got {}",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn param_term_round_trips() {
        let p = ParameterDescriptor::new(Identifier::new("x"), ParamMode::ReadWrite);
        let back = ParameterDescriptor::from_term(&p.to_term()).unwrap();
        assert_eq!(back.name, p.name);
        assert_eq!(back.mode, p.mode);
    }

    #[test]
    fn read_write_parameter_round_trip() {
        let scope = Scope::root();
        let p = ParameterDescriptor::new(Identifier::new("xs"), ParamMode::ReadWrite);
        p.assign_into(&scope, Value::Int(10));
        assert!(matches!(p.read_back(&scope).unwrap(), Value::Int(10)));
    }
}

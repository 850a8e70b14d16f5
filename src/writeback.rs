//! Write-back of READ_WRITE parameters after a call (spec.md §4.3.2 step
//! 9, §4.4). The call protocol in `procedure.rs` only knows argument
//! *positions*; turning a position back into an assignment against the
//! caller's own expression tree is the driver's job, so it lives here
//! rather than in `procedure.rs`.

use crate::ast::Expr;
use crate::interpreter::Interpreter;
use crate::scope::Scope;
use crate::value::Value;

pub struct WriteBackEntry {
    pub target_index: usize,
    pub value: Value,
}

/// Applies every entry whose originating argument expression is
/// assignable. An entry whose argument expression isn't an l-value (a
/// literal, a nested call result, ...) is silently dropped — the call
/// itself already completed successfully, and a READ_WRITE parameter
/// bound to a non-assignable argument has nothing sensible to write
/// back to (spec.md §4.4).
pub fn apply(interp: &mut Interpreter, scope: &Scope, args: &[Expr], entries: Vec<WriteBackEntry>) {
    for entry in entries {
        let Some(target) = args.get(entry.target_index) else {
            continue;
        };
        if !target.is_assignable() {
            continue;
        }
        let _ = interp.assign_expr(scope, target, entry.value);
    }
}

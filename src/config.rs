//! Interpreter configuration.
//!
//! Modeled directly on `littrs::sandbox::Limits`: a small, optional-fields
//! struct applied once at `Interpreter` construction.

/// Resource limits and feature toggles for one execution context.
///
/// Both numeric limits are optional — `None` means unlimited, matching the
/// teacher's `Limits` convention.
#[derive(Debug, Clone)]
pub struct InterpreterConfig {
    /// Maximum call-stack depth for user-defined procedure calls. `None`
    /// means unlimited. This is the only guard spec.md §4.3.2 step 7 names
    /// ("intercept host-level stack-overflow"); we intercept it proactively
    /// by counting rather than by catching a real stack overflow, which
    /// Rust cannot do safely.
    pub max_call_depth: Option<usize>,

    /// When true (the default), a variable-read miss for a name that isn't
    /// a predefined function either is memoized into the initial scope so
    /// repeated misses are O(1). Never applied to a predefined function's
    /// name itself — caching that miss would make `eval_call`'s native-
    /// dispatch check see a stale local hit on the next call. Tests that
    /// want to observe the lookup happening more than once can disable
    /// this.
    pub cache_initial_scope_misses: bool,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            max_call_depth: Some(2048),
            cache_initial_scope_misses: true,
        }
    }
}

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::error::QueryError;
use crate::flags;
use crate::session::ExecContext;
use crate::value::Primary;

/// A built-in scalar function. Arity is declared so the evaluator can
/// report mismatches before calling.
pub trait ScalarFunction: Send + Sync {
    fn name(&self) -> &'static str;
    fn min_args(&self) -> usize;
    /// None means variadic.
    fn max_args(&self) -> Option<usize>;
    fn call(&self, ctx: &ExecContext, args: &[Primary]) -> Result<Primary, QueryError>;
}

/// Case-insensitive registry of scalar builtins.
#[derive(Default)]
pub struct FunctionRegistry {
    by_name: HashMap<String, Arc<dyn ScalarFunction>>,
}

static DEFAULT_REGISTRY: Lazy<FunctionRegistry> = Lazy::new(FunctionRegistry::default_registry);

impl FunctionRegistry {
    pub fn new() -> Self {
        Self { by_name: HashMap::new() }
    }

    pub fn register<F: ScalarFunction + 'static>(&mut self, function: F) {
        self.by_name.insert(function.name().to_string(), Arc::new(function));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ScalarFunction>> {
        self.by_name.get(&name.to_ascii_lowercase()).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(&name.to_ascii_lowercase())
    }

    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<_> = self.by_name.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn global() -> &'static FunctionRegistry {
        &DEFAULT_REGISTRY
    }

    pub fn default_registry() -> Self {
        let mut registry = Self::new();
        registry.register(Coalesce);
        registry.register(Upper);
        registry.register(Lower);
        registry.register(Trim);
        registry.register(Length);
        registry.register(Abs);
        registry.register(Floor);
        registry.register(Ceil);
        registry.register(Round);
        registry.register(Now);
        registry.register(Rand);
        registry
    }
}

fn text_arg(args: &[Primary]) -> Option<String> {
    match &args[0] {
        Primary::Null => None,
        value => value.to_text(),
    }
}

struct Coalesce;
impl ScalarFunction for Coalesce {
    fn name(&self) -> &'static str {
        "coalesce"
    }
    fn min_args(&self) -> usize {
        1
    }
    fn max_args(&self) -> Option<usize> {
        None
    }
    fn call(&self, _ctx: &ExecContext, args: &[Primary]) -> Result<Primary, QueryError> {
        Ok(args.iter().find(|v| !v.is_null()).cloned().unwrap_or(Primary::Null))
    }
}

struct Upper;
impl ScalarFunction for Upper {
    fn name(&self) -> &'static str {
        "upper"
    }
    fn min_args(&self) -> usize {
        1
    }
    fn max_args(&self) -> Option<usize> {
        Some(1)
    }
    fn call(&self, _ctx: &ExecContext, args: &[Primary]) -> Result<Primary, QueryError> {
        Ok(text_arg(args).map_or(Primary::Null, |s| Primary::String(s.to_uppercase())))
    }
}

struct Lower;
impl ScalarFunction for Lower {
    fn name(&self) -> &'static str {
        "lower"
    }
    fn min_args(&self) -> usize {
        1
    }
    fn max_args(&self) -> Option<usize> {
        Some(1)
    }
    fn call(&self, _ctx: &ExecContext, args: &[Primary]) -> Result<Primary, QueryError> {
        Ok(text_arg(args).map_or(Primary::Null, |s| Primary::String(s.to_lowercase())))
    }
}

struct Trim;
impl ScalarFunction for Trim {
    fn name(&self) -> &'static str {
        "trim"
    }
    fn min_args(&self) -> usize {
        1
    }
    fn max_args(&self) -> Option<usize> {
        Some(1)
    }
    fn call(&self, _ctx: &ExecContext, args: &[Primary]) -> Result<Primary, QueryError> {
        Ok(text_arg(args).map_or(Primary::Null, |s| Primary::String(s.trim().to_string())))
    }
}

struct Length;
impl ScalarFunction for Length {
    fn name(&self) -> &'static str {
        "length"
    }
    fn min_args(&self) -> usize {
        1
    }
    fn max_args(&self) -> Option<usize> {
        Some(1)
    }
    fn call(&self, _ctx: &ExecContext, args: &[Primary]) -> Result<Primary, QueryError> {
        Ok(text_arg(args)
            .map_or(Primary::Null, |s| Primary::Integer(s.chars().count() as i64)))
    }
}

struct Abs;
impl ScalarFunction for Abs {
    fn name(&self) -> &'static str {
        "abs"
    }
    fn min_args(&self) -> usize {
        1
    }
    fn max_args(&self) -> Option<usize> {
        Some(1)
    }
    fn call(&self, _ctx: &ExecContext, args: &[Primary]) -> Result<Primary, QueryError> {
        Ok(match &args[0] {
            Primary::Integer(i) => Primary::Integer(i.wrapping_abs()),
            value => value.to_float().map_or(Primary::Null, |f| Primary::Float(f.abs())),
        })
    }
}

struct Floor;
impl ScalarFunction for Floor {
    fn name(&self) -> &'static str {
        "floor"
    }
    fn min_args(&self) -> usize {
        1
    }
    fn max_args(&self) -> Option<usize> {
        Some(1)
    }
    fn call(&self, _ctx: &ExecContext, args: &[Primary]) -> Result<Primary, QueryError> {
        Ok(args[0].to_float().map_or(Primary::Null, |f| Primary::Float(f.floor())))
    }
}

struct Ceil;
impl ScalarFunction for Ceil {
    fn name(&self) -> &'static str {
        "ceil"
    }
    fn min_args(&self) -> usize {
        1
    }
    fn max_args(&self) -> Option<usize> {
        Some(1)
    }
    fn call(&self, _ctx: &ExecContext, args: &[Primary]) -> Result<Primary, QueryError> {
        Ok(args[0].to_float().map_or(Primary::Null, |f| Primary::Float(f.ceil())))
    }
}

struct Round;
impl ScalarFunction for Round {
    fn name(&self) -> &'static str {
        "round"
    }
    fn min_args(&self) -> usize {
        1
    }
    fn max_args(&self) -> Option<usize> {
        Some(2)
    }
    fn call(&self, _ctx: &ExecContext, args: &[Primary]) -> Result<Primary, QueryError> {
        let value = match args[0].to_float() {
            Some(f) => f,
            None => return Ok(Primary::Null),
        };
        let digits = match args.get(1) {
            Some(d) => match d.to_integer() {
                Some(d) => d,
                None => return Ok(Primary::Null),
            },
            None => 0,
        };
        let scale = 10f64.powi(digits as i32);
        Ok(Primary::Float((value * scale).round() / scale))
    }
}

struct Now;
impl ScalarFunction for Now {
    fn name(&self) -> &'static str {
        "now"
    }
    fn min_args(&self) -> usize {
        0
    }
    fn max_args(&self) -> Option<usize> {
        Some(0)
    }
    fn call(&self, ctx: &ExecContext, _args: &[Primary]) -> Result<Primary, QueryError> {
        Ok(Primary::Datetime(ctx.now))
    }
}

struct Rand;
impl ScalarFunction for Rand {
    fn name(&self) -> &'static str {
        "rand"
    }
    fn min_args(&self) -> usize {
        0
    }
    fn max_args(&self) -> Option<usize> {
        Some(0)
    }
    fn call(&self, _ctx: &ExecContext, _args: &[Primary]) -> Result<Primary, QueryError> {
        Ok(Primary::Float(flags::random_f64()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::Flags;
    use crate::session::{CancelToken, Session};

    fn with_ctx<F: FnOnce(&ExecContext)>(f: F) {
        let session = Session::new(Flags::default());
        let ctx = ExecContext::new(&session, CancelToken::new());
        f(&ctx);
    }

    fn call(ctx: &ExecContext, name: &str, args: &[Primary]) -> Primary {
        FunctionRegistry::global().get(name).unwrap().call(ctx, args).unwrap()
    }

    #[test]
    fn registry_lookup_is_case_insensitive() {
        let registry = FunctionRegistry::global();
        assert!(registry.get("COALESCE").is_some());
        assert!(registry.get("uPPer").is_some());
        assert!(registry.get("no_such_fn").is_none());
    }

    #[test]
    fn string_functions_pass_null_through() {
        with_ctx(|ctx| {
            assert_eq!(
                call(ctx, "upper", &[Primary::String("aBc".into())]),
                Primary::String("ABC".into())
            );
            assert_eq!(call(ctx, "lower", &[Primary::Null]), Primary::Null);
            assert_eq!(
                call(ctx, "trim", &[Primary::String("  hi  ".into())]),
                Primary::String("hi".into())
            );
            assert_eq!(
                call(ctx, "length", &[Primary::String("hé".into())]),
                Primary::Integer(2)
            );
        });
    }

    #[test]
    fn coalesce_returns_first_non_null() {
        with_ctx(|ctx| {
            assert_eq!(
                call(ctx, "coalesce", &[Primary::Null, Primary::Integer(2), Primary::Integer(3)]),
                Primary::Integer(2)
            );
            assert_eq!(call(ctx, "coalesce", &[Primary::Null, Primary::Null]), Primary::Null);
        });
    }

    #[test]
    fn numeric_functions_coerce_and_round() {
        with_ctx(|ctx| {
            assert_eq!(call(ctx, "abs", &[Primary::Integer(-4)]), Primary::Integer(4));
            assert_eq!(call(ctx, "floor", &[Primary::Float(1.8)]), Primary::Float(1.0));
            assert_eq!(call(ctx, "ceil", &[Primary::Float(1.2)]), Primary::Float(2.0));
            assert_eq!(
                call(ctx, "round", &[Primary::Float(1.256), Primary::Integer(2)]),
                Primary::Float(1.26)
            );
            assert_eq!(call(ctx, "abs", &[Primary::Boolean(true)]), Primary::Null);
        });
    }

    #[test]
    fn now_reads_the_frozen_clock() {
        let flags = Flags { now: "2024-06-01 12:00:00".into(), ..Flags::default() };
        let session = Session::new(flags);
        let ctx = ExecContext::new(&session, CancelToken::new());
        match call(&ctx, "now", &[]) {
            Primary::Datetime(dt) => assert_eq!(dt.timestamp(), 1717243200),
            other => panic!("expected datetime, got {other}"),
        }
    }
}

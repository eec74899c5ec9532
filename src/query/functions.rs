//! Extension functions callable from filter expressions, looked up case-insensitively.

use super::expr::Value;
use crate::errors::{Result, SearchError};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

pub type ExtensionFn = Arc<dyn Fn(&[Value]) -> Result<Value> + Send + Sync>;

#[derive(Clone)]
pub struct FunctionRegistry {
    functions: HashMap<String, ExtensionFn>,
}

fn one_number(name: &str, args: &[Value]) -> Result<Option<f64>> {
    match args {
        [Value::Number(n)] => Ok(Some(*n)),
        [Value::Null] => Ok(None),
        [other] => Err(SearchError::Evaluation(format!(
            "{name} expects a number, got {}",
            other.type_name()
        ))),
        _ => Err(SearchError::Evaluation(format!("{name} expects 1 argument, got {}", args.len()))),
    }
}

fn one_string(name: &str, args: &[Value]) -> Result<Option<String>> {
    match args {
        [Value::String(s)] => Ok(Some(s.clone())),
        [Value::Null] => Ok(None),
        [other] => Err(SearchError::Evaluation(format!(
            "{name} expects a string, got {}",
            other.type_name()
        ))),
        _ => Err(SearchError::Evaluation(format!("{name} expects 1 argument, got {}", args.len()))),
    }
}

impl FunctionRegistry {
    /// A registry with no functions.
    #[must_use]
    pub fn empty() -> Self {
        Self { functions: HashMap::new() }
    }

    pub fn register<F>(&mut self, name: &str, f: F)
    where
        F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        self.functions.insert(name.to_ascii_lowercase(), Arc::new(f));
    }

    #[must_use]
    pub fn with<F>(mut self, name: &str, f: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        self.register(name, f);
        self
    }

    fn register_numeric(&mut self, name: &'static str, f: fn(f64) -> f64) {
        self.register(name, move |args| {
            Ok(one_number(name, args)?.map_or(Value::Null, |n| Value::Number(f(n))))
        });
    }

    fn register_text(&mut self, name: &'static str, f: fn(&str) -> String) {
        self.register(name, move |args| {
            Ok(one_string(name, args)?.map_or(Value::Null, |s| Value::String(f(&s))))
        });
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ExtensionFn> {
        self.functions.get(&name.to_ascii_lowercase())
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// # Errors
    /// Returns `SearchError::UnknownFunction` for unregistered names, or the function's own error.
    pub fn call(&self, name: &str, args: &[Value]) -> Result<Value> {
        let f = self.get(name).ok_or_else(|| SearchError::UnknownFunction(name.to_string()))?;
        f(args)
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        let mut r = Self::empty();
        r.register_numeric("sin", f64::sin);
        r.register_numeric("cos", f64::cos);
        r.register_numeric("tan", f64::tan);
        r.register_numeric("abs", f64::abs);
        r.register_numeric("sqrt", f64::sqrt);
        r.register_numeric("floor", f64::floor);
        r.register_numeric("ceil", f64::ceil);
        r.register_text("lower", str::to_lowercase);
        r.register_text("upper", str::to_uppercase);
        r
    }
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.functions.keys().collect();
        names.sort();
        f.debug_struct("FunctionRegistry").field("functions", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_case_insensitive() {
        let r = FunctionRegistry::default();
        assert_eq!(r.call("SIN", &[Value::Number(0.0)]).unwrap(), Value::Number(0.0));
        assert_eq!(r.call("Upper", &[Value::String("ab".into())]).unwrap(), Value::String("AB".into()));
        assert_eq!(r.call("abs", &[Value::Null]).unwrap(), Value::Null);
    }

    #[test]
    fn unknown_and_bad_arguments() {
        let r = FunctionRegistry::default();
        assert_eq!(r.call("nope", &[]), Err(SearchError::UnknownFunction("nope".into())));
        assert!(matches!(r.call("sqrt", &[Value::String("x".into())]), Err(SearchError::Evaluation(_))));
        assert!(matches!(r.call("cos", &[]), Err(SearchError::Evaluation(_))));
    }

    #[test]
    fn custom_registration() {
        let r = FunctionRegistry::empty().with("Double", |args| match args {
            [Value::Number(n)] => Ok(Value::Number(n * 2.0)),
            _ => Err(SearchError::Evaluation("double".into())),
        });
        assert!(r.contains("double"));
        assert_eq!(r.call("DOUBLE", &[Value::Number(2.5)]).unwrap(), Value::Number(5.0));
        assert!(!r.contains("sin"));
    }
}

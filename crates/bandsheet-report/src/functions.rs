//! Application functions callable from `[@pkg.fn(args)@]` tags
//!
//! Functions are plain `fn` pointers registered under a dotted name. The
//! registry is owned by the caller and handed to the generator; there is no
//! process-wide table.

use std::collections::{BTreeMap, HashMap};

use crate::error::{ReportError, ReportResult};
use crate::format::percent_format;
use crate::query::Record;
use crate::value::Value;

/// What a function can see of the cell being generated
#[derive(Debug, Clone, Copy)]
pub struct FunctionContext<'a> {
    /// Current record; `None` in bands rendered without one
    pub record: Option<Record<'a>>,
    pub variables: &'a BTreeMap<String, Value>,
    /// Output position
    pub row: u32,
    pub col: u32,
}

/// Function implementation signature
pub type FunctionImpl = fn(&[Value], &FunctionContext) -> ReportResult<Value>;

/// Function definition
pub struct FunctionDef {
    /// Dotted name, e.g. `std.concat`
    pub name: &'static str,
    pub min_args: usize,
    /// Maximum arguments (None = unlimited)
    pub max_args: Option<usize>,
    pub implementation: FunctionImpl,
}

/// Function registry
pub struct FunctionRegistry {
    functions: HashMap<String, FunctionDef>,
}

impl FunctionRegistry {
    /// Create a registry holding the `std.*` functions
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register_std_functions();
        registry
    }

    /// Create a registry without any function
    pub fn empty() -> Self {
        Self {
            functions: HashMap::new(),
        }
    }

    /// Look up a function by name (case-insensitive)
    pub fn get(&self, name: &str) -> Option<&FunctionDef> {
        self.functions.get(&name.to_lowercase())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Register a function, replacing any previous one of the same name
    pub fn register(&mut self, def: FunctionDef) {
        self.functions.insert(def.name.to_lowercase(), def);
    }

    /// Check the arity and run a function
    pub fn call(&self, name: &str, args: &[Value], ctx: &FunctionContext) -> ReportResult<Value> {
        let def = self
            .get(name)
            .ok_or_else(|| ReportError::eval(format!("unknown function '{}'", name)))?;
        if args.len() < def.min_args || def.max_args.map_or(false, |max| args.len() > max) {
            return Err(ReportError::eval(format!(
                "{}() takes {} arguments, {} given",
                def.name,
                arity(def),
                args.len()
            )));
        }
        (def.implementation)(args, ctx)
    }

    fn register_std_functions(&mut self) {
        self.register(FunctionDef {
            name: "std.today",
            min_args: 0,
            max_args: Some(1),
            implementation: fn_today,
        });
        self.register(FunctionDef {
            name: "std.now",
            min_args: 0,
            max_args: Some(1),
            implementation: fn_now,
        });
        self.register(FunctionDef {
            name: "std.concat",
            min_args: 0,
            max_args: None,
            implementation: fn_concat,
        });
        self.register(FunctionDef {
            name: "std.coalesce",
            min_args: 1,
            max_args: None,
            implementation: fn_coalesce,
        });
        self.register(FunctionDef {
            name: "std.format",
            min_args: 1,
            max_args: None,
            implementation: fn_format,
        });
        self.register(FunctionDef {
            name: "std.var",
            min_args: 1,
            max_args: Some(2),
            implementation: fn_var,
        });
        self.register(FunctionDef {
            name: "std.row",
            min_args: 0,
            max_args: Some(0),
            implementation: fn_row,
        });
        self.register(FunctionDef {
            name: "std.col",
            min_args: 0,
            max_args: Some(0),
            implementation: fn_col,
        });
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn arity(def: &FunctionDef) -> String {
    match def.max_args {
        Some(max) if max == def.min_args => max.to_string(),
        Some(max) => format!("{} to {}", def.min_args, max),
        None => format!("at least {}", def.min_args),
    }
}

fn fn_today(args: &[Value], _ctx: &FunctionContext) -> ReportResult<Value> {
    let fmt = match args.first() {
        Some(v) if !v.is_none() => v.to_string(),
        _ => "%Y-%m-%d".to_string(),
    };
    Ok(Value::Str(chrono::Local::now().date_naive().format(&fmt).to_string()))
}

fn fn_now(args: &[Value], _ctx: &FunctionContext) -> ReportResult<Value> {
    let fmt = match args.first() {
        Some(v) if !v.is_none() => v.to_string(),
        _ => "%Y-%m-%d %H:%M:%S".to_string(),
    };
    Ok(Value::Str(chrono::Local::now().format(&fmt).to_string()))
}

fn fn_concat(args: &[Value], _ctx: &FunctionContext) -> ReportResult<Value> {
    Ok(Value::Str(args.iter().map(ToString::to_string).collect()))
}

fn fn_coalesce(args: &[Value], _ctx: &FunctionContext) -> ReportResult<Value> {
    Ok(args
        .iter()
        .find(|v| !v.is_none())
        .cloned()
        .unwrap_or_default())
}

fn fn_format(args: &[Value], _ctx: &FunctionContext) -> ReportResult<Value> {
    let fmt = args[0].to_string();
    percent_format(&fmt, &args[1..]).map(Value::Str)
}

/// `std.var(name[, default])`
fn fn_var(args: &[Value], ctx: &FunctionContext) -> ReportResult<Value> {
    let name = args[0].to_string();
    Ok(ctx
        .variables
        .get(&name)
        .cloned()
        .or_else(|| args.get(1).cloned())
        .unwrap_or_default())
}

fn fn_row(_args: &[Value], ctx: &FunctionContext) -> ReportResult<Value> {
    Ok(Value::Number(ctx.row as f64))
}

fn fn_col(_args: &[Value], ctx: &FunctionContext) -> ReportResult<Value> {
    Ok(Value::Number(ctx.col as f64))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(variables: &BTreeMap<String, Value>) -> FunctionContext<'_> {
        FunctionContext {
            record: None,
            variables,
            row: 4,
            col: 2,
        }
    }

    #[test]
    fn test_std_functions() {
        let registry = FunctionRegistry::new();
        let mut vars = BTreeMap::new();
        vars.insert("title".to_string(), Value::str("Payroll"));
        let ctx = ctx(&vars);

        let concat = registry
            .call("std.concat", &["a".into(), 1.into(), Value::None], &ctx)
            .unwrap();
        assert_eq!(concat, Value::str("a1"));
        assert_eq!(
            registry.call("STD.Coalesce", &[Value::None, 2.into()], &ctx).unwrap(),
            Value::Number(2.0)
        );
        assert_eq!(
            registry.call("std.format", &["%05.1f".into(), 3.14159.into()], &ctx).unwrap(),
            Value::str("003.1")
        );
        assert_eq!(registry.call("std.var", &["title".into()], &ctx).unwrap(), Value::str("Payroll"));
        assert_eq!(
            registry.call("std.var", &["nope".into(), "x".into()], &ctx).unwrap(),
            Value::str("x")
        );
        assert_eq!(registry.call("std.row", &[], &ctx).unwrap(), Value::Number(4.0));
    }

    #[test]
    fn test_arity_and_unknown_names() {
        let registry = FunctionRegistry::new();
        let vars = BTreeMap::new();
        let ctx = ctx(&vars);
        assert!(registry.call("std.coalesce", &[], &ctx).is_err());
        assert!(registry.call("std.row", &[1.into()], &ctx).is_err());
        assert!(registry.call("app.missing", &[], &ctx).is_err());
    }

    #[test]
    fn test_application_functions() {
        fn shout(args: &[Value], _ctx: &FunctionContext) -> ReportResult<Value> {
            Ok(Value::Str(args[0].to_string().to_uppercase()))
        }

        let mut registry = FunctionRegistry::empty();
        registry.register(FunctionDef {
            name: "app.shout",
            min_args: 1,
            max_args: Some(1),
            implementation: shout,
        });
        let vars = BTreeMap::new();
        assert_eq!(
            registry.call("app.shout", &["hi".into()], &ctx(&vars)).unwrap(),
            Value::str("HI")
        );
        assert!(!registry.contains("std.concat"));
    }
}

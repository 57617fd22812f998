//! Runtime value model: the dynamically-typed `Value` every expression
//! evaluates to. Callables come in two flavours: host-provided native
//! functions and user functions that pair their declaration with the
//! environment captured at declaration time.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::environment::Environment;
use crate::parser::FunctionDecl;

/// Host function signature for natives: receives the evaluated arguments and
/// either produces a value or a message the interpreter turns into a runtime
/// error at the call site.
pub type NativeFn<'a> = fn(&[Value<'a>]) -> std::result::Result<Value<'a>, String>;

/// A runtime value. The lifetime `'a` ties user functions back to the token
/// buffer their declaration borrows from.
#[derive(Clone)]
pub enum Value<'a> {
    Number(f64),

    String(String),

    Bool(bool),

    Nil,

    /// A function provided by the host, e.g. `clock`.
    NativeFunction {
        name: String,
        arity: usize,
        func: NativeFn<'a>,
    },

    /// A user function: its declaration plus the environment that was active
    /// when the declaration executed (closure capture).
    Function {
        declaration: Rc<FunctionDecl<'a>>,
        closure: Rc<RefCell<Environment<'a>>>,
    },
}

impl PartialEq for Value<'_> {
    /// Structural equality: same variant, equal payload. `Nil` equals only
    /// `Nil`. User functions compare by declaration identity so that a
    /// closure is only ever equal to itself, never to a structurally similar
    /// one — comparing captured environments would recurse through cycles.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Nil, Value::Nil) => true,
            (
                Value::NativeFunction { name: a, .. },
                Value::NativeFunction { name: b, .. },
            ) => a == b,
            (
                Value::Function { declaration: a, .. },
                Value::Function { declaration: b, .. },
            ) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => {
                if n.fract() == 0.0 {
                    write!(f, "{:.0}", n)
                } else {
                    write!(f, "{}", n)
                }
            }

            Value::String(s) => write!(f, "{}", s),

            Value::Bool(b) => write!(f, "{}", b),

            Value::Nil => write!(f, "nil"),

            Value::NativeFunction { name, .. } => write!(f, "<native fn {}>", name),

            Value::Function { declaration, .. } => {
                write!(f, "<fn {}>", declaration.name.lexeme)
            }
        }
    }
}

impl fmt::Debug for Value<'_> {
    /// Functions are rendered as tags; a captured environment can reach the
    /// function value that owns it, so a derived impl would recurse forever.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "Number({:?})", n),
            Value::String(s) => write!(f, "String({:?})", s),
            Value::Bool(b) => write!(f, "Bool({:?})", b),
            Value::Nil => write!(f, "Nil"),
            Value::NativeFunction { name, .. } => write!(f, "<native fn {}>", name),
            Value::Function { declaration, .. } => {
                write!(f, "<fn {}>", declaration.name.lexeme)
            }
        }
    }
}

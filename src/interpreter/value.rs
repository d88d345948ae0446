use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::ast::Statement;
use crate::interpreter::Evaluator;
use crate::interpreter::environment::Env;
use crate::interpreter::error::RuntimeError;

/// Anything a program can call. Host natives implement this to receive
/// control from the evaluator; user-defined functions are the crate's own
/// implementation.
pub trait Callable {
    fn call(&self, evaluator: &mut Evaluator, args: Vec<Value>) -> Result<Value, RuntimeError>;
}

/// Anything a program can read and write through `[]` and `.` access.
/// Implementations use interior mutability; a missing key reads as `Nil`.
pub trait Indexable {
    fn get(&self, key: &Value) -> Value;
    fn set(&self, key: Value, value: Value);
}

#[derive(Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Number(f64),
    Str(Rc<str>),
    Function(Rc<dyn Callable>),
    Object(Rc<dyn Indexable>),
}

impl Value {
    pub fn string(text: impl AsRef<str>) -> Self {
        Value::Str(Rc::from(text.as_ref()))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::Function(_) => "function",
            Value::Object(_) => "object",
        }
    }

    /// `false`, `nil` and `0` are falsy; everything else is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Nil => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0,
            _ => true,
        }
    }
}

fn data_ptr<T: ?Sized>(rc: &Rc<T>) -> *const () {
    Rc::as_ptr(rc) as *const ()
}

/// Structural equality for primitives, identity for functions and objects.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => data_ptr(a) == data_ptr(b),
            (Value::Object(a), Value::Object(b)) => data_ptr(a) == data_ptr(b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "Nil"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Number(n) => write!(f, "Number({n})"),
            Value::Str(s) => write!(f, "Str({s:?})"),
            Value::Function(_) => write!(f, "Function(<callable>)"),
            Value::Object(_) => write!(f, "Object(<indexable>)"),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::Str(s) => write!(f, "{s}"),
            Value::Function(_) => write!(f, "<function>"),
            Value::Object(_) => write!(f, "<object>"),
        }
    }
}

/// The crate's stock `Indexable`: insertion-ordered pairs keyed by value
/// equality. Iteration order is never exposed, so the ordering stays an
/// implementation detail.
#[derive(Default)]
pub struct ScriptObject {
    entries: RefCell<Vec<(Value, Value)>>,
}

impl ScriptObject {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Indexable for ScriptObject {
    fn get(&self, key: &Value) -> Value {
        self.entries
            .borrow()
            .iter()
            .find(|(held, _)| held == key)
            .map(|(_, value)| value.clone())
            .unwrap_or(Value::Nil)
    }

    fn set(&self, key: Value, value: Value) {
        let mut entries = self.entries.borrow_mut();
        if let Some(entry) = entries.iter_mut().find(|(held, _)| *held == key) {
            entry.1 = value;
        } else {
            entries.push((key, value));
        }
    }
}

/// A user-defined function: parameter names, body statements, and the
/// environment frame captured at construction. The frame is shared, not
/// copied, so mutations through the closure stay visible outside it.
pub(crate) struct ScriptFunction {
    params: Vec<String>,
    body: Rc<Vec<Statement>>,
    captured: Env,
}

impl ScriptFunction {
    pub(crate) fn new(params: Vec<String>, body: Rc<Vec<Statement>>, captured: Env) -> Self {
        Self {
            params,
            body,
            captured,
        }
    }
}

impl Callable for ScriptFunction {
    fn call(&self, evaluator: &mut Evaluator, args: Vec<Value>) -> Result<Value, RuntimeError> {
        if args.len() != self.params.len() {
            return Err(RuntimeError::Arity {
                expected: self.params.len(),
                found: args.len(),
            });
        }
        let frame = self.captured.child();
        for (param, value) in self.params.iter().zip(args) {
            frame.declare(param, value)?;
        }
        evaluator.run_function_body(&self.body, frame)
    }
}

//! Tree-walking evaluator.
//!
//! Statements execute against the evaluator's current-environment
//! register, producing a control-flow [`Signal`] that bubbles through
//! blocks until a loop or function-call site intercepts it. Expressions
//! evaluate to a [`Place`]: identifiers and dotted/bracketed accesses
//! yield writable handles for the assignment machinery, everything else
//! is already a value. The register is restored on every exit path,
//! including error and non-local-jump paths.

use std::rc::Rc;

use crate::ast::{Expression, ObjectKey, Program, Statement};
use crate::token::{Literal, Token, TokenKind};

mod environment;
mod error;
mod value;

pub use environment::Env;
pub use error::RuntimeError;
pub use value::{Callable, Indexable, ScriptObject, Value};

use value::ScriptFunction;

/// Outcome of one statement, bubbled through enclosing blocks.
enum Signal {
    None,
    Break,
    Continue,
    Return(Value),
}

/// Expression result: either a plain value or a writable handle.
enum Place {
    Value(Value),
    Variable { env: Env, name: String },
    Accessor { object: Rc<dyn Indexable>, key: Value },
}

impl Place {
    fn read(&self) -> Result<Value, RuntimeError> {
        match self {
            Place::Value(value) => Ok(value.clone()),
            Place::Variable { env, name } => env.get(name),
            Place::Accessor { object, key } => Ok(object.get(key)),
        }
    }

    fn write(&self, value: Value) -> Result<(), RuntimeError> {
        match self {
            Place::Value(_) => Err(RuntimeError::NotAssignable),
            Place::Variable { env, name } => env.assign(name, value),
            Place::Accessor { object, key } => {
                object.set(key.clone(), value);
                Ok(())
            }
        }
    }
}

pub struct Evaluator {
    env: Env,
}

impl Evaluator {
    pub fn new() -> Self {
        Self { env: Env::new() }
    }

    /// Runs the program against `env`. The evaluator's environment
    /// register is restored afterwards even when execution fails.
    pub fn execute(&mut self, program: &Program, env: Env) -> Result<(), RuntimeError> {
        let saved = std::mem::replace(&mut self.env, env);
        let result = self.exec_sequence(&program.statements);
        self.env = saved;
        match result? {
            Signal::None => Ok(()),
            Signal::Break => Err(RuntimeError::StrayBreakContinue { keyword: "break" }),
            Signal::Continue => Err(RuntimeError::StrayBreakContinue {
                keyword: "continue",
            }),
            Signal::Return(_) => Err(RuntimeError::StrayBreakContinue { keyword: "return" }),
        }
    }

    fn exec_sequence(&mut self, statements: &[Statement]) -> Result<Signal, RuntimeError> {
        for statement in statements {
            match self.exec_statement(statement)? {
                Signal::None => {}
                signal => return Ok(signal),
            }
        }
        Ok(Signal::None)
    }

    fn exec_block(&mut self, statements: &[Statement]) -> Result<Signal, RuntimeError> {
        let saved = self.env.clone();
        self.env = saved.child();
        let result = self.exec_sequence(statements);
        self.env = saved;
        result
    }

    /// Entry point for user-defined function calls: the body runs with the
    /// register switched to `frame` (parameters over the closure's
    /// captured environment), then the register is restored.
    pub(crate) fn run_function_body(
        &mut self,
        body: &[Statement],
        frame: Env,
    ) -> Result<Value, RuntimeError> {
        let saved = std::mem::replace(&mut self.env, frame);
        let result = self.exec_block(body);
        self.env = saved;
        match result? {
            Signal::Return(value) => Ok(value),
            Signal::None => Ok(Value::Nil),
            Signal::Break => Err(RuntimeError::StrayBreakContinue { keyword: "break" }),
            Signal::Continue => Err(RuntimeError::StrayBreakContinue {
                keyword: "continue",
            }),
        }
    }

    fn exec_statement(&mut self, statement: &Statement) -> Result<Signal, RuntimeError> {
        match statement {
            Statement::Empty => Ok(Signal::None),
            Statement::Expr(expression) => {
                self.eval_value(expression)?;
                Ok(Signal::None)
            }
            Statement::Assignment { op, lhs, rhs } => {
                self.exec_assignment(op, lhs, rhs)?;
                Ok(Signal::None)
            }
            Statement::VarDecl { name, initializer } => {
                let value = self.eval_value(initializer)?;
                self.env.declare(identifier_text(name)?, value)?;
                Ok(Signal::None)
            }
            Statement::Return(expression) => {
                let value = self.eval_value(expression)?;
                Ok(Signal::Return(value))
            }
            Statement::Break => Ok(Signal::Break),
            Statement::Continue => Ok(Signal::Continue),
            Statement::Block(statements) => self.exec_block(statements),
            Statement::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.eval_value(condition)?.is_truthy() {
                    self.exec_statement(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.exec_statement(else_branch)
                } else {
                    Ok(Signal::None)
                }
            }
            Statement::While { condition, body } => {
                while self.eval_value(condition)?.is_truthy() {
                    match self.exec_statement(body)? {
                        Signal::None | Signal::Continue => {}
                        Signal::Break => break,
                        ret @ Signal::Return(_) => return Ok(ret),
                    }
                }
                Ok(Signal::None)
            }
            Statement::For {
                init,
                condition,
                step,
                body,
            } => {
                // The whole loop gets one frame so an init declaration is
                // scoped to it.
                let saved = self.env.clone();
                self.env = saved.child();
                let result = self.run_for(init.as_deref(), condition.as_ref(), step.as_deref(), body);
                self.env = saved;
                result
            }
        }
    }

    fn run_for(
        &mut self,
        init: Option<&Statement>,
        condition: Option<&Expression>,
        step: Option<&Statement>,
        body: &Statement,
    ) -> Result<Signal, RuntimeError> {
        if let Some(init) = init {
            self.exec_statement(init)?;
        }
        loop {
            let proceed = match condition {
                Some(condition) => self.eval_value(condition)?.is_truthy(),
                None => true,
            };
            if !proceed {
                break;
            }
            match self.exec_statement(body)? {
                Signal::None | Signal::Continue => {}
                Signal::Break => break,
                ret @ Signal::Return(_) => return Ok(ret),
            }
            if let Some(step) = step {
                self.exec_statement(step)?;
            }
        }
        Ok(Signal::None)
    }

    fn exec_assignment(
        &mut self,
        op: &Token,
        lhs: &Expression,
        rhs: &Expression,
    ) -> Result<(), RuntimeError> {
        let place = self.eval_place(lhs)?;
        if matches!(place, Place::Value(_)) {
            return Err(RuntimeError::NotAssignable);
        }
        let value = self.eval_value(rhs)?;
        let value = match op.kind {
            TokenKind::Assign => value,
            _ => compound_assign(op, place.read()?, value)?,
        };
        place.write(value)
    }

    fn eval_value(&mut self, expression: &Expression) -> Result<Value, RuntimeError> {
        self.eval_place(expression)?.read()
    }

    fn eval_place(&mut self, expression: &Expression) -> Result<Place, RuntimeError> {
        match expression {
            Expression::Literal(token) => literal_value(token).map(Place::Value),
            Expression::Identifier(token) => Ok(Place::Variable {
                env: self.env.clone(),
                name: identifier_text(token)?.to_string(),
            }),
            Expression::ObjectDef { pairs } => self.eval_object(pairs).map(Place::Value),
            Expression::FunctionDef { params, body } => {
                let params = params
                    .iter()
                    .map(|param| identifier_text(param).map(str::to_string))
                    .collect::<Result<Vec<_>, _>>()?;
                let function =
                    ScriptFunction::new(params, Rc::new(body.clone()), self.env.clone());
                Ok(Place::Value(Value::Function(Rc::new(function))))
            }
            Expression::Unary { op, rhs } => self.eval_unary(op, rhs).map(Place::Value),
            Expression::Binary { op, lhs, rhs } => {
                self.eval_binary(op, lhs, rhs).map(Place::Value)
            }
            Expression::Call { callee, args } => self.eval_call(callee, args).map(Place::Value),
            Expression::BracketAccess { lhs, index } => {
                let object = self.expect_object(lhs, "index access")?;
                let key = self.eval_value(index)?;
                Ok(Place::Accessor { object, key })
            }
            Expression::DotAccess { lhs, ident } => {
                let object = self.expect_object(lhs, "member access")?;
                let key = Value::string(identifier_text(ident)?);
                Ok(Place::Accessor { object, key })
            }
        }
    }

    fn eval_object(&mut self, pairs: &[(ObjectKey, Expression)]) -> Result<Value, RuntimeError> {
        let object = ScriptObject::new();
        for (key, value_expr) in pairs {
            let key = match key {
                ObjectKey::Identifier(token) => Value::string(identifier_text(token)?),
                ObjectKey::Computed(expression) => self.eval_value(expression)?,
            };
            let value = self.eval_value(value_expr)?;
            object.set(key, value);
        }
        Ok(Value::Object(Rc::new(object)))
    }

    fn eval_call(
        &mut self,
        callee: &Expression,
        args: &[Expression],
    ) -> Result<Value, RuntimeError> {
        let callable = match self.eval_value(callee)? {
            Value::Function(callable) => callable,
            other => {
                return Err(RuntimeError::type_mismatch(
                    "function call",
                    other.type_name(),
                ));
            }
        };
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.eval_value(arg)?);
        }
        callable.call(self, values)
    }

    fn expect_object(
        &mut self,
        expression: &Expression,
        operation: &str,
    ) -> Result<Rc<dyn Indexable>, RuntimeError> {
        match self.eval_value(expression)? {
            Value::Object(object) => Ok(object),
            other => Err(RuntimeError::type_mismatch(operation, other.type_name())),
        }
    }

    fn eval_unary(&mut self, op: &Token, rhs: &Expression) -> Result<Value, RuntimeError> {
        let value = self.eval_value(rhs)?;
        match op.kind {
            TokenKind::Bang => Ok(Value::Bool(!value.is_truthy())),
            TokenKind::Minus => match value {
                Value::Number(n) => Ok(Value::Number(-n)),
                other => Err(RuntimeError::type_mismatch(
                    "unary '-'",
                    other.type_name(),
                )),
            },
            // Unary '+' is the identity on any value, matching the
            // reference behavior.
            TokenKind::Plus => Ok(value),
            _ => Err(RuntimeError::internal(format!(
                "unexpected unary operator {:?}",
                op.kind
            ))),
        }
    }

    fn eval_binary(
        &mut self,
        op: &Token,
        lhs: &Expression,
        rhs: &Expression,
    ) -> Result<Value, RuntimeError> {
        // Both operands always evaluate, '&&' and '||' included: the
        // language has no short-circuit.
        let left = self.eval_value(lhs)?;
        let right = self.eval_value(rhs)?;
        match op.kind {
            TokenKind::Plus => match (left, right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
                (Value::Str(a), Value::Str(b)) => {
                    Ok(Value::string(format!("{a}{b}")))
                }
                (left, right) => Err(binary_mismatch(op, &left, &right)),
            },
            TokenKind::Minus => numeric(op, left, right, |a, b| Value::Number(a - b)),
            TokenKind::Star => numeric(op, left, right, |a, b| Value::Number(a * b)),
            TokenKind::Slash => numeric(op, left, right, |a, b| Value::Number(a / b)),
            TokenKind::Percent => numeric(op, left, right, |a, b| Value::Number(a % b)),
            TokenKind::Less => numeric(op, left, right, |a, b| Value::Bool(a < b)),
            TokenKind::LessEqual => numeric(op, left, right, |a, b| Value::Bool(a <= b)),
            TokenKind::Greater => numeric(op, left, right, |a, b| Value::Bool(a > b)),
            TokenKind::GreaterEqual => numeric(op, left, right, |a, b| Value::Bool(a >= b)),
            TokenKind::EqualEqual => Ok(Value::Bool(left == right)),
            TokenKind::BangEqual => Ok(Value::Bool(left != right)),
            TokenKind::Caret => Ok(Value::Bool(left.is_truthy() ^ right.is_truthy())),
            TokenKind::AndAnd => Ok(Value::Bool(left.is_truthy() && right.is_truthy())),
            TokenKind::OrOr => Ok(Value::Bool(left.is_truthy() || right.is_truthy())),
            _ => Err(RuntimeError::internal(format!(
                "unexpected binary operator {:?}",
                op.kind
            ))),
        }
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

fn numeric(
    op: &Token,
    left: Value,
    right: Value,
    apply: impl Fn(f64, f64) -> Value,
) -> Result<Value, RuntimeError> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok(apply(a, b)),
        (left, right) => Err(binary_mismatch(op, &left, &right)),
    }
}

fn binary_mismatch(op: &Token, left: &Value, right: &Value) -> RuntimeError {
    RuntimeError::type_mismatch(
        format!("operator {}", op.kind.name()),
        format!("{} and {}", left.type_name(), right.type_name()),
    )
}

fn compound_assign(op: &Token, current: Value, value: Value) -> Result<Value, RuntimeError> {
    match (op.kind, current, value) {
        (TokenKind::PlusAssign, Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
        (TokenKind::PlusAssign, Value::Str(a), Value::Str(b)) => {
            Ok(Value::string(format!("{a}{b}")))
        }
        (TokenKind::MinusAssign, Value::Number(a), Value::Number(b)) => Ok(Value::Number(a - b)),
        (TokenKind::StarAssign, Value::Number(a), Value::Number(b)) => Ok(Value::Number(a * b)),
        (TokenKind::SlashAssign, Value::Number(a), Value::Number(b)) => Ok(Value::Number(a / b)),
        (TokenKind::PercentAssign, Value::Number(a), Value::Number(b)) => {
            Ok(Value::Number(a % b))
        }
        (TokenKind::PlusAssign
        | TokenKind::MinusAssign
        | TokenKind::StarAssign
        | TokenKind::SlashAssign
        | TokenKind::PercentAssign, current, value) => Err(binary_mismatch(op, &current, &value)),
        (kind, _, _) => Err(RuntimeError::internal(format!(
            "unexpected assignment operator {kind:?}"
        ))),
    }
}

fn literal_value(token: &Token) -> Result<Value, RuntimeError> {
    match &token.literal {
        Some(Literal::Number(n)) => Ok(Value::Number(*n)),
        Some(Literal::Str(s)) => Ok(Value::string(s)),
        Some(Literal::Bool(b)) => Ok(Value::Bool(*b)),
        Some(Literal::Nil) => Ok(Value::Nil),
        None => Err(RuntimeError::internal(format!(
            "literal token {:?} has no payload",
            token.kind
        ))),
    }
}

fn identifier_text(token: &Token) -> Result<&str, RuntimeError> {
    token.identifier_name().ok_or_else(|| {
        RuntimeError::internal(format!("expected identifier token, got {:?}", token.kind))
    })
}

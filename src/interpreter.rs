//! The evaluator: executes statements, evaluates expressions, and manages
//! the environment chain as blocks and calls are entered and left.
//!
//! Two design points carry most of the weight here:
//!
//! - **`Flow`** — statement execution returns `Flow::Normal` or
//!   `Flow::Return(value)`. A `return` deep inside a function body is an
//!   ordinary value propagated outward by every enclosing statement until
//!   the function-call boundary converts it into the call's result. It is
//!   never an error and never observable past that boundary.
//! - **Environment discipline** — `execute_block` swaps the current frame
//!   in, runs the statements, and swaps the previous frame back on *every*
//!   exit path (normal completion, `Return`, or a propagating runtime
//!   error). The number of frames pushed at run time exactly mirrors the
//!   scopes the resolver observed, which is what makes the distance table
//!   valid.

use std::cell::RefCell;
use std::io::{self, Write};
use std::mem;
use std::rc::Rc;

use chrono::Utc;
use log::{debug, info};

use crate::environment::Environment;
use crate::error::{Result, SkriftError};
use crate::parser::{Expr, ExprId, FunctionDecl, LiteralValue, Stmt};
use crate::resolver::Locals;
use crate::token::{Token, TokenType};
use crate::value::Value;

/// Outcome of executing a single statement.
#[derive(Debug)]
pub enum Flow<'a> {
    /// The statement ran to completion; continue with the next one.
    Normal,

    /// A `return` was executed; unwind to the nearest function-call
    /// boundary, carrying the value.
    Return(Value<'a>),
}

/// Tree-walking evaluator. Generic over its output sink so tests can capture
/// `print` output; the driver uses stdout.
pub struct Interpreter<'a, W: Write = io::Stdout> {
    globals: Rc<RefCell<Environment<'a>>>,
    environment: Rc<RefCell<Environment<'a>>>,
    locals: Locals,
    output: W,
}

impl<'a> Interpreter<'a, io::Stdout> {
    /// An interpreter printing to stdout, with the native functions
    /// pre-seeded into the globals frame.
    pub fn new() -> Self {
        Self::with_output(io::stdout())
    }
}

impl<'a> Default for Interpreter<'a, io::Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, W: Write> Interpreter<'a, W> {
    /// An interpreter writing `print` output to `output`.
    pub fn with_output(output: W) -> Self {
        info!("Initializing Interpreter");

        let globals = Rc::new(RefCell::new(Environment::new()));

        globals.borrow_mut().define(
            "clock",
            Value::NativeFunction {
                name: "clock".to_string(),
                arity: 0,
                func: |_args| {
                    let now = Utc::now();
                    Ok(Value::Number(now.timestamp_millis() as f64 / 1000.0))
                },
            },
        );

        Self {
            environment: Rc::clone(&globals),
            globals,
            locals: Locals::new(),
            output,
        }
    }

    /// Interprets a program: installs the resolver's distance table, then
    /// executes statements in order. The first runtime error stops this call
    /// (remaining statements are skipped) and is returned to the caller.
    pub fn interpret(&mut self, statements: &[Stmt<'a>], locals: Locals) -> Result<()> {
        debug!("Interpreting {} statements", statements.len());

        self.locals = locals;

        for statement in statements {
            match self.execute(statement)? {
                Flow::Normal => {}

                // Top-level `return` is rejected by the resolver; if the
                // caller skipped resolution, stop quietly.
                Flow::Return(_) => break,
            }
        }

        info!("Interpretation completed");
        Ok(())
    }

    /// Lookup a name in the globals frame. Introspection hook for tests and
    /// embedders.
    pub fn get_global(&self, name: &str) -> Option<Value<'a>> {
        self.globals.borrow().get_local(name)
    }

    // ─────────────────────────── statements ────────────────────────────

    fn execute(&mut self, stmt: &Stmt<'a>) -> Result<Flow<'a>> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
                Ok(Flow::Normal)
            }

            Stmt::Print(expr) => {
                let value = self.evaluate(expr)?;
                writeln!(self.output, "{}", value)?;
                Ok(Flow::Normal)
            }

            Stmt::Var { name, initializer } => {
                let value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                debug!("Defining variable '{}' = {}", name.lexeme, value);

                self.environment.borrow_mut().define(name.lexeme, value);
                Ok(Flow::Normal)
            }

            Stmt::Block(statements) => {
                let env = Rc::new(RefCell::new(Environment::with_enclosing(Rc::clone(
                    &self.environment,
                ))));

                self.execute_block(statements, env)
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if is_truthy(&self.evaluate(condition)?) {
                    self.execute(then_branch)
                } else if let Some(else_stmt) = else_branch {
                    self.execute(else_stmt)
                } else {
                    Ok(Flow::Normal)
                }
            }

            Stmt::While { condition, body } => {
                while is_truthy(&self.evaluate(condition)?) {
                    match self.execute(body)? {
                        Flow::Normal => {}
                        ret @ Flow::Return(_) => return Ok(ret),
                    }
                }

                Ok(Flow::Normal)
            }

            Stmt::Function(declaration) => {
                debug!("Defining function '{}'", declaration.name.lexeme);

                // The closure is the environment active *now*, at the
                // declaration site. Because the frame is shared by
                // reference, the binding below is already visible through
                // the closure, which is what makes recursion work.
                let function = Value::Function {
                    declaration: Rc::clone(declaration),
                    closure: Rc::clone(&self.environment),
                };

                self.environment
                    .borrow_mut()
                    .define(declaration.name.lexeme, function);
                Ok(Flow::Normal)
            }

            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                debug!("Returning {}", value);

                Ok(Flow::Return(value))
            }
        }
    }

    /// Run `statements` with `env` as the current frame, restoring the
    /// previous frame on every exit path.
    fn execute_block(
        &mut self,
        statements: &[Stmt<'a>],
        env: Rc<RefCell<Environment<'a>>>,
    ) -> Result<Flow<'a>> {
        let previous = mem::replace(&mut self.environment, env);

        let mut result = Ok(Flow::Normal);

        for statement in statements {
            match self.execute(statement) {
                Ok(Flow::Normal) => continue,
                other => {
                    result = other;
                    break;
                }
            }
        }

        self.environment = previous;
        result
    }

    // ─────────────────────────── expressions ───────────────────────────

    /// Evaluates an expression and returns a [`Value`].
    pub fn evaluate(&mut self, expr: &Expr<'a>) -> Result<Value<'a>> {
        match expr {
            Expr::Literal(literal) => Ok(evaluate_literal(literal)),

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Unary { operator, right } => self.evaluate_unary(operator, right),

            Expr::Binary {
                left,
                operator,
                right,
            } => self.evaluate_binary(left, operator, right),

            Expr::Logical {
                left,
                operator,
                right,
            } => self.evaluate_logical(left, operator, right),

            Expr::Variable { id, name } => self.look_up_variable(*id, name),

            Expr::Assign { id, name, value } => {
                let value = self.evaluate(value)?;

                if let Some(&distance) = self.locals.get(id) {
                    Environment::assign_at(&self.environment, distance, name, value.clone())?;
                } else {
                    self.globals.borrow_mut().assign(name, value.clone())?;
                }

                Ok(value)
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => self.evaluate_call(callee, paren, arguments),
        }
    }

    fn evaluate_unary(&mut self, operator: &Token<'a>, right: &Expr<'a>) -> Result<Value<'a>> {
        let right = self.evaluate(right)?;

        match operator.token_type {
            TokenType::MINUS => match right {
                Value::Number(n) => Ok(Value::Number(-n)),
                _ => Err(SkriftError::runtime(
                    operator.line,
                    format!("Operand must be a number for operator '{}'", operator.lexeme),
                )),
            },

            TokenType::BANG => Ok(Value::Bool(!is_truthy(&right))),

            _ => Err(SkriftError::runtime(
                operator.line,
                format!("Invalid unary operator '{}'", operator.lexeme),
            )),
        }
    }

    fn evaluate_binary(
        &mut self,
        left: &Expr<'a>,
        operator: &Token<'a>,
        right: &Expr<'a>,
    ) -> Result<Value<'a>> {
        let left = self.evaluate(left)?;
        let right = self.evaluate(right)?;

        match operator.token_type {
            // `+` is overloaded: two numbers add, two strings concatenate.
            TokenType::PLUS => match (left, right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
                (Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),
                _ => Err(SkriftError::runtime(
                    operator.line,
                    "Operands must be both of type string or number",
                )),
            },

            TokenType::MINUS => {
                let (a, b) = number_operands(operator, left, right)?;
                Ok(Value::Number(a - b))
            }

            TokenType::STAR => {
                let (a, b) = number_operands(operator, left, right)?;
                Ok(Value::Number(a * b))
            }

            // IEEE semantics: dividing by zero yields an infinity or NaN.
            TokenType::SLASH => {
                let (a, b) = number_operands(operator, left, right)?;
                Ok(Value::Number(a / b))
            }

            TokenType::GREATER => {
                let (a, b) = number_operands(operator, left, right)?;
                Ok(Value::Bool(a > b))
            }

            TokenType::GREATER_EQUAL => {
                let (a, b) = number_operands(operator, left, right)?;
                Ok(Value::Bool(a >= b))
            }

            TokenType::LESS => {
                let (a, b) = number_operands(operator, left, right)?;
                Ok(Value::Bool(a < b))
            }

            TokenType::LESS_EQUAL => {
                let (a, b) = number_operands(operator, left, right)?;
                Ok(Value::Bool(a <= b))
            }

            TokenType::EQUAL_EQUAL => Ok(Value::Bool(is_equal(&left, &right))),

            TokenType::BANG_EQUAL => Ok(Value::Bool(!is_equal(&left, &right))),

            _ => Err(SkriftError::runtime(
                operator.line,
                format!("Invalid binary operator '{}'", operator.lexeme),
            )),
        }
    }

    /// `and` / `or` short-circuit on the truthiness of the left operand and
    /// yield the *actual* operand value, never a coerced boolean.
    fn evaluate_logical(
        &mut self,
        left: &Expr<'a>,
        operator: &Token<'a>,
        right: &Expr<'a>,
    ) -> Result<Value<'a>> {
        let left = self.evaluate(left)?;

        match operator.token_type {
            TokenType::OR if is_truthy(&left) => Ok(left),
            TokenType::AND if !is_truthy(&left) => Ok(left),
            _ => self.evaluate(right),
        }
    }

    fn evaluate_call(
        &mut self,
        callee: &Expr<'a>,
        paren: &Token<'a>,
        arguments: &[Expr<'a>],
    ) -> Result<Value<'a>> {
        let callee = self.evaluate(callee)?;

        let mut args: Vec<Value<'a>> = Vec::with_capacity(arguments.len());
        for argument in arguments {
            args.push(self.evaluate(argument)?);
        }

        match callee {
            Value::NativeFunction { name, arity, func } => {
                debug!("Calling native function '{}'", name);

                check_arity(arity, args.len(), paren)?;

                func(&args).map_err(|message| SkriftError::runtime(paren.line, message))
            }

            Value::Function {
                declaration,
                closure,
            } => {
                debug!("Calling function '{}'", declaration.name.lexeme);

                check_arity(declaration.params.len(), args.len(), paren)?;

                self.call_function(&declaration, &closure, args)
            }

            _ => Err(SkriftError::runtime(paren.line, "Can only call functions")),
        }
    }

    /// Invoke a user function: a fresh frame chained to the *captured*
    /// closure (not the caller's frame), parameters bound positionally, body
    /// executed inside it. `Flow::Return` is converted into the call result.
    fn call_function(
        &mut self,
        declaration: &Rc<FunctionDecl<'a>>,
        closure: &Rc<RefCell<Environment<'a>>>,
        args: Vec<Value<'a>>,
    ) -> Result<Value<'a>> {
        let env = Rc::new(RefCell::new(Environment::with_enclosing(Rc::clone(
            closure,
        ))));

        for (param, value) in declaration.params.iter().zip(args) {
            env.borrow_mut().define(param.lexeme, value);
        }

        match self.execute_block(&declaration.body, env)? {
            Flow::Return(value) => Ok(value),
            Flow::Normal => Ok(Value::Nil),
        }
    }

    fn look_up_variable(&self, id: ExprId, name: &Token<'a>) -> Result<Value<'a>> {
        if let Some(&distance) = self.locals.get(&id) {
            Environment::get_at(&self.environment, distance, name)
        } else {
            // Not in the table ⇒ the resolver saw a global. Reading the
            // globals frame directly keeps a later shadowing local in some
            // intervening scope from being picked up.
            self.globals.borrow().get(name)
        }
    }
}

// ─────────────────────────── free helpers ───────────────────────────

fn evaluate_literal<'a>(literal: &LiteralValue) -> Value<'a> {
    match literal {
        LiteralValue::Number(n) => Value::Number(*n),
        LiteralValue::Str(s) => Value::String(s.clone()),
        LiteralValue::True => Value::Bool(true),
        LiteralValue::False => Value::Bool(false),
        LiteralValue::Nil => Value::Nil,
    }
}

/// `nil` and `false` are falsy; every other value (including `0` and `""`)
/// is truthy.
fn is_truthy(value: &Value<'_>) -> bool {
    match value {
        Value::Nil => false,
        Value::Bool(b) => *b,
        _ => true,
    }
}

/// Structural equality per the value model; never type-coerced.
fn is_equal<'a>(left: &Value<'a>, right: &Value<'a>) -> bool {
    left == right
}

fn number_operands<'a>(
    operator: &Token<'a>,
    left: Value<'a>,
    right: Value<'a>,
) -> Result<(f64, f64)> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok((a, b)),
        _ => Err(SkriftError::runtime(
            operator.line,
            format!("Operands must be numbers for operator '{}'", operator.lexeme),
        )),
    }
}

fn check_arity(expected: usize, actual: usize, paren: &Token<'_>) -> Result<()> {
    if actual != expected {
        return Err(SkriftError::runtime(
            paren.line,
            format!("Expected {} arguments but got {}", expected, actual),
        ));
    }

    Ok(())
}

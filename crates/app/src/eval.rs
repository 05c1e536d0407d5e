//! Expression evaluator — walks the typed script tree into [`Value`]s.
//!
//! Intermediate results live in the [`ValuePool`]; every operator
//! consumes (frees) its operand cells and allocates a fresh cell for the
//! result, so a completed evaluation leaves the pool empty.
//!
//! Coercion rules:
//! - `+` adds when both operands read as integers, otherwise both are
//!   stringified and concatenated.
//! - The remaining arithmetic and logical operators require integer
//!   operands; a failed parse is an [`EvalError::NotAnInteger`] rather
//!   than the silent garbage of older gateways.
//! - Comparisons are numeric when both operands read as integers and
//!   ordinal string comparisons otherwise; all yield 0/1.
//! - Unary negation negates integers and leaves strings untouched.

use feedgate_domain::script::{BinaryOp, Expr, FieldRef, UnaryOp};
use feedgate_domain::table::store::TableStore;
use feedgate_domain::value::Value;
use feedgate_domain::value::pool::{ValueId, ValuePool};

use crate::context::GatewayContext;

/// Errors surfaced by expression evaluation.
///
/// The engine logs these and skips the failing action; they never abort
/// a trigger.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EvalError {
    /// An arithmetic or logical operand did not read as an integer.
    #[error("operand `{text}` is not an integer")]
    NotAnInteger { text: String },

    /// Integer division or remainder by zero.
    #[error("division by zero")]
    DivisionByZero,
}

/// Tree-walking evaluator over the table store and value pool.
pub struct Evaluator<'a> {
    tables: &'a mut TableStore,
    pool: &'a mut ValuePool,
}

impl<'a> Evaluator<'a> {
    #[must_use]
    pub fn new(ctx: &'a mut GatewayContext) -> Self {
        Self {
            tables: &mut ctx.tables,
            pool: &mut ctx.pool,
        }
    }

    /// Evaluate `expr` into a pooled cell.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError`] for integer coercion failures; lookup misses
    /// and unknown functions are non-fatal and yield [`Value::None`].
    pub fn eval(&mut self, expr: &Expr) -> Result<ValueId, EvalError> {
        match expr {
            Expr::Int { value } => Ok(self.pool.alloc(Value::Int(*value))),
            Expr::Str { value } => Ok(self.pool.alloc(Value::from(value.as_str()))),
            Expr::Field { table, field } => {
                let value = self.read_field(table, field);
                Ok(self.pool.alloc(value))
            }
            Expr::Unary { op, operand } => {
                let id = self.eval(operand)?;
                let value = self.pool.free(id).unwrap_or_default();
                let result = match (op, value) {
                    (UnaryOp::Neg, Value::Int(i)) => Value::Int(i.wrapping_neg()),
                    // Negation of a string is a documented no-op.
                    (UnaryOp::Neg, other) => other,
                };
                Ok(self.pool.alloc(result))
            }
            Expr::Binary { op, left, right } => {
                let left_id = self.eval(left)?;
                let right_id = match self.eval(right) {
                    Ok(id) => id,
                    Err(err) => {
                        self.pool.free(left_id);
                        return Err(err);
                    }
                };
                let a = self.pool.free(left_id).unwrap_or_default();
                let b = self.pool.free(right_id).unwrap_or_default();
                let result = apply_binary(*op, a, b)?;
                Ok(self.pool.alloc(result))
            }
            Expr::Call { function, args } => {
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    let id = self.eval(arg)?;
                    values.push(self.pool.free(id).unwrap_or_default());
                }
                Ok(self.pool.alloc(call_builtin(function, values)))
            }
        }
    }

    /// Evaluate `expr` and drain the result out of the pool.
    ///
    /// # Errors
    ///
    /// Same as [`eval`](Self::eval).
    pub fn eval_value(&mut self, expr: &Expr) -> Result<Value, EvalError> {
        let id = self.eval(expr)?;
        Ok(self.pool.free(id).unwrap_or_default())
    }

    /// Evaluate `expr` to its string form.
    ///
    /// # Errors
    ///
    /// Same as [`eval`](Self::eval).
    pub fn eval_text(&mut self, expr: &Expr) -> Result<String, EvalError> {
        self.eval_value(expr).map(Value::into_text)
    }

    /// Evaluate `expr` as a condition. Values that do not read as an
    /// integer count as false.
    ///
    /// # Errors
    ///
    /// Same as [`eval`](Self::eval).
    pub fn eval_bool(&mut self, expr: &Expr) -> Result<bool, EvalError> {
        Ok(self.eval_value(expr)?.as_bool().unwrap_or(false))
    }

    fn read_field(&mut self, table: &str, field: &FieldRef) -> Value {
        let Some(tbl) = self.tables.get(table) else {
            tracing::debug!(table, "field read from unknown table");
            return Value::None;
        };
        let text = match field {
            FieldRef::Index(index) => tbl.field_by_index(*index),
            FieldRef::Name(name) => tbl.field(name),
        };
        match text {
            Some(t) => Value::from(t),
            None => {
                tracing::debug!(table, ?field, "field not found");
                Value::None
            }
        }
    }
}

fn apply_binary(op: BinaryOp, a: Value, b: Value) -> Result<Value, EvalError> {
    if op.is_comparison() {
        return Ok(compare(op, &a, &b));
    }

    if op == BinaryOp::Add {
        if let (Some(x), Some(y)) = (a.as_int(), b.as_int()) {
            return Ok(Value::Int(x.wrapping_add(y)));
        }
        let mut text = a.into_text();
        text.push_str(&b.into_text());
        return Ok(Value::Str(text));
    }

    let (x, y) = both_ints(a, b)?;
    let result = match op {
        BinaryOp::Sub => x.wrapping_sub(y),
        BinaryOp::Mul => x.wrapping_mul(y),
        BinaryOp::Div => {
            if y == 0 {
                return Err(EvalError::DivisionByZero);
            }
            x.wrapping_div(y)
        }
        BinaryOp::Rem => {
            if y == 0 {
                return Err(EvalError::DivisionByZero);
            }
            x.wrapping_rem(y)
        }
        BinaryOp::Or => i64::from(x != 0 || y != 0),
        BinaryOp::And => i64::from(x != 0 && y != 0),
        _ => unreachable!("comparison and Add handled above"),
    };
    Ok(Value::Int(result))
}

fn both_ints(a: Value, b: Value) -> Result<(i64, i64), EvalError> {
    match (a.as_int(), b.as_int()) {
        (Some(x), Some(y)) => Ok((x, y)),
        (None, _) => Err(EvalError::NotAnInteger { text: a.into_text() }),
        (_, None) => Err(EvalError::NotAnInteger { text: b.into_text() }),
    }
}

fn compare(op: BinaryOp, a: &Value, b: &Value) -> Value {
    let ordering = match (a.as_int(), b.as_int()) {
        (Some(x), Some(y)) => x.cmp(&y),
        _ => a.clone().into_text().cmp(&b.clone().into_text()),
    };
    let result = match op {
        BinaryOp::Eq => ordering.is_eq(),
        BinaryOp::Ne => ordering.is_ne(),
        BinaryOp::Lt => ordering.is_lt(),
        BinaryOp::Le => ordering.is_le(),
        BinaryOp::Ge => ordering.is_ge(),
        BinaryOp::Gt => ordering.is_gt(),
        _ => false,
    };
    Value::Int(i64::from(result))
}

/// Dispatch a built-in function by case-insensitive name, consuming its
/// argument values. Unknown names and missing arguments yield
/// [`Value::None`].
fn call_builtin(name: &str, mut args: Vec<Value>) -> Value {
    let arity = match name.to_ascii_uppercase().as_str() {
        "LENGTH" | "QUOTE" => 1,
        "TOKEN" | "LPAD" | "RPAD" => 3,
        _ => {
            tracing::warn!(function = name, "unknown function");
            return Value::None;
        }
    };
    if args.len() < arity {
        tracing::warn!(
            function = name,
            got = args.len(),
            expected = arity,
            "too few arguments"
        );
        return Value::None;
    }
    args.truncate(arity);

    match name.to_ascii_uppercase().as_str() {
        "LENGTH" => {
            let text = args.remove(0).into_text();
            Value::Int(text.chars().count() as i64)
        }
        "QUOTE" => {
            let text = args.remove(0).into_text();
            Value::Str(format!("\"{text}\""))
        }
        "TOKEN" => {
            let delim = args.remove(2).into_text();
            let n = args.remove(1).as_int().unwrap_or(0);
            let text = args.remove(0).into_text();
            Value::Str(token(&text, n, &delim))
        }
        "LPAD" => pad(args, true),
        "RPAD" => pad(args, false),
        _ => Value::None,
    }
}

/// 1-based `n`-th `delim`-separated token of `text`; out of range is "".
fn token(text: &str, n: i64, delim: &str) -> String {
    if n < 1 {
        return String::new();
    }
    let index = (n - 1) as usize;
    if delim.is_empty() {
        return if index == 0 { text.to_string() } else { String::new() };
    }
    text.split(delim)
        .nth(index)
        .map(str::to_string)
        .unwrap_or_default()
}

fn pad(mut args: Vec<Value>, left: bool) -> Value {
    let fill = args.remove(2).into_text();
    let min_len = args.remove(1).as_int().unwrap_or(0).max(0) as usize;
    let mut text = args.remove(0).into_text();
    if fill.is_empty() {
        return Value::Str(text);
    }
    while text.chars().count() < min_len {
        if left {
            text.insert_str(0, &fill);
        } else {
            text.push_str(&fill);
        }
    }
    Value::Str(text)
}

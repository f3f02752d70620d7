//! FILENAME: core/engine/src/evaluator.rs
//! PURPOSE: Evaluates compiled formula ASTs against a row.
//! CONTEXT: After a formula is compiled, this module traverses the tree and
//! computes the value of one cell. It resolves `colN` against the current
//! row and `total` against the hit count, applies operators, and dispatches
//! functions. `rowval` additionally reads every row of the current table.
//!
//! SEMANTICS:
//! - Null counts as 0 in arithmetic and as "" in text operations.
//! - `+` adds when both sides are numeric, otherwise concatenates text.
//! - Equality is exact for text; numbers and numeric text compare numerically.
//! - Ordering compares numbers numerically, text lexically, and mixed types
//!   by the total value ordering (Null < Number < Text < Boolean).
//! - `&&`, `||`, `?:`, IF, AND and OR evaluate lazily.

use std::cmp::Ordering;

use parser::{BinaryOperator, Expression, UnaryOperator, Value};

use crate::cell::CellValue;
use crate::error::FormulaError;
use crate::formula::{rowval_args, CompiledFormula, EvalContext};
use crate::functions;
use crate::row_filter::{ColumnSelector, RowAction, RowFilter};
use crate::value_key::compare_values;

type EvalResult = Result<CellValue, FormulaError>;

/// Loose equality shared by formulas and rowval filters.
pub fn values_equal(left: &CellValue, right: &CellValue) -> bool {
    match (left, right) {
        (CellValue::Null, CellValue::Null) => true,
        (CellValue::Number(l), CellValue::Number(r)) => l == r,
        (CellValue::Text(l), CellValue::Text(r)) => l == r,
        (CellValue::Boolean(l), CellValue::Boolean(r)) => l == r,
        (CellValue::Number(n), CellValue::Text(s)) | (CellValue::Text(s), CellValue::Number(n)) => {
            s.trim().parse::<f64>().map(|p| p == *n).unwrap_or(false)
        }
        _ => false,
    }
}

/// The formula evaluator for one row.
pub struct Evaluator<'f, 'c> {
    formula: &'f CompiledFormula,
    ctx: &'f EvalContext<'c>,
}

impl<'f, 'c> Evaluator<'f, 'c> {
    pub fn new(formula: &'f CompiledFormula, ctx: &'f EvalContext<'c>) -> Self {
        Evaluator { formula, ctx }
    }

    /// Evaluates an AST expression and returns the result.
    pub fn evaluate(&self, expr: &Expression) -> EvalResult {
        match expr {
            Expression::Literal(value) => Ok(self.eval_literal(value)),
            Expression::ColumnRef(index) => self.eval_column_ref(*index),
            Expression::Variable(name) => self.eval_variable(name),
            Expression::BinaryOp { left, op, right } => self.eval_binary_op(left, op, right),
            Expression::UnaryOp { op, operand } => self.eval_unary_op(op, operand),
            Expression::Conditional {
                condition,
                when_true,
                when_false,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.evaluate(when_true)
                } else {
                    self.evaluate(when_false)
                }
            }
            Expression::FunctionCall { name, args } => self.eval_function(name, args),
        }
    }

    fn eval_literal(&self, value: &Value) -> CellValue {
        match value {
            Value::Number(n) => CellValue::Number(*n),
            Value::String(s) => CellValue::Text(s.clone()),
            Value::Boolean(b) => CellValue::Boolean(*b),
            Value::Null => CellValue::Null,
        }
    }

    fn eval_column_ref(&self, index: usize) -> EvalResult {
        self.ctx
            .row
            .get(index)
            .cloned()
            .ok_or(FormulaError::ColumnOutOfRange {
                index,
                width: self.ctx.row.len(),
            })
    }

    fn eval_variable(&self, name: &str) -> EvalResult {
        match name {
            "TOTAL" => Ok(CellValue::Number(self.ctx.total_hits)),
            other => Err(FormulaError::UnknownVariable(other.to_lowercase())),
        }
    }

    /// Evaluates a binary operation.
    fn eval_binary_op(
        &self,
        left: &Expression,
        op: &BinaryOperator,
        right: &Expression,
    ) -> EvalResult {
        // Logical operators short-circuit
        match op {
            BinaryOperator::And => {
                let l = self.evaluate(left)?;
                if !l.is_truthy() {
                    return Ok(CellValue::Boolean(false));
                }
                return Ok(CellValue::Boolean(self.evaluate(right)?.is_truthy()));
            }
            BinaryOperator::Or => {
                let l = self.evaluate(left)?;
                if l.is_truthy() {
                    return Ok(CellValue::Boolean(true));
                }
                return Ok(CellValue::Boolean(self.evaluate(right)?.is_truthy()));
            }
            _ => {}
        }

        let l = self.evaluate(left)?;
        let r = self.evaluate(right)?;

        match op {
            BinaryOperator::Add => eval_add(&l, &r),
            BinaryOperator::Subtract => arithmetic(&l, &r, op, |a, b| Ok(a - b)),
            BinaryOperator::Multiply => arithmetic(&l, &r, op, |a, b| Ok(a * b)),
            BinaryOperator::Divide => arithmetic(&l, &r, op, |a, b| {
                if b == 0.0 {
                    Err(FormulaError::DivisionByZero)
                } else {
                    Ok(a / b)
                }
            }),
            BinaryOperator::Modulo => arithmetic(&l, &r, op, |a, b| {
                if b == 0.0 {
                    Err(FormulaError::DivisionByZero)
                } else {
                    Ok(a % b)
                }
            }),
            BinaryOperator::Power => arithmetic(&l, &r, op, |a, b| {
                let result = a.powf(b);
                if result.is_nan() || result.is_infinite() {
                    Err(FormulaError::TypeMismatch(format!("{} ^ {} is not a finite number", a, b)))
                } else {
                    Ok(result)
                }
            }),
            BinaryOperator::Concat => Ok(CellValue::Text(format!("{}{}", l.as_text(), r.as_text()))),
            BinaryOperator::Equal => Ok(CellValue::Boolean(values_equal(&l, &r))),
            BinaryOperator::NotEqual => Ok(CellValue::Boolean(!values_equal(&l, &r))),
            BinaryOperator::LessThan => Ok(CellValue::Boolean(compare(&l, &r).is_lt())),
            BinaryOperator::GreaterThan => Ok(CellValue::Boolean(compare(&l, &r).is_gt())),
            BinaryOperator::LessEqual => Ok(CellValue::Boolean(compare(&l, &r).is_le())),
            BinaryOperator::GreaterEqual => Ok(CellValue::Boolean(compare(&l, &r).is_ge())),
            BinaryOperator::And | BinaryOperator::Or => unreachable!("handled above"),
        }
    }

    /// Evaluates a unary operation.
    fn eval_unary_op(&self, op: &UnaryOperator, operand: &Expression) -> EvalResult {
        let val = self.evaluate(operand)?;
        match op {
            UnaryOperator::Negate => Ok(CellValue::Number(-numeric(&val, "-")?)),
            UnaryOperator::Not => Ok(CellValue::Boolean(!val.is_truthy())),
        }
    }

    /// Evaluates a function call.
    fn eval_function(&self, name: &str, args: &[Expression]) -> EvalResult {
        match name {
            "IF" => self.fn_if(args),
            "AND" => {
                for arg in args {
                    if !self.evaluate(arg)?.is_truthy() {
                        return Ok(CellValue::Boolean(false));
                    }
                }
                Ok(CellValue::Boolean(true))
            }
            "OR" => {
                for arg in args {
                    if self.evaluate(arg)?.is_truthy() {
                        return Ok(CellValue::Boolean(true));
                    }
                }
                Ok(CellValue::Boolean(false))
            }
            "ROWVAL" => self.fn_rowval(rowval_args(args)),
            _ => {
                let values = args
                    .iter()
                    .map(|arg| self.evaluate(arg))
                    .collect::<Result<Vec<_>, _>>()?;
                functions::call(name, &values)
            }
        }
    }

    // ==================== Lazy Functions ====================

    fn fn_if(&self, args: &[Expression]) -> EvalResult {
        if args.len() < 2 || args.len() > 3 {
            return Err(FormulaError::function(
                "if",
                format!("expected 2 to 3 arguments, got {}", args.len()),
            ));
        }

        if self.evaluate(&args[0])?.is_truthy() {
            self.evaluate(&args[1])
        } else if args.len() == 3 {
            self.evaluate(&args[2])
        } else {
            Ok(CellValue::Boolean(false))
        }
    }

    /// ROWVAL([base,] target, action[, fallback[, filter]])
    fn fn_rowval(&self, args: &[Expression]) -> EvalResult {
        if args.len() < 2 || args.len() > 4 {
            return Err(FormulaError::function(
                "rowval",
                format!("expected 2 to 4 arguments, got {}", args.len()),
            ));
        }

        let fallback = match args.get(2) {
            Some(arg) => self.evaluate(arg)?,
            None => CellValue::Null,
        };

        let Some(table) = self.ctx.table else {
            return Ok(fallback);
        };

        let context = self.formula.context();
        let target = match self.evaluate(&args[0])? {
            CellValue::Number(n) if n.is_finite() && n >= 0.0 => {
                ColumnSelector::Index(context.real_index(n as usize))
            }
            CellValue::Text(s) => ColumnSelector::parse(&s, context),
            other => {
                return Err(FormulaError::function(
                    "rowval",
                    format!("invalid target column '{}'", other.as_text()),
                ))
            }
        };
        let Some(target_index) = target.resolve(table.names) else {
            return Err(FormulaError::function("rowval", format!("unknown column {:?}", target)));
        };

        let Some(action) = RowAction::parse(&self.evaluate(&args[1])?.as_text()) else {
            return Ok(fallback);
        };

        let filter = match args.get(3) {
            None => None,
            Some(arg) => match self.evaluate(arg)? {
                CellValue::Null => None,
                spec => {
                    let text = spec.as_text();
                    match self.formula.row_filter(&text) {
                        Some(compiled) => Some(compiled),
                        None => Some(std::sync::Arc::new(RowFilter::parse(&text, context)?)),
                    }
                }
            },
        };

        let base = self.ctx.row;
        let values = table
            .rows
            .iter()
            .filter(|candidate| {
                filter
                    .as_ref()
                    .map_or(true, |f| f.matches(base, candidate, table.names))
            })
            .filter_map(|candidate| candidate.get(target_index));

        Ok(action.aggregate(values, fallback))
    }
}

// ==================== Operators ====================

fn numeric(value: &CellValue, op: &str) -> Result<f64, FormulaError> {
    match value {
        CellValue::Null => Ok(0.0),
        other => other.as_number().ok_or_else(|| {
            FormulaError::TypeMismatch(format!("'{}' is not a number for {}", other.as_text(), op))
        }),
    }
}

fn arithmetic(
    l: &CellValue,
    r: &CellValue,
    op: &BinaryOperator,
    f: impl Fn(f64, f64) -> Result<f64, FormulaError>,
) -> EvalResult {
    let symbol = op.to_string();
    let a = numeric(l, &symbol)?;
    let b = numeric(r, &symbol)?;
    f(a, b).map(CellValue::Number)
}

fn eval_add(l: &CellValue, r: &CellValue) -> EvalResult {
    let is_text = |v: &CellValue| matches!(v, CellValue::Text(s) if s.trim().parse::<f64>().is_err());
    if is_text(l) || is_text(r) {
        return Ok(CellValue::Text(format!("{}{}", l.as_text(), r.as_text())));
    }
    arithmetic(l, r, &BinaryOperator::Add, |a, b| Ok(a + b))
}

fn compare(l: &CellValue, r: &CellValue) -> Ordering {
    let number = |v: &CellValue| match v {
        CellValue::Number(n) => Some(*n),
        CellValue::Text(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match (l, r) {
        (CellValue::Text(a), CellValue::Text(b)) => a.cmp(b),
        _ => match (number(l), number(r)) {
            (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
            _ => compare_values(l, r),
        },
    }
}

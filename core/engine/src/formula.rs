//! FILENAME: core/engine/src/formula.rs
//! PURPOSE: Compiles computed-column formulas into immutable, evaluatable values.
//! CONTEXT: A formula is compiled once per configuration change and then
//! evaluated against every row of every leaf table.
//!
//! COMPILATION:
//! 1. Legacy `col[N]` references are rewritten to `colN`.
//! 2. The text is parsed into an AST.
//! 3. Every column reference is remapped through the split-cols "real index"
//!    (indices at or after the split column shift by one when per-split
//!    computed columns are enabled).
//! 4. Names are validated: only `total` is a variable; functions must exist;
//!    literal `rowval` filter specs are parsed now so malformed JSON fails here.
//! 5. The referenced indices are recorded.

use std::sync::Arc;

use log::debug;
use once_cell::sync::Lazy;
use parser::{Expression, Value};
use regex::Regex;
use rustc_hash::FxHashMap;

use crate::cell::CellValue;
use crate::error::FormulaError;
use crate::evaluator::Evaluator;
use crate::functions;
use crate::row_filter::RowFilter;

static LEGACY_COLUMN_REF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bcol\[\s*(\d+)\s*\]").expect("valid legacy column regex"));

/// Where the split-cols bucket sits and whether references shift around it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SplitColContext {
    pub split_index: Option<usize>,
    /// True when split-cols is active and computed columns are per split column.
    pub shift: bool,
}

impl SplitColContext {
    pub fn new(split_index: Option<usize>, computed_cols_per_split_col: bool) -> Self {
        SplitColContext {
            split_index,
            shift: split_index.is_some() && computed_cols_per_split_col,
        }
    }

    /// Maps a declared index to the physical index it refers to. Saturates
    /// at `usize::MAX`, which no row reaches.
    pub fn real_index(&self, index: usize) -> usize {
        match self.split_index {
            Some(split) if self.shift && index >= split => index.saturating_add(1),
            _ => index,
        }
    }
}

/// The rows of the table a formula is evaluated in, for `rowval`.
#[derive(Debug, Clone, Copy)]
pub struct RowTable<'a> {
    /// Column titles in logical order.
    pub names: &'a [String],
    /// Row values in logical order.
    pub rows: &'a [Vec<CellValue>],
}

/// Everything a formula can read while evaluating one row.
#[derive(Debug, Clone, Copy)]
pub struct EvalContext<'a> {
    /// The current (base) row, in logical order.
    pub row: &'a [CellValue],
    /// Bound to the `total` variable.
    pub total_hits: f64,
    pub table: Option<RowTable<'a>>,
}

impl<'a> EvalContext<'a> {
    pub fn new(row: &'a [CellValue], total_hits: f64) -> Self {
        EvalContext {
            row,
            total_hits,
            table: None,
        }
    }

    pub fn with_table(mut self, table: RowTable<'a>) -> Self {
        self.table = Some(table);
        self
    }

    /// Column names, or an empty slice without a table.
    pub fn names(&self) -> &'a [String] {
        self.table.map(|t| t.names).unwrap_or(&[])
    }
}

/// An immutable compiled formula.
#[derive(Debug, Clone)]
pub struct CompiledFormula {
    source: String,
    expr: Expression,
    referenced: Vec<usize>,
    context: SplitColContext,
    row_filters: FxHashMap<String, Arc<RowFilter>>,
}

/// Compiles `text` for the given split-cols layout.
pub fn compile(text: &str, context: &SplitColContext) -> Result<CompiledFormula, FormulaError> {
    let rewritten = LEGACY_COLUMN_REF.replace_all(text, "col$1");
    let parsed = parser::parse(&rewritten)?;
    let expr = parsed.map_column_refs(&|index| context.real_index(index));

    let mut row_filters = FxHashMap::default();
    validate(&expr, context, &mut row_filters)?;

    let mut referenced = Vec::new();
    expr.collect_column_refs(&mut referenced);
    referenced.sort_unstable();
    referenced.dedup();

    debug!(target: "FORMULA", "compiled '{}' referencing {:?}", text, referenced);

    Ok(CompiledFormula {
        source: text.to_string(),
        expr,
        referenced,
        context: *context,
        row_filters,
    })
}

/// Index of the first `rowval` argument after an optional leading `base`.
pub(crate) fn rowval_args(args: &[Expression]) -> &[Expression] {
    match args.first() {
        Some(Expression::Variable(name)) if name == "BASE" => &args[1..],
        _ => args,
    }
}

fn validate(
    expr: &Expression,
    context: &SplitColContext,
    row_filters: &mut FxHashMap<String, Arc<RowFilter>>,
) -> Result<(), FormulaError> {
    match expr {
        Expression::Literal(_) | Expression::ColumnRef(_) => Ok(()),
        Expression::Variable(name) if name == "TOTAL" => Ok(()),
        Expression::Variable(name) => Err(FormulaError::UnknownVariable(name.to_lowercase())),
        Expression::BinaryOp { left, right, .. } => {
            validate(left, context, row_filters)?;
            validate(right, context, row_filters)
        }
        Expression::UnaryOp { operand, .. } => validate(operand, context, row_filters),
        Expression::Conditional {
            condition,
            when_true,
            when_false,
        } => {
            validate(condition, context, row_filters)?;
            validate(when_true, context, row_filters)?;
            validate(when_false, context, row_filters)
        }
        Expression::FunctionCall { name, args } => {
            if !functions::is_known(name) {
                return Err(FormulaError::UnknownFunction(name.to_lowercase()));
            }
            let args = if name == "ROWVAL" {
                let args = rowval_args(args);
                if args.len() < 2 || args.len() > 4 {
                    return Err(FormulaError::function(
                        "rowval",
                        format!("expected 2 to 4 arguments, got {}", args.len()),
                    ));
                }
                if let Some(Expression::Literal(Value::String(spec))) = args.get(3) {
                    let filter = RowFilter::parse(spec, context)?;
                    row_filters.insert(spec.clone(), Arc::new(filter));
                }
                args
            } else {
                args.as_slice()
            };
            for arg in args {
                validate(arg, context, row_filters)?;
            }
            Ok(())
        }
    }
}

impl CompiledFormula {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn expression(&self) -> &Expression {
        &self.expr
    }

    /// Real column indices the formula reads, sorted and deduplicated.
    pub fn referenced(&self) -> &[usize] {
        &self.referenced
    }

    pub fn context(&self) -> &SplitColContext {
        &self.context
    }

    /// Row filter parsed at compile time when given as a literal.
    pub(crate) fn row_filter(&self, spec: &str) -> Option<Arc<RowFilter>> {
        self.row_filters.get(spec).cloned()
    }

    /// Evaluates against one row. Never panics; every failure is a `FormulaError`.
    pub fn evaluate(&self, ctx: &EvalContext<'_>) -> Result<CellValue, FormulaError> {
        Evaluator::new(self, ctx).evaluate(&self.expr)
    }
}

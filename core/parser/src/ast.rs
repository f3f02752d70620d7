//! FILENAME: core/parser/src/ast.rs
//! PURPOSE: Defines the Abstract Syntax Tree (AST) for formula expressions.
//! CONTEXT: After the Lexer tokenizes a formula string, the Parser converts
//! those tokens into this tree structure. The formula engine then rewrites
//! column references and evaluates the tree once per table row.
//!
//! SUPPORTED EXPRESSIONS:
//! - Literals: Numbers, Strings, Booleans, null
//! - Column references: col0, col12 (0-based position in the row)
//! - Variables: total
//! - Binary operations: + - * / % ^ & == != < > <= >= && ||
//! - Unary operations: - (negation), ! (not)
//! - Conditional: cond ? a : b
//! - Function calls: round(col1 / col2, 2), rowval("col1", "sum", 0)

/// Represents a parsed formula expression.
#[derive(Debug, PartialEq, Clone)]
pub enum Expression {
    /// A literal value: number, string, boolean or null.
    Literal(Value),

    /// A positional reference into the current row (`col3`).
    ColumnRef(usize),

    /// A named variable bound by the evaluator (`total`).
    Variable(String),

    /// A binary operation: left op right (e.g., col0 + 3, col1 > 10).
    BinaryOp {
        left: Box<Expression>,
        op: BinaryOperator,
        right: Box<Expression>,
    },

    /// A unary operation: op operand (e.g., -5, !col2).
    UnaryOp {
        op: UnaryOperator,
        operand: Box<Expression>,
    },

    /// A ternary conditional: condition ? when_true : when_false.
    Conditional {
        condition: Box<Expression>,
        when_true: Box<Expression>,
        when_false: Box<Expression>,
    },

    /// A function call like round(col1, 2). Names are upper-cased by the lexer.
    FunctionCall { name: String, args: Vec<Expression> },
}

impl Expression {
    /// Collects every column index referenced anywhere in the tree.
    pub fn collect_column_refs(&self, out: &mut Vec<usize>) {
        match self {
            Expression::ColumnRef(index) => out.push(*index),
            Expression::Literal(_) | Expression::Variable(_) => {}
            Expression::BinaryOp { left, right, .. } => {
                left.collect_column_refs(out);
                right.collect_column_refs(out);
            }
            Expression::UnaryOp { operand, .. } => operand.collect_column_refs(out),
            Expression::Conditional {
                condition,
                when_true,
                when_false,
            } => {
                condition.collect_column_refs(out);
                when_true.collect_column_refs(out);
                when_false.collect_column_refs(out);
            }
            Expression::FunctionCall { args, .. } => {
                for arg in args {
                    arg.collect_column_refs(out);
                }
            }
        }
    }

    /// Returns a copy of the tree with every column reference passed through `f`.
    pub fn map_column_refs(&self, f: &impl Fn(usize) -> usize) -> Expression {
        match self {
            Expression::ColumnRef(index) => Expression::ColumnRef(f(*index)),
            Expression::Literal(_) | Expression::Variable(_) => self.clone(),
            Expression::BinaryOp { left, op, right } => Expression::BinaryOp {
                left: Box::new(left.map_column_refs(f)),
                op: *op,
                right: Box::new(right.map_column_refs(f)),
            },
            Expression::UnaryOp { op, operand } => Expression::UnaryOp {
                op: *op,
                operand: Box::new(operand.map_column_refs(f)),
            },
            Expression::Conditional {
                condition,
                when_true,
                when_false,
            } => Expression::Conditional {
                condition: Box::new(condition.map_column_refs(f)),
                when_true: Box::new(when_true.map_column_refs(f)),
                when_false: Box::new(when_false.map_column_refs(f)),
            },
            Expression::FunctionCall { name, args } => Expression::FunctionCall {
                name: name.clone(),
                args: args.iter().map(|arg| arg.map_column_refs(f)).collect(),
            },
        }
    }
}

/// Literal values that can appear in formulas.
#[derive(Debug, PartialEq, Clone)]
pub enum Value {
    Number(f64),
    String(String),
    Boolean(bool),
    Null,
}

/// Binary operators for expressions.
/// Listed in order of precedence groups (logical or is lowest).
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum BinaryOperator {
    // Logical operators (lowest precedence)
    Or,  // || or
    And, // && and

    // Comparison operators
    Equal,        // == =
    NotEqual,     // != <>
    LessThan,     // <
    GreaterThan,  // >
    LessEqual,    // <=
    GreaterEqual, // >=

    // String concatenation
    Concat, // &

    // Arithmetic operators
    Add,      // +
    Subtract, // -
    Multiply, // *
    Divide,   // /
    Modulo,   // %
    Power,    // ^ (highest precedence among binary ops)
}

/// Unary operators.
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum UnaryOperator {
    Negate, // -
    Not,    // ! not
}

impl std::fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BinaryOperator::Or => write!(f, "||"),
            BinaryOperator::And => write!(f, "&&"),
            BinaryOperator::Add => write!(f, "+"),
            BinaryOperator::Subtract => write!(f, "-"),
            BinaryOperator::Multiply => write!(f, "*"),
            BinaryOperator::Divide => write!(f, "/"),
            BinaryOperator::Modulo => write!(f, "%"),
            BinaryOperator::Power => write!(f, "^"),
            BinaryOperator::Concat => write!(f, "&"),
            BinaryOperator::Equal => write!(f, "=="),
            BinaryOperator::NotEqual => write!(f, "!="),
            BinaryOperator::LessThan => write!(f, "<"),
            BinaryOperator::GreaterThan => write!(f, ">"),
            BinaryOperator::LessEqual => write!(f, "<="),
            BinaryOperator::GreaterEqual => write!(f, ">="),
        }
    }
}

impl std::fmt::Display for UnaryOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnaryOperator::Negate => write!(f, "-"),
            UnaryOperator::Not => write!(f, "!"),
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "\"{}\"", s),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Null => write!(f, "null"),
        }
    }
}

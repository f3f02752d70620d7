//! FILENAME: core/parser/src/lib.rs
//! PURPOSE: Library root for the table formula parser.
//! CONTEXT: This module exposes the lexer, parser, and AST components
//! needed to convert computed-column formulas into evaluatable expression trees.
//!
//! PIPELINE: Formula String --> Lexer --> Tokens --> Parser --> AST --> Formula Engine
//!
//! SUPPORTED FEATURES:
//! - Arithmetic: +, -, *, /, %, ^ (power)
//! - Comparison: ==, !=, <, >, <=, >= (also = and <>)
//! - Logical: &&, ||, ! (also and, or, not) and cond ? a : b
//! - String concatenation: &
//! - Column references: col0, col12
//! - Function calls: round(col1, 2), if(col0 > 0, "yes", "no")
//! - Parentheses for grouping
//! - Unary negation: -5

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod token;

// Register the separate tests module
#[cfg(test)]
mod tests;

// Re-export commonly used types for convenience
pub use ast::{BinaryOperator, Expression, UnaryOperator, Value};
pub use lexer::Lexer;
pub use parser::{parse, parse_column_index, ParseError, ParseResult, Parser};
pub use token::Token;

//! FILENAME: core/parser/src/tests.rs
//! PURPOSE: Consolidated unit tests for the parser crate.

use crate::ast::{BinaryOperator, Expression, UnaryOperator, Value};
use crate::lexer::Lexer;
use crate::parser::{parse, parse_column_index};
use crate::token::Token;

fn num(n: f64) -> Expression {
    Expression::Literal(Value::Number(n))
}

fn binary(left: Expression, op: BinaryOperator, right: Expression) -> Expression {
    Expression::BinaryOp {
        left: Box::new(left),
        op,
        right: Box::new(right),
    }
}

// ========================================
// LEXER TESTS
// ========================================

#[test]
fn lexer_tokenizes_simple_math() {
    let mut lexer = Lexer::new("1 + 2 % 3");

    assert_eq!(lexer.next_token(), Token::Number(1.0));
    assert_eq!(lexer.next_token(), Token::Plus);
    assert_eq!(lexer.next_token(), Token::Number(2.0));
    assert_eq!(lexer.next_token(), Token::Percent);
    assert_eq!(lexer.next_token(), Token::Number(3.0));
    assert_eq!(lexer.next_token(), Token::EOF);
}

#[test]
fn lexer_tokenizes_functions() {
    let mut lexer = Lexer::new("round(col1, 10)");

    assert_eq!(lexer.next_token(), Token::Identifier("ROUND".to_string()));
    assert_eq!(lexer.next_token(), Token::LParen);
    assert_eq!(lexer.next_token(), Token::Identifier("COL1".to_string()));
    assert_eq!(lexer.next_token(), Token::Comma);
    assert_eq!(lexer.next_token(), Token::Number(10.0));
    assert_eq!(lexer.next_token(), Token::RParen);
}

#[test]
fn lexer_handles_both_quote_styles_and_escapes() {
    let mut lexer = Lexer::new(r#""Hello" 'it\'s' "a\"b""#);

    assert_eq!(lexer.next_token(), Token::String("Hello".to_string()));
    assert_eq!(lexer.next_token(), Token::String("it's".to_string()));
    assert_eq!(lexer.next_token(), Token::String("a\"b".to_string()));
    assert_eq!(lexer.next_token(), Token::EOF);
}

#[test]
fn lexer_keeps_json_inside_single_quotes() {
    let mut lexer = Lexer::new(r#"'{"col0":true}'"#);
    assert_eq!(
        lexer.next_token(),
        Token::String(r#"{"col0":true}"#.to_string())
    );
}

#[test]
fn lexer_handles_keywords() {
    let mut lexer = Lexer::new("TRUE false Null");

    assert_eq!(lexer.next_token(), Token::Boolean(true));
    assert_eq!(lexer.next_token(), Token::Boolean(false));
    assert_eq!(lexer.next_token(), Token::Null);
}

#[test]
fn lexer_tokenizes_comparison_operators() {
    let mut lexer = Lexer::new("< > <= >= <> = == !=");

    assert_eq!(lexer.next_token(), Token::LessThan);
    assert_eq!(lexer.next_token(), Token::GreaterThan);
    assert_eq!(lexer.next_token(), Token::LessEqual);
    assert_eq!(lexer.next_token(), Token::GreaterEqual);
    assert_eq!(lexer.next_token(), Token::NotEqual);
    assert_eq!(lexer.next_token(), Token::Equals);
    assert_eq!(lexer.next_token(), Token::Equals);
    assert_eq!(lexer.next_token(), Token::NotEqual);
    assert_eq!(lexer.next_token(), Token::EOF);
}

#[test]
fn lexer_tokenizes_logical_operators() {
    let mut lexer = Lexer::new("a && b || !c & d ? e : f");

    assert_eq!(lexer.next_token(), Token::Identifier("A".to_string()));
    assert_eq!(lexer.next_token(), Token::AndAnd);
    assert_eq!(lexer.next_token(), Token::Identifier("B".to_string()));
    assert_eq!(lexer.next_token(), Token::OrOr);
    assert_eq!(lexer.next_token(), Token::Bang);
    assert_eq!(lexer.next_token(), Token::Identifier("C".to_string()));
    assert_eq!(lexer.next_token(), Token::Ampersand);
    assert_eq!(lexer.next_token(), Token::Identifier("D".to_string()));
    assert_eq!(lexer.next_token(), Token::Question);
    assert_eq!(lexer.next_token(), Token::Identifier("E".to_string()));
    assert_eq!(lexer.next_token(), Token::Colon);
    assert_eq!(lexer.next_token(), Token::Identifier("F".to_string()));
}

#[test]
fn lexer_rejects_single_pipe() {
    let mut lexer = Lexer::new("|");
    assert_eq!(lexer.next_token(), Token::Illegal('|'));
}

// ========================================
// PARSER TESTS - LITERALS AND REFERENCES
// ========================================

#[test]
fn parser_parses_number_literal() {
    assert_eq!(parse("42").unwrap(), num(42.0));
    assert_eq!(parse("3.14159").unwrap(), num(3.14159));
}

#[test]
fn parser_parses_string_and_null() {
    assert_eq!(
        parse("\"Hello World\"").unwrap(),
        Expression::Literal(Value::String("Hello World".to_string()))
    );
    assert_eq!(parse("null").unwrap(), Expression::Literal(Value::Null));
}

#[test]
fn parser_parses_column_refs_case_insensitively() {
    assert_eq!(parse("col0").unwrap(), Expression::ColumnRef(0));
    assert_eq!(parse("COL12").unwrap(), Expression::ColumnRef(12));
    assert_eq!(parse("Col3").unwrap(), Expression::ColumnRef(3));
}

#[test]
fn parser_treats_other_identifiers_as_variables() {
    assert_eq!(
        parse("total").unwrap(),
        Expression::Variable("TOTAL".to_string())
    );
    assert_eq!(
        parse("column").unwrap(),
        Expression::Variable("COLUMN".to_string())
    );
}

#[test]
fn column_index_parsing() {
    assert_eq!(parse_column_index("COL0"), Some(0));
    assert_eq!(parse_column_index("COL42"), Some(42));
    assert_eq!(parse_column_index("COL"), None);
    assert_eq!(parse_column_index("COLX"), None);
    assert_eq!(parse_column_index("TOTAL"), None);
}

// ========================================
// PARSER TESTS - OPERATORS
// ========================================

#[test]
fn parser_respects_precedence() {
    let result = parse("1 + 2 * 3").unwrap();
    assert_eq!(
        result,
        binary(
            num(1.0),
            BinaryOperator::Add,
            binary(num(2.0), BinaryOperator::Multiply, num(3.0))
        )
    );
}

#[test]
fn parser_parses_modulo_at_multiplicative_level() {
    let result = parse("col0 % 2 == 0").unwrap();
    assert_eq!(
        result,
        binary(
            binary(Expression::ColumnRef(0), BinaryOperator::Modulo, num(2.0)),
            BinaryOperator::Equal,
            num(0.0)
        )
    );
}

#[test]
fn parser_parses_logical_keywords_and_symbols() {
    let symbols = parse("col0 > 1 && col1 < 2 || col2").unwrap();
    let keywords = parse("col0 > 1 and col1 < 2 or col2").unwrap();
    assert_eq!(symbols, keywords);

    match symbols {
        Expression::BinaryOp { op, left, .. } => {
            assert_eq!(op, BinaryOperator::Or);
            assert!(matches!(
                *left,
                Expression::BinaryOp {
                    op: BinaryOperator::And,
                    ..
                }
            ));
        }
        other => panic!("Expected binary op, got {:?}", other),
    }
}

#[test]
fn parser_parses_not() {
    let expected = Expression::UnaryOp {
        op: UnaryOperator::Not,
        operand: Box::new(Expression::ColumnRef(1)),
    };
    assert_eq!(parse("!col1").unwrap(), expected);
    assert_eq!(parse("not col1").unwrap(), expected);
}

#[test]
fn parser_parses_negation_and_power() {
    let result = parse("-2 ^ 2").unwrap();
    assert_eq!(
        result,
        Expression::UnaryOp {
            op: UnaryOperator::Negate,
            operand: Box::new(binary(num(2.0), BinaryOperator::Power, num(2.0))),
        }
    );
}

#[test]
fn parser_parses_conditional() {
    let result = parse("col0 > 0 ? \"up\" : \"down\"").unwrap();
    match result {
        Expression::Conditional {
            condition,
            when_true,
            when_false,
        } => {
            assert_eq!(
                *condition,
                binary(Expression::ColumnRef(0), BinaryOperator::GreaterThan, num(0.0))
            );
            assert_eq!(*when_true, Expression::Literal(Value::String("up".into())));
            assert_eq!(
                *when_false,
                Expression::Literal(Value::String("down".into()))
            );
        }
        other => panic!("Expected conditional, got {:?}", other),
    }
}

#[test]
fn parser_parses_nested_conditional_right_associative() {
    let result = parse("a ? 1 : b ? 2 : 3").unwrap();
    match result {
        Expression::Conditional { when_false, .. } => {
            assert!(matches!(*when_false, Expression::Conditional { .. }));
        }
        other => panic!("Expected conditional, got {:?}", other),
    }
}

#[test]
fn parser_parses_concat() {
    let result = parse("col0 & \" - \" & col1").unwrap();
    match result {
        Expression::BinaryOp { op, .. } => assert_eq!(op, BinaryOperator::Concat),
        other => panic!("Expected concat, got {:?}", other),
    }
}

// ========================================
// PARSER TESTS - FUNCTIONS
// ========================================

#[test]
fn parser_parses_function_calls() {
    let result = parse("round(col1 / col2, 2)").unwrap();
    match result {
        Expression::FunctionCall { name, args } => {
            assert_eq!(name, "ROUND");
            assert_eq!(args.len(), 2);
        }
        other => panic!("Expected function call, got {:?}", other),
    }

    let empty = parse("now()").unwrap();
    assert_eq!(
        empty,
        Expression::FunctionCall {
            name: "NOW".to_string(),
            args: vec![]
        }
    );
}

#[test]
fn parser_allows_and_or_as_function_names() {
    let result = parse("and(col0, or(col1, col2))").unwrap();
    match result {
        Expression::FunctionCall { name, args } => {
            assert_eq!(name, "AND");
            assert!(matches!(&args[1], Expression::FunctionCall { name, .. } if name == "OR"));
        }
        other => panic!("Expected function call, got {:?}", other),
    }
}

// ========================================
// PARSER TESTS - ERRORS
// ========================================

#[test]
fn parser_rejects_empty_input() {
    assert!(parse("").is_err());
    assert!(parse("   ").is_err());
}

#[test]
fn parser_rejects_trailing_tokens() {
    let err = parse("1 2").unwrap_err();
    assert!(err.message.contains("Unexpected token"));
}

#[test]
fn parser_rejects_unclosed_paren_and_call() {
    assert!(parse("(1 + 2").is_err());
    assert!(parse("round(1, 2").is_err());
}

#[test]
fn parser_rejects_incomplete_conditional() {
    assert!(parse("col0 ? 1").is_err());
}

#[test]
fn parser_reports_illegal_characters() {
    let err = parse("col0 # 2").unwrap_err();
    assert!(err.message.contains("Unexpected token") || err.message.contains("Illegal"));
}

// ========================================
// AST HELPERS
// ========================================

#[test]
fn collects_column_refs_in_order_of_appearance() {
    let expr = parse("if(col2 > 0, col0 / col2, -col5)").unwrap();
    let mut refs = Vec::new();
    expr.collect_column_refs(&mut refs);
    assert_eq!(refs, vec![2, 0, 2, 5]);
}

#[test]
fn maps_column_refs() {
    let expr = parse("col1 + col3").unwrap();
    let shifted = expr.map_column_refs(&|i| if i >= 2 { i + 1 } else { i });
    assert_eq!(
        shifted,
        binary(
            Expression::ColumnRef(1),
            BinaryOperator::Add,
            Expression::ColumnRef(4)
        )
    );
}

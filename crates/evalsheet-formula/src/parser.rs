//! Formula parser
//!
//! A recursive descent parser with one method per precedence level, lowest first:
//!
//! | level          | operators                    |
//! |----------------|------------------------------|
//! | or             | `OR` `\|\|`                  |
//! | and            | `AND` `&&`                   |
//! | equality       | `=` `==` `<>` `!=`           |
//! | relational     | `<` `<=` `>` `>=`            |
//! | additive       | `+` `-` `&`                  |
//! | multiplicative | `*` `/` `%`                  |
//! | unary          | `-` `+` `NOT` `!`            |
//! | exponent       | `^` (right-associative)      |

use crate::ast::{BinaryOperator, Expr, ExprKind, Name, UnaryOperator};
use crate::dialect::Dialect;
use crate::error::{FormulaResult, ParseError};
use crate::functions::{self, FunctionKind, FunctionRegistry, SpecialForm};
use crate::lexer::{tokenize, Token, TokenKind};
use evalsheet_core::CellRange;

type ParseResult<T> = Result<T, ParseError>;

/// Parse source text into an AST
///
/// In the spreadsheet dialect a single leading `=` is accepted and ignored.
///
/// # Example
/// ```rust
/// use evalsheet_formula::{parse_formula, Dialect};
///
/// let ast = parse_formula("=1+2", Dialect::Spreadsheet).unwrap();
/// let ast = parse_formula("=SUM(A1:A10)", Dialect::Spreadsheet).unwrap();
/// let ast = parse_formula("IF([qty] > 0, \"Yes\", \"No\")", Dialect::Expression).unwrap();
/// ```
pub fn parse_formula(source: &str, dialect: Dialect) -> FormulaResult<Expr> {
    let tokens = tokenize(source, dialect)?;
    Ok(parse(&tokens, dialect)?)
}

/// Build an AST from a token list produced by [`tokenize`]
pub fn parse(tokens: &[Token], dialect: Dialect) -> ParseResult<Expr> {
    log::trace!("parse ({}): {} tokens", dialect, tokens.len());
    let mut parser = FormulaParser::new(tokens, dialect);

    if parser.check(&TokenKind::Eof) {
        return Err(parser.error("expression"));
    }

    let expr = parser.parse_expression()?;

    // Make sure we consumed all input
    if !parser.check(&TokenKind::Eof) {
        return Err(parser.error("operator or end of input"));
    }

    Ok(expr)
}

struct FormulaParser<'t> {
    tokens: &'t [Token],
    pos: usize,
    dialect: Dialect,
    registry: &'static FunctionRegistry,
    eof: Token,
}

impl<'t> FormulaParser<'t> {
    fn new(tokens: &'t [Token], dialect: Dialect) -> Self {
        let end = tokens
            .last()
            .map_or(0, |t| t.offset + t.lexeme.chars().count());
        Self {
            tokens,
            pos: 0,
            dialect,
            registry: functions::registry(dialect),
            eof: Token {
                kind: TokenKind::Eof,
                lexeme: String::new(),
                offset: end,
            },
        }
    }

    // === Token access ===

    fn current(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&self.eof)
    }

    fn peek(&self) -> &Token {
        self.tokens.get(self.pos + 1).unwrap_or(&self.eof)
    }

    fn check(&self, kind: &TokenKind) -> bool {
        &self.current().kind == kind
    }

    fn consume(&mut self) -> Token {
        let token = self.current().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, kind: &TokenKind) -> ParseResult<Token> {
        if self.check(kind) {
            Ok(self.consume())
        } else {
            Err(self.error(format!("'{}'", kind)))
        }
    }

    fn error(&self, expected: impl Into<String>) -> ParseError {
        let token = self.current();
        ParseError::new(token.offset, expected, token.kind.describe())
    }

    // === Expression parsing ===

    fn parse_expression(&mut self) -> ParseResult<Expr> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_and()?;
        while self.check(&TokenKind::Or) {
            let op = self.consume();
            let right = self.parse_and()?;
            left = Expr::binary(BinaryOperator::Or, left, right, op.offset);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_equality()?;
        while self.check(&TokenKind::And) {
            let op = self.consume();
            let right = self.parse_equality()?;
            left = Expr::binary(BinaryOperator::And, left, right, op.offset);
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_relational()?;
        loop {
            let op = match self.current().kind {
                TokenKind::Equal => BinaryOperator::Equal,
                TokenKind::NotEqual => BinaryOperator::NotEqual,
                _ => break,
            };
            let token = self.consume();
            let right = self.parse_relational()?;
            left = Expr::binary(op, left, right, token.offset);
        }
        Ok(left)
    }

    fn parse_relational(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.current().kind {
                TokenKind::Less => BinaryOperator::LessThan,
                TokenKind::LessEqual => BinaryOperator::LessEqual,
                TokenKind::Greater => BinaryOperator::GreaterThan,
                TokenKind::GreaterEqual => BinaryOperator::GreaterEqual,
                _ => break,
            };
            let token = self.consume();
            let right = self.parse_additive()?;
            left = Expr::binary(op, left, right, token.offset);
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.current().kind {
                TokenKind::Plus => BinaryOperator::Add,
                TokenKind::Minus => BinaryOperator::Subtract,
                TokenKind::Ampersand => BinaryOperator::Concat,
                _ => break,
            };
            let token = self.consume();
            let right = self.parse_multiplicative()?;
            left = Expr::binary(op, left, right, token.offset);
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.current().kind {
                TokenKind::Star => BinaryOperator::Multiply,
                TokenKind::Slash => BinaryOperator::Divide,
                TokenKind::Percent => BinaryOperator::Modulo,
                _ => break,
            };
            let token = self.consume();
            let right = self.parse_unary()?;
            left = Expr::binary(op, left, right, token.offset);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> ParseResult<Expr> {
        match self.current().kind {
            TokenKind::Minus => {
                let token = self.consume();
                let operand = self.parse_unary()?;
                Ok(Expr::unary(UnaryOperator::Negate, operand, token.offset))
            }
            TokenKind::Plus => {
                self.consume();
                self.parse_unary()
            }
            TokenKind::Not => {
                let token = self.consume();
                let operand = self.parse_unary()?;
                Ok(Expr::unary(UnaryOperator::Not, operand, token.offset))
            }
            _ => self.parse_exponent(),
        }
    }

    fn parse_exponent(&mut self) -> ParseResult<Expr> {
        let base = self.parse_primary()?;
        if self.check(&TokenKind::Caret) {
            let token = self.consume();
            // right operand goes back through unary: 2^-1, 2^3^2 = 2^(3^2)
            let exponent = self.parse_unary()?;
            return Ok(Expr::binary(BinaryOperator::Power, base, exponent, token.offset));
        }
        Ok(base)
    }

    fn parse_primary(&mut self) -> ParseResult<Expr> {
        let token = self.current().clone();
        match token.kind {
            TokenKind::Number(n) => {
                self.consume();
                Ok(Expr::literal(n, token.offset))
            }
            TokenKind::String(s) => {
                self.consume();
                Ok(Expr::literal(s, token.offset))
            }
            TokenKind::Boolean(b) => {
                self.consume();
                Ok(Expr::literal(b, token.offset))
            }
            TokenKind::Variable(name) => {
                self.consume();
                Ok(Expr::variable(name, token.offset))
            }
            TokenKind::Range(range) => {
                self.consume();
                Ok(Expr::new(ExprKind::RangeReference(range), token.offset))
            }
            TokenKind::Cell(addr) => {
                self.consume();
                if self.check(&TokenKind::Colon) {
                    self.consume();
                    let end = match self.current().kind {
                        TokenKind::Cell(end) => end,
                        _ => return Err(self.error("cell reference after ':'")),
                    };
                    self.consume();
                    return Ok(Expr::new(
                        ExprKind::RangeReference(CellRange::new(addr, end)),
                        token.offset,
                    ));
                }
                Ok(Expr::cell(addr, token.offset))
            }
            TokenKind::LeftParen => {
                self.consume();
                let expr = self.parse_expression()?;
                self.expect(&TokenKind::RightParen)?;
                Ok(expr)
            }
            TokenKind::Function(name) => {
                self.consume();
                self.parse_function_call(name, token.offset)
            }
            TokenKind::Identifier(word) => {
                if self.peek().kind == TokenKind::LeftParen {
                    return Err(ParseError::new(
                        token.offset,
                        format!("a {} function", self.dialect),
                        format!("unknown function '{}'", word),
                    ));
                }
                let expected = if self.dialect.has_variables() {
                    "expression (variables are written [name])"
                } else {
                    "expression"
                };
                Err(self.error(expected))
            }
            _ => Err(self.error("expression")),
        }
    }

    fn parse_function_call(&mut self, name: &'static str, offset: usize) -> ParseResult<Expr> {
        self.expect(&TokenKind::LeftParen)?;

        let mut args = Vec::new();
        if !self.check(&TokenKind::RightParen) {
            loop {
                args.push(self.parse_expression()?);
                if self.check(&TokenKind::Comma) {
                    self.consume();
                } else {
                    break;
                }
            }
        }

        self.expect(&TokenKind::RightParen)?;

        let def = self.registry.get(name).ok_or_else(|| {
            ParseError::new(offset, "known function", format!("unknown function '{}'", name))
        })?;

        if !def.accepts(args.len()) {
            return Err(ParseError::new(
                offset,
                format!("{} for {}", def.arity_description(), name),
                format!("{} argument{}", args.len(), if args.len() == 1 { "" } else { "s" }),
            ));
        }

        match def.kind {
            FunctionKind::Special(SpecialForm::If) => {
                let mut args = args.into_iter();
                match (args.next(), args.next(), args.next()) {
                    (Some(condition), Some(then_branch), Some(else_branch)) => Ok(Expr::new(
                        ExprKind::Conditional {
                            condition: Box::new(condition),
                            then_branch: Box::new(then_branch),
                            else_branch: Box::new(else_branch),
                        },
                        offset,
                    )),
                    _ => Err(ParseError::new(offset, "3 arguments", "fewer")),
                }
            }
            FunctionKind::Special(SpecialForm::Has) => match args.first().map(|a| &a.kind) {
                Some(ExprKind::Reference(Name::Variable(_))) => Ok(Expr::call(name, args, offset)),
                _ => Err(ParseError::new(
                    args.first().map_or(offset, |a| a.offset),
                    format!("variable reference as argument to {}", name),
                    "another expression",
                )),
            },
            _ => Ok(Expr::call(name, args, offset)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evalsheet_core::CellAddress;
    use pretty_assertions::assert_eq;

    fn sheet(source: &str) -> Expr {
        parse_formula(source, Dialect::Spreadsheet).unwrap()
    }

    fn expr(source: &str) -> Expr {
        parse_formula(source, Dialect::Expression).unwrap()
    }

    fn parse_err(source: &str, dialect: Dialect) -> ParseError {
        let tokens = tokenize(source, dialect).unwrap();
        parse(&tokens, dialect).unwrap_err()
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(sheet("=42"), Expr::literal(42.0, 1));
        assert_eq!(sheet("2.75"), Expr::literal(2.75, 0));
    }

    #[test]
    fn test_parse_arithmetic_precedence() {
        assert_eq!(sheet("1+2*3").to_string(), "(1+(2*3))");
        assert_eq!(sheet("(1+2)*3").to_string(), "((1+2)*3)");
        assert_eq!(sheet("1-2-3").to_string(), "((1-2)-3)");
        assert_eq!(sheet("1 & 2 + 3").to_string(), "((1&2)+3)");
        assert_eq!(sheet("7 % 3 * 2").to_string(), "((7%3)*2)");
    }

    #[test]
    fn test_parse_power() {
        assert_eq!(sheet("2^3^2").to_string(), "(2^(3^2))");
        assert_eq!(sheet("-2^2").to_string(), "(-((2^2)))");
        assert_eq!(sheet("2^-1").to_string(), "(2^(-(1)))");
    }

    #[test]
    fn test_parse_logical_and_comparison() {
        assert_eq!(
            expr("[a] > 1 and [b] == 2 or not [c]").to_string(),
            "((([a]>1) AND ([b]=2)) OR (!([c])))"
        );
        assert_eq!(expr("1 < 2 = TRUE").to_string(), "((1<2)=TRUE)");
    }

    #[test]
    fn test_offsets() {
        let ast = sheet("= 1 + 2");
        assert_eq!(ast.offset, 4);
        match ast.kind {
            ExprKind::Binary { left, right, .. } => {
                assert_eq!(left.offset, 2);
                assert_eq!(right.offset, 6);
            }
            other => panic!("expected binary, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_references() {
        assert_eq!(
            sheet("$B$2").kind,
            ExprKind::Reference(Name::Cell(CellAddress::with_absolute(1, 1, true, true)))
        );
        assert_eq!(
            sheet("SUM(B3:A1)").to_string(),
            "SUM(A1:B3)"
        );
        // spaced colon is still a range
        assert_eq!(sheet("SUM(A1 : A3)").to_string(), "SUM(A1:A3)");
        assert_eq!(expr("[x y]").kind, ExprKind::Reference(Name::Variable("x y".into())));
    }

    #[test]
    fn test_parse_conditional() {
        let ast = sheet("IF(A1>0, \"yes\", \"no\")");
        assert!(matches!(ast.kind, ExprKind::Conditional { .. }));
        assert_eq!(ast.to_string(), r#"IF((A1>0), "yes", "no")"#);

        let ast = expr("ifelse([x], 1, 2)");
        assert!(matches!(ast.kind, ExprKind::Conditional { .. }));
    }

    #[test]
    fn test_parse_nested_function() {
        assert_eq!(
            sheet("ROUND(AVERAGE(A1:A3), 2)").to_string(),
            "ROUND(AVERAGE(A1:A3), 2)"
        );
        assert_eq!(sheet("PI()").to_string(), "PI()");
    }

    #[test]
    fn test_arity_checked_at_parse_time() {
        let err = parse_err("LEFT(\"a\", 1, 2)", Dialect::Spreadsheet);
        assert_eq!(err.offset, 0);
        assert_eq!(err.expected, "1 to 2 arguments for LEFT");
        assert_eq!(err.found, "3 arguments");

        let err = parse_err("IF(TRUE, 1)", Dialect::Spreadsheet);
        assert_eq!(err.expected, "3 arguments for IF");
    }

    #[test]
    fn test_unknown_function() {
        let err = parse_err("1 + FOO(2)", Dialect::Spreadsheet);
        assert_eq!(err.offset, 4);
        assert_eq!(err.found, "unknown function 'FOO'");

        // dialect-specific functions
        assert!(parse_formula("COUNTIF(A1:A3, 1)", Dialect::Spreadsheet).is_ok());
        assert!(parse_formula("COUNTIF([a], 1)", Dialect::Expression).is_err());
        assert!(parse_formula("CONTAINS(\"ab\", \"a\")", Dialect::Spreadsheet).is_err());
    }

    #[test]
    fn test_bare_identifier_rejected() {
        let err = parse_err("price * 2", Dialect::Expression);
        assert_eq!(err.offset, 0);
        assert_eq!(err.found, "identifier 'price'");
        assert!(err.expected.contains("[name]"));
    }

    #[test]
    fn test_unbalanced_parentheses() {
        let err = parse_err("(1 + 2", Dialect::Spreadsheet);
        assert_eq!(err.offset, 6);
        assert_eq!(err.expected, "')'");
        assert_eq!(err.found, "end of input");

        let err = parse_err("1 + 2)", Dialect::Spreadsheet);
        assert_eq!(err.offset, 5);
        assert_eq!(err.found, "')'");
    }

    #[test]
    fn test_empty_and_dangling_input() {
        assert_eq!(parse_err("", Dialect::Expression).found, "end of input");
        assert_eq!(parse_err("=", Dialect::Spreadsheet).found, "end of input");
        assert_eq!(parse_err("1 +", Dialect::Expression).offset, 3);
        assert_eq!(parse_err("1 2", Dialect::Expression).offset, 2);
    }

    #[test]
    fn test_malformed_range() {
        let err = parse_err("SUM(A1:)", Dialect::Spreadsheet);
        assert_eq!(err.offset, 7);
        assert_eq!(err.expected, "cell reference after ':'");
    }

    #[test]
    fn test_has_requires_variable() {
        assert!(parse_formula("HAS([x])", Dialect::Expression).is_ok());
        let err = parse_err("HAS(1)", Dialect::Expression);
        assert_eq!(err.offset, 4);
    }

    #[test]
    fn test_parse_is_deterministic() {
        let source = "IF(SUM(A1:B2) >= 10, LEFT(\"abc\", 2) & C1, -D4 ^ 2)";
        assert_eq!(sheet(source), sheet(source));
    }
}

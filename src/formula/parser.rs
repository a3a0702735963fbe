//! Formula parser
//!
//! Recursive descent over the token stream, producing a small AST with
//! standard operator precedence and left-to-right associativity. The
//! identifier set is closed: anything that is not one of the five
//! canonical components is rejected at parse time, which keeps every
//! expression auditable before a single row is evaluated.

use super::tokenizer::{tokenize, Token, TokenizeError};
use crate::types::Component;
use thiserror::Error;

/// Binary arithmetic operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
}

/// Abstract syntax tree for formula expressions
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A numeric literal
    Literal(f64),
    /// A reference to one of the canonical components
    Component(Component),
    /// Unary minus
    Neg(Box<Expr>),
    /// Binary operation: left op right
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

impl Expr {
    /// A formula is "ratio-shaped" when its outermost operation is a
    /// division. The calculator aggregates such formulas as a ratio of
    /// component sums instead of a sum of per-row ratios.
    pub fn is_ratio(&self) -> bool {
        matches!(
            self,
            Expr::Binary {
                op: BinOp::Div,
                ..
            }
        )
    }

    /// Components referenced anywhere in the expression.
    pub fn components(&self) -> Vec<Component> {
        let mut found = Vec::new();
        self.collect_components(&mut found);
        found
    }

    fn collect_components(&self, found: &mut Vec<Component>) {
        match self {
            Expr::Literal(_) => {}
            Expr::Component(c) => {
                if !found.contains(c) {
                    found.push(*c);
                }
            }
            Expr::Neg(inner) => inner.collect_components(found),
            Expr::Binary { left, right, .. } => {
                left.collect_components(found);
                right.collect_components(found);
            }
        }
    }
}

/// Error during parsing
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("unknown identifier `{name}` (expected one of AMOR, DIS, EDIS, ENER, GUG)")]
    UnknownIdentifier { name: String },

    #[error("parse error at token {position}: {message}")]
    Syntax { message: String, position: usize },
}

impl ParseError {
    fn syntax(message: impl Into<String>, position: usize) -> Self {
        Self::Syntax {
            message: message.into(),
            position,
        }
    }
}

impl From<TokenizeError> for ParseError {
    fn from(e: TokenizeError) -> Self {
        Self::Syntax {
            message: e.message,
            position: e.position,
        }
    }
}

pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            position: 0,
        }
    }

    pub fn parse(mut self) -> Result<Expr, ParseError> {
        if self.tokens.is_empty() {
            return Err(ParseError::syntax("empty expression", 0));
        }
        let expr = self.expression()?;

        if !self.is_at_end() {
            return Err(ParseError::syntax(
                format!("unexpected token after expression: {:?}", self.peek()),
                self.position,
            ));
        }

        Ok(expr)
    }

    fn is_at_end(&self) -> bool {
        self.position >= self.tokens.len()
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    fn advance(&mut self) -> Option<&Token> {
        if !self.is_at_end() {
            self.position += 1;
        }
        self.tokens.get(self.position - 1)
    }

    fn match_op(&mut self, ops: &[char]) -> Option<char> {
        if let Some(Token::Op(c)) = self.peek() {
            if ops.contains(c) {
                let c = *c;
                self.advance();
                return Some(c);
            }
        }
        None
    }

    /// Expression: term (( "+" | "-" ) term)*
    fn expression(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.term()?;

        while let Some(op) = self.match_op(&['+', '-']) {
            let right = self.term()?;
            left = Expr::Binary {
                op: if op == '+' { BinOp::Add } else { BinOp::Sub },
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    /// Term: unary (( "*" | "/" ) unary)*
    fn term(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.unary()?;

        while let Some(op) = self.match_op(&['*', '/']) {
            let right = self.unary()?;
            left = Expr::Binary {
                op: if op == '*' { BinOp::Mul } else { BinOp::Div },
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    /// Unary: "-" unary | primary
    fn unary(&mut self) -> Result<Expr, ParseError> {
        if self.match_op(&['-']).is_some() {
            let operand = self.unary()?;
            Ok(Expr::Neg(Box::new(operand)))
        } else {
            self.primary()
        }
    }

    /// Primary: NUMBER | COMPONENT | "(" expression ")"
    fn primary(&mut self) -> Result<Expr, ParseError> {
        let token = self.peek().cloned();

        match token {
            Some(Token::Number(n)) => {
                self.advance();
                Ok(Expr::Literal(n))
            }
            Some(Token::Ident(name)) => {
                self.advance();
                match Component::from_name(&name) {
                    Some(component) => Ok(Expr::Component(component)),
                    None => Err(ParseError::UnknownIdentifier { name }),
                }
            }
            Some(Token::OpenParen) => {
                self.advance();
                let expr = self.expression()?;
                match self.peek() {
                    Some(Token::CloseParen) => {
                        self.advance();
                        Ok(expr)
                    }
                    _ => Err(ParseError::syntax(
                        "expected ')' after expression",
                        self.position,
                    )),
                }
            }
            Some(token) => Err(ParseError::syntax(
                format!("unexpected token: {:?}", token),
                self.position,
            )),
            None => Err(ParseError::syntax(
                "unexpected end of expression",
                self.position,
            )),
        }
    }
}

/// Parse an expression string into an AST.
pub fn parse_expr(source: &str) -> Result<Expr, ParseError> {
    let tokens = tokenize(source)?;
    Parser::new(tokens).parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_literal() {
        assert_eq!(parse_expr("42").unwrap(), Expr::Literal(42.0));
    }

    #[test]
    fn test_parse_component() {
        assert_eq!(
            parse_expr("AMOR").unwrap(),
            Expr::Component(Component::Amor)
        );
    }

    #[test]
    fn test_parse_unknown_identifier() {
        assert_eq!(
            parse_expr("AMOR + PROFIT").unwrap_err(),
            ParseError::UnknownIdentifier {
                name: "PROFIT".to_string()
            }
        );
    }

    #[test]
    fn test_parse_precedence_mul_over_add() {
        // AMOR + DIS * 2 parses as AMOR + (DIS * 2)
        assert_eq!(
            parse_expr("AMOR + DIS * 2").unwrap(),
            Expr::Binary {
                op: BinOp::Add,
                left: Box::new(Expr::Component(Component::Amor)),
                right: Box::new(Expr::Binary {
                    op: BinOp::Mul,
                    left: Box::new(Expr::Component(Component::Dis)),
                    right: Box::new(Expr::Literal(2.0)),
                }),
            }
        );
    }

    #[test]
    fn test_parse_left_associative() {
        // 8 - 2 - 1 parses as (8 - 2) - 1
        assert_eq!(
            parse_expr("8 - 2 - 1").unwrap(),
            Expr::Binary {
                op: BinOp::Sub,
                left: Box::new(Expr::Binary {
                    op: BinOp::Sub,
                    left: Box::new(Expr::Literal(8.0)),
                    right: Box::new(Expr::Literal(2.0)),
                }),
                right: Box::new(Expr::Literal(1.0)),
            }
        );
    }

    #[test]
    fn test_parse_parentheses() {
        assert_eq!(
            parse_expr("(AMOR + DIS) * ENER").unwrap(),
            Expr::Binary {
                op: BinOp::Mul,
                left: Box::new(Expr::Binary {
                    op: BinOp::Add,
                    left: Box::new(Expr::Component(Component::Amor)),
                    right: Box::new(Expr::Component(Component::Dis)),
                }),
                right: Box::new(Expr::Component(Component::Ener)),
            }
        );
    }

    #[test]
    fn test_parse_unary_minus() {
        assert_eq!(
            parse_expr("-AMOR + 1").unwrap(),
            Expr::Binary {
                op: BinOp::Add,
                left: Box::new(Expr::Neg(Box::new(Expr::Component(Component::Amor)))),
                right: Box::new(Expr::Literal(1.0)),
            }
        );
    }

    #[test]
    fn test_parse_error_empty() {
        assert!(parse_expr("").is_err());
    }

    #[test]
    fn test_parse_error_missing_close_paren() {
        let err = parse_expr("(AMOR + DIS").unwrap_err();
        assert!(err.to_string().contains("')'"));
    }

    #[test]
    fn test_parse_error_trailing_tokens() {
        assert!(parse_expr("AMOR DIS").is_err());
    }

    #[test]
    fn test_ratio_shape_detection() {
        assert!(parse_expr("ENER / GUG").unwrap().is_ratio());
        assert!(parse_expr("(AMOR + DIS) / (ENER + GUG)").unwrap().is_ratio());
        // division nested under a sum does not make the whole formula a ratio
        assert!(!parse_expr("AMOR + ENER / GUG").unwrap().is_ratio());
        assert!(!parse_expr("AMOR + DIS").unwrap().is_ratio());
    }

    #[test]
    fn test_components_listing() {
        let expr = parse_expr("AMOR + DIS + AMOR / ENER").unwrap();
        assert_eq!(
            expr.components(),
            vec![Component::Amor, Component::Dis, Component::Ener]
        );
    }
}

//! Formula tokenizer
//!
//! Converts an expression like "AMOR + DIS * 2" into a token stream for
//! the parser. The grammar is arithmetic only: numbers, identifiers,
//! `+ - * /` and parentheses.

use std::iter::Peekable;
use std::str::Chars;

/// A token in a formula expression
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// A numeric literal (e.g., 123, 45.67, 1.5e3)
    Number(f64),
    /// An identifier; validated against the component set by the parser
    Ident(String),
    /// One of `+ - * /`
    Op(char),
    OpenParen,
    CloseParen,
}

/// Error during tokenization
#[derive(Debug, Clone, PartialEq)]
pub struct TokenizeError {
    pub message: String,
    pub position: usize,
}

impl TokenizeError {
    fn new(message: impl Into<String>, position: usize) -> Self {
        Self {
            message: message.into(),
            position,
        }
    }
}

impl std::fmt::Display for TokenizeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "tokenize error at position {}: {}",
            self.position, self.message
        )
    }
}

impl std::error::Error for TokenizeError {}

pub struct Tokenizer<'a> {
    chars: Peekable<Chars<'a>>,
    position: usize,
}

impl<'a> Tokenizer<'a> {
    pub fn new(expr: &'a str) -> Self {
        // tolerate an Excel-style leading '='
        let expr = expr.strip_prefix('=').unwrap_or(expr);
        Self {
            chars: expr.chars().peekable(),
            position: 0,
        }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, TokenizeError> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }
        Ok(tokens)
    }

    fn next_token(&mut self) -> Result<Option<Token>, TokenizeError> {
        self.skip_whitespace();

        match self.peek() {
            None => Ok(None),
            Some(c) => {
                let token = match c {
                    '(' => {
                        self.advance();
                        Token::OpenParen
                    }
                    ')' => {
                        self.advance();
                        Token::CloseParen
                    }
                    '+' | '-' | '*' | '/' => {
                        // minus is always an operator here; the parser
                        // handles unary minus
                        let op = self.advance().unwrap();
                        Token::Op(op)
                    }
                    c if c.is_ascii_digit() => self.read_number()?,
                    c if c.is_alphabetic() || c == '_' => self.read_ident(),
                    c => {
                        return Err(TokenizeError::new(
                            format!("unexpected character: '{}'", c),
                            self.position,
                        ));
                    }
                };
                Ok(Some(token))
            }
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.chars.next();
        if c.is_some() {
            self.position += 1;
        }
        c
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    /// Read a number (integer, decimal, or scientific notation)
    fn read_number(&mut self) -> Result<Token, TokenizeError> {
        let start_pos = self.position;
        let mut num_str = String::new();

        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                num_str.push(self.advance().unwrap());
            } else {
                break;
            }
        }

        if self.peek() == Some('.') {
            num_str.push(self.advance().unwrap());
            while let Some(c) = self.peek() {
                if c.is_ascii_digit() {
                    num_str.push(self.advance().unwrap());
                } else {
                    break;
                }
            }
        }

        if matches!(self.peek(), Some('e') | Some('E')) {
            num_str.push(self.advance().unwrap());
            if matches!(self.peek(), Some('+') | Some('-')) {
                num_str.push(self.advance().unwrap());
            }
            while let Some(c) = self.peek() {
                if c.is_ascii_digit() {
                    num_str.push(self.advance().unwrap());
                } else {
                    break;
                }
            }
        }

        num_str
            .parse::<f64>()
            .map(Token::Number)
            .map_err(|_| TokenizeError::new(format!("invalid number: {}", num_str), start_pos))
    }

    fn read_ident(&mut self) -> Token {
        let mut ident = String::new();
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                ident.push(self.advance().unwrap());
            } else {
                break;
            }
        }
        Token::Ident(ident)
    }
}

/// Convenience function to tokenize an expression string
pub fn tokenize(expr: &str) -> Result<Vec<Token>, TokenizeError> {
    Tokenizer::new(expr).tokenize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_number() {
        assert_eq!(tokenize("42").unwrap(), vec![Token::Number(42.0)]);
        assert_eq!(tokenize("3.567").unwrap(), vec![Token::Number(3.567)]);
        assert_eq!(tokenize("1.5e3").unwrap(), vec![Token::Number(1500.0)]);
    }

    #[test]
    fn test_tokenize_identifier() {
        assert_eq!(
            tokenize("AMOR").unwrap(),
            vec![Token::Ident("AMOR".to_string())]
        );
    }

    #[test]
    fn test_tokenize_expression() {
        assert_eq!(
            tokenize("AMOR + DIS * 2").unwrap(),
            vec![
                Token::Ident("AMOR".to_string()),
                Token::Op('+'),
                Token::Ident("DIS".to_string()),
                Token::Op('*'),
                Token::Number(2.0),
            ]
        );
    }

    #[test]
    fn test_tokenize_parens_and_division() {
        assert_eq!(
            tokenize("(ENER + GUG) / EDIS").unwrap(),
            vec![
                Token::OpenParen,
                Token::Ident("ENER".to_string()),
                Token::Op('+'),
                Token::Ident("GUG".to_string()),
                Token::CloseParen,
                Token::Op('/'),
                Token::Ident("EDIS".to_string()),
            ]
        );
    }

    #[test]
    fn test_tokenize_minus_is_operator() {
        assert_eq!(
            tokenize("-5").unwrap(),
            vec![Token::Op('-'), Token::Number(5.0)]
        );
    }

    #[test]
    fn test_tokenize_strips_leading_equals() {
        assert_eq!(
            tokenize("=AMOR+1").unwrap(),
            vec![
                Token::Ident("AMOR".to_string()),
                Token::Op('+'),
                Token::Number(1.0),
            ]
        );
    }

    #[test]
    fn test_tokenize_empty_and_whitespace() {
        assert_eq!(tokenize("").unwrap(), vec![]);
        assert_eq!(tokenize("   ").unwrap(), vec![]);
    }

    #[test]
    fn test_tokenize_error_unexpected_char() {
        let err = tokenize("AMOR % 2").unwrap_err();
        assert!(err.message.contains("unexpected"));
        assert_eq!(err.position, 5);
    }
}

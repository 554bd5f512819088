use super::token::{Token, TokenKind};
use crate::error::{Error, Result};

/// Scanner for Tua source code
pub struct Scanner {
    /// Source code as character vector
    source: Vec<char>,
    /// Accumulated tokens
    tokens: Vec<Token>,
    /// Start position of current token
    start: usize,
    /// Current position in source
    current: usize,
    /// Current line number (1-indexed)
    line: usize,
    /// Current column number (1-indexed)
    column: usize,
}

impl Scanner {
    /// Creates a new scanner from source code
    pub fn new(source: &str) -> Self {
        Scanner {
            source: source.chars().collect(),
            tokens: Vec::new(),
            start: 0,
            current: 0,
            line: 1,
            column: 1,
        }
    }

    /// Scans all tokens from source code and returns them as a vector
    pub fn scan_tokens(&mut self) -> Result<Vec<Token>> {
        while !self.is_at_end() {
            self.start = self.current;
            self.scan_token()?;
        }

        self.tokens.push(Token::new(
            TokenKind::Eof,
            String::new(),
            self.line,
            self.column,
        ));

        Ok(self.tokens.clone())
    }

    fn scan_token(&mut self) -> Result<()> {
        let c = self.advance();

        match c {
            // Whitespace
            ' ' | '\r' | '\t' | '\n' => {
                if c == '\n' {
                    self.line += 1;
                    self.column = 1;
                }
            }

            // '-' starts either a line comment or the minus operator
            '-' => {
                if self.match_char('-') {
                    self.skip_line_comment();
                } else {
                    self.add_token(TokenKind::Minus);
                }
            }

            '+' => self.add_token(TokenKind::Plus),
            '*' => self.add_token(TokenKind::Star),
            '%' => self.add_token(TokenKind::Percent),
            '^' => self.add_token(TokenKind::Caret),
            '/' => {
                if self.match_char('/') {
                    self.add_token(TokenKind::SlashSlash);
                } else {
                    self.add_token(TokenKind::Slash);
                }
            }

            '.' => {
                if self.match_char('.') {
                    self.add_token(TokenKind::DotDot);
                } else {
                    return Err(Error::SyntaxError {
                        line: self.line,
                        message: "unexpected character '.'".to_string(),
                    });
                }
            }

            '=' => {
                if self.match_char('=') {
                    self.add_token(TokenKind::Eq);
                } else {
                    self.add_token(TokenKind::Assign);
                }
            }
            '~' => {
                if self.match_char('=') {
                    self.add_token(TokenKind::NotEq);
                } else {
                    return Err(Error::SyntaxError {
                        line: self.line,
                        message: "unexpected character '~'".to_string(),
                    });
                }
            }
            '<' => {
                if self.match_char('=') {
                    self.add_token(TokenKind::LtEq);
                } else {
                    self.add_token(TokenKind::Lt);
                }
            }
            '>' => {
                if self.match_char('=') {
                    self.add_token(TokenKind::GtEq);
                } else {
                    self.add_token(TokenKind::Gt);
                }
            }

            '&' => self.add_token(TokenKind::Amp),
            '|' => self.add_token(TokenKind::Pipe),

            ':' => self.add_token(TokenKind::Colon),
            ',' => self.add_token(TokenKind::Comma),
            '(' => self.add_token(TokenKind::LeftParen),
            ')' => self.add_token(TokenKind::RightParen),
            '{' => self.add_token(TokenKind::LeftBrace),
            '}' => self.add_token(TokenKind::RightBrace),
            '[' => self.add_token(TokenKind::LeftBracket),
            ']' => self.add_token(TokenKind::RightBracket),

            // Strings may be single- or double-quoted
            '"' | '\'' => self.scan_string(c)?,

            c if c.is_ascii_digit() => self.scan_number()?,

            c if c.is_alphabetic() || c == '_' => self.scan_identifier_or_keyword(),

            _ => {
                return Err(Error::SyntaxError {
                    line: self.line,
                    message: format!("unexpected character '{}'", c),
                });
            }
        }

        Ok(())
    }

    fn skip_line_comment(&mut self) {
        while !self.is_at_end() && self.peek() != '\n' {
            self.advance();
        }
    }

    // Quotes are stripped; there is no escape processing.
    fn scan_string(&mut self, quote: char) -> Result<()> {
        let mut value = String::new();

        while !self.is_at_end() && self.peek() != quote {
            if self.peek() == '\n' {
                self.line += 1;
                self.column = 1;
            }
            value.push(self.advance());
        }

        if self.is_at_end() {
            return Err(Error::SyntaxError {
                line: self.line,
                message: "unterminated string".to_string(),
            });
        }

        self.advance(); // closing quote

        self.add_token(TokenKind::Str(value));
        Ok(())
    }

    fn scan_number(&mut self) -> Result<()> {
        while self.peek().is_ascii_digit() {
            self.advance();
        }

        let mut is_float = false;
        if self.peek() == '.' && self.peek_next().is_ascii_digit() {
            is_float = true;
            self.advance(); // consume .
            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        let text: String = self.source[self.start..self.current].iter().collect();

        if is_float {
            let value: f64 = text.parse().map_err(|_| Error::SyntaxError {
                line: self.line,
                message: format!("invalid float literal '{}'", text),
            })?;
            self.add_token(TokenKind::Float(value));
        } else {
            let value: i64 = text.parse().map_err(|_| Error::SyntaxError {
                line: self.line,
                message: format!("invalid integer literal '{}'", text),
            })?;
            self.add_token(TokenKind::Int(value));
        }

        Ok(())
    }

    fn scan_identifier_or_keyword(&mut self) {
        while self.peek().is_alphanumeric() || self.peek() == '_' {
            self.advance();
        }

        let text: String = self.source[self.start..self.current].iter().collect();

        let kind = TokenKind::keyword(&text).unwrap_or(TokenKind::Name(text));
        self.add_token(kind);
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }

    fn advance(&mut self) -> char {
        let c = self.source[self.current];
        self.current += 1;
        self.column += 1;
        c
    }

    fn peek(&self) -> char {
        if self.is_at_end() {
            '\0'
        } else {
            self.source[self.current]
        }
    }

    fn peek_next(&self) -> char {
        if self.current + 1 >= self.source.len() {
            '\0'
        } else {
            self.source[self.current + 1]
        }
    }

    fn match_char(&mut self, expected: char) -> bool {
        if self.is_at_end() || self.source[self.current] != expected {
            false
        } else {
            self.current += 1;
            self.column += 1;
            true
        }
    }

    fn add_token(&mut self, kind: TokenKind) {
        let lexeme: String = self.source[self.start..self.current].iter().collect();
        self.tokens
            .push(Token::new(kind, lexeme, self.line, self.column));
    }
}

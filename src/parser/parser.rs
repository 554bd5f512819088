use super::ast::{
    BinaryOp, Block, Expression, FunctionCall, IfArm, Program, Statement, TypedName, UnaryOp,
};
use crate::error::{Error, Result};
use crate::lexer::{Token, TokenKind};
use crate::runtime::Type;

/// Recursive-descent parser for Tua
pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
}

impl Parser {
    /// Creates a new parser over a scanned token stream
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if tokens.is_empty() {
            tokens.push(Token::new(TokenKind::Eof, String::new(), 1, 1));
        }
        Parser { tokens, current: 0 }
    }

    /// Parses the tokens into a program
    pub fn parse(&mut self) -> Result<Program> {
        let body = self.parse_block()?;

        if !self.is_at_end() {
            return Err(self.unexpected("end of file"));
        }

        Ok(Program { body })
    }

    /// Parse statements until a block terminator.
    ///
    /// A `return`/`break`/`continue` closes the block; the caller consumes
    /// the terminator itself.
    fn parse_block(&mut self) -> Result<Block> {
        let mut statements = Vec::new();

        while !self.at_block_end() {
            if matches!(
                self.peek().kind,
                TokenKind::Return | TokenKind::Break | TokenKind::Continue
            ) {
                statements.push(self.parse_last_statement()?);
                break;
            }
            statements.push(self.parse_statement()?);
        }

        Ok(Block { statements })
    }

    fn parse_last_statement(&mut self) -> Result<Statement> {
        match self.peek().kind {
            TokenKind::Return => {
                self.advance();
                let mut values = Vec::new();
                if !self.at_block_end() {
                    values.push(self.parse_expression()?);
                    while self.match_token(&TokenKind::Comma) {
                        values.push(self.parse_expression()?);
                    }
                }
                Ok(Statement::Return { values })
            }
            TokenKind::Break => {
                self.advance();
                Ok(Statement::Break)
            }
            TokenKind::Continue => {
                self.advance();
                Ok(Statement::Continue)
            }
            _ => Err(self.unexpected("'return', 'break' or 'continue'")),
        }
    }

    fn parse_statement(&mut self) -> Result<Statement> {
        match self.peek().kind.clone() {
            TokenKind::Let => self.parse_declaration(),
            TokenKind::Do => {
                self.advance();
                let body = self.parse_block()?;
                self.consume(&TokenKind::End, "'end'")?;
                Ok(Statement::Do(body))
            }
            TokenKind::While => {
                self.advance();
                let condition = self.parse_expression()?;
                self.consume(&TokenKind::Do, "'do'")?;
                let body = self.parse_block()?;
                self.consume(&TokenKind::End, "'end'")?;
                Ok(Statement::While { condition, body })
            }
            TokenKind::If => self.parse_if(),
            TokenKind::For => self.parse_for(),
            TokenKind::Function => self.parse_function_def(),
            TokenKind::Name(name) => {
                self.advance();
                match self.peek().kind {
                    TokenKind::LeftParen => {
                        let args = self.parse_call_args()?;
                        Ok(Statement::Call(FunctionCall { name, args }))
                    }
                    TokenKind::LeftBracket => {
                        self.advance();
                        let index = self.parse_expression()?;
                        self.consume(&TokenKind::RightBracket, "']'")?;
                        self.consume(&TokenKind::Assign, "'='")?;
                        let value = self.parse_expression()?;
                        Ok(Statement::Assign {
                            name,
                            index: Some(index),
                            value,
                        })
                    }
                    TokenKind::Assign => {
                        self.advance();
                        let value = self.parse_expression()?;
                        Ok(Statement::Assign {
                            name,
                            index: None,
                            value,
                        })
                    }
                    _ => Err(self.unexpected("'=', '[' or '('")),
                }
            }
            _ => Err(self.unexpected("statement")),
        }
    }

    fn parse_declaration(&mut self) -> Result<Statement> {
        self.consume(&TokenKind::Let, "'let'")?;
        let name = self.consume_name()?;
        self.consume(&TokenKind::Colon, "':'")?;
        let ty = self.parse_type()?;
        self.consume(&TokenKind::Assign, "'='")?;
        let value = self.parse_expression()?;
        Ok(Statement::Declare { name, ty, value })
    }

    fn parse_if(&mut self) -> Result<Statement> {
        self.consume(&TokenKind::If, "'if'")?;

        let mut arms = Vec::new();
        let condition = self.parse_expression()?;
        self.consume(&TokenKind::Then, "'then'")?;
        let body = self.parse_block()?;
        arms.push(IfArm { condition, body });

        let mut else_body = None;
        loop {
            match self.peek().kind {
                TokenKind::Elseif => {
                    self.advance();
                    let condition = self.parse_expression()?;
                    self.consume(&TokenKind::Then, "'then'")?;
                    let body = self.parse_block()?;
                    arms.push(IfArm { condition, body });
                }
                TokenKind::Else => {
                    self.advance();
                    else_body = Some(self.parse_block()?);
                    self.consume(&TokenKind::End, "'end'")?;
                    break;
                }
                TokenKind::End => {
                    self.advance();
                    break;
                }
                _ => return Err(self.unexpected("'elseif', 'else' or 'end'")),
            }
        }

        Ok(Statement::If { arms, else_body })
    }

    fn parse_for(&mut self) -> Result<Statement> {
        self.consume(&TokenKind::For, "'for'")?;
        let first = self.consume_name()?;

        match self.peek().kind {
            // for i = start, cond, step? do ... end
            TokenKind::Assign => {
                self.advance();
                let start = self.parse_expression()?;
                self.consume(&TokenKind::Comma, "','")?;
                let limit = self.parse_expression()?;
                let step = if self.match_token(&TokenKind::Comma) {
                    Some(self.parse_expression()?)
                } else {
                    None
                };
                self.consume(&TokenKind::Do, "'do'")?;
                let body = self.parse_block()?;
                self.consume(&TokenKind::End, "'end'")?;
                Ok(Statement::NumericFor {
                    iterator: first,
                    start,
                    limit,
                    step,
                    body,
                })
            }
            // for k, v in call() do ... end
            TokenKind::Comma => {
                self.advance();
                let value = self.consume_name()?;
                self.consume(&TokenKind::In, "'in'")?;
                let target = self.consume_name()?;
                if !matches!(self.peek().kind, TokenKind::LeftParen) {
                    return Err(self.unexpected("'('"));
                }
                let args = self.parse_call_args()?;
                self.consume(&TokenKind::Do, "'do'")?;
                let body = self.parse_block()?;
                self.consume(&TokenKind::End, "'end'")?;
                Ok(Statement::GenericFor {
                    key: first,
                    value,
                    source: FunctionCall { name: target, args },
                    body,
                })
            }
            _ => Err(self.unexpected("'=' or ','")),
        }
    }

    fn parse_function_def(&mut self) -> Result<Statement> {
        self.consume(&TokenKind::Function, "'function'")?;
        let name = self.consume_name()?;

        self.consume(&TokenKind::LeftParen, "'('")?;
        let mut params = Vec::new();
        if !matches!(self.peek().kind, TokenKind::RightParen) {
            loop {
                let pname = self.consume_name()?;
                self.consume(&TokenKind::Colon, "':'")?;
                let ty = self.parse_type()?;
                params.push(TypedName { name: pname, ty });
                if !self.match_token(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(&TokenKind::RightParen, "')'")?;

        self.consume(&TokenKind::Colon, "':'")?;
        let returns = self.parse_type()?;

        let body = self.parse_block()?;
        self.consume(&TokenKind::End, "'end'")?;

        Ok(Statement::FunctionDef {
            name,
            params,
            returns,
            body,
        })
    }

    fn parse_type(&mut self) -> Result<Type> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Nil => {
                self.advance();
                Ok(Type::Nil)
            }
            TokenKind::Name(name) => {
                self.advance();
                match name.as_str() {
                    "int" => Ok(Type::Int),
                    "float" => Ok(Type::Float),
                    "bool" => Ok(Type::Bool),
                    "string" => Ok(Type::Str),
                    "List" => {
                        self.consume(&TokenKind::LeftBracket, "'['")?;
                        let elem = self.parse_type()?;
                        self.consume(&TokenKind::RightBracket, "']'")?;
                        Ok(Type::List(Some(Box::new(elem))))
                    }
                    _ => Err(Error::UnknownType {
                        name,
                        line: token.line,
                    }),
                }
            }
            _ => Err(self.unexpected("type")),
        }
    }

    // Expressions, loosest binding first.

    fn parse_expression(&mut self) -> Result<Expression> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expression> {
        let mut left = self.parse_and()?;
        while matches!(self.peek().kind, TokenKind::Or | TokenKind::Pipe) {
            self.advance();
            let right = self.parse_and()?;
            left = Expression::Binary {
                op: BinaryOp::Or,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expression> {
        let mut left = self.parse_comparison()?;
        while matches!(self.peek().kind, TokenKind::And | TokenKind::Amp) {
            self.advance();
            let right = self.parse_comparison()?;
            left = Expression::Binary {
                op: BinaryOp::And,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> Result<Expression> {
        let mut left = self.parse_concat()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Eq => BinaryOp::Eq,
                TokenKind::NotEq => BinaryOp::NotEq,
                TokenKind::Lt => BinaryOp::Lt,
                TokenKind::LtEq => BinaryOp::LtEq,
                TokenKind::Gt => BinaryOp::Gt,
                TokenKind::GtEq => BinaryOp::GtEq,
                _ => break,
            };
            self.advance();
            let right = self.parse_concat()?;
            left = Expression::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    // `..` is right-associative.
    fn parse_concat(&mut self) -> Result<Expression> {
        let left = self.parse_additive()?;
        if self.match_token(&TokenKind::DotDot) {
            let right = self.parse_concat()?;
            return Ok(Expression::Binary {
                op: BinaryOp::Concat,
                left: Box::new(left),
                right: Box::new(right),
            });
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expression> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = Expression::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expression> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::SlashSlash => BinaryOp::FloorDiv,
                TokenKind::Percent => BinaryOp::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = Expression::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expression> {
        let op = match self.peek().kind {
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Not => UnaryOp::Not,
            _ => return self.parse_power(),
        };
        self.advance();
        let operand = self.parse_unary()?;
        Ok(Expression::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    // `^` binds tighter than unary on its left and is right-associative:
    // `-2^2` is `-(2^2)`, `2^3^2` is `2^(3^2)`.
    fn parse_power(&mut self) -> Result<Expression> {
        let base = self.parse_atom()?;
        if self.match_token(&TokenKind::Caret) {
            let exponent = self.parse_unary()?;
            return Ok(Expression::Binary {
                op: BinaryOp::Pow,
                left: Box::new(base),
                right: Box::new(exponent),
            });
        }
        Ok(base)
    }

    fn parse_atom(&mut self) -> Result<Expression> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Int(n) => {
                self.advance();
                Ok(Expression::Int(n))
            }
            TokenKind::Float(f) => {
                self.advance();
                Ok(Expression::Float(f))
            }
            TokenKind::Str(s) => {
                self.advance();
                Ok(Expression::Str(s))
            }
            TokenKind::True => {
                self.advance();
                Ok(Expression::Bool(true))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expression::Bool(false))
            }
            TokenKind::Nil => {
                self.advance();
                Ok(Expression::Nil)
            }
            TokenKind::LeftParen => {
                self.advance();
                let inner = self.parse_expression()?;
                self.consume(&TokenKind::RightParen, "')'")?;
                Ok(inner)
            }
            TokenKind::LeftBrace => {
                self.advance();
                let mut elements = Vec::new();
                if !matches!(self.peek().kind, TokenKind::RightBrace) {
                    loop {
                        elements.push(self.parse_expression()?);
                        if !self.match_token(&TokenKind::Comma) {
                            break;
                        }
                    }
                }
                self.consume(&TokenKind::RightBrace, "'}'")?;
                Ok(Expression::List(elements))
            }
            TokenKind::Name(name) => {
                self.advance();
                match self.peek().kind {
                    TokenKind::LeftParen => {
                        let args = self.parse_call_args()?;
                        Ok(Expression::Call(FunctionCall { name, args }))
                    }
                    TokenKind::LeftBracket => {
                        self.advance();
                        let index = self.parse_expression()?;
                        self.consume(&TokenKind::RightBracket, "']'")?;
                        Ok(Expression::Variable {
                            name,
                            index: Some(Box::new(index)),
                        })
                    }
                    _ => Ok(Expression::Variable { name, index: None }),
                }
            }
            TokenKind::Eof => Err(Error::UnexpectedEof),
            _ => Err(self.unexpected("expression")),
        }
    }

    // The opening parenthesis has not been consumed yet.
    fn parse_call_args(&mut self) -> Result<Vec<Expression>> {
        self.consume(&TokenKind::LeftParen, "'('")?;
        let mut args = Vec::new();
        if !matches!(self.peek().kind, TokenKind::RightParen) {
            loop {
                args.push(self.parse_expression()?);
                if !self.match_token(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(&TokenKind::RightParen, "')'")?;
        Ok(args)
    }

    // Token stream helpers.

    fn is_at_end(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Eof)
    }

    // A block ends at `end`, `elseif`, `else`, or end of file.
    fn at_block_end(&self) -> bool {
        matches!(
            self.peek().kind,
            TokenKind::End | TokenKind::Elseif | TokenKind::Else | TokenKind::Eof
        )
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.current < self.tokens.len() - 1 {
            self.current += 1;
        }
        token
    }

    fn check(&self, kind: &TokenKind) -> bool {
        &self.peek().kind == kind
    }

    fn match_token(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn consume(&mut self, kind: &TokenKind, expected: &str) -> Result<Token> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn consume_name(&mut self) -> Result<String> {
        match self.peek().kind.clone() {
            TokenKind::Name(name) => {
                self.advance();
                Ok(name)
            }
            _ => Err(self.unexpected("identifier")),
        }
    }

    fn unexpected(&self, expected: &str) -> Error {
        let token = self.peek();
        if matches!(token.kind, TokenKind::Eof) {
            Error::UnexpectedEof
        } else {
            Error::UnexpectedToken {
                expected: expected.to_string(),
                got: token.kind.to_string(),
                line: token.line,
            }
        }
    }
}

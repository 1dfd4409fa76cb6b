use super::functions::Function;
use super::lexer::{lex, Token};
use crate::error::ExprError;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinOp {
    Or,
    And,
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Node {
    Literal(Value),
    Var(String),
    Neg(Box<Node>),
    Not(Box<Node>),
    Binary(BinOp, Box<Node>, Box<Node>),
    Call(Function, Vec<Node>),
}

impl Node {
    pub(crate) fn collect_vars<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Node::Literal(_) => {}
            Node::Var(name) => {
                if !out.contains(&name.as_str()) {
                    out.push(name);
                }
            }
            Node::Neg(n) | Node::Not(n) => n.collect_vars(out),
            Node::Binary(_, l, r) => {
                l.collect_vars(out);
                r.collect_vars(out);
            }
            Node::Call(_, args) => {
                for a in args {
                    a.collect_vars(out);
                }
            }
        }
    }
}

pub(crate) fn parse(src: &str) -> Result<Node, ExprError> {
    let tokens = lex(src)?;
    let mut parser = Parser { tokens, pos: 0 };
    let node = parser.parse_expr()?;
    if parser.peek() != &Token::Eof {
        return Err(parser.err(format!("unexpected token {:?}", parser.peek())));
    }
    Ok(node)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let t = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        t
    }

    fn err(&self, msg: impl Into<String>) -> ExprError {
        ExprError::InvalidSyntax(msg.into())
    }

    fn expect(&mut self, expected: Token) -> Result<(), ExprError> {
        if self.peek() == &expected {
            self.advance();
            Ok(())
        } else {
            Err(self.err(format!("expected {expected:?}, got {:?}", self.peek())))
        }
    }

    fn parse_expr(&mut self) -> Result<Node, ExprError> {
        self.parse_or_expr()
    }

    fn parse_or_expr(&mut self) -> Result<Node, ExprError> {
        let mut left = self.parse_and_expr()?;
        while self.peek() == &Token::Or {
            self.advance();
            let right = self.parse_and_expr()?;
            left = Node::Binary(BinOp::Or, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and_expr(&mut self) -> Result<Node, ExprError> {
        let mut left = self.parse_compare_expr()?;
        while self.peek() == &Token::And {
            self.advance();
            let right = self.parse_compare_expr()?;
            left = Node::Binary(BinOp::And, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_compare_expr(&mut self) -> Result<Node, ExprError> {
        let mut left = self.parse_additive_expr()?;
        loop {
            let op = match self.peek() {
                Token::Eq => BinOp::Eq,
                Token::Neq => BinOp::Neq,
                Token::Lt => BinOp::Lt,
                Token::Lte => BinOp::Lte,
                Token::Gt => BinOp::Gt,
                Token::Gte => BinOp::Gte,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_additive_expr()?;
            left = Node::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn parse_additive_expr(&mut self) -> Result<Node, ExprError> {
        let mut left = self.parse_multiplicative_expr()?;
        loop {
            let op = match self.peek() {
                Token::Plus => BinOp::Add,
                Token::Minus => BinOp::Sub,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_multiplicative_expr()?;
            left = Node::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn parse_multiplicative_expr(&mut self) -> Result<Node, ExprError> {
        let mut left = self.parse_unary_expr()?;
        loop {
            let op = match self.peek() {
                Token::Star => BinOp::Mul,
                Token::Slash => BinOp::Div,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_unary_expr()?;
            left = Node::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn parse_unary_expr(&mut self) -> Result<Node, ExprError> {
        match self.peek() {
            Token::Bang => {
                self.advance();
                let e = self.parse_unary_expr()?;
                Ok(Node::Not(Box::new(e)))
            }
            Token::Minus | Token::Plus => {
                let sign = if self.advance() == Token::Minus { "-" } else { "+" };
                // A signed numeric literal keeps its written form
                if let Token::Number(n) = self.peek().clone() {
                    self.advance();
                    return Ok(Node::Literal(Value::Str(format!("{sign}{n}"))));
                }
                let e = self.parse_unary_expr()?;
                if sign == "-" {
                    Ok(Node::Neg(Box::new(e)))
                } else {
                    Ok(e)
                }
            }
            _ => self.parse_atom_expr(),
        }
    }

    fn parse_atom_expr(&mut self) -> Result<Node, ExprError> {
        match self.advance() {
            Token::Number(n) => Ok(Node::Literal(Value::Str(n))),
            Token::Str(s) => Ok(Node::Literal(Value::Str(s))),
            Token::LParen => {
                let e = self.parse_expr()?;
                self.expect(Token::RParen)?;
                Ok(e)
            }
            Token::Ident(name) => {
                if self.peek() != &Token::LParen {
                    return Ok(Node::Var(name));
                }
                self.advance();
                let mut args = Vec::new();
                if self.peek() != &Token::RParen {
                    loop {
                        args.push(self.parse_expr()?);
                        if self.peek() == &Token::Comma {
                            self.advance();
                        } else {
                            break;
                        }
                    }
                }
                self.expect(Token::RParen)?;
                let function = Function::lookup(&name)
                    .ok_or_else(|| ExprError::FunctionNotExist(name.clone()))?;
                function.check_arity(args.len())?;
                Ok(Node::Call(function, args))
            }
            other => Err(self.err(format!("unexpected token {other:?}"))),
        }
    }
}

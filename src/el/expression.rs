use super::Value;
use crate::error::ElError;
use std::fmt;

/// The syntax tree of a single `#{...}` or `${...}` expression body.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expression {
    // Logical
    Not(Box<Expression>),
    And(Box<Expression>, Box<Expression>),
    Or(Box<Expression>, Box<Expression>),

    // Comparison
    Equal(Box<Expression>, Box<Expression>),
    NotEqual(Box<Expression>, Box<Expression>),

    // Leaf nodes
    Literal(Value),
    Variable(String),
}

/// One piece of a composite template such as `/#{bean.page}.xhtml`.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Text(String),
    Expr(Expression),
}

/// Returns `true` when `source` contains a delimited `#{...}` or `${...}` expression.
pub fn is_expression(source: &str) -> bool {
    let start = source.find("#{").or_else(|| source.find("${"));
    match start {
        Some(idx) => source[idx + 2..].contains('}'),
        None => false,
    }
}

/// Returns `true` when `source` holds an expression mixed with literal text.
pub fn is_mixed_expression(source: &str) -> bool {
    let delimited = (source.starts_with("#{") || source.starts_with("${")) && source.ends_with('}');
    is_expression(source) && !delimited
}

impl Expression {
    /// Parses a whole delimited expression (`#{...}` or `${...}`).
    pub fn parse(source: &str) -> Result<Expression, ElError> {
        let trimmed = source.trim();
        let body = strip_delimiters(trimmed).ok_or_else(|| ElError::Syntax {
            expression: source.to_string(),
            message: "expected an expression delimited by '#{' and '}'".to_string(),
        })?;
        Self::parse_body(source, body)
    }

    fn parse_body(source: &str, body: &str) -> Result<Expression, ElError> {
        let tokens = tokenize(source, body)?;
        let mut parser = Parser {
            source,
            tokens,
            pos: 0,
        };
        let expr = parser.parse_or()?;
        if parser.pos != parser.tokens.len() {
            return Err(parser.error("unexpected trailing input"));
        }
        Ok(expr)
    }
}

/// Splits a template into literal text and embedded expressions.
pub fn parse_template(source: &str) -> Result<Vec<Segment>, ElError> {
    let mut segments = Vec::new();
    let mut rest = source;
    loop {
        let next = [rest.find("#{"), rest.find("${")]
            .into_iter()
            .flatten()
            .min();
        let Some(start) = next else {
            if !rest.is_empty() {
                segments.push(Segment::Text(rest.to_string()));
            }
            return Ok(segments);
        };
        let Some(len) = rest[start..].find('}') else {
            return Err(ElError::Syntax {
                expression: source.to_string(),
                message: "unterminated expression".to_string(),
            });
        };
        if start > 0 {
            segments.push(Segment::Text(rest[..start].to_string()));
        }
        let body = &rest[start + 2..start + len];
        segments.push(Segment::Expr(Expression::parse_body(source, body)?));
        rest = &rest[start + len + 1..];
    }
}

pub(crate) fn strip_delimiters(source: &str) -> Option<&str> {
    if !(source.starts_with("#{") || source.starts_with("${")) || !source.ends_with('}') {
        return None;
    }
    Some(source[2..source.len() - 1].trim())
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Num(f64),
    LParen,
    RParen,
    Not,
    And,
    Or,
    Eq,
    Ne,
}

fn tokenize(source: &str, body: &str) -> Result<Vec<Token>, ElError> {
    let syntax = |message: String| ElError::Syntax {
        expression: source.to_string(),
        message,
    };
    let chars: Vec<char> = body.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' | '\n' | '\r' => i += 1,
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '!' if chars.get(i + 1) == Some(&'=') => {
                tokens.push(Token::Ne);
                i += 2;
            }
            '!' => {
                tokens.push(Token::Not);
                i += 1;
            }
            '=' if chars.get(i + 1) == Some(&'=') => {
                tokens.push(Token::Eq);
                i += 2;
            }
            '&' if chars.get(i + 1) == Some(&'&') => {
                tokens.push(Token::And);
                i += 2;
            }
            '|' if chars.get(i + 1) == Some(&'|') => {
                tokens.push(Token::Or);
                i += 2;
            }
            '\'' | '"' => {
                let quote = c;
                let start = i + 1;
                let mut end = start;
                while end < chars.len() && chars[end] != quote {
                    end += 1;
                }
                if end >= chars.len() {
                    return Err(syntax("unterminated string literal".to_string()));
                }
                tokens.push(Token::Str(chars[start..end].iter().collect()));
                i = end + 1;
            }
            c if c.is_ascii_digit() => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let number = text
                    .parse::<f64>()
                    .map_err(|_| syntax(format!("invalid number '{}'", text)))?;
                tokens.push(Token::Num(number));
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '.')
                {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                let token = match word.as_str() {
                    "not" => Token::Not,
                    "and" => Token::And,
                    "or" => Token::Or,
                    "eq" => Token::Eq,
                    "ne" => Token::Ne,
                    _ => Token::Ident(word),
                };
                tokens.push(token);
            }
            other => return Err(syntax(format!("unexpected character '{}'", other))),
        }
    }
    Ok(tokens)
}

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser<'_> {
    fn error(&self, message: &str) -> ElError {
        ElError::Syntax {
            expression: self.source.to_string(),
            message: message.to_string(),
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn parse_or(&mut self) -> Result<Expression, ElError> {
        let mut left = self.parse_and()?;
        while self.peek() == Some(&Token::Or) {
            self.pos += 1;
            let right = self.parse_and()?;
            left = Expression::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expression, ElError> {
        let mut left = self.parse_equality()?;
        while self.peek() == Some(&Token::And) {
            self.pos += 1;
            let right = self.parse_equality()?;
            left = Expression::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expression, ElError> {
        let left = self.parse_unary()?;
        match self.peek() {
            Some(Token::Eq) => {
                self.pos += 1;
                let right = self.parse_unary()?;
                Ok(Expression::Equal(Box::new(left), Box::new(right)))
            }
            Some(Token::Ne) => {
                self.pos += 1;
                let right = self.parse_unary()?;
                Ok(Expression::NotEqual(Box::new(left), Box::new(right)))
            }
            _ => Ok(left),
        }
    }

    fn parse_unary(&mut self) -> Result<Expression, ElError> {
        if self.peek() == Some(&Token::Not) {
            self.pos += 1;
            let inner = self.parse_unary()?;
            return Ok(Expression::Not(Box::new(inner)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expression, ElError> {
        match self.advance() {
            Some(Token::LParen) => {
                let inner = self.parse_or()?;
                if self.advance() != Some(Token::RParen) {
                    return Err(self.error("expected ')'"));
                }
                Ok(inner)
            }
            Some(Token::Str(s)) => Ok(Expression::Literal(Value::Text(s))),
            Some(Token::Num(n)) => Ok(Expression::Literal(Value::Number(n))),
            Some(Token::Ident(word)) => Ok(match word.as_str() {
                "true" => Expression::Literal(Value::Bool(true)),
                "false" => Expression::Literal(Value::Bool(false)),
                "null" => Expression::Literal(Value::Null),
                _ => Expression::Variable(word),
            }),
            Some(_) => Err(self.error("unexpected operator")),
            None => Err(self.error("unexpected end of expression")),
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Not(v) => write!(f, "!{}", v),
            Expression::And(l, r) => write!(f, "({} && {})", l, r),
            Expression::Or(l, r) => write!(f, "({} || {})", l, r),
            Expression::Equal(l, r) => write!(f, "{} == {}", l, r),
            Expression::NotEqual(l, r) => write!(f, "{} != {}", l, r),
            Expression::Literal(Value::Text(s)) => write!(f, "'{}'", s),
            Expression::Literal(v) => write!(f, "{}", v),
            Expression::Variable(name) => write!(f, "{}", name),
        }
    }
}

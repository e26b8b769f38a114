use std::f64::consts;

use super::node::{BinOp, Func, Node};

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Num(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    LParen,
    RParen,
    LBracket,
    RBracket,
}

/// A parse error, with the byte offset in the source where it was detected
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ParseError {
    pub position: usize,
    pub message: String,
}

impl ParseError {
    fn new(position: usize, message: impl Into<String>) -> Self {
        Self {
            position,
            message: message.into(),
        }
    }
}

fn tokenize(src: &str) -> Result<Vec<(Token, usize)>, ParseError> {
    let bytes = src.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i];
        let start = i;
        let token = match c {
            b' ' | b'\t' | b'\n' | b'\r' => {
                i += 1;
                continue;
            }
            b'+' => Token::Plus,
            b'-' => Token::Minus,
            b'*' => Token::Star,
            b'/' => Token::Slash,
            b'^' => Token::Caret,
            b'(' => Token::LParen,
            b')' => Token::RParen,
            b'[' => Token::LBracket,
            b']' => Token::RBracket,
            b'0'..=b'9' | b'.' => {
                while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'.') {
                    i += 1;
                }
                // exponent, only if followed by digits so that `2e` is not swallowed
                if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
                    let mut j = i + 1;
                    if j < bytes.len() && (bytes[j] == b'+' || bytes[j] == b'-') {
                        j += 1;
                    }
                    if j < bytes.len() && bytes[j].is_ascii_digit() {
                        while j < bytes.len() && bytes[j].is_ascii_digit() {
                            j += 1;
                        }
                        i = j;
                    }
                }
                let text = &src[start..i];
                let value = text
                    .parse::<f64>()
                    .map_err(|_| ParseError::new(start, format!("invalid number '{text}'")))?;
                tokens.push((Token::Num(value), start));
                continue;
            }
            c if c.is_ascii_alphabetic() || c == b'_' => {
                while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                    i += 1;
                }
                tokens.push((Token::Ident(src[start..i].to_string()), start));
                continue;
            }
            _ => {
                let ch = src[start..].chars().next().unwrap_or('?');
                return Err(ParseError::new(start, format!("unexpected character '{ch}'")));
            }
        };
        tokens.push((token, start));
        i += 1;
    }
    Ok(tokens)
}

/// Recursive descent parser over the token stream.
///
/// ```text
/// expr    := term (('+' | '-') term)*
/// term    := unary (('*' | '/') unary)*
/// unary   := ('-' | '+') unary | power
/// power   := primary ('^' unary)?
/// primary := number | variable | func '(' expr ')' | '(' expr ')'
/// ```
struct Parser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
    end: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn offset(&self) -> usize {
        self.tokens.get(self.pos).map_or(self.end, |(_, o)| *o)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|(t, _)| t.clone());
        self.pos += 1;
        token
    }

    fn expect(&mut self, expected: Token, what: &str) -> Result<(), ParseError> {
        let offset = self.offset();
        match self.next() {
            Some(t) if t == expected => Ok(()),
            _ => Err(ParseError::new(offset, format!("expected {what}"))),
        }
    }

    fn expr(&mut self) -> Result<Node, ParseError> {
        let mut lhs = self.term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinOp::Add,
                Some(Token::Minus) => BinOp::Sub,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.term()?;
            lhs = Node::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn term(&mut self) -> Result<Node, ParseError> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinOp::Mul,
                Some(Token::Slash) => BinOp::Div,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.unary()?;
            lhs = Node::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn unary(&mut self) -> Result<Node, ParseError> {
        match self.peek() {
            Some(Token::Minus) => {
                self.pos += 1;
                Ok(Node::Neg(Box::new(self.unary()?)))
            }
            Some(Token::Plus) => {
                self.pos += 1;
                self.unary()
            }
            _ => self.power(),
        }
    }

    fn power(&mut self) -> Result<Node, ParseError> {
        let base = self.primary()?;
        if let Some(Token::Caret) = self.peek() {
            self.pos += 1;
            let exponent = self.unary()?;
            return Ok(Node::Binary(BinOp::Pow, Box::new(base), Box::new(exponent)));
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<Node, ParseError> {
        let offset = self.offset();
        match self.next() {
            Some(Token::Num(value)) => Ok(Node::Const(value)),
            Some(Token::LParen) => {
                let inner = self.expr()?;
                self.expect(Token::RParen, "')'")?;
                Ok(inner)
            }
            Some(Token::Ident(name)) => self.identifier(name, offset),
            Some(t) => Err(ParseError::new(offset, format!("unexpected token {t:?}"))),
            None => Err(ParseError::new(offset, "unexpected end of expression")),
        }
    }

    fn identifier(&mut self, name: String, offset: usize) -> Result<Node, ParseError> {
        if let Some(func) = Func::from_name(&name) {
            self.expect(Token::LParen, &format!("'(' after {name}"))?;
            let arg = self.expr()?;
            self.expect(Token::RParen, "')'")?;
            return Ok(Node::Call(func, Box::new(arg)));
        }
        match name.as_str() {
            "t" => return Ok(Node::Time),
            "pi" => return Ok(Node::Const(consts::PI)),
            "e" => return Ok(Node::Const(consts::E)),
            "u" | "p" => {
                // indexed form: u[1], p[2]
                self.expect(Token::LBracket, &format!("'[' after {name}"))?;
                let index_offset = self.offset();
                let index = match self.next() {
                    Some(Token::Num(value)) if value.fract() == 0.0 && value >= 0.0 => {
                        value as usize
                    }
                    _ => return Err(ParseError::new(index_offset, "expected an integer index")),
                };
                self.expect(Token::RBracket, "']'")?;
                return Self::variable(&name[..1], index, offset);
            }
            _ => {}
        }
        let (prefix, digits) = name.split_at(1);
        if (prefix == "u" || prefix == "p") && digits.bytes().all(|b| b.is_ascii_digit()) {
            let index = digits
                .parse::<usize>()
                .map_err(|_| ParseError::new(offset, format!("invalid index in '{name}'")))?;
            return Self::variable(prefix, index, offset);
        }
        Err(ParseError::new(offset, format!("unknown identifier '{name}'")))
    }

    /// `index` is 1-based in the source
    fn variable(prefix: &str, index: usize, offset: usize) -> Result<Node, ParseError> {
        if index == 0 {
            return Err(ParseError::new(offset, "indices start at 1"));
        }
        Ok(match prefix {
            "u" => Node::State(index - 1),
            _ => Node::Param(index - 1),
        })
    }
}

pub(crate) fn parse(src: &str) -> Result<Node, ParseError> {
    let tokens = tokenize(src)?;
    if tokens.is_empty() {
        return Err(ParseError::new(0, "empty expression"));
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        end: src.len(),
    };
    let node = parser.expr()?;
    if parser.pos < parser.tokens.len() {
        return Err(ParseError::new(parser.offset(), "unexpected trailing input"));
    }
    Ok(node)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(src: &str, u: &[f64], p: &[f64], t: f64) -> f64 {
        parse(src).unwrap().eval(u, p, t)
    }

    #[test]
    fn precedence_and_associativity() {
        assert_eq!(eval("1 + 2 * 3", &[], &[], 0.0), 7.0);
        assert_eq!(eval("(1 + 2) * 3", &[], &[], 0.0), 9.0);
        assert_eq!(eval("8 / 4 / 2", &[], &[], 0.0), 1.0);
        assert_eq!(eval("2 ^ 3 ^ 2", &[], &[], 0.0), 512.0);
        assert_eq!(eval("-2 ^ 2", &[], &[], 0.0), -4.0);
        assert_eq!(eval("2 ^ -1", &[], &[], 0.0), 0.5);
        assert_eq!(eval("1.5e2 - 5E-1", &[], &[], 0.0), 149.5);
    }

    #[test]
    fn variables_and_functions() {
        let u = [1.0, 2.0, 3.0];
        let p = [10.0, 28.0];
        assert_eq!(eval("p1 * (u2 - u1)", &u, &p, 0.0), 10.0);
        assert_eq!(eval("p[2] - u[3]", &u, &p, 0.0), 25.0);
        assert_eq!(eval("t * u3", &u, &p, 2.0), 6.0);
        assert_eq!(eval("exp(0) + sqrt(4) + abs(-1)", &u, &p, 0.0), 4.0);
        assert_eq!(eval("sin(pi / 2)", &u, &p, 0.0), 1.0);
        assert_eq!(eval("ln(e)", &u, &p, 0.0), 1.0);
    }

    #[test]
    fn errors_report_position() {
        assert_eq!(
            parse("u1 + * u2").unwrap_err(),
            ParseError::new(5, "unexpected token Star")
        );
        assert_eq!(
            parse("sin u1").unwrap_err(),
            ParseError::new(4, "expected '(' after sin")
        );
        assert_eq!(
            parse("(u1 + u2").unwrap_err(),
            ParseError::new(8, "expected ')'")
        );
        assert_eq!(
            parse("u0").unwrap_err(),
            ParseError::new(0, "indices start at 1")
        );
        assert_eq!(
            parse("x + 1").unwrap_err(),
            ParseError::new(0, "unknown identifier 'x'")
        );
        assert_eq!(
            parse("u1 u2").unwrap_err(),
            ParseError::new(3, "unexpected trailing input")
        );
        assert_eq!(parse("  ").unwrap_err(), ParseError::new(0, "empty expression"));
        assert_eq!(
            parse("u1 # 2").unwrap_err(),
            ParseError::new(3, "unexpected character '#'")
        );
    }
}

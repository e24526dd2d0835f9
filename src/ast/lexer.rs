//! Query lexer.
//!
//! Converts query text into a flat list of positioned [`Token`]s. Whitespace
//! between tokens is skipped. Positions are character offsets so that error
//! pointers line up with what the user typed.

use std::fmt;

use super::error::ParseError;

/// Characters accepted as string delimiters. A literal ends at the first
/// occurrence of the character that opened it; there are no escapes.
const QUOTES: [char; 2] = ['"', '\''];

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Identifier(String),
    String(String),
    Number(i32),
    Dot,
    Comma,
    LParen,
    RParen,
    Arrow,
    Eq,
    NotEq,
    Gt,
    Lt,
    GtEq,
    LtEq,
    AndAnd,
    OrOr,
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Identifier(name) => write!(f, "identifier '{}'", name),
            TokenKind::String(value) => write!(f, "string \"{}\"", value),
            TokenKind::Number(value) => write!(f, "number {}", value),
            TokenKind::Dot => f.write_str("'.'"),
            TokenKind::Comma => f.write_str("','"),
            TokenKind::LParen => f.write_str("'('"),
            TokenKind::RParen => f.write_str("')'"),
            TokenKind::Arrow => f.write_str("'=>'"),
            TokenKind::Eq => f.write_str("'=='"),
            TokenKind::NotEq => f.write_str("'!='"),
            TokenKind::Gt => f.write_str("'>'"),
            TokenKind::Lt => f.write_str("'<'"),
            TokenKind::GtEq => f.write_str("'>='"),
            TokenKind::LtEq => f.write_str("'<='"),
            TokenKind::AndAnd => f.write_str("'&&'"),
            TokenKind::OrOr => f.write_str("'||'"),
            TokenKind::Eof => f.write_str("end of input"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Character offset of the first character of the token.
    pub position: usize,
}

/// Tokenize a whole query. The returned list always ends with `Eof`.
pub fn tokenize(input: &str) -> Result<Vec<Token>, ParseError> {
    Lexer::new(input).run()
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
}

impl Lexer {
    fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn skip_whitespace(&mut self) {
        while self.peek(0).is_some_and(|ch| ch.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn run(mut self) -> Result<Vec<Token>, ParseError> {
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace();
            let start = self.pos;
            let Some(ch) = self.peek(0) else {
                tokens.push(Token {
                    kind: TokenKind::Eof,
                    position: start,
                });
                return Ok(tokens);
            };

            let kind = if ch.is_alphabetic() || ch == '_' {
                self.identifier()
            } else if ch.is_ascii_digit() {
                self.number()?
            } else if QUOTES.contains(&ch) {
                self.string(ch)?
            } else {
                self.symbol(ch)?
            };
            tokens.push(Token {
                kind,
                position: start,
            });
        }
    }

    fn identifier(&mut self) -> TokenKind {
        let start = self.pos;
        while self
            .peek(0)
            .is_some_and(|ch| ch.is_alphanumeric() || ch == '_')
        {
            self.pos += 1;
        }
        TokenKind::Identifier(self.chars[start..self.pos].iter().collect())
    }

    fn number(&mut self) -> Result<TokenKind, ParseError> {
        let start = self.pos;
        while self.peek(0).is_some_and(|ch| ch.is_ascii_digit()) {
            self.pos += 1;
        }
        let digits: String = self.chars[start..self.pos].iter().collect();
        digits
            .parse::<i32>()
            .map(TokenKind::Number)
            .map_err(|_| ParseError::new(start, "32-bit integer", format!("'{}'", digits)))
    }

    fn string(&mut self, quote: char) -> Result<TokenKind, ParseError> {
        let start = self.pos;
        self.pos += 1;
        let content_start = self.pos;
        while let Some(ch) = self.peek(0) {
            if ch == quote {
                let content: String = self.chars[content_start..self.pos].iter().collect();
                self.pos += 1;
                return Ok(TokenKind::String(content));
            }
            self.pos += 1;
        }
        Err(ParseError::new(
            start,
            format!("closing {}", quote),
            "end of input",
        ))
    }

    fn symbol(&mut self, ch: char) -> Result<TokenKind, ParseError> {
        let next = self.peek(1);
        let (kind, len) = match (ch, next) {
            ('=', Some('>')) => (TokenKind::Arrow, 2),
            ('=', Some('=')) => (TokenKind::Eq, 2),
            ('!', Some('=')) => (TokenKind::NotEq, 2),
            ('>', Some('=')) => (TokenKind::GtEq, 2),
            ('<', Some('=')) => (TokenKind::LtEq, 2),
            ('&', Some('&')) => (TokenKind::AndAnd, 2),
            ('|', Some('|')) => (TokenKind::OrOr, 2),
            ('>', _) => (TokenKind::Gt, 1),
            ('<', _) => (TokenKind::Lt, 1),
            ('.', _) => (TokenKind::Dot, 1),
            (',', _) => (TokenKind::Comma, 1),
            ('(', _) => (TokenKind::LParen, 1),
            (')', _) => (TokenKind::RParen, 1),
            _ => {
                return Err(ParseError::new(
                    self.pos,
                    "identifier, literal, operator or punctuation",
                    format!("'{}'", ch),
                ))
            }
        };
        self.pos += len;
        Ok(kind)
    }
}

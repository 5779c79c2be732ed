//! Lexer for the text body of `.x` files.
//!
//! Produces identifiers, integer and real literals, strings, `<guid>`
//! literals and the punctuation of the template/object grammar. Comments
//! start with `//` or `#` and run to the end of the line.

use std::fmt;

use memchr::{memchr, memchr2};
use xof_common::GuidKey;

use crate::error::ParseError;
use crate::staging::Position;

/// A single token with the position of its first character.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Ident(String),
    Integer(i64),
    /// Any numeric literal with a decimal point or exponent.
    Real(f64),
    /// String literal, escapes resolved.
    Str(String),
    Guid(GuidKey),
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Semicolon,
    Comma,
    /// `...`, the open-template marker.
    Ellipsis,
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ident(name) => write!(f, "identifier {}", name),
            Self::Integer(v) => write!(f, "integer {}", v),
            Self::Real(v) => write!(f, "real {}", v),
            Self::Str(s) => write!(f, "string {:?}", s),
            Self::Guid(g) => write!(f, "guid <{}>", g),
            Self::LBrace => f.write_str("'{'"),
            Self::RBrace => f.write_str("'}'"),
            Self::LBracket => f.write_str("'['"),
            Self::RBracket => f.write_str("']'"),
            Self::Semicolon => f.write_str("';'"),
            Self::Comma => f.write_str("','"),
            Self::Ellipsis => f.write_str("'...'"),
            Self::Eof => f.write_str("end of file"),
        }
    }
}

/// Tokenize a whole body. The last token is always [`TokenKind::Eof`].
pub fn tokenize(src: &str) -> Result<Vec<Token>, ParseError> {
    Lexer::new(src).run()
}

/// Check if `name` can be written back as an identifier.
pub fn is_identifier(name: &str) -> bool {
    let bytes = name.as_bytes();
    match bytes.first() {
        Some(&c) if is_ident_start(c) => bytes[1..].iter().all(|&c| is_ident_continue(c)),
        _ => false,
    }
}

struct Lexer<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    line: u32,
    line_start: usize,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos: 0,
            line: 1,
            line_start: 0,
        }
    }

    fn run(mut self) -> Result<Vec<Token>, ParseError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn ch(&self) -> u8 {
        self.ch_at(0)
    }

    fn ch_at(&self, offset: usize) -> u8 {
        self.bytes.get(self.pos + offset).copied().unwrap_or(0)
    }

    fn position(&self) -> Position {
        Position::new(self.line, (self.pos - self.line_start + 1) as u32)
    }

    fn position_at(&self, pos: usize) -> Position {
        Position::new(self.line, (pos - self.line_start + 1) as u32)
    }

    /// Move to `pos`, counting the line breaks passed over.
    fn seek(&mut self, pos: usize) {
        let mut from = self.pos;
        while let Some(i) = memchr(b'\n', &self.bytes[from..pos]) {
            self.line += 1;
            self.line_start = from + i + 1;
            from = self.line_start;
        }
        self.pos = pos;
    }

    fn skip_trivia(&mut self) {
        while !self.at_end() {
            match self.ch() {
                b'\n' => {
                    self.pos += 1;
                    self.line += 1;
                    self.line_start = self.pos;
                }
                b' ' | b'\t' | b'\r' | 0x0c => self.pos += 1,
                b'#' => self.skip_line(),
                b'/' if self.ch_at(1) == b'/' => self.skip_line(),
                _ => break,
            }
        }
    }

    fn skip_line(&mut self) {
        self.pos = match memchr(b'\n', &self.bytes[self.pos..]) {
            Some(i) => self.pos + i,
            None => self.bytes.len(),
        };
    }

    fn token(&mut self, kind: TokenKind, position: Position, len: usize) -> Token {
        self.pos += len;
        Token { kind, position }
    }

    fn next_token(&mut self) -> Result<Token, ParseError> {
        self.skip_trivia();
        let position = self.position();
        if self.at_end() {
            return Ok(Token {
                kind: TokenKind::Eof,
                position,
            });
        }

        let token = match self.ch() {
            b'{' => self.token(TokenKind::LBrace, position, 1),
            b'}' => self.token(TokenKind::RBrace, position, 1),
            b'[' => self.token(TokenKind::LBracket, position, 1),
            b']' => self.token(TokenKind::RBracket, position, 1),
            b';' => self.token(TokenKind::Semicolon, position, 1),
            b',' => self.token(TokenKind::Comma, position, 1),
            b'.' if self.ch_at(1) == b'.' && self.ch_at(2) == b'.' => {
                self.token(TokenKind::Ellipsis, position, 3)
            }
            b'"' => self.scan_string(position)?,
            b'<' => self.scan_guid(position)?,
            c if c.is_ascii_digit() || c == b'-' || c == b'+' || c == b'.' => {
                self.scan_number(position)?
            }
            c if is_ident_start(c) => self.scan_ident(position),
            _ => {
                let found = self.src[self.pos..].chars().next().unwrap_or('\0');
                return Err(ParseError::BadCharacter { position, found });
            }
        };
        Ok(token)
    }

    fn scan_ident(&mut self, position: Position) -> Token {
        let start = self.pos;
        while !self.at_end() && is_ident_continue(self.ch()) {
            self.pos += 1;
        }
        Token {
            kind: TokenKind::Ident(self.src[start..self.pos].to_string()),
            position,
        }
    }

    fn scan_number(&mut self, position: Position) -> Result<Token, ParseError> {
        let start = self.pos;
        let mut real = false;

        if matches!(self.ch(), b'-' | b'+') {
            self.pos += 1;
        }
        let digits_start = self.pos;
        while self.ch().is_ascii_digit() {
            self.pos += 1;
        }
        if self.ch() == b'.' {
            real = true;
            self.pos += 1;
            while self.ch().is_ascii_digit() {
                self.pos += 1;
            }
        }
        let mantissa = &self.bytes[digits_start..self.pos];
        if mantissa.is_empty() || mantissa == b"." {
            return Err(ParseError::BadNumber {
                position,
                text: self.src[start..self.pos.max(start + 1)].to_string(),
            });
        }
        if matches!(self.ch(), b'e' | b'E') {
            let sign = usize::from(matches!(self.ch_at(1), b'-' | b'+'));
            if self.ch_at(1 + sign).is_ascii_digit() {
                real = true;
                self.pos += 1 + sign;
                while self.ch().is_ascii_digit() {
                    self.pos += 1;
                }
            }
        }

        let text = &self.src[start..self.pos];
        let bad = || ParseError::BadNumber {
            position,
            text: text.to_string(),
        };
        let kind = if real {
            TokenKind::Real(text.parse::<f64>().map_err(|_| bad())?)
        } else {
            TokenKind::Integer(text.parse::<i64>().map_err(|_| bad())?)
        };
        Ok(Token { kind, position })
    }

    fn scan_string(&mut self, position: Position) -> Result<Token, ParseError> {
        let mut value = String::new();
        let mut from = self.pos + 1;

        loop {
            let Some(i) = memchr2(b'"', b'\\', &self.bytes[from..]) else {
                return Err(ParseError::UnterminatedString { position });
            };
            let at = from + i;
            value.push_str(&self.src[from..at]);
            if self.bytes[at] == b'"' {
                self.seek(at + 1);
                return Ok(Token {
                    kind: TokenKind::Str(value),
                    position,
                });
            }

            let Some(escaped) = self.src[at + 1..].chars().next() else {
                return Err(ParseError::UnterminatedString { position });
            };
            match escaped {
                'n' => value.push('\n'),
                'r' => value.push('\r'),
                't' => value.push('\t'),
                other => value.push(other),
            }
            from = at + 1 + escaped.len_utf8();
        }
    }

    fn scan_guid(&mut self, position: Position) -> Result<Token, ParseError> {
        let start = self.pos + 1;
        let Some(len) = memchr(b'>', &self.bytes[start..]) else {
            return Err(ParseError::Unexpected {
                position,
                expected: "'>' closing the GUID",
                found: "end of file".into(),
            });
        };
        let text = self.src[start..start + len].trim();
        let guid = GuidKey::parse(text).map_err(|source| ParseError::Guid {
            position: self.position_at(start),
            source,
        })?;
        self.seek(start + len + 1);
        Ok(Token {
            kind: TokenKind::Guid(guid),
            position,
        })
    }
}

fn is_ident_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_'
}

fn is_ident_continue(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_' || c == b'-'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        let mut tokens: Vec<_> = tokenize(src).unwrap().into_iter().map(|t| t.kind).collect();
        assert_eq!(tokens.pop(), Some(TokenKind::Eof));
        tokens
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            kinds("3; -1, 0.5 -2.0e3 1e2 .25 7."),
            vec![
                TokenKind::Integer(3),
                TokenKind::Semicolon,
                TokenKind::Integer(-1),
                TokenKind::Comma,
                TokenKind::Real(0.5),
                TokenKind::Real(-2000.0),
                TokenKind::Real(100.0),
                TokenKind::Real(0.25),
                TokenKind::Real(7.0),
            ]
        );
    }

    #[test]
    fn test_number_overflow() {
        assert!(matches!(
            tokenize("99999999999999999999"),
            Err(ParseError::BadNumber { .. })
        ));
        assert!(matches!(tokenize("- 1"), Err(ParseError::BadNumber { .. })));
    }

    #[test]
    fn test_identifiers_and_punctuation() {
        assert_eq!(
            kinds("template Mesh-1 { [...] }"),
            vec![
                TokenKind::Ident("template".into()),
                TokenKind::Ident("Mesh-1".into()),
                TokenKind::LBrace,
                TokenKind::LBracket,
                TokenKind::Ellipsis,
                TokenKind::RBracket,
                TokenKind::RBrace,
            ]
        );
    }

    #[test]
    fn test_strings() {
        assert_eq!(
            kinds(r#""tex\\wood.png" "a\"b\n""#),
            vec![
                TokenKind::Str("tex\\wood.png".into()),
                TokenKind::Str("a\"b\n".into()),
            ]
        );
        assert!(matches!(
            tokenize("\"open"),
            Err(ParseError::UnterminatedString { .. })
        ));
    }

    #[test]
    fn test_guid_literal() {
        let tokens = kinds("<3D82AB44-62DA-11CF-AB39-0020AF71E433>");
        assert_eq!(
            tokens,
            vec![TokenKind::Guid(
                GuidKey::parse("3d82ab44-62da-11cf-ab39-0020af71e433").unwrap()
            )]
        );
        assert!(matches!(tokenize("<3D82AB44>"), Err(ParseError::Guid { .. })));
    }

    #[test]
    fn test_comments_and_positions() {
        let tokens = tokenize("// header\n# other\n  Frame \"a\nb\" x").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Ident("Frame".into()));
        assert_eq!(tokens[0].position, Position::new(3, 3));
        assert_eq!(tokens[2].kind, TokenKind::Ident("x".into()));
        assert_eq!(tokens[2].position, Position::new(4, 4));
    }

    #[test]
    fn test_bad_character() {
        assert!(matches!(
            tokenize("Frame @"),
            Err(ParseError::BadCharacter { found: '@', .. })
        ));
    }

    #[test]
    fn test_is_identifier() {
        assert!(is_identifier("Cube_01"));
        assert!(is_identifier("Mesh-1"));
        assert!(!is_identifier("1abc"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("a b"));
    }
}

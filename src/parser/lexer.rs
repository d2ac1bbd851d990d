//! Lexer for the Observed Scripting Language
//!
//! Tokenizes a source buffer into a stream of tokens that the parser
//! consumes. Understands long-bracket comments (`--[[ … ]]`) and long
//! strings (`[[ … ]]`) directly, independent of the line scanner in
//! `scanner` — the two exist in parallel so that a scanner bug or a parser
//! bug don't compound.

use crate::error::ParseError;
use crate::parser::types::LineIndex;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Eof,

    // Keywords
    And,
    Break,
    Do,
    Else,
    Elseif,
    End,
    False,
    For,
    Function,
    Goto,
    If,
    In,
    Local,
    Nil,
    Not,
    Or,
    Repeat,
    Return,
    Then,
    True,
    Until,
    While,

    // Literals / identifiers
    Name,
    Number,
    Str,

    // Symbols
    Plus,     // +
    Minus,    // -
    Star,     // *
    Slash,    // /
    Percent,  // %
    Caret,    // ^
    Hash,     // #
    Eq,       // ==
    Ne,       // ~=
    Le,       // <=
    Ge,       // >=
    Lt,       // <
    Gt,       // >
    Assign,   // =
    LParen,   // (
    RParen,   // )
    LBrace,   // {
    RBrace,   // }
    LBracket, // [
    RBracket, // ]
    DColon,   // ::
    Semi,     // ;
    Colon,    // :
    Comma,    // ,
    Dot,      // .
    Concat,   // ..
    Ellipsis, // ...
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

lazy_static::lazy_static! {
    static ref KEYWORDS: HashMap<&'static str, TokenKind> = {
        let mut m = HashMap::new();
        m.insert("and", TokenKind::And);
        m.insert("break", TokenKind::Break);
        m.insert("do", TokenKind::Do);
        m.insert("else", TokenKind::Else);
        m.insert("elseif", TokenKind::Elseif);
        m.insert("end", TokenKind::End);
        m.insert("false", TokenKind::False);
        m.insert("for", TokenKind::For);
        m.insert("function", TokenKind::Function);
        m.insert("goto", TokenKind::Goto);
        m.insert("if", TokenKind::If);
        m.insert("in", TokenKind::In);
        m.insert("local", TokenKind::Local);
        m.insert("nil", TokenKind::Nil);
        m.insert("not", TokenKind::Not);
        m.insert("or", TokenKind::Or);
        m.insert("repeat", TokenKind::Repeat);
        m.insert("return", TokenKind::Return);
        m.insert("then", TokenKind::Then);
        m.insert("true", TokenKind::True);
        m.insert("until", TokenKind::Until);
        m.insert("while", TokenKind::While);
        m
    };
}

pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
    offset_of: Vec<usize>,
    line_index: LineIndex,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        let chars: Vec<char> = source.chars().collect();
        let mut offset_of = Vec::with_capacity(chars.len() + 1);
        let mut byte_off = 0usize;
        for c in &chars {
            offset_of.push(byte_off);
            byte_off += c.len_utf8();
        }
        offset_of.push(byte_off);
        Lexer {
            chars,
            pos: 0,
            offset_of,
            line_index: LineIndex::new(source),
        }
    }

    fn byte_offset(&self, pos: usize) -> usize {
        self.offset_of[pos.min(self.offset_of.len() - 1)]
    }

    fn make_token(&self, kind: TokenKind, text: String, start_pos: usize) -> Token {
        let offset = self.byte_offset(start_pos);
        Token {
            kind,
            text,
            line: self.line_index.line_for_offset(offset),
            column: self.line_index.column_for_offset(offset),
            offset,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.chars.get(self.pos + n).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    /// Attempts to consume a long bracket `[=*[ ... ]=*]` starting at the
    /// current position (current char must be `[`). Returns the enclosed
    /// text (not including the delimiters) if a long bracket opens here.
    fn try_long_bracket(&mut self) -> Option<String> {
        if self.peek() != Some('[') {
            return None;
        }
        let mut i = self.pos + 1;
        let mut level = 0usize;
        while self.chars.get(i) == Some(&'=') {
            level += 1;
            i += 1;
        }
        if self.chars.get(i) != Some(&'[') {
            return None;
        }
        i += 1;
        // Lua long brackets drop an immediately-following newline.
        if self.chars.get(i) == Some(&'\n') {
            i += 1;
        }
        let content_start = i;
        loop {
            match self.chars.get(i) {
                None => {
                    // Unterminated: treat remainder of file as the body.
                    let text: String = self.chars[content_start..].iter().collect();
                    self.pos = self.chars.len();
                    return Some(text);
                }
                Some(']') => {
                    let mut j = i + 1;
                    let mut close_level = 0usize;
                    while self.chars.get(j) == Some(&'=') {
                        close_level += 1;
                        j += 1;
                    }
                    if close_level == level && self.chars.get(j) == Some(&']') {
                        let text: String = self.chars[content_start..i].iter().collect();
                        self.pos = j + 1;
                        return Some(text);
                    }
                    i += 1;
                }
                _ => i += 1,
            }
        }
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.advance();
                }
                Some('-') if self.peek_at(1) == Some('-') => {
                    self.pos += 2;
                    if self.peek() == Some('[') {
                        let save = self.pos;
                        if self.try_long_bracket().is_some() {
                            continue;
                        }
                        self.pos = save;
                    }
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    fn read_name(&mut self) -> String {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                self.advance();
            } else {
                break;
            }
        }
        self.chars[start..self.pos].iter().collect()
    }

    fn read_number(&mut self) -> Result<String, ParseError> {
        let start = self.pos;
        if self.peek() == Some('0') && matches!(self.peek_at(1), Some('x') | Some('X')) {
            self.pos += 2;
            while let Some(c) = self.peek() {
                if c.is_ascii_hexdigit() {
                    self.advance();
                } else {
                    break;
                }
            }
            return Ok(self.chars[start..self.pos].iter().collect());
        }
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                self.advance();
            } else {
                break;
            }
        }
        if self.peek() == Some('.') {
            self.advance();
            while let Some(c) = self.peek() {
                if c.is_ascii_digit() {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        if matches!(self.peek(), Some('e') | Some('E')) {
            self.advance();
            if matches!(self.peek(), Some('+') | Some('-')) {
                self.advance();
            }
            while let Some(c) = self.peek() {
                if c.is_ascii_digit() {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }

    fn read_quoted_string(&mut self, quote: char) -> Result<String, ParseError> {
        self.advance(); // opening quote
        let mut s = String::new();
        loop {
            match self.peek() {
                None => {
                    let line = self.line_index.line_for_offset(self.byte_offset(self.pos));
                    return Err(ParseError::syntax("unterminated string", line, 0));
                }
                Some(c) if c == quote => {
                    self.advance();
                    return Ok(s);
                }
                Some('\\') => {
                    self.advance();
                    if let Some(esc) = self.advance() {
                        s.push(match esc {
                            'n' => '\n',
                            't' => '\t',
                            'r' => '\r',
                            '\\' => '\\',
                            '"' => '"',
                            '\'' => '\'',
                            other => other,
                        });
                    }
                }
                Some(c) => {
                    s.push(c);
                    self.advance();
                }
            }
        }
    }

    pub fn tokenize(&mut self) -> Result<Vec<Token>, ParseError> {
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace_and_comments();
            let start_pos = self.pos;
            let c = match self.peek() {
                None => {
                    tokens.push(self.make_token(TokenKind::Eof, String::new(), start_pos));
                    break;
                }
                Some(c) => c,
            };

            if c.is_alphabetic() || c == '_' {
                let name = self.read_name();
                let kind = KEYWORDS.get(name.as_str()).copied().unwrap_or(TokenKind::Name);
                tokens.push(self.make_token(kind, name, start_pos));
                continue;
            }

            if c.is_ascii_digit() {
                let num = self.read_number()?;
                tokens.push(self.make_token(TokenKind::Number, num, start_pos));
                continue;
            }

            if c == '"' || c == '\'' {
                let s = self.read_quoted_string(c)?;
                tokens.push(self.make_token(TokenKind::Str, s, start_pos));
                continue;
            }

            if c == '[' && matches!(self.peek_at(1), Some('[') | Some('=')) {
                if let Some(body) = self.try_long_bracket() {
                    tokens.push(self.make_token(TokenKind::Str, body, start_pos));
                    continue;
                }
            }

            match c {
                '+' => {
                    self.advance();
                    tokens.push(self.make_token(TokenKind::Plus, "+".into(), start_pos));
                }
                '-' => {
                    self.advance();
                    tokens.push(self.make_token(TokenKind::Minus, "-".into(), start_pos));
                }
                '*' => {
                    self.advance();
                    tokens.push(self.make_token(TokenKind::Star, "*".into(), start_pos));
                }
                '/' => {
                    self.advance();
                    tokens.push(self.make_token(TokenKind::Slash, "/".into(), start_pos));
                }
                '%' => {
                    self.advance();
                    tokens.push(self.make_token(TokenKind::Percent, "%".into(), start_pos));
                }
                '^' => {
                    self.advance();
                    tokens.push(self.make_token(TokenKind::Caret, "^".into(), start_pos));
                }
                '#' => {
                    self.advance();
                    tokens.push(self.make_token(TokenKind::Hash, "#".into(), start_pos));
                }
                '=' => {
                    self.advance();
                    if self.peek() == Some('=') {
                        self.advance();
                        tokens.push(self.make_token(TokenKind::Eq, "==".into(), start_pos));
                    } else {
                        tokens.push(self.make_token(TokenKind::Assign, "=".into(), start_pos));
                    }
                }
                '~' => {
                    self.advance();
                    if self.peek() == Some('=') {
                        self.advance();
                        tokens.push(self.make_token(TokenKind::Ne, "~=".into(), start_pos));
                    } else {
                        let line = self.line_index.line_for_offset(self.byte_offset(start_pos));
                        return Err(ParseError::syntax("unexpected '~'", line, 0));
                    }
                }
                '<' => {
                    self.advance();
                    if self.peek() == Some('=') {
                        self.advance();
                        tokens.push(self.make_token(TokenKind::Le, "<=".into(), start_pos));
                    } else {
                        tokens.push(self.make_token(TokenKind::Lt, "<".into(), start_pos));
                    }
                }
                '>' => {
                    self.advance();
                    if self.peek() == Some('=') {
                        self.advance();
                        tokens.push(self.make_token(TokenKind::Ge, ">=".into(), start_pos));
                    } else {
                        tokens.push(self.make_token(TokenKind::Gt, ">".into(), start_pos));
                    }
                }
                '(' => {
                    self.advance();
                    tokens.push(self.make_token(TokenKind::LParen, "(".into(), start_pos));
                }
                ')' => {
                    self.advance();
                    tokens.push(self.make_token(TokenKind::RParen, ")".into(), start_pos));
                }
                '{' => {
                    self.advance();
                    tokens.push(self.make_token(TokenKind::LBrace, "{".into(), start_pos));
                }
                '}' => {
                    self.advance();
                    tokens.push(self.make_token(TokenKind::RBrace, "}".into(), start_pos));
                }
                '[' => {
                    self.advance();
                    tokens.push(self.make_token(TokenKind::LBracket, "[".into(), start_pos));
                }
                ']' => {
                    self.advance();
                    tokens.push(self.make_token(TokenKind::RBracket, "]".into(), start_pos));
                }
                ':' => {
                    self.advance();
                    if self.peek() == Some(':') {
                        self.advance();
                        tokens.push(self.make_token(TokenKind::DColon, "::".into(), start_pos));
                    } else {
                        tokens.push(self.make_token(TokenKind::Colon, ":".into(), start_pos));
                    }
                }
                ';' => {
                    self.advance();
                    tokens.push(self.make_token(TokenKind::Semi, ";".into(), start_pos));
                }
                ',' => {
                    self.advance();
                    tokens.push(self.make_token(TokenKind::Comma, ",".into(), start_pos));
                }
                '.' => {
                    self.advance();
                    if self.peek() == Some('.') {
                        self.advance();
                        if self.peek() == Some('.') {
                            self.advance();
                            tokens.push(self.make_token(TokenKind::Ellipsis, "...".into(), start_pos));
                        } else {
                            tokens.push(self.make_token(TokenKind::Concat, "..".into(), start_pos));
                        }
                    } else if self.peek().map(|c| c.is_ascii_digit()).unwrap_or(false) {
                        self.pos = start_pos;
                        let num = self.read_number()?;
                        tokens.push(self.make_token(TokenKind::Number, num, start_pos));
                    } else {
                        tokens.push(self.make_token(TokenKind::Dot, ".".into(), start_pos));
                    }
                }
                other => {
                    let line = self.line_index.line_for_offset(self.byte_offset(start_pos));
                    return Err(ParseError::syntax(
                        format!("unexpected character '{}'", other),
                        line,
                        0,
                    ));
                }
            }
        }
        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::new(src)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn tokenizes_keywords_and_symbols() {
        let k = kinds("if x then return 1 end");
        assert_eq!(
            k,
            vec![
                TokenKind::If,
                TokenKind::Name,
                TokenKind::Then,
                TokenKind::Return,
                TokenKind::Number,
                TokenKind::End,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn long_string_is_one_token() {
        let k = kinds("x = [[hello\nworld]]");
        assert_eq!(k, vec![TokenKind::Name, TokenKind::Assign, TokenKind::Str, TokenKind::Eof]);
    }

    #[test]
    fn line_comment_is_skipped() {
        let toks = Lexer::new("-- comment\nreturn 1").tokenize().unwrap();
        assert_eq!(toks[0].kind, TokenKind::Return);
        assert_eq!(toks[0].line, 2);
    }

    #[test]
    fn long_comment_spans_lines() {
        let toks = Lexer::new("--[[\nnoise\n]]\nreturn 1").tokenize().unwrap();
        assert_eq!(toks[0].kind, TokenKind::Return);
        assert_eq!(toks[0].line, 4);
    }
}

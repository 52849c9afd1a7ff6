// src/compile/lexer.rs

//! JavaScript / TypeScript tokenizer shared by the source transforms.
//!
//! Whitespace and comments are not tokens: they stay in the gaps between
//! token spans, so anything a transform does not touch is copied through
//! byte for byte. String, template, regular-expression and JSX literals are
//! opaque tokens and are never rewritten from the inside.
//!
//! `>` is always a one-character token (`>>`, `>=` and friends arrive as
//! several adjacent `>`/`=` tokens) so type argument lists can be closed one
//! bracket at a time.

use std::ops::Range;

use anyhow::{bail, Result};

use crate::compile::jsx;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Identifiers and keywords.
    Ident,
    /// `#name`
    PrivateName,
    Punct,
    Number,
    String,
    /// Template literal without substitutions.
    Template,
    /// `` `...${ ``
    TemplateHead,
    /// `}...${`
    TemplateMiddle,
    /// `` }...` ``
    TemplateTail,
    Regex,
    /// A whole JSX element or fragment.
    Jsx,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
    /// A line terminator occurs between the previous token and this one.
    pub newline_before: bool,
}

impl Token {
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.start..self.end]
    }
}

/// Keywords after which an expression (and so a regex or JSX literal) starts.
const EXPRESSION_KEYWORDS: &[&str] = &[
    "return",
    "typeof",
    "instanceof",
    "in",
    "of",
    "new",
    "delete",
    "void",
    "throw",
    "case",
    "do",
    "else",
    "yield",
    "await",
    "default",
    "extends",
];

const PUNCTUATORS: &[&str] = &[
    "...", "===", "!==", "**=", "<<=", "&&=", "||=", "??=", "=>", "==", "!=", "<=", "+=", "-=",
    "*=", "/=", "%=", "&=", "|=", "^=", "++", "--", "<<", "&&", "||", "??", "**",
];

/// Whether an expression may start right after `prev`.
pub fn starts_expression(source: &str, prev: Option<&Token>) -> bool {
    let Some(prev) = prev else { return true };
    match prev.kind {
        TokenKind::Ident => EXPRESSION_KEYWORDS.contains(&prev.text(source)),
        TokenKind::Punct => !matches!(prev.text(source), ")" | "]" | "}" | "++" | "--"),
        TokenKind::TemplateHead | TokenKind::TemplateMiddle => true,
        _ => false,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Brace {
    Block,
    Substitution,
}

pub struct Lexer<'a> {
    source: &'a str,
    pos: usize,
    jsx: bool,
    braces: Vec<Brace>,
    prev: Option<Token>,
    newline: bool,
    comments: Vec<Range<usize>>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str, start: usize, jsx: bool) -> Self {
        Self {
            source,
            pos: start,
            jsx,
            braces: Vec::new(),
            prev: None,
            newline: false,
            comments: Vec::new(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.source[self.pos..].chars().next()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.source.get(self.pos + offset..)?.chars().next()
    }

    fn rest(&self) -> &'a str {
        &self.source[self.pos..]
    }

    fn fail(&self, at: usize, message: &str) -> anyhow::Error {
        anyhow::anyhow!("{message} (line {})", line_at(self.source, at))
    }

    fn skip_trivia(&mut self) -> Result<()> {
        if self.pos == 0 && self.rest().starts_with("#!") {
            let end = self.rest().find('\n').unwrap_or(self.source.len());
            self.comments.push(0..end);
            self.pos = end;
        }
        while let Some(ch) = self.peek() {
            if is_line_terminator(ch) {
                self.newline = true;
                self.pos += ch.len_utf8();
            } else if ch.is_whitespace() || ch == '\u{FEFF}' {
                self.pos += ch.len_utf8();
            } else if self.rest().starts_with("//") {
                let start = self.pos;
                let len = self
                    .rest()
                    .find(|c: char| is_line_terminator(c))
                    .unwrap_or(self.rest().len());
                self.pos += len;
                self.comments.push(start..self.pos);
            } else if self.rest().starts_with("/*") {
                let start = self.pos;
                let Some(len) = self.rest()[2..].find("*/") else {
                    return Err(self.fail(start, "unterminated comment"));
                };
                let end = self.pos + 2 + len + 2;
                if self.source[start..end].contains(is_line_terminator) {
                    self.newline = true;
                }
                self.pos = end;
                self.comments.push(start..end);
            } else {
                break;
            }
        }
        Ok(())
    }

    pub fn next_token(&mut self) -> Result<Option<Token>> {
        self.newline = false;
        self.skip_trivia()?;
        let Some(ch) = self.peek() else {
            return Ok(None);
        };
        let start = self.pos;

        let kind = if is_ident_start(ch) || ch == '\\' {
            self.scan_identifier();
            TokenKind::Ident
        } else if ch == '#' && self.peek_at(1).is_some_and(is_ident_start) {
            self.pos += 1;
            self.scan_identifier();
            TokenKind::PrivateName
        } else if ch.is_ascii_digit()
            || (ch == '.' && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()))
        {
            self.scan_number();
            TokenKind::Number
        } else if ch == '"' || ch == '\'' {
            self.scan_string(ch)?;
            TokenKind::String
        } else if ch == '`' {
            self.pos += 1;
            self.scan_template(start, TokenKind::Template, TokenKind::TemplateHead)?
        } else if ch == '}' && self.braces.last() == Some(&Brace::Substitution) {
            self.braces.pop();
            self.pos += 1;
            self.scan_template(start, TokenKind::TemplateTail, TokenKind::TemplateMiddle)?
        } else if ch == '/' && self.expression_allowed() {
            self.scan_regex()?;
            TokenKind::Regex
        } else if ch == '<' && self.jsx && self.expression_allowed() {
            match jsx::element_end(self.source, start) {
                Some(end) => {
                    self.pos = end;
                    TokenKind::Jsx
                }
                None => {
                    self.scan_punct();
                    TokenKind::Punct
                }
            }
        } else {
            self.scan_punct();
            match &self.source[start..self.pos] {
                "{" => self.braces.push(Brace::Block),
                "}" => {
                    self.braces.pop();
                }
                _ => {}
            }
            TokenKind::Punct
        };

        let token = Token {
            kind,
            start,
            end: self.pos,
            newline_before: self.newline,
        };
        self.prev = Some(token);
        Ok(Some(token))
    }

    fn expression_allowed(&self) -> bool {
        starts_expression(self.source, self.prev.as_ref())
    }

    fn scan_identifier(&mut self) {
        while let Some(ch) = self.peek() {
            if ch == '\\' {
                // \uXXXX or \u{...}
                self.pos += 1;
                if self.peek() == Some('u') {
                    self.pos += 1;
                }
                if self.peek() == Some('{') {
                    let close = self.rest().find('}').map_or(1, |n| n + 1);
                    self.pos += close;
                } else {
                    let len = self.rest().chars().take(4).map(char::len_utf8).sum::<usize>();
                    self.pos += len;
                }
            } else if is_ident_part(ch) {
                self.pos += ch.len_utf8();
            } else {
                break;
            }
        }
    }

    fn scan_number(&mut self) {
        let bytes = self.source.as_bytes();
        if self.rest().len() > 1
            && bytes[self.pos] == b'0'
            && matches!(bytes[self.pos + 1], b'x' | b'X' | b'o' | b'O' | b'b' | b'B')
        {
            self.pos += 2;
            while self.pos < bytes.len() && (bytes[self.pos].is_ascii_hexdigit() || bytes[self.pos] == b'_') {
                self.pos += 1;
            }
        } else {
            let mut seen_dot = false;
            let mut seen_exponent = false;
            while self.pos < bytes.len() {
                match bytes[self.pos] {
                    b'0'..=b'9' | b'_' => self.pos += 1,
                    b'.' if !seen_dot && !seen_exponent => {
                        seen_dot = true;
                        self.pos += 1;
                    }
                    b'e' | b'E' if !seen_exponent => {
                        seen_exponent = true;
                        self.pos += 1;
                        if self.pos < bytes.len() && matches!(bytes[self.pos], b'+' | b'-') {
                            self.pos += 1;
                        }
                    }
                    _ => break,
                }
            }
        }
        if self.peek() == Some('n') {
            self.pos += 1;
        }
    }

    fn scan_string(&mut self, quote: char) -> Result<()> {
        let start = self.pos;
        self.pos += 1;
        while let Some(ch) = self.peek() {
            self.pos += ch.len_utf8();
            if ch == quote {
                return Ok(());
            }
            if ch == '\\' {
                if let Some(escaped) = self.peek() {
                    self.pos += escaped.len_utf8();
                }
            } else if ch == '\n' || ch == '\r' {
                break;
            }
        }
        Err(self.fail(start, "unterminated string literal"))
    }

    /// Scan template characters after `` ` `` or `}` up to the closing
    /// backtick (`done`) or the next `${` (`open`).
    fn scan_template(&mut self, start: usize, done: TokenKind, open: TokenKind) -> Result<TokenKind> {
        while let Some(ch) = self.peek() {
            match ch {
                '\\' => {
                    self.pos += 1;
                    if let Some(escaped) = self.peek() {
                        self.pos += escaped.len_utf8();
                    }
                }
                '`' => {
                    self.pos += 1;
                    return Ok(done);
                }
                '$' if self.peek_at(1) == Some('{') => {
                    self.pos += 2;
                    self.braces.push(Brace::Substitution);
                    return Ok(open);
                }
                _ => self.pos += ch.len_utf8(),
            }
        }
        Err(self.fail(start, "unterminated template literal"))
    }

    fn scan_regex(&mut self) -> Result<()> {
        let start = self.pos;
        self.pos += 1;
        let mut in_class = false;
        loop {
            let Some(ch) = self.peek() else {
                return Err(self.fail(start, "unterminated regular expression"));
            };
            if is_line_terminator(ch) {
                return Err(self.fail(start, "unterminated regular expression"));
            }
            self.pos += ch.len_utf8();
            match ch {
                '\\' => {
                    if let Some(escaped) = self.peek() {
                        self.pos += escaped.len_utf8();
                    }
                }
                '[' => in_class = true,
                ']' => in_class = false,
                '/' if !in_class => break,
                _ => {}
            }
        }
        while let Some(ch) = self.peek() {
            if !is_ident_part(ch) {
                break;
            }
            self.pos += ch.len_utf8();
        }
        Ok(())
    }

    fn scan_punct(&mut self) {
        let rest = self.rest();
        if rest.starts_with("?.") && !rest[2..].starts_with(|c: char| c.is_ascii_digit()) {
            self.pos += 2;
            return;
        }
        if let Some(p) = PUNCTUATORS.iter().find(|p| rest.starts_with(**p)) {
            self.pos += p.len();
            return;
        }
        self.pos += rest.chars().next().map_or(1, char::len_utf8);
    }
}

/// A tokenized source plus bracket matching.
#[derive(Debug)]
pub struct Tokens<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    matching: Vec<Option<usize>>,
    opening: Vec<Option<usize>>,
    comments: Vec<Range<usize>>,
}

impl<'a> Tokens<'a> {
    pub fn new(source: &'a str, jsx: bool) -> Result<Self> {
        let mut lexer = Lexer::new(source, 0, jsx);
        let mut tokens = Vec::new();
        while let Some(token) = lexer.next_token()? {
            tokens.push(token);
        }
        let matching = match_brackets(source, &tokens)?;
        let mut opening = vec![None; tokens.len()];
        for (open, close) in matching.iter().enumerate() {
            if let Some(close) = close {
                opening[*close] = Some(open);
            }
        }
        Ok(Self {
            source,
            tokens,
            matching,
            opening,
            comments: lexer.comments,
        })
    }

    pub fn source(&self) -> &'a str {
        self.source
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn token(&self, i: usize) -> Option<&Token> {
        self.tokens.get(i)
    }

    pub fn comments(&self) -> &[Range<usize>] {
        &self.comments
    }

    pub fn text(&self, i: usize) -> &'a str {
        self.tokens.get(i).map_or("", |t| t.text(self.source))
    }

    pub fn kind(&self, i: usize) -> Option<TokenKind> {
        self.tokens.get(i).map(|t| t.kind)
    }

    /// Identifier or punctuator `i` is exactly `text`.
    pub fn is(&self, i: usize, text: &str) -> bool {
        matches!(self.kind(i), Some(TokenKind::Ident | TokenKind::Punct)) && self.text(i) == text
    }

    pub fn is_ident(&self, i: usize) -> bool {
        self.kind(i) == Some(TokenKind::Ident)
    }

    pub fn newline_before(&self, i: usize) -> bool {
        self.tokens.get(i).is_some_and(|t| t.newline_before)
    }

    /// Index of the bracket closing the one at `i` (`(`, `[`, `{` or a
    /// template head).
    pub fn matching(&self, i: usize) -> Option<usize> {
        self.matching.get(i).copied().flatten()
    }

    /// Index of the bracket opened by the closer at `i`.
    pub fn opening(&self, i: usize) -> Option<usize> {
        self.opening.get(i).copied().flatten()
    }

    /// Last token of the group opened at `i`, following template
    /// substitutions through to the template tail.
    pub fn group_end(&self, i: usize) -> Option<usize> {
        let mut end = self.matching(i)?;
        while let Some(next) = self.matching(end) {
            end = next;
        }
        Some(end)
    }

    /// Index of the token that ends the expression or statement starting at
    /// `from`: a `;` or `,` at depth zero, an unmatched closer, `limit`, or
    /// the first token of the next line when neither side of the line break
    /// continues the expression.
    pub fn expression_end(&self, from: usize, limit: usize) -> usize {
        let mut k = from;
        while k < limit {
            if k > from && self.newline_before(k) && !self.continues(k) {
                return k;
            }
            if self.kind(k) == Some(TokenKind::Punct) && matches!(self.text(k), ";" | "," | ")" | "]" | "}") {
                return k;
            }
            if let Some(end) = self.group_end(k) {
                k = end;
            }
            k += 1;
        }
        k.min(limit)
    }

    /// The line break before `k` does not end the statement.
    fn continues(&self, k: usize) -> bool {
        let prev_open = k > 0
            && self.kind(k - 1) == Some(TokenKind::Punct)
            && !matches!(self.text(k - 1), ")" | "]" | "}" | "++" | "--" | ";");
        let next_joins = self.kind(k) == Some(TokenKind::Punct)
            && !matches!(self.text(k), "(" | "[" | "{" | "!" | "~" | "++" | "--" | "@" | "<" | "+" | "-");
        let keyword_joins = matches!(self.text(k), "as" | "satisfies" | "extends" | "instanceof" | "in");
        prev_open || next_joins || keyword_joins && self.is_ident(k)
    }

    pub fn line(&self, i: usize) -> usize {
        let offset = self.tokens.get(i).map_or(self.source.len(), |t| t.start);
        line_at(self.source, offset)
    }
}

fn match_brackets(source: &str, tokens: &[Token]) -> Result<Vec<Option<usize>>> {
    let mut matching = vec![None; tokens.len()];
    let mut stack: Vec<usize> = Vec::new();

    for (i, token) in tokens.iter().enumerate() {
        let closes = match token.kind {
            TokenKind::Punct => match token.text(source) {
                "(" | "[" | "{" => {
                    stack.push(i);
                    continue;
                }
                ")" => Some("("),
                "]" => Some("["),
                "}" => Some("{"),
                _ => None,
            },
            TokenKind::TemplateHead => {
                stack.push(i);
                continue;
            }
            TokenKind::TemplateMiddle | TokenKind::TemplateTail => Some("`"),
            _ => None,
        };
        let Some(expected) = closes else { continue };

        let Some(open) = stack.pop() else {
            bail!("unexpected '{}' (line {})", token.text(source), line_at(source, token.start));
        };
        let opener = tokens[open];
        let found = if opener.kind == TokenKind::TemplateHead || opener.kind == TokenKind::TemplateMiddle {
            "`"
        } else {
            opener.text(source)
        };
        if found != expected {
            bail!(
                "'{}' (line {}) does not close '{}' (line {})",
                token.text(source),
                line_at(source, token.start),
                found,
                line_at(source, opener.start)
            );
        }
        matching[open] = Some(i);
        if token.kind == TokenKind::TemplateMiddle {
            stack.push(i);
        }
    }

    if let Some(&open) = stack.last() {
        let token = tokens[open];
        bail!("unclosed '{}' (line {})", token.text(source), line_at(source, token.start));
    }
    Ok(matching)
}

/// Offset of the `}` closing a brace whose contents start at `start`.
pub fn closing_brace(source: &str, start: usize, jsx: bool) -> Result<usize> {
    let mut lexer = Lexer::new(source, start, jsx);
    let mut depth = 0usize;
    while let Some(token) = lexer.next_token()? {
        if token.kind != TokenKind::Punct {
            continue;
        }
        match token.text(source) {
            "{" => depth += 1,
            "}" if depth == 0 => return Ok(token.start),
            "}" => depth -= 1,
            _ => {}
        }
    }
    bail!("unclosed '{{' (line {})", line_at(source, start))
}

/// 1-based line number of byte `offset`.
pub fn line_at(source: &str, offset: usize) -> usize {
    let offset = offset.min(source.len());
    source.as_bytes()[..offset].iter().filter(|&&b| b == b'\n').count() + 1
}

pub fn is_line_terminator(ch: char) -> bool {
    matches!(ch, '\n' | '\r' | '\u{2028}' | '\u{2029}')
}

pub fn is_ident_start(ch: char) -> bool {
    ch == '$' || ch == '_' || ch.is_ascii_alphabetic() || (!ch.is_ascii() && ch.is_alphabetic())
}

pub fn is_ident_part(ch: char) -> bool {
    is_ident_start(ch) || ch.is_ascii_digit() || ch == '\u{200C}' || ch == '\u{200D}' || (!ch.is_ascii() && ch.is_alphanumeric())
}

/// `name` can be written as a bare identifier.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(is_ident_start) && chars.all(is_ident_part)
}

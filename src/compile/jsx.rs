// src/compile/jsx.rs

//! JSX to factory calls.
//!
//! `<Card title="x" {...rest}>Hi {name}</Card>` becomes
//! `h(Card, { title: "x", ...rest }, "Hi ", name)`; fragments use the
//! fragment binding as their tag. Lower-case and dashed tag names are
//! intrinsic and passed as strings. The factory and fragment names come from
//! [`JsxOptions`] unless the file carries `@jsx` / `@jsxFrag` pragmas.

use std::ops::Range;
use std::sync::LazyLock;

use anyhow::{anyhow, bail, Result};
use regex::Regex;

use crate::compile::lexer::{closing_brace, is_identifier, line_at, TokenKind, Tokens};
use crate::compile::rewrite::Rewriter;

static JSX_PRAGMA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@jsx\s+([\w$.]+)").expect("valid regex"));

static JSX_FRAG_PRAGMA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@jsxFrag\s+([\w$.]+)").expect("valid regex"));

/// Names JSX compiles to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsxOptions {
    pub factory: String,
    pub fragment: String,
}

impl Default for JsxOptions {
    fn default() -> Self {
        Self {
            factory: "h".to_string(),
            fragment: "Fragment".to_string(),
        }
    }
}

#[derive(Debug)]
struct Element {
    /// `None` for a fragment.
    tag: Option<String>,
    attributes: Vec<Attribute>,
    children: Vec<Child>,
}

#[derive(Debug)]
enum Attribute {
    Pair { name: String, value: AttributeValue },
    Spread(Range<usize>),
}

#[derive(Debug)]
enum AttributeValue {
    True,
    Text(String),
    Expression(Range<usize>),
    Element(Element),
}

#[derive(Debug)]
enum Child {
    Text(String),
    Expression(Range<usize>),
    Spread(Range<usize>),
    Element(Element),
}

struct Parser<'a> {
    source: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn rest(&self) -> &'a str {
        &self.source[self.pos..]
    }

    fn error(&self, message: &str) -> anyhow::Error {
        anyhow!("{message} (line {})", line_at(self.source, self.pos))
    }

    fn expect(&mut self, text: &str) -> Result<()> {
        if !self.rest().starts_with(text) {
            return Err(self.error(&format!("expected '{text}' in JSX")));
        }
        self.pos += text.len();
        Ok(())
    }

    /// Whitespace and comments between tag parts.
    fn skip_space(&mut self) {
        loop {
            let rest = self.rest();
            let trimmed = rest.trim_start();
            self.pos += rest.len() - trimmed.len();
            if trimmed.starts_with("//") {
                self.pos += trimmed.find('\n').unwrap_or(trimmed.len());
            } else if trimmed.starts_with("/*") {
                match trimmed[2..].find("*/") {
                    Some(end) => self.pos += end + 4,
                    None => self.pos = self.source.len(),
                }
            } else {
                break;
            }
        }
    }

    fn name(&mut self) -> Result<String> {
        let len = self
            .rest()
            .find(|c: char| !(c.is_alphanumeric() || matches!(c, '_' | '$' | '-' | ':' | '.')))
            .unwrap_or(self.rest().len());
        if len == 0 {
            return Err(self.error("expected a JSX name"));
        }
        let name = self.rest()[..len].to_string();
        self.pos += len;
        Ok(name)
    }

    /// Contents of `{ ... }` starting at the `{`.
    fn braced(&mut self) -> Result<Range<usize>> {
        self.expect("{")?;
        let start = self.pos;
        let close = closing_brace(self.source, start, true)?;
        self.pos = close + 1;
        Ok(start..close)
    }

    fn element(&mut self) -> Result<Element> {
        self.expect("<")?;
        self.skip_space();
        if self.rest().starts_with('>') {
            self.pos += 1;
            let children = self.children()?;
            self.expect("</")?;
            self.skip_space();
            self.expect(">")?;
            return Ok(Element {
                tag: None,
                attributes: Vec::new(),
                children,
            });
        }

        let tag = self.name()?;
        let mut attributes = Vec::new();
        loop {
            self.skip_space();
            let rest = self.rest();
            if rest.starts_with("/>") {
                self.pos += 2;
                return Ok(Element {
                    tag: Some(tag),
                    attributes,
                    children: Vec::new(),
                });
            }
            if rest.starts_with('>') {
                self.pos += 1;
                break;
            }
            if rest.starts_with('{') {
                let inner = self.braced()?;
                let text = &self.source[inner.clone()];
                let Some(offset) = text.find("...") else {
                    return Err(self.error("expected '...' in JSX spread attribute"));
                };
                attributes.push(Attribute::Spread(inner.start + offset + 3..inner.end));
                continue;
            }
            if rest.is_empty() {
                return Err(self.error(&format!("unterminated JSX tag <{tag}>")));
            }

            let name = self.name()?;
            self.skip_space();
            let value = if self.rest().starts_with('=') {
                self.pos += 1;
                self.skip_space();
                self.attribute_value()?
            } else {
                AttributeValue::True
            };
            attributes.push(Attribute::Pair { name, value });
        }

        let children = self.children()?;
        self.expect("</")?;
        self.skip_space();
        let closing = self.name()?;
        if closing != tag {
            return Err(self.error(&format!("expected </{tag}>, found </{closing}>")));
        }
        self.skip_space();
        self.expect(">")?;
        Ok(Element {
            tag: Some(tag),
            attributes,
            children,
        })
    }

    fn attribute_value(&mut self) -> Result<AttributeValue> {
        let rest = self.rest();
        if let Some(quote) = rest.chars().next().filter(|c| *c == '"' || *c == '\'') {
            let Some(len) = rest[1..].find(quote) else {
                return Err(self.error("unterminated JSX attribute string"));
            };
            let raw = &rest[1..1 + len];
            self.pos += len + 2;
            return Ok(AttributeValue::Text(decode_entities(raw)));
        }
        if rest.starts_with('{') {
            return Ok(AttributeValue::Expression(self.braced()?));
        }
        if rest.starts_with('<') {
            return Ok(AttributeValue::Element(self.element()?));
        }
        Err(self.error("expected a JSX attribute value"))
    }

    fn children(&mut self) -> Result<Vec<Child>> {
        let mut children = Vec::new();
        loop {
            let rest = self.rest();
            if rest.is_empty() {
                return Err(self.error("unterminated JSX element"));
            }
            if rest.starts_with("</") {
                return Ok(children);
            }
            if rest.starts_with('<') {
                children.push(Child::Element(self.element()?));
                continue;
            }
            if rest.starts_with('{') {
                let inner = self.braced()?;
                let text = &self.source[inner.clone()];
                let trimmed = text.trim_start();
                if trimmed.starts_with("...") {
                    let offset = text.len() - trimmed.len() + 3;
                    children.push(Child::Spread(inner.start + offset..inner.end));
                } else {
                    children.push(Child::Expression(inner));
                }
                continue;
            }
            let len = rest.find(['<', '{']).unwrap_or(rest.len());
            let text = clean_text(&rest[..len]);
            if !text.is_empty() {
                children.push(Child::Text(decode_entities(&text)));
            }
            self.pos += len;
        }
    }
}

/// End offset of the JSX element starting at `start`, if one parses there.
pub fn element_end(source: &str, start: usize) -> Option<usize> {
    let mut parser = Parser { source, pos: start };
    parser.element().ok().map(|_| parser.pos)
}

/// Replace every JSX element in `source` with factory calls.
pub fn transform(source: &str, options: &JsxOptions) -> Result<String> {
    let tokens = Tokens::new(source, true)?;
    let options = pragma_options(&tokens, options);
    transform_tokens(&tokens, &options)
}

fn transform_tokens(tokens: &Tokens<'_>, options: &JsxOptions) -> Result<String> {
    let source = tokens.source();
    let mut rewriter = Rewriter::new(tokens);
    for i in 0..tokens.len() {
        if tokens.kind(i) != Some(TokenKind::Jsx) {
            continue;
        }
        let Some(token) = tokens.token(i) else { continue };
        let mut parser = Parser {
            source,
            pos: token.start,
        };
        let element = parser.element()?;
        let mut code = String::new();
        generate(source, &element, options, &mut code)?;
        rewriter.replace(i, code);
    }
    Ok(rewriter.finish())
}

fn pragma_options(tokens: &Tokens<'_>, defaults: &JsxOptions) -> JsxOptions {
    let mut options = defaults.clone();
    for comment in tokens.comments() {
        let text = &tokens.source()[comment.clone()];
        if let Some(caps) = JSX_PRAGMA_RE.captures(text) {
            options.factory = caps[1].to_string();
        }
        if let Some(caps) = JSX_FRAG_PRAGMA_RE.captures(text) {
            options.fragment = caps[1].to_string();
        }
    }
    options
}

/// Transform an embedded expression, which may itself contain JSX.
fn expression(source: &str, range: &Range<usize>, options: &JsxOptions) -> Result<Option<String>> {
    let text = &source[range.clone()];
    let tokens = Tokens::new(text, true)
        .map_err(|err| anyhow!("{err:#} in JSX expression (line {})", line_at(source, range.start)))?;
    if tokens.is_empty() {
        return Ok(None);
    }
    transform_tokens(&tokens, options).map(Some)
}

fn generate(source: &str, element: &Element, options: &JsxOptions, out: &mut String) -> Result<()> {
    out.push_str(&options.factory);
    out.push('(');
    match &element.tag {
        None => out.push_str(&options.fragment),
        Some(tag) if is_intrinsic(tag) => out.push_str(&quote(tag)),
        Some(tag) => out.push_str(tag),
    }

    out.push_str(", ");
    if element.attributes.is_empty() {
        out.push_str("null");
    } else {
        out.push_str("{ ");
        for (n, attribute) in element.attributes.iter().enumerate() {
            if n > 0 {
                out.push_str(", ");
            }
            match attribute {
                Attribute::Spread(range) => {
                    out.push_str("...");
                    let code = expression(source, range, options)?
                        .ok_or_else(|| anyhow!("empty JSX spread (line {})", line_at(source, range.start)))?;
                    out.push_str(&code);
                }
                Attribute::Pair { name, value } => {
                    if is_identifier(name) {
                        out.push_str(name);
                    } else {
                        out.push_str(&quote(name));
                    }
                    out.push_str(": ");
                    match value {
                        AttributeValue::True => out.push_str("true"),
                        AttributeValue::Text(text) => out.push_str(&quote(text)),
                        AttributeValue::Expression(range) => {
                            let Some(code) = expression(source, range, options)? else {
                                bail!("empty JSX attribute '{name}' (line {})", line_at(source, range.start));
                            };
                            out.push_str(&code);
                        }
                        AttributeValue::Element(nested) => generate(source, nested, options, out)?,
                    }
                }
            }
        }
        out.push_str(" }");
    }

    for child in &element.children {
        match child {
            Child::Text(text) => {
                out.push_str(", ");
                out.push_str(&quote(text));
            }
            Child::Expression(range) => {
                if let Some(code) = expression(source, range, options)? {
                    out.push_str(", ");
                    out.push_str(&code);
                }
            }
            Child::Spread(range) => {
                if let Some(code) = expression(source, range, options)? {
                    out.push_str(", ...");
                    out.push_str(&code);
                }
            }
            Child::Element(nested) => {
                out.push_str(", ");
                generate(source, nested, options, out)?;
            }
        }
    }
    out.push(')');
    Ok(())
}

fn is_intrinsic(tag: &str) -> bool {
    tag.contains(['-', ':']) || tag.starts_with(|c: char| c.is_ascii_lowercase())
}

fn quote(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| format!("\"{text}\""))
}

/// JSX text whitespace: lines are trimmed, blank lines dropped and the rest
/// joined with single spaces.
fn clean_text(raw: &str) -> String {
    let lines: Vec<&str> = raw.split('\n').collect();
    let last = lines.len() - 1;
    let last_non_empty = lines.iter().rposition(|line| !line.trim().is_empty());

    let mut out = String::new();
    for (n, line) in lines.iter().enumerate() {
        let mut line = line.trim_end_matches('\r').replace('\t', " ");
        if n > 0 {
            line = line.trim_start_matches(' ').to_string();
        }
        if n < last {
            line = line.trim_end_matches(' ').to_string();
        }
        if line.is_empty() {
            continue;
        }
        out.push_str(&line);
        if Some(n) != last_non_empty {
            out.push(' ');
        }
    }
    out
}

fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest.find(';').filter(|&semi| semi <= 10).and_then(|semi| {
            let entity = &rest[1..semi];
            let ch = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some('\u{A0}'),
                _ => entity
                    .strip_prefix("#x")
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .or_else(|| entity.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                    .and_then(char::from_u32),
            };
            ch.map(|ch| (ch, semi))
        });
        match decoded {
            Some((ch, semi)) => {
                out.push(ch);
                rest = &rest[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jsx(source: &str) -> String {
        transform(source, &JsxOptions::default()).unwrap()
    }

    #[test]
    fn elements_become_factory_calls() {
        assert_eq!(jsx("const a = <div>hi</div>"), "const a = h(\"div\", null, \"hi\")");
        assert_eq!(
            jsx("const b = <Card title=\"x\" open {...rest} data-id={id} />"),
            "const b = h(Card, { title: \"x\", open: true, ...rest, \"data-id\": id })"
        );
    }

    #[test]
    fn children_and_fragments() {
        let out = jsx("x = <>\n  <b>{name}</b>\n  text &amp; more\n  {/* note */}\n</>");
        assert_eq!(
            out,
            "x = h(Fragment, null, h(\"b\", null, name), \"text & more\")\n\n\n\n"
        );
    }

    #[test]
    fn nested_jsx_inside_expressions() {
        let out = jsx("y = <ul>{items.map((i) => <li key={i}>{i}</li>)}</ul>");
        assert_eq!(
            out,
            "y = h(\"ul\", null, items.map((i) => h(\"li\", { key: i }, i)))"
        );
    }

    #[test]
    fn strings_that_look_like_jsx_are_left_alone() {
        let source = "const s = \"<div>\" + '<b>' + `<i>${x}</i>`";
        assert_eq!(jsx(source), source);
    }

    #[test]
    fn pragmas_pick_the_factory() {
        let out = jsx("/** @jsx createElement @jsxFrag Frag */\nconst a = <><p /></>");
        assert!(out.ends_with("createElement(Frag, null, createElement(\"p\", null))"), "{out}");
    }

    #[test]
    fn mismatched_closing_tag_is_an_error() {
        let source = "const a = (<div></span>)";
        assert_eq!(element_end(source, 11), None);
        let mut parser = Parser { source, pos: 11 };
        let err = parser.element().unwrap_err();
        assert!(err.to_string().contains("expected </div>"), "{err}");
    }
}

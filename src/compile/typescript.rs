// src/compile/typescript.rs

//! TypeScript type erasure.
//!
//! Works on the token stream, so strings, templates, comments and regex
//! literals are never touched. Type-only syntax is removed in place (line
//! breaks survive); the few TypeScript constructs with runtime meaning are
//! lowered:
//! - `enum` / `const enum` become the usual `var E; (function (E) {...})` form
//! - constructor parameter properties become `this.x = x;` assignments
//!
//! Imports whose bindings are only used in type positions are elided, as
//! `tsc` does without `verbatimModuleSyntax`. Namespaces, `import x =
//! require()` and `export =` are rejected.

use std::collections::{HashMap, HashSet};
use std::ops::Range;

use anyhow::{bail, Result};

use crate::compile::lexer::{starts_expression, TokenKind, Tokens};
use crate::compile::rewrite::Rewriter;

/// Identifiers that cannot end an expression.
const NOT_VALUES: &[&str] = &[
    "return", "typeof", "instanceof", "in", "of", "new", "delete", "void", "throw", "case", "do",
    "else", "yield", "await", "default", "extends", "implements", "import", "export", "const",
    "let", "var", "function", "class", "if", "while", "for", "switch", "with", "try", "catch",
    "finally", "as", "satisfies", "async", "static", "get", "set", "public", "private",
    "protected", "readonly", "declare", "abstract", "type", "interface", "enum", "keyof",
];

/// Keywords that may precede a parenthesized group that is not a parameter list.
const CONTROL_KEYWORDS: &[&str] = &[
    "if", "while", "for", "switch", "with", "return", "typeof", "void", "delete", "await",
    "yield", "in", "of", "instanceof", "new", "case", "throw", "else", "do", "catch",
];

const PARAMETER_MODIFIERS: &[&str] = &["public", "private", "protected", "readonly", "override"];

/// Remove TypeScript syntax from `source`.
pub fn strip(source: &str) -> Result<String> {
    let tokens = Tokens::new(source, false)?;
    let mut stripper = Stripper::new(&tokens);
    stripper.walk(0, tokens.len())?;
    stripper.finish_exports();
    stripper.elide_imports();
    Ok(stripper.out.finish())
}

struct Specifier {
    range: Range<usize>,
    /// `a` in `a as b`.
    first: String,
    /// `b` in `a as b`, or `a` on its own.
    last: String,
}

struct ImportDecl {
    range: Range<usize>,
    default: Option<usize>,
    namespace: Option<usize>,
    braces: Option<(usize, usize)>,
    named: Vec<Specifier>,
    /// Inline `type` specifiers that were dropped.
    type_only: usize,
}

#[derive(Clone)]
enum AutoValue {
    Number(i64),
    After(String),
}

struct Stripper<'t, 'a> {
    t: &'t Tokens<'a>,
    out: Rewriter<'t, 'a>,
    params_done: HashSet<usize>,
    /// Class body `{` to whether the class has an `extends` clause.
    class_bodies: HashMap<usize, bool>,
    type_names: HashSet<String>,
    imports: Vec<ImportDecl>,
    export_lists: Vec<Vec<Specifier>>,
}

impl<'t, 'a> Stripper<'t, 'a> {
    fn new(tokens: &'t Tokens<'a>) -> Self {
        Self {
            t: tokens,
            out: Rewriter::new(tokens),
            params_done: HashSet::new(),
            class_bodies: HashMap::new(),
            type_names: HashSet::new(),
            imports: Vec::new(),
            export_lists: Vec::new(),
        }
    }

    fn walk(&mut self, start: usize, end: usize) -> Result<()> {
        let mut i = start;
        while i < end {
            if self.out.is_removed(i) {
                i += 1;
                continue;
            }
            let next = match self.t.kind(i) {
                Some(TokenKind::Ident) => self.ident(i)?,
                Some(TokenKind::Punct) => self.punct(i)?,
                _ => i + 1,
            };
            i = next.max(i + 1);
        }
        Ok(())
    }

    fn ident(&mut self, i: usize) -> Result<usize> {
        let t = self.t;
        let start = self.statement_start(i);
        let same_line_ident = |k: usize| t.is_ident(k) && !t.newline_before(k);

        match t.text(i) {
            "import" if start && !t.is(i + 1, "(") && !t.is(i + 1, ".") => {
                return self.import_declaration(i);
            }
            "export" if start => return self.export_declaration(i),
            "interface" if start && same_line_ident(i + 1) => {
                self.type_names.insert(t.text(i + 1).to_string());
                let end = self.interface_end(i + 2);
                self.remove_declaration(i, end);
                return Ok(end);
            }
            "type" if start && same_line_ident(i + 1) && (t.is(i + 2, "=") || t.is(i + 2, "<")) => {
                self.type_names.insert(t.text(i + 1).to_string());
                let end = self.type_alias_end(i);
                self.remove_declaration(i, end);
                return Ok(end);
            }
            "declare" if start && same_line_ident(i + 1) => {
                let end = self.declare_end(i + 1);
                self.remove_declaration(i, end);
                return Ok(end);
            }
            "enum" if start && same_line_ident(i + 1) => return self.enum_declaration(i, i),
            "const" if t.is(i + 1, "enum") && same_line_ident(i + 2) => {
                return self.enum_declaration(i, i + 1);
            }
            "abstract" if t.is(i + 1, "class") && !t.newline_before(i + 1) => {
                self.out.remove(i..i + 1);
                return Ok(i + 1);
            }
            "namespace" | "module"
                if start
                    && !t.newline_before(i + 1)
                    && (t.is_ident(i + 1) || t.kind(i + 1) == Some(TokenKind::String)) =>
            {
                bail!("TypeScript namespaces are not supported (line {})", t.line(i));
            }
            "const" | "let" | "var" => {
                self.declarators(i + 1);
                return Ok(i + 1);
            }
            "function" => {
                self.function(i)?;
                return Ok(i + 1);
            }
            "class" => {
                self.class_heritage(i);
                return Ok(i + 1);
            }
            "as" | "satisfies" if !t.newline_before(i) && self.ends_expression(self.out.prev_kept(i)) => {
                let end = self.skip_type(i + 1);
                if end > i + 1 {
                    self.out.remove(i..end);
                    return Ok(end);
                }
            }
            _ => {}
        }

        // f<T>(x), new Map<K, V>(), tag<T>`...`
        if t.is(i + 1, "<") && self.ends_expression(Some(i)) {
            if let Some(end) = self.type_arguments(i + 1) {
                let called = t.is(end, "(")
                    || matches!(t.kind(end), Some(TokenKind::Template | TokenKind::TemplateHead));
                if called {
                    self.out.remove(i + 1..end);
                    return Ok(end);
                }
            }
        }
        Ok(i + 1)
    }

    fn punct(&mut self, i: usize) -> Result<usize> {
        let t = self.t;
        match t.text(i) {
            "(" => self.maybe_parameters(i),
            "{" if self.class_bodies.contains_key(&i) => self.class_body(i),
            "<" if starts_expression(t.source(), self.out.prev_kept(i).and_then(|p| t.token(p))) => {
                // generic arrow function or `<T>value` assertion
                match self.angle_end(i) {
                    Some(end) => {
                        self.out.remove(i..end);
                        Ok(end)
                    }
                    None => Ok(i + 1),
                }
            }
            "!" if !t.newline_before(i) && self.non_null_target(self.out.prev_kept(i)) => {
                self.out.remove(i..i + 1);
                Ok(i + 1)
            }
            _ => Ok(i + 1),
        }
    }

    // ---- statements -------------------------------------------------------

    fn statement_start(&self, i: usize) -> bool {
        let t = self.t;
        let Some(prev) = self.out.prev_kept(i) else { return true };
        if self.out.is_replaced(prev) {
            return true;
        }
        if t.is(prev, ";") || t.is(prev, "{") || t.is(prev, "}") || t.is(prev, "export") {
            return true;
        }
        if t.is(prev, "default") {
            return self.out.prev_kept(prev).is_some_and(|p| t.is(p, "export"));
        }
        t.newline_before(i) && self.ends_expression(Some(prev))
    }

    /// First token of the declaration at `i`, including `export [default]`.
    fn declaration_start(&self, i: usize) -> usize {
        let t = self.t;
        let mut start = i;
        if let Some(prev) = self.out.prev_kept(start) {
            if t.is(prev, "async") {
                start = prev;
            }
        }
        match self.out.prev_kept(start) {
            Some(prev) if t.is(prev, "export") => prev,
            Some(prev) if t.is(prev, "default") => match self.out.prev_kept(prev) {
                Some(export) if t.is(export, "export") => export,
                _ => start,
            },
            _ => start,
        }
    }

    fn remove_declaration(&mut self, i: usize, end: usize) {
        let start = self.declaration_start(i);
        self.out.remove(start..end);
    }

    /// Index just past the statement starting at `from`.
    fn statement_end(&self, from: usize) -> usize {
        let end = self.t.expression_end(from, self.t.len());
        if self.t.is(end, ";") {
            end + 1
        } else {
            end
        }
    }

    fn ends_expression(&self, prev: Option<usize>) -> bool {
        let t = self.t;
        let Some(p) = prev else { return false };
        match t.kind(p) {
            Some(TokenKind::Ident) => !NOT_VALUES.contains(&t.text(p)),
            Some(TokenKind::Punct) => matches!(t.text(p), ")" | "]" | "}"),
            Some(
                TokenKind::Number
                | TokenKind::String
                | TokenKind::Template
                | TokenKind::TemplateTail
                | TokenKind::Regex
                | TokenKind::Jsx
                | TokenKind::PrivateName,
            ) => true,
            _ => false,
        }
    }

    fn non_null_target(&self, prev: Option<usize>) -> bool {
        let t = self.t;
        let Some(p) = prev else { return false };
        match t.kind(p) {
            Some(TokenKind::Ident) => !NOT_VALUES.contains(&t.text(p)),
            Some(TokenKind::PrivateName) => true,
            Some(TokenKind::Punct) => match t.text(p) {
                "]" => true,
                ")" => {
                    // `if (x) !y` is not an assertion
                    let keyword = t.opening(p).and_then(|open| self.out.prev_kept(open));
                    !keyword.is_some_and(|k| matches!(t.text(k), "if" | "while" | "for" | "with"))
                }
                _ => false,
            },
            _ => false,
        }
    }

    // ---- declarations -----------------------------------------------------

    fn interface_end(&self, from: usize) -> usize {
        let t = self.t;
        let mut k = from;
        while k < t.len() && !t.is(k, "{") {
            if let Some(end) = t.group_end(k) {
                k = end;
            }
            k += 1;
        }
        match t.matching(k) {
            Some(close) => close + 1,
            None => t.len(),
        }
    }

    fn type_alias_end(&self, i: usize) -> usize {
        let t = self.t;
        let mut k = i + 2;
        if t.is(k, "<") {
            match self.angle_end(k) {
                Some(end) => k = end,
                None => return self.statement_end(i),
            }
        }
        if !t.is(k, "=") {
            return self.statement_end(i);
        }
        let end = self.skip_type(k + 1);
        if t.is(end, ";") {
            end + 1
        } else {
            end
        }
    }

    /// `declare` at `kind - 1`; records the declared name as a type.
    fn declare_end(&mut self, kind: usize) -> usize {
        let t = self.t;
        let mut k = kind;
        if t.is(k, "abstract") || t.is(k, "const") && t.is(k + 1, "enum") {
            k += 1;
        }
        if t.is_ident(k + 1) {
            self.type_names.insert(t.text(k + 1).to_string());
        }
        if matches!(t.text(k), "class" | "module" | "namespace" | "global" | "enum" | "interface") {
            while k < t.len() && !t.is(k, "{") {
                if let Some(end) = t.group_end(k) {
                    k = end;
                }
                k += 1;
            }
            return t.matching(k).map_or(t.len(), |close| close + 1);
        }
        self.statement_end(kind)
    }

    fn enum_declaration(&mut self, start: usize, keyword: usize) -> Result<usize> {
        let t = self.t;
        let name = t.text(keyword + 1);
        let open = keyword + 2;
        let Some(close) = t.is(open, "{").then(|| t.matching(open)).flatten() else {
            bail!("expected '{{' after `enum {name}` (line {})", t.line(keyword));
        };

        let mut body = String::new();
        let mut auto = Some(AutoValue::Number(0));
        let mut k = open + 1;
        while k < close {
            let end = self.segment_end(k, close);
            if end == k {
                k += 1;
                continue;
            }
            let key = match t.kind(k) {
                Some(TokenKind::Ident) => format!("\"{}\"", t.text(k)),
                Some(TokenKind::String) => t.text(k).to_string(),
                _ => bail!("unsupported member in `enum {name}` (line {})", t.line(k)),
            };

            if t.is(k + 1, "=") {
                let (Some(first), Some(last)) = (t.token(k + 2), t.token(end - 1)) else {
                    bail!("missing initializer in `enum {name}` (line {})", t.line(k));
                };
                let init = &t.source()[first.start..last.end];
                let single = end == k + 3;
                if single && t.kind(k + 2) == Some(TokenKind::String) {
                    body.push_str(&format!("{name}[{key}] = {init}; "));
                    auto = None;
                } else {
                    body.push_str(&format!("{name}[{name}[{key}] = {init}] = {key}; "));
                    auto = match parse_integer(init) {
                        Some(value) if single => Some(AutoValue::Number(value + 1)),
                        _ => Some(AutoValue::After(key.clone())),
                    };
                }
            } else {
                let value = match &auto {
                    Some(AutoValue::Number(n)) => n.to_string(),
                    Some(AutoValue::After(prev)) => format!("{name}[{prev}] + 1"),
                    None => bail!(
                        "enum member {key} needs an initializer after a string member (line {})",
                        t.line(k)
                    ),
                };
                body.push_str(&format!("{name}[{name}[{key}] = {value}] = {key}; "));
                auto = match auto {
                    Some(AutoValue::Number(n)) => Some(AutoValue::Number(n + 1)),
                    _ => Some(AutoValue::After(key.clone())),
                };
            }
            k = end + 1;
        }

        let code = format!("var {name}; (function ({name}) {{ {body}}})({name} || ({name} = {{}}));");
        self.out.replace_range(start..close + 1, code);
        Ok(close + 1)
    }

    fn declarators(&mut self, from: usize) {
        let t = self.t;
        let mut k = from;
        loop {
            k = match t.kind(k) {
                Some(TokenKind::Ident) => k + 1,
                Some(TokenKind::Punct) if t.is(k, "{") || t.is(k, "[") => match t.matching(k) {
                    Some(close) => close + 1,
                    None => return,
                },
                _ => return,
            };
            // definite assignment `let x!: T`
            if t.is(k, "!") && t.is(k + 1, ":") {
                self.out.remove(k..k + 1);
                k += 1;
            }
            if t.is(k, ":") {
                let end = self.skip_type(k + 1);
                if end == k + 1 {
                    return;
                }
                self.out.remove(k..end);
                k = end;
            }
            if t.is(k, "=") {
                k = self.t.expression_end(k + 1, t.len());
            }
            if !t.is(k, ",") {
                return;
            }
            k += 1;
        }
    }

    fn function(&mut self, i: usize) -> Result<()> {
        let t = self.t;
        let mut k = i + 1;
        if t.is(k, "*") {
            k += 1;
        }
        if t.is_ident(k) {
            k += 1;
        }
        if t.is(k, "<") {
            if let Some(end) = self.angle_end(k) {
                self.out.remove(k..end);
                k = end;
            }
        }
        let Some(close) = t.is(k, "(").then(|| t.matching(k)).flatten() else {
            return Ok(());
        };
        self.parameters(k, close, false)?;

        let mut after = close + 1;
        if t.is(after, ":") {
            let end = self.skip_type(after + 1);
            if end > after + 1 {
                self.out.remove(after..end);
                after = end;
            }
        }
        if !t.is(after, "{") {
            // overload signature
            let end = if t.is(after, ";") { after + 1 } else { after };
            self.remove_declaration(i, end);
        }
        Ok(())
    }

    fn maybe_parameters(&mut self, open: usize) -> Result<usize> {
        let t = self.t;
        if self.params_done.contains(&open) {
            return Ok(open + 1);
        }
        let Some(close) = t.matching(open) else { return Ok(open + 1) };
        let after = close + 1;
        let prev = self.out.prev_kept(open);

        let mut return_type = None;
        let is_parameters = if t.is(after, "=>") {
            true
        } else if t.is(after, ":") {
            let end = self.skip_type(after + 1);
            let found = end > after + 1 && (t.is(end, "=>") || t.is(end, "{") && self.method_like(prev));
            if found {
                return_type = Some(after..end);
            }
            found
        } else {
            t.is(after, "{") && (self.method_like(prev) || prev.is_some_and(|p| t.is(p, "catch")))
        };
        if !is_parameters {
            return Ok(open + 1);
        }

        self.parameters(open, close, false)?;
        if let Some(range) = return_type {
            self.out.remove(range);
        }
        Ok(open + 1)
    }

    /// `prev` can precede the parameter list of a method.
    fn method_like(&self, prev: Option<usize>) -> bool {
        let t = self.t;
        let Some(p) = prev else { return false };
        match t.kind(p) {
            Some(TokenKind::Ident) => !CONTROL_KEYWORDS.contains(&t.text(p)),
            Some(TokenKind::String | TokenKind::Number | TokenKind::PrivateName) => true,
            Some(TokenKind::Punct) => t.is(p, "]"),
            _ => false,
        }
    }

    /// Strip the parameter list `open..=close`; returns the names of
    /// constructor parameter properties.
    fn parameters(&mut self, open: usize, close: usize, constructor: bool) -> Result<Vec<String>> {
        self.params_done.insert(open);
        let mut properties = Vec::new();
        let mut k = open + 1;
        while k < close {
            let end = self.segment_end(k, close);
            if end > k {
                self.parameter(k, end, constructor, &mut properties)?;
            }
            k = end + 1;
        }
        Ok(properties)
    }

    fn parameter(&mut self, start: usize, end: usize, constructor: bool, properties: &mut Vec<String>) -> Result<()> {
        let t = self.t;
        let mut k = start;

        if t.is(k, "this") && t.is(k + 1, ":") {
            let remove_end = if t.is(end, ",") { end + 1 } else { end };
            self.out.remove(start..remove_end);
            return Ok(());
        }

        let mut property = false;
        while t.is_ident(k)
            && PARAMETER_MODIFIERS.contains(&t.text(k))
            && (t.is_ident(k + 1) || t.is(k + 1, "{") || t.is(k + 1, "["))
        {
            self.out.remove(k..k + 1);
            property = true;
            k += 1;
        }

        if t.is(k, "...") {
            k += 1;
        }
        let binding = k;
        k = match t.kind(k) {
            Some(TokenKind::Ident) => k + 1,
            Some(TokenKind::Punct) if t.is(k, "{") || t.is(k, "[") => match t.matching(k) {
                Some(close) => close + 1,
                None => return Ok(()),
            },
            _ => return Ok(()),
        };
        if t.is(k, "?") && (k + 1 == end || t.is(k + 1, ":") || t.is(k + 1, "=")) {
            self.out.remove(k..k + 1);
            k += 1;
        }
        if t.is(k, ":") {
            let type_end = self.skip_type(k + 1);
            if type_end > k + 1 && (type_end == end || t.is(type_end, "=")) {
                self.out.remove(k..type_end);
            }
        }

        if property {
            if !constructor {
                bail!("parameter properties are only allowed in constructors (line {})", t.line(start));
            }
            if !t.is_ident(binding) {
                bail!("parameter properties cannot be destructured (line {})", t.line(start));
            }
            properties.push(t.text(binding).to_string());
        }
        Ok(())
    }

    /// Next `,` at depth zero before `close`, or `close`.
    fn segment_end(&self, from: usize, close: usize) -> usize {
        let t = self.t;
        let mut k = from;
        while k < close {
            if t.is(k, ",") {
                return k;
            }
            if let Some(end) = t.group_end(k) {
                k = end;
            }
            k += 1;
        }
        close
    }

    // ---- classes ----------------------------------------------------------

    fn class_heritage(&mut self, i: usize) {
        let t = self.t;
        let mut k = i + 1;
        if t.is_ident(k) && !matches!(t.text(k), "extends" | "implements") {
            k += 1;
        }
        let mut extends = false;
        while k < t.len() && !t.is(k, "{") {
            if t.is(k, "<") {
                if let Some(end) = self.angle_end(k) {
                    self.out.remove(k..end);
                    k = end;
                    continue;
                }
            }
            if t.is(k, "extends") {
                extends = true;
            }
            if t.is(k, "implements") {
                let mut end = k;
                while end < t.len() && !t.is(end, "{") {
                    end = t.group_end(end).unwrap_or(end) + 1;
                }
                self.out.remove(k..end);
                k = end;
                break;
            }
            if let Some(end) = t.group_end(k) {
                k = end;
            }
            k += 1;
        }
        if t.is(k, "{") {
            self.class_bodies.insert(k, extends);
        }
    }

    fn class_body(&mut self, open: usize) -> Result<usize> {
        let Some(close) = self.t.matching(open) else { return Ok(open + 1) };
        let extends = self.class_bodies.get(&open).copied().unwrap_or(false);
        let mut k = open + 1;
        while k < close {
            let next = self.class_member(k, extends)?;
            k = next.max(k + 1);
        }
        Ok(close + 1)
    }

    fn class_member(&mut self, start: usize, extends: bool) -> Result<usize> {
        let t = self.t;
        let mut k = start;
        if t.is(k, ";") || t.is(k, "@") {
            return Ok(k + 1);
        }

        let mut dropped = false;
        while t.is_ident(k) {
            let word = t.text(k);
            let is_modifier = matches!(
                word,
                "public" | "private" | "protected" | "readonly" | "override" | "declare" | "abstract"
                    | "static" | "async" | "accessor" | "get" | "set"
            );
            let named = !t.newline_before(k + 1)
                && (t.is_ident(k + 1)
                    || matches!(t.kind(k + 1), Some(TokenKind::String | TokenKind::Number | TokenKind::PrivateName))
                    || t.is(k + 1, "[")
                    || t.is(k + 1, "*")
                    || word == "static" && t.is(k + 1, "{"));
            if !is_modifier || !named {
                break;
            }
            if word == "static" && t.is(k + 1, "{") {
                let Some(close) = t.matching(k + 1) else { return Ok(k + 1) };
                self.walk(k + 2, close)?;
                return Ok(close + 1);
            }
            match word {
                "public" | "private" | "protected" | "readonly" | "override" => self.out.remove(k..k + 1),
                "declare" | "abstract" => dropped = true,
                _ => {}
            }
            k += 1;
        }
        if t.is(k, "*") {
            k += 1;
        }

        // index signature `[key: string]: T;`
        if t.is(k, "[") && t.is_ident(k + 1) && t.is(k + 2, ":") {
            let Some(bracket) = t.matching(k) else { return Ok(k + 1) };
            let mut end = bracket + 1;
            if t.is(end, ":") {
                end = self.skip_type(end + 1);
            }
            if t.is(end, ";") {
                end += 1;
            }
            self.out.remove(start..end);
            return Ok(end);
        }

        let name = k;
        match t.kind(k) {
            Some(TokenKind::Ident | TokenKind::String | TokenKind::Number | TokenKind::PrivateName) => k += 1,
            Some(TokenKind::Punct) if t.is(k, "[") => {
                let Some(close) = t.matching(k) else { return Ok(k + 1) };
                self.walk(k + 1, close)?;
                k = close + 1;
            }
            _ => return Ok(k + 1),
        }
        if t.is(k, "?") || t.is(k, "!") {
            self.out.remove(k..k + 1);
            k += 1;
        }
        if t.is(k, "<") {
            if let Some(end) = self.angle_end(k) {
                self.out.remove(k..end);
                k = end;
            }
        }

        if t.is(k, "(") {
            let Some(close) = t.matching(k) else { return Ok(k + 1) };
            let constructor = t.text(name) == "constructor";
            let properties = self.parameters(k, close, constructor)?;
            self.walk(k + 1, close)?;
            let mut after = close + 1;
            if t.is(after, ":") {
                let end = self.skip_type(after + 1);
                if end > after + 1 {
                    self.out.remove(after..end);
                    after = end;
                }
            }
            if t.is(after, "{") && !dropped {
                let Some(body_close) = t.matching(after) else { return Ok(after + 1) };
                if !properties.is_empty() {
                    self.assign_properties(after, body_close, extends, &properties);
                }
                self.walk(after + 1, body_close)?;
                return Ok(body_close + 1);
            }
            // abstract method or overload signature
            let end = if t.is(after, ";") {
                after + 1
            } else {
                t.matching(after).map_or(after, |close| close + 1)
            };
            self.out.remove(start..end);
            return Ok(end);
        }

        // field
        if t.is(k, ":") {
            let end = self.skip_type(k + 1);
            if end > k + 1 {
                self.out.remove(k..end);
                k = end;
            }
        }
        let mut end = k;
        if t.is(k, "=") {
            end = self.t.expression_end(k + 1, t.len());
            self.walk(k + 1, end)?;
        }
        if t.is(end, ";") {
            end += 1;
        }
        if dropped {
            self.out.remove(start..end);
        }
        Ok(end)
    }

    fn assign_properties(&mut self, open: usize, close: usize, extends: bool, names: &[String]) {
        let t = self.t;
        let assignments: String = names.iter().map(|name| format!(" this.{name} = {name};")).collect();
        if extends {
            let mut k = open + 1;
            while k < close {
                if t.is(k, "super") && t.is(k + 1, "(") {
                    if let Some(call_end) = t.matching(k + 1) {
                        if t.is(call_end + 1, ";") {
                            self.out.insert_after(call_end + 1, &assignments);
                        } else {
                            self.out.insert_after(call_end, &format!(";{assignments}"));
                        }
                        return;
                    }
                }
                if t.is(k, "{") {
                    k = t.matching(k).unwrap_or(k);
                }
                k += 1;
            }
        }
        self.out.insert_after(open, &assignments);
    }

    // ---- modules ----------------------------------------------------------

    fn import_declaration(&mut self, i: usize) -> Result<usize> {
        let t = self.t;
        let mut k = i + 1;

        if t.is(k, "type") && (t.is(k + 1, "{") || t.is(k + 1, "*") || t.is_ident(k + 1) && !t.is(k + 1, "from")) {
            let clause = match t.text(k + 1) {
                "{" => t.matching(k + 1).map_or(k + 2, |close| close + 1),
                "*" => k + 4,
                _ => k + 2,
            };
            let end = self.module_clause_end(clause);
            self.out.remove(i..end);
            return Ok(end);
        }
        if t.kind(k) == Some(TokenKind::String) {
            return Ok(self.module_clause_end(k));
        }

        let mut decl = ImportDecl {
            range: i..i,
            default: None,
            namespace: None,
            braces: None,
            named: Vec::new(),
            type_only: 0,
        };
        if t.is_ident(k) && !(t.is(k, "from") && t.kind(k + 1) == Some(TokenKind::String)) {
            if t.is(k + 1, "=") {
                bail!("`import {} = ...` is not supported (line {})", t.text(k), t.line(i));
            }
            decl.default = Some(k);
            k += 1;
            if t.is(k, ",") {
                k += 1;
            }
        }
        if t.is(k, "*") && t.is(k + 1, "as") {
            decl.namespace = Some(k + 2);
            k += 3;
        } else if t.is(k, "{") {
            let Some(close) = t.matching(k) else { return Ok(k + 1) };
            let (named, type_only) = self.specifiers(k, close);
            decl.braces = Some((k, close));
            decl.named = named;
            decl.type_only = type_only;
            k = close + 1;
        }
        let end = self.module_clause_end(k);
        decl.range = i..end;
        self.imports.push(decl);
        Ok(end)
    }

    fn export_declaration(&mut self, i: usize) -> Result<usize> {
        let t = self.t;
        let k = i + 1;
        if t.is(k, "type") && (t.is(k + 1, "{") || t.is(k + 1, "*")) {
            let clause = t.matching(k + 1).map_or(k + 2, |close| close + 1);
            let end = self.module_clause_end(clause);
            self.out.remove(i..end);
            return Ok(end);
        }
        if t.is(k, "=") || t.is(k, "import") && t.is_ident(k + 1) && t.is(k + 2, "=") {
            bail!("`export =` and `export import` are not supported (line {})", t.line(i));
        }
        if t.is(k, "as") && t.is(k + 1, "namespace") {
            let end = self.statement_end(k);
            self.out.remove(i..end);
            return Ok(end);
        }
        if t.is(k, "{") {
            let Some(close) = t.matching(k) else { return Ok(k + 1) };
            let (specifiers, _) = self.specifiers(k, close);
            let reexport = t.is(close + 1, "from");
            let end = self.module_clause_end(close + 1);
            if !reexport {
                self.export_lists.push(specifiers);
            }
            return Ok(end);
        }
        if t.is(k, "*") {
            let mut j = k + 1;
            if t.is(j, "as") {
                j += 2;
            }
            return Ok(self.module_clause_end(j));
        }
        Ok(i + 1)
    }

    /// Specifiers of `{ ... }`; drops inline `type` specifiers and returns
    /// how many were dropped.
    fn specifiers(&mut self, open: usize, close: usize) -> (Vec<Specifier>, usize) {
        let t = self.t;
        let mut list = Vec::new();
        let mut dropped = 0;
        let mut k = open + 1;
        while k < close {
            let end = self.segment_end(k, close);
            if end > k {
                if t.is(k, "type") && end > k + 1 && !t.is(k + 1, "as") {
                    let remove_end = if t.is(end, ",") { end + 1 } else { end };
                    self.out.remove(k..remove_end);
                    dropped += 1;
                } else {
                    list.push(Specifier {
                        range: k..end,
                        first: t.text(k).to_string(),
                        last: t.text(end - 1).to_string(),
                    });
                }
            }
            k = end + 1;
        }
        (list, dropped)
    }

    /// Skip `from "x" [with { ... }] [;]` starting at `k`.
    fn module_clause_end(&self, mut k: usize) -> usize {
        let t = self.t;
        if t.is(k, "from") {
            k += 1;
        }
        if t.kind(k) == Some(TokenKind::String) {
            k += 1;
        }
        if (t.is(k, "with") || t.is(k, "assert")) && t.is(k + 1, "{") && !t.newline_before(k) {
            k = t.matching(k + 1).map_or(k + 2, |close| close + 1);
        }
        if t.is(k, ";") {
            k += 1;
        }
        k
    }

    /// `export { Props }` where `Props` names an interface or type alias.
    fn finish_exports(&mut self) {
        let lists = std::mem::take(&mut self.export_lists);
        for list in lists {
            for spec in list {
                if self.type_names.contains(&spec.first) {
                    let end = if self.t.is(spec.range.end, ",") { spec.range.end + 1 } else { spec.range.end };
                    self.out.remove(spec.range.start..end);
                }
            }
        }
    }

    fn elide_imports(&mut self) {
        let t = self.t;
        let imports = std::mem::take(&mut self.imports);
        let mut in_import = vec![false; t.len()];
        for decl in &imports {
            for flag in &mut in_import[decl.range.clone()] {
                *flag = true;
            }
        }

        let mut used = HashSet::new();
        for i in 0..t.len() {
            if in_import[i] || self.out.is_removed(i) || !t.is_ident(i) {
                continue;
            }
            let member = self.out.prev_kept(i).is_some_and(|p| t.is(p, ".") || t.is(p, "?."));
            if !member {
                used.insert(t.text(i));
            }
        }
        let is_used = |index: usize| used.contains(t.text(index));

        for decl in imports {
            let default_used = decl.default.map(is_used);
            let namespace_used = decl.namespace.map(is_used);
            let named_used: Vec<bool> = decl.named.iter().map(|s| used.contains(s.last.as_str())).collect();

            let bindings = decl.default.is_some() as usize + decl.namespace.is_some() as usize + decl.named.len();
            let any_used = default_used == Some(true) || namespace_used == Some(true) || named_used.contains(&true);
            if bindings == 0 {
                if decl.type_only > 0 {
                    self.out.remove(decl.range);
                }
                continue;
            }
            if !any_used {
                self.out.remove(decl.range);
                continue;
            }

            if let (Some(default), Some(false)) = (decl.default, default_used) {
                self.out.remove(default..default + 2);
            }
            if let (Some(namespace), Some(false)) = (decl.namespace, namespace_used) {
                // `, * as ns`
                self.out.remove(namespace - 3..namespace + 1);
            }
            if let Some((open, close)) = decl.braces {
                if !named_used.contains(&true) {
                    self.out.remove(open - 1..close + 1);
                } else {
                    for (spec, used) in decl.named.iter().zip(named_used) {
                        if !used {
                            let end = if t.is(spec.range.end, ",") { spec.range.end + 1 } else { spec.range.end };
                            self.out.remove(spec.range.start..end);
                        }
                    }
                }
            }
        }
    }

    // ---- types ------------------------------------------------------------

    /// Index just past the type starting at `j`, or `j` when none starts there.
    fn skip_type(&self, j: usize) -> usize {
        let t = self.t;
        let mut k = j;
        if t.is(k, "|") || t.is(k, "&") {
            k += 1;
        }
        let mut end = self.skip_type_operand(k);
        if end == k {
            return j;
        }
        while t.is(end, "|") || t.is(end, "&") {
            let next = self.skip_type_operand(end + 1);
            if next == end + 1 {
                break;
            }
            end = next;
        }
        if t.is(end, "extends") && !t.newline_before(end) {
            let check = self.skip_type(end + 1);
            if check > end + 1 && t.is(check, "?") {
                let yes = self.skip_type(check + 1);
                if yes > check + 1 && t.is(yes, ":") {
                    let no = self.skip_type(yes + 1);
                    if no > yes + 1 {
                        return no;
                    }
                }
            }
        }
        end
    }

    fn skip_type_operand(&self, j: usize) -> usize {
        let t = self.t;
        let mut k = match t.kind(j) {
            Some(TokenKind::String | TokenKind::Number | TokenKind::Template) => j + 1,
            Some(TokenKind::TemplateHead) => match t.group_end(j) {
                Some(end) => end + 1,
                None => return j,
            },
            Some(TokenKind::Ident) => match t.text(j) {
                "keyof" | "unique" | "readonly" | "infer" if !t.newline_before(j + 1) => {
                    let inner = self.skip_type_operand(j + 1);
                    return if inner > j + 1 { inner } else { j + 1 };
                }
                "typeof" => {
                    let mut k = if t.is(j + 1, "import") && t.is(j + 2, "(") {
                        t.matching(j + 2).map_or(j + 3, |close| close + 1)
                    } else {
                        self.qualified_name(j + 1)
                    };
                    while t.is(k, ".") && t.is_ident(k + 1) {
                        k += 2;
                    }
                    k
                }
                "abstract" if t.is(j + 1, "new") => return self.skip_type_operand(j + 1),
                "new" => {
                    let mut k = j + 1;
                    if t.is(k, "<") {
                        k = match self.angle_end(k) {
                            Some(end) => end,
                            None => return j,
                        };
                    }
                    return self.function_type(k).unwrap_or(j);
                }
                "asserts" if t.is_ident(j + 1) && !t.newline_before(j + 1) => {
                    let k = j + 2;
                    return if t.is(k, "is") { self.skip_type(k + 1) } else { k };
                }
                "import" if t.is(j + 1, "(") => {
                    let mut k = t.matching(j + 1).map_or(j + 2, |close| close + 1);
                    while t.is(k, ".") && t.is_ident(k + 1) {
                        k += 2;
                    }
                    if t.is(k, "<") {
                        k = self.angle_end(k).unwrap_or(k);
                    }
                    k
                }
                _ => {
                    let mut k = self.qualified_name(j);
                    if t.is(k, "<") && !t.newline_before(k) {
                        k = self.angle_end(k).unwrap_or(k);
                    }
                    if t.is(k, "is") && !t.newline_before(k) {
                        return self.skip_type(k + 1);
                    }
                    k
                }
            },
            Some(TokenKind::Punct) => match t.text(j) {
                "(" => {
                    if let Some(end) = self.function_type(j) {
                        return end;
                    }
                    t.matching(j).map_or(j, |close| close + 1)
                }
                "<" => {
                    let Some(k) = self.angle_end(j) else { return j };
                    return self.function_type(k).unwrap_or(j);
                }
                "{" | "[" => t.matching(j).map_or(j, |close| close + 1),
                "-" if t.kind(j + 1) == Some(TokenKind::Number) => j + 2,
                _ => return j,
            },
            _ => return j,
        };
        while t.is(k, "[") && !t.newline_before(k) {
            match t.matching(k) {
                Some(close) => k = close + 1,
                None => break,
            }
        }
        k
    }

    /// `(params) => Ret` starting at `k`.
    fn function_type(&self, k: usize) -> Option<usize> {
        let t = self.t;
        let close = t.is(k, "(").then(|| t.matching(k)).flatten()?;
        if !t.is(close + 1, "=>") {
            return None;
        }
        let end = self.skip_type(close + 2);
        (end > close + 2).then_some(end)
    }

    fn qualified_name(&self, j: usize) -> usize {
        let t = self.t;
        if !t.is_ident(j) {
            return j;
        }
        let mut k = j + 1;
        while t.is(k, ".") && t.is_ident(k + 1) {
            k += 2;
        }
        k
    }

    /// Index just past the `>` closing the `<` at `i`.
    fn angle_end(&self, i: usize) -> Option<usize> {
        let t = self.t;
        let mut depth = 0usize;
        let mut k = i;
        while k < t.len() {
            if t.kind(k) == Some(TokenKind::Punct) {
                match t.text(k) {
                    "<" => depth += 1,
                    ">" => {
                        depth = depth.checked_sub(1)?;
                        if depth == 0 {
                            return Some(k + 1);
                        }
                    }
                    ")" | "]" | "}" | ";" => return None,
                    _ => {}
                }
            }
            if let Some(end) = t.group_end(k) {
                k = end;
            }
            k += 1;
        }
        None
    }

    /// `<A, B>` at `i` parsed as type arguments.
    fn type_arguments(&self, i: usize) -> Option<usize> {
        let t = self.t;
        let mut k = i + 1;
        loop {
            let end = self.skip_type(k);
            if end == k {
                return None;
            }
            k = end;
            if t.is(k, ",") {
                k += 1;
            } else if t.is(k, ">") {
                return Some(k + 1);
            } else {
                return None;
            }
        }
    }
}

fn parse_integer(text: &str) -> Option<i64> {
    let text = text.replace('_', "");
    match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => i64::from_str_radix(hex, 16).ok(),
        None => text.parse().ok(),
    }
}

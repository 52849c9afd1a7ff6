// src/compile/modules.rs

//! Lowers `import`/`export` syntax onto the bundle's module runtime.
//!
//! A rewritten module body runs inside
//! `function (__exports, __import, __dynamicImport, __meta)`:
//! - each imported module becomes `const __mN = __import("spec")`, and
//!   references to its bindings become `__mN.name`, so bindings stay live
//!   (and circular imports work) the way ES module bindings do
//! - exports become getters on `__exports`, defined before any import runs
//! - `import()` calls `__dynamicImport`, `import.meta` reads `__meta`
//!
//! An imported name that some declaration or parameter in the module
//! shadows is read once, right after its module has been evaluated, instead
//! of being rewritten at each use.
//!
//! The generated prelude goes on the first line, so the body keeps the
//! source's line numbers.

use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;

use anyhow::{bail, Result};

use crate::compile::lexer::{is_identifier, TokenKind, Tokens};
use crate::compile::rewrite::Rewriter;

/// A module body plus the specifiers it imports, static ones first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkedModule {
    pub body: String,
    pub specifiers: Vec<String>,
}

/// Binding introduced by an import declaration.
#[derive(Debug, Clone)]
enum Imported {
    Namespace(usize),
    Named(usize, String),
}

impl Imported {
    fn access(&self) -> String {
        match self {
            Imported::Namespace(module) => format!("__m{module}"),
            Imported::Named(module, name) if is_identifier(name) => format!("__m{module}.{name}"),
            Imported::Named(module, name) => format!("__m{module}[{}]", quote(name)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Group {
    Block,
    Object,
    Class,
    Other,
}

const MEMBER_MODIFIERS: &[&str] = &["static", "get", "set", "async", "accessor"];

pub fn link(source: &str) -> Result<LinkedModule> {
    let tokens = Tokens::new(source, false)?;
    let mut linker = Linker::new(&tokens);
    linker.declarations()?;
    linker.dynamic_imports();
    linker.references();
    Ok(linker.finish())
}

struct Linker<'t, 'a> {
    t: &'t Tokens<'a>,
    out: Rewriter<'t, 'a>,
    /// Statically imported specifiers; the index is the `N` in `__mN`.
    modules: Vec<String>,
    dynamic: Vec<String>,
    imports: HashMap<String, Imported>,
    /// Local name order, for a stable prelude.
    import_order: Vec<String>,
    /// `(exported name, getter expression)`.
    exports: Vec<(String, String)>,
    /// `export { local as exported }` without `from`; resolved once every
    /// import is known.
    local_exports: Vec<(String, String)>,
    stars: Vec<usize>,
    /// Tokens of import/export clauses, skipped when rewriting references.
    clause: Vec<bool>,
    /// Imported names that a local declaration or parameter shadows.
    shadowed: HashSet<String>,
}

impl<'t, 'a> Linker<'t, 'a> {
    fn new(tokens: &'t Tokens<'a>) -> Self {
        Self {
            t: tokens,
            out: Rewriter::new(tokens),
            modules: Vec::new(),
            dynamic: Vec::new(),
            imports: HashMap::new(),
            import_order: Vec::new(),
            exports: Vec::new(),
            local_exports: Vec::new(),
            stars: Vec::new(),
            clause: vec![false; tokens.len()],
            shadowed: HashSet::new(),
        }
    }

    fn module(&mut self, specifier: String) -> usize {
        match self.modules.iter().position(|known| *known == specifier) {
            Some(index) => index,
            None => {
                self.modules.push(specifier);
                self.modules.len() - 1
            }
        }
    }

    fn drop_clause(&mut self, start: usize, end: usize) {
        self.out.remove(start..end);
        for flag in &mut self.clause[start..end.min(self.t.len())] {
            *flag = true;
        }
    }

    fn bind(&mut self, local: &str, imported: Imported) {
        if self.imports.insert(local.to_string(), imported).is_none() {
            self.import_order.push(local.to_string());
        }
    }

    // ---- declarations -----------------------------------------------------

    /// Import and export declarations only appear at the top level.
    fn declarations(&mut self) -> Result<()> {
        let t = self.t;
        let mut k = 0;
        while k < t.len() {
            let member = k > 0 && (t.is(k - 1, ".") || t.is(k - 1, "?."));
            if !member && t.is(k, "import") && !t.is(k + 1, "(") && !t.is(k + 1, ".") {
                k = self.import_declaration(k)?;
                continue;
            }
            if !member && t.is(k, "export") {
                k = self.export_declaration(k)?;
                continue;
            }
            k = t.group_end(k).map_or(k + 1, |end| end + 1);
        }
        Ok(())
    }

    fn import_declaration(&mut self, i: usize) -> Result<usize> {
        let t = self.t;
        let mut k = i + 1;

        if t.kind(k) == Some(TokenKind::String) {
            self.module(unquote(t.text(k)));
            let end = self.clause_end(k + 1);
            self.drop_clause(i, end);
            return Ok(end);
        }

        let mut bindings: Vec<(String, Option<String>)> = Vec::new();
        if t.is_ident(k) && !(t.is(k, "from") && t.kind(k + 1) == Some(TokenKind::String)) {
            bindings.push((t.text(k).to_string(), Some("default".to_string())));
            k += 1;
            if t.is(k, ",") {
                k += 1;
            }
        }
        if t.is(k, "*") {
            if !t.is(k + 1, "as") || !t.is_ident(k + 2) {
                bail!("malformed namespace import (line {})", t.line(k));
            }
            bindings.push((t.text(k + 2).to_string(), None));
            k += 3;
        } else if t.is(k, "{") {
            let Some(close) = t.matching(k) else { bail!("unclosed import list (line {})", t.line(k)) };
            for (imported, local) in self.specifier_list(k, close)? {
                bindings.push((local, Some(imported)));
            }
            k = close + 1;
        }

        if !t.is(k, "from") || t.kind(k + 1) != Some(TokenKind::String) {
            bail!("expected `from \"...\"` in import declaration (line {})", t.line(i));
        }
        let module = self.module(unquote(t.text(k + 1)));
        for (local, imported) in bindings {
            let binding = match imported {
                Some(name) => Imported::Named(module, name),
                None => Imported::Namespace(module),
            };
            self.bind(&local, binding);
        }
        let end = self.clause_end(k + 2);
        self.drop_clause(i, end);
        Ok(end)
    }

    fn export_declaration(&mut self, i: usize) -> Result<usize> {
        let t = self.t;
        let k = i + 1;
        match t.text(k) {
            "default" if t.is_ident(k) => self.export_default(i),
            "const" | "let" | "var" if t.is_ident(k) => {
                self.drop_clause(i, k);
                for name in self.declared_names(k + 1) {
                    self.exports.push((name.clone(), name));
                }
                Ok(k)
            }
            "async" | "function" | "class" if t.is_ident(k) => {
                let mut name = k + 1;
                if t.is(k, "async") {
                    name += 1;
                }
                if t.is(name, "*") {
                    name += 1;
                }
                if !t.is_ident(name) {
                    bail!("exported declaration needs a name (line {})", t.line(i));
                }
                self.drop_clause(i, k);
                let name = t.text(name).to_string();
                self.exports.push((name.clone(), name));
                Ok(k)
            }
            "{" => {
                let Some(close) = t.matching(k) else { bail!("unclosed export list (line {})", t.line(k)) };
                let list = self.specifier_list(k, close)?;
                if t.is(close + 1, "from") && t.kind(close + 2) == Some(TokenKind::String) {
                    let module = self.module(unquote(t.text(close + 2)));
                    for (imported, exported) in list {
                        let getter = Imported::Named(module, imported).access();
                        self.exports.push((exported, getter));
                    }
                    let end = self.clause_end(close + 3);
                    self.drop_clause(i, end);
                    return Ok(end);
                }
                self.local_exports.extend(list);
                let end = self.clause_end(close + 1);
                self.drop_clause(i, end);
                Ok(end)
            }
            "*" => {
                let mut j = k + 1;
                let alias = if t.is(j, "as") {
                    j += 2;
                    Some(name_text(t.text(j - 1)))
                } else {
                    None
                };
                if !t.is(j, "from") || t.kind(j + 1) != Some(TokenKind::String) {
                    bail!("expected `from \"...\"` in export declaration (line {})", t.line(i));
                }
                let module = self.module(unquote(t.text(j + 1)));
                match alias {
                    Some(name) => self.exports.push((name, format!("__m{module}"))),
                    None => self.stars.push(module),
                }
                let end = self.clause_end(j + 2);
                self.drop_clause(i, end);
                Ok(end)
            }
            _ => bail!("unsupported export form (line {})", t.line(i)),
        }
    }

    fn export_default(&mut self, i: usize) -> Result<usize> {
        let t = self.t;
        let value = i + 2;
        let mut keyword = value;
        if t.is(keyword, "async") && t.is(keyword + 1, "function") && !t.newline_before(keyword + 1) {
            keyword += 1;
        }

        if t.is(keyword, "function") || t.is(keyword, "class") {
            let mut name = keyword + 1;
            if t.is(name, "*") {
                name += 1;
            }
            let named = t.is_ident(name) && !(t.is(keyword, "class") && t.is(name, "extends"));
            self.drop_clause(i, value);
            if named {
                let name = t.text(name).to_string();
                self.exports.push(("default".to_string(), name));
            } else {
                self.out.insert_after(name - 1, " __default");
                if let Some(body_end) = self.declaration_body_end(keyword) {
                    self.out.insert_after(
                        body_end,
                        " Object.defineProperty(__default, \"name\", { value: \"default\" });",
                    );
                }
                self.exports.push(("default".to_string(), "__default".to_string()));
            }
            return Ok(value);
        }

        self.out.replace_range(i..value, "const __default =");
        for flag in &mut self.clause[i..value] {
            *flag = true;
        }
        self.exports.push(("default".to_string(), "__default".to_string()));
        Ok(value)
    }

    /// Closing `}` of the function or class declared at `keyword`.
    fn declaration_body_end(&self, keyword: usize) -> Option<usize> {
        let t = self.t;
        let mut k = keyword + 1;
        if t.is(keyword, "function") {
            while k < t.len() && !t.is(k, "(") {
                k += 1;
            }
            k = t.matching(k)? + 1;
        }
        while k < t.len() && !t.is(k, "{") {
            k = t.group_end(k).map_or(k + 1, |end| end + 1);
        }
        t.matching(k)
    }

    /// `(first, last)` pairs of `{ a, b as c, "d" as e }`.
    fn specifier_list(&self, open: usize, close: usize) -> Result<Vec<(String, String)>> {
        let t = self.t;
        let mut list = Vec::new();
        let mut k = open + 1;
        while k < close {
            let first = name_text(t.text(k));
            if t.is(k + 1, "as") {
                list.push((first, name_text(t.text(k + 2))));
                k += 3;
            } else {
                list.push((first.clone(), first));
                k += 1;
            }
            if t.is(k, ",") {
                k += 1;
            } else if k < close {
                bail!("malformed specifier list (line {})", t.line(k));
            }
        }
        Ok(list)
    }

    /// Skip `[with { ... }] [;]`.
    fn clause_end(&self, mut k: usize) -> usize {
        let t = self.t;
        if (t.is(k, "with") || t.is(k, "assert")) && t.is(k + 1, "{") && !t.newline_before(k) {
            k = t.matching(k + 1).map_or(k + 2, |close| close + 1);
        }
        if t.is(k, ";") {
            k += 1;
        }
        k
    }

    /// Names bound by the declarators starting at `from`.
    fn declared_names(&self, from: usize) -> Vec<String> {
        let t = self.t;
        let mut names = Vec::new();
        let mut k = from;
        loop {
            match t.kind(k) {
                Some(TokenKind::Ident) => {
                    names.push(t.text(k).to_string());
                    k += 1;
                }
                Some(TokenKind::Punct) if t.is(k, "{") || t.is(k, "[") => {
                    let Some(close) = t.matching(k) else { return names };
                    self.pattern_names(k, close, &mut names);
                    k = close + 1;
                }
                _ => return names,
            }
            if t.is(k, "=") {
                k = t.expression_end(k + 1, t.len());
            }
            if !t.is(k, ",") {
                return names;
            }
            k += 1;
        }
    }

    /// Binding names inside a destructuring pattern or parameter list.
    fn pattern_names(&self, open: usize, close: usize, names: &mut Vec<String>) {
        let t = self.t;
        let mut k = open + 1;
        while k < close {
            if t.is(k, "=") {
                // default value
                k = t.expression_end(k + 1, close);
                continue;
            }
            if t.is_ident(k) && !t.is(k + 1, ":") && !t.is(k + 1, "(") {
                let prev = t.text(k - 1);
                if matches!(prev, "(" | "," | "..." | "{" | "[" | ":") {
                    names.push(t.text(k).to_string());
                }
            }
            k += 1;
        }
    }

    // ---- uses -------------------------------------------------------------

    fn dynamic_imports(&mut self) {
        let t = self.t;
        for k in 0..t.len() {
            if self.clause[k] || !t.is(k, "import") || k > 0 && (t.is(k - 1, ".") || t.is(k - 1, "?.")) {
                continue;
            }
            if t.is(k + 1, "(") {
                self.out.replace(k, "__dynamicImport");
                let literal = t.kind(k + 2) == Some(TokenKind::String) && (t.is(k + 3, ")") || t.is(k + 3, ","));
                if literal {
                    let specifier = unquote(t.text(k + 2));
                    if !self.dynamic.contains(&specifier) {
                        self.dynamic.push(specifier);
                    }
                }
            } else if t.is(k + 1, ".") && t.is(k + 2, "meta") {
                self.out.replace_range(k..k + 3, "__meta");
            }
        }
    }

    /// Names that some declaration, parameter or arrow function binds.
    fn shadowed_names(&self) -> HashSet<String> {
        let t = self.t;
        let mut names = Vec::new();
        for k in 0..t.len() {
            if self.clause[k] {
                continue;
            }
            let member = k > 0 && (t.is(k - 1, ".") || t.is(k - 1, "?."));
            match t.kind(k) {
                Some(TokenKind::Ident) if !member => match t.text(k) {
                    "const" | "let" | "var" => names.extend(self.declared_names(k + 1)),
                    "function" | "class" => {
                        let name = if t.is(k + 1, "*") { k + 2 } else { k + 1 };
                        if t.is_ident(name) && !t.is(name, "extends") {
                            names.push(t.text(name).to_string());
                        }
                    }
                    _ if t.is(k + 1, "=>") => names.push(t.text(k).to_string()),
                    _ => {}
                },
                Some(TokenKind::Punct) if t.is(k, "(") => {
                    let Some(close) = t.matching(k) else { continue };
                    let control = k > 0 && matches!(t.text(k - 1), "if" | "while" | "for" | "switch" | "with");
                    if t.is(close + 1, "=>") || t.is(close + 1, "{") && !control {
                        self.pattern_names(k, close, &mut names);
                    }
                }
                _ => {}
            }
        }
        names.into_iter().collect()
    }

    /// Kind of every group opener, and the innermost group around each token.
    fn groups(&self) -> Vec<Option<Group>> {
        let t = self.t;
        let mut enclosing = vec![None; t.len()];
        let mut stack: Vec<Group> = Vec::new();
        let mut class_at: Option<usize> = None;

        for k in 0..t.len() {
            enclosing[k] = stack.last().copied();
            let member = k > 0 && (t.is(k - 1, ".") || t.is(k - 1, "?."));
            match t.kind(k) {
                Some(TokenKind::Ident) if t.text(k) == "class" && !member => class_at = Some(stack.len()),
                Some(TokenKind::Punct) => match t.text(k) {
                    "{" => {
                        let group = if class_at == Some(stack.len()) {
                            class_at = None;
                            Group::Class
                        } else {
                            self.brace_kind(k, &stack)
                        };
                        stack.push(group);
                    }
                    "(" | "[" => stack.push(Group::Other),
                    ")" | "]" | "}" => {
                        stack.pop();
                    }
                    _ => {}
                },
                Some(TokenKind::TemplateHead) => stack.push(Group::Other),
                Some(TokenKind::TemplateMiddle) => {
                    stack.pop();
                    stack.push(Group::Other);
                }
                Some(TokenKind::TemplateTail) => {
                    stack.pop();
                }
                _ => {}
            }
        }
        enclosing
    }

    fn brace_kind(&self, open: usize, stack: &[Group]) -> Group {
        let t = self.t;
        let Some(prev) = open.checked_sub(1) else { return Group::Block };
        match t.kind(prev) {
            Some(TokenKind::Punct) => match t.text(prev) {
                ")" | ";" | "{" | "}" | "=>" => Group::Block,
                ":" => {
                    if stack.last() == Some(&Group::Object) || self.after_ternary(prev) {
                        Group::Object
                    } else {
                        Group::Block
                    }
                }
                _ => Group::Object,
            },
            Some(TokenKind::Ident) => match t.text(prev) {
                "return" | "typeof" | "void" | "in" | "of" | "yield" | "await" | "delete" | "instanceof"
                | "new" | "throw" | "default" | "case" => Group::Object,
                _ => Group::Block,
            },
            Some(TokenKind::TemplateHead | TokenKind::TemplateMiddle) => Group::Object,
            _ => Group::Block,
        }
    }

    /// The `:` at `colon` closes a `cond ? a : b` rather than a label or case.
    fn after_ternary(&self, colon: usize) -> bool {
        let t = self.t;
        let mut k = colon;
        while k > 0 {
            k -= 1;
            if let Some(open) = t.opening(k) {
                k = open;
                continue;
            }
            match t.text(k) {
                "?" if t.kind(k) == Some(TokenKind::Punct) => return true,
                "case" | "default" if t.is_ident(k) => return false,
                ";" | "{" | "(" | "[" => return false,
                _ => {}
            }
        }
        false
    }

    fn references(&mut self) {
        let t = self.t;
        self.shadowed = self.shadowed_names();
        let groups = self.groups();

        for k in 0..t.len() {
            if self.clause[k] || t.kind(k) != Some(TokenKind::Ident) || self.out.is_removed(k) {
                continue;
            }
            let Some(imported) = self.imports.get(t.text(k)).cloned() else { continue };
            if matches!(imported, Imported::Namespace(_)) || self.shadowed.contains(t.text(k)) {
                continue;
            }

            let prev = k.checked_sub(1).map_or("", |p| t.text(p));
            let next = t.text(k + 1);
            if matches!(prev, "." | "?." | "break" | "continue") {
                continue;
            }
            let access = imported.access();
            match groups[k] {
                Some(Group::Object) if matches!(prev, "{" | ",") => match next {
                    ":" | "(" => continue,
                    "," | "}" => {
                        self.out.replace(k, format!("{}: {access}", t.text(k)));
                        continue;
                    }
                    _ => {}
                },
                Some(Group::Object) if matches!(prev, "get" | "set" | "async" | "*") && next == "(" => continue,
                Some(Group::Class) => {
                    let member_start = matches!(prev, "{" | ";" | "}" | "*")
                        || MEMBER_MODIFIERS.contains(&prev)
                        || t.newline_before(k);
                    if member_start && matches!(next, "(" | "=" | ";" | "}" | "") {
                        continue;
                    }
                }
                Some(Group::Block) | None if next == ":" && matches!(prev, "" | "{" | ";" | "}") => continue,
                _ => {}
            }

            let called = next == "(" || matches!(t.kind(k + 1), Some(TokenKind::Template | TokenKind::TemplateHead));
            if called && prev != "new" {
                self.out.replace(k, format!("(0, {access})"));
            } else {
                self.out.replace(k, access);
            }
        }
    }

    // ---- output -----------------------------------------------------------

    fn finish(mut self) -> LinkedModule {
        let shadowed = std::mem::take(&mut self.shadowed);
        let local_exports = std::mem::take(&mut self.local_exports);
        for (local, exported) in local_exports {
            let getter = match self.imports.get(&local) {
                Some(Imported::Named(..)) if !shadowed.contains(&local) => self.imports[&local].access(),
                _ => local,
            };
            self.exports.push((exported, getter));
        }

        let mut prelude = String::new();
        if !self.exports.is_empty() {
            prelude.push_str("__export(__exports, {");
            for (index, (name, getter)) in self.exports.iter().enumerate() {
                let sep = if index == 0 { " " } else { ", " };
                let _ = write!(prelude, "{sep}{}: () => {getter}", quote(name));
            }
            prelude.push_str(" }); ");
        }
        for (index, specifier) in self.modules.iter().enumerate() {
            let _ = write!(prelude, "const __m{index} = __import({}); ", quote(specifier));
        }
        for module in &self.stars {
            let _ = write!(prelude, "__exportStar(__exports, __m{module}); ");
        }
        for local in &self.import_order {
            let imported = &self.imports[local];
            if matches!(imported, Imported::Namespace(_)) || shadowed.contains(local) {
                let _ = write!(prelude, "const {local} = {}; ", imported.access());
            }
        }

        let mut specifiers = self.modules.clone();
        for specifier in self.dynamic {
            if !specifiers.contains(&specifier) {
                specifiers.push(specifier);
            }
        }
        prelude.push_str(&self.out.finish());
        LinkedModule { body: prelude, specifiers }
    }
}

/// Specifier or export name as written, without quotes.
fn name_text(raw: &str) -> String {
    if raw.starts_with('"') || raw.starts_with('\'') {
        unquote(raw)
    } else {
        raw.to_string()
    }
}

/// Value of a string literal token.
fn unquote(raw: &str) -> String {
    let inner = raw.get(1..raw.len().saturating_sub(1)).unwrap_or_default();
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

fn quote(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| format!("\"{text}\""))
}

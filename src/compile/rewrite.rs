// src/compile/rewrite.rs

//! Token-level edits over a [`Tokens`] stream.
//!
//! Output keeps every line break of the input: removed tokens leave their
//! newlines behind and replacements are padded to the number of lines they
//! replace, so engine diagnostics point at the original lines.

use std::ops::Range;

use crate::compile::lexer::Tokens;

pub struct Rewriter<'t, 'a> {
    tokens: &'t Tokens<'a>,
    removed: Vec<bool>,
    /// Part of a replaced range: contributes nothing, not even newlines.
    silent: Vec<bool>,
    replaced: Vec<Option<String>>,
    before: Vec<String>,
    after: Vec<String>,
}

impl<'t, 'a> Rewriter<'t, 'a> {
    pub fn new(tokens: &'t Tokens<'a>) -> Self {
        let len = tokens.len();
        Self {
            tokens,
            removed: vec![false; len],
            silent: vec![false; len],
            replaced: vec![None; len],
            before: vec![String::new(); len],
            after: vec![String::new(); len],
        }
    }

    pub fn is_removed(&self, i: usize) -> bool {
        self.removed.get(i).copied().unwrap_or(false)
    }

    pub fn is_replaced(&self, i: usize) -> bool {
        self.replaced.get(i).is_some_and(Option::is_some)
    }

    pub fn remove(&mut self, range: Range<usize>) {
        let end = range.end.min(self.removed.len());
        for i in range.start..end {
            self.removed[i] = true;
        }
    }

    /// Replace token `i` with `text`.
    pub fn replace(&mut self, i: usize, text: impl Into<String>) {
        self.replace_range(i..i + 1, text);
    }

    /// Replace tokens `range` (and the trivia between them) with `text`.
    pub fn replace_range(&mut self, range: Range<usize>, text: impl Into<String>) {
        let end = range.end.min(self.removed.len());
        if range.start >= end {
            return;
        }
        let source = self.tokens.source();
        let (Some(first), Some(last)) = (self.tokens.token(range.start), self.tokens.token(end - 1)) else {
            return;
        };
        let original_lines = newlines(&source[first.start..last.end]);

        let mut text = text.into();
        let missing = original_lines.saturating_sub(newlines(&text));
        text.push_str(&"\n".repeat(missing));

        for i in range.start..end {
            self.removed[i] = true;
            self.silent[i] = true;
        }
        self.replaced[range.start] = Some(text);
    }

    pub fn insert_before(&mut self, i: usize, text: &str) {
        if let Some(slot) = self.before.get_mut(i) {
            slot.push_str(text);
        }
    }

    pub fn insert_after(&mut self, i: usize, text: &str) {
        if let Some(slot) = self.after.get_mut(i) {
            slot.push_str(text);
        }
    }

    /// Nearest token before `i` that is still in the output.
    pub fn prev_kept(&self, i: usize) -> Option<usize> {
        (0..i).rev().find(|&j| !self.removed[j] || self.replaced[j].is_some())
    }

    /// Nearest token after `i` that is still in the output.
    pub fn next_kept(&self, i: usize) -> Option<usize> {
        (i + 1..self.removed.len()).find(|&j| !self.removed[j] || self.replaced[j].is_some())
    }

    pub fn finish(self) -> String {
        let source = self.tokens.source();
        let mut out = String::with_capacity(source.len() + 64);
        let mut cursor = 0;

        for i in 0..self.tokens.len() {
            let Some(token) = self.tokens.token(i) else { break };
            let gap = &source[cursor..token.start];
            let prev_gone = i > 0 && self.removed[i - 1];
            if self.silent[i] && i > 0 && self.silent[i - 1] && self.replaced[i].is_none() {
                // Inside a replaced range.
            } else if self.removed[i] && prev_gone {
                out.push_str(&"\n".repeat(newlines(gap)));
            } else if prev_gone && !self.silent[i - 1] {
                push_collapsed(&mut out, gap);
            } else {
                out.push_str(gap);
            }

            out.push_str(&self.before[i]);
            match &self.replaced[i] {
                Some(text) => out.push_str(text),
                None if self.silent[i] => {}
                None if self.removed[i] => out.push_str(&"\n".repeat(newlines(token.text(source)))),
                None => out.push_str(token.text(source)),
            }
            out.push_str(&self.after[i]);
            cursor = token.end;
        }

        out.push_str(&source[cursor..]);
        out
    }
}

/// Gap after a removed run: its line breaks and indentation, plus inline
/// whitespace only when the output does not already end in some.
fn push_collapsed(out: &mut String, gap: &str) {
    match gap.rfind('\n') {
        Some(last) => {
            out.push_str(&"\n".repeat(newlines(gap)));
            out.push_str(&gap[last + 1..]);
        }
        None if out.is_empty() || out.ends_with(char::is_whitespace) => {}
        None => out.push_str(gap),
    }
}

fn newlines(text: &str) -> usize {
    text.matches('\n').count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removal_keeps_line_breaks() {
        let tokens = Tokens::new("let a: {\n  x: number\n} = 1\n", false).unwrap();
        let mut rewriter = Rewriter::new(&tokens);
        // `:` through the closing brace
        rewriter.remove(2..8);
        assert_eq!(rewriter.finish(), "let a\n\n= 1\n");
    }

    #[test]
    fn replacement_is_padded_to_the_lines_it_covers() {
        let tokens = Tokens::new("a(\n1,\n2)\nb", false).unwrap();
        let mut rewriter = Rewriter::new(&tokens);
        rewriter.replace_range(0..6, "c()");
        assert_eq!(rewriter.finish(), "c()\n\n\nb");
    }
}

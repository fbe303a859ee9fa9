//! Rule-file line parsing.
//!
//! Grammar, per line:
//!
//! ```text
//! line        := blank | comment | directive | rule
//! comment     := ';' ...
//! directive   := 'add' SP symbol (',' symbol)*
//! rule        := field '/' field '/' before '_' after
//! field       := position ('|' position)*
//! position    := '[' bundle ']' ('[' bundle ']')*      one disjunctive position
//!              | (symbol | category | '0' | '*' | '#')+   one position each
//! bundle      := ε | signed (',' signed)*
//! signed      := ('+' | '-') feature-name
//! ```
//!
//! Separators (`/`, `_`, `|`) are only recognised outside brackets, so feature
//! names may contain underscores. Columns in errors are 1-based character
//! columns of the original line.
//!
//! Parsing resolves names (symbols, categories, features) but performs no
//! structural validation of the rule; that happens in `compile`.

use crate::{Bundle, Formula, Inventory, Result, ShiftError, SignedFeature};

/// One parsed rule-file line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    /// Blank or comment.
    Blank,
    Directive(Directive),
    Rule(Rule),
}

/// An ActiveSet mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    Add(Vec<String>),
}

/// Start columns of the three rule fields, for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FieldColumns {
    pub target: usize,
    pub output: usize,
    pub environment: usize,
}

/// A parsed, uncompiled rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub line: usize,
    /// The rule text as written, trimmed.
    pub source: String,
    pub target: Vec<Formula>,
    pub output: Vec<Formula>,
    pub before: Vec<Formula>,
    pub after: Vec<Formula>,
    pub columns: FieldColumns,
}

/// Parse one rule-file line; `line` is its 1-based number.
pub fn parse_line(text: &str, line: usize, inventory: &Inventory) -> Result<Line> {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed.starts_with(';') {
        return Ok(Line::Blank);
    }
    if let Some(directive) = parse_directive(text, line)? {
        return Ok(Line::Directive(directive));
    }

    check_brackets(text, line)?;
    let fields = split_top_level(text, '/');
    if fields.len() != 3 {
        let column = match fields.get(3) {
            Some(&(offset, _)) => column_of(text, offset - 1),
            None => text.chars().count() + 1,
        };
        return Err(ShiftError::syntax(line, column, "expected target/output/environment"));
    }
    let (target_at, target_text) = fields[0];
    let (output_at, output_text) = fields[1];
    let (env_at, env_text) = fields[2];

    let halves = split_top_level(env_text, '_');
    if halves.len() != 2 {
        let message = if halves.len() < 2 {
            "environment needs exactly one '_'"
        } else {
            "environment has more than one '_'"
        };
        return Err(ShiftError::syntax(line, column_of(text, env_at), message));
    }
    let (before_at, before_text) = halves[0];
    let (after_at, after_text) = halves[1];

    let field = FieldParser { line, text, inventory };
    Ok(Line::Rule(Rule {
        line,
        source: trimmed.to_string(),
        target: field.parse(target_text, target_at)?,
        output: field.parse(output_text, output_at)?,
        before: field.parse(before_text, env_at + before_at)?,
        after: field.parse(after_text, env_at + after_at)?,
        columns: FieldColumns {
            target: column_of(text, target_at),
            output: column_of(text, output_at),
            environment: column_of(text, env_at),
        },
    }))
}

fn parse_directive(text: &str, line: usize) -> Result<Option<Directive>> {
    if regex!(r"^\s*add\s*$").is_match(text) {
        let column = text.find("add").map_or(1, |at| column_of(text, at));
        return Err(ShiftError::syntax(line, column, "'add' needs at least one symbol"));
    }
    let Some(caps) = regex!(r"^\s*add\s+([^/]+)$").captures(text) else {
        return Ok(None);
    };
    let list = caps.get(1).map_or("", |m| m.as_str());
    let list_at = caps.get(1).map_or(0, |m| m.start());
    let mut names = Vec::new();
    for (offset, name) in split_offsets(list, ',') {
        let name = name.trim();
        if name.is_empty() {
            return Err(ShiftError::syntax(line, column_of(text, list_at + offset), "empty symbol in 'add'"));
        }
        names.push(name.to_string());
    }
    Ok(Some(Directive::Add(names)))
}

/// Parses the formula sequence of one field.
struct FieldParser<'a> {
    line: usize,
    /// The whole line, for column computation.
    text: &'a str,
    inventory: &'a Inventory,
}

impl FieldParser<'_> {
    /// `at` is the byte offset of `field` within the line.
    fn parse(&self, field: &str, at: usize) -> Result<Vec<Formula>> {
        let mut formulas = Vec::new();
        if field.trim().is_empty() {
            return Ok(formulas);
        }
        for (offset, segment) in split_top_level(field, '|') {
            if segment.trim().is_empty() {
                return Err(self.error(at + offset, "empty position between '|'"));
            }
            self.parse_segment(segment, at + offset, &mut formulas)?;
        }
        Ok(formulas)
    }

    fn parse_segment(&self, segment: &str, at: usize, out: &mut Vec<Formula>) -> Result<()> {
        let mut pending: Vec<Bundle> = Vec::new();
        let mut pos = 0;

        while let Some(c) = segment[pos..].chars().next() {
            if c.is_whitespace() {
                pos += c.len_utf8();
                continue;
            }
            if c == '[' {
                let close = segment[pos..]
                    .find(']')
                    .map(|i| pos + i)
                    .ok_or_else(|| self.error(at + pos, "unclosed '['"))?;
                pending.push(self.parse_bundle(&segment[pos + 1..close], at + pos + 1)?);
                pos = close + 1;
                continue;
            }
            if !pending.is_empty() {
                out.push(Formula::Bundles(std::mem::take(&mut pending)));
            }
            match c {
                ']' => return Err(self.error(at + pos, "unmatched ']'")),
                '0' | '∅' => out.push(Formula::Null),
                '*' => out.push(Formula::Wildcard),
                '#' => out.push(Formula::Boundary),
                _ => {
                    if let Some((id, len)) = self.inventory.match_symbol(&segment[pos..]) {
                        out.push(Formula::Literal(id));
                        pos += len;
                        continue;
                    }
                    match self.inventory.category_id(c) {
                        Some(category) => out.push(Formula::Category(category)),
                        None => return Err(ShiftError::UnknownSymbol(c.to_string())),
                    }
                }
            }
            pos += c.len_utf8();
        }
        if !pending.is_empty() {
            out.push(Formula::Bundles(pending));
        }
        Ok(())
    }

    fn parse_bundle(&self, inner: &str, at: usize) -> Result<Bundle> {
        let mut bundle = Vec::new();
        if inner.trim().is_empty() {
            return Ok(bundle);
        }
        for (offset, token) in split_offsets(inner, ',') {
            let lead = token.len() - token.trim_start().len();
            let token = token.trim();
            let column_at = at + offset + lead;
            let positive = match token.chars().next() {
                Some('+') => true,
                Some('-') => false,
                Some(_) => return Err(self.error(column_at, format!("expected '+' or '-' before '{token}'"))),
                None => return Err(self.error(column_at, "empty feature in bundle")),
            };
            let name = token[1..].trim();
            if name.is_empty() {
                return Err(self.error(column_at, "missing feature name after sign"));
            }
            let feature = self
                .inventory
                .feature_id(name)
                .ok_or_else(|| ShiftError::UnknownFeature { name: name.to_string(), line: self.line })?;
            bundle.push(SignedFeature { feature, positive });
        }
        Ok(bundle)
    }

    fn error(&self, byte: usize, message: impl Into<String>) -> ShiftError {
        ShiftError::syntax(self.line, column_of(self.text, byte), message)
    }
}

/// Reject unbalanced or nested brackets anywhere in the line.
fn check_brackets(text: &str, line: usize) -> Result<()> {
    let mut open: Option<usize> = None;
    for (i, c) in text.char_indices() {
        match (c, open) {
            ('[', Some(_)) => return Err(ShiftError::syntax(line, column_of(text, i), "nested '['")),
            ('[', None) => open = Some(i),
            (']', None) => return Err(ShiftError::syntax(line, column_of(text, i), "unmatched ']'")),
            (']', Some(_)) => open = None,
            _ => {}
        }
    }
    match open {
        Some(at) => Err(ShiftError::syntax(line, column_of(text, at), "unclosed '['")),
        None => Ok(()),
    }
}

/// Split on `sep` outside brackets, returning each piece with its byte
/// offset in `text`. Brackets must already be balanced.
fn split_top_level(text: &str, sep: char) -> Vec<(usize, &str)> {
    let mut pieces = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            c if c == sep && depth == 0 => {
                pieces.push((start, &text[start..i]));
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    pieces.push((start, &text[start..]));
    pieces
}

fn split_offsets(text: &str, sep: char) -> impl Iterator<Item = (usize, &str)> {
    let mut start = 0;
    text.split(sep).map(move |piece| {
        let at = start;
        start += piece.len() + sep.len_utf8();
        (at, piece)
    })
}

/// 1-based character column of byte offset `byte` in `text`.
fn column_of(text: &str, byte: usize) -> usize {
    text[..byte.min(text.len())].chars().count() + 1
}

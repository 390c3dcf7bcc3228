//! Dead-declaration stripping
//!
//! Post-processing over rendered stylesheet text. Removes:
//!
//! - custom-property declarations (`--name: …;`) never referenced through `var(--name)`;
//!   runs to a fixed point so a chain of variables only used by removed variables goes too
//! - `@keyframes name { … }` blocks (vendor-prefixed included) whose name never appears in an
//!   `animation` or `animation-name` declaration
//! - rules left without any declaration
//!
//! The scanner is deliberately shallow: it understands braces, parentheses and quoted strings,
//! which is all the rendered output of a generation context contains.

use std::collections::HashSet;
use std::ops::Range;

/// Strip unused custom properties and keyframes from `css`.
pub fn strip_unused(css: &str) -> String {
    let mut current = css.to_string();
    let mut changed = false;

    loop {
        let referenced = var_references(&current);
        let dead: Vec<Range<usize>> = declarations(&current)
            .into_iter()
            .filter(|d| d.name.starts_with("--") && !referenced.contains(d.name.as_str()))
            .map(|d| line_span(&current, d.span))
            .collect();
        if dead.is_empty() {
            break;
        }
        current = remove_spans(&current, dead);
        changed = true;
    }

    let animations = animation_names(&current);
    let dead_keyframes: Vec<Range<usize>> = keyframes_blocks(&current)
        .into_iter()
        .filter(|(name, _)| !animations.contains(name.as_str()))
        .map(|(_, span)| line_span(&current, span))
        .collect();
    if !dead_keyframes.is_empty() {
        current = remove_spans(&current, dead_keyframes);
        changed = true;
    }

    if !changed {
        return current;
    }

    loop {
        let empty = empty_rules(&current);
        if empty.is_empty() {
            break;
        }
        let spans = empty.into_iter().map(|span| line_span(&current, span)).collect();
        current = remove_spans(&current, spans);
    }

    collapse_blank_lines(&current)
}

/// One `property: value` declaration
#[derive(Debug, Clone, PartialEq, Eq)]
struct Declaration {
    name: String,
    value: String,
    /// From the first byte of the name through the terminating `;` (if any)
    span: Range<usize>,
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_'
}

fn ident_end(bytes: &[u8], start: usize) -> usize {
    let mut end = start;
    while end < bytes.len() && is_ident_byte(bytes[end]) {
        end += 1;
    }
    end
}

fn skip_whitespace(bytes: &[u8], mut idx: usize) -> usize {
    while idx < bytes.len() && bytes[idx].is_ascii_whitespace() {
        idx += 1;
    }
    idx
}

fn previous_significant(bytes: &[u8], idx: usize) -> Option<u8> {
    bytes[..idx]
        .iter()
        .rev()
        .copied()
        .find(|b| !b.is_ascii_whitespace())
}

/// Scan a declaration value starting at `start`.
///
/// Returns `(value_end, terminator)` where the terminator is `;`, `}`, `{` or `None` at EOF.
fn scan_value(bytes: &[u8], start: usize) -> (usize, Option<u8>) {
    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    let mut idx = start;
    while idx < bytes.len() {
        let b = bytes[idx];
        match quote {
            Some(q) => {
                if b == b'\\' {
                    idx += 1;
                } else if b == q {
                    quote = None;
                }
            }
            None => match b {
                b'"' | b'\'' => quote = Some(b),
                b'(' => depth += 1,
                b')' => depth = depth.saturating_sub(1),
                b';' | b'}' | b'{' if depth == 0 => return (idx, Some(b)),
                _ => {}
            },
        }
        idx += 1;
    }
    // A trailing `\` inside a quote skips past the end
    (idx.min(bytes.len()), None)
}

/// Every declaration in the stylesheet (selectors such as `a:hover {` are skipped).
fn declarations(css: &str) -> Vec<Declaration> {
    let bytes = css.as_bytes();
    let mut found = Vec::new();
    let mut idx = 0;

    while idx < bytes.len() {
        let starts_ident = bytes[idx].is_ascii_alphabetic() || bytes[idx] == b'-';
        let at_boundary = idx == 0 || !is_ident_byte(bytes[idx - 1]);
        if !(starts_ident && at_boundary)
            || !matches!(previous_significant(bytes, idx), Some(b'{') | Some(b';'))
        {
            idx += 1;
            continue;
        }

        let name_end = ident_end(bytes, idx);
        let colon = skip_whitespace(bytes, name_end);
        if colon >= bytes.len() || bytes[colon] != b':' {
            idx = name_end.max(idx + 1);
            continue;
        }

        let (value_end, terminator) = scan_value(bytes, colon + 1);
        match terminator {
            Some(b'{') => {
                // Selector with a pseudo-class, not a declaration
                idx = value_end + 1;
            }
            _ => {
                let end = if terminator == Some(b';') {
                    value_end + 1
                } else {
                    value_end
                };
                found.push(Declaration {
                    name: css[idx..name_end].to_string(),
                    value: css[colon + 1..value_end].trim().to_string(),
                    span: idx..end,
                });
                idx = end.max(idx + 1);
            }
        }
    }

    found
}

/// Custom-property names referenced through `var(--name …)`
fn var_references(css: &str) -> HashSet<String> {
    let bytes = css.as_bytes();
    let mut refs = HashSet::new();
    let mut search = 0;
    while let Some(offset) = css[search..].find("var(") {
        let start = skip_whitespace(bytes, search + offset + 4);
        if css[start..].starts_with("--") {
            let end = ident_end(bytes, start + 2);
            refs.insert(css[start..end].to_string());
        }
        search = search + offset + 4;
    }
    refs
}

/// Identifiers appearing in `animation` / `animation-name` values
fn animation_names(css: &str) -> HashSet<String> {
    declarations(css)
        .into_iter()
        .filter(|d| {
            let property = strip_vendor(&d.name);
            property == "animation" || property == "animation-name"
        })
        .flat_map(|d| {
            d.value
                .split(|c: char| c.is_whitespace() || c == ',')
                .filter(|token| !token.is_empty())
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .collect()
}

fn strip_vendor(name: &str) -> &str {
    if let Some(rest) = name.strip_prefix('-') {
        if let Some(idx) = rest.find('-') {
            return &rest[idx + 1..];
        }
    }
    name
}

/// Index of the `}` matching the `{` at `open`.
fn matching_brace(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (idx, &b) in bytes.iter().enumerate().skip(open) {
        match b {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(idx);
                }
            }
            _ => {}
        }
    }
    None
}

/// `(name, span)` of every keyframes block
fn keyframes_blocks(css: &str) -> Vec<(String, Range<usize>)> {
    let bytes = css.as_bytes();
    let mut blocks = Vec::new();
    let mut search = 0;

    while let Some(offset) = css[search..].find('@') {
        let at = search + offset;
        let keyword_end = ident_end(bytes, at + 1);
        let keyword = &css[at + 1..keyword_end];
        search = keyword_end.max(at + 1);

        if strip_vendor(keyword) != "keyframes" {
            continue;
        }
        let name_start = skip_whitespace(bytes, keyword_end);
        let name_end = ident_end(bytes, name_start);
        let open = skip_whitespace(bytes, name_end);
        if name_end == name_start || open >= bytes.len() || bytes[open] != b'{' {
            continue;
        }
        if let Some(close) = matching_brace(bytes, open) {
            blocks.push((css[name_start..name_end].to_string(), at..close + 1));
            search = close + 1;
        }
    }

    blocks
}

/// Rules whose body is only whitespace
fn empty_rules(css: &str) -> Vec<Range<usize>> {
    let bytes = css.as_bytes();
    let mut rules = Vec::new();

    for (open, _) in css.match_indices('{') {
        let close = skip_whitespace(bytes, open + 1);
        if close >= bytes.len() || bytes[close] != b'}' {
            continue;
        }
        // Selector starts after the previous block boundary
        let start = bytes[..open]
            .iter()
            .rposition(|&b| b == b'}' || b == b'{' || b == b';')
            .map(|p| p + 1)
            .unwrap_or(0);
        let start = skip_whitespace(bytes, start);
        rules.push(start..close + 1);
    }

    rules
}

/// Widen a span to whole lines when it is the only thing on them.
fn line_span(css: &str, span: Range<usize>) -> Range<usize> {
    let bytes = css.as_bytes();
    let mut start = span.start;
    while start > 0 && (bytes[start - 1] == b' ' || bytes[start - 1] == b'\t') {
        start -= 1;
    }
    let line_start = start == 0 || bytes[start - 1] == b'\n';

    let mut end = span.end;
    while end < bytes.len() && (bytes[end] == b' ' || bytes[end] == b'\t') {
        end += 1;
    }
    let line_end = end >= bytes.len() || bytes[end] == b'\n';

    if line_start && line_end {
        let end = if end < bytes.len() { end + 1 } else { end };
        start..end
    } else {
        span
    }
}

fn remove_spans(css: &str, mut spans: Vec<Range<usize>>) -> String {
    spans.sort_by_key(|s| s.start);
    let mut out = String::with_capacity(css.len());
    let mut cursor = 0;
    for span in spans {
        if span.start < cursor {
            // Overlapping spans (nested removals) are covered by the outer one
            cursor = cursor.max(span.end);
            continue;
        }
        out.push_str(&css[cursor..span.start]);
        cursor = span.end;
    }
    out.push_str(&css[cursor..]);
    out
}

fn collapse_blank_lines(css: &str) -> String {
    let mut out = String::with_capacity(css.len());
    let mut newlines = 0;
    for ch in css.trim_start_matches('\n').chars() {
        if ch == '\n' {
            newlines += 1;
            if newlines > 2 {
                continue;
            }
        } else {
            newlines = 0;
        }
        out.push(ch);
    }
    out
}

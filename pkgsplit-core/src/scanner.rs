//! Member (procedure/function) scanning within one unit
//!
//! Locates every sub-routine header in a unit's combined declaration and
//! implementation text, classifies each occurrence as declaration-only
//! or declaration-with-body, and extracts its full textual extent.
//!
//! Global invariants enforced:
//! - Occurrences are produced in scan order
//! - A malformed occurrence is dropped with a logged warning; it never
//!   affects extraction of the other occurrences in the same unit

use crate::ast::{Member, MemberKind};
use crate::block;
use crate::config::ScanLimits;
use log::warn;
use regex::Regex;
use std::sync::OnceLock;

fn member_header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b(?:procedure|function)\b").unwrap())
}

fn return_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\breturns?\b").unwrap())
}

fn body_introducer_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b(?:is|as)\b").unwrap())
}

/// Scan one unit for member occurrences.
///
/// The declaration and implementation texts are concatenated into one
/// working buffer; an occurrence's starting offset against the original
/// boundary decides `is_declared_public`. A routine appearing in both
/// regions yields two `Member` values — merging is the assembler's job.
pub fn scan_unit(
    unit_name: &str,
    decl_text: &str,
    impl_text: &str,
    limits: &ScanLimits,
) -> Vec<Member> {
    let mut buffer = String::with_capacity(decl_text.len() + impl_text.len() + 1);
    buffer.push_str(decl_text);
    if !impl_text.is_empty() {
        buffer.push('\n');
        buffer.push_str(impl_text);
    }
    let decl_len = decl_text.len();

    let mut members = Vec::new();
    for m in member_header_re().find_iter(&buffer) {
        if !whole_word(&buffer, m.start(), m.end()) {
            continue;
        }
        let kind = if buffer[m.start()..m.end()].eq_ignore_ascii_case("function") {
            MemberKind::Function
        } else {
            MemberKind::Procedure
        };
        if let Some(member) =
            extract_occurrence(unit_name, &buffer, m.start(), m.end(), kind, decl_len, limits)
        {
            members.push(member);
        }
    }
    members
}

/// A keyword match must not be a substring of a longer identifier.
/// The regex `\b` already rejects alphanumerics and `_`; this adds the
/// source language's extra identifier characters `$` and `#`.
fn whole_word(text: &str, start: usize, end: usize) -> bool {
    let bytes = text.as_bytes();
    let before_ok = start == 0 || !block::is_ident_byte(bytes[start - 1]);
    let after_ok = end >= bytes.len() || !block::is_ident_byte(bytes[end]);
    before_ok && after_ok
}

fn extract_occurrence(
    unit_name: &str,
    buffer: &str,
    kw_start: usize,
    kw_end: usize,
    kind: MemberKind,
    decl_len: usize,
    limits: &ScanLimits,
) -> Option<Member> {
    let (name, after_name) = match read_identifier(buffer, skip_ws(buffer, kw_end)) {
        Some(v) => v,
        None => {
            warn!(
                "no identifier after {} keyword near offset {} in {}; occurrence dropped",
                kind.as_str(),
                kw_start,
                unit_name
            );
            return None;
        }
    };

    let mut pos = skip_ws(buffer, after_name);
    let mut parameters = Vec::new();
    if buffer.as_bytes().get(pos) == Some(&b'(') {
        match capture_paren(buffer, pos) {
            Some((inner, after)) => {
                parameters = split_parameters(inner);
                pos = after;
            }
            None => {
                warn!(
                    "unmatched parenthesis in parameter list of {} near offset {} in {}; occurrence dropped",
                    name, kw_start, unit_name
                );
                return None;
            }
        }
    }

    let mut return_type = None;
    if kind == MemberKind::Function {
        match find_return_clause(buffer, pos, limits.return_window) {
            Some((ty, type_end)) => {
                return_type = Some(ty);
                pos = type_end;
            }
            None => {
                // Not a valid function header. This is the
                // function/procedure disambiguation mechanism, not an error
                // in the source.
                warn!(
                    "function header {} without return clause near offset {} in {}; occurrence dropped",
                    name, kw_start, unit_name
                );
                return None;
            }
        }
    }

    match classify(buffer, pos) {
        Some(Classification::DeclarationOnly { semi_end }) => Some(Member {
            name,
            kind,
            signature_text: buffer[kw_start..semi_end - 1].trim().to_string(),
            body_text: String::new(),
            return_type,
            parameters,
            is_declared_public: kw_start < decl_len,
            unit_name: unit_name.to_string(),
        }),
        Some(Classification::HasBody {
            sig_end,
            body_start,
        }) => match block::find_block_end(buffer, body_start) {
            Some(end) => Some(Member {
                name,
                kind,
                signature_text: buffer[kw_start..sig_end].trim().to_string(),
                body_text: buffer[kw_start..end].to_string(),
                return_type,
                parameters,
                is_declared_public: kw_start < decl_len,
                unit_name: unit_name.to_string(),
            }),
            None => {
                warn!(
                    "no block terminator found for body of {} near offset {} in {}; occurrence dropped",
                    name, kw_start, unit_name
                );
                None
            }
        },
        None => {
            warn!(
                "neither body introducer nor terminator after header of {} near offset {} in {}; occurrence dropped",
                name, kw_start, unit_name
            );
            None
        }
    }
}

fn skip_ws(text: &str, mut pos: usize) -> usize {
    let bytes = text.as_bytes();
    while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
        pos += 1;
    }
    pos
}

/// Read the identifier immediately following a header keyword.
/// Accepts a bare identifier or a double-quoted one.
fn read_identifier(text: &str, pos: usize) -> Option<(String, usize)> {
    let bytes = text.as_bytes();
    if bytes.get(pos) == Some(&b'"') {
        let close = text[pos + 1..].find('"')? + pos + 1;
        if close == pos + 1 {
            return None;
        }
        return Some((text[pos + 1..close].to_string(), close + 1));
    }
    let b = *bytes.get(pos)?;
    if !b.is_ascii_alphabetic() {
        return None;
    }
    let mut end = pos;
    while end < bytes.len() && block::is_ident_byte(bytes[end]) {
        end += 1;
    }
    Some((text[pos..end].to_string(), end))
}

/// Capture a parenthesized parameter list with a running depth counter.
/// Returns the inner text and the offset after the closing parenthesis.
fn capture_paren(text: &str, open: usize) -> Option<(&str, usize)> {
    let bytes = text.as_bytes();
    let mut depth: i32 = 0;
    let mut in_quote: Option<u8> = None;
    let mut pos = open;

    while pos < bytes.len() {
        let b = bytes[pos];
        if let Some(q) = in_quote {
            if b == q {
                if bytes.get(pos + 1) == Some(&q) {
                    pos += 2;
                    continue;
                }
                in_quote = None;
            }
            pos += 1;
            continue;
        }
        match b {
            b'\'' | b'"' => in_quote = Some(b),
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Some((&text[open + 1..pos], pos + 1));
                }
            }
            _ => {}
        }
        pos += 1;
    }
    None
}

/// Split parameter text at top-level commas only: commas nested inside
/// parenthesized sub-expressions (sized types, default-value calls) must
/// not split the list.
fn split_parameters(inner: &str) -> Vec<String> {
    if inner.trim().is_empty() {
        return Vec::new();
    }
    let bytes = inner.as_bytes();
    let mut params = Vec::new();
    let mut depth: i32 = 0;
    let mut in_quote: Option<u8> = None;
    let mut start = 0;
    let mut pos = 0;

    while pos < bytes.len() {
        let b = bytes[pos];
        if let Some(q) = in_quote {
            if b == q {
                if bytes.get(pos + 1) == Some(&q) {
                    pos += 2;
                    continue;
                }
                in_quote = None;
            }
            pos += 1;
            continue;
        }
        match b {
            b'\'' | b'"' => in_quote = Some(b),
            b'(' => depth += 1,
            b')' => depth -= 1,
            b',' if depth == 0 => {
                params.push(inner[start..pos].trim().to_string());
                start = pos + 1;
            }
            _ => {}
        }
        pos += 1;
    }
    params.push(inner[start..].trim().to_string());
    params.retain(|p| !p.is_empty());
    params
}

/// Find the mandatory return clause of a function header within a
/// bounded window after the parameter list. The clause must precede the
/// body introducer or statement terminator; returns the type expression
/// and the offset where it ends.
fn find_return_clause(text: &str, from: usize, window: usize) -> Option<(String, usize)> {
    let mut window_end = from.saturating_add(window).min(text.len());
    while !text.is_char_boundary(window_end) {
        window_end -= 1;
    }
    let slice = &text[from..window_end];

    let m = return_re().find(slice)?;
    let before = &slice[..m.start()];
    if before.contains(';') || body_introducer_re().is_match(before) {
        return None;
    }
    let abs_start = from + m.start();
    let abs_end = from + m.end();
    if !whole_word(text, abs_start, abs_end) {
        return None;
    }

    // The type expression runs to the body introducer or terminator
    let type_end = match classify(text, abs_end)? {
        Classification::DeclarationOnly { semi_end } => semi_end - 1,
        Classification::HasBody { sig_end, .. } => sig_end,
    };
    let ty = text[abs_end..type_end].trim().to_string();
    if ty.is_empty() {
        return None;
    }
    Some((ty, type_end))
}

enum Classification {
    /// The statement terminator came first; the occurrence ends there
    DeclarationOnly { semi_end: usize },
    /// A body introducer (`IS`/`AS`) came first
    HasBody { sig_end: usize, body_start: usize },
}

/// Scan the text immediately after the signature for whichever comes
/// first: a body-introducing keyword or a statement terminator.
fn classify(text: &str, from: usize) -> Option<Classification> {
    let bytes = text.as_bytes();
    let mut pos = from;

    while pos < bytes.len() {
        let b = bytes[pos];
        if b == b';' {
            return Some(Classification::DeclarationOnly { semi_end: pos + 1 });
        }
        if block::is_ident_byte(b) {
            let word_start = pos;
            let mut word_end = pos;
            while word_end < bytes.len() && block::is_ident_byte(bytes[word_end]) {
                word_end += 1;
            }
            let at_boundary = word_start == 0 || !block::is_ident_byte(bytes[word_start - 1]);
            if at_boundary {
                let word = &text[word_start..word_end];
                if word.eq_ignore_ascii_case("IS") || word.eq_ignore_ascii_case("AS") {
                    return Some(Classification::HasBody {
                        sig_end: word_start,
                        body_start: word_end,
                    });
                }
            }
            pos = word_end;
            continue;
        }
        pos += 1;
    }
    None
}

//! Unit ("package") discovery
//!
//! Scans raw source text for unit declaration and implementation
//! headers and resolves each region's extent.
//!
//! Global invariants enforced:
//! - Deterministic output: units ordered by declaration header position
//!   (implementation-only units by their implementation header position)
//! - Discovery never fails for absent matches; zero units is a valid,
//!   reportable outcome
//! - Terminator searches are bounded by a forward window so malformed or
//!   truncated input cannot hang the scan

use crate::ast::{SourceSpan, UnitSpan};
use crate::config::ScanLimits;
use log::{debug, info, warn};
use regex::Regex;
use std::sync::OnceLock;

/// `CREATE [OR REPLACE] PACKAGE [BODY] [schema.]name`
fn unit_header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"(?i)\bcreate\s+(?:or\s+replace\s+)?package(?P<body>\s+body)?\s+(?P<name>(?:(?:"[^"]+"|[A-Za-z][A-Za-z0-9_$#]*)\s*\.\s*)?(?:"[^"]+"|[A-Za-z][A-Za-z0-9_$#]*))"#,
        )
        .unwrap()
    })
}

/// Relaxed header for raw extracted source without the statement wrapper:
/// `PACKAGE [BODY] name IS|AS` at the start of the text
fn relaxed_header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"(?i)\A\s*package(?P<body>\s+body)?\s+(?P<name>(?:(?:"[^"]+"|[A-Za-z][A-Za-z0-9_$#]*)\s*\.\s*)?(?:"[^"]+"|[A-Za-z][A-Za-z0-9_$#]*))\s+(?:is|as)\b"#,
        )
        .unwrap()
    })
}

fn bare_end_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bend\s*;").unwrap())
}

/// Canonical unit name: trailing identifier segment, unquoted, upper-cased
fn canonical_name(raw: &str) -> String {
    let segment = raw.rsplit('.').next().unwrap_or(raw).trim();
    segment.trim_matches('"').to_uppercase()
}

/// Discover every unit in the source text.
///
/// Declaration and implementation headers are found independently and
/// merged by canonical name. When the same region is declared twice for
/// one name, the later occurrence's span wins (idempotent-redefinition
/// semantics). When no statement-wrapped headers exist at all, a single
/// relaxed bare-header match is attempted.
pub fn discover(source: &str, limits: &ScanLimits) -> Vec<UnitSpan> {
    let mut units: Vec<UnitSpan> = Vec::new();

    for caps in unit_header_re().captures_iter(source) {
        let whole = caps.get(0).unwrap();
        let is_body = caps.name("body").is_some();
        let name = canonical_name(&caps["name"]);
        let end = resolve_terminator(source, whole.end(), &name, limits);
        let span = SourceSpan::new(whole.start(), end);

        match units.iter_mut().find(|u| u.name == name) {
            Some(existing) => {
                if is_body {
                    if existing.body.is_some() {
                        debug!("duplicate implementation header for {}: later wins", name);
                    }
                    existing.body = Some(span);
                } else {
                    if existing.decl.is_some() {
                        debug!("duplicate declaration header for {}: later wins", name);
                    }
                    existing.decl = Some(span);
                }
            }
            None => units.push(UnitSpan {
                name,
                decl: (!is_body).then_some(span),
                body: is_body.then_some(span),
            }),
        }
    }

    if units.is_empty() {
        return discover_relaxed(source);
    }

    units.sort_by_key(|u| u.order_key());
    info!("discovered {} unit(s)", units.len());
    units
}

/// Resolve a region's terminating offset: `END <name>;` wins, then the
/// first bare `END;`, then the window boundary (best-effort, logged).
fn resolve_terminator(source: &str, from: usize, unit_name: &str, limits: &ScanLimits) -> usize {
    let mut window_end = from.saturating_add(limits.forward_window).min(source.len());
    while !source.is_char_boundary(window_end) {
        window_end -= 1;
    }
    let window = &source[from..window_end];

    let named = format!(r"(?i)\bend\s+{}\s*;", regex::escape(unit_name));
    if let Ok(re) = Regex::new(&named) {
        if let Some(m) = re.find(window) {
            return from + m.end();
        }
    }
    if let Some(m) = bare_end_re().find(window) {
        return from + m.end();
    }

    warn!(
        "no terminator found for unit {} within {} bytes, truncating at window boundary",
        unit_name, limits.forward_window
    );
    window_end
}

/// Fallback for source without statement wrappers: one relaxed header at
/// the start of the text, optionally split at a later implementation
/// header for the same unit.
fn discover_relaxed(source: &str) -> Vec<UnitSpan> {
    let Some(caps) = relaxed_header_re().captures(source) else {
        info!("no unit headers found in source text");
        return Vec::new();
    };

    let name = canonical_name(&caps["name"]);
    if caps.name("body").is_some() {
        debug!("relaxed header for {} is an implementation region", name);
        return vec![UnitSpan {
            name,
            decl: None,
            body: Some(SourceSpan::new(0, source.len())),
        }];
    }

    let split_pattern = format!(r"(?i)\bpackage\s+body\s+{}\b", regex::escape(&name));
    let split_at = Regex::new(&split_pattern)
        .ok()
        .and_then(|re| re.find(source))
        .map(|m| m.start());

    match split_at {
        Some(i) if i > 0 => vec![UnitSpan {
            name,
            decl: Some(SourceSpan::new(0, i)),
            body: Some(SourceSpan::new(i, source.len())),
        }],
        _ => vec![UnitSpan {
            name,
            decl: Some(SourceSpan::new(0, source.len())),
            body: None,
        }],
    }
}

//! pkgsplit core library - decomposition of block-structured package
//! sources into standalone, unit-qualified objects

#![deny(warnings)]

// Global invariants enforced in this crate:
// - Decomposition is strictly per-unit
// - No global mutable state
// - No randomness, clocks, threads, or async
// - Units are ordered by discovery, members by scan position
// - Malformed regions degrade to fewer results, never to panics
// - Identical input yields byte-for-byte identical output

pub mod assemble;
pub mod ast;
pub mod block;
pub mod config;
pub mod discover;
pub mod report;
pub mod scanner;

pub use assemble::{assemble, assemble_with_config};
pub use ast::{Member, MemberKind, MergedMember, PlanEntry, UnitResult, Visibility};
pub use config::{PkgsplitConfig, ResolvedConfig, ScanLimits};
pub use indexmap::IndexMap;
pub use report::{render_json, render_text};

use log::debug;

/// Decompose every unit found in the source text, keyed by canonical
/// unit name in discovery order.
pub fn decompose_all(source: &str) -> IndexMap<String, UnitResult> {
    assemble(source)
}

/// Decompose every unit with optional resolved configuration
pub fn decompose_all_with_config(
    source: &str,
    config: Option<&ResolvedConfig>,
) -> IndexMap<String, UnitResult> {
    assemble_with_config(source, config)
}

/// Decompose a single unit by name.
///
/// The name is matched case-insensitively against canonical unit names.
/// When it matches nothing, the first discovered unit is used instead;
/// when nothing was discovered at all, a well-formed empty result is
/// returned carrying the requested name and a diagnostic note.
pub fn decompose_one(source: &str, unit_name: &str) -> UnitResult {
    decompose_one_with_config(source, unit_name, None)
}

/// Decompose a single unit by name with optional resolved configuration
pub fn decompose_one_with_config(
    source: &str,
    unit_name: &str,
    config: Option<&ResolvedConfig>,
) -> UnitResult {
    let mut results = assemble_with_config(source, config);
    let folded = unit_name.to_uppercase();

    if let Some(result) = results.shift_remove(&folded) {
        return result;
    }
    if let Some((found, result)) = results.shift_remove_index(0) {
        debug!(
            "requested unit {} not found; falling back to first discovered unit {}",
            unit_name, found
        );
        return result;
    }
    UnitResult::empty(
        unit_name.to_string(),
        "no package units discovered in source text",
    )
}
